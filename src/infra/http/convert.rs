use gazette_api_types::{PublicationDto, STATUS_DRAFT, STATUS_PUBLISHED};

use crate::domain::entities::PublicationRecord;
use crate::domain::types::PublicationStatus;

/// Convert a wire row into a record. Returns `None` for an unrecognised status.
///
/// A missing status is read as published; older endpoints omit it.
pub fn publication_from_dto(dto: PublicationDto) -> Option<PublicationRecord> {
    let status = match dto.status.as_deref().map(str::trim) {
        None | Some("") => PublicationStatus::Published,
        Some(value) if value.eq_ignore_ascii_case(STATUS_PUBLISHED) => PublicationStatus::Published,
        Some(value) if value.eq_ignore_ascii_case(STATUS_DRAFT) => PublicationStatus::Draft,
        Some(_) => return None,
    };

    let mut categories: Vec<_> = dto.categories.iter().map(|category| category.id).collect();
    if let Some(id) = dto.categoria_id
        && !categories.contains(&id)
    {
        categories.push(id);
    }

    Some(PublicationRecord {
        id: dto.id,
        title: dto.title,
        summary: dto.summary.unwrap_or_default(),
        body: dto.body.unwrap_or_default(),
        status,
        admin_id: dto.admin_id,
        categories,
        created_at: dto.created_at,
        modified_at: dto.modified_at,
    })
}
