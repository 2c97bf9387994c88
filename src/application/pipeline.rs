//! Client-side filtering and ordering of fetched publications.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::domain::entities::PublicationRecord;
use crate::domain::query::QueryParams;
use crate::domain::types::{AdminId, SortOrder, StatusFilter};

/// View-shaping subset of the query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineParams {
    pub search: Option<String>,
    pub status: StatusFilter,
    pub admin: Option<AdminId>,
    pub sort: SortOrder,
}

impl From<&QueryParams> for PipelineParams {
    fn from(query: &QueryParams) -> Self {
        Self {
            search: query.search().map(str::to_string),
            status: query.status(),
            admin: query.admin(),
            sort: query.sort(),
        }
    }
}

/// Produce the canonical list: filtered, then sorted.
///
/// Applying the pipeline to its own output returns the same list.
pub fn canonicalize(
    records: Vec<PublicationRecord>,
    params: &PipelineParams,
) -> Vec<PublicationRecord> {
    let needle = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);

    let mut retained: Vec<PublicationRecord> = records
        .into_iter()
        .filter(|record| params.status.retains(record.status))
        .filter(|record| params.admin.is_none_or(|admin| record.admin_id == Some(admin)))
        .filter(|record| {
            needle
                .as_deref()
                .is_none_or(|needle| matches_search(record, needle))
        })
        .collect();

    sort_records(&mut retained, params.sort);
    retained
}

/// Case-insensitive substring match on title or summary; `needle` must be lowercase.
pub fn matches_search(record: &PublicationRecord, needle: &str) -> bool {
    record.title.to_lowercase().contains(needle) || record.summary.to_lowercase().contains(needle)
}

/// Stable in-place sort by the requested order.
pub fn sort_records(records: &mut [PublicationRecord], order: SortOrder) {
    match order {
        SortOrder::Recent => records.sort_by(|a, b| b.activity_at().cmp(&a.activity_at())),
        SortOrder::Oldest => records.sort_by_key(PublicationRecord::activity_at),
        SortOrder::Alphabetical => {
            records.sort_by_cached_key(|record| {
                (collation_key(&record.title), record.title.clone(), record.id)
            });
        }
    }
}

/// Primary alphabetical key: decomposed, combining marks stripped, lowercased.
///
/// "Árbol" and "arbol" share a key; raw title and id break the tie.
pub fn collation_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
