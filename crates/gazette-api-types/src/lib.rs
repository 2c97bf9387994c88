//! Wire types returned by the publication backend.
//!
//! Field names follow the backend's JSON exactly; conversion into domain
//! records happens in the consuming crate.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Publication row as served by the listing, category, search and legacy endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationDto {
    #[serde(rename = "ID_publicaciones")]
    pub id: i64,
    #[serde(rename = "Titulo", default)]
    pub title: String,
    #[serde(rename = "Resumen", default)]
    pub summary: Option<String>,
    #[serde(rename = "Contenido", default)]
    pub body: Option<String>,
    #[serde(rename = "Fecha_creacion", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        rename = "Fecha_modificacion",
        default,
        with = "time::serde::rfc3339::option"
    )]
    pub modified_at: Option<OffsetDateTime>,
    #[serde(rename = "Estado", default)]
    pub status: Option<String>,
    #[serde(
        rename = "ID_administrador",
        default,
        deserialize_with = "lenient_id"
    )]
    pub admin_id: Option<i64>,
    #[serde(rename = "categorias", default)]
    pub categories: Vec<CategoryDto>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub categoria_id: Option<i64>,
}

/// Category catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDto {
    #[serde(rename = "ID_categoria")]
    pub id: i64,
    #[serde(rename = "Nombre_categoria", default)]
    pub name: String,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Status value the backend uses for published rows.
pub const STATUS_PUBLISHED: &str = "publicado";
/// Status value the backend uses for drafts.
pub const STATUS_DRAFT: &str = "borrador";

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(i64),
    Text(String),
}

// Ids arrive as numbers or numeric strings depending on the endpoint.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<IdRepr>::deserialize(deserializer)?;
    match repr {
        None => Ok(None),
        Some(IdRepr::Number(value)) => Ok(Some(value)),
        Some(IdRepr::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid id `{text}`")))
        }
    }
}
