//! reqwest-backed publication source.

mod convert;

use async_trait::async_trait;
use gazette_api_types::{CategoryDto, ErrorBody, PublicationDto, STATUS_DRAFT, STATUS_PUBLISHED};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::source::{PublicationSource, SourceError};
use crate::domain::entities::{CategoryRecord, PublicationRecord};
use crate::domain::types::{CategoryId, PublicationStatus};
use crate::infra::error::InfraError;

pub use convert::publication_from_dto;

const SOURCE: &str = "infra::http";

pub fn default_user_agent() -> &'static str {
    concat!("gazette/", env!("CARGO_PKG_VERSION"))
}

#[derive(Clone, Debug)]
pub struct HttpPublicationSource {
    client: Client,
    base: Url,
}

impl HttpPublicationSource {
    /// Build a source rooted at `base_url`. Paths are resolved relative to it,
    /// so a base with a path prefix keeps that prefix.
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, InfraError> {
        let mut base = Url::parse(base_url).map_err(|err| {
            InfraError::configuration(format!("invalid source base url `{base_url}`: {err}"))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|err| InfraError::configuration(format!("http client: {err}")))?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, SourceError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|err| SourceError::transport(format!("invalid path `{path}`: {err}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = self.url(path, query)?;
        debug!(target: SOURCE, %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(SourceError::transport)?;
        Self::handle(response).await
    }

    async fn handle<T: DeserializeOwned>(response: Response) -> Result<T, SourceError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(SourceError::transport)?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(SourceError::Status {
                status: status.as_u16(),
                message,
            });
        }
        serde_json::from_slice(&bytes).map_err(SourceError::decode)
    }

    async fn publications(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        let rows: Vec<PublicationDto> = self.get(path, query).await?;
        Ok(rows
            .into_iter()
            .filter_map(|dto| {
                let id = dto.id;
                let record = publication_from_dto(dto);
                if record.is_none() {
                    warn!(target: SOURCE, publication_id = id, "Skipping publication with unknown status");
                }
                record
            })
            .collect())
    }
}

fn status_param(status: PublicationStatus) -> &'static str {
    match status {
        PublicationStatus::Published => STATUS_PUBLISHED,
        PublicationStatus::Draft => STATUS_DRAFT,
    }
}

#[async_trait]
impl PublicationSource for HttpPublicationSource {
    async fn fetch_all(
        &self,
        cap: usize,
        offset: usize,
        status: Option<PublicationStatus>,
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        let mut query = vec![("limite", cap.to_string()), ("offset", offset.to_string())];
        if let Some(status) = status {
            query.push(("estado", status_param(status).to_string()));
        }
        self.publications("api/publicaciones", &query).await
    }

    async fn fetch_by_category(
        &self,
        category: CategoryId,
        cap: usize,
        offset: usize,
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        let path = format!("api/categorias/{category}/publicaciones");
        let query = [("limite", cap.to_string()), ("offset", offset.to_string())];
        let mut records = self.publications(&path, &query).await?;
        // The per-category endpoint does not always echo the category back.
        for record in &mut records {
            if !record.in_category(category) {
                record.categories.push(category);
            }
        }
        Ok(records)
    }

    async fn fetch_by_search_term(
        &self,
        term: &str,
        cap: usize,
        offset: usize,
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        let query = [
            ("q", term.to_string()),
            ("limite", cap.to_string()),
            ("offset", offset.to_string()),
        ];
        self.publications("api/publicaciones/search", &query).await
    }

    async fn fetch_legacy_latest(
        &self,
        cap: usize,
    ) -> Result<Vec<PublicationRecord>, SourceError> {
        self.publications("api/publicaciones/all", &[("limite", cap.to_string())])
            .await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, SourceError> {
        let rows: Vec<CategoryDto> = self.get("api/categorias", &[]).await?;
        Ok(rows
            .into_iter()
            .map(|dto| CategoryRecord {
                id: dto.id,
                name: dto.name,
            })
            .collect())
    }
}
