//! HTTP client for the hosted content store (the dataset being migrated).
//!
//! Implements [`DocumentStore`] on top of the store's HTTP API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list legacy assets | `GET /v{api}/data/query/{dataset}?query=*[_type == $type]` |
//! | referencing documents | `GET /v{api}/data/query/{dataset}?query=*[references($ids)]` |
//! | commit | `POST /v{api}/data/mutate/{dataset}` with one `patch` mutation |
//!
//! Queries run with the `raw` perspective so draft documents are returned
//! alongside published ones. Each commit is a single request holding one
//! `patch` mutation whose `set` covers every field of that document, which the
//! store applies as one transaction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::debug;

use media_relink_core::models::{decode_legacy_assets, Document, LegacyAsset};
use media_relink_core::store::{DocumentPatch, DocumentStore};

use crate::config::{RunSettings, StoreConfig};
use crate::http;

const LEGACY_ASSETS_QUERY: &str = "*[_type == $type]{_id, uploadId, filename, size, media}";
const REFERENCING_QUERY: &str = "*[references($ids)]";

/// Store client bound to one project and dataset.
pub struct ContentLakeClient {
    client: Client,
    base_url: String,
    dataset: String,
    token: String,
}

impl ContentLakeClient {
    pub fn new(settings: &RunSettings, config: &StoreConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout())?,
            base_url: format!(
                "https://{}.{}/{}",
                settings.project_id,
                config.api_host,
                http::version_segment(&config.api_version)
            ),
            dataset: settings.dataset.clone(),
            token: settings.token.clone(),
        })
    }

    pub fn query_url(&self) -> String {
        format!("{}/data/query/{}", self.base_url, self.dataset)
    }

    pub fn mutate_url(&self) -> String {
        format!("{}/data/mutate/{}", self.base_url, self.dataset)
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, Value)],
    ) -> Result<T> {
        http::query(
            &self.client,
            &self.query_url(),
            &self.token,
            groq,
            params,
            &[("perspective", "raw")],
        )
        .await
    }
}

/// Request body for committing `patch` as one transaction.
pub fn mutation_body(patch: &DocumentPatch) -> Value {
    let set: Map<String, Value> = patch
        .set
        .iter()
        .map(|(path, value)| (path.to_string(), value.clone()))
        .collect();
    json!({
        "mutations": [
            { "patch": { "id": patch.document_id, "set": set } }
        ]
    })
}

#[async_trait]
impl DocumentStore for ContentLakeClient {
    async fn legacy_assets(&self, kind: &str) -> Result<Vec<LegacyAsset>> {
        let records: Vec<Value> = self
            .query(LEGACY_ASSETS_QUERY, &[("type", json!(kind))])
            .await
            .with_context(|| format!("Failed to list '{}' documents", kind))?;
        Ok(decode_legacy_assets(&records))
    }

    async fn referencing_documents(&self, ids: &[String]) -> Result<Vec<Document>> {
        let raw: Vec<Value> = self
            .query(REFERENCING_QUERY, &[("ids", json!(ids))])
            .await
            .with_context(|| format!("Failed to query documents referencing {:?}", ids))?;
        Ok(raw.into_iter().filter_map(Document::from_value).collect())
    }

    async fn commit(&self, patch: &DocumentPatch) -> Result<()> {
        let url = self.mutate_url();
        debug!(document_id = %patch.document_id, fields = patch.set.len(), "commit");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("visibility", "sync")])
            .json(&mutation_body(patch))
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        http::check_status(response).await?;
        Ok(())
    }
}
