//! HTTP client for the media-library registry.
//!
//! Queries are scoped to one library:
//! `GET https://{host}/v{api}/media-libraries/{library}/query`. The host is
//! the production or staging API depending on `--prod`.
//!
//! A library holds versioned asset *instances* and *containers*
//! (`sanity.asset`) whose `currentVersion` references the live instance.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use media_relink_core::store::MediaRegistry;

use crate::config::{RegistryConfig, RunSettings, StoreConfig};
use crate::http;

const INSTANCE_QUERY: &str = "*[_id == $id][0]._id";
const CONTAINER_QUERY: &str = r#"*[_type == "sanity.asset" && currentVersion._ref == $id][0]._id"#;

pub struct MediaLibraryClient {
    client: Client,
    base_url: String,
    token: String,
}

impl MediaLibraryClient {
    pub fn new(settings: &RunSettings, config: &RegistryConfig, store: &StoreConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(store.timeout())?,
            base_url: format!(
                "https://{}/{}",
                config.host(settings.environment),
                http::version_segment(&config.api_version)
            ),
            token: settings.token.clone(),
        })
    }

    pub fn query_url(&self, library_id: &str) -> String {
        format!("{}/media-libraries/{}/query", self.base_url, library_id)
    }

    async fn lookup(&self, library_id: &str, groq: &str, id: &str) -> Result<Option<String>> {
        http::query(
            &self.client,
            &self.query_url(library_id),
            &self.token,
            groq,
            &[("id", json!(id))],
            &[],
        )
        .await
        .with_context(|| format!("Media library '{}' lookup for '{}' failed", library_id, id))
    }
}

#[async_trait]
impl MediaRegistry for MediaLibraryClient {
    async fn find_instance(&self, library_id: &str, instance_id: &str) -> Result<Option<String>> {
        self.lookup(library_id, INSTANCE_QUERY, instance_id).await
    }

    async fn find_container(&self, library_id: &str, instance_id: &str) -> Result<Option<String>> {
        self.lookup(library_id, CONTAINER_QUERY, instance_id).await
    }
}
