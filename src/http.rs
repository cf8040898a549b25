//! Shared HTTP plumbing for the store and media-library clients.
//!
//! Both APIs answer GROQ queries the same way: a `GET` with the query in
//! `query` and each parameter as `$name=<json>`, returning
//! `{"result": ...}`. Requests carry the project token as a bearer token.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const USER_AGENT: &str = concat!("media-relink/", env!("CARGO_PKG_VERSION"));

/// Longest response body excerpt included in error messages.
const ERROR_BODY_LIMIT: usize = 400;

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

/// Encode GROQ parameters as `$name` → JSON text query pairs.
pub fn encode_params(params: &[(&str, Value)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(name, value)| (format!("${}", name), value.to_string()))
        .collect()
}

/// Run a GROQ query at `url` and deserialize its `result`.
pub async fn query<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    token: &str,
    groq: &str,
    params: &[(&str, Value)],
    extra: &[(&str, &str)],
) -> Result<T> {
    debug!(url, groq, "query");
    let mut pairs = vec![("query".to_string(), groq.to_string())];
    pairs.extend(encode_params(params));
    pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    let response = client
        .get(url)
        .bearer_auth(token)
        .query(&pairs)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?;
    let response = check_status(response).await?;
    let body: QueryResponse<T> = response
        .json()
        .await
        .with_context(|| format!("invalid query response from {}", url))?;
    Ok(body.result)
}

/// Turn a non-2xx response into an error carrying status and body excerpt.
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    bail!("{} returned {}: {}", url, status, excerpt(&body));
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let cut: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    format!("{}…", cut)
}

/// API versions are written `2025-02-19` in config but `v2025-02-19` in URLs.
pub fn version_segment(api_version: &str) -> String {
    format!("v{}", api_version.trim_start_matches('v'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_are_json_encoded() {
        let pairs = encode_params(&[
            ("type", json!("mux.videoAsset")),
            ("ids", json!(["a", "drafts.a"])),
        ]);
        assert_eq!(
            pairs,
            vec![
                ("$type".to_string(), "\"mux.videoAsset\"".to_string()),
                ("$ids".to_string(), "[\"a\",\"drafts.a\"]".to_string()),
            ]
        );
    }

    #[test]
    fn version_segment_adds_single_v() {
        assert_eq!(version_segment("2025-02-19"), "v2025-02-19");
        assert_eq!(version_segment("v2025-02-19"), "v2025-02-19");
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(ERROR_BODY_LIMIT + 50);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), ERROR_BODY_LIMIT + 1);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn query_response_unwraps_result() {
        let parsed: QueryResponse<Option<String>> =
            serde_json::from_value(json!({"ms": 3, "query": "*", "result": null})).unwrap();
        assert_eq!(parsed.result, None);
    }
}
