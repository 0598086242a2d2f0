//! Minimal Kagi API client for search and summarization.
//!
//! The API key is checked lazily: a missing key only fails the tool call
//! that needs it.

use actor_core::error::ToolError;
use serde::Deserialize;

const KAGI_API_URL: &str = "https://kagi.com/api/v0";

#[derive(Clone)]
pub struct KagiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl std::fmt::Debug for KagiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KagiClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// One entry of a search response. `t == 0` is a result, `t == 1` related searches.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub t: u8,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    data: SummaryData,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    output: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    msg: String,
}

impl KagiClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: KAGI_API_URL.into(),
        }
    }

    /// Point at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn key(&self, tool: &str) -> Result<&str, ToolError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ToolError::NotConfigured {
                tool: tool.into(),
                reason: "KAGI_API_KEY is not set".into(),
            })
    }

    pub async fn search(&self, tool: &str, query: &str) -> Result<SearchResponse, ToolError> {
        let key = self.key(tool)?;
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .header("Authorization", format!("Bot {key}"))
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ToolError::failed(tool, format!("Kagi request failed: {e}")))?;

        decode(tool, response).await
    }

    pub async fn summarize(&self, tool: &str, url: &str) -> Result<String, ToolError> {
        let key = self.key(tool)?;
        let response = self
            .http
            .get(format!("{}/summarize", self.base_url))
            .header("Authorization", format!("Bot {key}"))
            .query(&[
                ("url", url),
                ("engine", "cecil"),
                ("summary_type", "summary"),
                ("target_language", "EN"),
            ])
            .send()
            .await
            .map_err(|e| ToolError::failed(tool, format!("Kagi request failed: {e}")))?;

        let summary: SummaryResponse = decode(tool, response).await?;
        Ok(summary.data.output)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    tool: &str,
    response: reqwest::Response,
) -> Result<T, ToolError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ToolError::failed(tool, format!("Kagi response unreadable: {e}")))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error.into_iter().next())
            .map(|e| e.msg)
            .unwrap_or(body);
        return Err(ToolError::failed(tool, format!("Kagi API error ({status}): {message}")));
    }

    serde_json::from_str(&body)
        .map_err(|e| ToolError::failed(tool, format!("unexpected Kagi response: {e}")))
}

/// Number the plain search results from 0, separated by blank lines.
pub fn format_results(response: &SearchResponse) -> String {
    response
        .data
        .iter()
        .filter(|item| item.t == 0)
        .enumerate()
        .map(|(number, item)| {
            format!(
                "{number}: {}\n{}\nPublished Date: {}\n{}",
                item.title,
                item.url,
                item.published.as_deref().unwrap_or("Not Available"),
                item.snippet.as_deref().unwrap_or(""),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
