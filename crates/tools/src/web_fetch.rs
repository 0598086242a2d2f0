//! `web_fetch`: download a text document and return it as plain text.
//!
//! HTML is reduced to its readable content and converted to Markdown.
//! Only textual MIME types are accepted, and both the downloaded size and
//! the resulting text length are capped.

use actor_core::error::ToolError;
use actor_core::tool::{ArgKind, ArgSchema, RiskClass, Tool, ToolResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

const FETCH_TYPES: [&str; 5] = [
    "text/plain",
    "text/html",
    "application/json",
    "application/xml",
    "text/xml",
];

pub struct WebFetchTool {
    http: reqwest::Client,
    max_bytes: u64,
    max_chars: usize,
}

impl WebFetchTool {
    pub fn new(http: reqwest::Client, max_bytes: u64, max_chars: usize) -> Self {
        Self {
            http,
            max_bytes,
            max_chars,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        let parsed = Url::parse(url).map_err(|e| format!("url {url} is not valid: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("url {url} is not valid: unsupported scheme '{}'", parsed.scheme()));
        }

        let mut response = self
            .http
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("server returned {status}"));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if !FETCH_TYPES.contains(&content_type.as_str()) {
            return Err(format!("fetched mime type '{content_type}' is not supported"));
        }

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
            if (data.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(format!("fetched content was over the limit of {} bytes", self.max_bytes));
            }
            data.extend_from_slice(&chunk);
        }

        let mut text = String::from_utf8_lossy(&data).into_owned();
        if content_type == "text/html" {
            text = html_to_markdown(&text, &parsed);
        }

        if text.chars().count() > self.max_chars {
            return Err(format!("fetched text was over the limit of {} characters", self.max_chars));
        }

        debug!(url, %content_type, chars = text.len(), "Fetched document");
        Ok(text)
    }
}

/// Extract the readable part of a page and render it as Markdown.
///
/// Falls back to converting the whole document when extraction yields nothing.
pub fn html_to_markdown(html: &str, url: &Url) -> String {
    let mut cursor = std::io::Cursor::new(html.as_bytes());
    let extracted = match readability::extractor::extract(&mut cursor, url) {
        Ok(product) => htmd::convert(&product.content).unwrap_or_default(),
        Err(e) => {
            debug!(error = %e, "Readability extraction failed");
            String::new()
        }
    };

    if extracted.trim().is_empty() {
        htmd::convert(html).unwrap_or_else(|_| html.to_string())
    } else {
        extracted
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "web_fetch"
    }

    fn description(&self) -> &str {
        "Fetch web content from a URL. Returns a plain-text representation of the content; HTML \
         pages are converted to Markdown."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::ReadOnly
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().required("url", ArgKind::String, "the URL to fetch")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = arguments["url"].as_str().unwrap_or("");
        let text = self
            .fetch(url)
            .await
            .map_err(|reason| ToolError::failed(self.name(), format!("HTTP request failed: {reason}")))?;
        Ok(ToolResult::ok(text))
    }
}
