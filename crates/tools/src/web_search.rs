//! Kagi-backed tools: `web_search` and `web_fetch_summary`.

use actor_core::error::ToolError;
use actor_core::tool::{ArgKind, ArgSchema, RiskClass, Tool, ToolResult};
use async_trait::async_trait;

use crate::kagi::{KagiClient, format_results};

pub struct WebSearchTool {
    client: KagiClient,
}

impl WebSearchTool {
    pub fn new(client: KagiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Fetch web results based on a query. Use for general search and when the user explicitly \
         asks to search for results or information. Returns numbered results that can be referred \
         to by number."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::ReadOnly
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().required("query", ArgKind::String, "the search query")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"].as_str().unwrap_or("").trim();
        if query.is_empty() {
            return Err(ToolError::invalid(self.name(), "query cannot be missing or empty"));
        }

        let response = self.client.search(self.name(), query).await?;
        Ok(ToolResult::ok(format_results(&response)))
    }
}

pub struct WebFetchSummaryTool {
    client: KagiClient,
}

impl WebFetchSummaryTool {
    pub fn new(client: KagiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebFetchSummaryTool {
    fn name(&self) -> &str {
        "web_fetch_summary"
    }

    fn description(&self) -> &str {
        "Fetch a summary of the content at a URL. Works with any document type (web page, video, \
         audio, etc.). Returns a summary of the content."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::ReadOnly
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().required("url", ArgKind::String, "the URL to fetch and summarize")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = arguments["url"].as_str().unwrap_or("").trim();
        if url.is_empty() {
            return Err(ToolError::invalid(self.name(), format!("url {url} is not valid")));
        }

        let summary = self.client.summarize(self.name(), url).await?;
        Ok(ToolResult::ok(summary))
    }
}
