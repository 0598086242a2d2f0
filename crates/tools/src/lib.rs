//! Built-in tool implementations for the actor CLI.
//!
//! The tool set is fixed and closed: filesystem access confined to the
//! working directory, direct command execution, and web lookups through
//! Kagi and plain HTTP.

pub mod file_read;
pub mod file_search;
pub mod file_write;
pub mod kagi;
pub mod shell;
pub mod web_fetch;
pub mod web_search;

use std::time::Duration;

use actor_core::tool::ToolRegistry;
use actor_security::SandboxBoundary;

/// Settings the tools need from configuration.
#[derive(Clone)]
pub struct ToolSettings {
    pub shell_timeout: Duration,
    pub kagi_api_key: Option<String>,
    pub fetch_max_bytes: u64,
    pub fetch_max_chars: usize,
    pub http_timeout: Duration,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            shell_timeout: Duration::from_secs(300),
            kagi_api_key: None,
            fetch_max_bytes: 10_000_000,
            fetch_max_chars: 100_000,
            http_timeout: Duration::from_secs(60),
        }
    }
}

impl std::fmt::Debug for ToolSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSettings")
            .field("shell_timeout", &self.shell_timeout)
            .field("kagi_api_key", &self.kagi_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("fetch_max_bytes", &self.fetch_max_bytes)
            .field("fetch_max_chars", &self.fetch_max_chars)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

/// Create the registry with every built-in tool, confined to `boundary`.
pub fn default_registry(boundary: &SandboxBoundary, settings: &ToolSettings) -> ToolRegistry {
    let http = reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .user_agent(concat!("actor/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        });
    let kagi = kagi::KagiClient::new(http.clone(), settings.kagi_api_key.clone());

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(file_read::FsPwdTool::new(boundary.clone())));
    registry.register(Box::new(file_read::FsStatTool::new(boundary.clone())));
    registry.register(Box::new(file_read::FsReadTool::new(boundary.clone())));
    registry.register(Box::new(file_read::FsListTool::new(boundary.clone())));
    registry.register(Box::new(file_search::FsSearchTool::new(boundary.clone())));
    registry.register(Box::new(file_write::FsWriteTool::new(boundary.clone())));
    registry.register(Box::new(file_write::FsReplaceTool::new(boundary.clone())));
    registry.register(Box::new(file_write::FsMkdirTool::new(boundary.clone())));
    registry.register(Box::new(file_write::FsRmTool::new(boundary.clone())));
    registry.register(Box::new(shell::ShellTool::new(boundary.clone(), settings.shell_timeout)));
    registry.register(Box::new(web_search::WebSearchTool::new(kagi.clone())));
    registry.register(Box::new(web_search::WebFetchSummaryTool::new(kagi)));
    registry.register(Box::new(web_fetch::WebFetchTool::new(
        http,
        settings.fetch_max_bytes,
        settings.fetch_max_chars,
    )));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_core::tool::RiskClass;

    #[test]
    fn registry_holds_the_closed_tool_set() {
        let dir = tempfile::tempdir().unwrap();
        let boundary = SandboxBoundary::new(dir.path()).unwrap();
        let registry = default_registry(&boundary, &ToolSettings::default());

        assert_eq!(
            registry.names(),
            vec![
                "fs_list", "fs_mkdir", "fs_pwd", "fs_read", "fs_replace", "fs_rm", "fs_search",
                "fs_stat", "fs_write", "shell", "web_fetch", "web_fetch_summary", "web_search",
            ]
        );
    }

    #[test]
    fn risk_classes() {
        let dir = tempfile::tempdir().unwrap();
        let boundary = SandboxBoundary::new(dir.path()).unwrap();
        let registry = default_registry(&boundary, &ToolSettings::default());

        let risk = |name: &str| registry.get(name).map(|t| t.risk_class());
        assert_eq!(risk("fs_list"), Some(RiskClass::ReadOnly));
        assert_eq!(risk("web_fetch"), Some(RiskClass::ReadOnly));
        assert_eq!(risk("fs_write"), Some(RiskClass::Mutating));
        assert_eq!(risk("fs_rm"), Some(RiskClass::Mutating));
        assert_eq!(risk("shell"), Some(RiskClass::Execute));
    }

    #[test]
    fn every_schema_is_a_closed_object() {
        let dir = tempfile::tempdir().unwrap();
        let boundary = SandboxBoundary::new(dir.path()).unwrap();
        let registry = default_registry(&boundary, &ToolSettings::default());

        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
            assert_eq!(def.parameters["additionalProperties"], false, "{}", def.name);
        }
    }
}
