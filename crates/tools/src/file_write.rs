//! Mutating filesystem tools: `fs_write`, `fs_replace`, `fs_mkdir`, `fs_rm`.
//!
//! Each tool resolves its target inside [`Tool::action`], so a path outside
//! the working directory is refused before the operator is asked anything.
//! `execute` resolves again; the boundary check is not skippable.

use actor_core::error::ToolError;
use actor_core::tool::{ActionRequest, ArgKind, ArgSchema, RiskClass, Tool, ToolResult};
use actor_security::SandboxBoundary;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::file_read::{does_not_exist, str_arg};

fn mutation(tool: &str, target: &str, description: String) -> ActionRequest {
    ActionRequest {
        tool: tool.into(),
        risk: RiskClass::Mutating,
        scope: tool.into(),
        target: target.into(),
        description,
        irreversible: false,
    }
}

/// Write modes accepted by `fs_write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Truncate,
    Append,
}

impl WriteMode {
    fn parse(tool: &str, mode: &str) -> Result<Self, ToolError> {
        match mode {
            "w" | "w+" => Ok(Self::Truncate),
            "a" | "a+" => Ok(Self::Append),
            other => Err(ToolError::invalid(
                tool,
                format!("unsupported mode '{other}', expected one of 'w', 'w+', 'a', 'a+'"),
            )),
        }
    }
}

/// Writes or appends text to a file.
pub struct FsWriteTool {
    boundary: SandboxBoundary,
}

impl FsWriteTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }
}

#[async_trait]
impl Tool for FsWriteTool {
    fn name(&self) -> &str {
        "fs_write"
    }

    fn description(&self) -> &str {
        "Write content to a file using the specified mode: 'w' (write/overwrite), 'w+', 'a' \
         (append) or 'a+'. Returns a success message."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::Mutating
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new()
            .required("path", ArgKind::String, "the path to the file")
            .required("content", ArgKind::String, "the content to write")
            .optional("mode", ArgKind::String, "file mode, defaults to 'w'")
    }

    fn action(&self, arguments: &serde_json::Value) -> Result<Option<ActionRequest>, ToolError> {
        let path = str_arg(self.name(), arguments, "path")?;
        let content = str_arg(self.name(), arguments, "content")?;
        let mode = arguments["mode"].as_str().unwrap_or("w");
        WriteMode::parse(self.name(), mode)?;
        self.boundary.resolve_for(self.name(), path)?;

        Ok(Some(mutation(
            self.name(),
            path,
            format!("write {} bytes to '{path}' (mode: {mode})", content.len()),
        )))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = str_arg(self.name(), &arguments, "path")?;
        let content = str_arg(self.name(), &arguments, "content")?;
        let mode = arguments["mode"].as_str().unwrap_or("w");
        let write_mode = WriteMode::parse(self.name(), mode)?;
        let resolved = self.boundary.resolve_for(self.name(), path)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true);
        match write_mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        #[cfg(unix)]
        options.custom_flags(libc::O_NOFOLLOW);

        let io_err = |e: std::io::Error| ToolError::failed("fs_write", format!("cannot write '{path}': {e}"));
        let mut file = options.open(&resolved).await.map_err(io_err)?;
        file.write_all(content.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        tracing::debug!(path = %resolved.display(), bytes = content.len(), "File written");
        Ok(ToolResult::ok(format!(
            "Successfully wrote {} characters to {path} (mode: {mode})",
            content.chars().count()
        )))
    }
}

/// Replaces occurrences of a string in a file.
pub struct FsReplaceTool {
    boundary: SandboxBoundary,
}

impl FsReplaceTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }

    fn check_strings<'a>(&self, arguments: &'a serde_json::Value) -> Result<(&'a str, &'a str), ToolError> {
        let old = str_arg(self.name(), arguments, "old_string")?;
        let new = str_arg(self.name(), arguments, "new_string")?;
        if old.is_empty() {
            return Err(ToolError::invalid(self.name(), "old_string must be a non-empty string"));
        }
        if new.is_empty() {
            return Err(ToolError::invalid(self.name(), "new_string must be a non-empty string"));
        }
        if old == new {
            return Err(ToolError::invalid(self.name(), "new_string must be different from old_string"));
        }
        Ok((old, new))
    }
}

#[async_trait]
impl Tool for FsReplaceTool {
    fn name(&self) -> &str {
        "fs_replace"
    }

    fn description(&self) -> &str {
        "Replace occurrences of a string in a file with a new string. Good for precise edits. \
         Replaces only the first occurrence unless replace_all is true."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::Mutating
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new()
            .required("path", ArgKind::String, "the path to the file")
            .required("old_string", ArgKind::String, "the string to find and replace")
            .required("new_string", ArgKind::String, "the replacement string")
            .optional("replace_all", ArgKind::Boolean, "replace every occurrence, defaults to false")
    }

    fn action(&self, arguments: &serde_json::Value) -> Result<Option<ActionRequest>, ToolError> {
        let path = str_arg(self.name(), arguments, "path")?;
        let (old, _) = self.check_strings(arguments)?;
        self.boundary.resolve_for(self.name(), path)?;

        let scope = if arguments["replace_all"].as_bool().unwrap_or(false) {
            "every occurrence"
        } else {
            "the first occurrence"
        };
        Ok(Some(mutation(
            self.name(),
            path,
            format!("replace {scope} of {} bytes in '{path}'", old.len()),
        )))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = str_arg(self.name(), &arguments, "path")?;
        let (old, new) = self.check_strings(&arguments)?;
        let replace_all = arguments["replace_all"].as_bool().unwrap_or(false);
        let resolved = self.boundary.resolve_for(self.name(), path)?;

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("Error reading file: {e}")))?;

        let count = content.matches(old).count();
        if count == 0 {
            return Err(ToolError::failed(self.name(), "old_string not found in content"));
        }

        let (updated, replaced) = if replace_all {
            (content.replace(old, new), count)
        } else {
            (content.replacen(old, new, 1), 1)
        };

        tokio::fs::write(&resolved, updated)
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("Error writing file: {e}")))?;

        Ok(ToolResult::ok(format!("Replaced {replaced} occurrence(s) in {path}")))
    }
}

/// Creates a directory and its parents.
pub struct FsMkdirTool {
    boundary: SandboxBoundary,
}

impl FsMkdirTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }
}

#[async_trait]
impl Tool for FsMkdirTool {
    fn name(&self) -> &str {
        "fs_mkdir"
    }

    fn description(&self) -> &str {
        "Create a directory at the given path, creating parent directories as needed (like mkdir -p)."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::Mutating
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().required("path", ArgKind::String, "the path to the directory to create")
    }

    fn action(&self, arguments: &serde_json::Value) -> Result<Option<ActionRequest>, ToolError> {
        let path = str_arg(self.name(), arguments, "path")?;
        let resolved = self.boundary.resolve_for(self.name(), path)?;
        if resolved.exists() {
            return Err(ToolError::failed(self.name(), format!("path '{path}' already exists")));
        }
        Ok(Some(mutation(self.name(), path, format!("create directory '{path}'"))))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = str_arg(self.name(), &arguments, "path")?;
        let resolved = self.boundary.resolve_for(self.name(), path)?;
        if resolved.exists() {
            return Err(ToolError::failed(self.name(), format!("path '{path}' already exists")));
        }

        tokio::fs::create_dir_all(&resolved)
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("cannot create '{path}': {e}")))?;

        Ok(ToolResult::ok(format!("Successfully created directory at {path}")))
    }
}

/// Removes a file, or a directory tree after dedicated confirmation.
pub struct FsRmTool {
    boundary: SandboxBoundary,
}

impl FsRmTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }

    fn target(&self, arguments: &serde_json::Value) -> Result<(String, std::path::PathBuf), ToolError> {
        let path = str_arg(self.name(), arguments, "path")?;
        let resolved = self.boundary.resolve_for(self.name(), path)?;
        if !resolved.exists() {
            return Err(does_not_exist(self.name(), path));
        }
        if resolved == self.boundary.root() {
            return Err(ToolError::failed(self.name(), "refusing to remove the working directory"));
        }
        Ok((path.to_string(), resolved))
    }
}

#[async_trait]
impl Tool for FsRmTool {
    fn name(&self) -> &str {
        "fs_rm"
    }

    fn description(&self) -> &str {
        "Remove a file or directory at the given path. Directories are deleted recursively after \
         the operator confirms."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::Mutating
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().required("path", ArgKind::String, "the path to the file or directory to remove")
    }

    fn action(&self, arguments: &serde_json::Value) -> Result<Option<ActionRequest>, ToolError> {
        let (path, resolved) = self.target(arguments)?;
        let request = if resolved.is_dir() {
            ActionRequest {
                irreversible: true,
                ..mutation(self.name(), &path, format!("delete directory '{path}' and all its contents"))
            }
        } else {
            mutation(self.name(), &path, format!("delete file '{path}'"))
        };
        Ok(Some(request))
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let (path, resolved) = self.target(&arguments)?;

        if resolved.is_dir() {
            tokio::fs::remove_dir_all(&resolved)
                .await
                .map_err(|e| ToolError::failed(self.name(), format!("cannot delete '{path}': {e}")))?;
            Ok(ToolResult::ok(format!("Successfully deleted directory {path} and all its contents")))
        } else {
            tokio::fs::remove_file(&resolved)
                .await
                .map_err(|e| ToolError::failed(self.name(), format!("cannot delete '{path}': {e}")))?;
            Ok(ToolResult::ok(format!("Successfully deleted file {path}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sandbox() -> (tempfile::TempDir, SandboxBoundary) {
        let dir = tempfile::tempdir().unwrap();
        let boundary = SandboxBoundary::new(dir.path()).unwrap();
        (dir, boundary)
    }

    #[tokio::test]
    async fn write_then_append() {
        let (_dir, b) = sandbox();
        let tool = FsWriteTool::new(b.clone());

        let result = tool
            .execute(json!({"path": "out.txt", "content": "héllo"}))
            .await
            .unwrap();
        assert_eq!(result.output, "Successfully wrote 5 characters to out.txt (mode: w)");

        tool.execute(json!({"path": "out.txt", "content": "!", "mode": "a"}))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(b.root().join("out.txt")).unwrap(), "héllo!");
    }

    #[test]
    fn write_action_describes_effect() {
        let (_dir, b) = sandbox();
        let tool = FsWriteTool::new(b);
        let request = tool
            .action(&json!({"path": "a.txt", "content": "hello"}))
            .unwrap()
            .unwrap();
        assert_eq!(request.scope, "fs_write");
        assert_eq!(request.target, "a.txt");
        assert_eq!(request.description, "write 5 bytes to 'a.txt' (mode: w)");
        assert!(!request.irreversible);
    }

    #[test]
    fn write_outside_fails_before_prompting() {
        let (_dir, b) = sandbox();
        let tool = FsWriteTool::new(b);
        let err = tool
            .action(&json!({"path": "/tmp/outside.txt", "content": "x"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn write_through_dangling_symlink_is_refused() {
        let (_dir, b) = sandbox();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("pwned.txt");
        std::os::unix::fs::symlink(&target, b.root().join("link")).unwrap();
        let tool = FsWriteTool::new(b);

        assert!(matches!(
            tool.action(&json!({"path": "link", "content": "escaped"})),
            Err(ToolError::SandboxViolation { .. })
        ));
        let err = tool
            .execute(json!({"path": "link", "content": "escaped"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SandboxViolation { .. }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn write_rejects_unknown_mode() {
        let (_dir, b) = sandbox();
        let tool = FsWriteTool::new(b);
        let err = tool
            .execute(json!({"path": "a.txt", "content": "x", "mode": "rb"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn replace_first_and_all() {
        let (_dir, b) = sandbox();
        std::fs::write(b.root().join("r.txt"), "a a a").unwrap();
        let tool = FsReplaceTool::new(b.clone());

        let first = tool
            .execute(json!({"path": "r.txt", "old_string": "a", "new_string": "b"}))
            .await
            .unwrap();
        assert_eq!(first.output, "Replaced 1 occurrence(s) in r.txt");
        assert_eq!(std::fs::read_to_string(b.root().join("r.txt")).unwrap(), "b a a");

        let all = tool
            .execute(json!({"path": "r.txt", "old_string": "a", "new_string": "c", "replace_all": true}))
            .await
            .unwrap();
        assert_eq!(all.output, "Replaced 2 occurrence(s) in r.txt");
        assert_eq!(std::fs::read_to_string(b.root().join("r.txt")).unwrap(), "b c c");
    }

    #[tokio::test]
    async fn replace_errors() {
        let (_dir, b) = sandbox();
        std::fs::write(b.root().join("r.txt"), "text").unwrap();
        let tool = FsReplaceTool::new(b);

        let err = tool
            .execute(json!({"path": "r.txt", "old_string": "", "new_string": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("old_string must be a non-empty string"));

        let err = tool
            .execute(json!({"path": "r.txt", "old_string": "x", "new_string": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must be different"));

        let err = tool
            .execute(json!({"path": "r.txt", "old_string": "zzz", "new_string": "y"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_tool_output(), "Error: old_string not found in content");

        let err = tool
            .execute(json!({"path": "missing.txt", "old_string": "a", "new_string": "b"}))
            .await
            .unwrap_err();
        assert!(err.to_tool_output().starts_with("Error: Error reading file"));
    }

    #[tokio::test]
    async fn mkdir_nested_and_existing() {
        let (_dir, b) = sandbox();
        let tool = FsMkdirTool::new(b.clone());

        let result = tool.execute(json!({"path": "a/b/c"})).await.unwrap();
        assert_eq!(result.output, "Successfully created directory at a/b/c");
        assert!(b.root().join("a/b/c").is_dir());

        let err = tool.action(&json!({"path": "a/b"})).unwrap_err();
        assert_eq!(err.to_tool_output(), "Error: path 'a/b' already exists");
    }

    #[tokio::test]
    async fn rm_file_and_directory() {
        let (_dir, b) = sandbox();
        std::fs::write(b.root().join("f.txt"), "x").unwrap();
        std::fs::create_dir_all(b.root().join("d/inner")).unwrap();
        let tool = FsRmTool::new(b.clone());

        let file_request = tool.action(&json!({"path": "f.txt"})).unwrap().unwrap();
        assert!(!file_request.irreversible);
        let result = tool.execute(json!({"path": "f.txt"})).await.unwrap();
        assert_eq!(result.output, "Successfully deleted file f.txt");

        let dir_request = tool.action(&json!({"path": "d"})).unwrap().unwrap();
        assert!(dir_request.irreversible);
        let result = tool.execute(json!({"path": "d"})).await.unwrap();
        assert_eq!(result.output, "Successfully deleted directory d and all its contents");
        assert!(!b.root().join("d").exists());
    }

    #[test]
    fn rm_refuses_missing_and_root() {
        let (_dir, b) = sandbox();
        let tool = FsRmTool::new(b);
        assert!(tool.action(&json!({"path": "ghost"})).is_err());
        assert!(tool.action(&json!({"path": "."})).is_err());
    }
}
