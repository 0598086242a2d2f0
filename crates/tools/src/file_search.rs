//! `fs_search`: regex search over a file or a directory tree.

use std::path::{Path, PathBuf};

use actor_core::error::ToolError;
use actor_core::tool::{ArgKind, ArgSchema, RiskClass, Tool, ToolResult};
use actor_security::SandboxBoundary;
use async_trait::async_trait;
use ignore::WalkBuilder;
use regex::Regex;
use tracing::debug;

use crate::file_read::{does_not_exist, relative_display, str_arg};

pub struct FsSearchTool {
    boundary: SandboxBoundary,
}

impl FsSearchTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }
}

#[async_trait]
impl Tool for FsSearchTool {
    fn name(&self) -> &str {
        "fs_search"
    }

    fn description(&self) -> &str {
        "Search files for a regex pattern in the provided path. Returns matching lines in \
         <file>:<line>:<content> format."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::ReadOnly
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new()
            .required("path", ArgKind::String, "the file or directory to search in")
            .required("pattern", ArgKind::String, "the regex pattern to search for")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = str_arg(self.name(), &arguments, "path")?;
        let pattern = str_arg(self.name(), &arguments, "pattern")?;

        let regex = Regex::new(pattern)
            .map_err(|e| ToolError::invalid(self.name(), format!("invalid pattern: {e}")))?;

        let resolved = self.boundary.resolve_for(self.name(), path)?;
        if !resolved.exists() {
            return Err(does_not_exist(self.name(), path));
        }

        let boundary = self.boundary.clone();
        let output = tokio::task::spawn_blocking(move || search(&boundary, &resolved, &regex))
            .await
            .map_err(|e| ToolError::failed("fs_search", format!("search task failed: {e}")))?;

        Ok(ToolResult::ok(output))
    }
}

fn search(boundary: &SandboxBoundary, root: &Path, regex: &Regex) -> String {
    let mut files = Vec::new();
    collect_files(root, &mut files);
    files.sort();

    let mut out = String::new();
    for file in files {
        // Non-UTF-8 and unreadable files are skipped.
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let display = relative_display(boundary, &file);
        for (index, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                out.push_str(&format!("{display}:{}:{line}\n", index + 1));
            }
        }
    }
    out
}

/// Files under `path` in walk order. Hidden entries and anything matched by
/// `.gitignore` are skipped; symlinks are not followed.
fn collect_files(path: &Path, files: &mut Vec<PathBuf>) {
    let mut builder = WalkBuilder::new(path);
    builder.hidden(true);
    builder.follow_links(false);
    builder.git_ignore(true);
    builder.git_exclude(true);
    builder.require_git(false);

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_some_and(|t| t.is_file()) {
            files.push(entry.into_path());
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
    async fn search_directory_recursively() {
        let (_dir, b) = sandbox();
        std::fs::create_dir_all(b.root().join("src/nested")).unwrap();
        std::fs::write(b.root().join("src/main.rs"), "fn main() {\n    todo!()\n}\n").unwrap();
        std::fs::write(b.root().join("src/nested/lib.rs"), "pub fn helper() {}\n").unwrap();
        std::fs::write(b.root().join(".hidden"), "fn secret() {}\n").unwrap();

        let tool = FsSearchTool::new(b);
        let result = tool.execute(json!({"path": ".", "pattern": r"fn \w+\("})).await.unwrap();

        assert_eq!(
            result.output,
            "src/main.rs:1:fn main() {\nsrc/nested/lib.rs:1:pub fn helper() {}\n"
        );
    }

    #[tokio::test]
    async fn search_honours_gitignore() {
        let (_dir, b) = sandbox();
        std::fs::write(b.root().join(".gitignore"), "target/\n").unwrap();
        std::fs::create_dir(b.root().join("target")).unwrap();
        std::fs::write(b.root().join("target/gen.rs"), "needle\n").unwrap();
        std::fs::write(b.root().join("src.rs"), "needle\n").unwrap();
        let tool = FsSearchTool::new(b);

        let result = tool.execute(json!({"path": ".", "pattern": "needle"})).await.unwrap();
        assert_eq!(result.output, "src.rs:1:needle\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn search_does_not_follow_symlinked_directories() {
        let (_dir, b) = sandbox();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "needle\n").unwrap();
        std::os::unix::fs::symlink(outside.path(), b.root().join("elsewhere")).unwrap();
        let tool = FsSearchTool::new(b);

        let result = tool.execute(json!({"path": ".", "pattern": "needle"})).await.unwrap();
        assert_eq!(result.output, "");
    }

    #[tokio::test]
    async fn search_single_file_without_matches() {
        let (_dir, b) = sandbox();
        std::fs::write(b.root().join("notes.md"), "nothing here\n").unwrap();
        let tool = FsSearchTool::new(b);

        let result = tool.execute(json!({"path": "notes.md", "pattern": "TODO"})).await.unwrap();
        assert_eq!(result.output, "");
    }

    #[tokio::test]
    async fn invalid_regex_is_invalid_arguments() {
        let (_dir, b) = sandbox();
        let tool = FsSearchTool::new(b);
        let err = tool.execute(json!({"path": ".", "pattern": "("})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn search_skips_binary_files() {
        let (_dir, b) = sandbox();
        std::fs::write(b.root().join("blob.bin"), [0xff, 0xfe, b'x', b'\n']).unwrap();
        std::fs::write(b.root().join("text.txt"), "x marks\n").unwrap();
        let tool = FsSearchTool::new(b);

        let result = tool.execute(json!({"path": ".", "pattern": "x"})).await.unwrap();
        assert_eq!(result.output, "text.txt:1:x marks\n");
    }
}
