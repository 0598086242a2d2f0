//! Read-only filesystem tools: `fs_pwd`, `fs_stat`, `fs_read`, `fs_list`.
//!
//! All paths go through the [`SandboxBoundary`]; reads outside the working
//! directory are refused just like writes.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use actor_core::error::ToolError;
use actor_core::tool::{ArgKind, ArgSchema, RiskClass, Tool, ToolResult};
use actor_security::SandboxBoundary;
use async_trait::async_trait;

/// Returns the working directory.
pub struct FsPwdTool {
    boundary: SandboxBoundary,
}

impl FsPwdTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }
}

#[async_trait]
impl Tool for FsPwdTool {
    fn name(&self) -> &str {
        "fs_pwd"
    }

    fn description(&self) -> &str {
        "Get the current working directory. Returns its absolute path."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::ReadOnly
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new()
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(self.boundary.root().display().to_string()))
    }
}

/// Size, timestamps, type and permissions of one path.
pub struct FsStatTool {
    boundary: SandboxBoundary,
}

impl FsStatTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }
}

#[async_trait]
impl Tool for FsStatTool {
    fn name(&self) -> &str {
        "fs_stat"
    }

    fn description(&self) -> &str {
        "Get information about a file or directory. Returns size, created, modified and accessed \
         times, type ('f', 'd' or 'l') and permissions."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::ReadOnly
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().required("path", ArgKind::String, "the path to the file or directory")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = str_arg(self.name(), &arguments, "path")?;
        let resolved = self.boundary.resolve_for(self.name(), path)?;

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|_| does_not_exist(self.name(), path))?;

        let lines = [
            format!("size: {}", metadata.len()),
            format!("created: {}", epoch_secs(metadata.created().ok())),
            format!("modified: {}", epoch_secs(metadata.modified().ok())),
            format!("accessed: {}", epoch_secs(metadata.accessed().ok())),
            format!("type: {}", type_char(&metadata, false)),
            format!("permissions: {}", permission_bits(&metadata)),
        ];

        Ok(ToolResult::ok(lines.join("\n")))
    }
}

/// Reads a line range from a text file.
pub struct FsReadTool {
    boundary: SandboxBoundary,
}

impl FsReadTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }
}

#[async_trait]
impl Tool for FsReadTool {
    fn name(&self) -> &str {
        "fs_read"
    }

    fn description(&self) -> &str {
        "Read lines from a file. start and end are inclusive line indices from 0; both may be \
         negative to count from the end, where -1 is the last line. Returns the lines as read."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::ReadOnly
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new()
            .required("path", ArgKind::String, "the path to the file")
            .optional("start", ArgKind::Integer, "the line to start from (inclusive), defaults to 0")
            .optional("end", ArgKind::Integer, "the line to end at (inclusive), defaults to -1 (last line)")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = str_arg(self.name(), &arguments, "path")?;
        let start = arguments["start"].as_i64().unwrap_or(0);
        let end = arguments["end"].as_i64().unwrap_or(-1);

        let resolved = self.boundary.resolve_for(self.name(), path)?;
        if !resolved.exists() {
            return Err(does_not_exist(self.name(), path));
        }
        if !resolved.is_file() {
            return Err(ToolError::failed(self.name(), format!("path '{path}' is not a file")));
        }

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("cannot read '{path}': {e}")))?;

        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let (lo, hi) = line_range(lines.len(), start, end);
        Ok(ToolResult::ok(lines[lo..hi].concat()))
    }
}

/// Lists a directory as a fixed-width table.
pub struct FsListTool {
    boundary: SandboxBoundary,
}

impl FsListTool {
    pub fn new(boundary: SandboxBoundary) -> Self {
        Self { boundary }
    }
}

#[async_trait]
impl Tool for FsListTool {
    fn name(&self) -> &str {
        "fs_list"
    }

    fn description(&self) -> &str {
        "List files and directories in the given directory. Returns a table with columns: size, \
         type ('f', 'd' or 'l'), and name."
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::ReadOnly
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().optional(
            "path",
            ArgKind::String,
            "the directory to list, defaults to the working directory",
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = arguments["path"].as_str().unwrap_or(".");
        let resolved = self.boundary.resolve_for(self.name(), path)?;

        if !resolved.exists() {
            return Err(does_not_exist(self.name(), path));
        }
        if !resolved.is_dir() {
            return Err(ToolError::failed(self.name(), format!("path '{path}' is not a directory")));
        }

        let mut dir = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("cannot list '{path}': {e}")))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("cannot list '{path}': {e}")))?
        {
            // Broken symlinks and unreadable entries are skipped.
            let Ok(metadata) = tokio::fs::metadata(entry.path()).await else {
                continue;
            };
            let is_link = entry.file_type().await.is_ok_and(|t| t.is_symlink());
            entries.push((
                entry.file_name().to_string_lossy().into_owned(),
                metadata.len(),
                type_char(&metadata, is_link),
            ));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let lines: Vec<String> = entries
            .iter()
            .map(|(name, size, kind)| format!("{size:>12}  {kind}  {name:<50}"))
            .collect();

        Ok(ToolResult::ok(lines.join("\n")))
    }
}

pub(crate) fn str_arg<'a>(
    tool: &str,
    arguments: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, ToolError> {
    arguments[field]
        .as_str()
        .ok_or_else(|| ToolError::invalid(tool, format!("missing required field '{field}'")))
}

pub(crate) fn does_not_exist(tool: &str, path: &str) -> ToolError {
    ToolError::failed(tool, format!("path '{path}' does not exist"))
}

/// Half-open index range for an inclusive `start..=end` line selection,
/// where negative indices count from the end.
fn line_range(len: usize, start: i64, end: i64) -> (usize, usize) {
    let len_i = len as i64;
    let clamp = |i: i64| -> usize {
        let i = if i < 0 { i + len_i } else { i };
        i.clamp(0, len_i) as usize
    };

    let lo = clamp(start);
    let hi = if end == -1 {
        len
    } else if end < -1 {
        clamp(len_i + 1 + end)
    } else {
        clamp(end.saturating_add(1))
    };

    (lo, hi.max(lo))
}

fn epoch_secs(time: Option<SystemTime>) -> String {
    match time.and_then(|t| t.duration_since(UNIX_EPOCH).ok()) {
        Some(d) => d.as_secs_f64().to_string(),
        None => "None".into(),
    }
}

fn type_char(metadata: &std::fs::Metadata, is_link: bool) -> char {
    if is_link {
        'l'
    } else if metadata.is_dir() {
        'd'
    } else if metadata.is_file() {
        'f'
    } else {
        '?'
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:03o}", metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permission_bits(metadata: &std::fs::Metadata) -> String {
    let bits = if metadata.permissions().readonly() { "444" } else { "666" };
    bits.into()
}

/// Display form of a resolved path relative to the working directory.
pub(crate) fn relative_display(boundary: &SandboxBoundary, path: &Path) -> String {
    path.strip_prefix(boundary.root())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}
