//! Path validation: filesystem sandboxing to the working directory.
//!
//! A [`SandboxBoundary`] is fixed at process start and threaded into every
//! filesystem tool. Paths are resolved to canonical absolute form (symlinks
//! and `..` segments resolved) before the prefix check, so neither
//! `../escape.txt` nor a symlink pointing outside can slip through.

use std::path::{Component, Path, PathBuf};

use actor_core::ToolError;

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("path '{path}' is outside working directory '{}'", root.display())]
    OutsideBoundary { path: String, root: PathBuf },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

impl PathValidationError {
    /// Tool-local form of this error, attributed to `tool`.
    pub fn into_tool_error(self, tool: &str) -> ToolError {
        match self {
            Self::OutsideBoundary { path, root } => ToolError::SandboxViolation { path, root },
            Self::PathTraversal { path } => ToolError::InvalidArguments {
                tool: tool.into(),
                reason: format!("path '{path}' contains '..' below a missing directory"),
            },
            other => ToolError::failed(tool, other.to_string()),
        }
    }
}

/// The working directory every filesystem operation is confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxBoundary {
    root: PathBuf,
}

impl SandboxBoundary {
    /// Establish a boundary at `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PathValidationError> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|e| PathValidationError::CanonicalizeFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        if !canonical.is_dir() {
            return Err(PathValidationError::CanonicalizeFailed {
                path: root.display().to_string(),
                reason: "not a directory".into(),
            });
        }

        Ok(Self { root: canonical })
    }

    /// Boundary at the process's current directory.
    pub fn current_dir() -> Result<Self, PathValidationError> {
        let cwd = std::env::current_dir().map_err(|e| PathValidationError::CanonicalizeFailed {
            path: ".".into(),
            reason: e.to_string(),
        })?;
        Self::new(cwd)
    }

    /// The canonical working directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` to a canonical absolute path inside the boundary.
    ///
    /// Relative paths are joined to the working directory. For a target that
    /// does not exist yet, the deepest existing ancestor is canonicalized and
    /// the remaining components appended; a `..` among them is rejected.
    /// A dangling symlink among the appended components is followed to its
    /// target, which is then resolved the same way.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathValidationError> {
        let input = Path::new(path);
        let absolute = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };

        let canonical = resolve_lenient(path, absolute, 0)?;

        if !canonical.starts_with(&self.root) {
            tracing::warn!(path, root = %self.root.display(), "Path escapes sandbox boundary");
            return Err(PathValidationError::OutsideBoundary {
                path: path.into(),
                root: self.root.clone(),
            });
        }

        Ok(canonical)
    }

    /// [`SandboxBoundary::resolve`] with the error already in tool-local form.
    pub fn resolve_for(&self, tool: &str, path: &str) -> Result<PathBuf, ToolError> {
        self.resolve(path).map_err(|e| e.into_tool_error(tool))
    }
}

/// Symlink hops followed before giving up, matching the kernel's `ELOOP` limit.
const MAX_SYMLINK_HOPS: usize = 40;

/// Canonicalize `absolute`, tolerating a missing tail.
fn resolve_lenient(path: &str, absolute: PathBuf, hops: usize) -> Result<PathBuf, PathValidationError> {
    let components: Vec<Component<'_>> = absolute.components().collect();

    // Find the longest prefix that exists on disk.
    let mut resolved = None;
    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        if let Ok(canonical) = prefix.canonicalize() {
            resolved = Some((canonical, split));
            break;
        }
    }

    let (mut canonical, split) = resolved.ok_or_else(|| PathValidationError::CanonicalizeFailed {
        path: path.into(),
        reason: "no existing ancestor".into(),
    })?;

    for (index, component) in components.iter().enumerate().skip(split) {
        match component {
            Component::Normal(name) => canonical.push(name),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => continue,
            Component::ParentDir => {
                return Err(PathValidationError::PathTraversal { path: path.into() });
            }
        }

        let is_link = std::fs::symlink_metadata(&canonical)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            continue;
        }

        if hops >= MAX_SYMLINK_HOPS {
            return Err(PathValidationError::CanonicalizeFailed {
                path: path.into(),
                reason: "too many levels of symbolic links".into(),
            });
        }
        let target = std::fs::read_link(&canonical).map_err(|e| PathValidationError::CanonicalizeFailed {
            path: path.into(),
            reason: e.to_string(),
        })?;
        let mut next = match canonical.parent() {
            Some(parent) => parent.join(target),
            None => target,
        };
        next.extend(components[index + 1..].iter());
        return resolve_lenient(path, next, hops + 1);
    }

    Ok(canonical)
}
