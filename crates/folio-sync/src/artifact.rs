//! Generated files handed to the page tree builder.

use std::fs;
use std::io;
use std::path::Path;

/// A generated file: slash-delimited path relative to the output root plus its bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileArtifact {
    /// Relative path (e.g., "guide/index.html").
    pub path: String,
    /// Raw file content.
    pub content: Vec<u8>,
}

impl FileArtifact {
    /// Create an artifact from a relative path and content.
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Read every file under `directory` into artifacts, sorted by path.
///
/// Paths are relative to `directory` and always use `/` as separator.
pub fn collect_artifacts(directory: &Path) -> Result<Vec<FileArtifact>, io::Error> {
    let mut artifacts = Vec::new();
    walk_dir(directory, directory, &mut artifacts)?;
    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(artifacts)
}

fn walk_dir(base: &Path, current: &Path, artifacts: &mut Vec<FileArtifact>) -> io::Result<()> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(base, &path, artifacts)?;
        } else {
            let relative = path
                .strip_prefix(base)
                .map_err(io::Error::other)?
                .to_string_lossy()
                .replace('\\', "/");
            artifacts.push(FileArtifact::new(relative, fs::read(&path)?));
        }
    }
    Ok(())
}
