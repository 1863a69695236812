use crate::types::ContentDigest;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source tree: {0}")]
    Io(#[from] std::io::Error),
    #[error("source path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("non-UTF-8 path in source tree: {0}")]
    NonUtf8Path(PathBuf),
}

/// A stable content reference to a package's source tree.
///
/// The digest normally comes from an external hasher; callers with none can
/// use [`hash_source_tree`]. Plans only ever consume the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    digest: ContentDigest,
}

impl SourceRef {
    pub fn from_digest(digest: ContentDigest) -> Self {
        Self { digest }
    }

    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }
}

/// Hash a source directory into a [`SourceRef`].
///
/// Files are visited in sorted relative-path order and hashed as
/// `(relative path, contents)` pairs with domain prefixes, so the digest
/// depends only on tree content, never on directory iteration order.
pub fn hash_source_tree(root: impl AsRef<Path>) -> Result<SourceRef, SourceError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(SourceError::NotADirectory(root.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();

    let mut hasher = blake3::Hasher::new();
    for relative in &files {
        hasher.update(format!("path:{relative}").as_bytes());
        let data = fs::read(root.join(relative))?;
        hasher.update(b"data:");
        hasher.update(&data);
    }

    Ok(SourceRef {
        digest: ContentDigest::new(hasher.finalize().to_hex().to_string()),
    })
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), SourceError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_str()
                .ok_or_else(|| SourceError::NonUtf8Path(path.clone()))?
                .replace(std::path::MAIN_SEPARATOR, "/");
            out.push(relative);
        }
    }
    Ok(())
}
