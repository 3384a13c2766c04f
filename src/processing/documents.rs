//! Document loading from a downloaded zip bundle or a local directory.

use super::types::{Document, DocumentError};
use std::io::{Cursor, Read};
use std::path::Path;
use walkdir::WalkDir;
use zip::ZipArchive;

const DOCUMENT_EXTENSION: &str = ".txt";

/// Extract `.txt` entries from a zip archive held in memory, in archive order.
///
/// Directory entries and files with any other extension are skipped.
pub fn extract_documents(archive_bytes: &[u8]) -> Result<Vec<Document>, DocumentError> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut documents = Vec::new();

    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        if entry.is_dir() || !entry.name().ends_with(DOCUMENT_EXTENSION) {
            continue;
        }

        let name = entry.name().to_string();
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|source| DocumentError::Read {
                name: name.clone(),
                source,
            })?;
        tracing::info!(document = %name, bytes = content.len(), "Extracted document");
        documents.push(Document::new(name, content));
    }

    if documents.is_empty() {
        tracing::warn!("No text documents found in the archive");
    }
    Ok(documents)
}

/// Load every `.txt` file under `root`, sorted by path so repeated runs index identically.
///
/// Document identifiers are paths relative to `root`.
pub fn load_directory(root: &Path) -> Result<Vec<Document>, DocumentError> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.to_str() else {
            tracing::warn!(path = ?path, "Skipping document with non UTF-8 path");
            continue;
        };
        if !name.ends_with(DOCUMENT_EXTENSION) {
            continue;
        }

        let id = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
            name: id.clone(),
            source,
        })?;
        tracing::info!(document = %id, bytes = content.len(), "Loaded document");
        documents.push(Document::new(id, content));
    }

    if documents.is_empty() {
        tracing::warn!(root = %root.display(), "No text documents found in directory");
    }
    Ok(documents)
}
