//! Directory traversal for plain-text corpora: one document per file, the
//! file name is the document ID.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::DocIdConvention;
use crate::index::{CorpusIndex, DocId, Indexer};
use crate::tokenizer::{Normalizer, Stem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub id: DocId,
    pub path: PathBuf,
}

/// Recursively list the document files under `root` in file-name order.
/// Files whose name does not follow `convention` are logged and skipped.
pub fn discover_documents(root: &Path, convention: &DocIdConvention) -> Result<Vec<DocumentFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking corpus at {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !convention.accepts(&name) {
            tracing::warn!(file = %entry.path().display(), %convention, "file name is not a valid document id, skipping");
            continue;
        }
        files.push(DocumentFile { id: name.into_owned(), path: entry.path().to_path_buf() });
    }
    Ok(files)
}

/// Build a [`CorpusIndex`] over every conforming document under `root`.
pub fn index_corpus<S: Stem>(root: &Path, convention: &DocIdConvention, normalizer: Normalizer<S>) -> Result<CorpusIndex> {
    let files = discover_documents(root, convention)?;
    tracing::info!(root = %root.display(), files = files.len(), "indexing corpus");

    let mut indexer = Indexer::new(normalizer);
    for file in &files {
        let bytes = fs::read(&file.path).with_context(|| format!("reading document {}", file.path.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        indexer.add_document(&file.id, &text);
        if indexer.num_docs() % 1000 == 0 {
            tracing::debug!(indexed = indexer.num_docs(), "progress");
        }
    }
    Ok(indexer.finish())
}
