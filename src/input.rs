//! Finding index files and their raw text on disk.
//!
//! Paths given on the command line are either index files, used as is, or directories scanned
//! recursively for files carrying an index suffix. Each index is paired with the raw text that
//! shares its stem, e.g. `report.nodes.json` with `report.txt`.

use crate::error::LoadError;
use crate::formats::{self, json::JsonIndex, markdown::MarkdownOutline, Format};
use crate::pipeline::DocumentInput;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
/// An index file and the text it describes.
pub struct DocumentPair {
    /// The table of contents.
    pub index: PathBuf,
    /// The extracted text.
    pub text: PathBuf,
}

fn index_suffixes() -> [&'static str; 2] {
    [JsonIndex.file_suffix(), MarkdownOutline.file_suffix()]
}

fn has_index_suffix(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .is_some_and(|name| index_suffixes().iter().any(|suffix| name.ends_with(suffix)))
}

/// Collects index files from `paths`, scanning directories recursively, in sorted order.
///
/// # Errors
///
/// Returns an error if a path does not exist or a directory cannot be read.
pub fn find_indexes(paths: Vec<PathBuf>) -> io::Result<Vec<PathBuf>> {
    let mut indexes = Vec::new();
    for path in paths {
        if path.is_dir() {
            scan(&path, &mut indexes)?;
        } else if path.exists() {
            indexes.push(path);
        } else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }
    }
    Ok(indexes)
}

fn scan(dir: &Path, found: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            scan(&path, found)?;
        } else if has_index_suffix(&path) {
            found.push(path);
        }
    }
    Ok(())
}

#[must_use]
/// The index's file name with its index suffix (or plain extension) removed.
pub fn document_stem(index: &Path) -> String {
    let name = index
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in index_suffixes() {
        let cut = name.len().saturating_sub(suffix.len());
        if name
            .get(cut..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
        {
            return name[..cut].to_string();
        }
    }
    index
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name)
}

#[must_use]
/// First existing sibling of `index` named `<stem>.<ext>` for the given extensions.
pub fn sibling_text(index: &Path, extensions: &[String]) -> Option<PathBuf> {
    let stem = document_stem(index);
    let dir = index.parent().unwrap_or_else(|| Path::new(""));
    extensions
        .iter()
        .map(|ext| dir.join(format!("{stem}.{}", ext.trim_start_matches('.'))))
        .find(|candidate| candidate != index && candidate.is_file())
}

/// Pairs every index with its text, or with `text` when one is given explicitly.
///
/// # Errors
///
/// Returns an error naming the first index without a text file.
pub fn pair_documents(
    indexes: Vec<PathBuf>,
    text: Option<&Path>,
    extensions: &[String],
) -> io::Result<Vec<DocumentPair>> {
    indexes
        .into_iter()
        .map(|index| {
            let text = match text {
                Some(text) => text.to_path_buf(),
                None => sibling_text(&index, extensions).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!(
                            "no raw text next to {} (tried extensions {extensions:?})",
                            index.display()
                        ),
                    )
                })?,
            };
            Ok(DocumentPair { index, text })
        })
        .collect()
}

/// Reads both files of a pair.
///
/// # Errors
///
/// Returns an error if either file cannot be read or the index cannot be parsed.
pub fn read_document(pair: &DocumentPair) -> Result<DocumentInput, LoadError> {
    let source = fs::read_to_string(&pair.index)?;
    let headings = formats::for_path(&pair.index).parse_index(&source)?;
    let raw_text = fs::read_to_string(&pair.text)?;
    Ok(DocumentInput {
        name: document_stem(&pair.index),
        headings,
        raw_text,
    })
}

#[cfg(test)]
#[path = "tests/input.rs"]
mod tests;
