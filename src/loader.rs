//! Corpus loader.
//!
//! Walks the corpus directory and turns each matching file into a sequence
//! of page-level [`Document`]s. PDF text is extracted with `pdf-extract`;
//! markdown and plain text are read as-is. Form feeds (`\x0c`) mark page
//! breaks; a file without them is a single unit. Files are visited in
//! sorted path order so loading is deterministic.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{CasebookError, Result};
use crate::models::Document;

/// Page separator within extracted text.
const PAGE_BREAK: char = '\x0c';

pub fn load_documents(config: &Config) -> Result<Vec<Document>> {
    let root = &config.corpus.dir;
    if !root.is_dir() {
        return Err(CasebookError::Configuration(format!(
            "corpus directory does not exist: {}",
            root.display()
        )));
    }

    let include_set = build_globset(&config.corpus.include_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            CasebookError::Configuration(format!("failed to scan corpus directory: {}", e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();
        if include_set.is_match(&rel) {
            files.push((entry.path().to_path_buf(), rel));
        }
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.1.cmp(&b.1));

    let mut documents = Vec::new();
    for (path, rel) in files {
        match read_file_text(&path) {
            Ok(text) => documents.extend(split_pages(&rel, &text)),
            Err(e) => {
                // Unreadable file: skip it rather than failing the run.
                eprintln!("warning: skipping {}: {}", rel, e);
            }
        }
    }

    Ok(documents)
}

fn read_file_text(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        pdf_extract::extract_text(path)
            .map_err(|e| CasebookError::Configuration(format!("PDF extraction failed: {}", e)))
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| CasebookError::Configuration(e.to_string()))
    }
}

/// Split extracted text into 1-based pages on form feeds, dropping blank
/// pages. Page numbers count every page break so numbering stays aligned
/// with the source even when a blank page is skipped.
fn split_pages(source: &str, text: &str) -> Vec<Document> {
    text.split(PAGE_BREAK)
        .enumerate()
        .filter(|(_, page_text)| !page_text.trim().is_empty())
        .map(|(i, page_text)| Document {
            source: source.to_string(),
            page: i as i64 + 1,
            text: page_text.trim().to_string(),
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            CasebookError::Configuration(format!("invalid corpus glob '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CasebookError::Configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_single_unit() {
        let docs = split_pages("manual.txt", "Only one page here.");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page, 1);
        assert_eq!(docs[0].source, "manual.txt");
    }

    #[test]
    fn test_split_pages_form_feeds() {
        let docs = split_pages("manual.txt", "Page one.\x0cPage two.\x0cPage three.");
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].page, 1);
        assert_eq!(docs[2].page, 3);
        assert_eq!(docs[1].text, "Page two.");
    }

    #[test]
    fn test_split_pages_keeps_numbering_over_blank_pages() {
        let docs = split_pages("manual.txt", "First.\x0c \x0cThird.");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].page, 1);
        assert_eq!(docs[1].page, 3);
    }

    #[test]
    fn test_missing_corpus_dir_is_configuration_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config_text = format!(
            r#"
[corpus]
dir = "{}/no-such-dir"

[index]
dir = "{}/index"

[chunking]
"#,
            tmp.path().display(),
            tmp.path().display()
        );
        let config: Config = toml::from_str(&config_text).unwrap();
        let err = load_documents(&config).unwrap_err();
        assert!(matches!(err, CasebookError::Configuration(_)));
    }

    #[test]
    fn test_loads_text_files_in_sorted_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("docs");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("beta.txt"), "Beta manual.").unwrap();
        std::fs::write(dir.join("alpha.md"), "Alpha manual.").unwrap();
        std::fs::write(dir.join("ignored.bin"), "nope").unwrap();

        let config_text = format!(
            r#"
[corpus]
dir = "{}"

[index]
dir = "{}/index"

[chunking]
"#,
            dir.display(),
            tmp.path().display()
        );
        let config: Config = toml::from_str(&config_text).unwrap();
        let docs = load_documents(&config).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].source, "alpha.md");
        assert_eq!(docs[1].source, "beta.txt");
    }
}
