//! The grounding store: a course's passages, loaded once and searched many
//! times.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use quizzer_core::error::QuizError;
use quizzer_core::model::Passage;
use quizzer_core::traits::PassageSource;

use crate::extract::extract_pdf_pages;

/// An immutable, page-indexed view of one course's note files.
#[derive(Debug)]
pub struct GroundingStore {
    course: String,
    passages: Vec<Passage>,
}

impl GroundingStore {
    /// Load every PDF under `notes_dir`.
    ///
    /// A file that fails to parse is logged and skipped; the load only fails
    /// with `DocumentUnavailable` when no passage at all could be extracted.
    pub fn load(course_id: &str, notes_dir: &Path) -> Result<Self, QuizError> {
        let mut files: Vec<PathBuf> = match std::fs::read_dir(notes_dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| {
                    path.extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
                })
                .collect(),
            Err(e) => {
                warn!("cannot read notes directory {}: {e}", notes_dir.display());
                Vec::new()
            }
        };
        files.sort();

        let mut passages = Vec::new();
        let mut parsed_files = 0usize;
        for path in &files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match extract_pdf_pages(path) {
                Ok(pages) => {
                    parsed_files += 1;
                    passages.extend(pages.into_iter().map(|(page, text)| Passage {
                        source_file: file_name.clone(),
                        page,
                        text,
                    }));
                }
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }

        if passages.is_empty() {
            return Err(QuizError::DocumentUnavailable(course_id.to_string()));
        }

        info!(
            "loaded {} passages from {parsed_files} file(s) for course '{course_id}'",
            passages.len()
        );
        Ok(Self::from_passages(course_id, passages))
    }

    /// Build a store from already-extracted passages.
    pub fn from_passages(course_id: &str, mut passages: Vec<Passage>) -> Self {
        // Canonical (file, page) order; search tie-breaking relies on it.
        passages.sort_by(|a, b| {
            a.source_file
                .cmp(&b.source_file)
                .then(a.page.cmp(&b.page))
        });
        Self {
            course: course_id.to_string(),
            passages,
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

impl PassageSource for GroundingStore {
    fn course(&self) -> &str {
        &self.course
    }

    fn passages(&self) -> &[Passage] {
        &self.passages
    }

    fn search(&self, query: &str, top_k: usize) -> Vec<&Passage> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|t| t.to_string())
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &Passage)> = self
            .passages
            .iter()
            .filter_map(|passage| {
                let text = passage.text.to_lowercase();
                let score = terms.iter().filter(|term| text.contains(term.as_str())).count();
                (score > 0).then_some((score, passage))
            })
            .collect();

        // Stable sort: ties keep the canonical (file, page) order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(top_k).map(|(_, p)| p).collect()
    }
}
