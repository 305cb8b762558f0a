//! The cross-mode notes view: every favorited question with its memo,
//! deduplicated and filterable.

use std::collections::HashSet;
use std::sync::Arc;

use exam_core::model::{FavoriteColor, NoteEntry, SessionMode, UserId};
use remote::FavoriteStore;

use crate::error::FetchError;

/// Filters applied to the aggregated notes list. Empty fields pass
/// everything.
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub exam_year: Option<i32>,
    pub subject_code: Option<String>,
    pub color: Option<FavoriteColor>,
    pub source: Option<SessionMode>,
    /// Case-insensitive substring match against the memo.
    pub memo_search: Option<String>,
}

/// Builds the notes view from the remote favorite rows.
#[derive(Clone)]
pub struct NotesAggregator {
    favorites: Arc<dyn FavoriteStore>,
    user: UserId,
}

impl NotesAggregator {
    #[must_use]
    pub fn new(favorites: Arc<dyn FavoriteStore>, user: UserId) -> Self {
        Self { favorites, user }
    }

    /// Fetch, deduplicate, and filter the user's notes. Year and subject
    /// filters are pushed down to the remote query; the rest apply
    /// locally after deduplication.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the remote listing fails.
    pub async fn list(&self, filter: &NoteFilter) -> Result<Vec<NoteEntry>, FetchError> {
        let entries = self
            .favorites
            .list_favorites(&self.user, filter.exam_year, filter.subject_code.as_deref())
            .await?;
        let deduped = dedup_notes(entries);
        Ok(deduped
            .into_iter()
            .filter(|entry| matches_filter(entry, filter))
            .collect())
    }
}

/// Drop repeated rows for the same (year, subject, question, source),
/// keeping the first occurrence.
#[must_use]
pub fn dedup_notes(entries: Vec<NoteEntry>) -> Vec<NoteEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            seen.insert((
                entry.exam_year,
                entry.subject_code.clone(),
                entry.question_no,
                entry.source,
            ))
        })
        .collect()
}

#[must_use]
pub fn matches_filter(entry: &NoteEntry, filter: &NoteFilter) -> bool {
    if filter.color.is_some_and(|color| entry.color != color) {
        return false;
    }
    if filter.source.is_some_and(|source| entry.source != source) {
        return false;
    }
    if let Some(search) = &filter.memo_search {
        let search = search.to_lowercase();
        if !search.is_empty() && !entry.memo.to_lowercase().contains(&search) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(question_no: u32, source: SessionMode, memo: &str) -> NoteEntry {
        NoteEntry {
            exam_year: 2021,
            subject_code: "TAX".into(),
            subject_name: "Tax Law".into(),
            question_no,
            color: FavoriteColor::Red,
            memo: memo.into(),
            tags: vec!["favorite".into(), "red".into()],
            source,
        }
    }

    #[test]
    fn dedup_keeps_the_first_row_per_identity() {
        let deduped = dedup_notes(vec![
            note(1, SessionMode::Mock, "first"),
            note(1, SessionMode::Mock, "second"),
            note(1, SessionMode::Ox, "different source survives"),
        ]);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].memo, "first");
        assert_eq!(deduped[1].source, SessionMode::Ox);
    }

    #[test]
    fn memo_search_is_case_insensitive() {
        let entry = note(1, SessionMode::Mock, "Check Article 42");
        let filter = NoteFilter {
            memo_search: Some("article".into()),
            ..NoteFilter::default()
        };
        assert!(matches_filter(&entry, &filter));

        let filter = NoteFilter {
            memo_search: Some("annex".into()),
            ..NoteFilter::default()
        };
        assert!(!matches_filter(&entry, &filter));
    }

    #[test]
    fn source_and_color_filters_apply() {
        let entry = note(1, SessionMode::Ox, "");
        let filter = NoteFilter {
            source: Some(SessionMode::Mock),
            ..NoteFilter::default()
        };
        assert!(!matches_filter(&entry, &filter));

        let filter = NoteFilter {
            color: Some(FavoriteColor::Red),
            source: Some(SessionMode::Ox),
            ..NoteFilter::default()
        };
        assert!(matches_filter(&entry, &filter));
    }
}
