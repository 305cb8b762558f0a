//! Per-user favorites and memos, cached locally and synced to the remote
//! favorite store.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use exam_core::model::{favorite_tags, FavoriteColor, QuestionKey, SessionMode, UserId};
use remote::{FavoriteStore, FavoriteUpsert};

use crate::error::FetchError;

/// Result of a favorite toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    /// The question now carries this color.
    Selected(FavoriteColor),
    /// The question's favorite was removed.
    Cleared,
}

/// Where a memo write landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoPersistence {
    /// Cached locally only; the question has no color, so there is no
    /// remote row to carry the memo.
    CachedOnly,
    /// Cached locally and written to the remote favorite row.
    Persisted,
}

/// Local cache of a user's favorites and memos for the questions in play.
///
/// Colors mirror the remote store. Memos are cache-first: they always land
/// locally, and reach the remote only while the question is colored.
pub struct AnnotationStore {
    favorites: Arc<dyn FavoriteStore>,
    user: UserId,
    colors: HashMap<QuestionKey, FavoriteColor>,
    memos: HashMap<QuestionKey, String>,
}

impl AnnotationStore {
    #[must_use]
    pub fn new(favorites: Arc<dyn FavoriteStore>, user: UserId) -> Self {
        Self {
            favorites,
            user,
            colors: HashMap::new(),
            memos: HashMap::new(),
        }
    }

    /// Replace the local cache with the remote rows for the given scope.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the remote listing fails; the cache is
    /// left untouched in that case.
    pub async fn refresh(
        &mut self,
        exam_year: Option<i32>,
        subject_code: Option<&str>,
    ) -> Result<(), FetchError> {
        let entries = self
            .favorites
            .list_favorites(&self.user, exam_year, subject_code)
            .await?;
        debug!(count = entries.len(), "favorites refreshed");

        self.colors.clear();
        self.memos.clear();
        for entry in entries {
            let key = entry.key();
            self.colors.insert(key.clone(), entry.color);
            if !entry.memo.is_empty() {
                self.memos.insert(key, entry.memo);
            }
        }
        Ok(())
    }

    /// Toggle a color on a question: picking the current color clears the
    /// favorite along with its memo, any other color replaces it with the
    /// cached memo riding along on the upsert.
    ///
    /// The remote write happens first; local state changes only after it
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the remote write fails.
    pub async fn toggle_favorite(
        &mut self,
        key: &QuestionKey,
        color: FavoriteColor,
        mode: SessionMode,
    ) -> Result<FavoriteToggle, FetchError> {
        if self.colors.get(key) == Some(&color) {
            self.favorites.delete_favorite(&self.user, key).await?;
            self.colors.remove(key);
            self.memos.remove(key);
            return Ok(FavoriteToggle::Cleared);
        }

        let upsert = FavoriteUpsert {
            user: self.user.clone(),
            key: key.clone(),
            color,
            memo: self.memos.get(key).cloned().unwrap_or_default(),
            tags: favorite_tags(color, mode),
            source: mode,
        };
        self.favorites.upsert_favorite(&upsert).await?;
        self.colors.insert(key.clone(), color);
        Ok(FavoriteToggle::Selected(color))
    }

    /// Record a memo. It always lands in the local cache; if the question
    /// is colored, the remote favorite row is rewritten to carry it.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` when the question is colored and the remote
    /// write fails. The local cache keeps the memo either way.
    pub async fn set_memo(
        &mut self,
        key: &QuestionKey,
        memo: impl Into<String>,
        mode: SessionMode,
    ) -> Result<MemoPersistence, FetchError> {
        let memo = memo.into();
        self.memos.insert(key.clone(), memo.clone());

        let Some(color) = self.colors.get(key).copied() else {
            return Ok(MemoPersistence::CachedOnly);
        };

        let upsert = FavoriteUpsert {
            user: self.user.clone(),
            key: key.clone(),
            color,
            memo,
            tags: favorite_tags(color, mode),
            source: mode,
        };
        self.favorites.upsert_favorite(&upsert).await?;
        Ok(MemoPersistence::Persisted)
    }

    #[must_use]
    pub fn color(&self, key: &QuestionKey) -> Option<FavoriteColor> {
        self.colors.get(key).copied()
    }

    #[must_use]
    pub fn memo(&self, key: &QuestionKey) -> Option<&str> {
        self.memos.get(key).map(String::as_str)
    }
}
