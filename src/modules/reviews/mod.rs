//! The review ledger: per-book, per-user star ratings and comments.
//!
//! Every review references exactly one book and one user; a user may review
//! the same book more than once. Routes live in the books module, since
//! reviews are addressed through the book they belong to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shelf_db::{Record, RecordId, Table};

pub const MIN_STARS: i64 = 1;
pub const MAX_STARS: i64 = 5;

/// A recorded review.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Review {
    pub book_id: RecordId,
    pub user_id: RecordId,
    pub stars_given: i64,
    pub comment: String,
}

/// Submission payload. `stars_given` is optional so its absence can be
/// reported as a field error rather than a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewPayload {
    pub stars_given: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("stars_given is required")]
    MissingStars,
    #[error("stars must be between {MIN_STARS} and {MAX_STARS}, got {given}")]
    StarsOutOfRange { given: i64 },
}

/// The collection of review records.
pub struct ReviewLedger {
    reviews: Table<Review>,
}

impl ReviewLedger {
    pub fn new() -> Self {
        Self {
            reviews: Table::new(),
        }
    }

    /// Record a review linking `user_id` to `book_id`. The caller is
    /// responsible for having resolved both ids to live records.
    pub fn submit(
        &self,
        book_id: RecordId,
        user_id: RecordId,
        payload: ReviewPayload,
    ) -> Result<Record<Review>, ReviewError> {
        let stars_given = payload.stars_given.ok_or(ReviewError::MissingStars)?;
        if !(MIN_STARS..=MAX_STARS).contains(&stars_given) {
            return Err(ReviewError::StarsOutOfRange { given: stars_given });
        }

        Ok(self.reviews.insert(Review {
            book_id,
            user_id,
            stars_given,
            comment: payload.comment.unwrap_or_default(),
        }))
    }

    /// Reviews for one book, oldest first.
    pub fn for_book(&self, book_id: RecordId) -> Vec<Record<Review>> {
        self.reviews.filter(|review| review.book_id == book_id)
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

impl Default for ReviewLedger {
    fn default() -> Self {
        Self::new()
    }
}
