use serde::{Deserialize, Serialize};

use shelf_db::Record;

use crate::modules::reviews::Review;

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    pub title: String,
    pub description: String,
    pub isbn: String,
}

/// Request model for the catalog-management create operation. Fields are
/// optional so presence can be reported per field.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBook {
    pub title: Option<String>,
    pub description: Option<String>,
    pub isbn: Option<String>,
}

/// Query parameters accepted by the list/search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// One page of list/search results.
#[derive(Debug, Serialize)]
pub struct BookPage {
    pub books: Vec<Record<Book>>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    /// Empty-state indicator, present only when nothing matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Full detail response: the record plus its reviews.
#[derive(Debug, Serialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Record<Book>,
    pub reviews: Vec<Record<Review>>,
}
