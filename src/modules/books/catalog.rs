//! The book catalog: listing, search, and pagination.

use shelf_db::{Record, RecordId, Table};

use super::models::{Book, BookPage};

const EMPTY_MESSAGE: &str = "No books found.";

/// The collection of catalog entries, in insertion order.
pub struct BookCatalog {
    books: Table<Book>,
}

impl BookCatalog {
    pub fn new() -> Self {
        Self {
            books: Table::new(),
        }
    }

    pub fn add(&self, book: Book) -> Record<Book> {
        self.books.insert(book)
    }

    pub fn get(&self, id: RecordId) -> Option<Record<Book>> {
        self.books.get(id)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Case-insensitive substring match over titles. No query (or an empty
    /// one) returns the whole catalog.
    pub fn search(&self, query: Option<&str>) -> Vec<Record<Book>> {
        match query {
            Some(q) if !q.is_empty() => {
                let needle = q.to_lowercase();
                self.books
                    .filter(|book| book.title.to_lowercase().contains(&needle))
            }
            _ => self.books.all(),
        }
    }

    /// One page of search results. `page` is 1-based; out-of-range pages
    /// come back empty with the true total.
    pub fn page(&self, query: Option<&str>, page: usize, page_size: usize) -> BookPage {
        let matches = self.search(query);
        let total = matches.len();
        let page = page.max(1);
        let page_size = page_size.max(1);

        let offset = (page - 1).saturating_mul(page_size);
        let books: Vec<Record<Book>> = matches
            .into_iter()
            .skip(offset)
            .take(page_size)
            .collect();

        BookPage {
            books,
            page,
            page_size,
            total,
            message: (total == 0).then_some(EMPTY_MESSAGE),
        }
    }
}

impl Default for BookCatalog {
    fn default() -> Self {
        Self::new()
    }
}
