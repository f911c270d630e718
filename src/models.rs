use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Reading status of a record. The backend speaks the lowercase spaced form
/// ("to read", "in progress", "finished").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingStatus {
    #[serde(rename = "to read")]
    ToRead,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "finished")]
    Finished,
}

impl Default for ReadingStatus {
    fn default() -> Self {
        ReadingStatus::ToRead
    }
}

impl ReadingStatus {
    /// Sort rank used by the library view: unfinished books surface first.
    pub fn sort_rank(self) -> u8 {
        match self {
            ReadingStatus::ToRead => 0,
            ReadingStatus::InProgress => 1,
            ReadingStatus::Finished => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadingStatus::ToRead => "To Read",
            ReadingStatus::InProgress => "In Progress",
            ReadingStatus::Finished => "Finished",
        }
    }
}

/// Immutable catalog entity. Never mutated by the client; a record copies the
/// fields it needs at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub total_pages: i64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-user ownership and progress state for one catalog book. The copy of the
/// book's metadata is deliberate: catalog updates never retroactively change a
/// user's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "userID", alias = "userId", default)]
    pub user_id: i64,
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub genre: String,
    pub status: ReadingStatus,
    #[serde(default)]
    pub current_page: i64,
    #[serde(default)]
    pub total_pages: i64,
    pub date_added: DateTime<Utc>,
}

impl BookRecord {
    /// Create a fresh record from a catalog book, not yet persisted.
    pub fn from_book(book: &Book, user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            user_id,
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            cover: book.cover.clone(),
            genre: book.genre.clone(),
            status: ReadingStatus::ToRead,
            current_page: 0,
            total_pages: book.total_pages,
            date_added: now,
        }
    }

    /// Fraction of the book read, clamped to [0, 1]. Zero when the page count
    /// is unknown.
    pub fn progress_fraction(&self) -> f64 {
        if self.total_pages <= 0 {
            return 0.0;
        }
        (self.current_page as f64 / self.total_pages as f64).clamp(0.0, 1.0)
    }

    /// Clamp a proposed page value into the record's valid range.
    pub fn clamp_page(&self, new_page: i64) -> i64 {
        new_page.clamp(0, self.total_pages.max(0))
    }

    /// Status implied by a proposed page value. A jump straight from to-read
    /// to finished is valid; page 0 keeps to-read only for a record that never
    /// left it, and a finished record moved below the last page demotes to
    /// in-progress rather than resurrecting to-read.
    pub fn derive_status_on_progress(&self, new_page: i64) -> ReadingStatus {
        let page = self.clamp_page(new_page);
        if self.total_pages > 0 && page >= self.total_pages {
            ReadingStatus::Finished
        } else if page > 0 {
            ReadingStatus::InProgress
        } else if self.status == ReadingStatus::ToRead {
            ReadingStatus::ToRead
        } else {
            ReadingStatus::InProgress
        }
    }

    /// Reject malformed records before anything reaches the network.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.isbn.trim().is_empty() {
            return Err(ValidationError::new("isbn", "must not be empty"));
        }
        if self.total_pages < 0 {
            return Err(ValidationError::new("totalPages", "must not be negative"));
        }
        if self.current_page < 0 {
            return Err(ValidationError::new("currentPage", "must not be negative"));
        }
        if self.current_page > self.total_pages {
            return Err(ValidationError::new(
                "currentPage",
                "must not exceed totalPages",
            ));
        }
        match self.status {
            ReadingStatus::ToRead if self.current_page != 0 => Err(ValidationError::new(
                "status",
                "a to-read record must be at page 0",
            )),
            ReadingStatus::Finished
                if self.total_pages > 0 && self.current_page != self.total_pages =>
            {
                Err(ValidationError::new(
                    "status",
                    "a finished record must be at the last page",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Authenticated user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub favourite_genres: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the assistant conversation. `books` carries recommendation
/// candidates (fresh to-read records, not yet persisted). Content is mutated
/// in place only while its owning response is still streaming.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub role: ChatRole,
    pub content: String,
    pub books: Vec<BookRecord>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(id: u64, role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            books: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_recommendation(&self) -> bool {
        !self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_book() -> Book {
        Book {
            isbn: "9781451673319".to_string(),
            title: "The Great Gatsby".to_string(),
            author: "F. Scott Fitzgerald".to_string(),
            cover: String::new(),
            genre: "Fiction".to_string(),
            rating: 4.3,
            year: 1925,
            total_pages: 180,
            description: None,
        }
    }

    fn record_with(status: ReadingStatus, current: i64, total: i64) -> BookRecord {
        BookRecord {
            id: "1".to_string(),
            user_id: 7,
            isbn: "9780000000000".to_string(),
            title: "Test".to_string(),
            author: "Author".to_string(),
            cover: String::new(),
            genre: "Fiction".to_string(),
            status,
            current_page: current,
            total_pages: total,
            date_added: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn from_book_defaults_to_fresh_to_read() {
        let now = Utc::now();
        let record = BookRecord::from_book(&sample_book(), 42, now);
        assert_eq!(record.status, ReadingStatus::ToRead);
        assert_eq!(record.current_page, 0);
        assert_eq!(record.user_id, 42);
        assert_eq!(record.total_pages, 180);
        assert_eq!(record.date_added, now);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn progress_fraction_clamps_and_survives_zero_pages() {
        assert_eq!(
            record_with(ReadingStatus::InProgress, 150, 300).progress_fraction(),
            0.5
        );
        assert_eq!(
            record_with(ReadingStatus::ToRead, 0, 0).progress_fraction(),
            0.0
        );
        // Out-of-range data clamps instead of exceeding 1.0.
        let mut record = record_with(ReadingStatus::InProgress, 200, 300);
        record.current_page = 400;
        assert_eq!(record.progress_fraction(), 1.0);
    }

    #[test]
    fn derive_status_full_table() {
        let record = record_with(ReadingStatus::ToRead, 0, 300);
        assert_eq!(record.derive_status_on_progress(300), ReadingStatus::Finished);
        assert_eq!(
            record.derive_status_on_progress(150),
            ReadingStatus::InProgress
        );
        assert_eq!(record.derive_status_on_progress(0), ReadingStatus::ToRead);

        // Page 0 on a started record never resets to to-read.
        let started = record_with(ReadingStatus::InProgress, 150, 300);
        assert_eq!(started.derive_status_on_progress(0), ReadingStatus::InProgress);

        // Re-reading correction: finished drops back to in-progress.
        let finished = record_with(ReadingStatus::Finished, 300, 300);
        assert_eq!(
            finished.derive_status_on_progress(120),
            ReadingStatus::InProgress
        );
    }

    #[test]
    fn derive_status_clamps_overshoot() {
        let record = record_with(ReadingStatus::InProgress, 290, 300);
        assert_eq!(record.derive_status_on_progress(999), ReadingStatus::Finished);
        assert_eq!(record.clamp_page(999), 300);
        assert_eq!(record.clamp_page(-5), 0);
    }

    #[test]
    fn zero_page_books_never_auto_finish() {
        let record = record_with(ReadingStatus::ToRead, 0, 0);
        assert_eq!(record.derive_status_on_progress(50), ReadingStatus::ToRead);
    }

    #[test]
    fn validate_rejects_overflow_naming_field() {
        let record = record_with(ReadingStatus::InProgress, 400, 300);
        let err = record.validate().unwrap_err();
        assert_eq!(err.field, "currentPage");
    }

    #[test]
    fn validate_rejects_negative_values() {
        let mut record = record_with(ReadingStatus::InProgress, 10, 300);
        record.current_page = -1;
        assert_eq!(record.validate().unwrap_err().field, "currentPage");

        let mut record = record_with(ReadingStatus::ToRead, 0, 300);
        record.total_pages = -10;
        assert_eq!(record.validate().unwrap_err().field, "totalPages");
    }

    #[test]
    fn validate_enforces_status_page_coherence() {
        let record = record_with(ReadingStatus::ToRead, 12, 300);
        assert_eq!(record.validate().unwrap_err().field, "status");

        let record = record_with(ReadingStatus::Finished, 200, 300);
        assert_eq!(record.validate().unwrap_err().field, "status");

        assert!(record_with(ReadingStatus::Finished, 300, 300).validate().is_ok());
    }

    #[test]
    fn status_uses_backend_wire_form() {
        let json = serde_json::to_string(&ReadingStatus::InProgress).unwrap();
        assert_eq!(json, "\"in progress\"");
        let status: ReadingStatus = serde_json::from_str("\"to read\"").unwrap();
        assert_eq!(status, ReadingStatus::ToRead);
    }

    #[test]
    fn record_serializes_with_wire_field_names() {
        let record = record_with(ReadingStatus::InProgress, 123, 412);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userID"], 7);
        assert_eq!(value["currentPage"], 123);
        assert_eq!(value["totalPages"], 412);
        assert_eq!(value["status"], "in progress");
        assert!(
            value["dateAdded"]
                .as_str()
                .unwrap()
                .starts_with("2025-06-01")
        );
    }

    #[test]
    fn record_deserializes_backend_payload() {
        let payload = r#"{
            "id": "abc123",
            "userID": 3,
            "isbn": "9780618260300",
            "title": "The Hobbit",
            "author": "J.R.R. Tolkien",
            "genre": "Fantasy",
            "status": "finished",
            "currentPage": 366,
            "totalPages": 366,
            "dateAdded": "2023-08-12T00:00:00Z"
        }"#;
        let record: BookRecord = serde_json::from_str(payload).unwrap();
        assert_eq!(record.status, ReadingStatus::Finished);
        assert_eq!(record.cover, "");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn sort_rank_orders_unfinished_first() {
        assert!(ReadingStatus::ToRead.sort_rank() < ReadingStatus::InProgress.sort_rank());
        assert!(ReadingStatus::InProgress.sort_rank() < ReadingStatus::Finished.sort_rank());
    }
}
