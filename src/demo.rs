use std::io::{Cursor, Read};

use chrono::{TimeZone, Utc};

use crate::api::{ChatApi, ChatReply, ProgressPatch, RecommendedBook, RecordsApi};
use crate::error::{ChatError, StoreError};
use crate::models::{Book, BookRecord, ReadingStatus};

/// Built-in catalog used when the backend is unreachable and for `--demo`.
pub fn demo_books() -> Vec<Book> {
    fn book(
        isbn: &str,
        title: &str,
        author: &str,
        genre: &str,
        rating: f64,
        year: i32,
        total_pages: i64,
        description: &str,
    ) -> Book {
        Book {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            cover: String::new(),
            genre: genre.to_string(),
            rating,
            year,
            total_pages,
            description: Some(description.to_string()),
        }
    }

    vec![
        book(
            "9781451673319",
            "The Great Gatsby",
            "F. Scott Fitzgerald",
            "Fiction",
            4.3,
            1925,
            180,
            "The story of the mysterious millionaire Jay Gatsby and his obsession with Daisy Buchanan, set in the Jazz Age.",
        ),
        book(
            "9780061120084",
            "To Kill a Mockingbird",
            "Harper Lee",
            "Fiction",
            4.5,
            1960,
            336,
            "A childhood in a sleepy Southern town and the crisis of conscience that rocked it.",
        ),
        book(
            "9780142437247",
            "1984",
            "George Orwell",
            "Science Fiction",
            4.3,
            1949,
            328,
            "A dystopian novel set in a totalitarian regime of surveillance and manipulation.",
        ),
        book(
            "9780307474278",
            "The Da Vinci Code",
            "Dan Brown",
            "Thriller",
            3.8,
            2003,
            597,
            "A murder in the Louvre and cryptic clues in da Vinci's paintings lead to a religious mystery.",
        ),
        book(
            "9780618260300",
            "The Hobbit",
            "J.R.R. Tolkien",
            "Fantasy",
            4.7,
            1937,
            366,
            "Bilbo Baggins embarks on an unexpected journey there and back again.",
        ),
        book(
            "9780441172719",
            "Dune",
            "Frank Herbert",
            "Science Fiction",
            4.2,
            1965,
            412,
            "Paul Atreides and the desert planet Arrakis, the only source of the spice melange.",
        ),
        book(
            "9780735211292",
            "Atomic Habits",
            "James Clear",
            "Self-Help",
            4.4,
            2018,
            320,
            "A proven framework for building good habits and breaking bad ones.",
        ),
        book(
            "9780593135204",
            "Project Hail Mary",
            "Andy Weir",
            "Science Fiction",
            4.6,
            2021,
            496,
            "A lone astronaut must save the earth from disaster, if he can remember who he is.",
        ),
    ]
}

/// Demo library shown when a record load fails or in `--demo` mode.
pub fn demo_records(user_id: i64) -> Vec<BookRecord> {
    fn record(
        user_id: i64,
        isbn: &str,
        title: &str,
        author: &str,
        genre: &str,
        status: ReadingStatus,
        current: i64,
        total: i64,
        (year, month, day): (i32, u32, u32),
    ) -> BookRecord {
        BookRecord {
            id: isbn.to_string(),
            user_id,
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            cover: String::new(),
            genre: genre.to_string(),
            status,
            current_page: current,
            total_pages: total,
            date_added: Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap(),
        }
    }

    vec![
        record(
            user_id,
            "9780441172719",
            "Dune",
            "Frank Herbert",
            "Science Fiction",
            ReadingStatus::InProgress,
            123,
            412,
            (2023, 10, 15),
        ),
        record(
            user_id,
            "9780735211292",
            "Atomic Habits",
            "James Clear",
            "Self-Help",
            ReadingStatus::Finished,
            320,
            320,
            (2023, 9, 20),
        ),
        record(
            user_id,
            "9780593135204",
            "Project Hail Mary",
            "Andy Weir",
            "Science Fiction",
            ReadingStatus::ToRead,
            0,
            496,
            (2023, 11, 5),
        ),
        record(
            user_id,
            "9780618260300",
            "The Hobbit",
            "J.R.R. Tolkien",
            "Fantasy",
            ReadingStatus::Finished,
            366,
            366,
            (2023, 8, 12),
        ),
    ]
}

/// Offline stand-in for the backend collaborators, used in `--demo` mode.
/// Writes are acknowledged without going anywhere, and the assistant streams
/// a canned reply so the whole exchange ladder still runs.
pub struct DemoApi;

impl RecordsApi for DemoApi {
    fn fetch_records(&self, user_id: i64) -> Result<Vec<BookRecord>, StoreError> {
        Ok(demo_records(user_id))
    }

    fn create_record(&self, record: &BookRecord) -> Result<BookRecord, StoreError> {
        let mut created = record.clone();
        created.id = format!("demo-{}", record.isbn);
        Ok(created)
    }

    fn update_record(
        &self,
        _user_id: i64,
        _isbn: &str,
        _patch: &ProgressPatch,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete_record(&self, _user_id: i64, _isbn: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

const DEMO_REPLY: &str =
    "The demo shelf leans classic: a Jazz Age tragedy and a Depression-era courtroom drama.";

fn demo_recommendations() -> Vec<RecommendedBook> {
    demo_books()
        .into_iter()
        .filter(|b| b.isbn == "9781451673319" || b.isbn == "9780061120084")
        .map(|b| RecommendedBook {
            isbn: b.isbn,
            title: b.title,
            author: b.author,
            cover: b.cover,
            genre: b.genre,
            page_count: b.total_pages,
        })
        .collect()
}

/// The canned reply in the assistant's wire format, one `data:` event per
/// word plus the terminal recommendations event.
fn demo_stream_bytes() -> Vec<u8> {
    let mut out = Vec::new();
    let words: Vec<&str> = DEMO_REPLY.split_inclusive(' ').collect();
    for word in words {
        let event = serde_json::json!({ "chunk": word });
        out.extend_from_slice(format!("data: {event}\n").as_bytes());
    }
    let recommendations: Vec<serde_json::Value> = demo_recommendations()
        .into_iter()
        .map(|r| {
            serde_json::json!({
                "isbn": r.isbn,
                "title": r.title,
                "author": r.author,
                "cover": r.cover,
                "genre": r.genre,
                "pageCount": r.page_count,
            })
        })
        .collect();
    let done = serde_json::json!({ "done": true, "recommendations": recommendations });
    out.extend_from_slice(format!("data: {done}\n").as_bytes());
    out
}

impl ChatApi for DemoApi {
    fn send(&self, _query: &str, _user_id: i64) -> Result<ChatReply, ChatError> {
        Ok(ChatReply {
            message: DEMO_REPLY.to_string(),
            recommendations: demo_recommendations(),
        })
    }

    fn open_stream(
        &self,
        _query: &str,
        _user_id: i64,
    ) -> Result<Box<dyn Read + Send>, ChatError> {
        Ok(Box::new(Cursor::new(demo_stream_bytes())))
    }
}
