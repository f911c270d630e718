use std::io::Read;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, ChatError, StoreError};
use crate::logging;
use crate::models::{Book, BookRecord, ReadingStatus, User};

/// Envelope every ReadTracker endpoint wraps its payload in.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

/// Partial update sent on progress changes. Only these two fields go over the
/// wire; everything else on the record stays server-side truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    pub current_page: i64,
    pub status: ReadingStatus,
}

/// Record CRUD surface the library store depends on. `ApiClient` is the real
/// implementation; tests substitute mocks.
pub trait RecordsApi {
    fn fetch_records(&self, user_id: i64) -> Result<Vec<BookRecord>, StoreError>;
    fn create_record(&self, record: &BookRecord) -> Result<BookRecord, StoreError>;
    fn update_record(
        &self,
        user_id: i64,
        isbn: &str,
        patch: &ProgressPatch,
    ) -> Result<(), StoreError>;
    fn delete_record(&self, user_id: i64, isbn: &str) -> Result<(), StoreError>;
}

/// A recommendation entry in a chat reply, in the assistant service's shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedBook {
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub page_count: i64,
}

impl RecommendedBook {
    /// Materialize the candidate as a fresh, unpersisted to-read record.
    pub fn into_record(self, user_id: i64, now: DateTime<Utc>) -> BookRecord {
        BookRecord {
            id: String::new(),
            user_id,
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            cover: self.cover,
            genre: self.genre,
            status: ReadingStatus::ToRead,
            current_page: 0,
            total_pages: self.page_count.max(0),
            date_added: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub recommendations: Vec<RecommendedBook>,
}

/// Assistant transport. `open_stream` hands back the raw byte stream; decoding
/// into events is the chat session's job.
pub trait ChatApi: Send {
    fn send(&self, query: &str, user_id: i64) -> Result<ChatReply, ChatError>;
    fn open_stream(&self, query: &str, user_id: i64)
    -> Result<Box<dyn Read + Send>, ChatError>;
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
    #[serde(rename = "userId")]
    user_id: String,
    stream: bool,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    chat_url: String,
    metadata_url: String,
    http: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        chat_url: &str,
        metadata_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("readtrack");
        if base_url.starts_with("http://127.0.0.1") || base_url.starts_with("http://localhost") {
            builder = builder.no_proxy();
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_url: chat_url.trim_end_matches('/').to_string(),
            metadata_url: metadata_url.trim_end_matches('/').to_string(),
            http: builder.build()?,
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let url = format!("{}/auth/login", self.base_url);
        logging::debug(format!("POST {url}"));
        let resp = self
            .http
            .post(url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .map_err(|e| AuthError::Other {
                action: "login",
                detail: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::from_login_status(status.as_u16()));
        }

        let envelope: Envelope<User> = resp.json().map_err(|e| AuthError::Other {
            action: "login",
            detail: e.to_string(),
        })?;
        envelope.data.ok_or(AuthError::Other {
            action: "login",
            detail: "response carried no user".to_string(),
        })
    }

    pub fn register(
        &self,
        username: &str,
        password: &str,
        favourite_genres: &[String],
    ) -> Result<User, AuthError> {
        let url = format!("{}/users", self.base_url);
        logging::debug(format!("POST {url}"));
        let resp = self
            .http
            .post(url)
            .json(&serde_json::json!({
                "username": username,
                "password": password,
                "favourite_genres": favourite_genres,
            }))
            .send()
            .map_err(|e| AuthError::Other {
                action: "registration",
                detail: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::from_register_status(status.as_u16()));
        }

        let envelope: Envelope<User> = resp.json().map_err(|e| AuthError::Other {
            action: "registration",
            detail: e.to_string(),
        })?;
        envelope.data.ok_or(AuthError::Other {
            action: "registration",
            detail: "response carried no user".to_string(),
        })
    }

    /// Full catalog, used as the search candidate set.
    pub fn fetch_books(&self) -> Result<Vec<Book>, StoreError> {
        let url = format!("{}/books", self.base_url);
        logging::debug(format!("GET {url}"));
        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|e| StoreError::fetch("catalog", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::fetch("catalog", failure_detail(resp)));
        }
        let envelope: Envelope<Vec<Book>> = resp
            .json()
            .map_err(|e| StoreError::fetch("catalog", e.to_string()))?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// ISBN lookup against the Google-Books-shaped volumes endpoint. No match
    /// is a valid empty outcome, not an error.
    pub fn lookup_isbn(&self, isbn: &str) -> Result<Option<Book>, StoreError> {
        let url = &self.metadata_url;
        logging::debug(format!("GET {url}?q=isbn:{isbn}"));
        let resp = self
            .http
            .get(url)
            .query(&[("q", format!("isbn:{isbn}"))])
            .send()
            .map_err(|e| StoreError::fetch("book details", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::fetch("book details", failure_detail(resp)));
        }
        let volumes: VolumesResponse = resp
            .json()
            .map_err(|e| StoreError::fetch("book details", e.to_string()))?;
        Ok(volumes
            .items
            .into_iter()
            .next()
            .map(|item| map_volume(item, isbn)))
    }
}

impl RecordsApi for ApiClient {
    fn fetch_records(&self, user_id: i64) -> Result<Vec<BookRecord>, StoreError> {
        let url = format!("{}/records", self.base_url);
        logging::debug(format!("GET {url}?userId={user_id}"));
        let resp = self
            .http
            .get(url)
            .query(&[("userId", user_id.to_string())])
            .send()
            .map_err(|e| StoreError::fetch("library", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::fetch("library", failure_detail(resp)));
        }
        let envelope: Envelope<Vec<BookRecord>> = resp
            .json()
            .map_err(|e| StoreError::fetch("library", e.to_string()))?;
        if envelope.success == Some(false) {
            return Err(StoreError::fetch(
                "library",
                envelope.message.unwrap_or_else(|| "request rejected".to_string()),
            ));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    fn create_record(&self, record: &BookRecord) -> Result<BookRecord, StoreError> {
        let url = format!("{}/records", self.base_url);
        logging::debug(format!("POST {url} ({})", record.isbn));
        let resp = self
            .http
            .post(url)
            .json(record)
            .send()
            .map_err(|e| StoreError::persistence("add book", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::persistence("add book", failure_detail(resp)));
        }
        let envelope: Envelope<BookRecord> = resp
            .json()
            .map_err(|e| StoreError::persistence("add book", e.to_string()))?;
        // The server-returned record is canonical (it carries the generated id).
        envelope
            .data
            .ok_or_else(|| StoreError::persistence("add book", "response carried no record"))
    }

    fn update_record(
        &self,
        user_id: i64,
        isbn: &str,
        patch: &ProgressPatch,
    ) -> Result<(), StoreError> {
        let url = format!("{}/records", self.base_url);
        logging::debug(format!("PUT {url}?userId={user_id}&isbn={isbn}"));
        let resp = self
            .http
            .put(url)
            .query(&[("userId", user_id.to_string()), ("isbn", isbn.to_string())])
            .json(patch)
            .send()
            .map_err(|e| StoreError::persistence("update progress", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::persistence(
                "update progress",
                failure_detail(resp),
            ));
        }
        Ok(())
    }

    fn delete_record(&self, user_id: i64, isbn: &str) -> Result<(), StoreError> {
        let url = format!("{}/records", self.base_url);
        logging::debug(format!("DELETE {url}?userId={user_id}&isbn={isbn}"));
        let resp = self
            .http
            .delete(url)
            .query(&[("userId", user_id.to_string()), ("isbn", isbn.to_string())])
            .send()
            .map_err(|e| StoreError::persistence("remove book", e.to_string()))?;
        if !resp.status().is_success() {
            return Err(StoreError::persistence("remove book", failure_detail(resp)));
        }
        Ok(())
    }
}

impl ChatApi for ApiClient {
    fn send(&self, query: &str, user_id: i64) -> Result<ChatReply, ChatError> {
        let url = format!("{}/api/chat", self.chat_url);
        logging::debug(format!("POST {url}"));
        let resp = self
            .http
            .post(url)
            .json(&ChatRequest {
                query,
                user_id: user_id.to_string(),
                stream: false,
            })
            .send()
            .map_err(|e| ChatError::Request(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::Request(format!(
                "server returned status {}",
                status.as_u16()
            )));
        }
        resp.json().map_err(|e| ChatError::Request(e.to_string()))
    }

    fn open_stream(
        &self,
        query: &str,
        user_id: i64,
    ) -> Result<Box<dyn Read + Send>, ChatError> {
        let url = format!("{}/api/chat/stream", self.chat_url);
        logging::debug(format!("POST {url}"));
        let resp = self
            .http
            .post(url)
            .json(&ChatRequest {
                query,
                user_id: user_id.to_string(),
                stream: true,
            })
            .send()
            .map_err(|e| ChatError::StreamTransport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::StreamTransport(format!(
                "server returned status {}",
                status.as_u16()
            )));
        }
        Ok(Box::new(resp))
    }
}

/// Pull the server's own message out of an error body when there is one,
/// otherwise report the bare status.
fn failure_detail(resp: reqwest::blocking::Response) -> String {
    let status = resp.status().as_u16();
    match resp.json::<Envelope<serde_json::Value>>() {
        Ok(Envelope {
            message: Some(message),
            ..
        }) => message,
        _ => format!("server returned status {status}"),
    }
}

// ---- Google-Books-shaped metadata service ----

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<VolumeItem>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeItem {
    #[serde(default)]
    id: String,
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    average_rating: f64,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    page_count: i64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image_links: ImageLinks,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    small_thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

fn map_volume(item: VolumeItem, fallback_isbn: &str) -> Book {
    let info = item.volume_info;

    // Prefer ISBN-13, fall back to ISBN-10, then the volume id.
    let isbn = info
        .industry_identifiers
        .iter()
        .find(|id| id.kind == "ISBN_13")
        .or_else(|| {
            info.industry_identifiers
                .iter()
                .find(|id| id.kind == "ISBN_10")
        })
        .map(|id| id.identifier.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            if item.id.is_empty() {
                fallback_isbn.to_string()
            } else {
                item.id
            }
        });

    // The first category is usually the main one ("Fiction / Classics").
    let genre = info
        .categories
        .first()
        .and_then(|c| c.split(" / ").next())
        .filter(|g| !g.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    let year = info
        .published_date
        .as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<i32>().ok())
        .unwrap_or(0);

    let cover = info
        .image_links
        .thumbnail
        .or(info.image_links.small_thumbnail)
        .unwrap_or_default();

    Book {
        isbn,
        title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
        author: if info.authors.is_empty() {
            "Unknown Author".to_string()
        } else {
            info.authors.join(", ")
        },
        cover,
        genre,
        rating: info.average_rating,
        year,
        total_pages: info.page_count.max(0),
        description: info.description,
    }
}
