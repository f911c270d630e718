use chrono::Utc;

use crate::api::{ProgressPatch, RecordsApi};
use crate::error::{StoreError, ValidationError};
use crate::models::{Book, BookRecord, ReadingStatus};

/// Status filter applied to the library view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReadingStatus),
}

impl StatusFilter {
    /// Tab order in the library screen.
    pub const CYCLE: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Only(ReadingStatus::ToRead),
        StatusFilter::Only(ReadingStatus::InProgress),
        StatusFilter::Only(ReadingStatus::Finished),
    ];

    pub fn matches(self, status: ReadingStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => status == wanted,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Only(status) => status.label(),
        }
    }

    pub fn next(self) -> Self {
        let position = Self::CYCLE.iter().position(|f| *f == self).unwrap_or(0);
        Self::CYCLE[(position + 1) % Self::CYCLE.len()]
    }
}

/// Authoritative in-memory list of the current user's records.
///
/// Every mutating operation talks to the backend first and touches the
/// in-memory list only after the server confirmed the write, so a failed
/// round trip never leaves half-applied state behind.
pub struct LibraryStore {
    user_id: i64,
    records: Vec<BookRecord>,
}

impl LibraryStore {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            records: Vec::new(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, isbn: &str) -> Option<&BookRecord> {
        self.records.iter().find(|r| r.isbn == isbn)
    }

    /// Replace the whole set with the server's copy. On failure the prior
    /// contents stay untouched; the caller decides on a user-facing fallback.
    pub fn load(&mut self, api: &dyn RecordsApi) -> Result<usize, StoreError> {
        let records = api.fetch_records(self.user_id)?;
        self.records = records;
        Ok(self.records.len())
    }

    /// Seed with a local dataset (the demo fallback). Nothing is persisted.
    pub fn replace_all(&mut self, records: Vec<BookRecord>) {
        self.records = records;
    }

    /// Persist a new record and insert the server's canonical copy at the
    /// head of the list.
    pub fn add(
        &mut self,
        api: &dyn RecordsApi,
        candidate: BookRecord,
    ) -> Result<&BookRecord, StoreError> {
        if self.get(&candidate.isbn).is_some() {
            return Err(ValidationError::new("isbn", "already in your library").into());
        }
        candidate.validate()?;
        let created = api.create_record(&candidate)?;
        self.records.insert(0, created);
        Ok(&self.records[0])
    }

    /// Convenience for adding a catalog book with defaulted status/progress.
    pub fn add_book(
        &mut self,
        api: &dyn RecordsApi,
        book: &Book,
    ) -> Result<&BookRecord, StoreError> {
        let candidate = BookRecord::from_book(book, self.user_id, Utc::now());
        self.add(api, candidate)
    }

    /// Move a record to `new_page`, deriving the status transition. The
    /// in-memory record changes only after the backend accepted the patch.
    pub fn update_progress(
        &mut self,
        api: &dyn RecordsApi,
        isbn: &str,
        new_page: i64,
    ) -> Result<&BookRecord, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.isbn == isbn)
            .ok_or_else(|| StoreError::NotFound(isbn.to_string()))?;

        let page = self.records[index].clamp_page(new_page);
        let status = self.records[index].derive_status_on_progress(new_page);
        let patch = ProgressPatch {
            current_page: page,
            status,
        };
        api.update_record(self.user_id, isbn, &patch)?;

        let record = &mut self.records[index];
        record.current_page = page;
        record.status = status;
        Ok(&self.records[index])
    }

    /// Remove a record. The caller is responsible for user confirmation; the
    /// record leaves the list only on a successful delete acknowledgement.
    pub fn remove(&mut self, api: &dyn RecordsApi, isbn: &str) -> Result<BookRecord, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.isbn == isbn)
            .ok_or_else(|| StoreError::NotFound(isbn.to_string()))?;
        api.delete_record(self.user_id, isbn)?;
        Ok(self.records.remove(index))
    }

    /// View ordered by status priority (to-read < in-progress < finished),
    /// then date added descending within the same status. Unfinished books
    /// surface first; the sort is stable, so equal keys keep insertion order.
    pub fn filtered_sorted(&self, filter: StatusFilter) -> Vec<&BookRecord> {
        let mut view: Vec<&BookRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(r.status))
            .collect();
        view.sort_by(|a, b| {
            a.status
                .sort_rank()
                .cmp(&b.status.sort_rank())
                .then(b.date_added.cmp(&a.date_added))
        });
        view
    }

    /// Logout lifecycle hook: drop everything belonging to the session.
    pub fn reset(&mut self) {
        self.records.clear();
    }
}
