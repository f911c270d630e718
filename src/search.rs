use crate::models::Book;

pub const ALL_GENRES: &str = "All";

/// Composes a free-text query with a single active genre filter over the
/// candidate set fetched from the catalog. Filtering is pure: identical query
/// and genre inputs always yield the same ordered output for the same
/// candidates (results keep candidate order).
pub struct SearchSession {
    candidates: Vec<Book>,
    query: String,
    active_genre: String,
    genres: Vec<String>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            query: String::new(),
            active_genre: ALL_GENRES.to_string(),
            genres: vec![ALL_GENRES.to_string()],
        }
    }

    /// Swap in a new candidate set and rederive the genre list from it.
    pub fn set_candidates(&mut self, candidates: Vec<Book>) {
        self.genres = derive_genres(&candidates);
        self.candidates = candidates;
        if !self.genres.iter().any(|g| *g == self.active_genre) {
            self.active_genre = ALL_GENRES.to_string();
        }
    }

    pub fn candidates(&self) -> &[Book] {
        &self.candidates
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Genre labels observed in the candidate set, "All" first.
    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn active_genre(&self) -> &str {
        &self.active_genre
    }

    pub fn set_genre(&mut self, genre: impl Into<String>) {
        let genre = genre.into();
        if self.genres.iter().any(|g| *g == genre) {
            self.active_genre = genre;
        }
    }

    /// Advance to the next genre tab, wrapping around.
    pub fn cycle_genre(&mut self) {
        if self.genres.is_empty() {
            return;
        }
        let position = self
            .genres
            .iter()
            .position(|g| *g == self.active_genre)
            .unwrap_or(0);
        self.active_genre = self.genres[(position + 1) % self.genres.len()].clone();
    }

    /// Current filtered view, in candidate order.
    pub fn results(&self) -> Vec<&Book> {
        self.candidates
            .iter()
            .filter(|book| matches_query(book, &self.query))
            .filter(|book| self.active_genre == ALL_GENRES || book.genre == self.active_genre)
            .collect()
    }

    /// Logout lifecycle hook.
    pub fn reset(&mut self) {
        self.candidates.clear();
        self.query.clear();
        self.active_genre = ALL_GENRES.to_string();
        self.genres = vec![ALL_GENRES.to_string()];
    }
}

/// Case-insensitive substring match against title and author. An empty query
/// matches everything.
fn matches_query(book: &Book, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    book.title.to_lowercase().contains(&query) || book.author.to_lowercase().contains(&query)
}

/// Distinct genres in first-seen order, "All" prepended. Derived, never
/// hardcoded: it must be recomputed whenever the candidate set changes.
fn derive_genres(candidates: &[Book]) -> Vec<String> {
    let mut genres = vec![ALL_GENRES.to_string()];
    for book in candidates {
        if !book.genre.is_empty() && !genres.iter().any(|g| *g == book.genre) {
            genres.push(book.genre.clone());
        }
    }
    genres
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(isbn: &str, title: &str, author: &str, genre: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            cover: String::new(),
            genre: genre.to_string(),
            rating: 4.0,
            year: 1990,
            total_pages: 300,
            description: None,
        }
    }

    fn session_with_catalog() -> SearchSession {
        let mut session = SearchSession::new();
        session.set_candidates(vec![
            book("1", "The Great Gatsby", "F. Scott Fitzgerald", "Fiction"),
            book("2", "The Hobbit", "J.R.R. Tolkien", "Fantasy"),
            book("3", "Mistborn", "Brandon Sanderson", "Fantasy"),
            book("4", "Dune", "Frank Herbert", "Science Fiction"),
        ]);
        session
    }

    #[test]
    fn query_matches_title_case_insensitively() {
        let mut session = session_with_catalog();
        session.set_query("gatsby");
        let results = session.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "The Great Gatsby");
    }

    #[test]
    fn query_matches_author_too() {
        let mut session = session_with_catalog();
        session.set_query("FITZGERALD");
        let results = session.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].isbn, "1");
    }

    #[test]
    fn genre_filter_with_empty_query_keeps_candidate_order() {
        let mut session = session_with_catalog();
        session.set_genre("Fantasy");
        let results = session.results();
        let titles: Vec<&str> = results.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["The Hobbit", "Mistborn"]);
    }

    #[test]
    fn query_and_genre_compose() {
        let mut session = session_with_catalog();
        session.set_genre("Fantasy");
        session.set_query("mist");
        let results = session.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Mistborn");
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut session = session_with_catalog();
        session.set_query("the");
        session.set_genre("Fantasy");
        let first: Vec<String> = session.results().iter().map(|b| b.isbn.clone()).collect();
        let second: Vec<String> = session.results().iter().map(|b| b.isbn.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn genres_derived_from_candidates_with_all_prepended() {
        let session = session_with_catalog();
        assert_eq!(
            session.genres(),
            &[
                "All".to_string(),
                "Fiction".to_string(),
                "Fantasy".to_string(),
                "Science Fiction".to_string()
            ]
        );
    }

    #[test]
    fn genres_recomputed_when_candidates_change() {
        let mut session = session_with_catalog();
        session.set_genre("Fantasy");
        session.set_candidates(vec![book("9", "Sapiens", "Yuval Noah Harari", "History")]);
        assert_eq!(
            session.genres(),
            &["All".to_string(), "History".to_string()]
        );
        // The vanished active genre falls back to "All".
        assert_eq!(session.active_genre(), "All");
    }

    #[test]
    fn unknown_genre_is_ignored() {
        let mut session = session_with_catalog();
        session.set_genre("Poetry");
        assert_eq!(session.active_genre(), "All");
    }

    #[test]
    fn cycle_genre_wraps_around() {
        let mut session = session_with_catalog();
        let count = session.genres().len();
        for _ in 0..count {
            session.cycle_genre();
        }
        assert_eq!(session.active_genre(), "All");
    }

    #[test]
    fn blank_query_matches_everything() {
        let mut session = session_with_catalog();
        session.set_query("   ");
        assert_eq!(session.results().len(), 4);
    }

    #[test]
    fn reset_clears_session() {
        let mut session = session_with_catalog();
        session.set_query("dune");
        session.reset();
        assert!(session.candidates().is_empty());
        assert_eq!(session.query(), "");
        assert_eq!(session.genres(), &["All".to_string()]);
    }
}
