use chrono::{DateTime, Utc};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::{centered_popup_area, indexed};
use crate::error::ValidationError;
use crate::models::{Book, BookRecord, ReadingStatus};
use crate::settings::Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Author,
    Isbn,
    Genre,
    Pages,
}

/// Manual add-a-book form. An ISBN lookup can prefill it; the user edits and
/// submits, and validation runs before anything touches the network.
#[derive(Debug, Clone)]
pub struct RecordForm {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub genre: String,
    pub pages: String,
    pub status: ReadingStatus,
    pub focus: FormField,
}

impl Default for RecordForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordForm {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            isbn: String::new(),
            genre: String::new(),
            pages: String::new(),
            status: ReadingStatus::ToRead,
            focus: FormField::Title,
        }
    }

    pub fn prefilled(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
            genre: book.genre.clone(),
            pages: if book.total_pages > 0 {
                book.total_pages.to_string()
            } else {
                String::new()
            },
            status: ReadingStatus::ToRead,
            focus: FormField::Title,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            FormField::Title => FormField::Author,
            FormField::Author => FormField::Isbn,
            FormField::Isbn => FormField::Genre,
            FormField::Genre => FormField::Pages,
            FormField::Pages => FormField::Title,
        };
    }

    pub fn cycle_status(&mut self) {
        self.status = match self.status {
            ReadingStatus::ToRead => ReadingStatus::InProgress,
            ReadingStatus::InProgress => ReadingStatus::Finished,
            ReadingStatus::Finished => ReadingStatus::ToRead,
        };
    }

    pub fn push_char(&mut self, c: char) {
        if self.focus == FormField::Pages && !c.is_ascii_digit() {
            return;
        }
        self.focused_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Title => &mut self.title,
            FormField::Author => &mut self.author,
            FormField::Isbn => &mut self.isbn,
            FormField::Genre => &mut self.genre,
            FormField::Pages => &mut self.pages,
        }
    }

    /// Turn the form into a record candidate. Title and author are required;
    /// the page position follows the chosen status.
    pub fn build_record(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<BookRecord, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("title", "must not be empty"));
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::new("author", "must not be empty"));
        }
        if self.isbn.trim().is_empty() {
            return Err(ValidationError::new("isbn", "must not be empty"));
        }
        let total_pages: i64 = if self.pages.trim().is_empty() {
            0
        } else {
            self.pages
                .trim()
                .parse()
                .map_err(|_| ValidationError::new("totalPages", "must be a number"))?
        };

        let current_page = match self.status {
            ReadingStatus::Finished => total_pages,
            _ => 0,
        };

        let record = BookRecord {
            id: String::new(),
            user_id,
            isbn: self.isbn.trim().to_string(),
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            cover: String::new(),
            genre: self.genre.trim().to_string(),
            status: self.status,
            current_page,
            total_pages,
            date_added: now,
        };
        record.validate()?;
        Ok(record)
    }
}

pub struct FormWindow;

impl FormWindow {
    pub fn render(frame: &mut Frame, area: Rect, form: &RecordForm, palette: &Palette) {
        let popup_area = centered_popup_area(area, 60, 70);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Add New Book")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.primary)));

        let focus_style = Style::default()
            .fg(indexed(palette.accent))
            .add_modifier(Modifier::BOLD);
        let label_style = Style::default().fg(indexed(palette.text_secondary));

        let field_line = |label: &str, value: &str, focused: bool| {
            let cursor = if focused { "\u{2588}" } else { "" };
            let style = if focused { focus_style } else { Style::default() };
            Line::styled(format!("{label:<8} {value}{cursor}"), style)
        };

        let lines = vec![
            field_line("Title", &form.title, form.focus == FormField::Title),
            field_line("Author", &form.author, form.focus == FormField::Author),
            field_line("ISBN", &form.isbn, form.focus == FormField::Isbn),
            field_line("Genre", &form.genre, form.focus == FormField::Genre),
            field_line("Pages", &form.pages, form.focus == FormField::Pages),
            Line::raw(""),
            Line::raw(format!("Status   {}", form.status.label())),
            Line::raw(""),
            Line::styled(
                "Tab: next field   \u{2190}/\u{2192}: status   Enter: add   Esc: cancel",
                label_style,
            ),
        ];

        frame.render_widget(Paragraph::new(lines).block(block), popup_area);
    }
}
