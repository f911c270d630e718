use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::indexed;
use crate::models::Book;
use crate::search::SearchSession;
use crate::settings::Palette;

pub struct SearchWindow;

impl SearchWindow {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        session: &SearchSession,
        selected: usize,
        input_active: bool,
        palette: &Palette,
    ) {
        let header_area = Rect::new(area.x, area.y, area.width, 3);
        let tabs_area = Rect::new(area.x, area.y + 3, area.width, 1);
        let list_area = Rect::new(
            area.x,
            area.y + 4,
            area.width,
            area.height.saturating_sub(4),
        );

        // Query input.
        let cursor = if input_active { "\u{2588}" } else { "" };
        let header_style = if input_active {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let header = Paragraph::new(Line::from(format!("/{}{}", session.query(), cursor)))
            .block(
                Block::default()
                    .title("Search title or author")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(indexed(palette.border))),
            )
            .style(header_style);
        frame.render_widget(header, header_area);

        // Genre tabs derived from the candidate set.
        let mut spans = Vec::new();
        for genre in session.genres() {
            let style = if genre == session.active_genre() {
                Style::default()
                    .fg(indexed(palette.accent))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(indexed(palette.text_secondary))
            };
            spans.push(Span::styled(format!(" {genre} "), style));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), tabs_area);

        let results = session.results();
        let block = Block::default()
            .title(format!("Results ({})", results.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.border)));

        if results.is_empty() {
            let empty = Paragraph::new("No books match this search.")
                .style(Style::default().fg(indexed(palette.text_secondary)))
                .block(block);
            frame.render_widget(empty, list_area);
            return;
        }

        let items: Vec<ListItem> = results
            .iter()
            .enumerate()
            .map(|(i, book)| {
                let marker = if i == selected { "> " } else { "  " };
                let style = if i == selected {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::styled(format!("{marker}{}", result_line(book)), style))
            })
            .collect();

        frame.render_widget(List::new(items).block(block), list_area);
    }
}

/// One result row: title, author, genre, year and rating.
pub fn result_line(book: &Book) -> String {
    let year = if book.year > 0 {
        format!(", {}", book.year)
    } else {
        String::new()
    };
    format!(
        "{} \u{2014} {}  ({}{year})  \u{2605}{:.1}",
        book.title, book.author, book.genre, book.rating
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, year: i32) -> Book {
        Book {
            isbn: "1".to_string(),
            title: title.to_string(),
            author: "Harper Lee".to_string(),
            cover: String::new(),
            genre: "Fiction".to_string(),
            rating: 4.5,
            year,
            total_pages: 336,
            description: None,
        }
    }

    #[test]
    fn result_line_includes_year_and_rating() {
        let line = result_line(&book("To Kill a Mockingbird", 1960));
        assert!(line.contains("To Kill a Mockingbird \u{2014} Harper Lee"));
        assert!(line.contains("Fiction, 1960"));
        assert!(line.contains("\u{2605}4.5"));
    }

    #[test]
    fn result_line_omits_unknown_year() {
        let line = result_line(&book("Untitled", 0));
        assert!(line.contains("(Fiction)"));
    }
}
