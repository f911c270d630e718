use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::{centered_popup_area, indexed};
use crate::models::{BookRecord, ReadingStatus};
use crate::settings::Palette;

pub struct DetailWindow;

impl DetailWindow {
    pub fn render(frame: &mut Frame, area: Rect, record: &BookRecord, palette: &Palette) {
        let popup_area = centered_popup_area(area, 70, 60);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(record.title.clone())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.primary)));

        let paragraph = Paragraph::new(detail_lines(record).join("\n"))
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup_area);
    }
}

pub fn detail_lines(record: &BookRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Author    {}", record.author),
        format!("Genre     {}", record.genre),
        format!("ISBN      {}", record.isbn),
        format!("Status    {}", record.status.label()),
    ];
    if record.status != ReadingStatus::ToRead {
        let percent = (record.progress_fraction() * 100.0).round() as i64;
        lines.push(format!(
            "Progress  {} of {} pages ({percent}%)",
            record.current_page, record.total_pages
        ));
    } else {
        lines.push(format!("Pages     {}", record.total_pages));
    }
    lines.push(format!(
        "Added     {}",
        record.date_added.format("%Y-%m-%d")
    ));
    lines.push(String::new());
    lines.push(
        "s: start reading   u: update progress   p: set page   d: remove   Esc: close"
            .to_string(),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(status: ReadingStatus, current: i64) -> BookRecord {
        BookRecord {
            id: "1".to_string(),
            user_id: 1,
            isbn: "9780441172719".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            cover: String::new(),
            genre: "Science Fiction".to_string(),
            status,
            current_page: current,
            total_pages: 412,
            date_added: Utc.with_ymd_and_hms(2023, 10, 15, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn detail_lines_show_progress_for_started_books() {
        let lines = detail_lines(&record(ReadingStatus::InProgress, 123));
        assert!(lines.iter().any(|l| l.contains("123 of 412 pages (30%)")));
        assert!(lines.iter().any(|l| l.contains("2023-10-15")));
    }

    #[test]
    fn detail_lines_show_page_count_for_to_read() {
        let lines = detail_lines(&record(ReadingStatus::ToRead, 0));
        assert!(lines.iter().any(|l| l.starts_with("Pages")));
        assert!(!lines.iter().any(|l| l.starts_with("Progress")));
    }
}
