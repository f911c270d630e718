use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::indexed;
use crate::library::StatusFilter;
use crate::models::{BookRecord, ReadingStatus};
use crate::settings::Palette;

pub struct LibraryWindow;

impl LibraryWindow {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        view: &[&BookRecord],
        selected: usize,
        filter: StatusFilter,
        palette: &Palette,
    ) {
        let tabs_area = Rect::new(area.x, area.y, area.width, 1);
        let list_area = Rect::new(
            area.x,
            area.y + 1,
            area.width,
            area.height.saturating_sub(1),
        );

        // Filter tabs, active one highlighted.
        let mut spans = Vec::new();
        for filter_option in StatusFilter::CYCLE {
            let style = if filter_option == filter {
                Style::default()
                    .fg(indexed(palette.accent))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(indexed(palette.text_secondary))
            };
            spans.push(Span::styled(format!(" {} ", filter_option.label()), style));
            spans.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), tabs_area);

        let block = Block::default()
            .title("Library")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.border)));

        if view.is_empty() {
            let message = match filter {
                StatusFilter::All => "You haven't added any books yet. Press 'a' to add one.",
                _ => "No books with this status. Press Tab to change the filter.",
            };
            let empty = Paragraph::new(message)
                .style(Style::default().fg(indexed(palette.text_secondary)))
                .block(block);
            frame.render_widget(empty, list_area);
            return;
        }

        let bar_width = 10usize;
        let items: Vec<ListItem> = view
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let status_color = indexed(status_color(record.status, palette));
                let mut line = vec![
                    Span::styled(
                        format!("{:<12}", record.status.label()),
                        Style::default().fg(status_color),
                    ),
                    Span::styled(
                        record.title.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!("  {}  ", record.author)),
                    Span::styled(
                        progress_bar(record.progress_fraction(), bar_width),
                        Style::default().fg(indexed(palette.secondary)),
                    ),
                    Span::raw(format!(" {}", progress_cell(record))),
                ];
                if i == selected {
                    line.insert(0, Span::raw("> "));
                } else {
                    line.insert(0, Span::raw("  "));
                }
                ListItem::new(Line::from(line))
            })
            .collect();

        let list = List::new(items).block(block);
        frame.render_widget(list, list_area);
    }
}

fn status_color(status: ReadingStatus, palette: &Palette) -> u8 {
    match status {
        ReadingStatus::ToRead => palette.info,
        ReadingStatus::InProgress => palette.warning,
        ReadingStatus::Finished => palette.success,
    }
}

/// "123/412 (30%)" for started books, a dash for untouched ones.
pub fn progress_cell(record: &BookRecord) -> String {
    if record.status == ReadingStatus::ToRead {
        return "\u{2014}".to_string();
    }
    let percent = (record.progress_fraction() * 100.0).round() as i64;
    format!(
        "{}/{} ({}%)",
        record.current_page, record.total_pages, percent
    )
}

/// Fixed-width block bar, filled proportionally to `fraction`.
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * width as f64).round() as usize;
    let filled = filled.min(width);
    let mut bar = String::new();
    for _ in 0..filled {
        bar.push('\u{2588}');
    }
    for _ in filled..width {
        bar.push('\u{2591}');
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(status: ReadingStatus, current: i64, total: i64) -> BookRecord {
        BookRecord {
            id: "1".to_string(),
            user_id: 1,
            isbn: "x".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            cover: String::new(),
            genre: "Science Fiction".to_string(),
            status,
            current_page: current,
            total_pages: total,
            date_added: Utc::now(),
        }
    }

    #[test]
    fn progress_cell_shows_pages_and_percent() {
        let cell = progress_cell(&record(ReadingStatus::InProgress, 123, 412));
        assert_eq!(cell, "123/412 (30%)");
    }

    #[test]
    fn progress_cell_is_dash_for_to_read() {
        assert_eq!(progress_cell(&record(ReadingStatus::ToRead, 0, 412)), "\u{2014}");
    }

    #[test]
    fn progress_cell_full_for_finished() {
        assert_eq!(
            progress_cell(&record(ReadingStatus::Finished, 412, 412)),
            "412/412 (100%)"
        );
    }

    #[test]
    fn progress_bar_scales_with_fraction() {
        assert_eq!(progress_bar(0.0, 4), "\u{2591}\u{2591}\u{2591}\u{2591}");
        assert_eq!(progress_bar(0.5, 4), "\u{2588}\u{2588}\u{2591}\u{2591}");
        assert_eq!(progress_bar(1.0, 4), "\u{2588}\u{2588}\u{2588}\u{2588}");
    }

    #[test]
    fn progress_bar_clamps_out_of_range_input() {
        assert_eq!(progress_bar(7.3, 3), "\u{2588}\u{2588}\u{2588}");
        assert_eq!(progress_bar(-1.0, 3), "\u{2591}\u{2591}\u{2591}");
    }
}
