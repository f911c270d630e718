use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};

use super::indexed;
use crate::settings::Palette;
use crate::stats::ReadingStats;

pub struct StatsWindow;

impl StatsWindow {
    pub fn render(frame: &mut Frame, area: Rect, stats: &ReadingStats, palette: &Palette) {
        let block = Block::default()
            .title("Your Reading Stats")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.border)));

        let secondary = Style::default().fg(indexed(palette.text_secondary));
        let heading = Style::default()
            .fg(indexed(palette.primary))
            .add_modifier(Modifier::BOLD);

        let mut lines = vec![
            Line::styled("Reading Status", heading),
            Line::raw(format!(
                "  To Read {:>4}    In Progress {:>4}    Finished {:>4}",
                stats.status_counts.to_read,
                stats.status_counts.in_progress,
                stats.status_counts.finished
            )),
            Line::raw(""),
            Line::styled("Totals", heading),
            Line::raw(format!(
                "  {} books   {} pages read   {:.0}% average progress",
                stats.total_books, stats.pages_read, stats.average_progress
            )),
            Line::raw(""),
            Line::styled("Books finished per month", heading),
        ];

        let max_finished = stats
            .monthly_finished
            .iter()
            .map(|m| m.finished)
            .max()
            .unwrap_or(0);
        for month in &stats.monthly_finished {
            lines.push(Line::raw(format!(
                "  {:<4} {} {}",
                month.label,
                bar(month.finished, max_finished, 20),
                month.finished
            )));
        }

        lines.push(Line::raw(""));
        lines.push(Line::styled("Genres", heading));
        if stats.genre_distribution.is_empty() {
            lines.push(Line::styled("  nothing here yet", secondary));
        }
        for genre in stats.genre_distribution.iter().take(6) {
            lines.push(Line::raw(format!("  {:<18} {}", genre.name, genre.count)));
        }

        lines.push(Line::raw(""));
        lines.push(Line::styled("Recent activity", heading));
        if stats.recent_activity.is_empty() {
            lines.push(Line::styled("  nothing here yet", secondary));
        }
        for activity in &stats.recent_activity {
            lines.push(Line::raw(format!(
                "  {}  {}",
                activity.date.format("%Y-%m-%d"),
                activity.title
            )));
        }

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

/// Horizontal bar scaled against the largest bucket.
pub fn bar(count: usize, max: usize, width: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let filled = ((count as f64 / max as f64) * width as f64).round() as usize;
    "\u{2587}".repeat(filled.clamp(1, width))
}
