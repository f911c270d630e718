pub mod chat;
pub mod detail;
pub mod form;
pub mod help;
pub mod library;
pub mod login;
pub mod search;
pub mod stats;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::settings::Palette;

/// Compute a centered popup area within the given area.
pub fn centered_popup_area(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let width = (area.width * width_percent) / 100;
    let height = (area.height * height_percent) / 100;
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;

    Rect::new(x, y, width, height)
}

pub fn indexed(value: u8) -> Color {
    Color::Indexed(value)
}

/// One-line input popup used for the page-number and ISBN prompts.
pub fn render_prompt(frame: &mut Frame, area: Rect, title: &str, value: &str, palette: &Palette) {
    let popup_area = centered_popup_area(area, 50, 20);
    let popup_area = Rect::new(popup_area.x, popup_area.y, popup_area.width, 3);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(indexed(palette.accent)));
    let paragraph = Paragraph::new(format!("{value}\u{2588}")).block(block);
    frame.render_widget(paragraph, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popup_area_is_centered_and_bounded() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_popup_area(area, 50, 50);
        assert_eq!(popup.width, 50);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 25);
        assert_eq!(popup.y, 10);
    }

    #[test]
    fn popup_area_respects_offset_origin() {
        let area = Rect::new(10, 5, 60, 20);
        let popup = centered_popup_area(area, 50, 50);
        assert_eq!(popup.x, 10 + 15);
        assert_eq!(popup.y, 5 + 5);
    }
}
