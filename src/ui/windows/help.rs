use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::{centered_popup_area, indexed};
use crate::settings::Palette;

pub struct HelpWindow;

impl HelpWindow {
    pub fn render(frame: &mut Frame, area: Rect, palette: &Palette) {
        let popup_area = centered_popup_area(area, 70, 80);
        frame.render_widget(Clear, popup_area);

        let heading = Style::default()
            .fg(indexed(palette.primary))
            .add_modifier(Modifier::BOLD);

        let lines = vec![
            Line::styled("Everywhere", heading),
            Line::raw("  1/2/3/4      switch to Stats / Library / Search / Chat"),
            Line::raw("  ?            toggle this help"),
            Line::raw("  L            log out"),
            Line::raw("  q            quit"),
            Line::raw(""),
            Line::styled("Library", heading),
            Line::raw("  j/k, arrows  move selection"),
            Line::raw("  Tab          cycle status filter"),
            Line::raw("  Enter        open book details"),
            Line::raw("  s            start reading (page 1)"),
            Line::raw("  u            bump progress by the configured step"),
            Line::raw("  p            set the exact page"),
            Line::raw("  a            add a book by ISBN (prefills the form)"),
            Line::raw("  n            add a book by hand"),
            Line::raw("  d            remove the selected book (asks first)"),
            Line::raw("  r            reload from the server"),
            Line::raw(""),
            Line::styled("Search", heading),
            Line::raw("  /            edit the query (Enter/Esc to stop)"),
            Line::raw("  g            cycle the genre filter"),
            Line::raw("  j/k, arrows  move selection"),
            Line::raw("  a            add the selected book to the library"),
            Line::raw("  r            refresh the catalog"),
            Line::raw(""),
            Line::styled("Chat", heading),
            Line::raw("  type + Enter send a message"),
            Line::raw("  Ctrl+A       add the latest recommendation to the library"),
            Line::raw("  Ctrl+L       clear the conversation"),
            Line::raw("  Esc          back to the library"),
        ];

        let block = Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.accent)));
        frame.render_widget(Paragraph::new(lines).block(block), popup_area);
    }
}
