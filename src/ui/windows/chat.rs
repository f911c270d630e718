use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};
use textwrap::{Options, WordSplitter};

use super::indexed;
use crate::chat::ChatSession;
use crate::models::{ChatMessage, ChatRole};
use crate::settings::Palette;

pub struct ChatWindow;

impl ChatWindow {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        session: &ChatSession,
        input: &str,
        palette: &Palette,
    ) {
        let input_height = 3u16;
        let transcript_area = Rect::new(
            area.x,
            area.y,
            area.width,
            area.height.saturating_sub(input_height),
        );
        let input_area = Rect::new(
            area.x,
            area.y + transcript_area.height,
            area.width,
            input_height.min(area.height),
        );

        let block = Block::default()
            .title("BookBot Assistant")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.border)));
        let inner_width = transcript_area.width.saturating_sub(2) as usize;
        let inner_height = transcript_area.height.saturating_sub(2) as usize;

        let mut lines = transcript_lines(session, inner_width);
        if session.is_busy() {
            lines.push("BookBot is thinking...".to_string());
        }

        // Pin the view to the newest lines.
        let skip = lines.len().saturating_sub(inner_height);
        let visible: Vec<Line> = lines
            .into_iter()
            .skip(skip)
            .map(|l| {
                if l.starts_with("You:") {
                    Line::styled(
                        l,
                        Style::default()
                            .fg(indexed(palette.secondary))
                            .add_modifier(Modifier::BOLD),
                    )
                } else if l.starts_with("BookBot:") {
                    Line::styled(l, Style::default().fg(indexed(palette.primary)))
                } else {
                    Line::raw(l)
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(visible).block(block), transcript_area);

        let input_block = Block::default()
            .title("Ask me about books... (Enter to send, Esc to leave)")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.accent)));
        frame.render_widget(
            Paragraph::new(format!("{input}\u{2588}")).block(input_block),
            input_area,
        );
    }
}

/// Flatten the conversation into display lines wrapped at `width`.
pub fn transcript_lines(session: &ChatSession, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for message in session.messages() {
        lines.extend(message_lines(message, width));
        lines.push(String::new());
    }
    lines.pop();
    lines
}

/// Lines for one message: a role-tagged first line, continuation indented,
/// recommendation entries bulleted underneath.
pub fn message_lines(message: &ChatMessage, width: usize) -> Vec<String> {
    let prefix = match message.role {
        ChatRole::User => "You: ",
        ChatRole::Assistant => "BookBot: ",
    };

    let mut lines = Vec::new();
    let wrapped = wrap_text(&format!("{prefix}{}", message.content), width);
    lines.extend(wrapped);

    for book in &message.books {
        let pages = if book.total_pages > 0 {
            format!(", {} pages", book.total_pages)
        } else {
            String::new()
        };
        lines.extend(wrap_text(
            &format!(
                "  \u{2022} {} \u{2014} {} ({}{pages})",
                book.title, book.author, book.genre
            ),
            width,
        ));
    }
    lines
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width < 10 {
        return text.lines().map(str::to_string).collect();
    }
    let options = Options::new(width).word_splitter(WordSplitter::NoHyphenation);
    text.lines()
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, &options)
                    .into_iter()
                    .map(|w| w.to_string())
                    .collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookRecord;
    use chrono::Utc;

    #[test]
    fn message_lines_tag_roles() {
        let user = ChatMessage::new(1, ChatRole::User, "recommend fantasy");
        assert_eq!(message_lines(&user, 80), vec!["You: recommend fantasy"]);

        let bot = ChatMessage::new(2, ChatRole::Assistant, "Sure!");
        assert_eq!(message_lines(&bot, 80), vec!["BookBot: Sure!"]);
    }

    #[test]
    fn long_messages_wrap_to_width() {
        let message = ChatMessage::new(
            1,
            ChatRole::Assistant,
            "a rather long reply that certainly needs wrapping at a narrow terminal width",
        );
        let lines = message_lines(&message, 30);
        assert!(lines.len() > 1);
        for line in lines {
            assert!(line.chars().count() <= 30, "too long: {line:?}");
        }
    }

    #[test]
    fn recommendations_render_as_bullets() {
        let mut message = ChatMessage::new(1, ChatRole::Assistant, "Try this:");
        message.books.push(BookRecord {
            id: String::new(),
            user_id: 1,
            isbn: "1".to_string(),
            title: "Mistborn".to_string(),
            author: "Brandon Sanderson".to_string(),
            cover: String::new(),
            genre: "Fantasy".to_string(),
            status: crate::models::ReadingStatus::ToRead,
            current_page: 0,
            total_pages: 541,
            date_added: Utc::now(),
        });
        let lines = message_lines(&message, 80);
        assert_eq!(lines[0], "BookBot: Try this:");
        assert!(lines[1].contains("\u{2022} Mistborn \u{2014} Brandon Sanderson (Fantasy, 541 pages)"));
    }

    #[test]
    fn transcript_separates_messages_with_blank_lines() {
        let session = ChatSession::new();
        let lines = transcript_lines(&session, 100);
        // Two greeting messages with one separator between them.
        assert!(lines.iter().filter(|l| l.is_empty()).count() >= 1);
        assert!(lines[0].starts_with("BookBot:"));
    }

    #[test]
    fn multiline_content_preserves_explicit_breaks() {
        let message = ChatMessage::new(1, ChatRole::Assistant, "one\ntwo");
        let lines = message_lines(&message, 80);
        assert_eq!(lines, vec!["BookBot: one", "two"]);
    }
}
