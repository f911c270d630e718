use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::{centered_popup_area, indexed};
use crate::settings::Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Username,
    Password,
    Genres,
}

/// Login/registration form state. Registration adds the favourite-genres
/// field (comma separated) on top of the credentials.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub genres: String,
    pub register_mode: bool,
    pub focus: LoginField,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginForm {
    pub fn new() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            genres: String::new(),
            register_mode: false,
            focus: LoginField::Username,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = match (self.focus, self.register_mode) {
            (LoginField::Username, _) => LoginField::Password,
            (LoginField::Password, true) => LoginField::Genres,
            (LoginField::Password, false) => LoginField::Username,
            (LoginField::Genres, _) => LoginField::Username,
        };
    }

    pub fn toggle_mode(&mut self) {
        self.register_mode = !self.register_mode;
        self.focus = LoginField::Username;
    }

    pub fn push_char(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
            LoginField::Genres => &mut self.genres,
        }
    }

    pub fn favourite_genres(&self) -> Vec<String> {
        self.genres
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub fn mask(len: usize) -> String {
    "*".repeat(len)
}

pub struct LoginWindow;

impl LoginWindow {
    pub fn render(frame: &mut Frame, area: Rect, form: &LoginForm, palette: &Palette) {
        let popup_area = centered_popup_area(area, 60, 60);
        frame.render_widget(Clear, popup_area);

        let title = if form.register_mode {
            "ReadTracker \u{2014} Register"
        } else {
            "ReadTracker \u{2014} Login"
        };
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(indexed(palette.primary)));

        let focus_style = Style::default()
            .fg(indexed(palette.accent))
            .add_modifier(Modifier::BOLD);
        let label_style = Style::default().fg(indexed(palette.text_secondary));

        let field_line = |label: &str, value: String, focused: bool| {
            let cursor = if focused { "\u{2588}" } else { "" };
            let style = if focused { focus_style } else { Style::default() };
            Line::styled(format!("{label:<10} {value}{cursor}"), style)
        };

        let mut lines = vec![
            Line::styled("Track your reading journey", label_style),
            Line::raw(""),
            field_line(
                "Username",
                form.username.clone(),
                form.focus == LoginField::Username,
            ),
            field_line(
                "Password",
                mask(form.password.len()),
                form.focus == LoginField::Password,
            ),
        ];
        if form.register_mode {
            lines.push(field_line(
                "Genres",
                form.genres.clone(),
                form.focus == LoginField::Genres,
            ));
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                "comma-separated favourite genres, e.g. Fantasy, History",
                label_style,
            ));
        }
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            "Tab: next field   Enter: submit   Ctrl+R: switch login/register   Esc: quit",
            label_style,
        ));

        let paragraph = Paragraph::new(lines).block(block);
        frame.render_widget(paragraph, popup_area);
    }
}
