use std::io;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
};

use crate::api::{ApiClient, ChatApi, RecordsApi};
use crate::chat::{self, ChatEvent, ChatSession};
use crate::cli::Cli;
use crate::config::Config;
use crate::demo::{self, DemoApi};
use crate::error::AuthError;
use crate::library::{LibraryStore, StatusFilter};
use crate::logging;
use crate::models::{Book, User};
use crate::search::SearchSession;
use crate::session::AuthSession;
use crate::settings::Palette;
use crate::stats::ReadingStats;
use crate::ui::windows::{
    self, chat::ChatWindow, detail::DetailWindow, form::FormWindow, form::RecordForm,
    help::HelpWindow, library::LibraryWindow, login::LoginForm, login::LoginWindow,
    search::SearchWindow, stats::StatsWindow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Stats,
    Library,
    Search,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Error,
}

/// Modal input currently capturing keys on the library screen.
#[derive(Debug, Clone, PartialEq)]
enum LibraryPrompt {
    Page(String),
    Isbn(String),
    ConfirmDelete(String),
}

const MESSAGE_TTL: Duration = Duration::from_secs(4);

/// The application shell: owns the stores, routes key events, and polls the
/// chat worker channel. All store mutations happen on this thread, so a later
/// response simply overwrites an earlier one.
pub struct App {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    palette: Palette,
    page_step: i64,
    use_streaming_chat: bool,
    demo_mode: bool,

    records_api: Box<dyn RecordsApi>,
    chat_api: Arc<dyn ChatApi + Sync>,
    api: Option<ApiClient>,
    auth: Option<AuthSession>,

    user: Option<User>,
    library: LibraryStore,
    search: SearchSession,
    chat: ChatSession,
    chat_rx: Option<Receiver<ChatEvent>>,
    chat_input: String,

    screen: Screen,
    should_quit: bool,
    show_help: bool,

    login_form: LoginForm,
    library_filter: StatusFilter,
    library_selected: usize,
    library_prompt: Option<LibraryPrompt>,
    record_form: Option<RecordForm>,
    detail_open: bool,
    search_selected: usize,
    search_input_active: bool,

    message: Option<String>,
    message_type: MessageType,
    message_time: Option<Instant>,
}

impl App {
    pub fn new(config: Config, cli: &Cli) -> eyre::Result<Self> {
        let mut settings = config.settings.clone();
        if let Some(endpoint) = &cli.endpoint {
            settings.api_endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &cli.chat_endpoint {
            settings.chatbot_endpoint = endpoint.clone();
        }

        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;

        let (records_api, chat_api, api, auth): (
            Box<dyn RecordsApi>,
            Arc<dyn ChatApi + Sync>,
            Option<ApiClient>,
            Option<AuthSession>,
        ) = if cli.demo {
            (Box::new(DemoApi), Arc::new(DemoApi), None, None)
        } else {
            let client = ApiClient::new(
                &settings.api_endpoint,
                &settings.chatbot_endpoint,
                &settings.metadata_endpoint,
                Duration::from_secs(settings.request_timeout_secs),
            )?;
            (
                Box::new(client.clone()),
                Arc::new(client.clone()),
                Some(client),
                Some(AuthSession::new()?),
            )
        };

        let mut app = Self {
            terminal,
            palette: settings.theme.palette(),
            page_step: settings.page_step.max(1),
            use_streaming_chat: settings.use_streaming_chat,
            demo_mode: cli.demo,
            records_api,
            chat_api,
            api,
            auth,
            user: None,
            library: LibraryStore::new(0),
            search: SearchSession::new(),
            chat: ChatSession::new(),
            chat_rx: None,
            chat_input: String::new(),
            screen: Screen::Login,
            should_quit: false,
            show_help: false,
            login_form: LoginForm::new(),
            library_filter: StatusFilter::All,
            library_selected: 0,
            library_prompt: None,
            record_form: None,
            detail_open: false,
            search_selected: 0,
            search_input_active: false,
            message: None,
            message_type: MessageType::Info,
            message_time: None,
        };

        if app.demo_mode {
            app.enter_session(User {
                id: 0,
                username: "reader".to_string(),
                favourite_genres: Vec::new(),
            });
        } else if let Some(auth) = &app.auth {
            // Decide the initial route from the persisted session.
            if auth.is_logged_in()? {
                if let Some(user_id) = auth.current_user_id()? {
                    app.enter_session(User {
                        id: user_id,
                        username: String::new(),
                        favourite_genres: Vec::new(),
                    });
                }
            }
        }

        Ok(app)
    }

    fn user_id(&self) -> i64 {
        self.user.as_ref().map(|u| u.id).unwrap_or(0)
    }

    fn set_message(&mut self, message: impl Into<String>, message_type: MessageType) {
        self.message = Some(message.into());
        self.message_type = message_type;
        self.message_time = Some(Instant::now());
    }

    fn message_expired(&self) -> bool {
        self.message_time.is_some_and(|t| t.elapsed() >= MESSAGE_TTL)
    }

    // ---- session lifecycle ----

    fn enter_session(&mut self, user: User) {
        self.library = LibraryStore::new(user.id);
        self.user = Some(user);
        self.chat.reset();
        self.chat_input.clear();
        self.load_library();
        self.load_catalog();
        self.screen = Screen::Stats;
    }

    fn logout(&mut self) {
        if let Some(auth) = &self.auth {
            if let Err(err) = auth.logout() {
                logging::error(format!("Could not clear persisted session: {err}"));
            }
        }
        // No cross-session leakage: every store resets.
        self.library.reset();
        self.search.reset();
        self.chat.reset();
        self.chat_rx = None;
        self.chat_input.clear();
        self.user = None;
        self.login_form = LoginForm::new();
        self.library_filter = StatusFilter::All;
        self.library_selected = 0;
        self.library_prompt = None;
        self.record_form = None;
        self.detail_open = false;
        self.screen = Screen::Login;
        self.set_message("Logged out", MessageType::Info);
    }

    fn submit_login(&mut self) {
        let Some(api) = self.api.clone() else {
            return;
        };
        let username = self.login_form.username.trim().to_string();
        let password = self.login_form.password.clone();
        if username.is_empty() || password.is_empty() {
            self.set_message(
                "Please enter both username and password",
                MessageType::Error,
            );
            return;
        }

        if self.login_form.register_mode {
            let genres = self.login_form.favourite_genres();
            match api.register(&username, &password, &genres) {
                Ok(_) => {
                    self.set_message("Account created", MessageType::Success);
                }
                Err(err) => {
                    self.set_message(err.to_string(), MessageType::Error);
                    return;
                }
            }
        }

        match api.login(&username, &password) {
            Ok(user) => {
                if let Some(auth) = &self.auth {
                    if let Err(err) = auth.save_login(user.id) {
                        logging::error(format!("Could not persist session: {err}"));
                    }
                }
                self.set_message(format!("Welcome back, {}", user.username), MessageType::Success);
                self.enter_session(user);
            }
            Err(err) => {
                let text = match err {
                    AuthError::Other { .. } => {
                        logging::error(err.to_string());
                        "Login failed".to_string()
                    }
                    friendly => friendly.to_string(),
                };
                self.set_message(text, MessageType::Error);
            }
        }
    }

    // ---- data loading ----

    fn load_library(&mut self) {
        match self.library.load(&*self.records_api) {
            Ok(count) => {
                self.set_message(format!("Loaded {count} books"), MessageType::Info);
            }
            Err(err) => {
                logging::error(err.to_string());
                if self.library.is_empty() {
                    // Keep the screen useful: fall back to the demo shelf.
                    self.library.replace_all(demo::demo_records(self.user_id()));
                    self.set_message(
                        format!("{err} \u{2014} showing the demo shelf"),
                        MessageType::Error,
                    );
                } else {
                    self.set_message(err.to_string(), MessageType::Error);
                }
            }
        }
        self.library_selected = 0;
    }

    fn load_catalog(&mut self) {
        if self.demo_mode {
            self.search.set_candidates(demo::demo_books());
            return;
        }
        let Some(api) = &self.api else { return };
        match api.fetch_books() {
            Ok(books) => self.search.set_candidates(books),
            Err(err) => {
                logging::error(err.to_string());
                if self.search.candidates().is_empty() {
                    self.search.set_candidates(demo::demo_books());
                    self.set_message(
                        format!("{err} \u{2014} searching the demo catalog"),
                        MessageType::Error,
                    );
                } else {
                    self.set_message(err.to_string(), MessageType::Error);
                }
            }
        }
        self.search_selected = 0;
    }

    fn lookup_book(&self, isbn: &str) -> Result<Option<Book>, crate::error::StoreError> {
        if let Some(api) = &self.api {
            api.lookup_isbn(isbn)
        } else {
            Ok(demo::demo_books().into_iter().find(|b| b.isbn == isbn))
        }
    }

    // ---- library actions ----

    fn selected_library_isbn(&self) -> Option<String> {
        let view = self.library.filtered_sorted(self.library_filter);
        if view.is_empty() {
            return None;
        }
        let index = self.library_selected.min(view.len() - 1);
        Some(view[index].isbn.clone())
    }

    fn update_progress(&mut self, isbn: &str, new_page: i64) {
        match self.library.update_progress(&*self.records_api, isbn, new_page) {
            Ok(record) => {
                let text = format!(
                    "\"{}\" \u{2014} page {} ({})",
                    record.title,
                    record.current_page,
                    record.status.label()
                );
                self.set_message(text, MessageType::Success);
            }
            Err(err) => self.set_message(err.to_string(), MessageType::Error),
        }
    }

    fn bump_progress(&mut self, isbn: &str) {
        let Some(record) = self.library.get(isbn) else {
            return;
        };
        let next = record.current_page + self.page_step;
        self.update_progress(isbn, next);
    }

    fn remove_record(&mut self, isbn: &str) {
        match self.library.remove(&*self.records_api, isbn) {
            Ok(removed) => {
                self.set_message(
                    format!("Removed \"{}\" from your library", removed.title),
                    MessageType::Success,
                );
                self.detail_open = false;
            }
            Err(err) => self.set_message(err.to_string(), MessageType::Error),
        }
    }

    /// ISBN lookup prefills the add-book form; the user reviews and submits.
    fn open_form_for_isbn(&mut self, isbn: &str) {
        let isbn = isbn.trim();
        if isbn.is_empty() {
            return;
        }
        match self.lookup_book(isbn) {
            Ok(Some(book)) => {
                self.record_form = Some(RecordForm::prefilled(&book));
            }
            Ok(None) => {
                self.set_message(format!("No book found for ISBN {isbn}"), MessageType::Info);
            }
            Err(err) => self.set_message(err.to_string(), MessageType::Error),
        }
    }

    fn submit_record_form(&mut self) {
        let Some(form) = &self.record_form else {
            return;
        };
        let candidate = match form.build_record(self.user_id(), Utc::now()) {
            Ok(candidate) => candidate,
            Err(err) => {
                self.set_message(err.to_string(), MessageType::Error);
                return;
            }
        };
        match self.library.add(&*self.records_api, candidate) {
            Ok(record) => {
                let title = record.title.clone();
                self.record_form = None;
                self.set_message(
                    format!("Added \"{title}\" to your library"),
                    MessageType::Success,
                );
            }
            Err(err) => self.set_message(err.to_string(), MessageType::Error),
        }
    }

    fn add_search_selection(&mut self) {
        let book = {
            let results = self.search.results();
            if results.is_empty() {
                return;
            }
            results[self.search_selected.min(results.len() - 1)].clone()
        };
        match self.library.add_book(&*self.records_api, &book) {
            Ok(record) => {
                let title = record.title.clone();
                self.set_message(
                    format!("Added \"{title}\" to your library"),
                    MessageType::Success,
                );
            }
            Err(err) => self.set_message(err.to_string(), MessageType::Error),
        }
    }

    // ---- chat ----

    fn send_chat_message(&mut self) {
        let text = self.chat_input.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.chat.is_busy() {
            self.set_message("BookBot is still replying...", MessageType::Info);
            return;
        }
        if !self.chat.begin_send(&text) {
            return;
        }
        self.chat_input.clear();

        let (tx, rx) = channel();
        self.chat_rx = Some(rx);
        let api = Arc::clone(&self.chat_api);
        let user_id = self.user_id();
        let use_streaming = self.use_streaming_chat;
        std::thread::spawn(move || {
            chat::run_chat_exchange(&*api, &text, user_id, use_streaming, &tx);
        });
    }

    fn poll_chat_events(&mut self) {
        let Some(rx) = self.chat_rx.take() else {
            return;
        };
        let user_id = self.user_id();
        let mut keep = true;
        loop {
            match rx.try_recv() {
                Ok(event) => chat::apply_event(&mut self.chat, event, user_id),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    keep = false;
                    break;
                }
            }
        }
        if keep {
            self.chat_rx = Some(rx);
        }
    }

    /// Add the first recommendation of the latest recommendation message; the
    /// confirmation (or the failure) lands in the conversation itself.
    fn add_latest_recommendation(&mut self) {
        let candidate = self
            .chat
            .messages()
            .iter()
            .rev()
            .find(|m| m.is_recommendation())
            .map(|m| m.books[0].clone());
        let Some(mut candidate) = candidate else {
            self.set_message("No recommendation to add yet", MessageType::Info);
            return;
        };
        candidate.id.clear();
        candidate.user_id = self.user_id();
        candidate.date_added = Utc::now();
        let title = candidate.title.clone();
        match self.library.add(&*self.records_api, candidate) {
            Ok(_) => self.chat.note_added(&title),
            Err(err) => {
                logging::error(err.to_string());
                self.chat.note_add_failed();
            }
        }
    }

    // ---- event handling ----

    fn handle_key_event(&mut self, key: KeyEvent) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Library => self.handle_library_key(key),
            Screen::Search => self.handle_search_key(key),
            Screen::Chat => self.handle_chat_key(key),
            Screen::Stats => {
                self.handle_global_key(key);
            }
        }
    }

    fn handle_global_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                true
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                true
            }
            KeyCode::Char('L') => {
                if !self.demo_mode {
                    self.logout();
                } else {
                    self.should_quit = true;
                }
                true
            }
            KeyCode::Char('1') => {
                self.screen = Screen::Stats;
                true
            }
            KeyCode::Char('2') => {
                self.screen = Screen::Library;
                true
            }
            KeyCode::Char('3') => {
                self.screen = Screen::Search;
                true
            }
            KeyCode::Char('4') => {
                self.screen = Screen::Chat;
                true
            }
            _ => false,
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.login_form.toggle_mode();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.login_form.push_char(c);
            }
            KeyCode::Backspace => self.login_form.backspace(),
            KeyCode::Tab | KeyCode::Down => self.login_form.next_field(),
            KeyCode::Enter => self.submit_login(),
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_library_key(&mut self, key: KeyEvent) {
        if self.record_form.is_some() {
            self.handle_form_key(key);
            return;
        }

        // An open prompt swallows everything first.
        if let Some(prompt) = self.library_prompt.clone() {
            self.handle_library_prompt_key(prompt, key);
            return;
        }

        if self.detail_open {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => {
                    self.detail_open = false;
                    return;
                }
                _ => {}
            }
        }

        let view_len = self.library.filtered_sorted(self.library_filter).len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if view_len > 0 {
                    self.library_selected = (self.library_selected + 1).min(view_len - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.library_selected = self.library_selected.saturating_sub(1);
            }
            KeyCode::Tab => {
                self.library_filter = self.library_filter.next();
                self.library_selected = 0;
            }
            KeyCode::Enter => {
                if self.selected_library_isbn().is_some() {
                    self.detail_open = true;
                }
            }
            KeyCode::Char('s') => {
                if let Some(isbn) = self.selected_library_isbn() {
                    self.update_progress(&isbn, 1);
                }
            }
            KeyCode::Char('u') => {
                if let Some(isbn) = self.selected_library_isbn() {
                    self.bump_progress(&isbn);
                }
            }
            KeyCode::Char('p') => {
                if self.selected_library_isbn().is_some() {
                    self.library_prompt = Some(LibraryPrompt::Page(String::new()));
                }
            }
            KeyCode::Char('a') => {
                self.library_prompt = Some(LibraryPrompt::Isbn(String::new()));
            }
            KeyCode::Char('n') => {
                self.record_form = Some(RecordForm::new());
            }
            KeyCode::Char('d') => {
                if let Some(isbn) = self.selected_library_isbn() {
                    self.library_prompt = Some(LibraryPrompt::ConfirmDelete(isbn));
                }
            }
            KeyCode::Char('r') => self.load_library(),
            KeyCode::Char('c') => self.screen = Screen::Chat,
            _ => {
                self.handle_global_key(key);
            }
        }
    }

    fn handle_library_prompt_key(&mut self, prompt: LibraryPrompt, key: KeyEvent) {
        match prompt {
            LibraryPrompt::Page(mut value) => match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    value.push(c);
                    self.library_prompt = Some(LibraryPrompt::Page(value));
                }
                KeyCode::Backspace => {
                    value.pop();
                    self.library_prompt = Some(LibraryPrompt::Page(value));
                }
                KeyCode::Enter => {
                    self.library_prompt = None;
                    if let (Some(isbn), Ok(page)) =
                        (self.selected_library_isbn(), value.parse::<i64>())
                    {
                        self.update_progress(&isbn, page);
                    }
                }
                KeyCode::Esc => self.library_prompt = None,
                _ => self.library_prompt = Some(LibraryPrompt::Page(value)),
            },
            LibraryPrompt::Isbn(mut value) => match key.code {
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    value.push(c);
                    self.library_prompt = Some(LibraryPrompt::Isbn(value));
                }
                KeyCode::Backspace => {
                    value.pop();
                    self.library_prompt = Some(LibraryPrompt::Isbn(value));
                }
                KeyCode::Enter => {
                    self.library_prompt = None;
                    self.open_form_for_isbn(&value);
                }
                KeyCode::Esc => self.library_prompt = None,
                _ => self.library_prompt = Some(LibraryPrompt::Isbn(value)),
            },
            LibraryPrompt::ConfirmDelete(isbn) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.library_prompt = None;
                    self.remove_record(&isbn);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.library_prompt = None;
                }
                _ => self.library_prompt = Some(LibraryPrompt::ConfirmDelete(isbn)),
            },
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(form) = &mut self.record_form else {
            return;
        };
        match key.code {
            KeyCode::Tab => form.next_field(),
            KeyCode::Left | KeyCode::Right => form.cycle_status(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                form.push_char(c);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => self.submit_record_form(),
            KeyCode::Esc => self.record_form = None,
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        if self.search_input_active {
            match key.code {
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    let mut query = self.search.query().to_string();
                    query.push(c);
                    self.search.set_query(query);
                    self.search_selected = 0;
                }
                KeyCode::Backspace => {
                    let mut query = self.search.query().to_string();
                    query.pop();
                    self.search.set_query(query);
                    self.search_selected = 0;
                }
                KeyCode::Enter | KeyCode::Esc => self.search_input_active = false,
                _ => {}
            }
            return;
        }

        let results_len = self.search.results().len();
        match key.code {
            KeyCode::Char('/') => self.search_input_active = true,
            KeyCode::Char('g') => {
                self.search.cycle_genre();
                self.search_selected = 0;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if results_len > 0 {
                    self.search_selected = (self.search_selected + 1).min(results_len - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.search_selected = self.search_selected.saturating_sub(1);
            }
            KeyCode::Char('a') | KeyCode::Enter => self.add_search_selection(),
            KeyCode::Char('r') => self.load_catalog(),
            _ => {
                self.handle_global_key(key);
            }
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.add_latest_recommendation();
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if !self.chat.is_busy() {
                    self.chat.reset();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.chat_input.push(c);
            }
            KeyCode::Backspace => {
                self.chat_input.pop();
            }
            KeyCode::Enter => self.send_chat_message(),
            KeyCode::Esc => self.screen = Screen::Library,
            _ => {}
        }
    }

    // ---- rendering ----

    fn draw(&mut self) -> eyre::Result<()> {
        let Self {
            terminal,
            palette,
            demo_mode,
            user,
            library,
            search,
            chat,
            chat_input,
            screen,
            show_help,
            login_form,
            library_filter,
            library_selected,
            library_prompt,
            record_form,
            detail_open,
            search_selected,
            search_input_active,
            message,
            message_type,
            ..
        } = self;

        terminal.draw(|frame| {
            let full = frame.area();
            if full.height < 4 {
                return;
            }

            if *screen == Screen::Login {
                LoginWindow::render(frame, full, login_form, palette);
            } else {
                let tabs_area = Rect::new(full.x, full.y, full.width, 1);
                let content = Rect::new(full.x, full.y + 1, full.width, full.height - 2);

                let mut spans = Vec::new();
                for (label, tab) in [
                    ("1 Stats", Screen::Stats),
                    ("2 Library", Screen::Library),
                    ("3 Search", Screen::Search),
                    ("4 Chat", Screen::Chat),
                ] {
                    let style = if tab == *screen {
                        Style::default()
                            .fg(windows::indexed(palette.accent))
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(windows::indexed(palette.text_secondary))
                    };
                    spans.push(Span::styled(format!(" {label} "), style));
                }
                let who = user
                    .as_ref()
                    .map(|u| {
                        if u.username.is_empty() {
                            format!("user {}", u.id)
                        } else {
                            u.username.clone()
                        }
                    })
                    .unwrap_or_default();
                let badge = if *demo_mode {
                    format!("  demo \u{00b7} {who}")
                } else {
                    format!("  {who}")
                };
                spans.push(Span::styled(
                    badge,
                    Style::default().fg(windows::indexed(palette.text_secondary)),
                ));
                frame.render_widget(
                    ratatui::widgets::Paragraph::new(Line::from(spans)),
                    tabs_area,
                );

                match screen {
                    Screen::Stats => {
                        let stats = ReadingStats::from_records(library.records(), Utc::now());
                        StatsWindow::render(frame, content, &stats, palette);
                    }
                    Screen::Library => {
                        let view = library.filtered_sorted(*library_filter);
                        let selected = (*library_selected).min(view.len().saturating_sub(1));
                        LibraryWindow::render(
                            frame,
                            content,
                            &view,
                            selected,
                            *library_filter,
                            palette,
                        );
                        if *detail_open {
                            if let Some(record) = view.get(selected) {
                                DetailWindow::render(frame, full, record, palette);
                            }
                        }
                        match library_prompt {
                            Some(LibraryPrompt::Page(value)) => {
                                windows::render_prompt(frame, full, "Set page", value, palette);
                            }
                            Some(LibraryPrompt::Isbn(value)) => {
                                windows::render_prompt(
                                    frame,
                                    full,
                                    "Add by ISBN",
                                    value,
                                    palette,
                                );
                            }
                            Some(LibraryPrompt::ConfirmDelete(isbn)) => {
                                let title = library
                                    .get(isbn)
                                    .map(|r| r.title.clone())
                                    .unwrap_or_else(|| isbn.clone());
                                windows::render_prompt(
                                    frame,
                                    full,
                                    &format!("Remove \"{title}\"? (y/n)"),
                                    "",
                                    palette,
                                );
                            }
                            None => {}
                        }
                        if let Some(form) = record_form {
                            FormWindow::render(frame, full, form, palette);
                        }
                    }
                    Screen::Search => {
                        SearchWindow::render(
                            frame,
                            content,
                            search,
                            *search_selected,
                            *search_input_active,
                            palette,
                        );
                    }
                    Screen::Chat => {
                        ChatWindow::render(frame, content, chat, chat_input, palette);
                    }
                    Screen::Login => unreachable!(),
                }
            }

            // Status line.
            let status_area = Rect::new(full.x, full.y + full.height - 1, full.width, 1);
            let (text, color) = match message {
                Some(text) => (
                    text.clone(),
                    match message_type {
                        MessageType::Info => palette.info,
                        MessageType::Success => palette.success,
                        MessageType::Error => palette.warning,
                    },
                ),
                None => ("? help".to_string(), palette.text_secondary),
            };
            frame.render_widget(
                ratatui::widgets::Paragraph::new(Line::styled(
                    text,
                    Style::default().fg(windows::indexed(color)),
                )),
                status_area,
            );

            if *show_help {
                HelpWindow::render(frame, full, palette);
            }
        })?;
        Ok(())
    }

    /// Run the main application loop.
    pub fn run(&mut self) -> eyre::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        self.terminal.clear()?;
        self.terminal.hide_cursor()?;

        loop {
            if self.should_quit {
                break;
            }

            if self.message_expired() {
                self.message = None;
                self.message_time = None;
            }

            // Apply whatever the chat worker produced since the last tick.
            self.poll_chat_events();

            self.draw()?;

            let poll_timeout = if self.chat.is_busy() {
                Duration::from_millis(100)
            } else if self.message_time.is_some() {
                Duration::from_millis(500)
            } else {
                Duration::from_secs(30)
            };

            if !crossterm::event::poll(poll_timeout)? {
                continue;
            }

            if let Ok(event) = crossterm::event::read() {
                match event {
                    Event::Key(key) => {
                        if key.kind == KeyEventKind::Press {
                            self.handle_key_event(key);
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }

        self.terminal.clear()?;
        self.terminal.show_cursor()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        crossterm::terminal::disable_raw_mode()?;

        Ok(())
    }
}
