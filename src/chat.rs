use std::io::Read;
use std::sync::mpsc::Sender;

use chrono::Utc;

use crate::api::{ChatApi, ChatReply, RecommendedBook};
use crate::error::ChatError;
use crate::logging;
use crate::models::{BookRecord, ChatMessage, ChatRole};

/// Greeting shown at the start of every conversation.
const GREETING: &str = "Hello! I'm your BookBot assistant. I can help you find books you'll love.";
const GREETING_HINTS: &str = "Try asking me questions like:\n- Recommend fantasy books\n- Find books about AI\n- What books are like Mistborn?";

const EMPTY_REPLY: &str = "I couldn't find any specific recommendations at the moment.";
const RECOMMENDATION_HEADER: &str = "Here are some books you might enjoy:";
const REQUEST_FAILED: &str =
    "Sorry, I encountered an error while processing your request. Please try again later.";
const ADD_FAILED: &str =
    "Sorry, I couldn't add the book to your library. Please try again later.";

/// Per-request lifecycle. `Sending` covers the window between submitting the
/// user message and the first byte of the reply; a completed or failed
/// exchange returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Sending,
    Streaming,
}

/// Logical event decoded from the newline-delimited `data:` stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Chunk(String),
    Done {
        recommendations: Vec<RecommendedBook>,
    },
}

/// Incremental decoder over the raw byte stream. Transport chunking is
/// decoupled from logical event boundaries: bytes are buffered until a full
/// line is available, so an event split across reads still decodes once.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(payload) = line.strip_prefix("data: ") else {
                continue;
            };
            match serde_json::from_str::<serde_json::Value>(payload) {
                Ok(value) => {
                    if let Some(chunk) = value.get("chunk").and_then(|c| c.as_str()) {
                        events.push(StreamEvent::Chunk(chunk.to_string()));
                    }
                    if value.get("done").and_then(|d| d.as_bool()) == Some(true) {
                        let recommendations = value
                            .get("recommendations")
                            .cloned()
                            .map(|r| serde_json::from_value(r).unwrap_or_default())
                            .unwrap_or_default();
                        events.push(StreamEvent::Done { recommendations });
                    }
                }
                Err(err) => {
                    logging::debug(format!("Skipping malformed stream event: {err}"));
                }
            }
        }
        events
    }
}

/// Linear assistant conversation. The history is append-only except for the
/// one currently-streaming placeholder, which occupies a fixed position for
/// its entire lifetime and is mutated in place until the stream settles.
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    phase: ChatPhase,
    streaming_index: Option<usize>,
    next_id: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        let mut session = Self {
            messages: Vec::new(),
            phase: ChatPhase::Idle,
            streaming_index: None,
            next_id: 1,
        };
        session.append(ChatRole::Assistant, GREETING);
        session.append(ChatRole::Assistant, GREETING_HINTS);
        session
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    /// The busy flag gating submission: a new exchange may begin only after
    /// the previous one reached a terminal state.
    pub fn is_busy(&self) -> bool {
        self.phase != ChatPhase::Idle
    }

    fn append(&mut self, role: ChatRole, content: impl Into<String>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage::new(id, role, content));
        self.messages.len() - 1
    }

    /// Submit a user message. Returns false (and appends nothing) while a
    /// previous exchange is still in flight.
    pub fn begin_send(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || self.is_busy() {
            return false;
        }
        self.append(ChatRole::User, text);
        self.phase = ChatPhase::Sending;
        true
    }

    /// First byte of a streamed reply: append the empty placeholder that the
    /// chunks will fill.
    pub fn begin_stream(&mut self) {
        if self.phase != ChatPhase::Sending {
            return;
        }
        let index = self.append(ChatRole::Assistant, "");
        self.streaming_index = Some(index);
        self.phase = ChatPhase::Streaming;
    }

    /// Append a chunk to the streaming placeholder, strictly in arrival order.
    pub fn append_chunk(&mut self, chunk: &str) {
        if self.phase != ChatPhase::Streaming {
            return;
        }
        if let Some(index) = self.streaming_index {
            self.messages[index].content.push_str(chunk);
        }
    }

    /// Terminal stream event: finalize the placeholder in place, attaching any
    /// recommendation candidates. The message keeps its position and becomes
    /// immutable.
    pub fn finish_stream(&mut self, books: Vec<BookRecord>) {
        if self.phase != ChatPhase::Streaming {
            return;
        }
        if let Some(index) = self.streaming_index.take() {
            let message = &mut self.messages[index];
            if message.content.is_empty() {
                message.content = if books.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    RECOMMENDATION_HEADER.to_string()
                };
            }
            message.books = books;
        }
        self.phase = ChatPhase::Idle;
    }

    /// Transport failure mid-stream: roll the placeholder back out of the
    /// history so the non-streaming fallback can answer instead. The user's
    /// message stays exactly where it was.
    pub fn abort_stream(&mut self) {
        if self.phase != ChatPhase::Streaming {
            return;
        }
        if let Some(index) = self.streaming_index.take() {
            self.messages.remove(index);
        }
        self.phase = ChatPhase::Sending;
    }

    /// Non-streaming reply (direct or fallback).
    pub fn complete(&mut self, reply: ChatReply, user_id: i64) {
        if self.phase != ChatPhase::Sending {
            return;
        }
        let now = Utc::now();
        let books: Vec<BookRecord> = reply
            .recommendations
            .into_iter()
            .map(|r| r.into_record(user_id, now))
            .collect();
        let content = if !reply.message.is_empty() {
            reply.message
        } else if books.is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            RECOMMENDATION_HEADER.to_string()
        };
        let index = self.append(ChatRole::Assistant, content);
        self.messages[index].books = books;
        self.phase = ChatPhase::Idle;
    }

    /// Terminal failure after the fallback also failed: append a single
    /// user-visible error message and return to idle.
    pub fn fail(&mut self) {
        if self.phase == ChatPhase::Streaming {
            self.abort_stream();
        }
        if self.phase != ChatPhase::Sending {
            return;
        }
        self.append(ChatRole::Assistant, REQUEST_FAILED);
        self.phase = ChatPhase::Idle;
    }

    /// Confirmation after a recommendation made it into the library.
    pub fn note_added(&mut self, title: &str) {
        self.append(
            ChatRole::Assistant,
            format!("I've added \"{title}\" to your library!"),
        );
    }

    pub fn note_add_failed(&mut self) {
        self.append(ChatRole::Assistant, ADD_FAILED);
    }

    /// Logout lifecycle hook: back to a fresh greeting.
    pub fn reset(&mut self) {
        *self = ChatSession::new();
    }
}

/// Event emitted by the exchange worker and applied on the UI thread. Events
/// arrive in order over the channel, which is what keeps the history
/// strictly append-ordered.
#[derive(Debug)]
pub enum ChatEvent {
    StreamStarted,
    Chunk(String),
    StreamFinished {
        recommendations: Vec<RecommendedBook>,
    },
    StreamFailed,
    Reply(ChatReply),
    Failed(String),
}

/// Apply one worker event to the session.
pub fn apply_event(session: &mut ChatSession, event: ChatEvent, user_id: i64) {
    match event {
        ChatEvent::StreamStarted => session.begin_stream(),
        ChatEvent::Chunk(chunk) => session.append_chunk(&chunk),
        ChatEvent::StreamFinished { recommendations } => {
            let now = Utc::now();
            let books = recommendations
                .into_iter()
                .map(|r| r.into_record(user_id, now))
                .collect();
            session.finish_stream(books);
        }
        ChatEvent::StreamFailed => session.abort_stream(),
        ChatEvent::Reply(reply) => session.complete(reply, user_id),
        ChatEvent::Failed(detail) => {
            logging::error(format!("Chat request failed: {detail}"));
            session.fail();
        }
    }
}

/// Run one full exchange against the assistant, emitting events as they
/// happen. The streaming path is recovered exactly once: on any transport
/// error the placeholder is rolled back (`StreamFailed`) and the plain
/// request is tried before anything is surfaced to the user.
pub fn run_chat_exchange(
    api: &dyn ChatApi,
    query: &str,
    user_id: i64,
    use_streaming: bool,
    tx: &Sender<ChatEvent>,
) {
    if use_streaming {
        match stream_exchange(api, query, user_id, tx) {
            Ok(()) => return,
            Err(err) => {
                logging::warn(format!("{err}; falling back to plain request"));
                let _ = tx.send(ChatEvent::StreamFailed);
            }
        }
    }
    match api.send(query, user_id) {
        Ok(reply) => {
            let _ = tx.send(ChatEvent::Reply(reply));
        }
        Err(err) => {
            let _ = tx.send(ChatEvent::Failed(err.to_string()));
        }
    }
}

fn stream_exchange(
    api: &dyn ChatApi,
    query: &str,
    user_id: i64,
    tx: &Sender<ChatEvent>,
) -> Result<(), ChatError> {
    let mut reader = api.open_stream(query, user_id)?;
    let _ = tx.send(ChatEvent::StreamStarted);

    let mut decoder = StreamDecoder::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| ChatError::StreamTransport(e.to_string()))?;
        if n == 0 {
            break;
        }
        for event in decoder.feed(&buf[..n]) {
            match event {
                StreamEvent::Chunk(chunk) => {
                    let _ = tx.send(ChatEvent::Chunk(chunk));
                }
                StreamEvent::Done { recommendations } => {
                    let _ = tx.send(ChatEvent::StreamFinished { recommendations });
                    return Ok(());
                }
            }
        }
    }
    // The server closed the stream without a terminal event; treat whatever
    // arrived as the complete reply.
    let _ = tx.send(ChatEvent::StreamFinished {
        recommendations: Vec::new(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::mpsc::channel;

    // ---- decoder ----

    #[test]
    fn decoder_handles_event_split_across_reads() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.feed(b"data: {\"chu").is_empty());
        let events = decoder.feed(b"nk\": \"Hello\"}\n");
        assert_eq!(events, vec![StreamEvent::Chunk("Hello".to_string())]);
    }

    #[test]
    fn decoder_handles_multiple_events_in_one_read() {
        let mut decoder = StreamDecoder::new();
        let events =
            decoder.feed(b"data: {\"chunk\": \"a\"}\n\ndata: {\"chunk\": \"b\"}\n");
        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk("a".to_string()),
                StreamEvent::Chunk("b".to_string())
            ]
        );
    }

    #[test]
    fn decoder_parses_terminal_event_with_recommendations() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(
            b"data: {\"done\": true, \"recommendations\": [{\"isbn\": \"1\", \"title\": \"Dune\", \"author\": \"Frank Herbert\", \"pageCount\": 412}]}\n",
        );
        match &events[0] {
            StreamEvent::Done { recommendations } => {
                assert_eq!(recommendations.len(), 1);
                assert_eq!(recommendations[0].title, "Dune");
                assert_eq!(recommendations[0].page_count, 412);
            }
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[test]
    fn decoder_skips_malformed_and_foreign_lines() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"retry: 500\ndata: not-json\ndata: {\"chunk\": \"ok\"}\n");
        assert_eq!(events, vec![StreamEvent::Chunk("ok".to_string())]);
    }

    #[test]
    fn decoder_survives_utf8_split_across_reads() {
        let mut decoder = StreamDecoder::new();
        let full = "data: {\"chunk\": \"caf\u{e9}\"}\n".as_bytes();
        // Split inside the two-byte e-acute sequence.
        let split = full.len() - 4;
        assert!(decoder.feed(&full[..split]).is_empty());
        let events = decoder.feed(&full[split..]);
        assert_eq!(events, vec![StreamEvent::Chunk("caf\u{e9}".to_string())]);
    }

    // ---- session state machine ----

    fn recommendation(title: &str) -> RecommendedBook {
        serde_json::from_value(serde_json::json!({
            "isbn": "9780000000001",
            "title": title,
            "author": "Someone",
            "genre": "Fantasy",
            "pageCount": 300
        }))
        .unwrap()
    }

    #[test]
    fn session_starts_with_two_greeting_messages() {
        let session = ChatSession::new();
        assert_eq!(session.messages().len(), 2);
        assert!(session.messages().iter().all(|m| m.role == ChatRole::Assistant));
        assert!(!session.is_busy());
    }

    #[test]
    fn streamed_reply_concatenates_chunks_in_arrival_order() {
        let mut session = ChatSession::new();
        assert!(session.begin_send("recommend fantasy"));
        session.begin_stream();
        session.append_chunk("The ");
        session.append_chunk("Name of ");
        session.append_chunk("the Wind");
        session.finish_stream(Vec::new());

        // Two greetings + user + assistant, strictly in submission order.
        let messages = session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].role, ChatRole::User);
        assert_eq!(messages[3].role, ChatRole::Assistant);
        assert_eq!(messages[3].content, "The Name of the Wind");
        assert!(!session.is_busy());

        let ids: Vec<u64> = messages.iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn busy_flag_rejects_second_send_until_terminal_state() {
        let mut session = ChatSession::new();
        assert!(session.begin_send("first"));
        assert!(!session.begin_send("second"));
        session.begin_stream();
        assert!(!session.begin_send("third"));
        session.finish_stream(Vec::new());
        assert!(session.begin_send("fourth"));
    }

    #[test]
    fn abort_rolls_back_only_the_placeholder() {
        let mut session = ChatSession::new();
        session.begin_send("hello");
        let after_user = session.messages().len();
        session.begin_stream();
        session.append_chunk("partial ");
        session.abort_stream();

        assert_eq!(session.messages().len(), after_user);
        assert_eq!(session.messages().last().unwrap().content, "hello");
        assert_eq!(session.phase(), ChatPhase::Sending);
    }

    #[test]
    fn fallback_after_abort_adds_exactly_one_message() {
        let mut session = ChatSession::new();
        session.begin_send("hello");
        let after_user = session.messages().len();

        session.begin_stream();
        session.append_chunk("doomed");
        session.abort_stream();
        session.complete(
            ChatReply {
                message: "plain answer".to_string(),
                recommendations: vec![],
            },
            7,
        );

        assert_eq!(session.messages().len(), after_user + 1);
        assert_eq!(session.messages().last().unwrap().content, "plain answer");
        // No leftover empty placeholder anywhere.
        assert!(session.messages().iter().all(|m| !m.content.is_empty()));
    }

    #[test]
    fn finished_stream_attaches_recommendations_in_place() {
        let mut session = ChatSession::new();
        session.begin_send("recommend");
        session.begin_stream();
        session.append_chunk("Here you go");
        let streamed_position = session.messages().len() - 1;

        let books = vec![recommendation("Mistborn").into_record(7, Utc::now())];
        session.finish_stream(books);

        let message = &session.messages()[streamed_position];
        assert!(message.is_recommendation());
        assert_eq!(message.content, "Here you go");
        assert_eq!(message.books[0].title, "Mistborn");
    }

    #[test]
    fn complete_with_empty_message_uses_default_text() {
        let mut session = ChatSession::new();
        session.begin_send("anything");
        session.complete(ChatReply::default(), 7);
        assert_eq!(session.messages().last().unwrap().content, EMPTY_REPLY);
    }

    #[test]
    fn fail_appends_single_error_and_returns_to_idle() {
        let mut session = ChatSession::new();
        session.begin_send("hello");
        let after_user = session.messages().len();
        session.begin_stream();
        session.fail();
        assert_eq!(session.messages().len(), after_user + 1);
        assert_eq!(session.messages().last().unwrap().content, REQUEST_FAILED);
        assert!(!session.is_busy());
    }

    #[test]
    fn add_confirmations_follow_append_ordering() {
        let mut session = ChatSession::new();
        session.note_added("Dune");
        session.note_add_failed();
        let tail: Vec<&str> = session
            .messages()
            .iter()
            .rev()
            .take(2)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(tail, vec![ADD_FAILED, "I've added \"Dune\" to your library!"]);
    }

    #[test]
    fn reset_restores_greeting() {
        let mut session = ChatSession::new();
        session.begin_send("hello");
        session.complete(ChatReply::default(), 7);
        session.reset();
        assert_eq!(session.messages().len(), 2);
        assert!(!session.is_busy());
    }

    // ---- worker + fallback ladder ----

    /// Scripted byte stream: each read yields the next scripted result.
    struct ScriptedStream {
        script: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.script.is_empty() {
                return Ok(0);
            }
            match self.script.remove(0) {
                Ok(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Err(err) => Err(err),
            }
        }
    }

    struct MockChatApi {
        stream_script: Option<Vec<io::Result<Vec<u8>>>>,
        fail_open: bool,
        fail_send: bool,
    }

    impl ChatApi for MockChatApi {
        fn send(&self, _query: &str, _user_id: i64) -> Result<ChatReply, ChatError> {
            if self.fail_send {
                return Err(ChatError::Request("server returned status 503".to_string()));
            }
            Ok(ChatReply {
                message: "fallback answer".to_string(),
                recommendations: vec![],
            })
        }

        fn open_stream(
            &self,
            _query: &str,
            _user_id: i64,
        ) -> Result<Box<dyn Read + Send>, ChatError> {
            if self.fail_open {
                return Err(ChatError::StreamTransport("connection refused".to_string()));
            }
            let script = self
                .stream_script
                .as_ref()
                .map(|s| {
                    s.iter()
                        .map(|r| match r {
                            Ok(bytes) => Ok(bytes.clone()),
                            Err(err) => Err(io::Error::new(err.kind(), err.to_string())),
                        })
                        .collect()
                })
                .unwrap_or_default();
            Ok(Box::new(ScriptedStream { script }))
        }
    }

    fn drive(api: &MockChatApi, session: &mut ChatSession, query: &str, streaming: bool) {
        assert!(session.begin_send(query));
        let (tx, rx) = channel();
        run_chat_exchange(api, query, 7, streaming, &tx);
        drop(tx);
        for event in rx {
            apply_event(session, event, 7);
        }
    }

    #[test]
    fn streaming_exchange_builds_recommendation_message() {
        let api = MockChatApi {
            stream_script: Some(vec![
                Ok(b"data: {\"chunk\": \"Here \"}\n".to_vec()),
                Ok(b"data: {\"chunk\": \"you go\"}\ndata: {\"done\": true, \"recommendations\": [{\"isbn\": \"1\", \"title\": \"Mistborn\", \"author\": \"Brandon Sanderson\", \"pageCount\": 541}]}\n".to_vec()),
            ]),
            fail_open: false,
            fail_send: false,
        };
        let mut session = ChatSession::new();
        drive(&api, &mut session, "recommend fantasy", true);

        let last = session.messages().last().unwrap();
        assert_eq!(last.content, "Here you go");
        assert!(last.is_recommendation());
        assert_eq!(last.books[0].total_pages, 541);
        assert!(!session.is_busy());
    }

    #[test]
    fn mid_stream_failure_falls_back_to_plain_request() {
        let api = MockChatApi {
            stream_script: Some(vec![
                Ok(b"data: {\"chunk\": \"doomed \"}\n".to_vec()),
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            ]),
            fail_open: false,
            fail_send: false,
        };
        let mut session = ChatSession::new();
        let before_send = session.messages().len();
        drive(&api, &mut session, "hello", true);

        // User message plus exactly one assistant outcome; the half-filled
        // placeholder is gone.
        assert_eq!(session.messages().len(), before_send + 2);
        assert_eq!(session.messages().last().unwrap().content, "fallback answer");
        assert!(!session.is_busy());
    }

    #[test]
    fn open_failure_falls_back_without_placeholder() {
        let api = MockChatApi {
            stream_script: None,
            fail_open: true,
            fail_send: false,
        };
        let mut session = ChatSession::new();
        let before_send = session.messages().len();
        drive(&api, &mut session, "hello", true);

        assert_eq!(session.messages().len(), before_send + 2);
        assert_eq!(session.messages().last().unwrap().content, "fallback answer");
    }

    #[test]
    fn double_failure_surfaces_single_error_message() {
        let api = MockChatApi {
            stream_script: Some(vec![Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "reset",
            ))]),
            fail_open: false,
            fail_send: true,
        };
        let mut session = ChatSession::new();
        let before_send = session.messages().len();
        drive(&api, &mut session, "hello", true);

        let messages = session.messages();
        assert_eq!(messages.len(), before_send + 2);
        assert_eq!(messages[messages.len() - 2].content, "hello");
        assert_eq!(messages.last().unwrap().content, REQUEST_FAILED);
        assert!(!session.is_busy());
    }

    #[test]
    fn plain_exchange_skips_streaming_entirely() {
        let api = MockChatApi {
            stream_script: None,
            fail_open: true, // would fail if touched
            fail_send: false,
        };
        let mut session = ChatSession::new();
        drive(&api, &mut session, "hello", false);
        assert_eq!(session.messages().last().unwrap().content, "fallback answer");
    }
}
