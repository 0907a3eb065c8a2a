//! # Incremental text/event-stream parser.
//!
//! [`EventParser`] consumes raw byte chunks as they arrive off the wire and
//! yields complete [`StreamEvent`]s. Chunk boundaries carry no meaning: an
//! event may span many chunks, and one chunk may complete many events.
//!
//! ## Framing
//! - Events are separated by a blank line.
//! - `data:` lines accumulate; multiple lines join with `\n`.
//! - `id:` sets the event id; `event:` sets the type.
//! - `retry:` lines are recognized and ignored (reconnect delays come from
//!   the backoff policy, not the server).
//! - Lines starting with `:` are comments (keep-alives) and are skipped.
//! - Both `\n` and `\r\n` line endings are accepted.
//! - A blank-line block that set none of the known fields yields nothing.

use crate::stream::event::StreamEvent;

/// Stateful SSE decoder. Feed bytes in, take events out.
#[derive(Debug, Default)]
pub struct EventParser {
    buffer: String,
    pending_id: Option<String>,
    pending_type: Option<String>,
    pending_data: Option<String>,
}

impl EventParser {
    /// Creates an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every event completed by it.
    ///
    /// Invalid UTF-8 bytes are replaced; partial trailing lines stay buffered
    /// until a later chunk completes them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        // Consume complete lines only; the tail after the last newline is a
        // partial line and must wait for more bytes.
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(ev) = self.take_pending() {
                    events.push(ev);
                }
            } else {
                self.parse_line(line);
            }
        }
        events
    }

    /// True when no partial event or partial line is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
            && self.pending_id.is_none()
            && self.pending_type.is_none()
            && self.pending_data.is_none()
    }

    fn parse_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            // A field name with no colon is a valid line with an empty value.
            None => (line, ""),
        };
        match field {
            "data" => match &mut self.pending_data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.pending_data = Some(value.to_string()),
            },
            "id" => self.pending_id = Some(value.to_string()),
            "event" => self.pending_type = Some(value.to_string()),
            "retry" => {}
            _ => {}
        }
    }

    fn take_pending(&mut self) -> Option<StreamEvent> {
        if self.pending_id.is_none() && self.pending_type.is_none() && self.pending_data.is_none() {
            return None;
        }
        Some(StreamEvent {
            id: self.pending_id.take(),
            event_type: self.pending_type.take(),
            data: self.pending_data.take().unwrap_or_default(),
        })
    }
}
