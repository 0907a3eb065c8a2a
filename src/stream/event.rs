//! Parsed server-sent event.

/// One event decoded from a text/event-stream body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamEvent {
    /// `id:` field, remembered for `Last-Event-ID` resumption.
    pub id: Option<String>,
    /// `event:` field (event type), if the server set one.
    pub event_type: Option<String>,
    /// Concatenated `data:` lines, joined with `\n`.
    pub data: String,
}

impl StreamEvent {
    /// True when the event carries the end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]"
    }
}
