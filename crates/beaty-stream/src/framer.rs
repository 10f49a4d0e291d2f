//! Server-sent event framing for the query response body.
//!
//! The framer is a line machine: input is consumed one character at a time,
//! so where a network read happens to split the body has no effect on the
//! decoded events.

use tracing::{debug, trace, warn};

use crate::event::StreamEvent;

/// Message of the error synthesized when the body ends without `done`/`error`.
pub const INCOMPLETE_STREAM: &str = "incomplete_stream";

const LOG_PREVIEW_CHARS: usize = 200;

/// Incremental decoder from text chunks to [`StreamEvent`]s.
#[derive(Debug, Default)]
pub struct TransportFramer {
    /// Characters of the current, not yet terminated line.
    line: String,
    /// `data:` lines of the frame being assembled.
    data: Vec<String>,
    terminated: bool,
    closed: bool,
    malformed: usize,
}

impl TransportFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the next chunk of the body and return the events it completed.
    ///
    /// Any trailing partial frame is carried over to the next call.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.closed {
            trace!(len = chunk.len(), "chunk after close ignored");
            return events;
        }
        for ch in chunk.chars() {
            match ch {
                '\r' => {}
                '\n' => {
                    let line = std::mem::take(&mut self.line);
                    self.process_line(&line, &mut events);
                }
                c => self.line.push(c),
            }
        }
        events
    }

    /// Signal that the body has ended.
    ///
    /// A trailing frame that lacks its blank line is still decoded. If no
    /// terminal event was seen, an `Error` with [`INCOMPLETE_STREAM`] is
    /// appended. Calling this more than once yields nothing further.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.closed {
            return events;
        }
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.process_line(&line, &mut events);
        }
        self.dispatch(&mut events);
        if !self.terminated {
            debug!("stream closed before a terminal frame");
            self.terminated = true;
            events.push(StreamEvent::Error {
                message: INCOMPLETE_STREAM.to_string(),
            });
        }
        self.closed = true;
        events
    }

    /// Whether a `done` or `error` event has been produced.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Number of frames discarded because their body did not decode.
    pub fn malformed_frames(&self) -> usize {
        self.malformed
    }

    /// Characters buffered for the frame in progress.
    pub fn pending(&self) -> usize {
        self.line.len() + self.data.iter().map(|d| d.len() + 1).sum::<usize>()
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" | "id" | "retry" => {}
            other => trace!(field = other, "unknown field ignored"),
        }
    }

    fn dispatch(&mut self, events: &mut Vec<StreamEvent>) {
        if self.data.is_empty() {
            return;
        }
        let body = self.data.join("\n");
        self.data.clear();

        if self.terminated {
            trace!("frame after terminal event dropped");
            return;
        }

        match StreamEvent::from_json(&body) {
            Ok(event) => {
                trace!(kind = event.kind(), "frame decoded");
                self.terminated = event.is_terminal();
                events.push(event);
            }
            Err(e) => {
                self.malformed += 1;
                let preview: String = body.chars().take(LOG_PREVIEW_CHARS).collect();
                warn!(error = %e, body = %preview, "skipping malformed frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> StreamEvent {
        StreamEvent::Chunk { text: text.into() }
    }

    #[test]
    fn test_single_complete_frame() {
        let mut framer = TransportFramer::new();
        let events = framer.feed("data: {\"type\":\"chunk\",\"text\":\"hi\"}\n\n");
        assert_eq!(events, vec![chunk("hi")]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_partial_frame_is_carried_over() {
        let mut framer = TransportFramer::new();
        assert!(framer.feed("data: {\"type\":\"ch").is_empty());
        assert!(framer.pending() > 0);
        assert!(framer.feed("unk\",\"text\":\"A\"}\n").is_empty());
        assert_eq!(framer.feed("\n"), vec![chunk("A")]);
    }

    #[test]
    fn test_many_frames_in_one_read() {
        let mut framer = TransportFramer::new();
        let events = framer.feed(
            "data:{\"type\":\"chunk\",\"text\":\"A\"}\n\ndata:{\"type\":\"chunk\",\"text\":\"B\"}\n\ndata:{\"type\":\"done\"}\n\n",
        );
        assert_eq!(events, vec![chunk("A"), chunk("B"), StreamEvent::Done]);
        assert!(framer.is_terminated());
        assert!(framer.finish().is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut framer = TransportFramer::new();
        let events = framer.feed("data: {\"type\":\"chunk\",\"text\":\"A\"}\r\n\r\n");
        assert_eq!(events, vec![chunk("A")]);
    }

    #[test]
    fn test_comments_and_other_fields_are_ignored() {
        let mut framer = TransportFramer::new();
        let events = framer.feed(
            ": keep-alive\n\nevent: message\nid: 7\ndata: {\"type\":\"chunk\",\"text\":\"A\"}\n\n",
        );
        assert_eq!(events, vec![chunk("A")]);
        assert_eq!(framer.malformed_frames(), 0);
    }

    #[test]
    fn test_multi_line_data_is_joined() {
        let mut framer = TransportFramer::new();
        let events = framer.feed("data: {\"type\":\"chunk\",\ndata: \"text\":\"A\"}\n\n");
        assert_eq!(events, vec![chunk("A")]);
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let mut framer = TransportFramer::new();
        let events = framer.feed(
            "data: {\"type\":\"chunk\",\"text\":\"A\"}\n\ndata: {not json\n\ndata: {\"type\":\"chunk\",\"text\":\"B\"}\n\n",
        );
        assert_eq!(events, vec![chunk("A"), chunk("B")]);
        assert_eq!(framer.malformed_frames(), 1);
    }

    #[test]
    fn test_unknown_type_counts_as_malformed() {
        let mut framer = TransportFramer::new();
        assert!(framer.feed("data: {\"type\":\"progress\"}\n\n").is_empty());
        assert_eq!(framer.malformed_frames(), 1);
    }

    #[test]
    fn test_close_without_terminal_synthesizes_error() {
        let mut framer = TransportFramer::new();
        framer.feed("data: {\"type\":\"chunk\",\"text\":\"A\"}\n\n");
        assert_eq!(
            framer.finish(),
            vec![StreamEvent::Error {
                message: INCOMPLETE_STREAM.into()
            }]
        );
        assert!(framer.is_terminated());
        assert!(framer.finish().is_empty());
    }

    #[test]
    fn test_unterminated_trailing_frame_is_decoded_on_finish() {
        let mut framer = TransportFramer::new();
        assert!(framer.feed("data: {\"type\":\"done\"}").is_empty());
        assert_eq!(framer.finish(), vec![StreamEvent::Done]);
    }

    #[test]
    fn test_truncated_trailing_frame_becomes_incomplete_stream() {
        let mut framer = TransportFramer::new();
        framer.feed("data: {\"type\":\"chunk\",\"te");
        assert_eq!(
            framer.finish(),
            vec![StreamEvent::Error {
                message: INCOMPLETE_STREAM.into()
            }]
        );
        assert_eq!(framer.malformed_frames(), 1);
    }

    #[test]
    fn test_frames_after_terminal_are_dropped() {
        let mut framer = TransportFramer::new();
        let events = framer.feed(
            "data: {\"type\":\"error\",\"message\":\"boom\"}\n\ndata: {\"type\":\"chunk\",\"text\":\"late\"}\n\n",
        );
        assert_eq!(
            events,
            vec![StreamEvent::Error {
                message: "boom".into()
            }]
        );
    }

    #[test]
    fn test_feed_after_finish_is_ignored() {
        let mut framer = TransportFramer::new();
        framer.finish();
        assert!(framer
            .feed("data: {\"type\":\"chunk\",\"text\":\"A\"}\n\n")
            .is_empty());
    }
}
