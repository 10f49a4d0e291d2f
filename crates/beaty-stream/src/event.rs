use serde::Deserialize;

use beaty_core::types::Intent;

use crate::payload::DataPayload;

/// One decoded frame of the query response stream.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Intent classification plus the result data for the map.
    Data { intent: Intent, payload: DataPayload },
    /// A delta of the response text.
    Chunk { text: String },
    /// The server finished the response.
    Done,
    /// The server (or the transport) gave up. `message` is diagnostic only.
    Error { message: String },
}

/// JSON shape of a frame body, tagged by `type`.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireFrame {
    Data(DataFrame),
    Chunk {
        text: String,
    },
    Done {},
    Error {
        #[serde(default)]
        message: String,
    },
}

#[derive(Deserialize)]
struct DataFrame {
    intent: Option<String>,
    #[serde(flatten)]
    payload: DataPayload,
}

impl StreamEvent {
    /// Decode a frame body. Unknown `type` values are an error.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let frame: WireFrame = serde_json::from_str(body)?;
        Ok(match frame {
            WireFrame::Data(data) => StreamEvent::Data {
                intent: data
                    .intent
                    .as_deref()
                    .map(Intent::from_wire)
                    .unwrap_or_default(),
                payload: data.payload,
            },
            WireFrame::Chunk { text } => StreamEvent::Chunk { text },
            WireFrame::Done {} => StreamEvent::Done,
            WireFrame::Error { message } => StreamEvent::Error { message },
        })
    }

    /// `Done` and `Error` end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Data { .. } => "data",
            StreamEvent::Chunk { .. } => "chunk",
            StreamEvent::Done => "done",
            StreamEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chunk_and_done() {
        assert_eq!(
            StreamEvent::from_json(r#"{"type":"chunk","text":"안녕"}"#).unwrap(),
            StreamEvent::Chunk {
                text: "안녕".into()
            }
        );
        assert_eq!(
            StreamEvent::from_json(r#"{"type":"done"}"#).unwrap(),
            StreamEvent::Done
        );
    }

    #[test]
    fn test_decode_error_without_message() {
        let event = StreamEvent::from_json(r#"{"type":"error"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Error {
                message: String::new()
            }
        );
        assert!(event.is_terminal());
    }

    #[test]
    fn test_decode_data_frame() {
        let body = r#"{"type":"data","intent":"RECOMMEND","pois":[{"title":"Palace","mapx":126.97,"mapy":37.57}],"count":1,"search_keyword":"palace"}"#;
        let StreamEvent::Data { intent, payload } = StreamEvent::from_json(body).unwrap() else {
            panic!("expected data frame");
        };
        assert_eq!(intent, Intent::Recommend);
        assert_eq!(payload.count, Some(1));
        assert_eq!(payload.search_keyword.as_deref(), Some("palace"));
        assert_eq!(payload.pois.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_unknown_intent_is_general_chat() {
        let event = StreamEvent::from_json(r#"{"type":"data","intent":"WEATHER"}"#).unwrap();
        assert!(matches!(
            event,
            StreamEvent::Data {
                intent: Intent::GeneralChat,
                ..
            }
        ));
        let event = StreamEvent::from_json(r#"{"type":"data"}"#).unwrap();
        assert!(matches!(
            event,
            StreamEvent::Data {
                intent: Intent::GeneralChat,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_bodies_are_errors() {
        assert!(StreamEvent::from_json(r#"{"type":"chunk""#).is_err());
        assert!(StreamEvent::from_json(r#"{"type":"progress"}"#).is_err());
        assert!(StreamEvent::from_json(r#"{"type":"chunk"}"#).is_err());
        assert!(StreamEvent::from_json("[1,2]").is_err());
    }

    #[test]
    fn test_kind_and_terminal() {
        assert_eq!(StreamEvent::Done.kind(), "done");
        assert!(StreamEvent::Done.is_terminal());
        assert!(!StreamEvent::Chunk { text: "x".into() }.is_terminal());
    }
}
