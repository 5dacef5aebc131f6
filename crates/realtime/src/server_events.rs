//! Server → client frames.
//!
//! Only the frames the core consumes are modeled; everything else is dropped
//! with a debug log by [`ServerEvent::decode`]. Each variant is a standalone
//! struct because the transport dispatches them individually onto the bus.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vox_events::EventBus;

/// Minimal view of the server's `response` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ResponseMeta {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    #[serde(default)]
    pub session: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUpdated {
    #[serde(default)]
    pub session: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCreated {
    pub response: ResponseMeta,
}

impl ResponseCreated {
    pub fn response_id(&self) -> &str {
        &self.response.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDone {
    pub response: ResponseMeta,
}

impl ResponseDone {
    pub fn response_id(&self) -> &str {
        &self.response.id
    }
}

/// One base64-encoded audio chunk of an in-progress response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseOutputAudioDelta {
    pub response_id: String,
    pub item_id: String,
    #[serde(default)]
    pub output_index: Option<u32>,
    #[serde(default)]
    pub content_index: Option<u32>,
    pub delta: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseOutputAudioTranscriptDelta {
    #[serde(default)]
    pub response_id: Option<String>,
    pub item_id: String,
    #[serde(default)]
    pub output_index: Option<u32>,
    #[serde(default)]
    pub content_index: Option<u32>,
    pub delta: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseOutputAudioTranscriptDone {
    #[serde(default)]
    pub response_id: Option<String>,
    pub item_id: String,
    #[serde(default)]
    pub output_index: Option<u32>,
    #[serde(default)]
    pub content_index: Option<u32>,
    pub transcript: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscriptionDelta {
    pub item_id: String,
    #[serde(default)]
    pub content_index: Option<u32>,
    pub delta: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioTranscriptionCompleted {
    pub item_id: String,
    #[serde(default)]
    pub content_index: Option<u32>,
    pub transcript: String,
    #[serde(default)]
    pub usage: Option<Value>,
}

/// Server-side VAD detected the user starting to speak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioBufferSpeechStarted {
    pub audio_start_ms: u64,
    #[serde(default)]
    pub item_id: Option<String>,
}

/// Server-side VAD detected the user going quiet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioBufferSpeechStopped {
    pub audio_end_ms: u64,
    #[serde(default)]
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItemTruncated {
    pub item_id: String,
    #[serde(default)]
    pub content_index: u32,
    pub audio_end_ms: u64,
}

/// The model finished streaming a function call's arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallArgumentsDone {
    pub call_id: String,
    pub name: String,
    /// JSON-encoded argument object as sent by the model.
    pub arguments: String,
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub output_index: Option<u32>,
}

impl FunctionCallArgumentsDone {
    /// Parse the argument string leniently: empty → `{}`, non-JSON → the raw
    /// text preserved under `__raw__`. The model is never "wrong enough" to
    /// drop a call on the floor.
    pub fn parsed_arguments(&self) -> serde_json::Map<String, Value> {
        let trimmed = self.arguments.trim();
        if trimmed.is_empty() {
            return serde_json::Map::new();
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => map,
            _ => {
                let mut map = serde_json::Map::new();
                map.insert("__raw__".into(), Value::String(self.arguments.clone()));
                map
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
}

/// The server reported an error. Non-fatal for the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error: ErrorDetail,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tagged union of every consumed server frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated(SessionCreated),
    #[serde(rename = "session.updated")]
    SessionUpdated(SessionUpdated),
    #[serde(rename = "response.created")]
    ResponseCreated(ResponseCreated),
    #[serde(rename = "response.done")]
    ResponseDone(ResponseDone),
    #[serde(rename = "response.output_audio.delta")]
    ResponseOutputAudioDelta(ResponseOutputAudioDelta),
    #[serde(rename = "response.output_audio_transcript.delta")]
    ResponseOutputAudioTranscriptDelta(ResponseOutputAudioTranscriptDelta),
    #[serde(rename = "response.output_audio_transcript.done")]
    ResponseOutputAudioTranscriptDone(ResponseOutputAudioTranscriptDone),
    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    InputAudioTranscriptionDelta(InputAudioTranscriptionDelta),
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputAudioTranscriptionCompleted(InputAudioTranscriptionCompleted),
    #[serde(rename = "conversation.item.truncated")]
    ConversationItemTruncated(ConversationItemTruncated),
    #[serde(rename = "input_audio_buffer.speech_started")]
    InputAudioBufferSpeechStarted(InputAudioBufferSpeechStarted),
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    InputAudioBufferSpeechStopped(InputAudioBufferSpeechStopped),
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone(FunctionCallArgumentsDone),
    #[serde(rename = "error")]
    Error(ErrorEvent),
}

impl ServerEvent {
    /// Decode one text frame. Unknown or malformed frames return `None`
    /// after a debug log — an individual bad frame never kills the session.
    pub fn decode(text: &str) -> Option<ServerEvent> {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(%error, "skipping non-JSON frame");
                return None;
            }
        };
        let event_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_owned();

        match serde_json::from_value::<ServerEvent>(value) {
            Ok(event) => Some(event),
            Err(error) => {
                tracing::debug!(event_type, %error, "skipping unknown server event");
                None
            }
        }
    }

    /// Dispatch the decoded frame onto the bus as its concrete type.
    pub async fn dispatch(self, bus: &EventBus) {
        match self {
            ServerEvent::SessionCreated(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::SessionUpdated(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::ResponseCreated(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::ResponseDone(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::ResponseOutputAudioDelta(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::ResponseOutputAudioTranscriptDelta(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::ResponseOutputAudioTranscriptDone(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::InputAudioTranscriptionDelta(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::InputAudioTranscriptionCompleted(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::ConversationItemTruncated(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::InputAudioBufferSpeechStarted(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::InputAudioBufferSpeechStopped(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::FunctionCallArgumentsDone(event) => {
                bus.dispatch(event).await;
            }
            ServerEvent::Error(event) => {
                bus.dispatch(event).await;
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_response_created() {
        let frame = r#"{"type":"response.created","response":{"id":"r1","status":"in_progress"}}"#;
        match ServerEvent::decode(frame) {
            Some(ServerEvent::ResponseCreated(event)) => {
                assert_eq!(event.response_id(), "r1");
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn decode_audio_delta() {
        let frame = r#"{"type":"response.output_audio.delta","response_id":"r1","item_id":"i1","output_index":0,"content_index":0,"delta":"AAAA"}"#;
        match ServerEvent::decode(frame) {
            Some(ServerEvent::ResponseOutputAudioDelta(event)) => {
                assert_eq!(event.response_id, "r1");
                assert_eq!(event.item_id, "i1");
                assert_eq!(event.delta, "AAAA");
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn decode_speech_started() {
        let frame =
            r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":450,"item_id":"i9"}"#;
        match ServerEvent::decode(frame) {
            Some(ServerEvent::InputAudioBufferSpeechStarted(event)) => {
                assert_eq!(event.audio_start_ms, 450);
                assert_eq!(event.item_id.as_deref(), Some("i9"));
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn decode_error_event() {
        let frame = r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad","code":"x"}}"#;
        match ServerEvent::decode(frame) {
            Some(ServerEvent::Error(event)) => {
                assert_eq!(event.error.kind, "invalid_request_error");
                assert_eq!(event.error.code.as_deref(), Some("x"));
            }
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_skipped() {
        assert!(ServerEvent::decode(r#"{"type":"rate_limits.updated","rate_limits":[]}"#).is_none());
    }

    #[test]
    fn non_json_is_skipped() {
        assert!(ServerEvent::decode("not json at all").is_none());
    }

    #[test]
    fn arguments_parse_json_object() {
        let event = FunctionCallArgumentsDone {
            call_id: "c1".into(),
            name: "add".into(),
            arguments: r#"{"a":2,"b":3}"#.into(),
            response_id: None,
            item_id: None,
            output_index: None,
        };
        let args = event.parsed_arguments();
        assert_eq!(args["a"], 2);
        assert_eq!(args["b"], 3);
    }

    #[test]
    fn empty_arguments_become_empty_map() {
        let event = FunctionCallArgumentsDone {
            call_id: "c1".into(),
            name: "noop".into(),
            arguments: "   ".into(),
            response_id: None,
            item_id: None,
            output_index: None,
        };
        assert!(event.parsed_arguments().is_empty());
    }

    #[test]
    fn malformed_arguments_are_preserved_raw() {
        let event = FunctionCallArgumentsDone {
            call_id: "c1".into(),
            name: "add".into(),
            arguments: "{broken".into(),
            response_id: None,
            item_id: None,
            output_index: None,
        };
        let args = event.parsed_arguments();
        assert_eq!(args["__raw__"], "{broken");
    }
}
