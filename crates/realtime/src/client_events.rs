//! Client → server frames.
//!
//! Each frame is a standalone struct so it can also travel on the internal
//! event bus (e.g. `InputAudioBufferAppend` flows capture → bus → transport).
//! [`ClientEvent`] is the tagged envelope that puts the `type` discriminator
//! on the wire.

use serde::{Deserialize, Serialize};

use vox_domain::config::SessionConfig;

/// Update the session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub session: SessionConfig,
}

/// Append one base64-encoded PCM16 chunk to the input buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputAudioBufferAppend {
    pub audio: String,
}

impl InputAudioBufferAppend {
    pub fn from_audio(audio: impl Into<String>) -> Self {
        Self {
            audio: audio.into(),
        }
    }
}

/// Content part of a manually created message item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Items the client can insert into the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConversationItem {
    #[serde(rename = "function_call_output")]
    FunctionCallOutput { call_id: String, output: String },
    #[serde(rename = "message")]
    Message {
        role: String,
        content: Vec<MessageContentPart>,
    },
}

/// Insert an item into the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItemCreate {
    pub item: ConversationItem,
}

impl ConversationItemCreate {
    /// The output of a completed function call.
    pub fn function_call_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            item: ConversationItem::FunctionCallOutput {
                call_id: call_id.into(),
                output: output.into(),
            },
        }
    }

    /// An assistant-authored text message (used for pending-tool chatter).
    pub fn assistant_message(text: impl Into<String>) -> Self {
        Self {
            item: ConversationItem::Message {
                role: "assistant".into(),
                content: vec![MessageContentPart {
                    kind: "text".into(),
                    text: text.into(),
                }],
            },
        }
    }
}

/// Truncate an assistant item's audio at `audio_end_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItemTruncate {
    pub item_id: String,
    pub content_index: u32,
    pub audio_end_ms: u64,
}

impl ConversationItemTruncate {
    pub fn new(item_id: impl Into<String>, audio_end_ms: u64) -> Self {
        Self {
            item_id: item_id.into(),
            content_index: 0,
            audio_end_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCreateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Ask the model to produce a response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseCreate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseCreateParams>,
}

impl ResponseCreate {
    pub fn from_instructions(instructions: impl Into<String>) -> Self {
        Self {
            response: Some(ResponseCreateParams {
                instructions: Some(instructions.into()),
            }),
        }
    }
}

/// Cancel the in-progress response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseCancel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

/// Drop audio the server has buffered but not yet sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputAudioBufferClear {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tagged union of every frame the client sends. Serialized with null
/// fields omitted — the service rejects explicit nulls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate(SessionUpdate),
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend(InputAudioBufferAppend),
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate(ConversationItemCreate),
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate(ConversationItemTruncate),
    #[serde(rename = "response.create")]
    ResponseCreate(ResponseCreate),
    #[serde(rename = "response.cancel")]
    ResponseCancel(ResponseCancel),
    #[serde(rename = "output_audio_buffer.clear")]
    OutputAudioBufferClear(OutputAudioBufferClear),
}

impl ClientEvent {
    /// Wire name of the frame, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate(_) => "session.update",
            ClientEvent::InputAudioBufferAppend(_) => "input_audio_buffer.append",
            ClientEvent::ConversationItemCreate(_) => "conversation.item.create",
            ClientEvent::ConversationItemTruncate(_) => "conversation.item.truncate",
            ClientEvent::ResponseCreate(_) => "response.create",
            ClientEvent::ResponseCancel(_) => "response.cancel",
            ClientEvent::OutputAudioBufferClear(_) => "output_audio_buffer.clear",
        }
    }
}

impl From<SessionUpdate> for ClientEvent {
    fn from(event: SessionUpdate) -> Self {
        ClientEvent::SessionUpdate(event)
    }
}

impl From<InputAudioBufferAppend> for ClientEvent {
    fn from(event: InputAudioBufferAppend) -> Self {
        ClientEvent::InputAudioBufferAppend(event)
    }
}

impl From<ConversationItemCreate> for ClientEvent {
    fn from(event: ConversationItemCreate) -> Self {
        ClientEvent::ConversationItemCreate(event)
    }
}

impl From<ConversationItemTruncate> for ClientEvent {
    fn from(event: ConversationItemTruncate) -> Self {
        ClientEvent::ConversationItemTruncate(event)
    }
}

impl From<ResponseCreate> for ClientEvent {
    fn from(event: ResponseCreate) -> Self {
        ClientEvent::ResponseCreate(event)
    }
}

impl From<ResponseCancel> for ClientEvent {
    fn from(event: ResponseCancel) -> Self {
        ClientEvent::ResponseCancel(event)
    }
}

impl From<OutputAudioBufferClear> for ClientEvent {
    fn from(event: OutputAudioBufferClear) -> Self {
        ClientEvent::OutputAudioBufferClear(event)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_append_wire_shape() {
        let event: ClientEvent = InputAudioBufferAppend::from_audio("AAAA").into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "input_audio_buffer.append");
        assert_eq!(json["audio"], "AAAA");
    }

    #[test]
    fn truncate_defaults_content_index_zero() {
        let event: ClientEvent = ConversationItemTruncate::new("item_1", 450).into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "conversation.item.truncate");
        assert_eq!(json["item_id"], "item_1");
        assert_eq!(json["content_index"], 0);
        assert_eq!(json["audio_end_ms"], 450);
    }

    #[test]
    fn function_call_output_item() {
        let event: ClientEvent = ConversationItemCreate::function_call_output("c1", "5").into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "conversation.item.create");
        assert_eq!(json["item"]["type"], "function_call_output");
        assert_eq!(json["item"]["call_id"], "c1");
        assert_eq!(json["item"]["output"], "5");
    }

    #[test]
    fn response_cancel_omits_null_fields() {
        let event: ClientEvent = ResponseCancel::default().into();
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"response.cancel"}"#);
    }

    #[test]
    fn response_create_carries_instructions() {
        let event: ClientEvent = ResponseCreate::from_instructions("read the result").into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "response.create");
        assert_eq!(json["response"]["instructions"], "read the result");
    }

    #[test]
    fn output_buffer_clear_is_bare() {
        let event: ClientEvent = OutputAudioBufferClear::default().into();
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"output_audio_buffer.clear"}"#);
    }
}
