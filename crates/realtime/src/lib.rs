//! `vox-realtime` — the wire protocol and WebSocket transport for the
//! realtime speech service.
//!
//! Frames are JSON objects discriminated by a `type` field. Client frames
//! are built from the structs in [`client_events`]; inbound frames are
//! decoded into [`server_events`] and dispatched onto the event bus as their
//! concrete types. Unknown inbound `type` values are logged at debug and
//! skipped — never fatal.

pub mod client_events;
pub mod server_events;
pub mod transport;

pub use client_events::{
    ClientEvent, ConversationItem, ConversationItemCreate, ConversationItemTruncate,
    InputAudioBufferAppend, OutputAudioBufferClear, ResponseCancel, ResponseCreate,
    SessionUpdate,
};
pub use server_events::{
    ErrorDetail, ErrorEvent, FunctionCallArgumentsDone, InputAudioBufferSpeechStarted,
    InputAudioBufferSpeechStopped, InputAudioTranscriptionCompleted,
    InputAudioTranscriptionDelta, ConversationItemTruncated, ResponseCreated, ResponseDone,
    ResponseMeta, ResponseOutputAudioDelta, ResponseOutputAudioTranscriptDelta,
    ResponseOutputAudioTranscriptDone, ServerEvent, SessionCreated, SessionUpdated,
};
pub use transport::{RealtimeConnection, RealtimeTransport, TransportError};
