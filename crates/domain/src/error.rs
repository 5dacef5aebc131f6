/// Shared error type used across all VoxAgent crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport: {0}")]
    Transport(String),

    #[error("audio: {0}")]
    Audio(String),

    #[error("tool: {0}")]
    Tool(String),

    #[error("MCP: {0}")]
    Mcp(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
