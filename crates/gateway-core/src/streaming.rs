//! Streaming types.

use crate::error::GatewayError;
use futures::stream::BoxStream;

/// One element of a streamed completion
///
/// A stream yields zero or more `Content` chunks. If the call fails it
/// yields exactly one `Error` chunk and ends.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Content fragment
    Content(String),
    /// Terminal error
    Error(GatewayError),
}

impl StreamChunk {
    /// Create a content chunk
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }

    /// Content fragment, if any
    #[must_use]
    pub fn as_content(&self) -> Option<&str> {
        match self {
            Self::Content(text) => Some(text),
            Self::Error(_) => None,
        }
    }

    /// Whether this chunk terminates the stream with an error
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Convert into a `Result`
    pub fn into_result(self) -> Result<String, GatewayError> {
        match self {
            Self::Content(text) => Ok(text),
            Self::Error(err) => Err(err),
        }
    }
}

impl From<GatewayError> for StreamChunk {
    fn from(err: GatewayError) -> Self {
        Self::Error(err)
    }
}

/// Finite, non-restartable stream of chunks produced by one call
pub type ChunkStream = BoxStream<'static, StreamChunk>;
