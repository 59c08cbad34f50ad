//! Simulated streaming for backends that only return whole completions.

use futures::stream::{self, StreamExt};
use gateway_core::{ChunkStream, GatewayResult, StreamChunk};

/// One chunk per character
#[must_use]
pub fn by_char(content: &str) -> Vec<StreamChunk> {
    content
        .chars()
        .map(|c| StreamChunk::Content(c.to_string()))
        .collect()
}

/// One chunk per word with a `" "` chunk between words
///
/// Concatenating the chunks yields `content` exactly.
#[must_use]
pub fn by_word(content: &str) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    for (i, word) in content.split(' ').enumerate() {
        if i > 0 {
            chunks.push(StreamChunk::content(" "));
        }
        if !word.is_empty() {
            chunks.push(StreamChunk::content(word));
        }
    }
    chunks
}

/// Stream a finished result through `chunker`, or emit one error chunk
pub fn replay(result: GatewayResult<String>, chunker: fn(&str) -> Vec<StreamChunk>) -> ChunkStream {
    match result {
        Ok(content) => stream::iter(chunker(&content)).boxed(),
        Err(err) => stream::once(async move { StreamChunk::Error(err) }).boxed(),
    }
}
