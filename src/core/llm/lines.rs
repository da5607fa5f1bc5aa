//! Line framing for streamed HTTP bodies.
//!
//! Network chunks do not respect line boundaries: a JSON object can be split
//! across two chunks, or one chunk can hold several lines. `LineBuffer`
//! carries the partial tail over to the next chunk.

use futures::StreamExt;

use super::base::{LLMError, TokenStream};

/// What one line of a streamed body means to the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Token(String),
    /// Explicit end-of-reply marker.
    Done,
    Skip,
}

#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the
    /// terminator. Blank lines are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(text) = Self::decode(&line[..line.len() - 1]) {
                lines.push(text);
            }
        }
        lines
    }

    /// Whatever is left once the body ends.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        Self::decode(&rest)
    }

    fn decode(line: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches('\r');
        if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Turn a streaming HTTP response into tokens, one line at a time.
///
/// `parse` is applied to every complete line; the stream ends at the first
/// [`LineEvent::Done`], at end of body, or after a transport error.
pub fn line_token_stream<F>(response: reqwest::Response, parse: F) -> TokenStream
where
    F: Fn(&str) -> LineEvent + Send + 'static,
{
    let mut body = response.bytes_stream();
    Box::pin(async_stream::stream! {
        let mut lines = LineBuffer::new();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LLMError::NetworkError(e.to_string()));
                    return;
                }
            };
            for line in lines.push(&chunk) {
                match parse(&line) {
                    LineEvent::Token(token) => {
                        yield Ok(token);
                    }
                    LineEvent::Done => return,
                    LineEvent::Skip => {}
                }
            }
        }
        if let Some(line) = lines.finish() {
            if let LineEvent::Token(token) = parse(&line) {
                yield Ok(token);
            }
        }
    })
}
