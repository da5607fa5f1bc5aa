//! Sentence segmentation of streamed replies.
//!
//! Units are cut as soon as a token carrying `.`, `!` or `?` arrives, so speech
//! synthesis for the first sentence can start while the model is still
//! generating the rest of the reply.

use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use super::base::TokenStream;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// One sentence-granular chunk of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceUnit {
    /// Reply this unit belongs to, unique within a call.
    pub reply_id: u64,
    /// Position within the reply, starting at 0.
    pub index: usize,
    pub text: String,
}

impl SentenceUnit {
    /// A standalone unit outside any generated reply (the greeting).
    pub fn standalone(text: impl Into<String>) -> Self {
        Self {
            reply_id: 0,
            index: 0,
            text: text.into(),
        }
    }
}

/// Incremental segmenter for a single reply.
#[derive(Debug)]
pub struct ReplySegmenter {
    reply_id: u64,
    buffer: String,
    next_index: usize,
}

impl ReplySegmenter {
    pub fn new(reply_id: u64) -> Self {
        Self {
            reply_id,
            buffer: String::new(),
            next_index: 0,
        }
    }

    /// Append a token; returns a unit when the token ends a sentence.
    pub fn push_token(&mut self, token: &str) -> Option<SentenceUnit> {
        self.buffer.push_str(token);
        if token.contains(SENTENCE_TERMINATORS) {
            self.flush()
        } else {
            None
        }
    }

    /// Emit the trailing remainder at end of stream.
    pub fn finish(&mut self) -> Option<SentenceUnit> {
        self.flush()
    }

    fn flush(&mut self) -> Option<SentenceUnit> {
        let text = self.buffer.trim().to_string();
        self.buffer.clear();
        if text.is_empty() {
            return None;
        }
        let unit = SentenceUnit {
            reply_id: self.reply_id,
            index: self.next_index,
            text,
        };
        self.next_index += 1;
        Some(unit)
    }
}

/// Adapt a token stream into a stream of sentence units.
///
/// A transport error ends the reply early; whatever was buffered before the
/// error is still emitted.
pub fn sentences(mut tokens: TokenStream, reply_id: u64) -> impl Stream<Item = SentenceUnit> {
    async_stream::stream! {
        let mut segmenter = ReplySegmenter::new(reply_id);
        while let Some(item) = tokens.next().await {
            match item {
                Ok(token) => {
                    if let Some(unit) = segmenter.push_token(&token) {
                        debug!(reply_id, index = unit.index, "Sentence unit ready");
                        yield unit;
                    }
                }
                Err(e) => {
                    warn!(reply_id, "Reply stream failed: {}", e);
                    break;
                }
            }
        }
        if let Some(unit) = segmenter.finish() {
            yield unit;
        }
    }
}
