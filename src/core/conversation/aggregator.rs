//! Silence-debounced transcript aggregation.
//!
//! Fragments are appended to a buffer and every fragment restarts the debounce
//! timer. Once no fragment arrives for the debounce window, the trimmed buffer
//! is emitted as one [`Utterance`] and cleared.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::stt::TranscriptFragment;

/// Silence gap that finalizes an utterance.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1200);

/// Caller speech finalized after a silence gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub finalized_at: Instant,
}

/// Text accumulated since the last finalized utterance.
#[derive(Debug, Default)]
pub struct UtteranceBuffer {
    text: String,
}

impl UtteranceBuffer {
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.text.push(' ');
    }

    /// Take the trimmed contents; whitespace-only buffers yield `None`.
    pub fn take(&mut self) -> Option<String> {
        let text = self.text.trim().to_string();
        self.text.clear();
        (!text.is_empty()).then_some(text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TranscriptAggregator {
    debounce: Duration,
}

impl Default for TranscriptAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl TranscriptAggregator {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn spawn(
        self,
        fragments: mpsc::Receiver<TranscriptFragment>,
        utterances: mpsc::Sender<Utterance>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(fragments, utterances, cancel))
    }

    /// Aggregate until cancelled or the utterance receiver is dropped.
    ///
    /// When the fragment source closes, a pending utterance is still emitted
    /// once its timer fires.
    pub async fn run(
        self,
        mut fragments: mpsc::Receiver<TranscriptFragment>,
        utterances: mpsc::Sender<Utterance>,
        cancel: CancellationToken,
    ) {
        let mut buffer = UtteranceBuffer::default();
        let mut deadline: Option<Instant> = None;
        let mut input_open = true;

        loop {
            if !input_open && deadline.is_none() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,

                fragment = fragments.recv(), if input_open => match fragment {
                    Some(fragment) => {
                        buffer.push(&fragment.text);
                        deadline = Some(Instant::now() + self.debounce);
                    }
                    None => input_open = false,
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    if let Some(text) = buffer.take() {
                        debug!(chars = text.len(), "Utterance finalized");
                        let utterance = Utterance {
                            text,
                            finalized_at: Instant::now(),
                        };
                        if utterances.send(utterance).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}
