//! Utterance playback sequencing.
//!
//! A single worker drains a FIFO of playback jobs. Each job is synthesized
//! (when it is text), unwrapped and transcoded to the egress format, then
//! paced to the egress sink. The next job is only popped once the current one
//! has finished, so two utterances never overlap on the caller's line.
//!
//! ```text
//! enqueue() ──▶ VecDeque<Job> ──▶ worker ──▶ TTS ──▶ transcode ──▶ AudioPacer ──▶ FrameSink
//!                    ▲                                                 ▲
//!             interrupt(): drain                          interrupt(): cancel in-flight
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::audio::{
    AudioFormat, AudioPacer, FrameSink, PacingOutcome, transcode, unwrap_container,
};
use crate::core::llm::SentenceUnit;
use crate::core::tts::{BaseTTS, SynthesizedAudio};

/// Something to play to the caller.
#[derive(Debug, Clone)]
pub enum PlaybackItem {
    /// Text that still has to be synthesized.
    Speech(SentenceUnit),
    /// Audio that is ready to play (delegated agent output).
    Audio(SynthesizedAudio),
}

/// Final state of one enqueued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every frame reached the egress sink.
    Played { frames: usize },
    /// Synthesis or transcoding failed; the item was dropped.
    Skipped,
    /// Removed by an interruption, by shutdown, or the egress closed.
    Cancelled,
}

/// Resolves once the associated item has finished or been dropped.
#[derive(Debug)]
pub struct PlaybackHandle {
    id: u64,
    rx: oneshot::Receiver<PlaybackOutcome>,
}

impl PlaybackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn wait(self) -> PlaybackOutcome {
        self.rx.await.unwrap_or(PlaybackOutcome::Cancelled)
    }
}

struct Job {
    id: u64,
    item: PlaybackItem,
    done: oneshot::Sender<PlaybackOutcome>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Job>,
    /// Cancels the job currently being synthesized or paced.
    in_flight: Option<CancellationToken>,
}

struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    shutdown: CancellationToken,
    next_id: AtomicU64,
}

impl Shared {
    fn drain(&self) -> usize {
        let jobs: Vec<Job> = self.state.lock().pending.drain(..).collect();
        let count = jobs.len();
        for job in jobs {
            let _ = job.done.send(PlaybackOutcome::Cancelled);
        }
        count
    }
}

/// What the worker needs to turn an item into paced frames.
pub struct PlaybackOutput {
    /// Synthesizer for [`PlaybackItem::Speech`]; without one, speech is skipped.
    pub tts: Option<Arc<dyn BaseTTS>>,
    pub egress_format: AudioFormat,
    pub pacer: AudioPacer,
    pub sink: Arc<dyn FrameSink>,
}

pub struct PlaybackSequencer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackSequencer {
    /// Start the drain worker.
    pub fn spawn(output: PlaybackOutput) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            shutdown: CancellationToken::new(),
            next_id: AtomicU64::new(1),
        });
        let worker = tokio::spawn(run_worker(shared.clone(), output));
        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Append an item to the queue.
    pub fn enqueue(&self, item: PlaybackItem) -> PlaybackHandle {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (done, rx) = oneshot::channel();

        // checked under the queue lock so a concurrent shutdown drains it
        let rejected = {
            let mut state = self.shared.state.lock();
            if self.shared.shutdown.is_cancelled() {
                Some(done)
            } else {
                state.pending.push_back(Job { id, item, done });
                None
            }
        };
        match rejected {
            Some(done) => {
                let _ = done.send(PlaybackOutcome::Cancelled);
            }
            None => self.shared.notify.notify_one(),
        }

        PlaybackHandle { id, rx }
    }

    /// Drop every queued item and abandon the one in flight.
    ///
    /// Returns how many queued items were dropped. Handles that already
    /// resolved are unaffected.
    pub fn interrupt(&self) -> usize {
        let (jobs, in_flight) = {
            let mut state = self.shared.state.lock();
            let jobs: Vec<Job> = state.pending.drain(..).collect();
            (jobs, state.in_flight.clone())
        };
        let dropped = jobs.len();
        for job in jobs {
            let _ = job.done.send(PlaybackOutcome::Cancelled);
        }
        if let Some(token) = in_flight {
            token.cancel();
        }
        info!(dropped, "Playback interrupted");
        dropped
    }

    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// True when nothing is queued or playing.
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.pending.is_empty() && state.in_flight.is_none()
    }

    /// Stop the worker, cancelling queued and in-flight items.
    pub async fn shutdown(&self) {
        {
            let _state = self.shared.state.lock();
            self.shared.shutdown.cancel();
        }
        self.shared.drain();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            warn!("Playback worker ended abnormally: {}", e);
        }
    }
}

impl Drop for PlaybackSequencer {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

async fn run_worker(shared: Arc<Shared>, output: PlaybackOutput) {
    loop {
        let next = {
            let mut state = shared.state.lock();
            let job = state.pending.pop_front();
            if job.is_some() {
                let token = shared.shutdown.child_token();
                state.in_flight = Some(token.clone());
                job.map(|job| (job, token))
            } else {
                None
            }
        };

        let Some((job, token)) = next else {
            tokio::select! {
                _ = shared.shutdown.cancelled() => break,
                _ = shared.notify.notified() => continue,
            }
        };

        debug!(job = job.id, "Playback started");
        let outcome = play(&output, job.item, &token).await;
        shared.state.lock().in_flight = None;
        debug!(job = job.id, ?outcome, "Playback finished");
        let _ = job.done.send(outcome);

        if shared.shutdown.is_cancelled() {
            break;
        }
    }

    let dropped = shared.drain();
    debug!(dropped, "Playback worker stopped");
}

async fn play(
    output: &PlaybackOutput,
    item: PlaybackItem,
    token: &CancellationToken,
) -> PlaybackOutcome {
    let audio = match item {
        PlaybackItem::Audio(audio) => audio,
        PlaybackItem::Speech(unit) => {
            let Some(tts) = &output.tts else {
                warn!(reply_id = unit.reply_id, "No synthesizer configured, skipping speech");
                return PlaybackOutcome::Skipped;
            };
            let synthesized = tokio::select! {
                biased;
                _ = token.cancelled() => return PlaybackOutcome::Cancelled,
                result = tts.synthesize(&unit.text) => result,
            };
            match synthesized {
                Ok(audio) => audio,
                Err(e) => {
                    warn!(
                        reply_id = unit.reply_id,
                        index = unit.index,
                        "Speech synthesis failed, skipping sentence: {}", e
                    );
                    return PlaybackOutcome::Skipped;
                }
            }
        }
    };

    let frames = match unwrap_container(audio.data, audio.format)
        .and_then(|(data, format)| transcode(&data, format, output.egress_format))
    {
        Ok(frames) => frames,
        Err(e) => {
            warn!("Failed to prepare audio for egress: {}", e);
            return PlaybackOutcome::Skipped;
        }
    };

    match output.pacer.stream(frames, output.sink.as_ref(), token).await {
        PacingOutcome::Completed { frames } => PlaybackOutcome::Played { frames },
        PacingOutcome::Aborted { .. } | PacingOutcome::SinkClosed { .. } => {
            PlaybackOutcome::Cancelled
        }
    }
}
