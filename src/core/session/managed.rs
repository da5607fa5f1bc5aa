//! Managed pipeline: local speech-to-text, text generation and synthesis.
//!
//! ```text
//! leg media ─▶ transcode ─▶ STT ─▶ TranscriptAggregator ─▶ utterance
//! utterance ─▶ LLM tokens ─▶ sentences() ─▶ PlaybackSequencer ─▶ leg
//! ```
//!
//! Every finalized utterance gets its own reply task. All replies feed the
//! same sequencer, so their sentences interleave in arrival order but never
//! play on top of each other.

use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::call::SessionContext;
use super::leg::LegEvent;
use super::state::StateTracker;
use super::{SessionError, SessionResult};
use crate::core::audio::{AudioEncoding, AudioFormat, transcode};
use crate::core::conversation::{
    PlaybackItem, PlaybackOutput, PlaybackSequencer, TranscriptAggregator, Utterance,
};
use crate::core::llm::{BaseLLM, LLMBackend, SentenceUnit, sentences};
use crate::core::stt::BaseSTT;

const FRAGMENT_CHANNEL_SIZE: usize = 256;
const UTTERANCE_CHANNEL_SIZE: usize = 16;

pub(super) struct ManagedPipeline {
    leg_format: AudioFormat,
    stt: Box<dyn BaseSTT>,
    llm: Arc<dyn BaseLLM>,
    sequencer: Arc<PlaybackSequencer>,
    utterances: mpsc::Receiver<Utterance>,
    aggregator: JoinHandle<()>,
    replies: JoinSet<()>,
    next_reply_id: u64,
    cancel: CancellationToken,
}

impl ManagedPipeline {
    /// Open every service for the call and queue the greeting.
    pub(super) async fn open(
        ctx: &SessionContext,
        backend: LLMBackend,
        state: &mut StateTracker,
    ) -> SessionResult<Self> {
        let leg_format = ctx.settings.leg_format;

        let llm: Arc<dyn BaseLLM> = Arc::from(ctx.providers.create_llm(backend)?);
        // synthesize linear PCM at the leg's rate and let the transcoder
        // produce the leg encoding
        let tts = ctx.providers.create_tts(AudioFormat::new(
            AudioEncoding::Linear16,
            leg_format.sample_rate,
        ))?;

        let mut stt = ctx.providers.create_stt(leg_format)?;
        let (fragment_tx, fragment_rx) = mpsc::channel(FRAGMENT_CHANNEL_SIZE);
        stt.connect(fragment_tx).await?;
        info!(
            stream_id = %ctx.stream_id,
            stt = stt.provider_name(),
            %backend,
            "Managed pipeline connected"
        );

        let cancel = CancellationToken::new();
        let (utterance_tx, utterances) = mpsc::channel(UTTERANCE_CHANNEL_SIZE);
        let aggregator = TranscriptAggregator::new(ctx.settings.debounce).spawn(
            fragment_rx,
            utterance_tx,
            cancel.child_token(),
        );

        let sequencer = Arc::new(PlaybackSequencer::spawn(PlaybackOutput {
            tts: Some(Arc::from(tts)),
            egress_format: leg_format,
            pacer: ctx.pacer,
            sink: ctx.sink.clone(),
        }));

        let mut pipeline = Self {
            leg_format,
            stt,
            llm,
            sequencer,
            utterances,
            aggregator,
            replies: JoinSet::new(),
            next_reply_id: 1,
            cancel,
        };

        if let Some(greeting) = ctx.settings.greeting.as_deref()
            && !greeting.trim().is_empty()
        {
            let handle = pipeline
                .sequencer
                .enqueue(PlaybackItem::Speech(SentenceUnit::standalone(greeting)));
            pipeline.replies.spawn(async move {
                let outcome = handle.wait().await;
                debug!(?outcome, "Greeting finished");
            });
            state.begin_reply();
        }

        Ok(pipeline)
    }

    /// Drive the call until the leg stops.
    pub(super) async fn run<E>(&mut self, events: &mut E, state: &mut StateTracker)
    where
        E: Stream<Item = LegEvent> + Unpin + Send,
    {
        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(LegEvent::Media(audio)) => self.forward_audio(audio).await,
                    Some(LegEvent::Started { stream_id, .. }) => {
                        warn!(%stream_id, "Ignoring duplicate start event");
                    }
                    Some(LegEvent::Stopped) => {
                        info!("Leg stopped the stream");
                        break;
                    }
                    None => {
                        info!("Leg closed");
                        break;
                    }
                },
                Some(utterance) = self.utterances.recv() => {
                    self.start_reply(utterance);
                    state.begin_reply();
                }
                Some(joined) = self.replies.join_next(), if !self.replies.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        error!("Reply task panicked: {}", e);
                    }
                    state.end_reply();
                }
            }
        }
    }

    async fn forward_audio(&mut self, audio: Bytes) {
        if !self.stt.is_ready() {
            debug!("Speech-to-text not ready, dropping audio");
            return;
        }
        let audio = match transcode(&audio, self.leg_format, self.stt.audio_format()) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Dropping caller audio: {}", e);
                return;
            }
        };
        if let Err(e) = self.stt.send_audio(audio).await {
            warn!("Failed to forward caller audio: {}", e);
        }
    }

    fn start_reply(&mut self, utterance: Utterance) {
        let reply_id = self.next_reply_id;
        self.next_reply_id += 1;
        info!(reply_id, text = %utterance.text, "Caller utterance finalized");

        self.replies.spawn(reply(
            self.llm.clone(),
            self.sequencer.clone(),
            utterance,
            reply_id,
            self.cancel.child_token(),
        ));
    }

    /// Tear everything down. Queued and in-flight playback is dropped.
    pub(super) async fn close(mut self) -> SessionResult<()> {
        self.cancel.cancel();
        self.sequencer.shutdown().await;
        self.replies.shutdown().await;

        let result = self.stt.disconnect().await.map_err(SessionError::from);
        if let Err(e) = (&mut self.aggregator).await {
            warn!("Transcript aggregator ended abnormally: {}", e);
        }
        result
    }
}

/// Stream one reply into the sequencer and wait until it has been spoken.
async fn reply(
    llm: Arc<dyn BaseLLM>,
    sequencer: Arc<PlaybackSequencer>,
    utterance: Utterance,
    reply_id: u64,
    cancel: CancellationToken,
) {
    let tokens = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = llm.stream_reply(&utterance.text) => result,
    };
    let tokens = match tokens {
        Ok(tokens) => tokens,
        Err(e) => {
            warn!(reply_id, backend = %llm.backend(), "Reply request failed: {}", e);
            return;
        }
    };

    let units = sentences(tokens, reply_id);
    tokio::pin!(units);

    let mut handles = Vec::new();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            unit = units.next() => match unit {
                Some(unit) => {
                    debug!(reply_id, index = unit.index, text = %unit.text, "Sentence ready");
                    handles.push(sequencer.enqueue(PlaybackItem::Speech(unit)));
                }
                None => break,
            },
        }
    }

    for handle in handles {
        let id = handle.id();
        let outcome = handle.wait().await;
        debug!(reply_id, playback = id, ?outcome, "Sentence finished");
    }
}
