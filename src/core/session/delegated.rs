//! Delegated relay: a hosted agent does recognition, generation and synthesis.
//!
//! Caller audio is transcoded to the agent format and forwarded. Agent audio
//! goes through the same [`PlaybackSequencer`] as managed speech, so it is
//! paced, never overlaps, and is cut by the agent's `interruption` signal.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::call::SessionContext;
use super::leg::{LegEvent, LegMessage};
use super::state::StateTracker;
use super::{SessionError, SessionResult};
use crate::core::agent::{AgentEvent, BaseAgent};
use crate::core::audio::{AudioFormat, transcode};
use crate::core::conversation::{PlaybackItem, PlaybackOutcome, PlaybackOutput, PlaybackSequencer};
use crate::core::tts::SynthesizedAudio;

const AGENT_EVENT_CHANNEL_SIZE: usize = 256;

pub(super) struct DelegatedRelay {
    stream_id: String,
    leg_format: AudioFormat,
    agent: Box<dyn BaseAgent>,
    agent_format: AudioFormat,
    agent_events: mpsc::Receiver<AgentEvent>,
    sequencer: PlaybackSequencer,
    playbacks: JoinSet<PlaybackOutcome>,
    egress: mpsc::Sender<LegMessage>,
}

impl DelegatedRelay {
    pub(super) async fn open(ctx: &SessionContext) -> SessionResult<Self> {
        let mut agent = ctx.providers.create_agent()?;
        let (event_tx, agent_events) = mpsc::channel(AGENT_EVENT_CHANNEL_SIZE);
        agent.connect(event_tx).await?;
        let agent_format = agent.audio_format();
        info!(
            stream_id = %ctx.stream_id,
            agent = agent.provider_name(),
            %agent_format,
            "Delegated agent connected"
        );

        let sequencer = PlaybackSequencer::spawn(PlaybackOutput {
            tts: None,
            egress_format: ctx.settings.leg_format,
            pacer: ctx.pacer,
            sink: ctx.sink.clone(),
        });

        Ok(Self {
            stream_id: ctx.stream_id.clone(),
            leg_format: ctx.settings.leg_format,
            agent,
            agent_format,
            agent_events,
            sequencer,
            playbacks: JoinSet::new(),
            egress: ctx.egress.clone(),
        })
    }

    /// Relay until the leg stops or the agent hangs up.
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
                agent_event = self.agent_events.recv() => match agent_event {
                    Some(event) => self.handle_agent_event(event, state).await,
                    None => {
                        warn!("Agent connection closed, ending call");
                        break;
                    }
                },
                Some(joined) = self.playbacks.join_next(), if !self.playbacks.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        error!("Playback wait panicked: {}", e);
                    }
                    state.end_reply();
                }
            }
        }
    }

    async fn forward_audio(&mut self, audio: Bytes) {
        if !self.agent.is_ready() {
            debug!("Agent not ready, dropping audio");
            return;
        }
        let audio = match transcode(&audio, self.leg_format, self.agent_format) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Dropping caller audio: {}", e);
                return;
            }
        };
        if let Err(e) = self.agent.send_audio(audio).await {
            warn!("Failed to forward caller audio to agent: {}", e);
        }
    }

    async fn handle_agent_event(&mut self, event: AgentEvent, state: &mut StateTracker) {
        match event {
            AgentEvent::Started { conversation_id } => {
                info!(?conversation_id, "Agent conversation started");
            }
            AgentEvent::Audio(data) => {
                let handle = self.sequencer.enqueue(PlaybackItem::Audio(SynthesizedAudio {
                    data,
                    format: self.agent_format,
                }));
                self.playbacks.spawn(handle.wait());
                state.begin_reply();
            }
            AgentEvent::Interruption => {
                let dropped = self.sequencer.interrupt();
                info!(dropped, "Agent reported barge-in, clearing egress");
                let clear = LegMessage::Clear {
                    stream_id: self.stream_id.clone(),
                };
                if self.egress.send(clear).await.is_err() {
                    debug!("Leg already closed, clear not sent");
                }
            }
            AgentEvent::Ping { event_id } => {
                if let Err(e) = self.agent.send_pong(event_id).await {
                    warn!(event_id, "Failed to answer agent ping: {}", e);
                }
            }
            AgentEvent::AgentResponse(text) => info!(agent = %text, "Agent response"),
            AgentEvent::UserTranscript(text) => info!(caller = %text, "Caller transcript"),
        }
    }

    pub(super) async fn close(mut self) -> SessionResult<()> {
        self.sequencer.shutdown().await;
        self.playbacks.shutdown().await;
        self.agent.disconnect().await.map_err(SessionError::from)
    }
}
