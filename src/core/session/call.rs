//! The per-call state machine.
//!
//! ```text
//! Idle ──started──▶ Started ──▶ Listening ⇄ Responding ──stopped/closed──▶ Stopped
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::delegated::DelegatedRelay;
use super::leg::{EgressSink, LegEvent, LegMessage};
use super::managed::ManagedPipeline;
use super::state::{CallState, StateTracker};
use super::SessionResult;
use crate::core::audio::{AudioFormat, AudioPacer, DEFAULT_FRAME_DURATION, FrameSink};
use crate::core::conversation::DEFAULT_DEBOUNCE;
use crate::core::llm::LLMBackend;
use crate::core::providers::ProviderFactory;

/// How the call's conversation is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Local speech-to-text, text generation and synthesis.
    Managed,
    /// A hosted agent; the session only relays audio and control signals.
    Delegated,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub mode: SessionMode,
    /// Encoding and rate of the telephony leg in both directions.
    pub leg_format: AudioFormat,
    pub frame_duration: Duration,
    pub debounce: Duration,
    /// Spoken when a managed call starts.
    pub greeting: Option<String>,
    /// Used when the leg does not name a backend or names an unknown one.
    pub default_backend: LLMBackend,
}

impl SessionSettings {
    pub fn new(mode: SessionMode, leg_format: AudioFormat) -> Self {
        Self {
            mode,
            leg_format,
            frame_duration: DEFAULT_FRAME_DURATION,
            debounce: DEFAULT_DEBOUNCE,
            greeting: None,
            default_backend: LLMBackend::default(),
        }
    }
}

/// Everything a pipeline needs once the leg has started.
pub(super) struct SessionContext {
    pub(super) stream_id: String,
    pub(super) settings: SessionSettings,
    pub(super) providers: Arc<dyn ProviderFactory>,
    pub(super) pacer: AudioPacer,
    pub(super) sink: Arc<dyn FrameSink>,
    pub(super) egress: mpsc::Sender<LegMessage>,
}

enum Pipeline {
    Managed(ManagedPipeline),
    Delegated(DelegatedRelay),
}

/// One phone call, from the leg's start event to its stop event.
pub struct CallSession {
    settings: SessionSettings,
    providers: Arc<dyn ProviderFactory>,
    state: StateTracker,
}

impl CallSession {
    pub fn new(settings: SessionSettings, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            settings,
            providers,
            state: StateTracker::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> CallState {
        self.state.current()
    }

    /// Run the call to completion.
    ///
    /// Returns once the leg stops or closes, or the delegated agent hangs up.
    /// A failure to open the AI services is returned after the session has
    /// moved to [`CallState::Stopped`].
    pub async fn run<E>(
        mut self,
        mut events: E,
        egress: mpsc::Sender<LegMessage>,
    ) -> SessionResult<()>
    where
        E: Stream<Item = LegEvent> + Unpin + Send,
    {
        let Some((stream_id, llm)) = wait_for_start(&mut events).await else {
            info!("Leg closed before the stream started");
            self.state.stop();
            return Ok(());
        };

        let backend = self.resolve_backend(llm.as_deref());
        info!(%stream_id, mode = ?self.settings.mode, %backend, "Call session started");
        self.state.set(CallState::Started);

        let ctx = match self.context(stream_id, egress) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.state.stop();
                return Err(e);
            }
        };

        let opened = match self.settings.mode {
            SessionMode::Managed => ManagedPipeline::open(&ctx, backend, &mut self.state)
                .await
                .map(Pipeline::Managed),
            SessionMode::Delegated => DelegatedRelay::open(&ctx).await.map(Pipeline::Delegated),
        };
        let mut pipeline = match opened {
            Ok(pipeline) => pipeline,
            Err(e) => {
                error!(stream_id = %ctx.stream_id, "Failed to open call services: {}", e);
                self.state.stop();
                return Err(e);
            }
        };

        if self.state.current() == CallState::Started {
            self.state.set(CallState::Listening);
        }

        match &mut pipeline {
            Pipeline::Managed(managed) => managed.run(&mut events, &mut self.state).await,
            Pipeline::Delegated(relay) => relay.run(&mut events, &mut self.state).await,
        }

        let result = match pipeline {
            Pipeline::Managed(managed) => managed.close().await,
            Pipeline::Delegated(relay) => relay.close().await,
        };
        if let Err(e) = &result {
            warn!(stream_id = %ctx.stream_id, "Error while closing call services: {}", e);
        }

        self.state.stop();
        info!(stream_id = %ctx.stream_id, "Call session stopped");
        result
    }

    fn resolve_backend(&self, requested: Option<&str>) -> LLMBackend {
        match requested {
            Some(name) => LLMBackend::from_str(name).unwrap_or_else(|e| {
                warn!("{}; using {}", e, self.settings.default_backend);
                self.settings.default_backend
            }),
            None => self.settings.default_backend,
        }
    }

    fn context(
        &self,
        stream_id: String,
        egress: mpsc::Sender<LegMessage>,
    ) -> SessionResult<SessionContext> {
        let pacer = AudioPacer::new(self.settings.leg_format, self.settings.frame_duration)?;
        let sink: Arc<dyn FrameSink> = Arc::new(EgressSink::new(stream_id.clone(), egress.clone()));
        Ok(SessionContext {
            stream_id,
            settings: self.settings.clone(),
            providers: self.providers.clone(),
            pacer,
            sink,
            egress,
        })
    }
}

/// Skip anything before the start event.
async fn wait_for_start<E>(events: &mut E) -> Option<(String, Option<String>)>
where
    E: Stream<Item = LegEvent> + Unpin,
{
    while let Some(event) = events.next().await {
        match event {
            LegEvent::Started { stream_id, llm } => return Some((stream_id, llm)),
            LegEvent::Media(_) => debug!("Dropping media received before start"),
            LegEvent::Stopped => return None,
        }
    }
    None
}
