//! Call lifecycle state.

use std::fmt;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    Started,
    Listening,
    Responding,
    Stopped,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallState::Idle => write!(f, "idle"),
            CallState::Started => write!(f, "started"),
            CallState::Listening => write!(f, "listening"),
            CallState::Responding => write!(f, "responding"),
            CallState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Publishes state changes and counts replies still in progress.
///
/// `Responding` holds while at least one reply is streaming or playing.
/// `Stopped` is terminal.
#[derive(Debug)]
pub struct StateTracker {
    tx: watch::Sender<CallState>,
    active_replies: usize,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(CallState::Idle);
        Self {
            tx,
            active_replies: 0,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> CallState {
        *self.tx.borrow()
    }

    pub fn active_replies(&self) -> usize {
        self.active_replies
    }

    pub fn set(&self, state: CallState) {
        self.tx.send_if_modified(|current| {
            if *current == CallState::Stopped || *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    pub fn begin_reply(&mut self) {
        self.active_replies += 1;
        self.set(CallState::Responding);
    }

    pub fn end_reply(&mut self) {
        self.active_replies = self.active_replies.saturating_sub(1);
        if self.active_replies == 0 && self.current() == CallState::Responding {
            self.set(CallState::Listening);
        }
    }

    pub fn stop(&mut self) {
        self.active_replies = 0;
        self.set(CallState::Stopped);
    }
}
