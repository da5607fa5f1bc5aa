//! Turn-taking building blocks: caller speech is debounced into utterances,
//! agent speech is played one utterance at a time.

pub mod aggregator;
pub mod sequencer;

pub use aggregator::{DEFAULT_DEBOUNCE, TranscriptAggregator, Utterance, UtteranceBuffer};
pub use sequencer::{
    PlaybackHandle, PlaybackItem, PlaybackOutcome, PlaybackOutput, PlaybackSequencer,
};
