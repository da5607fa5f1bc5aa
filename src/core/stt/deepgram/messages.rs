//! Deepgram live transcription messages.

use serde::{Deserialize, Serialize};

/// Messages received from Deepgram.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum DeepgramMessage {
    Results(ResultsMessage),
    Metadata {
        #[serde(default)]
        request_id: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsMessage {
    pub channel: Channel,
    /// Interim hypotheses are revised later; only final results are kept.
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
}

impl ResultsMessage {
    /// The top alternative, if it carries any text.
    pub fn best(&self) -> Option<&Alternative> {
        self.channel
            .alternatives
            .first()
            .filter(|alt| !alt.transcript.trim().is_empty())
    }

    pub fn transcript(&self) -> Option<&str> {
        self.best().map(|alt| alt.transcript.as_str())
    }
}

/// Control messages sent to Deepgram.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum DeepgramControl {
    /// Flush pending audio and close the stream.
    CloseStream,
    /// Holds the stream open while the caller is silent.
    KeepAlive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results() {
        let json = r#"{
            "type": "Results",
            "channel_index": [0, 1],
            "is_final": true,
            "speech_final": false,
            "channel": {"alternatives": [{"transcript": "hello there", "confidence": 0.98}]}
        }"#;
        match serde_json::from_str::<DeepgramMessage>(json).unwrap() {
            DeepgramMessage::Results(results) => {
                assert!(results.is_final);
                assert_eq!(results.transcript(), Some("hello there"));
            }
            other => panic!("Expected Results, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_transcript_is_none() {
        let json = r#"{"type":"Results","channel":{"alternatives":[{"transcript":""}]}}"#;
        let DeepgramMessage::Results(results) = serde_json::from_str(json).unwrap() else {
            panic!("Expected Results");
        };
        assert_eq!(results.transcript(), None);

        let json = r#"{"type":"Results","channel":{"alternatives":[]}}"#;
        let DeepgramMessage::Results(results) = serde_json::from_str(json).unwrap() else {
            panic!("Expected Results");
        };
        assert_eq!(results.transcript(), None);
    }

    #[test]
    fn test_unknown_type() {
        let msg: DeepgramMessage = serde_json::from_str(r#"{"type":"Whatever","x":1}"#).unwrap();
        assert!(matches!(msg, DeepgramMessage::Unknown));
    }

    #[test]
    fn test_speech_events_are_ignored() {
        for json in [
            r#"{"type":"UtteranceEnd","channel":[0,1],"last_word_end":2.1}"#,
            r#"{"type":"SpeechStarted","channel":[0,1],"timestamp":0.5}"#,
        ] {
            let msg: DeepgramMessage = serde_json::from_str(json).unwrap();
            assert!(matches!(msg, DeepgramMessage::Unknown));
        }
    }

    #[test]
    fn test_control_serialization() {
        assert_eq!(
            serde_json::to_string(&DeepgramControl::CloseStream).unwrap(),
            r#"{"type":"CloseStream"}"#
        );
        assert_eq!(
            serde_json::to_string(&DeepgramControl::KeepAlive).unwrap(),
            r#"{"type":"KeepAlive"}"#
        );
    }
}
