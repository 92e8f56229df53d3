// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Live voice sessions.
//!
//! This module provides:
//! - The live session state machine and its host interface
//! - Wake-phrase detection
//! - Gapless playback scheduling with barge-in
//! - Wire types and PCM conversion for the live channel

pub mod playback;
pub mod protocol;
pub mod session;
pub mod wake;

pub use playback::{PlaybackHandle, PlaybackScheduler};
pub use protocol::{AudioBuffer, ServerMessage, SessionSetup, ToolResponse, ToolResult};
pub use session::{LiveEvent, LiveHost, LiveOptions, LiveSession, LiveState, ToolRequest, TransportEvent};
pub use wake::WakeWordDetector;

use thiserror::Error;

/// Live session errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiveError {
    /// Microphone could not be acquired
    #[error("microphone unavailable: {0}")]
    Microphone(String),
    /// Audio context could not be opened
    #[error("audio context unavailable: {0}")]
    AudioContext(String),
    #[error("transport error: {0}")]
    Transport(String),
    /// Message did not match the wire format
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("invalid audio data: {0}")]
    InvalidAudio(String),
    /// Model called a tool that is not offered
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            LiveError::UnknownTool("launch".to_string()).to_string(),
            "unknown tool 'launch'"
        );
    }

    #[test]
    fn test_default_session() {
        let session = LiveSession::default();
        assert_eq!(session.state(), LiveState::Disconnected);
        assert_eq!(session.connection(), 0);
    }
}
