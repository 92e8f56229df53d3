// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Speech-to-text prompt capture.
//!
//! The recognizer itself belongs to the host. This controller decides
//! when it may be started, and reacts to the events it reports. A stop
//! request does not change state; the recognizer's terminal event does.

use thiserror::Error;
use tracing::{debug, info, warn};

/// Recognizer failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("no speech detected")]
    NoSpeech,
    /// Microphone permission refused
    #[error("microphone access not allowed")]
    NotAllowed,
    #[error("recognition aborted")]
    Aborted,
    #[error("recognition failed: {0}")]
    Other(String),
}

/// Events reported by a recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Final transcript
    Transcript(String),
    Error(CaptureError),
    /// Recognizer stopped
    End,
}

/// Capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Listening,
}

/// Instruction for the host's recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerCommand {
    Start,
    Stop,
}

/// Capture sub-controller
#[derive(Debug, Clone)]
pub struct CaptureController {
    state: CaptureState,
    available: bool,
    permission_denied: bool,
}

impl CaptureController {
    /// Create a controller; `available` is false when the host has no recognizer
    pub fn new(available: bool) -> Self {
        Self {
            state: CaptureState::Idle,
            available,
            permission_denied: false,
        }
    }

    /// Current state
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Check whether capture can be offered at all
    pub fn is_enabled(&self) -> bool {
        self.available && !self.permission_denied
    }

    /// Check whether the recognizer is running
    pub fn is_listening(&self) -> bool {
        self.state == CaptureState::Listening
    }

    /// Start listening unless unavailable, denied, busy or already listening
    pub fn start(&mut self, busy: bool) -> Option<RecognizerCommand> {
        if !self.is_enabled() || busy || self.is_listening() {
            debug!(
                available = self.available,
                denied = self.permission_denied,
                busy,
                "capture start ignored"
            );
            return None;
        }
        self.state = CaptureState::Listening;
        info!("capture started");
        Some(RecognizerCommand::Start)
    }

    /// Ask the recognizer to stop
    pub fn stop(&mut self) -> Option<RecognizerCommand> {
        self.is_listening().then_some(RecognizerCommand::Stop)
    }

    /// Start or stop depending on state
    pub fn toggle(&mut self, busy: bool) -> Option<RecognizerCommand> {
        if self.is_listening() {
            self.stop()
        } else {
            self.start(busy)
        }
    }

    /// Apply a recognizer event; returns the transcript to use as input
    pub fn handle(&mut self, event: CaptureEvent) -> Option<String> {
        if !self.is_listening() {
            debug!(?event, "capture event while idle ignored");
            return None;
        }
        self.state = CaptureState::Idle;
        match event {
            CaptureEvent::Transcript(text) => Some(text),
            CaptureEvent::Error(CaptureError::NotAllowed) => {
                warn!("microphone permission denied, capture disabled");
                self.permission_denied = true;
                None
            }
            CaptureEvent::Error(err) => {
                debug!(%err, "capture ended with error");
                None
            }
            CaptureEvent::End => None,
        }
    }

    /// Forget session state; a permission denial also resets
    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.permission_denied = false;
    }
}
