// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Chat session state.
//!
//! This module provides:
//! - The conversation controller and its effects
//! - The transcript and its entries
//! - Speech capture for prompts
//! - User identity, auth strategies and host capabilities
//! - A tokio driver for the async parts of a session

pub mod capture;
pub mod controller;
pub mod driver;
pub mod identity;
pub mod transcript;

pub use capture::{CaptureController, CaptureError, CaptureEvent, CaptureState};
pub use controller::{
    ConversationController, Effect, RequestId, SessionEvent, SessionOptions, TurnOutcome,
    TurnState, View,
};
pub use driver::SessionDriver;
pub use identity::{
    AuthError, AuthStrategy, Capabilities, IdentityProvider, ProfileIdentity, TokenIdentity,
    UserProfile,
};
pub use transcript::{EntryBody, EntryId, Role, Transcript, TranscriptEntry, TranscriptRow};
