// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Composer - conversational MIDI composition.
//!
//! Prompts go to a composition service; the compositions it returns are
//! encoded as Standard MIDI files on demand. Chat sessions and live voice
//! sessions are explicit state machines driven by host events.

pub mod config;
pub mod error;
pub mod export;
pub mod live;
pub mod music;
pub mod service;
pub mod session;

pub use config::ComposerConfig;
pub use error::{Classify, ErrorKind};
pub use export::{CompositionEncoder, EncoderOptions, Exporter, FileNaming, MidiArtifact};
pub use music::{Composition, CompositionError, InstrumentPolicy, Note};
pub use service::{ComposeRequest, CompositionService, PromptMode, ServiceError, ServiceReply};
pub use session::{ConversationController, Effect, SessionDriver, SessionEvent, SessionOptions};
