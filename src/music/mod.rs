// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Music data model for compositions.
//!
//! This module provides pitch and duration parsing, the General MIDI
//! instrument table, and the composition type returned by the
//! composition service.

pub mod composition;
pub mod duration;
pub mod instrument;
pub mod pitch;

pub use composition::{Composition, Note, ParsedNote, PitchSpec, Sound};
pub use duration::{DurationToken, MAX_TICKS};
pub use instrument::{program_number, resolve_program, InstrumentPolicy, INSTRUMENTS};
pub use pitch::{Pitch, PitchClass};

use thiserror::Error;

/// Errors raised while interpreting composition data
#[derive(Debug, Error)]
pub enum CompositionError {
    /// Pitch is not scientific pitch notation or is out of MIDI range
    #[error("invalid pitch '{0}'")]
    InvalidPitch(String),
    /// Duration token is not recognized
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),
    /// Chord with no pitches
    #[error("chord has no pitches")]
    EmptyChord,
    /// Composition runs past the longest time a MIDI file can address
    #[error("composition is too long ({0} ticks)")]
    TooLong(u64),
    /// Instrument name not in the General MIDI table (strict policy only)
    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),
    /// Composition JSON could not be parsed
    #[error("invalid composition JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CompositionError::InvalidDuration("3".to_string()).to_string(),
            "invalid duration '3'"
        );
        assert_eq!(
            CompositionError::UnknownInstrument("kazoo".to_string()).to_string(),
            "unknown instrument 'kazoo'"
        );
    }

    #[test]
    fn test_reexports() {
        assert_eq!(INSTRUMENTS.len(), 80);
        assert_eq!(program_number("music_box"), Some(11));
        assert_eq!(Pitch::parse("A4").unwrap().class(), PitchClass::A);
    }
}
