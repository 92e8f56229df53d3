// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Compositions as returned by the composition service.
//!
//! A composition keeps the raw pitch and duration strings it was
//! delivered with; typed parsing happens when it is encoded (or when
//! [`Composition::validate`] is called).

use serde::{Deserialize, Serialize};

use super::duration::DurationToken;
use super::instrument::{self, InstrumentPolicy};
use super::pitch::{self, Pitch};
use super::CompositionError;

/// Pitch field of a note: one pitch (or `rest`) or a chord
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPitch", into = "RawPitch")]
pub enum PitchSpec {
    /// Single pitch or the `rest` sentinel
    Single(String),
    /// Pitches sounded together
    Chord(Vec<String>),
}

/// Wire form of a pitch; chords may arrive as a JSON array or as a
/// string holding one (`"[\"C4\", \"E4\"]"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPitch {
    Text(String),
    List(Vec<String>),
}

impl From<RawPitch> for PitchSpec {
    fn from(raw: RawPitch) -> Self {
        let list = match raw {
            RawPitch::List(list) => list,
            RawPitch::Text(text) => {
                if !text.trim_start().starts_with('[') {
                    return PitchSpec::Single(text);
                }
                match serde_json::from_str::<Vec<String>>(&text) {
                    Ok(list) => list,
                    // Left as-is; fails as an invalid pitch at encode time
                    Err(_) => return PitchSpec::Single(text),
                }
            }
        };

        if list.len() == 1 {
            PitchSpec::Single(list.into_iter().next().unwrap_or_default())
        } else {
            PitchSpec::Chord(list)
        }
    }
}

impl From<PitchSpec> for RawPitch {
    fn from(spec: PitchSpec) -> Self {
        match spec {
            PitchSpec::Single(text) => RawPitch::Text(text),
            PitchSpec::Chord(list) => RawPitch::List(list),
        }
    }
}

impl PitchSpec {
    /// Rest sentinel
    pub fn rest() -> Self {
        PitchSpec::Single(pitch::REST.to_string())
    }

    /// Check whether this is a rest
    pub fn is_rest(&self) -> bool {
        matches!(self, PitchSpec::Single(p) if pitch::is_rest(p))
    }
}

/// A note as delivered by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Pitch, chord or rest
    pub pitch: PitchSpec,
    /// Duration token (e.g. "4", "d8", "t8")
    pub duration: String,
}

impl Note {
    /// Create a single-pitch note
    pub fn single(pitch: impl Into<String>, duration: impl Into<String>) -> Self {
        Self {
            pitch: PitchSpec::Single(pitch.into()),
            duration: duration.into(),
        }
    }

    /// Create a chord note
    pub fn chord<I, S>(pitches: I, duration: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pitch: PitchSpec::Chord(pitches.into_iter().map(Into::into).collect()),
            duration: duration.into(),
        }
    }

    /// Create a rest
    pub fn rest(duration: impl Into<String>) -> Self {
        Self {
            pitch: PitchSpec::rest(),
            duration: duration.into(),
        }
    }

    /// Parse into typed pitches and duration
    pub fn parse(&self) -> Result<ParsedNote, CompositionError> {
        let duration = DurationToken::parse(&self.duration)?;
        let sound = match &self.pitch {
            PitchSpec::Single(p) if pitch::is_rest(p) => Sound::Rest,
            PitchSpec::Single(p) => Sound::Single(Pitch::parse(p)?),
            PitchSpec::Chord(list) if list.is_empty() => return Err(CompositionError::EmptyChord),
            PitchSpec::Chord(list) => Sound::Chord(
                list.iter()
                    .map(|p| Pitch::parse(p))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        Ok(ParsedNote { sound, duration })
    }
}

/// What a parsed note sounds like
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sound {
    /// Silence
    Rest,
    /// One pitch
    Single(Pitch),
    /// Simultaneous pitches
    Chord(Vec<Pitch>),
}

impl Sound {
    /// Pitches that sound (empty for a rest)
    pub fn pitches(&self) -> &[Pitch] {
        match self {
            Sound::Rest => &[],
            Sound::Single(p) => std::slice::from_ref(p),
            Sound::Chord(list) => list,
        }
    }
}

/// A note with typed pitch and duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNote {
    /// Sounding pitches
    pub sound: Sound,
    /// Duration
    pub duration: DurationToken,
}

/// An instrument plus an ordered note sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    /// Canonical General MIDI instrument name
    pub instrument: String,
    /// Notes in playing order
    pub notes: Vec<Note>,
}

impl Composition {
    /// Create a new composition
    pub fn new(instrument: impl Into<String>, notes: Vec<Note>) -> Self {
        Self {
            instrument: instrument.into(),
            notes,
        }
    }

    /// Parse a composition from JSON
    pub fn from_json(json: &str) -> Result<Self, CompositionError> {
        Ok(serde_json::from_str(json.trim())?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, CompositionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Instrument name with spaces, for display
    pub fn instrument_display(&self) -> String {
        instrument::display_name(&self.instrument)
    }

    /// Parse every note
    pub fn parse_notes(&self) -> Result<Vec<ParsedNote>, CompositionError> {
        self.notes.iter().map(Note::parse).collect()
    }

    /// Check that the composition can be encoded under a policy
    pub fn validate(&self, policy: InstrumentPolicy) -> Result<(), CompositionError> {
        instrument::resolve_program(&self.instrument, policy)?;
        self.parse_notes().map(|_| ())
    }
}
