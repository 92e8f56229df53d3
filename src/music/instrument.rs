// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! General MIDI instrument names.
//!
//! The composition service names instruments with canonical snake_case
//! identifiers. The first 80 General MIDI programs are recognized, each
//! mapped to its 1-based program number.

use serde::{Deserialize, Serialize};

use super::CompositionError;

/// Program used when an instrument name is not recognized
pub const DEFAULT_PROGRAM: u8 = 1;

/// Canonical instrument names in program order (index 0 = program 1)
pub const INSTRUMENTS: [&str; 80] = [
    "acoustic_grand_piano",
    "bright_acoustic_piano",
    "electric_grand_piano",
    "honky_tonk_piano",
    "electric_piano_1",
    "electric_piano_2",
    "harpsichord",
    "clavi",
    "celesta",
    "glockenspiel",
    "music_box",
    "vibraphone",
    "marimba",
    "xylophone",
    "tubular_bells",
    "dulcimer",
    "drawbar_organ",
    "percussive_organ",
    "rock_organ",
    "church_organ",
    "reed_organ",
    "accordion",
    "harmonica",
    "tango_accordion",
    "acoustic_guitar_nylon",
    "acoustic_guitar_steel",
    "electric_guitar_jazz",
    "electric_guitar_clean",
    "electric_guitar_muted",
    "overdriven_guitar",
    "distortion_guitar",
    "guitar_harmonics",
    "acoustic_bass",
    "electric_bass_finger",
    "electric_bass_pick",
    "fretless_bass",
    "slap_bass_1",
    "slap_bass_2",
    "synth_bass_1",
    "synth_bass_2",
    "violin",
    "viola",
    "cello",
    "contrabass",
    "tremolo_strings",
    "pizzicato_strings",
    "orchestral_harp",
    "timpani",
    "string_ensemble_1",
    "string_ensemble_2",
    "synth_strings_1",
    "synth_strings_2",
    "choir_aahs",
    "voice_oohs",
    "synth_voice",
    "orchestra_hit",
    "trumpet",
    "trombone",
    "tuba",
    "muted_trumpet",
    "french_horn",
    "brass_section",
    "synth_brass_1",
    "synth_brass_2",
    "soprano_sax",
    "alto_sax",
    "tenor_sax",
    "baritone_sax",
    "oboe",
    "english_horn",
    "bassoon",
    "clarinet",
    "piccolo",
    "flute",
    "recorder",
    "pan_flute",
    "blown_bottle",
    "shakuhachi",
    "whistle",
    "ocarina",
];

/// How unknown instrument names are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentPolicy {
    /// Fall back to program 1 without error
    #[default]
    Fallback,
    /// Reject unknown names
    Strict,
}

/// Look up the 1-based program number for a canonical name
pub fn program_number(name: &str) -> Option<u8> {
    INSTRUMENTS
        .iter()
        .position(|candidate| *candidate == name)
        .map(|index| index as u8 + 1)
}

/// Canonical name for a 1-based program number
pub fn instrument_name(program: u8) -> Option<&'static str> {
    program
        .checked_sub(1)
        .and_then(|index| INSTRUMENTS.get(index as usize))
        .copied()
}

/// Resolve a name to a program number under the given policy
pub fn resolve_program(name: &str, policy: InstrumentPolicy) -> Result<u8, CompositionError> {
    match (program_number(name), policy) {
        (Some(program), _) => Ok(program),
        (None, InstrumentPolicy::Fallback) => Ok(DEFAULT_PROGRAM),
        (None, InstrumentPolicy::Strict) => {
            Err(CompositionError::UnknownInstrument(name.to_string()))
        }
    }
}

/// Human-readable form of an instrument name (`music_box` -> `music box`)
pub fn display_name(name: &str) -> String {
    name.replace('_', " ")
}
