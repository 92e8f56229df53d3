// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Scientific pitch notation.
//!
//! Parses pitch strings such as `C4`, `F#5` or `Bb3` into MIDI note
//! numbers, and recognizes the `rest` sentinel.

use std::fmt;
use std::str::FromStr;

use super::CompositionError;

/// MIDI note number type (0-127)
pub type MidiNote = u8;

/// Sentinel pitch used for silence
pub const REST: &str = "rest";

/// Note names (pitch classes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    Cs, // C# / Db
    D,
    Ds, // D# / Eb
    E,
    F,
    Fs, // F# / Gb
    G,
    Gs, // G# / Ab
    A,
    As, // A# / Bb
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Get the semitone offset (0-11) of this class above C
    pub fn semitone(self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::Cs => 1,
            PitchClass::D => 2,
            PitchClass::Ds => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::Fs => 6,
            PitchClass::G => 7,
            PitchClass::Gs => 8,
            PitchClass::A => 9,
            PitchClass::As => 10,
            PitchClass::B => 11,
        }
    }

    /// Get pitch class from a semitone offset
    pub fn from_semitone(semitone: u8) -> Self {
        PitchClass::ALL[(semitone % 12) as usize]
    }

    /// Semitone offset of a natural letter name
    fn letter_offset(letter: char) -> Option<i16> {
        match letter.to_ascii_uppercase() {
            'C' => Some(0),
            'D' => Some(2),
            'E' => Some(4),
            'F' => Some(5),
            'G' => Some(7),
            'A' => Some(9),
            'B' => Some(11),
            _ => None,
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        };
        write!(f, "{}", name)
    }
}

/// A sounding pitch: class plus octave, resolved to a MIDI note number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    midi: MidiNote,
}

impl Pitch {
    /// Create from a MIDI note number
    pub fn from_midi(midi: MidiNote) -> Option<Self> {
        (midi <= 127).then_some(Self { midi })
    }

    /// MIDI note number (C4 = 60)
    pub fn midi(self) -> MidiNote {
        self.midi
    }

    /// Pitch class of this pitch
    pub fn class(self) -> PitchClass {
        PitchClass::from_semitone(self.midi % 12)
    }

    /// Octave in scientific notation (-1..=9)
    pub fn octave(self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    /// Parse scientific pitch notation (`C4`, `c#4`, `Eb-1`, `G9`).
    ///
    /// Enharmonic spellings that cross an octave boundary (`Cb4`, `B#3`)
    /// are resolved by semitone arithmetic.
    pub fn parse(s: &str) -> Result<Self, CompositionError> {
        let invalid = || CompositionError::InvalidPitch(s.to_string());
        let trimmed = s.trim();
        let mut chars = trimmed.chars();

        let letter = chars.next().ok_or_else(invalid)?;
        let mut semitone = PitchClass::letter_offset(letter).ok_or_else(invalid)?;

        let tail = chars.as_str();
        let octave_str = match tail.chars().next() {
            Some('#') => {
                semitone += 1;
                &tail[1..]
            }
            Some('b') => {
                semitone -= 1;
                &tail[1..]
            }
            _ => tail,
        };

        let octave: i16 = match octave_str {
            "-1" => -1,
            digit if digit.len() == 1 => digit
                .chars()
                .next()
                .and_then(|c| c.to_digit(10))
                .map(|d| d as i16)
                .ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };

        let midi = (octave + 1) * 12 + semitone;
        if !(0..=127).contains(&midi) {
            return Err(invalid());
        }

        Ok(Self { midi: midi as u8 })
    }
}

impl FromStr for Pitch {
    type Err = CompositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pitch::parse(s)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class(), self.octave())
    }
}

/// Check whether a pitch string is the rest sentinel
pub fn is_rest(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case(REST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c() {
        assert_eq!(Pitch::parse("C4").unwrap().midi(), 60);
    }

    #[test]
    fn test_accidentals() {
        assert_eq!(Pitch::parse("F#5").unwrap().midi(), 78);
        assert_eq!(Pitch::parse("Bb3").unwrap().midi(), 58);
        assert_eq!(Pitch::parse("G#4").unwrap().midi(), 68);
    }

    #[test]
    fn test_lowercase_letter() {
        assert_eq!(Pitch::parse("e4").unwrap().midi(), 64);
    }

    #[test]
    fn test_octave_boundary_spellings() {
        // Cb4 is enharmonic to B3
        assert_eq!(Pitch::parse("Cb4").unwrap().midi(), 59);
        // B#3 is enharmonic to C4
        assert_eq!(Pitch::parse("B#3").unwrap().midi(), 60);
    }

    #[test]
    fn test_range_limits() {
        assert_eq!(Pitch::parse("C-1").unwrap().midi(), 0);
        assert_eq!(Pitch::parse("G9").unwrap().midi(), 127);
        assert!(Pitch::parse("G#9").is_err());
        assert!(Pitch::parse("Cb-1").is_err());
    }

    #[test]
    fn test_invalid_pitches() {
        for bad in ["", "H4", "C", "C44", "C#", "rest", "4C", "C##4"] {
            assert!(Pitch::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Pitch::parse("Db4").unwrap().to_string(), "C#4");
        assert_eq!(Pitch::from_midi(0).unwrap().to_string(), "C-1");
    }

    #[test]
    fn test_is_rest() {
        assert!(is_rest("rest"));
        assert!(is_rest(" REST "));
        assert!(!is_rest("C4"));
    }
}
