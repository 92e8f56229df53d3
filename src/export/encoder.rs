// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Composition to MIDI encoding.
//!
//! Builds one track: tempo and time signature meta events, a single
//! program change, then one event group per note in order. Rests only
//! advance the track cursor; chords start and stop together.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::smf::{SmfWriter, Track, DEFAULT_PPQN};
use crate::music::{
    resolve_program, Composition, CompositionError, InstrumentPolicy, Sound, MAX_TICKS,
};

/// Encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// Tempo in BPM
    pub tempo: f64,
    /// Note-on velocity (1-127)
    pub velocity: u8,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Ticks per quarter note
    pub ppqn: u16,
    /// Time signature (numerator, denominator)
    pub time_signature: (u8, u8),
    /// Unknown instrument handling
    pub instrument_policy: InstrumentPolicy,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            velocity: 64,
            channel: 0,
            ppqn: DEFAULT_PPQN,
            time_signature: (4, 4),
            instrument_policy: InstrumentPolicy::Fallback,
        }
    }
}

/// Stateless composition encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositionEncoder {
    options: EncoderOptions,
}

impl CompositionEncoder {
    /// Create an encoder with options
    pub fn new(options: EncoderOptions) -> Self {
        Self { options }
    }

    /// Get options
    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Build the track for a composition without serializing it.
    ///
    /// Every note is parsed before anything is added, so a malformed
    /// note never yields a partial track. A track longer than the
    /// largest MIDI delta-time is rejected, since every delta is bounded
    /// by the end tick.
    pub fn build_track(&self, composition: &Composition) -> Result<Track, CompositionError> {
        let program = resolve_program(&composition.instrument, self.options.instrument_policy)?;
        let notes = composition.parse_notes()?;

        let mut track = Track::new(self.options.channel);
        track.add_tempo(self.options.tempo);
        track.add_time_signature(self.options.time_signature.0, self.options.time_signature.1);
        track.add_program_change(program);

        for note in &notes {
            let ticks = note.duration.ticks(self.options.ppqn) as u64;
            match &note.sound {
                Sound::Rest => track.add_wait(ticks),
                sound => {
                    let pitches: Vec<u8> = sound.pitches().iter().map(|p| p.midi()).collect();
                    track.add_notes(&pitches, ticks, self.options.velocity);
                }
            }
        }

        if track.end_tick() > MAX_TICKS as u64 {
            return Err(CompositionError::TooLong(track.end_tick()));
        }

        debug!(
            instrument = %composition.instrument,
            program,
            notes = notes.len(),
            end_tick = track.end_tick(),
            "built composition track"
        );
        Ok(track)
    }

    /// Encode a composition as Standard MIDI file bytes
    pub fn encode(&self, composition: &Composition) -> Result<Vec<u8>, CompositionError> {
        let track = self.build_track(composition)?;
        Ok(SmfWriter::new(self.options.ppqn).to_bytes(&track))
    }
}
