// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file writing and reading.
//!
//! Tracks collect events at absolute ticks; the writer sorts them
//! (stable, so note-offs queued before note-ons on the same tick stay
//! first) and serializes a single-track format 0 file with
//! variable-length delta times.

use std::io::{self, Write};

use thiserror::Error;

/// Default resolution (ticks per quarter note)
pub const DEFAULT_PPQN: u16 = 128;

/// Status bytes and meta types used by the writer
pub mod status {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const PROGRAM_CHANGE: u8 = 0xC0;
    pub const META: u8 = 0xFF;

    pub const META_END_OF_TRACK: u8 = 0x2F;
    pub const META_TEMPO: u8 = 0x51;
    pub const META_TIME_SIGNATURE: u8 = 0x58;
}

/// Decoded view of a track event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ProgramChange { channel: u8, program: u8 },
    Meta(u8),
    Other(u8),
}

/// A track event at an absolute tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    /// Absolute tick
    pub tick: u64,
    /// Event bytes (status first)
    pub data: Vec<u8>,
}

impl TrackEvent {
    fn note_on(tick: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            tick,
            data: vec![status::NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
        }
    }

    fn note_off(tick: u64, channel: u8, note: u8) -> Self {
        Self {
            tick,
            data: vec![status::NOTE_OFF | (channel & 0x0F), note & 0x7F, 0],
        }
    }

    fn program_change(tick: u64, channel: u8, program: u8) -> Self {
        Self {
            tick,
            data: vec![status::PROGRAM_CHANGE | (channel & 0x0F), program & 0x7F],
        }
    }

    fn tempo(tick: u64, bpm: f64) -> Self {
        let microseconds = (60_000_000.0 / bpm) as u32;
        Self {
            tick,
            data: vec![
                status::META,
                status::META_TEMPO,
                0x03,
                ((microseconds >> 16) & 0xFF) as u8,
                ((microseconds >> 8) & 0xFF) as u8,
                (microseconds & 0xFF) as u8,
            ],
        }
    }

    fn time_signature(tick: u64, numerator: u8, denominator: u8) -> Self {
        // Denominator is expressed as power of 2
        let denom_power = denominator.max(1).trailing_zeros() as u8;
        Self {
            tick,
            data: vec![
                status::META,
                status::META_TIME_SIGNATURE,
                0x04,
                numerator,
                denom_power,
                24, // MIDI clocks per metronome click
                8,  // 32nd notes per MIDI quarter note
            ],
        }
    }

    /// Decode the event type
    pub fn kind(&self) -> EventKind {
        let Some(&first) = self.data.first() else {
            return EventKind::Other(0);
        };
        let channel = first & 0x0F;
        match first & 0xF0 {
            status::NOTE_ON if self.data.len() >= 3 && self.data[2] > 0 => EventKind::NoteOn {
                channel,
                note: self.data[1],
                velocity: self.data[2],
            },
            status::NOTE_ON | status::NOTE_OFF if self.data.len() >= 3 => EventKind::NoteOff {
                channel,
                note: self.data[1],
            },
            status::PROGRAM_CHANGE if self.data.len() >= 2 => EventKind::ProgramChange {
                channel,
                program: self.data[1],
            },
            0xF0 if first == status::META && self.data.len() >= 2 => EventKind::Meta(self.data[1]),
            _ => EventKind::Other(first),
        }
    }
}

/// A single track under construction
///
/// Notes are appended at a cursor that advances by each note's length,
/// so the track plays its notes back to back.
#[derive(Debug, Clone)]
pub struct Track {
    /// MIDI channel (0-15)
    channel: u8,
    /// Events at absolute ticks, in insertion order
    events: Vec<TrackEvent>,
    /// Tick where the next note starts
    cursor: u64,
}

impl Track {
    /// Create an empty track on a channel
    pub fn new(channel: u8) -> Self {
        Self {
            channel: channel & 0x0F,
            events: Vec::new(),
            cursor: 0,
        }
    }

    /// Channel
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Current cursor tick
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Events in insertion order
    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    /// Tick at which the track ends
    pub fn end_tick(&self) -> u64 {
        self.events
            .iter()
            .map(|e| e.tick)
            .max()
            .unwrap_or(0)
            .max(self.cursor)
    }

    /// Add a tempo meta event at the cursor
    pub fn add_tempo(&mut self, bpm: f64) {
        self.events.push(TrackEvent::tempo(self.cursor, bpm.clamp(20.0, 300.0)));
    }

    /// Add a time signature meta event at the cursor
    pub fn add_time_signature(&mut self, numerator: u8, denominator: u8) {
        self.events
            .push(TrackEvent::time_signature(self.cursor, numerator.max(1), denominator));
    }

    /// Add a program change at the cursor
    pub fn add_program_change(&mut self, program: u8) {
        self.events
            .push(TrackEvent::program_change(self.cursor, self.channel, program));
    }

    /// Sound `notes` together for `ticks`, then advance the cursor
    pub fn add_notes(&mut self, notes: &[u8], ticks: u64, velocity: u8) {
        let start = self.cursor;
        let end = start + ticks;
        for &note in notes {
            self.events
                .push(TrackEvent::note_on(start, self.channel, note, velocity.max(1)));
        }
        for &note in notes {
            self.events.push(TrackEvent::note_off(end, self.channel, note));
        }
        self.cursor = end;
    }

    /// Advance the cursor without sounding anything
    pub fn add_wait(&mut self, ticks: u64) {
        self.cursor += ticks;
    }

    /// Events sorted by tick (stable)
    fn sorted_events(&self) -> Vec<&TrackEvent> {
        let mut events: Vec<&TrackEvent> = self.events.iter().collect();
        events.sort_by_key(|e| e.tick);
        events
    }
}

/// Standard MIDI file writer (format 0)
#[derive(Debug, Clone, Copy)]
pub struct SmfWriter {
    /// PPQN (ticks per quarter note)
    ppqn: u16,
}

impl SmfWriter {
    /// Create a writer with the given resolution
    pub fn new(ppqn: u16) -> Self {
        Self { ppqn: ppqn.max(1) }
    }

    /// Get PPQN
    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    /// Serialize a single track to bytes
    pub fn to_bytes(&self, track: &Track) -> Vec<u8> {
        let mut buffer = Vec::new();
        self.write_header(&mut buffer, 0, 1);
        self.write_track(&mut buffer, track);
        buffer
    }

    /// Write a single-track file to a writer
    pub fn write<W: Write>(&self, track: &Track, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes(track))
    }

    /// Write MIDI file header chunk
    fn write_header(&self, buffer: &mut Vec<u8>, format: u16, num_tracks: u16) {
        buffer.extend_from_slice(b"MThd");
        // Chunk length (always 6)
        buffer.extend_from_slice(&6u32.to_be_bytes());
        buffer.extend_from_slice(&format.to_be_bytes());
        buffer.extend_from_slice(&num_tracks.to_be_bytes());
        buffer.extend_from_slice(&self.ppqn.to_be_bytes());
    }

    /// Write a track chunk
    fn write_track(&self, buffer: &mut Vec<u8>, track: &Track) {
        let mut track_data = Vec::new();
        let mut last_tick = 0u64;

        for event in track.sorted_events() {
            let delta = event.tick.saturating_sub(last_tick);
            write_variable_length(&mut track_data, delta as u32);
            track_data.extend_from_slice(&event.data);
            last_tick = event.tick;
        }

        // End of track lands after any trailing rest
        let delta = track.end_tick().saturating_sub(last_tick);
        write_variable_length(&mut track_data, delta as u32);
        track_data.extend_from_slice(&[status::META, status::META_END_OF_TRACK, 0x00]);

        buffer.extend_from_slice(b"MTrk");
        buffer.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buffer.extend_from_slice(&track_data);
    }
}

impl Default for SmfWriter {
    fn default() -> Self {
        Self::new(DEFAULT_PPQN)
    }
}

/// Write variable-length quantity
pub fn write_variable_length(buffer: &mut Vec<u8>, mut value: u32) {
    let mut bytes = Vec::with_capacity(5);

    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buffer.extend_from_slice(&bytes);
}

/// Errors raised while reading a MIDI file
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmfError {
    #[error("missing {0} chunk")]
    MissingChunk(&'static str),
    #[error("file truncated at byte {0}")]
    Truncated(usize),
    #[error("unsupported event status 0x{0:02X}")]
    UnsupportedStatus(u8),
}

/// Parsed contents of a single-track file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmfContents {
    /// Header format
    pub format: u16,
    /// Number of track chunks declared
    pub tracks: u16,
    /// Ticks per quarter note
    pub ppqn: u16,
    /// Events of the first track, with absolute ticks (end-of-track included)
    pub events: Vec<TrackEvent>,
}

/// Read the header and first track of a file produced by [`SmfWriter`]
pub fn read(bytes: &[u8]) -> Result<SmfContents, SmfError> {
    if bytes.len() < 14 || &bytes[0..4] != b"MThd" {
        return Err(SmfError::MissingChunk("MThd"));
    }
    let format = u16::from_be_bytes([bytes[8], bytes[9]]);
    let tracks = u16::from_be_bytes([bytes[10], bytes[11]]);
    let ppqn = u16::from_be_bytes([bytes[12], bytes[13]]);

    if bytes.len() < 22 || &bytes[14..18] != b"MTrk" {
        return Err(SmfError::MissingChunk("MTrk"));
    }
    let length = u32::from_be_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]) as usize;
    let end = 22 + length;
    if bytes.len() < end {
        return Err(SmfError::Truncated(bytes.len()));
    }

    let mut events = Vec::new();
    let mut pos = 22;
    let mut tick = 0u64;
    while pos < end {
        let (delta, next) = read_variable_length(bytes, pos, end)?;
        tick += delta as u64;
        pos = next;

        let status_byte = *bytes.get(pos).ok_or(SmfError::Truncated(pos))?;
        let size = match status_byte & 0xF0 {
            0x80 | 0x90 | 0xA0 | 0xB0 | 0xE0 => 3,
            0xC0 | 0xD0 => 2,
            _ if status_byte == status::META => {
                let len = *bytes.get(pos + 2).ok_or(SmfError::Truncated(pos))? as usize;
                3 + len
            }
            _ => return Err(SmfError::UnsupportedStatus(status_byte)),
        };
        if pos + size > end {
            return Err(SmfError::Truncated(pos));
        }
        events.push(TrackEvent {
            tick,
            data: bytes[pos..pos + size].to_vec(),
        });
        pos += size;
    }

    Ok(SmfContents {
        format,
        tracks,
        ppqn,
        events,
    })
}

fn read_variable_length(bytes: &[u8], mut pos: usize, end: usize) -> Result<(u32, usize), SmfError> {
    let mut value = 0u32;
    for _ in 0..4 {
        if pos >= end {
            return Err(SmfError::Truncated(pos));
        }
        let byte = bytes[pos];
        pos += 1;
        value = (value << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, pos));
        }
    }
    Err(SmfError::Truncated(pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_length() {
        let mut buffer = Vec::new();

        write_variable_length(&mut buffer, 0);
        assert_eq!(buffer, vec![0x00]);

        buffer.clear();
        write_variable_length(&mut buffer, 127);
        assert_eq!(buffer, vec![0x7F]);

        buffer.clear();
        write_variable_length(&mut buffer, 128);
        assert_eq!(buffer, vec![0x81, 0x00]);

        buffer.clear();
        write_variable_length(&mut buffer, 16383);
        assert_eq!(buffer, vec![0xFF, 0x7F]);
    }

    #[test]
    fn test_tempo_event() {
        let event = TrackEvent::tempo(0, 120.0);
        // 120 BPM = 500000 microseconds per beat = 0x07A120
        assert_eq!(event.data, vec![0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]);
        assert_eq!(event.kind(), EventKind::Meta(status::META_TEMPO));
    }

    #[test]
    fn test_time_signature_event() {
        let event = TrackEvent::time_signature(0, 3, 8);
        assert_eq!(event.data[3], 3);
        assert_eq!(event.data[4], 3); // 2^3 = 8
    }

    #[test]
    fn test_track_cursor() {
        let mut track = Track::new(0);
        track.add_notes(&[60], 128, 64);
        track.add_wait(64);
        track.add_notes(&[60, 64], 256, 64);
        assert_eq!(track.cursor(), 448);
        assert_eq!(track.end_tick(), 448);
        assert_eq!(track.events().len(), 6);
    }

    #[test]
    fn test_header_layout() {
        let mut track = Track::new(0);
        track.add_notes(&[60], 24, 100);
        let bytes = SmfWriter::new(24).to_bytes(&track);

        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 6]);
        assert_eq!(bytes[9], 0); // Format 0
        assert_eq!(&bytes[10..12], &1u16.to_be_bytes());
        assert_eq!(&bytes[12..14], &24u16.to_be_bytes());
        assert_eq!(&bytes[14..18], b"MTrk");
    }

    #[test]
    fn test_same_tick_note_off_precedes_note_on() {
        let mut track = Track::new(0);
        track.add_notes(&[60], 128, 64);
        track.add_notes(&[62], 128, 64);
        let contents = read(&SmfWriter::default().to_bytes(&track)).unwrap();

        let at_128: Vec<EventKind> = contents
            .events
            .iter()
            .filter(|e| e.tick == 128)
            .map(|e| e.kind())
            .collect();
        assert_eq!(
            at_128,
            vec![
                EventKind::NoteOff { channel: 0, note: 60 },
                EventKind::NoteOn { channel: 0, note: 62, velocity: 64 },
            ]
        );
    }

    #[test]
    fn test_trailing_wait_extends_end_of_track() {
        let mut track = Track::new(0);
        track.add_notes(&[60], 128, 64);
        track.add_wait(128);
        let contents = read(&SmfWriter::default().to_bytes(&track)).unwrap();
        let last = contents.events.last().unwrap();
        assert_eq!(last.kind(), EventKind::Meta(status::META_END_OF_TRACK));
        assert_eq!(last.tick, 256);
    }

    #[test]
    fn test_read_rejects_garbage() {
        assert_eq!(read(b"RIFF"), Err(SmfError::MissingChunk("MThd")));

        let mut track = Track::new(0);
        track.add_notes(&[60], 128, 64);
        let bytes = SmfWriter::default().to_bytes(&track);
        assert!(matches!(read(&bytes[..bytes.len() - 2]), Err(SmfError::Truncated(_))));
    }
}
