// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI export.
//!
//! This module provides:
//! - Standard MIDI file writing and reading
//! - Composition encoding
//! - Downloadable artifacts (data URIs, atomic file saves)

pub mod download;
pub mod encoder;
pub mod smf;

pub use download::{Exporter, FileNaming, MidiArtifact};
pub use encoder::{CompositionEncoder, EncoderOptions};
pub use smf::{SmfWriter, Track};

use std::io;

use thiserror::Error;

use crate::music::CompositionError;

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// No encoder is available in this session
    #[error("MIDI library not available")]
    WriterUnavailable,
    /// The composition could not be encoded
    #[error("invalid composition data: {0}")]
    Malformed(#[from] CompositionError),
    /// Writing the file failed
    #[error("failed to write MIDI file: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_creation() {
        let exporter = Exporter::default();
        assert!(!exporter.is_available());
        assert_eq!(exporter.naming(), FileNaming::Timestamped);
    }

    #[test]
    fn test_writer_creation() {
        let writer = SmfWriter::default();
        assert_eq!(writer.ppqn(), 128);
    }

    #[test]
    fn test_error_from_composition_error() {
        let err: ExportError = CompositionError::EmptyChord.into();
        assert!(matches!(err, ExportError::Malformed(_)));
    }
}
