// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Downloadable MIDI artifacts.
//!
//! The exporter turns a composition into a named artifact that can be
//! rendered as a data URI or written to disk. Disk writes go through a
//! temporary file in the destination directory that is persisted under
//! the final name only once fully written.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::encoder::CompositionEncoder;
use super::ExportError;
use crate::music::Composition;

/// MIME type of exported files
pub const MIDI_MIME: &str = "audio/midi";

/// Fixed file name used by [`FileNaming::Fixed`]
pub const FIXED_FILE_NAME: &str = "composition.mid";

/// How exported files are named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileNaming {
    /// `composition-<unix millis>.mid`
    #[default]
    Timestamped,
    /// `composition.mid`
    Fixed,
}

impl FileNaming {
    /// File name for an export made at `now`
    pub fn file_name(self, now: SystemTime) -> String {
        match self {
            FileNaming::Fixed => FIXED_FILE_NAME.to_string(),
            FileNaming::Timestamped => {
                let millis = now
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or(0);
                format!("composition-{}.mid", millis)
            }
        }
    }
}

/// An encoded composition ready to hand to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiArtifact {
    /// Suggested file name
    pub file_name: String,
    /// Standard MIDI file bytes
    pub bytes: Vec<u8>,
}

impl MidiArtifact {
    /// Render as `data:audio/midi;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", MIDI_MIME, STANDARD.encode(&self.bytes))
    }

    /// Write into `dir` under the artifact's file name.
    ///
    /// Either the complete file exists afterwards or nothing does.
    pub fn save_in<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, ExportError> {
        let dir = dir.as_ref();
        let target = dir.join(&self.file_name);

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&self.bytes)?;
        temp.flush()?;
        temp.persist(&target).map_err(|e| ExportError::Io(e.error))?;

        info!(path = %target.display(), bytes = self.bytes.len(), "saved MIDI file");
        Ok(target)
    }
}

/// Produces artifacts from compositions
///
/// An exporter without an encoder reports every export as unavailable
/// instead of producing a file.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    encoder: Option<CompositionEncoder>,
    naming: FileNaming,
}

impl Exporter {
    /// Create an exporter
    pub fn new(encoder: Option<CompositionEncoder>, naming: FileNaming) -> Self {
        Self { encoder, naming }
    }

    /// Exporter with no encoder available
    pub fn unavailable() -> Self {
        Self {
            encoder: None,
            naming: FileNaming::default(),
        }
    }

    /// Check whether exports can be produced
    pub fn is_available(&self) -> bool {
        self.encoder.is_some()
    }

    /// Naming scheme
    pub fn naming(&self) -> FileNaming {
        self.naming
    }

    /// Encode a composition into a named artifact
    pub fn export(&self, composition: &Composition) -> Result<MidiArtifact, ExportError> {
        let Some(encoder) = self.encoder.as_ref() else {
            warn!("MIDI export requested but no encoder is available");
            return Err(ExportError::WriterUnavailable);
        };
        let bytes = encoder.encode(composition)?;
        Ok(MidiArtifact {
            file_name: self.naming.file_name(SystemTime::now()),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::Note;
    use std::time::Duration;

    fn composition() -> Composition {
        Composition::new("flute", vec![Note::single("A4", "8"), Note::rest("8")])
    }

    #[test]
    fn test_file_naming() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(
            FileNaming::Timestamped.file_name(at),
            "composition-1700000000123.mid"
        );
        assert_eq!(FileNaming::Fixed.file_name(at), "composition.mid");
    }

    #[test]
    fn test_data_uri_prefix() {
        let exporter = Exporter::new(Some(CompositionEncoder::default()), FileNaming::Fixed);
        let artifact = exporter.export(&composition()).unwrap();
        let uri = artifact.data_uri();
        assert!(uri.starts_with("data:audio/midi;base64,"));
        let decoded = STANDARD
            .decode(uri.trim_start_matches("data:audio/midi;base64,"))
            .unwrap();
        assert_eq!(decoded, artifact.bytes);
    }

    #[test]
    fn test_unavailable_exporter() {
        let exporter = Exporter::unavailable();
        assert!(!exporter.is_available());
        assert!(matches!(
            exporter.export(&composition()),
            Err(ExportError::WriterUnavailable)
        ));
    }

    #[test]
    fn test_save_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Some(CompositionEncoder::default()), FileNaming::Fixed);
        let artifact = exporter.export(&composition()).unwrap();

        let path = artifact.save_in(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("composition.mid"));
        assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);
        // Only the final file remains
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_into_missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let artifact = MidiArtifact {
            file_name: FIXED_FILE_NAME.to_string(),
            bytes: vec![1, 2, 3],
        };
        assert!(matches!(artifact.save_in(&missing), Err(ExportError::Io(_))));
        assert!(!missing.exists());
    }
}
