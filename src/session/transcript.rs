// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Conversation transcript.
//!
//! Entries are append-only and carry ids that increase for the life of
//! the transcript. The loading placeholder is not an entry: it sits
//! beside them and is shown after the last one while a request is in
//! flight.

use std::collections::VecDeque;
use std::fmt;

use crate::music::Composition;

/// Default retention limit
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// Transcript entry identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    /// Raw value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who wrote an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Entry contents
#[derive(Debug, Clone, PartialEq)]
pub enum EntryBody {
    /// Plain text
    Text(String),
    /// Text with a downloadable composition
    TextWithComposition {
        text: String,
        composition: Composition,
    },
    /// Result of a tool invoked during a live session
    ToolInvocation {
        text: String,
        /// `data:` URI of the produced file, if any
        download: Option<String>,
    },
    /// One spoken exchange from a live session
    VoiceTurn { user: String, assistant: String },
}

impl EntryBody {
    /// Primary text of the entry
    pub fn text(&self) -> &str {
        match self {
            EntryBody::Text(text)
            | EntryBody::TextWithComposition { text, .. }
            | EntryBody::ToolInvocation { text, .. } => text,
            EntryBody::VoiceTurn { assistant, .. } => assistant,
        }
    }

    /// Attached composition
    pub fn composition(&self) -> Option<&Composition> {
        match self {
            EntryBody::TextWithComposition { composition, .. } => Some(composition),
            _ => None,
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub id: EntryId,
    pub role: Role,
    pub body: EntryBody,
    /// Rendered as an error
    pub is_error: bool,
}

/// A row as displayed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TranscriptRow<'a> {
    Entry(&'a TranscriptEntry),
    /// Loading placeholder
    Loading,
}

/// Ordered conversation history
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: VecDeque<TranscriptEntry>,
    next_id: u64,
    loading: bool,
    max_entries: usize,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 1,
            loading: false,
            max_entries: max_entries.max(1),
        }
    }

    /// Append an entry, dropping the oldest past the retention limit
    pub fn push(&mut self, role: Role, body: EntryBody, is_error: bool) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push_back(TranscriptEntry {
            id,
            role,
            body,
            is_error,
        });
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        id
    }

    /// Get an entry
    pub fn get(&self, id: EntryId) -> Option<&TranscriptEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries oldest first
    pub fn entries(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.entries.iter()
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.back()
    }

    /// Entries plus the placeholder, in display order
    pub fn rows(&self) -> Vec<TranscriptRow<'_>> {
        let mut rows: Vec<TranscriptRow<'_>> = self.entries.iter().map(TranscriptRow::Entry).collect();
        if self.loading {
            rows.push(TranscriptRow::Loading);
        }
        rows
    }

    /// Show the placeholder (at most one)
    pub fn show_loading(&mut self) {
        self.loading = true;
    }

    /// Remove the placeholder
    pub fn clear_loading(&mut self) {
        self.loading = false;
    }

    /// Check whether the placeholder is shown
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything; ids keep increasing
    pub fn clear(&mut self) {
        self.entries.clear();
        self.loading = false;
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
