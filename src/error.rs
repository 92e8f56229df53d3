// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error classification.
//!
//! Each module owns a `thiserror` enum. [`Classify`] maps any of them
//! onto the shared [`ErrorKind`] taxonomy and renders a message fit to
//! show a user: a fixed summary for the kind, with the raw error text
//! appended.

use std::fmt;

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::live::LiveError;
use crate::music::CompositionError;
use crate::service::ServiceError;
use crate::session::AuthError;

/// Broad error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input rejected before any work was done
    Validation,
    /// Missing or expired credentials
    Auth,
    /// The composition service failed
    Service,
    /// A needed resource (encoder, microphone, file system) is missing
    ResourceUnavailable,
    /// Data arrived but could not be understood
    MalformedData,
}

impl ErrorKind {
    /// Fixed summary shown for this kind
    pub fn summary(self) -> &'static str {
        match self {
            ErrorKind::Validation => "The request was not valid.",
            ErrorKind::Auth => "Your session has expired. Please sign in again.",
            ErrorKind::Service => "The composition service could not complete the request.",
            ErrorKind::ResourceUnavailable => "A required resource is not available.",
            ErrorKind::MalformedData => "The returned data could not be understood.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::Service => "service",
            ErrorKind::ResourceUnavailable => "resource unavailable",
            ErrorKind::MalformedData => "malformed data",
        };
        f.write_str(name)
    }
}

/// Errors that belong to the taxonomy
pub trait Classify: fmt::Display {
    /// Category of this error
    fn kind(&self) -> ErrorKind;

    /// Summary for the kind followed by the raw text
    fn user_message(&self) -> String {
        let raw = self.to_string();
        if raw.is_empty() {
            self.kind().summary().to_string()
        } else {
            format!("{} ({})", self.kind().summary(), raw)
        }
    }
}

impl Classify for CompositionError {
    fn kind(&self) -> ErrorKind {
        match self {
            CompositionError::UnknownInstrument(_) => ErrorKind::Validation,
            _ => ErrorKind::MalformedData,
        }
    }
}

impl Classify for ExportError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExportError::WriterUnavailable | ExportError::Io(_) => ErrorKind::ResourceUnavailable,
            ExportError::Malformed(inner) => inner.kind(),
        }
    }
}

impl Classify for ServiceError {
    fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Unauthorized => ErrorKind::Auth,
            ServiceError::Service(_) | ServiceError::EmptyResponse => ErrorKind::Service,
            ServiceError::Malformed(_) => ErrorKind::MalformedData,
        }
    }
}

impl Classify for AuthError {
    fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidToken(_) => ErrorKind::MalformedData,
            _ => ErrorKind::Auth,
        }
    }
}

impl Classify for LiveError {
    fn kind(&self) -> ErrorKind {
        match self {
            LiveError::Microphone(_) | LiveError::AudioContext(_) => ErrorKind::ResourceUnavailable,
            LiveError::Transport(_) => ErrorKind::Service,
            LiveError::Protocol(_) | LiveError::InvalidAudio(_) => ErrorKind::MalformedData,
            LiveError::UnknownTool(_) => ErrorKind::Validation,
        }
    }
}

impl Classify for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ServiceError::Unauthorized.kind(), ErrorKind::Auth);
        assert_eq!(ServiceError::EmptyResponse.kind(), ErrorKind::Service);
        assert_eq!(ExportError::WriterUnavailable.kind(), ErrorKind::ResourceUnavailable);
        assert_eq!(
            ExportError::Malformed(CompositionError::EmptyChord).kind(),
            ErrorKind::MalformedData
        );
        assert_eq!(
            CompositionError::UnknownInstrument("kazoo".into()).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_user_message_keeps_summary() {
        let err = ServiceError::Service("quota exceeded".to_string());
        let message = err.user_message();
        assert!(message.starts_with(ErrorKind::Service.summary()));
        assert!(message.contains("quota exceeded"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::ResourceUnavailable.to_string(), "resource unavailable");
    }
}
