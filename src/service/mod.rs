// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Composition service interface.
//!
//! The service turns a prompt into either a composition or a text
//! reply. How it does so is opaque to this crate.

pub mod http;

pub use http::HttpCompositionService;

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::music::Composition;

/// Service errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Credentials were rejected or have expired
    #[error("unauthorized")]
    Unauthorized,
    /// The service reported a failure
    #[error("{0}")]
    Service(String),
    /// The service returned nothing
    #[error("the service returned an empty response")]
    EmptyResponse,
    /// The reply could not be interpreted
    #[error("malformed service response: {0}")]
    Malformed(String),
}

/// What the service is asked to do with a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    #[default]
    Compose,
    Search,
    Summarize,
}

impl PromptMode {
    /// All modes
    pub const ALL: [PromptMode; 3] = [PromptMode::Compose, PromptMode::Search, PromptMode::Summarize];

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            PromptMode::Compose => "compose",
            PromptMode::Search => "search",
            PromptMode::Summarize => "summarize",
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PromptMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown prompt mode '{}'", s.trim()))
    }
}

/// One composition request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeRequest {
    pub prompt: String,
    #[serde(default)]
    pub mode: PromptMode,
}

impl ComposeRequest {
    /// Create a request
    pub fn new(prompt: impl Into<String>, mode: PromptMode) -> Self {
        Self {
            prompt: prompt.into(),
            mode,
        }
    }
}

/// Successful service reply
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReply {
    Composition(Composition),
    Text(String),
}

impl ServiceReply {
    /// Interpret a JSON response body.
    ///
    /// Bodies with `instrument` and `notes` are compositions; bodies
    /// with a `text` field are text replies. A body carrying only a
    /// pre-rendered `midi_data` URI is rejected.
    pub fn from_body(body: &str) -> Result<Self, ServiceError> {
        if body.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        let value: Value =
            serde_json::from_str(body).map_err(|e| ServiceError::Malformed(e.to_string()))?;

        if value.get("instrument").is_some() && value.get("notes").is_some() {
            let composition: Composition = serde_json::from_value(value)
                .map_err(|e| ServiceError::Malformed(e.to_string()))?;
            return Ok(ServiceReply::Composition(composition));
        }
        match value.get("text") {
            Some(Value::String(text)) if text.trim().is_empty() => Err(ServiceError::EmptyResponse),
            Some(Value::String(text)) => Ok(ServiceReply::Text(text.clone())),
            _ if value.get("midi_data").is_some() => Err(ServiceError::Malformed(
                "pre-rendered MIDI without notes".to_string(),
            )),
            _ if value.as_object().is_some_and(|o| o.is_empty()) || value.is_null() => {
                Err(ServiceError::EmptyResponse)
            }
            _ => Err(ServiceError::Malformed(
                "expected a composition or a text reply".to_string(),
            )),
        }
    }

    /// The composition, if this is one
    pub fn composition(&self) -> Option<&Composition> {
        match self {
            ServiceReply::Composition(composition) => Some(composition),
            ServiceReply::Text(_) => None,
        }
    }
}

/// Opaque prompt-to-composition function
pub trait CompositionService: Send + Sync + 'static {
    /// Handle one request
    fn compose(
        &self,
        request: ComposeRequest,
    ) -> impl Future<Output = Result<ServiceReply, ServiceError>> + Send;
}
