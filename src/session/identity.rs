// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Signed-in users and how a session learns about them.
//!
//! Identity itself lives outside this crate. The session only needs the
//! profile of whoever is signed in, the strategy that decides what an
//! expired credential means, and the capabilities the host offers.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Delay between a rejected credential and the logged-out view
pub const DEFAULT_LOGOUT_DELAY: Duration = Duration::from_millis(3000);

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Operation requires a signed-in user
    #[error("not signed in")]
    NotSignedIn,
    /// Credential could not be decoded
    #[error("invalid identity token: {0}")]
    InvalidToken(String),
    /// Provider refused the credential
    #[error("sign-in rejected: {0}")]
    Rejected(String),
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable subject identifier
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Avatar URL
    #[serde(default)]
    pub picture: Option<String>,
}

/// Claims read from an OpenID id-token payload
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    picture: Option<String>,
}

impl UserProfile {
    /// Create a profile
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            picture: None,
        }
    }

    /// Decode the payload segment of a JWT id-token.
    ///
    /// The signature is not checked; the token is assumed to come
    /// straight from the identity provider.
    pub fn from_id_token(token: &str) -> Result<Self, AuthError> {
        let mut segments = token.trim().split('.');
        let payload = match (segments.next(), segments.next()) {
            (Some(_), Some(payload)) if !payload.is_empty() => payload,
            _ => return Err(AuthError::InvalidToken("expected three segments".to_string())),
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims: IdTokenClaims =
            serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(Self {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
            picture: claims.picture,
        })
    }

    /// Name to greet the user with
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// How the session is authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Browser-held id-token; the service never expires a session
    ClientToken,
    /// Server-side session that can expire mid-conversation
    ServerSession {
        /// Time between the expiry notice and the logged-out view
        logout_delay: Duration,
    },
    /// The hosting runtime supplies identity and credentials
    HostedRuntime,
}

impl AuthStrategy {
    /// Logout delay when expired credentials force a logout
    pub fn forced_logout_delay(&self) -> Option<Duration> {
        match self {
            AuthStrategy::ServerSession { logout_delay } => Some(*logout_delay),
            _ => None,
        }
    }
}

impl Default for AuthStrategy {
    fn default() -> Self {
        AuthStrategy::ServerSession {
            logout_delay: DEFAULT_LOGOUT_DELAY,
        }
    }
}

/// Optional features offered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Speech-to-text prompt capture
    pub voice_input: bool,
    /// Live voice session
    pub live_session: bool,
    /// Search and summarize prompt modes
    pub search_mode: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            voice_input: true,
            live_session: false,
            search_mode: false,
        }
    }
}

/// Source of the signed-in user
pub trait IdentityProvider {
    /// Currently signed-in user
    fn current_user(&self) -> Option<&UserProfile>;

    /// Sign in with a provider-specific credential
    fn sign_in(&mut self, credential: &str) -> Result<UserProfile, AuthError>;

    /// Forget the current user
    fn sign_out(&mut self);
}

/// Identity from client-held id-tokens
#[derive(Debug, Default)]
pub struct TokenIdentity {
    user: Option<UserProfile>,
}

impl TokenIdentity {
    /// Create with nobody signed in
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityProvider for TokenIdentity {
    fn current_user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    fn sign_in(&mut self, credential: &str) -> Result<UserProfile, AuthError> {
        let profile = UserProfile::from_id_token(credential)?;
        info!(user = %profile.id, "signed in with id-token");
        self.user = Some(profile.clone());
        Ok(profile)
    }

    fn sign_out(&mut self) {
        self.user = None;
    }
}

/// Identity supplied up front by the host or a server session
#[derive(Debug)]
pub struct ProfileIdentity {
    profile: UserProfile,
    signed_in: bool,
}

impl ProfileIdentity {
    /// Create for a known profile, initially signed out
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            signed_in: false,
        }
    }
}

impl IdentityProvider for ProfileIdentity {
    fn current_user(&self) -> Option<&UserProfile> {
        self.signed_in.then_some(&self.profile)
    }

    fn sign_in(&mut self, _credential: &str) -> Result<UserProfile, AuthError> {
        self.signed_in = true;
        info!(user = %self.profile.id, "signed in");
        Ok(self.profile.clone())
    }

    fn sign_out(&mut self) {
        self.signed_in = false;
    }
}
