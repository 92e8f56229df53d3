// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Conversation controller.
//!
//! Owns one chat session: the transcript, the pending input, the turn
//! state and the capture sub-controller. Host events go in through
//! [`ConversationController::handle_event`]; everything the host must
//! do in response comes back as [`Effect`]s drained with
//! [`ConversationController::take_effects`].
//!
//! At most one composition request is in flight. Each request carries a
//! [`RequestId`] and only the settlement for the in-flight id is
//! applied; anything else is a stale response from before a reset.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::capture::{CaptureController, CaptureEvent, CaptureState, RecognizerCommand};
use super::identity::{AuthStrategy, Capabilities, UserProfile};
use super::transcript::{EntryBody, EntryId, Role, Transcript, DEFAULT_MAX_ENTRIES};
use crate::export::{ExportError, Exporter, MidiArtifact};
use crate::service::{ComposeRequest, PromptMode, ServiceError, ServiceReply};

/// Assistant entry when credentials expire mid-request
pub const SESSION_EXPIRED_ENTRY: &str =
    "Your session has expired. Please sign in again to continue creating.";
/// Banner when credentials expire mid-request
pub const SESSION_EXPIRED_BANNER: &str = "Your session has expired. Please sign in again.";
/// Assistant entry for any other failure
pub const COMPOSE_FAILED_ENTRY: &str =
    "Sorry, I had trouble generating the music. Please try a different prompt.";
/// Banner when no encoder is available
pub const WRITER_UNAVAILABLE_BANNER: &str = "MIDI library not available. Please refresh the page.";
/// Banner when a composition cannot be encoded
pub const EXPORT_FAILED_BANNER: &str = "Could not generate MIDI file. The data may be invalid.";

/// Composition request identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Turn state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    /// Waiting on the composition service
    Submitting { id: RequestId },
}

/// How the last turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Success,
    Failed,
}

/// Screen the host should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Nobody signed in
    SignIn,
    Chat,
    /// Shown after an expired session was logged out
    LoggedOut,
}

/// Events fed to the controller by the host and the driver
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Pending input edited
    InputChanged(String),
    Submit,
    /// Mic button pressed
    ToggleCapture,
    /// Recognizer event
    Capture(CaptureEvent),
    /// Composition request finished
    ComposeSettled {
        id: RequestId,
        result: Result<ServiceReply, ServiceError>,
    },
    /// Forced-logout delay elapsed
    LogoutTimerElapsed { generation: u64 },
    SignedIn(UserProfile),
    SignedOut,
    SetMode(PromptMode),
}

/// Work the host (or driver) must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a request to the composition service
    Dispatch { id: RequestId, request: ComposeRequest },
    /// Keep the newest entry visible
    ScrollToBottom,
    StartRecognizer,
    StopRecognizer,
    /// Deliver `LogoutTimerElapsed { generation }` after the delay
    ScheduleLogout { generation: u64, after: Duration },
    /// Switch to the logged-out view
    ShowLoggedOut,
    /// Tell the identity provider to sign out
    SignOut,
}

/// Session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub strategy: AuthStrategy,
    pub capabilities: Capabilities,
    /// Transcript retention limit
    pub max_entries: usize,
    /// Submit as soon as a transcript arrives
    pub hands_free: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            strategy: AuthStrategy::default(),
            capabilities: Capabilities::default(),
            max_entries: DEFAULT_MAX_ENTRIES,
            hands_free: false,
        }
    }
}

/// One chat session
#[derive(Debug)]
pub struct ConversationController {
    options: SessionOptions,
    user: Option<UserProfile>,
    transcript: Transcript,
    input: String,
    mode: PromptMode,
    turn: TurnState,
    last_outcome: Option<TurnOutcome>,
    banner: Option<String>,
    capture: CaptureController,
    next_request: u64,
    generation: u64,
    logged_out: bool,
    effects: Vec<Effect>,
}

impl ConversationController {
    /// Create a session with nobody signed in
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            user: None,
            transcript: Transcript::new(options.max_entries),
            input: String::new(),
            mode: PromptMode::Compose,
            turn: TurnState::Idle,
            last_outcome: None,
            banner: None,
            capture: CaptureController::new(options.capabilities.voice_input),
            next_request: 1,
            generation: 0,
            logged_out: false,
            effects: Vec::new(),
        }
    }

    /// Apply one host event
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::InputChanged(text) => self.set_input(text),
            SessionEvent::Submit => self.submit(),
            SessionEvent::ToggleCapture => self.toggle_capture(),
            SessionEvent::Capture(event) => self.capture_event(event),
            SessionEvent::ComposeSettled { id, result } => self.settle(id, result),
            SessionEvent::LogoutTimerElapsed { generation } => self.logout_elapsed(generation),
            SessionEvent::SignedIn(profile) => self.sign_in(profile),
            SessionEvent::SignedOut => self.sign_out(),
            SessionEvent::SetMode(mode) => self.set_mode(mode),
        }
    }

    /// Drain pending effects
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Replace the pending input
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Send the pending input as a prompt.
    ///
    /// Does nothing for a blank prompt, while a request is in flight,
    /// or when nobody is signed in.
    pub fn submit(&mut self) {
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() {
            debug!("submit ignored: empty prompt");
            return;
        }
        if self.input_locked() {
            debug!("submit ignored: request in flight");
            return;
        }
        if self.user.is_none() {
            debug!("submit ignored: not signed in");
            return;
        }

        self.banner = None;
        self.transcript
            .push(Role::User, EntryBody::Text(prompt.clone()), false);
        self.input.clear();
        self.transcript.show_loading();

        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.turn = TurnState::Submitting { id };
        info!(%id, mode = %self.mode, "composition requested");

        self.effects.push(Effect::Dispatch {
            id,
            request: ComposeRequest::new(prompt, self.mode),
        });
        self.effects.push(Effect::ScrollToBottom);
    }

    /// Apply a finished composition request
    pub fn settle(&mut self, id: RequestId, result: Result<ServiceReply, ServiceError>) {
        if self.turn != (TurnState::Submitting { id }) {
            debug!(%id, "stale composition response discarded");
            return;
        }
        self.transcript.clear_loading();
        self.turn = TurnState::Idle;

        match result {
            Ok(ServiceReply::Composition(composition)) => {
                info!(%id, instrument = %composition.instrument, "composition received");
                let text = format!(
                    "Here is a composition based on your request. I've used the {}. You can download the MIDI file below.",
                    composition.instrument_display()
                );
                self.transcript.push(
                    Role::Assistant,
                    EntryBody::TextWithComposition { text, composition },
                    false,
                );
                self.last_outcome = Some(TurnOutcome::Success);
            }
            Ok(ServiceReply::Text(text)) => {
                info!(%id, "text reply received");
                self.transcript
                    .push(Role::Assistant, EntryBody::Text(text), false);
                self.last_outcome = Some(TurnOutcome::Success);
            }
            Err(ServiceError::Unauthorized) if self.options.strategy.forced_logout_delay().is_some() => {
                self.expire_session();
                self.last_outcome = Some(TurnOutcome::Failed);
            }
            Err(err) => {
                warn!(%id, %err, "composition failed");
                self.transcript.push(
                    Role::Assistant,
                    EntryBody::Text(COMPOSE_FAILED_ENTRY.to_string()),
                    true,
                );
                self.banner = Some(format!("Sorry, I couldn't generate the music. {}", err));
                self.last_outcome = Some(TurnOutcome::Failed);
            }
        }
        self.effects.push(Effect::ScrollToBottom);
    }

    fn expire_session(&mut self) {
        let after = self
            .options
            .strategy
            .forced_logout_delay()
            .unwrap_or_default();
        warn!(?after, "session expired, logging out");
        self.user = None;
        self.transcript.push(
            Role::Assistant,
            EntryBody::Text(SESSION_EXPIRED_ENTRY.to_string()),
            true,
        );
        self.banner = Some(SESSION_EXPIRED_BANNER.to_string());
        self.effects.push(Effect::ScheduleLogout {
            generation: self.generation,
            after,
        });
    }

    /// Complete a forced logout if nothing reset the session meanwhile
    pub fn logout_elapsed(&mut self, generation: u64) {
        if generation != self.generation || self.user.is_some() {
            debug!(generation, current = self.generation, "stale logout timer ignored");
            return;
        }
        self.reset();
        self.logged_out = true;
        info!("logged out after expired session");
        self.effects.push(Effect::ShowLoggedOut);
    }

    /// Start a session for a user
    pub fn sign_in(&mut self, profile: UserProfile) {
        info!(user = %profile.id, "user signed in");
        self.generation += 1;
        self.user = Some(profile);
        self.logged_out = false;
    }

    /// End the session and discard its state
    pub fn sign_out(&mut self) {
        info!("user signed out");
        self.reset();
        self.logged_out = false;
        self.effects.push(Effect::SignOut);
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.user = None;
        self.transcript.clear();
        self.input.clear();
        self.mode = PromptMode::Compose;
        self.turn = TurnState::Idle;
        self.last_outcome = None;
        self.banner = None;
        if self.capture.is_listening() {
            self.effects.push(Effect::StopRecognizer);
        }
        self.capture.reset();
    }

    /// Select a prompt mode (only when search modes are offered)
    pub fn set_mode(&mut self, mode: PromptMode) {
        if mode != PromptMode::Compose && !self.options.capabilities.search_mode {
            debug!(%mode, "prompt mode unavailable");
            return;
        }
        self.mode = mode;
    }

    /// Mic button
    pub fn toggle_capture(&mut self) {
        let busy = self.input_locked();
        match self.capture.toggle(busy) {
            Some(RecognizerCommand::Start) => self.effects.push(Effect::StartRecognizer),
            Some(RecognizerCommand::Stop) => self.effects.push(Effect::StopRecognizer),
            None => {}
        }
    }

    /// Apply a recognizer event
    pub fn capture_event(&mut self, event: CaptureEvent) {
        if let Some(text) = self.capture.handle(event) {
            self.input = text;
            if self.options.hands_free {
                self.submit();
            }
        }
    }

    /// Export the composition attached to an entry.
    ///
    /// Failures become a banner; nothing is returned for them.
    pub fn download(&mut self, entry: EntryId, exporter: &Exporter) -> Option<MidiArtifact> {
        let result = match self.transcript.get(entry).and_then(|e| e.body.composition()) {
            Some(composition) => exporter.export(composition),
            None => {
                debug!(%entry, "no composition attached to entry");
                return None;
            }
        };
        match result {
            Ok(artifact) => {
                info!(%entry, file = %artifact.file_name, "composition exported");
                Some(artifact)
            }
            Err(err) => {
                warn!(%entry, %err, "export failed");
                self.banner = Some(
                    match err {
                        ExportError::WriterUnavailable => WRITER_UNAVAILABLE_BANNER,
                        _ => EXPORT_FAILED_BANNER,
                    }
                    .to_string(),
                );
                None
            }
        }
    }

    /// Hide the banner
    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Signed-in user
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Transcript
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Pending input
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Selected prompt mode
    pub fn mode(&self) -> PromptMode {
        self.mode
    }

    /// Current turn state
    pub fn turn_state(&self) -> TurnState {
        self.turn
    }

    /// Outcome of the last settled turn
    pub fn last_outcome(&self) -> Option<TurnOutcome> {
        self.last_outcome
    }

    /// Error banner
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Check whether input and submit are disabled
    pub fn input_locked(&self) -> bool {
        matches!(self.turn, TurnState::Submitting { .. })
    }

    /// Capture state
    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Check whether the mic button should be offered
    pub fn capture_enabled(&self) -> bool {
        self.capture.is_enabled()
    }

    /// Session generation; bumped on every reset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Session settings
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Screen to show
    pub fn view(&self) -> View {
        if self.logged_out {
            View::LoggedOut
        } else if self.user.is_some() {
            View::Chat
        } else {
            View::SignIn
        }
    }
}

impl Default for ConversationController {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{CompositionEncoder, FileNaming};
    use crate::music::{Composition, Note};
    use crate::session::transcript::TranscriptRow;

    fn signed_in(options: SessionOptions) -> ConversationController {
        let mut controller = ConversationController::new(options);
        controller.sign_in(UserProfile::new("u1", "Ada", "ada@example.com"));
        controller
    }

    fn dispatched(effects: &[Effect]) -> Vec<RequestId> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Dispatch { id, .. } => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn music_box() -> Composition {
        Composition::new(
            "music_box",
            vec![Note::single("C5", "8"), Note::single("E5", "8")],
        )
    }

    #[test]
    fn test_submit_dispatches_once() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("  a lullaby  ");
        controller.submit();
        controller.set_input("another");
        controller.submit();

        let effects = controller.take_effects();
        assert_eq!(dispatched(&effects).len(), 1);
        assert!(effects.contains(&Effect::ScrollToBottom));
        assert!(controller.input_locked());
        assert_eq!(controller.transcript().len(), 1);
        assert_eq!(
            controller.transcript().last().map(|e| e.body.text()),
            Some("a lullaby")
        );
    }

    #[test]
    fn test_blank_prompt_is_ignored() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("   ");
        controller.submit();
        assert!(controller.take_effects().is_empty());
        assert!(controller.transcript().is_empty());
        assert_eq!(controller.turn_state(), TurnState::Idle);
    }

    #[test]
    fn test_submit_requires_user() {
        let mut controller = ConversationController::default();
        controller.set_input("hello");
        controller.submit();
        assert!(controller.take_effects().is_empty());
        assert_eq!(controller.view(), View::SignIn);
    }

    #[test]
    fn test_placeholder_while_submitting() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("waltz");
        controller.submit();
        let rows = controller.transcript().rows();
        assert_eq!(rows.last(), Some(&TranscriptRow::Loading));
        assert_eq!(controller.input(), "");
    }

    #[test]
    fn test_composition_reply() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("a music box tune");
        controller.submit();
        let id = dispatched(&controller.take_effects())[0];

        controller.settle(id, Ok(ServiceReply::Composition(music_box())));
        assert!(!controller.transcript().is_loading());
        assert_eq!(controller.last_outcome(), Some(TurnOutcome::Success));
        let entry = controller.transcript().last().unwrap();
        assert_eq!(entry.role, Role::Assistant);
        assert!(entry.body.text().contains("I've used the music box."));
        assert_eq!(entry.body.composition(), Some(&music_box()));
        assert_eq!(controller.take_effects(), vec![Effect::ScrollToBottom]);
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("first");
        controller.submit();
        let id = dispatched(&controller.take_effects())[0];

        controller.sign_out();
        controller.sign_in(UserProfile::new("u1", "Ada", ""));
        controller.settle(id, Ok(ServiceReply::Text("late".to_string())));
        assert!(controller.transcript().is_empty());
        assert_eq!(controller.last_outcome(), None);
    }

    #[test]
    fn test_other_error_banner() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("x");
        controller.submit();
        let id = dispatched(&controller.take_effects())[0];

        controller.settle(id, Err(ServiceError::Service("model overloaded".to_string())));
        let entry = controller.transcript().last().unwrap();
        assert!(entry.is_error);
        assert_eq!(entry.body.text(), COMPOSE_FAILED_ENTRY);
        assert_eq!(
            controller.banner(),
            Some("Sorry, I couldn't generate the music. model overloaded")
        );
        assert_eq!(controller.last_outcome(), Some(TurnOutcome::Failed));
        assert!(controller.user().is_some());
    }

    #[test]
    fn test_unauthorized_forces_logout() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("x");
        controller.submit();
        let id = dispatched(&controller.take_effects())[0];

        controller.settle(id, Err(ServiceError::Unauthorized));
        assert!(controller.user().is_none());
        assert_eq!(controller.banner(), Some(SESSION_EXPIRED_BANNER));
        let generation = controller.generation();
        assert!(controller.take_effects().contains(&Effect::ScheduleLogout {
            generation,
            after: Duration::from_millis(3000)
        }));

        controller.logout_elapsed(generation);
        assert_eq!(controller.view(), View::LoggedOut);
        assert!(controller.transcript().is_empty());
        assert_eq!(controller.take_effects(), vec![Effect::ShowLoggedOut]);
    }

    #[test]
    fn test_unauthorized_with_client_token_is_plain_error() {
        let mut controller = signed_in(SessionOptions {
            strategy: AuthStrategy::ClientToken,
            ..Default::default()
        });
        controller.set_input("x");
        controller.submit();
        let id = dispatched(&controller.take_effects())[0];
        controller.settle(id, Err(ServiceError::Unauthorized));
        assert!(controller.user().is_some());
        assert!(controller
            .take_effects()
            .iter()
            .all(|e| !matches!(e, Effect::ScheduleLogout { .. })));
    }

    #[test]
    fn test_logout_timer_after_sign_in_is_stale() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("x");
        controller.submit();
        let id = dispatched(&controller.take_effects())[0];
        controller.settle(id, Err(ServiceError::Unauthorized));
        let generation = controller.generation();

        controller.sign_in(UserProfile::new("u1", "Ada", ""));
        controller.logout_elapsed(generation);
        assert_eq!(controller.view(), View::Chat);
    }

    #[test]
    fn test_sign_out_resets() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("x");
        controller.submit();
        controller.take_effects();
        controller.sign_out();
        assert!(controller.transcript().is_empty());
        assert!(!controller.input_locked());
        assert_eq!(controller.take_effects(), vec![Effect::SignOut]);
        assert_eq!(controller.view(), View::SignIn);
    }

    #[test]
    fn test_mode_requires_capability() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_mode(PromptMode::Search);
        assert_eq!(controller.mode(), PromptMode::Compose);

        let mut controller = signed_in(SessionOptions {
            capabilities: Capabilities {
                search_mode: true,
                ..Default::default()
            },
            ..Default::default()
        });
        controller.handle_event(SessionEvent::SetMode(PromptMode::Summarize));
        controller.set_input("news about synths");
        controller.submit();
        let effects = controller.take_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Dispatch { request, .. } if request.mode == PromptMode::Summarize
        )));
    }

    #[test]
    fn test_capture_flow() {
        let mut controller = signed_in(SessionOptions::default());
        controller.handle_event(SessionEvent::ToggleCapture);
        assert_eq!(controller.take_effects(), vec![Effect::StartRecognizer]);
        assert_eq!(controller.capture_state(), CaptureState::Listening);

        controller.handle_event(SessionEvent::Capture(CaptureEvent::Transcript(
            "a jazzy piano".to_string(),
        )));
        assert_eq!(controller.input(), "a jazzy piano");
        assert!(controller.take_effects().is_empty());
    }

    #[test]
    fn test_hands_free_submits() {
        let mut controller = signed_in(SessionOptions {
            hands_free: true,
            ..Default::default()
        });
        controller.toggle_capture();
        controller.capture_event(CaptureEvent::Transcript("a harp".to_string()));
        assert_eq!(dispatched(&controller.take_effects()).len(), 1);
    }

    #[test]
    fn test_capture_blocked_while_submitting() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("x");
        controller.submit();
        controller.take_effects();
        controller.toggle_capture();
        assert!(controller.take_effects().is_empty());
    }

    #[test]
    fn test_download() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("x");
        controller.submit();
        let id = dispatched(&controller.take_effects())[0];
        controller.settle(id, Ok(ServiceReply::Composition(music_box())));
        let entry = controller.transcript().last().unwrap().id;

        let exporter = Exporter::new(Some(CompositionEncoder::default()), FileNaming::Fixed);
        let artifact = controller.download(entry, &exporter).unwrap();
        assert_eq!(artifact.file_name, "composition.mid");
        assert!(controller.banner().is_none());

        assert!(controller.download(entry, &Exporter::unavailable()).is_none());
        assert_eq!(controller.banner(), Some(WRITER_UNAVAILABLE_BANNER));
    }

    #[test]
    fn test_download_invalid_data() {
        let mut controller = signed_in(SessionOptions::default());
        controller.set_input("x");
        controller.submit();
        let id = dispatched(&controller.take_effects())[0];
        let broken = Composition::new("flute", vec![Note::single("H9", "4")]);
        controller.settle(id, Ok(ServiceReply::Composition(broken)));
        let entry = controller.transcript().last().unwrap().id;

        let exporter = Exporter::new(Some(CompositionEncoder::default()), FileNaming::Fixed);
        assert!(controller.download(entry, &exporter).is_none());
        assert_eq!(controller.banner(), Some(EXPORT_FAILED_BANNER));
    }
}
