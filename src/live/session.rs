// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Live voice session.
//!
//! While disconnected the session listens for a wake phrase. Hearing one
//! opens the audio contexts, takes the microphone and connects the
//! transport. Model audio is queued gaplessly; a barge-in stops all of
//! it. Composition tool calls are handed to the driver as
//! [`ToolRequest`]s and answered through [`LiveSession::complete_tool`].
//!
//! Every resource is recorded when acquired and released on every exit
//! path, including a connection attempt that fails halfway.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::playback::{PlaybackHandle, PlaybackScheduler};
use super::protocol::{
    AudioBuffer, Blob, FunctionCall, RealtimeInput, ServerContent, ServerMessage, SessionSetup,
    ToolResponse, ToolResult, COMPOSE_TOOL, INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE,
};
use super::wake::{WakeWordDetector, DEFAULT_WAKE_PHRASES};
use super::LiveError;
use crate::export::Exporter;
use crate::service::{ComposeRequest, CompositionService, PromptMode, ServiceError, ServiceReply};
use crate::session::{CaptureError, CaptureEvent, EntryBody, Role, Transcript};

/// Tool entry text on success
pub const TOOL_SUCCESS_TEXT: &str = "Your music is ready!";
/// Tool entry text on failure
pub const TOOL_FAILURE_TEXT: &str = "Sorry, I failed to create the music. Please try again.";
/// Message returned to the model on success
pub const TOOL_SUCCESS_MESSAGE: &str = "MIDI file created and download link provided.";

/// Live session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveOptions {
    /// Phrases that open a session
    pub wake_phrases: Vec<String>,
    /// Microphone sample rate
    pub input_sample_rate: u32,
    /// Model audio sample rate
    pub output_sample_rate: u32,
    /// Live model name
    pub model: String,
    /// Prebuilt voice name
    pub voice: String,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            wake_phrases: DEFAULT_WAKE_PHRASES.iter().map(|p| p.to_string()).collect(),
            input_sample_rate: INPUT_SAMPLE_RATE,
            output_sample_rate: OUTPUT_SAMPLE_RATE,
            model: "gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            voice: "Zephyr".to_string(),
        }
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveState {
    /// Waiting for a wake phrase
    #[default]
    Disconnected,
    Connecting,
    Listening,
    /// A tool call is running
    Thinking,
    Speaking,
    /// Tearing down
    Closed,
}

impl LiveState {
    /// Connected and exchanging audio
    pub fn is_active(self) -> bool {
        matches!(
            self,
            LiveState::Listening | LiveState::Thinking | LiveState::Speaking
        )
    }
}

/// Transport callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(ServerMessage),
    Error(String),
    /// Closed by the backend
    Closed,
}

/// Events fed to the live session
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Wake-phrase recognizer event
    WakeWord(CaptureEvent),
    Transport(TransportEvent),
    /// Microphone samples in [-1.0, 1.0]
    MicrophoneFrame(Vec<f32>),
    /// A scheduled buffer finished playing
    PlaybackEnded(PlaybackHandle),
    /// User ended the session
    UserClose,
}

/// Composition requested by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    /// Connection the call arrived on
    pub connection: u64,
    pub call_id: String,
    pub prompt: String,
}

/// Audio and transport facilities provided by the host
pub trait LiveHost {
    /// Start the wake-phrase recognizer
    fn start_wake_listening(&mut self) -> Result<(), LiveError>;
    fn stop_wake_listening(&mut self);
    fn open_capture_context(&mut self, sample_rate: u32) -> Result<(), LiveError>;
    fn open_playback_context(&mut self, sample_rate: u32) -> Result<(), LiveError>;
    fn acquire_microphone(&mut self) -> Result<(), LiveError>;
    /// Open the transport; `Opened` arrives later as an event
    fn connect(&mut self, setup: &SessionSetup) -> Result<(), LiveError>;
    fn send_realtime_input(&mut self, input: &RealtimeInput) -> Result<(), LiveError>;
    fn send_tool_response(&mut self, response: &ToolResponse) -> Result<(), LiveError>;
    fn close_channel(&mut self);
    fn release_microphone(&mut self);
    fn close_capture_context(&mut self);
    fn close_playback_context(&mut self);
    /// Output clock in seconds
    fn output_time(&self) -> f64;
    /// Start `buffer` at `start` on the output clock
    fn play(&mut self, handle: PlaybackHandle, buffer: &AudioBuffer, start: f64);
    /// Stop a scheduled buffer
    fn stop(&mut self, handle: PlaybackHandle);
}

#[derive(Debug, Clone, Copy, Default)]
struct Acquired {
    capture_context: bool,
    playback_context: bool,
    microphone: bool,
    channel: bool,
}

/// Live voice session state machine
#[derive(Debug)]
pub struct LiveSession {
    options: LiveOptions,
    detector: WakeWordDetector,
    state: LiveState,
    wake_enabled: bool,
    wake_listening: bool,
    acquired: Acquired,
    connection: u64,
    playback: PlaybackScheduler,
    turn_user: String,
    turn_assistant: String,
    pending_tools: BTreeSet<String>,
    flush_deferred: bool,
    tool_requests: Vec<ToolRequest>,
    transcript: Transcript,
    status: String,
}

impl LiveSession {
    /// Create a disconnected session
    pub fn new(options: LiveOptions) -> Self {
        Self {
            detector: WakeWordDetector::new(&options.wake_phrases),
            options,
            state: LiveState::Disconnected,
            wake_enabled: true,
            wake_listening: false,
            acquired: Acquired::default(),
            connection: 0,
            playback: PlaybackScheduler::new(),
            turn_user: String::new(),
            turn_assistant: String::new(),
            pending_tools: BTreeSet::new(),
            flush_deferred: false,
            tool_requests: Vec::new(),
            transcript: Transcript::default(),
            status: String::new(),
        }
    }

    /// Begin listening for the wake phrase
    pub fn start<H: LiveHost>(&mut self, host: &mut H) {
        self.resume_wake(host);
    }

    /// Apply one event
    pub fn handle<H: LiveHost>(&mut self, event: LiveEvent, host: &mut H) {
        match event {
            LiveEvent::WakeWord(event) => self.wake_event(event, host),
            LiveEvent::Transport(TransportEvent::Opened) => {
                if self.state == LiveState::Connecting {
                    info!(connection = self.connection, "live session open");
                    self.state = LiveState::Listening;
                    self.status = "I'm listening...".to_string();
                }
            }
            LiveEvent::Transport(TransportEvent::Message(message)) => {
                if self.state.is_active() {
                    self.message(message, host);
                } else {
                    debug!(state = ?self.state, "live message while inactive ignored");
                }
            }
            LiveEvent::Transport(TransportEvent::Error(err)) => {
                error!(%err, "live transport error");
                self.close(host);
                self.status = "A connection error occurred. Please try again.".to_string();
            }
            LiveEvent::Transport(TransportEvent::Closed) => {
                self.acquired.channel = false;
                self.close(host);
            }
            LiveEvent::MicrophoneFrame(samples) => self.forward_audio(&samples, host),
            LiveEvent::PlaybackEnded(handle) => {
                self.playback.finished(handle);
            }
            LiveEvent::UserClose => self.close(host),
        }
    }

    fn wake_event<H: LiveHost>(&mut self, event: CaptureEvent, host: &mut H) {
        if self.state != LiveState::Disconnected || !self.wake_listening {
            debug!(?event, "wake event outside wake listening ignored");
            return;
        }
        match event {
            CaptureEvent::Transcript(text) => {
                if self.detector.matches(&text) {
                    info!("wake phrase detected");
                    host.stop_wake_listening();
                    self.wake_listening = false;
                    self.connect(host);
                }
            }
            CaptureEvent::End | CaptureEvent::Error(CaptureError::NoSpeech) => {
                // Keep the recognizer always on
                self.wake_listening = false;
                self.resume_wake(host);
            }
            CaptureEvent::Error(CaptureError::NotAllowed) => {
                warn!("microphone permission denied, wake phrase disabled");
                self.wake_enabled = false;
                self.wake_listening = false;
                self.status =
                    "Microphone access denied. Please enable it in your settings.".to_string();
            }
            CaptureEvent::Error(err) => debug!(%err, "wake recognizer error"),
        }
    }

    fn resume_wake<H: LiveHost>(&mut self, host: &mut H) {
        if !self.wake_enabled || self.wake_listening || self.state != LiveState::Disconnected {
            return;
        }
        match host.start_wake_listening() {
            Ok(()) => {
                self.wake_listening = true;
                self.status = format!(
                    "Listening for {}...",
                    self.detector
                        .phrases()
                        .iter()
                        .map(|p| format!("\"{}\"", p))
                        .collect::<Vec<_>>()
                        .join(" or ")
                );
            }
            Err(err) => warn!(%err, "could not start wake phrase listening"),
        }
    }

    fn connect<H: LiveHost>(&mut self, host: &mut H) {
        self.state = LiveState::Connecting;
        self.connection += 1;
        self.transcript.clear();
        self.turn_user.clear();
        self.turn_assistant.clear();
        self.status = "Connecting...".to_string();
        info!(connection = self.connection, "connecting live session");

        if let Err(err) = self.acquire(host) {
            warn!(%err, "could not start live session");
            self.release(host);
            self.state = LiveState::Disconnected;
            self.resume_wake(host);
            self.status =
                "Error: Could not start the session. Check microphone permissions.".to_string();
        }
    }

    fn acquire<H: LiveHost>(&mut self, host: &mut H) -> Result<(), LiveError> {
        host.open_capture_context(self.options.input_sample_rate)?;
        self.acquired.capture_context = true;
        host.open_playback_context(self.options.output_sample_rate)?;
        self.acquired.playback_context = true;
        host.acquire_microphone()?;
        self.acquired.microphone = true;
        host.connect(&SessionSetup::new(&self.options.model, &self.options.voice))?;
        self.acquired.channel = true;
        Ok(())
    }

    fn release<H: LiveHost>(&mut self, host: &mut H) {
        let acquired = std::mem::take(&mut self.acquired);
        if acquired.channel {
            host.close_channel();
        }
        if acquired.microphone {
            host.release_microphone();
        }
        if acquired.capture_context {
            host.close_capture_context();
        }
        if acquired.playback_context {
            host.close_playback_context();
        }
    }

    /// End the session and return to wake-phrase listening
    pub fn close<H: LiveHost>(&mut self, host: &mut H) {
        if matches!(self.state, LiveState::Disconnected | LiveState::Closed) {
            return;
        }
        self.state = LiveState::Closed;
        for handle in self.playback.interrupt() {
            host.stop(handle);
        }
        self.release(host);
        self.pending_tools.clear();
        self.tool_requests.clear();
        self.flush_deferred = false;
        self.turn_user.clear();
        self.turn_assistant.clear();
        info!(connection = self.connection, "live session closed");

        self.state = LiveState::Disconnected;
        self.status = "Session ended.".to_string();
        self.resume_wake(host);
    }

    fn forward_audio<H: LiveHost>(&mut self, samples: &[f32], host: &mut H) {
        if !self.state.is_active() || !self.acquired.channel {
            return;
        }
        let input = RealtimeInput {
            media: Blob::from_samples(samples, self.options.input_sample_rate),
        };
        if let Err(err) = host.send_realtime_input(&input) {
            warn!(%err, "dropped microphone frame");
        }
    }

    fn message<H: LiveHost>(&mut self, message: ServerMessage, host: &mut H) {
        if let Some(content) = message.server_content {
            self.server_content(content, host);
        }
        if let Some(tool_call) = message.tool_call {
            for call in tool_call.function_calls {
                self.tool_call(call, host);
            }
        }
    }

    fn server_content<H: LiveHost>(&mut self, content: ServerContent, host: &mut H) {
        if let Some(t) = &content.input_transcription {
            self.turn_user.push_str(&t.text);
        }
        if let Some(t) = &content.output_transcription {
            self.turn_assistant.push_str(&t.text);
        }
        if let Some(turn) = &content.model_turn {
            self.state = LiveState::Speaking;
            self.status = "Speaking...".to_string();
            for data in turn.audio() {
                match AudioBuffer::from_base64_pcm(data, self.options.output_sample_rate) {
                    Ok(buffer) => {
                        let scheduled = self.playback.schedule(host.output_time(), buffer.duration());
                        host.play(scheduled.handle, &buffer, scheduled.start);
                    }
                    Err(err) => warn!(%err, "skipping undecodable audio"),
                }
            }
        }
        if content.interrupted {
            let stopped = self.playback.interrupt();
            debug!(count = stopped.len(), "playback interrupted");
            for handle in stopped {
                host.stop(handle);
            }
            if self.pending_tools.is_empty() {
                self.state = LiveState::Listening;
                self.status = "I'm listening...".to_string();
            } else {
                self.state = LiveState::Thinking;
                self.status = "Composing your music...".to_string();
            }
        }
        if content.turn_complete {
            if self.pending_tools.is_empty() {
                self.flush_turn();
                self.state = LiveState::Listening;
                self.status = "I'm listening...".to_string();
            } else {
                self.flush_deferred = true;
            }
        }
    }

    fn flush_turn(&mut self) {
        if self.turn_user.is_empty() && self.turn_assistant.is_empty() {
            return;
        }
        self.transcript.push(
            Role::Assistant,
            EntryBody::VoiceTurn {
                user: std::mem::take(&mut self.turn_user),
                assistant: std::mem::take(&mut self.turn_assistant),
            },
            false,
        );
    }

    fn tool_call<H: LiveHost>(&mut self, call: FunctionCall, host: &mut H) {
        if call.name != COMPOSE_TOOL {
            let err = LiveError::UnknownTool(call.name.clone());
            warn!(%err, "rejecting tool call");
            self.respond(host, &call.id, &call.name, &ToolResult::error(err.to_string()));
            return;
        }
        let Some(prompt) = call.prompt().map(str::to_string) else {
            self.respond(host, &call.id, &call.name, &ToolResult::error("missing prompt argument"));
            return;
        };

        info!(call = %call.id, "composition tool called");
        self.state = LiveState::Thinking;
        self.status = "Composing your music...".to_string();
        self.pending_tools.insert(call.id.clone());
        self.tool_requests.push(ToolRequest {
            connection: self.connection,
            call_id: call.id,
            prompt,
        });
    }

    fn respond<H: LiveHost>(&mut self, host: &mut H, call_id: &str, name: &str, result: &ToolResult) {
        if let Err(err) = host.send_tool_response(&ToolResponse::single(call_id, name, result)) {
            warn!(%err, call = call_id, "failed to send tool response");
        }
    }

    /// Drain tool calls waiting for the composition service
    pub fn take_tool_requests(&mut self) -> Vec<ToolRequest> {
        std::mem::take(&mut self.tool_requests)
    }

    /// Answer a tool call with the service's result.
    ///
    /// Results for a previous connection, or for a call that is no
    /// longer pending, are discarded.
    pub fn complete_tool<H: LiveHost>(
        &mut self,
        request: &ToolRequest,
        result: Result<ServiceReply, ServiceError>,
        exporter: &Exporter,
        host: &mut H,
    ) {
        if request.connection != self.connection
            || !self.state.is_active()
            || !self.pending_tools.remove(&request.call_id)
        {
            debug!(call = %request.call_id, "stale tool completion discarded");
            return;
        }

        let download = match result {
            Ok(ServiceReply::Composition(composition)) => exporter
                .export(&composition)
                .map(|artifact| artifact.data_uri())
                .map_err(|e| e.to_string()),
            Ok(ServiceReply::Text(_)) => Err("the service did not return a composition".to_string()),
            Err(err) => Err(err.to_string()),
        };

        let tool_result = match download {
            Ok(uri) => {
                self.transcript.push(
                    Role::Assistant,
                    EntryBody::ToolInvocation {
                        text: TOOL_SUCCESS_TEXT.to_string(),
                        download: Some(uri),
                    },
                    false,
                );
                ToolResult::success(TOOL_SUCCESS_MESSAGE)
            }
            Err(message) => {
                warn!(call = %request.call_id, %message, "composition tool failed");
                self.transcript.push(
                    Role::Assistant,
                    EntryBody::ToolInvocation {
                        text: TOOL_FAILURE_TEXT.to_string(),
                        download: None,
                    },
                    true,
                );
                ToolResult::error(message)
            }
        };
        self.respond(host, &request.call_id, COMPOSE_TOOL, &tool_result);

        if self.pending_tools.is_empty() {
            if self.flush_deferred {
                self.flush_deferred = false;
                self.flush_turn();
            }
            if self.state == LiveState::Thinking {
                self.state = LiveState::Listening;
                self.status = "I'm listening...".to_string();
            }
        }
    }

    /// Send every queued tool call to the composition service and answer it.
    ///
    /// Returns the number of calls that were served.
    pub async fn serve_tool_requests<S, H>(
        &mut self,
        service: &S,
        exporter: &Exporter,
        host: &mut H,
    ) -> usize
    where
        S: CompositionService,
        H: LiveHost,
    {
        let requests = self.take_tool_requests();
        for request in &requests {
            let result = service
                .compose(ComposeRequest::new(request.prompt.clone(), PromptMode::Compose))
                .await;
            self.complete_tool(request, result, exporter, host);
        }
        requests.len()
    }

    /// Session settings
    pub fn options(&self) -> &LiveOptions {
        &self.options
    }

    /// Current state
    pub fn state(&self) -> LiveState {
        self.state
    }

    /// Status line for the host to display
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Voice turns and tool results
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Playback queue
    pub fn playback(&self) -> &PlaybackScheduler {
        &self.playback
    }

    /// Current connection number
    pub fn connection(&self) -> u64 {
        self.connection
    }

    /// Check whether wake listening can still run
    pub fn wake_enabled(&self) -> bool {
        self.wake_enabled
    }

    /// Check whether the wake recognizer is running
    pub fn is_wake_listening(&self) -> bool {
        self.wake_listening
    }

    /// Number of tool calls awaiting completion
    pub fn pending_tool_count(&self) -> usize {
        self.pending_tools.len()
    }
}

impl Default for LiveSession {
    fn default() -> Self {
        Self::new(LiveOptions::default())
    }
}
