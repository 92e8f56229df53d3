// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Live session wire types and audio conversion.
//!
//! Messages use camelCase JSON field names. Microphone audio goes out as
//! base64 16-bit little-endian PCM; model audio comes back the same way
//! at the output sample rate.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::LiveError;

/// Name of the composition tool offered to the model
pub const COMPOSE_TOOL: &str = "create_music_composition";

/// Microphone sample rate
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Model audio sample rate
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Message received from the live backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_content: Option<ServerContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl ServerMessage {
    /// Parse a JSON frame
    pub fn from_json(json: &str) -> Result<Self, LiveError> {
        serde_json::from_str(json).map_err(|e| LiveError::Protocol(e.to_string()))
    }
}

/// Model output for the current turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_transcription: Option<Transcription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_transcription: Option<Transcription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub turn_complete: bool,
    /// The user barged in
    #[serde(default)]
    pub interrupted: bool,
}

/// Incremental speech transcription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl ModelTurn {
    /// Base64 audio payloads in order
    pub fn audio(&self) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Base64 payload with its MIME type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub data: String,
    #[serde(default)]
    pub mime_type: String,
}

impl Blob {
    /// Microphone frame as `audio/pcm;rate=<rate>`
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        Self {
            data: STANDARD.encode(encode_pcm16(samples)),
            mime_type: format!("audio/pcm;rate={}", sample_rate),
        }
    }
}

/// Realtime input frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeInput {
    pub media: Blob,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

/// One tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    /// `prompt` argument of the composition tool
    pub fn prompt(&self) -> Option<&str> {
        self.args.get("prompt").and_then(Value::as_str)
    }
}

/// Result reported back to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: message.into(),
        }
    }
}

/// Function responses sent over the live channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    /// `{"result": "<ToolResult as JSON>"}`
    pub response: Value,
}

impl ToolResponse {
    /// Response for one call
    pub fn single(call_id: &str, name: &str, result: &ToolResult) -> Self {
        let encoded = serde_json::to_string(result).unwrap_or_default();
        Self {
            function_responses: vec![FunctionResponse {
                id: call_id.to_string(),
                name: name.to_string(),
                response: json!({ "result": encoded }),
            }],
        }
    }
}

/// Connection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSetup {
    pub model: String,
    pub config: LiveConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: Value,
    pub input_audio_transcription: Value,
    pub output_audio_transcription: Value,
    pub tools: Vec<Value>,
}

impl SessionSetup {
    /// Audio session with transcriptions and the composition tool
    pub fn new(model: &str, voice: &str) -> Self {
        Self {
            model: model.to_string(),
            config: LiveConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: json!({
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
                }),
                input_audio_transcription: json!({}),
                output_audio_transcription: json!({}),
                tools: vec![json!({ "functionDeclarations": [compose_tool_declaration()] })],
            },
        }
    }

    /// Names of declared tools
    pub fn tool_names(&self) -> Vec<&str> {
        self.config
            .tools
            .iter()
            .filter_map(|t| t.get("functionDeclarations").and_then(Value::as_array))
            .flatten()
            .filter_map(|d| d.get("name").and_then(Value::as_str))
            .collect()
    }
}

fn compose_tool_declaration() -> Value {
    json!({
        "name": COMPOSE_TOOL,
        "parameters": {
            "type": "OBJECT",
            "description": "Generates a MIDI music composition based on a textual description.",
            "properties": {
                "prompt": {
                    "type": "STRING",
                    "description": "A detailed description of the music to be created, including mood, instruments, tempo, or style."
                }
            },
            "required": ["prompt"]
        }
    })
}

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Decode base64 16-bit PCM
    pub fn from_base64_pcm(data: &str, sample_rate: u32) -> Result<Self, LiveError> {
        let bytes = STANDARD
            .decode(data)
            .map_err(|e| LiveError::InvalidAudio(e.to_string()))?;
        Ok(Self {
            samples: decode_pcm16(&bytes)?,
            sample_rate,
        })
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Float samples to 16-bit little-endian PCM
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| {
            let value = (s * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            value.to_le_bytes()
        })
        .collect()
}

/// 16-bit little-endian PCM to float samples
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>, LiveError> {
    if bytes.len() % 2 != 0 {
        return Err(LiveError::InvalidAudio(format!(
            "odd PCM byte count {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_clamps() {
        let bytes = encode_pcm16(&[0.0, 1.0, -1.0, 0.5]);
        let values: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect();
        assert_eq!(values, vec![0, 32767, -32768, 16384]);
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert!(decode_pcm16(&[1, 2, 3]).is_err());
        assert_eq!(decode_pcm16(&[0, 0x40]).unwrap(), vec![0.5]);
    }

    #[test]
    fn test_microphone_blob() {
        let blob = Blob::from_samples(&[0.0; 4], INPUT_SAMPLE_RATE);
        assert_eq!(blob.mime_type, "audio/pcm;rate=16000");
        assert_eq!(STANDARD.decode(&blob.data).unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn test_audio_duration() {
        let pcm = STANDARD.encode(vec![0u8; 48_000]);
        let buffer = AudioBuffer::from_base64_pcm(&pcm, OUTPUT_SAMPLE_RATE).unwrap();
        assert_eq!(buffer.samples.len(), 24_000);
        assert!((buffer.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_server_content() {
        let message = ServerMessage::from_json(
            r#"{"serverContent":{"inputTranscription":{"text":"play"},
                "modelTurn":{"parts":[{"inlineData":{"data":"AAA=","mimeType":"audio/pcm;rate=24000"}}]},
                "turnComplete":true}}"#,
        )
        .unwrap();
        let content = message.server_content.unwrap();
        assert_eq!(content.input_transcription.unwrap().text, "play");
        assert!(content.turn_complete);
        assert!(!content.interrupted);
        assert_eq!(content.model_turn.unwrap().audio().collect::<Vec<_>>(), vec!["AAA="]);
    }

    #[test]
    fn test_parse_tool_call() {
        let message = ServerMessage::from_json(
            r#"{"toolCall":{"functionCalls":[{"id":"c1","name":"create_music_composition","args":{"prompt":"sad piano"}}]}}"#,
        )
        .unwrap();
        let call = &message.tool_call.unwrap().function_calls[0];
        assert_eq!(call.name, COMPOSE_TOOL);
        assert_eq!(call.prompt(), Some("sad piano"));
    }

    #[test]
    fn test_tool_response_shape() {
        let response = ToolResponse::single("c1", COMPOSE_TOOL, &ToolResult::error("boom"));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["functionResponses"][0]["id"], "c1");
        let result = json["functionResponses"][0]["response"]["result"].as_str().unwrap();
        assert_eq!(result, r#"{"status":"error","message":"boom"}"#);
    }

    #[test]
    fn test_setup_declares_tool() {
        let setup = SessionSetup::new("model", "Zephyr");
        assert_eq!(setup.tool_names(), vec![COMPOSE_TOOL]);
        let json = serde_json::to_value(&setup).unwrap();
        assert_eq!(json["config"]["responseModalities"][0], "AUDIO");
    }
}
