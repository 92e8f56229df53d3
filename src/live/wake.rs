// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Wake-phrase matching.

/// Default wake phrases
pub const DEFAULT_WAKE_PHRASES: [&str; 2] = ["hey ai", "okay ai"];

/// Case-insensitive substring matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeWordDetector {
    phrases: Vec<String>,
}

impl WakeWordDetector {
    /// Create from phrases; blank ones are dropped
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Phrases matched
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Check whether a transcript contains a wake phrase
    pub fn matches(&self, transcript: &str) -> bool {
        let heard = transcript.trim().to_lowercase();
        self.phrases.iter().any(|p| heard.contains(p.as_str()))
    }
}

impl Default for WakeWordDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WAKE_PHRASES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_phrases() {
        let detector = WakeWordDetector::default();
        assert!(detector.matches("Hey AI, make me a song"));
        assert!(detector.matches("well okay ai"));
        assert!(!detector.matches("hey there"));
    }

    #[test]
    fn test_custom_phrases() {
        let detector = WakeWordDetector::new(["  Computer ", ""]);
        assert_eq!(detector.phrases(), ["computer".to_string()]);
        assert!(detector.matches("COMPUTER compose"));
    }
}
