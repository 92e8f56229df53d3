// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note duration tokens.
//!
//! Tokens name a note value (`1` whole .. `32` thirty-second), optionally
//! dotted (`d4`, `dd4`) or triplet (`t8` / `8t`), or give raw ticks
//! (`T96`). Anything else is rejected.

use std::fmt;
use std::str::FromStr;

use super::CompositionError;

/// Note divisions accepted in a token
pub const DIVISIONS: [u8; 6] = [1, 2, 4, 8, 16, 32];

/// Largest explicit tick count; longer gaps do not fit a MIDI delta-time
pub const MAX_TICKS: u32 = 0x0FFF_FFFF;

/// Plain decimal digits with no sign and no leading zero
fn decimal(s: &str) -> Option<&str> {
    let plain = !s.is_empty() && !s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit());
    plain.then_some(s)
}

/// A parsed duration token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationToken {
    /// Standard note value with optional dots or triplet
    Note {
        /// Division of a whole note (1, 2, 4, 8, 16, 32)
        division: u8,
        /// Number of dots (0-2)
        dots: u8,
        /// Triplet (2/3 of the plain value)
        triplet: bool,
    },
    /// Explicit length in ticks
    Ticks(u32),
}

impl DurationToken {
    /// Parse a duration token
    pub fn parse(s: &str) -> Result<Self, CompositionError> {
        let invalid = || CompositionError::InvalidDuration(s.to_string());
        let token = s.trim();

        if let Some(ticks) = token.strip_prefix('T') {
            let ticks: u32 = decimal(ticks)
                .and_then(|t| t.parse().ok())
                .ok_or_else(invalid)?;
            if ticks > MAX_TICKS {
                return Err(invalid());
            }
            return Ok(DurationToken::Ticks(ticks));
        }

        let (dots, rest) = if let Some(rest) = token.strip_prefix("dd") {
            (2, rest)
        } else if let Some(rest) = token.strip_prefix('d') {
            (1, rest)
        } else {
            (0, token)
        };

        let (triplet, rest) = if let Some(rest) = rest.strip_prefix('t') {
            (true, rest)
        } else if let Some(rest) = rest.strip_suffix('t') {
            (true, rest)
        } else {
            (false, rest)
        };

        if dots > 0 && triplet {
            return Err(invalid());
        }

        let division: u8 = decimal(rest)
            .and_then(|d| d.parse().ok())
            .ok_or_else(invalid)?;
        if !DIVISIONS.contains(&division) {
            return Err(invalid());
        }

        Ok(DurationToken::Note {
            division,
            dots,
            triplet,
        })
    }

    /// Length in ticks for the given resolution (ticks per quarter note)
    pub fn ticks(&self, ppqn: u16) -> u32 {
        match *self {
            DurationToken::Ticks(ticks) => ticks,
            DurationToken::Note {
                division,
                dots,
                triplet,
            } => {
                let plain = 4.0 * ppqn as f64 / division as f64;
                let factor = match dots {
                    0 => 1.0,
                    1 => 1.5,
                    _ => 1.75,
                };
                let length = if triplet {
                    plain * 2.0 / 3.0
                } else {
                    plain * factor
                };
                (length.round() as u32).max(1)
            }
        }
    }

    /// Length relative to a quarter note (1.0 = one beat)
    pub fn beats(&self, ppqn: u16) -> f64 {
        self.ticks(ppqn) as f64 / ppqn.max(1) as f64
    }
}

impl FromStr for DurationToken {
    type Err = CompositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DurationToken::parse(s)
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationToken::Ticks(ticks) => write!(f, "T{}", ticks),
            DurationToken::Note {
                division,
                dots,
                triplet,
            } => {
                let prefix = match (dots, triplet) {
                    (_, true) => "t",
                    (0, false) => "",
                    (1, false) => "d",
                    _ => "dd",
                };
                write!(f, "{}{}", prefix, division)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PPQN: u16 = 128;

    fn ticks(token: &str) -> u32 {
        DurationToken::parse(token).unwrap().ticks(PPQN)
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(ticks("1"), 512);
        assert_eq!(ticks("2"), 256);
        assert_eq!(ticks("4"), 128);
        assert_eq!(ticks("8"), 64);
        assert_eq!(ticks("16"), 32);
        assert_eq!(ticks("32"), 16);
    }

    #[test]
    fn test_dotted_values() {
        assert_eq!(ticks("d4"), 192);
        assert_eq!(ticks("d2"), 384);
        assert_eq!(ticks("dd4"), 224);
        assert_eq!(ticks("d16"), 48);
    }

    #[test]
    fn test_triplets() {
        assert_eq!(ticks("t8"), 43);
        assert_eq!(ticks("8t"), 43);
        assert_eq!(ticks("t4"), 85);
    }

    #[test]
    fn test_explicit_ticks() {
        assert_eq!(ticks("T96"), 96);
        assert_eq!(ticks("T268435455"), MAX_TICKS);
        assert!(DurationToken::parse("T0").is_err());
        assert!(DurationToken::parse("T268435456").is_err());
        assert!(DurationToken::parse("T4294967295").is_err());
    }

    #[test]
    fn test_unknown_tokens_rejected() {
        for bad in [
            "", "3", "64", "t", "d", "x4", "dt4", "4.", "quarter", "T-1",
            "+4", "04", "t+8", "+8t", "d04", "T+96", "T096", " 4 4",
        ] {
            assert!(DurationToken::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_beats() {
        assert_eq!(DurationToken::parse("d4").unwrap().beats(PPQN), 1.5);
        assert_eq!(DurationToken::parse("1").unwrap().beats(PPQN), 4.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(DurationToken::parse("dd8").unwrap().to_string(), "dd8");
        assert_eq!(DurationToken::parse("8t").unwrap().to_string(), "t8");
    }
}
