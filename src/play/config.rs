//! Engine configuration.
//!
//! Every field has a default, so a host can pass a partial JSON object
//! (`{"movePolicy": "forward"}`) and get the rest filled in.

use serde::{Deserialize, Serialize};

use super::history::DEFAULT_MAX_HISTORY;
use super::model::DEFAULT_FRAME_DURATION_MS;
use crate::error::{PlayError, PlayResult};

/// How `move_object` propagates a position change across frames.
///
/// Chosen once per engine; never per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovePolicy {
    /// Only the targeted frame changes. Preserves per-frame animation.
    #[default]
    SingleFrame,
    /// The targeted frame and every later frame take the new position.
    Forward,
}

/// Tunables for a `PlayEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Retained undo entries.
    pub max_history: usize,

    pub move_policy: MovePolicy,

    /// Offset applied to a pasted token, in court units.
    pub paste_offset: (f64, f64),

    /// Duration given to frames created by `add_frame`.
    pub default_frame_duration_ms: u32,

    /// Whether playback wraps to the first frame.
    pub loop_playback: bool,

    /// Playback speed multiplier.
    pub playback_speed: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            move_policy: MovePolicy::SingleFrame,
            paste_offset: (30.0, 30.0),
            default_frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            loop_playback: false,
            playback_speed: 1.0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> PlayResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would let the engine write a document it
    /// cannot load back.
    pub fn validate(&self) -> PlayResult<()> {
        if self.default_frame_duration_ms == 0 {
            return Err(PlayError::InvalidDuration(0));
        }
        let (dx, dy) = self.paste_offset;
        if !dx.is_finite() || !dy.is_finite() {
            return Err(PlayError::non_finite("paste offset"));
        }
        Ok(())
    }

    /// Duration for new frames. Zero falls back to the built-in default.
    pub fn frame_duration(&self) -> u32 {
        match self.default_frame_duration_ms {
            0 => DEFAULT_FRAME_DURATION_MS,
            ms => ms,
        }
    }

    /// Builder: Set move policy.
    pub fn with_move_policy(mut self, policy: MovePolicy) -> Self {
        self.move_policy = policy;
        self
    }

    /// Builder: Set history depth.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Builder: Set the duration of new frames. Zero keeps the default.
    pub fn with_default_frame_duration(mut self, duration_ms: u32) -> Self {
        if duration_ms > 0 {
            self.default_frame_duration_ms = duration_ms;
        }
        self
    }

    /// Builder: Set paste offset.
    pub fn with_paste_offset(mut self, dx: f64, dy: f64) -> Self {
        self.paste_offset = (dx, dy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_history, 50);
        assert_eq!(config.move_policy, MovePolicy::SingleFrame);
        assert_eq!(config.paste_offset, (30.0, 30.0));
        assert_eq!(config.default_frame_duration_ms, 500);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            EngineConfig::from_json(r#"{"movePolicy":"forward","maxHistory":10}"#).unwrap();
        assert_eq!(config.move_policy, MovePolicy::Forward);
        assert_eq!(config.max_history, 10);
        assert_eq!(config.paste_offset, (30.0, 30.0));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(EngineConfig::from_json(r#"{"movePolicy":"sideways"}"#).is_err());
    }

    #[test]
    fn test_zero_frame_duration_is_rejected() {
        let err = EngineConfig::from_json(r#"{"defaultFrameDurationMs":0}"#).unwrap_err();
        assert!(matches!(err, PlayError::InvalidDuration(0)));

        let config = EngineConfig::default().with_default_frame_duration(0);
        assert_eq!(config.default_frame_duration_ms, 500);

        let config = EngineConfig {
            default_frame_duration_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.frame_duration(), 500);
        assert_eq!(config.with_default_frame_duration(750).frame_duration(), 750);
    }
}
