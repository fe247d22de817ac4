//! Standalone play file: `{name, frames, version, exportedAt}`.
//!
//! Import is all-or-nothing. `PlayFile::parse` upgrades and validates the
//! whole file before the engine touches its document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::migration::{migrate, CURRENT_SCHEMA_VERSION};
use crate::error::{PlayError, PlayResult};
use crate::play::model::{Frame, Play};

/// An exported play.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayFile {
    pub name: String,
    pub frames: Vec<Arc<Frame>>,
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
}

impl PlayFile {
    /// Captures a play for export, stamped with the current time.
    pub fn from_play(play: &Play) -> Self {
        Self {
            name: play.name.clone(),
            frames: play.frames.clone(),
            version: CURRENT_SCHEMA_VERSION,
            exported_at: Utc::now(),
        }
    }

    /// Pretty-printed JSON for writing to disk.
    pub fn to_json_pretty(&self) -> PlayResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses, upgrades and validates an exported file. Any failure is an
    /// `InvalidFormat` error.
    pub fn parse(json: &str) -> PlayResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| PlayError::invalid_format(e.to_string()))?;
        let value = migrate(value).map_err(|e| PlayError::invalid_format(e.to_string()))?;
        let file: PlayFile =
            serde_json::from_value(value).map_err(|e| PlayError::invalid_format(e.to_string()))?;
        validate_frames(&file.frames)?;
        Ok(file)
    }

    /// The file's frames as a live document with the cursor on frame 0.
    pub fn into_play(self) -> Play {
        Play {
            name: self.name,
            frames: self.frames,
            current_frame_index: 0,
        }
    }
}

/// Checks that `frames` is a well-formed, non-empty frame sequence.
pub fn validate_frames(frames: &[Arc<Frame>]) -> PlayResult<()> {
    if frames.is_empty() {
        return Err(PlayError::invalid_format("play has no frames"));
    }

    let mut frame_ids = HashSet::new();
    for (index, frame) in frames.iter().enumerate() {
        if !frame_ids.insert(frame.id.as_str()) {
            return Err(PlayError::invalid_format(format!(
                "duplicate frame id '{}'",
                frame.id
            )));
        }
        if frame.duration == 0 {
            return Err(PlayError::invalid_format(format!(
                "frame {index} has zero duration"
            )));
        }
        for (key, object) in &frame.objects {
            if key != &object.id {
                return Err(PlayError::invalid_format(format!(
                    "frame {index}: object stored under '{key}' has id '{}'",
                    object.id
                )));
            }
            if !object.x.is_finite() || !object.y.is_finite() {
                return Err(PlayError::invalid_format(format!(
                    "frame {index}: object '{key}' has a non-finite position"
                )));
            }
        }
        for annotation in &frame.annotations {
            if let Some(reason) = annotation.malformed_reason() {
                return Err(PlayError::invalid_format(format!(
                    "frame {index}: annotation '{}' {reason}",
                    annotation.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::play::model::{ObjectKind, PlayObject};

    fn sample_play() -> Play {
        let mut play = Play::new("Horns Flare");
        Arc::make_mut(&mut play.frames[0]).objects.insert(
            "p1".into(),
            PlayObject::new("p1", ObjectKind::OffensePlayer, 400.0, 200.0).with_label("1"),
        );
        play
    }

    #[test]
    fn test_export_then_parse() {
        let play = sample_play();
        let json = PlayFile::from_play(&play).to_json_pretty().unwrap();
        assert!(json.contains("\"exportedAt\""));

        let file = PlayFile::parse(&json).unwrap();
        assert_eq!(file.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(file.into_play(), play);
    }

    #[test]
    fn test_legacy_file_without_version_or_timestamp() {
        let json = r#"{"name":"Old","frames":[{"id":"f","objects":{},"annotations":[]}]}"#;
        let file = PlayFile::parse(json).unwrap();
        assert_eq!(file.frames[0].duration, 500);
    }

    #[test]
    fn test_malformed_inputs_are_invalid_format() {
        let cases = [
            "not json",
            r#"{"name":"x"}"#,
            r#"{"name":"x","frames":"nope"}"#,
            r#"{"name":"x","version":2,"frames":[]}"#,
            r#"{"name":"x","version":2,"frames":[{"id":"f","duration":0}]}"#,
            r#"{"name":"x","version":2,"frames":[{"id":"f"},{"id":"f"}]}"#,
            r#"{"name":"x","version":2,"frames":[{"id":"f","annotations":[
                {"id":"a","type":"line","points":[0,0],"color":"white","strokeWidth":2}]}]}"#,
            r#"{"name":"x","version":2,"frames":[{"id":"f","objects":{
                "k":{"id":"other","type":"ball","x":0,"y":0}}}]}"#,
            r#"{"name":"x","version":99,"frames":[{"id":"f"}]}"#,
        ];
        for case in cases {
            assert!(
                matches!(PlayFile::parse(case), Err(PlayError::InvalidFormat(_))),
                "accepted: {case}"
            );
        }
    }
}
