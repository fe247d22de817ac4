//! Play document module.
//!
//! Provides the frame/token data model, the editing engine and the pieces it
//! is built from (history, playback clock, selection, formation presets).

pub mod config;
pub mod engine;
pub mod formation;
pub mod history;
pub mod model;
pub mod playback;
pub mod selection;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use config::{EngineConfig, MovePolicy};
pub use engine::{AlignEdge, DistributeAxis, PlayEngine, PlayEvent, SubscriptionId};
pub use formation::{find_preset, presets, FormationCategory, FormationPreset};
pub use history::{HistoryEntry, HistoryManager};
pub use model::{
    Annotation, CourtType, Frame, ObjectKind, Play, PlayObject, ShapeKind, ShapeObject, StrokeKind,
    TextAnnotation,
};
pub use playback::{FrameSample, ObjectPose, PlaybackState, PlaybackStatus};
pub use selection::Selection;

#[cfg(feature = "wasm")]
pub use wasm::JsPlayEngine;
