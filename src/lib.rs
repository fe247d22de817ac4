//! Playchalk - play-state engine for animated basketball play diagrams.
//!
//! A play is an ordered list of frames. Each frame holds the court tokens
//! (players, ball, screens, cones) at one moment plus frame-scoped drawings.
//! The engine owns the document and offers:
//!
//! - **Editing**: tokens, strokes, text, shapes, frames, align/distribute,
//!   formation presets, copy/paste
//! - **Undo/redo**: bounded snapshot history with gesture batching
//! - **Playback**: a clock that interpolates token positions between frames
//! - **Library**: saved plays, autosave and a versioned JSON file format over
//!   any key-value store
//!
//! # Example
//!
//! ```rust
//! use playchalk::{ObjectKind, PlayEngine, PlayObject};
//!
//! let mut engine = PlayEngine::new();
//! engine
//!     .add_object(PlayObject::new("pg", ObjectKind::OffensePlayer, 400.0, 120.0).with_label("1"))
//!     .unwrap();
//!
//! // Second frame: the point guard drives to the rim.
//! engine.add_frame();
//! engine.move_object(1, "pg", 400.0, 420.0).unwrap();
//!
//! engine.toggle_playback();
//! let sample = engine.tick(250.0).unwrap();
//! let poses = engine.poses(&sample);
//! assert_eq!(poses[0].y, 270.0);
//!
//! assert!(engine.undo());
//! ```

pub mod error;
pub mod library;
pub mod play;

// Re-exports for convenience
pub use error::{PlayError, PlayResult, StoreError, StoreResult};
pub use library::{
    Draft, KeyValueStore, MemoryStore, PlayFile, PlayLibrary, Roster, RosterPlayer, SavedPlay,
    Workspace,
};
#[cfg(not(target_arch = "wasm32"))]
pub use library::DirStore;
pub use play::{
    AlignEdge, Annotation, CourtType, DistributeAxis, EngineConfig, Frame, MovePolicy, ObjectKind,
    Play, PlayEngine, PlayEvent, PlayObject, PlaybackStatus, ShapeKind, ShapeObject, StrokeKind,
    TextAnnotation,
};

#[cfg(feature = "wasm")]
pub use play::JsPlayEngine;
