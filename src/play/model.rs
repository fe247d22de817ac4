//! Data models for a play document.
//!
//! Pure data with builders and a few query helpers. Invariants (token
//! ubiquity, at least one frame, selection consistency) are enforced by
//! `PlayEngine`, not here. Field names serialize in camelCase so documents
//! exported by the browser app load unchanged.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Hold time of a new frame, in milliseconds.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 500;

/// Name given to a fresh play.
pub const DEFAULT_PLAY_NAME: &str = "Untitled Play";

/// Generates a collision-resistant id for tokens, frames and annotations.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_frame_duration() -> u32 {
    DEFAULT_FRAME_DURATION_MS
}

// =============================================================================
// PLAY OBJECT (TOKEN)
// =============================================================================

/// Kind of placeable token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[serde(rename = "player_offense")]
    OffensePlayer,
    #[serde(rename = "player_defense")]
    DefensePlayer,
    Ball,
    Screen,
    Cone,
}

impl ObjectKind {
    /// Color used when the token carries no override.
    pub fn default_color(self) -> &'static str {
        match self {
            ObjectKind::OffensePlayer => "#ea580c",
            ObjectKind::DefensePlayer => "#2563eb",
            ObjectKind::Ball => "#f97316",
            ObjectKind::Screen => "#9333ea",
            ObjectKind::Cone => "#f97316",
        }
    }

    /// Whether width/height are meaningful for this kind.
    pub fn is_resizable(self) -> bool {
        matches!(self, ObjectKind::Screen)
    }
}

/// A placeable token. The same `id` denotes the same actor in every frame;
/// only its per-frame attributes differ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayObject {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ObjectKind,

    pub x: f64,
    pub y: f64,

    /// Short text drawn on the token. Length is a UI convention only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Color override. See `effective_color`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl PlayObject {
    /// Creates a token of the given kind at (x, y).
    pub fn new(id: impl Into<String>, kind: ObjectKind, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            x,
            y,
            label: None,
            color: None,
            rotation: 0.0,
            width: None,
            height: None,
        }
    }

    /// Creates a token with a generated id.
    pub fn spawn(kind: ObjectKind, x: f64, y: f64) -> Self {
        Self::new(generate_id(), kind, x, y)
    }

    /// Builder: Set label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder: Set color override.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Builder: Set rotation.
    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    /// Builder: Set size.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Whether position, rotation and size are all finite numbers.
    pub fn has_finite_geometry(&self) -> bool {
        [self.x, self.y, self.rotation].iter().all(|v| v.is_finite())
            && self.width.map_or(true, f64::is_finite)
            && self.height.map_or(true, f64::is_finite)
    }

    /// The color the renderer should use.
    pub fn effective_color(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| self.kind.default_color())
    }
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

/// Stroke style of a drawn annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeKind {
    Line,
    Arrow,
    Freehand,
    DashedLine,
    DashedArrow,
    CurvedArrow,
}

/// A stroke scoped to one frame. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: StrokeKind,

    /// Flat x,y pairs.
    pub points: Vec<f64>,

    pub color: String,

    pub stroke_width: f64,

    /// Dash pattern for dashed variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<Vec<f64>>,
}

impl Annotation {
    /// Creates a white 2px stroke.
    pub fn new(id: impl Into<String>, kind: StrokeKind, points: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            kind,
            points,
            color: "#ffffff".to_string(),
            stroke_width: 2.0,
            dash: None,
        }
    }

    /// Builder: Set color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Builder: Set stroke width.
    pub fn with_stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = width;
        self
    }

    /// Builder: Set dash pattern.
    pub fn with_dash(mut self, dash: Vec<f64>) -> Self {
        self.dash = Some(dash);
        self
    }

    /// Why this stroke cannot be drawn, if it cannot.
    pub fn malformed_reason(&self) -> Option<&'static str> {
        if self.points.len() < 4 {
            Some("needs at least one segment (4 point values)")
        } else if self.points.len() % 2 != 0 {
            Some("point list has an odd number of values")
        } else if self.points.iter().any(|v| !v.is_finite()) {
            Some("point list contains a non-finite value")
        } else {
            None
        }
    }

    /// Whether the stroke has at least one segment of finite x,y pairs.
    pub fn is_well_formed(&self) -> bool {
        self.malformed_reason().is_none()
    }

    /// Number of x,y points.
    pub fn point_count(&self) -> usize {
        self.points.len() / 2
    }
}

/// A positioned text label scoped to one frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub color: String,
    pub font_size: f64,
}

impl TextAnnotation {
    /// Creates a white 16px label.
    pub fn new(id: impl Into<String>, x: f64, y: f64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            text: text.into(),
            color: "#ffffff".to_string(),
            font_size: 16.0,
        }
    }

    /// Builder: Set color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Builder: Set font size.
    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn has_finite_geometry(&self) -> bool {
        [self.x, self.y, self.font_size].iter().all(|v| v.is_finite())
    }
}

/// Geometric primitive of a shape annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Ellipse,
}

/// A filled shape scoped to one frame (zones, lanes, highlight areas).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShapeObject {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ShapeKind,

    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    pub fill_opacity: f64,
    pub stroke: String,
    pub stroke_width: f64,
}

impl ShapeObject {
    /// Creates a translucent white shape.
    pub fn new(
        id: impl Into<String>,
        kind: ShapeKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            x,
            y,
            width,
            height,
            fill: "#ffffff".to_string(),
            fill_opacity: 0.3,
            stroke: "#ffffff".to_string(),
            stroke_width: 2.0,
        }
    }

    /// Builder: Set fill color and opacity.
    pub fn with_fill(mut self, fill: impl Into<String>, opacity: f64) -> Self {
        self.fill = fill.into();
        self.fill_opacity = opacity;
        self
    }

    /// Builder: Set stroke color and width.
    pub fn with_stroke(mut self, stroke: impl Into<String>, width: f64) -> Self {
        self.stroke = stroke.into();
        self.stroke_width = width;
        self
    }

    pub fn has_finite_geometry(&self) -> bool {
        [self.x, self.y, self.width, self.height, self.fill_opacity, self.stroke_width]
            .iter()
            .all(|v| v.is_finite())
    }
}

// =============================================================================
// FRAME
// =============================================================================

/// One keyframe of the play.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: String,

    /// Token id -> token state in this frame.
    #[serde(default)]
    pub objects: HashMap<String, PlayObject>,

    /// Strokes in z-order.
    #[serde(default)]
    pub annotations: Vec<Annotation>,

    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,

    #[serde(default)]
    pub shapes: Vec<ShapeObject>,

    /// Milliseconds spent moving into this frame from the previous one during
    /// playback. Unused on the first frame.
    #[serde(default = "default_frame_duration")]
    pub duration: u32,
}

impl Frame {
    /// Creates an empty frame with a fresh id.
    pub fn new() -> Self {
        Self {
            id: generate_id(),
            objects: HashMap::new(),
            annotations: Vec::new(),
            text_annotations: Vec::new(),
            shapes: Vec::new(),
            duration: DEFAULT_FRAME_DURATION_MS,
        }
    }

    /// Creates a frame holding the given tokens and nothing else.
    pub fn with_objects(objects: HashMap<String, PlayObject>) -> Self {
        Self {
            objects,
            ..Self::new()
        }
    }

    /// Builder: Set duration.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Gets a token by id.
    pub fn object(&self, id: &str) -> Option<&PlayObject> {
        self.objects.get(id)
    }

    /// Whether the frame holds a token with this id.
    pub fn contains_object(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// Returns true if the frame has no tokens, strokes, text or shapes.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
            && self.annotations.is_empty()
            && self.text_annotations.is_empty()
            && self.shapes.is_empty()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// Court the play is drawn on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourtType {
    #[default]
    Full,
    Half,
}

// =============================================================================
// PLAY (DOCUMENT ROOT)
// =============================================================================

/// The live document: ordered frames plus the edit cursor.
///
/// Frames are reference-counted so history snapshots share unchanged frames
/// with the live document. Writers go through `Arc::make_mut`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub name: String,
    pub frames: Vec<Arc<Frame>>,
    #[serde(default)]
    pub current_frame_index: usize,
}

impl Play {
    /// Creates a play with a single empty frame.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: vec![Arc::new(Frame::new())],
            current_frame_index: 0,
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a document maintained by the engine.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Gets a frame by index.
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index).map(|f| f.as_ref())
    }

    /// The frame under the edit cursor.
    pub fn current_frame(&self) -> &Frame {
        &self.frames[self.current_frame_index]
    }

    /// Token ids of the current frame, sorted for stable output.
    pub fn object_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.current_frame().objects.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for Play {
    fn default() -> Self {
        Self::new(DEFAULT_PLAY_NAME)
    }
}

// =============================================================================
// TESTS
// =============================================================================
