//! `PlayEngine`: the sole authority for mutating a play document.
//!
//! Every public mutation either rejects without touching the document or
//! applies its change, records one history entry and notifies subscribers.
//! Drag gestures wrap their moves in `begin_gesture`/`end_gesture` so the
//! whole gesture is one undo step.
//!
//! Token policy: `add_object` writes the token into every frame, so every
//! token id exists in every frame for the lifetime of the play. Moves follow
//! the engine-wide `MovePolicy`.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::config::{EngineConfig, MovePolicy};
use super::formation::find_preset;
use super::history::{HistoryEntry, HistoryManager};
use super::model::{
    generate_id, Annotation, CourtType, Frame, Play, PlayObject, ShapeObject, TextAnnotation,
};
use super::playback::{interpolate, FrameSample, ObjectPose, PlaybackState, PlaybackStatus};
use super::selection::Selection;
use crate::error::{PlayError, PlayResult};
use crate::library::export::{validate_frames, PlayFile};
use crate::library::migration::DEFAULT_CATEGORY;
use crate::library::{now_millis, Draft, KeyValueStore, PlayLibrary, Roster, SavedPlay};

// =============================================================================
// PUBLIC TYPES
// =============================================================================

/// Edge or center line for `align_objects`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignEdge {
    Left,
    Right,
    Top,
    Bottom,
    CenterH,
    CenterV,
}

/// Axis for `distribute_objects`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributeAxis {
    Horizontal,
    Vertical,
}

/// Change notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlayEvent {
    /// Frames, tokens, annotations or the play name changed.
    DocumentChanged,
    /// The edit cursor moved.
    FrameChanged { index: usize },
    SelectionChanged,
    PlaybackChanged { status: PlaybackStatus },
    /// A saved play was written or removed.
    LibraryChanged,
}

/// Handle returned by `subscribe`.
pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&PlayEvent)>;

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

// =============================================================================
// PLAY ENGINE
// =============================================================================

/// Play document plus editor-session state (selection, clipboard, playback,
/// history, library link).
pub struct PlayEngine {
    play: Play,
    history: HistoryManager,
    selection: Selection,
    clipboard: Option<PlayObject>,
    playback: PlaybackState,
    config: EngineConfig,
    /// Saved play this document was loaded from or last saved as.
    current_play_id: Option<String>,
    category: String,
    tags: Vec<String>,
    court_type: CourtType,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl PlayEngine {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates an engine holding an empty "Untitled Play".
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut playback = PlaybackState::new();
        playback.set_loop(config.loop_playback);
        playback.set_speed(config.playback_speed);

        let play = Play::default();
        let mut history = HistoryManager::new(config.max_history);
        history.record(&play.frames, play.current_frame_index);

        Self {
            play,
            history,
            selection: Selection::new(),
            clipboard: None,
            playback,
            config,
            current_play_id: None,
            category: DEFAULT_CATEGORY.to_string(),
            tags: Vec::new(),
            court_type: CourtType::Full,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Creates an engine editing an existing play. The frames are validated
    /// first; the cursor is clamped into range.
    pub fn from_play(play: Play, config: EngineConfig) -> PlayResult<Self> {
        validate_frames(&play.frames)?;
        let mut engine = Self::with_config(config);
        engine.install(play);
        Ok(engine)
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Registers a listener called after every change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&PlayEvent) + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: PlayEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn play(&self) -> &Play {
        &self.play
    }

    pub fn frames(&self) -> &[Arc<Frame>] {
        &self.play.frames
    }

    pub fn frame_count(&self) -> usize {
        self.play.frames.len()
    }

    pub fn current_frame_index(&self) -> usize {
        self.play.current_frame_index
    }

    pub fn current_frame(&self) -> &Frame {
        self.play.current_frame()
    }

    pub fn name(&self) -> &str {
        &self.play.name
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_ids(&self) -> &[String] {
        self.selection.ids()
    }

    pub fn clipboard(&self) -> Option<&PlayObject> {
        self.clipboard.as_ref()
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current_play_id(&self) -> Option<&str> {
        self.current_play_id.as_deref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn court_type(&self) -> CourtType {
        self.court_type
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    /// Records the post-mutation state and notifies subscribers.
    fn commit(&mut self, action: &str) {
        self.history
            .record(&self.play.frames, self.play.current_frame_index);
        log::debug!(
            "{} (frame {}/{})",
            action,
            self.play.current_frame_index + 1,
            self.play.frames.len()
        );
        self.emit(PlayEvent::DocumentChanged);
    }

    fn check_frame(&self, index: usize) -> PlayResult<()> {
        let length = self.play.frames.len();
        if index >= length {
            log::error!("frame index {} out of range ({} frames)", index, length);
            return Err(PlayError::frame_out_of_range(index, length));
        }
        Ok(())
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        let index = self.play.current_frame_index;
        Arc::make_mut(&mut self.play.frames[index])
    }

    fn all_frames(&self) -> Range<usize> {
        0..self.play.frames.len()
    }

    fn from_current(&self) -> Range<usize> {
        self.play.current_frame_index..self.play.frames.len()
    }

    fn move_range(&self, frame_index: usize) -> Range<usize> {
        match self.config.move_policy {
            MovePolicy::SingleFrame => frame_index..frame_index + 1,
            MovePolicy::Forward => frame_index..self.play.frames.len(),
        }
    }

    /// Applies `f` to token `id` in every frame of `range` that holds it.
    /// Frames where `f` changes nothing are not copied.
    fn update_token<F>(&mut self, id: &str, range: Range<usize>, f: F) -> bool
    where
        F: Fn(&mut PlayObject),
    {
        let mut changed = false;
        for frame in self.play.frames[range].iter_mut() {
            let Some(current) = frame.object(id) else {
                continue;
            };
            let mut updated = current.clone();
            f(&mut updated);
            updated.id = id.to_string();
            if updated != *current {
                Arc::make_mut(frame).objects.insert(id.to_string(), updated);
                changed = true;
            }
        }
        changed
    }

    fn reposition(&mut self, frame_index: usize, id: &str, x: Option<f64>, y: Option<f64>) -> bool {
        let range = self.move_range(frame_index);
        self.update_token(id, range, |obj| {
            if let Some(x) = x {
                obj.x = x;
            }
            if let Some(y) = y {
                obj.y = y;
            }
        })
    }

    /// Inserts tokens into every frame. Rejects the whole batch if any id is
    /// already taken or repeated.
    fn insert_objects(&mut self, objects: &[PlayObject]) -> PlayResult<()> {
        let mut seen = HashSet::new();
        for object in objects {
            if !object.has_finite_geometry() {
                log::warn!("rejected object '{}': non-finite geometry", object.id);
                return Err(PlayError::non_finite(&object.id));
            }
            let taken = self.play.frames.iter().any(|f| f.contains_object(&object.id));
            if taken || !seen.insert(object.id.as_str()) {
                log::error!("duplicate object id '{}'", object.id);
                return Err(PlayError::duplicate_object(&object.id));
            }
        }
        for frame in self.play.frames.iter_mut() {
            let frame = Arc::make_mut(frame);
            for object in objects {
                frame.objects.insert(object.id.clone(), object.clone());
            }
        }
        Ok(())
    }

    fn remove_objects(&mut self, ids: &[String]) -> bool {
        let mut changed = false;
        for frame in self.play.frames.iter_mut() {
            if !ids.iter().any(|id| frame.contains_object(id)) {
                continue;
            }
            let frame = Arc::make_mut(frame);
            for id in ids {
                changed |= frame.objects.remove(id).is_some();
            }
        }
        let mut deselected = false;
        for id in ids {
            deselected |= self.selection.remove(id);
        }
        if deselected {
            self.emit(PlayEvent::SelectionChanged);
        }
        changed
    }

    /// Drops selected ids the current frame no longer holds.
    fn prune_selection(&mut self) {
        if self.selection.retain_in(self.play.current_frame()) {
            self.emit(PlayEvent::SelectionChanged);
        }
    }

    fn stop_playback(&mut self) {
        if self.playback.is_playing() {
            self.playback.stop();
            self.emit(PlayEvent::PlaybackChanged {
                status: PlaybackStatus::Stopped,
            });
        }
    }

    /// Replaces the whole document and resets session state and history.
    fn install(&mut self, mut play: Play) {
        if play.frames.is_empty() {
            play.frames.push(Arc::new(Frame::new()));
        }
        play.current_frame_index = play.current_frame_index.min(play.frames.len() - 1);

        self.stop_playback();
        self.playback.rewind();
        self.play = play;
        self.selection.clear();
        self.history
            .reset(&self.play.frames, self.play.current_frame_index);

        self.emit(PlayEvent::DocumentChanged);
        self.emit(PlayEvent::FrameChanged {
            index: self.play.current_frame_index,
        });
        self.emit(PlayEvent::SelectionChanged);
    }

    fn restore(&mut self, entry: HistoryEntry) {
        let cursor_moved = entry.current_frame_index != self.play.current_frame_index;
        self.play.frames = entry.frames;
        self.play.current_frame_index = entry
            .current_frame_index
            .min(self.play.frames.len().saturating_sub(1));

        self.emit(PlayEvent::DocumentChanged);
        if cursor_moved {
            self.emit(PlayEvent::FrameChanged {
                index: self.play.current_frame_index,
            });
        }
        self.prune_selection();
    }

    fn selected_positions(&self) -> Vec<(String, f64, f64)> {
        let frame = self.play.current_frame();
        self.selection
            .ids()
            .iter()
            .filter_map(|id| frame.object(id).map(|o| (id.clone(), o.x, o.y)))
            .collect()
    }

    // =========================================================================
    // TOKENS
    // =========================================================================

    /// Adds a token to every frame.
    pub fn add_object(&mut self, object: PlayObject) -> PlayResult<()> {
        self.insert_objects(std::slice::from_ref(&object))?;
        self.commit("add object");
        Ok(())
    }

    /// Adds several tokens as one undo step.
    pub fn add_objects(&mut self, objects: Vec<PlayObject>) -> PlayResult<()> {
        if objects.is_empty() {
            return Ok(());
        }
        self.insert_objects(&objects)?;
        self.commit("add objects");
        Ok(())
    }

    /// Removes a token from every frame and from the selection.
    /// Returns false (and records nothing) if no frame held it.
    pub fn delete_object(&mut self, id: &str) -> bool {
        let changed = self.remove_objects(&[id.to_string()]);
        if changed {
            self.commit("delete object");
        }
        changed
    }

    /// Deletes every selected token as one undo step.
    pub fn delete_selected_objects(&mut self) -> bool {
        let ids = self.selection.ids().to_vec();
        if ids.is_empty() {
            return false;
        }
        let changed = self.remove_objects(&ids);
        if changed {
            self.commit("delete selected objects");
        }
        changed
    }

    /// Moves a token in `frame_index` according to the engine's move policy.
    /// Returns false if the frame does not hold the token.
    pub fn move_object(
        &mut self,
        frame_index: usize,
        id: &str,
        x: f64,
        y: f64,
    ) -> PlayResult<bool> {
        self.check_frame(frame_index)?;
        if !x.is_finite() || !y.is_finite() {
            log::warn!("rejected move of '{}' to ({}, {})", id, x, y);
            return Err(PlayError::non_finite(id));
        }
        if !self.play.frames[frame_index].contains_object(id) {
            return Ok(false);
        }
        let changed = self.reposition(frame_index, id, Some(x), Some(y));
        if changed {
            self.commit("move object");
        }
        Ok(changed)
    }

    /// Sets or clears a token's label in every frame.
    pub fn set_object_label(&mut self, id: &str, label: Option<String>) -> bool {
        let range = self.all_frames();
        let changed = self.update_token(id, range, |obj| obj.label = label.clone());
        if changed {
            self.commit("set object label");
        }
        changed
    }

    /// Sets or clears a token's color override in every frame.
    pub fn set_object_color(&mut self, id: &str, color: Option<String>) -> bool {
        let range = self.all_frames();
        let changed = self.update_token(id, range, |obj| obj.color = color.clone());
        if changed {
            self.commit("set object color");
        }
        changed
    }

    /// Rotates a token in the current frame and every later frame.
    /// Non-finite angles are ignored.
    pub fn set_object_rotation(&mut self, id: &str, degrees: f64) -> bool {
        if !degrees.is_finite() {
            log::warn!("ignored non-finite rotation for '{}'", id);
            return false;
        }
        let range = self.from_current();
        let changed = self.update_token(id, range, |obj| obj.rotation = degrees);
        if changed {
            self.commit("set object rotation");
        }
        changed
    }

    /// Resizes a resizable token in the current frame and every later frame.
    /// Non-resizable kinds and non-finite sizes are left alone.
    pub fn set_object_size(&mut self, id: &str, width: f64, height: f64) -> bool {
        if !width.is_finite() || !height.is_finite() {
            log::warn!("ignored non-finite size for '{}'", id);
            return false;
        }
        let resizable = self
            .play
            .current_frame()
            .object(id)
            .is_some_and(|o| o.kind.is_resizable());
        if !resizable {
            return false;
        }
        let range = self.from_current();
        let changed = self.update_token(id, range, |obj| {
            obj.width = Some(width);
            obj.height = Some(height);
        });
        if changed {
            self.commit("set object size");
        }
        changed
    }

    // =========================================================================
    // ANNOTATIONS (current frame only)
    // =========================================================================

    /// Adds a stroke to the current frame.
    pub fn add_annotation(&mut self, annotation: Annotation) -> PlayResult<()> {
        if let Some(reason) = annotation.malformed_reason() {
            log::warn!("rejected annotation '{}': {}", annotation.id, reason);
            return Err(PlayError::malformed_annotation(&annotation.id, reason));
        }
        self.current_frame_mut().annotations.push(annotation);
        self.commit("add annotation");
        Ok(())
    }

    /// Removes a stroke from the current frame.
    pub fn delete_annotation(&mut self, id: &str) -> bool {
        if !self.current_frame().annotations.iter().any(|a| a.id == id) {
            return false;
        }
        self.current_frame_mut().annotations.retain(|a| a.id != id);
        self.commit("delete annotation");
        true
    }

    /// Adds a text label to the current frame.
    pub fn add_text_annotation(&mut self, text: TextAnnotation) -> PlayResult<()> {
        if !text.has_finite_geometry() {
            log::warn!("rejected text annotation '{}': non-finite geometry", text.id);
            return Err(PlayError::non_finite(&text.id));
        }
        self.current_frame_mut().text_annotations.push(text);
        self.commit("add text annotation");
        Ok(())
    }

    /// Edits a text label in place. The id is preserved even if `f` changes it.
    pub fn update_text_annotation<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut TextAnnotation),
    {
        let Some(pos) = self
            .current_frame()
            .text_annotations
            .iter()
            .position(|t| t.id == id)
        else {
            return false;
        };
        let mut updated = self.current_frame().text_annotations[pos].clone();
        f(&mut updated);
        updated.id = id.to_string();
        if !updated.has_finite_geometry() {
            log::warn!("ignored non-finite edit of text annotation '{}'", id);
            return false;
        }
        if updated == self.current_frame().text_annotations[pos] {
            return false;
        }
        self.current_frame_mut().text_annotations[pos] = updated;
        self.commit("update text annotation");
        true
    }

    /// Removes a text label from the current frame.
    pub fn delete_text_annotation(&mut self, id: &str) -> bool {
        if !self.current_frame().text_annotations.iter().any(|t| t.id == id) {
            return false;
        }
        self.current_frame_mut().text_annotations.retain(|t| t.id != id);
        self.commit("delete text annotation");
        true
    }

    /// Adds a shape to the current frame.
    pub fn add_shape(&mut self, shape: ShapeObject) -> PlayResult<()> {
        if !shape.has_finite_geometry() {
            log::warn!("rejected shape '{}': non-finite geometry", shape.id);
            return Err(PlayError::non_finite(&shape.id));
        }
        self.current_frame_mut().shapes.push(shape);
        self.commit("add shape");
        Ok(())
    }

    /// Edits a shape in place. The id is preserved even if `f` changes it.
    pub fn update_shape<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut ShapeObject),
    {
        let Some(pos) = self.current_frame().shapes.iter().position(|s| s.id == id) else {
            return false;
        };
        let mut updated = self.current_frame().shapes[pos].clone();
        f(&mut updated);
        updated.id = id.to_string();
        if !updated.has_finite_geometry() {
            log::warn!("ignored non-finite edit of shape '{}'", id);
            return false;
        }
        if updated == self.current_frame().shapes[pos] {
            return false;
        }
        self.current_frame_mut().shapes[pos] = updated;
        self.commit("update shape");
        true
    }

    /// Removes a shape from the current frame.
    pub fn delete_shape(&mut self, id: &str) -> bool {
        if !self.current_frame().shapes.iter().any(|s| s.id == id) {
            return false;
        }
        self.current_frame_mut().shapes.retain(|s| s.id != id);
        self.commit("delete shape");
        true
    }

    // =========================================================================
    // FRAMES
    // =========================================================================

    /// Inserts a frame after the current one carrying the current tokens and
    /// no annotations, and moves the cursor onto it.
    pub fn add_frame(&mut self) {
        let objects = self.play.current_frame().objects.clone();
        let frame = Frame::with_objects(objects).with_duration(self.config.frame_duration());

        let index = self.play.current_frame_index + 1;
        self.play.frames.insert(index, Arc::new(frame));
        self.play.current_frame_index = index;
        self.commit("add frame");
        self.emit(PlayEvent::FrameChanged { index });
    }

    /// Inserts a full copy of frame `index` (fresh id) right after it and
    /// moves the cursor onto the copy.
    pub fn duplicate_frame(&mut self, index: usize) -> PlayResult<()> {
        self.check_frame(index)?;
        let mut copy = (*self.play.frames[index]).clone();
        copy.id = generate_id();

        self.play.frames.insert(index + 1, Arc::new(copy));
        self.play.current_frame_index = index + 1;
        self.commit("duplicate frame");
        self.emit(PlayEvent::FrameChanged { index: index + 1 });
        Ok(())
    }

    /// Removes frame `index`. A play always keeps at least one frame.
    pub fn delete_frame(&mut self, index: usize) -> PlayResult<()> {
        self.check_frame(index)?;
        if self.play.frames.len() <= 1 {
            log::warn!("refused to delete the last frame");
            return Err(PlayError::LastFrame);
        }

        self.play.frames.remove(index);
        let last = self.play.frames.len() - 1;
        self.play.current_frame_index = index.min(last);
        self.commit("delete frame");
        self.emit(PlayEvent::FrameChanged {
            index: self.play.current_frame_index,
        });
        self.prune_selection();
        Ok(())
    }

    /// Moves the edit cursor. Not an undoable change. Stops playback.
    pub fn set_current_frame(&mut self, index: usize) -> PlayResult<()> {
        self.check_frame(index)?;
        self.stop_playback();
        self.playback.seek_to_frame(&self.play.frames, index);
        if index != self.play.current_frame_index {
            self.play.current_frame_index = index;
            self.emit(PlayEvent::FrameChanged { index });
            self.prune_selection();
        }
        Ok(())
    }

    /// Moves the cursor to the next frame. Returns false at the last frame.
    pub fn step_forward(&mut self) -> bool {
        let next = self.play.current_frame_index + 1;
        next < self.play.frames.len() && self.set_current_frame(next).is_ok()
    }

    /// Moves the cursor to the previous frame. Returns false at frame 0.
    pub fn step_backward(&mut self) -> bool {
        match self.play.current_frame_index.checked_sub(1) {
            Some(prev) => self.set_current_frame(prev).is_ok(),
            None => false,
        }
    }

    /// Sets how long the transition into frame `index` lasts.
    pub fn set_frame_duration(&mut self, index: usize, duration_ms: u32) -> PlayResult<()> {
        self.check_frame(index)?;
        if duration_ms == 0 {
            log::warn!("rejected zero duration for frame {}", index);
            return Err(PlayError::InvalidDuration(duration_ms));
        }
        if self.play.frames[index].duration == duration_ms {
            return Ok(());
        }
        Arc::make_mut(&mut self.play.frames[index]).duration = duration_ms;
        self.commit("set frame duration");
        Ok(())
    }

    /// Renames the play. Names are metadata, not part of undo history.
    pub fn set_play_name(&mut self, name: impl Into<String>) {
        self.play.name = name.into();
        self.emit(PlayEvent::DocumentChanged);
    }

    /// Switches between full and half court. Not part of undo history.
    pub fn set_court_type(&mut self, court_type: CourtType) {
        if self.court_type != court_type {
            self.court_type = court_type;
            self.emit(PlayEvent::DocumentChanged);
        }
    }

    /// Replaces every frame with one empty frame, keeping name and library
    /// link. Undoable.
    pub fn clear_canvas(&mut self) {
        self.stop_playback();
        self.playback.rewind();
        self.play.frames = vec![Arc::new(
            Frame::new().with_duration(self.config.frame_duration()),
        )];
        self.play.current_frame_index = 0;
        self.commit("clear canvas");
        self.emit(PlayEvent::FrameChanged { index: 0 });
        self.prune_selection();
    }

    /// Starts a fresh untitled play with empty history.
    pub fn new_play(&mut self) {
        self.current_play_id = None;
        self.category = DEFAULT_CATEGORY.to_string();
        self.tags.clear();
        self.court_type = CourtType::Full;
        self.clipboard = None;
        self.install(Play::default());
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Selects exactly one token. Ids absent from the current frame are ignored.
    pub fn select_object(&mut self, id: &str) -> bool {
        if !self.play.current_frame().contains_object(id) {
            return false;
        }
        self.selection.select(id);
        self.emit(PlayEvent::SelectionChanged);
        true
    }

    /// Replaces the selection, keeping only ids the current frame holds.
    pub fn select_objects<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let frame = self.play.current_frame();
        let valid: Vec<String> = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| frame.contains_object(id))
            .collect();
        self.selection.set(valid);
        self.emit(PlayEvent::SelectionChanged);
    }

    /// Adds or removes one token from the selection.
    pub fn toggle_object_selection(&mut self, id: &str) -> bool {
        if !self.selection.contains(id) && !self.play.current_frame().contains_object(id) {
            return false;
        }
        self.selection.toggle(id);
        self.emit(PlayEvent::SelectionChanged);
        true
    }

    /// Selects every token of the current frame.
    pub fn select_all_objects(&mut self) {
        let ids = self.play.object_ids();
        self.selection.set(ids);
        self.emit(PlayEvent::SelectionChanged);
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit(PlayEvent::SelectionChanged);
        }
    }

    // =========================================================================
    // ALIGNMENT & DISTRIBUTION
    // =========================================================================

    /// Lines up the selected tokens of the current frame on one edge or
    /// center. Needs at least two selected tokens.
    pub fn align_objects(&mut self, edge: AlignEdge) -> PlayResult<()> {
        let positions = self.selected_positions();
        if positions.len() < 2 {
            log::warn!("align rejected: {} selected", positions.len());
            return Err(PlayError::insufficient_selection("align", 2, positions.len()));
        }

        let xs = positions.iter().map(|(_, x, _)| *x);
        let ys = positions.iter().map(|(_, _, y)| *y);
        let count = positions.len() as f64;
        let (axis, target) = match edge {
            AlignEdge::Left => (Axis::X, xs.fold(f64::INFINITY, f64::min)),
            AlignEdge::Right => (Axis::X, xs.fold(f64::NEG_INFINITY, f64::max)),
            AlignEdge::Top => (Axis::Y, ys.fold(f64::INFINITY, f64::min)),
            AlignEdge::Bottom => (Axis::Y, ys.fold(f64::NEG_INFINITY, f64::max)),
            AlignEdge::CenterH => (Axis::X, xs.sum::<f64>() / count),
            AlignEdge::CenterV => (Axis::Y, ys.sum::<f64>() / count),
        };

        let frame_index = self.play.current_frame_index;
        let mut changed = false;
        for (id, _, _) in &positions {
            changed |= match axis {
                Axis::X => self.reposition(frame_index, id, Some(target), None),
                Axis::Y => self.reposition(frame_index, id, None, Some(target)),
            };
        }
        if changed {
            self.commit("align objects");
        }
        Ok(())
    }

    /// Spaces the selected tokens evenly between the two outermost ones,
    /// preserving their order along the axis. Needs at least three.
    pub fn distribute_objects(&mut self, axis: DistributeAxis) -> PlayResult<()> {
        let mut positions = self.selected_positions();
        if positions.len() < 3 {
            log::warn!("distribute rejected: {} selected", positions.len());
            return Err(PlayError::insufficient_selection(
                "distribute",
                3,
                positions.len(),
            ));
        }

        let coord = |p: &(String, f64, f64)| match axis {
            DistributeAxis::Horizontal => p.1,
            DistributeAxis::Vertical => p.2,
        };
        positions.sort_by(|a, b| coord(a).total_cmp(&coord(b)));

        let last = positions.len() - 1;
        let min = coord(&positions[0]);
        let max = coord(&positions[last]);
        let step = (max - min) / last as f64;

        let frame_index = self.play.current_frame_index;
        let mut changed = false;
        for (i, (id, _, _)) in positions.iter().enumerate() {
            let slot = if i == last { max } else { min + step * i as f64 };
            changed |= match axis {
                DistributeAxis::Horizontal => self.reposition(frame_index, id, Some(slot), None),
                DistributeAxis::Vertical => self.reposition(frame_index, id, None, Some(slot)),
            };
        }
        if changed {
            self.commit("distribute objects");
        }
        Ok(())
    }

    // =========================================================================
    // FORMATIONS
    // =========================================================================

    /// Replaces the current frame's tokens with a preset layout.
    ///
    /// The replaced tokens are removed from the whole play and the preset's
    /// tokens are added to every frame, so every frame keeps the same token
    /// set. Returns the new token ids.
    pub fn apply_formation_preset(&mut self, preset_id: &str) -> PlayResult<Vec<String>> {
        let preset = find_preset(preset_id).ok_or_else(|| {
            log::warn!("unknown formation preset '{}'", preset_id);
            PlayError::unknown_preset(preset_id)
        })?;

        let replaced = self.play.object_ids();
        self.remove_objects(&replaced);

        let spawned = preset.spawn_objects();
        self.insert_objects(&spawned)?;
        self.clear_selection();
        self.commit("apply formation preset");
        log::info!("applied formation '{}'", preset.name);

        Ok(spawned.into_iter().map(|o| o.id).collect())
    }

    // =========================================================================
    // CLIPBOARD
    // =========================================================================

    /// Copies a token of the current frame. Returns false if absent.
    pub fn copy_object(&mut self, id: &str) -> bool {
        match self.play.current_frame().object(id) {
            Some(object) => {
                self.clipboard = Some(object.clone());
                true
            }
            None => false,
        }
    }

    /// Copies the first selected token.
    pub fn copy_selection(&mut self) -> bool {
        match self.selection.ids().first().cloned() {
            Some(id) => self.copy_object(&id),
            None => false,
        }
    }

    /// Pastes the clipboard token under a new id, offset by the configured
    /// delta, into every frame, and selects it. Returns the new id.
    pub fn paste_object(&mut self) -> Option<String> {
        let mut object = self.clipboard.clone()?;
        let (dx, dy) = self.config.paste_offset;
        object.id = generate_id();
        object.x += dx;
        object.y += dy;

        let id = object.id.clone();
        if let Err(e) = self.insert_objects(std::slice::from_ref(&object)) {
            log::error!("paste failed: {}", e);
            return None;
        }
        self.selection.select(&id);
        self.commit("paste object");
        self.emit(PlayEvent::SelectionChanged);
        Some(id)
    }

    /// Places a roster player on the court as a new token in every frame.
    /// Returns the token id, or `None` if the roster has no such player.
    pub fn place_roster_player(
        &mut self,
        roster: &Roster,
        player_id: &str,
        x: f64,
        y: f64,
    ) -> PlayResult<Option<String>> {
        let Some(token) = roster.token_for(player_id, x, y) else {
            return Ok(None);
        };
        let id = token.id.clone();
        self.add_object(token)?;
        Ok(Some(id))
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    /// Opens a gesture; mutations until `end_gesture` form one undo step.
    pub fn begin_gesture(&mut self, label: &str) {
        self.history.start_batch(label);
    }

    /// Closes the open gesture. Returns whether an undo step was written.
    pub fn end_gesture(&mut self) -> bool {
        self.history
            .end_batch(&self.play.frames, self.play.current_frame_index)
    }

    /// Restores the state before the most recent recorded change.
    /// Returns false at the start of history.
    pub fn undo(&mut self) -> bool {
        if self.history.is_batching() {
            self.end_gesture();
        }
        let Some(entry) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(entry);
        true
    }

    /// Re-applies the most recently undone change. Returns false at the end
    /// of history.
    pub fn redo(&mut self) -> bool {
        if self.history.is_batching() {
            self.end_gesture();
        }
        let Some(entry) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(entry);
        true
    }

    // =========================================================================
    // PLAYBACK
    // =========================================================================

    /// Starts or stops playback.
    pub fn toggle_playback(&mut self) -> PlaybackStatus {
        let before = self.playback.status();
        let status = self.playback.toggle(&self.play.frames);
        if status != before {
            self.emit(PlayEvent::PlaybackChanged { status });
        }
        status
    }

    /// Starts playback. Returns false if there is nothing to animate.
    pub fn start_playback(&mut self) -> bool {
        let started = self.playback.play(&self.play.frames);
        if started {
            self.emit(PlayEvent::PlaybackChanged {
                status: PlaybackStatus::Playing,
            });
        }
        started
    }

    /// Stops playback at the current playhead.
    pub fn stop_playback_now(&mut self) {
        self.stop_playback();
    }

    /// Advances the playback clock. Returns the sample to render, or `None`
    /// while stopped.
    pub fn tick(&mut self, delta_ms: f64) -> Option<FrameSample> {
        let was_playing = self.playback.is_playing();
        let sample = self.playback.tick(&self.play.frames, delta_ms);
        if was_playing && !self.playback.is_playing() {
            self.emit(PlayEvent::PlaybackChanged {
                status: PlaybackStatus::Stopped,
            });
        }
        sample
    }

    /// Interpolated token poses for a sample.
    pub fn poses(&self, sample: &FrameSample) -> Vec<ObjectPose> {
        interpolate(&self.play.frames, sample)
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.playback.set_loop(enabled);
    }

    pub fn set_playback_speed(&mut self, speed: f64) {
        self.playback.set_speed(speed);
    }

    // =========================================================================
    // LIBRARY & FILES
    // =========================================================================

    /// Sets the library category used by the next `save_play`.
    pub fn set_play_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    /// Sets the library tags used by the next `save_play`. Blank and
    /// duplicate tags are dropped.
    pub fn set_play_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.clear();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
                self.tags.push(tag.to_string());
            }
        }
    }

    /// Saves the document into the library, overwriting the saved play it
    /// came from (keeping its creation time) or creating a new one.
    /// An unreadable stored record is overwritten.
    pub fn save_play<S: KeyValueStore>(
        &mut self,
        library: &mut PlayLibrary<S>,
    ) -> PlayResult<SavedPlay> {
        let now = now_millis();
        let (id, created_at) = match &self.current_play_id {
            Some(id) => {
                let created = match library.get_play(id) {
                    Ok(existing) => existing.map(|p| p.created_at).unwrap_or(now),
                    Err(e) => {
                        log::warn!("stored play {} is unreadable, overwriting: {}", id, e);
                        now
                    }
                };
                (id.clone(), created)
            }
            None => (generate_id(), now),
        };

        let saved = SavedPlay {
            id,
            name: self.play.name.clone(),
            frames: self.play.frames.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            court_type: self.court_type,
            created_at,
            updated_at: now,
        };
        library.put_play(&saved)?;
        self.current_play_id = Some(saved.id.clone());
        log::info!("saved play '{}' as {}", saved.name, saved.id);
        self.emit(PlayEvent::LibraryChanged);
        Ok(saved)
    }

    /// Replaces the document with a saved play. History restarts.
    pub fn load_play<S: KeyValueStore>(
        &mut self,
        library: &PlayLibrary<S>,
        id: &str,
    ) -> PlayResult<()> {
        let saved = library
            .get_play(id)?
            .ok_or_else(|| PlayError::play_not_found(id))?;
        validate_frames(&saved.frames)?;

        self.current_play_id = Some(saved.id.clone());
        self.category = saved.category.clone();
        self.tags = saved.tags.clone();
        self.court_type = saved.court_type;
        self.install(saved.to_play());
        log::info!("loaded play '{}'", saved.name);
        Ok(())
    }

    /// Removes a saved play. The open document is kept but unlinked if it
    /// was that play. Returns whether the play existed.
    pub fn delete_play<S: KeyValueStore>(
        &mut self,
        library: &mut PlayLibrary<S>,
        id: &str,
    ) -> PlayResult<bool> {
        let existed = library.delete_play(id)?;
        if self.current_play_id.as_deref() == Some(id) {
            self.current_play_id = None;
        }
        if existed {
            self.emit(PlayEvent::LibraryChanged);
        }
        Ok(existed)
    }

    /// Autosaves the in-progress document.
    pub fn save_current<S: KeyValueStore>(&self, library: &mut PlayLibrary<S>) -> PlayResult<()> {
        let draft = Draft {
            name: self.play.name.clone(),
            frames: self.play.frames.clone(),
            current_frame_index: self.play.current_frame_index,
            current_play_id: self.current_play_id.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            court_type: self.court_type,
        };
        library.save_draft(&draft)?;
        Ok(())
    }

    /// Restores the autosaved document, if any. Returns whether one was found.
    pub fn restore_current<S: KeyValueStore>(
        &mut self,
        library: &PlayLibrary<S>,
    ) -> PlayResult<bool> {
        let Some(draft) = library.load_draft()? else {
            return Ok(false);
        };
        validate_frames(&draft.frames)?;

        self.current_play_id = draft.current_play_id;
        self.category = draft.category;
        self.tags = draft.tags;
        self.court_type = draft.court_type;
        self.install(Play {
            name: draft.name,
            frames: draft.frames,
            current_frame_index: draft.current_frame_index,
        });
        Ok(true)
    }

    /// The document in the standalone file format.
    pub fn export_play(&self) -> PlayFile {
        PlayFile::from_play(&self.play)
    }

    /// Replaces the document with an exported file. Malformed input is
    /// rejected before anything changes.
    pub fn import_play(&mut self, json: &str) -> PlayResult<()> {
        let file = PlayFile::parse(json).map_err(|e| {
            log::warn!("import rejected: {}", e);
            e
        })?;
        self.current_play_id = None;
        self.install(file.into_play());
        Ok(())
    }

    /// Changes the move policy for all later moves.
    pub fn set_move_policy(&mut self, policy: MovePolicy) {
        self.config.move_policy = policy;
    }
}

impl Default for PlayEngine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
