//! WASM bindings for the play module.
//!
//! `JsPlayEngine` wraps `PlayEngine` for the browser. Library operations take
//! any object with the Web Storage interface (`window.localStorage` works as
//! is).

use js_sys::{Array, Function, Promise, Reflect};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::config::EngineConfig;
use super::engine::{AlignEdge, DistributeAxis, PlayEngine};
use super::formation::presets;
use super::model::{
    generate_id, Annotation, CourtType, ObjectKind, PlayObject, ShapeObject, TextAnnotation,
};
use crate::error::{PlayError, StoreError, StoreResult};
use crate::library::{KeyValueStore, PlayLibrary, Roster, RosterPlayer};

/// Serialize a value to JsValue with HashMaps as plain JS objects (not Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::new().serialize_maps_as_objects(true))
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

impl From<PlayError> for JsValue {
    fn from(err: PlayError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

/// Helper macro for Result conversion
macro_rules! js_result {
    ($expr:expr) => {
        $expr.map_err(|e: PlayError| JsValue::from(e))
    };
}

fn decode<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_js_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Calls `callback(value)` on the next microtask. The engine call that
/// produced the event has returned by then, so the listener may call back
/// into the engine.
fn deliver_later(callback: Function, value: JsValue) {
    let deliver = Closure::once(move |_: JsValue| {
        if let Err(err) = callback.call1(&JsValue::NULL, &value) {
            log::warn!("event listener threw: {:?}", err);
        }
    });
    let _ = Promise::resolve(&JsValue::UNDEFINED).then(&deliver);
    deliver.forget();
}

// =============================================================================
// WEB STORAGE GATEWAY
// =============================================================================

fn js_store_error(err: JsValue) -> StoreError {
    let msg = err.as_string().unwrap_or_else(|| format!("{err:?}"));
    StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, msg))
}

/// `KeyValueStore` over a JS object exposing `getItem`, `setItem`,
/// `removeItem`, `key` and `length`.
struct WebStorage {
    target: JsValue,
}

impl WebStorage {
    fn call(&self, method: &str, args: &[JsValue]) -> StoreResult<JsValue> {
        let func: Function = Reflect::get(&self.target, &JsValue::from_str(method))
            .map_err(js_store_error)?
            .dyn_into()
            .map_err(|_| js_store_error(JsValue::from_str(&format!("storage has no {method}()"))))?;
        let args: Array = args.iter().collect();
        func.apply(&self.target, &args).map_err(js_store_error)
    }
}

impl KeyValueStore for WebStorage {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.call("getItem", &[JsValue::from_str(key)])?.as_string())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.call("setItem", &[JsValue::from_str(key), JsValue::from_str(value)])?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.call("removeItem", &[JsValue::from_str(key)])?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let length = Reflect::get(&self.target, &JsValue::from_str("length"))
            .map_err(js_store_error)?
            .as_f64()
            .unwrap_or(0.0) as u32;
        let mut keys = Vec::new();
        for i in 0..length {
            if let Some(key) = self.call("key", &[JsValue::from(i)])?.as_string() {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn library(storage: JsValue) -> PlayLibrary<WebStorage> {
    PlayLibrary::new(WebStorage { target: storage })
}

// =============================================================================
// MAIN WRAPPER TYPE
// =============================================================================

/// JavaScript-friendly wrapper around PlayEngine.
#[wasm_bindgen]
pub struct JsPlayEngine {
    inner: PlayEngine,
}

#[wasm_bindgen]
impl JsPlayEngine {
    /// Creates an engine. `config` is an optional `EngineConfig` object.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const engine = new JsPlayEngine({ movePolicy: "forward" });
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<JsPlayEngine, JsValue> {
        let config: EngineConfig = if config.is_undefined() || config.is_null() {
            EngineConfig::default()
        } else {
            decode(config)?
        };
        js_result!(config.validate())?;
        Ok(JsPlayEngine {
            inner: PlayEngine::with_config(config),
        })
    }

    /// Whole document as a plain JS object.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        encode(self.inner.play())
    }

    #[wasm_bindgen(js_name = getCurrentFrame)]
    pub fn get_current_frame(&self) -> Result<JsValue, JsValue> {
        encode(self.inner.current_frame())
    }

    #[wasm_bindgen(js_name = currentFrameIndex)]
    pub fn current_frame_index(&self) -> usize {
        self.inner.current_frame_index()
    }

    #[wasm_bindgen(js_name = frameCount)]
    pub fn frame_count(&self) -> usize {
        self.inner.frame_count()
    }

    #[wasm_bindgen(js_name = getSelection)]
    pub fn get_selection(&self) -> Array {
        self.inner
            .selected_ids()
            .iter()
            .map(|id| JsValue::from_str(id))
            .collect()
    }

    /// Calls `callback(event)` after every change, once the changing call
    /// has returned. Returns a subscription id.
    pub fn subscribe(&mut self, callback: Function) -> f64 {
        let id = self.inner.subscribe(move |event| match to_js_value(event) {
            Ok(value) => deliver_later(callback.clone(), value),
            Err(e) => log::warn!("could not encode {:?}: {}", event, e),
        });
        id as f64
    }

    pub fn unsubscribe(&mut self, id: f64) -> bool {
        self.inner.unsubscribe(id as u64)
    }
}

// =============================================================================
// TOKEN OPERATIONS
// =============================================================================

#[wasm_bindgen]
impl JsPlayEngine {
    /// Adds a full token object (`{id, type, x, y, ...}`).
    #[wasm_bindgen(js_name = addObject)]
    pub fn add_object(&mut self, object: JsValue) -> Result<(), JsValue> {
        let object: PlayObject = decode(object)?;
        js_result!(self.inner.add_object(object))
    }

    /// Spawns a token of `kind` at (x, y) and returns its new id.
    #[wasm_bindgen(js_name = spawnObject)]
    pub fn spawn_object(&mut self, kind: &str, x: f64, y: f64) -> Result<String, JsValue> {
        let kind: ObjectKind = decode(JsValue::from_str(kind))?;
        let object = PlayObject::new(generate_id(), kind, x, y);
        let id = object.id.clone();
        js_result!(self.inner.add_object(object))?;
        Ok(id)
    }

    #[wasm_bindgen(js_name = deleteObject)]
    pub fn delete_object(&mut self, id: &str) -> bool {
        self.inner.delete_object(id)
    }

    #[wasm_bindgen(js_name = deleteSelectedObjects)]
    pub fn delete_selected_objects(&mut self) -> bool {
        self.inner.delete_selected_objects()
    }

    #[wasm_bindgen(js_name = moveObject)]
    pub fn move_object(
        &mut self,
        frame_index: usize,
        id: &str,
        x: f64,
        y: f64,
    ) -> Result<bool, JsValue> {
        js_result!(self.inner.move_object(frame_index, id, x, y))
    }

    #[wasm_bindgen(js_name = setObjectLabel)]
    pub fn set_object_label(&mut self, id: &str, label: Option<String>) -> bool {
        self.inner.set_object_label(id, label)
    }

    #[wasm_bindgen(js_name = setObjectColor)]
    pub fn set_object_color(&mut self, id: &str, color: Option<String>) -> bool {
        self.inner.set_object_color(id, color)
    }

    #[wasm_bindgen(js_name = setObjectRotation)]
    pub fn set_object_rotation(&mut self, id: &str, degrees: f64) -> bool {
        self.inner.set_object_rotation(id, degrees)
    }

    #[wasm_bindgen(js_name = setObjectSize)]
    pub fn set_object_size(&mut self, id: &str, width: f64, height: f64) -> bool {
        self.inner.set_object_size(id, width, height)
    }
}

// =============================================================================
// ANNOTATIONS, TEXT, SHAPES
// =============================================================================

#[wasm_bindgen]
impl JsPlayEngine {
    #[wasm_bindgen(js_name = addAnnotation)]
    pub fn add_annotation(&mut self, annotation: JsValue) -> Result<(), JsValue> {
        let annotation: Annotation = decode(annotation)?;
        js_result!(self.inner.add_annotation(annotation))
    }

    #[wasm_bindgen(js_name = deleteAnnotation)]
    pub fn delete_annotation(&mut self, id: &str) -> bool {
        self.inner.delete_annotation(id)
    }

    #[wasm_bindgen(js_name = addTextAnnotation)]
    pub fn add_text_annotation(&mut self, text: JsValue) -> Result<(), JsValue> {
        let text: TextAnnotation = decode(text)?;
        js_result!(self.inner.add_text_annotation(text))
    }

    /// Replaces a text label's fields with `text`; the id is kept.
    #[wasm_bindgen(js_name = updateTextAnnotation)]
    pub fn update_text_annotation(&mut self, id: &str, text: JsValue) -> Result<bool, JsValue> {
        let text: TextAnnotation = decode(text)?;
        Ok(self.inner.update_text_annotation(id, |t| *t = text))
    }

    #[wasm_bindgen(js_name = deleteTextAnnotation)]
    pub fn delete_text_annotation(&mut self, id: &str) -> bool {
        self.inner.delete_text_annotation(id)
    }

    #[wasm_bindgen(js_name = addShape)]
    pub fn add_shape(&mut self, shape: JsValue) -> Result<(), JsValue> {
        let shape: ShapeObject = decode(shape)?;
        js_result!(self.inner.add_shape(shape))
    }

    /// Replaces a shape's fields with `shape`; the id is kept.
    #[wasm_bindgen(js_name = updateShape)]
    pub fn update_shape(&mut self, id: &str, shape: JsValue) -> Result<bool, JsValue> {
        let shape: ShapeObject = decode(shape)?;
        Ok(self.inner.update_shape(id, |s| *s = shape))
    }

    #[wasm_bindgen(js_name = deleteShape)]
    pub fn delete_shape(&mut self, id: &str) -> bool {
        self.inner.delete_shape(id)
    }
}

// =============================================================================
// FRAMES & DOCUMENT
// =============================================================================

#[wasm_bindgen]
impl JsPlayEngine {
    #[wasm_bindgen(js_name = addFrame)]
    pub fn add_frame(&mut self) {
        self.inner.add_frame();
    }

    #[wasm_bindgen(js_name = duplicateFrame)]
    pub fn duplicate_frame(&mut self, index: usize) -> Result<(), JsValue> {
        js_result!(self.inner.duplicate_frame(index))
    }

    #[wasm_bindgen(js_name = deleteFrame)]
    pub fn delete_frame(&mut self, index: usize) -> Result<(), JsValue> {
        js_result!(self.inner.delete_frame(index))
    }

    #[wasm_bindgen(js_name = setCurrentFrame)]
    pub fn set_current_frame(&mut self, index: usize) -> Result<(), JsValue> {
        js_result!(self.inner.set_current_frame(index))
    }

    #[wasm_bindgen(js_name = stepForward)]
    pub fn step_forward(&mut self) -> bool {
        self.inner.step_forward()
    }

    #[wasm_bindgen(js_name = stepBackward)]
    pub fn step_backward(&mut self) -> bool {
        self.inner.step_backward()
    }

    #[wasm_bindgen(js_name = setFrameDuration)]
    pub fn set_frame_duration(&mut self, index: usize, duration_ms: u32) -> Result<(), JsValue> {
        js_result!(self.inner.set_frame_duration(index, duration_ms))
    }

    #[wasm_bindgen(js_name = setPlayName)]
    pub fn set_play_name(&mut self, name: &str) {
        self.inner.set_play_name(name);
    }

    #[wasm_bindgen(js_name = clearCanvas)]
    pub fn clear_canvas(&mut self) {
        self.inner.clear_canvas();
    }

    #[wasm_bindgen(js_name = newPlay)]
    pub fn new_play(&mut self) {
        self.inner.new_play();
    }
}

// =============================================================================
// SELECTION, LAYOUT, CLIPBOARD, HISTORY
// =============================================================================

#[wasm_bindgen]
impl JsPlayEngine {
    #[wasm_bindgen(js_name = selectObject)]
    pub fn select_object(&mut self, id: &str) -> bool {
        self.inner.select_object(id)
    }

    #[wasm_bindgen(js_name = selectObjects)]
    pub fn select_objects(&mut self, ids: Vec<String>) {
        self.inner.select_objects(ids);
    }

    #[wasm_bindgen(js_name = toggleObjectSelection)]
    pub fn toggle_object_selection(&mut self, id: &str) -> bool {
        self.inner.toggle_object_selection(id)
    }

    #[wasm_bindgen(js_name = selectAllObjects)]
    pub fn select_all_objects(&mut self) {
        self.inner.select_all_objects();
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.inner.clear_selection();
    }

    /// `edge` is one of "left", "right", "top", "bottom", "center-h", "center-v".
    #[wasm_bindgen(js_name = alignObjects)]
    pub fn align_objects(&mut self, edge: &str) -> Result<(), JsValue> {
        let edge: AlignEdge = decode(JsValue::from_str(edge))?;
        js_result!(self.inner.align_objects(edge))
    }

    /// `axis` is "horizontal" or "vertical".
    #[wasm_bindgen(js_name = distributeObjects)]
    pub fn distribute_objects(&mut self, axis: &str) -> Result<(), JsValue> {
        let axis: DistributeAxis = decode(JsValue::from_str(axis))?;
        js_result!(self.inner.distribute_objects(axis))
    }

    #[wasm_bindgen(js_name = applyFormationPreset)]
    pub fn apply_formation_preset(&mut self, preset_id: &str) -> Result<Vec<String>, JsValue> {
        js_result!(self.inner.apply_formation_preset(preset_id))
    }

    /// Every built-in formation preset.
    #[wasm_bindgen(js_name = getPresets)]
    pub fn get_presets(&self) -> Result<JsValue, JsValue> {
        encode(&presets())
    }

    #[wasm_bindgen(js_name = copyObject)]
    pub fn copy_object(&mut self, id: &str) -> bool {
        self.inner.copy_object(id)
    }

    #[wasm_bindgen(js_name = copySelection)]
    pub fn copy_selection(&mut self) -> bool {
        self.inner.copy_selection()
    }

    #[wasm_bindgen(js_name = pasteObject)]
    pub fn paste_object(&mut self) -> Option<String> {
        self.inner.paste_object()
    }

    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.inner.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }

    #[wasm_bindgen(js_name = beginGesture)]
    pub fn begin_gesture(&mut self, label: &str) {
        self.inner.begin_gesture(label);
    }

    #[wasm_bindgen(js_name = endGesture)]
    pub fn end_gesture(&mut self) -> bool {
        self.inner.end_gesture()
    }
}

// =============================================================================
// PLAYBACK
// =============================================================================

#[wasm_bindgen]
impl JsPlayEngine {
    /// Returns true if now playing.
    #[wasm_bindgen(js_name = togglePlayback)]
    pub fn toggle_playback(&mut self) -> bool {
        self.inner.toggle_playback() == super::playback::PlaybackStatus::Playing
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.inner.playback().is_playing()
    }

    /// Advances the clock and returns `{sample, poses}`, or null while stopped.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// function frame(now) {
    ///   const out = engine.tick(now - last);
    ///   if (out) render(out.poses);
    ///   last = now;
    ///   requestAnimationFrame(frame);
    /// }
    /// ```
    pub fn tick(&mut self, delta_ms: f64) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        struct TickOutput<'a> {
            sample: &'a super::playback::FrameSample,
            poses: Vec<super::playback::ObjectPose>,
        }

        match self.inner.tick(delta_ms) {
            Some(sample) => encode(&TickOutput {
                sample: &sample,
                poses: self.inner.poses(&sample),
            }),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = setLoop)]
    pub fn set_loop(&mut self, enabled: bool) {
        self.inner.set_loop(enabled);
    }

    #[wasm_bindgen(js_name = setPlaybackSpeed)]
    pub fn set_playback_speed(&mut self, speed: f64) {
        self.inner.set_playback_speed(speed);
    }
}

// =============================================================================
// LIBRARY & FILES
// =============================================================================

#[wasm_bindgen]
impl JsPlayEngine {
    /// Saves into `storage` and returns the saved play.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const saved = engine.savePlay(window.localStorage);
    /// ```
    #[wasm_bindgen(js_name = savePlay)]
    pub fn save_play(&mut self, storage: JsValue) -> Result<JsValue, JsValue> {
        let mut lib = library(storage);
        let saved = js_result!(self.inner.save_play(&mut lib))?;
        encode(&saved)
    }

    #[wasm_bindgen(js_name = loadPlay)]
    pub fn load_play(&mut self, storage: JsValue, id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.load_play(&library(storage), id))
    }

    #[wasm_bindgen(js_name = deletePlay)]
    pub fn delete_play(&mut self, storage: JsValue, id: &str) -> Result<bool, JsValue> {
        js_result!(self.inner.delete_play(&mut library(storage), id))
    }

    /// Saved plays in `storage`, most recently updated first.
    #[wasm_bindgen(js_name = listPlays)]
    pub fn list_plays(&self, storage: JsValue) -> Result<JsValue, JsValue> {
        let plays = js_result!(library(storage).list_plays().map_err(PlayError::from))?;
        encode(&plays)
    }

    #[wasm_bindgen(js_name = setPlayCategory)]
    pub fn set_play_category(&mut self, category: &str) {
        self.inner.set_play_category(category);
    }

    #[wasm_bindgen(js_name = setPlayTags)]
    pub fn set_play_tags(&mut self, tags: Vec<String>) {
        self.inner.set_play_tags(tags);
    }

    #[wasm_bindgen(js_name = saveCurrent)]
    pub fn save_current(&self, storage: JsValue) -> Result<(), JsValue> {
        js_result!(self.inner.save_current(&mut library(storage)))
    }

    #[wasm_bindgen(js_name = restoreCurrent)]
    pub fn restore_current(&mut self, storage: JsValue) -> Result<bool, JsValue> {
        js_result!(self.inner.restore_current(&library(storage)))
    }

    /// The document as a pretty-printed play file.
    #[wasm_bindgen(js_name = exportPlay)]
    pub fn export_play(&self) -> Result<String, JsValue> {
        js_result!(self.inner.export_play().to_json_pretty())
    }

    #[wasm_bindgen(js_name = importPlay)]
    pub fn import_play(&mut self, json: &str) -> Result<(), JsValue> {
        js_result!(self.inner.import_play(json))
    }

    /// `"full"` or `"half"`.
    #[wasm_bindgen(js_name = courtType)]
    pub fn court_type(&self) -> Result<JsValue, JsValue> {
        encode(&self.inner.court_type())
    }

    #[wasm_bindgen(js_name = setCourtType)]
    pub fn set_court_type(&mut self, court_type: &str) -> Result<(), JsValue> {
        let court_type: CourtType = decode(JsValue::from_str(court_type))?;
        self.inner.set_court_type(court_type);
        Ok(())
    }
}

// =============================================================================
// ROSTERS & WORKSPACE
// =============================================================================

#[wasm_bindgen]
impl JsPlayEngine {
    /// Rosters and the autosave flag stored in `storage`.
    #[wasm_bindgen(js_name = getWorkspace)]
    pub fn get_workspace(&self, storage: JsValue) -> Result<JsValue, JsValue> {
        let workspace = js_result!(library(storage).load_workspace().map_err(PlayError::from))?;
        encode(&workspace)
    }

    #[wasm_bindgen(js_name = addRoster)]
    pub fn add_roster(&self, storage: JsValue, roster: JsValue) -> Result<(), JsValue> {
        let roster: Roster = decode(roster)?;
        js_result!(library(storage).add_roster(roster).map_err(PlayError::from))
    }

    #[wasm_bindgen(js_name = deleteRoster)]
    pub fn delete_roster(&self, storage: JsValue, id: &str) -> Result<bool, JsValue> {
        js_result!(library(storage).delete_roster(id).map_err(PlayError::from))
    }

    #[wasm_bindgen(js_name = addPlayerToRoster)]
    pub fn add_player_to_roster(
        &self,
        storage: JsValue,
        roster_id: &str,
        player: JsValue,
    ) -> Result<bool, JsValue> {
        let player: RosterPlayer = decode(player)?;
        js_result!(library(storage)
            .add_player_to_roster(roster_id, player)
            .map_err(PlayError::from))
    }

    #[wasm_bindgen(js_name = removePlayerFromRoster)]
    pub fn remove_player_from_roster(
        &self,
        storage: JsValue,
        roster_id: &str,
        player_id: &str,
    ) -> Result<bool, JsValue> {
        js_result!(library(storage)
            .remove_player_from_roster(roster_id, player_id)
            .map_err(PlayError::from))
    }

    #[wasm_bindgen(js_name = setAutoSaveEnabled)]
    pub fn set_auto_save_enabled(&self, storage: JsValue, enabled: bool) -> Result<(), JsValue> {
        js_result!(library(storage)
            .set_auto_save_enabled(enabled)
            .map_err(PlayError::from))
    }

    /// Drops a roster player onto the court. Returns the new token id, or
    /// `undefined` if the roster has no such player.
    #[wasm_bindgen(js_name = placeRosterPlayer)]
    pub fn place_roster_player(
        &mut self,
        storage: JsValue,
        roster_id: &str,
        player_id: &str,
        x: f64,
        y: f64,
    ) -> Result<Option<String>, JsValue> {
        let roster = js_result!(library(storage).get_roster(roster_id).map_err(PlayError::from))?;
        match roster {
            Some(roster) => js_result!(self.inner.place_roster_player(&roster, player_id, x, y)),
            None => Ok(None),
        }
    }
}
