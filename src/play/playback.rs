//! Playback: the STOPPED/PLAYING transport and the time sampler.
//!
//! Time maps onto transitions between consecutive frames. The transition
//! into frame `k` (from frame `k - 1`) lasts `frames[k].duration`
//! milliseconds, so a play with `n` frames runs for the sum of the durations
//! of frames `1..n`. Easing is linear.
//!
//! Sampling never writes back into the document: interpolated positions are
//! a view for the renderer only.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::model::Frame;

/// Transport state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
}

/// Where the playhead sits: between `source` and `target` at `fraction`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    pub source: usize,
    pub target: usize,
    /// Progress of the transition in [0, 1].
    pub fraction: f64,
}

impl FrameSample {
    /// A sample resting exactly on one frame.
    pub fn at_rest(index: usize) -> Self {
        Self {
            source: index,
            target: index,
            fraction: 0.0,
        }
    }
}

/// Interpolated render state of one token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPose {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
}

/// Length of the animated timeline in milliseconds.
pub fn timeline_duration_ms(frames: &[Arc<Frame>]) -> f64 {
    frames.iter().skip(1).map(|f| f64::from(f.duration)).sum()
}

/// Maps a playhead time onto a frame transition.
///
/// Times past the end clamp to the last frame unless `looping`, in which
/// case they wrap. Returns `None` for an empty sequence.
pub fn sample_at(frames: &[Arc<Frame>], time_ms: f64, looping: bool) -> Option<FrameSample> {
    let last = frames.len().checked_sub(1)?;
    let total = timeline_duration_ms(frames);
    if last == 0 || total <= 0.0 {
        return Some(FrameSample::at_rest(0));
    }

    let mut time = time_ms.max(0.0);
    if time >= total {
        if !looping {
            return Some(FrameSample::at_rest(last));
        }
        time %= total;
    }

    let mut elapsed = 0.0;
    for target in 1..=last {
        let span = f64::from(frames[target].duration);
        if time < elapsed + span {
            return Some(FrameSample {
                source: target - 1,
                target,
                fraction: (time - elapsed) / span,
            });
        }
        elapsed += span;
    }
    Some(FrameSample::at_rest(last))
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Token poses for a sample, sorted by id.
///
/// Tokens present in the source but missing from the target are held at
/// their source position; tokens only in the target are skipped.
pub fn interpolate(frames: &[Arc<Frame>], sample: &FrameSample) -> Vec<ObjectPose> {
    let (Some(source), Some(target)) = (frames.get(sample.source), frames.get(sample.target))
    else {
        return Vec::new();
    };

    let t = sample.fraction.clamp(0.0, 1.0);
    let mut poses: Vec<ObjectPose> = source
        .objects
        .values()
        .map(|from| match target.objects.get(&from.id) {
            Some(to) => ObjectPose {
                id: from.id.clone(),
                x: lerp(from.x, to.x, t),
                y: lerp(from.y, to.y, t),
                rotation: lerp(from.rotation, to.rotation, t),
            },
            None => ObjectPose {
                id: from.id.clone(),
                x: from.x,
                y: from.y,
                rotation: from.rotation,
            },
        })
        .collect();
    poses.sort_by(|a, b| a.id.cmp(&b.id));
    poses
}

/// Transport: status, playhead, loop flag and speed multiplier.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    status: PlaybackStatus,
    /// Playhead in timeline milliseconds.
    time_ms: f64,
    looping: bool,
    /// 1.0 = real time.
    speed: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    /// Stopped at time 0, no loop, normal speed.
    pub fn new() -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            time_ms: 0.0,
            looping: false,
            speed: 1.0,
        }
    }

    /// Starts playing from the playhead. A play with fewer than two frames has
    /// nothing to animate and stays stopped. Returns whether playback started.
    pub fn play(&mut self, frames: &[Arc<Frame>]) -> bool {
        if timeline_duration_ms(frames) <= 0.0 {
            log::debug!("play ignored: nothing to animate ({} frames)", frames.len());
            return false;
        }
        if self.time_ms >= timeline_duration_ms(frames) {
            self.time_ms = 0.0;
        }
        self.status = PlaybackStatus::Playing;
        log::debug!("playback started at {} ms (speed {})", self.time_ms, self.speed);
        true
    }

    /// Stops playback, keeping the playhead where it is.
    pub fn stop(&mut self) {
        if self.status == PlaybackStatus::Playing {
            log::debug!("playback stopped at {} ms", self.time_ms);
        }
        self.status = PlaybackStatus::Stopped;
    }

    /// STOPPED -> PLAYING or PLAYING -> STOPPED.
    pub fn toggle(&mut self, frames: &[Arc<Frame>]) -> PlaybackStatus {
        match self.status {
            PlaybackStatus::Playing => self.stop(),
            PlaybackStatus::Stopped => {
                self.play(frames);
            }
        }
        self.status
    }

    /// Advances the clock by `delta_ms` of wall time and samples.
    ///
    /// Returns `None` while stopped. Reaching the end without loop stops
    /// playback and returns the final resting sample.
    pub fn tick(&mut self, frames: &[Arc<Frame>], delta_ms: f64) -> Option<FrameSample> {
        if self.status != PlaybackStatus::Playing {
            return None;
        }

        let total = timeline_duration_ms(frames);
        if total <= 0.0 {
            self.stop();
            return None;
        }

        self.time_ms += delta_ms.max(0.0) * self.speed;
        if self.time_ms >= total {
            if self.looping {
                self.time_ms %= total;
            } else {
                self.time_ms = total;
                self.stop();
                log::debug!("playback reached end of sequence");
            }
        }
        sample_at(frames, self.time_ms, self.looping)
    }

    /// Moves the playhead to the start of `frame_index`. Scrubbing always
    /// stops playback.
    pub fn seek_to_frame(&mut self, frames: &[Arc<Frame>], frame_index: usize) {
        self.stop();
        self.time_ms = frames
            .iter()
            .take(frame_index + 1)
            .skip(1)
            .map(|f| f64::from(f.duration))
            .sum();
    }

    /// Rewinds to 0 without changing status.
    pub fn rewind(&mut self) {
        self.time_ms = 0.0;
    }

    /// Enables or disables wrap-around at the end.
    pub fn set_loop(&mut self, enabled: bool) {
        self.looping = enabled;
        log::debug!("loop {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Sets the speed multiplier, clamped to [0.1, 16.0].
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_finite() { speed.clamp(0.1, 16.0) } else { 1.0 };
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::play::model::{ObjectKind, PlayObject};

    fn two_frame_play() -> Vec<Arc<Frame>> {
        let mut a = Frame::new();
        a.objects.insert(
            "p1".into(),
            PlayObject::new("p1", ObjectKind::OffensePlayer, 0.0, 0.0),
        );
        let mut b = a.clone();
        b.id = "b".into();
        b.objects.get_mut("p1").unwrap().x = 100.0;
        vec![Arc::new(a), Arc::new(b)]
    }

    #[test]
    fn test_midpoint_sample_is_exact() {
        let frames = two_frame_play();
        let sample = sample_at(&frames, 250.0, false).unwrap();
        assert_eq!(sample.source, 0);
        assert_eq!(sample.target, 1);
        assert_eq!(sample.fraction, 0.5);

        let poses = interpolate(&frames, &sample);
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].x, 50.0);
        assert_eq!(poses[0].y, 0.0);
    }

    #[test]
    fn test_uses_target_frame_duration() {
        let mut frames = two_frame_play();
        let mut c = (*frames[1]).clone();
        c.duration = 1000;
        frames.push(Arc::new(c));

        assert_eq!(timeline_duration_ms(&frames), 1500.0);
        let sample = sample_at(&frames, 1000.0, false).unwrap();
        assert_eq!((sample.source, sample.target), (1, 2));
        assert_eq!(sample.fraction, 0.5);
    }

    #[test]
    fn test_past_end_clamps_or_wraps() {
        let frames = two_frame_play();
        assert_eq!(sample_at(&frames, 900.0, false), Some(FrameSample::at_rest(1)));

        let wrapped = sample_at(&frames, 600.0, true).unwrap();
        assert_eq!(wrapped.source, 0);
        assert!((wrapped.fraction - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_single_frame_rests() {
        let frames = vec![Arc::new(Frame::new())];
        assert_eq!(sample_at(&frames, 100.0, true), Some(FrameSample::at_rest(0)));
        assert!(sample_at(&[], 0.0, false).is_none());
    }

    #[test]
    fn test_missing_target_token_is_held() {
        let mut frames = two_frame_play();
        Arc::make_mut(&mut frames[1]).objects.clear();
        let poses = interpolate(&frames, &FrameSample { source: 0, target: 1, fraction: 0.5 });
        assert_eq!(poses[0].x, 0.0);
    }

    #[test]
    fn test_token_only_in_target_is_skipped() {
        let mut frames = two_frame_play();
        Arc::make_mut(&mut frames[1]).objects.insert(
            "ball".into(),
            PlayObject::new("ball", ObjectKind::Ball, 5.0, 5.0),
        );
        let poses = interpolate(&frames, &FrameSample { source: 0, target: 1, fraction: 0.5 });
        assert_eq!(poses.len(), 1);
    }

    #[test]
    fn test_tick_stops_at_end_without_loop() {
        let frames = two_frame_play();
        let mut pb = PlaybackState::new();
        assert!(pb.play(&frames));

        let s = pb.tick(&frames, 250.0).unwrap();
        assert_eq!(s.fraction, 0.5);
        assert!(pb.is_playing());

        let s = pb.tick(&frames, 400.0).unwrap();
        assert_eq!(s, FrameSample::at_rest(1));
        assert_eq!(pb.status(), PlaybackStatus::Stopped);
        assert!(pb.tick(&frames, 10.0).is_none());
    }

    #[test]
    fn test_tick_wraps_with_loop() {
        let frames = two_frame_play();
        let mut pb = PlaybackState::new();
        pb.set_loop(true);
        pb.play(&frames);
        let s = pb.tick(&frames, 600.0).unwrap();
        assert!(pb.is_playing());
        assert_eq!(s.source, 0);
        assert!((pb.time_ms() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_play_restarts_after_end() {
        let frames = two_frame_play();
        let mut pb = PlaybackState::new();
        pb.play(&frames);
        pb.tick(&frames, 1000.0);
        assert!(!pb.is_playing());
        assert!(pb.play(&frames));
        assert_eq!(pb.time_ms(), 0.0);
    }

    #[test]
    fn test_single_frame_cannot_play() {
        let frames = vec![Arc::new(Frame::new())];
        let mut pb = PlaybackState::new();
        assert_eq!(pb.toggle(&frames), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_speed_scales_time_and_is_clamped() {
        let frames = two_frame_play();
        let mut pb = PlaybackState::new();
        pb.set_speed(2.0);
        pb.play(&frames);
        assert_eq!(pb.tick(&frames, 125.0).unwrap().fraction, 0.5);

        pb.set_speed(100.0);
        assert_eq!(pb.speed(), 16.0);
        pb.set_speed(f64::NAN);
        assert_eq!(pb.speed(), 1.0);
    }

    #[test]
    fn test_seek_stops_and_moves_playhead() {
        let frames = two_frame_play();
        let mut pb = PlaybackState::new();
        pb.play(&frames);
        pb.seek_to_frame(&frames, 1);
        assert!(!pb.is_playing());
        assert_eq!(pb.time_ms(), 500.0);
    }
}
