//! Clip data model: per-bone raw transform tracks plus named scalar curves.
//!
//! Channel invariant (checked by `Clip::validate`): each of a track's three
//! key sequences is empty, length 1 (constant), or one key per frame. `fill`
//! pads short non-empty channels by repeating the last key, which callers
//! request explicitly when they need uniform-length channels.

use std::sync::Arc;

use clipforge_api_core::{CoreError, Transform};
use glam::{Quat, Vec3};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::curve::ScalarCurve;
use crate::skeleton::Skeleton;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneTrack {
    pub translation_keys: Vec<Vec3>,
    pub rotation_keys: Vec<Quat>,
    pub scale_keys: Vec<Vec3>,
}

impl BoneTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames this track covers: the longest channel.
    pub fn effective_len(&self) -> usize {
        self.translation_keys
            .len()
            .max(self.rotation_keys.len())
            .max(self.scale_keys.len())
    }

    pub fn is_empty(&self) -> bool {
        self.effective_len() == 0
    }

    /// Assemble the transform at `frame`. Short channels clamp to their last
    /// key; missing channels contribute the identity component.
    pub fn transform_at(&self, frame: usize) -> Transform {
        let mut out = Transform::IDENTITY;
        if let Some(t) = pick(&self.translation_keys, frame) {
            out.translation = *t;
        }
        if let Some(r) = pick(&self.rotation_keys, frame) {
            out.rotation = r.normalize();
        }
        if let Some(s) = pick(&self.scale_keys, frame) {
            out.scale = *s;
        }
        out
    }

    /// Append a key to all three channels.
    pub fn push(&mut self, transform: &Transform) {
        self.translation_keys.push(transform.translation);
        self.rotation_keys.push(transform.rotation);
        self.scale_keys.push(transform.scale);
    }

    /// Overwrite the key at `frame` on every channel that has it; a channel
    /// exactly one short is appended to instead.
    pub fn set_key(&mut self, frame: usize, transform: &Transform) {
        set_or_append(&mut self.translation_keys, frame, transform.translation);
        set_or_append(&mut self.rotation_keys, frame, transform.rotation);
        set_or_append(&mut self.scale_keys, frame, transform.scale);
    }

    /// Pad non-empty channels shorter than `len` by repeating their last key.
    pub fn fill(&mut self, len: usize) {
        pad(&mut self.translation_keys, len);
        pad(&mut self.rotation_keys, len);
        pad(&mut self.scale_keys, len);
    }

    pub fn filled(&self, len: usize) -> Self {
        let mut copy = self.clone();
        copy.fill(len);
        copy
    }

    /// Reverse all three channels independently.
    pub fn reversed(&self) -> Self {
        let mut copy = self.clone();
        copy.translation_keys.reverse();
        copy.rotation_keys.reverse();
        copy.scale_keys.reverse();
        copy
    }

    pub fn clear(&mut self) {
        self.translation_keys.clear();
        self.rotation_keys.clear();
        self.scale_keys.clear();
    }
}

fn pick<T>(keys: &[T], frame: usize) -> Option<&T> {
    if keys.is_empty() {
        None
    } else {
        Some(&keys[frame.min(keys.len() - 1)])
    }
}

fn set_or_append<T: Copy>(keys: &mut Vec<T>, frame: usize, value: T) {
    if frame < keys.len() {
        keys[frame] = value;
    } else if frame == keys.len() {
        keys.push(value);
    }
}

fn pad<T: Copy>(keys: &mut Vec<T>, len: usize) {
    if let Some(&last) = keys.last() {
        while keys.len() < len {
            keys.push(last);
        }
    }
}

/// A full animation: skeleton reference, duration, frame count, one track per
/// animated bone, and named scalar curves. `mark_modified` is the commit
/// operation the host watches to persist and re-derive compressed data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    skeleton: Arc<Skeleton>,
    duration: f32,
    frame_count: usize,
    track_names: Vec<String>,
    tracks: Vec<BoneTrack>,
    curves: HashMap<String, ScalarCurve>,
    #[serde(skip)]
    modified: bool,
}

impl Clip {
    pub fn new(
        skeleton: Arc<Skeleton>,
        name: impl Into<String>,
        duration: f32,
        frame_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            skeleton,
            duration: duration.max(0.0),
            frame_count,
            track_names: Vec::new(),
            tracks: Vec::new(),
            curves: HashMap::new(),
            modified: false,
        }
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn num_frames(&self) -> usize {
        self.frame_count
    }

    /// Seconds between consecutive frames; 0 for clips with fewer than two
    /// frames.
    pub fn frame_time(&self) -> f32 {
        if self.frame_count > 1 {
            self.duration / (self.frame_count - 1) as f32
        } else {
            0.0
        }
    }

    /// Time of `frame`, clamped so the final frame lands exactly on the
    /// duration.
    pub fn time_at_frame(&self, frame: usize) -> f32 {
        if self.frame_count == 0 {
            return 0.0;
        }
        if frame >= self.frame_count - 1 {
            self.duration
        } else {
            (frame as f32 * self.frame_time()).clamp(0.0, self.duration)
        }
    }

    pub fn frame_at_time(&self, time: f32) -> usize {
        let ft = self.frame_time();
        if ft <= 0.0 {
            return 0;
        }
        let frame = (time.clamp(0.0, self.duration) / ft).round() as usize;
        frame.min(self.frame_count.saturating_sub(1))
    }

    /// Adjust duration/frame count after a retime; tracks are left to the
    /// caller, which has just rewritten them.
    pub fn resize_frames(&mut self, duration: f32, frame_count: usize) {
        self.duration = duration.max(0.0);
        self.frame_count = frame_count;
    }

    pub fn track_names(&self) -> &[String] {
        &self.track_names
    }

    pub fn track_index(&self, bone_name: &str) -> Option<usize> {
        self.track_names.iter().position(|n| n == bone_name)
    }

    pub fn track_by_index(&self, index: usize) -> Option<&BoneTrack> {
        self.tracks.get(index)
    }

    pub fn bone_track(&self, bone_name: &str) -> Option<&BoneTrack> {
        self.track_index(bone_name).map(|i| &self.tracks[i])
    }

    pub fn bone_track_mut(&mut self, bone_name: &str) -> Option<&mut BoneTrack> {
        self.track_index(bone_name).map(|i| &mut self.tracks[i])
    }

    /// Copy out a bone's track, optionally with fill semantics (short
    /// channels padded to the clip's frame count).
    pub fn get_track(&self, bone_name: &str, fill: bool) -> Option<BoneTrack> {
        self.bone_track(bone_name).map(|t| {
            if fill {
                t.filled(self.frame_count)
            } else {
                t.clone()
            }
        })
    }

    /// Write a bone's track, creating it when the bone exists in the
    /// skeleton. Returns false (and leaves the clip untouched) for unknown
    /// bones.
    pub fn set_track(&mut self, bone_name: &str, track: BoneTrack) -> bool {
        if let Some(i) = self.track_index(bone_name) {
            self.tracks[i] = track;
            return true;
        }
        if self.skeleton.bone_index(bone_name).is_none() {
            log::warn!("set_track: bone '{bone_name}' not in skeleton, ignoring");
            return false;
        }
        self.track_names.push(bone_name.to_string());
        self.tracks.push(track);
        true
    }

    pub fn add_track(&mut self, bone_name: &str) -> bool {
        if self.track_index(bone_name).is_some() {
            return true;
        }
        self.set_track(bone_name, BoneTrack::new())
    }

    pub fn remove_track(&mut self, bone_name: &str) -> Option<BoneTrack> {
        let i = self.track_index(bone_name)?;
        self.track_names.remove(i);
        Some(self.tracks.remove(i))
    }

    pub fn root_track(&self) -> Option<&BoneTrack> {
        self.bone_track(self.skeleton.root_name())
    }

    pub fn curve(&self, name: &str) -> Option<&ScalarCurve> {
        self.curves.get(name)
    }

    pub fn curve_mut(&mut self, name: &str) -> Option<&mut ScalarCurve> {
        self.curves.get_mut(name)
    }

    /// Insert or replace a named curve, returning a mutable handle.
    pub fn curve_entry(&mut self, name: &str) -> &mut ScalarCurve {
        self.curves.entry(name.to_string()).or_default()
    }

    pub fn set_curve(&mut self, name: impl Into<String>, curve: ScalarCurve) {
        self.curves.insert(name.into(), curve);
    }

    pub fn remove_curve(&mut self, name: &str) -> Option<ScalarCurve> {
        self.curves.remove(name)
    }

    pub fn curve_names(&self) -> Vec<&str> {
        self.curves.keys().map(|s| s.as_str()).collect()
    }

    /// Commit: flag the clip so the host persists modified tracks/curves.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Parse a clip from its JSON representation (the fixture/interchange
    /// format). Skeleton validation runs as part of deserialization.
    pub fn from_json(text: &str) -> Result<Clip, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    /// Export the clip as a JSON value (stable schema for interchange).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Channel-shape invariant: every non-empty channel is length 1 or one
    /// key per frame.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.frame_count == 0 {
            return Err(CoreError::EmptyClip);
        }
        for (name, track) in self.track_names.iter().zip(&self.tracks) {
            for len in [
                track.translation_keys.len(),
                track.rotation_keys.len(),
                track.scale_keys.len(),
            ] {
                if len > 1 && len != self.frame_count {
                    return Err(CoreError::InvalidSkeleton(format!(
                        "track '{name}' channel has {len} keys for {} frames",
                        self.frame_count
                    )));
                }
            }
        }
        Ok(())
    }
}
