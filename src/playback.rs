//! Playback state and the small value types around it.

use crate::config::{
    DEFAULT_PLAYBACK_RATE, DEFAULT_VOLUME, MAX_PLAYBACK_RATE, MAX_VOLUME, MIN_PLAYBACK_RATE,
    MIN_VOLUME,
};

/// Volume level on the slider's 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume(f64);

impl Volume {
    /// Creates a volume level, clamping to `0..=100`. NaN maps to silence.
    pub fn new(volume: f64) -> Self {
        if volume.is_nan() {
            return Self(MIN_VOLUME);
        }
        Self(volume.clamp(MIN_VOLUME, MAX_VOLUME))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Linear multiplier in `0.0..=1.0`, as expected by the audio sink.
    pub fn linear(self) -> f64 {
        self.0 / MAX_VOLUME
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(DEFAULT_VOLUME)
    }
}

/// Playback speed multiplier, kept within `1.0..=3.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    /// Creates a playback rate, clamping to the supported range. NaN maps to 1x.
    pub fn new(rate: f64) -> Self {
        if rate.is_nan() {
            return Self(DEFAULT_PLAYBACK_RATE);
        }
        Self(rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self(DEFAULT_PLAYBACK_RATE)
    }
}

/// Everything the page shows about the current playback.
///
/// `position_ms` never exceeds `duration_ms`, and `duration_ms` is at least 1
/// so the slider fraction is always defined.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_dragging: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub volume: Volume,
    pub rate: PlaybackRate,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_dragging: false,
            position_ms: 0,
            duration_ms: 1,
            volume: Volume::default(),
            rate: PlaybackRate::default(),
        }
    }
}

impl PlaybackState {
    /// Store a duration reported by the media, falling back to 1 when unknown.
    pub fn set_duration(&mut self, duration_ms: Option<u64>) {
        self.duration_ms = known_duration(duration_ms);
        self.position_ms = self.position_ms.min(self.duration_ms);
    }

    pub fn set_position(&mut self, position_ms: u64) {
        self.position_ms = position_ms.min(self.duration_ms);
    }

    /// Position corresponding to a slider fraction.
    pub fn position_at(&self, fraction: f64) -> u64 {
        position_at(fraction, self.duration_ms)
    }

    /// Current slider fraction, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        fraction(self.position_ms, self.duration_ms)
    }

    /// `"mm:ss / mm:ss"`.
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.position_ms),
            format_time(self.duration_ms)
        )
    }
}

/// Unknown and zero durations both become 1.
pub fn known_duration(duration_ms: Option<u64>) -> u64 {
    duration_ms.filter(|&d| d > 0).unwrap_or(1)
}

/// Format milliseconds as `mm:ss`. Minutes keep counting past 59.
pub fn format_time(milliseconds: u64) -> String {
    let seconds = milliseconds / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// `position / duration`, clamped to `[0, 1]`; zero duration reads as empty.
pub fn fraction(position_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (position_ms as f64 / duration_ms as f64).clamp(0.0, 1.0)
}

/// Position at `fraction` of `duration_ms`, truncated to whole milliseconds.
pub fn position_at(fraction: f64, duration_ms: u64) -> u64 {
    if !fraction.is_finite() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * duration_ms as f64) as u64
}
