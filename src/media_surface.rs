use crate::Error;
use crate::playback::{PlaybackRate, Volume};
use crate::video::Video;
use std::time::Duration;

/// The playback capabilities the controller drives.
///
/// Calls are expected to return promptly; none of them may block on decoding.
pub trait MediaSurface {
    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, position_ms: u64) -> Result<(), Error>;

    /// `None` while the position cannot be queried yet.
    fn current_position_ms(&self) -> Option<u64>;

    /// `None` when the media does not report a duration (live streams, not prerolled).
    fn duration_ms(&self) -> Option<u64>;

    fn is_completed(&mut self) -> bool;

    fn set_volume(&mut self, volume: Volume);

    fn set_playback_rate(&mut self, rate: PlaybackRate) -> Result<(), Error>;
}

impl MediaSurface for Video {
    fn play(&mut self) {
        Video::play(self);
    }

    fn pause(&mut self) {
        self.set_paused(true);
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), Error> {
        Video::seek(self, Duration::from_millis(position_ms), true)
    }

    fn current_position_ms(&self) -> Option<u64> {
        self.position().map(|p| p.as_millis() as u64)
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration().map(|d| d.as_millis() as u64)
    }

    fn is_completed(&mut self) -> bool {
        self.poll_bus();
        self.eos()
    }

    fn set_volume(&mut self, volume: Volume) {
        Video::set_volume(self, volume.linear());
    }

    fn set_playback_rate(&mut self, rate: PlaybackRate) -> Result<(), Error> {
        self.set_speed(rate.value())
    }
}
