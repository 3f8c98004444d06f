//! Playback controller: reacts to the page's widgets and to refresh ticks.
//!
//! The controller never schedules anything itself. Starting and stopping the
//! refresh loop is reported back to the caller as a [`LoopCommand`], and each
//! run of the loop carries a [`RefreshTicket`] so a tick from a loop that was
//! already stopped is recognised and dropped.

use crate::Error;
use crate::media_surface::MediaSurface;
use crate::playback::{PlaybackRate, PlaybackState, Volume};

/// Identifies one run of the refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

/// What the owner of the timer must do after a play/pause transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    Start(RefreshTicket),
    Stop,
}

/// Result of a refresh tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Schedule the next tick with the same ticket.
    Reschedule,
    /// The loop is over; do not schedule again.
    Stop,
}

#[derive(Debug, Default)]
struct RefreshLoop {
    active: bool,
    generation: u64,
}

impl RefreshLoop {
    fn start(&mut self) -> RefreshTicket {
        self.generation = self.generation.wrapping_add(1);
        self.active = true;
        RefreshTicket(self.generation)
    }

    fn stop(&mut self) {
        self.active = false;
        self.generation = self.generation.wrapping_add(1);
    }

    fn accepts(&self, ticket: RefreshTicket) -> bool {
        self.active && ticket.0 == self.generation
    }
}

#[derive(Debug)]
pub struct PlayerController<S> {
    surface: S,
    state: PlaybackState,
    refresh: RefreshLoop,
}

impl<S: MediaSurface> PlayerController<S> {
    /// Wrap a paused surface, pushing the initial volume and rate to it.
    pub fn new(mut surface: S, volume: Volume, rate: PlaybackRate) -> Self {
        surface.set_volume(volume);
        if rate != PlaybackRate::default() {
            if let Err(err) = surface.set_playback_rate(rate) {
                log::warn!("failed to apply initial playback rate {}: {err}", rate.value());
            }
        }

        let mut state = PlaybackState {
            volume,
            rate,
            ..PlaybackState::default()
        };
        state.set_duration(surface.duration_ms());

        Self {
            surface,
            state,
            refresh: RefreshLoop::default(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access to the surface, bypassing the handlers.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn is_refresh_active(&self) -> bool {
        self.refresh.active
    }

    pub fn slider_fraction(&self) -> f64 {
        self.state.fraction()
    }

    pub fn time_label(&self) -> String {
        self.state.time_label()
    }

    pub fn on_play_pause_clicked(&mut self) -> LoopCommand {
        if self.state.is_playing {
            self.surface.pause();
            self.state.is_playing = false;
            self.refresh.stop();
            log::info!("video paused at {}", self.state.position_ms);
            LoopCommand::Stop
        } else {
            self.surface.play();
            self.state.is_playing = true;
            let ticket = self.refresh.start();
            log::info!("video playing");
            LoopCommand::Start(ticket)
        }
    }

    /// Slider is being dragged: preview the position in the label only.
    pub fn on_slider_dragging(&mut self, fraction: f64) {
        self.state.is_dragging = true;
        self.state.set_duration(self.surface.duration_ms());
        let position = self.state.position_at(fraction);
        self.state.set_position(position);
    }

    /// Slider was let go: seek to the chosen position.
    pub fn on_slider_released(&mut self, fraction: f64) -> Result<(), Error> {
        self.state.is_dragging = false;
        self.state.set_duration(self.surface.duration_ms());
        let target = self.state.position_at(fraction);
        self.state.set_position(target);

        log::info!("seek({target})");
        self.surface.seek(target).inspect_err(|err| {
            log::warn!("seek to {target} ms failed: {err}");
        })
    }

    pub fn on_volume_changed(&mut self, volume: f64) {
        let volume = Volume::new(volume);
        self.state.volume = volume;
        self.surface.set_volume(volume);
        log::info!("volume = {}", volume.value());
    }

    pub fn on_rate_changed(&mut self, rate: f64) -> Result<(), Error> {
        let rate = PlaybackRate::new(rate);
        self.state.rate = rate;
        log::info!("playback rate = {}", rate.value());
        self.surface.set_playback_rate(rate).inspect_err(|err| {
            log::warn!("failed to set playback rate {}: {err}", rate.value());
        })
    }

    pub fn refresh_tick(&mut self, ticket: RefreshTicket) -> TickOutcome {
        if !self.refresh.accepts(ticket) {
            return TickOutcome::Stop;
        }

        if !self.state.is_dragging {
            self.state.set_duration(self.surface.duration_ms());
            let position = self.surface.current_position_ms().unwrap_or(0);
            self.state.set_position(position);
            log::trace!("refresh {}", self.state.time_label());
        }

        if self.surface.is_completed() {
            log::info!("video completed");
            self.on_play_pause_clicked();
        }

        if self.refresh.accepts(ticket) {
            TickOutcome::Reschedule
        } else {
            TickOutcome::Stop
        }
    }

    /// The window is closing: abandon any pending tick.
    pub fn shutdown(&mut self) {
        self.refresh.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct StubSurface {
        position: u64,
        duration: Option<u64>,
    }

    impl MediaSurface for StubSurface {
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn seek(&mut self, position_ms: u64) -> Result<(), Error> {
            self.position = position_ms;
            Ok(())
        }
        fn current_position_ms(&self) -> Option<u64> {
            Some(self.position)
        }
        fn duration_ms(&self) -> Option<u64> {
            self.duration
        }
        fn is_completed(&mut self) -> bool {
            false
        }
        fn set_volume(&mut self, _volume: Volume) {}
        fn set_playback_rate(&mut self, _rate: PlaybackRate) -> Result<(), Error> {
            Ok(())
        }
    }

    fn controller(duration: Option<u64>) -> PlayerController<StubSurface> {
        PlayerController::new(
            StubSurface {
                position: 0,
                duration,
            },
            Volume::default(),
            PlaybackRate::default(),
        )
    }

    #[test]
    fn tickets_are_unique_per_start() {
        let mut refresh = RefreshLoop::default();
        let first = refresh.start();
        refresh.stop();
        let second = refresh.start();
        assert_ne!(first, second);
        assert!(!refresh.accepts(first));
        assert!(refresh.accepts(second));
    }

    #[test]
    fn starts_paused_with_known_duration() {
        let c = controller(Some(90_000));
        assert!(!c.state().is_playing);
        assert!(!c.is_refresh_active());
        assert_eq!(c.state().duration_ms, 90_000);
        assert_eq!(c.time_label(), "00:00 / 01:30");
    }

    #[test]
    fn unknown_duration_reads_as_one() {
        let mut c = controller(None);
        assert_eq!(c.state().duration_ms, 1);
        c.on_slider_dragging(0.75);
        assert_eq!(c.state().position_ms, 0);
        assert_eq!(c.slider_fraction(), 0.0);
    }

    #[test]
    fn tick_after_shutdown_stops() {
        let mut c = controller(Some(1_000));
        let LoopCommand::Start(ticket) = c.on_play_pause_clicked() else {
            panic!("expected the loop to start");
        };
        c.shutdown();
        assert_eq!(c.refresh_tick(ticket), TickOutcome::Stop);
        assert!(!c.is_refresh_active());
    }
}
