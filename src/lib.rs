//! # Ethical Video
//!
//! A single-page video player for GPUI using GStreamer for media playback:
//! a video surface, a play/pause button, a seek slider with a time label, and
//! volume and playback-rate sliders.
//!
//! The playback logic lives in [`PlayerController`], which is generic over
//! the [`MediaSurface`] it drives and knows nothing about GPUI. [`PlayerView`]
//! wires it to the widgets and runs the position refresh loop.
//!
//! ## Example
//!
//! ```no_run
//! use ethical_video::{PlayerController, Video, playback::{PlaybackRate, Volume}};
//!
//! let uri = url::Url::parse("file:///path/to/video.mp4").unwrap();
//! let video = Video::new(&uri).unwrap();
//! let mut controller = PlayerController::new(video, Volume::default(), PlaybackRate::default());
//! controller.on_play_pause_clicked();
//! ```

pub mod config;
pub mod controller;
mod element;
mod error;
mod media_surface;
pub mod playback;
mod player_view;
pub mod slider;
mod video;

pub use config::PlayerConfig;
pub use controller::{LoopCommand, PlayerController, RefreshTicket, TickOutcome};
pub use element::{FrameCache, VideoElement, video};
pub use error::Error;
pub use media_surface::MediaSurface;
pub use player_view::PlayerView;
pub use video::{FrameData, Video};

// Re-export commonly used types
pub use gstreamer as gst;
pub use url::Url;
