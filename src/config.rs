//! Player defaults and command-line options.

use crate::Error;
use crate::playback::{PlaybackRate, Volume};
use crate::slider::snap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Window title.
pub const APP_TITLE: &str = "TheEthicalVideo";

/// Media opened when no path is given on the command line.
pub const DEFAULT_MEDIA: &str = "assets/videos/example_01.mp4";

/// Period of the position refresh loop.
pub const REFRESH_PERIOD: Duration = Duration::from_millis(200);

pub const MIN_VOLUME: f64 = 0.0;
pub const MAX_VOLUME: f64 = 100.0;
pub const DEFAULT_VOLUME: f64 = 100.0;
/// Notches on the volume slider (steps of 10).
pub const VOLUME_DIVISIONS: u32 = 10;

pub const MIN_PLAYBACK_RATE: f64 = 1.0;
pub const MAX_PLAYBACK_RATE: f64 = 3.0;
pub const DEFAULT_PLAYBACK_RATE: f64 = 1.0;
/// Notches on the rate slider (steps of 1/3x).
pub const RATE_DIVISIONS: u32 = 6;

/// Notches on the seek slider.
pub const SEEK_DIVISIONS: u32 = 100;

/// Width shared by the sliders and the control row.
pub const CONTROLS_WIDTH: f32 = 400.0;

const HELP: &str = "\
ethical-video

USAGE:
  ethical-video [OPTIONS] [MEDIA]

OPTIONS:
  --loop          Restart the media when it ends
  --volume N      Initial volume (0-100)
  --rate R        Initial playback rate (1.0-3.0)
  -h, --help      Print this help

ARGS:
  [MEDIA]         File path or URI to play
";

/// Runtime configuration of the player window.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub media: Url,
    pub looping: bool,
    pub volume: Volume,
    pub rate: PlaybackRate,
}

impl PlayerConfig {
    /// Parse the process arguments. Returns `Ok(None)` when help was requested.
    pub fn from_env() -> Result<Option<Self>, Error> {
        Self::from_args(pico_args::Arguments::from_env())
    }

    pub fn from_args(mut args: pico_args::Arguments) -> Result<Option<Self>, Error> {
        if args.contains(["-h", "--help"]) {
            print!("{HELP}");
            return Ok(None);
        }

        let looping = args.contains("--loop");
        let volume: Option<f64> = args.opt_value_from_str("--volume")?;
        let rate: Option<f64> = args.opt_value_from_str("--rate")?;
        let media = args
            .finish()
            .into_iter()
            .next()
            .and_then(|s| s.into_string().ok())
            .unwrap_or_else(|| DEFAULT_MEDIA.to_string());

        Ok(Some(Self {
            media: media_uri(&media)?,
            looping,
            volume: volume_notch(volume.unwrap_or(DEFAULT_VOLUME)),
            rate: rate_notch(rate.unwrap_or(DEFAULT_PLAYBACK_RATE)),
        }))
    }
}

/// Nearest volume the volume slider can show.
pub fn volume_notch(volume: f64) -> Volume {
    let volume = Volume::new(volume).value();
    Volume::new(snap(volume, MIN_VOLUME, MAX_VOLUME, Some(VOLUME_DIVISIONS)))
}

/// Nearest rate the rate slider can show.
pub fn rate_notch(rate: f64) -> PlaybackRate {
    let rate = PlaybackRate::new(rate).value();
    PlaybackRate::new(snap(
        rate,
        MIN_PLAYBACK_RATE,
        MAX_PLAYBACK_RATE,
        Some(RATE_DIVISIONS),
    ))
}

/// Resolve a command-line media argument into a URI.
///
/// Anything that already parses with a scheme other than a single drive
/// letter is taken as-is; everything else is a filesystem path, made
/// absolute against the working directory.
pub fn media_uri(media: &str) -> Result<Url, Error> {
    if let Ok(url) = Url::parse(media) {
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }

    let path = Path::new(media);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::InvalidUri(format!("{media}: {e}")))?
            .join(path)
    };
    Url::from_file_path(&path).map_err(|()| Error::InvalidUri(media.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn args(list: &[&str]) -> pico_args::Arguments {
        pico_args::Arguments::from_vec(list.iter().map(OsString::from).collect())
    }

    #[test]
    fn defaults_when_no_arguments() {
        let config = PlayerConfig::from_args(args(&[])).unwrap().unwrap();
        assert!(!config.looping);
        assert_eq!(config.volume.value(), DEFAULT_VOLUME);
        assert_eq!(config.rate.value(), DEFAULT_PLAYBACK_RATE);
        assert_eq!(config.media.scheme(), "file");
        assert!(config.media.path().ends_with("assets/videos/example_01.mp4"));
    }

    #[test]
    fn options_are_parsed_and_clamped() {
        let config =
            PlayerConfig::from_args(args(&["--loop", "--volume", "250", "--rate", "2", "clip.mp4"]))
                .unwrap()
                .unwrap();
        assert!(config.looping);
        assert_eq!(config.volume.value(), MAX_VOLUME);
        assert_eq!(config.rate.value(), 2.0);
        assert!(config.media.path().ends_with("/clip.mp4"));
    }

    #[test]
    fn values_between_notches_match_the_sliders() {
        use crate::slider::Slider;

        let config = PlayerConfig::from_args(args(&["--volume", "55", "--rate", "2.5"]))
            .unwrap()
            .unwrap();

        let volume = Slider::new(MIN_VOLUME, MAX_VOLUME, config.volume.value())
            .divisions(VOLUME_DIVISIONS);
        let rate = Slider::new(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE, config.rate.value())
            .divisions(RATE_DIVISIONS);

        assert_eq!(config.volume.value(), 60.0);
        assert_eq!(volume.value(), config.volume.value());
        assert!((config.rate.value() - (2.0 + 2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(rate.value(), config.rate.value());
    }

    #[test]
    fn notches_keep_nan_in_range() {
        assert_eq!(volume_notch(f64::NAN).value(), MIN_VOLUME);
        assert_eq!(rate_notch(f64::NAN).value(), MIN_PLAYBACK_RATE);
        assert_eq!(rate_notch(1.1).value(), MIN_PLAYBACK_RATE);
    }

    #[test]
    fn help_short_circuits() {
        assert!(PlayerConfig::from_args(args(&["--help"])).unwrap().is_none());
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = PlayerConfig::from_args(args(&["--volume", "loud"])).unwrap_err();
        assert!(matches!(err, Error::Args(_)));
    }

    #[test]
    fn uris_pass_through() {
        let url = media_uri("https://example.com/a.mp4").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a.mp4");
    }
}
