use thiserror::Error;

/// Errors raised while building or driving the media surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error("glib error: {0}")]
    Glib(#[from] glib::Error),
    #[error("seek failed: {0}")]
    Seek(#[from] glib::BoolError),
    #[error("failed to query the playback position")]
    Position,
    #[error("failed to change pipeline state: {0}")]
    StateChange(#[from] gstreamer::StateChangeError),
    #[error("failed to get media capabilities")]
    Caps,
    #[error("failed to cast gstreamer element")]
    Cast,
    #[error("invalid framerate: {0}")]
    Framerate(f64),
    #[error("invalid media uri: {0}")]
    InvalidUri(String),
    #[error("invalid arguments: {0}")]
    Args(#[from] pico_args::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_seek_converts_to_seek_error() {
        let err = Error::from(glib::bool_error!("Failed to seek"));
        assert!(matches!(err, Error::Seek(_)));
        assert_eq!(err.to_string(), "seek failed: Failed to seek");
    }
}
