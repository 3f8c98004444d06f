use crate::Error;
use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_app::prelude::*;
use gstreamer_video as gst_video;
use gstreamer_video::prelude::*;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const APPSINK_NAME: &str = "ethical_video";

/// One decoded NV12 frame, planes copied with their source strides.
#[derive(Debug, Clone)]
pub struct FrameData {
    pub y_plane: Vec<u8>,
    pub y_stride: u32,
    pub uv_plane: Vec<u8>,
    pub uv_stride: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameData {
    fn from_sample(sample: &gst::Sample) -> Option<Self> {
        let caps = sample.caps()?;
        let info = gst_video::VideoInfo::from_caps(caps).ok()?;
        let buffer = sample.buffer()?;
        let frame = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info).ok()?;

        let strides = frame.plane_stride();
        Some(Self {
            y_plane: frame.plane_data(0).ok()?.to_vec(),
            y_stride: u32::try_from(*strides.first()?).ok()?,
            uv_plane: frame.plane_data(1).ok()?.to_vec(),
            uv_stride: u32::try_from(*strides.get(1)?).ok()?,
            width: info.width(),
            height: info.height(),
        })
    }
}

/// Wait between pulls when the sink had nothing to hand out.
const IDLE_WAIT: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pull {
    Sample,
    Preroll,
}

/// Frame worker loop. Pulls samples while playing and the preroll once after
/// each flush while paused; backs off whenever nothing came out, which covers
/// a paused pipeline as well as a playing one sitting at end-of-stream.
fn pull_frames(
    alive: &AtomicBool,
    refresh_preroll: &AtomicBool,
    mut playing: impl FnMut() -> bool,
    mut pull: impl FnMut(Pull) -> Option<gst::Sample>,
    mut deliver: impl FnMut(gst::Sample),
) {
    while alive.load(Ordering::Acquire) {
        let sample = if playing() {
            pull(Pull::Sample)
        } else if refresh_preroll.swap(false, Ordering::SeqCst) {
            let preroll = pull(Pull::Preroll);
            if preroll.is_none() {
                // not prerolled yet after a flush, try again next round
                refresh_preroll.store(true, Ordering::SeqCst);
            }
            preroll
        } else {
            None
        };

        match sample {
            Some(sample) => deliver(sample),
            None => std::thread::sleep(IDLE_WAIT),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Internal {
    pub(crate) bus: gst::Bus,
    pub(crate) source: gst::Pipeline,
    pub(crate) alive: Arc<AtomicBool>,
    pub(crate) worker: Option<std::thread::JoinHandle<()>>,

    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) framerate: f64,
    pub(crate) duration: Option<Duration>,
    pub(crate) speed: f64,

    pub(crate) frame: Arc<Mutex<Option<FrameData>>>,
    pub(crate) upload_frame: Arc<AtomicBool>,
    pub(crate) refresh_preroll: Arc<AtomicBool>,
    pub(crate) looping: bool,
    pub(crate) is_eos: bool,
}

impl Internal {
    pub(crate) fn seek(&self, position: Duration, accurate: bool) -> Result<(), Error> {
        let flags = gst::SeekFlags::FLUSH
            | if accurate {
                gst::SeekFlags::ACCURATE
            } else {
                gst::SeekFlags::KEY_UNIT
            };
        self.source.seek(
            self.speed,
            flags,
            gst::SeekType::Set,
            gst::ClockTime::from_nseconds(position.as_nanos() as u64),
            gst::SeekType::None,
            gst::ClockTime::NONE,
        )?;
        // the new preroll must be shown even while paused
        self.refresh_preroll.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub(crate) fn set_speed(&mut self, speed: f64) -> Result<(), Error> {
        let position = self
            .source
            .query_position::<gst::ClockTime>()
            .ok_or(Error::Position)?;
        self.source.seek(
            speed,
            gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
            gst::SeekType::Set,
            position,
            gst::SeekType::None,
            gst::ClockTime::NONE,
        )?;
        self.speed = speed;
        Ok(())
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        let state = if paused {
            gst::State::Paused
        } else {
            gst::State::Playing
        };
        if let Err(err) = self.source.set_state(state) {
            log::warn!("failed to set pipeline to {state:?}: {err}");
        }
    }

    pub(crate) fn paused(&self) -> bool {
        self.source.state(gst::ClockTime::ZERO).1 != gst::State::Playing
    }

    pub(crate) fn restart_stream(&mut self) -> Result<(), Error> {
        self.is_eos = false;
        self.seek(Duration::ZERO, false)?;
        self.set_paused(false);
        Ok(())
    }

    fn poll_bus(&mut self) {
        while let Some(msg) = self
            .bus
            .pop_filtered(&[gst::MessageType::Error, gst::MessageType::Eos])
        {
            match msg.view() {
                gst::MessageView::Error(err) => {
                    log::error!(
                        "GStreamer error from {:?}: {} ({:?})",
                        err.src().map(|s| s.path_string()),
                        err.error(),
                        err.debug()
                    );
                }
                gst::MessageView::Eos(_) if self.looping => {
                    log::debug!("end of stream, looping");
                    if let Err(err) = self.restart_stream() {
                        log::warn!("failed to restart stream: {err}");
                    }
                }
                gst::MessageView::Eos(_) => {
                    log::debug!("end of stream");
                    self.is_eos = true;
                }
                _ => {}
            }
        }
    }
}

/// A video loaded from a URI (e.g., a local file path or HTTP stream).
///
/// Cloning shares the same pipeline; the pipeline is torn down when the last
/// handle drops.
#[derive(Debug, Clone)]
pub struct Video(pub(crate) Arc<RwLock<Internal>>);

impl Drop for Video {
    fn drop(&mut self) {
        if Arc::strong_count(&self.0) != 1 {
            return;
        }
        if let Some(mut inner) = self.0.try_write() {
            if let Err(err) = inner.source.set_state(gst::State::Null) {
                log::warn!("failed to stop pipeline: {err}");
            }

            inner.alive.store(false, Ordering::SeqCst);
            if let Some(worker) = inner.worker.take() {
                if let Err(err) = worker.join() {
                    match err.downcast_ref::<String>() {
                        Some(e) => log::error!("Video thread panicked: {e}"),
                        None => log::error!("Video thread panicked with unknown reason"),
                    }
                }
            }
        }
    }
}

impl Video {
    /// Open `uri` and preroll it, paused on the first frame.
    pub fn new(uri: &url::Url) -> Result<Self, Error> {
        gst::init()?;

        let pipeline = format!(
            "playbin uri=\"{}\" video-sink=\"videoscale ! videoconvert ! appsink name={APPSINK_NAME} drop=true caps=video/x-raw,format=NV12,pixel-aspect-ratio=1/1\"",
            uri.as_str()
        );
        let pipeline = gst::parse::launch(pipeline.as_ref())?
            .downcast::<gst::Pipeline>()
            .map_err(|_| Error::Cast)?;

        let video_sink: gst::Element = pipeline.property("video-sink");
        let bin = video_sink
            .pads()
            .first()
            .cloned()
            .and_then(|pad| pad.dynamic_cast::<gst::GhostPad>().ok())
            .and_then(|pad| pad.parent_element())
            .and_then(|element| element.downcast::<gst::Bin>().ok())
            .ok_or(Error::Cast)?;
        let video_sink = bin
            .by_name(APPSINK_NAME)
            .and_then(|sink| sink.downcast::<gst_app::AppSink>().ok())
            .ok_or(Error::Cast)?;

        Self::from_gst_pipeline(pipeline, video_sink)
    }

    /// Creates a video from an existing GStreamer pipeline feeding an NV12 appsink.
    pub fn from_gst_pipeline(
        pipeline: gst::Pipeline,
        video_sink: gst_app::AppSink,
    ) -> Result<Self, Error> {
        gst::init()?;

        macro_rules! cleanup {
            ($expr:expr) => {
                $expr.map_err(|e| {
                    let _ = pipeline.set_state(gst::State::Null);
                    e
                })
            };
        }

        let pad = cleanup!(video_sink.pads().first().cloned().ok_or(Error::Caps))?;

        cleanup!(pipeline.set_state(gst::State::Paused))?;
        // block until prerolled so caps and duration are known
        cleanup!(pipeline.state(gst::ClockTime::from_seconds(5)).0)?;

        let caps = cleanup!(pad.current_caps().ok_or(Error::Caps))?;
        let s = cleanup!(caps.structure(0).ok_or(Error::Caps))?;
        let width = cleanup!(s.get::<i32>("width").map_err(|_| Error::Caps))?;
        let height = cleanup!(s.get::<i32>("height").map_err(|_| Error::Caps))?;
        let framerate = cleanup!(s.get::<gst::Fraction>("framerate").map_err(|_| Error::Caps))?;
        let framerate = framerate.numer() as f64 / framerate.denom() as f64;

        if framerate.is_nan()
            || framerate.is_infinite()
            || framerate < 0.0
            || framerate.abs() < f64::EPSILON
        {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(Error::Framerate(framerate));
        }

        let duration = pipeline
            .query_duration::<gst::ClockTime>()
            .map(|d| Duration::from_nanos(d.nseconds()));
        log::info!(
            "opened {width}x{height} @ {framerate:.2} fps, duration {:?}",
            duration
        );

        let bus = cleanup!(pipeline.bus().ok_or(Error::Cast))?;

        let frame = Arc::new(Mutex::new(None));
        let upload_frame = Arc::new(AtomicBool::new(false));
        let refresh_preroll = Arc::new(AtomicBool::new(true));
        let alive = Arc::new(AtomicBool::new(true));

        let frame_ref = Arc::clone(&frame);
        let upload_frame_ref = Arc::clone(&upload_frame);
        let refresh_preroll_ref = Arc::clone(&refresh_preroll);
        let alive_ref = Arc::clone(&alive);
        let pipeline_ref = pipeline.clone();

        let worker = std::thread::spawn(move || {
            let timeout = gst::ClockTime::from_mseconds(16);
            pull_frames(
                &alive_ref,
                &refresh_preroll_ref,
                || pipeline_ref.state(gst::ClockTime::ZERO).1 == gst::State::Playing,
                |pull| match pull {
                    Pull::Sample => video_sink.try_pull_sample(timeout),
                    Pull::Preroll => video_sink.try_pull_preroll(timeout),
                },
                |sample| match FrameData::from_sample(&sample) {
                    Some(data) => {
                        *frame_ref.lock() = Some(data);
                        upload_frame_ref.store(true, Ordering::SeqCst);
                    }
                    None => log::error!("failed to map video frame"),
                },
            );
        });

        Ok(Video(Arc::new(RwLock::new(Internal {
            bus,
            source: pipeline,
            alive,
            worker: Some(worker),

            width,
            height,
            framerate,
            duration,
            speed: 1.0,

            frame,
            upload_frame,
            refresh_preroll,
            looping: false,
            is_eos: false,
        }))))
    }

    pub(crate) fn read(&self) -> parking_lot::RwLockReadGuard<'_, Internal> {
        self.0.read()
    }

    pub(crate) fn write(&self) -> parking_lot::RwLockWriteGuard<'_, Internal> {
        self.0.write()
    }

    /// Get the size/resolution of the video as `(width, height)`.
    pub fn size(&self) -> (i32, i32) {
        let inner = self.read();
        (inner.width, inner.height)
    }

    /// Get the framerate of the video as frames per second.
    pub fn framerate(&self) -> f64 {
        self.read().framerate
    }

    /// Set the linear volume multiplier of the audio (1.0 is unity gain).
    pub fn set_volume(&self, volume: f64) {
        self.write().source.set_property("volume", volume);
    }

    pub fn volume(&self) -> f64 {
        self.read().source.property("volume")
    }

    /// Get if the stream ended or not.
    pub fn eos(&self) -> bool {
        self.read().is_eos
    }

    pub fn looping(&self) -> bool {
        self.read().looping
    }

    /// Set if the media restarts from the beginning when it ends.
    pub fn set_looping(&self, looping: bool) {
        self.write().looping = looping;
    }

    /// Start playing, rewinding first if the stream already ended.
    pub fn play(&self) {
        let mut inner = self.write();
        if inner.is_eos {
            if let Err(err) = inner.restart_stream() {
                log::warn!("failed to restart stream: {err}");
            }
        } else {
            inner.set_paused(false);
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.write().set_paused(paused)
    }

    pub fn paused(&self) -> bool {
        self.read().paused()
    }

    /// Drain pending end-of-stream and error messages from the pipeline bus.
    pub fn poll_bus(&self) {
        self.write().poll_bus()
    }

    /// Jumps to a specific position in the media.
    pub fn seek(&self, position: Duration, accurate: bool) -> Result<(), Error> {
        let mut inner = self.write();
        inner.is_eos = false;
        inner.seek(position, accurate)
    }

    /// Set the playback speed of the media.
    pub fn set_speed(&self, speed: f64) -> Result<(), Error> {
        self.write().set_speed(speed)
    }

    pub fn speed(&self) -> f64 {
        self.read().speed
    }

    /// Current playback position, if the pipeline can answer the query.
    pub fn position(&self) -> Option<Duration> {
        self.read()
            .source
            .query_position::<gst::ClockTime>()
            .map(|pos| Duration::from_nanos(pos.nseconds()))
    }

    /// Media duration; queried again while still unknown.
    pub fn duration(&self) -> Option<Duration> {
        let inner = self.read();
        inner.duration.or_else(|| {
            inner
                .source
                .query_duration::<gst::ClockTime>()
                .map(|d| Duration::from_nanos(d.nseconds()))
        })
    }

    /// Get the underlying GStreamer pipeline.
    pub fn pipeline(&self) -> gst::Pipeline {
        self.read().source.clone()
    }

    /// Consume the "new frame" flag set by the worker thread.
    pub fn take_frame_ready(&self) -> bool {
        self.read().upload_frame.swap(false, Ordering::SeqCst)
    }

    /// Latest decoded frame, if any has arrived yet.
    pub fn current_frame(&self) -> Option<FrameData> {
        self.read().frame.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn run_for(
        period: Duration,
        playing: bool,
        refresh_preroll: bool,
    ) -> (usize, Vec<Pull>) {
        let alive = Arc::new(AtomicBool::new(true));
        let refresh = Arc::new(AtomicBool::new(refresh_preroll));
        let pulls = Arc::new(Mutex::new(Vec::new()));

        let worker = {
            let alive = Arc::clone(&alive);
            let pulls = Arc::clone(&pulls);
            std::thread::spawn(move || {
                let mut delivered = 0;
                pull_frames(
                    &alive,
                    &refresh,
                    || playing,
                    |pull| {
                        pulls.lock().push(pull);
                        None
                    },
                    |_| delivered += 1,
                );
                delivered
            })
        };

        let started = Instant::now();
        while started.elapsed() < period {
            std::thread::sleep(Duration::from_millis(5));
        }
        alive.store(false, Ordering::Release);
        let delivered = worker.join().unwrap();
        let pulls = pulls.lock().clone();
        (delivered, pulls)
    }

    #[test]
    fn empty_sink_while_playing_backs_off() {
        let (delivered, pulls) = run_for(Duration::from_millis(160), true, false);
        assert_eq!(delivered, 0);
        assert!(!pulls.is_empty());
        // one pull per idle wait, give or take scheduling
        assert!(pulls.len() <= 20, "{} pulls", pulls.len());
        assert!(pulls.iter().all(|p| *p == Pull::Sample));
    }

    #[test]
    fn paused_worker_retries_preroll_until_it_arrives() {
        let (_, pulls) = run_for(Duration::from_millis(80), false, true);
        assert!(!pulls.is_empty());
        assert!(pulls.len() <= 20, "{} pulls", pulls.len());
        assert!(pulls.iter().all(|p| *p == Pull::Preroll));
    }

    #[test]
    fn paused_worker_without_flush_never_pulls() {
        let (_, pulls) = run_for(Duration::from_millis(50), false, false);
        assert!(pulls.is_empty());
    }

    fn detached_internal() -> Internal {
        gst::init().unwrap();
        let source = gst::Pipeline::new();
        Internal {
            bus: source.bus().unwrap(),
            source,
            alive: Arc::new(AtomicBool::new(false)),
            worker: None,
            width: 0,
            height: 0,
            framerate: 30.0,
            duration: None,
            speed: 1.0,
            frame: Arc::new(Mutex::new(None)),
            upload_frame: Arc::new(AtomicBool::new(false)),
            refresh_preroll: Arc::new(AtomicBool::new(false)),
            looping: false,
            is_eos: false,
        }
    }

    #[test]
    fn failed_rate_change_keeps_previous_speed() {
        let mut internal = detached_internal();
        let err = internal.set_speed(2.0).unwrap_err();
        assert!(matches!(err, Error::Position));
        assert_eq!(internal.speed, 1.0);
    }
}
