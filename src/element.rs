use crate::video::{FrameData, Video};
use gpui::{
    Bounds, Element, ElementId, GlobalElementId, Half, InspectorElementId, IntoElement, LayoutId,
    Pixels, RenderImage, Window, point, px, size,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use yuv::{YuvBiPlanarImage, YuvConversionMode, YuvRange, YuvStandardMatrix, yuv_nv12_to_rgba};

/// Last frame uploaded to the sprite atlas, shared across renders so a paused
/// video is not converted again on every paint.
pub type FrameCache = Rc<RefCell<Option<Arc<RenderImage>>>>;

/// Paints the current frame of a [`Video`], letterboxed into its bounds.
pub struct VideoElement {
    video: Video,
    cache: FrameCache,
    display_width: Option<Pixels>,
    display_height: Option<Pixels>,
    element_id: Option<ElementId>,
}

impl VideoElement {
    pub fn new(video: Video, cache: FrameCache) -> Self {
        Self {
            video,
            cache,
            display_width: None,
            display_height: None,
            element_id: None,
        }
    }

    pub fn id(mut self, id: impl Into<ElementId>) -> Self {
        self.element_id = Some(id.into());
        self
    }

    pub fn size(mut self, width: Pixels, height: Pixels) -> Self {
        self.display_width = Some(width);
        self.display_height = Some(height);
        self
    }

    fn layout_style(&self) -> gpui::Style {
        let mut style = gpui::Style::default();
        match (self.display_width, self.display_height) {
            (Some(w), Some(h)) => {
                style.size.width = gpui::Length::Definite(gpui::DefiniteLength::Absolute(
                    gpui::AbsoluteLength::Pixels(w),
                ));
                style.size.height = gpui::Length::Definite(gpui::DefiniteLength::Absolute(
                    gpui::AbsoluteLength::Pixels(h),
                ));
            }
            _ => {
                let (width, height) = self.video.size();
                style.size.width = gpui::Length::Definite(gpui::relative(1.));
                style.flex_grow = 1.;
                if width > 0 && height > 0 {
                    style.aspect_ratio = Some(width as f32 / height as f32);
                }
            }
        }
        style
    }

    fn upload(&self, window: &mut Window) -> Option<Arc<RenderImage>> {
        let mut cache = self.cache.borrow_mut();
        if self.video.take_frame_ready() || cache.is_none() {
            if let Some(image) = self.video.current_frame().and_then(|f| render_image(&f)) {
                if let Some(old) = cache.replace(image) {
                    window.drop_image(old).ok();
                }
            }
        }
        cache.clone()
    }
}

impl Element for VideoElement {
    type RequestLayoutState = ();
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        self.element_id.clone()
    }

    fn source_location(&self) -> Option<&'static core::panic::Location<'static>> {
        None
    }

    fn request_layout(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        window: &mut Window,
        cx: &mut gpui::App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let layout_id = window.request_layout(self.layout_style(), [], cx);
        (layout_id, ())
    }

    fn prepaint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        _bounds: Bounds<Pixels>,
        _request_layout_state: &mut Self::RequestLayoutState,
        window: &mut Window,
        _cx: &mut gpui::App,
    ) -> Self::PrepaintState {
        if !self.video.eos() && !self.video.paused() {
            window.request_animation_frame();
        }
    }

    fn paint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        bounds: Bounds<Pixels>,
        _request_layout_state: &mut Self::RequestLayoutState,
        _prepaint_state: &mut Self::PrepaintState,
        window: &mut Window,
        _cx: &mut gpui::App,
    ) {
        let Some(image) = self.upload(window) else {
            return;
        };
        let (width, height) = self.video.size();
        let target = contain(bounds, width as f32, height as f32);
        window
            .paint_image(target, gpui::Corners::default(), image, 0, false)
            .ok();
    }
}

impl IntoElement for VideoElement {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

/// Helper function to create a video element.
pub fn video(video: Video, cache: FrameCache) -> VideoElement {
    VideoElement::new(video, cache)
}

/// Largest rectangle with the frame's aspect ratio centred inside `bounds`.
fn contain(bounds: Bounds<Pixels>, frame_width: f32, frame_height: f32) -> Bounds<Pixels> {
    if frame_width <= 0. || frame_height <= 0. {
        return bounds;
    }
    let scale = (bounds.size.width / px(frame_width)).min(bounds.size.height / px(frame_height));
    let fitted = size(px(frame_width * scale), px(frame_height * scale));
    Bounds {
        origin: point(
            bounds.origin.x + (bounds.size.width - fitted.width).half(),
            bounds.origin.y + (bounds.size.height - fitted.height).half(),
        ),
        size: fitted,
    }
}

fn render_image(frame: &FrameData) -> Option<Arc<RenderImage>> {
    use image::{ImageBuffer, Rgba};
    use smallvec::SmallVec;

    let rgba = nv12_to_rgba(frame)?;
    let buffer = ImageBuffer::<Rgba<u8>, _>::from_raw(frame.width, frame.height, rgba)?;
    let frames: SmallVec<[image::Frame; 1]> = SmallVec::from_elem(image::Frame::new(buffer), 1);
    Some(Arc::new(RenderImage::new(frames)))
}

/// Convert an NV12 frame to RGBA, trying BT.709 full range, then BT.709
/// limited range, then BT.601.
fn nv12_to_rgba(frame: &FrameData) -> Option<Vec<u8>> {
    let planar = YuvBiPlanarImage {
        y_plane: frame.y_plane.as_slice(),
        y_stride: frame.y_stride,
        uv_plane: frame.uv_plane.as_slice(),
        uv_stride: frame.uv_stride,
        width: frame.width,
        height: frame.height,
    };

    let rgba_stride = frame.width * 4;
    let mut rgba = vec![0u8; rgba_stride as usize * frame.height as usize];

    let attempts = [
        (YuvRange::Full, YuvStandardMatrix::Bt709),
        (YuvRange::Limited, YuvStandardMatrix::Bt709),
        (YuvRange::Limited, YuvStandardMatrix::Bt601),
    ];
    for (range, matrix) in attempts {
        if yuv_nv12_to_rgba(
            &planar,
            &mut rgba,
            rgba_stride,
            range,
            matrix,
            YuvConversionMode::Balanced,
        )
        .is_ok()
        {
            return Some(rgba);
        }
    }

    log::error!(
        "failed to convert {}x{} NV12 frame",
        frame.width,
        frame.height
    );
    None
}
