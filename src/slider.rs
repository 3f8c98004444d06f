//! A horizontal slider with drag and release events.

use gpui::{
    Bounds, Context, DispatchPhase, EventEmitter, IntoElement, MouseButton, MouseDownEvent,
    MouseMoveEvent, MouseUpEvent, ParentElement, Pixels, Point, Render, SharedString, Styled,
    Window, div, prelude::*, px, relative, rgb,
};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliderEvent {
    /// The value moved under the pointer (also fired on a plain click).
    Changed(f64),
    /// The pointer was released; carries the final value.
    Released(f64),
}

/// Value and pointer state of a slider, without any window attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderState {
    min: f64,
    max: f64,
    value: f64,
    divisions: Option<u32>,
    dragging: bool,
}

impl SliderState {
    pub fn new(min: f64, max: f64, value: f64) -> Self {
        Self {
            min,
            max,
            value: value.clamp(min, max),
            divisions: None,
            dragging: false,
        }
    }

    pub fn with_divisions(mut self, divisions: u32) -> Self {
        self.divisions = Some(divisions);
        self.value = snap(self.value, self.min, self.max, self.divisions);
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Value at `ratio` of the track, snapped to the divisions.
    pub fn value_at_ratio(&self, ratio: f64) -> f64 {
        let ratio = ratio.clamp(0., 1.);
        snap(
            self.min + ratio * (self.max - self.min),
            self.min,
            self.max,
            self.divisions,
        )
    }

    pub fn ratio(&self) -> f32 {
        if self.max <= self.min {
            return 0.;
        }
        ((self.value - self.min) / (self.max - self.min)).clamp(0., 1.) as f32
    }

    /// Set from code. Returns whether the value moved; never produces an event.
    pub fn set(&mut self, value: f64) -> bool {
        let value = value.clamp(self.min, self.max);
        if value == self.value {
            return false;
        }
        self.value = value;
        true
    }

    /// Pointer pressed at `ratio` (`None` when the track was not laid out yet).
    /// A click without movement still reports the value it landed on.
    pub fn press(&mut self, ratio: Option<f64>) -> SliderEvent {
        self.dragging = true;
        if let Some(ratio) = ratio {
            self.value = self.value_at_ratio(ratio);
        }
        SliderEvent::Changed(self.value)
    }

    pub fn drag(&mut self, ratio: Option<f64>) -> Option<SliderEvent> {
        if !self.dragging {
            return None;
        }
        self.move_to(ratio)
    }

    /// Pointer released: a last `Changed` if the value moved, then `Released`.
    pub fn release(&mut self, ratio: Option<f64>) -> SmallVec<[SliderEvent; 2]> {
        let mut events = SmallVec::new();
        if !self.dragging {
            return events;
        }
        events.extend(self.move_to(ratio));
        self.dragging = false;
        events.push(SliderEvent::Released(self.value));
        events
    }

    fn move_to(&mut self, ratio: Option<f64>) -> Option<SliderEvent> {
        let value = self.value_at_ratio(ratio?);
        if value == self.value {
            return None;
        }
        self.value = value;
        Some(SliderEvent::Changed(value))
    }
}

pub struct Slider {
    state: SliderState,
    label: Option<SharedString>,
    width: Pixels,
    track_bounds: Option<Bounds<Pixels>>,
}

impl EventEmitter<SliderEvent> for Slider {}

impl Slider {
    pub fn new(min: f64, max: f64, value: f64) -> Self {
        Self {
            state: SliderState::new(min, max, value),
            label: None,
            width: px(400.),
            track_bounds: None,
        }
    }

    /// Snap values to `divisions` equal steps between `min` and `max`.
    pub fn divisions(mut self, divisions: u32) -> Self {
        self.state = self.state.with_divisions(divisions);
        self
    }

    /// Caption shown next to the track; `{value}` is replaced by the value.
    pub fn label(mut self, label: impl Into<SharedString>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn width(mut self, width: Pixels) -> Self {
        self.width = width;
        self
    }

    pub fn value(&self) -> f64 {
        self.state.value()
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging()
    }

    /// Move the thumb from code. Emits nothing.
    pub fn set_value(&mut self, value: f64, cx: &mut Context<Self>) {
        if self.state.set(value) {
            cx.notify();
        }
    }

    fn ratio_at(&self, position: Point<Pixels>) -> Option<f64> {
        let bounds = self.track_bounds?;
        let ratio = (position.x - bounds.origin.x) / bounds.size.width;
        ratio.is_finite().then(|| f64::from(ratio))
    }

    fn begin_drag(&mut self, position: Point<Pixels>, cx: &mut Context<Self>) {
        let event = self.state.press(self.ratio_at(position));
        cx.emit(event);
        cx.notify();
    }

    fn drag_to(&mut self, position: Point<Pixels>, cx: &mut Context<Self>) {
        if let Some(event) = self.state.drag(self.ratio_at(position)) {
            cx.emit(event);
            cx.notify();
        }
    }

    fn end_drag(&mut self, position: Point<Pixels>, cx: &mut Context<Self>) {
        let events = self.state.release(self.ratio_at(position));
        if events.is_empty() {
            return;
        }
        for event in events {
            cx.emit(event);
        }
        cx.notify();
    }

    fn caption(&self) -> Option<String> {
        self.label
            .as_ref()
            .map(|label| label.replace("{value}", &format_value(self.state.value())))
    }
}

impl Render for Slider {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if self.state.is_dragging() {
            let handle = cx.entity();
            window.on_mouse_event(move |event: &MouseMoveEvent, phase, window, cx| {
                if phase != DispatchPhase::Capture {
                    return;
                }
                handle.update(cx, |this, cx| this.drag_to(event.position, cx));
                window.refresh();
            });

            let handle = cx.entity();
            window.on_mouse_event(move |event: &MouseUpEvent, phase, window, cx| {
                if phase != DispatchPhase::Capture || event.button != MouseButton::Left {
                    return;
                }
                handle.update(cx, |this, cx| this.end_drag(event.position, cx));
                window.refresh();
            });
        }

        let ratio = self.state.ratio();

        let handle = cx.entity();
        let track = div()
            .relative()
            .w(self.width)
            .h(px(20.))
            .flex()
            .items_center()
            .cursor_pointer()
            .on_children_prepainted(move |bounds, _window, cx| {
                let bounds = bounds.first().copied();
                handle.update(cx, |this, _| this.track_bounds = bounds);
            })
            .child(
                div()
                    .w_full()
                    .h(px(4.))
                    .rounded_full()
                    .bg(rgb(0xc5cae9))
                    .child(div().h_full().w(relative(ratio)).rounded_full().bg(rgb(0x42a5f5))),
            )
            .child(
                div()
                    .absolute()
                    .top(px(3.))
                    .left(relative(ratio))
                    .ml(px(-7.))
                    .w(px(14.))
                    .h(px(14.))
                    .rounded_full()
                    .bg(rgb(0x1e88e5)),
            )
            .id(("slider-track", cx.entity_id()))
            .on_mouse_down(
                MouseButton::Left,
                cx.listener(|this, event: &MouseDownEvent, _window, cx| {
                    this.begin_drag(event.position, cx);
                }),
            );

        let mut row = div().flex().flex_col().items_center().gap_1().child(track);
        if let Some(caption) = self.caption() {
            row = row.child(div().text_sm().text_color(rgb(0x424242)).child(caption));
        }
        row
    }
}

/// Round `value` to the nearest of `divisions` equal steps within `[min, max]`.
pub fn snap(value: f64, min: f64, max: f64, divisions: Option<u32>) -> f64 {
    let value = value.clamp(min, max);
    match divisions {
        Some(divisions) if divisions > 0 && max > min => {
            let step = (max - min) / f64::from(divisions);
            (min + ((value - min) / step).round() * step).clamp(min, max)
        }
        _ => value,
    }
}

fn format_value(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_rounds_to_nearest_division() {
        assert_eq!(snap(47.0, 0., 100., Some(10)), 50.);
        assert_eq!(snap(44.0, 0., 100., Some(10)), 40.);
        assert!((snap(1.4, 1., 3., Some(6)) - (1. + 1. / 3.)).abs() < 1e-9);
        assert_eq!(snap(0.123, 0., 1., None), 0.123);
    }

    #[test]
    fn snap_clamps_to_bounds() {
        assert_eq!(snap(-3., 0., 100., Some(10)), 0.);
        assert_eq!(snap(140., 0., 100., Some(10)), 100.);
        assert_eq!(snap(7., 1., 3., None), 3.);
    }

    #[test]
    fn zero_divisions_leaves_value() {
        assert_eq!(snap(0.37, 0., 1., Some(0)), 0.37);
    }

    #[test]
    fn caption_substitutes_value() {
        let slider = Slider::new(0., 100., 100.).divisions(10).label("Volume = {value}%");
        assert_eq!(slider.caption().as_deref(), Some("Volume = 100%"));

        let rate = Slider::new(1., 3., 1.5).label("PlaybackRate = {value}X");
        assert_eq!(rate.caption().as_deref(), Some("PlaybackRate = 1.50X"));
    }

    #[test]
    fn new_clamps_and_snaps_initial_value() {
        assert_eq!(Slider::new(0., 1., 5.).value(), 1.);
        assert_eq!(Slider::new(0., 100., 33.).divisions(10).value(), 30.);
        assert_eq!(SliderState::new(0., 1., 0.5).ratio(), 0.5);
    }

    fn volume_state() -> SliderState {
        SliderState::new(0., 100., 100.).with_divisions(10)
    }

    #[test]
    fn click_without_movement_reports_changed_then_released() {
        let mut state = volume_state();

        assert_eq!(state.press(Some(0.42)), SliderEvent::Changed(40.));
        assert!(state.is_dragging());

        let events = state.release(Some(0.42));
        assert_eq!(events.as_slice(), [SliderEvent::Released(40.)]);
        assert!(!state.is_dragging());
    }

    #[test]
    fn drag_reports_only_value_changes() {
        let mut state = volume_state();
        state.press(Some(0.5));

        assert_eq!(state.drag(Some(0.52)), None);
        assert_eq!(state.drag(Some(0.71)), Some(SliderEvent::Changed(70.)));
        assert_eq!(state.drag(None), None);

        let events = state.release(Some(0.9));
        assert_eq!(
            events.as_slice(),
            [SliderEvent::Changed(90.), SliderEvent::Released(90.)]
        );
    }

    #[test]
    fn pointer_events_without_a_press_are_ignored() {
        let mut state = volume_state();
        assert_eq!(state.drag(Some(0.3)), None);
        assert!(state.release(Some(0.3)).is_empty());
        assert_eq!(state.value(), 100.);

        state.press(Some(0.5));
        state.release(Some(0.5));
        assert!(state.release(Some(0.1)).is_empty());
        assert_eq!(state.value(), 50.);
    }

    #[test]
    fn press_before_layout_keeps_the_value() {
        let mut state = volume_state();
        assert_eq!(state.press(None), SliderEvent::Changed(100.));
    }

    #[test]
    fn set_moves_the_value_without_an_event() {
        let mut state = SliderState::new(0., 1., 0.).with_divisions(100);
        assert!(state.set(0.25));
        assert!(!state.set(0.25));
        assert_eq!(state.value(), 0.25);
        assert!(state.set(3.));
        assert_eq!(state.value(), 1.);
        assert!(!state.is_dragging());
    }
}
