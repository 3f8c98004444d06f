use crate::config::{
    CONTROLS_WIDTH, MAX_PLAYBACK_RATE, MAX_VOLUME, MIN_PLAYBACK_RATE, MIN_VOLUME, PlayerConfig,
    RATE_DIVISIONS, REFRESH_PERIOD, SEEK_DIVISIONS, VOLUME_DIVISIONS,
};
use crate::controller::{LoopCommand, PlayerController, RefreshTicket, TickOutcome};
use crate::element::{FrameCache, video};
use crate::playback::PlaybackState;
use crate::slider::{Slider, SliderEvent};
use crate::video::Video;
use gpui::{
    AppContext, Context, Entity, IntoElement, ParentElement, Render, Styled, Subscription, Task,
    Window, div, prelude::*, px, rgb,
};

/// The player page: video surface, transport controls and the refresh loop.
pub struct PlayerView {
    controller: PlayerController<Video>,
    frame_cache: FrameCache,
    seek_slider: Entity<Slider>,
    volume_slider: Entity<Slider>,
    rate_slider: Entity<Slider>,
    refresh_task: Option<Task<()>>,
    _subscriptions: Vec<Subscription>,
}

impl PlayerView {
    pub fn new(video: Video, config: &PlayerConfig, cx: &mut Context<Self>) -> Self {
        video.set_looping(config.looping);
        let controller = PlayerController::new(video, config.volume, config.rate);

        let seek_slider = cx.new(|_| {
            Slider::new(0., 1., 0.)
                .divisions(SEEK_DIVISIONS)
                .width(px(CONTROLS_WIDTH))
        });
        let volume_slider = cx.new(|_| {
            Slider::new(MIN_VOLUME, MAX_VOLUME, config.volume.value())
                .divisions(VOLUME_DIVISIONS)
                .label("Volume = {value}%")
                .width(px(CONTROLS_WIDTH))
        });
        let rate_slider = cx.new(|_| {
            Slider::new(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE, config.rate.value())
                .divisions(RATE_DIVISIONS)
                .label("PlaybackRate = {value}X")
                .width(px(CONTROLS_WIDTH))
        });

        let subscriptions = vec![
            cx.subscribe(&seek_slider, |this, _, event: &SliderEvent, cx| {
                this.on_seek_event(*event, cx);
            }),
            cx.subscribe(&volume_slider, |this, _, event: &SliderEvent, cx| {
                if let SliderEvent::Changed(volume) = *event {
                    this.controller.on_volume_changed(volume);
                    cx.notify();
                }
            }),
            cx.subscribe(&rate_slider, |this, _, event: &SliderEvent, cx| {
                if let SliderEvent::Changed(rate) = *event {
                    this.controller.on_rate_changed(rate).ok();
                    cx.notify();
                }
            }),
        ];

        Self {
            controller,
            frame_cache: FrameCache::default(),
            seek_slider,
            volume_slider,
            rate_slider,
            refresh_task: None,
            _subscriptions: subscriptions,
        }
    }

    pub fn controller(&self) -> &PlayerController<Video> {
        &self.controller
    }

    /// Stop the refresh loop for good; called when the window closes.
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
        self.refresh_task = None;
    }

    fn toggle_playback(&mut self, cx: &mut Context<Self>) {
        match self.controller.on_play_pause_clicked() {
            LoopCommand::Start(ticket) => self.refresh_task = Some(self.spawn_refresh(ticket, cx)),
            LoopCommand::Stop => self.refresh_task = None,
        }
        cx.notify();
    }

    /// Sleep one period, tick, and go round again only while the controller
    /// asks for it.
    fn spawn_refresh(&self, ticket: RefreshTicket, cx: &mut Context<Self>) -> Task<()> {
        cx.spawn(async move |this, cx| {
            loop {
                cx.background_executor().timer(REFRESH_PERIOD).await;
                let outcome = this.update(cx, |this, cx| this.on_refresh_tick(ticket, cx));
                if !keeps_refreshing(&outcome) {
                    break;
                }
            }
        })
    }

    fn on_refresh_tick(&mut self, ticket: RefreshTicket, cx: &mut Context<Self>) -> TickOutcome {
        let outcome = self.controller.refresh_tick(ticket);
        self.sync_seek_slider(cx);
        cx.notify();
        outcome
    }

    fn on_seek_event(&mut self, event: SliderEvent, cx: &mut Context<Self>) {
        match event {
            SliderEvent::Changed(fraction) => self.controller.on_slider_dragging(fraction),
            SliderEvent::Released(fraction) => {
                self.controller.on_slider_released(fraction).ok();
                self.sync_seek_slider(cx);
            }
        }
        cx.notify();
    }

    fn sync_seek_slider(&self, cx: &mut Context<Self>) {
        let Some(fraction) = seek_slider_target(self.controller.state()) else {
            return;
        };
        self.seek_slider
            .update(cx, |slider, cx| slider.set_value(fraction, cx));
    }
}

impl Render for PlayerView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let play_label = if self.controller.state().is_playing {
            "⏸"
        } else {
            "▶"
        };

        let play_pause = div()
            .id("btn-play-pause")
            .px_4()
            .py_2()
            .rounded_md()
            .cursor_pointer()
            .text_xl()
            .child(play_label)
            .on_click(cx.listener(|this: &mut Self, _event, _window, cx| {
                this.toggle_playback(cx);
            }));

        let progress = div()
            .flex()
            .flex_col()
            .items_center()
            .gap_1()
            .p_2()
            .child(self.seek_slider.clone())
            .child(
                div()
                    .w(px(CONTROLS_WIDTH))
                    .flex()
                    .items_center()
                    .justify_between()
                    .child(div().text_sm().child(self.controller.time_label()))
                    .child(play_pause),
            );

        div()
            .size_full()
            .bg(rgb(0xffffff))
            .text_color(rgb(0x212121))
            .flex()
            .flex_col()
            .items_center()
            .gap_5()
            .p_5()
            .child(
                div()
                    .flex_1()
                    .w_full()
                    .overflow_hidden()
                    .flex()
                    .items_center()
                    .justify_center()
                    .bg(rgb(0x42a5f5))
                    .child(
                        video(self.controller.surface().clone(), self.frame_cache.clone())
                            .id("video-surface"),
                    ),
            )
            .child(progress)
            .child(self.volume_slider.clone())
            .child(self.rate_slider.clone())
    }
}

/// Where the seek slider should sit, or `None` while the user holds it.
fn seek_slider_target(state: &PlaybackState) -> Option<f64> {
    (!state.is_dragging).then(|| state.fraction())
}

/// The refresh task goes round again only on `Reschedule`; a dropped view
/// ends it as well.
fn keeps_refreshing<E>(outcome: &Result<TickOutcome, E>) -> bool {
    matches!(outcome, Ok(TickOutcome::Reschedule))
}
