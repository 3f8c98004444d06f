use ethical_video::config::APP_TITLE;
use ethical_video::{PlayerConfig, PlayerView, Video};
use gpui::{App, AppContext, Application, TitlebarOptions, WindowOptions};

fn main() {
    env_logger::init();

    let config = match PlayerConfig::from_env() {
        Ok(Some(config)) => config,
        Ok(None) => return,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let video = match Video::new(&config.media) {
        Ok(video) => video,
        Err(err) => {
            log::error!("failed to open {}: {err}", config.media);
            std::process::exit(1);
        }
    };
    log::info!("video loaded: {}", config.media);

    Application::new().run(move |cx: &mut App| {
        cx.on_window_closed(|cx| {
            if cx.windows().is_empty() {
                cx.quit();
            }
        })
        .detach();

        let opened = cx.open_window(
            WindowOptions {
                titlebar: Some(TitlebarOptions {
                    title: Some(APP_TITLE.into()),
                    ..Default::default()
                }),
                focus: true,
                ..Default::default()
            },
            |window, cx| {
                let view = cx.new(|cx| PlayerView::new(video, &config, cx));
                let weak = view.downgrade();
                window.on_window_should_close(cx, move |_window, cx| {
                    weak.update(cx, |view, _| view.shutdown()).ok();
                    true
                });
                view
            },
        );
        if let Err(err) = opened {
            log::error!("failed to open window: {err}");
            cx.quit();
            return;
        }
        cx.activate(true);
    });
}
