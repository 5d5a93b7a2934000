use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use eframe::egui::{
    self, ColorImage, CornerRadius, LayerId, RichText, TextureHandle, TextureOptions,
    ViewportBuilder, WindowLevel,
};
use spotify_clock_widget::{
    api::SpotifyApi,
    artwork::{ArtworkProcessor, DisplayBitmap, HttpImageSource},
    config::{Config, SpotifyCredentials},
    icons::IconSet,
    palette::Rgb,
    schedule::Ticker,
    transport::PlaybackCommand,
    widget::WidgetState,
    worker::{PollWorker, Poller},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);
const FADE_REPAINT_INTERVAL: Duration = Duration::from_millis(16);
const MAX_REPAINT_INTERVAL: Duration = Duration::from_secs(1);

const CLOCK_TEXT_SIZE: f32 = 28.0;
const MUSIC_TEXT_SIZE: f32 = 14.0;
const TIME_TEXT_SIZE: f32 = 10.0;
const BUTTON_SIZE: f32 = 40.0;
const BUTTON_SPACING: f32 = 10.0;
const TIMELINE_LABEL_GAP: f32 = 16.0;

fn to_color32(color: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(color.r, color.g, color.b)
}

fn color_image(bitmap: &DisplayBitmap) -> ColorImage {
    ColorImage::from_rgba_unmultiplied(
        [bitmap.width as usize, bitmap.height as usize],
        &bitmap.rgba,
    )
}

struct IconTextures {
    play: TextureHandle,
    pause: TextureHandle,
    next: TextureHandle,
    previous: TextureHandle,
}

impl IconTextures {
    fn upload(ctx: &egui::Context, icons: &IconSet) -> Self {
        let load = |name: &str, bitmap: &DisplayBitmap| {
            ctx.load_texture(name, color_image(bitmap), TextureOptions::LINEAR)
        };
        Self {
            play: load("icon.play", &icons.play),
            pause: load("icon.pause", &icons.pause),
            next: load("icon.next", &icons.next),
            previous: load("icon.previous", &icons.previous),
        }
    }
}

/// Slider position, following playback unless the user is holding the handle.
#[derive(Debug, Default)]
struct SeekSlider {
    value: f32,
    is_user_seeking: bool,
}

impl SeekSlider {
    /// A disabled slider never reports the end of a drag, so any grab is dropped
    /// once playback stops.
    fn sync(&mut self, progress: f32, playing: bool) {
        if !playing {
            self.is_user_seeking = false;
        }
        if !self.is_user_seeking {
            self.value = progress * 100.0;
        }
    }

    fn grab(&mut self) {
        self.is_user_seeking = true;
    }

    fn release(&mut self) -> PlaybackCommand {
        self.is_user_seeking = false;
        PlaybackCommand::seek_from_slider(self.value)
    }
}

#[derive(Clone, Copy)]
enum PlaybackButtonKind {
    Previous,
    PlayPause,
    Next,
}

struct App {
    state: WidgetState,
    worker: PollWorker,
    poll_ticker: Ticker,
    color_ticker: Ticker,
    poll_inflight: bool,
    artwork_texture: Option<TextureHandle>,
    artwork_revision: u64,
    artwork_size: f32,
    icons: IconTextures,
    slider: SeekSlider,
}

impl App {
    fn new(
        cc: &eframe::CreationContext<'_>,
        config: &Config,
        icons: &IconSet,
        poller: Poller,
    ) -> Self {
        let repaint_ctx = cc.egui_ctx.clone();
        let worker = PollWorker::spawn(poller, move || repaint_ctx.request_repaint());

        Self {
            state: WidgetState::new(&config.ui, config.timing.fade()),
            worker,
            poll_ticker: Ticker::new(config.timing.poll_interval()),
            color_ticker: Ticker::new(config.timing.color_interval()),
            poll_inflight: false,
            artwork_texture: None,
            artwork_revision: 0,
            artwork_size: config.artwork.size() as f32,
            icons: IconTextures::upload(&cc.egui_ctx, icons),
            slider: SeekSlider::default(),
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_worker();

        let now = Instant::now();
        self.state.refresh_clock(&Local::now());
        if self.color_ticker.poll(now) {
            self.state.cycler.tick(now);
        }
        self.maybe_request_poll(now);
        self.sync_artwork_texture(ctx);

        let background = self.state.cycler.color_at(now);
        let root_rect = ctx.screen_rect();
        ctx.layer_painter(LayerId::background()).rect_filled(
            root_rect,
            CornerRadius::same(0),
            to_color32(background),
        );
        let text_color = if background.is_dark() {
            egui::Color32::WHITE
        } else {
            egui::Color32::BLACK
        };

        let mut panel_frame = egui::Frame::central_panel(&ctx.style());
        panel_frame.fill = egui::Color32::TRANSPARENT;

        egui::CentralPanel::default()
            .frame(panel_frame)
            .show(ctx, |ui| {
                ui.visuals_mut().override_text_color = Some(text_color);
                ui.spacing_mut().item_spacing.y = 12.0;
                ui.vertical_centered(|column| {
                    self.render_clock(column);
                    self.render_artwork(column);
                    self.render_music_label(column);
                    self.render_timeline(column);
                    self.render_playback_buttons(column, text_color);
                });
            });

        ctx.request_repaint_after(self.desired_repaint_interval(now));
    }
}

impl App {
    fn drain_worker(&mut self) {
        while let Some(outcome) = self.worker.try_recv() {
            self.state.apply_poll(outcome);
            self.poll_inflight = false;
            self.poll_ticker.rearm(Instant::now());
        }

        if !self.worker.is_alive() {
            self.poll_inflight = false;
        }
    }

    /// The poll ticker only re-arms when the worker answers, so polls never overlap.
    fn maybe_request_poll(&mut self, now: Instant) {
        if self.poll_inflight || !self.poll_ticker.is_due(now) {
            return;
        }

        if self.worker.request_poll() {
            self.poll_inflight = true;
        } else {
            self.poll_ticker.rearm(now);
        }
    }

    fn send_command(&mut self, command: PlaybackCommand) {
        if !self.worker.send_command(command) {
            warn!("{} ignored: poller is not running", command.name());
        }
    }

    fn sync_artwork_texture(&mut self, ctx: &egui::Context) {
        if self.artwork_revision == self.state.artwork_revision() {
            return;
        }
        self.artwork_revision = self.state.artwork_revision();
        self.artwork_texture = self.state.artwork().map(|bitmap| {
            ctx.load_texture(
                "now_playing.artwork",
                color_image(bitmap),
                TextureOptions::LINEAR,
            )
        });
    }

    fn desired_repaint_interval(&self, now: Instant) -> Duration {
        if self.state.cycler.is_fading(now) {
            return FADE_REPAINT_INTERVAL;
        }

        let mut interval = self.color_ticker.time_until_due(now).min(MAX_REPAINT_INTERVAL);
        if !self.poll_inflight {
            interval = interval.min(self.poll_ticker.time_until_due(now));
        }
        interval
    }

    fn render_clock(&self, ui: &mut egui::Ui) {
        ui.label(RichText::new(&self.state.clock).size(CLOCK_TEXT_SIZE).strong());
    }

    fn render_artwork(&self, ui: &mut egui::Ui) {
        let size = egui::vec2(self.artwork_size, self.artwork_size);
        match &self.artwork_texture {
            Some(texture) => {
                ui.add(egui::Image::from_texture(texture).fit_to_exact_size(size));
            }
            None => {
                ui.allocate_space(size);
            }
        }
    }

    fn render_music_label(&self, ui: &mut egui::Ui) {
        ui.add(
            egui::Label::new(
                RichText::new(&self.state.music_label)
                    .size(MUSIC_TEXT_SIZE)
                    .strong(),
            )
            .wrap(),
        );
    }

    fn render_timeline(&mut self, ui: &mut egui::Ui) {
        let playing = self.state.is_playing();
        self.slider.sync(self.state.progress, playing);

        let width = ui.available_width();
        ui.spacing_mut().slider_width = width;
        let response = ui.add_enabled(
            playing,
            egui::Slider::new(&mut self.slider.value, 0.0..=100.0).show_value(false),
        );

        if response.drag_started() {
            self.slider.grab();
        }

        let commit_seek =
            response.drag_stopped() || (response.clicked() && !response.dragged());
        if commit_seek {
            let command = self.slider.release();
            self.send_command(command);
        }

        let elapsed = RichText::new(&self.state.elapsed_label).size(TIME_TEXT_SIZE);
        let total = RichText::new(&self.state.total_label).size(TIME_TEXT_SIZE);
        ui.spacing_mut().item_spacing.x = TIMELINE_LABEL_GAP;
        ui.columns(2, |columns| {
            columns[0].with_layout(egui::Layout::left_to_right(egui::Align::Center), |col| {
                col.label(elapsed);
            });
            columns[1].with_layout(egui::Layout::right_to_left(egui::Align::Center), |col| {
                col.label(total);
            });
        });
    }

    fn render_playback_buttons(&mut self, ui: &mut egui::Ui, tint: egui::Color32) {
        let row_width = 3.0 * BUTTON_SIZE + 2.0 * BUTTON_SPACING;
        ui.horizontal(|row| {
            row.spacing_mut().item_spacing.x = BUTTON_SPACING;
            let margin = ((row.available_width() - row_width) / 2.0).max(0.0);
            row.add_space(margin);

            for kind in [
                PlaybackButtonKind::Previous,
                PlaybackButtonKind::PlayPause,
                PlaybackButtonKind::Next,
            ] {
                self.render_playback_button(row, kind, tint);
            }
        });
    }

    fn render_playback_button(
        &mut self,
        ui: &mut egui::Ui,
        kind: PlaybackButtonKind,
        tint: egui::Color32,
    ) {
        let is_playing = self.state.is_playing();
        let (texture, hint, command) = match kind {
            PlaybackButtonKind::Previous => {
                (&self.icons.previous, "Previous track", PlaybackCommand::Previous)
            }
            PlaybackButtonKind::PlayPause if is_playing => {
                (&self.icons.pause, "Pause", PlaybackCommand::TogglePlayPause)
            }
            PlaybackButtonKind::PlayPause => {
                (&self.icons.play, "Play", PlaybackCommand::TogglePlayPause)
            }
            PlaybackButtonKind::Next => (&self.icons.next, "Next track", PlaybackCommand::Next),
        };

        let image = egui::Image::from_texture(texture)
            .fit_to_exact_size(egui::vec2(BUTTON_SIZE, BUTTON_SIZE))
            .tint(tint);
        let response = ui
            .add(egui::Button::image(image).frame(false))
            .on_hover_text(hint);
        if response.clicked() {
            self.send_command(command);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load()?;
    let icons = IconSet::load(&config.ui.assets_dir).context("Transport icons are required")?;
    let credentials = SpotifyCredentials::from_env()?;
    let api = SpotifyApi::connect(&credentials, &config.spotify)?;

    let artwork = ArtworkProcessor::new(
        Box::new(HttpImageSource::new(IMAGE_TIMEOUT)),
        config.artwork.clone(),
    );
    let poller = Poller::new(Box::new(api), artwork);

    let window = &config.window;
    let level = if window.always_on_top {
        WindowLevel::AlwaysOnTop
    } else {
        WindowLevel::Normal
    };
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title(window.title.clone())
            .with_inner_size([window.width, window.height])
            .with_position([window.x, window.y])
            .with_window_level(level),
        ..Default::default()
    };

    info!("opening widget window");
    let title = window.title.clone();
    eframe::run_native(
        &title,
        native_options,
        Box::new(
            move |cc| -> std::result::Result<
                Box<dyn eframe::App>,
                Box<dyn std::error::Error + Send + Sync>,
            > { Ok(Box::new(App::new(cc, &config, &icons, poller))) },
        ),
    )
    .map_err(|e| anyhow::anyhow!("GUI event loop failed: {e}"))
}
