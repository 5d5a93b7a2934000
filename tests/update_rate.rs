use std::time::{Duration, Instant};

use spotify_clock_widget::{
    config::TimingConfig,
    palette::{PaletteCycler, Rgb},
    schedule::Ticker,
};

#[test]
fn test_update_rate() {
    let timing = TimingConfig::default();
    let mut ticker = Ticker::new(timing.poll_interval());
    let start = Instant::now();

    // Ten seconds of frames at ~60 Hz.
    let fired = (0..600)
        .map(|frame| start + Duration::from_millis(frame * 16 + 1))
        .filter(|&now| ticker.poll(now))
        .count();

    assert_eq!(fired, 10, "The clock did not refresh once per second.");
}

#[test]
fn test_color_ticks_follow_their_own_timer() {
    let timing = TimingConfig::default();
    let mut colors = Ticker::new(timing.color_interval());
    let mut cycler = PaletteCycler::new(Rgb::WHITE, timing.fade());
    let palette = vec![Rgb::new(200, 0, 0), Rgb::new(0, 200, 0), Rgb::new(0, 0, 200)];
    cycler.set_palette(palette.clone());

    let start = Instant::now();
    let mut targets = Vec::new();
    for step in 0..40 {
        let now = start + Duration::from_millis(step * 250);
        if colors.poll(now) {
            targets.extend(cycler.tick(now));
        }
    }

    assert_eq!(targets.len(), 10);
    for (i, target) in targets.iter().enumerate() {
        assert_eq!(*target, palette[i % palette.len()]);
    }
}

#[test]
fn test_fade_settles_before_next_tick() {
    let timing = TimingConfig::default();
    let mut cycler = PaletteCycler::new(Rgb::WHITE, timing.fade());
    cycler.set_palette(vec![Rgb::new(0, 0, 0)]);

    let start = Instant::now();
    cycler.tick(start);
    let next_tick = start + timing.color_interval();
    assert!(!cycler.is_fading(next_tick));
    assert_eq!(cycler.color_at(next_tick), Rgb::new(0, 0, 0));
}
