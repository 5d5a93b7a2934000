use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn luminance(self) -> f32 {
        0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32
    }

    pub fn is_dark(self) -> bool {
        self.luminance() < 128.0
    }
}

pub type Palette = Vec<Rgb>;

fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
}

/// Linear blend between two colors, `t` clamped to `[0, 1]`.
pub fn lerp(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 };
    Rgb::new(
        lerp_channel(a.r, b.r, t),
        lerp_channel(a.g, b.g, t),
        lerp_channel(a.b, b.b, t),
    )
}

pub fn ease_in_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    from: Rgb,
    to: Rgb,
    started: Instant,
}

/// Walks the background color through the artwork palette, one entry per tick.
#[derive(Debug, Clone)]
pub struct PaletteCycler {
    palette: Palette,
    cursor: usize,
    fade_duration: Duration,
    resting: Rgb,
    fade: Option<Fade>,
}

impl PaletteCycler {
    pub fn new(initial: Rgb, fade_duration: Duration) -> Self {
        Self {
            palette: Vec::new(),
            cursor: 0,
            fade_duration,
            resting: initial,
            fade: None,
        }
    }

    /// Swaps in a new palette. The displayed color is kept so the next fade starts from it.
    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
        self.cursor = 0;
    }

    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Starts a fade toward the entry under the cursor and advances it. A fade still
    /// running is abandoned and the new one starts from the color shown right now.
    /// Returns the fade target, or `None` when there is no palette.
    pub fn tick(&mut self, now: Instant) -> Option<Rgb> {
        let target = *self.palette.get(self.cursor)?;
        let from = self.color_at(now);
        self.resting = from;
        self.fade = Some(Fade {
            from,
            to: target,
            started: now,
        });
        self.cursor = (self.cursor + 1) % self.palette.len();
        Some(target)
    }

    pub fn color_at(&self, now: Instant) -> Rgb {
        match self.fade {
            Some(fade) => lerp(fade.from, fade.to, ease_in_out_quad(self.progress(&fade, now))),
            None => self.resting,
        }
    }

    pub fn is_fading(&self, now: Instant) -> bool {
        self.fade
            .as_ref()
            .is_some_and(|fade| self.progress(fade, now) < 1.0)
    }

    fn progress(&self, fade: &Fade, now: Instant) -> f32 {
        if self.fade_duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(fade.started);
        (elapsed.as_secs_f32() / self.fade_duration.as_secs_f32()).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    #[test]
    fn lerp_endpoints_and_midpoint() {
        assert_eq!(lerp(RED, BLUE, 0.0), RED);
        assert_eq!(lerp(RED, BLUE, 1.0), BLUE);
        assert_eq!(lerp(RED, BLUE, 0.5), Rgb::new(128, 0, 128));
        assert_eq!(lerp(RED, BLUE, 7.0), BLUE);
        assert_eq!(lerp(RED, BLUE, f32::NAN), BLUE);
    }

    #[test]
    fn easing_is_symmetric_and_bounded() {
        assert_eq!(ease_in_out_quad(0.0), 0.0);
        assert_eq!(ease_in_out_quad(0.5), 0.5);
        assert_eq!(ease_in_out_quad(1.0), 1.0);
        assert!(ease_in_out_quad(0.25) < 0.25);
        assert!(ease_in_out_quad(0.75) > 0.75);
        assert!((ease_in_out_quad(0.2) + ease_in_out_quad(0.8) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_palette_tick_is_a_no_op() {
        let start = Instant::now();
        let mut cycler = PaletteCycler::new(Rgb::WHITE, Duration::from_millis(800));
        assert_eq!(cycler.tick(start), None);
        assert_eq!(cycler.cursor(), 0);
        assert_eq!(cycler.color_at(start + Duration::from_secs(5)), Rgb::WHITE);
        assert!(!cycler.is_fading(start));
    }

    #[test]
    fn cycling_wraps_after_palette_length() {
        let start = Instant::now();
        let palette = vec![RED, BLUE, Rgb::new(0, 255, 0)];
        let mut cycler = PaletteCycler::new(Rgb::WHITE, Duration::from_millis(800));
        cycler.set_palette(palette.clone());

        let mut targets = Vec::new();
        for i in 0..(palette.len() * 2) {
            let now = start + Duration::from_secs(i as u64);
            targets.push(cycler.tick(now).unwrap());
        }

        assert_eq!(&targets[..3], palette.as_slice());
        assert_eq!(&targets[3..], palette.as_slice());
    }

    #[test]
    fn fade_reaches_target_after_duration() {
        let start = Instant::now();
        let mut cycler = PaletteCycler::new(Rgb::WHITE, Duration::from_millis(800));
        cycler.set_palette(vec![BLUE]);
        cycler.tick(start);

        assert_eq!(cycler.color_at(start), Rgb::WHITE);
        assert!(cycler.is_fading(start + Duration::from_millis(400)));
        assert_eq!(cycler.color_at(start + Duration::from_millis(800)), BLUE);
        assert!(!cycler.is_fading(start + Duration::from_millis(800)));
    }

    #[test]
    fn restarting_mid_fade_starts_from_displayed_color() {
        let start = Instant::now();
        let mut cycler = PaletteCycler::new(Rgb::WHITE, Duration::from_millis(800));
        cycler.set_palette(vec![BLUE, RED]);
        cycler.tick(start);

        let midway = start + Duration::from_millis(400);
        let shown = cycler.color_at(midway);
        assert_ne!(shown, Rgb::WHITE);
        assert_ne!(shown, BLUE);

        assert_eq!(cycler.tick(midway), Some(RED));
        assert_eq!(cycler.color_at(midway), shown);
        assert_eq!(cycler.color_at(midway + Duration::from_millis(800)), RED);
    }

    #[test]
    fn new_palette_resets_cursor_but_keeps_color() {
        let start = Instant::now();
        let mut cycler = PaletteCycler::new(Rgb::WHITE, Duration::from_millis(100));
        cycler.set_palette(vec![RED, BLUE]);
        cycler.tick(start);
        let later = start + Duration::from_secs(1);
        assert_eq!(cycler.cursor(), 1);

        cycler.set_palette(vec![BLUE]);
        assert_eq!(cycler.cursor(), 0);
        assert_eq!(cycler.color_at(later), RED);
    }
}
