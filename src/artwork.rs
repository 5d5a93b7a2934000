use std::{cmp::Reverse, time::Duration};

use image::{imageops::FilterType, RgbaImage};
use tracing::{debug, warn};
use ureq::Agent;

use crate::{
    config::ArtworkConfig,
    error::{Result, WidgetError},
    palette::{Palette, Rgb},
};

const MAX_SAMPLES: usize = 6_000;
const MAX_ITER: usize = 10;

pub trait ImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpImageSource {
    agent: Agent,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder().timeout_global(Some(timeout)).build();
        Self {
            agent: config.into(),
        }
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let download_error = |message: String| WidgetError::Download {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| download_error(e.to_string()))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| download_error(e.to_string()))
    }
}

/// Square RGBA pixels ready to hand to the GUI.
#[derive(Clone, PartialEq, Eq)]
pub struct DisplayBitmap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for DisplayBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl From<RgbaImage> for DisplayBitmap {
    fn from(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkUpdate {
    pub url: String,
    pub bitmap: DisplayBitmap,
    pub palette: Palette,
}

pub struct ArtworkProcessor {
    source: Box<dyn ImageSource + Send>,
    config: ArtworkConfig,
    last_url: Option<String>,
}

impl ArtworkProcessor {
    pub fn new(source: Box<dyn ImageSource + Send>, config: ArtworkConfig) -> Self {
        Self {
            source,
            config,
            last_url: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    /// Forget the current album so the same URL is processed again next time.
    pub fn reset(&mut self) {
        self.last_url = None;
    }

    /// Returns new artwork when `url` differs from the last processed one. Failures
    /// are logged and leave the previous artwork in place. An empty `url` means the
    /// item has no artwork, so the album is forgotten.
    pub fn process(&mut self, url: &str) -> Option<ArtworkUpdate> {
        if url.is_empty() {
            self.reset();
            return None;
        }
        if self.last_url.as_deref() == Some(url) {
            return None;
        }

        match self.load(url) {
            Ok(update) => {
                debug!(url, colors = update.palette.len(), "artwork processed");
                self.last_url = Some(url.to_string());
                Some(update)
            }
            Err(err) => {
                warn!("Failed to load album artwork: {err}");
                None
            }
        }
    }

    fn load(&self, url: &str) -> Result<ArtworkUpdate> {
        let bytes = self.source.fetch(url)?;
        let (bitmap, palette) =
            prepare_artwork(&bytes, self.config.size(), self.config.palette_size())?;
        Ok(ArtworkUpdate {
            url: url.to_string(),
            bitmap,
            palette,
        })
    }
}

/// Decodes once and derives both the display bitmap and the palette from it.
pub fn prepare_artwork(
    bytes: &[u8],
    size: u32,
    colors: usize,
) -> Result<(DisplayBitmap, Palette)> {
    let image = image::load_from_memory(bytes)?;
    let resized = image.resize_exact(size, size, FilterType::Triangle).to_rgba8();
    let palette = extract_palette(&resized, colors);
    Ok((resized.into(), palette))
}

#[derive(Clone, Copy)]
struct Cluster {
    centroid: [f32; 3],
    count: usize,
}

fn sample_pixels(image: &RgbaImage, max_samples: usize) -> Vec<[f32; 3]> {
    let total = image.pixels().len();
    if total == 0 || max_samples == 0 {
        return Vec::new();
    }

    let step = total.div_ceil(max_samples);
    image
        .pixels()
        .step_by(step)
        .filter(|pixel| pixel[3] >= 16)
        .take(max_samples)
        .map(|pixel| [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32])
        .collect()
}

fn squared_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

fn nearest(centroids: &[[f32; 3]], sample: &[f32; 3]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f32::MAX;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(sample, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

/// Farthest-point seeding: each new seed is the sample furthest from those already picked.
fn seed_centroids(samples: &[[f32; 3]], k: usize) -> Vec<[f32; 3]> {
    let mut centroids = vec![samples[0]];
    let mut nearest_dist: Vec<f32> = samples
        .iter()
        .map(|sample| squared_distance(sample, &samples[0]))
        .collect();

    while centroids.len() < k {
        let (far_idx, _) = nearest_dist
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (idx, &dist)| {
                if dist > best.1 {
                    (idx, dist)
                } else {
                    best
                }
            });
        let seed = samples[far_idx];
        for (dist, sample) in nearest_dist.iter_mut().zip(samples) {
            *dist = dist.min(squared_distance(sample, &seed));
        }
        centroids.push(seed);
    }

    centroids
}

fn kmeans_clusters(samples: &[[f32; 3]], k: usize, max_iter: usize) -> Vec<Cluster> {
    if samples.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut centroids = seed_centroids(samples, k);

    for iter in 0..max_iter {
        let mut sums = vec![[0f32; 3]; k];
        let mut counts = vec![0usize; k];

        for sample in samples {
            let best = nearest(&centroids, sample);
            for channel in 0..3 {
                sums[best][channel] += sample[channel];
            }
            counts[best] += 1;
        }

        let mut changed = false;
        for i in 0..k {
            if counts[i] == 0 {
                centroids[i] = samples[(i + iter) % samples.len()];
                changed = true;
                continue;
            }
            let updated = [
                sums[i][0] / counts[i] as f32,
                sums[i][1] / counts[i] as f32,
                sums[i][2] / counts[i] as f32,
            ];
            if squared_distance(&centroids[i], &updated) > 1e-2 {
                changed = true;
            }
            centroids[i] = updated;
        }

        if !changed {
            break;
        }
    }

    let mut counts = vec![0usize; k];
    for sample in samples {
        counts[nearest(&centroids, sample)] += 1;
    }

    centroids
        .into_iter()
        .zip(counts)
        .map(|(centroid, count)| Cluster { centroid, count })
        .collect()
}

fn color_from_centroid(centroid: [f32; 3]) -> Rgb {
    let channel = |value: f32| value.clamp(0.0, 255.0).round() as u8;
    Rgb::new(channel(centroid[0]), channel(centroid[1]), channel(centroid[2]))
}

/// Up to `colors` representative colors, most common first. Identical colors collapse,
/// so a flat image yields a single entry.
pub fn extract_palette(image: &RgbaImage, colors: usize) -> Palette {
    let samples = sample_pixels(image, MAX_SAMPLES);
    let k = colors.min(samples.len());
    let mut clusters = kmeans_clusters(&samples, k, MAX_ITER);
    clusters.sort_by_key(|cluster| Reverse(cluster.count));

    let mut palette: Palette = Vec::with_capacity(k);
    for cluster in clusters.into_iter().filter(|cluster| cluster.count > 0) {
        let color = color_from_centroid(cluster.centroid);
        if !palette.contains(&color) {
            palette.push(color);
        }
    }
    palette
}
