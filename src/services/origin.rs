//! Coarse "was this image AI-generated?" guess from two image statistics.
//!
//! This is not a validated classifier: the thresholds are fixed constants with
//! no calibration behind them and no confidence score is produced. Treat the
//! verdict as a hint shown next to the metadata, nothing more.
//!
//! The Laplacian variance is taken over every colour channel, as for a
//! 3-channel image. Edge density comes from `imageproc`'s Canny on the luma
//! plane, which smooths with a Gaussian before hysteresis. Edge density
//! therefore reads lower than an unblurred Canny on the same image would,
//! and the verdict leans towards "sharp" for noisy photos.

use image::{DynamicImage, GrayImage, RgbImage};
use std::path::{Path, PathBuf};

/// Laplacian variance below this reads as "too smooth".
pub const BLUR_VARIANCE_THRESHOLD: f64 = 100.0;

/// Summed edge-map intensity per pixel above this reads as "too busy".
pub const EDGE_DENSITY_THRESHOLD: f64 = 0.3;

const CANNY_LOW: f32 = 100.0;
const CANNY_HIGH: f32 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginVerdict {
    LikelyAi,
    LikelyHuman,
    Unreadable,
}

impl OriginVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginVerdict::LikelyAi => "Obraz prawdopodobnie wygenerowany przez AI.",
            OriginVerdict::LikelyHuman => "Obraz wygląda na wykonany przez człowieka.",
            OriginVerdict::Unreadable => "Nie udało się wczytać obrazu.",
        }
    }
}

impl std::fmt::Display for OriginVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub blur_variance: f64,
    pub edge_density: f64,
}

impl ImageStats {
    pub fn compute(img: &DynamicImage) -> Self {
        Self {
            blur_variance: laplacian_variance(&img.to_rgb8()),
            edge_density: edge_density(&img.to_luma8()),
        }
    }

    pub fn classify(&self) -> OriginVerdict {
        if self.blur_variance < BLUR_VARIANCE_THRESHOLD || self.edge_density > EDGE_DENSITY_THRESHOLD {
            OriginVerdict::LikelyAi
        } else {
            OriginVerdict::LikelyHuman
        }
    }
}

/// Opens `path` and decodes it, choosing the decoder from the file's leading
/// bytes rather than its extension.
fn decode(path: &Path) -> image::ImageResult<DynamicImage> {
    image::io::Reader::open(path)?.with_guessed_format()?.decode()
}

/// Decodes the image at `path` and classifies it. Decoding failures are a
/// verdict, not an error.
pub fn analyze_image_origin(path: &Path) -> OriginVerdict {
    let img = match decode(path) {
        Ok(img) => img,
        Err(e) => {
            tracing::info!("Origin heuristic skipped, cannot decode {}: {}", path.display(), e);
            return OriginVerdict::Unreadable;
        }
    };

    if img.width() == 0 || img.height() == 0 {
        return OriginVerdict::Unreadable;
    }

    let stats = ImageStats::compute(&img);
    let verdict = stats.classify();
    tracing::info!(
        blur_variance = stats.blur_variance,
        edge_density = stats.edge_density,
        "Origin heuristic for {}: {:?}",
        path.display(),
        verdict
    );
    verdict
}

/// Runs [`analyze_image_origin`] on the blocking pool.
pub async fn analyze_image_origin_blocking(path: PathBuf) -> OriginVerdict {
    match tokio::task::spawn_blocking(move || analyze_image_origin(&path)).await {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::error!("Origin heuristic task failed: {}", e);
            OriginVerdict::Unreadable
        }
    }
}

/// Variance of the 4-neighbour Laplacian over all samples of all channels,
/// border pixels mirrored without repeating the edge (reflect-101).
fn laplacian_variance(rgb: &RgbImage) -> f64 {
    let (w, h) = (rgb.width() as i64, rgb.height() as i64);
    let at = |x: i64, y: i64, c: usize| -> f64 { rgb.get_pixel(reflect101(x, w), reflect101(y, h))[c] as f64 };

    let n = (w * h * 3) as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                let v = at(x - 1, y, c) + at(x + 1, y, c) + at(x, y - 1, c) + at(x, y + 1, c)
                    - 4.0 * at(x, y, c);
                sum += v;
                sum_sq += v * v;
            }
        }
    }
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

fn reflect101(i: i64, len: i64) -> u32 {
    if len == 1 {
        return 0;
    }
    let r = if i < 0 {
        -i
    } else if i >= len {
        2 * (len - 1) - i
    } else {
        i
    };
    r.clamp(0, len - 1) as u32
}

/// Sum of the Canny edge map (edge pixels are 255) divided by the pixel count.
fn edge_density(gray: &GrayImage) -> f64 {
    let edges = imageproc::edges::canny(gray, CANNY_LOW, CANNY_HIGH);
    let total: u64 = edges.pixels().map(|p| p[0] as u64).sum();
    total as f64 / (gray.width() as f64 * gray.height() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    fn flat(value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_pixel(32, 32, Luma([value])))
    }

    fn checkerboard(cell: u32) -> GrayImage {
        ImageBuffer::from_fn(64, 64, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        })
    }

    #[test]
    fn test_flat_image_has_no_variance() {
        let stats = ImageStats::compute(&flat(128));
        assert_eq!(stats.blur_variance, 0.0);
        assert_eq!(stats.edge_density, 0.0);
        assert_eq!(stats.classify(), OriginVerdict::LikelyAi);
    }

    #[test]
    fn test_thresholds() {
        let human = ImageStats { blur_variance: 150.0, edge_density: 0.1 };
        assert_eq!(human.classify(), OriginVerdict::LikelyHuman);

        let smooth = ImageStats { blur_variance: 99.9, edge_density: 0.1 };
        assert_eq!(smooth.classify(), OriginVerdict::LikelyAi);

        let busy = ImageStats { blur_variance: 500.0, edge_density: 0.31 };
        assert_eq!(busy.classify(), OriginVerdict::LikelyAi);

        let boundary = ImageStats { blur_variance: 100.0, edge_density: 0.3 };
        assert_eq!(boundary.classify(), OriginVerdict::LikelyHuman);
    }

    #[test]
    fn test_sharp_pattern_has_high_variance_and_edges() {
        let stats = ImageStats::compute(&DynamicImage::ImageLuma8(checkerboard(8)));
        assert!(stats.blur_variance > BLUR_VARIANCE_THRESHOLD);
        assert!(stats.edge_density > 0.0);
    }

    #[test]
    fn test_colour_detail_counts_towards_variance() {
        // Alternating red and blue columns
        let stripes = RgbImage::from_fn(32, 32, |x, _| {
            if x % 2 == 0 { Rgb([200, 0, 0]) } else { Rgb([0, 0, 200]) }
        });
        let stats = ImageStats::compute(&DynamicImage::ImageRgb8(stripes));
        assert!(stats.blur_variance > BLUR_VARIANCE_THRESHOLD);
    }

    #[test]
    fn test_format_is_sniffed_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("board.png");
        checkerboard(4).save(&png).unwrap();

        let misnamed = dir.path().join("board.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let verdict = analyze_image_origin(&misnamed);
        assert_ne!(verdict, OriginVerdict::Unreadable);
        assert_eq!(verdict, analyze_image_origin(&png));
    }

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-1, 1), 0);
    }

    #[test]
    fn test_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.jpg");
        std::fs::write(&path, b"definitely not jpeg").unwrap();
        assert_eq!(analyze_image_origin(&path), OriginVerdict::Unreadable);

        let doc = dir.path().join("report.pdf");
        std::fs::write(&doc, b"%PDF-1.4").unwrap();
        assert_eq!(analyze_image_origin(&doc), OriginVerdict::Unreadable);
    }

    #[test]
    fn test_verdict_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.png");
        checkerboard(4).save(&path).unwrap();

        let first = analyze_image_origin(&path);
        for _ in 0..3 {
            assert_eq!(analyze_image_origin(&path), first);
        }
        assert_ne!(first, OriginVerdict::Unreadable);
    }
}
