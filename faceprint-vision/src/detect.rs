//! Classical multi-scale face detection.
//!
//! The built-in backend slides square windows over an integral image and
//! keeps windows that survive a short sequence of cheap contrast tests
//! modeled on the structure of a frontal face (eye band darker than the
//! cheek band, nose bridge brighter than the eye regions). Overlapping
//! survivors are grouped; groups with too few members are discarded as
//! noise. The whole detector is read-only after construction and safe to
//! share across threads.

/// Integer rectangle locating a face within an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Pluggable face detection backend: grayscale buffer in, boxes out.
///
/// Exactly one contract; any algorithm satisfying it can replace the
/// built-in cascade without touching quality or feature code.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<BoundingBox>;
}

/// Fixed detection parameters, constructed once and passed by reference.
#[derive(Debug, Clone)]
pub struct DetectorParams {
    /// Multiplier between successive window sizes.
    pub scale_factor: f64,
    /// Minimum number of overlapping raw windows required to emit a face.
    pub min_neighbors: usize,
    /// Smallest detectable face in pixels (square window side).
    pub min_size: u32,
    /// Minimum intensity variance inside a window; rejects flat regions.
    pub min_variance: f64,
    /// Minimum mean-intensity gap required by the contrast stages.
    pub min_band_contrast: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 30,
            min_variance: 300.0,
            min_band_contrast: 12.0,
        }
    }
}

/// Built-in cascade-style detector.
pub struct CascadeDetector {
    params: DetectorParams,
}

impl CascadeDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }
}

impl Default for CascadeDetector {
    fn default() -> Self {
        Self::new(DetectorParams::default())
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<BoundingBox> {
        let p = &self.params;
        let max_size = width.min(height);
        if p.min_size == 0 || p.min_size > max_size {
            return vec![];
        }

        let integral = Integral::new(gray, width as usize, height as usize);
        let mut candidates: Vec<BoundingBox> = Vec::new();

        let mut size = p.min_size as f64;
        while size as u32 <= max_size {
            let s = size as u32;
            let step = ((s as f64 * 0.1) as u32).max(1) as usize;
            for y in (0..=height - s).step_by(step) {
                for x in (0..=width - s).step_by(step) {
                    if passes_stages(&integral, x, y, s, p) {
                        candidates.push(BoundingBox {
                            x,
                            y,
                            width: s,
                            height: s,
                        });
                    }
                }
            }
            size *= p.scale_factor;
        }

        group_windows(candidates, p.min_neighbors)
    }
}

/// Canonical-face policy: the box with maximum `width × height`, ties broken
/// by the earliest box in detector output order.
pub fn largest_face(faces: &[BoundingBox]) -> Option<&BoundingBox> {
    let mut best: Option<&BoundingBox> = None;
    for face in faces {
        match best {
            Some(b) if b.area() >= face.area() => {}
            _ => best = Some(face),
        }
    }
    best
}

/// Summed-area tables for O(1) window mean and variance queries.
struct Integral {
    width: usize,
    sum: Vec<u64>,
    sq: Vec<u64>,
}

impl Integral {
    fn new(gray: &[u8], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sq = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..width {
                let v = gray[y * width + x] as u64;
                row_sum += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row_sum;
                sq[(y + 1) * stride + x + 1] = sq[y * stride + x + 1] + row_sq;
            }
        }
        Self { width, sum, sq }
    }

    /// Sum over the half-open rectangle [x0, x1) × [y0, y1).
    fn region_sum(&self, table: &[u64], x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
        let stride = self.width + 1;
        let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);
        table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0]
    }

    fn mean(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
        let area = ((x1 - x0) as u64 * (y1 - y0) as u64).max(1);
        self.region_sum(&self.sum, x0, y0, x1, y1) as f64 / area as f64
    }

    fn variance(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> f64 {
        let area = ((x1 - x0) as u64 * (y1 - y0) as u64).max(1) as f64;
        let mean = self.region_sum(&self.sum, x0, y0, x1, y1) as f64 / area;
        let sq_mean = self.region_sum(&self.sq, x0, y0, x1, y1) as f64 / area;
        (sq_mean - mean * mean).max(0.0)
    }
}

/// Rejection stages for a candidate window at (x, y) with side `s`.
///
/// Region fractions are fixed relative to the window: eyes sit in the
/// 20–45% row band, cheeks in the 50–80% band, the nose bridge between the
/// two eye columns.
fn passes_stages(integral: &Integral, x: u32, y: u32, s: u32, p: &DetectorParams) -> bool {
    let fx = |f: f64| x + (s as f64 * f) as u32;
    let fy = |f: f64| y + (s as f64 * f) as u32;

    // Stage 1: flat regions cannot contain a face.
    if integral.variance(x, y, x + s, y + s) < p.min_variance {
        return false;
    }

    // Stage 2: the eye band is darker than the cheek band.
    let eye_band = integral.mean(fx(0.15), fy(0.20), fx(0.85), fy(0.45));
    let cheek_band = integral.mean(fx(0.15), fy(0.50), fx(0.85), fy(0.80));
    if cheek_band - eye_band < p.min_band_contrast {
        return false;
    }

    // Stage 3: the nose bridge is brighter than both eye regions.
    let left_eye = integral.mean(fx(0.18), fy(0.20), fx(0.42), fy(0.45));
    let right_eye = integral.mean(fx(0.58), fy(0.20), fx(0.82), fy(0.45));
    let bridge = integral.mean(fx(0.42), fy(0.20), fx(0.58), fy(0.45));
    bridge - (left_eye + right_eye) / 2.0 >= p.min_band_contrast
}

/// Group overlapping windows; clusters below `min_neighbors` are dropped and
/// survivors emit their averaged box, in first-seen cluster order.
fn group_windows(candidates: Vec<BoundingBox>, min_neighbors: usize) -> Vec<BoundingBox> {
    let mut clusters: Vec<Vec<BoundingBox>> = Vec::new();
    for window in candidates {
        match clusters.iter_mut().find(|c| is_neighbor(&c[0], &window)) {
            Some(cluster) => cluster.push(window),
            None => clusters.push(vec![window]),
        }
    }

    clusters
        .into_iter()
        .filter(|c| c.len() >= min_neighbors.max(1))
        .map(|c| {
            let n = c.len() as u64;
            BoundingBox {
                x: (c.iter().map(|b| b.x as u64).sum::<u64>() / n) as u32,
                y: (c.iter().map(|b| b.y as u64).sum::<u64>() / n) as u32,
                width: (c.iter().map(|b| b.width as u64).sum::<u64>() / n) as u32,
                height: (c.iter().map(|b| b.height as u64).sum::<u64>() / n) as u32,
            }
        })
        .collect()
}

fn is_neighbor(a: &BoundingBox, b: &BoundingBox) -> bool {
    let tolerance = (a.width.min(b.width) as f64 * 0.2) as i64 + 3;
    let (small, large) = if a.width < b.width {
        (a.width, b.width)
    } else {
        (b.width, a.width)
    };
    (a.x as i64 - b.x as i64).abs() <= tolerance
        && (a.y as i64 - b.y as i64).abs() <= tolerance
        && large as f64 <= small as f64 * 1.3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(width: u32, height: u32, value: u8) -> Vec<u8> {
        vec![value; (width * height) as usize]
    }

    #[test]
    fn blank_image_has_no_faces() {
        let detector = CascadeDetector::default();
        let faces = detector.detect(&flat_image(200, 200, 128), 200, 200);
        assert!(faces.is_empty());
    }

    #[test]
    fn image_smaller_than_min_size_has_no_faces() {
        let detector = CascadeDetector::default();
        let faces = detector.detect(&flat_image(10, 10, 128), 10, 10);
        assert!(faces.is_empty());
    }

    #[test]
    fn integral_region_sums() {
        // 3x3 image with values 1..=9
        let gray: Vec<u8> = (1..=9).collect();
        let integral = Integral::new(&gray, 3, 3);
        assert_eq!(integral.region_sum(&integral.sum, 0, 0, 3, 3), 45);
        assert_eq!(integral.region_sum(&integral.sum, 1, 1, 3, 3), 5 + 6 + 8 + 9);
        assert!((integral.mean(0, 0, 3, 3) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn integral_variance_of_flat_region_is_zero() {
        let integral = Integral::new(&flat_image(8, 8, 77), 8, 8);
        assert!(integral.variance(0, 0, 8, 8) < 1e-9);
    }

    #[test]
    fn largest_face_prefers_area_then_order() {
        let faces = vec![
            BoundingBox { x: 0, y: 0, width: 40, height: 40 },
            BoundingBox { x: 5, y: 5, width: 60, height: 60 },
            BoundingBox { x: 9, y: 9, width: 60, height: 60 },
        ];
        let best = largest_face(&faces).unwrap();
        assert_eq!(best.x, 5);

        assert!(largest_face(&[]).is_none());
    }

    #[test]
    fn grouping_drops_lone_windows() {
        let lone = vec![BoundingBox { x: 0, y: 0, width: 30, height: 30 }];
        assert!(group_windows(lone, 5).is_empty());
    }

    #[test]
    fn grouping_averages_a_cluster() {
        let cluster: Vec<BoundingBox> = (0..6)
            .map(|i| BoundingBox { x: 100 + i, y: 100, width: 40, height: 40 })
            .collect();
        let grouped = group_windows(cluster, 5);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].width, 40);
        assert!(grouped[0].x >= 100 && grouped[0].x <= 105);
    }
}
