use crate::binning::BinShape;

/// Fixed-width 1D histogram. Values below `min` or at/above `max` go to the
/// underflow/overflow counters and are not part of the integral.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub name: String,
    pub axis_label: String,
    pub shape: BinShape,
    contents: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: usize,
}

impl Histogram {
    pub fn new(name: impl Into<String>, axis_label: impl Into<String>, shape: BinShape) -> Self {
        Self {
            name: name.into(),
            axis_label: axis_label.into(),
            shape,
            contents: vec![0.0; shape.bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    pub fn bin_width(&self) -> f64 {
        (self.shape.max - self.shape.min) / self.shape.bins as f64
    }

    pub fn fill(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.entries += 1;
        if value < self.shape.min {
            self.underflow += 1.0;
        } else if value >= self.shape.max || self.contents.is_empty() {
            self.overflow += 1.0;
        } else {
            let idx = ((value - self.shape.min) / self.bin_width()).floor() as usize;
            // rounding right below max
            let idx = idx.min(self.contents.len() - 1);
            self.contents[idx] += 1.0;
        }
    }

    pub fn fill_all(&mut self, values: &[f64]) {
        for &v in values {
            self.fill(v);
        }
    }

    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Sum of the in-range bins.
    pub fn integral(&self) -> f64 {
        self.contents.iter().sum()
    }

    pub fn scale(&mut self, factor: f64) {
        for c in self.contents.iter_mut() {
            *c *= factor;
        }
        self.underflow *= factor;
        self.overflow *= factor;
    }

    /// Scale to unit area; empty histograms are left alone.
    pub fn normalize(&mut self) {
        let integral = self.integral();
        if integral != 0.0 {
            self.scale(1.0 / integral);
        }
    }

    pub fn maximum(&self) -> f64 {
        self.contents.iter().copied().fold(0.0, f64::max)
    }

    /// Smallest bin content above zero.
    pub fn minimum_positive(&self) -> Option<f64> {
        self.contents
            .iter()
            .copied()
            .filter(|c| *c > 0.0)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// `(low edge, content)` per bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let width = self.bin_width();
        self.contents
            .iter()
            .enumerate()
            .map(move |(i, &c)| (self.shape.min + i as f64 * width, c))
    }

    /// Outline of the histogram as a step path, with `floor` used for empty bins.
    pub fn step_points(&self, floor: f64) -> Vec<(f64, f64)> {
        let width = self.bin_width();
        let mut points = Vec::with_capacity(self.contents.len() * 2 + 2);
        points.push((self.shape.min, floor));
        for (low, content) in self.bins() {
            let y = content.max(floor);
            points.push((low, y));
            points.push((low + width, y));
        }
        points.push((self.shape.max, floor));
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist() -> Histogram {
        Histogram::new("h", "; x;", BinShape::new(4, 0.0, 4.0))
    }

    #[test]
    fn fills_bins_and_overflow() {
        let mut h = hist();
        h.fill_all(&[-1.0, 0.0, 0.5, 1.0, 3.999, 4.0, 10.0, f64::NAN]);

        assert_eq!(h.contents(), &[2.0, 1.0, 0.0, 1.0]);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.overflow(), 2.0);
        assert_eq!(h.entries(), 7);
        assert_eq!(h.integral(), 4.0);
    }

    #[test]
    fn normalizes_to_unit_area() {
        let mut h = hist();
        h.fill_all(&[0.5, 0.5, 1.5, 2.5]);
        h.normalize();

        assert!((h.integral() - 1.0).abs() < 1e-12);
        assert!((h.maximum() - 0.5).abs() < 1e-12);
        assert_eq!(h.minimum_positive(), Some(0.25));
    }

    #[test]
    fn empty_histogram_is_not_scaled() {
        let mut h = hist();
        h.fill(-5.0);
        h.normalize();

        assert_eq!(h.integral(), 0.0);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.minimum_positive(), None);
    }

    #[test]
    fn step_points_trace_every_bin() {
        let mut h = hist();
        h.fill(1.5);
        let points = h.step_points(0.0);

        assert_eq!(points.len(), 10);
        assert_eq!(points[0], (0.0, 0.0));
        assert_eq!(points[3], (1.0, 1.0));
        assert_eq!(points[4], (2.0, 1.0));
        assert_eq!(points[9], (4.0, 0.0));
    }
}
