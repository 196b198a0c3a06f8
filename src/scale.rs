use crate::error::ScaleError;

/// ColorBrewer "Blues", 7 classes.
pub const BLUES_7: [&str; 7] = [
    "#eff3ff", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#084594",
];

/// Step function from a value to one of `colors`, with equal-width bins
/// spanning `[min, max]`. Bin `i` covers `[min + i*step, min + (i+1)*step)`
/// and the last bin also includes `max`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdScale {
    min: f64,
    max: f64,
    // Interior cut points, one fewer than there are colors.
    thresholds: Vec<f64>,
    colors: Vec<String>,
}

impl ThresholdScale {
    pub fn from_values<I, S>(values: I, colors: &[S]) -> Result<Self, ScaleError>
    where
        I: IntoIterator<Item = f64>,
        S: AsRef<str>,
    {
        if colors.len() < 2 {
            return Err(ScaleError::TooFewColors(colors.len()));
        }
        // `inverse` looks colors up by value, so each must name one bin.
        for (i, color) in colors.iter().enumerate() {
            let color = color.as_ref();
            if colors[..i].iter().any(|c| c.as_ref() == color) {
                return Err(ScaleError::DuplicateColor(color.to_string()));
            }
        }

        let mut extent: Option<(f64, f64)> = None;
        for value in values {
            if !value.is_finite() {
                return Err(ScaleError::NonFinite(value));
            }
            extent = Some(match extent {
                None => (value, value),
                Some((lo, hi)) => (lo.min(value), hi.max(value)),
            });
        }
        let (min, max) = extent.ok_or(ScaleError::EmptyDomain)?;

        let bins = colors.len();
        let step = (max - min) / bins as f64;
        let thresholds = (1..bins).map(|i| min + step * i as f64).collect();

        Ok(Self {
            min,
            max,
            thresholds,
            colors: colors.iter().map(|c| c.as_ref().to_string()).collect(),
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn bin_count(&self) -> usize {
        self.colors.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bin_count() as f64
    }

    /// Every bin boundary from `min` to `max` inclusive.
    pub fn boundaries(&self) -> Vec<f64> {
        let mut boundaries = Vec::with_capacity(self.thresholds.len() + 2);
        boundaries.push(self.min);
        boundaries.extend_from_slice(&self.thresholds);
        boundaries.push(self.max);
        boundaries
    }

    pub fn bin(&self, value: f64) -> usize {
        self.thresholds.partition_point(|t| *t <= value)
    }

    pub fn forward(&self, value: f64) -> &str {
        &self.colors[self.bin(value)]
    }

    /// Value range of the bin at `index`, with the open-ended outer bins
    /// clamped to the domain.
    pub fn extent(&self, index: usize) -> Option<(f64, f64)> {
        if index >= self.bin_count() {
            return None;
        }
        let lo = if index == 0 { self.min } else { self.thresholds[index - 1] };
        let hi = self.thresholds.get(index).copied().unwrap_or(self.max);
        Some((lo, hi))
    }

    /// Value range assigned to `color`.
    pub fn inverse(&self, color: &str) -> Option<(f64, f64)> {
        let index = self.colors.iter().position(|c| c == color)?;
        self.extent(index)
    }
}

/// Linear map from a value domain onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    range_start: f64,
    range_end: f64,
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain_start: domain.0,
            domain_end: domain.1,
            range_start: range.0,
            range_end: range.1,
        }
    }

    pub fn map(self, value: f64) -> f64 {
        let span = self.domain_end - self.domain_start;
        if span == 0.0 {
            return (self.range_start + self.range_end) / 2.0;
        }
        let normalized = (value - self.domain_start) / span;
        self.range_start + normalized * (self.range_end - self.range_start)
    }

    pub fn map_round(self, value: f64) -> f64 {
        self.map(value).round()
    }
}
