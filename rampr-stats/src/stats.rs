#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResponseTimeSummary {
    pub avg: f64,
    pub fastest: f64,
    pub slowest: f64,
    pub p1: f64,
    pub median: f64,
    pub p90: f64,
}

impl ResponseTimeSummary {
    /// `None` for an empty sample.
    pub(crate) fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let sum: f64 = sorted.iter().sum();
        Some(Self {
            avg: sum / sorted.len() as f64,
            fastest: sorted[0],
            slowest: sorted[sorted.len() - 1],
            p1: quantile(&sorted, 0.01),
            median: quantile(&sorted, 0.5),
            p90: quantile(&sorted, 0.9),
        })
    }
}

/// Linear interpolation between the closest ranks of an ascending, non-empty sample.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return f64::NAN;
    };

    let h = last as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(last);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!(close(quantile(&v, 0.5), 2.5));
        assert!(close(quantile(&v, 0.9), 3.7));
        assert!(close(quantile(&v, 0.01), 1.03));
        assert!(close(quantile(&v, 0.0), 1.0));
        assert!(close(quantile(&v, 1.0), 4.0));
    }

    #[test]
    fn quantile_of_single_value() {
        assert!(close(quantile(&[0.25], 0.9), 0.25));
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn summary_sorts_input() {
        let s = ResponseTimeSummary::from_values(&[0.3, 0.1, 0.2]);
        let Some(s) = s else {
            panic!("expected a summary");
        };
        assert!(close(s.avg, 0.2));
        assert!(close(s.fastest, 0.1));
        assert!(close(s.slowest, 0.3));
        assert!(close(s.median, 0.2));
        assert!(close(s.p90, 0.28));
        assert!(close(s.p1, 0.102));
    }

    #[test]
    fn empty_sample_has_no_summary() {
        assert!(ResponseTimeSummary::from_values(&[]).is_none());
    }
}
