//! Scalar classification metrics

use ndarray::Array1;

/// One-vs-rest confusion counts for a single label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl BinaryCounts {
    /// Count outcomes treating `positive` as the positive label
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, positive: f64) -> Self {
        let mut counts = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t == positive, *p == positive) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    /// tp / (tp + fp), 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// tp / (tp + fn), 0 when there are no positives
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        harmonic_mean(self.precision(), self.recall())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

fn harmonic_mean(p: f64, r: f64) -> f64 {
    if p + r > 0.0 {
        2.0 * p * r / (p + r)
    } else {
        0.0
    }
}

/// Fraction of exact label matches
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / y_true.len() as f64
}

pub fn precision(y_true: &Array1<f64>, y_pred: &Array1<f64>, positive: f64) -> f64 {
    BinaryCounts::compute(y_true, y_pred, positive).precision()
}

pub fn recall(y_true: &Array1<f64>, y_pred: &Array1<f64>, positive: f64) -> f64 {
    BinaryCounts::compute(y_true, y_pred, positive).recall()
}

pub fn f1(y_true: &Array1<f64>, y_pred: &Array1<f64>, positive: f64) -> f64 {
    BinaryCounts::compute(y_true, y_pred, positive).f1()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binary_counts() {
        let y_true = array![1.0, 1.0, 0.0, 0.0, 1.0];
        let y_pred = array![1.0, 0.0, 0.0, 1.0, 1.0];

        let counts = BinaryCounts::compute(&y_true, &y_pred, 1.0);
        assert_eq!(counts, BinaryCounts { tp: 2, fp: 1, tn: 1, fn_: 1 });
        assert!((counts.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&array![0.0, 1.0, 1.0, 0.0], &array![0.0, 1.0, 0.0, 0.0]), 0.75);
    }

    #[test]
    fn test_undefined_precision_is_zero() {
        let y = array![0.0, 0.0];
        assert_eq!(precision(&y, &y, 1.0), 0.0);
        assert_eq!(recall(&y, &y, 1.0), 0.0);
        assert_eq!(f1(&y, &y, 1.0), 0.0);
    }
}
