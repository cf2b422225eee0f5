//! Multinomial logistic regression trained by batch gradient descent.

use crate::encoding::{Features, N_FEATURES};

/// A softmax classifier over standardized features.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    weights: Vec<Features>,
    bias: Vec<f64>,
}

/// Optimizer settings for [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy)]
pub struct FitParams {
    /// Number of full passes over the training set.
    pub epochs: u32,
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// L2 penalty applied to the weights (not the bias).
    pub l2: f64,
}

impl LogisticRegression {
    /// Fits a model to `rows` labelled with class codes in `0..n_classes`.
    ///
    /// With a single class the model always predicts it with probability 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(rows: &[Features], labels: &[usize], n_classes: usize, params: FitParams) -> Self {
        let mut model = Self {
            weights: vec![[0.0; N_FEATURES]; n_classes],
            bias: vec![0.0; n_classes],
        };
        if n_classes < 2 || rows.is_empty() {
            return model;
        }

        let n = rows.len() as f64;
        let mut grad_w = vec![[0.0; N_FEATURES]; n_classes];
        let mut grad_b = vec![0.0; n_classes];

        for epoch in 0..params.epochs {
            for g in &mut grad_w {
                *g = [0.0; N_FEATURES];
            }
            grad_b.fill(0.0);
            let mut loss = 0.0;

            for (row, &label) in rows.iter().zip(labels) {
                let probabilities = model.predict_proba(row);
                loss -= probabilities[label].max(f64::MIN_POSITIVE).ln();
                for (k, p) in probabilities.iter().enumerate() {
                    let error = p - if k == label { 1.0 } else { 0.0 };
                    for (g, x) in grad_w[k].iter_mut().zip(row) {
                        *g += error * x;
                    }
                    grad_b[k] += error;
                }
            }

            for k in 0..n_classes {
                for (w, g) in model.weights[k].iter_mut().zip(&grad_w[k]) {
                    *w -= params.learning_rate * (g / n + params.l2 * *w);
                }
                model.bias[k] -= params.learning_rate * grad_b[k] / n;
            }

            if epoch % 50 == 0 {
                log::trace!("epoch {epoch}: mean log loss {:.4}", loss / n);
            }
        }

        model
    }

    /// Returns the per-class probabilities for one standardized row.
    #[must_use]
    pub fn predict_proba(&self, row: &Features) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect();

        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / total).collect()
    }

    /// Returns the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.bias.len()
    }
}

/// Returns the index and value of the largest probability.
///
/// Ties resolve to the lowest index.
#[must_use]
pub fn argmax(probabilities: &[f64]) -> Option<(usize, f64)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((i, p)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: FitParams = FitParams {
        epochs: 300,
        learning_rate: 0.5,
        l2: 0.0,
    };

    #[test]
    fn probabilities_sum_to_one() {
        let rows = [[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let model = LogisticRegression::fit(&rows, &[0, 1, 2], 3, PARAMS);
        for row in &rows {
            let p = model.predict_proba(row);
            assert_eq!(p.len(), 3);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert!(p.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn separates_linearly_separable_classes() {
        let rows = [
            [-2.0, 0.0, 0.0],
            [-1.5, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.5, 0.0, 0.0],
            [2.0, 0.0, 0.0],
        ];
        let labels = [0, 0, 0, 1, 1, 1];
        let model = LogisticRegression::fit(&rows, &labels, 2, PARAMS);

        let (left, p_left) = argmax(&model.predict_proba(&[-1.8, 0.0, 0.0])).unwrap();
        let (right, p_right) = argmax(&model.predict_proba(&[1.8, 0.0, 0.0])).unwrap();
        assert_eq!(left, 0);
        assert_eq!(right, 1);
        assert!(p_left > 0.5);
        assert!(p_right > 0.5);
    }

    #[test]
    fn single_class_predicts_certainty() {
        let model = LogisticRegression::fit(&[[0.3, 0.1, 0.2]], &[0], 1, PARAMS);
        assert_eq!(model.predict_proba(&[5.0, 5.0, 5.0]), vec![1.0]);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.25, 0.5, 0.5]), Some((1, 0.5)));
        assert_eq!(argmax(&[]), None);
    }
}
