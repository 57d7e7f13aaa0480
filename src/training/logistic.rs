//! Logistic regression for binary classification

use crate::error::{HeartmlError, Result};
use crate::training::metrics::DECISION_THRESHOLD;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// L2-regularized logistic regression fit by batch gradient descent.
///
/// Expects standardized features; the default learning rate assumes inputs
/// on roughly unit scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum gradient descent iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Fit by gradient descent. Labels must be 0 or 1.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HeartmlError::Shape {
                expected: format!("y length = {n_samples}"),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(HeartmlError::Training(
                "cannot fit on an empty dataset".to_string(),
            ));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(HeartmlError::Training(
                "labels must be binary (0 or 1)".to_string(),
            ));
        }

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        let lr = self.learning_rate;
        let alpha = self.alpha;

        for _iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * &dw;
            bias -= lr * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        Ok(self)
    }

    /// Positive-class probability per row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(HeartmlError::NotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(HeartmlError::Shape {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{}", x.ncols()),
            });
        }
        let intercept = self.intercept.unwrap_or(0.0);
        let linear = x.dot(coefficients) + intercept;
        Ok(Self::sigmoid(&linear))
    }

    /// Class labels at the shared decision threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [-2.0, -1.5],
            [-1.5, -2.0],
            [-1.0, -1.0],
            [-0.5, -1.2],
            [0.5, 1.2],
            [1.0, 1.0],
            [1.5, 2.0],
            [2.0, 1.5],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn learns_linearly_separable_data() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new().with_max_iter(2000);
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count();
        assert_eq!(correct, 8);
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn prediction_matches_thresholded_probability() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        let preds = model.predict(&x).unwrap();
        for (p, pred) in proba.iter().zip(preds.iter()) {
            assert_eq!(*pred == 1.0, *p >= 0.5);
        }
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = LogisticRegression::new();
        let x = array![[1.0, 2.0]];
        assert!(matches!(
            model.predict_proba(&x),
            Err(HeartmlError::NotFitted)
        ));
    }

    #[test]
    fn non_binary_labels_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 3.0];
        let mut model = LogisticRegression::new();
        assert!(matches!(
            model.fit(&x, &y),
            Err(HeartmlError::Training(_))
        ));
    }

    #[test]
    fn feature_count_mismatch_rejected_at_predict() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();
        let bad = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            model.predict_proba(&bad),
            Err(HeartmlError::Shape { .. })
        ));
    }
}
