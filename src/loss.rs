use crate::{
  scalar::Scalar,
  tensor::Tensor,
};


/// Reduction of a batch of predictions and labels to a single scalar.
///
/// When the predictions are traced, the result is the entry point
/// for [backward](crate::TrainableNet::backward).

pub trait Loss {
  fn compute<S: Scalar, const B: usize, const C: usize>(
    &self,
    predictions: &Tensor<S, B, C>,
    labels: &Tensor<f64, B, C>,
  ) -> S;

  /// Quality measure reported alongside the loss during evaluation, if any.

  fn metric<S: Scalar, const B: usize, const C: usize>(
    &self,
    _predictions: &Tensor<S, B, C>,
    _labels: &Tensor<f64, B, C>,
  ) -> Option<f64> {
    None
  }
}


/// Categorical cross-entropy for probability rows and one-hot labels.

#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

impl CrossEntropy {
  const EPSILON: f64 = 1e-9;

  /// Fraction of rows whose most probable class matches the label.
  /// The first maximum wins ties.

  pub fn accuracy<S: Scalar, const B: usize, const C: usize>(
    &self,
    predictions: &Tensor<S, B, C>,
    labels: &Tensor<f64, B, C>,
  ) -> f64 {
    let hits = predictions.argmax().into_iter()
      .zip(labels.argmax())
      .filter(|(p, l)| p == l )
      .count();
    hits as f64 / B as f64
  }
}

impl Loss for CrossEntropy {
  fn compute<S: Scalar, const B: usize, const C: usize>(
    &self,
    predictions: &Tensor<S, B, C>,
    labels: &Tensor<f64, B, C>,
  ) -> S {
    let log = (predictions + S::constant(Self::EPSILON)).ln();
    -(labels.cast::<S>() * log).sum() / S::constant(B as f64)
  }

  fn metric<S: Scalar, const B: usize, const C: usize>(
    &self,
    predictions: &Tensor<S, B, C>,
    labels: &Tensor<f64, B, C>,
  ) -> Option<f64> {
    Some(self.accuracy(predictions, labels))
  }
}


/// Squared error summed over channels, averaged over the batch.

#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
  fn compute<S: Scalar, const B: usize, const C: usize>(
    &self,
    predictions: &Tensor<S, B, C>,
    labels: &Tensor<f64, B, C>,
  ) -> S {
    (predictions - labels.cast::<S>()).sqr().sum() / S::constant(B as f64)
  }
}
