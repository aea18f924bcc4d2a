use std::fmt::Debug;

use itertools::izip;
use serde::{ Serialize, Deserialize };

use crate::{
  scalar::Differentiable,
  tensor::Tensor,
};


/// An optimization strategy to be used with [Optimizer].
///
/// Strategies map the gradient of one parameter tensor to the amount
/// that should be subtracted from it, keeping whatever history they need.

pub trait Strategy<const R: usize, const C: usize>: Debug {
  fn update(&mut self, grad: &Tensor<f64, R, C>) -> Tensor<f64, R, C>;
}


/// Stochastic Gradient Descent with momentum

#[derive(Debug, Clone)]
pub struct Sgd<const R: usize, const C: usize> {
  pub learning_rate: f64,
  pub momentum: f64,
  velocity: Tensor<f64, R, C>,
}

impl<const R: usize, const C: usize> Sgd<R, C> {
  pub fn new(learning_rate: f64, momentum: f64) -> Self {
    Self {
      learning_rate,
      momentum,
      velocity: Tensor::zeros(),
    }
  }
}

impl<const R: usize, const C: usize> Strategy<R, C> for Sgd<R, C> {
  fn update(&mut self, grad: &Tensor<f64, R, C>) -> Tensor<f64, R, C> {
    for (v, &g) in self.velocity.iter_mut().zip(grad.raw()) {
      *v = self.momentum * *v + self.learning_rate * g;
    }
    self.velocity.clone()
  }
}


/// Adaptive Movement Estimation strategy (ADAM)

#[derive(Debug, Clone)]
pub struct Adam<const R: usize, const C: usize> {
  pub learning_rate: f64,
  pub beta1: f64,
  pub beta2: f64,
  pub epsilon: f64,
  m: Tensor<f64, R, C>,
  v: Tensor<f64, R, C>,
  step: i32,
}

impl<const R: usize, const C: usize> Adam<R, C> {
  pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
    Self {
      learning_rate,
      beta1,
      beta2,
      epsilon,
      m: Tensor::zeros(),
      v: Tensor::zeros(),
      step: 1,
    }
  }
}

impl<const R: usize, const C: usize> Strategy<R, C> for Adam<R, C> {
  fn update(&mut self, grad: &Tensor<f64, R, C>) -> Tensor<f64, R, C> {
    let correction1 = 1.0 - self.beta1.powi(self.step);
    let correction2 = 1.0 - self.beta2.powi(self.step);
    let mut delta = Tensor::<f64, R, C>::zeros();
    for (d, m, v, &g) in izip!(delta.iter_mut(), self.m.iter_mut(), self.v.iter_mut(), grad.raw()) {
      *m = self.beta1 * *m + (1.0 - self.beta1) * g;
      *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
      let mt = *m / correction1;
      let vt = *v / correction2;
      *d = self.learning_rate * mt / (vt.sqrt() + self.epsilon);
    }
    self.step += 1;
    delta
  }
}


/// Optimizer bound to exactly one parameter tensor of shape `R x C`.

#[derive(Debug)]
pub struct Optimizer<const R: usize, const C: usize> {
  strategy: Box<dyn Strategy<R, C>>,
}

impl<const R: usize, const C: usize> Optimizer<R, C> {
  pub fn new(strategy: impl Strategy<R, C> + 'static) -> Self {
    Self { strategy: Box::new(strategy) }
  }

  /// Compute the step for `param` from the adjoints of its elements.

  pub fn update<S: Differentiable>(&mut self, param: &Tensor<S, R, C>) -> Tensor<f64, R, C> {
    let grad = param.vectorize(|a| a.adjoint() );
    self.strategy.update(&grad)
  }

  /// Move `param` against its gradient in place, keeping its tape registration.

  pub fn minimize<S: Differentiable>(&mut self, param: &mut Tensor<S, R, C>) {
    let delta = self.update(param);
    for (w, &d) in param.iter_mut().zip(delta.raw()) {
      w.assign(w.value() - d);
    }
  }
}


/// Serializable optimizer configuration that produces
/// a freshly zeroed [Optimizer] for every parameter tensor.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OptimizerFactory {
  Sgd { learning_rate: f64, momentum: f64 },
  Adam { learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64 },
}

impl OptimizerFactory {
  pub fn sgd(learning_rate: f64) -> Self {
    Self::Sgd { learning_rate, momentum: 0.9 }
  }

  pub fn adam(learning_rate: f64) -> Self {
    Self::Adam { learning_rate, beta1: 0.9, beta2: 0.999, epsilon: 1e-8 }
  }

  pub fn learning_rate(&self) -> f64 {
    match *self {
      Self::Sgd { learning_rate, .. } => learning_rate,
      Self::Adam { learning_rate, .. } => learning_rate,
    }
  }

  pub fn create_optimizer<S, const R: usize, const C: usize>(&self, _param: &Tensor<S, R, C>) -> Optimizer<R, C> {
    match *self {
      Self::Sgd { learning_rate, momentum } => Optimizer::new(Sgd::new(learning_rate, momentum)),
      Self::Adam { learning_rate, beta1, beta2, epsilon } => {
        Optimizer::new(Adam::new(learning_rate, beta1, beta2, epsilon))
      },
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::variable::Tape;

  #[test]
  fn sgd_momentum() {
    let mut sgd = Sgd::<1, 2>::new(0.1, 0.5);
    let grad = Tensor::from_rows([[1.0, -2.0]]);
    assert_eq!(sgd.update(&grad).raw(), &[0.1, -0.2]);
    let second = sgd.update(&grad);
    assert!((second[(0, 0)] - 0.15).abs() < 1e-12);
    assert!((second[(0, 1)] + 0.3).abs() < 1e-12);
  }

  #[test]
  fn adam_first_step_is_sign() {
    let mut adam = Adam::<2, 2>::new(0.01, 0.9, 0.999, 1e-8);
    let grad = Tensor::from_rows([[3.0, -0.02], [100.0, -7.5]]);
    let delta = adam.update(&grad);
    for (&d, &g) in delta.raw().iter().zip(grad.raw()) {
      assert!((d - 0.01 * g.signum()).abs() < 1e-6, "{d} for {g}");
    }
  }

  #[test]
  fn adam_bias_correction() {
    let mut adam = Adam::<1, 1>::new(0.1, 0.9, 0.999, 0.0);
    let deltas: Vec<f64> = [1.0, 2.0, -1.0].into_iter()
      .map(|g| adam.update(&Tensor::from_rows([[g]]))[(0, 0)] )
      .collect();
    // m and v carry over, corrected by 1 - beta^t for t = 1, 2, 3
    let expected = [0.1, 0.09651820258217679, 0.04200893035702754];
    for (d, e) in deltas.iter().zip(expected) {
      assert!((d - e).abs() < 1e-12, "{d} != {e}");
    }
  }

  #[test]
  fn zero_gradient_stays_put() {
    let mut adam = Adam::<1, 3>::new(0.01, 0.9, 0.999, 1e-8);
    assert_eq!(adam.update(&Tensor::zeros()).raw(), &[0.0; 3]);
  }

  #[test]
  fn factory_creates_independent_state() {
    let factory = OptimizerFactory::sgd(0.1);
    let tape = Tape::new();
    let mut param = Tensor::<f64, 1, 1>::ones().vectorize(|a| tape.parameter(a) );
    let mut a = factory.create_optimizer(&param);
    let mut b = factory.create_optimizer(&param);
    (param[(0, 0)] * 2.0).gradient();
    a.update(&param);
    let first_a = a.update(&param);
    let first_b = b.update(&param);
    assert!(first_a[(0, 0)] > first_b[(0, 0)]);
    b.minimize(&mut param);
    assert!(param[(0, 0)].is_parameter());
  }

  #[test]
  fn factory_serializes() {
    let factory = OptimizerFactory::adam(3e-4);
    let bytes = postcard::to_allocvec(&factory).unwrap();
    let back: OptimizerFactory = postcard::from_bytes(&bytes).unwrap();
    assert_eq!(back, factory);
    assert_eq!(back.learning_rate(), 3e-4);
  }
}
