use rand::{ Rng, SeedableRng, rngs::StdRng };
use serde::{ Serialize, Deserialize };

use crate::{
  scalar::Scalar,
  tensor::Tensor,
};


/// How the weight matrix of a [Linear](crate::layer::Linear) layer gets initialized.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
  /// Glorot/Xavier normal, `N(0, sqrt(2 / (fan_in + fan_out)))`.
  GlorotNormal,
  Normal { std: f64 },
  Constant { value: f64 },
}

impl Default for WeightInit {
  fn default() -> Self {
    Self::GlorotNormal
  }
}

impl WeightInit {
  pub fn sample<S, R, const IN: usize, const OUT: usize>(&self, rng: &mut R) -> Tensor<S, IN, OUT>
  where
    S: Scalar,
    R: Rng,
  {
    match *self {
      Self::GlorotNormal => Tensor::randn(rng, (2.0 / (IN + OUT) as f64).sqrt()),
      Self::Normal { std } => Tensor::randn(rng, std),
      Self::Constant { value } => Tensor::fill(S::constant(value)),
    }
  }
}


/// How the bias row of a [Linear](crate::layer::Linear) layer gets initialized.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BiasInit {
  Zero,
  Normal { std: f64 },
  Constant { value: f64 },
}

impl Default for BiasInit {
  fn default() -> Self {
    Self::Zero
  }
}

impl BiasInit {
  pub fn sample<S, R, const OUT: usize>(&self, rng: &mut R) -> Tensor<S, 1, OUT>
  where
    S: Scalar,
    R: Rng,
  {
    match *self {
      Self::Zero => Tensor::zeros(),
      Self::Normal { std } => Tensor::randn(rng, std),
      Self::Constant { value } => Tensor::fill(S::constant(value)),
    }
  }
}


/// Random source for initialization. Seeded runs are reproducible.

pub(crate) fn rng(seed: Option<u64>) -> StdRng {
  match seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn glorot_spread() {
    let mut rng = rng(Some(3));
    let w: Tensor<f64, 200, 300> = WeightInit::GlorotNormal.sample(&mut rng);
    let n = w.size() as f64;
    let std = (w.sqr().sum() / n).sqrt();
    assert!((std - (2.0_f64 / 500.0).sqrt()).abs() < 0.005, "std was {std}");
  }

  #[test]
  fn constants() {
    let mut rng = rng(None);
    let w: Tensor<f32, 2, 2> = WeightInit::Constant { value: 0.5 }.sample(&mut rng);
    assert_eq!(w.raw(), &[0.5; 4]);
    let b: Tensor<f64, 1, 3> = BiasInit::default().sample(&mut rng);
    assert_eq!(b.raw(), &[0.0; 3]);
  }

  #[test]
  fn seeded_is_reproducible() {
    let a: Tensor<f64, 4, 4> = WeightInit::Normal { std: 1e-3 }.sample(&mut rng(Some(11)));
    let b: Tensor<f64, 4, 4> = WeightInit::Normal { std: 1e-3 }.sample(&mut rng(Some(11)));
    assert_eq!(a, b);
  }
}
