use std::marker::PhantomData;

use crate::{
  layer::{ Layer, Trainable },
  scalar::{ Scalar, Differentiable },
  tensor::Tensor,
};


macro_rules! activation {
  ($(#[$doc:meta])* $name:ident, |$x:ident| $body:expr) => {
    $(#[$doc])*
    #[derive(Debug, Clone, Copy)]
    pub struct $name<S, const B: usize, const C: usize> {
      _marker: PhantomData<S>,
    }

    impl<S, const B: usize, const C: usize> $name<S, B, C> {
      pub fn new() -> Self {
        Self { _marker: PhantomData }
      }
    }

    impl<S, const B: usize, const C: usize> Default for $name<S, B, C> {
      fn default() -> Self {
        Self::new()
      }
    }

    impl<S: Scalar, const B: usize, const C: usize> Layer for $name<S, B, C> {
      type Input = Tensor<S, B, C>;
      type Output = Tensor<S, B, C>;

      fn forward(&self, $x: &Self::Input) -> Self::Output {
        $body
      }
    }

    impl<S: Differentiable, const B: usize, const C: usize> Trainable<S> for $name<S, B, C> {}
  };
}

activation!(
  /// Rectified linear unit, `max(x, 0)`.
  ///
  /// At exactly zero the input itself is selected, so the gradient there is one.
  Relu, |x| x.relu()
);

activation!(
  /// Logistic sigmoid, evaluated as `0.5 * tanh(0.5 * x) + 0.5`.
  Sigmoid, |x| {
    let half = S::constant(0.5);
    (x * half).tanh() * half + half
  }
);

activation!(
  /// Hyperbolic tangent.
  Tanh, |x| x.tanh()
);


#[cfg(test)]
mod tests {
  use super::*;
  use crate::variable::Tape;

  #[test]
  fn relu_gradient() {
    let tape = Tape::new();
    let x = tape.track(&Tensor::<f64, 1, 10>::from_rows([
      [-10.0, -7.0, -5.0, -3.0, 0.0, 1.0, 3.0, 5.0, 7.0, 10.0]
    ]));
    let y = Relu::new().forward(&x);
    assert_eq!(y.values().raw(), &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 3.0, 5.0, 7.0, 10.0]);
    y.sum().gradient();
    let grad: Vec<f64> = x.param_iter().map(|a| a.adjoint() ).collect();
    assert_eq!(grad, vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
  }

  #[test]
  fn sigmoid_values() {
    let y = Sigmoid::new().forward(&Tensor::<f64, 1, 3>::from_rows([[0.0, 2.0, -2.0]]));
    let expected = [0.5, 1.0 / (1.0 + (-2.0_f64).exp()), 1.0 / (1.0 + 2.0_f64.exp())];
    for (a, b) in y.raw().iter().zip(expected) {
      assert!((a - b).abs() < 1e-12);
    }
  }

  #[test]
  fn sigmoid_gradient() {
    let tape = Tape::new();
    let x = tape.track(&Tensor::<f64, 1, 1>::from_rows([[0.7]]));
    Sigmoid::new().forward(&x).sum().gradient();
    let s = 1.0 / (1.0 + (-0.7_f64).exp());
    assert!((x[(0, 0)].adjoint() - s * (1.0 - s)).abs() < 1e-12);
  }

  #[test]
  fn tanh_matches_scalar() {
    let x = Tensor::<f32, 2, 2>::from_rows([[0.0, 1.0], [-1.0, 0.5]]);
    assert_eq!(Tanh::new().forward(&x), x.tanh());
  }
}
