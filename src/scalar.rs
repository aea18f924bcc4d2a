use std::fmt::Debug;
use std::ops::{ Add, Sub, Mul, Div, Neg };

use num_traits::{ AsPrimitive, Float };

use crate::tensor::cops;


/// All types that may flow through a [Layer](crate::Layer).
///
/// Plain floats only support inference. [Var](crate::Var) implements
/// this trait as well, recording every operation onto its
/// [Tape](crate::Tape) so that it can also be [differentiated](Differentiable).

pub trait Scalar:
  Copy + Debug + PartialEq + PartialOrd
  + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> + Div<Output = Self>
  + Neg<Output = Self>
{
  /// Wrap a number that does not depend on anything else.
  fn constant(value: f64) -> Self;

  fn value(&self) -> f64;

  /// Overwrite the numeric value in place, keeping any tape
  /// registration intact.
  fn assign(&mut self, value: f64);

  fn tanh(self) -> Self;
  fn exp(self) -> Self;
  fn ln(self) -> Self;

  /// Larger of both values. Ties select `self`.
  fn max(self, other: Self) -> Self;

  fn sqr(self) -> Self {
    self * self
  }

  fn total<I: IntoIterator<Item = Self>>(values: I) -> Self {
    values.into_iter().fold(Self::constant(0.0), |acc, a| acc + a )
  }

  fn dot<I: IntoIterator<Item = (Self, Self)>>(pairs: I) -> Self {
    Self::total(pairs.into_iter().map(|(a, b)| a * b ))
  }

  /// Multiply a row-major `m x k` matrix by a row-major `k x n` matrix.
  fn matmul(lhs: &[Self], rhs: &[Self], m: usize, k: usize, n: usize) -> Vec<Self> {
    cops::matmul(lhs, rhs, m, k, n)
  }
}


/// Scalars that support reverse-mode differentiation.
///
/// Values get recorded onto an arena. Calling [gradient](Differentiable::gradient)
/// on a downstream value populates the adjoints of everything it was computed from.
/// Adjoints stay valid until the arena zeroes them again.

pub trait Differentiable: Scalar {
  /// Handle to the arena values get recorded onto.
  type Arena: Copy + Debug;

  /// Register a persistent leaf that survives the release of any scope.
  fn parameter(arena: Self::Arena, value: f64) -> Self;

  fn is_tracked(&self) -> bool;

  /// Whether this value already is a persistent leaf of `arena`.
  fn is_parameter_of(&self, arena: Self::Arena) -> bool;

  /// Propagate adjoints backward from this value, seeding it with one.
  fn gradient(&self);

  fn adjoint(&self) -> f64;

  fn zero_adjoints(arena: Self::Arena);
}


macro_rules! impl_float {
  ($float:ty, $gemm:ident) => {
    impl Scalar for $float {
      fn constant(value: f64) -> Self {
        value.as_()
      }

      fn value(&self) -> f64 {
        self.as_()
      }

      fn assign(&mut self, value: f64) {
        *self = value.as_();
      }

      fn tanh(self) -> Self {
        Float::tanh(self)
      }

      fn exp(self) -> Self {
        Float::exp(self)
      }

      fn ln(self) -> Self {
        Float::ln(self)
      }

      fn max(self, other: Self) -> Self {
        if self >= other { self } else { other }
      }

      #[cfg(feature = "unsafe")]
      fn matmul(lhs: &[Self], rhs: &[Self], m: usize, k: usize, n: usize) -> Vec<Self> {
        cops::$gemm(lhs, rhs, m, k, n)
      }
    }
  };
}

impl_float!(f32, sgemm);
impl_float!(f64, dgemm);
