use std::marker::PhantomData;

use crate::{
  layer::{ Layer, Trainable },
  scalar::{ Scalar, Differentiable },
  tensor::Tensor,
};


/// Row-wise softmax over the channel axis.
///
/// The row maximum is subtracted before exponentiation. It enters the
/// computation as a constant, which leaves the result unchanged but
/// keeps large inputs from overflowing.

#[derive(Debug, Clone, Copy)]
pub struct Softmax<S, const B: usize, const C: usize> {
  _marker: PhantomData<S>,
}

impl<S, const B: usize, const C: usize> Softmax<S, B, C> {
  pub fn new() -> Self {
    Self { _marker: PhantomData }
  }
}

impl<S, const B: usize, const C: usize> Default for Softmax<S, B, C> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S: Scalar, const B: usize, const C: usize> Layer for Softmax<S, B, C> {
  type Input = Tensor<S, B, C>;
  type Output = Tensor<S, B, C>;

  fn forward(&self, input: &Self::Input) -> Self::Output {
    let max = input.max_channels().values().cast::<S>();
    let exp = (input - max.broadcast_channels::<C>()).exp();
    let sum = exp.sum_channels().broadcast_channels::<C>();
    exp / sum
  }
}

impl<S: Differentiable, const B: usize, const C: usize> Trainable<S> for Softmax<S, B, C> {}
