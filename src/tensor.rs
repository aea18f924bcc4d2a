use rand::Rng;
use serde::{ Serialize, Deserialize, Serializer, Deserializer, de };

pub(crate) mod cops;
mod lops;

use crate::{
  internal::randn,
  scalar::Scalar,
};


/// Dense matrix of `B` rows (the batch axis) by `C` channels.
///
/// The shape is part of the type and can never change. Data is stored
/// row-major and owned exclusively by the tensor. Layers declare the
/// tensors they accept and produce, which is what lets a chain of layers
/// be shape-checked at compile time.

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<S, const B: usize, const C: usize> {
  data: Vec<S>,
}

impl<S: Copy, const B: usize, const C: usize> Tensor<S, B, C> {
  pub fn from_vec(data: Vec<S>) -> Self {
    assert_eq!(data.len(), B * C,
      "Tensor[{B}, {C}] doesn't match data length {}", data.len());
    Self { data }
  }

  pub fn fill(filler: S) -> Self {
    Self { data: vec![filler; B * C] }
  }

  pub fn init(mut cb: impl FnMut(usize, usize) -> S) -> Self {
    let data = (0..B * C).map(|i| cb(i / C, i % C) ).collect();
    Self { data }
  }

  pub fn dims(&self) -> [usize; 2] {
    [B, C]
  }

  pub fn size(&self) -> usize {
    B * C
  }

  pub fn raw(&self) -> &[S] {
    &self.data
  }

  pub fn into_raw(self) -> Vec<S> {
    self.data
  }

  /// Zero-copy view of one batch row. Panics when `b` is out of range.

  pub fn row(&self, b: usize) -> &[S] {
    &self.data[b * C..(b + 1) * C]
  }

  pub fn row_mut(&mut self, b: usize) -> &mut [S] {
    &mut self.data[b * C..(b + 1) * C]
  }

  pub fn rows(&self) -> impl Iterator<Item = &[S]> + '_ {
    (0..B).map(move |b| self.row(b) )
  }

  pub fn param_iter(&self) -> impl Iterator<Item = S> + '_ {
    self.data.iter().copied()
  }

  pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, S> {
    self.data.iter_mut()
  }

  pub fn vectorize<O, F>(&self, cb: F) -> Tensor<O, B, C>
  where
    O: Copy,
    F: FnMut(S) -> O,
  {
    Tensor { data: self.param_iter().map(cb).collect() }
  }

  pub fn zip<O, F>(&self, rhs: &Self, cb: F) -> Tensor<O, B, C>
  where
    O: Copy,
    F: FnMut((S, S)) -> O,
  {
    Tensor { data: self.param_iter().zip(rhs.param_iter()).map(cb).collect() }
  }

  pub fn transpose(&self) -> Tensor<S, C, B> {
    Tensor::init(|c, b| self[(b, c)] )
  }
}

impl<S: Copy, const C: usize> Tensor<S, 1, C> {
  /// Replicate this single row across a batch.

  pub fn broadcast_rows<const B: usize>(&self) -> Tensor<S, B, C> {
    Tensor { data: self.data.repeat(B) }
  }
}

impl<S: Copy, const B: usize> Tensor<S, B, 1> {
  /// Replicate this single column across all channels.

  pub fn broadcast_channels<const C: usize>(&self) -> Tensor<S, B, C> {
    Tensor::init(|b, _| self.data[b] )
  }
}

impl<S: Scalar, const B: usize, const C: usize> Tensor<S, B, C> {
  pub fn zeros() -> Self {
    Self::fill(S::constant(0.0))
  }

  pub fn ones() -> Self {
    Self::fill(S::constant(1.0))
  }

  pub fn from_rows(rows: [[f64; C]; B]) -> Self {
    Self::init(|b, c| S::constant(rows[b][c]) )
  }

  /// Sample from a zero-centered normal distribution.

  pub fn randn<R: Rng>(rng: &mut R, std: f64) -> Self {
    let len = B * C;
    let mut data = vec![S::constant(0.0); len];
    for i in 0..(len + 1) / 2 {
      let j = i * 2;
      let (r1, r2) = randn(rng);
      data[j] = S::constant(r1 * std);
      if j + 1 < len {
        data[j + 1] = S::constant(r2 * std);
      }
    }
    Self { data }
  }

  pub fn cast<O: Scalar>(&self) -> Tensor<O, B, C> {
    self.vectorize(|a| O::constant(a.value()) )
  }

  /// Plain numeric copy, dropping any tape registration.

  pub fn values(&self) -> Tensor<f64, B, C> {
    self.vectorize(|a| a.value() )
  }

  pub fn sum(&self) -> S {
    S::total(self.param_iter())
  }

  /// Collapse the channel axis by summing.

  pub fn sum_channels(&self) -> Tensor<S, B, 1> {
    Tensor { data: self.rows().map(|row| S::total(row.iter().copied()) ).collect() }
  }

  /// Collapse the channel axis to its maximum.

  pub fn max_channels(&self) -> Tensor<S, B, 1> {
    Tensor {
      data: self.rows()
        .map(|row| row.iter().copied().reduce(S::max).unwrap_or(S::constant(f64::NEG_INFINITY)) )
        .collect(),
    }
  }

  /// Index of the greatest value in every row. The first maximum wins ties.

  pub fn argmax(&self) -> Vec<usize> {
    self.rows()
      .map(|row| {
        let mut index = 0;
        for (i, &a) in row.iter().enumerate() {
          if a > row[index] {
            index = i;
          }
        }
        index
      })
      .collect()
  }

  /// Matrix product of `(B, C) x (C, N)`.

  pub fn mm<const N: usize>(&self, rhs: &Tensor<S, C, N>) -> Tensor<S, B, N> {
    Tensor { data: S::matmul(&self.data, &rhs.data, B, C, N) }
  }

  pub fn tanh(&self) -> Self {
    self.vectorize(S::tanh)
  }

  pub fn exp(&self) -> Self {
    self.vectorize(S::exp)
  }

  pub fn ln(&self) -> Self {
    self.vectorize(S::ln)
  }

  pub fn sqr(&self) -> Self {
    self.vectorize(S::sqr)
  }

  pub fn relu(&self) -> Self {
    let zero = S::constant(0.0);
    self.vectorize(|a| a.max(zero) )
  }
}

impl<S, const B: usize, const C: usize> std::ops::Index<(usize, usize)> for Tensor<S, B, C> {
  type Output = S;

  fn index(&self, (b, c): (usize, usize)) -> &S {
    assert!(c < C, "Channel {c} out of range for Tensor[{B}, {C}]");
    &self.data[b * C + c]
  }
}

impl<S, const B: usize, const C: usize> std::ops::IndexMut<(usize, usize)> for Tensor<S, B, C> {
  fn index_mut(&mut self, (b, c): (usize, usize)) -> &mut S {
    assert!(c < C, "Channel {c} out of range for Tensor[{B}, {C}]");
    &mut self.data[b * C + c]
  }
}

// Encoded as a flat sequence. Decoding rejects sequences of the wrong length.

impl<S: Serialize, const B: usize, const C: usize> Serialize for Tensor<S, B, C> {
  fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
    self.data.serialize(serializer)
  }
}

impl<'de, S: Deserialize<'de>, const B: usize, const C: usize> Deserialize<'de> for Tensor<S, B, C> {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let data = Vec::<S>::deserialize(deserializer)?;
    if data.len() != B * C {
      return Err(<D::Error as de::Error>::custom(format!(
        "Tensor[{B}, {C}] doesn't match data length {}", data.len())))
    }
    Ok(Self { data })
  }
}

impl<S: Scalar, const B: usize, const C: usize> std::fmt::Display for Tensor<S, B, C> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor[{B}, {C}] ")?;
    write!(f, "[\n")?;
    for row in self.rows() {
      let values: Vec<f64> = row.iter().map(|a| a.value() ).collect();
      write!(f, "  {:?}\n", values)?;
    }
    write!(f, "]\n")
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn row_views() {
    let mut x = Tensor::<f64, 2, 3>::from_rows([[10.0, 10.0, 10.0], [-30.0, -30.0, -30.0]]);
    assert_eq!(x.row(0), &[10.0, 10.0, 10.0]);
    assert_eq!(x.row(1), &[-30.0, -30.0, -30.0]);
    x.row_mut(1)[2] = 4.0;
    assert_eq!(x[(1, 2)], 4.0);
    for b in 0..2 {
      for c in 0..3 {
        assert_eq!(x.row(b)[c], x[(b, c)]);
      }
    }
  }

  #[test]
  #[should_panic]
  fn row_out_of_range() {
    let x = Tensor::<f64, 2, 3>::zeros();
    x.row(2);
  }

  #[test]
  #[should_panic]
  fn wrong_length() {
    Tensor::<f64, 2, 3>::from_vec(vec![1.0; 5]);
  }

  #[test]
  fn decoding_checks_shape() {
    let x = Tensor::<f64, 2, 3>::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let bytes = postcard::to_allocvec(&x).unwrap();
    assert_eq!(postcard::from_bytes::<Tensor<f64, 2, 3>>(&bytes).unwrap(), x);
    assert_eq!(postcard::from_bytes::<Tensor<f64, 3, 2>>(&bytes).unwrap().raw(), x.raw());

    let small = postcard::to_allocvec(&Tensor::<f64, 1, 2>::ones()).unwrap();
    assert!(postcard::from_bytes::<Tensor<f64, 2, 3>>(&small).is_err());
    assert!(postcard::from_bytes::<Tensor<f64, 1, 1>>(&small).is_err());
  }

  #[test]
  fn broadcast() {
    let bias = Tensor::<f64, 1, 3>::from_rows([[1.0, 2.0, 3.0]]);
    let x: Tensor<f64, 2, 3> = bias.broadcast_rows();
    assert_eq!(x.raw(), &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);

    let column = Tensor::<f64, 2, 1>::from_rows([[1.0], [2.0]]);
    let y: Tensor<f64, 2, 3> = column.broadcast_channels();
    assert_eq!(y.raw(), &[1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
  }

  #[test]
  fn reductions() {
    let a = Tensor::<f64, 3, 2>::from_rows([[1.0, 2.0], [3.0, 4.0], [6.0, 5.0]]);
    assert_eq!(a.sum(), 21.0);
    assert_eq!(a.sum_channels().raw(), &[3.0, 7.0, 11.0]);
    assert_eq!(a.max_channels().raw(), &[2.0, 4.0, 6.0]);
    assert_eq!(a.argmax(), vec![1, 1, 0]);
  }

  #[test]
  fn argmax_first_wins() {
    let a = Tensor::<f64, 1, 4>::from_rows([[0.5, 0.0, 0.5, 0.25]]);
    assert_eq!(a.argmax(), vec![0]);
  }

  #[test]
  fn mm() {
    let x = Tensor::<f64, 2, 3>::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let y = Tensor::<f64, 3, 2>::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(x.mm(&y), Tensor::from_vec(vec![22.0, 28.0, 49.0, 64.0]));
  }

  #[test]
  fn transpose() {
    let x = Tensor::<f64, 2, 3>::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(x.transpose().raw(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
  }

  #[test]
  fn randn_statistics() {
    use rand::SeedableRng;
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let x = Tensor::<f64, 100, 101>::randn(&mut rng, 2.0);
    let n = x.size() as f64;
    let mean = x.sum() / n;
    let variance = x.sqr().sum() / n - mean * mean;
    assert!(mean.abs() < 0.1, "mean was {mean}");
    assert!((variance.sqrt() - 2.0).abs() < 0.1, "std was {}", variance.sqrt());
  }
}
