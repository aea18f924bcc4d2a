use crate::scalar::Scalar;


/// Generic matrix product. Every output element is built by a single
/// [Scalar::dot], which lets differentiable scalars record one node per element.

pub(crate) fn matmul<S: Scalar>(lhs: &[S], rhs: &[S], m: usize, k: usize, n: usize) -> Vec<S> {
  debug_assert_eq!(lhs.len(), m * k);
  debug_assert_eq!(rhs.len(), k * n);
  let mut data = Vec::with_capacity(m * n);
  for i in 0..m {
    let row = &lhs[i * k..(i + 1) * k];
    for j in 0..n {
      data.push(S::dot(row.iter().enumerate().map(|(p, &a)| (a, rhs[p * n + j]) )));
    }
  }
  data
}

#[cfg(feature = "unsafe")]
pub(crate) fn sgemm(lhs: &[f32], rhs: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
  assert!(lhs.len() >= m * k && rhs.len() >= k * n);
  let mut data = vec![0.0; m * n];
  unsafe {
    matrixmultiply::sgemm(
      m,
      k,
      n,
      1.0,
      lhs.as_ptr(),
      k as isize,
      1,
      rhs.as_ptr(),
      n as isize,
      1,
      0.0,
      data.as_mut_ptr(),
      n as isize,
      1,
    );
  };
  data
}

#[cfg(feature = "unsafe")]
pub(crate) fn dgemm(lhs: &[f64], rhs: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
  assert!(lhs.len() >= m * k && rhs.len() >= k * n);
  let mut data = vec![0.0; m * n];
  unsafe {
    matrixmultiply::dgemm(
      m,
      k,
      n,
      1.0,
      lhs.as_ptr(),
      k as isize,
      1,
      rhs.as_ptr(),
      n as isize,
      1,
      0.0,
      data.as_mut_ptr(),
      n as isize,
      1,
    );
  };
  data
}
