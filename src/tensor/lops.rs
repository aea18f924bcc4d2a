use crate::{
  tensor::Tensor,
  scalar::Scalar,
};


impl<S: Scalar, const B: usize, const C: usize> std::ops::Neg for &Tensor<S, B, C> {
  type Output = Tensor<S, B, C>;

  fn neg(self) -> Self::Output {
    self.vectorize(|a| -a )
  }
}

impl<S: Scalar, const B: usize, const C: usize> std::ops::Neg for Tensor<S, B, C> {
  type Output = Tensor<S, B, C>;

  fn neg(self) -> Self::Output {
    -&self
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident, $assign_trait:ident, $assign_meth:ident, $symbol:tt) => {
    impl<S: Scalar, const B: usize, const C: usize> std::ops::$trait for &Tensor<S, B, C> { // &tensor * &other
      type Output = Tensor<S, B, C>;

      fn $meth(self, rhs: Self) -> Tensor<S, B, C> {
        self.zip(rhs, |(a, b)| a $symbol b )
      }
    }

    impl<S: Scalar, const B: usize, const C: usize> std::ops::$trait for Tensor<S, B, C> { // tensor * other
      type Output = Tensor<S, B, C>;

      fn $meth(self, rhs: Self) -> Tensor<S, B, C> {
        &self $symbol &rhs
      }
    }

    impl<S: Scalar, const B: usize, const C: usize> std::ops::$trait<Tensor<S, B, C>> for &Tensor<S, B, C> { // &tensor * other
      type Output = Tensor<S, B, C>;

      fn $meth(self, rhs: Tensor<S, B, C>) -> Tensor<S, B, C> {
        self $symbol &rhs
      }
    }

    impl<S: Scalar, const B: usize, const C: usize> std::ops::$trait<&Tensor<S, B, C>> for Tensor<S, B, C> { // tensor * &other
      type Output = Tensor<S, B, C>;

      fn $meth(self, rhs: &Tensor<S, B, C>) -> Tensor<S, B, C> {
        &self $symbol rhs
      }
    }

    impl<S: Scalar, const B: usize, const C: usize> std::ops::$trait<S> for &Tensor<S, B, C> { // &tensor * S
      type Output = Tensor<S, B, C>;

      fn $meth(self, rhs: S) -> Tensor<S, B, C> {
        self.vectorize(|a| a $symbol rhs )
      }
    }

    impl<S: Scalar, const B: usize, const C: usize> std::ops::$trait<S> for Tensor<S, B, C> { // tensor * S
      type Output = Tensor<S, B, C>;

      fn $meth(self, rhs: S) -> Tensor<S, B, C> {
        &self $symbol rhs
      }
    }

    impl<const B: usize, const C: usize> std::ops::$trait<&Tensor<f64, B, C>> for f64 { // f64 * &tensor
      type Output = Tensor<f64, B, C>;

      fn $meth(self, tensor: &Tensor<f64, B, C>) -> Tensor<f64, B, C> {
        tensor.vectorize(|a| self $symbol a )
      }
    }

    impl<const B: usize, const C: usize> std::ops::$trait<Tensor<f64, B, C>> for f64 { // f64 * tensor
      type Output = Tensor<f64, B, C>;

      fn $meth(self, tensor: Tensor<f64, B, C>) -> Tensor<f64, B, C> {
        self $symbol &tensor
      }
    }

    impl<S: Scalar, const B: usize, const C: usize> std::ops::$assign_trait<&Tensor<S, B, C>> for Tensor<S, B, C> {
      fn $assign_meth(&mut self, rhs: &Tensor<S, B, C>) {
        for (a, &b) in self.iter_mut().zip(rhs.raw()) {
          *a = *a $symbol b;
        }
      }
    }
  };
}

add_operator!(Add, add, AddAssign, add_assign, +);
add_operator!(Sub, sub, SubAssign, sub_assign, -);
add_operator!(Mul, mul, MulAssign, mul_assign, *);
add_operator!(Div, div, DivAssign, div_assign, /);


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn elementwise() {
    let x = Tensor::<f64, 1, 3>::from_rows([[1.0, 2.0, 3.0]]);
    let y = Tensor::<f64, 1, 3>::from_rows([[4.0, 5.0, 6.0]]);
    assert_eq!((&x + &y).raw(), &[5.0, 7.0, 9.0]);
    assert_eq!((&y - &x).raw(), &[3.0, 3.0, 3.0]);
    assert_eq!((&x * &y).raw(), &[4.0, 10.0, 18.0]);
    assert_eq!((&y / &x).raw(), &[4.0, 2.5, 2.0]);
    assert_eq!((-&x).raw(), &[-1.0, -2.0, -3.0]);
  }

  #[test]
  fn with_scalars() {
    let x = Tensor::<f64, 1, 2>::from_rows([[1.0, -2.0]]);
    assert_eq!((&x * 2.0).raw(), &[2.0, -4.0]);
    assert_eq!((1.0 - &x).raw(), &[0.0, 3.0]);
    assert_eq!((x.clone() / 4.0).raw(), &[0.25, -0.5]);
  }

  #[test]
  fn assign() {
    let mut x = Tensor::<f64, 2, 1>::ones();
    x -= &Tensor::from_rows([[0.5], [2.0]]);
    assert_eq!(x.raw(), &[0.5, -1.0]);
  }
}
