use crate::{
  scalar::{ Scalar, Differentiable },
  variable::{ Var, Tape },
};


impl<'t> Scalar for Var<'t> {
  fn constant(value: f64) -> Self {
    Var::constant(value)
  }

  fn value(&self) -> f64 {
    self.value
  }

  fn assign(&mut self, value: f64) {
    self.value = value;
  }

  fn tanh(self) -> Self {
    let t = self.value.tanh();
    self.unary(t, 1.0 - t * t)
  }

  fn exp(self) -> Self {
    let e = self.value.exp();
    self.unary(e, e)
  }

  fn ln(self) -> Self {
    self.unary(self.value.ln(), 1.0 / self.value)
  }

  // Selects one operand, so gradients only reach the winner
  fn max(self, other: Self) -> Self {
    if self.value >= other.value { self } else { other }
  }

  fn total<I: IntoIterator<Item = Self>>(values: I) -> Self {
    let inputs: Vec<_> = values.into_iter().map(|a| (a, 1.0) ).collect();
    let value = inputs.iter().map(|(a, _)| a.value ).sum();
    Var::nary(value, inputs)
  }

  fn dot<I: IntoIterator<Item = (Self, Self)>>(pairs: I) -> Self {
    let pairs: Vec<_> = pairs.into_iter().collect();
    let value = pairs.iter().map(|(a, b)| a.value * b.value ).sum();
    Var::nary(value, pairs.into_iter().flat_map(|(a, b)| [(a, b.value), (b, a.value)] ))
  }
}

impl<'t> Differentiable for Var<'t> {
  type Arena = &'t Tape;

  fn parameter(arena: Self::Arena, value: f64) -> Self {
    arena.parameter(value)
  }

  fn is_tracked(&self) -> bool {
    self.trace.is_some()
  }

  fn is_parameter_of(&self, arena: Self::Arena) -> bool {
    self.is_parameter() && self.tape().map_or(false, |tape| std::ptr::eq(tape, arena) )
  }

  fn gradient(&self) {
    Var::gradient(self)
  }

  fn adjoint(&self) -> f64 {
    Var::adjoint(self)
  }

  fn zero_adjoints(arena: Self::Arena) {
    arena.zero_adjoints()
  }
}


impl std::ops::Neg for Var<'_> {
  type Output = Self;

  fn neg(self) -> Self {
    self.unary(-self.value, -1.0)
  }
}

impl std::ops::Add for Var<'_> {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    self.binary(rhs, self.value + rhs.value, 1.0, 1.0)
  }
}

impl std::ops::Sub for Var<'_> {
  type Output = Self;

  fn sub(self, rhs: Self) -> Self {
    self.binary(rhs, self.value - rhs.value, 1.0, -1.0)
  }
}

impl std::ops::Mul for Var<'_> {
  type Output = Self;

  fn mul(self, rhs: Self) -> Self {
    self.binary(rhs, self.value * rhs.value, rhs.value, self.value)
  }
}

impl std::ops::Div for Var<'_> {
  type Output = Self;

  fn div(self, rhs: Self) -> Self {
    let inv = 1.0 / rhs.value;
    self.binary(rhs, self.value * inv, inv, -self.value * inv * inv)
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident, $assign_trait:ident, $assign_meth:ident, $symbol:tt) => {
    impl<'t> std::ops::$trait<f64> for Var<'t> { // var * f64
      type Output = Var<'t>;

      fn $meth(self, rhs: f64) -> Var<'t> {
        self $symbol Var::constant(rhs)
      }
    }

    impl<'t> std::ops::$trait<Var<'t>> for f64 { // f64 * var
      type Output = Var<'t>;

      fn $meth(self, rhs: Var<'t>) -> Var<'t> {
        Var::constant(self) $symbol rhs
      }
    }

    impl std::ops::$assign_trait for Var<'_> {
      fn $assign_meth(&mut self, rhs: Self) {
        *self = *self $symbol rhs;
      }
    }
  };
}

add_operator!(Add, add, AddAssign, add_assign, +);
add_operator!(Sub, sub, SubAssign, sub_assign, -);
add_operator!(Mul, mul, MulAssign, mul_assign, *);
add_operator!(Div, div, DivAssign, div_assign, /);
