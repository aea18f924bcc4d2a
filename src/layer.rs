use crate::{
  error::Result,
  optimize::OptimizerFactory,
  scalar::Differentiable,
};

mod linear;
mod activation;
mod softmax;

pub use linear::{ Linear, LinearConfig };
pub use activation::{ Relu, Sigmoid, Tanh };
pub use softmax::Softmax;


/// A single stage of a network.
///
/// Inputs and outputs are typed, usually as [Tensor](crate::Tensor)s
/// with a fixed shape, so that stacking layers with incompatible shapes
/// is rejected at compile time. Forward evaluation is pure and works the
/// same for plain floats and for traced [Var](crate::Var)s.

pub trait Layer {
  type Input;
  type Output;

  fn forward(&self, input: &Self::Input) -> Self::Output;

  /// Numeric copy of every parameter tensor, in construction order.
  fn parameters(&self) -> Vec<Vec<f64>> {
    vec![]
  }

  /// Overwrite parameters from the front of `params`, consuming one entry per tensor.
  fn load_parameters(&mut self, _params: &mut dyn Iterator<Item = Vec<f64>>) -> Result<()> {
    Ok(())
  }

  /// Feed the output of this layer into `next`.
  fn then<L>(self, next: L) -> Chain<Self, L>
  where
    Self: Sized,
    L: Layer<Input = Self::Output>,
  {
    Chain::new(self, next)
  }
}


/// Layers that can learn when running on differentiable scalars.

pub trait Trainable<S: Differentiable>: Layer {
  /// Register parameters on `arena` and bind a fresh optimizer to each of them.
  /// Attaching again discards all previous optimizer state.
  fn attach_optimizer(&mut self, _factory: &OptimizerFactory, _arena: S::Arena) {}

  /// Apply one optimizer step to every parameter, using the adjoints
  /// of the last backward pass.
  fn update_weights(&mut self) -> Result<()> {
    Ok(())
  }
}


/// Two layers run back to back.
///
/// Only implements [Layer] when the output of `A` is exactly the input of `B`.

#[derive(Debug, Clone)]
pub struct Chain<A, B> {
  pub first: A,
  pub second: B,
}

impl<A, B> Chain<A, B> {
  pub fn new(first: A, second: B) -> Self {
    Self { first, second }
  }
}

impl<A, B> Layer for Chain<A, B>
where
  A: Layer,
  B: Layer<Input = A::Output>,
{
  type Input = A::Input;
  type Output = B::Output;

  fn forward(&self, input: &Self::Input) -> Self::Output {
    self.second.forward(&self.first.forward(input))
  }

  fn parameters(&self) -> Vec<Vec<f64>> {
    let mut params = self.first.parameters();
    params.extend(self.second.parameters());
    params
  }

  fn load_parameters(&mut self, params: &mut dyn Iterator<Item = Vec<f64>>) -> Result<()> {
    self.first.load_parameters(params)?;
    self.second.load_parameters(params)
  }
}

impl<S, A, B> Trainable<S> for Chain<A, B>
where
  S: Differentiable,
  A: Trainable<S>,
  B: Trainable<S> + Layer<Input = A::Output>,
{
  fn attach_optimizer(&mut self, factory: &OptimizerFactory, arena: S::Arena) {
    self.first.attach_optimizer(factory, arena);
    self.second.attach_optimizer(factory, arena);
  }

  fn update_weights(&mut self) -> Result<()> {
    self.first.update_weights()?;
    self.second.update_weights()
  }
}


/// Build a right-nested [Chain] from any number of layers.
///
/// ```
/// use microtensor_net::{ chain, Layer, Tensor, layer::{ Linear, LinearConfig, Tanh } };
///
/// let net = chain![
///   Linear::<f64, 2, 4, 1>::new(&LinearConfig::default()),
///   Tanh::new(),
///   Linear::<f64, 4, 1, 1>::new(&LinearConfig::default()),
/// ];
/// let y = net.forward(&Tensor::from_rows([[0.0, 1.0]]));
/// assert_eq!(y.dims(), [1, 1]);
/// ```

#[macro_export]
macro_rules! chain {
  ($layer:expr $(,)?) => {
    $layer
  };
  ($first:expr, $($rest:expr),+ $(,)?) => {
    $crate::layer::Chain::new($first, $crate::chain!($($rest),+))
  };
}
