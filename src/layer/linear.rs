use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  init::{ self, WeightInit, BiasInit },
  layer::{ Layer, Trainable },
  optimize::{ Optimizer, OptimizerFactory },
  scalar::{ Scalar, Differentiable },
  tensor::Tensor,
};


/// Construction options for [Linear] layers.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
  pub bias: bool,
  pub weight_init: WeightInit,
  pub bias_init: BiasInit,
  /// Fixed seed for reproducible initialization.
  pub seed: Option<u64>,
}

impl Default for LinearConfig {
  fn default() -> Self {
    Self {
      bias: true,
      weight_init: WeightInit::default(),
      bias_init: BiasInit::default(),
      seed: None,
    }
  }
}

impl LinearConfig {
  pub fn without_bias() -> Self {
    Self { bias: false, ..Self::default() }
  }

  pub fn seeded(self, seed: u64) -> Self {
    Self { seed: Some(seed), ..self }
  }
}


/// Fully connected layer computing `x · W + b` for batches of `B` rows.

#[derive(Debug)]
pub struct Linear<S, const IN: usize, const OUT: usize, const B: usize> {
  weights: Tensor<S, IN, OUT>,
  biases: Option<Tensor<S, 1, OUT>>,
  optimizers: Option<(Optimizer<IN, OUT>, Option<Optimizer<1, OUT>>)>,
}

impl<S: Scalar, const IN: usize, const OUT: usize, const B: usize> Linear<S, IN, OUT, B> {
  pub fn new(config: &LinearConfig) -> Self {
    let mut rng = init::rng(config.seed);
    let weights = config.weight_init.sample(&mut rng);
    let biases = config.bias.then(|| config.bias_init.sample(&mut rng) );
    Self::from_parameters(weights, biases)
  }

  pub fn from_parameters(weights: Tensor<S, IN, OUT>, biases: Option<Tensor<S, 1, OUT>>) -> Self {
    Self { weights, biases, optimizers: None }
  }

  pub fn weights(&self) -> &Tensor<S, IN, OUT> {
    &self.weights
  }

  pub fn biases(&self) -> Option<&Tensor<S, 1, OUT>> {
    self.biases.as_ref()
  }
}

impl<S: Scalar, const IN: usize, const OUT: usize, const B: usize> Layer for Linear<S, IN, OUT, B> {
  type Input = Tensor<S, B, IN>;
  type Output = Tensor<S, B, OUT>;

  fn forward(&self, input: &Self::Input) -> Self::Output {
    let out = input.mm(&self.weights);
    match &self.biases {
      Some(biases) => out + biases.broadcast_rows::<B>(),
      None => out,
    }
  }

  fn parameters(&self) -> Vec<Vec<f64>> {
    let mut params = vec![self.weights.values().into_raw()];
    if let Some(biases) = &self.biases {
      params.push(biases.values().into_raw());
    }
    params
  }

  fn load_parameters(&mut self, params: &mut dyn Iterator<Item = Vec<f64>>) -> Result<()> {
    load(&mut self.weights, params.next())?;
    if let Some(biases) = &mut self.biases {
      load(biases, params.next())?;
    }
    Ok(())
  }
}

fn load<S: Scalar, const R: usize, const C: usize>(param: &mut Tensor<S, R, C>, values: Option<Vec<f64>>) -> Result<()> {
  let values = values.ok_or_else(|| Error::Snapshot("Snapshot ran out of parameter tensors".into()) )?;
  if values.len() != param.size() {
    return Err(Error::Snapshot(format!(
      "Parameter of length {} doesn't fit a tensor of shape [{R}, {C}]", values.len())))
  }
  for (p, v) in param.iter_mut().zip(values) {
    p.assign(v);
  }
  Ok(())
}

/// Turn every element into a leaf of `arena`, keeping leaves it already owns.

fn register<S: Differentiable, const R: usize, const C: usize>(param: &mut Tensor<S, R, C>, arena: S::Arena) {
  for p in param.iter_mut() {
    if !p.is_parameter_of(arena) {
      *p = S::parameter(arena, p.value());
    }
  }
}

impl<S, const IN: usize, const OUT: usize, const B: usize> Trainable<S> for Linear<S, IN, OUT, B>
where
  S: Differentiable,
{
  fn attach_optimizer(&mut self, factory: &OptimizerFactory, arena: S::Arena) {
    register(&mut self.weights, arena);
    if let Some(biases) = &mut self.biases {
      register(biases, arena);
    }
    self.optimizers = Some((
      factory.create_optimizer(&self.weights),
      self.biases.as_ref().map(|biases| factory.create_optimizer(biases) ),
    ));
  }

  fn update_weights(&mut self) -> Result<()> {
    let (weight_optimizer, bias_optimizer) = self.optimizers.as_mut()
      .ok_or(Error::NotReady { operation: "Linear::update_weights" })?;
    weight_optimizer.minimize(&mut self.weights);
    if let (Some(optimizer), Some(biases)) = (bias_optimizer, &mut self.biases) {
      optimizer.minimize(biases);
    }
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::variable::{ Tape, Var };

  #[test]
  fn forward_with_bias() {
    let linear = Linear::<f64, 2, 3, 2>::from_parameters(
      Tensor::from_rows([[1.0, 0.0, -1.0], [2.0, 1.0, 0.0]]),
      Some(Tensor::from_rows([[0.5, 0.5, 0.5]])),
    );
    let y = linear.forward(&Tensor::from_rows([[1.0, 1.0], [0.0, -1.0]]));
    assert_eq!(y.raw(), &[3.5, 1.5, -0.5, -1.5, -0.5, 0.5]);
  }

  #[test]
  fn config_controls_init() {
    let config = LinearConfig {
      weight_init: WeightInit::Constant { value: 0.25 },
      bias_init: BiasInit::Constant { value: -1.0 },
      ..LinearConfig::default()
    };
    let linear = Linear::<f32, 3, 2, 1>::new(&config);
    assert_eq!(linear.weights().raw(), &[0.25; 6]);
    assert_eq!(linear.biases().map(|b| b.raw().to_vec() ), Some(vec![-1.0; 2]));
    assert!(Linear::<f32, 3, 2, 1>::new(&LinearConfig::without_bias()).biases().is_none());
  }

  #[test]
  fn seeded_layers_match() {
    let config = LinearConfig::default().seeded(42);
    let a = Linear::<f64, 4, 4, 1>::new(&config);
    let b = Linear::<f64, 4, 4, 1>::new(&config);
    assert_eq!(a.parameters(), b.parameters());
  }

  #[test]
  fn update_requires_optimizer() {
    let mut linear = Linear::<Var, 2, 2, 1>::new(&LinearConfig::default());
    let before = linear.parameters();
    assert!(matches!(linear.update_weights(), Err(Error::NotReady { .. })));
    assert_eq!(linear.parameters(), before);
  }

  #[test]
  fn reattach_resets_state_and_reuses_slots() {
    let tape = Tape::new();
    let lr = 0.05;
    let factory = OptimizerFactory::Sgd { learning_rate: lr, momentum: 0.9 };
    let x = Tensor::<Var, 2, 3>::from_rows([[1.0, -2.0, 0.5], [0.3, 0.0, -1.0]]);
    let mut linear = Linear::<Var, 3, 2, 2>::new(&LinearConfig::default().seeded(9));

    linear.attach_optimizer(&factory, &tape);
    assert_eq!(tape.num_parameters(), 8);
    for _ in 0..3 {
      let _scope = tape.scope();
      linear.forward(&x).sqr().sum().gradient();
      linear.update_weights().unwrap();
    }

    linear.attach_optimizer(&factory, &tape);
    assert_eq!(tape.num_parameters(), 8);
    assert!(linear.weights().param_iter().all(|w| w.is_parameter() ));

    // Without momentum history, the first step is plain gradient descent
    let _scope = tape.scope();
    linear.forward(&x).sqr().sum().gradient();
    let step = |w: Var| w.value() - lr * w.adjoint();
    let expected = vec![
      linear.weights().param_iter().map(step).collect::<Vec<f64>>(),
      linear.biases().unwrap().param_iter().map(step).collect(),
    ];
    linear.update_weights().unwrap();
    assert_eq!(linear.parameters(), expected);
  }

  #[test]
  fn sgd_step_subtracts_scaled_adjoint() {
    let tape = Tape::new();
    let lr = 0.05;
    let mut linear = Linear::<Var, 3, 2, 2>::new(&LinearConfig::default().seeded(5));
    linear.attach_optimizer(&OptimizerFactory::Sgd { learning_rate: lr, momentum: 0.0 }, &tape);

    let _scope = tape.scope();
    let x = Tensor::<Var, 2, 3>::from_rows([[1.0, -2.0, 0.5], [0.3, 0.0, -1.0]]);
    let loss = linear.forward(&x).sqr().sum();
    loss.gradient();

    let expected: Vec<f64> = linear.weights().param_iter()
      .map(|w| w.value() - lr * w.adjoint() )
      .collect();
    let expected_bias: Vec<f64> = linear.biases().unwrap().param_iter()
      .map(|b| b.value() - lr * b.adjoint() )
      .collect();
    assert!(linear.weights().param_iter().any(|w| w.adjoint() != 0.0 ));

    linear.update_weights().unwrap();
    assert_eq!(linear.parameters(), vec![expected, expected_bias]);
  }
}
