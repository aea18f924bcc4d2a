use std::marker::PhantomData;
use std::path::Path;

use serde::{ Serialize, Deserialize };

use crate::{
  error::{ Error, Result },
  layer::{ Layer, Trainable },
  optimize::OptimizerFactory,
  scalar::Differentiable,
};


#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
  parameters: Vec<Vec<f64>>,
}

fn snapshot<L: Layer>(layers: &L) -> Result<Vec<u8>> {
  let snapshot = Snapshot { parameters: layers.parameters() };
  Ok(postcard::to_allocvec(&snapshot)?)
}

fn restore<L: Layer>(layers: &mut L, bytes: &[u8]) -> Result<()> {
  let snapshot: Snapshot = postcard::from_bytes(bytes)?;
  let current = layers.parameters();
  if current.len() != snapshot.parameters.len() {
    return Err(Error::SnapshotMismatch { expected: current.len(), found: snapshot.parameters.len() })
  }
  let mismatch = current.iter()
    .zip(&snapshot.parameters)
    .enumerate()
    .find(|(_, (a, b))| a.len() != b.len() );
  if let Some((i, (a, b))) = mismatch {
    return Err(Error::Snapshot(format!(
      "Parameter tensor {i} holds {} values but the net expects {}", b.len(), a.len())))
  }
  layers.load_parameters(&mut snapshot.parameters.into_iter())
}


/// Network that can only be evaluated.
///
/// Works for every [Scalar](crate::Scalar) type, including plain floats.

#[derive(Debug, Clone)]
pub struct InferenceNet<L> {
  layers: L,
}

impl<L: Layer> InferenceNet<L> {
  pub fn new(layers: L) -> Self {
    Self { layers }
  }

  pub fn forward(&self, input: &L::Input) -> L::Output {
    self.layers.forward(input)
  }

  pub fn layers(&self) -> &L {
    &self.layers
  }

  pub fn into_layers(self) -> L {
    self.layers
  }

  /// Encode all parameters, in construction order.

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    snapshot(&self.layers)
  }

  /// Overwrite all parameters from a snapshot taken of an identically shaped net.

  pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<()> {
    restore(&mut self.layers, bytes)
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, self.to_bytes()?)?;
    Ok(())
  }

  pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
    self.load_bytes(&std::fs::read(path)?)
  }
}

impl<L: Layer> Layer for InferenceNet<L> {
  type Input = L::Input;
  type Output = L::Output;

  fn forward(&self, input: &Self::Input) -> Self::Output {
    self.layers.forward(input)
  }

  fn parameters(&self) -> Vec<Vec<f64>> {
    self.layers.parameters()
  }

  fn load_parameters(&mut self, params: &mut dyn Iterator<Item = Vec<f64>>) -> Result<()> {
    self.layers.load_parameters(params)
  }
}


/// Network that learns from the gradients recorded onto its arena.
///
/// Only constructible over [Differentiable] scalars. Weights only
/// change inside [backward](Self::backward), after an optimizer was
/// [attached](Self::attach_optimizer).

#[derive(Debug)]
pub struct TrainableNet<S: Differentiable, L: Trainable<S>> {
  layers: L,
  arena: S::Arena,
  attached: bool,
  zero_gradients: bool,
  _marker: PhantomData<S>,
}

impl<S: Differentiable, L: Trainable<S>> TrainableNet<S, L> {
  pub fn new(layers: L, arena: S::Arena) -> Self {
    Self {
      layers,
      arena,
      attached: false,
      zero_gradients: true,
      _marker: PhantomData,
    }
  }

  pub fn arena(&self) -> S::Arena {
    self.arena
  }

  pub fn layers(&self) -> &L {
    &self.layers
  }

  pub fn is_attached(&self) -> bool {
    self.attached
  }

  /// Whether [backward](Self::backward) resets all adjoints when it is done.
  /// Enabled by default.

  pub fn set_zero_gradients(&mut self, zero_gradients: bool) {
    self.zero_gradients = zero_gradients;
  }

  /// Bind fresh optimizer state to every parameter, layer by layer.

  pub fn attach_optimizer(&mut self, factory: &OptimizerFactory) {
    self.layers.attach_optimizer(factory, self.arena);
    self.attached = true;
  }

  pub fn forward(&self, input: &L::Input) -> L::Output {
    self.layers.forward(input)
  }

  /// Propagate gradients from `loss` and let every layer apply
  /// one optimizer step.

  pub fn backward(&mut self, loss: &S) -> Result<()> {
    if !self.attached {
      return Err(Error::NotReady { operation: "backward" })
    }
    if !loss.is_tracked() {
      return Err(Error::DetachedLoss)
    }
    loss.gradient();
    self.layers.update_weights()?;
    if self.zero_gradients {
      S::zero_adjoints(self.arena);
    }
    Ok(())
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    snapshot(&self.layers)
  }

  /// Overwrite all parameters from a snapshot. Optimizer state is kept.

  pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<()> {
    restore(&mut self.layers, bytes)
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, self.to_bytes()?)?;
    Ok(())
  }

  pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
    self.load_bytes(&std::fs::read(path)?)
  }
}

impl<S: Differentiable, L: Trainable<S>> Layer for TrainableNet<S, L> {
  type Input = L::Input;
  type Output = L::Output;

  fn forward(&self, input: &Self::Input) -> Self::Output {
    self.layers.forward(input)
  }

  fn parameters(&self) -> Vec<Vec<f64>> {
    self.layers.parameters()
  }

  fn load_parameters(&mut self, params: &mut dyn Iterator<Item = Vec<f64>>) -> Result<()> {
    self.layers.load_parameters(params)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    chain,
    layer::{ Linear, LinearConfig, Tanh, Relu },
    loss::{ Loss, MeanSquaredError },
    tensor::Tensor,
    variable::{ Tape, Var },
  };

  fn layers<'t>(seed: u64) -> impl Trainable<Var<'t>, Input = Tensor<Var<'t>, 2, 3>, Output = Tensor<Var<'t>, 2, 1>> {
    chain![
      Linear::<Var, 3, 4, 2>::new(&LinearConfig::default().seeded(seed)),
      Tanh::new(),
      Linear::<Var, 4, 1, 2>::new(&LinearConfig::default().seeded(seed + 1)),
    ]
  }

  fn batch() -> (Tensor<f64, 2, 3>, Tensor<f64, 2, 1>) {
    (Tensor::from_rows([[0.5, -1.0, 2.0], [1.0, 0.0, -0.5]]), Tensor::from_rows([[1.0], [-1.0]]))
  }

  #[test]
  fn backward_requires_optimizer() {
    let tape = Tape::new();
    let mut net = TrainableNet::new(layers(1), &tape);
    let before = net.parameters();
    let (x, y) = batch();
    let _scope = tape.scope();
    let loss = MeanSquaredError.compute(&net.forward(&x.cast()), &y);
    let err = net.backward(&loss).unwrap_err();
    assert!(matches!(err, Error::NotReady { operation: "backward" }));
    assert_eq!(err.to_string(), "backward requires an optimizer to be attached first");
    assert_eq!(net.parameters(), before);
  }

  #[test]
  fn backward_rejects_detached_loss() {
    let tape = Tape::new();
    let mut net = TrainableNet::new(layers(1), &tape);
    net.attach_optimizer(&OptimizerFactory::sgd(0.1));
    let before = net.parameters();
    let loss = Var::constant(1.0);
    assert!(matches!(net.backward(&loss), Err(Error::DetachedLoss)));
    assert_eq!(net.parameters(), before);
  }

  #[test]
  fn backward_updates_and_zeroes() {
    let tape = Tape::new();
    let mut net = TrainableNet::new(layers(2), &tape);
    net.attach_optimizer(&OptimizerFactory::adam(0.01));
    let before = net.parameters();
    let (x, y) = batch();
    let _scope = tape.scope();
    let loss = MeanSquaredError.compute(&net.forward(&x.cast()), &y);
    net.backward(&loss).unwrap();
    assert_ne!(net.parameters(), before);
    assert_eq!(loss.adjoint(), 0.0);
  }

  #[test]
  fn keeping_gradients() {
    let tape = Tape::new();
    let relu = Relu::<Var, 1, 2>::new();
    let mut net = TrainableNet::new(relu, &tape);
    net.attach_optimizer(&OptimizerFactory::sgd(0.1));
    net.set_zero_gradients(false);
    let x = tape.track(&Tensor::from_rows([[-1.0, 2.0]]));
    let loss = net.forward(&x).sum();
    net.backward(&loss).unwrap();
    assert_eq!(x[(0, 0)].adjoint(), 0.0);
    assert_eq!(x[(0, 1)].adjoint(), 1.0);
  }

  #[test]
  fn loss_decreases() {
    let tape = Tape::new();
    let mut net = TrainableNet::new(layers(3), &tape);
    net.attach_optimizer(&OptimizerFactory::Sgd { learning_rate: 0.05, momentum: 0.0 });
    let (x, y) = batch();
    let mut losses = vec![];
    for _ in 0..50 {
      let _scope = tape.scope();
      let loss = MeanSquaredError.compute(&net.forward(&x.cast()), &y);
      losses.push(loss.value());
      net.backward(&loss).unwrap();
      assert!(tape.len() > 0);
    }
    assert!(tape.is_empty());
    assert!(losses[49] < losses[0]);
  }

  #[test]
  fn snapshot_round_trip() {
    let tape = Tape::new();
    let trained = TrainableNet::new(layers(4), &tape);
    let bytes = trained.to_bytes().unwrap();

    let mut inference = InferenceNet::new(chain![
      Linear::<f64, 3, 4, 2>::new(&LinearConfig::default()),
      Tanh::new(),
      Linear::<f64, 4, 1, 2>::new(&LinearConfig::default()),
    ]);
    inference.load_bytes(&bytes).unwrap();
    assert_eq!(inference.parameters(), trained.parameters());

    let (x, _) = batch();
    let expected = trained.forward(&x.cast()).values();
    for (a, b) in inference.forward(&x).raw().iter().zip(expected.raw()) {
      assert!((a - b).abs() < 1e-12);
    }
  }

  #[test]
  fn snapshot_mismatch() {
    let tape = Tape::new();
    let trained = TrainableNet::new(layers(4), &tape);
    let bytes = trained.to_bytes().unwrap();

    let mut other = InferenceNet::new(Linear::<f64, 3, 1, 2>::new(&LinearConfig::default()));
    assert!(matches!(other.load_bytes(&bytes), Err(Error::SnapshotMismatch { expected: 2, found: 4 })));

    let mut wider = InferenceNet::new(chain![
      Linear::<f64, 3, 5, 2>::new(&LinearConfig::default()),
      Linear::<f64, 5, 1, 2>::new(&LinearConfig::default()),
    ]);
    assert!(matches!(wider.load_bytes(&bytes), Err(Error::Snapshot(_))));
    assert!(matches!(wider.load_bytes(&[0xff]), Err(Error::Snapshot(_))));
  }

  #[test]
  fn snapshot_files() {
    let path = std::env::temp_dir().join(format!("microtensor-net-{}.bin", std::process::id()));
    let net = InferenceNet::new(Linear::<f64, 2, 2, 1>::new(&LinearConfig::default()));
    net.save(&path).unwrap();
    let mut loaded = InferenceNet::new(Linear::<f64, 2, 2, 1>::new(&LinearConfig::default()));
    loaded.load(&path).unwrap();
    assert_eq!(loaded.parameters(), net.parameters());
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(loaded.load(&path), Err(Error::Io(_))));
  }
}
