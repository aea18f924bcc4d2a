use std::fmt::Debug;
use std::fs::File;
use std::io::{ self, BufWriter, Write };
use std::path::{ Path, PathBuf };

use rand::{ SeedableRng, rngs::StdRng, seq::SliceRandom };
use serde::{ Serialize, Deserialize };

use crate::{
  error::Result,
  layer::Trainable,
  loss::Loss,
  net::TrainableNet,
  tensor::Tensor,
  variable::Var,
};


/// In-memory collection of input/label pairs with fixed widths.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset<const IN: usize, const OUT: usize> {
  inputs: Vec<[f64; IN]>,
  labels: Vec<[f64; OUT]>,
}

impl<const IN: usize, const OUT: usize> Dataset<IN, OUT> {
  pub fn new() -> Self {
    Self { inputs: vec![], labels: vec![] }
  }

  pub fn push(&mut self, input: [f64; IN], label: [f64; OUT]) {
    self.inputs.push(input);
    self.labels.push(label);
  }

  pub fn len(&self) -> usize {
    self.inputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inputs.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<(&[f64; IN], &[f64; OUT])> {
    Some((self.inputs.get(index)?, self.labels.get(index)?))
  }

  /// Gather the samples at `indices` into one batch.
  /// Panics unless exactly `B` valid indices are given.

  pub fn batch<const B: usize>(&self, indices: &[usize]) -> (Tensor<f64, B, IN>, Tensor<f64, B, OUT>) {
    assert_eq!(indices.len(), B, "Batch of size {B} requested from {} indices", indices.len());
    let inputs = Tensor::init(|b, c| self.inputs[indices[b]][c] );
    let labels = Tensor::init(|b, c| self.labels[indices[b]][c] );
    (inputs, labels)
  }

  /// Label row with a single one at `class`.

  pub fn one_hot(class: usize) -> [f64; OUT] {
    let mut label = [0.0; OUT];
    label[class] = 1.0;
    label
  }
}

impl<const IN: usize, const OUT: usize> FromIterator<([f64; IN], [f64; OUT])> for Dataset<IN, OUT> {
  fn from_iter<I: IntoIterator<Item = ([f64; IN], [f64; OUT])>>(iter: I) -> Self {
    let (inputs, labels) = iter.into_iter().unzip();
    Self { inputs, labels }
  }
}


/// Receives progress reports from a [Trainer].

pub trait Logger: Debug {
  fn epoch_loss(&mut self, epoch: usize, loss: f64);

  fn batch_loss(&mut self, _epoch: usize, _batch: usize, _loss: f64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Logger for Silent {
  fn epoch_loss(&mut self, _epoch: usize, _loss: f64) {}
}

/// Keeps every reported loss in memory.

#[derive(Debug, Default, Clone)]
pub struct LossHistory {
  pub epochs: Vec<f64>,
  pub batches: Vec<f64>,
}

impl Logger for LossHistory {
  fn epoch_loss(&mut self, _epoch: usize, loss: f64) {
    self.epochs.push(loss);
  }

  fn batch_loss(&mut self, _epoch: usize, _batch: usize, loss: f64) {
    self.batches.push(loss);
  }
}

/// Writes one line per epoch.
///
/// Write failures don't interrupt training. The first one
/// is kept and reported by [finish](LogFile::finish).

#[derive(Debug)]
pub struct LogFile {
  file: PathBuf,
  writer: BufWriter<File>,
  error: Option<io::Error>,
}

impl LogFile {
  pub fn new<P: AsRef<Path>>(path: P) -> io::Result<Self> {
    Ok(Self {
      file: path.as_ref().to_owned(),
      writer: BufWriter::new(File::create(path)?),
      error: None,
    })
  }

  pub fn path(&self) -> &Path {
    &self.file
  }

  pub fn finish(mut self) -> io::Result<()> {
    if let Some(err) = self.error.take() {
      return Err(err)
    }
    self.writer.flush()
  }
}

impl Logger for LogFile {
  fn epoch_loss(&mut self, epoch: usize, loss: f64) {
    if self.error.is_some() { return }
    if let Err(err) = writeln!(self.writer, "{epoch} {loss}") {
      self.error = Some(err);
    }
  }
}


/// Options for [Trainer].

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
  pub epochs: usize,
  /// Visit samples in a different random order every epoch.
  pub shuffle: bool,
  pub seed: Option<u64>,
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self { epochs: 1, shuffle: true, seed: None }
  }
}


/// Result of [Trainer::test], averaged over all full batches.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
  pub loss: f64,
  /// The loss's [metric](Loss::metric), like accuracy for [CrossEntropy](crate::loss::CrossEntropy).
  pub metric: Option<f64>,
}


/// Mini-batch training loop.
///
/// Every step runs inside its own [Scope](crate::Scope), so the tape
/// never grows beyond a single batch. Samples that don't fill a whole
/// batch at the end of an epoch are skipped.

#[derive(Debug)]
pub struct Trainer<F> {
  config: TrainConfig,
  loss: F,
  rng: StdRng,
}

impl<F: Loss> Trainer<F> {
  pub fn new(config: TrainConfig, loss: F) -> Self {
    let rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    Self { config, loss, rng }
  }

  pub fn config(&self) -> &TrainConfig {
    &self.config
  }

  /// Train for the configured number of epochs and return the mean loss of the last one.

  pub fn fit<'t, L, const B: usize, const IN: usize, const OUT: usize>(
    &mut self,
    net: &mut TrainableNet<Var<'t>, L>,
    data: &Dataset<IN, OUT>,
    logger: &mut dyn Logger,
  ) -> Result<f64>
  where
    L: Trainable<Var<'t>, Input = Tensor<Var<'t>, B, IN>, Output = Tensor<Var<'t>, B, OUT>>,
  {
    assert!(data.len() >= B,
      "Batch size cannot be larger than the dataset: batch_size: {B}, data_len: {}", data.len());
    let tape = net.arena();
    let mut order: Vec<usize> = (0..data.len()).collect();
    let mut epoch_loss = 0.0;
    for epoch in 0..self.config.epochs {
      if self.config.shuffle {
        order.shuffle(&mut self.rng);
      }
      let mut total = 0.0;
      let mut batches = 0;
      for (batch, indices) in order.chunks_exact(B).enumerate() {
        let (inputs, labels) = data.batch::<B>(indices);
        let _scope = tape.scope();
        let predictions = net.forward(&inputs.cast());
        let loss = self.loss.compute(&predictions, &labels);
        net.backward(&loss)?;
        logger.batch_loss(epoch, batch, loss.value());
        total += loss.value();
        batches += 1;
      }
      epoch_loss = total / batches as f64;
      logger.epoch_loss(epoch, epoch_loss);
    }
    Ok(epoch_loss)
  }

  /// Evaluate `data` in full batches, leaving parameters untouched.

  pub fn test<'t, L, const B: usize, const IN: usize, const OUT: usize>(
    &self,
    net: &TrainableNet<Var<'t>, L>,
    data: &Dataset<IN, OUT>,
  ) -> Evaluation
  where
    L: Trainable<Var<'t>, Input = Tensor<Var<'t>, B, IN>, Output = Tensor<Var<'t>, B, OUT>>,
  {
    let order: Vec<usize> = (0..data.len()).collect();
    let results: Vec<(f64, Option<f64>)> = order.chunks_exact(B)
      .map(|indices| {
        let (inputs, labels) = data.batch::<B>(indices);
        let _scope = net.arena().scope();
        let predictions = net.forward(&inputs.cast());
        let loss = self.loss.compute(&predictions, &labels).value();
        (loss, self.loss.metric(&predictions, &labels))
      })
      .collect();
    let batches = results.len().max(1) as f64;
    let metrics: Option<Vec<f64>> = results.iter().map(|&(_, metric)| metric ).collect();
    Evaluation {
      loss: results.iter().map(|&(loss, _)| loss ).sum::<f64>() / batches,
      metric: metrics.filter(|m| !m.is_empty() ).map(|m| m.iter().sum::<f64>() / batches ),
    }
  }
}
