use std::cell::{ Cell, RefCell };
use std::ops::Range;

mod mops;

use crate::tensor::Tensor;


/// Address of a value on a [Tape].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
  Parameter(usize),
  /// Nodes carry the stamp they were recorded with, so that a slot
  /// reused after release can be told apart from the original.
  Node { index: usize, stamp: usize },
}

/// Local derivative of a node with respect to one of its inputs.

#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
  parent: Slot,
  partial: f64,
}

#[derive(Debug, Clone)]
struct Node {
  edges: Range<usize>,
}


/// Arena recording the elementary operations performed on [Var]s.
///
/// The tape has two regions. Parameters are persistent leaves that live
/// as long as the tape itself. Nodes record the operations of one training
/// step and get released again by the [Scope] that was open while they
/// were recorded. A node only ever refers to earlier nodes, so a single
/// reverse sweep computes every adjoint.
///
/// Tapes are not `Sync`. Every thread needs its own.

#[derive(Debug, Default)]
pub struct Tape {
  nodes: RefCell<Vec<Node>>,
  edges: RefCell<Vec<Edge>>,
  adjoints: RefCell<Vec<f64>>,
  stamps: RefCell<Vec<usize>>,
  parameters: RefCell<Vec<f64>>,
  recorded: Cell<usize>,
  depth: Cell<usize>,
}

impl Tape {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of operation nodes currently recorded.

  pub fn len(&self) -> usize {
    self.nodes.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn num_parameters(&self) -> usize {
    self.parameters.borrow().len()
  }

  /// Number of scopes currently open.

  pub fn depth(&self) -> usize {
    self.depth.get()
  }

  /// Open a checkpoint. Everything recorded until the returned guard
  /// drops gets released again. Adjoints of nodes recorded before the
  /// checkpoint are kept. Parameter adjoints are zeroed once the
  /// outermost scope closes.

  pub fn scope(&self) -> Scope<'_> {
    self.depth.set(self.depth.get() + 1);
    Scope {
      tape: self,
      nodes: self.nodes.borrow().len(),
      edges: self.edges.borrow().len(),
    }
  }

  /// Record an input leaf whose adjoint can be inspected after a backward pass.

  pub fn var(&self, value: f64) -> Var<'_> {
    let slot = self.record(std::iter::empty());
    Var::traced(value, self, slot)
  }

  /// Record a whole tensor of input leaves.

  pub fn track<const B: usize, const C: usize>(&self, tensor: &Tensor<f64, B, C>) -> Tensor<Var<'_>, B, C> {
    tensor.vectorize(|a| self.var(a) )
  }

  /// Register a persistent leaf that survives scope release.

  pub fn parameter(&self, value: f64) -> Var<'_> {
    let mut parameters = self.parameters.borrow_mut();
    parameters.push(0.0);
    Var::traced(value, self, Slot::Parameter(parameters.len() - 1))
  }

  pub fn zero_adjoints(&self) {
    self.adjoints.borrow_mut().iter_mut().for_each(|a| *a = 0.0 );
    self.parameters.borrow_mut().iter_mut().for_each(|a| *a = 0.0 );
  }

  /// Whether `slot` still refers to the value it was handed out for.

  fn is_live(&self, slot: Slot) -> bool {
    match slot {
      Slot::Parameter(i) => i < self.parameters.borrow().len(),
      Slot::Node { index, stamp } => self.stamps.borrow().get(index) == Some(&stamp),
    }
  }

  fn check(&self, slot: Slot) {
    assert!(self.is_live(slot), "Var was used after its scope had been released");
  }

  pub(crate) fn record(&self, edges: impl IntoIterator<Item = Edge>) -> Slot {
    let mut all_edges = self.edges.borrow_mut();
    let start = all_edges.len();
    for edge in edges {
      self.check(edge.parent);
      all_edges.push(edge);
    }
    let mut nodes = self.nodes.borrow_mut();
    nodes.push(Node { edges: start..all_edges.len() });
    self.adjoints.borrow_mut().push(0.0);
    let stamp = self.recorded.get();
    self.recorded.set(stamp + 1);
    self.stamps.borrow_mut().push(stamp);
    Slot::Node { index: nodes.len() - 1, stamp }
  }

  /// Reverse sweep from `seed`, accumulating into existing adjoints.

  pub(crate) fn propagate(&self, seed: Slot) {
    self.check(seed);
    let nodes = self.nodes.borrow();
    let edges = self.edges.borrow();
    let mut adjoints = self.adjoints.borrow_mut();
    let mut parameters = self.parameters.borrow_mut();
    let last = match seed {
      Slot::Parameter(i) => {
        parameters[i] += 1.0;
        return
      },
      Slot::Node { index, .. } => index,
    };
    adjoints[last] += 1.0;
    for n in (0..=last).rev() {
      let adjoint = adjoints[n];
      if adjoint == 0.0 { continue }
      for edge in &edges[nodes[n].edges.clone()] {
        match edge.parent {
          Slot::Parameter(p) => parameters[p] += edge.partial * adjoint,
          Slot::Node { index, .. } => adjoints[index] += edge.partial * adjoint,
        }
      }
    }
  }

  /// Panics when `slot` belongs to a released node.

  pub(crate) fn adjoint(&self, slot: Slot) -> f64 {
    self.check(slot);
    match slot {
      Slot::Parameter(i) => self.parameters.borrow()[i],
      Slot::Node { index, .. } => self.adjoints.borrow()[index],
    }
  }

  fn release(&self, nodes: usize, edges: usize) {
    self.nodes.borrow_mut().truncate(nodes);
    self.edges.borrow_mut().truncate(edges);
    self.adjoints.borrow_mut().truncate(nodes);
    self.stamps.borrow_mut().truncate(nodes);
    let depth = self.depth.get().saturating_sub(1);
    self.depth.set(depth);
    if depth == 0 {
      self.parameters.borrow_mut().iter_mut().for_each(|a| *a = 0.0 );
    }
  }
}


/// Checkpoint on a [Tape], releasing everything recorded since it was
/// opened when dropped. This includes early returns and unwinding.

#[derive(Debug)]
#[must_use = "the scope releases its nodes as soon as it is dropped"]
pub struct Scope<'t> {
  tape: &'t Tape,
  nodes: usize,
  edges: usize,
}

impl<'t> Scope<'t> {
  pub fn tape(&self) -> &'t Tape {
    self.tape
  }
}

impl Drop for Scope<'_> {
  fn drop(&mut self) {
    self.tape.release(self.nodes, self.edges);
  }
}


/// Differentiable scalar.
///
/// A Var is either a constant or traced onto a [Tape]. All arithmetic
/// involving at least one traced operand gets recorded together with
/// its local derivatives, so that [gradient](crate::Differentiable::gradient)
/// can later propagate adjoints back to every traced input.
///
/// Vars are `Copy`. Using a value that was recorded inside a [Scope]
/// for arithmetic or gradients after that scope has been dropped panics.

#[derive(Clone, Copy)]
pub struct Var<'t> {
  value: f64,
  trace: Option<(&'t Tape, Slot)>,
}

impl<'t> Var<'t> {
  pub fn constant(value: f64) -> Self {
    Self { value, trace: None }
  }

  pub(crate) fn traced(value: f64, tape: &'t Tape, slot: Slot) -> Self {
    Self { value, trace: Some((tape, slot)) }
  }

  pub fn value(&self) -> f64 {
    self.value
  }

  pub fn tape(&self) -> Option<&'t Tape> {
    self.trace.map(|(tape, _)| tape )
  }

  pub fn is_parameter(&self) -> bool {
    matches!(self.trace, Some((_, Slot::Parameter(_))))
  }

  /// Adjoint accumulated by the last backward pass. Constants always report zero.
  /// Panics if this value was released by its scope.

  pub fn adjoint(&self) -> f64 {
    self.trace.map_or(0.0, |(tape, slot)| tape.adjoint(slot) )
  }

  /// Propagate adjoints from this value to everything it depends on.
  /// Does nothing for constants.

  pub fn gradient(&self) {
    if let Some((tape, slot)) = self.trace {
      tape.propagate(slot);
    }
  }

  fn edge(&self, partial: f64) -> Option<Edge> {
    self.trace.map(|(_, parent)| Edge { parent, partial } )
  }

  pub(crate) fn unary(self, value: f64, partial: f64) -> Self {
    match self.trace {
      None => Self::constant(value),
      Some((tape, _)) => Self::traced(value, tape, tape.record(self.edge(partial))),
    }
  }

  pub(crate) fn binary(self, rhs: Self, value: f64, partial_l: f64, partial_r: f64) -> Self {
    match self.tape().or(rhs.tape()) {
      None => Self::constant(value),
      Some(tape) => {
        debug_assert!(rhs.tape().map_or(true, |other| std::ptr::eq(tape, other)),
          "Cannot combine Vars recorded on different tapes");
        let edges = self.edge(partial_l).into_iter().chain(rhs.edge(partial_r));
        Self::traced(value, tape, tape.record(edges))
      },
    }
  }

  /// Record a node depending on any number of inputs.

  pub(crate) fn nary(value: f64, inputs: impl IntoIterator<Item = (Self, f64)>) -> Self {
    let mut tape = None;
    let edges: Vec<Edge> = inputs.into_iter()
      .filter_map(|(input, partial)| {
        tape = tape.or(input.tape());
        input.edge(partial)
      })
      .collect();
    match tape {
      None => Self::constant(value),
      Some(tape) => Self::traced(value, tape, tape.record(edges)),
    }
  }
}

impl std::fmt::Debug for Var<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    match self.trace {
      None => write!(f, "Var({})", self.value),
      Some((_, slot)) => write!(f, "Var({}, {:?})", self.value, slot),
    }
  }
}

impl std::fmt::Display for Var<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let title = match self.trace {
      None => "Constant",
      Some((_, Slot::Parameter(_))) => "Parameter",
      Some((_, Slot::Node { .. })) => "Tracked",
    };
    write!(f, "{title} {}", self.value)
  }
}

impl PartialEq for Var<'_> {
  fn eq(&self, rhs: &Self) -> bool {
    self.value == rhs.value
  }
}

impl PartialOrd for Var<'_> {
  fn partial_cmp(&self, rhs: &Self) -> Option<std::cmp::Ordering> {
    self.value.partial_cmp(&rhs.value)
  }
}

impl From<f64> for Var<'_> {
  fn from(value: f64) -> Self {
    Self::constant(value)
  }
}
