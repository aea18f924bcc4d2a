//! Statically shape-checked feed-forward networks with tape-based automatic differentiation.
//! Tiny. Few dependencies. CPU only.
//!
//! # Features
//!
//! - **Compile-time shapes.** Tensors carry their batch and channel sizes as
//! const generics. Layers only chain together when the output of one is exactly
//! the input of the next, so shape mismatches never make it past the compiler.
//!
//! - **One forward pass, two modes.** The same layers run on plain floats for
//! inference and on differentiable [Var]s for training. Only nets over
//! [Differentiable] scalars can be trained.
//!
//! - **Bounded tape.** Operations get recorded onto an explicit [Tape]. Every
//! training step opens a [Scope] that releases whatever was recorded once it drops.
//!
//! - **Optimization.** Includes SGD with momentum and ADAM, configured
//! through a serializable [OptimizerFactory].
//!
//! - **Snapshots.** Parameters of trained nets can be saved and loaded into
//! inference nets of the same shape.
//!
//! # Examples
//!
//! Learning XOR:
//! ```
//! use microtensor_net::{
//!   chain, Tensor, Tape, Var, TrainableNet, OptimizerFactory,
//!   layer::{ Linear, LinearConfig, Tanh },
//!   loss::{ Loss, MeanSquaredError },
//! };
//!
//! let tape = Tape::new();
//! let config = LinearConfig::without_bias().seeded(7);
//!
//! let mut net = TrainableNet::new(chain![
//!   Linear::<Var, 2, 8, 4>::new(&config),
//!   Tanh::new(),
//!   Linear::<Var, 8, 1, 4>::new(&config.seeded(8)),
//!   Tanh::new(),
//! ], &tape);
//! net.attach_optimizer(&OptimizerFactory::Sgd { learning_rate: 0.1, momentum: 0.0 });
//!
//! let x = Tensor::<f64, 4, 2>::from_rows([[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
//! let y = Tensor::from_rows([[0.0], [1.0], [1.0], [0.0]]);
//!
//! for _ in 0..10 {
//!   // Release all nodes recorded during this step when done
//!   let _scope = tape.scope();
//!   let loss = MeanSquaredError.compute(&net.forward(&x.cast()), &y);
//!   net.backward(&loss).unwrap();
//! }
//! ```
//!
//! ## More examples
//! Check the `/demos` folder for more example code.
//!
//!
//! # Optional features
//!
//! Some features can be toggled in your `Cargo.toml`.
//!
//! - `unsafe` *(default)*: Accelerated matrix math for `f32` and `f64` using [matrixmultiply] crate.

mod internal;
mod init;
mod tensor;
mod variable;

pub mod scalar;
pub mod layer;
pub mod loss;
pub mod optimize;
pub mod net;
pub mod train;
pub mod error;

pub use init::{ WeightInit, BiasInit };
pub use tensor::Tensor;
pub use variable::{ Tape, Scope, Var };
pub use scalar::{ Scalar, Differentiable };
pub use layer::{ Layer, Trainable, Chain };
pub use optimize::OptimizerFactory;
pub use net::{ InferenceNet, TrainableNet };
pub use error::{ Error, Result };
