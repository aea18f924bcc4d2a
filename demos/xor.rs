// Trains a small two layer perceptron on the XOR problem, stepping
// through the training loop by hand.

use microtensor_net::{
  chain, Tensor, Tape, Var, TrainableNet, OptimizerFactory,
  layer::{ Linear, LinearConfig, Tanh },
  loss::{ Loss, MeanSquaredError },
};

fn main() {
  // All operations get recorded onto this tape
  let tape = Tape::new();

  // Layers are shape checked while the chain is assembled
  let config = LinearConfig::without_bias();
  let mut net = TrainableNet::new(chain![
    Linear::<Var, 2, 8, 4>::new(&config),
    Tanh::new(),
    Linear::<Var, 8, 1, 4>::new(&config),
    Tanh::new(),
  ], &tape);

  // Every parameter tensor gets its own optimizer instance
  net.attach_optimizer(&OptimizerFactory::Sgd { learning_rate: 0.1, momentum: 0.0 });

  let x = Tensor::<f64, 4, 2>::from_rows([[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
  let y = Tensor::from_rows([[0.0], [1.0], [1.0], [0.0]]);

  for step in 0..500 {
    // Nodes recorded during this step get released when the scope drops
    let _scope = tape.scope();

    let loss = MeanSquaredError.compute(&net.forward(&x.cast()), &y);
    if step % 50 == 0 {
      println!("Step {step}: loss {:.5} ({} nodes on tape)", loss.value(), tape.len());
    }

    // Back-prop, optimize and reset gradients
    net.backward(&loss).unwrap();
  }

  println!("Predictions: {}", net.forward(&x.cast()).values());
}
