// This example trains a softmax classifier on three noisy point clouds
// using the mini-batch trainer, then evaluates it with plain floats.

use rand::{ Rng, SeedableRng, rngs::StdRng };

use microtensor_net::{
  chain, Var, Tape, TrainableNet, InferenceNet, OptimizerFactory,
  layer::{ Linear, LinearConfig, Relu, Softmax },
  loss::CrossEntropy,
  train::{ Dataset, Trainer, TrainConfig, LossHistory },
};

const CENTERS: [[f64; 2]; 3] = [[-1.0, -1.0], [1.0, -0.5], [0.0, 1.0]];
const BATCH: usize = 16;

fn clouds(rng: &mut StdRng, samples: usize) -> Dataset<2, 3> {
  (0..samples)
    .map(|i| {
      let class = i % CENTERS.len();
      let [cx, cy] = CENTERS[class];
      let point = [cx + rng.gen_range(-0.6, 0.6), cy + rng.gen_range(-0.6, 0.6)];
      (point, Dataset::<2, 3>::one_hot(class))
    })
    .collect()
}

fn main() {
  let mut rng = StdRng::seed_from_u64(42);
  let train = clouds(&mut rng, 480);
  let test = clouds(&mut rng, 96);

  let tape = Tape::new();
  let mut net = TrainableNet::new(chain![
    Linear::<Var, 2, 16, BATCH>::new(&LinearConfig::default()),
    Relu::new(),
    Linear::<Var, 16, 3, BATCH>::new(&LinearConfig::default()),
    Softmax::new(),
  ], &tape);
  net.attach_optimizer(&OptimizerFactory::adam(0.01));

  let mut trainer = Trainer::new(TrainConfig { epochs: 20, ..TrainConfig::default() }, CrossEntropy);
  let mut history = LossHistory::default();
  trainer.fit(&mut net, &train, &mut history).unwrap();
  for (epoch, loss) in history.epochs.iter().enumerate() {
    println!("Epoch {epoch}: loss {loss:.4}");
  }
  let result = trainer.test(&net, &test);
  println!("Test loss: {:.4}", result.loss);
  if let Some(accuracy) = result.metric {
    println!("Test accuracy: {:.1}%", 100.0 * accuracy);
  }

  // Move the learned parameters into a float-only copy of the net
  let mut inference = InferenceNet::new(chain![
    Linear::<f64, 2, 16, BATCH>::new(&LinearConfig::default()),
    Relu::new(),
    Linear::<f64, 16, 3, BATCH>::new(&LinearConfig::default()),
    Softmax::new(),
  ]);
  inference.load_bytes(&net.to_bytes().unwrap()).unwrap();

  // Classify the cloud centers themselves
  let indices: Vec<usize> = (0..BATCH).map(|i| i % CENTERS.len() ).collect();
  let centers: Dataset<2, 3> = CENTERS.iter()
    .enumerate()
    .map(|(class, &center)| (center, Dataset::<2, 3>::one_hot(class)) )
    .collect();
  let (x, _) = centers.batch::<BATCH>(&indices);
  let predicted = inference.forward(&x).argmax();
  println!("Centers classified as {:?}", &predicted[..CENTERS.len()]);
}
