use std::{fs::File, io::BufWriter, path::PathBuf};

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use scalargrad::{
    nn::Mlp,
    train::{batch_loss, fit, TrainConfig},
    EngineError, Value,
};

/// Train a small multi-layer perceptron on a toy dataset.
#[derive(Parser, Debug)]
#[command(name = "scalargrad", version)]
struct Cli {
    /// Number of gradient descent steps
    #[arg(long, default_value_t = 40)]
    epochs: usize,

    /// Step size of each update
    #[arg(long = "learning-rate", default_value_t = 0.05)]
    learning_rate: f64,

    /// Seed for weight initialization
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Neurons per hidden layer
    #[arg(long = "hidden-size", default_value_t = 3)]
    hidden_size: usize,

    /// Number of hidden layers
    #[arg(long = "num-hidden", default_value_t = 3)]
    num_hidden: usize,

    /// Write the graph of the final loss as graphviz dot
    #[arg(long, value_name = "PATH")]
    dot: Option<PathBuf>,
}

fn predictions(mlp: &Mlp, xs: &[Vec<f64>]) -> Result<Vec<f64>, EngineError> {
    xs.iter()
        .map(|x| {
            mlp.predict(x)
                .map(|outputs| outputs.iter().map(Value::data).sum::<f64>())
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let xs = vec![
        vec![2.0, 3.0, -1.0],
        vec![3.0, -1.0, 0.5],
        vec![0.5, 1.0, 1.0],
        vec![1.0, 1.0, -1.0],
    ];
    let ys = vec![vec![1.0], vec![-1.0], vec![-1.0], vec![1.0]];

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut mlp = Mlp::new(3, 1, cli.hidden_size, cli.num_hidden, &mut rng);

    println!("Predictions before training: {:?}", predictions(&mlp, &xs)?);

    let config = TrainConfig {
        epochs: cli.epochs,
        learning_rate: cli.learning_rate,
    };
    let history = fit(&mut mlp, &xs, &ys, &config)?;
    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        println!("Loss: {first} -> {last}");
    }

    println!("Predictions after training: {:?}", predictions(&mlp, &xs)?);

    if let Some(path) = cli.dot {
        let loss = batch_loss(&mlp, &xs, &ys)?;
        loss.backward();
        let mut file = BufWriter::new(File::create(&path)?);
        loss.dot(&mut file)?;
        println!("Wrote graph to {}", path.display());
    }
    Ok(())
}
