//! Least squares fitting to a Gaussian distribution using gradient descent.

use scalargrad::Value;

use std::io::Write;

const RATE: f64 = 0.01;
const INIT_MU: f64 = 0.;
const INIT_SIGMA: f64 = 1.;
const INIT_SCALE: f64 = 1.;

struct Params {
    mu: f64,
    sigma: f64,
    scale: f64,
}

struct Model {
    mu: Value,
    sigma: Value,
    scale: Value,
    gaussian: Value,
}

/// Nodes are immutable, so the graph is rebuilt for every sample.
fn build_model(x: f64, params: &Params) -> Model {
    let mu = Value::named("mu", params.mu);
    let sigma = Value::named("sigma", params.sigma);
    let scale = Value::named("scale", params.scale);
    let x_mu = Value::named("x", x).sub(&mu);
    let gaussian = scale.mul((-&(&x_mu * &x_mu)).div(&sigma).div(&sigma).exp());
    Model {
        mu,
        sigma,
        scale,
        gaussian,
    }
}

fn main() {
    fn truth(x: f64) -> f64 {
        0.75 * (-(x - 1.2).powf(2.) / 0.35).exp()
    }

    let samples: Vec<_> = (-40..40).map(|i| i as f64 / 10.).collect();
    let truth_data: Vec<_> = samples.iter().map(|x| truth(*x)).collect();

    let calc_loss = |params: &Params| {
        samples
            .iter()
            .zip(truth_data.iter())
            .map(|(&x, &y)| (build_model(x, params).gaussian.data() - y).powi(2))
            .sum::<f64>()
    };

    let optimize = |params: &mut Params| {
        for (&xval, &sample_y) in samples.iter().zip(truth_data.iter()) {
            let model = build_model(xval, params);
            let loss = model.gaussian.sub(sample_y).powi(2);
            loss.backward();
            params.mu -= RATE * model.mu.grad();
            params.sigma -= RATE * model.sigma.grad();
            params.scale -= RATE * model.scale.grad();
        }
    };

    let mut params = Params {
        mu: INIT_MU,
        sigma: INIT_SIGMA,
        scale: INIT_SCALE,
    };
    for i in 0..100 {
        optimize(&mut params);
        println!(
            "i: {i}, mu: {}, sigma: {}, scale: {}, loss: {}",
            params.mu,
            params.sigma,
            params.scale,
            calc_loss(&params)
        );
    }

    let init = Params {
        mu: INIT_MU,
        sigma: INIT_SIGMA,
        scale: INIT_SCALE,
    };
    let mut file = std::io::BufWriter::new(std::fs::File::create("data.csv").unwrap());
    writeln!(file, "x, y, init_y, truth_y").unwrap();
    for (&xval, &truth_y) in samples.iter().zip(truth_data.iter()) {
        let value = build_model(xval, &params).gaussian.data();
        let init_value = build_model(xval, &init).gaussian.data();
        writeln!(file, "{xval}, {value}, {init_value}, {truth_y}").unwrap();
    }

    let model = build_model(0., &params);
    let loss = model.gaussian.sub(truth(0.)).powi(2);
    loss.backward();
    let mut dotfile = std::io::BufWriter::new(std::fs::File::create("graph.dot").unwrap());
    loss.dot(&mut dotfile).unwrap();
}
