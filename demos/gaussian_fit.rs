//! Example of fitting a Gaussian likelihood with the full operation sequence.
//!
//! Run with `RUST_LOG=info` to see the engine and driver messages.

use minopt_rs::models::GaussianNll;
use minopt_rs::objective::Objective;
use minopt_rs::{Minimizer, SimplexEngine};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Gaussian likelihood fit");
    println!("=======================\n");

    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let normal = Normal::new(3.0, 0.8)?;
    let data: Vec<f64> = (0..1000).map(|_| normal.sample(&mut rng)).collect();

    let mut nll = GaussianNll::new(data, 2.0, 1.0)?;
    nll.parameters_mut().get_mut("sigma").unwrap().set_min(0.0)?;

    let mut minimizer = Minimizer::new(nll, SimplexEngine::new());
    minimizer.optimize_const(true);
    minimizer.set_profile(true);

    // 1. Width held fixed, mean only
    minimizer.objective_mut().parameters_mut().set_constant("sigma", true)?;
    let status = minimizer.migrad();
    println!("MIGRAD with sigma fixed: status {}", status);
    print_parameters(minimizer.objective());

    // 2. Release the width and refine
    minimizer.objective_mut().parameters_mut().set_constant("sigma", false)?;
    let status = minimizer.improve();
    println!("IMPROVE with sigma floating: status {}", status);

    // 3. Errors
    println!("HESSE: status {}", minimizer.hesse());
    println!("MINOS: status {}", minimizer.minos());
    println!("EDM: {:.3e}\n", minimizer.edm()?);
    print_parameters(minimizer.objective());

    println!("\nInvalid evaluations: {}", minimizer.num_invalid_evaluations());
    println!("Status history:");
    for (label, status) in minimizer.status_history() {
        println!("  {:<8} {}", label, status);
    }

    let summary = minimizer.save("gaussian")?;
    println!("\nSummary:\n{}", summary.to_json()?);

    Ok(())
}

fn print_parameters(objective: &GaussianNll) {
    for par in objective.parameters().iter() {
        let error = par.stderr().unwrap_or(0.0);
        match par.asym_errors() {
            Some((lo, hi)) => println!(
                "  {:<6} = {:.4} ± {:.4} ({:+.4}, {:+.4})",
                par.name(),
                par.value(),
                error,
                lo,
                hi
            ),
            None => println!("  {:<6} = {:.4} ± {:.4}", par.name(), par.value(), error),
        }
    }
}
