//! Fit a synthetic HI spectrum the way a viewer session would.
//!
//! Run with `cargo run --example hi_session [config.json]`. The optional
//! argument is a Gaussian fitter configuration in JSON. Set `RUST_LOG=debug`
//! to see the optimizer trace.

use rand::Rng;
use specfit_rs::{
    GaussianFitConfig, GaussianFitter, GaussianGuess, Header, SpecFitError, SpectrumModel, Unit,
};

const REST: f64 = 1.420_405_751_77e9;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => GaussianFitConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => GaussianFitConfig::default(),
    };

    let header = Header::new()
        .with("NAXIS1", 1024i64)
        .with("CRPIX1", 512.0)
        .with("CRVAL1", REST)
        .with("CDELT1", -2.5e3)
        .with("RESTFREQ", REST)
        .with("VELO-LSR", 8.0)
        .with("BUNIT", "K")
        .with("OBJECT", "synthetic");

    // Tilted continuum, one emission line, one absorption line
    let mut rng = rand::thread_rng();
    let y: Vec<f64> = (1..=1024)
        .map(|ch| {
            let f = REST + (ch as f64 - 512.0) * -2.5e3;
            let emission = 2.0 * (-0.5 * ((f - (REST - 1.5e5)) / 1.2e4).powi(2)).exp();
            let absorption = -0.8 * (-0.5 * ((f - (REST + 4.0e5)) / 2.0e4).powi(2)).exp();
            0.5 + 1e-4 * ch as f64 + emission + absorption + rng.gen_range(-0.03..0.03)
        })
        .collect();

    let mut model = SpectrumModel::with_fitter(GaussianFitter::with_config(config));
    model.load_from_header(y, header)?;
    println!("Spectrum of {:?}", model.header_field("OBJECT").map(|v| v.to_string()));

    // Continuum anchors picked in channels, away from both lines
    let raw = model.raw_values()?.to_vec();
    let anchors: Vec<(f64, f64)> = [10usize, 100, 250, 400, 700, 850, 1000]
        .iter()
        .map(|&ch| (ch as f64, raw[ch - 1]))
        .collect();
    let baseline = model.fit_baseline(&anchors, Unit::Channel, 1)?;
    println!(
        "Baseline order {}: coefficients {:?}",
        baseline.order, baseline.coefficients
    );

    // Line boxes drawn on the velocity axis
    let converter = model.converter().ok_or("no spectrum loaded")?.clone();
    let box_around = |center: f64, half: f64, ymin: f64, ymax: f64| {
        Ok::<_, SpecFitError>(GaussianGuess::new(
            converter.convert(center - half, Unit::Hz, Unit::Velocity)?,
            converter.convert(center + half, Unit::Hz, Unit::Velocity)?,
            ymin,
            ymax,
        ))
    };
    let guesses = vec![
        box_around(REST - 1.5e5, 4.0e4, 0.0, 1.8)?,
        box_around(REST + 4.0e5, 6.0e4, -0.9, -0.6)?,
    ];
    let result = model.fit_gaussians(&guesses, Unit::Velocity)?;
    println!(
        "Fitted {} components in {} iterations, rms residual {:.4}",
        result.len(),
        result.iterations,
        result.rms_residual
    );

    for unit in [Unit::MHz, Unit::Channel, Unit::Velocity] {
        println!("\nParameters in {}:", unit);
        for (i, p) in model.gaussian_params(unit)?.iter().enumerate() {
            println!(
                "  #{}: mean = {:.6}, sigma = {:.6}, fwhm = {:.6}, amplitude = {:.4}",
                i + 1,
                p.mean,
                p.sigma,
                p.fwhm(),
                p.amplitude
            );
        }
    }

    if let Some(errors) = &result.errors {
        println!("\nStandard errors (km/s): {}", serde_json::to_string(errors)?);
    }

    Ok(())
}
