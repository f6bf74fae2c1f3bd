//! Campaign driver: tunes a CNN-shaped search space against a bundled
//! synthetic objective, one batch of trials per process invocation.
//!
//! Re-running the binary with the same store resumes the campaign; results
//! accumulate until the search is stopped for good. Real deployments swap
//! the synthetic objective for an evaluator that trains an actual model.

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use hs_engine::{
    plot_best_model, plot_demo_model, DotPlotter, Evaluator, SearchLoop, Settings, TrialOutcome,
};
use hs_optimizer::{ParameterKind, SearchSpace, SearchStrategy, TpeSearch};
use hs_store::TrialStore;
use hs_types::{Configuration, ObjectiveDirection};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("==================== environment variables ====================");
    for (key, value) in std::env::vars() {
        debug!("{key}: {value}");
    }

    if !gpu_available() {
        warn!("no GPU-class accelerator is visible; trials will run on CPU");
    }

    let settings = Settings::from_env().context("reading campaign settings")?;
    info!(
        max_evals = settings.max_evals,
        environment = %settings.environment,
        store = %settings.store_path.display(),
        "starting sweep"
    );

    let plotter = DotPlotter::new(settings.plot_destination());
    plot_demo_model(&plotter, &settings.plot_file_prefix("model_demo"))
        .context("plotting demo model")?;

    let space = cnn_search_space().context("building search space")?;
    let mut strategy = TpeSearch::new(space).with_startup(10);
    let mut store = TrialStore::open(&settings.store_path).context("opening trial store")?;

    info!(
        strategy = strategy.name(),
        prior_trials = store.len(),
        "optimizing model"
    );

    let search = SearchLoop::new(settings.max_evals).with_direction(ObjectiveDirection::Minimize);
    let best = search.optimize(&mut strategy, SyntheticCnnObjective, &mut store)?;

    match &best {
        Some(record) => {
            info!(
                trial = record.number,
                loss = record.loss.unwrap_or(f64::NAN),
                "best configuration so far"
            );
            // Structured form, so the best trial can be copied straight out
            // of the logs.
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        None => warn!("no successful trial recorded yet"),
    }

    plot_best_model(
        &plotter,
        &store,
        ObjectiveDirection::Minimize,
        &settings.plot_file_prefix("model_best"),
    )
    .context("plotting best model")?;

    info!("optimization step complete");
    Ok(())
}

fn gpu_available() -> bool {
    let cuda_devices = std::env::var("CUDA_VISIBLE_DEVICES").unwrap_or_default();
    if !cuda_devices.is_empty() && cuda_devices != "-1" {
        return true;
    }
    Path::new("/proc/driver/nvidia").exists()
}

/// The tunable hyperparameters of the convolutional architecture.
fn cnn_search_space() -> Result<SearchSpace, hs_types::SpaceError> {
    SearchSpace::new()
        // Learning-rate multiplier varies exponentially, so it is tuned in
        // exponent space rather than linearly.
        .add_log_uniform("lr_rate_mult", -0.5, 0.5)?
        .add_log_uniform("l2_weight_reg_mult", -1.3, 1.3)?
        .add_quniform("batch_size", 100.0, 450.0, 5.0)?
        .add_choice(
            "optimizer",
            vec!["Adam".into(), "Nadam".into(), "RMSprop".into()],
        )?
        .add_uniform("coarse_labels_weight", 0.1, 0.7)?
        .add_uniform("conv_dropout_drop_proba", 0.0, 0.35)?
        .add_uniform("fc_dropout_drop_proba", 0.0, 0.6)?
        .add_choice("use_BN", vec![false.into(), true.into()])?
        // Special first convolution, and if used, its kernel size.
        .add_optional(
            "first_conv",
            ParameterKind::Choice {
                options: vec![3.into(), 4.into()],
            },
        )?
        // Residual connections, and if used, how many units to stack.
        .add_optional(
            "residual",
            ParameterKind::QUniform {
                low: 1.0 - 0.499,
                high: 4.0 + 0.499,
                step: 1.0,
            },
        )?
        .add_log_uniform("conv_hiddn_units_mult", -0.6, 0.6)?
        .add_choice("nb_conv_pool_layers", vec![2.into(), 3.into()])?
        .add_quniform("conv_pool_res_start_idx", 0.0, 2.0, 1.0)?
        .add_choice(
            "pooling_type",
            vec![
                "max".into(),
                "avg".into(),
                "all_conv".into(),
                "inception".into(),
            ],
        )?
        .add_quniform("conv_kernel_size", 2.0, 4.0, 1.0)?
        .add_quniform("res_conv_kernel_size", 2.0, 4.0, 1.0)?
        .add_log_uniform("fc_units_1_mult", -0.6, 0.6)?
        // One more FC layer at the output, and if used, its width multiplier.
        .add_optional(
            "one_more_fc",
            ParameterKind::LogUniform {
                low: -0.6,
                high: 0.6,
            },
        )?
        .add_choice("activation", vec!["relu".into(), "elu".into()])
}

/// Stand-in for the real training procedure: a smooth loss surface over the
/// architecture hyperparameters with a little noise, plus a simulated
/// resource failure for oversized models so the containment path stays
/// exercised end to end.
struct SyntheticCnnObjective;

impl Evaluator for SyntheticCnnObjective {
    fn evaluate(&mut self, config: &Configuration) -> anyhow::Result<TrialOutcome> {
        let float = |name: &str| -> anyhow::Result<f64> {
            config
                .get(name)
                .and_then(|v| v.as_float())
                .with_context(|| format!("missing parameter {name}"))
        };

        let lr_mult = float("lr_rate_mult")?;
        let l2_mult = float("l2_weight_reg_mult")?;
        let batch_size = float("batch_size")?;
        let conv_dropout = float("conv_dropout_drop_proba")?;
        let fc_dropout = float("fc_dropout_drop_proba")?;
        let conv_units = float("conv_hiddn_units_mult")?;

        let n_layers = config
            .get("nb_conv_pool_layers")
            .and_then(|v| v.as_int())
            .unwrap_or(2);

        if batch_size >= 445.0 && n_layers >= 3 {
            anyhow::bail!("simulated out-of-memory: batch {batch_size} with {n_layers} conv/pool layers");
        }

        let mut loss = 0.5;
        loss += lr_mult.ln().powi(2) * 0.30;
        loss += l2_mult.ln().powi(2) * 0.10;
        loss += ((batch_size - 300.0) / 350.0).powi(2) * 0.20;
        loss += (conv_dropout - 0.175).powi(2) * 0.80;
        loss += (fc_dropout - 0.30).powi(2) * 0.50;
        loss += conv_units.ln().powi(2) * 0.15;

        if config
            .get("residual")
            .map(|v| v.is_enabled())
            .unwrap_or(false)
        {
            loss -= 0.03;
        }
        if config.get("use_BN").and_then(|v| v.as_bool()) == Some(true) {
            loss -= 0.02;
        }
        if config.get("pooling_type").and_then(|v| v.as_str()) == Some("inception") {
            loss -= 0.01;
        }

        let noise: f64 = rand::random::<f64>() * 0.02;
        let loss = (loss + noise).max(0.0);

        Ok(TrialOutcome::new(loss)
            .with_metric("val_accuracy", (1.0 - loss).clamp(0.0, 1.0))
            .with_metric("epochs", 12.0))
    }
}
