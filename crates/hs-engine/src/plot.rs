//! Architecture plotting collaborator.
//!
//! Renders the layer graph a configuration would build as Graphviz DOT text.
//! Purely a visualization side effect: nothing here feeds back into the
//! search loop, and a missing best model is a log line, not an error.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use hs_store::TrialStore;
use hs_types::{Configuration, ObjectiveDirection, ParameterValue, SweepResult};

/// Renders a diagram of the model a configuration would build.
pub trait ArchPlotter {
    /// Returns the path the diagram was written to.
    fn plot(&self, config: &Configuration, file_name_prefix: &str) -> SweepResult<PathBuf>;
}

/// Writes Graphviz DOT files under a fixed directory.
#[derive(Debug, Clone)]
pub struct DotPlotter {
    dir: PathBuf,
}

impl DotPlotter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArchPlotter for DotPlotter {
    fn plot(&self, config: &Configuration, file_name_prefix: &str) -> SweepResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{file_name_prefix}.dot"));
        fs::write(&path, render_dot(config))?;
        info!(path = %path.display(), "architecture plot written");
        Ok(path)
    }
}

/// Plot the fixed baseline model (a reasonable mid-sized configuration),
/// useful as a visual reference before the search starts.
pub fn plot_demo_model(plotter: &dyn ArchPlotter, file_name_prefix: &str) -> SweepResult<PathBuf> {
    plotter.plot(&demo_configuration(), file_name_prefix)
}

/// Plot the best model found so far, if any trial has succeeded.
pub fn plot_best_model(
    plotter: &dyn ArchPlotter,
    store: &TrialStore,
    direction: ObjectiveDirection,
    file_name_prefix: &str,
) -> SweepResult<Option<PathBuf>> {
    match store.best(direction) {
        Some(best) => {
            info!(
                trial = best.number,
                loss = best.loss.unwrap_or(f64::NAN),
                "plotting best model"
            );
            plotter.plot(&best.config, file_name_prefix).map(Some)
        }
        None => {
            info!("no best model to plot yet, continuing");
            Ok(None)
        }
    }
}

fn lookup_float(config: &Configuration, name: &str, default: f64) -> f64 {
    config.get(name).and_then(|v| v.as_float()).unwrap_or(default)
}

fn lookup_str<'a>(config: &'a Configuration, name: &str, default: &'a str) -> &'a str {
    config.get(name).and_then(|v| v.as_str()).unwrap_or(default)
}

/// Describe the layer stack a configuration would build, one label per layer.
fn layer_labels(config: &Configuration) -> Vec<String> {
    let activation = lookup_str(config, "activation", "relu");
    let pooling = lookup_str(config, "pooling_type", "max");
    let kernel = lookup_float(config, "conv_kernel_size", 3.0) as i64;
    let conv_mult = lookup_float(config, "conv_hiddn_units_mult", 1.0);
    let n_conv_pool = lookup_float(config, "nb_conv_pool_layers", 2.0) as usize;
    let use_bn = config
        .get("use_BN")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let mut labels = vec!["input".to_string()];

    if let Some(size) = config.get("first_conv").and_then(|v| v.as_toggle()) {
        let k = size.as_float().unwrap_or(3.0) as i64;
        labels.push(format!("first conv {k}x{k}"));
    }

    let residual_units = config
        .get("residual")
        .and_then(|v| v.as_toggle())
        .and_then(|v| v.as_float())
        .map(|v| v as usize);

    for i in 0..n_conv_pool {
        let mut conv = format!(
            "conv {kernel}x{kernel} ({activation}, x{conv_mult:.2} units)"
        );
        if let Some(units) = residual_units {
            let start = lookup_float(config, "conv_pool_res_start_idx", 0.0) as usize;
            if i >= start {
                conv.push_str(&format!(" + residual x{units}"));
            }
        }
        labels.push(conv);
        if use_bn {
            labels.push("batch norm".to_string());
        }
        labels.push(format!("{pooling} pool"));
    }

    labels.push("flatten".to_string());
    let fc_mult = lookup_float(config, "fc_units_1_mult", 1.0);
    labels.push(format!("fc ({activation}, x{fc_mult:.2} units)"));

    if let Some(mult) = config.get("one_more_fc").and_then(|v| v.as_toggle()) {
        let m = mult.as_float().unwrap_or(1.0);
        labels.push(format!("fc ({activation}, x{m:.2} units)"));
    }

    labels.push("softmax output".to_string());
    labels
}

fn render_dot(config: &Configuration) -> String {
    let labels = layer_labels(config);

    let mut dot = String::from("digraph model {\n");
    dot.push_str("    rankdir=TB;\n");
    dot.push_str("    node [shape=box, fontname=\"Helvetica\"];\n");
    for (i, label) in labels.iter().enumerate() {
        dot.push_str(&format!("    l{i} [label=\"{}\"];\n", label.replace('"', "'")));
    }
    for i in 1..labels.len() {
        dot.push_str(&format!("    l{} -> l{};\n", i - 1, i));
    }
    dot.push_str("}\n");
    dot
}

/// A mid-sized baseline configuration, matching the shape of the tuned
/// search space.
pub fn demo_configuration() -> Configuration {
    let mut config = Configuration::new();
    config.insert("lr_rate_mult".into(), ParameterValue::Float(1.0));
    config.insert("l2_weight_reg_mult".into(), ParameterValue::Float(1.0));
    config.insert("batch_size".into(), ParameterValue::Float(300.0));
    config.insert("optimizer".into(), ParameterValue::Json("Nadam".into()));
    config.insert("coarse_labels_weight".into(), ParameterValue::Float(0.2));
    config.insert("conv_dropout_drop_proba".into(), ParameterValue::Float(0.175));
    config.insert("fc_dropout_drop_proba".into(), ParameterValue::Float(0.3));
    config.insert("use_BN".into(), ParameterValue::Json(true.into()));
    config.insert(
        "first_conv".into(),
        ParameterValue::Toggle(Some(Box::new(ParameterValue::Float(4.0)))),
    );
    config.insert(
        "residual".into(),
        ParameterValue::Toggle(Some(Box::new(ParameterValue::Float(4.0)))),
    );
    config.insert("conv_hiddn_units_mult".into(), ParameterValue::Float(1.0));
    config.insert("nb_conv_pool_layers".into(), ParameterValue::Json(3.into()));
    config.insert("conv_pool_res_start_idx".into(), ParameterValue::Float(0.0));
    config.insert("pooling_type".into(), ParameterValue::Json("inception".into()));
    config.insert("conv_kernel_size".into(), ParameterValue::Float(3.0));
    config.insert("res_conv_kernel_size".into(), ParameterValue::Float(3.0));
    config.insert("fc_units_1_mult".into(), ParameterValue::Float(1.0));
    config.insert(
        "one_more_fc".into(),
        ParameterValue::Toggle(Some(Box::new(ParameterValue::Float(1.0)))),
    );
    config.insert("activation".into(), ParameterValue::Json("elu".into()));
    config
}
