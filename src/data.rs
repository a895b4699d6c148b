// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Training data sources for the `nvmsim_train` tool
//!
//! - JSON files of the form `{"inputs": [[...], ...], "labels": [...]}` with inputs in
//!   `[0, 1]` and class labels below `num_output`
//! - Synthetic noisy binary prototypes, one per output class

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use nvmsim_npu_train_engine::{one_hot, Dataset, Sample, TrainError, TrainingParams};

/// Share of active pixels in a synthetic prototype.
const PROTOTYPE_DENSITY: f64 = 0.3;

#[derive(Debug, Deserialize)]
struct DatasetFile {
    inputs: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

/// Read a labelled dataset from a JSON file.
pub fn load_json(path: &Path, params: &TrainingParams) -> Result<Dataset> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let file: DatasetFile =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse dataset {}", path.display()))?;
    if file.inputs.len() != file.labels.len() {
        bail!(
            "Dataset {} has {} inputs but {} labels",
            path.display(),
            file.inputs.len(),
            file.labels.len()
        );
    }
    let samples = file
        .inputs
        .into_iter()
        .zip(file.labels)
        .map(|(input, label)| {
            if label >= params.num_output {
                bail!("Label {} out of range for {} outputs", label, params.num_output);
            }
            Ok(Sample::new(
                Array1::from(input),
                one_hot(label, params.num_output),
                params.num_input_level,
                params.h_threshold,
            )?)
        })
        .collect::<Result<Vec<_>>>()?;
    let dataset = Dataset::new(samples)?;
    dataset.check_shape(params.num_input, params.num_output)?;
    Ok(dataset)
}

/// `num_samples` noisy copies of one random binary prototype per class.
///
/// Each pixel of a copy is flipped with probability `noise`.
pub fn synthetic_patterns(
    params: &TrainingParams,
    num_samples: usize,
    noise: f64,
    seed: u64,
) -> std::result::Result<Dataset, TrainError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = noise.clamp(0.0, 1.0);
    let prototypes: Vec<Vec<bool>> = (0..params.num_output)
        .map(|_| (0..params.num_input).map(|_| rng.gen_bool(PROTOTYPE_DENSITY)).collect())
        .collect();

    let samples = (0..num_samples)
        .map(|i| {
            let label = i % params.num_output;
            let input = prototypes[label]
                .iter()
                .map(|&on| if on ^ rng.gen_bool(noise) { 1.0 } else { 0.0 })
                .collect::<Array1<f64>>();
            Sample::new(
                input,
                one_hot(label, params.num_output),
                params.num_input_level,
                params.h_threshold,
            )
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Dataset::new(samples)
}
