// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Training samples and their digitized inputs

use ndarray::{Array1, Array2};

use crate::activation::digitize;
use crate::error::{Result, TrainError};

/// One labelled sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Analog inputs in `[0, 1]`, used by the algorithmic forward pass and by the
    /// first layer's weight update
    pub input: Array1<f64>,
    /// Input levels in `0..num_input_level`, read bit by bit by the hardware forward pass
    pub digitized: Vec<u32>,
    pub target: Array1<f64>,
}

impl Sample {
    pub fn new(input: Array1<f64>, target: Array1<f64>, num_input_level: u32, threshold: f64) -> Result<Self> {
        if let Some(bad) = input.iter().chain(target.iter()).find(|v| !v.is_finite()) {
            return Err(TrainError::Dataset(format!("non-finite value {} in sample", bad)));
        }
        let digitized = input.iter().map(|&x| digitize(x, num_input_level, threshold)).collect();
        Ok(Self {
            input,
            digitized,
            target,
        })
    }
}

/// A fixed set of samples sharing one input and one target width.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        let Some(first) = samples.first() else {
            return Err(TrainError::Dataset("dataset is empty".to_string()));
        };
        let (num_input, num_output) = (first.input.len(), first.target.len());
        for sample in &samples {
            if sample.input.len() != num_input || sample.digitized.len() != num_input {
                return Err(TrainError::ShapeMismatch {
                    what: "sample input",
                    expected: num_input,
                    got: sample.input.len(),
                });
            }
            if sample.target.len() != num_output {
                return Err(TrainError::ShapeMismatch {
                    what: "sample target",
                    expected: num_output,
                    got: sample.target.len(),
                });
            }
        }
        Ok(Self { samples })
    }

    /// Build from row-per-sample matrices.
    pub fn from_arrays(
        inputs: &Array2<f64>,
        targets: &Array2<f64>,
        num_input_level: u32,
        threshold: f64,
    ) -> Result<Self> {
        if inputs.nrows() != targets.nrows() {
            return Err(TrainError::ShapeMismatch {
                what: "target rows",
                expected: inputs.nrows(),
                got: targets.nrows(),
            });
        }
        let samples = inputs
            .rows()
            .into_iter()
            .zip(targets.rows())
            .map(|(x, t)| Sample::new(x.to_owned(), t.to_owned(), num_input_level, threshold))
            .collect::<Result<Vec<_>>>()?;
        Self::new(samples)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn num_input(&self) -> usize {
        self.samples.first().map_or(0, |s| s.input.len())
    }

    pub fn num_output(&self) -> usize {
        self.samples.first().map_or(0, |s| s.target.len())
    }

    /// Fail unless the dataset fits a network of the given shape.
    pub fn check_shape(&self, num_input: usize, num_output: usize) -> Result<()> {
        if self.num_input() != num_input {
            return Err(TrainError::ShapeMismatch {
                what: "dataset input width",
                expected: num_input,
                got: self.num_input(),
            });
        }
        if self.num_output() != num_output {
            return Err(TrainError::ShapeMismatch {
                what: "dataset target width",
                expected: num_output,
                got: self.num_output(),
            });
        }
        Ok(())
    }
}

/// Bit `n` of every level, as the active-row pattern of one read cycle.
pub(crate) fn active_rows(levels: &[u32], bit: u32) -> impl Iterator<Item = bool> + '_ {
    levels.iter().map(move |&level| (level >> bit) & 1 == 1)
}

/// One-hot target of width `num_output`.
pub fn one_hot(label: usize, num_output: usize) -> Array1<f64> {
    Array1::from_shape_fn(num_output, |j| if j == label { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sample_digitizes_inputs() {
        let s = Sample::new(array![0.0, 0.4, 1.0], array![1.0], 4, 0.5).unwrap();
        assert_eq!(s.digitized, vec![0, 1, 3]);
    }

    #[test]
    fn test_dataset_rejects_ragged_samples() {
        let a = Sample::new(array![0.0, 1.0], array![1.0], 2, 0.5).unwrap();
        let b = Sample::new(array![0.0], array![1.0], 2, 0.5).unwrap();
        assert!(matches!(
            Dataset::new(vec![a, b]),
            Err(TrainError::ShapeMismatch { .. })
        ));
        assert!(Dataset::new(Vec::new()).is_err());
    }

    #[test]
    fn test_from_arrays() {
        let inputs = array![[1.0, 0.0], [0.0, 1.0]];
        let targets = array![[1.0], [0.0]];
        let ds = Dataset::from_arrays(&inputs, &targets, 2, 0.5).unwrap();
        assert_eq!(ds.len(), 2);
        assert!(ds.check_shape(2, 1).is_ok());
        assert!(ds.check_shape(3, 1).is_err());
    }

    #[test]
    fn test_active_rows_and_one_hot() {
        let rows: Vec<bool> = active_rows(&[1, 2, 3], 1).collect();
        assert_eq!(rows, vec![false, true, true]);
        assert_eq!(one_hot(2, 4), array![0.0, 0.0, 1.0, 0.0]);
    }
}
