// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Error terms for squared loss through sigmoid units

use ndarray::{Array1, ArrayView1, ArrayView2, Zip};

use crate::error::{Result, TrainError};

/// Output and hidden error terms of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorTerms {
    /// `s2[j] = -2 a2 (1 - a2) (t - a2)`
    pub s2: Array1<f64>,
    /// `s1[j] = a1 (1 - a1) Σ_k w2[k][j] s2[k]`
    pub s1: Array1<f64>,
}

/// Back-propagate `target` through the hidden-to-output weights `w2`.
///
/// Both terms are computed from the weights as they are before any update of this sample.
pub fn backpropagate(
    a1: ArrayView1<f64>,
    a2: ArrayView1<f64>,
    target: ArrayView1<f64>,
    w2: ArrayView2<f64>,
) -> Result<ErrorTerms> {
    if target.len() != a2.len() {
        return Err(TrainError::ShapeMismatch {
            what: "target",
            expected: a2.len(),
            got: target.len(),
        });
    }
    if w2.dim() != (a2.len(), a1.len()) {
        return Err(TrainError::ShapeMismatch {
            what: "weight2 columns",
            expected: a1.len(),
            got: w2.ncols(),
        });
    }

    let s2 = Zip::from(&a2)
        .and(&target)
        .map_collect(|&a, &t| -2.0 * a * (1.0 - a) * (t - a));
    let s1 = Zip::from(&a1)
        .and(w2.columns())
        .par_map_collect(|&a, w_col| a * (1.0 - a) * w_col.dot(&s2));
    Ok(ErrorTerms { s2, s1 })
}
