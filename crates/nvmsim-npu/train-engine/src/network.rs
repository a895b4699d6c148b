// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! The two crossbar layers of the network

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use nvmsim_npu_plasticity::{LayerId, SynapticLayer};

use crate::error::{Result, TrainError};
use crate::params::TrainingParams;

/// Mixed into the run seed so weight init and sample selection draw different sequences.
const INIT_SEED_SALT: u64 = 0x5eed_1417;

#[derive(Debug, Clone)]
pub struct TwoLayerNetwork {
    /// Input to hidden, `num_hidden x num_input`
    pub ih: SynapticLayer,
    /// Hidden to output, `num_output x num_hidden`
    pub ho: SynapticLayer,
}

impl TwoLayerNetwork {
    /// Uniform random weights inside the weight bounds, programmed into both crossbars.
    pub fn new(params: &TrainingParams) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(params.seed ^ INIT_SEED_SALT);
        let (lo, hi) = (params.bounds.min, params.bounds.max);
        let mut init = |rows: usize, cols: usize| Array2::from_shape_fn((rows, cols), |_| rng.gen_range(lo..=hi));
        let w1 = init(params.num_hidden, params.num_input);
        let w2 = init(params.num_output, params.num_hidden);
        Self::with_weights(w1, w2, params)
    }

    /// Build from explicit weights. Each entry is replaced by the weight its cell realizes.
    pub fn with_weights(w1: Array2<f64>, w2: Array2<f64>, params: &TrainingParams) -> Result<Self> {
        check_dim("weight1", w1.dim(), (params.num_hidden, params.num_input))?;
        check_dim("weight2", w2.dim(), (params.num_output, params.num_hidden))?;
        let layer = |id, w| {
            SynapticLayer::new(
                id,
                w,
                &params.template,
                &params.technology,
                params.peripherals,
                &params.bounds,
            )
        };
        let ih = layer(LayerId::InputHidden, w1)?;
        let ho = layer(LayerId::HiddenOutput, w2)?;
        info!(
            target: "nvmsim-npu-train-engine",
            "Network {}-{}-{} on {} cells",
            params.num_input,
            params.num_hidden,
            params.num_output,
            params.template.kind().as_str()
        );
        Ok(Self { ih, ho })
    }

    pub fn layers_mut(&mut self) -> [&mut SynapticLayer; 2] {
        [&mut self.ih, &mut self.ho]
    }
}

fn check_dim(what: &'static str, got: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if got.0 != expected.0 {
        return Err(TrainError::ShapeMismatch {
            what,
            expected: expected.0,
            got: got.0,
        });
    }
    if got.1 != expected.1 {
        return Err(TrainError::ShapeMismatch {
            what,
            expected: expected.1,
            got: got.1,
        });
    }
    Ok(())
}
