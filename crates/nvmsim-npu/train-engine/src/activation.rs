// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Activation and digitization helpers

/// Logistic sigmoid.
///
/// # Example
/// ```
/// use nvmsim_npu_train_engine::activation::sigmoid;
///
/// assert_eq!(sigmoid(0.0), 0.5);
/// ```
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Round up when the fractional part reaches `threshold`, down otherwise.
///
/// # Example
/// ```
/// use nvmsim_npu_train_engine::activation::round_th;
///
/// assert_eq!(round_th(2.4, 0.5), 2);
/// assert_eq!(round_th(2.4, 0.3), 3);
/// ```
#[inline]
pub fn round_th(x: f64, threshold: f64) -> u32 {
    let floor = x.floor();
    let v = if x - floor >= threshold { floor + 1.0 } else { floor };
    v.max(0.0) as u32
}

/// Map an activation in `[0, 1]` onto `num_levels` integer levels.
#[inline]
pub fn digitize(value: f64, num_levels: u32, threshold: f64) -> u32 {
    let top = num_levels.saturating_sub(1);
    round_th(value.clamp(0.0, 1.0) * top as f64, threshold).min(top)
}

/// Value a digitized level stands for.
#[inline]
pub fn level_value(level: u32, num_levels: u32) -> f64 {
    level as f64 / num_levels.saturating_sub(1).max(1) as f64
}
