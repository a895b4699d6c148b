// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Algorithmic weight range

use crate::error::{DeviceError, Result};

/// Closed interval `[min, max]` every algorithmic weight lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightBounds {
    pub min: f64,
    pub max: f64,
}

impl WeightBounds {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || min >= max {
            return Err(DeviceError::InvalidWeightBounds { min, max });
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    #[inline]
    pub fn clamp(&self, weight: f64) -> f64 {
        weight.clamp(self.min, self.max)
    }

    /// Map a weight to `[0, 1]` (clamped).
    #[inline]
    pub fn normalize(&self, weight: f64) -> f64 {
        ((weight - self.min) / self.span()).clamp(0.0, 1.0)
    }

    /// Inverse of [`normalize`](Self::normalize).
    #[inline]
    pub fn denormalize(&self, unit: f64) -> f64 {
        self.min + unit.clamp(0.0, 1.0) * self.span()
    }
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self { min: -1.0, max: 1.0 }
    }
}
