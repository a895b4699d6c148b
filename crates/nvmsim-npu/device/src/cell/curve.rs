// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */
//! Conductance response to identical programming pulses
//!
//! `G(P) = Gmin + B * (1 - exp(-P / A))` with `B = (Gmax - Gmin) / (1 - exp(-N / A))`.
//! A negative `A` bends the curve the other way. A non-finite or zero `A` is linear.

use crate::error::{DeviceError, Result};

/// Smallest argument handed to `ln` when inverting a curve near its end points.
const LN_FLOOR: f64 = 1e-300;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseCurve {
    /// Nonlinearity constant `A` in pulses
    pub nonlinearity: f64,
    /// Number of pulses `N` that sweep the full conductance range
    pub max_num_level: u32,
}

impl ResponseCurve {
    pub fn new(nonlinearity: f64, max_num_level: u32) -> Result<Self> {
        if max_num_level == 0 {
            return Err(DeviceError::InvalidParameter {
                field: "max_num_level",
                reason: "must be at least 1".to_string(),
            });
        }
        if nonlinearity.is_nan() {
            return Err(DeviceError::InvalidParameter {
                field: "nonlinearity",
                reason: "must not be NaN".to_string(),
            });
        }
        Ok(Self {
            nonlinearity,
            max_num_level,
        })
    }

    pub fn linear(max_num_level: u32) -> Self {
        Self {
            nonlinearity: f64::INFINITY,
            max_num_level,
        }
    }

    #[inline]
    pub fn is_linear(&self) -> bool {
        !self.nonlinearity.is_finite() || self.nonlinearity == 0.0
    }

    #[inline]
    fn levels(&self) -> f64 {
        self.max_num_level as f64
    }

    #[inline]
    fn amplitude(&self, g_min: f64, g_max: f64) -> f64 {
        (g_max - g_min) / (1.0 - (-self.levels() / self.nonlinearity).exp())
    }

    /// Conductance after `pulse` pulses from the bottom of the curve.
    pub fn conductance_at(&self, pulse: f64, g_min: f64, g_max: f64) -> f64 {
        let p = pulse.clamp(0.0, self.levels());
        let g = if self.is_linear() {
            g_min + p / self.levels() * (g_max - g_min)
        } else {
            g_min + self.amplitude(g_min, g_max) * (1.0 - (-p / self.nonlinearity).exp())
        };
        g.clamp(g_min, g_max)
    }

    /// Fractional pulse index at which the curve reaches `conductance`.
    pub fn pulse_at(&self, conductance: f64, g_min: f64, g_max: f64) -> f64 {
        let g = conductance.clamp(g_min, g_max);
        let p = if self.is_linear() {
            (g - g_min) / (g_max - g_min) * self.levels()
        } else {
            let arg = (1.0 - (g - g_min) / self.amplitude(g_min, g_max)).max(LN_FLOOR);
            -self.nonlinearity * arg.ln()
        };
        p.clamp(0.0, self.levels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GMIN: f64 = 3.0769e-9;
    const GMAX: f64 = 3.8462e-8;

    #[test]
    fn test_end_points_hit_bounds() {
        for a in [5.0, 40.0, -30.0, f64::INFINITY] {
            let c = ResponseCurve::new(a, 100).unwrap();
            assert!((c.conductance_at(0.0, GMIN, GMAX) - GMIN).abs() < 1e-20);
            assert!((c.conductance_at(100.0, GMIN, GMAX) - GMAX).abs() < 1e-15);
        }
    }

    #[test]
    fn test_inverse_recovers_pulse() {
        for a in [5.0, 40.0, -30.0, f64::INFINITY] {
            let c = ResponseCurve::new(a, 97).unwrap();
            for p in [0.0, 1.0, 13.5, 50.0, 96.0] {
                let g = c.conductance_at(p, GMIN, GMAX);
                assert!((c.pulse_at(g, GMIN, GMAX) - p).abs() < 1e-6, "a={a} p={p}");
            }
        }
    }

    #[test]
    fn test_monotonic_increasing() {
        let c = ResponseCurve::new(-12.0, 50).unwrap();
        let mut prev = c.conductance_at(0.0, GMIN, GMAX);
        for p in 1..=50 {
            let g = c.conductance_at(p as f64, GMIN, GMAX);
            assert!(g > prev);
            prev = g;
        }
    }

    #[test]
    fn test_zero_levels_rejected() {
        assert!(ResponseCurve::new(1.0, 0).is_err());
    }
}
