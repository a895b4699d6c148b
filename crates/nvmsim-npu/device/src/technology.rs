// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Process technology constants
//!
//! A plain value object. Calibration of these numbers is outside the simulator; the
//! defaults describe a generic 32 nm node.

use crate::error::{DeviceError, Result};

/// Technology node description used to derive wire parasitics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Technology {
    /// Supply voltage (V)
    pub vdd: f64,
    /// Feature size F (m)
    pub feature_size: f64,
    /// Interconnect capacitance per metre (F/m)
    pub wire_cap_per_meter: f64,
    /// Interconnect resistance per metre (Ohm/m)
    pub wire_resistance_per_meter: f64,
    /// Access-transistor gate capacitance per cell (F)
    pub gate_cap_per_cell: f64,
}

impl Default for Technology {
    fn default() -> Self {
        Self {
            vdd: 0.9,
            feature_size: 32e-9,
            wire_cap_per_meter: 0.2e-15 / 1e-6,
            wire_resistance_per_meter: 1.0e7,
            gate_cap_per_cell: 1.0e-16,
        }
    }
}

impl Technology {
    pub fn validate(&self) -> Result<()> {
        let checks: [(&'static str, f64); 5] = [
            ("vdd", self.vdd),
            ("feature_size", self.feature_size),
            ("wire_cap_per_meter", self.wire_cap_per_meter),
            ("wire_resistance_per_meter", self.wire_resistance_per_meter),
            ("gate_cap_per_cell", self.gate_cap_per_cell),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(DeviceError::InvalidParameter {
                    field,
                    reason: format!("must be finite and non-negative, got {}", value),
                });
            }
        }
        if self.feature_size == 0.0 {
            return Err(DeviceError::InvalidParameter {
                field: "feature_size",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Cell pitch (m) for a cell that is `width_in_feature` features wide.
    #[inline]
    pub fn cell_pitch(&self, width_in_feature: f64) -> f64 {
        self.feature_size * width_in_feature
    }
}
