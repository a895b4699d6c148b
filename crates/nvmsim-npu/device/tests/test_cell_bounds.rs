// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Weight-bound invariant across every cell technology and arbitrary write sequences.

use std::sync::Arc;

use nvmsim_npu_device::{
    AnalogDeviceParams, CellTemplate, DeviceCell, DigitalDeviceParams, DualTransistorParams,
    WeightBounds,
};
use proptest::prelude::*;

fn templates() -> Vec<CellTemplate> {
    let analog = Arc::new(AnalogDeviceParams::default());
    vec![
        CellTemplate::Digital(Arc::new(DigitalDeviceParams::default())),
        CellTemplate::Analog(Arc::clone(&analog)),
        CellTemplate::DualTransistor {
            slow: Arc::clone(&analog),
            dual: Arc::new(DualTransistorParams {
                fast_num_level: 8,
                ..DualTransistorParams::default()
            }),
        },
        CellTemplate::Hybrid {
            msb: Arc::clone(&analog),
            lsb: analog,
            significance: 0.5,
        },
    ]
}

fn in_bounds(cell: &DeviceCell, bounds: &WeightBounds) -> bool {
    let w = cell.conductance_to_weight(bounds);
    w >= bounds.min - 1e-12 && w <= bounds.max + 1e-12
}

proptest! {
    #[test]
    fn prop_pulses_keep_weight_in_bounds(
        init in -1.0f64..=1.0,
        trains in proptest::collection::vec(-300i32..=300, 1..20),
    ) {
        let bounds = WeightBounds::default();
        for template in templates() {
            let mut cell = template.build().unwrap();
            cell.initialize_weight(init, &bounds);
            for &n in &trains {
                cell.apply_pulses(n);
                prop_assert!(in_bounds(&cell, &bounds), "{:?} after {} pulses", template.kind(), n);
            }
        }
    }

    #[test]
    fn prop_deltas_keep_weight_in_bounds(
        init in -1.0f64..=1.0,
        deltas in proptest::collection::vec(-3.0f64..=3.0, 1..20),
    ) {
        let bounds = WeightBounds::default();
        for template in templates() {
            let mut cell = template.build().unwrap();
            cell.initialize_weight(init, &bounds);
            for &d in &deltas {
                let w = cell.conductance_to_weight(&bounds);
                let realized = cell.write_delta(d, w + d, &bounds, true);
                prop_assert!(realized >= bounds.min - 1e-12 && realized <= bounds.max + 1e-12);
                cell.transfer_weight(0.0);
                prop_assert!(in_bounds(&cell, &bounds));
            }
        }
    }

    #[test]
    fn prop_pulse_direction_matches_sign(init in -0.9f64..=0.9, n in 1i32..=5) {
        let bounds = WeightBounds::default();
        let template = CellTemplate::Analog(Arc::new(AnalogDeviceParams::default()));
        let mut cell = template.build().unwrap();
        cell.initialize_weight(init, &bounds);
        let w0 = cell.conductance_to_weight(&bounds);
        cell.apply_pulses(n);
        prop_assert!(cell.conductance_to_weight(&bounds) > w0);
        let w1 = cell.conductance_to_weight(&bounds);
        cell.apply_pulses(-n);
        prop_assert!(cell.conductance_to_weight(&bounds) < w1);
    }
}

#[test]
fn test_transfer_keeps_num_pulse_fresh() {
    let bounds = WeightBounds::default();
    for template in templates() {
        let mut cell = template.build().unwrap();
        cell.initialize_weight(0.0, &bounds);
        cell.apply_pulses(3);
        cell.apply_pulses(0);
        assert_eq!(cell.num_pulse(), 0, "{:?}", template.kind());
    }
}
