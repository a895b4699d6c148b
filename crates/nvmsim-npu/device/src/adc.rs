// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Partial-sum quantization between the current domain and the algorithm domain

/// Maps column currents to ADC codes and codes back to algorithmic partial sums.
///
/// Implementations must be monotonic in `current` and deterministic.
pub trait AdcMapping: Send + Sync {
    /// Quantize `current` against a full-scale `current_range`.
    fn current_to_digits(&self, current: f64, current_range: f64) -> i64;

    /// Convert a code difference back to an algorithmic partial sum whose full scale is
    /// `p_sum_max_algorithm`.
    fn digits_to_algorithm(&self, digits: i64, p_sum_max_algorithm: f64) -> f64;
}

/// Uniform truncating ADC with `num_bit_partial_sum` bits.
///
/// Codes are not clipped at full scale: the column and reference paths share the same
/// offset so only their difference is meaningful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAdc {
    pub num_bit_partial_sum: u32,
    /// `max_weight - min_weight`; a full-range current swing equals this weight span
    pub weight_span: f64,
}

impl LinearAdc {
    pub fn new(num_bit_partial_sum: u32, weight_span: f64) -> Self {
        Self {
            num_bit_partial_sum: num_bit_partial_sum.clamp(1, 52),
            weight_span,
        }
    }

    #[inline]
    fn full_scale_code(&self) -> f64 {
        ((1u64 << self.num_bit_partial_sum) - 1) as f64
    }
}

impl AdcMapping for LinearAdc {
    #[inline]
    fn current_to_digits(&self, current: f64, current_range: f64) -> i64 {
        if current_range <= 0.0 || !current.is_finite() {
            return 0;
        }
        (current / current_range * self.full_scale_code()).trunc() as i64
    }

    #[inline]
    fn digits_to_algorithm(&self, digits: i64, p_sum_max_algorithm: f64) -> f64 {
        digits as f64 / self.full_scale_code() * p_sum_max_algorithm * self.weight_span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic() {
        let adc = LinearAdc::new(8, 2.0);
        let mut prev = i64::MIN;
        for i in 0..100 {
            let d = adc.current_to_digits(i as f64 * 1e-7, 1e-5);
            assert!(d >= prev);
            prev = d;
        }
    }

    #[test]
    fn test_zero_range_yields_zero() {
        let adc = LinearAdc::new(8, 2.0);
        assert_eq!(adc.current_to_digits(1e-6, 0.0), 0);
        assert_eq!(adc.current_to_digits(f64::NAN, 1.0), 0);
    }

    #[test]
    fn test_full_scale_roundtrip() {
        let adc = LinearAdc::new(6, 2.0);
        let d = adc.current_to_digits(1.0, 1.0);
        assert_eq!(d, 63);
        assert!((adc.digits_to_algorithm(d, 3.0) - 6.0).abs() < 1e-12);
    }
}
