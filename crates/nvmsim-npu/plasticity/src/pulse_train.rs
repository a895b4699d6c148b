// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*
 * Copyright 2025 Neuraville Inc.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 */

//! Stochastic pulse trains
//!
//! Each operand element (an input activation or a back-propagated delta) is encoded as a
//! sign plus two Bernoulli bitstreams, one per write phase. A synapse receives a pulse
//! whenever its row and column streams fire in the same slot, which approximates the
//! product of the two operands without a multiplier.
//!
//! Streams are bit-packed into `u64` words so a coincidence count is an AND plus
//! `count_ones` per word.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xxhash_rust::xxh64::xxh64;

const WORD_BITS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseTrain {
    words: Vec<u64>,
    len: usize,
}

impl PulseTrain {
    pub fn silent(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Draw `len` slots, each firing with `probability`.
    ///
    /// A zero probability draws nothing from `rng`.
    pub fn bernoulli<R: Rng>(probability: f64, len: usize, rng: &mut R) -> Self {
        let mut train = Self::silent(len);
        if probability <= 0.0 {
            return train;
        }
        let p = probability.min(1.0);
        for slot in 0..len {
            if rng.gen_bool(p) {
                train.words[slot / WORD_BITS] |= 1u64 << (slot % WORD_BITS);
            }
        }
        train
    }

    pub fn from_bits(bits: &[bool]) -> Self {
        let mut train = Self::silent(bits.len());
        for (slot, &bit) in bits.iter().enumerate() {
            if bit {
                train.words[slot / WORD_BITS] |= 1u64 << (slot % WORD_BITS);
            }
        }
        train
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Slots in which both trains fire.
    #[inline]
    pub fn coincidences(&self, other: &PulseTrain) -> u32 {
        debug_assert_eq!(self.len, other.len, "pulse trains must have equal length");
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones())
            .sum()
    }
}

/// Which operand vector a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Input = 0,
    Delta = 1,
}

/// Identifies one element's stream pair so every element draws from its own sub-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub seed: u64,
    pub epoch: u32,
    pub step: u64,
    pub layer: u8,
    pub operand: Operand,
    pub unit: u32,
}

impl StreamKey {
    pub fn stream_seed(&self) -> u64 {
        let mut buf = [0u8; 18];
        buf[0..4].copy_from_slice(&self.epoch.to_le_bytes());
        buf[4..12].copy_from_slice(&self.step.to_le_bytes());
        buf[12] = self.layer;
        buf[13] = self.operand as u8;
        buf[14..18].copy_from_slice(&self.unit.to_le_bytes());
        xxh64(&buf, self.seed)
    }

    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.stream_seed())
    }
}

/// `C = sqrt(alpha / 2^(epoch / 10) / (stream_length * probability_scale))`, integer
/// `epoch / 10`.
///
/// # Example
/// ```
/// use nvmsim_npu_plasticity::pulse_train::stochastic_constant;
///
/// let c = stochastic_constant(0.4, 0, 40, 0.05);
/// assert!((c - 0.2f64.sqrt()).abs() < 1e-12);
/// assert!(stochastic_constant(0.4, 10, 40, 0.05) < c);
/// ```
pub fn stochastic_constant(alpha: f64, epoch: u32, stream_length: usize, probability_scale: f64) -> f64 {
    let decay = 2f64.powi((epoch / 10) as i32);
    (alpha / decay / (stream_length as f64 * probability_scale)).sqrt()
}

/// Firing probability `C * |value|`, clamped to `[0, 1]`.
///
/// Returns the probability and whether clamping was needed. A raw probability above one
/// means `C` is mis-scaled for this data and fails fast in debug builds.
#[inline]
pub fn firing_probability(scale: f64, value: f64) -> (f64, bool) {
    let raw = scale * value.abs();
    debug_assert!(
        raw.is_finite() && raw <= 1.0 + 1e-9,
        "firing probability {raw} out of range (scale {scale}, value {value})"
    );
    if raw.is_finite() && (0.0..=1.0).contains(&raw) {
        (raw, false)
    } else {
        (if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 }, true)
    }
}

/// Sign bit plus the two phase streams of one operand element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOperand {
    pub positive: bool,
    pub ltp: PulseTrain,
    pub ltd: PulseTrain,
}

impl EncodedOperand {
    /// Encode `value`; the flag reports a clamped probability.
    pub fn encode(value: f64, scale: f64, stream_length: usize, key: &StreamKey) -> (Self, bool) {
        let (p, clamped) = firing_probability(scale, value);
        let mut rng = key.rng();
        let ltp = PulseTrain::bernoulli(p, stream_length, &mut rng);
        let ltd = PulseTrain::bernoulli(p, stream_length, &mut rng);
        (
            Self {
                positive: value > 0.0,
                ltp,
                ltd,
            },
            clamped,
        )
    }
}

/// Net write pulses for the synapse at the crossing of `input` and `delta`.
///
/// Opposite signs call for potentiation (the gradient is negative), so LTP-phase
/// coincidences count up. Equal signs count LTD-phase coincidences down.
#[inline]
pub fn net_pulses(input: &EncodedOperand, delta: &EncodedOperand) -> i32 {
    if input.positive ^ delta.positive {
        input.ltp.coincidences(&delta.ltp) as i32
    } else {
        -(input.ltd.coincidences(&delta.ltd) as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(unit: u32) -> StreamKey {
        StreamKey {
            seed: 7,
            epoch: 0,
            step: 3,
            layer: 1,
            operand: Operand::Input,
            unit,
        }
    }

    #[test]
    fn test_coincidences_count_overlap() {
        let a = PulseTrain::from_bits(&[true, true, false, true, false]);
        let b = PulseTrain::from_bits(&[true, false, false, true, true]);
        assert_eq!(a.coincidences(&b), 2);
        assert_eq!(a.count_ones(), 3);
    }

    #[test]
    fn test_multi_word_train() {
        let bits: Vec<bool> = (0..130).map(|i| i % 2 == 0).collect();
        let t = PulseTrain::from_bits(&bits);
        assert_eq!(t.count_ones(), 65);
        assert_eq!(t.coincidences(&t), 65);
    }

    #[test]
    fn test_certain_and_impossible_streams() {
        let mut rng = key(0).rng();
        assert_eq!(PulseTrain::bernoulli(1.0, 40, &mut rng).count_ones(), 40);
        assert_eq!(PulseTrain::bernoulli(0.0, 40, &mut rng).count_ones(), 0);
    }

    #[test]
    fn test_stream_seed_depends_on_every_field() {
        let base = key(0);
        let seeds = [
            base.stream_seed(),
            key(1).stream_seed(),
            StreamKey { seed: 8, ..base }.stream_seed(),
            StreamKey { epoch: 1, ..base }.stream_seed(),
            StreamKey { step: 4, ..base }.stream_seed(),
            StreamKey { layer: 2, ..base }.stream_seed(),
            StreamKey {
                operand: Operand::Delta,
                ..base
            }
            .stream_seed(),
        ];
        for i in 0..seeds.len() {
            for j in (i + 1)..seeds.len() {
                assert_ne!(seeds[i], seeds[j]);
            }
        }
    }

    #[test]
    fn test_net_pulse_signs() {
        let on = |positive| EncodedOperand {
            positive,
            ltp: PulseTrain::from_bits(&[true; 4]),
            ltd: PulseTrain::from_bits(&[true, true, false, false]),
        };
        // x > 0, delta < 0: gradient negative, weight goes up
        assert_eq!(net_pulses(&on(true), &on(false)), 4);
        // x > 0, delta > 0: weight goes down
        assert_eq!(net_pulses(&on(true), &on(true)), -2);
    }

    #[test]
    fn test_expected_pulse_count() {
        // E[coincidences] = L * p_x * p_d
        let (x, _) = EncodedOperand::encode(0.5, 1.0, 4096, &key(0));
        let (d, _) = EncodedOperand::encode(
            -0.5,
            1.0,
            4096,
            &StreamKey {
                operand: Operand::Delta,
                ..key(0)
            },
        );
        let n = net_pulses(&x, &d) as f64;
        assert!((n - 1024.0).abs() < 120.0, "n = {n}");
    }

    #[test]
    fn test_probability_within_range_is_not_clamped() {
        assert_eq!(firing_probability(0.5, -1.0), (0.5, false));
        assert_eq!(firing_probability(2.0, 0.0), (0.0, false));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "firing probability")]
    fn test_probability_above_one_fails_fast() {
        firing_probability(2.0, 1.0);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_probability_above_one_is_clamped() {
        assert_eq!(firing_probability(2.0, 1.0), (1.0, true));
    }
}
