/* Copyright (c) Meta Platforms, Inc. and affiliates. All rights reserved.
 *
 * This source code is licensed under the Apache 2.0 license found in
 * the LICENSE file in the root directory of this source tree.
 */

use rand::distributions::DistString;
use rand::prelude::IteratorRandom;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::Distribution;
use rand_distr::WeightedIndex;

use crate::ast::Value;
use crate::core_types::Probability;
use crate::types::IntDomain;
use crate::types::PrimitiveKind;

pub fn make_vec<T, F>(n: usize, mut f: F) -> Vec<T>
where
    F: FnMut() -> T,
{
    let mut v = Vec::with_capacity(n);
    for _i in 0..n {
        v.push(f());
    }
    v
}

/// Rolls a percentage knob.
pub fn roll<RngType: rand::Rng>(rng: &mut RngType, probability: Probability) -> bool {
    probability > 0 && rng.gen_range(0..100) < probability
}

pub fn choose_weighted<T: Copy, F: Fn(T) -> u32, RngType: rand::Rng>(
    rng: &mut RngType,
    choices: &[T],
    f: F,
) -> Option<T> {
    let weights = choices.iter().copied().map(f);
    let dist = WeightedIndex::new(weights).ok()?;
    let index = dist.sample(rng);
    Some(choices[index])
}

/// Tries the candidates in a random order and returns the first result that `f` accepts.
pub fn try_in_random_order<T, R, F, RngType>(
    rng: &mut RngType,
    mut candidates: Vec<T>,
    mut f: F,
) -> Option<R>
where
    F: FnMut(&mut RngType, T) -> Option<R>,
    RngType: rand::Rng,
{
    candidates.shuffle(rng);
    for candidate in candidates {
        if let Some(result) = f(rng, candidate) {
            return Some(result);
        }
    }
    None
}

fn choose_integer_in<RngType: rand::Rng>(rng: &mut RngType, lo: i64, hi: i64) -> i64 {
    // Boundaries are where compilers get things wrong, so they get half of the draws.
    if rng.gen::<bool>() {
        let boundaries = [lo, hi, 0, 1, -1, lo.saturating_add(1), hi.saturating_sub(1)];
        boundaries
            .into_iter()
            .filter(|n| lo <= *n && *n <= hi)
            .choose(rng)
            .unwrap_or(lo)
    } else {
        let small_lo = lo.max(-128);
        let small_hi = hi.min(127);
        if small_lo <= small_hi {
            rng.gen_range(small_lo..=small_hi)
        } else {
            rng.gen_range(lo..=hi)
        }
    }
}

pub fn choose_random_float<RngType: rand::Rng>(rng: &mut RngType) -> f32 {
    [
        0.0f32,
        -0.0f32,
        1.0f32,
        -1.0f32,
        0.5f32,
        f32::MAX,
        f32::MIN,
        f32::MIN_POSITIVE,
        f32::EPSILON,
        16777216.0f32,
    ]
    .into_iter()
    .choose(rng)
    .unwrap_or(0.0f32)
}

pub fn choose_random_double<RngType: rand::Rng>(rng: &mut RngType) -> f64 {
    let largest_precise_double_integer = (53f64).exp2();
    [
        0.0f64,
        -0.0f64,
        1.0f64,
        -1.0f64,
        largest_precise_double_integer,
        u32::MAX as f64,
        i32::MAX as f64,
        f64::MAX,
        f64::MIN_POSITIVE,
        f64::EPSILON,
    ]
    .into_iter()
    .choose(rng)
    .unwrap_or(0.0f64)
}

pub fn choose_random_char<RngType: rand::Rng>(rng: &mut RngType) -> u16 {
    if rng.gen::<bool>() {
        rng.gen_range(b'0' as u16..=b'z' as u16)
    } else {
        [0u16, 1, 9, 10, 39, 92, 127, 255, 0xd800, u16::MAX]
            .into_iter()
            .choose(rng)
            .unwrap_or(0)
    }
}

pub fn choose_random_string<RngType: rand::Rng>(rng: &mut RngType) -> String {
    let length = rand_distr::Geometric::new(0.2)
        .map(|d| d.sample(rng))
        .unwrap_or(0)
        .min(32);
    // Alphanumeric only: escapes and exotic code points would only test javac's lexer.
    rand_distr::Alphanumeric.sample_string(rng, length as usize)
}

pub fn choose_random_value<RngType: rand::Rng>(rng: &mut RngType, kind: PrimitiveKind) -> Value {
    match kind {
        PrimitiveKind::Boolean => Value::Boolean(rng.gen::<bool>()),
        PrimitiveKind::Byte => {
            Value::Byte(choose_integer_in(rng, i8::MIN as i64, i8::MAX as i64) as i8)
        }
        PrimitiveKind::Short => {
            Value::Short(choose_integer_in(rng, i16::MIN as i64, i16::MAX as i64) as i16)
        }
        PrimitiveKind::Char => Value::Char(choose_random_char(rng)),
        PrimitiveKind::Int => {
            Value::Int(choose_integer_in(rng, i32::MIN as i64, i32::MAX as i64) as i32)
        }
        PrimitiveKind::Long => Value::Long(choose_integer_in(rng, i64::MIN, i64::MAX)),
        PrimitiveKind::Float => Value::Float(choose_random_float(rng)),
        PrimitiveKind::Double => Value::Double(choose_random_double(rng)),
    }
}

/// Picks a value of the domain, or None if the domain is empty.
pub fn choose_in_domain<RngType: rand::Rng>(rng: &mut RngType, domain: &IntDomain) -> Option<i64> {
    match domain {
        IntDomain::Set(values) => values.iter().copied().choose(rng),
        IntDomain::Range(lo, hi) if lo <= hi => Some(choose_integer_in(rng, *lo, *hi)),
        IntDomain::Range(_, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_try_in_random_order_finds_the_only_match() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let found = try_in_random_order(&mut rng, (0..10).collect(), |_, n: i32| {
                (n == 6).then_some(n * 2)
            });
            assert_eq!(found, Some(12));
        }
        let none: Option<i32> = try_in_random_order(&mut rng, vec![1, 2, 3], |_, _| None);
        assert_eq!(none, None);
    }

    #[test]
    fn test_values_stay_in_domain() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let set = IntDomain::set([-9, 2, 10, 12, 100]);
        let range = IntDomain::Range(1, 5);
        for _ in 0..200 {
            let n = choose_in_domain(&mut rng, &set).unwrap();
            assert!(set.contains_value(n));
            let m = choose_in_domain(&mut rng, &range).unwrap();
            assert!((1..=5).contains(&m));
        }
        assert_eq!(choose_in_domain(&mut rng, &IntDomain::Range(3, 2)), None);
    }

    #[test]
    fn test_roll_extremes() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(!roll(&mut rng, 0));
            assert!(roll(&mut rng, 100));
        }
    }

    #[test]
    fn test_choose_weighted_respects_zero_weights() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            let choice = choose_weighted(&mut rng, &[1, 2, 3], |n| if n == 2 { 1 } else { 0 });
            assert_eq!(choice, Some(2));
        }
        assert_eq!(choose_weighted(&mut rng, &[1, 2], |_| 0), None);
    }
}
