//! Type I and Type II feedback rules over dense clause storage.
//!
//! Each rule acts on one (clause, class) pair: `ta_row` is the clause's
//! `2 * num_literals` counters and `weight` its vote weight for the class.
//! An automaton at literal index `i` covers literal `i >> 1`; odd indices
//! are negated literals. It "votes correctly" when `(i & 1) != x[i >> 1]`.

use crate::{
    automaton::{action, penalize, reward},
    config::Config,
    prng::Xorshift32
};

/// # Overview
///
/// Type I-a: the clause fired and voted correctly.
///
/// The weight magnitude grows by one, saturating at the `i16` limits.
/// Correctly-voting automata are rewarded with probability `(s-1)/s`, or
/// unconditionally (without consulting the generator) when boost is
/// enabled. The rest are punished with probability `1/s`.
pub(crate) fn type_ia(
    config: &Config,
    ta_row: &mut [i8],
    weight: &mut i16,
    x: &[u8],
    rng: &mut Xorshift32
) {
    *weight = if *weight >= 0 {
        weight.saturating_add(1)
    } else {
        weight.saturating_sub(1)
    };

    for (i, state) in ta_row.iter_mut().enumerate() {
        if (i & 1) as u8 != x[i >> 1] {
            if config.boost_true_positive_feedback || rng.next_f32() <= config.s_m1_inv() {
                *state = reward(*state, config.max_state);
            }
        } else if rng.next_f32() <= config.s_inv() {
            *state = penalize(*state, config.min_state);
        }
    }
}

/// # Overview
///
/// Type I-b: the clause voted correctly but did not fire.
///
/// Every automaton is punished with probability `1/s`, pushing the clause
/// toward exclusion so it can specialize elsewhere.
pub(crate) fn type_ib(config: &Config, ta_row: &mut [i8], rng: &mut Xorshift32) {
    for state in ta_row.iter_mut() {
        if rng.next_f32() <= config.s_inv() {
            *state = penalize(*state, config.min_state);
        }
    }
}

/// # Overview
///
/// Type II: the clause fired but voted incorrectly.
///
/// The weight moves one step toward zero. Every excluded automaton whose
/// inclusion would have deactivated the clause (`(i & 1) == x[i >> 1]`) is
/// raised by one, deterministically.
pub(crate) fn type_ii(config: &Config, ta_row: &mut [i8], weight: &mut i16, x: &[u8]) {
    *weight += if *weight >= 0 { -1 } else { 1 };

    let mid = config.mid_state();
    for (i, state) in ta_row.iter_mut().enumerate() {
        if !action(*state, mid) && (i & 1) as u8 == x[i >> 1] {
            *state = reward(*state, config.max_state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::builder()
            .classes(1)
            .threshold(10)
            .literals(3)
            .clauses(1)
            .specificity(3.0)
            .build()
            .unwrap()
    }

    #[test]
    fn type_ia_strengthens_weight_away_from_zero() {
        let config = config();
        let mut rng = Xorshift32::new(42);
        let mut row = [0i8; 6];

        let mut w = 3i16;
        type_ia(&config, &mut row, &mut w, &[1, 0, 1], &mut rng);
        assert_eq!(w, 4);

        let mut w = -3i16;
        type_ia(&config, &mut row, &mut w, &[1, 0, 1], &mut rng);
        assert_eq!(w, -4);

        let mut w = i16::MAX;
        type_ia(&config, &mut row, &mut w, &[1, 0, 1], &mut rng);
        assert_eq!(w, i16::MAX);
    }

    #[test]
    fn type_ia_drives_matching_literals_in() {
        let config = config();
        let mut rng = Xorshift32::new(42);
        let mut row = [0i8; 6];
        let mut w = 1i16;

        for _ in 0..1000 {
            type_ia(&config, &mut row, &mut w, &[1, 0, 1], &mut rng);
        }

        // pattern 1,0,1: positive literal 0, negated literal 1, positive
        // literal 2 vote correctly and end up included
        assert_eq!(row[0], config.max_state);
        assert_eq!(row[3], config.max_state);
        assert_eq!(row[4], config.max_state);
        assert_eq!(row[1], config.min_state);
        assert_eq!(row[2], config.min_state);
        assert_eq!(row[5], config.min_state);
    }

    #[test]
    fn type_ia_boost_rewards_unconditionally() {
        let mut config = config();
        config.boost_true_positive_feedback = true;
        let mut rng = Xorshift32::new(42);
        let mut row = [0i8; 6];
        let mut w = 1i16;

        type_ia(&config, &mut row, &mut w, &[1, 0, 1], &mut rng);

        // every correctly-voting automaton stepped exactly once
        assert_eq!(row[0], 1);
        assert_eq!(row[3], 1);
        assert_eq!(row[4], 1);
    }

    #[test]
    fn type_ib_only_weakens() {
        let config = config();
        let mut rng = Xorshift32::new(42);
        let mut row = [5i8; 6];

        for _ in 0..1000 {
            type_ib(&config, &mut row, &mut rng);
        }

        assert!(row.iter().all(|&s| s == config.min_state));
    }

    #[test]
    fn type_ii_raises_blocking_literals() {
        let config = config();
        let mut row = [-1i8; 6];
        let mut w = 1i16;

        type_ii(&config, &mut row, &mut w, &[1, 0, 1]);

        assert_eq!(w, 0);
        // literals that would block x = 1,0,1: negated 0, positive 1,
        // negated 2
        assert_eq!(row, [-1, 0, 0, -1, -1, 0]);
    }

    #[test]
    fn type_ii_skips_included_automata() {
        let config = config();
        let mut row = [0i8; 6];
        let mut w = 0i16;

        type_ii(&config, &mut row, &mut w, &[1, 0, 1]);

        // all automata already included, only the weight moves
        assert_eq!(w, -1);
        assert_eq!(row, [0i8; 6]);
    }
}
