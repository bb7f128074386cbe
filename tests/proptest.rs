//! Property-based tests for the engine variants.

use proptest::prelude::*;
use tsetlin_edge::{
    Config, DenseTsetlinMachine, SparseTsetlinMachine, StatelessTsetlinMachine, Xorshift32
};

fn small_config() -> Config {
    Config::builder()
        .classes(3)
        .threshold(10)
        .literals(4)
        .clauses(6)
        .specificity(3.0)
        .build()
        .unwrap()
}

/// Flat label buffer from class indices.
fn labels(classes: &[u32]) -> Vec<u8> {
    let mut y = Vec::with_capacity(classes.len() * 4);
    for &c in classes {
        y.extend_from_slice(&c.to_le_bytes());
    }
    y
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Generated floats stay in [0, 1) for any seed.
    #[test]
    fn prng_floats_in_unit_interval(seed in any::<u32>(), draws in 1usize..256) {
        let mut rng = Xorshift32::new(seed);
        for _ in 0..draws {
            let f = rng.next_f32();
            prop_assert!((0.0..1.0).contains(&f));
        }
    }

    /// Counters never leave [min_state, max_state] during training.
    #[test]
    fn dense_counters_stay_bounded(
        seed in any::<u32>(),
        rows in 1usize..8,
        bits in prop::collection::vec(0u8..=1, 32),
        classes in prop::collection::vec(0u32..3, 8)
    ) {
        let mut tm = DenseTsetlinMachine::new(small_config(), seed);
        let x = &bits[..rows * 4];
        let y = labels(&classes[..rows]);

        tm.train(x, &y, rows, 5).unwrap();

        let min = tm.config().min_state;
        let max = tm.config().max_state;
        prop_assert!(tm.ta_state().iter().all(|&s| s >= min && s <= max));
    }

    /// Votes are clipped into [-T, T] for arbitrary inputs and seeds.
    #[test]
    fn votes_always_clipped(
        seed in any::<u32>(),
        input in prop::collection::vec(0u8..=1, 4)
    ) {
        let tm = DenseTsetlinMachine::new(small_config(), seed);
        let t = tm.config().threshold as i32;

        let votes = tm.class_votes(&input).unwrap();
        prop_assert!(votes.iter().all(|&v| v >= -t && v <= t));
    }

    /// Sparse clause lists stay strictly sorted, in range, and above the
    /// pruning floor throughout training.
    #[test]
    fn sparse_lists_sorted_and_pruned(
        seed in any::<u32>(),
        rows in 1usize..8,
        bits in prop::collection::vec(0u8..=1, 32),
        classes in prop::collection::vec(0u32..3, 8)
    ) {
        let mut stm = SparseTsetlinMachine::new(small_config(), seed);
        let x = &bits[..rows * 4];
        let y = labels(&classes[..rows]);

        stm.train(x, &y, rows, 5).unwrap();

        let limit = stm.config().num_literals as u32 * 2;
        for clause in 0..stm.config().num_clauses {
            let nodes = stm.clause_nodes(clause);
            for pair in nodes.windows(2) {
                prop_assert!(pair[0].ta_id < pair[1].ta_id);
            }
            for node in nodes {
                prop_assert!(node.ta_id < limit);
            }
        }
    }

    /// Identical seeds and row order give identical models and predictions.
    #[test]
    fn training_is_deterministic(
        seed in any::<u32>(),
        bits in prop::collection::vec(0u8..=1, 16),
        classes in prop::collection::vec(0u32..3, 4)
    ) {
        let y = labels(&classes);

        let mut a = DenseTsetlinMachine::new(small_config(), seed);
        let mut b = DenseTsetlinMachine::new(small_config(), seed);
        a.train(&bits, &y, 4, 5).unwrap();
        b.train(&bits, &y, 4, 5).unwrap();

        prop_assert_eq!(a.ta_state(), b.ta_state());
        prop_assert_eq!(a.weights(), b.weights());
    }

    /// Predicted class indices stay in range.
    #[test]
    fn predicted_class_in_range(
        seed in any::<u32>(),
        input in prop::collection::vec(0u8..=1, 4)
    ) {
        let tm = DenseTsetlinMachine::new(small_config(), seed);

        let mut y_pred = [0u8; 4];
        tm.predict(&input, &mut y_pred, 1).unwrap();
        prop_assert!(u32::from_le_bytes(y_pred) < 3);
    }

    /// Stateless conversion keeps exactly the automata at or above the mid
    /// state, and its predictions match dense inference.
    #[test]
    fn stateless_conversion_prunes_at_mid(
        seed in any::<u32>(),
        input in prop::collection::vec(0u8..=1, 4)
    ) {
        let tm = DenseTsetlinMachine::new(small_config(), seed);
        let sltm = StatelessTsetlinMachine::from_dense(&tm);

        let mid = tm.config().mid_state();
        let span = tm.config().num_literals * 2;
        for clause in 0..tm.config().num_clauses {
            let expected: Vec<u32> = tm.ta_state()[clause * span..][..span]
                .iter()
                .enumerate()
                .filter(|&(_, &state)| state >= mid)
                .map(|(i, _)| i as u32)
                .collect();
            prop_assert_eq!(sltm.clause_literals(clause), &expected[..]);
        }

        let mut dense_pred = [0u8; 4];
        let mut sltm_pred = [0u8; 4];
        tm.predict(&input, &mut dense_pred, 1).unwrap();
        sltm.predict(&input, &mut sltm_pred, 1).unwrap();
        prop_assert_eq!(dense_pred, sltm_pred);
    }

    /// Dense models survive a byte round trip unchanged.
    #[test]
    fn dense_codec_round_trip(seed in any::<u32>()) {
        let tm = DenseTsetlinMachine::new(small_config(), seed);

        let mut bytes = Vec::new();
        tm.save_to(&mut bytes).unwrap();
        let loaded = DenseTsetlinMachine::load_from(&mut &bytes[..], 1, 4).unwrap();

        prop_assert_eq!(loaded.config(), tm.config());
        prop_assert_eq!(loaded.ta_state(), tm.ta_state());
        prop_assert_eq!(loaded.weights(), tm.weights());
    }

    /// Builder validation mirrors the documented constraints.
    #[test]
    fn config_validation(
        classes in 0usize..4,
        literals in 0usize..4,
        clauses in 0usize..4,
        threshold in 0u32..4,
        s in 0.5f32..5.0
    ) {
        let result = Config::builder()
            .classes(classes)
            .threshold(threshold)
            .literals(literals)
            .clauses(clauses)
            .specificity(s)
            .build();

        let valid = classes > 0 && literals > 0 && clauses > 0 && threshold > 0 && s > 1.0;
        prop_assert_eq!(result.is_ok(), valid);
    }
}
