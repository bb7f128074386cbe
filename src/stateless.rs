//! Stateless Tsetlin Machine: inference-only literal lists.
//!
//! The smallest storage variant keeps only the literal indices a trained
//! dense model includes, one sorted list per clause. Counters are gone, so
//! the model cannot be trained further.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use smallvec::SmallVec;

use crate::{
    automaton::{action, clip},
    config::Config,
    dense::DenseTsetlinMachine,
    error::Result,
    model::{Inference, check_len, evaluate_with},
    strategy::{self, LabelEq, OutputActivation}
};

/// Inline literal capacity per clause.
const INLINE_LITERALS: usize = 32;

pub(crate) type LiteralList = SmallVec<[u32; INLINE_LITERALS]>;

/// # Overview
///
/// Inference-only Tsetlin Machine over bare literal index lists.
///
/// There is no constructor from scratch: instances come from a trained
/// dense model, either in memory via [`from_dense`](Self::from_dense) or
/// from a dense model file via `load_dense`. Every listed literal is by
/// definition included, and an empty clause never fires.
#[derive(Debug, Clone)]
pub struct StatelessTsetlinMachine {
    pub(crate) config:  Config,
    pub(crate) clauses: Vec<LiteralList>,
    pub(crate) weights: Vec<i16>,
    pub(crate) output_activation: OutputActivation,
    pub(crate) label_eq:          LabelEq
}

impl StatelessTsetlinMachine {
    pub(crate) fn from_parts(
        config: Config,
        clauses: Vec<LiteralList>,
        weights: Vec<i16>
    ) -> Self {
        debug_assert_eq!(clauses.len(), config.num_clauses);
        debug_assert_eq!(weights.len(), config.num_clauses * config.num_classes);
        Self {
            config,
            clauses,
            weights,
            output_activation: OutputActivation::ClassIndex,
            label_eq: strategy::bytes_eq
        }
    }

    /// # Overview
    ///
    /// Builds a stateless machine from a trained dense one, keeping the
    /// indices of included automata and discarding their counters.
    #[must_use]
    pub fn from_dense(dense: &DenseTsetlinMachine) -> Self {
        let config = *dense.config();
        let mid = config.mid_state();
        let span = config.num_literals * 2;

        let clauses = dense
            .ta_state()
            .chunks_exact(span)
            .map(|ta_row| {
                ta_row
                    .iter()
                    .enumerate()
                    .filter(|&(_, &state)| action(state, mid))
                    .map(|(i, _)| i as u32)
                    .collect()
            })
            .collect();

        Self::from_parts(config, clauses, dense.weights().to_vec())
    }

    /// Returns the engine's configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a clause's sorted literal indices.
    #[inline]
    #[must_use]
    pub fn clause_literals(&self, clause: usize) -> &[u32] {
        &self.clauses[clause]
    }

    /// Returns the flat `(num_clauses, num_classes)` weight array.
    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[i16] {
        &self.weights
    }

    /// Total stored literal indices across all clauses.
    #[must_use]
    pub fn total_literals(&self) -> usize {
        self.clauses.iter().map(SmallVec::len).sum()
    }

    /// # Overview
    ///
    /// Replaces the output activation strategy.
    ///
    /// # Panics
    ///
    /// Panics if the strategy's label layout contract disagrees with the
    /// configuration.
    pub fn set_output_activation(&mut self, activation: OutputActivation) {
        activation.check_layout(&self.config);
        self.output_activation = activation;
    }

    /// Replaces the label equality predicate used by `evaluate`.
    pub fn set_label_eq(&mut self, eq: LabelEq) {
        self.label_eq = eq;
    }

    /// Every listed literal must match the input; empty clauses never
    /// fire.
    pub(crate) fn clause_outputs_into(&self, x_row: &[u8], out: &mut [bool]) {
        for (clause, fires) in out.iter_mut().enumerate() {
            let list = &self.clauses[clause];
            let mut active = !list.is_empty();

            for &ta_id in list {
                if ta_id & 1 == u32::from(x_row[(ta_id >> 1) as usize]) {
                    active = false;
                    break;
                }
            }

            *fires = active;
        }
    }

    /// Sums firing clauses' weights per class, then clips to `[-T, T]`.
    pub(crate) fn sum_votes_into(&self, clause_output: &[bool], votes: &mut [i32]) {
        votes.fill(0);

        for (clause, &fires) in clause_output.iter().enumerate() {
            if !fires {
                continue;
            }
            let row = &self.weights[clause * self.config.num_classes..][..self.config.num_classes];
            for (vote, &w) in votes.iter_mut().zip(row) {
                *vote += i32::from(w);
            }
        }

        let t = self.config.threshold as i32;
        for vote in votes.iter_mut() {
            *vote = clip(*vote, t);
        }
    }

    /// # Overview
    ///
    /// Returns the clipped per-class votes for one input row.
    pub fn class_votes(&self, x_row: &[u8]) -> Result<Vec<i32>> {
        check_len(self.config.num_literals, x_row.len())?;

        let mut clause_output = vec![false; self.config.num_clauses];
        let mut votes = vec![0i32; self.config.num_classes];
        self.clause_outputs_into(x_row, &mut clause_output);
        self.sum_votes_into(&clause_output, &mut votes);
        Ok(votes)
    }

    /// # Overview
    ///
    /// Writes one predicted label row per input row into `y_pred`.
    pub fn predict(&self, x: &[u8], y_pred: &mut [u8], rows: usize) -> Result<()> {
        check_len(rows * self.config.num_literals, x.len())?;
        check_len(rows * self.config.label_bytes(), y_pred.len())?;

        let mut clause_output = vec![false; self.config.num_clauses];
        let mut votes = vec![0i32; self.config.num_classes];

        for (x_row, y_row) in x
            .chunks_exact(self.config.num_literals)
            .zip(y_pred.chunks_exact_mut(self.config.label_bytes()))
        {
            self.clause_outputs_into(x_row, &mut clause_output);
            self.sum_votes_into(&clause_output, &mut votes);
            self.output_activation.apply(&self.config, &votes, y_row);
        }
        Ok(())
    }

    /// # Overview
    ///
    /// Predicts and returns the fraction of rows matching the ground truth.
    pub fn evaluate(&self, x: &[u8], y: &[u8], rows: usize) -> Result<f32> {
        evaluate_with(
            &self.config,
            self.label_eq,
            |x, y_pred, rows| self.predict(x, y_pred, rows),
            x,
            y,
            rows
        )
    }
}

impl Inference for StatelessTsetlinMachine {
    fn config(&self) -> &Config {
        StatelessTsetlinMachine::config(self)
    }

    fn predict(&self, x: &[u8], y_pred: &mut [u8], rows: usize) -> Result<()> {
        StatelessTsetlinMachine::predict(self, x, y_pred, rows)
    }

    fn evaluate(&self, x: &[u8], y: &[u8], rows: usize) -> Result<f32> {
        StatelessTsetlinMachine::evaluate(self, x, y, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense() -> DenseTsetlinMachine {
        let config = Config::builder()
            .classes(2)
            .threshold(10)
            .literals(3)
            .clauses(2)
            .build()
            .unwrap();
        DenseTsetlinMachine::new(config, 42)
    }

    #[test]
    fn from_dense_keeps_included_indices_only() {
        let mut dense = dense();
        dense.ta_state_mut().fill(-5);
        dense.ta_state_mut()[1] = 3;
        dense.ta_state_mut()[4] = 0;
        dense.ta_state_mut()[9] = 90;

        let sltm = StatelessTsetlinMachine::from_dense(&dense);

        assert_eq!(sltm.clause_literals(0), [1, 4]);
        assert_eq!(sltm.clause_literals(1), [3]);
        assert_eq!(sltm.total_literals(), 3);
        assert_eq!(sltm.weights(), dense.weights());
    }

    #[test]
    fn empty_clause_never_fires() {
        let mut dense = dense();
        let min_state = dense.config().min_state;
        dense.ta_state_mut().fill(min_state);
        let sltm = StatelessTsetlinMachine::from_dense(&dense);

        let mut out = [true; 2];
        sltm.clause_outputs_into(&[1, 0, 1], &mut out);
        assert!(out.iter().all(|&fires| !fires));
    }

    #[test]
    fn listed_literals_gate_the_clause() {
        let mut dense = dense();
        let min = dense.config().min_state;
        let max = dense.config().max_state;
        dense.ta_state_mut().fill(min);
        // clause 0: literal 0 set, literal 1 clear
        dense.ta_state_mut()[0] = max;
        dense.ta_state_mut()[3] = max;
        let sltm = StatelessTsetlinMachine::from_dense(&dense);

        let mut out = [false; 2];
        sltm.clause_outputs_into(&[1, 0, 0], &mut out);
        assert!(out[0]);
        sltm.clause_outputs_into(&[1, 1, 0], &mut out);
        assert!(!out[0]);
        sltm.clause_outputs_into(&[0, 0, 0], &mut out);
        assert!(!out[0]);
    }

    #[test]
    fn predictions_match_dense_inference() {
        let mut dense = dense();
        let x = [1, 0, 1, 0, 1, 0, 1, 1, 0, 0, 0, 1];
        let mut y = [0u8; 16];
        for (row, label) in [0u32, 1, 0, 1].iter().enumerate() {
            y[row * 4..][..4].copy_from_slice(&label.to_le_bytes());
        }
        dense.train(&x, &y, 4, 20).unwrap();

        let sltm = StatelessTsetlinMachine::from_dense(&dense);

        let mut dense_pred = [0u8; 16];
        let mut sltm_pred = [0u8; 16];
        dense.predict(&x, &mut dense_pred, 4).unwrap();
        sltm.predict(&x, &mut sltm_pred, 4).unwrap();
        assert_eq!(dense_pred, sltm_pred);
    }
}
