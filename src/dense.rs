//! Dense Tsetlin Machine: flat counter storage, training and inference.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use log::debug;

use crate::{
    automaton::{action, clip},
    config::Config,
    error::Result,
    feedback::{type_ia, type_ib, type_ii},
    model::{Inference, check_len, evaluate_with},
    prng::Xorshift32,
    sparse::SparseTsetlinMachine,
    stateless::StatelessTsetlinMachine,
    strategy::{
        self, LabelEq, LabelFeedback, OutputActivation, RowState, weighted_class_pick
    }
};

/// # Overview
///
/// Trainable Tsetlin Machine over a flat automaton array.
///
/// Counters live in a flat `(num_clauses, num_literals, 2)` array of `i8`;
/// weights in a flat `(num_clauses, num_classes)` array of `i16`. The
/// automaton at index `2l` controls literal `l`, the one at `2l + 1` its
/// negation.
///
/// # Examples
///
/// ```
/// use tsetlin_edge::{Config, DenseTsetlinMachine};
///
/// let config = Config::builder()
///     .classes(2)
///     .threshold(10)
///     .literals(2)
///     .clauses(20)
///     .build()
///     .unwrap();
///
/// let mut tm = DenseTsetlinMachine::new(config, 42);
///
/// // four rows of two features, labelled 0, 1, 1, 0
/// let x = [0, 0, 0, 1, 1, 0, 1, 1];
/// let mut y = [0u8; 16];
/// for (row, label) in [0u32, 1, 1, 0].iter().enumerate() {
///     y[row * 4..][..4].copy_from_slice(&label.to_le_bytes());
/// }
///
/// tm.train(&x, &y, 4, 50).unwrap();
///
/// let mut y_pred = [0u8; 16];
/// tm.predict(&x, &mut y_pred, 4).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DenseTsetlinMachine {
    pub(crate) config:   Config,
    pub(crate) ta_state: Vec<i8>,
    pub(crate) weights:  Vec<i16>,
    pub(crate) rng:      Xorshift32,
    pub(crate) output_activation: OutputActivation,
    pub(crate) label_feedback:    LabelFeedback<DenseTsetlinMachine>,
    pub(crate) label_eq:          LabelEq
}

impl DenseTsetlinMachine {
    /// # Overview
    ///
    /// Creates a machine with randomly initialized clauses and weights.
    ///
    /// Each literal pair starts with one counter at the mid state (just
    /// included) and the other one step below, the side chosen by a fair
    /// coin. Weights start at +1 or -1, also by fair coin.
    pub fn new(config: Config, seed: u32) -> Self {
        let mut rng = Xorshift32::new(seed);
        let mid = config.mid_state();

        let mut ta_state = vec![0i8; config.num_clauses * config.num_literals * 2];
        for pair in ta_state.chunks_exact_mut(2) {
            if rng.next_f32() <= 0.5 {
                pair[0] = mid - 1;
                pair[1] = mid;
            } else {
                pair[0] = mid;
                pair[1] = mid - 1;
            }
        }

        let mut weights = vec![0i16; config.num_clauses * config.num_classes];
        for w in weights.iter_mut() {
            *w = if rng.next_f32() <= 0.5 { -1 } else { 1 };
        }

        Self::from_parts(config, ta_state, weights, rng)
    }

    pub(crate) fn from_parts(
        config: Config,
        ta_state: Vec<i8>,
        weights: Vec<i16>,
        rng: Xorshift32
    ) -> Self {
        debug_assert_eq!(ta_state.len(), config.num_clauses * config.num_literals * 2);
        debug_assert_eq!(weights.len(), config.num_clauses * config.num_classes);
        Self {
            config,
            ta_state,
            weights,
            rng,
            output_activation: OutputActivation::ClassIndex,
            label_feedback: LabelFeedback::ClassIndex,
            label_eq: strategy::bytes_eq
        }
    }

    /// Returns the engine's configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the flat `(num_clauses, num_literals, 2)` counter array.
    #[inline]
    #[must_use]
    pub fn ta_state(&self) -> &[i8] {
        &self.ta_state
    }

    /// Returns mutable access to the counter array.
    #[inline]
    pub fn ta_state_mut(&mut self) -> &mut [i8] {
        &mut self.ta_state
    }

    /// Returns the flat `(num_clauses, num_classes)` weight array.
    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[i16] {
        &self.weights
    }

    /// Returns mutable access to the weight array.
    #[inline]
    pub fn weights_mut(&mut self) -> &mut [i16] {
        &mut self.weights
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

    /// # Overview
    ///
    /// Replaces the label feedback strategy used by `train`.
    ///
    /// # Panics
    ///
    /// Panics if the strategy's label layout contract disagrees with the
    /// configuration.
    pub fn set_label_feedback(&mut self, feedback: LabelFeedback<Self>) {
        feedback.check_layout(&self.config);
        self.label_feedback = feedback;
    }

    /// Replaces the label equality predicate used by `evaluate`.
    pub fn set_label_eq(&mut self, eq: LabelEq) {
        self.label_eq = eq;
    }

    /// # Overview
    ///
    /// Computes each clause's output for one input row.
    ///
    /// A clause fires when every included automaton matches the input.
    /// Empty clauses fire during training (`skip_empty == false`) so Type
    /// I-a feedback can seed them, but never during inference.
    pub(crate) fn clause_outputs_into(&self, x_row: &[u8], skip_empty: bool, out: &mut [bool]) {
        let mid = self.config.mid_state();
        let span = self.config.num_literals * 2;

        for (clause, fires) in out.iter_mut().enumerate() {
            let ta_row = &self.ta_state[clause * span..][..span];
            let mut active = true;
            let mut empty = true;

            for (literal, pair) in ta_row.chunks_exact(2).enumerate() {
                let include = action(pair[0], mid);
                let include_negated = action(pair[1], mid);
                empty = empty && !(include || include_negated);

                if (include && x_row[literal] == 0) || (include_negated && x_row[literal] == 1)
                {
                    active = false;
                    break;
                }
            }

            *fires = active && !(empty && skip_empty);
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
    /// Returns the clipped per-class votes for one input row, as seen by
    /// inference.
    pub fn class_votes(&self, x_row: &[u8]) -> Result<Vec<i32>> {
        check_len(self.config.num_literals, x_row.len())?;

        let mut clause_output = vec![false; self.config.num_clauses];
        let mut votes = vec![0i32; self.config.num_classes];
        self.clause_outputs_into(x_row, true, &mut clause_output);
        self.sum_votes_into(&clause_output, &mut votes);
        Ok(votes)
    }

    /// # Overview
    ///
    /// Trains on `rows` examples for `epochs` passes, visiting rows in the
    /// order supplied.
    pub fn train(&mut self, x: &[u8], y: &[u8], rows: usize, epochs: u32) -> Result<()> {
        check_len(rows * self.config.num_literals, x.len())?;
        check_len(rows * self.config.label_bytes(), y.len())?;
        self.label_feedback.check_layout(&self.config);

        debug!("training dense machine: {rows} rows, {epochs} epochs");

        let literals = self.config.num_literals;
        let label_bytes = self.config.label_bytes();
        let mut clause_output = vec![false; self.config.num_clauses];
        let mut votes = vec![0i32; self.config.num_classes];

        for _ in 0..epochs {
            for row in 0..rows {
                let x_row = &x[row * literals..][..literals];
                let y_row = &y[row * label_bytes..][..label_bytes];

                self.clause_outputs_into(x_row, false, &mut clause_output);
                self.sum_votes_into(&clause_output, &mut votes);

                let state = RowState {
                    clause_output: &clause_output,
                    votes:         &votes
                };
                let feedback = self.label_feedback;
                match feedback {
                    LabelFeedback::ClassIndex => {
                        self.feedback_class_index(&state, x_row, y_row);
                    }
                    LabelFeedback::BinaryVector => {
                        self.feedback_binary_vector(&state, x_row, y_row);
                    }
                    LabelFeedback::Custom(f) => f(self, &state, x_row, y_row)
                }
            }
        }
        Ok(())
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
            self.clause_outputs_into(x_row, true, &mut clause_output);
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

    /// # Overview
    ///
    /// Dispatches feedback for one (clause, class) pair.
    ///
    /// A clause whose weight sign agrees with `is_class_positive` voted
    /// correctly and receives Type I-a or I-b depending on its output; a
    /// disagreeing clause receives Type II only while firing.
    pub fn apply_feedback(
        &mut self,
        clause: usize,
        class: usize,
        is_class_positive: bool,
        row: &RowState<'_>,
        x: &[u8]
    ) {
        let Self {
            config,
            ta_state,
            weights,
            rng,
            ..
        } = self;
        let span = config.num_literals * 2;
        let ta_row = &mut ta_state[clause * span..][..span];
        let weight = &mut weights[clause * config.num_classes + class];

        if (*weight >= 0) == is_class_positive {
            if row.clause_output[clause] {
                type_ia(config, ta_row, weight, x, rng);
            } else {
                type_ib(config, ta_row, rng);
            }
        } else if row.clause_output[clause] {
            type_ii(config, ta_row, weight, x);
        }
    }

    /// Class-index labels: positive is the labelled class, negative is
    /// sampled from the rest weighted by votes.
    fn feedback_class_index(&mut self, row: &RowState<'_>, x: &[u8], y_row: &[u8]) {
        let positive = strategy::class_index_label(y_row) as usize;
        assert!(
            positive < self.config.num_classes,
            "label class {positive} out of range"
        );

        let t = self.config.threshold as i32;
        let two_t = (2 * t) as f32;

        let p_pos = (t - row.votes[positive]) as f32 / two_t;
        for clause in 0..self.config.num_clauses {
            if self.rng.next_f32() <= p_pos {
                self.apply_feedback(clause, positive, true, row, x);
            }
        }

        let Some(negative) =
            weighted_class_pick(row.votes, self.config.threshold, &mut self.rng, |c| {
                c != positive
            })
        else {
            return;
        };

        let p_neg = (row.votes[negative] + t) as f32 / two_t;
        for clause in 0..self.config.num_clauses {
            if self.rng.next_f32() <= p_neg {
                self.apply_feedback(clause, negative, false, row, x);
            }
        }
    }

    /// Binary-vector labels: both the positive and negative class are
    /// sampled, from the set and unset label bits respectively. A pool
    /// weighing zero skips its phase.
    fn feedback_binary_vector(&mut self, row: &RowState<'_>, x: &[u8], y_row: &[u8]) {
        let t = self.config.threshold as i32;
        let two_t = (2 * t) as f32;

        if let Some(positive) =
            weighted_class_pick(row.votes, self.config.threshold, &mut self.rng, |c| {
                y_row[c] != 0
            })
        {
            let p_pos = (t - row.votes[positive]) as f32 / two_t;
            for clause in 0..self.config.num_clauses {
                if self.rng.next_f32() <= p_pos {
                    self.apply_feedback(clause, positive, true, row, x);
                }
            }
        }

        if let Some(negative) =
            weighted_class_pick(row.votes, self.config.threshold, &mut self.rng, |c| {
                y_row[c] == 0
            })
        {
            let p_neg = (row.votes[negative] + t) as f32 / two_t;
            for clause in 0..self.config.num_clauses {
                if self.rng.next_f32() <= p_neg {
                    self.apply_feedback(clause, negative, false, row, x);
                }
            }
        }
    }

    /// # Overview
    ///
    /// Converts to the sparse representation, keeping only included
    /// automata and their counters.
    #[must_use]
    pub fn to_sparse(&self, seed: u32) -> SparseTsetlinMachine {
        SparseTsetlinMachine::from_dense(self, seed)
    }

    /// # Overview
    ///
    /// Converts to the stateless representation, keeping only included
    /// automata's literal indices.
    #[must_use]
    pub fn to_stateless(&self) -> StatelessTsetlinMachine {
        StatelessTsetlinMachine::from_dense(self)
    }
}

impl Inference for DenseTsetlinMachine {
    fn config(&self) -> &Config {
        DenseTsetlinMachine::config(self)
    }

    fn predict(&self, x: &[u8], y_pred: &mut [u8], rows: usize) -> Result<()> {
        DenseTsetlinMachine::predict(self, x, y_pred, rows)
    }

    fn evaluate(&self, x: &[u8], y: &[u8], rows: usize) -> Result<f32> {
        DenseTsetlinMachine::evaluate(self, x, y, rows)
    }
}
