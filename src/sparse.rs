//! Sparse Tsetlin Machine: per-clause ordered automaton lists.
//!
//! Only automata whose counters stay above a pruning floor are stored, as
//! sorted `(ta_id, counter)` records per clause. Feedback walks each list
//! in lockstep with the dense index space `0..2 * num_literals`, treating
//! missing entries as automata resting at `min_state`. New automata enter
//! through Type II feedback, gated by a per-class active-literal bitmap
//! that Type I-a grows monotonically; punished automata fall out of the
//! list once their counter drops below the floor.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use log::debug;
use smallvec::SmallVec;

use crate::{
    automaton::{action, clip, penalize, reward},
    config::Config,
    dense::DenseTsetlinMachine,
    error::Result,
    model::{Inference, check_len, evaluate_with},
    prng::Xorshift32,
    strategy::{
        self, LabelEq, LabelFeedback, OutputActivation, RowState, weighted_class_pick
    }
};

/// Inline node capacity per clause; trained clauses rarely exceed this.
const INLINE_NODES: usize = 16;

/// How far below the mid state a counter may fall before its node is
/// pruned, and how far above the floor new nodes start.
const PRUNE_MARGIN: i16 = 40;
const INIT_OFFSET: i8 = 5;

pub(crate) type NodeList = SmallVec<[TaRecord; INLINE_NODES]>;

/// # Overview
///
/// One stored automaton: its literal index and counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaRecord {
    pub ta_id: u32,
    pub state: i8
}

/// # Overview
///
/// Trainable Tsetlin Machine storing only near-included automata.
///
/// Clauses start empty and grow during training. Inference semantics match
/// the dense engine restricted to included automata, which are the only
/// ones that can affect clause output.
#[derive(Debug, Clone)]
pub struct SparseTsetlinMachine {
    pub(crate) config:  Config,
    pub(crate) clauses: Vec<NodeList>,
    pub(crate) weights: Vec<i16>,
    pub(crate) active_literals: Vec<u8>,
    pub(crate) al_row_size:     usize,
    pub(crate) sparse_min_state:  i8,
    pub(crate) sparse_init_state: i8,
    pub(crate) rng:     Xorshift32,
    pub(crate) output_activation: OutputActivation,
    pub(crate) label_feedback:    LabelFeedback<SparseTsetlinMachine>,
    pub(crate) label_eq:          LabelEq
}

impl SparseTsetlinMachine {
    /// # Overview
    ///
    /// Creates a machine with empty clauses and random ±1 weights.
    pub fn new(config: Config, seed: u32) -> Self {
        let mut rng = Xorshift32::new(seed);

        let mut weights = vec![0i16; config.num_clauses * config.num_classes];
        for w in weights.iter_mut() {
            *w = if rng.next_f32() <= 0.5 { -1 } else { 1 };
        }

        let clauses = vec![NodeList::new(); config.num_clauses];
        Self::from_parts(config, clauses, weights, rng)
    }

    pub(crate) fn from_parts(
        config: Config,
        clauses: Vec<NodeList>,
        weights: Vec<i16>,
        rng: Xorshift32
    ) -> Self {
        debug_assert_eq!(clauses.len(), config.num_clauses);
        debug_assert_eq!(weights.len(), config.num_clauses * config.num_classes);

        let al_row_size = (config.num_literals - 1) / 8 + 1;
        let sparse_min_state =
            (i16::from(config.mid_state()) - PRUNE_MARGIN).max(i16::from(i8::MIN)) as i8;

        Self {
            config,
            clauses,
            weights,
            active_literals: vec![0u8; config.num_classes * al_row_size],
            al_row_size,
            sparse_min_state,
            sparse_init_state: sparse_min_state + INIT_OFFSET,
            rng,
            output_activation: OutputActivation::ClassIndex,
            label_feedback: LabelFeedback::ClassIndex,
            label_eq: strategy::bytes_eq
        }
    }

    /// # Overview
    ///
    /// Builds a sparse machine from a trained dense one, keeping every
    /// included automaton together with its counter.
    #[must_use]
    pub fn from_dense(dense: &DenseTsetlinMachine, seed: u32) -> Self {
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
                    .map(|(i, &state)| TaRecord {
                        ta_id: i as u32,
                        state
                    })
                    .collect()
            })
            .collect();

        Self::from_parts(config, clauses, dense.weights().to_vec(), Xorshift32::new(seed))
    }

    /// Returns the engine's configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a clause's sorted automaton records.
    #[inline]
    #[must_use]
    pub fn clause_nodes(&self, clause: usize) -> &[TaRecord] {
        &self.clauses[clause]
    }

    /// Returns the flat `(num_clauses, num_classes)` weight array.
    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[i16] {
        &self.weights
    }

    /// Returns the per-class active-literal bitmap, one row of
    /// `ceil(num_literals / 8)` bytes per class.
    #[inline]
    #[must_use]
    pub fn active_literals(&self) -> &[u8] {
        &self.active_literals
    }

    /// Total stored automata across all clauses.
    #[must_use]
    pub fn total_nodes(&self) -> usize {
        self.clauses.iter().map(SmallVec::len).sum()
    }

    /// # Overview
    ///
    /// Approximate heap plus inline bytes used by the clause lists.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.clauses
            .iter()
            .map(|list| {
                let inline = core::mem::size_of::<NodeList>();
                if list.spilled() {
                    inline + list.capacity() * core::mem::size_of::<TaRecord>()
                } else {
                    inline
                }
            })
            .sum()
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

    /// A clause fires when every included stored automaton matches the
    /// input; stored automata below the mid state are ignored.
    pub(crate) fn clause_outputs_into(&self, x_row: &[u8], skip_empty: bool, out: &mut [bool]) {
        let mid = self.config.mid_state();

        for (clause, fires) in out.iter_mut().enumerate() {
            let mut active = true;
            let mut empty = true;

            for node in &self.clauses[clause] {
                if action(node.state, mid) {
                    empty = false;
                    if node.ta_id & 1 == u32::from(x_row[(node.ta_id >> 1) as usize]) {
                        active = false;
                        break;
                    }
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

        debug!("training sparse machine: {rows} rows, {epochs} epochs");

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
    /// Dispatches feedback for one (clause, class) pair, as in the dense
    /// engine but over the stored automaton list.
    pub fn apply_feedback(
        &mut self,
        clause: usize,
        class: usize,
        is_class_positive: bool,
        row: &RowState<'_>,
        x: &[u8]
    ) {
        let weight = self.weights[clause * self.config.num_classes + class];

        if (weight >= 0) == is_class_positive {
            if row.clause_output[clause] {
                self.type_ia(clause, class, x);
            } else {
                self.type_ib(clause);
            }
        } else if row.clause_output[clause] {
            self.type_ii(clause, class, x);
        }
    }

    /// Type I-a over the stored list: present automata follow the dense
    /// reward/punish rule, with pruning after punishment; absent positive
    /// literals set by the input mark the class's active-literal bit.
    fn type_ia(&mut self, clause: usize, class: usize, x: &[u8]) {
        let al_row_size = self.al_row_size;
        let floor = self.sparse_min_state;
        let max = self.config.max_state;
        let min = self.config.min_state;
        let boost = self.config.boost_true_positive_feedback;
        let s_inv = self.config.s_inv();
        let s_m1_inv = self.config.s_m1_inv();
        let Self {
            config,
            clauses,
            weights,
            active_literals,
            rng,
            ..
        } = self;
        let list = &mut clauses[clause];
        let weight = &mut weights[clause * config.num_classes + class];

        *weight = if *weight >= 0 {
            weight.saturating_add(1)
        } else {
            weight.saturating_sub(1)
        };

        let mut cursor = 0usize;
        for i in 0..config.num_literals * 2 {
            let present = list.get(cursor).is_some_and(|n| n.ta_id as usize == i);
            if !present {
                let literal = i >> 1;
                if i & 1 == 0 && x[literal] == 1 {
                    active_literals[class * al_row_size + (literal >> 3)] |=
                        1 << (literal & 7);
                }
                continue;
            }

            let node = &mut list[cursor];
            if (i & 1) as u8 != x[i >> 1] {
                if boost || rng.next_f32() <= s_m1_inv {
                    node.state = reward(node.state, max);
                }
                cursor += 1;
            } else {
                if rng.next_f32() <= s_inv {
                    node.state = penalize(node.state, min);
                }
                if node.state < floor {
                    list.remove(cursor);
                } else {
                    cursor += 1;
                }
            }
        }
    }

    /// Type I-b only touches present automata: punish with probability
    /// `1/s` and prune what falls below the floor.
    fn type_ib(&mut self, clause: usize) {
        let floor = self.sparse_min_state;
        let min = self.config.min_state;
        let s_inv = self.config.s_inv();
        let Self {
            clauses,
            rng,
            ..
        } = self;
        let list = &mut clauses[clause];

        let mut cursor = 0usize;
        while cursor < list.len() {
            if rng.next_f32() <= s_inv {
                let node = &mut list[cursor];
                node.state = penalize(node.state, min);
                if node.state < floor {
                    list.remove(cursor);
                    continue;
                }
            }
            cursor += 1;
        }
    }

    /// Type II raises present excluded automata that would block the
    /// clause, and materializes new nodes for active literals whose
    /// inclusion would block it.
    fn type_ii(&mut self, clause: usize, class: usize, x: &[u8]) {
        let al_row_size = self.al_row_size;
        let init = self.sparse_init_state;
        let mid = self.config.mid_state();
        let max = self.config.max_state;
        let Self {
            config,
            clauses,
            weights,
            active_literals,
            ..
        } = self;
        let list = &mut clauses[clause];
        let weight = &mut weights[clause * config.num_classes + class];

        *weight += if *weight >= 0 { -1 } else { 1 };

        let mut cursor = 0usize;
        for i in 0..config.num_literals * 2 {
            let literal = i >> 1;
            let present = list.get(cursor).is_some_and(|n| n.ta_id as usize == i);
            if !present {
                let is_active = active_literals[class * al_row_size + (literal >> 3)]
                    & (1 << (literal & 7))
                    != 0;
                if is_active && (i & 1 == 0 || x[literal] == 1) {
                    list.insert(
                        cursor,
                        TaRecord {
                            ta_id: i as u32,
                            state: init
                        }
                    );
                    cursor += 1;
                }
                continue;
            }

            let node = &mut list[cursor];
            if !action(node.state, mid) && (i & 1) as u8 == x[literal] {
                node.state = reward(node.state, max);
            }
            cursor += 1;
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

    /// Binary-vector labels: both phases sample their class from the
    /// matching label bits; a pool weighing zero skips its phase.
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
}

impl Inference for SparseTsetlinMachine {
    fn config(&self) -> &Config {
        SparseTsetlinMachine::config(self)
    }

    fn predict(&self, x: &[u8], y_pred: &mut [u8], rows: usize) -> Result<()> {
        SparseTsetlinMachine::predict(self, x, y_pred, rows)
    }

    fn evaluate(&self, x: &[u8], y: &[u8], rows: usize) -> Result<f32> {
        SparseTsetlinMachine::evaluate(self, x, y, rows)
    }
}
