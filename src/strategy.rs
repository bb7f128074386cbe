//! Output activation and label interpretation strategies.
//!
//! The raw output of an engine is the per-class vote array. An
//! [`OutputActivation`] turns votes into caller-visible labels, and a
//! [`LabelFeedback`] decides which clause/class pairs receive feedback
//! during training based on the ground-truth labels. Both are closed sets
//! of built-in strategies with a function-pointer extension hook.

use core::fmt;

use crate::{config::Config, prng::Xorshift32};

/// # Overview
///
/// Per-row evaluation state handed to feedback strategies.
///
/// Borrowed snapshots of the clause outputs and clipped votes computed for
/// the current training row.
#[derive(Debug)]
pub struct RowState<'a> {
    pub clause_output: &'a [bool],
    pub votes:         &'a [i32]
}

/// # Overview
///
/// Translates clipped votes into the caller's label format.
///
/// `ClassIndex` writes the winning class as one little-endian `u32` and
/// requires `y_size == 1`, `y_element_size == 4`. `BinaryVector` writes one
/// byte per class and requires `y_size == num_classes`,
/// `y_element_size == 1`. A mismatching layout is a programmer error and
/// panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputActivation {
    ClassIndex,
    BinaryVector,
    Custom(fn(&Config, &[i32], &mut [u8]))
}

impl OutputActivation {
    pub(crate) fn apply(self, config: &Config, votes: &[i32], y_pred: &mut [u8]) {
        match self {
            Self::ClassIndex => class_index(config, votes, y_pred),
            Self::BinaryVector => binary_vector(config, votes, y_pred),
            Self::Custom(f) => f(config, votes, y_pred)
        }
    }

    /// Panics when the strategy disagrees with the configured label layout.
    pub(crate) fn check_layout(self, config: &Config) {
        match self {
            Self::ClassIndex => assert!(
                config.y_size == 1 && config.y_element_size == 4,
                "class-index output expects y_size == 1, y_element_size == 4"
            ),
            Self::BinaryVector => assert!(
                config.y_size == config.num_classes && config.y_element_size == 1,
                "binary-vector output expects y_size == num_classes, y_element_size == 1"
            ),
            Self::Custom(_) => {}
        }
    }
}

/// Argmax over votes, ties broken by lowest class index.
fn class_index(config: &Config, votes: &[i32], y_pred: &mut [u8]) {
    OutputActivation::ClassIndex.check_layout(config);

    let mut best_class = 0u32;
    let mut best_score = votes[0];
    for (class, &score) in votes.iter().enumerate().skip(1) {
        if score > best_score {
            best_score = score;
            best_class = class as u32;
        }
    }

    y_pred[..4].copy_from_slice(&best_class.to_le_bytes());
}

/// Per-class binary threshold at the mid state.
fn binary_vector(config: &Config, votes: &[i32], y_pred: &mut [u8]) {
    OutputActivation::BinaryVector.check_layout(config);

    let mid = i32::from(config.mid_state());
    for (class, &score) in votes.iter().enumerate() {
        y_pred[class] = u8::from(score > mid);
    }
}

/// # Overview
///
/// Interprets ground-truth labels during training.
///
/// `ClassIndex` reads one little-endian `u32` class index per row;
/// `BinaryVector` reads `num_classes` bytes, one per class. `Custom`
/// receives the engine, the row's clause outputs and votes, the input row,
/// and the raw label row.
pub enum LabelFeedback<M> {
    ClassIndex,
    BinaryVector,
    Custom(fn(&mut M, &RowState<'_>, &[u8], &[u8]))
}

impl<M> Clone for LabelFeedback<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for LabelFeedback<M> {}

impl<M> fmt::Debug for LabelFeedback<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassIndex => f.write_str("ClassIndex"),
            Self::BinaryVector => f.write_str("BinaryVector"),
            Self::Custom(_) => f.write_str("Custom(..)")
        }
    }
}

impl<M> LabelFeedback<M> {
    /// Panics when the strategy disagrees with the configured label layout.
    pub(crate) fn check_layout(&self, config: &Config) {
        match self {
            Self::ClassIndex => assert!(
                config.y_size == 1 && config.y_element_size == 4,
                "class-index labels expect y_size == 1, y_element_size == 4"
            ),
            Self::BinaryVector => assert!(
                config.y_size == config.num_classes && config.y_element_size == 1,
                "binary-vector labels expect y_size == num_classes, y_element_size == 1"
            ),
            Self::Custom(_) => {}
        }
    }
}

/// # Overview
///
/// Equality predicate over raw label rows, used by `evaluate`.
pub type LabelEq = fn(&[u8], &[u8]) -> bool;

/// Default predicate: raw byte equality over the whole label row.
#[must_use]
pub fn bytes_eq(y: &[u8], y_pred: &[u8]) -> bool {
    y == y_pred
}

/// Reads a class-index label from the head of a label row.
#[inline]
pub(crate) fn class_index_label(y_row: &[u8]) -> u32 {
    u32::from_le_bytes([y_row[0], y_row[1], y_row[2], y_row[3]])
}

/// # Overview
///
/// Weighted sampling over classes accepted by `include`.
///
/// Class `c` weighs `votes[c] + threshold` (votes are already clipped, so
/// weights are non-negative). Draws `next_u32 % pool`, then returns the
/// first accepted class whose prefix sum reaches the draw. Returns `None`
/// when the pool is empty or weighs zero.
pub(crate) fn weighted_class_pick<F>(
    votes: &[i32],
    threshold: u32,
    rng: &mut Xorshift32,
    include: F
) -> Option<usize>
where
    F: Fn(usize) -> bool
{
    let t = threshold as i32;

    let mut pool = 0u32;
    for (class, &v) in votes.iter().enumerate() {
        if include(class) {
            pool += (v + t) as u32;
        }
    }
    if pool == 0 {
        return None;
    }

    let draw = rng.next_u32() % pool;
    let mut acc = 0u32;
    for (class, &v) in votes.iter().enumerate() {
        if include(class) {
            acc += (v + t) as u32;
            if acc >= draw {
                return Some(class);
            }
        }
    }
    None
}
