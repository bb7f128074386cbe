//! Shared inference interface for the engine variants.

#[cfg(not(feature = "std"))]
use alloc::vec;

use crate::{
    config::Config,
    error::{Error, Result},
    strategy::LabelEq
};

/// # Overview
///
/// Common inference surface implemented by the dense, sparse, and
/// stateless engines.
///
/// Buffers are flat and row-major: `x` holds `rows * num_literals` bytes of
/// 0/1 features, `y` and `y_pred` hold `rows * y_size * y_element_size`
/// label bytes. All buffers are borrowed for the call.
pub trait Inference {
    /// Returns the engine's configuration.
    fn config(&self) -> &Config;

    /// Writes one predicted label row per input row into `y_pred`.
    fn predict(&self, x: &[u8], y_pred: &mut [u8], rows: usize) -> Result<()>;

    /// Predicts and returns the fraction of rows whose predicted label row
    /// equals the ground truth under the engine's equality predicate.
    fn evaluate(&self, x: &[u8], y: &[u8], rows: usize) -> Result<f32>;
}

/// Returns `DimensionMismatch` unless `got == expected`.
#[inline]
pub(crate) fn check_len(expected: usize, got: usize) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            expected,
            got
        })
    }
}

/// Predicts into a scratch buffer and counts equal label rows.
pub(crate) fn evaluate_with<P>(
    config: &Config,
    label_eq: LabelEq,
    predict: P,
    x: &[u8],
    y: &[u8],
    rows: usize
) -> Result<f32>
where
    P: Fn(&[u8], &mut [u8], usize) -> Result<()>
{
    let label_bytes = config.label_bytes();
    check_len(rows * label_bytes, y.len())?;

    let mut y_pred = vec![0u8; rows * label_bytes];
    predict(x, &mut y_pred, rows)?;

    if rows == 0 {
        return Ok(0.0);
    }
    let correct = y
        .chunks_exact(label_bytes)
        .zip(y_pred.chunks_exact(label_bytes))
        .filter(|(truth, pred)| label_eq(truth, pred))
        .count();
    Ok(correct as f32 / rows as f32)
}
