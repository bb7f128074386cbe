//! # tsetlin-edge
//!
//! On-device execution engine for Tsetlin Machines: training, inference,
//! and a portable binary model format.
//!
//! Three model variants trade training capability for footprint:
//!
//! - [`DenseTsetlinMachine`]: flat counter array, the trainable reference
//!   representation and the native persistence format
//! - [`SparseTsetlinMachine`]: per-clause ordered automaton lists that grow
//!   and shrink during training
//! - [`StatelessTsetlinMachine`]: inference-only literal lists derived from
//!   a trained dense model
//!
//! # Features
//!
//! - `std` (default): file-based model persistence
//! - `serde`: serialization support for [`Config`]
//!
//! # Examples
//!
//! ```
//! use tsetlin_edge::{Config, DenseTsetlinMachine};
//!
//! let config = Config::builder()
//!     .classes(2)
//!     .threshold(10)
//!     .literals(2)
//!     .clauses(20)
//!     .build()
//!     .unwrap();
//!
//! let mut tm = DenseTsetlinMachine::new(config, 42);
//!
//! // four rows of two binary features, class labels 0, 1, 1, 0
//! let x = [0, 0, 0, 1, 1, 0, 1, 1];
//! let mut y = [0u8; 16];
//! for (row, label) in [0u32, 1, 1, 0].iter().enumerate() {
//!     y[row * 4..][..4].copy_from_slice(&label.to_le_bytes());
//! }
//!
//! tm.train(&x, &y, 4, 100).unwrap();
//!
//! let mut y_pred = [0u8; 16];
//! tm.predict(&x, &mut y_pred, 4).unwrap();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod automaton;
#[cfg(feature = "std")]
mod codec;
mod config;
mod dense;
pub mod error;
mod feedback;
mod model;
mod prng;
mod sparse;
mod stateless;
mod strategy;

pub use config::{Config, ConfigBuilder};
pub use dense::DenseTsetlinMachine;
pub use error::{Error, Result};
pub use model::Inference;
pub use prng::Xorshift32;
pub use sparse::{SparseTsetlinMachine, TaRecord};
pub use stateless::StatelessTsetlinMachine;
pub use strategy::{LabelEq, LabelFeedback, OutputActivation, RowState, bytes_eq};
