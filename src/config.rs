//! Configuration and builder for the engine variants.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// # Overview
///
/// Hyperparameters shared by all engine variants.
///
/// `y_size` and `y_element_size` describe the label buffer layout: a label
/// row is `y_size` elements of `y_element_size` bytes. The default layout
/// is a single little-endian `u32` class index per row.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[must_use]
pub struct Config {
    pub num_classes:    usize,
    pub threshold:      u32,
    pub num_literals:   usize,
    pub num_clauses:    usize,
    pub max_state:      i8,
    pub min_state:      i8,
    pub boost_true_positive_feedback: bool,
    pub s:              f32,
    pub y_size:         usize,
    pub y_element_size: usize
}

impl Config {
    /// # Overview
    ///
    /// Creates a new ConfigBuilder.
    #[inline]
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// # Overview
    ///
    /// Validates configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(Error::MissingClasses);
        }
        if self.num_literals == 0 {
            return Err(Error::MissingLiterals);
        }
        if self.num_clauses == 0 {
            return Err(Error::MissingClauses);
        }
        if self.threshold == 0 {
            return Err(Error::InvalidThreshold);
        }
        if self.min_state >= self.max_state {
            return Err(Error::InvalidStateRange);
        }
        if self.s <= 1.0 {
            return Err(Error::InvalidSpecificity);
        }
        if self.y_size == 0 || self.y_element_size == 0 {
            return Err(Error::InvalidLabelLayout);
        }
        Ok(())
    }

    /// # Overview
    ///
    /// Inclusion threshold: `(max_state + min_state) / 2`.
    #[inline]
    #[must_use]
    pub fn mid_state(&self) -> i8 {
        ((i16::from(self.max_state) + i16::from(self.min_state)) / 2) as i8
    }

    /// # Overview
    ///
    /// Pre-computed punish probability: `1 / s`.
    #[inline]
    #[must_use]
    pub fn s_inv(&self) -> f32 {
        1.0 / self.s
    }

    /// # Overview
    ///
    /// Pre-computed reward probability: `(s - 1) / s`.
    #[inline]
    #[must_use]
    pub fn s_m1_inv(&self) -> f32 {
        (self.s - 1.0) / self.s
    }

    /// Bytes per label row: `y_size * y_element_size`.
    #[inline]
    #[must_use]
    pub fn label_bytes(&self) -> usize {
        self.y_size * self.y_element_size
    }
}

/// # Overview
///
/// Builder for Config with validation.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    num_classes:    Option<usize>,
    threshold:      Option<u32>,
    num_literals:   Option<usize>,
    num_clauses:    Option<usize>,
    max_state:      Option<i8>,
    min_state:      Option<i8>,
    boost_true_positive_feedback: bool,
    s:              Option<f32>,
    y_size:         Option<usize>,
    y_element_size: Option<usize>
}

impl ConfigBuilder {
    /// # Overview
    ///
    /// Sets the number of classes.
    pub fn classes(mut self, n: usize) -> Self {
        self.num_classes = Some(n);
        self
    }

    /// # Overview
    ///
    /// Sets the vote clipping threshold T.
    pub fn threshold(mut self, t: u32) -> Self {
        self.threshold = Some(t);
        self
    }

    /// # Overview
    ///
    /// Sets the number of input literals (features).
    pub fn literals(mut self, n: usize) -> Self {
        self.num_literals = Some(n);
        self
    }

    /// # Overview
    ///
    /// Sets the number of clauses.
    pub fn clauses(mut self, n: usize) -> Self {
        self.num_clauses = Some(n);
        self
    }

    /// # Overview
    ///
    /// Sets the automaton state bounds (default: -127 and 127).
    pub fn states(mut self, min: i8, max: i8) -> Self {
        self.min_state = Some(min);
        self.max_state = Some(max);
        self
    }

    /// # Overview
    ///
    /// Enables unconditional rewards for correctly-voting automata.
    pub fn boost_true_positive(mut self, boost: bool) -> Self {
        self.boost_true_positive_feedback = boost;
        self
    }

    /// # Overview
    ///
    /// Sets specificity parameter s (default: 3.9).
    pub fn specificity(mut self, s: f32) -> Self {
        self.s = Some(s);
        self
    }

    /// # Overview
    ///
    /// Sets the label buffer layout (default: one u32 class index).
    pub fn label_layout(mut self, y_size: usize, y_element_size: usize) -> Self {
        self.y_size = Some(y_size);
        self.y_element_size = Some(y_element_size);
        self
    }

    /// # Overview
    ///
    /// Builds and validates the Config.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            num_classes:    self.num_classes.ok_or(Error::MissingClasses)?,
            threshold:      self.threshold.ok_or(Error::InvalidThreshold)?,
            num_literals:   self.num_literals.ok_or(Error::MissingLiterals)?,
            num_clauses:    self.num_clauses.ok_or(Error::MissingClauses)?,
            max_state:      self.max_state.unwrap_or(127),
            min_state:      self.min_state.unwrap_or(-127),
            boost_true_positive_feedback: self.boost_true_positive_feedback,
            s:              self.s.unwrap_or(3.9),
            y_size:         self.y_size.unwrap_or(1),
            y_element_size: self.y_element_size.unwrap_or(4)
        };
        config.validate()?;
        Ok(config)
    }
}
