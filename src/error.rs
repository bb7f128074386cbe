//! Error types for the Tsetlin Machine engine.

use core::fmt;

/// # Overview
///
/// Errors that can occur when building, running, or persisting an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    MissingClasses,
    MissingLiterals,
    MissingClauses,
    InvalidThreshold,
    InvalidStateRange,
    InvalidSpecificity,
    InvalidLabelLayout,
    DimensionMismatch { expected: usize, got: usize },
    Malformed(&'static str),
    #[cfg(feature = "std")]
    Io(std::io::ErrorKind)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingClasses => write!(f, "num_classes is required"),
            Self::MissingLiterals => write!(f, "num_literals is required"),
            Self::MissingClauses => write!(f, "num_clauses is required"),
            Self::InvalidThreshold => write!(f, "threshold must be > 0"),
            Self::InvalidStateRange => write!(f, "min_state must be < max_state"),
            Self::InvalidSpecificity => write!(f, "s must be > 1.0"),
            Self::InvalidLabelLayout => {
                write!(f, "y_size and y_element_size must be > 0")
            }
            Self::DimensionMismatch {
                expected,
                got
            } => {
                write!(f, "dimension mismatch: expected {expected}, got {got}")
            }
            Self::Malformed(what) => write!(f, "malformed model file: {what}"),
            #[cfg(feature = "std")]
            Self::Io(kind) => write!(f, "i/o error: {kind}")
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

/// # Overview
///
/// Result type for engine operations.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_all_variants() {
        assert_eq!(Error::MissingClasses.to_string(), "num_classes is required");
        assert_eq!(
            Error::MissingLiterals.to_string(),
            "num_literals is required"
        );
        assert_eq!(Error::MissingClauses.to_string(), "num_clauses is required");
        assert_eq!(Error::InvalidThreshold.to_string(), "threshold must be > 0");
        assert_eq!(
            Error::InvalidStateRange.to_string(),
            "min_state must be < max_state"
        );
        assert_eq!(Error::InvalidSpecificity.to_string(), "s must be > 1.0");
        assert_eq!(
            Error::DimensionMismatch {
                expected: 10,
                got:      5
            }
            .to_string(),
            "dimension mismatch: expected 10, got 5"
        );
        assert_eq!(
            Error::Malformed("truncated clause list").to_string(),
            "malformed model file: truncated clause list"
        );
    }

    #[cfg(feature = "std")]
    #[test]
    fn error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(Error::from(io), Error::Io(std::io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn error_eq() {
        assert_eq!(Error::MissingClauses, Error::MissingClauses);
        assert_ne!(Error::MissingClauses, Error::MissingLiterals);
        assert_ne!(
            Error::DimensionMismatch {
                expected: 5,
                got:      3
            },
            Error::DimensionMismatch {
                expected: 5,
                got:      4
            }
        );
    }
}
