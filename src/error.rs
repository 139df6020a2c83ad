use thiserror::Error;

/// Recoverable failures reported by the engine.
///
/// Node store exhaustion and broken internal invariants are not represented
/// here: both abort the current operation with a panic.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CddError {
    /// A matrix does not match the active clock count, or two matrices have
    /// different dimensions.
    #[error("dimension mismatch: expected {expected} clocks, found {found}")]
    DimensionMismatch {
        /// Dimension required by the operation.
        expected: usize,
        /// Dimension that was supplied.
        found: usize,
    },

    /// An elementary constraint names a clock that does not exist.
    #[error("clock {clock} is out of range for {clocks} clocks")]
    ClockOutOfRange {
        /// Offending clock index.
        clock: usize,
        /// Active clock count.
        clocks: usize,
    },

    /// An elementary constraint relates a clock to itself.
    #[error("constraint relates clock {0} to itself")]
    SameClock(usize),

    /// A constant does not fit the bound encoding.
    #[error("constant {value} is out of range, bounds must lie within -{max}..={max}")]
    ValueOutOfRange {
        /// Offending constant.
        value: i32,
        /// Largest representable magnitude.
        max: i32,
    },

    /// Extraction was requested from a diagram denoting the empty federation.
    #[error("cannot extract a zone from an empty federation")]
    EmptyFederation,
}

/// Result of an engine operation that can fail on bad input.
pub type Result<T> = std::result::Result<T, CddError>;
