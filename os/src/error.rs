//! Error types for descriptor-table construction
//!
//! Encoding and loading are infallible by contract. The only failure the
//! software can see is running out of room in fixed-capacity table storage.

/// Table construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// Appending would need more slots than the table has
    Full {
        /// Slots in the table
        capacity: usize,
        /// Slots that the append would have needed in total
        required: usize,
    },

    /// Gate vector beyond the end of the IDT
    VectorOutOfRange {
        /// The requested vector
        vector: usize,
        /// Number of vectors the table holds
        vectors: usize,
    },
}

impl TableError {
    /// Returns a human-readable description of the error
    pub fn description(&self) -> &'static str {
        match self {
            Self::Full { .. } => "descriptor table is full",
            Self::VectorOutOfRange { .. } => "interrupt vector outside the table",
        }
    }
}

/// Convenience type alias for Results with TableError
pub type TableResult<T> = Result<T, TableError>;

impl core::fmt::Display for TableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full { capacity, required } => {
                write!(
                    f,
                    "{}: {} slots needed, {} available",
                    self.description(),
                    required,
                    capacity
                )
            }
            Self::VectorOutOfRange { vector, vectors } => {
                write!(
                    f,
                    "{}: vector {} of {}",
                    self.description(),
                    vector,
                    vectors
                )
            }
        }
    }
}
