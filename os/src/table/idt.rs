//! IDT storage

use super::{build_table_pointer, TablePointer};
use crate::descriptor::{IdtGate, WordWidth};
use crate::error::{TableError, TableResult};

/// IDT with `VECTORS` gates of width `W`; every gate starts out not present.
#[repr(C, align(16))]
pub struct InterruptTable<W: WordWidth, const VECTORS: usize> {
    gates: [W::Raw; VECTORS],
}

impl<W: WordWidth, const VECTORS: usize> InterruptTable<W, VECTORS> {
    const FITS: () = assert!(
        VECTORS >= 1 && VECTORS <= 256,
        "an IDT holds between 1 and 256 vectors"
    );

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::FITS;
        Self {
            gates: [W::ZERO; VECTORS],
        }
    }

    pub fn set_gate(&mut self, vector: usize, gate: IdtGate<W>) -> TableResult<()> {
        let slot = self
            .gates
            .get_mut(vector)
            .ok_or(TableError::VectorOutOfRange {
                vector,
                vectors: VECTORS,
            })?;
        *slot = gate.to_bytes();
        Ok(())
    }

    pub fn gate(&self, vector: usize) -> Option<IdtGate<W>> {
        self.gates.get(vector).map(IdtGate::from_bytes)
    }

    /// Linear address of vector 0.
    pub fn address(&self) -> u64 {
        self.gates.as_ptr() as usize as u64
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `W::Raw` is a plain byte array, so the gate array is
        // `VECTORS * SYSTEM_ENTRY_SIZE` initialized bytes borrowed from `self`.
        unsafe {
            core::slice::from_raw_parts(
                self.gates.as_ptr().cast::<u8>(),
                VECTORS * W::SYSTEM_ENTRY_SIZE,
            )
        }
    }

    /// Pointer covering every vector.
    pub fn pointer(&self) -> TablePointer<W> {
        build_table_pointer(self.address(), VECTORS, W::SYSTEM_ENTRY_SIZE)
    }
}

impl<W: WordWidth, const VECTORS: usize> Default for InterruptTable<W, VECTORS> {
    fn default() -> Self {
        Self::new()
    }
}
