use std::sync::atomic::{AtomicI64, Ordering};

use super::{Scope, SequenceGenerator};
use crate::store::StoreError;

/// Process-wide counter.
#[derive(Debug, Default)]
pub struct LocalSequenceGenerator {
    last: AtomicI64,
}

impl LocalSequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume counting after `last`, e.g. the highest value found in the
    /// local redo log at startup.
    pub fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }
}

impl SequenceGenerator for LocalSequenceGenerator {
    fn next(&self) -> Result<i64, StoreError> {
        Ok(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn current(&self) -> Result<i64, StoreError> {
        Ok(self.last.load(Ordering::SeqCst))
    }

    fn scope(&self) -> Scope {
        Scope::Process
    }
}
