//! Cooperative cancellation shared between a job handle and its worker

use crate::errors::OffsetError;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A cloneable flag that long computations poll at safe points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(OffsetError::Cancelled)` once cancellation was requested
    #[inline]
    pub fn check(&self) -> Result<(), OffsetError> {
        if self.is_cancelled() {
            Err(OffsetError::Cancelled)
        } else {
            Ok(())
        }
    }
}
