// ABOUTME: Process-wide optical parameters behind a single swap point.
// ABOUTME: Writers replace the whole struct; readers get an immutable Arc for the frame.

use std::sync::Arc;

use glass_core::{OpticalParameters, ParamsUpdate};
use parking_lot::RwLock;

#[derive(Debug)]
pub struct ParamStore {
    current: RwLock<Arc<OpticalParameters>>,
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new(OpticalParameters::default())
    }
}

impl ParamStore {
    pub fn new(params: OpticalParameters) -> Self {
        Self {
            current: RwLock::new(Arc::new(params.sanitized())),
        }
    }

    /// Latest fully-applied parameters
    pub fn current(&self) -> Arc<OpticalParameters> {
        Arc::clone(&self.current.read())
    }

    /// Merge `update` into the current value and swap the result in
    pub fn set_params(&self, update: &ParamsUpdate) -> Arc<OpticalParameters> {
        let mut slot = self.current.write();
        if update.is_empty() {
            return Arc::clone(&slot);
        }
        let next = Arc::new(update.apply_to(&slot));
        *slot = Arc::clone(&next);
        tracing::debug!(params = ?*next, "Optical parameters updated");
        next
    }

    /// Swap in a complete parameter set
    pub fn replace(&self, params: OpticalParameters) -> Arc<OpticalParameters> {
        let next = Arc::new(params.sanitized());
        *self.current.write() = Arc::clone(&next);
        tracing::debug!(params = ?*next, "Optical parameters replaced");
        next
    }
}
