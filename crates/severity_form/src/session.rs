//! Process-wide predictor
//!
//! The artifact is loaded once per process and shared read-only by every
//! form submission.

use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::info;

use traffic_severity_core::{Predictor, Result};

// ==== STATE ====

static PREDICTOR: OnceCell<Predictor> = OnceCell::new();

/// Load the artifact at `path` on first call; later calls return the cached predictor
///
/// A failed load leaves the cell empty so a later call can retry.
pub fn init_predictor(path: &Path, verify_hash: bool) -> Result<&'static Predictor> {
    PREDICTOR.get_or_try_init(|| {
        let predictor = Predictor::from_path(path, verify_hash)?;
        info!(
            path = %path.display(),
            classes = ?predictor.labels().classes,
            "model loaded"
        );
        Ok(predictor)
    })
}

/// The loaded predictor, if `init_predictor` has succeeded
pub fn predictor() -> Option<&'static Predictor> {
    PREDICTOR.get()
}
