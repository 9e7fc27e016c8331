use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::process::Child;

use crate::config::ConfigDocument;
use crate::splash::SplashController;

/// Process-wide owner of the mutable singletons: the cached configuration
/// document, the handle of a locally-spawned backend, and the transient
/// status window. "At most one live instance" of each is an invariant of
/// this struct, enforced by its components, not by caller convention.
pub(crate) struct AppState {
    /// Location of the persisted configuration document
    pub(crate) config_path: PathBuf,
    /// In-memory copy of the document; disk writes go through
    /// `config::save_document` before this cache is updated
    pub(crate) config: RwLock<ConfigDocument>,
    /// Backend process started by this shell, if any. Exclusively owned by
    /// the supervisor; `None` once nothing was started or after teardown.
    pub(crate) backend: Mutex<Option<Child>>,
    /// Owner of the single transient status window
    pub(crate) splash: SplashController,
}

impl AppState {
    pub(crate) fn new(config_path: PathBuf, config: ConfigDocument) -> Self {
        Self {
            config_path,
            config: RwLock::new(config),
            backend: Mutex::new(None),
            splash: SplashController::new(),
        }
    }
}
