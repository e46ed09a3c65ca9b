use std::{
    path::PathBuf,
    sync::{Mutex, OnceLock},
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const OVERRIDDEN_VARS: [&str; 2] = ["CHURN_SCORER_CONFIG_HOME", "CHURN_MODEL_PATH"];

/// Serializes env mutation across tests and restores the previous values on drop.
pub struct ChurnEnvGuard {
    previous: Vec<(&'static str, Option<String>)>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl ChurnEnvGuard {
    pub fn set(config_home: PathBuf, model_path: Option<PathBuf>) -> Self {
        let lock = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let previous = OVERRIDDEN_VARS
            .iter()
            .map(|&key| (key, std::env::var(key).ok()))
            .collect();
        // SAFETY: tests run under a global lock to prevent concurrent env mutations.
        unsafe {
            std::env::set_var("CHURN_SCORER_CONFIG_HOME", config_home);
            match model_path {
                Some(path) => std::env::set_var("CHURN_MODEL_PATH", path),
                None => std::env::remove_var("CHURN_MODEL_PATH"),
            }
        }
        Self {
            previous,
            _lock: lock,
        }
    }
}

impl Drop for ChurnEnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            // SAFETY: tests run under a global lock to prevent concurrent env mutations.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
