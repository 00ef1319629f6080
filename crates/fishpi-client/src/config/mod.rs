//! Client config loader (strict parsing) and write-back store.

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use fishpi_core::error::{FishPiError, Result};

pub use schema::{ClientConfig, ElvesSection, FishPiSection, IceSection, Settings, WindowSection};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<ClientConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| FishPiError::Config(format!("read config {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ClientConfig> {
    let mut cfg: ClientConfig = serde_yaml::from_str(s)
        .map_err(|e| FishPiError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    cfg.normalize();
    Ok(cfg)
}

/// The two values the client writes back at runtime.
pub trait Persist: Send + Sync {
    fn persist_api_key(&self, key: &str) -> Result<()>;
    fn persist_ck(&self, ck: &str) -> Result<()>;
}

/// Loaded config bound to its file.
pub struct ConfigStore {
    path: PathBuf,
    cfg: RwLock<ClientConfig>,
}

impl ConfigStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cfg = load_from_file(&path)?;
        Ok(Self::new(path, cfg))
    }

    pub fn new(path: impl Into<PathBuf>, cfg: ClientConfig) -> Self {
        Self {
            path: path.into(),
            cfg: RwLock::new(cfg),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> ClientConfig {
        self.cfg
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ClientConfig),
    {
        let body = {
            let mut cfg = self.cfg.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut cfg);
            serde_yaml::to_string(&*cfg)
                .map_err(|e| FishPiError::Internal(format!("encode config failed: {e}")))?
        };
        fs::write(&self.path, body)?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

impl Persist for ConfigStore {
    fn persist_api_key(&self, key: &str) -> Result<()> {
        self.update(|c| c.fish_pi.api_key = key.to_string())
    }

    fn persist_ck(&self, ck: &str) -> Result<()> {
        self.update(|c| {
            if let Some(ice) = c.ice.as_mut() {
                ice.ck = ck.to_string();
            }
        })
    }
}
