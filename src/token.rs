use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::Result;

/// Where the bearer token lives between requests.
///
/// The HTTP client reads it before every request and clears it when the
/// backend answers 401.
pub trait TokenStore: Send + Sync + Debug {
    /// The current token, if any.
    fn token(&self) -> Option<String>;

    /// Replace the stored token.
    fn set_token(&self, token: &str) -> Result<()>;

    /// Forget the stored token. Clearing an empty store is a no-op.
    fn clear_token(&self) -> Result<()>;
}

/// Process-local token storage. Lost on exit.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a known token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: &str) -> Result<()> {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
        Ok(())
    }
}

/// Token storage backed by a single file, cached in memory.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileTokenStore {
    /// Open (or lazily create) a token file. An existing, non-empty file
    /// becomes the current token.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cached = match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }

    /// `<config dir>/textvision/auth_token`, when the platform has a config dir.
    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("textvision").join("auth_token"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        self.cached.read().ok().and_then(|t| t.clone())
    }

    fn set_token(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;
        if let Ok(mut slot) = self.cached.write() {
            *slot = Some(token.to_string());
        }
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        if let Ok(mut slot) = self.cached.write() {
            *slot = None;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
