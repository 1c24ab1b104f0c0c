//! Where the access token lives between runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{AuthMethod, Credential};
use crate::config;

pub const AUTH_FILE: &str = "auth.yml";

pub trait CredentialStore: Send + Sync {
    fn store(&self, token: &str, method: AuthMethod) -> Result<()>;

    /// The stored credential, or `None` when not logged in.
    fn get(&self) -> Result<Option<Credential>>;

    fn get_method(&self) -> Result<Option<AuthMethod>> {
        Ok(self.get()?.map(|credential| credential.method))
    }

    /// Forget the credential. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AuthFile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_method: Option<AuthMethod>,
}

/// `auth.yml` in the config directory, readable by the owner only.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new() -> Self {
        Self::at(config::config_dir().join(AUTH_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for FileCredentialStore {
    fn store(&self, token: &str, method: AuthMethod) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        }
        let file = AuthFile {
            token: token.to_string(),
            auth_method: Some(method),
        };
        let content = serde_yaml::to_string(&file).context("Failed to serialize credentials")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        restrict_permissions(&self.path)?;
        tracing::debug!(path = %self.path.display(), ?method, "stored credentials");
        Ok(())
    }

    fn get(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let file: AuthFile = if content.trim().is_empty() {
            AuthFile::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", self.path.display()))?
        };

        if file.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(Credential {
            token: file.token,
            method: file.auth_method.unwrap_or(AuthMethod::Token),
        }))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// In-process store, used by tests and when nothing should touch disk.
#[derive(Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(token: &str, method: AuthMethod) -> Self {
        Self {
            credential: Mutex::new(Some(Credential {
                token: token.to_string(),
                method,
            })),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.credential.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn store(&self, token: &str, method: AuthMethod) -> Result<()> {
        *self.slot() = Some(Credential {
            token: token.to_string(),
            method,
        });
        Ok(())
    }

    fn get(&self) -> Result<Option<Credential>> {
        Ok(self.slot().clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
