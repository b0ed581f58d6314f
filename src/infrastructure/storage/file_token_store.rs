use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{StoreError, TokenStore};
use crate::domain::oauth::TokenRecord;

/// JSON files under a per-user directory, one file per application key.
/// Files hold long-lived refresh tokens and are written owner-only.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn token_path(&self, app_key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", normalize_key(app_key)))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.base_dir, fs::Permissions::from_mode(0o700))?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, app_key: &str, record: &TokenRecord) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let path = self.token_path(app_key);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(app_key = %app_key, path = %path.display(), "Token record saved");
        Ok(())
    }

    fn load(&self, app_key: &str) -> Result<Option<TokenRecord>, StoreError> {
        let path = self.token_path(app_key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice::<TokenRecord>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                tracing::warn!(
                    app_key = %app_key,
                    path = %path.display(),
                    error = %err,
                    "Ignoring unreadable token file"
                );
                Ok(None)
            }
        }
    }

    fn clear(&self, app_key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.token_path(app_key)) {
            Ok(()) => {
                tracing::debug!(app_key = %app_key, "Token record cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

fn normalize_key(app_key: &str) -> String {
    let cleaned: String = app_key
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}
