use std::{
    ffi::OsString,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use secrecy::{ExposeSecret, SecretString};

/// Supplies the bearer credential that gates every store operation.
pub trait AuthProvider: Send + Sync {
    fn token(&self) -> Option<SecretString>;

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

/// Session-scoped credential holder, optionally mirrored to a token file so a
/// later session starts signed in.
pub struct SessionAuth {
    token: RwLock<Option<SecretString>>,
    token_file: Option<PathBuf>,
}

impl std::fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuth")
            .field("token", &"[REDACTED]")
            .field("token_file", &self.token_file)
            .finish()
    }
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionAuth {
    pub fn new() -> Self {
        Self {
            token: RwLock::new(None),
            token_file: None,
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let auth = Self::new();
        auth.replace(normalize(token.into()));
        auth
    }

    /// Opens a holder backed by `path`, reading an existing token if one was saved.
    pub fn persisted(path: PathBuf) -> io::Result<Self> {
        let token = match fs::read_to_string(&path) {
            Ok(contents) => normalize(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(err),
        };
        Ok(Self {
            token: RwLock::new(token.map(SecretString::from)),
            token_file: Some(path),
        })
    }

    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    pub fn set_token(&self, token: impl Into<String>) -> io::Result<()> {
        let token = normalize(token.into());
        if let Some(path) = &self.token_file {
            match &token {
                Some(value) => write_token(path, value)?,
                None => remove_if_exists(path)?,
            }
        }
        self.replace(token);
        Ok(())
    }

    pub fn clear_token(&self) -> io::Result<()> {
        if let Some(path) = &self.token_file {
            remove_if_exists(path)?;
        }
        self.replace(None);
        Ok(())
    }

    fn replace(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *guard = token.map(SecretString::from);
    }
}

impl AuthProvider for SessionAuth {
    fn token(&self) -> Option<SecretString> {
        let guard = self.token.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .map(|secret| SecretString::from(secret.expose_secret().to_owned()))
    }
}

fn normalize(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Replaces the token file through a sibling temp file readable only by the owner.
fn write_token(path: &Path, token: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    remove_if_exists(&tmp)?;
    let written = create_private(&tmp).and_then(|mut file| {
        file.write_all(token.as_bytes())?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    fs::rename(&tmp, path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
