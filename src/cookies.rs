use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Cookie names a logged-in KoG browser session is identified by.
pub const SESSION_COOKIE_NAMES: [&str; 2] = ["PHPSESSID", "cf_clearance"];

/// Cookie name to value, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieSet(BTreeMap<String, String>);

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keeps only the cookies that identify a session.
    pub fn session_only<I, K, V>(cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::new();
        for (name, value) in cookies {
            let name = name.into();
            if SESSION_COOKIE_NAMES.contains(&name.as_str()) {
                set.insert(name, value);
            }
        }
        set
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CookieSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// JSON file holding a [`CookieSet`] between runs.
pub struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored cookies. A missing file is not an error.
    pub async fn load(&self) -> Result<Option<CookieSet>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let cookies: CookieSet = serde_json::from_str(&content)?;
        Ok(Some(cookies))
    }

    pub async fn save(&self, cookies: &CookieSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string(cookies)?;

        // Atomic write: write to tmp then rename
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }
}
