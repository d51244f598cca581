use crate::constants::{PATH_SEP_CHAR, ROOT_PATH};
use crate::core_auth::helper::verify_password;
use crate::core_auth::{AuthOutcome, Authenticator};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;

/// One line of the passwd file: `user:bcrypt_hash:base_path[:initial_path]`.
#[derive(Debug, Clone)]
pub struct PasswdEntry {
    username: String,
    hashed_password: String,
    base_path: String,
    initial_path: String,
}

impl PasswdEntry {
    pub fn from_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 3 || parts.len() > 4 {
            return None;
        }
        if parts[0].is_empty() || parts[1].is_empty() || parts[2].is_empty() {
            return None;
        }

        let entry = PasswdEntry {
            username: parts[0].to_string(),
            hashed_password: parts[1].to_string(),
            base_path: normalize_path(parts[2]),
            initial_path: normalize_path(parts.get(3).copied().unwrap_or(ROOT_PATH)),
        };

        Some(entry)
    }

    pub fn get_hashed_password(&self) -> &str {
        &self.hashed_password
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    pub fn get_base_path(&self) -> &str {
        &self.base_path
    }

    pub fn get_initial_path(&self) -> &str {
        &self.initial_path
    }
}

/// Makes `path` start with `/` and drops trailing separators, except for the root itself.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches(PATH_SEP_CHAR);
    if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else if trimmed.starts_with(PATH_SEP_CHAR) {
        trimmed.to_string()
    } else {
        format!("{}{}", PATH_SEP_CHAR, trimmed)
    }
}

/// Authenticator backed by a bcrypt passwd file.
#[derive(Debug, Default)]
pub struct PasswdAuthenticator {
    entries: HashMap<String, PasswdEntry>,
}

impl PasswdAuthenticator {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read passwd file: {}", path))?;
        let authenticator = Self::parse(&content);
        info!(
            "Loaded {} user(s) from passwd file {}",
            authenticator.entries.len(),
            path
        );
        Ok(authenticator)
    }

    /// Parses passwd content. Blank lines and `#` comments are ignored,
    /// malformed lines are skipped with a warning.
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match PasswdEntry::from_line(line) {
                Some(entry) => {
                    entries.insert(entry.get_username().to_string(), entry);
                }
                None => warn!("Skipping malformed passwd line {}", lineno + 1),
            }
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Authenticator for PasswdAuthenticator {
    fn authenticate(&self, user: &str, password: &str) -> AuthOutcome {
        let Some(entry) = self.entries.get(user) else {
            debug!("Unknown user {:?}", user);
            return AuthOutcome::Denied;
        };

        if !verify_password(password, entry.get_hashed_password()) {
            debug!("Wrong password for user {:?}", user);
            return AuthOutcome::Denied;
        }

        AuthOutcome::Granted {
            base_path: entry.get_base_path().to_string(),
            initial_path: entry.get_initial_path().to_string(),
        }
    }
}
