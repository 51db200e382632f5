//! Local user store behind sign-in and sign-up
//!
//! Users live in a JSON array of `{name, lastname, email}` objects that is
//! read and rewritten wholesale. A missing or unreadable file is an empty
//! store. Entries that fail validation are dropped at load time, and a lone
//! object (rather than an array) is accepted as a one-user list.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default user store location, relative to the working directory
pub const DEFAULT_USERS_FILE: &str = "users.json";

/// Errors from user store operations
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("please fill in the {0} field")]
    MissingField(&'static str),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("{0} is already registered, sign in instead")]
    AlreadyExists(String),

    #[error("{0} is not registered, sign up first")]
    NotFound(String),

    #[error("failed to write user store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A validated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub lastname: String,
    pub email: String,
}

impl UserRecord {
    /// Validate and normalise user fields
    pub fn new(name: &str, lastname: &str, email: &str) -> Result<Self, UserStoreError> {
        let name = required("name", name)?;
        let lastname = required("last name", lastname)?;
        let email = required("email", email)?;
        if !is_plausible_email(&email) {
            return Err(UserStoreError::InvalidEmail(email));
        }
        Ok(Self {
            name,
            lastname,
            email,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.lastname)
    }
}

/// Shape accepted at the JSON boundary before validation
#[derive(Debug, Deserialize)]
struct RawUser {
    name: Option<String>,
    lastname: Option<String>,
    email: Option<String>,
}

/// Flat-file user store
#[derive(Debug)]
pub struct UserStore {
    path: PathBuf,
    users: Vec<UserRecord>,
}

impl UserStore {
    /// Load the store, treating a missing or malformed file as empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let users = load_users(&path);
        debug!(path = %path.display(), users = users.len(), "User store loaded");
        Self { path, users }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn find(&self, email: &str) -> Option<&UserRecord> {
        let email = email.trim();
        self.users.iter().find(|u| u.email == email)
    }

    /// Register a new user and persist the store
    pub fn sign_up(
        &mut self,
        name: &str,
        lastname: &str,
        email: &str,
    ) -> Result<&UserRecord, UserStoreError> {
        let record = UserRecord::new(name, lastname, email)?;
        if self.find(&record.email).is_some() {
            return Err(UserStoreError::AlreadyExists(record.email));
        }

        self.users.push(record);
        if let Err(e) = self.save() {
            self.users.pop();
            return Err(e);
        }
        Ok(&self.users[self.users.len() - 1])
    }

    /// Look up a registered user by email
    pub fn sign_in(&self, email: &str) -> Result<&UserRecord, UserStoreError> {
        let email = required("email", email)?;
        self.find(&email).ok_or(UserStoreError::NotFound(email))
    }

    fn save(&self) -> Result<(), UserStoreError> {
        let io_err = |source: std::io::Error| UserStoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&self.users)
            .map_err(|e| io_err(std::io::Error::other(e)))?;
        fs::write(&self.path, content).map_err(io_err)
    }
}

fn load_users(path: &Path) -> Vec<UserRecord> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No readable user store, starting empty");
            return Vec::new();
        }
    };

    let entries = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => items,
        Ok(obj @ Value::Object(_)) => vec![obj],
        Ok(_) | Err(_) => {
            warn!(path = %path.display(), "User store is malformed, treating it as empty");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| match parse_entry(entry) {
            Ok(user) => Some(user),
            Err(reason) => {
                warn!(path = %path.display(), index = idx, reason = %reason, "Dropping invalid user entry");
                None
            }
        })
        .collect()
}

fn parse_entry(entry: Value) -> Result<UserRecord, String> {
    let raw: RawUser = serde_json::from_value(entry).map_err(|e| e.to_string())?;
    UserRecord::new(
        raw.name.as_deref().unwrap_or_default(),
        raw.lastname.as_deref().unwrap_or_default(),
        raw.email.as_deref().unwrap_or_default(),
    )
    .map_err(|e| e.to_string())
}

fn required(field: &'static str, value: &str) -> Result<String, UserStoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UserStoreError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn is_plausible_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}
