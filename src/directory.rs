//! Admin user directory: normalization of whatever shape the server returns,
//! plus a local cache of users registered from this client.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    api::{DirectoryListing, DirectorySource, RegistrationForm},
    navigation::Route,
    storage::KeyValueStore,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const USERS_CACHE_KEY: &str = "users";

/// Wrapper keys checked, in order, for the user sequence.
const WRAPPER_KEYS: &[&str] = &["users", "data", "results", "rows", "items"];

const ID_KEYS: &[&str] = &["id", "_id"];
const NAME_KEYS: &[&str] = &["name", "userName", "username", "fullName"];
const EMAIL_KEYS: &[&str] = &["email", "mail", "contact"];
const ROLE_KEYS: &[&str] = &["role", "userRole"];
const LOGIN_TIME_KEYS: &[&str] = &["loginTime", "lastLogin", "loginTimestamp", "last_seen"];
const IMAGE_KEYS: &[&str] = &["image", "avatar", "photo"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: String,
    pub login_time: Option<String>,
    pub image: Option<String>,
}

/// Finds the user sequence in a directory response: a top-level array, the
/// first known wrapper key holding an array (even an empty one), or failing
/// those the first array-valued key.
pub fn normalize_listing(value: &Value) -> Vec<DirectoryUser> {
    let items = match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            // serde_json maps iterate in key order, not response order.
            .or_else(|| map.values().find_map(Value::as_array)),
        _ => None,
    };

    items
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(normalize_user)
                .collect()
        })
        .unwrap_or_default()
}

pub fn normalize_user(item: &Map<String, Value>) -> DirectoryUser {
    let role = first_present(item, ROLE_KEYS).unwrap_or_else(|| {
        if item.get("isAdmin").map(truthy).unwrap_or(false) {
            "admin".to_string()
        } else {
            "user".to_string()
        }
    });

    DirectoryUser {
        id: first_present(item, ID_KEYS),
        name: first_present(item, NAME_KEYS).unwrap_or_default(),
        email: first_present(item, EMAIL_KEYS).unwrap_or_default(),
        role,
        login_time: first_present(item, LOGIN_TIME_KEYS),
        image: first_present(item, IMAGE_KEYS),
    }
}

fn first_present(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(*key))
        .find(|value| truthy(value))
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Users registered from this client, kept so the admin view has something
/// to show when the server directory is unreachable.
#[derive(Clone)]
pub struct RegisteredUserCache {
    backend: Arc<dyn KeyValueStore>,
}

impl RegisteredUserCache {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Cached users; an unreadable cache is empty.
    pub async fn load(&self) -> Vec<DirectoryUser> {
        match self.backend.get(USERS_CACHE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => normalize_listing(&value),
                Err(err) => {
                    log_warn!("Ignoring unreadable user cache: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                log_warn!("Failed to read user cache: {err:#}");
                Vec::new()
            }
        }
    }

    /// Adds or replaces a user, matching on case-insensitive email (or name
    /// when no email is known).
    pub async fn remember(&self, user: DirectoryUser) -> Result<()> {
        let mut users = self.load().await;
        match users.iter_mut().find(|existing| same_user(existing, &user)) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }

        let serialized = serde_json::to_string(&users)?;
        self.backend
            .put(USERS_CACHE_KEY, serialized)
            .await
            .context("failed to write user cache")
    }

    pub async fn remember_registration(&self, form: &RegistrationForm) -> Result<()> {
        self.remember(DirectoryUser {
            id: None,
            name: form.username.clone(),
            email: form.email.clone(),
            role: "user".into(),
            login_time: Some(Utc::now().to_rfc3339()),
            image: form.image.clone(),
        })
        .await
    }
}

fn same_user(lhs: &DirectoryUser, rhs: &DirectoryUser) -> bool {
    if !lhs.email.is_empty() || !rhs.email.is_empty() {
        return lhs.email.eq_ignore_ascii_case(&rhs.email);
    }
    lhs.name == rhs.name
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryView {
    Listed {
        users: Vec<DirectoryUser>,
        /// Set when the list came from the local cache or the server failed.
        notice: Option<String>,
    },
    Redirect(Route),
}

/// Server first; on failure fall back to the local cache with a notice.
pub async fn load_directory(
    source: &dyn DirectorySource,
    cache: &RegisteredUserCache,
) -> DirectoryView {
    match source.list_users().await {
        Ok(DirectoryListing::Users(users)) => {
            log_info!("Loaded {} users from server", users.len());
            DirectoryView::Listed { users, notice: None }
        }
        Ok(DirectoryListing::Redirect(route)) => DirectoryView::Redirect(route),
        Err(err) => {
            log_warn!("Failed to fetch users from server: {err}");
            let cached = cache.load().await;
            let notice = if cached.is_empty() {
                format!("Unable to load users from server: {err}")
            } else {
                format!("{err} (showing local cache)")
            };
            DirectoryView::Listed {
                users: cached,
                notice: Some(notice),
            }
        }
    }
}
