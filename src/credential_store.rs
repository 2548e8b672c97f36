//! Credential profile storage.
//!
//! Profiles live as one JSON array under a single key of a flat key-value
//! store, mirroring how the browser dashboard kept them in local storage.
//! `FileStore` persists that key-value map to disk; `MemoryStore` is used in
//! tests.

use crate::credential_models::*;
use crate::errors::{AppError, ResultExt};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Storage key holding the serialized profile list.
pub const API_KEYS_STORAGE_KEY: &str = "rapidapi_keys";
/// Storage key used by the single-key format that predates profiles.
pub const LEGACY_API_KEY_STORAGE_KEY: &str = "rapidapi_key";

const DEFAULT_KEY_NAME: &str = "Default API Key";
const DEFAULT_CREDITS_PER_MONTH: u64 = 10_000;
const DEFAULT_RPM_LIMIT: u32 = 10;

/// Minimal string key-value storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), AppError>;
    fn remove(&mut self, key: &str) -> Result<(), AppError>;
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Key-value map persisted as a JSON object in a single file.
///
/// The whole map is rewritten on every mutation via a temp file and rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        tracing::debug!(
            "Opened credential file {} ({} entries)",
            path.display(),
            entries.len()
        );
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let body = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Store shared between request handlers; the mutex serializes read-modify-write cycles.
pub type SharedCredentialStore = Arc<Mutex<CredentialStore>>;

/// Runs a mutation while holding the lock, off the async workers.
///
/// `FileStore` rewrites its file on every write, so mutations go through the
/// blocking pool instead of stalling the runtime.
pub async fn mutate<T, F>(store: &SharedCredentialStore, f: F) -> Result<T, AppError>
where
    F: FnOnce(&mut CredentialStore) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let mut guard = store.clone().lock_owned().await;
    tokio::task::spawn_blocking(move || f(&mut guard))
        .await
        .map_err(|e| AppError::InternalError(format!("credential store task failed: {}", e)))?
}

/// CRUD over the list of API key profiles.
pub struct CredentialStore {
    backend: Box<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn into_shared(self) -> SharedCredentialStore {
        Arc::new(Mutex::new(self))
    }

    /// All stored profiles. Missing or unreadable data yields an empty list.
    pub fn list(&self) -> Vec<ApiKeyProfile> {
        let Some(raw) = self.backend.get(API_KEYS_STORAGE_KEY) else {
            return Vec::new();
        };

        match serde_json::from_str(&raw) {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::error!("Error retrieving API keys: {}", e);
                Vec::new()
            }
        }
    }

    fn save_all(&mut self, profiles: &[ApiKeyProfile]) -> Result<(), AppError> {
        let raw = serde_json::to_string(profiles)?;
        self.backend
            .set(API_KEYS_STORAGE_KEY, raw)
            .context("saving API keys")
    }

    pub fn get(&self, id: &str) -> Option<ApiKeyProfile> {
        self.list().into_iter().find(|p| p.id == id)
    }

    pub fn add(&mut self, input: NewApiKey) -> Result<ApiKeyProfile, AppError> {
        if !validate_api_key(&input.api_key) {
            return Err(AppError::BadRequest(format!(
                "API key must be at least {} characters",
                MIN_API_KEY_LEN
            )));
        }
        if input.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }

        let now = Utc::now();
        let profile = ApiKeyProfile {
            id: generate_id(),
            name: input.name.trim().to_string(),
            host: input.host.trim().to_string(),
            api_key: input.api_key.trim().to_string(),
            credits_per_month: input.credits_per_month,
            credits_used: 0,
            rpm_limit: input.rpm_limit.filter(|l| *l > 0),
            is_active: input.is_active,
            service_type: input.service_type,
            created_at: now,
            updated_at: now,
        };

        let mut profiles = self.list();
        profiles.push(profile.clone());
        self.save_all(&profiles)?;

        tracing::info!(
            "Added API key profile {} ({}) for {}",
            profile.id,
            profile.name,
            profile.host
        );
        Ok(profile)
    }

    pub fn update(&mut self, id: &str, update: ApiKeyUpdate) -> Result<ApiKeyProfile, AppError> {
        let mut profiles = self.list();
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("API key {} not found", id)))?;

        if let Some(secret) = update.api_key.as_deref() {
            let secret = secret.trim();
            if !secret.is_empty() {
                if !validate_api_key(secret) {
                    return Err(AppError::BadRequest(format!(
                        "API key must be at least {} characters",
                        MIN_API_KEY_LEN
                    )));
                }
                profile.api_key = secret.to_string();
            }
        }
        if let Some(name) = update.name {
            profile.name = name;
        }
        if let Some(host) = update.host {
            profile.host = host.trim().to_string();
        }
        if let Some(per_month) = update.credits_per_month {
            profile.credits_per_month = per_month;
        }
        if let Some(used) = update.credits_used {
            profile.credits_used = used.max(0) as u64;
        }
        if let Some(limit) = update.rpm_limit {
            profile.rpm_limit = limit.filter(|l| *l > 0);
        }
        if let Some(active) = update.is_active {
            profile.is_active = active;
        }
        if update.service_type.is_some() {
            profile.service_type = update.service_type;
        }
        profile.updated_at = Utc::now();

        let updated = profile.clone();
        self.save_all(&profiles)?;
        tracing::debug!("Updated API key profile {}", id);
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), AppError> {
        let profiles = self.list();
        let remaining: Vec<ApiKeyProfile> =
            profiles.iter().filter(|p| p.id != id).cloned().collect();

        if remaining.len() == profiles.len() {
            return Err(AppError::NotFound(format!("API key {} not found", id)));
        }

        self.save_all(&remaining)?;
        tracing::info!("Deleted API key profile {}", id);
        Ok(())
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> Result<ApiKeyProfile, AppError> {
        self.update(
            id,
            ApiKeyUpdate {
                is_active: Some(active),
                ..Default::default()
            },
        )
    }

    pub fn toggle_active(&mut self, id: &str) -> Result<ApiKeyProfile, AppError> {
        let current = self
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("API key {} not found", id)))?;
        self.set_active(id, !current.is_active)
    }

    /// Soft-disables every profile; nothing is removed.
    pub fn deactivate_all(&mut self) -> Result<usize, AppError> {
        let mut profiles = self.list();
        let now = Utc::now();
        let mut changed = 0;
        for profile in profiles.iter_mut().filter(|p| p.is_active) {
            profile.is_active = false;
            profile.updated_at = now;
            changed += 1;
        }
        self.save_all(&profiles)?;
        Ok(changed)
    }

    /// Overwrites the usage counter; negative values are clamped to zero.
    pub fn update_credits_used(&mut self, id: &str, credits_used: i64) -> Result<(), AppError> {
        let mut profiles = self.list();
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("API key {} not found", id)))?;

        profile.credits_used = credits_used.max(0) as u64;
        profile.updated_at = Utc::now();
        self.save_all(&profiles)
    }

    /// Adds one request to the usage counter. Quota is never enforced here.
    pub fn record_usage(&mut self, id: &str) -> Result<(), AppError> {
        let used = self
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("API key {} not found", id)))?
            .credits_used;
        self.update_credits_used(id, used.saturating_add(1).min(i64::MAX as u64) as i64)
    }

    pub fn by_service(&self, service: ServiceType) -> Vec<ApiKeyProfile> {
        self.list()
            .into_iter()
            .filter(|p| p.service_type() == service)
            .collect()
    }

    pub fn active_for(&self, service: ServiceType) -> Option<ApiKeyProfile> {
        self.by_service(service).into_iter().find(|p| p.is_active)
    }

    pub fn has_active_for(&self, service: ServiceType) -> bool {
        self.active_for(service).is_some()
    }

    pub fn has_any_active(&self) -> bool {
        self.list().iter().any(|p| p.is_active)
    }

    /// Secret of the first active profile, regardless of service.
    pub fn first_active_secret(&self) -> Option<String> {
        self.list()
            .into_iter()
            .find(|p| p.is_active)
            .map(|p| p.api_key)
    }

    pub fn summary(&self) -> ApiKeySummary {
        ApiKeySummary::from_profiles(&self.list())
    }

    /// Converts a legacy single key into a default profile when no profiles exist.
    ///
    /// Returns the created profile, if any.
    pub fn migrate_legacy(&mut self) -> Result<Option<ApiKeyProfile>, AppError> {
        let Some(old_key) = self.backend.get(LEGACY_API_KEY_STORAGE_KEY) else {
            return Ok(None);
        };
        if !validate_api_key(&old_key) || !self.list().is_empty() {
            return Ok(None);
        }

        let profile = self.add(default_profile(&old_key, Some(DEFAULT_RPM_LIMIT)))?;
        self.backend.remove(LEGACY_API_KEY_STORAGE_KEY)?;
        tracing::info!("Migrated legacy API key into profile {}", profile.id);
        Ok(Some(profile))
    }

    /// Single-key save: replaces the secret of the first active profile, or
    /// creates a default profile when none is active.
    pub fn save_default_key(&mut self, secret: &str) -> Result<ApiKeyProfile, AppError> {
        if !validate_api_key(secret) {
            return Err(AppError::BadRequest(format!(
                "API key must be at least {} characters",
                MIN_API_KEY_LEN
            )));
        }

        let active = self.list().into_iter().find(|p| p.is_active);
        match active {
            Some(profile) => self.update(
                &profile.id,
                ApiKeyUpdate {
                    api_key: Some(secret.trim().to_string()),
                    ..Default::default()
                },
            ),
            None => self.add(default_profile(secret, None)),
        }
    }
}

fn default_profile(secret: &str, rpm_limit: Option<u32>) -> NewApiKey {
    NewApiKey {
        name: DEFAULT_KEY_NAME.to_string(),
        host: DEFAULT_JOB_SEARCH_HOST.to_string(),
        api_key: secret.trim().to_string(),
        credits_per_month: DEFAULT_CREDITS_PER_MONTH,
        rpm_limit,
        is_active: true,
        service_type: None,
    }
}

/// `key_<unix millis>_<9 lowercase alphanumerics>`
fn generate_id() -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("key_{}_{}", Utc::now().timestamp_millis(), suffix)
}
