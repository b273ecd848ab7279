//! Durable key-value state: settings, the user snapshot, and per-lesson records.

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Settings, API_KEY_SETTING, MODEL_SETTING};
use crate::domain::LessonRecord;
use crate::error::StoreError;
use crate::progress::User;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

pub const USER_PROGRESS_KEY: &str = "user-progress";
pub const LESSON_PROGRESS_KEY: &str = "lesson-progress";

/// String values under string keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Typed load/save over a `KeyValueStore`.
#[derive(Debug, Clone)]
pub struct ProgressStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw).await
    }

    /// The saved snapshot, or a fresh one when nothing is stored or the stored blob is unreadable.
    pub async fn load_user(&self) -> Result<User, StoreError> {
        match self.load_json::<User>(USER_PROGRESS_KEY).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                info!("no saved progress; starting fresh");
                Ok(User::default())
            }
            Err(StoreError::Serde(e)) => {
                warn!(error = %e, "saved progress is corrupt; starting fresh");
                Ok(User::default())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.save_json(USER_PROGRESS_KEY, user).await
    }

    pub async fn load_settings(&self) -> Result<Settings, StoreError> {
        let read = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(Settings {
            api_key: read(self.store.get(API_KEY_SETTING).await?),
            model: read(self.store.get(MODEL_SETTING).await?),
        })
    }

    pub async fn save_api_key(&self, key: &str) -> Result<(), StoreError> {
        self.store.set(API_KEY_SETTING, key.trim()).await
    }

    pub async fn clear_api_key(&self) -> Result<(), StoreError> {
        self.store.remove(API_KEY_SETTING).await
    }

    pub async fn save_model(&self, model: &str) -> Result<(), StoreError> {
        self.store.set(MODEL_SETTING, model.trim()).await
    }

    /// Completion records keyed by lesson id. Unreadable records are treated as empty.
    pub async fn load_lesson_records(&self) -> Result<BTreeMap<String, LessonRecord>, StoreError> {
        match self
            .load_json::<BTreeMap<String, LessonRecord>>(LESSON_PROGRESS_KEY)
            .await
        {
            Ok(records) => Ok(records.unwrap_or_default()),
            Err(StoreError::Serde(e)) => {
                warn!(error = %e, "saved lesson records are corrupt; ignoring them");
                Ok(BTreeMap::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Insert or replace the record for its lesson.
    pub async fn record_lesson(&self, record: LessonRecord) -> Result<(), StoreError> {
        let mut records = self.load_lesson_records().await?;
        records.insert(record.lesson_id.clone(), record);
        self.save_json(LESSON_PROGRESS_KEY, &records).await
    }
}
