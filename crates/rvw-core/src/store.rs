//! File-backed recipient registry.
//!
//! The whole registry is a single JSON array rewritten on every change. Fine
//! for the few thousand subscribers a review digest has; anything larger
//! belongs in a real database behind the same `RecipientDirectory` port.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    directory::RecipientDirectory,
    domain::{ChatId, Recipient},
    utils::iso_timestamp_utc,
    Result,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredRecipient {
    id: ChatId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    registered_at: String,
}

pub struct JsonRecipientStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<ChatId, StoredRecipient>>,
}

impl JsonRecipientStore {
    /// Load the registry at `path`. A missing or blank file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = load_entries(&path)?;
        tracing::info!(
            path = %path.display(),
            recipients = entries.len(),
            "recipient store opened"
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Add `recipient`. Returns `false` when it was already registered; its
    /// label is refreshed either way.
    pub async fn register(&self, recipient: Recipient) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        let added = match next.get_mut(&recipient.id) {
            Some(existing) => {
                if existing.label == recipient.label {
                    return Ok(false);
                }
                existing.label = recipient.label;
                false
            }
            None => {
                next.insert(
                    recipient.id,
                    StoredRecipient {
                        id: recipient.id,
                        label: recipient.label,
                        registered_at: iso_timestamp_utc(),
                    },
                );
                true
            }
        };
        save_entries(&self.path, &next)?;
        *entries = next;
        Ok(added)
    }

    /// Remove `id`. Returns `false` when it was not registered.
    pub async fn unregister(&self, id: ChatId) -> Result<bool> {
        Ok(self.unregister_all(&[id]).await? > 0)
    }

    /// Remove every id in `ids`, persisting once. Returns how many were removed.
    ///
    /// On a failed save the in-memory registry is left untouched, so it never
    /// drifts from what is on disk.
    pub async fn unregister_all(&self, ids: &[ChatId]) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        let removed = ids.iter().filter(|id| next.remove(*id).is_some()).count();
        if removed > 0 {
            save_entries(&self.path, &next)?;
            *entries = next;
        }
        Ok(removed)
    }

    pub async fn contains(&self, id: ChatId) -> bool {
        self.entries.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl RecipientDirectory for JsonRecipientStore {
    async fn all_recipients(&self) -> Result<Vec<Recipient>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .values()
            .map(|e| Recipient {
                id: e.id,
                label: e.label.clone(),
            })
            .collect())
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<ChatId, StoredRecipient>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let txt = std::fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let list: Vec<StoredRecipient> = serde_json::from_str(&txt)?;
    Ok(list.into_iter().map(|r| (r.id, r)).collect())
}

/// Write through a sibling temp file so a crash never leaves a torn registry.
fn save_entries(path: &Path, entries: &BTreeMap<ChatId, StoredRecipient>) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let list: Vec<&StoredRecipient> = entries.values().collect();
    let txt = serde_json::to_string_pretty(&list)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, txt)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
