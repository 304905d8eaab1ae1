//! In-process blob store.
//!
//! Stands in for the database when none is configured, the way the browser
//! fell back to local storage. Contents are lost on restart.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Blob store held in process memory.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    entries: Arc<RwLock<BTreeMap<(String, String), String>>>,
}

impl MemoryBlobStore {
    pub(super) async fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .get(&(namespace.to_owned(), key.to_owned()))
            .cloned()
    }

    pub(super) async fn set(&self, namespace: &str, key: &str, value: &str) {
        self.entries
            .write()
            .await
            .insert((namespace.to_owned(), key.to_owned()), value.to_owned());
    }

    pub(super) async fn delete(&self, namespace: &str, key: &str) -> bool {
        self.entries
            .write()
            .await
            .remove(&(namespace.to_owned(), key.to_owned()))
            .is_some()
    }

    pub(super) async fn list(&self, namespace: &str, prefix: &str) -> Vec<String> {
        let start = (namespace.to_owned(), prefix.to_owned());
        self.entries
            .read()
            .await
            .range(start..)
            .take_while(|((ns, key), _)| ns == namespace && key.starts_with(prefix))
            .map(|((_, key), _)| key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryBlobStore::default();
        assert_eq!(store.get("shared", "a").await, None);

        store.set("shared", "a", "1").await;
        store.set("shared", "a", "2").await;
        assert_eq!(store.get("shared", "a").await.as_deref(), Some("2"));

        assert!(store.delete("shared", "a").await);
        assert!(!store.delete("shared", "a").await);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = MemoryBlobStore::default();
        store.set("user:1", "user-trades", "[]").await;
        assert_eq!(store.get("user:2", "user-trades").await, None);
        assert_eq!(store.get("shared", "user-trades").await, None);
    }

    #[tokio::test]
    async fn test_list_by_prefix_stays_in_namespace() {
        let store = MemoryBlobStore::default();
        for key in ["notes-b", "notes-a", "other"] {
            store.set("user:1", key, "x").await;
        }
        store.set("user:10", "notes-z", "x").await;
        store.set("user:2", "notes-c", "x").await;

        assert_eq!(store.list("user:1", "notes-").await, vec!["notes-a", "notes-b"]);
        assert_eq!(store.list("user:1", "").await.len(), 3);
    }
}
