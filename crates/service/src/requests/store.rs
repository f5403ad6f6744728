use std::{cmp::Ordering, collections::HashMap, path::PathBuf, sync::Arc};

use models::{MediaRequest, RequestEdit};

use crate::errors::ServiceError;
use crate::requests::repository::RequestRepository;
use crate::storage::json_map_store::JsonMapStore;

/// File-backed request store: a map of `id -> MediaRequest` mirrored to one JSON document.
#[derive(Clone)]
pub struct RequestStore {
    store: Arc<JsonMapStore<String, MediaRequest>>,
}

impl RequestStore {
    /// Load the store from `path`; a missing or corrupt file yields an empty store.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Arc<Self> {
        let store = JsonMapStore::<String, MediaRequest>::new(path).await;
        Arc::new(Self { store })
    }

    /// Insert or replace by id.
    pub async fn put(&self, request: MediaRequest) {
        self.store.insert(request.id.clone(), request).await;
    }

    pub async fn get(&self, id: &str) -> Option<MediaRequest> {
        self.store.get(&id.to_string()).await
    }

    /// All requests, newest first.
    pub async fn list(&self) -> Vec<MediaRequest> {
        let mut all = self.store.values().await;
        all.sort_by(newest_first);
        all
    }

    /// Requests created by `owner_id`, newest first.
    pub async fn list_by(&self, owner_id: &str) -> Vec<MediaRequest> {
        let mut owned: Vec<MediaRequest> = self
            .store
            .values()
            .await
            .into_iter()
            .filter(|r| r.requested_by == owner_id)
            .collect();
        owned.sort_by(newest_first);
        owned
    }

    pub async fn modify(&self, id: &str, edit: &RequestEdit) -> Option<MediaRequest> {
        self.store.update(&id.to_string(), |r| r.apply(edit)).await
    }

    /// Remove by id; absent ids are a no-op.
    pub async fn delete(&self, id: &str) -> bool {
        self.store.remove(&id.to_string()).await
    }

    /// Copy of the full `id -> request` mapping.
    pub async fn snapshot(&self) -> HashMap<String, MediaRequest> {
        self.store.snapshot().await
    }

    /// Wait for pending write-backs to land.
    pub async fn flush(&self) {
        self.store.flush().await
    }
}

fn newest_first(a: &MediaRequest, b: &MediaRequest) -> Ordering {
    b.requested_date.cmp(&a.requested_date).then_with(|| a.id.cmp(&b.id))
}

#[async_trait::async_trait]
impl RequestRepository for RequestStore {
    async fn put(&self, request: MediaRequest) -> Result<(), ServiceError> { self.put(request).await; Ok(()) }
    async fn get(&self, id: &str) -> Result<Option<MediaRequest>, ServiceError> { Ok(self.get(id).await) }
    async fn list(&self) -> Result<Vec<MediaRequest>, ServiceError> { Ok(self.list().await) }
    async fn list_by(&self, owner_id: &str) -> Result<Vec<MediaRequest>, ServiceError> { Ok(self.list_by(owner_id).await) }
    async fn modify(&self, id: &str, edit: RequestEdit) -> Result<Option<MediaRequest>, ServiceError> { Ok(self.modify(id, &edit).await) }
    async fn delete(&self, id: &str) -> Result<bool, ServiceError> { Ok(self.delete(id).await) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use models::RequestStatus;

    fn data_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("request_store_{}", uuid::Uuid::new_v4()))
            .join("requests.json")
    }

    fn request(id: &str, owner: &str, minutes: i64) -> MediaRequest {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        MediaRequest::new(id.into(), &format!("title {id}"), owner.into(), format!("{owner}-name"), base + Duration::minutes(minutes))
            .expect("valid request")
    }

    fn ids(list: &[MediaRequest]) -> Vec<&str> {
        list.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn list_is_newest_first_with_id_tie_break() {
        let path = data_path();
        let store = RequestStore::open(&path).await;
        store.put(request("b", "u1", 0)).await;
        store.put(request("a", "u2", 0)).await;
        store.put(request("c", "u1", 5)).await;
        store.put(request("d", "u2", -5)).await;

        assert_eq!(ids(&store.list().await), vec!["c", "a", "b", "d"]);
        assert_eq!(ids(&store.list_by("u1").await), vec!["c", "b"]);
        assert!(store.list_by("nobody").await.is_empty());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn put_replaces_and_delete_is_idempotent() {
        let path = data_path();
        let store = RequestStore::open(&path).await;
        let mut r = request("x", "u1", 0);
        store.put(r.clone()).await;
        r.status = RequestStatus::Complete;
        store.put(r.clone()).await;
        assert_eq!(store.get("x").await, Some(r));
        assert_eq!(store.list().await.len(), 1);

        assert!(store.delete("x").await);
        assert!(!store.delete("x").await);
        assert!(store.get("x").await.is_none());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn modify_changes_only_the_edited_field() {
        let path = data_path();
        let store = RequestStore::open(&path).await;
        let original = request("x", "u1", 0);
        store.put(original.clone()).await;

        let updated = store.modify("x", &RequestEdit::Status(RequestStatus::Processing)).await.expect("exists");
        assert_eq!(updated.status, RequestStatus::Processing);
        assert_eq!(updated.title, original.title);
        assert_eq!(updated.requested_by, original.requested_by);
        assert_eq!(updated.requested_date, original.requested_date);
        assert!(store.modify("missing", &RequestEdit::Status(RequestStatus::Complete)).await.is_none());

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_file() {
        let path = data_path();
        let store = RequestStore::open(&path).await;
        let mut noted = request("n", "u2", 3);
        noted.admin_notes = Some("remux".into());
        store.put(request("a", "u1", 1)).await;
        store.put(noted).await;
        store.modify("a", &RequestEdit::Status(RequestStatus::Complete)).await;
        store.flush().await;

        let reopened = RequestStore::open(&path).await;
        assert_eq!(reopened.snapshot().await, store.snapshot().await);
        assert_eq!(reopened.get("n").await.and_then(|r| r.admin_notes).as_deref(), Some("remux"));

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
