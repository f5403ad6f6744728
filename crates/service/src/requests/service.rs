use std::sync::Arc;

use chrono::Utc;
use models::{MediaRequest, RequestEdit, RequestStatus};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::caller::Caller;
use crate::errors::ServiceError;
use crate::requests::repository::RequestRepository;

/// Application service encapsulating media request rules.
///
/// Every operation is checked in the same order: privilege, existence, then input.
/// Non-admin callers only ever see their own requests; status, notes and
/// deletion are admin-only.
pub struct RequestService<R: RequestRepository> {
    repo: Arc<R>,
}

impl<R: RequestRepository> RequestService<R> {
    pub fn new(repo: Arc<R>) -> Self { Self { repo } }

    pub fn repository(&self) -> &Arc<R> { &self.repo }

    /// Admins see every request; everyone else sees only their own.
    pub async fn list_visible(&self, caller: &Caller) -> Result<Vec<MediaRequest>, ServiceError> {
        if caller.is_admin {
            self.repo.list().await
        } else {
            self.repo.list_by(&caller.id).await
        }
    }

    /// Create a `Pending` request owned by the caller; returns the new id.
    #[instrument(skip(self, caller), fields(user = %caller.id))]
    pub async fn create(&self, caller: &Caller, title: &str) -> Result<String, ServiceError> {
        let request = MediaRequest::new(
            Uuid::new_v4().to_string(),
            title,
            caller.id.clone(),
            caller.display_name.clone(),
            Utc::now(),
        )?;
        let id = request.id.clone();
        info!(id = %id, title = %request.title, by = %request.requested_by_name, "request created");
        self.repo.put(request).await?;
        Ok(id)
    }

    /// Set the status of an existing request. Any transition is allowed.
    #[instrument(skip(self, caller), fields(user = %caller.id))]
    pub async fn update_status(&self, caller: &Caller, id: &str, status: &str) -> Result<(), ServiceError> {
        self.require_admin(caller, "status update")?;
        if self.repo.get(id).await?.is_none() {
            return Err(ServiceError::not_found("request"));
        }
        let status: RequestStatus = status.parse()?;
        self.repo
            .modify(id, RequestEdit::Status(status))
            .await?
            .ok_or_else(|| ServiceError::not_found("request"))?;
        info!(id = %id, status = %status, "request status updated");
        Ok(())
    }

    /// Replace the admin notes of an existing request; blank notes clear them.
    #[instrument(skip(self, caller, notes), fields(user = %caller.id))]
    pub async fn update_notes(&self, caller: &Caller, id: &str, notes: Option<String>) -> Result<(), ServiceError> {
        self.require_admin(caller, "notes update")?;
        self.repo
            .modify(id, RequestEdit::Notes(notes))
            .await?
            .ok_or_else(|| ServiceError::not_found("request"))?;
        info!(id = %id, "request notes updated");
        Ok(())
    }

    #[instrument(skip(self, caller), fields(user = %caller.id))]
    pub async fn delete(&self, caller: &Caller, id: &str) -> Result<(), ServiceError> {
        self.require_admin(caller, "delete")?;
        if self.repo.get(id).await?.is_none() {
            return Err(ServiceError::not_found("request"));
        }
        if !self.repo.delete(id).await? {
            // removed concurrently between the check and the delete
            return Err(ServiceError::not_found("request"));
        }
        info!(id = %id, "request deleted");
        Ok(())
    }

    fn require_admin(&self, caller: &Caller, action: &str) -> Result<(), ServiceError> {
        if caller.is_admin {
            return Ok(());
        }
        warn!(user = %caller.id, action, "non-admin caller rejected");
        Err(ServiceError::admin_only(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::requests::store::RequestStore;

    async fn setup() -> (RequestService<RequestStore>, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("request_service_{}", Uuid::new_v4()));
        let store = RequestStore::open(dir.join("requests.json")).await;
        (RequestService::new(store), dir)
    }

    fn admin() -> Caller { Caller::admin("admin-1", "Admin") }
    fn alice() -> Caller { Caller::user("alice-1", "alice") }
    fn bob() -> Caller { Caller::user("bob-1", "bob") }

    #[tokio::test]
    async fn create_starts_pending_with_unique_ids() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        let mut seen = HashSet::new();
        for i in 0..20 {
            let id = svc.create(&alice(), &format!("movie {i}")).await?;
            assert!(seen.insert(id));
        }
        let all = svc.list_visible(&admin()).await?;
        assert_eq!(all.len(), 20);
        for r in &all {
            assert_eq!(r.status, RequestStatus::Pending);
            assert_eq!(r.requested_by, "alice-1");
            assert_eq!(r.requested_by_name, "alice");
        }
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn blank_title_rejected_without_mutation() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        for title in ["", "   ", "\t"] {
            let err = svc.create(&alice(), title).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
        assert!(svc.list_visible(&admin()).await?.is_empty());
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn non_admin_sees_only_own_requests() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        svc.create(&alice(), "Dune").await?;
        svc.create(&bob(), "Arrival").await?;
        svc.create(&alice(), "Heat").await?;
        svc.create(&admin(), "Alien").await?;

        let mine = svc.list_visible(&alice()).await?;
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.requested_by == "alice-1"));

        let all = svc.list_visible(&admin()).await?;
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].requested_date >= w[1].requested_date));
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn non_admin_mutations_forbidden_and_store_unchanged() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        let id = svc.create(&alice(), "Dune").await?;
        let before = svc.repository().snapshot().await;

        for target in [id.as_str(), "does-not-exist"] {
            let err = svc.update_status(&alice(), target, "Complete").await.unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
            let err = svc.update_notes(&alice(), target, Some("x".into())).await.unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
            let err = svc.delete(&alice(), target).await.unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }
        assert_eq!(svc.repository().snapshot().await, before);
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn unknown_id_is_not_found_for_admin() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        let err = svc.update_status(&admin(), "nope", "Complete").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        // existence is checked before the status value
        let err = svc.update_status(&admin(), "nope", "bogus").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = svc.update_notes(&admin(), "nope", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = svc.delete(&admin(), "nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn invalid_status_is_validation_error() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        let id = svc.create(&alice(), "Dune").await?;
        for bad in ["", "Done", "7"] {
            let err = svc.update_status(&admin(), &id, bad).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
        let stored = svc.repository().get(&id).await.expect("exists");
        assert_eq!(stored.status, RequestStatus::Pending);
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn admin_may_move_status_in_any_direction() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        let id = svc.create(&alice(), "Dune").await?;
        for status in ["Complete", "Pending", "processing", "2"] {
            svc.update_status(&admin(), &id, status).await?;
        }
        let stored = svc.repository().get(&id).await.expect("exists");
        assert_eq!(stored.status, RequestStatus::Complete);
        assert_eq!(stored.title, "Dune");
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn admin_notes_set_and_cleared() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        let id = svc.create(&alice(), "Dune").await?;
        svc.update_notes(&admin(), &id, Some(" 4K remaster ".into())).await?;
        assert_eq!(svc.repository().get(&id).await.and_then(|r| r.admin_notes).as_deref(), Some("4K remaster"));
        svc.update_notes(&admin(), &id, None).await?;
        assert!(svc.repository().get(&id).await.and_then(|r| r.admin_notes).is_none());
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn triage_scenario() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        let a = svc.create(&admin(), "Dune").await?;
        let b = svc.create(&bob(), "Arrival").await?;

        let bobs = svc.list_visible(&bob()).await?;
        assert_eq!(bobs.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), vec![b.clone()]);
        assert_eq!(svc.list_visible(&admin()).await?.len(), 2);

        svc.update_status(&admin(), &a, "Processing").await?;
        svc.update_status(&admin(), &a, "Complete").await?;
        svc.delete(&admin(), &b).await?;

        let fin = svc.list_visible(&admin()).await?;
        assert_eq!(fin.len(), 1);
        assert_eq!(fin[0].id, a);
        assert_eq!(fin[0].status, RequestStatus::Complete);

        // the file converges to the same state
        svc.repository().flush().await;
        let reopened = RequestStore::open(dir.join("requests.json")).await;
        assert_eq!(reopened.snapshot().await, svc.repository().snapshot().await);
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_from_many_callers_are_all_persisted() -> Result<(), anyhow::Error> {
        let (svc, dir) = setup().await;
        let svc = Arc::new(svc);
        let mut handles = Vec::new();
        for n in 0..12 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                let caller = Caller::user(format!("user-{n}"), format!("user {n}"));
                let mut ids = Vec::new();
                for i in 0..10 {
                    ids.push(svc.create(&caller, &format!("title {n}/{i}")).await?);
                }
                Ok::<_, ServiceError>(ids)
            }));
        }
        let mut created = HashSet::new();
        for h in handles {
            created.extend(h.await??);
        }
        assert_eq!(created.len(), 120);

        svc.repository().flush().await;
        let reopened = RequestStore::open(dir.join("requests.json")).await;
        let on_disk = reopened.snapshot().await;
        assert_eq!(on_disk.len(), 120);
        assert!(created.iter().all(|id| on_disk.contains_key(id)));
        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }
}
