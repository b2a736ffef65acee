//! Validated record operations on top of [`Storage`].

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::config::EndTimePolicy;
use crate::error::{Error, Result};
use crate::model::{
    Contraction, FinishContraction, Hospital, HospitalPatch, Message, NewContraction, NewHospital,
};
use crate::storage::Storage;

/// The record API, independent of transport.
///
/// Cheap to clone; clones share one storage connection. Store calls run on
/// Tokio's blocking pool, one at a time.
#[derive(Debug, Clone)]
pub struct RecordService {
    storage: Arc<Mutex<Storage>>,
    end_time_policy: EndTimePolicy,
}

impl RecordService {
    /// Wrap a storage handle.
    #[must_use]
    pub fn new(storage: Storage, end_time_policy: EndTimePolicy) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            end_time_policy,
        }
    }

    /// Run `op` against the store on the blocking pool.
    pub(crate) async fn with_storage<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Storage) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || {
            let mut storage = storage.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut storage)
        })
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?
    }

    /// All contractions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list_contractions(&self) -> Result<Vec<Contraction>> {
        self.with_storage(|storage| storage.list_contractions()).await
    }

    /// Record the start of a contraction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn create_contraction(&self, request: NewContraction) -> Result<Contraction> {
        let created = self
            .with_storage(move |storage| storage.insert_contraction(request.start_time))
            .await?;
        info!("Contraction {} started at {}", created.id, created.start_time);
        Ok(created)
    }

    /// Record the end of a contraction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown ID, a validation error if
    /// the end time is rejected by policy, or an error if the store fails.
    pub async fn finish_contraction(
        &self,
        id: i64,
        request: FinishContraction,
    ) -> Result<Contraction> {
        let policy = self.end_time_policy;
        let finished = self
            .with_storage(move |storage| {
                storage.finish_contraction(id, request.end_time, policy)
            })
            .await?
            .ok_or_else(|| Error::not_found("Contraction", id))?;
        info!(
            "Contraction {} finished, {}s",
            finished.id,
            finished.duration_seconds.unwrap_or_default()
        );
        Ok(finished)
    }

    /// Delete a contraction. Unknown IDs are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn delete_contraction(&self, id: i64) -> Result<Message> {
        if self
            .with_storage(move |storage| storage.delete_contraction(id))
            .await?
        {
            info!("Contraction {} deleted", id);
        }
        Ok(Message::new("Contraction deleted successfully"))
    }

    /// All hospitals, primary first, then by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list_hospitals(&self) -> Result<Vec<Hospital>> {
        self.with_storage(|storage| storage.list_hospitals()).await
    }

    /// Register a hospital.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name or phone number is empty, or
    /// an error if the store fails.
    pub async fn create_hospital(&self, request: NewHospital) -> Result<Hospital> {
        request.validate()?;
        let request = request.normalized();
        let created = self
            .with_storage(move |storage| storage.insert_hospital(&request))
            .await?;
        info!("Hospital {} registered ({})", created.id, created.name);
        Ok(created)
    }

    /// Apply a partial update to a hospital.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty required fields,
    /// [`Error::NotFound`] for an unknown ID, or an error if the store fails.
    pub async fn update_hospital(&self, id: i64, patch: HospitalPatch) -> Result<Hospital> {
        patch.validate()?;
        self.with_storage(move |storage| storage.update_hospital(id, &patch))
            .await?
            .ok_or_else(|| Error::not_found("Hospital", id))
    }

    /// Delete a hospital. Unknown IDs are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn delete_hospital(&self, id: i64) -> Result<Message> {
        if self
            .with_storage(move |storage| storage.delete_hospital(id))
            .await?
        {
            info!("Hospital {} deleted", id);
        }
        Ok(Message::new("Hospital deleted successfully"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn service(policy: EndTimePolicy) -> RecordService {
        RecordService::new(Storage::open_in_memory().unwrap(), policy)
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[tokio::test]
    async fn test_contraction_lifecycle() {
        let service = service(EndTimePolicy::Allow);

        let created = service
            .create_contraction(NewContraction {
                start_time: at(8, 0, 0),
            })
            .await
            .unwrap();
        let finished = service
            .finish_contraction(
                created.id,
                FinishContraction {
                    end_time: at(8, 0, 0) + Duration::milliseconds(45_999),
                },
            )
            .await
            .unwrap();
        assert_eq!(finished.duration_seconds, Some(45));

        let listed = service.list_contractions().await.unwrap();
        assert_eq!(listed, vec![finished]);

        let message = service.delete_contraction(created.id).await.unwrap();
        assert_eq!(message.message, "Contraction deleted successfully");
        assert!(service.list_contractions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finish_unknown_contraction_is_not_found() {
        let service = service(EndTimePolicy::Allow);
        let err = service
            .finish_contraction(77, FinishContraction { end_time: at(8, 0, 0) })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_reject_policy_surfaces_validation_error() {
        let service = service(EndTimePolicy::Reject);
        let created = service
            .create_contraction(NewContraction {
                start_time: at(8, 0, 0),
            })
            .await
            .unwrap();

        let err = service
            .finish_contraction(created.id, FinishContraction { end_time: at(7, 59, 0) })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_delete_unknown_contraction_succeeds() {
        let service = service(EndTimePolicy::Allow);
        let message = service.delete_contraction(12345).await.unwrap();
        assert_eq!(message.message, "Contraction deleted successfully");
    }

    #[tokio::test]
    async fn test_create_hospital_validates() {
        let service = service(EndTimePolicy::Allow);
        let err = service
            .create_hospital(NewHospital::new("", "555"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(service.list_hospitals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_primary_after_create() {
        let service = service(EndTimePolicy::Allow);
        let mut first = NewHospital::new("First", "1");
        first.is_primary = true;
        let mut second = NewHospital::new("Second", "2");
        second.is_primary = true;

        service.create_hospital(first).await.unwrap();
        let second = service.create_hospital(second).await.unwrap();

        let primaries: Vec<_> = service
            .list_hospitals()
            .await
            .unwrap()
            .into_iter()
            .filter(|h| h.is_primary)
            .collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, second.id);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_store_calls_leave_the_runtime_thread() {
        let service = service(EndTimePolicy::Allow);
        let caller = std::thread::current().id();

        let store_thread = service
            .with_storage(|_| Ok(std::thread::current().id()))
            .await
            .unwrap();
        assert_ne!(store_thread, caller);
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_store() {
        let service = service(EndTimePolicy::Allow);
        let creates = (0..8).map(|m| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create_contraction(NewContraction {
                        start_time: at(8, m, 0),
                    })
                    .await
            })
        });
        for handle in creates.collect::<Vec<_>>() {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(service.list_contractions().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_update_unknown_hospital_is_not_found() {
        let service = service(EndTimePolicy::Allow);
        let patch = HospitalPatch {
            name: Some("Renamed".to_string()),
            ..HospitalPatch::default()
        };
        let err = service.update_hospital(5, patch).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
