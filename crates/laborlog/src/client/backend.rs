//! Transport seam between the data hooks and the record API.

use async_trait::async_trait;

use crate::api::RecordService;
use crate::error::Result;
use crate::model::{
    Contraction, FinishContraction, Hospital, HospitalPatch, Message, NewContraction, NewHospital,
};

/// Something that can answer record API calls.
///
/// Implemented by [`HttpBackend`](super::HttpBackend) for a remote server
/// and by [`RecordService`] for in-process use.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// List contractions, newest first.
    async fn list_contractions(&self) -> Result<Vec<Contraction>>;

    /// Create a contraction.
    async fn create_contraction(&self, request: &NewContraction) -> Result<Contraction>;

    /// Set a contraction's end time.
    async fn finish_contraction(&self, id: i64, request: &FinishContraction)
        -> Result<Contraction>;

    /// Delete a contraction.
    async fn delete_contraction(&self, id: i64) -> Result<Message>;

    /// List hospitals, primary first.
    async fn list_hospitals(&self) -> Result<Vec<Hospital>>;

    /// Register a hospital.
    async fn create_hospital(&self, request: &NewHospital) -> Result<Hospital>;

    /// Partially update a hospital.
    async fn update_hospital(&self, id: i64, patch: &HospitalPatch) -> Result<Hospital>;

    /// Delete a hospital.
    async fn delete_hospital(&self, id: i64) -> Result<Message>;
}

#[async_trait]
impl RecordBackend for RecordService {
    async fn list_contractions(&self) -> Result<Vec<Contraction>> {
        RecordService::list_contractions(self).await
    }

    async fn create_contraction(&self, request: &NewContraction) -> Result<Contraction> {
        RecordService::create_contraction(self, request.clone()).await
    }

    async fn finish_contraction(
        &self,
        id: i64,
        request: &FinishContraction,
    ) -> Result<Contraction> {
        RecordService::finish_contraction(self, id, request.clone()).await
    }

    async fn delete_contraction(&self, id: i64) -> Result<Message> {
        RecordService::delete_contraction(self, id).await
    }

    async fn list_hospitals(&self) -> Result<Vec<Hospital>> {
        RecordService::list_hospitals(self).await
    }

    async fn create_hospital(&self, request: &NewHospital) -> Result<Hospital> {
        RecordService::create_hospital(self, request.clone()).await
    }

    async fn update_hospital(&self, id: i64, patch: &HospitalPatch) -> Result<Hospital> {
        RecordService::update_hospital(self, id, patch.clone()).await
    }

    async fn delete_hospital(&self, id: i64) -> Result<Message> {
        RecordService::delete_hospital(self, id).await
    }
}
