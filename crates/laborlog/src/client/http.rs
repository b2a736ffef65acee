//! Record API client over HTTP.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{
    Contraction, FinishContraction, Hospital, HospitalPatch, Message, NewContraction, NewHospital,
};

use super::RecordBackend;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks JSON to a running `laborlog serve`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend for the API rooted at `base_url`, e.g.
    /// `http://localhost:3001/api`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// The API root this backend talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        decode(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!("POST {}", path);
        let response = self.client.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }

    async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!("PUT {}", path);
        let response = self.client.put(self.url(path)).json(body).send().await?;
        decode(response).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("DELETE {}", path);
        let response = self.client.delete(self.url(path)).send().await?;
        decode(response).await
    }
}

/// Decode a success body, or turn an error body into [`Error::Api`].
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RecordBackend for HttpBackend {
    async fn list_contractions(&self) -> Result<Vec<Contraction>> {
        self.get("/contractions").await
    }

    async fn create_contraction(&self, request: &NewContraction) -> Result<Contraction> {
        self.post("/contractions", request).await
    }

    async fn finish_contraction(
        &self,
        id: i64,
        request: &FinishContraction,
    ) -> Result<Contraction> {
        self.put(&format!("/contractions/{id}"), request).await
    }

    async fn delete_contraction(&self, id: i64) -> Result<Message> {
        self.delete(&format!("/contractions/{id}")).await
    }

    async fn list_hospitals(&self) -> Result<Vec<Hospital>> {
        self.get("/hospitals").await
    }

    async fn create_hospital(&self, request: &NewHospital) -> Result<Hospital> {
        self.post("/hospitals", request).await
    }

    async fn update_hospital(&self, id: i64, patch: &HospitalPatch) -> Result<Hospital> {
        self.put(&format!("/hospitals/{id}"), patch).await
    }

    async fn delete_hospital(&self, id: i64) -> Result<Message> {
        self.delete(&format!("/hospitals/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use crate::api::{serve_on, RecordService};
    use crate::config::EndTimePolicy;
    use crate::storage::Storage;

    async fn spawn_server() -> (HttpBackend, oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service =
            RecordService::new(Storage::open_in_memory().unwrap(), EndTimePolicy::Allow);
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(serve_on(listener, service, async {
            let _ = rx.await;
        }));

        (HttpBackend::new(format!("http://{addr}/api/")), tx)
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("http://localhost:3001/api/");
        assert_eq!(backend.base_url(), "http://localhost:3001/api");
        assert_eq!(
            backend.url("/hospitals"),
            "http://localhost:3001/api/hospitals"
        );
    }

    #[tokio::test]
    async fn test_contraction_round_trip_over_http() {
        let (backend, _shutdown) = spawn_server().await;
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let created = backend
            .create_contraction(&NewContraction { start_time: start })
            .await
            .unwrap();
        let finished = backend
            .finish_contraction(
                created.id,
                &FinishContraction {
                    end_time: start + chrono::Duration::seconds(50),
                },
            )
            .await
            .unwrap();
        assert_eq!(finished.duration_seconds, Some(50));

        let listed = backend.list_contractions().await.unwrap();
        assert_eq!(listed, vec![finished]);
    }

    #[tokio::test]
    async fn test_error_body_becomes_api_error() {
        let (backend, _shutdown) = spawn_server().await;

        let err = backend
            .finish_contraction(
                31337,
                &FinishContraction {
                    end_time: Utc::now(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(
            err,
            Error::Api { status: 404, ref message } if message == "Contraction not found"
        ));

        let err = backend
            .create_hospital(&NewHospital::new("St. Mary", ""))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_hospital_calls_over_http() {
        let (backend, _shutdown) = spawn_server().await;

        let created = backend
            .create_hospital(&NewHospital::new("St. Mary", "555-0100"))
            .await
            .unwrap();
        let patch = HospitalPatch {
            is_primary: Some(true),
            ..HospitalPatch::default()
        };
        let updated = backend.update_hospital(created.id, &patch).await.unwrap();
        assert!(updated.is_primary);

        let message = backend.delete_hospital(created.id).await.unwrap();
        assert_eq!(message.message, "Hospital deleted successfully");
        assert!(backend.list_hospitals().await.unwrap().is_empty());
    }
}
