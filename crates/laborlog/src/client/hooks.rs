//! Client-side views of the record lists.
//!
//! Each view keeps the last list it saw, applies its own successful
//! mutations locally, and tracks how many calls are in flight. Every call
//! returns its own `Result`; nothing is stashed for later inspection.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::Result;
use crate::intervals::{self, Interval};
use crate::model::{
    Contraction, FinishContraction, Hospital, HospitalPatch, Message, NewContraction, NewHospital,
};

use super::RecordBackend;

#[derive(Debug)]
struct ListState<T> {
    items: Vec<T>,
    in_flight: usize,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            in_flight: 0,
        }
    }
}

/// Shared list plus loading counter behind a mutex.
#[derive(Debug)]
struct Tracked<T> {
    state: Mutex<ListState<T>>,
}

impl<T: Clone> Tracked<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(ListState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState<T>> {
        // A panic while holding the lock leaves the list intact.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn begin(&self) -> InFlight<'_, T> {
        self.lock().in_flight += 1;
        InFlight { tracked: self }
    }

    fn snapshot(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }
}

/// Decrements the in-flight count when the call finishes, however it ends.
struct InFlight<'a, T> {
    tracked: &'a Tracked<T>,
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        let mut state = self
            .tracked
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// The contraction list as seen by a client.
#[derive(Debug)]
pub struct ContractionLog<B> {
    backend: B,
    tracked: Tracked<Contraction>,
}

impl<B: RecordBackend> ContractionLog<B> {
    /// An empty log backed by `backend`. Call [`refresh`](Self::refresh) to
    /// load it.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tracked: Tracked::new(),
        }
    }

    /// The backend this log talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replace the local list with the server's.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is left as it was.
    pub async fn refresh(&self) -> Result<()> {
        let _loading = self.tracked.begin();
        let fetched = self.backend.list_contractions().await.map_err(|e| {
            warn!("Failed to fetch contractions: {}", e);
            e
        })?;
        self.tracked.lock().items = fetched;
        Ok(())
    }

    /// Start a contraction and put it at the front of the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is unchanged.
    pub async fn add(&self, start_time: DateTime<Utc>) -> Result<Contraction> {
        let _loading = self.tracked.begin();
        let created = self
            .backend
            .create_contraction(&NewContraction { start_time })
            .await?;
        self.tracked.lock().items.insert(0, created.clone());
        Ok(created)
    }

    /// Finish a contraction and replace it in the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is unchanged.
    pub async fn finish(&self, id: i64, end_time: DateTime<Utc>) -> Result<Contraction> {
        let _loading = self.tracked.begin();
        let updated = self
            .backend
            .finish_contraction(id, &FinishContraction { end_time })
            .await?;
        let mut state = self.tracked.lock();
        if let Some(slot) = state.items.iter_mut().find(|c| c.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    /// Delete a contraction and drop it from the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is unchanged.
    pub async fn delete(&self, id: i64) -> Result<Message> {
        let _loading = self.tracked.begin();
        let message = self.backend.delete_contraction(id).await?;
        self.tracked.lock().items.retain(|c| c.id != id);
        Ok(message)
    }

    /// Snapshot of the current list, newest first.
    pub fn contractions(&self) -> Vec<Contraction> {
        self.tracked.snapshot()
    }

    /// The newest contraction that has not ended yet.
    pub fn in_progress(&self) -> Option<Contraction> {
        self.tracked
            .lock()
            .items
            .iter()
            .filter(|c| c.is_in_progress())
            .max_by_key(|c| c.start_time)
            .cloned()
    }

    /// Whether any call is still in flight.
    pub fn is_loading(&self) -> bool {
        self.tracked.is_loading()
    }

    /// Intervals between consecutive contractions in the current list.
    pub fn intervals(&self) -> Vec<Interval> {
        intervals::intervals(&self.tracked.lock().items)
    }

    /// The most recent interval, if any.
    pub fn latest_interval(&self) -> Option<Interval> {
        intervals::latest_interval(&self.tracked.lock().items)
    }
}

/// The hospital list as seen by a client.
#[derive(Debug)]
pub struct HospitalDirectory<B> {
    backend: B,
    tracked: Tracked<Hospital>,
}

impl<B: RecordBackend> HospitalDirectory<B> {
    /// An empty directory backed by `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            tracked: Tracked::new(),
        }
    }

    /// Replace the local list with the server's.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is left as it was.
    pub async fn refresh(&self) -> Result<()> {
        let _loading = self.tracked.begin();
        let fetched = self.backend.list_hospitals().await.map_err(|e| {
            warn!("Failed to fetch hospitals: {}", e);
            e
        })?;
        self.tracked.lock().items = fetched;
        Ok(())
    }

    /// Register a hospital and append it to the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is unchanged.
    pub async fn add(&self, hospital: NewHospital) -> Result<Hospital> {
        let _loading = self.tracked.begin();
        let created = self.backend.create_hospital(&hospital).await?;
        let mut state = self.tracked.lock();
        state.items.push(created.clone());
        if created.is_primary {
            demote_others(&mut state.items, created.id);
        }
        Ok(created)
    }

    /// Update a hospital and replace it in the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is unchanged.
    pub async fn update(&self, id: i64, patch: HospitalPatch) -> Result<Hospital> {
        let _loading = self.tracked.begin();
        let updated = self.backend.update_hospital(id, &patch).await?;
        let mut state = self.tracked.lock();
        if let Some(slot) = state.items.iter_mut().find(|h| h.id == id) {
            *slot = updated.clone();
        }
        if updated.is_primary {
            demote_others(&mut state.items, updated.id);
        }
        Ok(updated)
    }

    /// Delete a hospital and drop it from the list.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the local list is unchanged.
    pub async fn delete(&self, id: i64) -> Result<Message> {
        let _loading = self.tracked.begin();
        let message = self.backend.delete_hospital(id).await?;
        self.tracked.lock().items.retain(|h| h.id != id);
        Ok(message)
    }

    /// Snapshot of the current list.
    pub fn hospitals(&self) -> Vec<Hospital> {
        self.tracked.snapshot()
    }

    /// The first hospital flagged primary, if any.
    pub fn primary_hospital(&self) -> Option<Hospital> {
        self.tracked
            .lock()
            .items
            .iter()
            .find(|h| h.is_primary)
            .cloned()
    }

    /// Whether any call is still in flight.
    pub fn is_loading(&self) -> bool {
        self.tracked.is_loading()
    }
}

/// Mirror the server's single-primary rule in the local list.
fn demote_others(items: &mut [Hospital], primary_id: i64) {
    for hospital in items.iter_mut().filter(|h| h.id != primary_id) {
        hospital.is_primary = false;
    }
}
