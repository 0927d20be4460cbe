//! In-memory planning sessions
//!
//! Every browser tab gets its own session holding the planner, the two city
//! search fields, the summary panel and the signed-in user. Nothing is
//! persisted; sessions idle for longer than [`SESSION_TTL_HOURS`] are pruned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::clients::{AuthSession, CitySearch};
use crate::emissions::EmissionEstimator;
use crate::planner::TripPlanner;
use crate::search_box::{CitySearchBox, SearchField};
use crate::summary::TripSummary;
use crate::{CarbonTripError, Result};

pub const SESSION_TTL_HOURS: i64 = 24;

pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub planner: TripPlanner,
    pub origin_search: CitySearchBox,
    pub destination_search: CitySearchBox,
    pub summary: TripSummary,
    pub auth: AuthSession,
}

impl Session {
    pub fn search_box(&self, field: SearchField) -> &CitySearchBox {
        match field {
            SearchField::Origin => &self.origin_search,
            SearchField::Destination => &self.destination_search,
        }
    }

    pub fn search_box_mut(&mut self, field: SearchField) -> &mut CitySearchBox {
        match field {
            SearchField::Origin => &mut self.origin_search,
            SearchField::Destination => &mut self.destination_search,
        }
    }
}

/// Settings shared by every new session
#[derive(Clone)]
pub struct SessionDefaults {
    pub city_search: Arc<dyn CitySearch>,
    pub estimator: EmissionEstimator,
    pub search_debounce: Duration,
    pub min_query_length: usize,
}

pub type SharedSession = Arc<Mutex<Session>>;

pub struct SessionStore {
    defaults: SessionDefaults,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

fn new_session_id() -> String {
    let mut rng = rand::rng();
    format!(
        "{:016x}{:016x}",
        rng.random_range(0..u64::MAX),
        rng.random_range(0..u64::MAX)
    )
}

impl SessionStore {
    pub fn new(defaults: SessionDefaults) -> Self {
        Self {
            defaults,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn search_box(&self) -> CitySearchBox {
        CitySearchBox::new(
            Arc::clone(&self.defaults.city_search),
            self.defaults.search_debounce,
            self.defaults.min_query_length,
        )
    }

    /// Open a session and return its id
    pub async fn create(&self) -> String {
        let id = new_session_id();
        let now = Utc::now();
        let session = Session {
            id: id.clone(),
            created_at: now,
            last_seen: now,
            planner: TripPlanner::new(self.defaults.estimator),
            origin_search: self.search_box(),
            destination_search: self.search_box(),
            summary: TripSummary::default(),
            auth: AuthSession::default(),
        };
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        debug!("Created session {}", id);
        id
    }

    pub async fn get(&self, id: &str) -> Result<SharedSession> {
        let session = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CarbonTripError::not_found(format!("Session '{id}' not found")))?;
        session.lock().await.last_seen = Utc::now();
        Ok(session)
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| debug!("Removed session {}", id))
            .ok_or_else(|| CarbonTripError::not_found(format!("Session '{id}' not found")))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions not used since `cutoff`, returning how many were removed
    pub async fn prune_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let mut idle = Vec::new();
        for (id, session) in sessions.iter() {
            if let Ok(session) = session.try_lock()
                && session.last_seen < cutoff
            {
                idle.push(id.clone());
            }
        }
        for id in &idle {
            sessions.remove(id);
        }
        if !idle.is_empty() {
            info!("Pruned {} idle sessions ({} left)", idle.len(), before - idle.len());
        }
        idle.len()
    }

    /// Remove sessions idle for longer than the TTL
    pub async fn prune_expired(&self) -> usize {
        self.prune_idle(Utc::now() - chrono::Duration::hours(SESSION_TTL_HOURS))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::CityQuery;
    use crate::models::City;
    use async_trait::async_trait;

    struct NoCities;

    #[async_trait]
    impl CitySearch for NoCities {
        async fn search(&self, _query: &CityQuery) -> Vec<City> {
            Vec::new()
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(SessionDefaults {
            city_search: Arc::new(NoCities),
            estimator: EmissionEstimator::default(),
            search_debounce: Duration::from_millis(300),
            min_query_length: 3,
        })
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = store();
        let id = store.create().await;
        assert_eq!(id.len(), 32);

        let session = store.get(&id).await.unwrap();
        assert_eq!(session.lock().await.id, id);
        assert_eq!(store.len().await, 1);

        store.remove(&id).await.unwrap();
        assert!(store.get(&id).await.is_err());
        assert!(store.remove(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = store();
        let a = store.create().await;
        let b = store.create().await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_prune_idle() {
        let store = store();
        let old = store.create().await;
        let fresh = store.create().await;
        store.get(&old).await.unwrap().lock().await.last_seen =
            Utc::now() - chrono::Duration::hours(SESSION_TTL_HOURS + 1);

        assert_eq!(store.prune_expired().await, 1);
        assert!(store.get(&old).await.is_err());
        assert!(store.get(&fresh).await.is_ok());
    }
}
