//! Table of matches that are still waiting for players.
//!
//! A match leaves the table on its own as soon as its engine starts, so the
//! lobby listing never shows full or finished matches.

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::game::{MatchHandle, MatchId, PlayerLink};
use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::MatchSummary;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;

const MATCH_ID_LEN: usize = 14;

type MatchTable = RwLock<HashMap<MatchId, MatchHandle>>;

/// Removes one match from the registry it was created in.
///
/// Holds the table weakly so an abandoned registry is not kept alive by its
/// matches.
pub(crate) struct Deregister {
    id: MatchId,
    table: Weak<MatchTable>,
}

impl Deregister {
    pub(crate) async fn run(self) {
        if let Some(table) = self.table.upgrade() {
            if table.write().await.remove(&self.id).is_some() {
                debug!("{}: removed from registry", self.id);
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct MatchRegistry {
    matches: Arc<MatchTable>,
    config: MatchConfig,
}

impl MatchRegistry {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            matches: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Validates the request and opens a new lobby for it.
    pub async fn create(
        &self,
        height: u32,
        width: u32,
        required: usize,
    ) -> Result<MatchHandle, MatchError> {
        crate::game::validate(height, width, required, &self.config)?;
        let mut matches = self.matches.write().await;
        let id = loop {
            let candidate = generate_match_id();
            if !matches.contains_key(&candidate) {
                break candidate;
            }
        };

        let deregister = Deregister {
            id: id.clone(),
            table: Arc::downgrade(&self.matches),
        };
        let handle = MatchHandle::build(
            id.clone(),
            height,
            width,
            required,
            self.config.clone(),
            Some(deregister),
        )?;
        matches.insert(id.clone(), handle.clone());

        info!(
            "{}: created {}x{} match for {} players",
            id, height, width, required
        );
        Ok(handle)
    }

    pub async fn lookup(&self, id: &str) -> Option<MatchHandle> {
        self.matches.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.matches.write().await.remove(id).is_some()
    }

    pub async fn join(&self, id: &str) -> Result<(MatchHandle, PlayerLink), MatchError> {
        let handle = self
            .lookup(id)
            .await
            .ok_or_else(|| MatchError::NotFound(id.to_string()))?;
        let link = handle.join().await?;
        Ok((handle, link))
    }

    /// Summaries of every open lobby, ordered by id.
    pub async fn list(&self) -> Vec<MatchSummary> {
        // Release the table before touching individual lobbies
        let handles: Vec<MatchHandle> = self.matches.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(handle.summary().await);
        }
        summaries.sort_by(|a, b| a.match_id.cmp(&b.match_id));
        summaries
    }

    pub async fn len(&self) -> usize {
        self.matches.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.matches.read().await.is_empty()
    }
}

fn generate_match_id() -> MatchId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(MATCH_ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchState;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn registry() -> MatchRegistry {
        MatchRegistry::new(MatchConfig {
            start_delay: Duration::from_secs(3600),
            ..MatchConfig::default()
        })
    }

    async fn wait_until_empty(registry: &MatchRegistry) {
        for _ in 0..100 {
            if registry.is_empty().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("registry still holds {} matches", registry.len().await);
    }

    #[test]
    fn test_generated_ids_are_url_safe() {
        let id = generate_match_id();
        assert_eq!(id.len(), MATCH_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_match_id());
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let registry = registry();
        let handle = assert_ok!(registry.create(5, 5, 2).await);

        assert_eq!(registry.len().await, 1);
        let found = registry.lookup(handle.id()).await.unwrap();
        assert_eq!(found.id(), handle.id());
        assert_eq!(found.required(), 2);
        assert!(registry.lookup("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_dimensions_leave_registry_untouched() {
        let registry = registry();
        let err = registry.create(0, 5, 2).await.unwrap_err();
        assert!(matches!(err, MatchError::InvalidDimensions { .. }));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_too_many_players_rejected() {
        let registry = registry();
        assert_eq!(
            registry.create(10, 10, 5).await.unwrap_err(),
            MatchError::MaxPlayers
        );
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_grid_without_room_for_every_seat_rejected() {
        let registry = registry();
        assert_eq!(
            registry.create(2, 2, 4).await.unwrap_err(),
            MatchError::GridTooSmall {
                height: 2,
                width: 2,
                required: 4
            }
        );
        assert!(registry.is_empty().await);

        let handle = assert_ok!(registry.create(3, 3, 4).await);
        for slot in 0..4 {
            assert_eq!(assert_ok!(registry.join(handle.id()).await).1.slot, slot);
        }
    }

    #[tokio::test]
    async fn test_oversized_unbounded_match_rejected() {
        let registry = MatchRegistry::new(MatchConfig {
            trail_limit: None,
            ..MatchConfig::default()
        });
        let err = registry.create(256, 256, 2).await.unwrap_err();
        assert!(matches!(err, MatchError::FrameTooLarge { .. }));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_join_unknown_match() {
        let registry = registry();
        assert_eq!(
            registry.join("nope").await.unwrap_err(),
            MatchError::NotFound("nope".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_shows_waiting_matches() {
        let registry = registry();
        let first = registry.create(5, 5, 2).await.unwrap();
        let second = registry.create(8, 6, 3).await.unwrap();
        let (_, _link) = registry.join(second.id()).await.unwrap();

        let listed = registry.list().await;
        assert_eq!(listed.len(), 2);
        let summary = listed
            .iter()
            .find(|summary| summary.match_id == second.id())
            .unwrap();
        assert_eq!(summary.joined, 1);
        assert_eq!(summary.required, 3);
        assert_eq!((summary.height, summary.width), (8, 6));
        assert!(listed.iter().any(|summary| summary.match_id == first.id()));
    }

    #[tokio::test]
    async fn test_started_match_leaves_registry() {
        let registry = registry();
        let handle = registry.create(5, 5, 2).await.unwrap();
        let id = handle.id().to_string();

        let (_, _a) = registry.join(&id).await.unwrap();
        let (_, _b) = registry.join(&id).await.unwrap();
        assert_eq!(handle.state().await, MatchState::InProgress);

        wait_until_empty(&registry).await;
        assert!(registry.lookup(&id).await.is_none());
        assert_eq!(handle.join().await.unwrap_err(), MatchError::InProgress);
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = registry();
        let handle = registry.create(5, 5, 2).await.unwrap();
        assert!(registry.remove(handle.id()).await);
        assert!(!registry.remove(handle.id()).await);
        assert!(registry.is_empty().await);
    }
}
