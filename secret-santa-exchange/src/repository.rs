use std::collections::BTreeMap;
use std::future::Future;

use tokio::sync::RwLock;
use tracing::debug;

use crate::assignment::AssignmentSet;
use crate::error::{ExchangeError, Result};
use crate::model::{Exchange, ExchangeId, ExchangeState};

/// A stored value together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

pub trait ExchangeRepository: Send + Sync {
    fn load(&self, id: ExchangeId)
        -> impl Future<Output = Result<Option<Versioned<Exchange>>>> + Send;

    /// Replaces the current assignment set wholesale.
    ///
    /// Fails with [`ExchangeError::Conflict`] if the exchange changed since `expected_version`.
    fn replace_assignments(
        &self,
        id: ExchangeId,
        expected_version: u64,
        assignments: AssignmentSet,
        state: ExchangeState,
    ) -> impl Future<Output = Result<Versioned<Exchange>>> + Send;
}

#[derive(Debug, Default)]
pub struct InMemoryExchangeRepository {
    exchanges: RwLock<BTreeMap<ExchangeId, Versioned<Exchange>>>,
}

impl InMemoryExchangeRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or overwrites an exchange and returns its new version.
    pub async fn insert(&self, exchange: Exchange) -> u64 {
        let mut exchanges = self.exchanges.write().await;
        let version = exchanges
            .get(&exchange.id)
            .map_or(1, |existing| existing.version + 1);
        exchanges.insert(
            exchange.id,
            Versioned {
                version,
                value: exchange,
            },
        );
        version
    }
}

impl ExchangeRepository for InMemoryExchangeRepository {
    async fn load(&self, id: ExchangeId) -> Result<Option<Versioned<Exchange>>> {
        Ok(self.exchanges.read().await.get(&id).cloned())
    }

    async fn replace_assignments(
        &self,
        id: ExchangeId,
        expected_version: u64,
        assignments: AssignmentSet,
        state: ExchangeState,
    ) -> Result<Versioned<Exchange>> {
        let mut exchanges = self.exchanges.write().await;
        let stored = exchanges.get_mut(&id).ok_or(ExchangeError::NotFound(id))?;
        if stored.version != expected_version {
            debug!(
                exchange_id = id.0,
                expected_version,
                version = stored.version,
                "rejected stale write"
            );
            return Err(ExchangeError::Conflict(id));
        }
        stored.version += 1;
        stored.value.assignments = Some(assignments);
        stored.value.state = state;
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Assignment;
    use crate::model::ParticipantId;
    use crate::test_support::exchange_with;

    fn swap() -> AssignmentSet {
        AssignmentSet::try_from(vec![
            Assignment::new(ParticipantId(1), ParticipantId(2)).unwrap(),
            Assignment::new(ParticipantId(2), ParticipantId(1)).unwrap(),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn replace_bumps_version() {
        let repository = InMemoryExchangeRepository::new();
        let exchange = exchange_with(2);
        assert_eq!(repository.insert(exchange.clone()).await, 1);

        let stored = repository
            .replace_assignments(exchange.id, 1, swap(), ExchangeState::Sent)
            .await
            .unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.value.state, ExchangeState::Sent);
        assert_eq!(
            repository.load(exchange.id).await.unwrap(),
            Some(stored)
        );
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let repository = InMemoryExchangeRepository::new();
        let exchange = exchange_with(2);
        repository.insert(exchange.clone()).await;
        repository
            .replace_assignments(exchange.id, 1, swap(), ExchangeState::Started)
            .await
            .unwrap();

        let error = repository
            .replace_assignments(exchange.id, 1, swap(), ExchangeState::Sent)
            .await
            .unwrap_err();
        assert!(matches!(error, ExchangeError::Conflict(id) if id == exchange.id));
    }

    #[tokio::test]
    async fn unknown_exchange_is_not_found() {
        let repository = InMemoryExchangeRepository::new();
        let id = ExchangeId(99);
        assert_eq!(repository.load(id).await.unwrap(), None);
        assert!(matches!(
            repository
                .replace_assignments(id, 1, swap(), ExchangeState::Sent)
                .await,
            Err(ExchangeError::NotFound(_))
        ));
    }
}
