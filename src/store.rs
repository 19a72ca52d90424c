//! # Research Store Module
//!
//! The persistence collaborator for saved research. The core only needs
//! `save`; [`InMemoryResearchStore`] backs the binary and the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::artifact::SanitizedResearchRecord;
use crate::error::ResearchError;

/// A saved research record, scoped to the caller that saved it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResearch {
    pub id: Uuid,
    pub user_id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub research: SanitizedResearchRecord,
}

#[async_trait]
pub trait ResearchStore: Send + Sync {
    /// Persist a record. Id and timestamp are assigned by the store.
    async fn save(
        &self,
        user_id: &str,
        query: &str,
        record: SanitizedResearchRecord,
    ) -> Result<StoredResearch, ResearchError>;
}

#[derive(Default)]
pub struct InMemoryResearchStore {
    records: RwLock<Vec<StoredResearch>>,
}

impl InMemoryResearchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records saved by `user_id`, oldest first.
    pub async fn records_for(&self, user_id: &str) -> Vec<StoredResearch> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ResearchStore for InMemoryResearchStore {
    async fn save(
        &self,
        user_id: &str,
        query: &str,
        record: SanitizedResearchRecord,
    ) -> Result<StoredResearch, ResearchError> {
        let stored = StoredResearch {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            query: query.to_string(),
            created_at: Utc::now(),
            research: record,
        };
        self.records.write().await.push(stored.clone());
        info!(id = %stored.id, user_id = %user_id, "Saved research");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_scopes_records_by_user() {
        let store = InMemoryResearchStore::new();
        let record = SanitizedResearchRecord {
            summary: "s".into(),
            ..Default::default()
        };

        let saved = store.save("alice", "q1", record.clone()).await.unwrap();
        store.save("bob", "q2", record).await.unwrap();

        assert_eq!(saved.user_id, "alice");
        let alice = store.records_for("alice").await;
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].id, saved.id);
        assert_eq!(alice[0].query, "q1");
    }
}
