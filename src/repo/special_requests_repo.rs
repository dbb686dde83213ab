use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approved" => ApprovalState::Approved,
            "rejected" => ApprovalState::Rejected,
            _ => ApprovalState::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialRequestInfo {
    pub id: i64,
    pub owner_id: i64,
    pub approval: ApprovalState,
}

/// The portal's special waste-pickup requests, as far as invoicing needs them.
#[async_trait::async_trait]
pub trait SpecialRequestDirectory: Send + Sync {
    async fn lookup(&self, special_request_id: i64) -> Result<Option<SpecialRequestInfo>>;

    async fn is_approved(&self, special_request_id: i64) -> Result<bool> {
        Ok(self
            .lookup(special_request_id)
            .await?
            .is_some_and(|r| r.approval == ApprovalState::Approved))
    }

    async fn get_owner(&self, special_request_id: i64) -> Result<Option<i64>> {
        Ok(self.lookup(special_request_id).await?.map(|r| r.owner_id))
    }
}

#[derive(Clone)]
pub struct PgSpecialRequestsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl SpecialRequestDirectory for PgSpecialRequestsRepo {
    async fn lookup(&self, special_request_id: i64) -> Result<Option<SpecialRequestInfo>> {
        let row = sqlx::query("SELECT id, user_id, status FROM special_requests WHERE id = $1")
            .bind(special_request_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| SpecialRequestInfo {
            id: r.get("id"),
            owner_id: r.get("user_id"),
            approval: ApprovalState::parse(r.get::<String, _>("status").as_str()),
        }))
    }
}

#[derive(Clone, Default)]
pub struct MemorySpecialRequests {
    inner: Arc<RwLock<HashMap<i64, SpecialRequestInfo>>>,
}

impl MemorySpecialRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, id: i64, owner_id: i64, approval: ApprovalState) {
        self.inner.write().await.insert(
            id,
            SpecialRequestInfo {
                id,
                owner_id,
                approval,
            },
        );
    }
}

#[async_trait::async_trait]
impl SpecialRequestDirectory for MemorySpecialRequests {
    async fn lookup(&self, special_request_id: i64) -> Result<Option<SpecialRequestInfo>> {
        Ok(self.inner.read().await.get(&special_request_id).copied())
    }
}
