// src/db/memory_store.rs

//! Stores em memória para os testes. Mesma semântica dos repositórios
//! Postgres: escrita condicional ao status (e à versão, nas solicitações)
//! e histórico gravado junto.
//!
//! As leituras cedem a vez ao executor antes de devolver a cópia, como uma
//! ida ao banco, para que `tokio::join!` intercale leitura e escrita.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BlobStore, SignupStore, SubscriptionStore},
    models::{
        history::StatusHistoryEntry,
        signature::SignatureAudit,
        signup::{SignupRequest, SignupStatus, SignupSummary},
        subscription::{Subscription, SubscriptionStatus, SubscriptionSummary},
    },
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn newest_first(entries: &[StatusHistoryEntry], id: Uuid, limit: i64) -> Vec<StatusHistoryEntry> {
    let mut rows: Vec<_> = entries.iter().filter(|h| h.entity_id == id).cloned().collect();
    // Estável: empates mantêm a ordem inversa de inserção
    rows.reverse();
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows.truncate(limit.max(0) as usize);
    rows
}

#[derive(Default)]
struct SignupTables {
    requests: HashMap<Uuid, SignupRequest>,
    history: Vec<StatusHistoryEntry>,
    counters: HashMap<i32, i32>,
}

#[derive(Default)]
pub struct MemorySignupStore {
    tables: Mutex<SignupTables>,
}

impl MemorySignupStore {
    pub fn all_history(&self) -> Vec<StatusHistoryEntry> {
        lock(&self.tables).history.clone()
    }
}

#[async_trait]
impl SignupStore for MemorySignupStore {
    async fn insert(
        &self,
        request: &SignupRequest,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError> {
        let mut t = lock(&self.tables);
        t.requests.insert(request.id, request.clone());
        if let Some(entry) = history {
            t.history.push(entry.clone());
        }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<SignupRequest>, AppError> {
        let row = lock(&self.tables).requests.get(&id).cloned();
        tokio::task::yield_now().await;
        Ok(row)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<SignupSummary>, AppError> {
        let t = lock(&self.tables);
        let mut rows: Vec<SignupSummary> = t.requests.values().map(SignupSummary::from).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn history(&self, id: Uuid, limit: i64) -> Result<Vec<StatusHistoryEntry>, AppError> {
        Ok(newest_first(&lock(&self.tables).history, id, limit))
    }

    async fn save(
        &self,
        request: &SignupRequest,
        expected: SignupStatus,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError> {
        let mut t = lock(&self.tables);
        match t.requests.get(&request.id) {
            Some(current) if current.status == expected && current.version == request.version => {}
            _ => return Err(AppError::StatusConflict),
        }
        let mut stored = request.clone();
        stored.version += 1;
        t.requests.insert(request.id, stored);
        if let Some(entry) = history {
            t.history.push(entry.clone());
        }
        Ok(())
    }

    async fn next_protocol_seq(&self, year: i32) -> Result<i32, AppError> {
        let mut t = lock(&self.tables);
        let value = t.counters.entry(year).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[derive(Default)]
struct SubscriptionTables {
    rows: HashMap<Uuid, Subscription>,
    history: Vec<StatusHistoryEntry>,
    audits: Vec<SignatureAudit>,
}

#[derive(Default)]
pub struct MemorySubscriptionStore {
    tables: Mutex<SubscriptionTables>,
}

impl MemorySubscriptionStore {
    pub fn all_history(&self) -> Vec<StatusHistoryEntry> {
        lock(&self.tables).history.clone()
    }

    pub fn audits(&self) -> Vec<SignatureAudit> {
        lock(&self.tables).audits.clone()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn insert(
        &self,
        subscription: &Subscription,
        history: Option<&StatusHistoryEntry>,
    ) -> Result<(), AppError> {
        let mut t = lock(&self.tables);
        if let Some(signup_id) = subscription.signup_request_id {
            if t.rows.values().any(|s| s.signup_request_id == Some(signup_id)) {
                return Err(AppError::StatusConflict);
            }
        }
        t.rows.insert(subscription.id, subscription.clone());
        if let Some(entry) = history {
            t.history.push(entry.clone());
        }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Subscription>, AppError> {
        Ok(lock(&self.tables).rows.get(&id).cloned())
    }

    async fn find_by_signup(&self, signup_id: Uuid) -> Result<Option<Subscription>, AppError> {
        Ok(lock(&self.tables)
            .rows
            .values()
            .find(|s| s.signup_request_id == Some(signup_id))
            .cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<SubscriptionSummary>, AppError> {
        let t = lock(&self.tables);
        let mut rows: Vec<SubscriptionSummary> = t.rows.values().map(SubscriptionSummary::from).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn history(&self, id: Uuid, limit: i64) -> Result<Vec<StatusHistoryEntry>, AppError> {
        Ok(newest_first(&lock(&self.tables).history, id, limit))
    }

    async fn save(
        &self,
        subscription: &Subscription,
        expected: SubscriptionStatus,
        history: Option<&StatusHistoryEntry>,
        audit: Option<&SignatureAudit>,
    ) -> Result<(), AppError> {
        let mut t = lock(&self.tables);
        match t.rows.get(&subscription.id) {
            Some(current) if current.status == expected => {}
            _ => return Err(AppError::StatusConflict),
        }
        t.rows.insert(subscription.id, subscription.clone());
        if let Some(entry) = history {
            t.history.push(entry.clone());
        }
        if let Some(audit) = audit {
            t.audits.push(audit.clone());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, owner: Uuid, name: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let path = format!("{owner}/{name}");
        lock(&self.blobs).insert(path.clone(), bytes);
        Ok(path)
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(lock(&self.blobs).get(path).cloned())
    }
}
