// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store with typed account operations.
//!
//! Accounts live in a sharded concurrent map keyed by ID, with a second map
//! indexing normalized emails. Inserts claim the email through the index's
//! entry API, which makes email uniqueness a store-level invariant: of two
//! racing inserts for one email, exactly one succeeds.

use crate::error::AppError;
use crate::models::{Account, ProfileUpdate};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    accounts: DashMap<Uuid, Account>,
    /// Normalized email -> account ID
    emails: DashMap<String, Uuid>,
}

/// Account database handle. Cheap to clone; clones share the tables.
#[derive(Clone)]
pub struct AccountDb {
    tables: Option<Arc<Tables>>,
    latency: Option<Duration>,
}

impl Default for AccountDb {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountDb {
    /// Create an empty, connected store.
    pub fn new() -> Self {
        tracing::info!("Account store initialized");
        Self {
            tables: Some(Arc::new(Tables::default())),
            latency: None,
        }
    }

    /// Create a disconnected store (testing / degraded mode).
    ///
    /// All operations return `ServiceUnavailable`.
    pub fn new_offline() -> Self {
        Self {
            tables: None,
            latency: None,
        }
    }

    /// Delay every operation by `latency`, to exercise timeout handling.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.tables.is_some()
    }

    /// Helper to get the tables or return an error if offline.
    async fn tables(&self) -> Result<&Tables, AppError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.tables.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable("Account store not connected (offline mode)".to_string())
        })
    }

    // ─── Account Operations ──────────────────────────────────────

    /// Look up an account by normalized email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let tables = self.tables().await?;
        let id = match tables.emails.get(email) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(tables.accounts.get(&id).map(|a| a.value().clone()))
    }

    /// Look up an account by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let tables = self.tables().await?;
        Ok(tables.accounts.get(&id).map(|a| a.value().clone()))
    }

    /// Insert a new account.
    ///
    /// Fails with `DuplicateAccount` if the email is already claimed, even
    /// when a concurrent insert won the race after the caller's pre-check.
    pub async fn insert(&self, account: &Account) -> Result<(), AppError> {
        let tables = self.tables().await?;
        match tables.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateAccount),
            Entry::Vacant(slot) => {
                // Account row goes in before the index entry is released so
                // that a lookup through the index always finds it.
                tables.accounts.insert(account.id, account.clone());
                slot.insert(account.id);
                Ok(())
            }
        }
    }

    /// Atomically apply a partial profile update and return the new record.
    ///
    /// Returns `None` if the account no longer exists.
    pub async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<Account>, AppError> {
        let tables = self.tables().await?;
        Ok(tables.accounts.get_mut(&id).map(|mut account| {
            account.apply(update);
            account.value().clone()
        }))
    }

    /// Remove an account and release its email.
    pub async fn remove(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let tables = self.tables().await?;
        let removed = tables.accounts.remove(&id).map(|(_, account)| account);
        if let Some(account) = &removed {
            tables.emails.remove(&account.email);
        }
        Ok(removed)
    }

    /// Number of stored accounts.
    pub async fn count(&self) -> Result<usize, AppError> {
        Ok(self.tables().await?.accounts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocationUpdate, Role};
    use chrono::Utc;

    fn account(email: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
            name: "Test".to_string(),
            role: Role::Farmer,
            phone: None,
            location: None,
            profile_image: None,
            date_joined: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = AccountDb::new();
        let a = account("a@x.com");
        db.insert(&a).await.unwrap();

        assert_eq!(db.find_by_email("a@x.com").await.unwrap().unwrap().id, a.id);
        assert_eq!(db.find_by_id(a.id).await.unwrap().unwrap().email, "a@x.com");
        assert!(db.find_by_email("b@x.com").await.unwrap().is_none());
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = AccountDb::new();
        db.insert(&account("a@x.com")).await.unwrap();
        let err = db.insert(&account("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateAccount));
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_single_winner() {
        let db = AccountDb::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.insert(&account("race@x.com")).await
            }));
        }

        let mut ok = 0;
        let mut dup = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => ok += 1,
                Err(AppError::DuplicateAccount) => dup += 1,
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, 15);
    }

    #[tokio::test]
    async fn test_update_profile_is_partial() {
        let db = AccountDb::new();
        let a = account("a@x.com");
        db.insert(&a).await.unwrap();

        let updated = db
            .update_profile(
                a.id,
                &ProfileUpdate {
                    phone: Some("+254 700 000000".to_string()),
                    location: Some(LocationUpdate {
                        city: Some("Eldoret".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Test");
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.phone.as_deref(), Some("+254 700 000000"));
        assert_eq!(
            updated.location.unwrap().city.as_deref(),
            Some("Eldoret")
        );
    }

    #[tokio::test]
    async fn test_update_missing_account() {
        let db = AccountDb::new();
        let result = db
            .update_profile(Uuid::new_v4(), &ProfileUpdate::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_remove_releases_email() {
        let db = AccountDb::new();
        let a = account("a@x.com");
        db.insert(&a).await.unwrap();
        db.remove(a.id).await.unwrap().unwrap();

        assert!(db.find_by_id(a.id).await.unwrap().is_none());
        db.insert(&account("a@x.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_offline_store_unavailable() {
        let db = AccountDb::new_offline();
        assert!(!db.is_connected());
        let err = db.find_by_email("a@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }
}
