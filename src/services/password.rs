// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Argon2id password hashing.
//!
//! Hashing is CPU-bound, so the async entry points run it on the blocking
//! pool. A dummy hash is computed at startup so that a login for an unknown
//! email costs the same as one with a wrong password.

use anyhow::anyhow;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::Arc;

/// Password hashing service.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    dummy_hash: Arc<str>,
}

impl PasswordService {
    /// Create a hasher with the given Argon2 memory (KiB) and iteration costs.
    pub fn new(memory_kib: u32, iterations: u32) -> anyhow::Result<Self> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow!("invalid argon2 parameters: {}", e))?;

        let mut service = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        let mut filler = [0u8; 24];
        getrandom::getrandom(&mut filler).map_err(|e| anyhow!(e.to_string()))?;
        service.dummy_hash = Arc::from(service.hash_blocking(&format!("{:x?}", filler))?);
        Ok(service)
    }

    pub fn from_config(config: &crate::config::Config) -> anyhow::Result<Self> {
        Self::new(config.argon2_memory_kib, config.argon2_iterations)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a PHC string (synchronous).
    pub fn hash_blocking(&self, password: &str) -> anyhow::Result<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
        let phc = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Check a password against a PHC string (synchronous). Unparseable
    /// hashes never match.
    pub fn verify_blocking(&self, hash: &str, password: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub async fn hash(&self, password: String) -> anyhow::Result<String> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.hash_blocking(&password)).await?
    }

    pub async fn verify(&self, hash: String, password: String) -> anyhow::Result<bool> {
        let this = self.clone();
        Ok(tokio::task::spawn_blocking(move || this.verify_blocking(&hash, &password)).await?)
    }

    /// Burn the same work as a real verification; always `false`.
    pub async fn verify_dummy(&self, password: String) -> anyhow::Result<bool> {
        let hash = self.dummy_hash.to_string();
        self.verify(hash, password).await.map(|_| false)
    }
}
