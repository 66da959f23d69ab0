// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Agrigrow: session lifecycle for the farmer/buyer marketplace.
//!
//! The server half (`routes`, `middleware`, `services`, `db`) issues and
//! verifies access/refresh tokens for accounts. The `client` half keeps the
//! current session on the consumer side and transparently refreshes an
//! expired access token once per failed request.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::AccountDb;
use services::{AccountService, PasswordService, TokenIssuer};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: AccountDb,
    pub tokens: TokenIssuer,
    pub accounts: AccountService,
}

impl AppState {
    /// Wire services from configuration around an account store.
    pub fn new(config: Config, db: AccountDb) -> anyhow::Result<Self> {
        let tokens = TokenIssuer::from_config(&config);
        let passwords = PasswordService::from_config(&config)?;
        let accounts = AccountService::new(
            db.clone(),
            passwords,
            tokens.clone(),
            config.storage_timeout,
        );

        Ok(Self {
            config,
            db,
            tokens,
            accounts,
        })
    }
}
