// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: signup, login, token refresh and profile updates.
//!
//! Input is normalized and validated before storage is touched. Every
//! storage and hashing step is bounded by the configured timeout; expiry
//! surfaces as `ServiceUnavailable` instead of a hung request.

use crate::db::AccountDb;
use crate::error::{AppError, Result};
use crate::models::{
    Account, AuthResponse, LoginRequest, ProfileUpdate, RefreshResponse, Role, SignupRequest,
    UserProfile,
};
use crate::services::password::PasswordService;
use crate::services::tokens::{TokenError, TokenIssuer};
use anyhow::Context;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

/// High-level account service shared by the auth routes.
#[derive(Clone)]
pub struct AccountService {
    db: AccountDb,
    passwords: PasswordService,
    tokens: TokenIssuer,
    timeout: Duration,
}

impl AccountService {
    pub fn new(
        db: AccountDb,
        passwords: PasswordService,
        tokens: TokenIssuer,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            passwords,
            tokens,
            timeout,
        }
    }

    /// Run `fut` under the operation timeout.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Operation timed out");
                Err(AppError::ServiceUnavailable(format!(
                    "{} timed out after {:?}",
                    operation, self.timeout
                )))
            }
        }
    }

    fn issue_pair(&self, account: &Account) -> Result<AuthResponse> {
        let token = self
            .tokens
            .issue_access_token(account)
            .context("access token creation failed")?;
        let refresh_token = self
            .tokens
            .issue_refresh_token(account)
            .context("refresh token creation failed")?;
        Ok(AuthResponse {
            user: account.profile(),
            token,
            refresh_token,
        })
    }

    // ─── Signup / Login ──────────────────────────────────────────

    /// Create an account and mint its first token pair.
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthResponse> {
        let request = request.normalized();
        request.validate()?;

        if self
            .bounded("account lookup", self.db.find_by_email(&request.email))
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateAccount);
        }

        let password_hash = self
            .bounded("password hashing", async {
                Ok::<_, AppError>(self.passwords.hash(request.password.clone()).await?)
            })
            .await?;

        let account = Account {
            id: Uuid::new_v4(),
            email: request.email,
            password_hash,
            name: request.name,
            role: Role::default(),
            phone: None,
            location: None,
            profile_image: None,
            date_joined: chrono::Utc::now(),
        };

        // The store re-checks uniqueness; a concurrent signup for the same
        // email may have landed since the lookup above.
        if let Err(err) = self.bounded("account insert", self.db.insert(&account)).await {
            if matches!(err, AppError::DuplicateAccount) {
                tracing::warn!(email = %account.email, "Concurrent signup lost the insert race");
            }
            return Err(err);
        }

        tracing::info!(account_id = %account.id, role = %account.role, "Account created");
        self.issue_pair(&account)
    }

    /// Exchange credentials for a token pair.
    ///
    /// Unknown email and wrong password produce the same error, after the
    /// same amount of hashing work.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let request = request.normalized();
        request.validate()?;

        let account = self
            .bounded("account lookup", self.db.find_by_email(&request.email))
            .await?;

        let password_ok = self
            .bounded("password verification", async {
                Ok::<_, AppError>(match &account {
                    Some(account) => {
                        self.passwords
                            .verify(account.password_hash.clone(), request.password.clone())
                            .await?
                    }
                    None => self.passwords.verify_dummy(request.password.clone()).await?,
                })
            })
            .await?;

        match account {
            Some(account) if password_ok => {
                tracing::info!(account_id = %account.id, "Login succeeded");
                self.issue_pair(&account)
            }
            _ => {
                tracing::info!("Login rejected");
                Err(AppError::InvalidCredentials)
            }
        }
    }

    // ─── Refresh ─────────────────────────────────────────────────

    /// Mint a new access token from a refresh token. The refresh token
    /// itself is not rotated.
    pub async fn refresh(&self, refresh_token: Option<String>) -> Result<RefreshResponse> {
        let refresh_token = refresh_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(AppError::TokenRequired)?;

        let claims = self
            .tokens
            .verify_refresh(refresh_token.trim())
            .map_err(AppError::InvalidToken)?;

        let account = self
            .bounded("account lookup", self.db.find_by_id(claims.sub))
            .await?
            .ok_or_else(|| {
                tracing::info!(account_id = %claims.sub, "Refresh for removed account");
                AppError::InvalidToken(TokenError::UnknownSubject)
            })?;

        let token = self
            .tokens
            .issue_access_token(&account)
            .context("access token creation failed")?;

        tracing::info!(account_id = %account.id, "Access token refreshed");
        Ok(RefreshResponse { token })
    }

    // ─── Profile ─────────────────────────────────────────────────

    pub async fn profile(&self, account_id: Uuid) -> Result<UserProfile> {
        self.bounded("account lookup", self.db.find_by_id(account_id))
            .await?
            .map(|account| account.profile())
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", account_id)))
    }

    /// Validate and atomically apply a partial profile update.
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<UserProfile> {
        let update = update.normalized();
        update.validate()?;

        let account = self
            .bounded(
                "profile update",
                self.db.update_profile(account_id, &update),
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Account {} not found", account_id)))?;

        tracing::info!(account_id = %account.id, "Profile updated");
        Ok(account.profile())
    }
}
