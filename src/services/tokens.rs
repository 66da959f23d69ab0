// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access and refresh token minting and verification.
//!
//! Both kinds are HS256 JWTs signed with *different* secrets and carry an
//! explicit `kind` claim, so a refresh token never verifies as an access
//! token. Nothing is persisted server-side: validity is signature + expiry.

use crate::models::{Account, Role};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Which secret/lifetime a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account ID)
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub kind: TokenKind,
    /// Unique token ID
    pub jti: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Claims of a refresh token: identity only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub kind: TokenKind,
    pub jti: Uuid,
    pub iat: usize,
    pub exp: usize,
}

trait KindedClaims {
    fn kind(&self) -> TokenKind;
}

impl KindedClaims for AccessClaims {
    fn kind(&self) -> TokenKind {
        self.kind
    }
}

impl KindedClaims for RefreshClaims {
    fn kind(&self) -> TokenKind {
        self.kind
    }
}

/// Token verification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed")]
    Malformed,

    #[error("token is not {expected:?} kind")]
    WrongKind { expected: TokenKind },

    #[error("token subject no longer exists")]
    UnknownSubject,
}

/// Signing key pair for one token kind.
#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Mints and verifies session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenIssuer {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access: KeyPair::new(access_secret, access_ttl),
            refresh: KeyPair::new(refresh_secret, refresh_ttl),
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            &config.jwt_secret,
            &config.jwt_refresh_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    /// Short-lived token embedding identity, email and role.
    pub fn issue_access_token(&self, account: &Account) -> anyhow::Result<String> {
        let (iat, exp) = window(self.access.ttl, 1);
        let claims = AccessClaims {
            sub: account.id,
            email: account.email.clone(),
            role: account.role,
            kind: TokenKind::Access,
            jti: Uuid::new_v4(),
            iat,
            exp,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.access.encoding,
        )?)
    }

    /// Long-lived token embedding identity only.
    pub fn issue_refresh_token(&self, account: &Account) -> anyhow::Result<String> {
        let (iat, exp) = window(self.refresh.ttl, 1);
        let claims = RefreshClaims {
            sub: account.id,
            kind: TokenKind::Refresh,
            jti: Uuid::new_v4(),
            iat,
            exp,
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.refresh.encoding,
        )?)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        verify(token, &self.access.decoding, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        verify(token, &self.refresh.decoding, TokenKind::Refresh)
    }

    /// Issue tokens whose expiry already lies in the past.
    #[cfg(test)]
    fn issue_expired_access_token(&self, account: &Account) -> String {
        let (iat, exp) = window(self.access.ttl, -1);
        let claims = AccessClaims {
            sub: account.id,
            email: account.email.clone(),
            role: account.role,
            kind: TokenKind::Access,
            jti: Uuid::new_v4(),
            iat,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.access.encoding).unwrap()
    }
}

/// `(iat, exp)` for a token issued now; `direction` -1 puts `exp` in the past.
fn window(ttl: Duration, direction: i64) -> (usize, usize) {
    let now = chrono::Utc::now().timestamp();
    let exp = now + direction * ttl.as_secs() as i64;
    (now.max(0) as usize, exp.max(0) as usize)
}

fn verify<C>(token: &str, key: &DecodingKey, expected: TokenKind) -> Result<C, TokenError>
where
    C: DeserializeOwned + KindedClaims,
{
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<C>(token, key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;

    if data.claims.kind() != expected {
        return Err(TokenError::WrongKind { expected });
    }
    Ok(data.claims)
}
