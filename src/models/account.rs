// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account model for storage, plus the request/response bodies of the
//! auth API. The wire types are shared by the server routes and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Account role. New accounts are farmers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub enum Role {
    #[default]
    Farmer,
    Buyer,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Buyer => "buyer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form postal location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Account record held by the credential store.
///
/// `password_hash` is an Argon2 PHC string; the plaintext is never kept.
#[derive(Debug, Clone)]
pub struct Account {
    /// Identity (also embedded as `sub` in tokens)
    pub id: Uuid,
    /// Trimmed, lowercased email; unique across the store
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub location: Option<Location>,
    pub profile_image: Option<String>,
    /// When the account was created
    pub date_joined: DateTime<Utc>,
}

impl Account {
    /// Public view of the account, without the password hash.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            date_joined: self.date_joined,
            phone: self.phone.clone(),
            location: self.location.clone(),
            profile_image: self.profile_image.clone(),
        }
    }

    /// Apply a validated partial update. Identity fields (id, email, role,
    /// password) are not reachable from a `ProfileUpdate`.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(changes) = &update.location {
            let location = self.location.get_or_insert_with(Location::default);
            if let Some(address) = &changes.address {
                location.address = Some(address.clone());
            }
            if let Some(city) = &changes.city {
                location.city = Some(city.clone());
            }
            if let Some(country) = &changes.country {
                location.country = Some(country.clone());
            }
        }
        if let Some(image) = &update.profile_image {
            self.profile_image = Some(image.clone());
        }
    }
}

/// Public profile returned by every auth endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub date_joined: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

// ─── Requests ────────────────────────────────────────────────

/// Signup body. Missing fields deserialize as empty so that validation can
/// report every violated rule at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters long"),
        custom(function = "password_composition")
    )]
    pub password: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank_name"))]
    pub name: String,
}

impl SignupRequest {
    /// Trim surrounding whitespace and lowercase the email.
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self.name = self.name.trim().to_string();
        self
    }
}

/// Login body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginRequest {
    pub fn normalized(mut self) -> Self {
        self.email = normalize_email(&self.email);
        self
    }
}

/// Refresh body. The token is optional on the wire so that a missing value
/// maps to `TOKEN_REQUIRED` instead of a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Partial location change; each present sub-field replaces the stored one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct LocationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Profile update body. Unknown fields (including `email`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "not_blank_name"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Profile image must be a valid URL"))]
    pub profile_image: Option<String>,
}

impl ProfileUpdate {
    /// Trim every present string field.
    pub fn normalized(mut self) -> Self {
        let trim = |v: &mut Option<String>| {
            if let Some(s) = v.as_mut() {
                *s = s.trim().to_string();
            }
        };
        trim(&mut self.name);
        trim(&mut self.phone);
        trim(&mut self.profile_image);
        if let Some(location) = self.location.as_mut() {
            trim(&mut location.address);
            trim(&mut location.city);
            trim(&mut location.country);
        }
        self
    }
}

// ─── Responses ───────────────────────────────────────────────

/// Returned by signup and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
    pub refresh_token: String,
}

/// Returned by refresh: a new access token only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct RefreshResponse {
    pub token: String,
}

// ─── Validation helpers ──────────────────────────────────────

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn password_composition(password: &str) -> Result<(), ValidationError> {
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_letter = password.chars().any(char::is_alphabetic);

    let message = match (has_letter, has_digit) {
        (true, true) => return Ok(()),
        (true, false) => "Password must contain at least one number",
        (false, true) => "Password must contain at least one letter",
        (false, false) => "Password must contain at least one letter and one number",
    };
    Err(ValidationError::new("password_composition").with_message(Cow::Borrowed(message)))
}

fn not_blank_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed("Name is required")));
    }
    Ok(())
}
