// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod account;

pub use account::{
    Account, AuthResponse, Location, LocationUpdate, LoginRequest, ProfileUpdate,
    RefreshRequest, RefreshResponse, Role, SignupRequest, UserProfile,
};
