//! Database layer (in-process credential store).

pub mod accounts;

pub use accounts::AccountDb;
