//! Framework-agnostic business logic.
//!
//! Every operation takes a database connection and returns
//! [`crate::errors::Result`], so the HTTP layer and the tests drive exactly
//! the same code.

pub mod auth;
pub mod beneficiary;
pub mod disbursement;
pub mod donation;
pub mod export;
pub mod group;
pub mod obligation;
pub mod payer;
pub mod report;
pub mod subdivision;
pub mod upload;
pub mod zakat_rate;
