//! Member share capital module.
//!
//! Deterministic domain logic for share accounts: one per member, numbered by a
//! per-tenant certificate sequence. Provisioning and posting live in the infra crate.

pub mod share_account;

pub use share_account::{CertificateNo, ShareAccount, SharesPurchased};
