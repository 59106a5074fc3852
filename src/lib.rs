//! atomgate - record store and transaction mirror for the Intuition protocol
//!
//! Two halves share this crate:
//!
//! - **Server** (`atomgate` binary): an in-memory REST store for atoms,
//!   transactions, contract events and staking positions.
//! - **Client** (`atomgate-cli` binary): a wallet session plus contract
//!   gateway that submits protocol calls and mirrors their outcome into
//!   the store.
//!
//! ## Modules
//!
//! - [`records`]: record types, schema validation and the store
//! - [`routes`] / [`server`]: the REST surface
//! - [`chain`]: network registry, wallet connector, contract gateway
//! - [`mirror`]: submit, confirm, then write the matching records

pub mod chain;
pub mod config;
pub mod mirror;
pub mod records;
pub mod routes;
pub mod server;
pub mod types;

pub use config::{Args, ClientArgs};
pub use server::{run, AppState};
pub use types::{ApiError, Result};
