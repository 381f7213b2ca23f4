//! Core domain types for the tape chart-trading engine.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `SymbolProfile`, `SymbolTable`: instrument tick size and point value lookup
//! - `Side`, `PositionSide`, `OrderType`, `TimeInForce`: trading enums
//! - `RetrySchedule`: shared bounded-backoff primitive

pub mod account;
pub mod decimal;
pub mod error;
pub mod order;
pub mod retry;
pub mod symbol;

pub use account::{AccountId, ActiveAccount};
pub use decimal::{Price, Qty};
pub use error::{CoreError, CoreResult};
pub use order::{is_working_status, OrderType, PositionSide, Side, TimeInForce};
pub use retry::{Backoff, RetrySchedule};
pub use symbol::{matches_chart, normalize_symbol, SymbolProfile, SymbolTable};
