//! Core module - the query handling that does not depend on a frontend.
//!
//! - [`query`]: queries and their cancellation
//! - [`item`]: result items and actions
//! - [`adapter`]: evaluation of queries against a calculation engine

pub mod adapter;
pub mod item;
pub mod query;

pub use adapter::{Outcome, QueryAdapter};
pub use item::{Action, ActionKind, RankItem, ResultItem};
pub use query::{CancelHandle, Query};
