//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod ai;
pub mod auth;
pub mod budgets;
pub mod dashboard;
pub mod feedback;
pub mod hierarchy;
pub mod live;
pub mod transactions;
pub mod uploads;

// Re-export all handlers for use in router
pub use ai::*;
pub use auth::*;
pub use budgets::*;
pub use dashboard::*;
pub use feedback::*;
pub use hierarchy::*;
pub use live::*;
pub use transactions::*;
pub use uploads::*;
