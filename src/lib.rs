//! Owode Agent - savings collection agent management server
//!
//! Agents register and wait for admin approval, then manage customers on a
//! contribution plan and record their payments. Customers and agents are
//! notified by SMS and email along the way.

pub mod agent;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod customer;
pub mod db;
pub mod error;
pub mod mailer;
pub mod metrics;
pub mod notifier;
pub mod payment;
pub mod rate_limit;
pub mod schedule;
pub mod server;
pub mod sms;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{AppError, AppResult};
