//! Social feed data-access layer
//!
//! Fan-out-on-write feeds, a mirrored follow graph, cursor pagination and
//! viewer-relative post state on top of a `doc_store::DocumentStore`.

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod observers;
pub mod pagination;
pub mod repository;
pub mod services;
pub mod telemetry;

pub use client::SocialClient;
pub use config::{Config, FeedConfig};
pub use error::{ServiceError, ServiceResult};
pub use identity::{IdentityProvider, StaticIdentity};
pub use metrics::{register_all as register_metrics, FeedMetrics};
pub use observers::{FeedSession, ListenerRegistry, StatsObserver};
pub use pagination::{Page, PageCursor};
