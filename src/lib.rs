//! Cache invalidation and preview tokens for headless CMS frontends.
//!
//! A content change flows through [`invalidation::InvalidationPipeline`]:
//! tags are derived, the frontend is asked to revalidate them, and the CDN
//! is purged at most once per unit of work, which also flushes the
//! [`cache::ResponseCache`]. [`application::preview`] issues and verifies
//! signed preview tokens. [`infra::http`] exposes both over HTTP.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod events;
pub mod infra;
pub mod invalidation;
pub mod util;
