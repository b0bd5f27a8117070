//! JSON:API surface for cairn.
//!
//! Exposes an axum [`Router`] backed by any set of
//! [`cairn_core::repository::EntityRepository`] implementations. Auth, TLS,
//! and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/v1", cairn_api::api_router(services))
//! ```

pub mod document;
pub mod error;
pub mod handlers;
pub mod rules;
pub mod service;
pub mod transform;

use std::sync::Arc;

use axum::{
  Router,
  routing::get,
};
use cairn_core::repository::EntityRepository;

pub use error::ApiError;
pub use handlers::Services;

/// Build a fully-materialised API router for `services`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type. One route pair serves every resource
/// collection; the handlers dispatch on the collection segment.
pub fn api_router<R>(services: Arc<Services<R>>) -> Router<()>
where
  R: EntityRepository + 'static,
{
  Router::new()
    .route(
      "/{collection}",
      get(handlers::list::<R>).post(handlers::create::<R>),
    )
    .route(
      "/{collection}/{id}",
      get(handlers::show::<R>)
        .patch(handlers::update::<R>)
        .delete(handlers::destroy::<R>),
    )
    .with_state(services)
}

#[cfg(test)]
mod tests;
