//! ClickUp API access.
//!
//! # Layers
//!
//! - [`transport`]: raw HTTP behind the [`Transport`] trait, plus the
//!   [`AuthenticatedTransport`] wrapper that signs requests, honours the rate
//!   limit and classifies 401 responses
//! - [`rate_limit`]: the quota tracker shared by every request
//! - [`client`]: typed operations used by the commands
//! - [`models`]: wire types

pub mod client;
pub mod errors;
pub mod models;
pub mod rate_limit;
pub mod transport;

pub use client::{ClickUpClient, TaskQuery, API_BASE};
pub use errors::ApiError;
pub use rate_limit::{RateLimiter, RateState};
pub use transport::{AuthenticatedTransport, HttpRequest, HttpResponse, Method, Transport, UreqTransport};
