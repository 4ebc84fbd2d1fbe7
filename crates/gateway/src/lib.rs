//! `aluguetudo-gateway`: the backend-as-a-service collaborator.
//!
//! - `backend.rs`: the [`Backend`] contract (auth, table and RPC calls, explicit credentials)
//! - `http.rs`: REST implementation against the hosted platform
//! - `memory.rs`: in-process implementation for tests and local development
//! - `client.rs`: session-holding client that mirrors the browser SDK's behavior

pub mod backend;
pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod model;

pub use backend::Backend;
pub use client::BackendClient;
pub use error::GatewayError;
pub use http::{HttpBackend, HttpBackendConfig};
pub use memory::{InMemoryBackend, Op};
pub use model::{AuthUser, NewAuthUser, ProfileMetadata, ProfileUpdate, SignUpRequest, SignUpResponse, UserRow};
