//! `aluguetudo-portal`: the portal's application workflows.
//!
//! Everything here talks to the backend through a shared
//! [`BackendClient`](aluguetudo_gateway::BackendClient) and reports
//! user-facing outcomes as [`Notice`]s.

pub mod bootstrap;
pub mod directory;
pub mod error;
pub mod notify;
pub mod provisioning;
pub mod session;
pub mod tasks;

pub use bootstrap::{AdminBootstrap, BootstrapCredentials, BootstrapOutcome};
pub use directory::{SaveOutcome, UserDirectory};
pub use error::PortalError;
pub use notify::{Notice, NoticeLevel, NoticeLog, NoticeSink};
pub use provisioning::{ProvisionOutcome, ProvisionPath, Provisioner, ProvisioningConfig};
pub use session::SessionHolder;
pub use tasks::TaskBoards;
