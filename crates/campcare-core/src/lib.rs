//! Integration layer between `campcare-api` and a hosting application.
//!
//! This crate owns everything between "a user configured an account" and
//! "a consumer received a lookup result":
//!
//! - **[`IntegrationManager`]**: the config-entry lifecycle (set up, update
//!   options, unload). Enforces display-name uniqueness and applies
//!   options-over-data precedence before anything touches the network.
//!
//! - **[`InstanceRegistry`]**: exclusive owner of the live
//!   `instance id → CampingCareClient` mapping. Every client is validated
//!   through a version probe ([`validator`]) before it becomes reachable, and
//!   is rebuilt from scratch whenever its configuration changes.
//!
//! - **[`Dispatcher`]**: turns a [`CommandRequest`] into a client call. The
//!   request/response entry point ([`Dispatcher::call`]) returns a
//!   [`Reply`]; the fire-and-forget entry point ([`Dispatcher::fire`])
//!   broadcasts a [`LookupEvent`] on success. Both share one execution path.

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod registry;
pub mod validator;

/// Integration domain; prefixes event topics.
pub const DOMAIN: &str = "campingcareha";

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::requests::CommandRequest;
pub use command::{Command, CommandResult, Operation};
pub use config::{
    ClientSettings, ConfigEntry, InstanceConfig, InstanceId, InstanceOptions,
    IntegrationInstance, TlsVerification,
};
pub use dispatcher::{Dispatcher, Reply, ReplyError};
pub use error::CoreError;
pub use event::LookupEvent;
pub use lifecycle::{EntryRecord, EntryState, IntegrationManager};
pub use registry::{InstanceRegistry, RegisteredInstance};

// Re-export the wire-level types consumers see in replies and events.
pub use campcare_api::{
    DEFAULT_API_URL, ErrorDescriptor, ErrorKind, LicensePlateQuery, Outcome, PlateCheck, Place,
    Reservation, ReservationMatch,
};
