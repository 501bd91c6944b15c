// campcare-api: Async Rust client for the Camping.care REST API.

pub mod client;
pub mod error;
pub mod outcome;
pub mod transport;
pub mod types;

pub use client::{CampingCareClient, DEFAULT_API_URL};
pub use error::Error;
pub use outcome::{ErrorDescriptor, ErrorKind, Outcome};
pub use transport::{TlsMode, TransportConfig};
pub use types::{LicensePlateQuery, NamedRef, PlateCheck, Place, RemoteId, Reservation, ReservationMatch};
