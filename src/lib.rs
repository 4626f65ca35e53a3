//! Command/response test sequences for laboratory instruments over
//! heterogeneous transports: raw SCPI over TCP, and Prologix-style GPIB
//! bridges reachable over USB-serial or a network socket.
//!
//! The [`Session`] layer normalizes the framing differences between direct
//! and bridged transports, [`Personality`] holds the per-instrument command
//! tables and completion predicates, and [`read_device`]/[`write_device`]
//! orchestrate full acquisition and ramp-write runs.

mod address;
mod error;
mod exercise;
mod instrument;
mod session;
pub mod transport;

pub use address::{Address, InvalidAddress, SCPI_RAW_PORT};
pub use error::{ConnectError, ExerciseError, ReadError, TransferError, WriteError};
pub use exercise::{read_device, write_device, Descriptor, ExerciseOptions, ReadOutcome, WriteOutcome};
pub use exercise::{POLL_INTERVAL, SAMPLE_INTERVAL};
pub use instrument::{InvalidPersonality, Personality, WriteProgram};
pub use session::{Session, SessionOptions, BRIDGE_SETTLE, DEFAULT_TIMEOUT, INSTRUMENT_SETTLE};
pub use transport::{AnyTransport, Transport};
