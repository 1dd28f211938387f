//! Domain models for the incident lifecycle engine
//!
//! Row structs derive `sqlx::FromRow` behind the `db` feature; JSON columns
//! use `#[sqlx(json)]`. Status and level fields are closed enums, never
//! free text.

pub mod board;
pub mod capture_policy;
pub mod escalation;
pub mod occurrence;
pub mod sla_policy;
pub mod ticket;

pub use board::Board;
pub use capture_policy::{ErrorCapturePolicy, ErrorCapturePolicyCreate, DEFAULT_CAPTURE_STATUS_CODES};
pub use escalation::{EscalationLevel, EscalationRecord, NotificationAttempt};
pub use occurrence::{
    CaptureContext, CapturedError, ErrorOccurrence, OccurrenceStatus, SampleContext,
};
pub use sla_policy::SlaPolicy;
pub use ticket::{Ticket, TicketCreate, TicketPriority};
