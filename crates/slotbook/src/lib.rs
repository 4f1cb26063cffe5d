//! # slotbook
//!
//! Scheduling and booking engine for small service studios.
//!
//! Given a master, a date, a start time, and a set of requested
//! services, the engine decides atomically whether the interval can be
//! booked, derives the end time from summed service durations, and
//! keeps the client, notification, and cash-ledger collections
//! consistent with that decision. Rendering, authentication, and
//! presentation formatting are left to the caller; the engine exposes
//! data and operations only.
//!
//! ## Modules
//!
//! - [`domain`] — entities, identifiers, roles, and the seed catalog
//! - [`store`] — the [`Studio`] entity store with injected persistence
//! - [`schedule`] — slot availability, booking, moving, patching
//! - [`analytics`] — per-client visit/spend aggregation
//! - [`notify`] — lifecycle notifications
//! - [`ledger`] — append-only cash book and daily revenue
//! - [`env`] — injected clock, id, and storage implementations
//! - [`timegrid`] — wall-time parsing and interval arithmetic
//! - [`error`] — error types
//!
//! ## Invariant
//!
//! For every master and calendar day, the non-cancelled appointments
//! hold pairwise non-overlapping half-open `[start, end)` intervals —
//! after any sequence of create, move, and patch operations.

pub mod analytics;
pub mod domain;
pub mod env;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod schedule;
pub mod store;
pub mod timegrid;

pub use analytics::{ClientAnalytics, FavoriteService};
pub use domain::{
    Appointment, AppointmentId, AppointmentPatch, AppointmentStatus, CashTransaction, Client,
    ClientDraft, ClientId, ClientPatch, DayHours, Master, MasterDraft, MasterId, MasterPatch,
    Notification, NotificationId, NotificationKind, Role, Service, ServiceDraft, ServiceId,
    ServicePatch, TransactionId, TransactionKind, User, UserId, WeekSchedule,
};
pub use env::{
    Clock, DirStorage, FixedClock, IdSource, MemoryStorage, SequentialSource, Storage,
    SystemClock, UuidSource,
};
pub use error::{BookingError, ErrorKind, Result};
pub use schedule::BookingRequest;
pub use store::{Studio, StudioConfig};
