//! Error types for booking-engine operations.

use crate::domain::AppointmentId;
use thiserror::Error;

/// The broad class of a [`BookingError`], for boundary-layer mapping to
/// user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Storage,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Slot unavailable: conflicts with appointment {0}")]
    SlotTaken(AppointmentId),

    #[error("A booking for this master and day is already in flight")]
    Busy,

    #[error("Stale appointment version: expected {expected}, found {found}")]
    StaleVersion { expected: u64, found: u64 },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BookingError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        BookingError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        BookingError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Validation { .. } => ErrorKind::Validation,
            BookingError::SlotTaken(_) | BookingError::Busy | BookingError::StaleVersion { .. } => {
                ErrorKind::Conflict
            }
            BookingError::NotFound { .. } => ErrorKind::NotFound,
            BookingError::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BookingError::validation("time", "not HH:MM").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            BookingError::SlotTaken(AppointmentId::from("appt-1")).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(BookingError::Busy.kind(), ErrorKind::Conflict);
        assert_eq!(
            BookingError::not_found("master", "master-9").kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_conflict_message_names_the_blocker() {
        let err = BookingError::SlotTaken(AppointmentId::from("appt-42"));
        assert!(err.to_string().contains("appt-42"));
    }
}
