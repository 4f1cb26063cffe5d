//! Domain entities for the booking engine.
//!
//! All entities are plain serde data carriers; the collections that own
//! them live in [`crate::store`]. Identities are opaque strings produced
//! by the injected [`crate::env::IdSource`], so entities never generate
//! their own ids.
//!
//! Wall-clock fields follow two conventions:
//!
//! - appointment `start`/`end` are [`NaiveDateTime`] — studio-local wall
//!   time, the time printed on the appointment card
//! - audit timestamps (`created_at`, notification and transaction dates)
//!   are [`DateTime<Utc>`] from the injected clock

use chrono::{DateTime, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Identifiers ─────────────────────────────────────────────────────────────

/// Identifier of a staff member (master).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterId(pub String);

/// Identifier of a billable service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub String);

/// Identifier of a client record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

/// Identifier of an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(pub String);

/// Identifier of a cash transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

/// Identifier of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

/// Identifier of the acting user, recorded for audit (`created_by`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

macro_rules! impl_id_display {
    ($($name:ident),+) => {$(
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    )+};
}

impl_id_display!(
    MasterId,
    ServiceId,
    ClientId,
    AppointmentId,
    TransactionId,
    NotificationId,
    UserId
);

// ── Masters ─────────────────────────────────────────────────────────────────

/// Working hours for one weekday, in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub start: u16,
    pub end: u16,
}

/// Per-weekday working hours, Monday first. `None` means a day off.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeekSchedule(pub [Option<DayHours>; 7]);

impl WeekSchedule {
    /// The same hours on each of the given weekdays, the rest off.
    pub fn uniform(start: u16, end: u16, days: &[Weekday]) -> Self {
        let mut week = [None; 7];
        for day in days {
            week[day.num_days_from_monday() as usize] = Some(DayHours { start, end });
        }
        Self(week)
    }

    /// Working hours for a weekday, `None` on a day off.
    pub fn hours_for(&self, day: Weekday) -> Option<DayHours> {
        self.0[day.num_days_from_monday() as usize]
    }
}

/// A staff member who performs services and owns a calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Master {
    pub id: MasterId,
    pub name: String,
    /// Display color tag (hex), consumed by the presentation layer.
    pub color: String,
    pub active: bool,
    pub schedule: WeekSchedule,
}

/// Fields supplied when creating a master; the id is generated.
#[derive(Debug, Clone)]
pub struct MasterDraft {
    pub name: String,
    pub color: String,
    pub active: bool,
    pub schedule: WeekSchedule,
}

/// Partial update for a master. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct MasterPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub active: Option<bool>,
    pub schedule: Option<WeekSchedule>,
}

// ── Services ────────────────────────────────────────────────────────────────

/// A billable catalog entry. Appointments reference services by id,
/// many-to-many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub category: String,
    pub duration_minutes: u32,
    pub price: f64,
    pub color: String,
}

/// Fields supplied when creating a service; the id is generated.
#[derive(Debug, Clone)]
pub struct ServiceDraft {
    pub name: String,
    pub category: String,
    pub duration_minutes: u32,
    pub price: f64,
    pub color: String,
}

/// Partial update for a service. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: Option<u32>,
    pub price: Option<f64>,
    pub color: Option<String>,
}

// ── Clients ─────────────────────────────────────────────────────────────────

/// A walk-in or returning client. The phone number is the natural key:
/// bookings under a phone not seen before create the record, later
/// bookings under the same phone bump the visit counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub last_visit: Option<DateTime<Utc>>,
    pub total_visits: u32,
    /// Services picked at the first booking. Not rewritten on later visits.
    pub favorite_services: Vec<ServiceId>,
}

/// Fields supplied when creating a client explicitly (visit counter
/// starts at zero, unlike the booking-time upsert).
#[derive(Debug, Clone)]
pub struct ClientDraft {
    pub name: String,
    pub phone: String,
}

/// Partial update for a client. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
}

// ── Appointments ────────────────────────────────────────────────────────────

/// Appointment lifecycle status. Cancelled appointments keep their slot
/// in history but never participate in conflict checks or analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    New,
    Confirmed,
    Completed,
    Cancelled,
}

/// A booked interval on one master's calendar.
///
/// `end` is always derived: `start` plus the summed durations of the
/// referenced services at the time of booking or the latest move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub client_id: ClientId,
    /// Snapshot of the client at booking time; the client record may be
    /// renamed later without rewriting history.
    pub client_name: String,
    pub client_phone: String,
    pub master_id: MasterId,
    pub services: Vec<ServiceId>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: AppointmentStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    /// Bumped on every mutation; lets the boundary reject stale moves.
    pub version: u64,
}

/// Partial update for an appointment, applied by
/// [`crate::Studio::update_appointment`]. Patching `services`,
/// `start_time`, or `master_id` changes the effective interval and is
/// re-validated against the slot check before anything is written.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub services: Option<Vec<ServiceId>>,
    /// New start wall time as `"HH:MM"`, keeping the original date.
    pub start_time: Option<String>,
    pub master_id: Option<MasterId>,
}

// ── Cash transactions ───────────────────────────────────────────────────────

/// Direction of a cash transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// One append-only cash book entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashTransaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub description: String,
}

// ── Notifications ───────────────────────────────────────────────────────────

/// Category of a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    NewAppointment,
    StatusChange,
    System,
}

/// A lifecycle notification, newest first in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub read: bool,
    pub kind: NotificationKind,
    pub appointment_id: Option<AppointmentId>,
}

// ── Users and roles ─────────────────────────────────────────────────────────

/// Caller role. Capability checks are boundary-layer policy; the engine
/// itself only records `created_by` for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    Master { master_id: MasterId },
    Admin,
}

impl Role {
    pub fn can_edit_appointments(&self) -> bool {
        matches!(self, Role::Master { .. } | Role::Admin)
    }

    pub fn can_view_client_details(&self) -> bool {
        matches!(self, Role::Master { .. } | Role::Admin)
    }

    pub fn can_view_all_masters(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_manage_settings(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// An authenticated (or guest) caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

// ── Seed catalog ────────────────────────────────────────────────────────────

/// Default studio contact phone for a cold start.
pub const DEFAULT_STUDIO_PHONE: &str = "+380 67 123 4567";

/// Masters seeded on a cold start: three active masters working
/// Tuesday through Saturday, 10:00 to 19:00.
pub fn default_masters() -> Vec<Master> {
    let workweek = || {
        WeekSchedule::uniform(
            10 * 60,
            19 * 60,
            &[
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
            ],
        )
    };
    vec![
        Master {
            id: MasterId::from("master-1"),
            name: "Viktoria".to_string(),
            color: "#8b5cf6".to_string(),
            active: true,
            schedule: workweek(),
        },
        Master {
            id: MasterId::from("master-2"),
            name: "Svitlana".to_string(),
            color: "#ec4899".to_string(),
            active: true,
            schedule: workweek(),
        },
        Master {
            id: MasterId::from("master-3"),
            name: "Yulia".to_string(),
            color: "#06b6d4".to_string(),
            active: true,
            schedule: workweek(),
        },
    ]
}

/// Services seeded on a cold start.
pub fn default_services() -> Vec<Service> {
    let svc = |id: &str, name: &str, category: &str, minutes: u32, price: f64, color: &str| {
        Service {
            id: ServiceId::from(id),
            name: name.to_string(),
            category: category.to_string(),
            duration_minutes: minutes,
            price,
            color: color.to_string(),
        }
    };
    vec![
        svc("svc-1", "Manicure", "nails", 60, 500.0, "#f472b6"),
        svc("svc-2", "Design", "nails", 30, 200.0, "#a78bfa"),
        svc("svc-3", "Gel Polish", "nails", 60, 400.0, "#fb7185"),
        svc("svc-4", "Pedicure", "nails", 90, 600.0, "#34d399"),
        svc("svc-5", "Strengthening", "care", 30, 250.0, "#fbbf24"),
        svc("svc-6", "French", "design", 45, 350.0, "#60a5fa"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_schedule_uniform() {
        let schedule = WeekSchedule::uniform(600, 1140, &[Weekday::Tue, Weekday::Sat]);
        assert_eq!(
            schedule.hours_for(Weekday::Tue),
            Some(DayHours {
                start: 600,
                end: 1140
            })
        );
        assert_eq!(schedule.hours_for(Weekday::Mon), None);
        assert_eq!(schedule.hours_for(Weekday::Sun), None);
    }

    #[test]
    fn test_role_capabilities() {
        let admin = Role::Admin;
        let master = Role::Master {
            master_id: MasterId::from("master-1"),
        };
        let guest = Role::Guest;

        assert!(admin.can_manage_settings());
        assert!(admin.can_view_all_masters());
        assert!(master.can_edit_appointments());
        assert!(!master.can_manage_settings());
        assert!(!guest.can_edit_appointments());
        assert!(!guest.can_view_client_details());
    }

    #[test]
    fn test_seed_catalog_is_stable() {
        // Fixed ids keep cold starts reproducible across processes.
        let masters = default_masters();
        assert_eq!(masters.len(), 3);
        assert_eq!(masters[0].id, MasterId::from("master-1"));
        assert!(masters.iter().all(|m| m.active));

        let services = default_services();
        assert!(services.len() >= 2);
        let manicure = &services[0];
        assert_eq!(manicure.name, "Manicure");
        assert_eq!(manicure.duration_minutes, 60);
        assert_eq!(manicure.price, 500.0);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let s = serde_json::to_string(&AppointmentStatus::Cancelled).unwrap();
        assert_eq!(s, "\"cancelled\"");
        let k = serde_json::to_string(&NotificationKind::NewAppointment).unwrap();
        assert_eq!(k, "\"new-appointment\"");
    }
}
