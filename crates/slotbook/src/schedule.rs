//! The scheduling engine: slot availability, booking, and moves.
//!
//! The invariant everything here defends: for one master and one
//! calendar day, non-cancelled appointments never overlap under
//! half-open `[start, end)` semantics. Appointments touching at a
//! boundary are legal back-to-back bookings.
//!
//! Every mutation that can change an appointment's effective interval
//! (create, move, and interval-touching patches) runs the same
//! check-then-write sequence inside a per-(master, day) bucket lock, so
//! two colliding booking attempts cannot both pass the availability
//! check. A booking attempt against a bucket that is already mid-write
//! fails fast with [`BookingError::Busy`] instead of queueing; silent
//! retry could reorder colliding bookings unpredictably.

use chrono::{Duration, NaiveDate};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use tracing::{debug, info, warn};

use crate::domain::{
    Appointment, AppointmentId, AppointmentPatch, AppointmentStatus, Client, ClientId, MasterId,
    Notification, NotificationId, NotificationKind, ServiceId, UserId,
};
use crate::error::{BookingError, Result};
use crate::store::{Collection, State, Studio};
use crate::timegrid::{at_minutes, format_wall_time, minutes_of_day, overlaps, parse_wall_time};

/// Everything needed to book a slot.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub client_name: String,
    pub client_phone: String,
    pub master_id: MasterId,
    pub services: Vec<ServiceId>,
    pub date: NaiveDate,
    /// Wall start time, `"HH:MM"`.
    pub start_time: String,
    pub notes: String,
    pub created_by: UserId,
}

/// Minutes-of-day span of an appointment. The end is taken from the
/// stored duration, not the end's own wall time, so an interval that
/// runs past midnight still compares correctly within its day.
fn span_of(appointment: &Appointment) -> (u32, u32) {
    let start = minutes_of_day(appointment.start);
    let length = (appointment.end - appointment.start).num_minutes().max(0) as u32;
    (start, start + length)
}

/// First non-cancelled appointment of the master on `date` whose span
/// intersects `[start_min, end_min)`, skipping `exclude`.
fn conflicting(
    state: &State,
    master_id: &MasterId,
    date: NaiveDate,
    start_min: u32,
    end_min: u32,
    exclude: Option<&AppointmentId>,
) -> Option<AppointmentId> {
    state
        .appointments
        .iter()
        .filter(|a| &a.master_id == master_id)
        .filter(|a| a.status != AppointmentStatus::Cancelled)
        .filter(|a| Some(&a.id) != exclude)
        .filter(|a| a.start.date() == date)
        .find(|a| {
            let (a_start, a_end) = span_of(a);
            overlaps(start_min, end_min, a_start, a_end)
        })
        .map(|a| a.id.clone())
}

/// Summed duration in minutes of the resolvable services. Identities
/// the catalog no longer knows contribute nothing, matching how the
/// analytics side treats them.
fn summed_duration(state: &State, services: &[ServiceId]) -> u32 {
    services
        .iter()
        .filter_map(|id| state.service(id))
        .map(|s| s.duration_minutes)
        .sum()
}

impl Studio {
    fn bucket(&self, master_id: &MasterId, date: NaiveDate) -> Arc<Mutex<()>> {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets
            .entry((master_id.clone(), date))
            .or_default()
            .clone()
    }

    /// Fail-fast admission to a (master, day) bucket.
    fn try_enter_bucket<'a>(bucket: &'a Mutex<()>) -> Result<MutexGuard<'a, ()>> {
        match bucket.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(BookingError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        }
    }

    /// Whether `[start_time, start_time + duration)` is free on the
    /// master's calendar for the given day. Pure read, no side effects.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] when `start_time` is not a
    /// valid `"HH:MM"` wall time.
    pub fn is_time_slot_available(
        &self,
        master_id: &MasterId,
        date: NaiveDate,
        start_time: &str,
        duration_minutes: u32,
        exclude: Option<&AppointmentId>,
    ) -> Result<bool> {
        let start_min = parse_wall_time(start_time)?;
        let end_min = start_min + duration_minutes;
        let state = self.read();
        Ok(conflicting(&state, master_id, date, start_min, end_min, exclude).is_none())
    }

    /// Book a slot atomically: validate, check availability, insert the
    /// appointment, upsert the client by phone, and notify the master —
    /// either the whole sequence is observable or none of it.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] — unknown master or service,
    ///   empty service list, malformed time
    /// - [`BookingError::SlotTaken`] — the interval intersects an
    ///   existing non-cancelled appointment; carries the blocker's id
    /// - [`BookingError::Busy`] — another booking for the same master
    ///   and day is mid-flight
    pub fn create_appointment(&self, request: BookingRequest) -> Result<Appointment> {
        let start_min = parse_wall_time(&request.start_time)?;
        if request.services.is_empty() {
            return Err(BookingError::validation(
                "services",
                "at least one service is required",
            ));
        }

        let bucket = self.bucket(&request.master_id, request.date);
        let _slot = Self::try_enter_bucket(&bucket)?;
        let mut state = self.write();

        let master_name = state
            .master(&request.master_id)
            .map(|m| m.name.clone())
            .ok_or_else(|| {
                BookingError::validation(
                    "master",
                    format!("unknown master {}", request.master_id),
                )
            })?;
        for id in &request.services {
            if state.service(id).is_none() {
                return Err(BookingError::validation(
                    "services",
                    format!("unknown service {id}"),
                ));
            }
        }

        let duration = summed_duration(&state, &request.services);
        let start = at_minutes(request.date, start_min)?;
        let end = start + Duration::minutes(i64::from(duration));
        let end_min = start_min + duration;

        if let Some(blocker) = conflicting(
            &state,
            &request.master_id,
            request.date,
            start_min,
            end_min,
            None,
        ) {
            warn!(
                master = %request.master_id,
                date = %request.date,
                start = %request.start_time,
                blocker = %blocker,
                "booking rejected: slot taken"
            );
            return Err(BookingError::SlotTaken(blocker));
        }

        let now = self.clock.now();
        let client_id = if let Some(client) = state
            .clients
            .iter_mut()
            .find(|c| c.phone == request.client_phone)
        {
            client.total_visits += 1;
            client.last_visit = Some(now);
            client.id.clone()
        } else {
            let client = Client {
                id: ClientId(format!("client-{}", self.ids.next_id())),
                name: request.client_name.clone(),
                phone: request.client_phone.clone(),
                created_at: now,
                last_visit: Some(now),
                total_visits: 1,
                favorite_services: request.services.clone(),
            };
            let id = client.id.clone();
            state.clients.push(client);
            id
        };

        let appointment = Appointment {
            id: AppointmentId(format!("appt-{}", self.ids.next_id())),
            client_id,
            client_name: request.client_name.clone(),
            client_phone: request.client_phone.clone(),
            master_id: request.master_id.clone(),
            services: request.services.clone(),
            start,
            end,
            status: AppointmentStatus::New,
            notes: request.notes,
            created_at: now,
            created_by: request.created_by,
            version: 1,
        };
        state.appointments.push(appointment.clone());

        let notification = Notification {
            id: NotificationId(format!("ntf-{}", self.ids.next_id())),
            title: "New booking".to_string(),
            message: format!(
                "{} booked {} on {} with {}. Services: {}",
                request.client_name,
                request.start_time.trim(),
                request.date,
                master_name,
                request.services.len()
            ),
            date: now,
            read: false,
            kind: NotificationKind::NewAppointment,
            appointment_id: Some(appointment.id.clone()),
        };
        state.notifications.insert(0, notification);

        self.persist(
            &state,
            &[
                Collection::Appointments,
                Collection::Clients,
                Collection::Notifications,
            ],
        );
        info!(
            appointment = %appointment.id,
            master = %appointment.master_id,
            date = %request.date,
            start = %request.start_time,
            minutes = duration,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Move an appointment to a new master and/or start time on its
    /// original date. Duration is recomputed from the current service
    /// set. Returns `Ok(false)` and mutates nothing when the target
    /// slot is taken.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] — no such appointment
    /// - [`BookingError::Validation`] — unknown target master or
    ///   malformed time
    /// - [`BookingError::Busy`] — the target bucket is mid-write
    pub fn move_appointment(
        &self,
        id: &AppointmentId,
        new_master_id: &MasterId,
        new_start_time: &str,
    ) -> Result<bool> {
        self.move_appointment_inner(id, None, new_master_id, new_start_time)
    }

    /// [`Self::move_appointment`] with optimistic concurrency: the move
    /// is rejected when the stored appointment version no longer equals
    /// `expected_version`, so a boundary layer can refuse a move that
    /// was computed against data that has since changed.
    ///
    /// # Errors
    ///
    /// [`BookingError::StaleVersion`] on a version mismatch, plus
    /// everything [`Self::move_appointment`] returns.
    pub fn move_appointment_versioned(
        &self,
        id: &AppointmentId,
        expected_version: u64,
        new_master_id: &MasterId,
        new_start_time: &str,
    ) -> Result<bool> {
        self.move_appointment_inner(id, Some(expected_version), new_master_id, new_start_time)
    }

    fn move_appointment_inner(
        &self,
        id: &AppointmentId,
        expected_version: Option<u64>,
        new_master_id: &MasterId,
        new_start_time: &str,
    ) -> Result<bool> {
        let start_min = parse_wall_time(new_start_time)?;

        // The bucket key needs the appointment's date; look it up first.
        let date = {
            let state = self.read();
            state
                .appointments
                .iter()
                .find(|a| &a.id == id)
                .map(|a| a.start.date())
                .ok_or_else(|| BookingError::not_found("appointment", id.to_string()))?
        };

        let bucket = self.bucket(new_master_id, date);
        let _slot = Self::try_enter_bucket(&bucket)?;
        let mut state = self.write();

        // Re-find under the write lock; it may have been deleted since.
        let Some(index) = state.appointments.iter().position(|a| &a.id == id) else {
            return Err(BookingError::not_found("appointment", id.to_string()));
        };
        let current_version = state.appointments[index].version;
        if let Some(expected) = expected_version {
            if current_version != expected {
                return Err(BookingError::StaleVersion {
                    expected,
                    found: current_version,
                });
            }
        }
        if state.master(new_master_id).is_none() {
            return Err(BookingError::validation(
                "master",
                format!("unknown master {new_master_id}"),
            ));
        }

        let services = state.appointments[index].services.clone();
        let duration = summed_duration(&state, &services);
        let start = at_minutes(date, start_min)?;
        let end = start + Duration::minutes(i64::from(duration));
        let end_min = start_min + duration;

        if let Some(blocker) = conflicting(&state, new_master_id, date, start_min, end_min, Some(id))
        {
            debug!(appointment = %id, blocker = %blocker, "move rejected: slot taken");
            return Ok(false);
        }

        let appointment = &mut state.appointments[index];
        appointment.master_id = new_master_id.clone();
        appointment.start = start;
        appointment.end = end;
        appointment.version += 1;

        self.persist(&state, &[Collection::Appointments]);
        info!(
            appointment = %id,
            master = %new_master_id,
            start = %format_wall_time(start_min),
            "appointment moved"
        );
        Ok(true)
    }

    /// Patch an appointment. Patches that change the effective interval
    /// (services, start time, or master) go through the same slot check
    /// as create/move and return `Ok(false)` without mutating when the
    /// resulting interval is taken; status and note edits apply
    /// directly. Returns `Ok(false)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] — unknown patched master/service,
    ///   malformed time, empty patched service list
    /// - [`BookingError::Busy`] — the target bucket is mid-write
    pub fn update_appointment(&self, id: &AppointmentId, patch: AppointmentPatch) -> Result<bool> {
        let reshapes_interval =
            patch.services.is_some() || patch.start_time.is_some() || patch.master_id.is_some();

        if !reshapes_interval {
            let mut state = self.write();
            let Some(appointment) = state.appointments.iter_mut().find(|a| &a.id == id) else {
                return Ok(false);
            };
            if let Some(status) = patch.status {
                appointment.status = status;
            }
            if let Some(notes) = patch.notes {
                appointment.notes = notes;
            }
            appointment.version += 1;
            self.persist(&state, &[Collection::Appointments]);
            return Ok(true);
        }

        let new_start_min = patch.start_time.as_deref().map(parse_wall_time).transpose()?;
        if let Some(services) = &patch.services {
            if services.is_empty() {
                return Err(BookingError::validation(
                    "services",
                    "at least one service is required",
                ));
            }
        }

        let (date, current_master) = {
            let state = self.read();
            match state.appointments.iter().find(|a| &a.id == id) {
                Some(a) => (a.start.date(), a.master_id.clone()),
                None => return Ok(false),
            }
        };
        let target_master = patch.master_id.clone().unwrap_or(current_master);

        let bucket = self.bucket(&target_master, date);
        let _slot = Self::try_enter_bucket(&bucket)?;
        let mut state = self.write();

        let Some(index) = state.appointments.iter().position(|a| &a.id == id) else {
            return Ok(false);
        };
        if state.master(&target_master).is_none() {
            return Err(BookingError::validation(
                "master",
                format!("unknown master {target_master}"),
            ));
        }
        let services = patch
            .services
            .clone()
            .unwrap_or_else(|| state.appointments[index].services.clone());
        for service_id in &services {
            if state.service(service_id).is_none() {
                return Err(BookingError::validation(
                    "services",
                    format!("unknown service {service_id}"),
                ));
            }
        }

        let start_min =
            new_start_min.unwrap_or_else(|| minutes_of_day(state.appointments[index].start));
        let duration = summed_duration(&state, &services);
        let start = at_minutes(date, start_min)?;
        let end = start + Duration::minutes(i64::from(duration));

        if let Some(blocker) = conflicting(
            &state,
            &target_master,
            date,
            start_min,
            start_min + duration,
            Some(id),
        ) {
            debug!(appointment = %id, blocker = %blocker, "patch rejected: slot taken");
            return Ok(false);
        }

        let appointment = &mut state.appointments[index];
        appointment.master_id = target_master;
        appointment.services = services;
        appointment.start = start;
        appointment.end = end;
        if let Some(status) = patch.status {
            appointment.status = status;
        }
        if let Some(notes) = patch.notes {
            appointment.notes = notes;
        }
        appointment.version += 1;

        self.persist(&state, &[Collection::Appointments]);
        Ok(true)
    }

    /// Remove an appointment outright. Returns `false` when the id is
    /// unknown. Cancelling (a status patch) is usually the better
    /// operation; deletion erases history.
    pub fn delete_appointment(&self, id: &AppointmentId) -> bool {
        let mut state = self.write();
        let before = state.appointments.len();
        state.appointments.retain(|a| &a.id != id);
        if state.appointments.len() == before {
            return false;
        }
        self.persist(&state, &[Collection::Appointments]);
        true
    }

    // ── Read accessors ──────────────────────────────────────────────────

    /// Non-cancelled appointments on a calendar day, ordered by start
    /// time (id as tiebreak for a stable order).
    pub fn appointments_for_date(&self, date: NaiveDate) -> Vec<Appointment> {
        let state = self.read();
        let mut day: Vec<Appointment> = state
            .appointments
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .filter(|a| a.start.date() == date)
            .cloned()
            .collect();
        day.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.0.cmp(&b.id.0)));
        day
    }

    /// Non-cancelled appointments of one master on a calendar day,
    /// ordered by start time.
    pub fn appointments_for_master(&self, master_id: &MasterId, date: NaiveDate) -> Vec<Appointment> {
        self.appointments_for_date(date)
            .into_iter()
            .filter(|a| &a.master_id == master_id)
            .collect()
    }

    /// The client's full visit history, every status included, newest
    /// first by start time.
    pub fn client_visits(&self, client_id: &ClientId) -> Vec<Appointment> {
        let state = self.read();
        let mut visits: Vec<Appointment> = state
            .appointments
            .iter()
            .filter(|a| &a.client_id == client_id)
            .cloned()
            .collect();
        visits.sort_by(|a, b| b.start.cmp(&a.start));
        visits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::studio;

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn request(master: &str, time: &str, services: &[&str]) -> BookingRequest {
        BookingRequest {
            client_name: "Olena".to_string(),
            client_phone: "0671234567".to_string(),
            master_id: MasterId::from(master),
            services: services.iter().map(|s| ServiceId::from(*s)).collect(),
            date: june_first(),
            start_time: time.to_string(),
            notes: String::new(),
            created_by: UserId::from("user-admin"),
        }
    }

    #[test]
    fn test_booking_derives_end_from_service_durations() {
        let studio = studio();
        // Manicure (60) + Design (30) = 90 minutes from 10:00.
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1", "svc-2"]))
            .unwrap();
        assert_eq!((appt.end - appt.start).num_minutes(), 90);
        assert_eq!(appt.status, AppointmentStatus::New);
        assert_eq!(appt.version, 1);
    }

    #[test]
    fn test_scenario_overlap_rejected_boundary_allowed() {
        let studio = studio();
        // 30-minute booking at 10:00 (Design).
        studio
            .create_appointment(request("master-1", "10:00", &["svc-2"]))
            .unwrap();

        // 10:15 collides regardless of requested duration.
        let err = studio
            .create_appointment(request("master-1", "10:15", &["svc-2"]))
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotTaken(_)));

        // 10:30 starts exactly at the previous end — allowed.
        studio
            .create_appointment(request("master-1", "10:30", &["svc-2"]))
            .unwrap();
    }

    #[test]
    fn test_other_master_is_not_a_conflict() {
        let studio = studio();
        studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        studio
            .create_appointment(request("master-2", "10:00", &["svc-1"]))
            .unwrap();
    }

    #[test]
    fn test_cancelled_appointments_free_their_slot() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        studio
            .update_appointment(
                &appt.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Cancelled),
                    ..Default::default()
                },
            )
            .unwrap();
        // The slot is bookable again, and the day view hides the
        // cancelled record.
        studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        assert_eq!(studio.appointments_for_date(june_first()).len(), 1);
    }

    #[test]
    fn test_conflict_rejection_is_non_mutating() {
        let studio = studio();
        studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        let appointments = studio.appointments();
        let clients = studio.clients();
        let notifications = studio.notifications();

        let mut colliding = request("master-1", "10:30", &["svc-1"]);
        colliding.client_phone = "0509999999".to_string();
        assert!(studio.create_appointment(colliding).is_err());

        assert_eq!(studio.appointments(), appointments);
        assert_eq!(studio.clients(), clients);
        assert_eq!(studio.notifications(), notifications);
    }

    #[test]
    fn test_unknown_references_are_validation_errors() {
        let studio = studio();
        let unknown_master = studio
            .create_appointment(request("master-99", "10:00", &["svc-1"]))
            .unwrap_err();
        assert!(matches!(
            unknown_master,
            BookingError::Validation { field: "master", .. }
        ));

        let unknown_service = studio
            .create_appointment(request("master-1", "10:00", &["svc-99"]))
            .unwrap_err();
        assert!(matches!(
            unknown_service,
            BookingError::Validation { field: "services", .. }
        ));

        let no_services = studio
            .create_appointment(request("master-1", "10:00", &[]))
            .unwrap_err();
        assert!(matches!(no_services, BookingError::Validation { .. }));

        let bad_time = studio
            .create_appointment(request("master-1", "25:99", &["svc-1"]))
            .unwrap_err();
        assert!(matches!(bad_time, BookingError::Validation { .. }));
    }

    #[test]
    fn test_client_upsert_by_phone() {
        let studio = studio();
        studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        let first = studio.clients();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].total_visits, 1);
        assert_eq!(first[0].favorite_services, vec![ServiceId::from("svc-1")]);

        // Same phone, later slot: counter bumps, no duplicate record.
        studio
            .create_appointment(request("master-1", "12:00", &["svc-2"]))
            .unwrap();
        let second = studio.clients();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].total_visits, 2);
        assert!(second[0].last_visit.is_some());

        // Different phone: a second record.
        let mut other = request("master-2", "10:00", &["svc-1"]);
        other.client_phone = "0937654321".to_string();
        other.client_name = "Daryna".to_string();
        studio.create_appointment(other).unwrap();
        assert_eq!(studio.clients().len(), 2);
    }

    #[test]
    fn test_booking_links_appointment_to_client_record() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        let client = &studio.clients()[0];
        assert_eq!(appt.client_id, client.id);
        assert_eq!(studio.client_visits(&client.id).len(), 1);
    }

    #[test]
    fn test_booking_notifies_the_master() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1", "svc-2"]))
            .unwrap();
        let notifications = studio.notifications();
        assert_eq!(notifications.len(), 1);
        let n = &notifications[0];
        assert_eq!(n.kind, NotificationKind::NewAppointment);
        assert_eq!(n.appointment_id.as_ref(), Some(&appt.id));
        assert!(!n.read);
        assert!(n.message.contains("Olena"));
        assert!(n.message.contains("10:00"));
        assert!(n.message.contains("Viktoria"));
    }

    #[test]
    fn test_move_to_free_slot() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        let moved = studio
            .move_appointment(&appt.id, &MasterId::from("master-2"), "14:30")
            .unwrap();
        assert!(moved);

        let stored = studio
            .appointments()
            .into_iter()
            .find(|a| a.id == appt.id)
            .unwrap();
        assert_eq!(stored.master_id, MasterId::from("master-2"));
        assert_eq!(minutes_of_day(stored.start), 14 * 60 + 30);
        // Same date, duration re-derived from the service set.
        assert_eq!(stored.start.date(), june_first());
        assert_eq!((stored.end - stored.start).num_minutes(), 60);
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn test_move_into_conflict_leaves_appointment_unchanged() {
        let studio = studio();
        let blocker = studio
            .create_appointment(request("master-2", "12:00", &["svc-1"]))
            .unwrap();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();

        // 12:30 lands inside the blocker's 12:00–13:00 hour.
        let moved = studio
            .move_appointment(&appt.id, &blocker.master_id, "12:30")
            .unwrap();
        assert!(!moved);

        let stored = studio
            .appointments()
            .into_iter()
            .find(|a| a.id == appt.id)
            .unwrap();
        assert_eq!(stored.master_id, appt.master_id);
        assert_eq!(stored.start, appt.start);
        assert_eq!(stored.end, appt.end);
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn test_move_missing_appointment_is_not_found() {
        let studio = studio();
        let err = studio
            .move_appointment(
                &AppointmentId::from("appt-none"),
                &MasterId::from("master-1"),
                "10:00",
            )
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { .. }));
    }

    #[test]
    fn test_versioned_move_rejects_stale_version() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        // Bump the version behind the caller's back.
        studio
            .move_appointment(&appt.id, &MasterId::from("master-1"), "11:00")
            .unwrap();

        let err = studio
            .move_appointment_versioned(&appt.id, 1, &MasterId::from("master-1"), "12:00")
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::StaleVersion {
                expected: 1,
                found: 2
            }
        ));

        // The correct version goes through.
        assert!(studio
            .move_appointment_versioned(&appt.id, 2, &MasterId::from("master-1"), "12:00")
            .unwrap());
    }

    #[test]
    fn test_service_patch_is_conflict_checked() {
        let studio = studio();
        // 10:00–10:30 and 10:30–11:30 back to back on one master.
        let first = studio
            .create_appointment(request("master-1", "10:00", &["svc-2"]))
            .unwrap();
        studio
            .create_appointment(request("master-1", "10:30", &["svc-1"]))
            .unwrap();

        // Growing the first booking to 90 minutes would overlap the
        // second; the patch must refuse and leave everything as-is.
        let grown = studio
            .update_appointment(
                &first.id,
                AppointmentPatch {
                    services: Some(vec![ServiceId::from("svc-1"), ServiceId::from("svc-2")]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!grown);
        let stored = studio
            .appointments()
            .into_iter()
            .find(|a| a.id == first.id)
            .unwrap();
        assert_eq!(stored.services, vec![ServiceId::from("svc-2")]);
        assert_eq!((stored.end - stored.start).num_minutes(), 30);

        // Shrinking in place is always fine.
        let shrunk = studio
            .update_appointment(
                &first.id,
                AppointmentPatch {
                    services: Some(vec![ServiceId::from("svc-5")]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(shrunk);
    }

    #[test]
    fn test_note_and_status_patch_skips_slot_check() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        let patched = studio
            .update_appointment(
                &appt.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Confirmed),
                    notes: Some("allergic to gel base".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(patched);
        let stored = studio
            .appointments()
            .into_iter()
            .find(|a| a.id == appt.id)
            .unwrap();
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        assert_eq!(stored.notes, "allergic to gel base");
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn test_patch_time_moves_within_day() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        studio
            .update_appointment(
                &appt.id,
                AppointmentPatch {
                    start_time: Some("16:15".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let stored = studio
            .appointments()
            .into_iter()
            .find(|a| a.id == appt.id)
            .unwrap();
        assert_eq!(minutes_of_day(stored.start), 16 * 60 + 15);
        assert_eq!(stored.start.date(), june_first());
        assert_eq!((stored.end - stored.start).num_minutes(), 60);
    }

    #[test]
    fn test_deleting_master_cascades_to_appointments() {
        let studio = studio();
        studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        studio
            .create_appointment(request("master-1", "12:00", &["svc-2"]))
            .unwrap();
        let mut other = request("master-2", "10:00", &["svc-1"]);
        other.client_phone = "0930000000".to_string();
        studio.create_appointment(other).unwrap();

        assert!(studio.delete_master(&MasterId::from("master-1")));
        assert!(studio
            .appointments_for_master(&MasterId::from("master-1"), june_first())
            .is_empty());
        // The other master's calendar is untouched.
        assert_eq!(
            studio
                .appointments_for_master(&MasterId::from("master-2"), june_first())
                .len(),
            1
        );
    }

    #[test]
    fn test_service_delete_refused_while_booked() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        let err = studio.delete_service(&ServiceId::from("svc-1")).unwrap_err();
        assert!(matches!(err, BookingError::Validation { .. }));

        // Once the appointment is cancelled the service can go.
        studio
            .update_appointment(
                &appt.id,
                AppointmentPatch {
                    status: Some(AppointmentStatus::Cancelled),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(studio.delete_service(&ServiceId::from("svc-1")).unwrap());
    }

    #[test]
    fn test_day_view_is_ordered_and_idempotent() {
        let studio = studio();
        studio
            .create_appointment(request("master-1", "14:00", &["svc-2"]))
            .unwrap();
        studio
            .create_appointment(request("master-1", "09:00", &["svc-2"]))
            .unwrap();
        studio
            .create_appointment(request("master-2", "11:00", &["svc-2"]))
            .unwrap();

        let day = studio.appointments_for_date(june_first());
        let starts: Vec<u32> = day.iter().map(|a| minutes_of_day(a.start)).collect();
        assert_eq!(starts, vec![9 * 60, 11 * 60, 14 * 60]);
        assert_eq!(day, studio.appointments_for_date(june_first()));
        // A different day is empty.
        assert!(studio
            .appointments_for_date(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
            .is_empty());
    }

    #[test]
    fn test_client_visits_newest_first() {
        let studio = studio();
        studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        studio
            .create_appointment(request("master-1", "15:00", &["svc-2"]))
            .unwrap();
        let client_id = studio.clients()[0].id.clone();

        let visits = studio.client_visits(&client_id);
        assert_eq!(visits.len(), 2);
        assert!(visits[0].start > visits[1].start);
    }

    #[test]
    fn test_delete_appointment() {
        let studio = studio();
        let appt = studio
            .create_appointment(request("master-1", "10:00", &["svc-1"]))
            .unwrap();
        assert!(studio.delete_appointment(&appt.id));
        assert!(!studio.delete_appointment(&appt.id));
        assert!(studio.appointments_for_date(june_first()).is_empty());
    }
}
