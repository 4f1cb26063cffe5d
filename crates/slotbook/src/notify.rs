//! Notification dispatch and housekeeping.
//!
//! Records are created by the scheduling engine (newest first) and only
//! ever mutated by `mark_notification_read`; the unread count is
//! derived on demand, never stored.

use tracing::debug;

use crate::domain::{Notification, NotificationId};
use crate::store::{Collection, Studio};

impl Studio {
    /// All notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.read().notifications.clone()
    }

    /// Flip a notification's read flag. Returns `false` when the id is
    /// unknown.
    pub fn mark_notification_read(&self, id: &NotificationId) -> bool {
        let mut state = self.write();
        let Some(notification) = state.notifications.iter_mut().find(|n| &n.id == id) else {
            return false;
        };
        notification.read = true;
        self.persist(&state, &[Collection::Notifications]);
        true
    }

    /// Drop every notification already marked read.
    pub fn clear_read_notifications(&self) {
        let mut state = self.write();
        let before = state.notifications.len();
        state.notifications.retain(|n| !n.read);
        let dropped = before - state.notifications.len();
        if dropped > 0 {
            debug!(dropped, "cleared read notifications");
            self.persist(&state, &[Collection::Notifications]);
        }
    }

    /// Number of unread notifications.
    pub fn unread_notification_count(&self) -> usize {
        self.read().notifications.iter().filter(|n| !n.read).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MasterId, ServiceId, UserId};
    use crate::schedule::BookingRequest;
    use crate::store::test_support::studio;
    use chrono::NaiveDate;

    fn book_at(studio: &Studio, time: &str) {
        studio
            .create_appointment(BookingRequest {
                client_name: "Olena".to_string(),
                client_phone: "0671234567".to_string(),
                master_id: MasterId::from("master-1"),
                services: vec![ServiceId::from("svc-2")],
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                start_time: time.to_string(),
                notes: String::new(),
                created_by: UserId::from("user-admin"),
            })
            .unwrap();
    }

    #[test]
    fn test_newest_notification_first() {
        let studio = studio();
        book_at(&studio, "10:00");
        book_at(&studio, "12:00");

        let notifications = studio.notifications();
        assert_eq!(notifications.len(), 2);
        assert!(notifications[0].message.contains("12:00"));
        assert!(notifications[1].message.contains("10:00"));
    }

    #[test]
    fn test_mark_read_and_derived_count() {
        let studio = studio();
        book_at(&studio, "10:00");
        book_at(&studio, "12:00");
        assert_eq!(studio.unread_notification_count(), 2);

        let first = studio.notifications()[0].id.clone();
        assert!(studio.mark_notification_read(&first));
        assert_eq!(studio.unread_notification_count(), 1);

        assert!(!studio.mark_notification_read(&NotificationId::from("ntf-none")));
    }

    #[test]
    fn test_clear_drops_only_read() {
        let studio = studio();
        book_at(&studio, "10:00");
        book_at(&studio, "12:00");
        let first = studio.notifications()[0].id.clone();
        studio.mark_notification_read(&first);

        studio.clear_read_notifications();
        let remaining = studio.notifications();
        assert_eq!(remaining.len(), 1);
        assert!(!remaining[0].read);
        assert_eq!(studio.unread_notification_count(), 1);
    }
}
