//! Client analytics derived from the appointment history.
//!
//! Read-only over the store: each query takes the collection read lock
//! once and computes from that consistent snapshot. Prices are looked
//! up live against the current catalog, so a price change retroactively
//! shifts historical spend figures; services that have left the catalog
//! contribute nothing.

use serde::Serialize;

use crate::domain::{AppointmentStatus, ClientId, Service, ServiceId};
use crate::store::Studio;

/// One entry of a client's favorite-service ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteService {
    pub service_id: ServiceId,
    pub service_name: String,
    pub count: u32,
}

/// Aggregated view of one client's booking history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientAnalytics {
    pub client_id: ClientId,
    /// Non-cancelled appointments on record.
    pub total_visits: u32,
    pub total_spent: f64,
    /// `total_spent / total_visits`, zero when there are no visits.
    pub average_check: f64,
    /// Top three services by occurrence; ties keep first-encountered
    /// order.
    pub favorite_services: Vec<FavoriteService>,
    pub last_visit_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl Studio {
    /// Aggregate a client's history. `None` for an unknown client id.
    pub fn client_analytics(&self, client_id: &ClientId) -> Option<ClientAnalytics> {
        let state = self.read();
        let client = state.clients.iter().find(|c| &c.id == client_id)?;

        let visits: Vec<_> = state
            .appointments
            .iter()
            .filter(|a| &a.client_id == client_id)
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .collect();

        let total_spent: f64 = visits
            .iter()
            .flat_map(|a| a.services.iter())
            .filter_map(|id| state.service(id))
            .map(|s| s.price)
            .sum();

        // Occurrence counting in first-encountered order; the stable
        // sort below keeps that order among equal counts.
        let mut counts: Vec<(ServiceId, u32)> = Vec::new();
        for appointment in &visits {
            for service_id in &appointment.services {
                match counts.iter_mut().find(|(id, _)| id == service_id) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((service_id.clone(), 1)),
                }
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        let favorite_services = counts
            .into_iter()
            .take(3)
            .map(|(service_id, count)| FavoriteService {
                service_name: state
                    .service(&service_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                service_id,
                count,
            })
            .collect();

        let total_visits = visits.len() as u32;
        Some(ClientAnalytics {
            client_id: client_id.clone(),
            total_visits,
            total_spent,
            average_check: if total_visits > 0 {
                total_spent / f64::from(total_visits)
            } else {
                0.0
            },
            favorite_services,
            last_visit_date: client.last_visit,
        })
    }

    /// Up to three services to suggest for the client: their favorites
    /// when any exist, else the first three of the catalog — an
    /// arbitrary but deterministic fallback.
    pub fn recommended_services(&self, client_id: &ClientId) -> Vec<Service> {
        let favorites = self
            .client_analytics(client_id)
            .map(|a| a.favorite_services)
            .unwrap_or_default();

        let state = self.read();
        if favorites.is_empty() {
            return state.services.iter().take(3).cloned().collect();
        }
        favorites
            .iter()
            .filter_map(|f| state.service(&f.service_id))
            .cloned()
            .collect()
    }
}
