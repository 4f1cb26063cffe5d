//! The entity store.
//!
//! [`Studio`] owns the six canonical collections (masters, services,
//! clients, appointments, cash transactions, notifications) plus the
//! studio contact phone, behind one `RwLock`. Every other part of the
//! engine — scheduling, analytics, notifications, the ledger — is an
//! `impl Studio` block in its own module reading and writing through
//! this store; nothing holds a private copy that could drift.
//!
//! Persistence, clock, and identity generation are constructor-injected
//! (see [`crate::env`]); there are no ambient singletons. After every
//! successful mutation the touched collections are written back through
//! the injected [`Storage`]. The in-process state is authoritative: a
//! failed write is logged and retried wholesale on the next mutation of
//! the same collection.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{error, info};

use crate::domain::{
    default_masters, default_services, Appointment, AppointmentStatus, CashTransaction, Client,
    ClientDraft, ClientId, ClientPatch, Master, MasterDraft, MasterId, MasterPatch, Notification,
    Service, ServiceDraft, ServiceId, ServicePatch, DEFAULT_STUDIO_PHONE,
};
use crate::env::{Clock, IdSource, Storage};
use crate::error::{BookingError, Result};

// ── Configuration ───────────────────────────────────────────────────────────

/// Store construction options.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Prefix for persistence keys (`"{namespace}_masters"`, …), so
    /// several studios can share one storage backend.
    pub namespace: String,
    /// Contact phone seeded on a cold start.
    pub studio_phone: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            namespace: "slotbook".to_string(),
            studio_phone: DEFAULT_STUDIO_PHONE.to_string(),
        }
    }
}

// ── State ───────────────────────────────────────────────────────────────────

/// The canonical collections. Only ever touched through the store lock.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub masters: Vec<Master>,
    pub services: Vec<Service>,
    pub clients: Vec<Client>,
    pub appointments: Vec<Appointment>,
    pub transactions: Vec<CashTransaction>,
    pub notifications: Vec<Notification>,
    pub studio_phone: String,
}

impl State {
    pub fn master(&self, id: &MasterId) -> Option<&Master> {
        self.masters.iter().find(|m| &m.id == id)
    }

    pub fn service(&self, id: &ServiceId) -> Option<&Service> {
        self.services.iter().find(|s| &s.id == id)
    }

    pub fn client_by_phone(&self, phone: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.phone == phone)
    }
}

/// Which persisted document a mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Collection {
    Masters,
    Services,
    Clients,
    Appointments,
    Transactions,
    Notifications,
    StudioPhone,
}

impl Collection {
    fn suffix(self) -> &'static str {
        match self {
            Collection::Masters => "masters",
            Collection::Services => "services",
            Collection::Clients => "clients",
            Collection::Appointments => "appointments",
            Collection::Transactions => "transactions",
            Collection::Notifications => "notifications",
            Collection::StudioPhone => "studio_phone",
        }
    }
}

// ── Studio ──────────────────────────────────────────────────────────────────

/// The booking engine facade: entity store, scheduler, analytics,
/// notifications, and cash ledger over one set of collections.
pub struct Studio {
    pub(crate) state: RwLock<State>,
    /// One mutex per (master, calendar day); serializes the
    /// check-then-write sequence of booking operations.
    pub(crate) buckets: Mutex<HashMap<(MasterId, NaiveDate), Arc<Mutex<()>>>>,
    pub(crate) storage: Box<dyn Storage>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) ids: Box<dyn IdSource>,
    namespace: String,
}

impl Studio {
    /// Open the store: load every collection from storage, seeding the
    /// default master/service catalog and contact phone on a cold start.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] when a persisted document
    /// exists but cannot be read or parsed.
    pub fn open(
        config: StudioConfig,
        storage: Box<dyn Storage>,
        clock: Box<dyn Clock>,
        ids: Box<dyn IdSource>,
    ) -> Result<Self> {
        fn load_document<T: DeserializeOwned>(
            storage: &dyn Storage,
            key: &str,
        ) -> Result<Option<T>> {
            match storage.load(key)? {
                Some(doc) => serde_json::from_str(&doc)
                    .map(Some)
                    .map_err(|e| BookingError::Storage(format!("parse {key}: {e}"))),
                None => Ok(None),
            }
        }

        let ns = config.namespace.clone();
        let key = |c: Collection| format!("{}_{}", ns, c.suffix());

        let masters: Option<Vec<Master>> = load_document(&*storage, &key(Collection::Masters))?;
        let services: Option<Vec<Service>> = load_document(&*storage, &key(Collection::Services))?;
        let clients: Option<Vec<Client>> = load_document(&*storage, &key(Collection::Clients))?;
        let appointments: Option<Vec<Appointment>> =
            load_document(&*storage, &key(Collection::Appointments))?;
        let transactions: Option<Vec<CashTransaction>> =
            load_document(&*storage, &key(Collection::Transactions))?;
        let notifications: Option<Vec<Notification>> =
            load_document(&*storage, &key(Collection::Notifications))?;
        let studio_phone: Option<String> =
            load_document(&*storage, &key(Collection::StudioPhone))?;

        let seeded_masters = masters.is_none();
        let seeded_services = services.is_none();
        let seeded_phone = studio_phone.is_none();

        let state = State {
            masters: masters.unwrap_or_else(default_masters),
            services: services.unwrap_or_else(default_services),
            clients: clients.unwrap_or_default(),
            appointments: appointments.unwrap_or_default(),
            transactions: transactions.unwrap_or_default(),
            notifications: notifications.unwrap_or_default(),
            studio_phone: studio_phone.unwrap_or(config.studio_phone),
        };

        let studio = Self {
            state: RwLock::new(state),
            buckets: Mutex::new(HashMap::new()),
            storage,
            clock,
            ids,
            namespace: ns,
        };

        {
            let state = studio.read();
            if seeded_masters {
                studio.persist(&state, &[Collection::Masters]);
            }
            if seeded_services {
                studio.persist(&state, &[Collection::Services]);
            }
            if seeded_phone {
                studio.persist(&state, &[Collection::StudioPhone]);
            }
            info!(
                masters = state.masters.len(),
                services = state.services.len(),
                appointments = state.appointments.len(),
                "studio opened"
            );
        }

        Ok(studio)
    }

    pub(crate) fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn storage_key(&self, collection: Collection) -> String {
        format!("{}_{}", self.namespace, collection.suffix())
    }

    /// Write the given collections back through the injected storage.
    /// Write failures are logged, not surfaced: the in-process state is
    /// authoritative and the next successful save rewrites the document.
    pub(crate) fn persist(&self, state: &State, collections: &[Collection]) {
        fn doc<T: Serialize>(values: &T) -> String {
            // Serializing our own entities cannot fail.
            serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
        }
        for &collection in collections {
            let document = match collection {
                Collection::Masters => doc(&state.masters),
                Collection::Services => doc(&state.services),
                Collection::Clients => doc(&state.clients),
                Collection::Appointments => doc(&state.appointments),
                Collection::Transactions => doc(&state.transactions),
                Collection::Notifications => doc(&state.notifications),
                Collection::StudioPhone => doc(&state.studio_phone),
            };
            if let Err(e) = self.storage.save(&self.storage_key(collection), &document) {
                error!(collection = collection.suffix(), "persist failed: {e}");
            }
        }
    }

    // ── Studio settings ─────────────────────────────────────────────────

    pub fn studio_phone(&self) -> String {
        self.read().studio_phone.clone()
    }

    pub fn set_studio_phone(&self, phone: impl Into<String>) {
        let mut state = self.write();
        state.studio_phone = phone.into();
        self.persist(&state, &[Collection::StudioPhone]);
    }

    // ── Masters ─────────────────────────────────────────────────────────

    pub fn masters(&self) -> Vec<Master> {
        self.read().masters.clone()
    }

    pub fn add_master(&self, draft: MasterDraft) -> Master {
        let master = Master {
            id: MasterId(format!("master-{}", self.ids.next_id())),
            name: draft.name,
            color: draft.color,
            active: draft.active,
            schedule: draft.schedule,
        };
        let mut state = self.write();
        state.masters.push(master.clone());
        self.persist(&state, &[Collection::Masters]);
        master
    }

    /// Patch a master. Returns `false` when the id is unknown.
    pub fn update_master(&self, id: &MasterId, patch: MasterPatch) -> bool {
        let mut state = self.write();
        let Some(master) = state.masters.iter_mut().find(|m| &m.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            master.name = name;
        }
        if let Some(color) = patch.color {
            master.color = color;
        }
        if let Some(active) = patch.active {
            master.active = active;
        }
        if let Some(schedule) = patch.schedule {
            master.schedule = schedule;
        }
        self.persist(&state, &[Collection::Masters]);
        true
    }

    /// Delete a master. Cascades: every appointment referencing the
    /// master is removed with it. Returns `false` when the id is
    /// unknown.
    pub fn delete_master(&self, id: &MasterId) -> bool {
        let mut state = self.write();
        let before = state.masters.len();
        state.masters.retain(|m| &m.id != id);
        if state.masters.len() == before {
            return false;
        }
        let appts_before = state.appointments.len();
        state.appointments.retain(|a| &a.master_id != id);
        let cascaded = appts_before - state.appointments.len();
        info!(master = %id, cascaded, "master deleted");
        self.persist(&state, &[Collection::Masters, Collection::Appointments]);
        true
    }

    // ── Services ────────────────────────────────────────────────────────

    pub fn services(&self) -> Vec<Service> {
        self.read().services.clone()
    }

    pub fn add_service(&self, draft: ServiceDraft) -> Service {
        let service = Service {
            id: ServiceId(format!("svc-{}", self.ids.next_id())),
            name: draft.name,
            category: draft.category,
            duration_minutes: draft.duration_minutes,
            price: draft.price,
            color: draft.color,
        };
        let mut state = self.write();
        state.services.push(service.clone());
        self.persist(&state, &[Collection::Services]);
        service
    }

    /// Patch a service. Returns `false` when the id is unknown.
    pub fn update_service(&self, id: &ServiceId, patch: ServicePatch) -> bool {
        let mut state = self.write();
        let Some(service) = state.services.iter_mut().find(|s| &s.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            service.name = name;
        }
        if let Some(category) = patch.category {
            service.category = category;
        }
        if let Some(duration) = patch.duration_minutes {
            service.duration_minutes = duration;
        }
        if let Some(price) = patch.price {
            service.price = price;
        }
        if let Some(color) = patch.color {
            service.color = color;
        }
        self.persist(&state, &[Collection::Services]);
        true
    }

    /// Delete a service. Reference-checked rather than cascading:
    /// refused while any non-cancelled appointment still references the
    /// service, so history cannot silently dangle. Returns `Ok(false)`
    /// when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] while the service is in use.
    pub fn delete_service(&self, id: &ServiceId) -> Result<bool> {
        let mut state = self.write();
        if !state.services.iter().any(|s| &s.id == id) {
            return Ok(false);
        }
        let in_use = state
            .appointments
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .any(|a| a.services.contains(id));
        if in_use {
            return Err(BookingError::validation(
                "service",
                format!("{id} is referenced by existing appointments"),
            ));
        }
        state.services.retain(|s| &s.id != id);
        self.persist(&state, &[Collection::Services]);
        Ok(true)
    }

    // ── Clients ─────────────────────────────────────────────────────────

    pub fn clients(&self) -> Vec<Client> {
        self.read().clients.clone()
    }

    /// Create a client explicitly (outside the booking flow). The visit
    /// counter starts at zero; the first booking under the same phone
    /// bumps it.
    pub fn add_client(&self, draft: ClientDraft) -> Client {
        let client = Client {
            id: ClientId(format!("client-{}", self.ids.next_id())),
            name: draft.name,
            phone: draft.phone,
            created_at: self.clock.now(),
            last_visit: None,
            total_visits: 0,
            favorite_services: Vec::new(),
        };
        let mut state = self.write();
        state.clients.push(client.clone());
        self.persist(&state, &[Collection::Clients]);
        client
    }

    /// Patch a client. Returns `false` when the id is unknown.
    pub fn update_client(&self, id: &ClientId, patch: ClientPatch) -> bool {
        let mut state = self.write();
        let Some(client) = state.clients.iter_mut().find(|c| &c.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            client.name = name;
        }
        if let Some(phone) = patch.phone {
            client.phone = phone;
        }
        self.persist(&state, &[Collection::Clients]);
        true
    }

    /// Delete a client record. Appointments keep their name/phone
    /// snapshot, so history stays readable.
    pub fn delete_client(&self, id: &ClientId) -> bool {
        let mut state = self.write();
        let before = state.clients.len();
        state.clients.retain(|c| &c.id != id);
        if state.clients.len() == before {
            return false;
        }
        self.persist(&state, &[Collection::Clients]);
        true
    }

    // ── Appointments (raw accessor; scheduling lives in `schedule`) ─────

    pub fn appointments(&self) -> Vec<Appointment> {
        self.read().appointments.clone()
    }
}
