//! # Observable State Store
//!
//! Holds the single `DashboardState` of a dashboard and pushes an immutable
//! snapshot of it to every subscriber after each mutation. Mutations only go
//! through the setters below; readers get `Arc` snapshots and never see a
//! half-applied update.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::observers::{Observers, Subscription};
use crate::transforms::records::{BusinessRecord, DomainRecord, SalesRecord, UserRecord};

/// One of the three data domains shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Sales,
    Users,
    Business,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Sales, Domain::Users, Domain::Business];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Sales => "sales",
            Domain::Users => "users",
            Domain::Business => "business",
        }
    }

    /// Key under which the domain's derived record is cached.
    pub fn cache_key(self) -> &'static str {
        match self {
            Domain::Sales => "sales-data",
            Domain::Users => "user-data",
            Domain::Business => "business-data",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest derived record of each domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainData {
    pub sales: Option<SalesRecord>,
    pub users: Option<UserRecord>,
    pub business: Option<BusinessRecord>,
}

impl DomainData {
    fn set(&mut self, record: DomainRecord) {
        match record {
            DomainRecord::Sales(sales) => self.sales = Some(sales),
            DomainRecord::Users(users) => self.users = Some(users),
            DomainRecord::Business(business) => self.business = Some(business),
        }
    }

    pub fn is_loaded(&self, domain: Domain) -> bool {
        match domain {
            Domain::Sales => self.sales.is_some(),
            Domain::Users => self.users.is_some(),
            Domain::Business => self.business.is_some(),
        }
    }

    pub fn loaded_count(&self) -> usize {
        Domain::ALL.iter().filter(|d| self.is_loaded(**d)).count()
    }

    /// `Some(populated)` for a loaded domain, `None` otherwise.
    pub fn is_populated(&self, domain: Domain) -> Option<bool> {
        match domain {
            Domain::Sales => self.sales.as_ref().map(|s| !s.products.is_empty()),
            Domain::Users => self.users.as_ref().map(|u| !u.activity.labels.is_empty()),
            Domain::Business => self
                .business
                .as_ref()
                .map(|b| !b.regions.regions.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadingFlags {
    pub sales: bool,
    pub users: bool,
    pub business: bool,
}

impl LoadingFlags {
    pub fn get(&self, domain: Domain) -> bool {
        match domain {
            Domain::Sales => self.sales,
            Domain::Users => self.users,
            Domain::Business => self.business,
        }
    }

    fn set(&mut self, domain: Domain, loading: bool) {
        match domain {
            Domain::Sales => self.sales = loading,
            Domain::Users => self.users = loading,
            Domain::Business => self.business = loading,
        }
    }

    pub fn any(&self) -> bool {
        self.sales || self.users || self.business
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub data: DomainData,
    pub loading: LoadingFlags,
    /// Every domain is always present; `None` means no error.
    pub errors: BTreeMap<Domain, Option<String>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn error(&self, domain: Domain) -> Option<&str> {
        self.errors.get(&domain).and_then(|e| e.as_deref())
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().filter(|e| e.is_some()).count()
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            data: DomainData::default(),
            loading: LoadingFlags::default(),
            errors: Domain::ALL.iter().map(|d| (*d, None)).collect(),
            last_updated: None,
        }
    }
}

/// Immutable view handed to readers and listeners.
pub type StateSnapshot = Arc<DashboardState>;

pub struct StateStore {
    state: Mutex<StateSnapshot>,
    observers: Observers<StateSnapshot>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Arc::new(DashboardState::default())),
            observers: Observers::new(),
        }
    }

    /// Current snapshot. Later mutations never change it.
    pub fn state(&self) -> StateSnapshot {
        Arc::clone(&self.state.lock().expect("State lock poisoned"))
    }

    pub fn set_loading(&self, domain: Domain, loading: bool) {
        self.mutate(|state| state.loading.set(domain, loading));
    }

    /// Publishes a freshly derived record: clears the domain's error and its
    /// loading flag and stamps `last_updated`.
    pub fn set_data(&self, record: DomainRecord) {
        let domain = record.domain();
        self.mutate(|state| {
            state.data.set(record);
            state.errors.insert(domain, None);
            state.loading.set(domain, false);
            state.last_updated = Some(Utc::now());
        });
    }

    /// Records a failure for `domain`. The previously loaded record, if any,
    /// stays visible.
    pub fn set_error(&self, domain: Domain, message: impl Into<String>) {
        let message = message.into();
        self.mutate(|state| {
            state.errors.insert(domain, Some(message));
            state.loading.set(domain, false);
        });
    }

    pub fn clear_errors(&self) {
        self.mutate(|state| {
            for error in state.errors.values_mut() {
                *error = None;
            }
        });
    }

    /// Registers `listener` for every subsequent change. Listeners run
    /// synchronously, in subscription order, after the change is applied.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&StateSnapshot) + Send + Sync + 'static,
    {
        self.observers.subscribe(listener)
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading.any()
    }

    pub fn has_errors(&self) -> bool {
        self.state().error_count() > 0
    }

    fn mutate<F>(&self, apply: F)
    where
        F: FnOnce(&mut DashboardState),
    {
        let snapshot = {
            let mut current = self.state.lock().expect("State lock poisoned");
            let mut next = DashboardState::clone(&current);
            apply(&mut next);
            *current = Arc::new(next);
            Arc::clone(&current)
        };
        self.observers.notify(&snapshot);
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
