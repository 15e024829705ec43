// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Registry double that records every side effect a request performs on it.

use std::collections::HashMap;
use std::sync::Mutex;

use storelink_common::{Principal, PrincipalId};

use crate::principals::PrincipalRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Notified(PrincipalId, String),
    FlagSet(PrincipalId, bool),
    Authenticated(PrincipalId),
}

#[derive(Default)]
pub struct FakeRegistry {
    principals: Mutex<HashMap<PrincipalId, (Principal, bool)>>,
    events: Mutex<Vec<RegistryEvent>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, principal: Principal, authenticated: bool) {
        self.principals
            .lock()
            .unwrap()
            .insert(principal.id, (principal, authenticated));
    }

    pub fn remove(&self, id: PrincipalId) {
        self.principals.lock().unwrap().remove(&id);
    }

    /// Flip the flag without recording an event, as the principal itself would.
    pub fn set_flag(&self, id: PrincipalId, authenticated: bool) {
        if let Some((_, flag)) = self.principals.lock().unwrap().get_mut(&id) {
            *flag = authenticated;
        }
    }

    pub fn flag(&self, id: PrincipalId) -> bool {
        self.principals
            .lock()
            .unwrap()
            .get(&id)
            .is_some_and(|(_, flag)| *flag)
    }

    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: RegistryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl PrincipalRegistry for FakeRegistry {
    fn resolve(&self, id: PrincipalId) -> Option<Principal> {
        self.principals
            .lock()
            .unwrap()
            .get(&id)
            .map(|(principal, _)| principal.clone())
    }

    fn is_authenticated(&self, principal: &Principal) -> bool {
        self.flag(principal.id)
    }

    fn set_authenticated(&self, principal: &Principal, authenticated: bool) {
        self.set_flag(principal.id, authenticated);
        self.record(RegistryEvent::FlagSet(principal.id, authenticated));
    }

    fn notify(&self, principal: &Principal, message: &str) {
        self.record(RegistryEvent::Notified(principal.id, message.to_string()));
    }

    fn on_authenticated(&self, principal: &Principal) {
        self.record(RegistryEvent::Authenticated(principal.id));
    }
}
