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

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use storelink_common::{Principal, PrincipalId};
use tracing::{debug, info};
use uuid::Uuid;

use crate::principals::PrincipalRegistry;

/// A message for a principal, routed back to whichever presence session joined it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub principal: PrincipalId,
    pub message: String,
}

/// Where a principal's presence was reported from (typically one game server connection), and
/// where its notifications go.
#[derive(Debug, Clone)]
pub struct PresenceSession {
    id: Uuid,
    notifications: flume::Sender<Notification>,
}

impl PresenceSession {
    pub fn new() -> (Self, flume::Receiver<Notification>) {
        let (tx, rx) = flume::unbounded();
        (
            Self {
                id: Uuid::new_v4(),
                notifications: tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

struct PrincipalRecord {
    name: String,
    authenticated: AtomicBool,
    session: PresenceSession,
}

/// In-memory registry of online principals.
pub struct PrincipalRegistryMemory {
    principals: papaya::HashMap<PrincipalId, Arc<PrincipalRecord>>,
}

impl Default for PrincipalRegistryMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl PrincipalRegistryMemory {
    pub fn new() -> Self {
        Self {
            principals: papaya::HashMap::new(),
        }
    }

    /// Mark a principal online. Replaces any previous record for the same id, which also clears
    /// its authentication flag.
    pub fn join(&self, principal: Principal, session: &PresenceSession) {
        debug!(principal = %principal.id, name = %principal.name, session = %session.id, "Principal joined");
        let record = Arc::new(PrincipalRecord {
            name: principal.name,
            authenticated: AtomicBool::new(false),
            session: session.clone(),
        });
        self.principals.pin().insert(principal.id, record);
    }

    /// Mark a principal offline. Returns whether it was online.
    pub fn leave(&self, id: PrincipalId) -> bool {
        let removed = self.principals.pin().remove(&id).is_some();
        if removed {
            debug!(principal = %id, "Principal left");
        }
        removed
    }

    /// Drop every principal that was joined through `session`.
    pub fn leave_session(&self, session: Uuid) -> usize {
        let guard = self.principals.pin();
        let ids: Vec<PrincipalId> = guard
            .iter()
            .filter(|(_, record)| record.session.id == session)
            .map(|(id, _)| *id)
            .collect();
        let mut removed = 0;
        for id in ids {
            // The principal may have rejoined through another session since the scan.
            let outcome = guard.remove_if(&id, |_, record| record.session.id == session);
            if matches!(outcome, Ok(Some(_))) {
                removed += 1;
            }
        }
        debug!(%session, removed, "Presence session ended");
        removed
    }

    /// The principal's own "yes, that purchase was me". Returns false if it is not online.
    pub fn confirm(&self, id: PrincipalId) -> bool {
        match self.principals.pin().get(&id) {
            Some(record) => {
                record.authenticated.store(true, Ordering::SeqCst);
                debug!(principal = %id, "Principal confirmed pending purchase");
                true
            }
            None => false,
        }
    }

    pub fn online(&self) -> Vec<Principal> {
        self.principals
            .pin()
            .iter()
            .map(|(id, record)| Principal::new(*id, record.name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, id: PrincipalId) -> Option<Arc<PrincipalRecord>> {
        self.principals.pin().get(&id).cloned()
    }
}

impl PrincipalRegistry for PrincipalRegistryMemory {
    fn resolve(&self, id: PrincipalId) -> Option<Principal> {
        self.record(id)
            .map(|record| Principal::new(id, record.name.clone()))
    }

    fn is_authenticated(&self, principal: &Principal) -> bool {
        self.record(principal.id)
            .map(|record| record.authenticated.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn set_authenticated(&self, principal: &Principal, authenticated: bool) {
        if let Some(record) = self.record(principal.id) {
            record.authenticated.store(authenticated, Ordering::SeqCst);
        }
    }

    fn notify(&self, principal: &Principal, message: &str) {
        let Some(record) = self.record(principal.id) else {
            debug!(principal = %principal.id, "Dropping notification for offline principal");
            return;
        };
        let notification = Notification {
            principal: principal.id,
            message: message.to_string(),
        };
        if record.session.notifications.send(notification).is_err() {
            debug!(principal = %principal.id, "Presence session gone, notification dropped");
        }
    }

    fn on_authenticated(&self, principal: &Principal) {
        info!(principal = %principal.id, name = %principal.name, "Store purchase authenticated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn ann() -> Principal {
        Principal::new(
            "abcdef1234567890abcdef1234567890".parse().unwrap(),
            "Ann",
        )
    }

    #[test]
    fn test_join_resolve_leave() {
        let registry = PrincipalRegistryMemory::new();
        let (session, _rx) = PresenceSession::new();
        assert_eq!(registry.resolve(ann().id), None);

        registry.join(ann(), &session);
        assert_eq!(registry.resolve(ann().id), Some(ann()));
        assert_eq!(registry.online(), vec![ann()]);

        assert!(registry.leave(ann().id));
        assert!(!registry.leave(ann().id));
        assert_eq!(registry.resolve(ann().id), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_confirm_and_reset() {
        let registry = PrincipalRegistryMemory::new();
        let (session, _rx) = PresenceSession::new();
        assert!(!registry.confirm(ann().id));

        registry.join(ann(), &session);
        assert!(!registry.is_authenticated(&ann()));
        assert!(registry.confirm(ann().id));
        assert!(registry.is_authenticated(&ann()));
        registry.set_authenticated(&ann(), false);
        assert!(!registry.is_authenticated(&ann()));
    }

    #[test]
    fn test_rejoin_clears_flag() {
        let registry = PrincipalRegistryMemory::new();
        let (session, _rx) = PresenceSession::new();
        registry.join(ann(), &session);
        registry.confirm(ann().id);
        registry.join(ann(), &session);
        assert!(!registry.is_authenticated(&ann()));
    }

    #[test]
    fn test_offline_reads_unauthenticated() {
        let registry = PrincipalRegistryMemory::new();
        let (session, _rx) = PresenceSession::new();
        registry.join(ann(), &session);
        registry.confirm(ann().id);
        registry.leave(ann().id);
        assert!(!registry.is_authenticated(&ann()));
        // Setting the flag on an offline principal is a no-op rather than a resurrection.
        registry.set_authenticated(&ann(), true);
        assert_eq!(registry.resolve(ann().id), None);
    }

    #[test]
    fn test_notify_routes_to_session() {
        let registry = PrincipalRegistryMemory::new();
        let (session, rx) = PresenceSession::new();
        registry.join(ann(), &session);
        registry.notify(&ann(), "hello");
        assert_eq!(
            rx.try_recv().unwrap(),
            Notification {
                principal: ann().id,
                message: "hello".to_string()
            }
        );

        drop(rx);
        // Receiver gone; must not panic.
        registry.notify(&ann(), "again");
    }

    #[test]
    fn test_leave_session_only_drops_its_own() {
        let registry = PrincipalRegistryMemory::new();
        let (first, _rx1) = PresenceSession::new();
        let (second, _rx2) = PresenceSession::new();
        let bob = Principal::new(
            "0f8fad5b-d9cb-469f-a165-70867728950e".parse().unwrap(),
            "Bob",
        );
        registry.join(ann(), &first);
        registry.join(bob.clone(), &second);

        assert_eq!(registry.leave_session(first.id()), 1);
        assert_eq!(registry.resolve(ann().id), None);
        assert_eq!(registry.resolve(bob.id), Some(bob));
    }

    #[test]
    fn test_leave_session_spares_principal_that_rejoined_elsewhere() {
        let registry = PrincipalRegistryMemory::new();
        let (first, _rx1) = PresenceSession::new();
        let (second, _rx2) = PresenceSession::new();
        registry.join(ann(), &first);
        registry.join(ann(), &second);

        assert_eq!(registry.leave_session(first.id()), 0);
        assert_eq!(registry.resolve(ann().id), Some(ann()));
        assert_eq!(registry.leave_session(second.id()), 1);
        assert_eq!(registry.resolve(ann().id), None);
    }

    #[test]
    fn test_concurrent_confirm_and_reset() {
        let registry = Arc::new(PrincipalRegistryMemory::new());
        let (session, _rx) = PresenceSession::new();
        registry.join(ann(), &session);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        if i % 2 == 0 {
                            registry.confirm(ann().id);
                        } else {
                            registry.set_authenticated(&ann(), false);
                        }
                        let _ = registry.is_authenticated(&ann());
                        let _ = registry.resolve(ann().id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.resolve(ann().id), Some(ann()));
    }
}
