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

//! The tick-by-tick decision logic for authentication polling, with no timers or sockets in it.
//!
//! A poll goes through up to three phases, one per tick: find the principal, take a baseline of
//! its flag and clear it, then keep reading the flag until it is set again. Only a confirmation
//! made after the baseline counts, so one left over from an earlier request never answers this
//! one.

use storelink_common::{Principal, PrincipalId};

use crate::principals::PrincipalRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollerState {
    Idle,
    AwaitingPrincipal,
    AwaitingAuthFlag,
    Completed,
    TimedOut,
    Aborted,
}

impl PollerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollerState::Completed | PollerState::TimedOut | PollerState::Aborted
        )
    }
}

/// What a single tick decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing conclusive yet; keep ticking.
    Pending,
    /// The principal's flag is set. The caller owns the response and the cleanup.
    Confirmed(Principal),
    TimedOut,
    TransportClosed,
}

#[derive(Debug, Clone)]
pub struct PollState {
    target_id: PrincipalId,
    ticks_remaining: u32,
    target: Option<Principal>,
    auth_flag_snapshot: Option<bool>,
    state: PollerState,
}

impl PollState {
    pub fn new(target_id: PrincipalId, tick_budget: u32) -> Self {
        Self {
            target_id,
            ticks_remaining: tick_budget,
            target: None,
            auth_flag_snapshot: None,
            state: PollerState::Idle,
        }
    }

    /// Look the principal up once, before the first tick.
    pub fn prime(&mut self, registry: &dyn PrincipalRegistry) {
        self.target = registry.resolve(self.target_id);
        self.state = match self.target {
            Some(_) => PollerState::AwaitingAuthFlag,
            None => PollerState::AwaitingPrincipal,
        };
    }

    pub fn tick(&mut self, registry: &dyn PrincipalRegistry, transport_closed: bool) -> Tick {
        if self.state.is_terminal() {
            return Tick::Pending;
        }
        if transport_closed {
            self.state = PollerState::Aborted;
            return Tick::TransportClosed;
        }
        if self.ticks_remaining == 0 {
            self.state = PollerState::TimedOut;
            return Tick::TimedOut;
        }
        self.ticks_remaining -= 1;

        let Some(target) = &self.target else {
            self.target = registry.resolve(self.target_id);
            if self.target.is_some() {
                self.state = PollerState::AwaitingAuthFlag;
            }
            return Tick::Pending;
        };

        self.state = PollerState::AwaitingAuthFlag;
        if self.auth_flag_snapshot.is_none() {
            self.auth_flag_snapshot = Some(registry.is_authenticated(target));
            registry.set_authenticated(target, false);
            return Tick::Pending;
        }
        if registry.is_authenticated(target) {
            self.state = PollerState::Completed;
            return Tick::Confirmed(target.clone());
        }
        Tick::Pending
    }

    /// Force a terminal state, e.g. when the confirmation could not be delivered.
    pub fn finish(&mut self, state: PollerState) {
        self.state = state;
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn target_id(&self) -> PrincipalId {
        self.target_id
    }

    pub fn target(&self) -> Option<&Principal> {
        self.target.as_ref()
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    pub fn auth_flag_snapshot(&self) -> Option<bool> {
        self.auth_flag_snapshot
    }
}
