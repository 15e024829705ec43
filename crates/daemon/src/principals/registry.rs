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

use storelink_common::{Principal, PrincipalId};

/// The live session registry, as far as authentication requests are concerned.
///
/// The registry is the single source of truth for a principal's authentication flag. Pollers call
/// into it every tick, from many tasks at once, so every method must be cheap and safe to call
/// concurrently. Nothing here is transactional: two requests for the same principal can race a
/// read against a reset, and the last reset wins.
pub trait PrincipalRegistry: Send + Sync {
    /// Look up a principal that is currently online.
    fn resolve(&self, id: PrincipalId) -> Option<Principal>;

    /// Current value of the principal's authentication flag. A principal that has since gone
    /// offline reads as not authenticated.
    fn is_authenticated(&self, principal: &Principal) -> bool;

    fn set_authenticated(&self, principal: &Principal, authenticated: bool);

    /// Deliver a human-readable message to the principal.
    fn notify(&self, principal: &Principal, message: &str);

    /// Called once a confirmation has been sent to the store and the flag reset.
    fn on_authenticated(&self, _principal: &Principal) {}
}
