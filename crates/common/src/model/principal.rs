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

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::normalize_uuid;

/// Stable external identifier of a principal (an online player), as handed to us by the store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    /// Parses after applying the dash-repair rule, so both `abcdef12-3456-...` and the bare
    /// 32-digit form are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_uuid(s);
        Uuid::try_parse(&normalized).map(PrincipalId)
    }
}

impl Display for PrincipalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for PrincipalId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A live principal as resolved from the registry. Cheap to clone; carries no state of its own,
/// the registry remains the source of truth for anything mutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
}

impl Principal {
    pub fn new(id: PrincipalId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
