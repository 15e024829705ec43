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

/// Repair a UUID string that arrived without its dashes.
///
/// Exactly 32 ASCII alphanumeric characters are split 8-4-4-4-12 and joined with dashes.
/// Anything else (already hyphenated, too short, too long, stray punctuation) is returned trimmed
/// but otherwise untouched, and left for the UUID parser to accept or reject.
#[must_use]
pub fn normalize_uuid(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() != 32 || !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return raw.to_string();
    }
    format!(
        "{}-{}-{}-{}-{}",
        &raw[0..8],
        &raw[8..12],
        &raw[12..16],
        &raw[16..20],
        &raw[20..32]
    )
}
