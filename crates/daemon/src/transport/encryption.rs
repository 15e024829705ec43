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

//! Age encryption of wire frames.
//!
//! Both ends hold the same X25519 identity. Frames are encrypted to its public half and decrypted
//! with the identity itself, which gives a shared-secret channel without either side inventing a
//! cipher construction of its own.

use std::fmt::{Debug, Formatter};
use std::io::{Read, Write};
use std::path::Path;

use age::secrecy::ExposeSecret;
use age::x25519;

use crate::transport::WireError;

pub struct WireKey {
    identity: x25519::Identity,
    recipient: x25519::Recipient,
}

impl WireKey {
    pub fn generate() -> Self {
        Self::from_identity(x25519::Identity::generate())
    }

    fn from_identity(identity: x25519::Identity) -> Self {
        let recipient = identity.to_public();
        Self {
            identity,
            recipient,
        }
    }

    /// Parse an `AGE-SECRET-KEY-1...` string.
    pub fn from_secret(secret: &str) -> Result<Self, WireError> {
        let identity = secret
            .trim()
            .parse::<x25519::Identity>()
            .map_err(|e| WireError::InvalidKey(format!("Failed to parse secret key: {e}")))?;
        Ok(Self::from_identity(identity))
    }

    /// Load a key file in the format `age-keygen` writes: `#` comment lines, then the secret.
    pub fn load(path: &Path) -> Result<Self, WireError> {
        let contents = std::fs::read_to_string(path)?;
        let Some(secret) = contents
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
        else {
            return Err(WireError::InvalidKey(format!(
                "No secret key found in {}",
                path.display()
            )));
        };
        Self::from_secret(secret)
    }

    pub fn to_secret_string(&self) -> String {
        self.identity.to_string().expose_secret().to_string()
    }

    pub fn public_string(&self) -> String {
        self.recipient.to_string()
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, WireError> {
        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(&self.recipient as &dyn age::Recipient))
                .map_err(|e| WireError::Encryption(format!("Failed to create encryptor: {e}")))?;

        let mut encrypted = vec![];
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| WireError::Encryption(format!("Failed to create encryptor: {e}")))?;
        writer
            .write_all(plaintext)
            .map_err(|e| WireError::Encryption(format!("Failed to write plaintext: {e}")))?;
        writer
            .finish()
            .map_err(|e| WireError::Encryption(format!("Failed to finish encryption: {e}")))?;

        Ok(encrypted)
    }

    pub fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>, WireError> {
        let decryptor = age::Decryptor::new(ciphertext)
            .map_err(|e| WireError::Decryption(format!("Failed to create decryptor: {e}")))?;

        let mut decrypted = vec![];
        let mut reader = decryptor
            .decrypt(std::iter::once(&self.identity as &dyn age::Identity))
            .map_err(|e| WireError::Decryption(format!("Failed to decrypt: {e}")))?;
        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| WireError::Decryption(format!("Failed to read decrypted data: {e}")))?;

        Ok(decrypted)
    }
}

impl Debug for WireKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireKey")
            .field("recipient", &self.public_string())
            .finish_non_exhaustive()
    }
}
