//! Content fingerprints for state descriptions.
//!
//! A fingerprint is the SHA-256 of a state's field map, so two states with
//! identical content share a fingerprint no matter which id the store gave
//! them. Fields are visited in key order and every string is terminated by
//! a NUL byte, which keeps `{"a": ["bc"]}` and `{"ab": ["c"]}` apart.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 content hash of a state description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hash a field map.
    pub fn of_fields(fields: &BTreeMap<String, Vec<String>>) -> Self {
        let mut hasher = Sha256::new();
        for (name, values) in fields {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update((values.len() as u64).to_le_bytes());
            for value in values {
                hasher.update(value.as_bytes());
                hasher.update([0u8]);
            }
        }
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short hex prefix, handy in log lines.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
