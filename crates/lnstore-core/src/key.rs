//! Record key derivation
//!
//! Keys are `sha256(type ":" id)`. The type tag keeps kinds apart even if two
//! kinds ever shared a table, and hashing gives every key the same width so
//! prefix scans behave uniformly. Composite identities join their parts with
//! [`ID_SEPARATOR`]; a part that contains the separator is rejected so two
//! different identities can never produce the same joined string.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};

/// Width of every derived key.
pub const KEY_LEN: usize = 32;

/// Joins the type tag to the identifier and composite parts to each other.
pub const ID_SEPARATOR: char = ':';

/// Fixed-width storage key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// Derive the key for entity `kind` with external identifier `id`.
    pub fn derive(kind: &str, id: &str) -> StoreResult<Key> {
        check_kind(kind)?;
        if id.is_empty() {
            return Err(StoreError::validation(format!("empty identifier for `{}` key", kind)));
        }

        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update([ID_SEPARATOR as u8]);
        hasher.update(id.as_bytes());
        Ok(Key(hasher.finalize().into()))
    }

    /// Derive the key for a composite identity such as `public_key:channel_id`.
    pub fn derive_composite(kind: &str, parts: &[&str]) -> StoreResult<Key> {
        if parts.is_empty() {
            return Err(StoreError::validation(format!("no identity parts for `{}` key", kind)));
        }
        for part in parts {
            if part.is_empty() {
                return Err(StoreError::validation(format!("empty identity part for `{}` key", kind)));
            }
            if part.contains(ID_SEPARATOR) {
                return Err(StoreError::validation(format!(
                    "identity part `{}` for `{}` key contains `{}`",
                    part, kind, ID_SEPARATOR
                )));
            }
        }

        Key::derive(kind, &parts.join(&ID_SEPARATOR.to_string()))
    }

    /// Wrap raw key bytes read back from a table.
    pub fn from_slice(bytes: &[u8]) -> Option<Key> {
        <[u8; KEY_LEN]>::try_from(bytes).ok().map(Key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.to_hex())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn check_kind(kind: &str) -> StoreResult<()> {
    if kind.is_empty() {
        return Err(StoreError::validation("empty entity type for key"));
    }
    if kind.contains(ID_SEPARATOR) {
        return Err(StoreError::validation(format!(
            "entity type `{}` contains `{}`",
            kind, ID_SEPARATOR
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // sha256("node:abc")
        let key = Key::derive("node", "abc").unwrap();
        let expected = {
            let mut h = Sha256::new();
            h.update(b"node:abc");
            hex::encode(h.finalize())
        };
        assert_eq!(key.to_hex(), expected);
        assert_eq!(key.as_bytes().len(), KEY_LEN);
    }

    #[test]
    fn test_stable_and_type_scoped() {
        let a = Key::derive("node", "02aa").unwrap();
        let b = Key::derive("node", "02aa").unwrap();
        let c = Key::derive("peer", "02aa").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_composite_matches_joined() {
        let composite = Key::derive_composite("policy", &["02aa", "700x1x0"]).unwrap();
        let joined = Key::derive("policy", "02aa:700x1x0").unwrap();
        assert_eq!(composite, joined);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Key::derive("", "x").is_err());
        assert!(Key::derive("node", "").is_err());
        assert!(Key::derive("a:b", "x").is_err());
        assert!(Key::derive_composite("peer", &[]).is_err());
        assert!(Key::derive_composite("peer", &["a", ""]).is_err());

        let err = Key::derive_composite("peer", &["a:b", "c"]).unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_from_slice() {
        let key = Key::derive("block", "00ff").unwrap();
        assert_eq!(Key::from_slice(key.as_bytes()), Some(key));
        assert_eq!(Key::from_slice(&[1, 2, 3]), None);
    }
}
