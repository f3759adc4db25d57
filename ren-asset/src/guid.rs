//! Content-addressed 64-bit identifiers.
//!
//! Grounded on `examples/original_source/editor/Guid.hpp`'s `Guid<Bytes>`
//! template and `examples/original_source/editor/Meta.cpp`'s
//! `meta_gltf_generate`: a mesh's GUID is the blake3 hash of
//! `"<gltf-stem>::<mesh-name>::<primitive-index>"`, truncated to 8 bytes.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An 8-byte content-addressed identifier, hex-encoded most-significant
/// byte first (matching `Guid::to_string`/`guid_from_string` in the
/// original: byte index `7` is emitted first).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid64([u8; 8]);

impl Guid64 {
    pub const fn from_bytes(bytes: [u8; 8]) -> Guid64 {
        Guid64(bytes)
    }

    pub fn bytes(&self) -> [u8; 8] {
        self.0
    }

    /// Blake3-hashes `data` and truncates to the first 8 bytes, the same
    /// derivation `for_mesh` uses for its source string and
    /// `FileDialogGuidFromName` uses for a dialog's title.
    pub fn from_hash_of(data: &[u8]) -> Guid64 {
        let hash = blake3::hash(data);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        Guid64(bytes)
    }

    /// Derives a mesh GUID from its gltf file stem, mesh name and primitive
    /// index, joined with `"::"`, exactly as `meta_gltf_generate` does.
    pub fn for_mesh(gltf_stem: &str, mesh_name: &str, primitive_index: usize) -> Guid64 {
        let source = format!("{gltf_stem}::{mesh_name}::{primitive_index}");
        Guid64::from_hash_of(source.as_bytes())
    }

    pub fn to_hex_string(&self) -> String {
        let mut out = String::with_capacity(16);
        for byte in self.0.iter().rev() {
            out.push_str(&format!("{byte:02X}"));
        }
        out
    }

    pub fn from_hex_string(s: &str) -> Option<Guid64> {
        let s = s.as_bytes();
        if s.len() != 16 {
            return None;
        }
        let mut bytes = [0u8; 8];
        for i in 0..16 {
            let c = s[i] as char;
            let value = match c {
                '0'..='9' => c as u8 - b'0',
                'A'..='F' => c as u8 - b'A' + 0xA,
                'a'..='f' => c as u8 - b'a' + 0xA,
                _ => return None,
            };
            let byte_index = 7 - i / 2;
            if i % 2 == 0 {
                bytes[byte_index] |= value << 4;
            } else {
                bytes[byte_index] |= value;
            }
        }
        Some(Guid64(bytes))
    }
}

impl fmt::Debug for Guid64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid64({})", self.to_hex_string())
    }
}

impl fmt::Display for Guid64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl Serialize for Guid64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for Guid64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Guid64, D::Error> {
        let s = String::deserialize(deserializer)?;
        Guid64::from_hex_string(&s).ok_or_else(|| D::Error::custom("invalid guid64 hex string"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let guid = Guid64::from_bytes([0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF]);
        let s = guid.to_hex_string();
        assert_eq!(s, "EFCDAB8967452301");
        assert_eq!(Guid64::from_hex_string(&s), Some(guid));
    }

    #[test]
    fn rejects_malformed_strings() {
        assert_eq!(Guid64::from_hex_string("too_short"), None);
        assert_eq!(Guid64::from_hex_string("ZZZZZZZZZZZZZZZZ"), None);
    }

    #[test]
    fn for_mesh_is_deterministic() {
        let a = Guid64::for_mesh("scene", "Cube", 0);
        let b = Guid64::for_mesh("scene", "Cube", 0);
        let c = Guid64::for_mesh("scene", "Cube", 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn json_round_trip() {
        let guid = Guid64::for_mesh("scene", "Cube", 0);
        let json = serde_json::to_string(&guid).unwrap();
        let back: Guid64 = serde_json::from_str(&json).unwrap();
        assert_eq!(guid, back);
    }
}
