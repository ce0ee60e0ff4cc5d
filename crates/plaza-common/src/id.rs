use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::SessionError;

/// Room code alphabet: upper-case letters and digits without the easily
/// confused `0`, `O`, `1` and `I`.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a freshly generated room code.
pub const ROOM_CODE_LEN: usize = 6;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Connection-scoped identity issued by the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identity, used by the relay when a connection is accepted.
    pub fn generate() -> Self {
        Self(new_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Short human-typeable room identifier.
///
/// Codes read off the wire are kept as sent; codes typed by a user go
/// through [`RoomCode::parse`], which trims and upper-cases them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Draw a fresh code uniformly from [`ROOM_CODE_ALPHABET`].
    ///
    /// Uniqueness is not checked locally; the 32^6 namespace is assumed to be
    /// large enough for concurrently advertised rooms.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Normalize user input (trim, upper-case) and validate it.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let code = input.trim().to_ascii_uppercase();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SessionError::InvalidRoomCode(input.to_string()));
        }
        Ok(Self(code))
    }

    /// Wrap a code that is already in canonical form.
    pub fn from_normalized(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn generated_peer_ids_are_unique() {
        assert_ne!(PeerId::generate(), PeerId::generate());
    }

    #[test]
    fn generated_room_codes_use_unambiguous_alphabet() {
        for _ in 0..2000 {
            let code = RoomCode::generate();
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            for c in code.as_str().chars() {
                assert!(ROOM_CODE_ALPHABET.contains(&(c as u8)), "bad char {c}");
                assert!(!matches!(c, '0' | 'O' | '1' | 'I'));
            }
        }
    }

    #[test]
    fn alphabet_has_no_duplicates() {
        let mut sorted = ROOM_CODE_ALPHABET.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ROOM_CODE_ALPHABET.len());
    }

    #[test]
    fn parse_trims_and_uppercases() {
        let code = RoomCode::parse("  test ").unwrap();
        assert_eq!(code.as_str(), "TEST");
    }

    #[test]
    fn parse_rejects_empty_and_symbols() {
        assert!(matches!(
            RoomCode::parse("   "),
            Err(SessionError::InvalidRoomCode(_))
        ));
        assert!(matches!(
            RoomCode::parse("AB-CD"),
            Err(SessionError::InvalidRoomCode(_))
        ));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let peer = PeerId::from("abc");
        assert_eq!(serde_json::to_string(&peer).unwrap(), "\"abc\"");
        let code: RoomCode = serde_json::from_str("\"XYZ234\"").unwrap();
        assert_eq!(code, RoomCode::from_normalized("XYZ234"));
    }
}
