//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based handle for one live connection
//! - `DisplayTag`: name-derived ANSI color used to decorate names
//!
//! Also holds the identifier policy shared by user and channel names.

use std::fmt;

use uuid::Uuid;

/// Maximum length of a user name
pub const MAX_NAME_LEN: usize = 9;

/// Maximum length of a channel name
pub const MAX_CHANNEL_LEN: usize = 49;

/// ANSI sequence that ends a display tag decoration
pub const RESET: &str = "\x1b[0m";

/// First palette index used for tags (skips the 16 system colors)
const PALETTE_BASE: u32 = 16;

/// Size of the 6x6x6 ANSI color cube
const PALETTE_SIZE: u32 = 216;

/// Opaque handle for one transport-layer connection (newtype pattern)
///
/// Wraps a UUID v4. Implements Hash and Eq for use as a registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation color derived from a client's name
///
/// Computed once at registration and never recomputed. Displays as the
/// ANSI escape that selects the color; pair it with [`RESET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayTag(u8);

impl DisplayTag {
    /// Derive the tag for a name
    pub fn for_name(name: &str) -> Self {
        let hash = name
            .bytes()
            .fold(0u32, |hash, b| hash.wrapping_mul(31).wrapping_add(u32::from(b)));
        let index = PALETTE_BASE + hash % PALETTE_SIZE;
        // index is at most 231
        Self(index as u8)
    }

    /// Palette index in the 256-color ANSI table
    pub fn color_index(self) -> u8 {
        self.0
    }

    /// Wrap `text` in this tag and the reset sequence
    pub fn decorate(self, text: &str) -> String {
        format!("{}{}{}", self, text, RESET)
    }
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\x1b[38;5;{}m", self.0)
    }
}

/// Check a user name against the identifier policy
pub fn is_valid_name(name: &str) -> bool {
    is_valid_identifier(name, MAX_NAME_LEN)
}

/// Check a channel name against the identifier policy
pub fn is_valid_channel(channel: &str) -> bool {
    is_valid_identifier(channel, MAX_CHANNEL_LEN)
}

/// Non-empty, bounded, and only ASCII alphanumerics, `_`, `-` or `#`
fn is_valid_identifier(s: &str, max_len: usize) -> bool {
    !s.is_empty()
        && s.len() <= max_len
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_display_tag_deterministic() {
        assert_eq!(DisplayTag::for_name("alice"), DisplayTag::for_name("alice"));
    }

    #[test]
    fn test_display_tag_in_palette() {
        for name in ["a", "alice", "bob", "Client9", "zzzzzzzzz", "#-_"] {
            let index = DisplayTag::for_name(name).color_index();
            assert!((16..=231).contains(&index), "{name} -> {index}");
        }
    }

    #[test]
    fn test_display_tag_known_value() {
        // 'a' = 97 -> 16 + 97 % 216
        assert_eq!(DisplayTag::for_name("a").color_index(), 113);
        assert_eq!(DisplayTag::for_name("a").to_string(), "\x1b[38;5;113m");
    }

    #[test]
    fn test_decorate() {
        let tag = DisplayTag::for_name("a");
        assert_eq!(tag.decorate("a"), "\x1b[38;5;113ma\x1b[0m");
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("alice"));
        assert!(is_valid_name("bob_2"));
        assert!(is_valid_name("x-#"));
        assert!(is_valid_name("abcdefghi"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("al ice"));
        assert!(!is_valid_name("alice!"));
        assert!(!is_valid_name("abcdefghij"));
        assert!(!is_valid_name("élise"));
    }

    #[test]
    fn test_channel_policy() {
        assert!(is_valid_channel("#general"));
        assert!(is_valid_channel(&"c".repeat(MAX_CHANNEL_LEN)));
        assert!(!is_valid_channel(&"c".repeat(MAX_CHANNEL_LEN + 1)));
        assert!(!is_valid_channel("#gen eral"));
        assert!(!is_valid_channel("#a\t"));
    }
}
