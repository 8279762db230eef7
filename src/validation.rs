//! Input validation and sanitization.
//!
//! Pure functions over untrusted client payloads. Everything here runs
//! before the store is touched; nothing here performs I/O.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a player display name, in characters.
pub const MAX_PLAYER_NAME_LEN: usize = 30;

/// Session IDs are exactly this many lowercase hex digits.
pub const SESSION_ID_LEN: usize = 8;

/// Accepted image subtypes for avatar data URIs.
const AVATAR_IMAGE_SUBTYPES: [&str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

/// Raw player payload as sent by a joining client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPlayer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A player payload that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedPlayer {
    pub name: String,
    pub avatar: Option<String>,
}

/// Why a player payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerValidationError {
    /// Name missing or empty before sanitization
    InvalidName,
    /// Name empty after trimming and stripping
    NameRequired,
}

impl fmt::Display for PlayerValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName => write!(f, "Invalid player name"),
            Self::NameRequired => write!(f, "Player name is required"),
        }
    }
}

impl std::error::Error for PlayerValidationError {}

/// Check that a session ID is exactly eight lowercase hex digits.
pub fn validate_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_LEN && id.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Sanitize a player name: trim, truncate to [`MAX_PLAYER_NAME_LEN`]
/// characters, and strip ASCII control characters (0x00-0x1F, 0x7F).
///
/// Never fails; empty input yields an empty string.
pub fn sanitize_player_name(name: &str) -> String {
    name.trim()
        .chars()
        .take(MAX_PLAYER_NAME_LEN)
        .filter(|c| !matches!(c, '\u{00}'..='\u{1f}' | '\u{7f}'))
        .collect()
}

/// Validate an avatar payload.
///
/// Returns the value unchanged iff it is a base64 data URI for one of the
/// accepted image subtypes; anything else is silently rejected as `None`
/// and the caller treats it as "no avatar".
pub fn validate_avatar(avatar: &str) -> Option<String> {
    let rest = avatar.strip_prefix("data:image/")?;
    AVATAR_IMAGE_SUBTYPES
        .iter()
        .any(|subtype| {
            rest.strip_prefix(subtype)
                .is_some_and(|r| r.starts_with(";base64,"))
        })
        .then(|| avatar.to_string())
}

/// Validate and sanitize a raw player payload.
///
/// Rejects a missing or empty name with a descriptive error; on success
/// returns the sanitized name and avatar.
pub fn validate_player(raw: &RawPlayer) -> Result<SanitizedPlayer, PlayerValidationError> {
    let name = match &raw.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(PlayerValidationError::InvalidName),
    };

    let sanitized = sanitize_player_name(name);
    if sanitized.is_empty() {
        return Err(PlayerValidationError::NameRequired);
    }

    let avatar = raw.avatar.as_deref().and_then(validate_avatar);

    Ok(SanitizedPlayer {
        name: sanitized,
        avatar,
    })
}
