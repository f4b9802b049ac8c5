//! Org channel codec
//!
//! Channels are flat `/`-separated strings. A scoped channel carries its
//! organization as a leading numeric segment (`1/stream/cpu`); an unscoped
//! channel never starts with a numeric segment (`stream/cpu`).
//!
//! Alphabet: ASCII letters, digits, `_`, `-`, `=`, `.` and the `/` separator.

use crate::{AddressError, ChannelId};

/// Organization identifier. `0` means "no scope".
pub type OrgId = i64;

/// Segment separator
pub const SEPARATOR: char = '/';

/// Split a channel into its org id and tenant-local channel id.
///
/// Unscoped channels decode to org `0` with the whole string as the id.
///
/// # Errors
/// Returns [`AddressError`] when the string does not follow the channel grammar.
///
/// # Examples
/// ```
/// use contracts::org_channel;
///
/// let (org, id) = org_channel::decode("1/weather").unwrap();
/// assert_eq!(org, 1);
/// assert_eq!(id, "weather");
/// ```
pub fn decode(channel: &str) -> Result<(OrgId, ChannelId), AddressError> {
    check_path(channel)?;

    let (head, rest) = match channel.split_once(SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (channel, None),
    };

    if !is_org_segment(head) {
        return Ok((0, ChannelId::from(channel)));
    }

    let org_id = parse_org(channel, head)?;
    match rest {
        Some(rest) => Ok((org_id, ChannelId::from(rest))),
        None => Err(AddressError::MissingChannelId {
            channel: channel.to_string(),
        }),
    }
}

/// Prefix a tenant-local channel id with its org.
///
/// Org `0` leaves the id unscoped, which requires that the id does not
/// itself start with a numeric segment.
///
/// # Errors
/// Returns [`AddressError`] for a negative org or an invalid channel id.
pub fn encode(org_id: OrgId, channel: &str) -> Result<String, AddressError> {
    check_path(channel)?;

    if org_id < 0 {
        return Err(AddressError::InvalidOrgId {
            channel: channel.to_string(),
            org: org_id.to_string(),
        });
    }

    if org_id == 0 {
        let head = channel.split(SEPARATOR).next().unwrap_or_default();
        if is_org_segment(head) {
            return Err(AddressError::ScopeCollision {
                channel: channel.to_string(),
            });
        }
        return Ok(channel.to_string());
    }

    Ok(format!("{org_id}{SEPARATOR}{channel}"))
}

/// Check the alphabet and segment structure of a channel path.
///
/// Does not interpret an org prefix.
pub fn check_path(channel: &str) -> Result<(), AddressError> {
    if channel.is_empty() {
        return Err(AddressError::Empty);
    }

    if let Some(found) = channel.chars().find(|c| !is_channel_char(*c)) {
        return Err(AddressError::InvalidCharacter {
            channel: channel.to_string(),
            found,
        });
    }

    if channel.split(SEPARATOR).any(str::is_empty) {
        return Err(AddressError::EmptySegment {
            channel: channel.to_string(),
        });
    }

    Ok(())
}

fn is_channel_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '=' | '.' | SEPARATOR)
}

fn is_org_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn parse_org(channel: &str, segment: &str) -> Result<OrgId, AddressError> {
    let invalid = || AddressError::InvalidOrgId {
        channel: channel.to_string(),
        org: segment.to_string(),
    };

    // "0" and zero-padded prefixes would give one org several spellings
    if segment.starts_with('0') {
        return Err(invalid());
    }

    segment.parse::<OrgId>().map_err(|_| invalid())
}
