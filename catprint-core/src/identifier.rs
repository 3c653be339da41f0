//! 16-bit Bluetooth identifiers
//!
//! Short GATT identifiers such as `ae30` live inside the Bluetooth base UUID
//! `0000xxxx-0000-1000-8000-00805f9b34fb`.

use uuid::Uuid;

use crate::error::{Error, Result};

const BASE: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Bluetooth base UUID
pub const BASE_UUID: Uuid = Uuid::from_u128(BASE);

const SHORT_SHIFT: u32 = 96;
const SHORT_MASK: u128 = 0xFFFF_FFFF << SHORT_SHIFT;

/// Expand a 16-bit identifier into its 128-bit form
pub const fn uuid_from_u16(short: u16) -> Uuid {
    Uuid::from_u128(BASE | ((short as u128) << SHORT_SHIFT))
}

/// Expand a 2-byte hex identifier (`"ae30"`, `"0xAE30"`) into its 128-bit form
///
/// # Errors
///
/// [`Error::InvalidIdentifier`] unless the input is exactly four hex digits
/// after an optional `0x` prefix.
///
/// # Examples
///
/// ```
/// use catprint_core::identifier::build_uuid;
///
/// let uuid = build_uuid("ae30").unwrap();
/// assert_eq!(uuid.to_string(), "0000ae30-0000-1000-8000-00805f9b34fb");
/// assert!(build_uuid("xyz").is_err());
/// ```
pub fn build_uuid(short_id: &str) -> Result<Uuid> {
    let digits = short_id
        .strip_prefix("0x")
        .or_else(|| short_id.strip_prefix("0X"))
        .unwrap_or(short_id);

    if digits.len() != 4 {
        return Err(Error::InvalidIdentifier(short_id.to_string()));
    }

    let bytes = hex::decode(digits).map_err(|_| Error::InvalidIdentifier(short_id.to_string()))?;

    Ok(uuid_from_u16(u16::from_be_bytes([bytes[0], bytes[1]])))
}

/// Recover the 16-bit form of a base-range UUID
pub fn short_id(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    if (value & !SHORT_MASK) != BASE || value >> (SHORT_SHIFT + 16) != 0 {
        return None;
    }
    Some((value >> SHORT_SHIFT) as u16)
}
