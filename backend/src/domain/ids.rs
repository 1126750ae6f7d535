//! Short, prefixed identifiers shown to users and to the model.
//!
//! `tsk_<22 chars>` / `proj_<22 chars>`: the UUID's 128 bits in base57, most
//! significant digit first, left-padded with the zero digit.

use uuid::Uuid;

pub const TASK_ID_PREFIX: &str = "tsk";
pub const PROJECT_ID_PREFIX: &str = "proj";

const ALPHABET: &[u8; 57] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const ENCODED_LEN: usize = 22;

pub fn short_id(id: Uuid, prefix: &str) -> String {
    let mut value = id.as_u128();
    let mut digits = [ALPHABET[0]; ENCODED_LEN];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(value % 57) as usize];
        value /= 57;
    }
    let encoded = digits.iter().map(|byte| *byte as char).collect::<String>();
    format!("{prefix}_{encoded}")
}

pub fn parse_short_id(raw: &str, prefix: &str) -> Result<Uuid, String> {
    let encoded = raw
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .ok_or_else(|| format!("id must start with {prefix}_"))?;
    if encoded.len() != ENCODED_LEN {
        return Err(format!("invalid short id length: {}", encoded.len()));
    }

    let mut value: u128 = 0;
    for byte in encoded.bytes() {
        let digit = ALPHABET
            .iter()
            .position(|candidate| *candidate == byte)
            .ok_or_else(|| format!("invalid character in short id: {}", byte as char))?;
        value = value
            .checked_mul(57)
            .and_then(|shifted| shifted.checked_add(digit as u128))
            .ok_or_else(|| "short id out of range".to_string())?;
    }
    Ok(Uuid::from_u128(value))
}

/// Accepts either the prefixed short form or a canonical UUID.
pub fn parse_id(raw: &str, prefix: &str) -> Result<Uuid, String> {
    let trimmed = raw.trim();
    if trimmed.starts_with(&format!("{prefix}_")) {
        return parse_short_id(trimmed, prefix);
    }
    Uuid::parse_str(trimmed).map_err(|error| format!("invalid id {trimmed:?}: {error}"))
}
