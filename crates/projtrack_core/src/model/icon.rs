//! Project card icon helpers.
//!
//! Generated colors are derived from the project id, so reloading the same
//! project always yields the same color.

use crate::model::validation::ValidationError;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Derives a stable `#RRGGBB` color for one project id.
pub fn icon_color_for(id: &str) -> String {
    let hash = id.bytes().fold(FNV_OFFSET_BASIS, |acc, byte| {
        (acc ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    });
    format!("#{:06X}", hash & 0x00FF_FFFF)
}

/// Validates a caller-supplied color and normalizes it to uppercase.
pub fn normalize_icon_color(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|ch| ch.is_ascii_hexdigit());
    if !valid {
        return Err(ValidationError::InvalidIconColor(trimmed.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Returns the uppercase initials of the first two words of `name`.
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}
