//! State to pincode-prefix mapping.
//!
//! The first two digits of an Indian PIN identify the postal circle. A
//! state maps to the set of two-digit prefixes its circles use; several
//! small territories share prefixes with a neighbour. States missing from
//! the table are not judged.

/// Two-digit PIN prefixes per state or union territory, keyed by the
/// normalized name produced by [`normalize_region_name`].
const STATE_PIN_PREFIXES: &[(&str, &[u8])] = &[
    ("delhi", &[11]),
    ("haryana", &[12, 13]),
    ("punjab", &[14, 15, 16]),
    ("chandigarh", &[16]),
    ("himachal pradesh", &[17]),
    ("jammu and kashmir", &[18, 19]),
    ("ladakh", &[19]),
    ("uttar pradesh", &[20, 21, 22, 23, 24, 25, 26, 27, 28]),
    ("uttarakhand", &[24, 26]),
    ("rajasthan", &[30, 31, 32, 33, 34]),
    ("gujarat", &[36, 37, 38, 39]),
    ("dadra and nagar haveli and daman and diu", &[36, 39]),
    ("maharashtra", &[40, 41, 42, 43, 44]),
    ("goa", &[40]),
    ("madhya pradesh", &[45, 46, 47, 48]),
    ("chhattisgarh", &[46, 49]),
    ("telangana", &[50]),
    ("andhra pradesh", &[50, 51, 52, 53]),
    ("karnataka", &[56, 57, 58, 59]),
    ("tamil nadu", &[60, 61, 62, 63, 64]),
    ("puducherry", &[53, 60, 67]),
    ("kerala", &[67, 68, 69]),
    ("lakshadweep", &[68]),
    ("west bengal", &[70, 71, 72, 73, 74]),
    ("sikkim", &[73]),
    ("andaman and nicobar islands", &[74]),
    ("odisha", &[75, 76, 77]),
    ("assam", &[78]),
    ("arunachal pradesh", &[79]),
    ("manipur", &[79]),
    ("meghalaya", &[79]),
    ("mizoram", &[79]),
    ("nagaland", &[79]),
    ("tripura", &[79]),
    ("bihar", &[80, 81, 82, 83, 84, 85]),
    ("jharkhand", &[81, 82, 83]),
];

/// Older or alternate spellings mapped to the table key.
const STATE_ALIASES: &[(&str, &str)] = &[
    ("nct of delhi", "delhi"),
    ("new delhi", "delhi"),
    ("orissa", "odisha"),
    ("pondicherry", "puducherry"),
    ("uttaranchal", "uttarakhand"),
    ("chhatisgarh", "chhattisgarh"),
    ("andaman and nicobar", "andaman and nicobar islands"),
    ("dadra and nagar haveli", "dadra and nagar haveli and daman and diu"),
    ("daman and diu", "dadra and nagar haveli and daman and diu"),
    ("west bangal", "west bengal"),
];

/// Normalizes a state or district name for comparison.
///
/// Lowercases, spells `&` as `and`, and collapses every run of
/// non-alphanumeric characters into one space.
pub fn normalize_region_name(name: &str) -> String {
    let lowered = name.to_lowercase().replace('&', " and ");
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prefixes allowed for `state`, or `None` when the state is unknown.
pub fn allowed_prefixes(state: &str) -> Option<&'static [u8]> {
    let normalized = normalize_region_name(state);
    let key = STATE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map_or(normalized.as_str(), |(_, canonical)| *canonical);

    STATE_PIN_PREFIXES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, prefixes)| *prefixes)
}

/// Two-digit prefix of a digit-only pincode.
pub fn pin_prefix(pincode: &str) -> Option<u8> {
    pincode.get(..2).and_then(|prefix| prefix.parse::<u8>().ok())
}

/// Outcome of checking a state against a pincode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionCheck {
    /// Prefix belongs to the state
    Consistent,
    /// Prefix belongs to another circle
    Mismatch {
        /// Prefix found in the pincode
        prefix: u8,
    },
    /// State not in the table or pincode too short
    Unknown,
}

/// Checks whether `pincode` can belong to `state`.
pub fn check_state_pincode(state: &str, pincode: &str) -> RegionCheck {
    let (Some(prefixes), Some(prefix)) = (allowed_prefixes(state), pin_prefix(pincode)) else {
        return RegionCheck::Unknown;
    };
    if prefixes.contains(&prefix) {
        RegionCheck::Consistent
    } else {
        RegionCheck::Mismatch { prefix }
    }
}
