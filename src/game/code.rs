//! Short room codes.
//!
//! A code is the 32-bit FNV-1a hash of the current timestamp shifted right by
//! 20 bits, which leaves a number of at most four digits that players can
//! type. Collisions with live rooms are resolved by drawing again.

use std::time::{SystemTime, UNIX_EPOCH};

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Number of low bits dropped from the hash.
pub const CODE_SHIFT: u32 = 20;

/// 32-bit FNV-1a.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Code derived from a timestamp in nanoseconds.
pub fn code_for(nanos: u128) -> u32 {
    fnv1a32(nanos.to_string().as_bytes()) >> CODE_SHIFT
}

/// Nanoseconds since the Unix epoch.
pub fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

/// Draw codes from `clock` until one is not `in_use`.
pub fn allocate(mut clock: impl FnMut() -> u128, in_use: impl Fn(u32) -> bool) -> u32 {
    loop {
        let code = code_for(clock());
        if !in_use(code) {
            return code;
        }
    }
}
