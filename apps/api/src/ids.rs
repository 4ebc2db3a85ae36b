use chrono::Utc;
use uuid::Uuid;

const RANDOM_SUFFIX_LEN: usize = 11;

/// Record identifier: base-36 millisecond timestamp followed by a random base-36
/// suffix. Unique enough for a single store; not a global identifier.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let random = Uuid::new_v4().as_u128();
    let mut suffix = to_base36(random);
    suffix.truncate(RANDOM_SUFFIX_LEN);
    format!("{}{}", to_base36(millis), suffix)
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
