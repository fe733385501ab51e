use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time in milliseconds since the Unix epoch, used as the host's
/// monotonic-enough clock for tick timestamps and timers.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// `[A-Za-z0-9_-]{1,50}` — used for both room ids and asset names, since
/// both are embedded in a filesystem path or used as a public key in a
/// shared map.
pub fn sanitize_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 50
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
