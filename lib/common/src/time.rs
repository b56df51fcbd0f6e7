use std::time::SystemTime;

/// Returns the current unix timestamp in whole seconds elapsed since 1970-01-01.
#[inline]
pub fn timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("Closed timelike curve, reality compromised")
        .as_secs()
}

/// Returns the current unix timestamp in milliseconds, used for the
/// `PingPacket`/`Message` wire timestamps (spec §3.2, §3.5).
#[inline]
pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("Closed timelike curve, reality compromised")
        .as_millis() as u64
}
