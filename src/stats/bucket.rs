/// Rounds a millisecond timing to its histogram bucket.
///
/// Values below 100 ms are kept as-is; above that the value is rounded
/// (halves up) to the nearest 10, 100 or 1000 ms depending on its decade, so
/// 147 becomes 150, 3432 becomes 3400 and 58760 becomes 59000.
#[must_use]
pub const fn round_response_time(ms: u64) -> u64 {
    let step: u64 = if ms < 100 {
        return ms;
    } else if ms < 1_000 {
        10
    } else if ms < 10_000 {
        100
    } else {
        1_000
    };
    let half = step >> 1;
    match ms.saturating_add(half).checked_div(step) {
        Some(buckets) => buckets.saturating_mul(step),
        None => ms,
    }
}
