//! Integer percentage arithmetic shared by the quorum and ratification
//! evaluators.
//!
//! Everything here is integer math so results are exact:
//! - `required_count(n, t)` is `ceil(n × t / 100)`
//! - `progress_percentage(c, r)` is `min(100, round(c / r × 100))`, or 100 when nothing is required
//! - rounding is half-up

/// Largest meaningful threshold.
pub const MAX_PERCENT: u8 = 100;

/// Number of votes needed to reach `threshold` percent of `total`.
///
/// ```
/// use agora_core::percent::required_count;
///
/// assert_eq!(required_count(3, 50), 2); // 1.5 → 2, never 1
/// assert_eq!(required_count(5, 40), 2);
/// assert_eq!(required_count(3, 66), 2); // 1.98 → 2
/// assert_eq!(required_count(0, 50), 0);
/// ```
#[must_use]
pub const fn required_count(total: u32, threshold: u8) -> u32 {
    let threshold = if threshold > MAX_PERCENT {
        MAX_PERCENT
    } else {
        threshold
    };
    // ceil(total * threshold / 100) = (total * threshold + 99) / 100
    let scaled = total as u64 * threshold as u64;
    scaled.div_ceil(100) as u32
}

/// Progress toward `required`, clamped to 100.
#[must_use]
pub const fn progress_percentage(current: u32, required: u32) -> u8 {
    if required == 0 {
        return MAX_PERCENT;
    }
    let pct = round_div(current as u64 * 100, required as u64);
    if pct > MAX_PERCENT as u64 {
        MAX_PERCENT
    } else {
        pct as u8
    }
}

/// Share of `part` in `whole`, or 0 when `whole` is 0.
#[must_use]
pub const fn share_percentage(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = round_div(part as u64 * 100, whole as u64);
    if pct > MAX_PERCENT as u64 {
        MAX_PERCENT
    } else {
        pct as u8
    }
}

/// `round(num / den)` with halves rounded up.
const fn round_div(num: u64, den: u64) -> u64 {
    (2 * num + den) / (2 * den)
}
