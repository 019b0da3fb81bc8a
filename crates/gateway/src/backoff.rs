//! ジッター付き指数バックオフ。

use std::time::Duration;

use rand::Rng;

/// `attempt` 回目の再試行前の待ち時間を計算する。
///
/// `base_ms × 2^(attempt-1)` を `max_ms` で頭打ちにし、0〜10%のジッターを加える。
/// `attempt == 0` は待たない。
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(exponential).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
