//! # Idempotency-Key キャッシュ
//!
//! 同じキーで繰り返されたリクエストに対し、トランザクションを再送せずに
//! 最初の成功レスポンスを返す。失敗したリクエストは記録しない。
//! キャッシュはウォームなインスタンス内でのみ共有される。
//!
//! 予約は [`KeyGuard`] が保持し、`complete` されずに破棄された場合
//! （エラー、クライアント切断によるハンドラの中断）はキーを解放する。
//! ロック中に `.await` しないため `std::sync::Mutex` を使う。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use symbol_tx_types::ProxyResponse;

/// キーの最大長
pub const MAX_KEY_LENGTH: usize = 255;
/// 保持するキー数の上限のデフォルト
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// キーの予約結果。
#[derive(Debug)]
pub enum Reservation<'a> {
    /// 初めてのキー。ガードを破棄するまで他のリクエストは `InFlight` になる。
    New(KeyGuard<'a>),
    /// 同じキーのリクエストが処理中
    InFlight,
    /// 処理済み。保存されたレスポンスを返す。
    Completed(ProxyResponse),
}

enum Entry {
    InFlight { started_at: Instant },
    Completed { stored_at: Instant, response: ProxyResponse },
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        match self {
            Entry::InFlight { started_at } => started_at.elapsed() >= ttl,
            Entry::Completed { stored_at, .. } => stored_at.elapsed() >= ttl,
        }
    }
}

/// Idempotency-Keyごとの処理状態を保持するキャッシュ。
///
/// 保持数が `max_entries` に達すると、最も古い処理済みエントリから追い出す。
/// 処理中のエントリは追い出さない（同時実行数で上限が決まる）。
pub struct IdempotencyCache {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl IdempotencyCache {
    /// 保持期間 `ttl`、最大 `max_entries` 件のキャッシュを作る。
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // 保持しているのは単純なマップなので、poisonされても中身は使える
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// キーを予約する。期限切れのエントリはここで掃除する。
    pub fn begin(&self, key: &str) -> Reservation<'_> {
        let mut entries = self.lock();
        entries.retain(|_, entry| !entry.is_expired(self.ttl));

        match entries.get(key) {
            Some(Entry::InFlight { .. }) => Reservation::InFlight,
            Some(Entry::Completed { response, .. }) => Reservation::Completed(response.clone()),
            None => {
                if entries.len() >= self.max_entries {
                    evict_oldest_completed(&mut entries);
                }
                entries.insert(
                    key.to_string(),
                    Entry::InFlight {
                        started_at: Instant::now(),
                    },
                );
                Reservation::New(KeyGuard {
                    cache: self,
                    key: key.to_string(),
                    completed: false,
                })
            }
        }
    }

    /// 保持しているキーの数。
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// キャッシュが空か。
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn evict_oldest_completed(entries: &mut HashMap<String, Entry>) {
    let oldest = entries
        .iter()
        .filter_map(|(key, entry)| match entry {
            Entry::Completed { stored_at, .. } => Some((key, *stored_at)),
            Entry::InFlight { .. } => None,
        })
        .min_by_key(|(_, stored_at)| *stored_at)
        .map(|(key, _)| key.clone());

    if let Some(key) = oldest {
        tracing::debug!(idempotency_key = %key, "上限に達したため古いエントリを削除します");
        entries.remove(&key);
    }
}

/// 予約したキーのガード。
///
/// `complete` で成功レスポンスを保存する。保存せずに破棄すると予約を取り消し、
/// 同じキーで再試行できるようになる。
pub struct KeyGuard<'a> {
    cache: &'a IdempotencyCache,
    key: String,
    completed: bool,
}

impl KeyGuard<'_> {
    /// 予約したキー。
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 処理結果を保存する。
    pub fn complete(mut self, response: ProxyResponse) {
        self.cache.lock().insert(
            self.key.clone(),
            Entry::Completed {
                stored_at: Instant::now(),
                response,
            },
        );
        self.completed = true;
    }
}

impl std::fmt::Debug for KeyGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard")
            .field("key", &self.key)
            .field("completed", &self.completed)
            .finish()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.cache.lock().remove(&self.key);
            tracing::debug!(idempotency_key = %self.key, "予約を取り消しました");
        }
    }
}
