//! TimeZoneProvider port - 端末のタイムゾーン
//!
//! ホスト環境がタイムゾーンの変化を push する。core は最新値だけを使う。

use chrono::TimeZone;
use tokio::sync::watch;

pub trait TimeZoneProvider<Tz: TimeZone>: Send + Sync {
    /// 現在値を保持し、変更を通知する receiver
    fn subscribe(&self) -> watch::Receiver<Tz>;
}
