//! WatchTimeZoneProvider - 値を差し替えられる TimeZoneProvider

use chrono::TimeZone;
use tokio::sync::watch;

use crate::ports::TimeZoneProvider;

/// ホスト側が `set` でタイムゾーンを更新する。購読者には最新値だけが届く。
pub struct WatchTimeZoneProvider<Tz: TimeZone> {
    sender: watch::Sender<Tz>,
}

impl<Tz: TimeZone> WatchTimeZoneProvider<Tz> {
    pub fn new(initial: Tz) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn set(&self, tz: Tz) {
        self.sender.send_replace(tz);
    }

    pub fn current(&self) -> Tz {
        self.sender.borrow().clone()
    }
}

impl<Tz> TimeZoneProvider<Tz> for WatchTimeZoneProvider<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    fn subscribe(&self) -> watch::Receiver<Tz> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[tokio::test]
    async fn subscribers_see_latest_zone() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let provider = WatchTimeZoneProvider::new(utc);

        let mut rx = provider.subscribe();
        assert_eq!(*rx.borrow_and_update(), utc);

        provider.set(tokyo);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), tokyo);
        assert_eq!(provider.current(), tokyo);
    }
}
