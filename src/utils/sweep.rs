use tokio::time;

use crate::state::{ChatRoomStore, PlaybackStore};

const SWEEP_INTERVAL: time::Duration = time::Duration::from_secs(60);

/// Background eviction of idle rooms. Only spawned when ROOM_TTL_SECS is
/// configured; without it both stores keep rooms for the process lifetime.
pub async fn task(chat: ChatRoomStore, playback: PlaybackStore, ttl_secs: u64) {
    let max_idle = chrono::Duration::seconds(ttl_secs as i64);
    let mut tick = time::interval(SWEEP_INTERVAL);
    loop {
        tick.tick().await;
        let dropped = chat.evict_idle(max_idle) + playback.evict_idle(max_idle);
        if dropped > 0 {
            tracing::info!("evicted {dropped} idle room entries");
        }
    }
}
