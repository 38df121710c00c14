use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Messages kept per room before the oldest one is dropped.
pub const CHAT_HISTORY_CAP: usize = 200;

/* ------------ chat relay ------------ */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub user: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
}

struct RoomLog {
    messages: VecDeque<ChatMessage>,
    touched_at: DateTime<Utc>,
}

/// Per-room bounded message history, polled with a `since` cursor.
///
/// Messages are stored in arrival order while the `since` filter compares
/// client-visible timestamps, so a backdated timestamp can make the two
/// orders disagree. Known limitation, kept as-is.
#[derive(Clone)]
pub struct ChatRoomStore {
    rooms: Arc<RwLock<HashMap<String, RoomLog>>>,
    capacity: usize,
}

impl ChatRoomStore {
    pub fn new() -> Self {
        Self::with_capacity(CHAT_HISTORY_CAP)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Append to the room's log, creating it on first use. At capacity the
    /// oldest message is dropped, so the log never exceeds the cap.
    pub fn add_message(&self, room: &str, msg: ChatMessage) -> ChatMessage {
        let mut rooms = self.rooms.write().unwrap();
        let log = rooms.entry(room.to_owned()).or_insert_with(|| RoomLog {
            messages: VecDeque::with_capacity(self.capacity),
            touched_at: Utc::now(),
        });
        if log.messages.len() == self.capacity {
            log.messages.pop_front();
        }
        log.messages.push_back(msg.clone());
        log.touched_at = Utc::now();
        msg
    }

    /// Snapshot of the room's log, oldest first. With `since`, only messages
    /// whose timestamp is strictly greater are returned. An unknown room is
    /// an empty list, not an error.
    pub fn get_messages(&self, room: &str, since: Option<DateTime<Utc>>) -> Vec<ChatMessage> {
        let rooms = self.rooms.read().unwrap();
        let Some(log) = rooms.get(room) else {
            return Vec::new();
        };
        match since {
            None => log.messages.iter().cloned().collect(),
            Some(t) => log
                .messages
                .iter()
                .filter(|m| m.timestamp > t)
                .cloned()
                .collect(),
        }
    }

    /// Drop rooms that saw no append for longer than `max_idle`.
    /// Returns how many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut rooms = self.rooms.write().unwrap();
        let before = rooms.len();
        rooms.retain(|_, log| log.touched_at > cutoff);
        before - rooms.len()
    }
}

impl Default for ChatRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

/* ------------ playback pointer ------------ */

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub url: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// One live playback pointer per room. The version starts at 1 and moves up
/// by exactly one on every update; the write lock makes the
/// read-increment-write step atomic against concurrent updates.
#[derive(Clone, Default)]
pub struct PlaybackStore {
    rooms: Arc<RwLock<HashMap<String, PlaybackState>>>,
}

impl PlaybackStore {
    /// Replace the room's pointer with `url` stamped now.
    pub fn update(&self, room: &str, url: &str) -> PlaybackState {
        let mut rooms = self.rooms.write().unwrap();
        let version = rooms.get(room).map_or(1, |s| s.version + 1);
        let state = PlaybackState {
            url: url.to_owned(),
            updated_at: Utc::now(),
            version,
        };
        rooms.insert(room.to_owned(), state.clone());
        state
    }

    /// Current pointer, or `None` if the room was never updated.
    pub fn get(&self, room: &str) -> Option<PlaybackState> {
        self.rooms.read().unwrap().get(room).cloned()
    }

    /// Drop rooms whose pointer was not touched for longer than `max_idle`.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut rooms = self.rooms.write().unwrap();
        let before = rooms.len();
        rooms.retain(|_, s| s.updated_at > cutoff);
        before - rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, ts: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            user: "anonymous".into(),
            content: format!("msg {id}"),
            timestamp: ts,
            kind: "chat".into(),
        }
    }

    #[test]
    fn capacity_bound_keeps_most_recent() {
        let store = ChatRoomStore::with_capacity(5);
        let t0 = Utc::now();
        for i in 0..9 {
            store.add_message("r", msg(&i.to_string(), t0 + Duration::seconds(i)));
        }
        let log = store.get_messages("r", None);
        assert_eq!(log.len(), 5);
        let ids: Vec<_> = log.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["4", "5", "6", "7", "8"]);
    }

    #[test]
    fn default_capacity_is_200() {
        let store = ChatRoomStore::new();
        let t0 = Utc::now();
        for i in 0..230 {
            store.add_message("r", msg(&i.to_string(), t0));
        }
        assert_eq!(store.get_messages("r", None).len(), 200);
    }

    #[test]
    fn since_filter_is_strictly_greater_and_stable() {
        let store = ChatRoomStore::new();
        let t0 = Utc::now();
        for i in 0..6 {
            store.add_message("r", msg(&i.to_string(), t0 + Duration::seconds(i)));
        }
        let cut = t0 + Duration::seconds(2);
        let all = store.get_messages("r", None);
        let expected: Vec<_> = all
            .iter()
            .filter(|m| m.timestamp > cut)
            .map(|m| m.id.clone())
            .collect();
        let got: Vec<_> = store
            .get_messages("r", Some(cut))
            .iter()
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(got, expected);
        assert_eq!(got, ["3", "4", "5"]);
        // unchanged state, same cursor, identical result
        assert_eq!(
            store.get_messages("r", Some(cut)),
            store.get_messages("r", Some(cut))
        );
    }

    #[test]
    fn arrival_order_wins_over_backdated_timestamps() {
        let store = ChatRoomStore::new();
        let t0 = Utc::now();
        store.add_message("r", msg("a", t0));
        store.add_message("r", msg("b", t0 - Duration::seconds(30)));
        let ids: Vec<_> = store
            .get_messages("r", None)
            .iter()
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(ids, ["a", "b"]);
        // the backdated message falls out of a cursor set past its timestamp
        let after: Vec<_> = store
            .get_messages("r", Some(t0 - Duration::seconds(1)))
            .iter()
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(after, ["a"]);
    }

    #[test]
    fn unknown_room_is_empty() {
        let store = ChatRoomStore::new();
        assert!(store.get_messages("nonexistent", None).is_empty());
    }

    #[test]
    fn rooms_are_independent() {
        let store = ChatRoomStore::new();
        let t0 = Utc::now();
        store.add_message("a", msg("1", t0));
        store.add_message("b", msg("2", t0));
        assert_eq!(store.get_messages("a", None).len(), 1);
        assert_eq!(store.get_messages("b", None).len(), 1);
        assert_eq!(store.get_messages("a", None)[0].id, "1");
    }

    #[test]
    fn version_counts_up_from_one() {
        let store = PlaybackStore::default();
        for i in 1..=5u64 {
            assert_eq!(store.update("r", &format!("http://x/{i}.mp4")).version, i);
        }
    }

    #[test]
    fn concurrent_updates_never_skip_or_repeat_versions() {
        let store = PlaybackStore::default();
        let mut handles = Vec::new();
        for t in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                (0..25)
                    .map(|i| store.update("r", &format!("http://x/{t}-{i}.mp4")).version)
                    .collect::<Vec<_>>()
            }));
        }
        let mut seen: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=200).collect::<Vec<_>>());
    }

    #[test]
    fn unknown_room_has_no_state() {
        assert!(PlaybackStore::default().get("nonexistent").is_none());
    }

    #[test]
    fn update_replaces_pointer() {
        let store = PlaybackStore::default();
        store.update("room1", "http://x/1.mp4");
        store.update("room1", "http://x/2.mp4");
        let s = store.get("room1").unwrap();
        assert_eq!(s.url, "http://x/2.mp4");
        assert_eq!(s.version, 2);
    }

    #[test]
    fn playback_versions_are_per_room() {
        let store = PlaybackStore::default();
        store.update("a", "http://x/1.mp4");
        store.update("a", "http://x/2.mp4");
        assert_eq!(store.update("b", "http://y/1.mp4").version, 1);
        assert_eq!(store.get("a").unwrap().version, 2);
    }

    #[test]
    fn evict_idle_drops_stale_rooms_only() {
        let chat = ChatRoomStore::new();
        chat.add_message("r", msg("1", Utc::now()));
        assert_eq!(chat.evict_idle(Duration::hours(1)), 0);
        assert_eq!(chat.evict_idle(Duration::zero()), 1);
        assert!(chat.get_messages("r", None).is_empty());

        let playback = PlaybackStore::default();
        playback.update("r", "http://x/1.mp4");
        assert_eq!(playback.evict_idle(Duration::hours(1)), 0);
        assert_eq!(playback.evict_idle(Duration::zero()), 1);
        assert!(playback.get("r").is_none());
    }
}
