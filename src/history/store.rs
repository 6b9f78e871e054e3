//! Translation history and the preferences that govern it.

use std::path::PathBuf;

use chrono::Utc;

use super::entry::{HistoryItem, NewHistoryItem};
use super::local::{LocalStore, StoreError};
use crate::remote;

/// Store key of the newest-first history list.
pub const HISTORY_KEY: &str = "translationHistory";
pub const AUTO_TRANSLATE_KEY: &str = "autoTranslate";
pub const HISTORY_ENABLED_KEY: &str = "saveTranslationHistory";
pub const LOGGED_IN_KEY: &str = "userLoggedIn";

// ---------------------------------------------------------------------------
// RemoteHistory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct RemoteHistory {
    client: reqwest::Client,
    url: String,
}

impl RemoteHistory {
    /// Fire-and-forget POST of `item`.  Failures are only logged.
    fn forward(&self, item: HistoryItem) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("history: no async runtime, entry {} not sent", item.id);
            return;
        };
        let client = self.client.clone();
        let url = self.url.clone();
        runtime.spawn(async move {
            let sent = client
                .post(&url)
                .json(&item)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status);
            match sent {
                Ok(_) => log::debug!("history: entry {} saved remotely", item.id),
                Err(e) => log::error!("history: remote save failed: {e}"),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Local history log plus optional forwarding to a history service.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    store: LocalStore,
    remote: Option<RemoteHistory>,
}

impl HistoryStore {
    /// Open the store in `dir`.  Entries are forwarded to `remote_url` when
    /// it is set and the preferences allow it.
    pub fn open(dir: impl Into<PathBuf>, remote_url: Option<String>) -> Result<Self, StoreError> {
        Ok(Self {
            store: LocalStore::open(dir)?,
            remote: remote_url.map(|url| RemoteHistory {
                client: remote::build_client(15),
                url,
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Prepend a new entry.  Never fails: problems are logged and `None` is
    /// returned.
    ///
    /// The local save happens regardless of login state.  The entry is also
    /// forwarded when the user is logged in, history saving is enabled, the
    /// entry is not a demo, and a remote URL is configured.
    pub fn record(&self, new: NewHistoryItem) -> Option<HistoryItem> {
        let mut items = match self.list() {
            Ok(items) => items,
            Err(e) => {
                log::error!("history: cannot read existing entries, not saving: {e}");
                return None;
            }
        };

        let now = Utc::now();
        let newest = items.first().map_or(i64::MIN, |i| i.id);
        let id = now.timestamp_millis().max(newest.saturating_add(1));
        let item = new.into_item(id, now);

        items.insert(0, item.clone());
        if let Err(e) = self.store.set(HISTORY_KEY, &items) {
            log::error!("history: saving entry failed: {e}");
            return None;
        }

        if !item.is_demo && self.logged_in() && self.history_enabled() {
            if let Some(remote) = &self.remote {
                remote.forward(item.clone());
            }
        }
        Some(item)
    }

    // -----------------------------------------------------------------------
    // Queries and deletion
    // -----------------------------------------------------------------------

    /// All entries, newest first.
    pub fn list(&self) -> Result<Vec<HistoryItem>, StoreError> {
        Ok(self.store.get(HISTORY_KEY)?.unwrap_or_default())
    }

    pub fn dashboard_entries(&self) -> Result<Vec<HistoryItem>, StoreError> {
        Ok(self.list()?.into_iter().filter(|i| i.from_dashboard).collect())
    }

    pub fn demo_entries(&self) -> Result<Vec<HistoryItem>, StoreError> {
        Ok(self.list()?.into_iter().filter(|i| i.is_demo).collect())
    }

    /// Remove the entry with `id`.  Returns `false` when there was none.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut items = self.list()?;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Ok(false);
        }
        self.store.set(HISTORY_KEY, &items)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.set(HISTORY_KEY, &Vec::<HistoryItem>::new())
    }

    // -----------------------------------------------------------------------
    // Preferences
    // -----------------------------------------------------------------------

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.store.get::<bool>(key) {
            Ok(value) => value.unwrap_or(default),
            Err(e) => {
                log::warn!("history: unreadable preference {key}: {e}");
                default
            }
        }
    }

    pub fn auto_translate(&self) -> bool {
        self.flag(AUTO_TRANSLATE_KEY, false)
    }

    pub fn set_auto_translate(&self, on: bool) -> Result<(), StoreError> {
        self.store.set(AUTO_TRANSLATE_KEY, &on)
    }

    /// Defaults to on.
    pub fn history_enabled(&self) -> bool {
        self.flag(HISTORY_ENABLED_KEY, true)
    }

    pub fn set_history_enabled(&self, on: bool) -> Result<(), StoreError> {
        self.store.set(HISTORY_ENABLED_KEY, &on)
    }

    pub fn logged_in(&self) -> bool {
        self.flag(LOGGED_IN_KEY, false)
    }

    pub fn set_logged_in(&self, on: bool) -> Result<(), StoreError> {
        self.store.set(LOGGED_IN_KEY, &on)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    fn open(remote_url: Option<String>) -> (TempDir, HistoryStore) {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("store"), remote_url).unwrap();
        (dir, store)
    }

    fn entry(n: usize) -> NewHistoryItem {
        NewHistoryItem::new(format!("text {n}"), format!("maandiko {n}"), "English", "Giriama")
    }

    async fn wait_for(mock: &mockito::Mock) {
        for _ in 0..100 {
            if mock.matched_async().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn n_saves_give_n_entries_newest_first() {
        let (_dir, store) = open(None);
        for n in 0..5 {
            store.record(entry(n)).unwrap();
        }
        let items = store.list().unwrap();
        assert_eq!(items.len(), 5);
        let texts: Vec<_> = items.iter().map(|i| i.source_text.as_str()).collect();
        assert_eq!(texts, ["text 4", "text 3", "text 2", "text 1", "text 0"]);
        assert!(items.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[test]
    fn delete_removes_exactly_one_and_keeps_order() {
        let (_dir, store) = open(None);
        let ids: Vec<i64> = (0..4).map(|n| store.record(entry(n)).unwrap().id).collect();

        assert!(store.delete(ids[1]).unwrap());
        let left: Vec<i64> = store.list().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(left, vec![ids[3], ids[2], ids[0]]);

        assert!(!store.delete(ids[1]).unwrap());
    }

    #[test]
    fn clear_empties_the_log() {
        let (_dir, store) = open(None);
        store.record(entry(0)).unwrap();
        store.record(entry(1)).unwrap();
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn filters_by_origin_and_demo_flag() {
        let (_dir, store) = open(None);
        store.record(entry(0).from_dashboard(true)).unwrap();
        store.record(entry(1).demo(true)).unwrap();
        store.record(entry(2)).unwrap();

        assert_eq!(store.dashboard_entries().unwrap().len(), 1);
        let demos = store.demo_entries().unwrap();
        assert_eq!(demos.len(), 1);
        assert_eq!(demos[0].source_text, "text 1");
    }

    #[test]
    fn corrupt_log_is_not_overwritten() {
        let (dir, store) = open(None);
        let path = dir.path().join("store").join("translationHistory.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(store.record(entry(0)).is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[test]
    fn preference_defaults_and_updates() {
        let (_dir, store) = open(None);
        assert!(!store.auto_translate());
        assert!(store.history_enabled());
        assert!(!store.logged_in());

        store.set_auto_translate(true).unwrap();
        store.set_history_enabled(false).unwrap();
        store.set_logged_in(true).unwrap();
        assert!(store.auto_translate());
        assert!(!store.history_enabled());
        assert!(store.logged_in());
    }

    #[test]
    fn record_works_without_a_runtime() {
        let (_dir, store) = open(Some("http://127.0.0.1:9/history".into()));
        store.set_logged_in(true).unwrap();
        assert!(store.record(entry(0)).is_some());
    }

    #[tokio::test]
    async fn logged_in_entries_are_forwarded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/translations/history")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "sourceText": "text 7",
                "isDemo": false
            })))
            .with_status(201)
            .create_async()
            .await;

        let (_dir, store) = open(Some(format!("{}/api/translations/history", server.url())));
        store.set_logged_in(true).unwrap();
        store.record(entry(7)).unwrap();

        wait_for(&mock).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn nothing_is_forwarded_when_not_allowed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let (_dir, store) = open(Some(server.url()));

        // Logged out.
        store.record(entry(0)).unwrap();
        // Logged in, but a demo entry.
        store.set_logged_in(true).unwrap();
        store.record(entry(1).demo(true)).unwrap();
        // Logged in, history saving disabled.
        store.set_history_enabled(false).unwrap();
        store.record(entry(2)).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        mock.assert_async().await;
        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn remote_failure_does_not_affect_local_save() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/h")
            .with_status(500)
            .create_async()
            .await;
        let (_dir, store) = open(Some(format!("{}/h", server.url())));
        store.set_logged_in(true).unwrap();

        let item = store.record(entry(0)).unwrap();
        wait_for(&mock).await;
        assert_eq!(store.list().unwrap(), vec![item]);
    }
}
