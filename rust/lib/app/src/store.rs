//! Observable client state.
//!
//! Every piece of view state lives at a `/`-separated path:
//!
//! - `auth/state`: [`AuthState`](crate::AuthState)
//! - `follow/{user_id}`, `like/{post_id}`: [`Relation`](crate::Relation)
//! - `timeline/{tab}`, `search/posts`, ...: [`FeedState`](crate::FeedState)
//! - `profile/{user_id}`: [`ProfilePage`](crate::ProfilePage)
//! - `compose/state`: [`ComposeState`](crate::ComposeState)
//!
//! Subscribers register a pattern where `+` matches one segment and a
//! trailing `#` matches everything below. They are called synchronously
//! after the value has been stored.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared, type-erased value. Cloning bumps a refcount.
#[derive(Clone)]
pub struct StateValue(Arc<dyn Any + Send + Sync>);

impl StateValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the value as `T`, or `None` if it holds another type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateValue(..)")
    }
}

/// Handle returned by [`StateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Change callback: `(path, new value)`.
pub type ChangeHandler = Arc<dyn Fn(&str, &StateValue) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    pattern: Vec<String>,
    handler: ChangeHandler,
}

/// Path-keyed value store with pattern subscriptions.
#[derive(Default)]
pub struct StateStore {
    values: RwLock<BTreeMap<String, StateValue>>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl StateStore {
    /// Empty store with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `path` and notify matching subscribers.
    pub fn set<T: Any + Send + Sync>(&self, path: &str, value: T) {
        let value = StateValue::new(value);
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), value.clone());

        // Handlers run without any store lock held so they may read or
        // write the store themselves.
        let handlers: Vec<ChangeHandler> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| pattern_matches(&s.pattern, path))
            .map(|s| s.handler.clone())
            .collect();
        for handler in handlers {
            handler(path, &value);
        }
    }

    /// Untyped read of the value at `path`. Cheap: the value is shared,
    /// not copied.
    pub fn get(&self, path: &str) -> Option<StateValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Typed read: clone of the value at `path` if it has type `T`.
    pub fn read<T: Any + Clone>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(|v| v.downcast_ref::<T>().cloned())
    }

    /// Remove without notifying.
    pub fn remove(&self, path: &str) -> Option<StateValue> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
    }

    /// Remove every path strictly below `prefix`. Returns how many went.
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let below = format!("{}/", prefix);
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let before = values.len();
        values.retain(|k, _| !k.starts_with(&below));
        before - values.len()
    }

    /// Every path strictly below `prefix` with its value, ordered by
    /// path. `prefix` itself is not included.
    ///
    /// `scan("like")` returns `like/1`, `like/2`, ... but not `likes`.
    pub fn scan(&self, prefix: &str) -> Vec<(String, StateValue)> {
        let below = format!("{}/", prefix);
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .range(below.clone()..)
            .take_while(|(k, _)| k.starts_with(&below))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Call `handler` with the path and new value on every `set` whose
    /// path matches `pattern`.
    ///
    /// `+` matches exactly one segment and a trailing `#` matches any
    /// remainder, so `like/+` sees `like/7` and `timeline/#` sees
    /// `timeline/latest`. Removals are not reported. The handler runs on
    /// the setter's thread with no store lock held.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&str, &StateValue) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                pattern: pattern.split('/').map(str::to_string).collect(),
                handler: Arc::new(handler),
            });
        id
    }

    /// Stop delivering changes to the subscription `id`. Unknown ids are
    /// ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|s| s.id != id);
    }
}

fn pattern_matches(pattern: &[String], path: &str) -> bool {
    let mut segments = path.split('/');
    for (i, want) in pattern.iter().enumerate() {
        if want == "#" {
            return i == pattern.len() - 1;
        }
        match segments.next() {
            Some(seg) if want == "+" || want == seg => {}
            _ => return false,
        }
    }
    segments.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn seen_paths(store: &StateStore, pattern: &str) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_c = seen.clone();
        store.subscribe(pattern, move |path, _| {
            seen_c.lock().unwrap().push(path.to_string());
        });
        seen
    }

    #[test]
    fn typed_read() {
        let store = StateStore::new();
        store.set("compose/state", "draft".to_string());
        assert_eq!(store.read::<String>("compose/state"), Some("draft".to_string()));
        assert_eq!(store.read::<u32>("compose/state"), None);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn wildcard_patterns() {
        let store = StateStore::new();
        let exact = seen_paths(&store, "auth/state");
        let single = seen_paths(&store, "like/+");
        let multi = seen_paths(&store, "timeline/#");
        let all = seen_paths(&store, "#");

        store.set("auth/state", 1u32);
        store.set("like/7", 2u32);
        store.set("like/7/extra", 3u32);
        store.set("timeline/latest", 4u32);

        assert_eq!(*exact.lock().unwrap(), vec!["auth/state"]);
        assert_eq!(*single.lock().unwrap(), vec!["like/7"]);
        assert_eq!(*multi.lock().unwrap(), vec!["timeline/latest"]);
        assert_eq!(all.lock().unwrap().len(), 4);
    }

    #[test]
    fn handler_sees_stored_value_and_may_write() {
        let store = Arc::new(StateStore::new());
        let store_c = store.clone();
        store.subscribe("like/+", move |path, value| {
            assert_eq!(store_c.read::<u32>(path), value.downcast_ref::<u32>().copied());
            store_c.set("last/like", path.to_string());
        });

        store.set("like/3", 9u32);
        assert_eq!(store.read::<String>("last/like"), Some("like/3".to_string()));
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = StateStore::new();
        let count = Arc::new(AtomicU64::new(0));
        let count_c = count.clone();
        let id = store.subscribe("follow/+", move |_, _| {
            count_c.fetch_add(1, Ordering::Relaxed);
        });

        store.set("follow/1", 1u32);
        store.unsubscribe(id);
        store.set("follow/1", 2u32);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn scan_and_remove_prefix() {
        let store = StateStore::new();
        store.set("like/2", 2u32);
        store.set("like/1", 1u32);
        store.set("likes", 0u32);
        store.set("follow/1", 1u32);

        let paths: Vec<String> = store.scan("like").into_iter().map(|(k, _)| k).collect();
        assert_eq!(paths, vec!["like/1", "like/2"]);

        assert_eq!(store.remove_prefix("like"), 2);
        assert!(store.scan("like").is_empty());
        assert!(store.get("likes").is_some());
        assert!(store.get("follow/1").is_some());
    }

    #[test]
    fn documented_edges() {
        let store = StateStore::new();
        let count = Arc::new(AtomicU64::new(0));
        let count_c = count.clone();
        let id = store.subscribe("like/+", move |_, _| {
            count_c.fetch_add(1, Ordering::Relaxed);
        });

        store.set("like", 0u32);
        store.set("like/1", 1u32);
        let paths: Vec<String> = store.scan("like").into_iter().map(|(k, _)| k).collect();
        assert_eq!(paths, vec!["like/1"]);

        store.remove_prefix("like");
        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert!(store.get("like").is_some());

        store.unsubscribe(id);
        store.unsubscribe(id);
        store.set("like/1", 2u32);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
