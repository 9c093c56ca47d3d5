use crate::storage::KeyValueStorage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub(crate) const STORAGE_KEY: &str = "tiny-helpdesk-hero.accessibility";

pub(crate) const FONT_SCALE_MIN: f32 = 0.75;
pub(crate) const FONT_SCALE_MAX: f32 = 1.75;

pub(crate) const CONTRAST_QUERIES: [&str; 3] = [
    "(forced-colors: active)",
    "(prefers-contrast: more)",
    "(prefers-contrast: high)",
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessibilityState {
    pub(crate) font_scale: f32,
    pub(crate) dyslexia_friendly: bool,
    pub(crate) high_contrast: bool,
    pub(crate) follow_system_contrast: bool,
    pub(crate) haptics_enabled: bool,
}

impl Default for AccessibilityState {
    fn default() -> Self {
        Self {
            font_scale: 1.0,
            dyslexia_friendly: false,
            high_contrast: false,
            follow_system_contrast: true,
            haptics_enabled: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct WatchId(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SubscriptionId(u64);

// `take_changes` drains ids of watched queries that flipped since the last call.
pub(crate) trait MediaQueries {
    fn matches(&self, query: &str) -> bool;
    fn watch(&mut self, query: &str) -> Option<WatchId>;
    fn unwatch(&mut self, id: WatchId);
    fn take_changes(&mut self) -> Vec<WatchId>;
}

#[derive(Default)]
pub(crate) struct EnvPorts {
    pub(crate) media: Option<Box<dyn MediaQueries>>,
    pub(crate) storage: Option<Box<dyn KeyValueStorage>>,
}

type Listener = Box<dyn FnMut(&AccessibilityState)>;

pub(crate) struct AccessibilityStore {
    state: AccessibilityState,
    media: Option<Box<dyn MediaQueries>>,
    storage: Option<Box<dyn KeyValueStorage>>,
    watches: Vec<WatchId>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl AccessibilityStore {
    pub(crate) fn new(ports: EnvPorts) -> Self {
        let EnvPorts { mut media, storage } = ports;

        let mut state = AccessibilityState::default();
        let persisted = storage.as_deref().and_then(read_persisted);
        let mut has_contrast = false;
        if let Some(map) = &persisted {
            has_contrast = map.contains_key("highContrast");
            apply_persisted(&mut state, map);
        }

        if !has_contrast {
            if let Some(system) = media.as_deref().map(system_contrast) {
                state.high_contrast = system;
            }
        }

        let mut watches = Vec::new();
        if let Some(m) = media.as_mut() {
            watches.extend(CONTRAST_QUERIES.iter().filter_map(|q| m.watch(q)));
        }

        Self {
            state,
            media,
            storage,
            watches,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub(crate) fn state(&self) -> AccessibilityState {
        self.state
    }

    pub(crate) fn subscribe(&mut self, listener: impl FnMut(&AccessibilityState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(sid, _)| *sid != id);
    }

    pub(crate) fn set_font_scale(&mut self, scale: f32) {
        self.state.font_scale = sanitize_font_scale(scale as f64);
        self.commit();
    }

    pub(crate) fn set_dyslexia_friendly(&mut self, on: bool) {
        self.state.dyslexia_friendly = on;
        self.commit();
    }

    pub(crate) fn set_haptics_enabled(&mut self, on: bool) {
        self.state.haptics_enabled = on;
        self.commit();
    }

    pub(crate) fn set_high_contrast(&mut self, on: bool) {
        self.state.high_contrast = on;
        self.state.follow_system_contrast = false;
        self.commit();
    }

    pub(crate) fn reset_high_contrast_to_system(&mut self) {
        self.state.follow_system_contrast = true;
        if let Some(system) = self.media.as_deref().map(system_contrast) {
            self.state.high_contrast = system;
        }
        self.commit();
    }

    pub(crate) fn pump_system_changes(&mut self) {
        let Some(media) = self.media.as_mut() else {
            return;
        };
        let changed = media.take_changes();
        if !changed.iter().any(|id| self.watches.contains(id)) {
            return;
        }
        let system = system_contrast(&**media);
        self.on_system_contrast(system);
    }

    fn on_system_contrast(&mut self, system: bool) {
        if !self.state.follow_system_contrast || self.state.high_contrast == system {
            return;
        }
        debug!(high_contrast = system, "following system contrast preference");
        self.state.high_contrast = system;
        self.commit();
    }

    pub(crate) fn dispose(&mut self) {
        if let Some(media) = self.media.as_mut() {
            for id in self.watches.drain(..) {
                media.unwatch(id);
            }
        }
        self.watches.clear();
        self.listeners.clear();
    }

    fn commit(&mut self) {
        if let Some(storage) = self.storage.as_mut() {
            match serde_json::to_string(&self.state) {
                Ok(raw) => {
                    if let Err(err) = storage.set(STORAGE_KEY, &raw) {
                        warn!(error = %err, "could not persist accessibility settings");
                    }
                }
                Err(err) => warn!(error = %err, "could not encode accessibility settings"),
            }
        }
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }
}

fn system_contrast(media: &dyn MediaQueries) -> bool {
    CONTRAST_QUERIES.iter().any(|q| media.matches(q))
}

fn read_persisted(storage: &dyn KeyValueStorage) -> Option<Map<String, Value>> {
    let raw = storage.get(STORAGE_KEY)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            warn!("ignoring persisted accessibility settings that are not an object");
            None
        }
        Err(err) => {
            warn!(error = %err, "ignoring unreadable accessibility settings");
            None
        }
    }
}

fn apply_persisted(state: &mut AccessibilityState, map: &Map<String, Value>) {
    if let Some(v) = map.get("fontScale") {
        state.font_scale = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .map(sanitize_font_scale)
        .unwrap_or(1.0);
    }
    let flags: [(&str, &mut bool); 4] = [
        ("dyslexiaFriendly", &mut state.dyslexia_friendly),
        ("highContrast", &mut state.high_contrast),
        ("followSystemContrast", &mut state.follow_system_contrast),
        ("hapticsEnabled", &mut state.haptics_enabled),
    ];
    for (key, slot) in flags {
        if let Some(v) = map.get(key) {
            *slot = truthy(v);
        }
    }
}

pub(crate) fn sanitize_font_scale(raw: f64) -> f32 {
    if !raw.is_finite() {
        return 1.0;
    }
    let clamped = raw.clamp(FONT_SCALE_MIN as f64, FONT_SCALE_MAX as f64);
    ((clamped * 100.0).round() / 100.0) as f32
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/* -----------------------------
   Terminal host: contrast hints from the environment
------------------------------ */

// HELPDESK_FORCED_COLORS=1 and HELPDESK_PREFERS_CONTRAST=more|high, read once.
pub(crate) struct EnvMediaQueries {
    forced_colors: bool,
    prefers_contrast: Option<String>,
    next_watch: u64,
}

impl EnvMediaQueries {
    pub(crate) fn from_env() -> Self {
        let forced_colors = std::env::var("HELPDESK_FORCED_COLORS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "active"))
            .unwrap_or(false);
        let prefers_contrast = std::env::var("HELPDESK_PREFERS_CONTRAST")
            .ok()
            .map(|v| v.trim().to_ascii_lowercase());
        Self {
            forced_colors,
            prefers_contrast,
            next_watch: 0,
        }
    }
}

impl MediaQueries for EnvMediaQueries {
    fn matches(&self, query: &str) -> bool {
        match query {
            "(forced-colors: active)" => self.forced_colors,
            "(prefers-contrast: more)" => self.prefers_contrast.as_deref() == Some("more"),
            "(prefers-contrast: high)" => self.prefers_contrast.as_deref() == Some("high"),
            _ => false,
        }
    }

    fn watch(&mut self, _query: &str) -> Option<WatchId> {
        self.next_watch += 1;
        Some(WatchId(self.next_watch))
    }

    fn unwatch(&mut self, _id: WatchId) {}

    fn take_changes(&mut self) -> Vec<WatchId> {
        Vec::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedMedia;
    use super::*;
    use crate::storage::MemoryStorage;
    use std::cell::Cell;
    use std::rc::Rc;

    const FORCED: &str = "(forced-colors: active)";
    const MORE: &str = "(prefers-contrast: more)";

    fn store_with(media: &ScriptedMedia, storage: &MemoryStorage) -> AccessibilityStore {
        AccessibilityStore::new(EnvPorts {
            media: Some(Box::new(media.clone())),
            storage: Some(Box::new(storage.clone())),
        })
    }

    #[test]
    fn defaults_without_any_host_support() {
        let store = AccessibilityStore::new(EnvPorts::default());
        assert_eq!(store.state(), AccessibilityState::default());
    }

    #[test]
    fn system_contrast_seeds_state_when_nothing_is_persisted() {
        let media = ScriptedMedia::default();
        media.set(MORE, true);
        let store = store_with(&media, &MemoryStorage::default());
        assert!(store.state().high_contrast);
        assert_eq!(media.watch_count(), CONTRAST_QUERIES.len());
    }

    #[test]
    fn persisted_values_are_sanitized_and_coerced() {
        let storage = MemoryStorage::default();
        storage.seed(
            STORAGE_KEY,
            r#"{"fontScale": 3.2, "dyslexiaFriendly": 1, "highContrast": "", "hapticsEnabled": 0}"#,
        );
        let media = ScriptedMedia::default();
        media.set(FORCED, true);
        let store = store_with(&media, &storage);
        let s = store.state();
        assert_eq!(s.font_scale, FONT_SCALE_MAX);
        assert!(s.dyslexia_friendly);
        assert!(!s.high_contrast, "persisted value wins over the system");
        assert!(!s.haptics_enabled);
        assert!(s.follow_system_contrast);
    }

    #[test]
    fn font_scale_is_clamped_and_rounded() {
        assert_eq!(sanitize_font_scale(0.1), FONT_SCALE_MIN);
        assert_eq!(sanitize_font_scale(1.234), 1.23);
        assert_eq!(sanitize_font_scale(f64::NAN), 1.0);

        let storage = MemoryStorage::default();
        storage.seed(STORAGE_KEY, r#"{"fontScale": "1.456"}"#);
        let store = AccessibilityStore::new(EnvPorts {
            media: None,
            storage: Some(Box::new(storage.clone())),
        });
        assert_eq!(store.state().font_scale, 1.46);
    }

    #[test]
    fn garbage_in_storage_falls_back_to_defaults() {
        let storage = MemoryStorage::default();
        storage.seed(STORAGE_KEY, "not json");
        let store = AccessibilityStore::new(EnvPorts {
            media: None,
            storage: Some(Box::new(storage)),
        });
        assert_eq!(store.state(), AccessibilityState::default());
    }

    #[test]
    fn manual_override_ignores_system_until_reset() {
        let media = ScriptedMedia::default();
        let storage = MemoryStorage::default();
        let mut store = store_with(&media, &storage);

        store.set_high_contrast(false);
        media.set(FORCED, true);
        store.pump_system_changes();
        assert!(!store.state().high_contrast);
        assert!(!store.state().follow_system_contrast);

        store.reset_high_contrast_to_system();
        assert!(store.state().high_contrast, "reset syncs immediately");

        media.set(FORCED, false);
        store.pump_system_changes();
        assert!(!store.state().high_contrast, "live changes apply again");
    }

    #[test]
    fn redundant_system_changes_do_not_notify() {
        let media = ScriptedMedia::default();
        let mut store = store_with(&media, &MemoryStorage::default());
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        store.subscribe(move |_| counter.set(counter.get() + 1));

        media.set(FORCED, true);
        store.pump_system_changes();
        assert_eq!(hits.get(), 1);

        // A second matching query flips but the OR'd result stays true.
        media.set(MORE, true);
        store.pump_system_changes();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn setters_persist_and_notify() {
        let storage = MemoryStorage::default();
        let mut store = store_with(&ScriptedMedia::default(), &storage);
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();
        let sub = store.subscribe(move |s| sink.set(Some(s.font_scale)));

        store.set_font_scale(1.5);
        assert_eq!(seen.get(), Some(1.5));
        store.set_dyslexia_friendly(true);
        store.set_haptics_enabled(false);

        let saved: AccessibilityState =
            serde_json::from_str(&storage.value(STORAGE_KEY).expect("persisted")).expect("json");
        assert_eq!(saved, store.state());
        assert!(saved.dyslexia_friendly && !saved.haptics_enabled);

        store.unsubscribe(sub);
        store.set_font_scale(0.75);
        assert_eq!(seen.get(), Some(1.5), "unsubscribed listener stays quiet");
    }

    #[test]
    fn dispose_detaches_watches_and_subscribers() {
        let media = ScriptedMedia::default();
        let mut store = store_with(&media, &MemoryStorage::default());
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        store.subscribe(move |_| counter.set(counter.get() + 1));

        store.dispose();
        assert_eq!(media.watch_count(), 0);

        media.set(FORCED, true);
        store.pump_system_changes();
        assert!(!store.state().high_contrast);
        store.set_haptics_enabled(false);
        assert_eq!(hits.get(), 0);
    }
}
