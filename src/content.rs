use crate::model::{Persona, Problem, Ref, SeedEntry, Twist};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{fs, path::Path};
use tracing::warn;

const BUILTIN_CONTENT: &str = include_str!("../data/default_content.json");

pub(crate) trait Pooled: Clone {
    fn pool_id(&self) -> &str;
}

impl Pooled for Persona {
    fn pool_id(&self) -> &str {
        &self.id
    }
}

impl Pooled for Problem {
    fn pool_id(&self) -> &str {
        &self.id
    }
}

impl Pooled for Twist {
    fn pool_id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct ContentBundle {
    #[serde(default, deserialize_with = "lenient_pool")]
    pub(crate) personas: Vec<Persona>,
    #[serde(default, deserialize_with = "lenient_pool")]
    pub(crate) problems: Vec<Problem>,
    #[serde(default, deserialize_with = "lenient_pool")]
    pub(crate) twists: Vec<Twist>,
    #[serde(default, deserialize_with = "lenient_seeds")]
    pub(crate) seeds: Vec<SeedEntry>,
}

fn list_or_empty(raw: Value, what: &str) -> Vec<Value> {
    match raw {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            warn!(value = %other, "{what} is not a list, ignoring it");
            Vec::new()
        }
    }
}

// A non-object keeps its slot as a blank entry so validator paths stay aligned.
fn lenient_pool<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let items = list_or_empty(Value::deserialize(de)?, "content pool");
    Ok(items
        .into_iter()
        .map(|item| {
            if !item.is_object() {
                warn!(value = %item, "pool entry is not an object");
                return T::default();
            }
            serde_json::from_value(item).unwrap_or_else(|err| {
                warn!(%err, "pool entry could not be read");
                T::default()
            })
        })
        .collect())
}

fn lenient_seeds<'de, D>(de: D) -> Result<Vec<SeedEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    list_or_empty(Value::deserialize(de)?, "seeds")
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
        .collect()
}

impl ContentBundle {
    pub(crate) fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_CONTENT).context("built-in content is not valid JSON")
    }

    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read content file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("could not parse content file {}", path.display()))
    }

    pub(crate) fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

pub(crate) fn find<'a, T: Pooled>(pool: &'a [T], id: &str) -> Option<&'a T> {
    pool.iter().find(|entry| entry.pool_id() == id)
}

pub(crate) fn resolve<T: Pooled>(reference: Option<&Ref<T>>, pool: &[T]) -> Option<T> {
    match reference? {
        Ref::Id(id) => find(pool, id).cloned(),
        Ref::Inline(value) => Some(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Seed;

    #[test]
    fn builtin_content_parses_with_every_pool_populated() {
        let bundle = ContentBundle::builtin().expect("builtin content");
        assert!(!bundle.personas.is_empty());
        assert!(!bundle.problems.is_empty());
        assert!(!bundle.twists.is_empty());
        assert!(bundle
            .seeds
            .iter()
            .all(|s| matches!(s, SeedEntry::Seed(_))));
    }

    #[test]
    fn resolve_handles_ids_inline_values_and_missing_refs() {
        let bundle = ContentBundle::builtin().expect("builtin content");
        let by_id = resolve(Some(&Ref::id("new-hire")), &bundle.personas);
        assert_eq!(by_id.map(|p| p.name), Some("Devon".to_string()));

        let missing = resolve(Some(&Ref::id("nobody")), &bundle.personas);
        assert!(missing.is_none());

        let inline = bundle.twists[0].clone();
        let resolved = resolve(Some(&Ref::Inline(inline.clone())), &[]);
        assert_eq!(resolved, Some(inline));

        assert!(resolve::<Twist>(None, &bundle.twists).is_none());
    }

    #[test]
    fn seed_entries_keep_non_objects_as_malformed() {
        let raw = r#"{
            "seeds": [
                "overwhelmed-designer",
                42,
                ["new-hire", "vpn-drop"],
                { "persona": "new-hire", "problem": "vpn-drop" },
                { "persona": { "id": "half" }, "problem": "vpn-drop" },
                { "persona": 7, "problem": "vpn-drop" }
            ]
        }"#;
        let bundle = ContentBundle::from_json(raw).expect("parses");
        let kinds: Vec<bool> = bundle
            .seeds
            .iter()
            .map(|s| matches!(s, SeedEntry::Seed(_)))
            .collect();
        assert_eq!(kinds, vec![false, false, false, true, true, false]);
        assert_eq!(
            bundle.seeds[3],
            SeedEntry::Seed(Seed::ids("new-hire", "vpn-drop", None))
        );
        let SeedEntry::Seed(half) = &bundle.seeds[4] else {
            panic!("inline persona with missing fields still loads");
        };
        let Some(Ref::Inline(persona)) = &half.persona else {
            panic!("inline persona kept");
        };
        assert_eq!(persona.id, "half");
        assert!(persona.name.is_empty());
    }

    #[test]
    fn persona_without_a_name_loads_with_the_rest_of_the_bundle() {
        let raw = r#"{
            "personas": [
                { "id": "nameless", "mood": "calm", "opener": "Hi.", "empathyWin": "w", "empathyFail": "f" }
            ],
            "problems": [
                { "id": "p", "summary": "s", "guidance": "g", "incorrect": ["a", 3], "empathyWin": "w", "empathyFail": "f" }
            ]
        }"#;
        let bundle = ContentBundle::from_json(raw).expect("one bad field must not fail the load");
        assert_eq!(bundle.personas.len(), 1);
        assert_eq!(bundle.personas[0].id, "nameless");
        assert_eq!(bundle.personas[0].name, "");
        assert_eq!(bundle.problems[0].incorrect, vec!["a".to_string(), String::new()]);
    }

    #[test]
    fn non_object_pool_entries_keep_their_slot() {
        let raw = r#"{
            "personas": [
                "new-hire",
                { "id": "ok", "name": "Ok", "mood": "m", "opener": "o", "empathyWin": "w", "empathyFail": "f" }
            ],
            "twists": { "id": "not-a-list" }
        }"#;
        let bundle = ContentBundle::from_json(raw).expect("parses");
        assert_eq!(bundle.personas.len(), 2);
        assert_eq!(bundle.personas[0], Persona::default());
        assert_eq!(bundle.personas[1].name, "Ok");
        assert!(bundle.twists.is_empty());
    }

    #[test]
    fn non_string_boost_is_dropped_at_load() {
        let raw = r#"{
            "twists": [
                { "id": "odd", "promptModifier": "Odd.", "empathyBoost": 7 },
                { "id": "ok", "promptModifier": "Fine.", "empathyBoost": "Nice." }
            ]
        }"#;
        let bundle = ContentBundle::from_json(raw).expect("parses");
        assert_eq!(bundle.twists[0].empathy_boost, None);
        assert_eq!(bundle.twists[1].empathy_boost.as_deref(), Some("Nice."));
    }
}
