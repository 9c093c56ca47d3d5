use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scene {
    Desk,
    Settings,
    Help,
}

/* -----------------------------
   Authored content
------------------------------ */

// Missing or mistyped fields load as blanks so one bad entry never sinks the
// file; the validator reports them and the deck skips the entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Persona {
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) mood: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) opener: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) empathy_win: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) empathy_fail: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Problem {
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) summary: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) guidance: String,
    #[serde(deserialize_with = "lenient_texts")]
    pub(crate) incorrect: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) empathy_win: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) empathy_fail: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Twist {
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub(crate) prompt_modifier: String,
    #[serde(
        deserialize_with = "lenient_boost",
        skip_serializing_if = "Option::is_none"
    )]
    pub(crate) empathy_boost: Option<String>,
}

fn text_or_blank(raw: Value) -> String {
    match raw {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => {
            warn!(value = %other, "blanking non-string content field");
            String::new()
        }
    }
}

fn lenient_text<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_or_blank(Value::deserialize(de)?))
}

fn lenient_texts<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Array(items) => items.into_iter().map(text_or_blank).collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(value = %other, "dropping non-list incorrect answers");
            Vec::new()
        }
    })
}

// Authored files sometimes carry numbers or objects here; they are dropped, not fatal.
fn lenient_boost<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(de)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            warn!(value = %other, "dropping non-string empathyBoost");
            None
        }
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum Ref<T> {
    Id(String),
    Inline(T),
}

impl<T> Ref<T> {
    pub(crate) fn id(id: impl Into<String>) -> Self {
        Ref::Id(id.into())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Seed {
    #[serde(default)]
    pub(crate) persona: Option<Ref<Persona>>,
    #[serde(default)]
    pub(crate) problem: Option<Ref<Problem>>,
    #[serde(default)]
    pub(crate) twist: Option<Ref<Twist>>,
}

impl Seed {
    pub(crate) fn ids(persona: &str, problem: &str, twist: Option<&str>) -> Self {
        Self {
            persona: Some(Ref::id(persona)),
            problem: Some(Ref::id(problem)),
            twist: twist.map(Ref::id),
        }
    }
}

// Non-objects, and objects whose references are neither ids nor objects,
// stay `Malformed` so the validator can say what is wrong.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub(crate) enum SeedEntry {
    Seed(Seed),
    Malformed(Value),
}

impl<'de> Deserialize<'de> for SeedEntry {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(de)?;
        if !raw.is_object() {
            return Ok(SeedEntry::Malformed(raw));
        }
        match serde_json::from_value::<Seed>(raw.clone()) {
            Ok(seed) => Ok(SeedEntry::Seed(seed)),
            Err(_) => Ok(SeedEntry::Malformed(raw)),
        }
    }
}

impl From<Seed> for SeedEntry {
    fn from(seed: Seed) -> Self {
        SeedEntry::Seed(seed)
    }
}

/* -----------------------------
   Built calls
------------------------------ */

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct CallOption {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) correct: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Call {
    pub(crate) id: String,
    pub(crate) persona: Persona,
    pub(crate) problem: Problem,
    pub(crate) twist: Option<Twist>,
    pub(crate) prompt: String,
    pub(crate) options: Vec<CallOption>,
    pub(crate) empathy_win: String,
    pub(crate) empathy_fail: String,
}

impl Call {
    pub(crate) fn twist_id(&self) -> Option<&str> {
        self.twist.as_ref().map(|t| t.id.as_str())
    }
}
