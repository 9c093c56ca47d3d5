use crate::content::{find, ContentBundle, Pooled};
use crate::model::{Persona, Problem, Ref, SeedEntry, Twist};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct ValidationIssue {
    pub(crate) path: String,
    pub(crate) message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
#[error("content validation failed with {} issue(s)", issues.len())]
pub(crate) struct ContentValidationError {
    pub(crate) issues: Vec<ValidationIssue>,
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    fn require(&mut self, path: &str, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(format!("{path}.{field}"), "must be a non-empty string");
        }
    }
}

// Collects every issue before failing.
pub(crate) fn validate_content(bundle: &ContentBundle) -> Result<(), ContentValidationError> {
    let mut issues = Issues::default();

    for (i, persona) in bundle.personas.iter().enumerate() {
        check_persona(&mut issues, &format!("personas[{i}]"), persona);
    }
    for (i, problem) in bundle.problems.iter().enumerate() {
        check_problem(&mut issues, &format!("problems[{i}]"), problem);
    }
    for (i, twist) in bundle.twists.iter().enumerate() {
        check_twist(&mut issues, &format!("twists[{i}]"), twist);
    }

    check_unique(&mut issues, "personas", &bundle.personas);
    check_unique(&mut issues, "problems", &bundle.problems);
    check_unique(&mut issues, "twists", &bundle.twists);

    for (i, entry) in bundle.seeds.iter().enumerate() {
        let path = format!("seeds[{i}]");
        let seed = match entry {
            SeedEntry::Seed(seed) => seed,
            SeedEntry::Malformed(raw) => {
                check_malformed_seed(&mut issues, &path, raw);
                continue;
            }
        };

        match &seed.persona {
            None => issues.push(format!("{path}.persona"), "is required"),
            Some(r) => check_ref(&mut issues, &format!("{path}.persona"), r, &bundle.personas, check_persona),
        }
        match &seed.problem {
            None => issues.push(format!("{path}.problem"), "is required"),
            Some(r) => check_ref(&mut issues, &format!("{path}.problem"), r, &bundle.problems, check_problem),
        }
        if let Some(r) = &seed.twist {
            check_ref(&mut issues, &format!("{path}.twist"), r, &bundle.twists, check_twist);
        }
    }

    if issues.0.is_empty() {
        Ok(())
    } else {
        Err(ContentValidationError { issues: issues.0 })
    }
}

fn check_malformed_seed(issues: &mut Issues, path: &str, raw: &Value) {
    let Some(fields) = raw.as_object() else {
        issues.push(path, "seed must be an object with persona and problem");
        return;
    };
    let before = issues.0.len();
    for (key, required) in [("persona", true), ("problem", true), ("twist", false)] {
        match fields.get(key) {
            None | Some(Value::Null) if required => {
                issues.push(format!("{path}.{key}"), "is required");
            }
            None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Object(_)) => {}
            Some(other) => issues.push(
                format!("{path}.{key}"),
                format!("must be an id string or an inline object, found {other}"),
            ),
        }
    }
    if issues.0.len() == before {
        issues.push(path, "seed could not be read");
    }
}

fn check_persona(issues: &mut Issues, path: &str, p: &Persona) {
    issues.require(path, "id", &p.id);
    issues.require(path, "name", &p.name);
    issues.require(path, "mood", &p.mood);
    issues.require(path, "opener", &p.opener);
    issues.require(path, "empathyWin", &p.empathy_win);
    issues.require(path, "empathyFail", &p.empathy_fail);
}

fn check_problem(issues: &mut Issues, path: &str, p: &Problem) {
    issues.require(path, "id", &p.id);
    issues.require(path, "summary", &p.summary);
    issues.require(path, "guidance", &p.guidance);
    issues.require(path, "empathyWin", &p.empathy_win);
    issues.require(path, "empathyFail", &p.empathy_fail);
    if p.incorrect.len() < 2 {
        issues.push(
            format!("{path}.incorrect"),
            "needs at least 2 distractor answers",
        );
    }
    for (j, text) in p.incorrect.iter().enumerate() {
        if text.trim().is_empty() {
            issues.push(format!("{path}.incorrect[{j}]"), "must be a non-empty string");
        }
    }
}

fn check_twist(issues: &mut Issues, path: &str, t: &Twist) {
    issues.require(path, "id", &t.id);
    issues.require(path, "promptModifier", &t.prompt_modifier);
    if let Some(boost) = &t.empathy_boost {
        if boost.trim().is_empty() {
            issues.push(
                format!("{path}.empathyBoost"),
                "must be a non-blank string when present",
            );
        }
    }
}

fn check_unique<T: Pooled>(issues: &mut Issues, pool_name: &str, pool: &[T]) {
    let mut seen = HashSet::new();
    for (i, entry) in pool.iter().enumerate() {
        let id = entry.pool_id();
        if !id.trim().is_empty() && !seen.insert(id) {
            issues.push(
                format!("{pool_name}[{i}].id"),
                format!("duplicate id '{id}'"),
            );
        }
    }
}

fn check_ref<T: Pooled>(
    issues: &mut Issues,
    path: &str,
    reference: &Ref<T>,
    pool: &[T],
    check_inline: fn(&mut Issues, &str, &T),
) {
    match reference {
        Ref::Id(id) => {
            if find(pool, id).is_none() {
                issues.push(path, format!("unknown id '{id}'"));
            }
        }
        Ref::Inline(value) => check_inline(issues, path, value),
    }
}
