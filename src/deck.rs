use crate::content::{resolve, ContentBundle};
use crate::model::{Call, CallOption, Persona, Problem, SeedEntry, Twist};
use tracing::{debug, warn};

const MAX_INCORRECT_OPTIONS: usize = 2;

// The caller's twist is never touched; a blank boost is dropped from the clone.
pub(crate) fn build_call(
    persona: Option<&Persona>,
    problem: Option<&Problem>,
    twist: Option<&Twist>,
) -> Option<Call> {
    let (persona, problem) = (persona?, problem?);

    let mut twist = twist.cloned();
    let mut boost = None;
    if let Some(t) = twist.as_mut() {
        if let Some(raw) = t.empathy_boost.take() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                warn!(twist = %t.id, "ignoring blank empathyBoost");
            } else {
                t.empathy_boost = Some(trimmed.to_string());
                boost = Some(trimmed.to_string());
            }
        }
    }

    let id = match &twist {
        Some(t) => format!("call-{}-{}-{}", persona.id, problem.id, t.id),
        None => format!("call-{}-{}", persona.id, problem.id),
    };

    let mut options = Vec::with_capacity(1 + MAX_INCORRECT_OPTIONS);
    options.push(CallOption {
        id: format!("{id}:0"),
        text: problem.guidance.clone(),
        correct: true,
    });
    for (i, text) in problem
        .incorrect
        .iter()
        .take(MAX_INCORRECT_OPTIONS)
        .enumerate()
    {
        options.push(CallOption {
            id: format!("{id}:{}", i + 1),
            text: text.clone(),
            correct: false,
        });
    }

    let empathy_win = match boost {
        Some(b) => format!("{} {}", problem.empathy_win, b),
        None => problem.empathy_win.clone(),
    };

    Some(Call {
        prompt: format!("{} {}", persona.opener, problem.summary)
            .trim()
            .to_string(),
        empathy_fail: persona.empathy_fail.clone(),
        empathy_win,
        options,
        twist,
        persona: persona.clone(),
        problem: problem.clone(),
        id,
    })
}

fn first_blank(fields: &[(&'static str, &str)]) -> Option<&'static str> {
    fields
        .iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
}

fn persona_gap(p: &Persona) -> Option<&'static str> {
    first_blank(&[
        ("id", p.id.as_str()),
        ("name", p.name.as_str()),
        ("mood", p.mood.as_str()),
        ("opener", p.opener.as_str()),
        ("empathyWin", p.empathy_win.as_str()),
        ("empathyFail", p.empathy_fail.as_str()),
    ])
}

fn problem_gap(p: &Problem) -> Option<&'static str> {
    first_blank(&[
        ("id", p.id.as_str()),
        ("summary", p.summary.as_str()),
        ("guidance", p.guidance.as_str()),
        ("empathyWin", p.empathy_win.as_str()),
        ("empathyFail", p.empathy_fail.as_str()),
    ])
}

fn twist_gap(t: &Twist) -> Option<&'static str> {
    first_blank(&[("id", t.id.as_str()), ("promptModifier", t.prompt_modifier.as_str())])
}

// An empty or missing seed list falls back to the bundle's own seeds.
pub(crate) fn generate_call_deck(bundle: &ContentBundle, seeds: Option<&[SeedEntry]>) -> Vec<Call> {
    let seeds = match seeds {
        Some(s) if !s.is_empty() => s,
        _ => bundle.seeds.as_slice(),
    };

    seeds
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let SeedEntry::Seed(seed) = entry else {
                debug!(index = i, "skipping malformed seed");
                return None;
            };
            let persona = resolve(seed.persona.as_ref(), &bundle.personas);
            let problem = resolve(seed.problem.as_ref(), &bundle.problems);
            let twist = resolve(seed.twist.as_ref(), &bundle.twists);

            if let Some(field) = persona.as_ref().and_then(persona_gap) {
                warn!(index = i, field, "skipping seed whose persona is incomplete");
                return None;
            }
            if let Some(field) = problem.as_ref().and_then(problem_gap) {
                warn!(index = i, field, "skipping seed whose problem is incomplete");
                return None;
            }
            let twist = twist.filter(|t| match twist_gap(t) {
                Some(field) => {
                    warn!(index = i, field, "dropping incomplete twist");
                    false
                }
                None => true,
            });

            let call = build_call(persona.as_ref(), problem.as_ref(), twist.as_ref());
            if call.is_none() {
                debug!(index = i, "skipping seed with unresolved persona or problem");
            }
            call
        })
        .collect()
}
