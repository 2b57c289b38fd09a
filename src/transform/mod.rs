pub mod functions;
pub mod matching;
pub mod rule;

use std::borrow::Cow;

use serde_json::{Map, Value};
use serde_json_path::JsonPath;

pub use functions::{FnRegistry, RuleFn};
pub use rule::{Fetcher, MatchSpec, TransformRule};

/// Interpret an ordered rule list against a source mapping.
///
/// `None` rules pass the input through unchanged. Each rule writes at most one
/// destination key; a later rule targeting the same key overwrites the earlier
/// write. A failing rule is logged and skipped, never aborting the pass, and a
/// query rule that produces nothing leaves its key absent.
pub fn transform(
    rules: Option<&[TransformRule]>,
    input: &Map<String, Value>,
    functions: &FnRegistry,
) -> Map<String, Value> {
    let Some(rules) = rules else {
        return input.clone();
    };

    let source = Value::Object(input.clone());
    let mut output = Map::new();

    for rule in rules {
        match rule {
            TransformRule::Literal { dest, value } => {
                output.insert(dest.clone(), value.clone());
            }
            TransformRule::Call { dest, fnc, params } => match functions.get(fnc) {
                Some(function) => {
                    if let Err(err) = function(dest, params, input, &mut output) {
                        tracing::warn!("rule function {fnc:?} failed for {dest:?}: {err}");
                    }
                }
                None => {
                    tracing::warn!("unknown rule function {fnc:?}; skipping rule for {dest:?}");
                }
            },
            TransformRule::Query {
                dest,
                src,
                fetcher,
                sep,
                matcher,
            } => {
                if let Some(value) = eval_query(src, *fetcher, sep, matcher.as_ref(), &source) {
                    output.insert(dest.clone(), Value::String(value));
                }
            }
        }
    }

    output
}

/// Check a rule list against the function registry. Called when webhook
/// configuration is written so unknown function names fail fast instead of
/// surfacing as skipped rules at dispatch time.
pub fn validate_rules(rules: &[TransformRule], functions: &FnRegistry) -> Result<(), String> {
    for rule in rules {
        if let TransformRule::Call { dest, fnc, .. } = rule {
            if !functions.contains(fnc) {
                return Err(format!("rule for {dest:?} names unknown function {fnc:?}"));
            }
        }
    }
    Ok(())
}

fn eval_query(
    queries: &[String],
    fetcher: Fetcher,
    sep: &str,
    matcher: Option<&MatchSpec>,
    source: &Value,
) -> Option<String> {
    let mut chunks = Vec::new();

    for query in queries {
        let path = match JsonPath::parse(&normalize_query(query)) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!("cannot compile query {query:?}: {err}");
                continue;
            }
        };

        let nodes = path.query(source).all();
        if nodes.is_empty() {
            tracing::debug!("query {query:?} matched nothing");
            continue;
        }

        match fetcher {
            Fetcher::First => chunks.push(scalar_text(nodes[0])),
            Fetcher::Text => chunks.push(nodes[0].to_string()),
            Fetcher::All => {
                let values: Vec<Value> = nodes.into_iter().cloned().collect();
                chunks.push(Value::Array(values).to_string());
            }
        }
    }

    if chunks.is_empty() {
        return None;
    }

    let candidate = chunks.join(sep);
    let value = match matcher {
        Some(spec) => matching::process_match(spec, &candidate),
        None => candidate,
    };

    if value.is_empty() { None } else { Some(value) }
}

/// Rules written against the original dot-query dialect start with `.`;
/// normalize those to JSONPath root queries.
fn normalize_query(query: &str) -> Cow<'_, str> {
    if query.starts_with('.') {
        Cow::Owned(format!("${query}"))
    } else {
        Cow::Borrowed(query)
    }
}

fn scalar_text(node: &Value) -> String {
    match node {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
