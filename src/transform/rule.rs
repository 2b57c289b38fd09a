use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Strategy for pulling a textual result out of a query evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fetcher {
    /// First matched node; strings are used verbatim, other nodes as JSON text.
    #[default]
    First,
    /// The entire result list rendered as its JSON text.
    All,
    /// First matched node rendered as compact JSON text, strings included.
    Text,
}

/// Regex post-processing attached to a query rule. Deserializes from a bare
/// pattern string or a `[pattern, flags?, separator?]` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawMatch")]
pub struct MatchSpec {
    pub pattern: String,
    pub flags: String,
    pub sep: String,
}

pub const DEFAULT_SEP: &str = " ";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMatch {
    Pattern(String),
    Parts(Vec<String>),
}

impl TryFrom<RawMatch> for MatchSpec {
    type Error = String;

    fn try_from(raw: RawMatch) -> Result<Self, Self::Error> {
        match raw {
            RawMatch::Pattern(pattern) => Ok(MatchSpec {
                pattern,
                flags: String::new(),
                sep: DEFAULT_SEP.to_string(),
            }),
            RawMatch::Parts(parts) => {
                if parts.is_empty() || parts.len() > 3 {
                    return Err(format!(
                        "match must be a pattern or [pattern, flags, separator], got {} elements",
                        parts.len()
                    ));
                }
                let mut parts = parts.into_iter();
                Ok(MatchSpec {
                    pattern: parts.next().unwrap_or_default(),
                    flags: parts.next().unwrap_or_default(),
                    sep: parts.next().unwrap_or_else(|| DEFAULT_SEP.to_string()),
                })
            }
        }
    }
}

impl Serialize for MatchSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.flags.is_empty() && self.sep == DEFAULT_SEP {
            serializer.serialize_str(&self.pattern)
        } else {
            let mut seq = serializer.serialize_seq(Some(3))?;
            seq.serialize_element(&self.pattern)?;
            seq.serialize_element(&self.flags)?;
            seq.serialize_element(&self.sep)?;
            seq.end()
        }
    }
}

/// One declarative mapping instruction. The wire schema is a flat object
/// requiring `dest` plus exactly one of `value`, `fnc` or `src`; the variants
/// are mutually exclusive and violations are rejected at deserialize time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawRule")]
pub enum TransformRule {
    Literal {
        dest: String,
        value: Value,
    },
    Call {
        dest: String,
        fnc: String,
        params: Map<String, Value>,
    },
    Query {
        dest: String,
        src: Vec<String>,
        fetcher: Fetcher,
        sep: String,
        matcher: Option<MatchSpec>,
    },
}

impl TransformRule {
    pub fn dest(&self) -> &str {
        match self {
            TransformRule::Literal { dest, .. } => dest,
            TransformRule::Call { dest, .. } => dest,
            TransformRule::Query { dest, .. } => dest,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    dest: String,
    value: Option<Value>,
    fnc: Option<String>,
    params: Option<Map<String, Value>>,
    src: Option<OneOrMany>,
    fetcher: Option<Fetcher>,
    sep: Option<String>,
    #[serde(rename = "match")]
    matcher: Option<MatchSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<RawRule> for TransformRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        if raw.dest.is_empty() {
            return Err("rule dest must not be empty".to_string());
        }
        let selectors =
            raw.value.is_some() as u8 + raw.fnc.is_some() as u8 + raw.src.is_some() as u8;
        if selectors != 1 {
            return Err(format!(
                "rule for {:?} must set exactly one of value, fnc or src",
                raw.dest
            ));
        }

        if let Some(value) = raw.value {
            reject_extras(&raw.dest, "value", raw.params.is_some(), raw.fetcher, &raw.sep, &raw.matcher)?;
            return Ok(TransformRule::Literal { dest: raw.dest, value });
        }

        if let Some(fnc) = raw.fnc {
            reject_extras(&raw.dest, "fnc", false, raw.fetcher, &raw.sep, &raw.matcher)?;
            return Ok(TransformRule::Call {
                dest: raw.dest,
                fnc,
                params: raw.params.unwrap_or_default(),
            });
        }

        let src = match raw.src.expect("selector count checked above") {
            OneOrMany::One(query) => vec![query],
            OneOrMany::Many(queries) => queries,
        };
        if src.is_empty() {
            return Err(format!("rule for {:?} has an empty src list", raw.dest));
        }
        if raw.params.is_some() {
            return Err(format!("rule for {:?}: params is only valid with fnc", raw.dest));
        }
        Ok(TransformRule::Query {
            dest: raw.dest,
            src,
            fetcher: raw.fetcher.unwrap_or_default(),
            sep: raw.sep.unwrap_or_else(|| DEFAULT_SEP.to_string()),
            matcher: raw.matcher,
        })
    }
}

fn reject_extras(
    dest: &str,
    kind: &str,
    params: bool,
    fetcher: Option<Fetcher>,
    sep: &Option<String>,
    matcher: &Option<MatchSpec>,
) -> Result<(), String> {
    if params {
        return Err(format!("rule for {dest:?}: params is only valid with fnc"));
    }
    if fetcher.is_some() || sep.is_some() || matcher.is_some() {
        return Err(format!(
            "rule for {dest:?}: fetcher, sep and match are only valid with src, not {kind}"
        ));
    }
    Ok(())
}

impl Serialize for TransformRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TransformRule::Literal { dest, value } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("dest", dest)?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            TransformRule::Call { dest, fnc, params } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("dest", dest)?;
                map.serialize_entry("fnc", fnc)?;
                if !params.is_empty() {
                    map.serialize_entry("params", params)?;
                }
                map.end()
            }
            TransformRule::Query {
                dest,
                src,
                fetcher,
                sep,
                matcher,
            } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("dest", dest)?;
                if src.len() == 1 {
                    map.serialize_entry("src", &src[0])?;
                } else {
                    map.serialize_entry("src", src)?;
                }
                if *fetcher != Fetcher::First {
                    map.serialize_entry("fetcher", fetcher)?;
                }
                if sep != DEFAULT_SEP {
                    map.serialize_entry("sep", sep)?;
                }
                if let Some(matcher) = matcher {
                    map.serialize_entry("match", matcher)?;
                }
                map.end()
            }
        }
    }
}
