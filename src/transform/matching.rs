use regex::RegexBuilder;

use super::rule::MatchSpec;

/// Apply a match spec to a candidate value.
///
/// An invalid pattern or a non-matching one returns the value unchanged. A
/// match returns the captured groups joined with the spec separator, which is
/// the empty string when the pattern captures nothing; callers treat an empty
/// result as "no value produced".
pub fn process_match(spec: &MatchSpec, value: &str) -> String {
    let mut builder = RegexBuilder::new(&spec.pattern);
    for letter in spec.flags.chars() {
        match letter {
            'I' | 'i' => {
                builder.case_insensitive(true);
            }
            'S' | 's' => {
                builder.dot_matches_new_line(true);
            }
            'M' | 'm' => {
                builder.multi_line(true);
            }
            'X' | 'x' => {
                builder.ignore_whitespace(true);
            }
            other => {
                tracing::error!(
                    "unknown regex flag {other:?} for match pattern {:?}",
                    spec.pattern
                );
            }
        }
    }

    let regex = match builder.build() {
        Ok(regex) => regex,
        Err(err) => {
            tracing::error!("invalid match pattern {:?}: {err}", spec.pattern);
            return value.to_string();
        }
    };

    let Some(caps) = regex.captures(value) else {
        return value.to_string();
    };

    let groups: Vec<&str> = caps
        .iter()
        .skip(1)
        .map(|group| group.map(|m| m.as_str()).unwrap_or(""))
        .collect();
    groups.join(&spec.sep)
}
