use std::collections::HashMap;

use serde_json::{Map, Value};

/// A registered rule function. Invoked as `f(dest, params, input, output)`;
/// the function mutates the output mapping in place.
pub type RuleFn = fn(
    dest: &str,
    params: &Map<String, Value>,
    input: &Map<String, Value>,
    output: &mut Map<String, Value>,
) -> Result<(), String>;

/// Statically registered rule functions, resolved by name at config-validation
/// time instead of runtime dotted-path imports.
pub struct FnRegistry {
    entries: HashMap<String, RuleFn>,
}

impl FnRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in rule functions.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("drop_duplicate", drop_duplicate);
        registry
    }

    pub fn register(&mut self, name: &str, function: RuleFn) {
        self.entries.insert(name.to_string(), function);
    }

    pub fn get(&self, name: &str) -> Option<RuleFn> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl Default for FnRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Remove `dest` from the output when all the input fields named in
/// `params.fields` hold the same value. Paired with an earlier literal or
/// query write, this suppresses redundant destination keys.
fn drop_duplicate(
    dest: &str,
    params: &Map<String, Value>,
    input: &Map<String, Value>,
    output: &mut Map<String, Value>,
) -> Result<(), String> {
    let fields = params
        .get("fields")
        .and_then(Value::as_array)
        .ok_or("params.fields must be an array of field names")?;

    let mut values = Vec::with_capacity(fields.len());
    for name in fields {
        let name = name
            .as_str()
            .ok_or("params.fields entries must be strings")?;
        values.push(input.get(name).cloned().unwrap_or(Value::Null));
    }

    if values.len() > 1 && values.windows(2).all(|pair| pair[0] == pair[1]) {
        output.remove(dest);
    }
    Ok(())
}
