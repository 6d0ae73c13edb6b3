use serde_json::Value;

/// Key part of a `key=value` setting. An entry without `=` is its own key.
fn setting_key(entry: &str) -> &str {
    entry
        .split_once('=')
        .map_or(entry, |(key, _)| key)
        .trim()
}

/// Right-biased merge: entries of `specific` replace same-keyed entries of
/// `generic` in place, unknown keys are appended in their given order.
pub(crate) fn merge_settings(
    generic: Option<Vec<String>>,
    specific: Option<Vec<String>>,
) -> Vec<String> {
    match (generic, specific) {
        (None, None) => Vec::new(),
        (Some(generic), None) => generic,
        (None, Some(specific)) => specific,
        (Some(mut merged), Some(specific)) => {
            for entry in specific {
                let key = setting_key(&entry).to_string();
                match merged.iter().position(|e| setting_key(e) == key) {
                    Some(idx) => merged[idx] = entry,
                    None => merged.push(entry),
                }
            }
            merged
        }
    }
}

/// Reads a list of strings, or `None` if the value has any other shape.
pub(crate) fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
