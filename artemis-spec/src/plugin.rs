use crate::errors::ConfigError;
use crate::RawMap;
use serde_json::Value;

const PLUGIN_KEYS: [&str; 3] = ["enable", "class_name", "properties"];

/// An enabled broker plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginEntry {
    pub name: String,
    /// Fully-qualified plugin class. Defaults to the entry name.
    pub class_name: String,
    /// Plugin init properties, values stringified.
    pub properties: Vec<(String, String)>,
    original: RawMap,
}

impl PluginEntry {
    pub fn original(&self) -> &RawMap {
        &self.original
    }

    pub fn to_value(&self) -> Value {
        let mut fields = self.original.clone();
        fields.insert("class_name".into(), Value::from(self.class_name.clone()));
        fields.insert(
            "properties".into(),
            Value::Object(
                self.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                    .collect(),
            ),
        );
        Value::Object(fields)
    }
}

/// Enabled plugins only, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginMap(Vec<PluginEntry>);

impl PluginMap {
    pub fn get(&self, name: &str) -> Option<&PluginEntry> {
        self.0.iter().find(|entry| entry.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginEntry> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|entry| (entry.name.clone(), entry.to_value()))
                .collect(),
        )
    }
}

/// Validates the plugin map and keeps only entries with `enable = true`.
/// A missing or non-boolean `enable` fails the whole map.
pub fn normalize_plugins(raw: &RawMap) -> Result<PluginMap, ConfigError> {
    let mut enabled = Vec::new();
    for (name, value) in raw {
        if let Some(entry) = normalize_plugin(name, value)? {
            enabled.push(entry);
        }
    }
    Ok(PluginMap(enabled))
}

fn normalize_plugin(name: &str, value: &Value) -> Result<Option<PluginEntry>, ConfigError> {
    let fields = value
        .as_object()
        .ok_or_else(|| invalid(name, "expected a nested mapping"))?;

    if let Some(key) = fields.keys().find(|k| !PLUGIN_KEYS.contains(&k.as_str())) {
        return Err(invalid(name, format!("unrecognized key '{key}'")));
    }

    let enable = fields
        .get("enable")
        .and_then(Value::as_bool)
        .ok_or_else(|| ConfigError::MissingEnableFlag {
            plugin: name.to_string(),
        })?;
    if !enable {
        return Ok(None);
    }

    let class_name = match fields.get("class_name") {
        None => name.to_string(),
        Some(Value::String(class)) if !class.is_empty() => class.clone(),
        Some(_) => return Err(invalid(name, "'class_name' must be a non-empty string")),
    };

    let properties = match fields.get("properties") {
        None => Vec::new(),
        Some(Value::Object(props)) => props
            .iter()
            .map(|(key, value)| {
                scalar_to_string(value)
                    .map(|v| (key.clone(), v))
                    .ok_or_else(|| invalid(name, format!("property '{key}' must be a scalar")))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(invalid(name, "'properties' must be a mapping")),
    };

    Ok(Some(PluginEntry {
        name: name.to_string(),
        class_name,
        properties,
        original: fields.clone(),
    }))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn invalid(plugin: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidPluginConfig {
        plugin: plugin.to_string(),
        reason: reason.into(),
    }
}
