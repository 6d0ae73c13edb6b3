use crate::errors::ConfigError;
use crate::utils::{merge_settings, string_list};
use crate::RawMap;
use serde_json::Value;

/// Sub-keys an acceptor entry may carry.
const ACCEPTOR_KEYS: [&str; 5] = ["port", "protocols", "settings", "acceptor_settings", "bind"];

/// A validated acceptor: the keys it was declared with plus the derived
/// `protocols_list`, `settings` and `settings_list` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptorEntry {
    pub name: String,
    pub port: u16,
    /// Listener host override; the instance `bind` applies when absent.
    pub bind: Option<String>,
    /// Upper-cased protocol names.
    pub protocols: Vec<String>,
    /// `protocols` joined with `,`.
    pub protocols_list: String,
    /// Generic settings merged with acceptor-specific ones.
    pub settings: Vec<String>,
    /// `settings` joined with `;`.
    pub settings_list: String,
    original: RawMap,
}

impl AcceptorEntry {
    /// Keys exactly as they were supplied.
    pub fn original(&self) -> &RawMap {
        &self.original
    }

    /// The entry as a mapping: original keys, normalized protocols and the
    /// three derived fields.
    pub fn to_value(&self) -> Value {
        let mut fields = self.original.clone();
        fields.insert("port".into(), Value::from(self.port));
        fields.insert("protocols".into(), Value::from(self.protocols.clone()));
        fields.insert("protocols_list".into(), Value::from(self.protocols_list.clone()));
        fields.insert("settings".into(), Value::from(self.settings.clone()));
        fields.insert("settings_list".into(), Value::from(self.settings_list.clone()));
        Value::Object(fields)
    }
}

/// Normalized acceptors in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptorMap(Vec<AcceptorEntry>);

impl AcceptorMap {
    pub fn get(&self, name: &str) -> Option<&AcceptorEntry> {
        self.0.iter().find(|entry| entry.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AcceptorEntry> {
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

/// Validates every acceptor and derives its rendering fields. Fails on the
/// first malformed entry; nothing is returned for a partially valid map.
pub fn normalize_acceptors(raw: &RawMap) -> Result<AcceptorMap, ConfigError> {
    raw.iter()
        .map(|(name, value)| normalize_acceptor(name, value))
        .collect::<Result<Vec<_>, _>>()
        .map(AcceptorMap)
}

fn normalize_acceptor(name: &str, value: &Value) -> Result<AcceptorEntry, ConfigError> {
    let fields = value
        .as_object()
        .ok_or_else(|| invalid(name, "expected a nested mapping"))?;

    if let Some(key) = fields.keys().find(|k| !ACCEPTOR_KEYS.contains(&k.as_str())) {
        return Err(invalid(name, format!("unrecognized key '{key}'")));
    }

    let port = fields.get("port").ok_or_else(|| missing(name, "port"))?;
    let port = parse_port(port)
        .ok_or_else(|| invalid(name, format!("port must be in 1..=65535, got {port}")))?;

    let protocols = fields
        .get("protocols")
        .ok_or_else(|| missing(name, "protocols"))?;
    let protocols: Vec<String> = string_list(protocols)
        .ok_or_else(|| invalid(name, "'protocols' must be a list of strings"))?
        .iter()
        .map(|protocol| protocol.trim().to_uppercase())
        .collect();
    if protocols.is_empty() {
        return Err(invalid(name, "'protocols' must not be empty"));
    }

    let generic = optional_list(name, fields.get("settings"), "settings")?;
    let specific = optional_list(name, fields.get("acceptor_settings"), "acceptor_settings")?;
    let settings = merge_settings(generic, specific);

    let bind = match fields.get("bind") {
        None => None,
        Some(Value::String(host)) if !host.is_empty() => Some(host.clone()),
        Some(_) => return Err(invalid(name, "'bind' must be a non-empty string")),
    };

    Ok(AcceptorEntry {
        name: name.to_string(),
        port,
        bind,
        protocols_list: protocols.join(","),
        protocols,
        settings_list: settings.join(";"),
        settings,
        original: fields.clone(),
    })
}

fn parse_port(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    }?;
    (port != 0).then_some(port)
}

fn optional_list(
    acceptor: &str,
    value: Option<&Value>,
    field: &str,
) -> Result<Option<Vec<String>>, ConfigError> {
    value
        .map(|v| {
            string_list(v)
                .ok_or_else(|| invalid(acceptor, format!("'{field}' must be a list of strings")))
        })
        .transpose()
}

fn invalid(acceptor: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidAcceptorConfig {
        acceptor: acceptor.to_string(),
        reason: reason.into(),
    }
}

fn missing(acceptor: &str, field: &'static str) -> ConfigError {
    ConfigError::MissingRequiredField {
        acceptor: acceptor.to_string(),
        field,
    }
}
