use std::fmt::Display;
use serde_json::{Map, Value};
use crate::core::error::RenderError;
use super::{ArtifactKind, TemplateRenderer};

/// Renders the stock broker.xml, bootstrap.xml and logging.properties
/// layouts from the assembled data mappings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateRenderer for BuiltinTemplates {
    fn render(&self, kind: ArtifactKind, data: &Value) -> Result<String, RenderError> {
        let data = Fields::of(data, "template data")?;
        match kind {
            ArtifactKind::Broker => broker_xml(&data),
            ArtifactKind::Bootstrap => bootstrap_xml(&data),
            ArtifactKind::Logging => logging_properties(&data),
        }
    }
}

const CONSOLE_HANDLER: &[&str] = &[
    "handler.CONSOLE=org.jboss.logmanager.handlers.ConsoleHandler",
    "handler.CONSOLE.properties=autoFlush",
    "handler.CONSOLE.level=DEBUG",
    "handler.CONSOLE.autoFlush=true",
    "handler.CONSOLE.formatter=PATTERN",
];

const FILE_HANDLER: &[&str] = &[
    "handler.FILE=org.jboss.logmanager.handlers.PeriodicRotatingFileHandler",
    "handler.FILE.level=DEBUG",
    "handler.FILE.properties=suffix,append,autoFlush,fileName",
    "handler.FILE.suffix=.yyyy-MM-dd",
    "handler.FILE.append=true",
    "handler.FILE.autoFlush=true",
    "handler.FILE.fileName=${artemis.instance}/log/artemis.log",
    "handler.FILE.formatter=PATTERN",
];

const PATTERN_FORMATTER: &[&str] = &[
    "formatter.PATTERN=org.jboss.logmanager.formatters.PatternFormatter",
    "formatter.PATTERN.properties=pattern",
    "formatter.PATTERN.pattern=%d %-5p [%c] %s%E%n",
];

fn broker_xml(data: &Fields<'_>) -> Result<String, RenderError> {
    let mut doc = Doc::default();
    doc.line(0, "<?xml version='1.0'?>");
    doc.line(
        0,
        "<configuration xmlns=\"urn:activemq\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xsi:schemaLocation=\"urn:activemq /schema/artemis-configuration.xsd\">",
    );
    doc.line(1, "<core xmlns=\"urn:activemq:core\">");
    doc.element(2, "name", data.text("name")?);
    doc.element(2, "persistence-enabled", true);
    doc.element(2, "journal-type", data.text("journal_type")?);
    doc.element(2, "paging-directory", "data/paging");
    doc.element(2, "bindings-directory", "data/bindings");
    doc.element(2, "journal-directory", "data/journal");
    doc.element(2, "large-messages-directory", "data/large-messages");
    doc.element(2, "journal-datasync", data.flag("journal_datasync")?);
    doc.element(2, "journal-min-files", 2);
    doc.element(2, "journal-pool-files", 10);
    doc.element(2, "journal-buffer-timeout", data.text("journal_buffer_timeout")?);
    doc.element(2, "journal-max-io", data.text("journal_max_io")?);
    doc.element(2, "max-disk-usage", data.text("max_disk_usage")?);
    if let Some(size) = data.opt_text("global_max_size")? {
        doc.element(2, "global-max-size", size);
    }

    let connectors = data.entries("connectors")?;
    if !connectors.is_empty() {
        doc.line(2, "<connectors>");
        for (name, connector) in &connectors {
            let url = format!("tcp://{}:{}", connector.text("host")?, connector.text("port")?);
            doc.line(
                3,
                format!("<connector name=\"{}\">{}</connector>", escape(name), escape(&url)),
            );
        }
        doc.line(2, "</connectors>");
    }

    let default_bind = data.text("bind")?;
    doc.line(2, "<acceptors>");
    for (name, acceptor) in data.entries("acceptors")? {
        let host = acceptor.opt_text("bind")?.unwrap_or_else(|| default_bind.clone());
        let mut url = format!(
            "tcp://{host}:{}?protocols={}",
            acceptor.text("port")?,
            acceptor.text("protocols_list")?
        );
        let settings = acceptor.text("settings_list")?;
        if !settings.is_empty() {
            url.push(';');
            url.push_str(&settings);
        }
        doc.line(
            3,
            format!("<acceptor name=\"{}\">{}</acceptor>", escape(name), escape(&url)),
        );
    }
    doc.line(2, "</acceptors>");

    ha_policy(&mut doc, data)?;

    doc.element(2, "cluster-user", data.text("cluster_user")?);
    doc.element(2, "cluster-password", data.text("cluster_password")?);

    let broadcast_groups = data.entries("broadcast_groups")?;
    if !broadcast_groups.is_empty() {
        doc.line(2, "<broadcast-groups>");
        for (name, group) in &broadcast_groups {
            doc.line(3, format!("<broadcast-group name=\"{}\">", escape(name)));
            doc.element(4, "group-address", group.text("group_address")?);
            doc.element(4, "group-port", group.text("group_port")?);
            doc.element(4, "broadcast-period", group.text("broadcast_period")?);
            for connector in group.strings("connectors")? {
                doc.element(4, "connector-ref", connector);
            }
            doc.line(3, "</broadcast-group>");
        }
        doc.line(2, "</broadcast-groups>");
    }

    let discovery_groups = data.entries("discovery_groups")?;
    if !discovery_groups.is_empty() {
        doc.line(2, "<discovery-groups>");
        for (name, group) in &discovery_groups {
            doc.line(3, format!("<discovery-group name=\"{}\">", escape(name)));
            doc.element(4, "group-address", group.text("group_address")?);
            doc.element(4, "group-port", group.text("group_port")?);
            doc.element(4, "refresh-timeout", group.text("refresh_timeout")?);
            doc.line(3, "</discovery-group>");
        }
        doc.line(2, "</discovery-groups>");
    }

    if let Some(connector) = data.opt_text("cluster_connector")? {
        doc.line(2, "<cluster-connections>");
        doc.line(
            3,
            format!(
                "<cluster-connection name=\"{}\">",
                escape(&data.text("cluster_name")?)
            ),
        );
        doc.element(4, "connector-ref", connector);
        doc.element(4, "message-load-balancing", data.text("message_load_balancing")?);
        doc.element(4, "max-hops", data.text("max_hops")?);
        if let Some((group, _)) = discovery_groups.first() {
            doc.line(
                4,
                format!("<discovery-group-ref discovery-group-name=\"{}\"/>", escape(group)),
            );
        }
        doc.line(3, "</cluster-connection>");
        doc.line(2, "</cluster-connections>");
    }

    doc.line(2, "<address-settings>");
    for (pattern, settings) in data.entries("address_settings")? {
        doc.line(3, format!("<address-setting match=\"{}\">", escape(pattern)));
        for (key, value) in settings.0 {
            if !is_element_name(key) {
                return Err(RenderError(format!(
                    "address setting '{key}' for '{pattern}' is not a valid element name"
                )));
            }
            let value = scalar(value).ok_or_else(|| {
                RenderError(format!("address setting '{key}' for '{pattern}' must be a scalar"))
            })?;
            doc.element(4, key, value);
        }
        doc.line(3, "</address-setting>");
    }
    doc.line(2, "</address-settings>");

    doc.line(2, "<addresses>");
    for (name, address) in data.entries("addresses")? {
        let routing = address.text("routing")?;
        let mut queues = address.strings("queues")?;
        if queues.is_empty() {
            queues.push(name.to_string());
        }
        doc.line(3, format!("<address name=\"{}\">", escape(name)));
        doc.line(4, format!("<{routing}>"));
        for queue in queues {
            doc.line(5, format!("<queue name=\"{}\"/>", escape(&queue)));
        }
        doc.line(4, format!("</{routing}>"));
        doc.line(3, "</address>");
    }
    doc.line(2, "</addresses>");

    let plugins = data.entries("plugins")?;
    if !plugins.is_empty() {
        doc.line(2, "<broker-plugins>");
        for (_, plugin) in &plugins {
            doc.line(
                3,
                format!(
                    "<broker-plugin class-name=\"{}\">",
                    escape(&plugin.text("class_name")?)
                ),
            );
            for (key, value) in Fields::of(plugin.get("properties")?, "plugin properties")?.0 {
                let value = scalar(value).unwrap_or_default();
                doc.line(
                    4,
                    format!(
                        "<property key=\"{}\" value=\"{}\"/>",
                        escape(key),
                        escape(&value)
                    ),
                );
            }
            doc.line(3, "</broker-plugin>");
        }
        doc.line(2, "</broker-plugins>");
    }

    doc.line(1, "</core>");
    doc.line(0, "</configuration>");
    Ok(doc.finish())
}

fn ha_policy(doc: &mut Doc, data: &Fields<'_>) -> Result<(), RenderError> {
    let role = data.text("role")?;
    if role != "master" && role != "slave" {
        return Err(RenderError(format!("unknown role '{role}'")));
    }
    let sync_timeout = data.text("replication_timeout")?;

    doc.line(2, "<ha-policy>");
    match data.text("ha_policy")?.as_str() {
        "live-only" => doc.line(3, "<live-only/>"),
        "replication" => {
            doc.line(3, "<replication>");
            doc.line(4, format!("<{role}>"));
            if role == "master" {
                doc.element(5, "check-for-live-server", data.flag("check_for_live_server")?);
            } else {
                doc.element(5, "allow-failback", data.flag("allow_failback")?);
            }
            doc.element(5, "initial-replication-sync-timeout", &sync_timeout);
            doc.line(4, format!("</{role}>"));
            doc.line(3, "</replication>");
        }
        "shared-storage" => {
            doc.line(3, "<shared-store>");
            doc.line(4, format!("<{role}>"));
            if role == "slave" {
                doc.element(5, "allow-failback", data.flag("allow_failback")?);
            }
            doc.element(5, "failover-on-shutdown", data.flag("failover_on_shutdown")?);
            doc.line(4, format!("</{role}>"));
            doc.line(3, "</shared-store>");
        }
        other => return Err(RenderError(format!("unknown ha policy '{other}'"))),
    }
    doc.line(2, "</ha-policy>");
    Ok(())
}

fn bootstrap_xml(data: &Fields<'_>) -> Result<String, RenderError> {
    let web = format!("http://{}:{}", data.text("web_bind")?, data.text("web_port")?);
    let mut doc = Doc::default();
    doc.line(0, "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>");
    doc.line(0, "<broker xmlns=\"http://activemq.org/schema\">");
    doc.line(1, "<jaas-security domain=\"activemq\"/>");
    doc.line(
        1,
        format!(
            "<server configuration=\"file:{}\"/>",
            escape(&data.text("broker_config")?)
        ),
    );
    doc.line(1, format!("<web bind=\"{}\" path=\"web\">", escape(&web)));
    doc.line(2, "<app url=\"activemq-branding\" war=\"activemq-branding.war\"/>");
    doc.line(2, "<app url=\"artemis-plugin\" war=\"artemis-plugin.war\"/>");
    doc.line(2, "<app url=\"console\" war=\"console.war\"/>");
    doc.line(1, "</web>");
    doc.line(0, "</broker>");
    Ok(doc.finish())
}

fn logging_properties(data: &Fields<'_>) -> Result<String, RenderError> {
    let levels = Fields::of(data.get("log_levels")?, "log_levels")?;
    let root = levels.opt_text("root")?.unwrap_or_else(|| "INFO".to_string());
    let mut loggers = Vec::new();
    for (logger, level) in levels.0 {
        if logger == "root" {
            continue;
        }
        let level = scalar(level)
            .ok_or_else(|| RenderError(format!("level of logger '{logger}' must be a string")))?;
        loggers.push((logger.as_str(), level));
    }

    let mut doc = Doc::default();
    doc.line(0, "# Managed by artemis-provisioner. Local edits are overwritten.");
    let names: Vec<&str> = loggers.iter().map(|(name, _)| *name).collect();
    doc.line(0, format!("loggers={}", names.join(",")));
    doc.line(0, format!("logger.level={root}"));
    for (name, level) in &loggers {
        doc.line(0, format!("logger.{name}.level={level}"));
    }
    doc.line(0, "logger.handlers=FILE,CONSOLE");
    for line in CONSOLE_HANDLER.iter().chain(FILE_HANDLER).chain(PATTERN_FORMATTER) {
        doc.line(0, line);
    }
    Ok(doc.finish())
}

/// Typed lookups into one level of template data.
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn of(value: &'a Value, what: &str) -> Result<Self, RenderError> {
        value
            .as_object()
            .map(Fields)
            .ok_or_else(|| RenderError(format!("{what} must be a mapping")))
    }

    fn get(&self, key: &str) -> Result<&'a Value, RenderError> {
        self.0
            .get(key)
            .ok_or_else(|| RenderError(format!("missing key '{key}'")))
    }

    fn text(&self, key: &str) -> Result<String, RenderError> {
        scalar(self.get(key)?).ok_or_else(|| RenderError(format!("key '{key}' must be a scalar")))
    }

    fn opt_text(&self, key: &str) -> Result<Option<String>, RenderError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => scalar(value)
                .map(Some)
                .ok_or_else(|| RenderError(format!("key '{key}' must be a scalar"))),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, RenderError> {
        self.get(key)?
            .as_bool()
            .ok_or_else(|| RenderError(format!("key '{key}' must be a boolean")))
    }

    fn strings(&self, key: &str) -> Result<Vec<String>, RenderError> {
        let items = self
            .get(key)?
            .as_array()
            .ok_or_else(|| RenderError(format!("key '{key}' must be a list")))?;
        items
            .iter()
            .map(|item| {
                scalar(item).ok_or_else(|| RenderError(format!("items of '{key}' must be scalars")))
            })
            .collect()
    }

    fn entries(&self, key: &str) -> Result<Vec<(&'a str, Fields<'a>)>, RenderError> {
        Fields::of(self.get(key)?, key)?
            .0
            .iter()
            .map(|(name, value)| Fields::of(value, name).map(|fields| (name.as_str(), fields)))
            .collect()
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_element_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Default)]
struct Doc {
    out: String,
}

impl Doc {
    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        for _ in 0..depth {
            self.out.push_str("   ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn element(&mut self, depth: usize, tag: &str, value: impl Display) {
        self.line(depth, format!("<{tag}>{}</{tag}>", escape(&value.to_string())));
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn element_names_are_checked() {
        assert!(is_element_name("dead-letter-address"));
        assert!(!is_element_name("bad tag"));
        assert!(!is_element_name("-x"));
    }

    #[test]
    fn missing_key_is_a_render_error() {
        let err = BuiltinTemplates
            .render(ArtifactKind::Bootstrap, &json!({ "web_bind": "localhost" }))
            .unwrap_err();
        assert!(err.to_string().contains("web_port"));
    }

    #[test]
    fn logging_puts_root_level_first() {
        let text = BuiltinTemplates
            .render(
                ArtifactKind::Logging,
                &json!({ "log_levels": { "root": "WARN", "org.example": "DEBUG" } }),
            )
            .unwrap();
        assert!(text.contains("loggers=org.example\n"));
        assert!(text.contains("logger.level=WARN\n"));
        assert!(text.contains("logger.org.example.level=DEBUG\n"));
    }
}
