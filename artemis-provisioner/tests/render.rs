use artemis_provisioner::core::render::{
    assemble, ArtifactKind, BuiltinTemplates, InstanceLayout, RenderInputs, TemplateRenderer,
};
use artemis_spec::{
    normalize_acceptors, normalize_plugins, BroadcastGroup, Connector, DiscoveryGroup, HaPolicy,
    InstanceSpec, JournalType, RawMap, Role,
};
use serde_json::json;

fn render(spec: &InstanceSpec, kind: ArtifactKind) -> String {
    let acceptors = normalize_acceptors(&spec.acceptors).unwrap();
    let plugins = normalize_plugins(&spec.plugins).unwrap();
    let layout = InstanceLayout::new(format!("/var/lib/artemis/{}", spec.name));
    let inputs = RenderInputs {
        spec,
        acceptors: &acceptors,
        plugins: &plugins,
        layout: &layout,
    };
    BuiltinTemplates
        .render(kind, &assemble(kind, inputs))
        .expect("renders")
}

fn raw(value: serde_json::Value) -> RawMap {
    value.as_object().cloned().unwrap()
}

#[test]
fn acceptor_url_carries_protocols_and_settings() {
    let mut spec = InstanceSpec::named("primary");
    spec.acceptors = raw(json!({
        "amqp": {
            "port": 5672,
            "protocols": ["openwire", "amqp"],
            "settings": ["a=1"],
            "acceptor_settings": ["b=2"]
        },
        "local": { "port": 61617, "protocols": ["core"], "bind": "127.0.0.1" }
    }));

    let xml = render(&spec, ArtifactKind::Broker);

    assert!(xml.contains(
        "<acceptor name=\"amqp\">tcp://0.0.0.0:5672?protocols=OPENWIRE,AMQP;a=1;b=2</acceptor>"
    ));
    assert!(xml.contains("<acceptor name=\"local\">tcp://127.0.0.1:61617?protocols=CORE</acceptor>"));
}

#[test]
fn journal_and_balancing_are_upper_cased() {
    let mut spec = InstanceSpec::named("primary");
    spec.journal_type = JournalType::Mapped;

    let xml = render(&spec, ArtifactKind::Broker);

    assert!(xml.contains("<journal-type>MAPPED</journal-type>"));
    assert!(xml.contains("<max-disk-usage>90</max-disk-usage>"));
    assert!(!xml.contains("<global-max-size>"));
    assert!(xml.contains("<ha-policy>\n         <live-only/>"));
}

#[test]
fn only_enabled_plugins_are_rendered() {
    let mut spec = InstanceSpec::named("primary");
    spec.plugins = raw(json!({
        "logging": {
            "enable": true,
            "class_name": "org.apache.activemq.artemis.core.server.plugin.impl.LoggingActiveMQServerPlugin",
            "properties": { "LOG_ALL_EVENTS": true }
        },
        "audit": { "enable": false, "class_name": "com.example.Audit" }
    }));

    let xml = render(&spec, ArtifactKind::Broker);

    assert!(xml.contains("LoggingActiveMQServerPlugin"));
    assert!(xml.contains("<property key=\"LOG_ALL_EVENTS\" value=\"true\"/>"));
    assert!(!xml.contains("com.example.Audit"));
}

#[test]
fn replicated_slave_with_cluster_connection() {
    let mut spec = InstanceSpec::named("backup");
    spec.ha_policy = HaPolicy::Replication;
    spec.role = Role::Slave;
    spec.connectors.insert(
        "netty".into(),
        Connector {
            host: "10.0.0.2".into(),
            port: 61616,
        },
    );
    spec.broadcast_groups.insert(
        "bg".into(),
        BroadcastGroup {
            group_address: "231.7.7.7".into(),
            group_port: 9876,
            broadcast_period: 5000,
            connectors: vec!["netty".into()],
        },
    );
    spec.discovery_groups.insert(
        "dg".into(),
        DiscoveryGroup {
            group_address: "231.7.7.7".into(),
            group_port: 9876,
            refresh_timeout: 10000,
        },
    );

    let xml = render(&spec, ArtifactKind::Broker);

    assert!(xml.contains("<connector name=\"netty\">tcp://10.0.0.2:61616</connector>"));
    assert!(xml.contains("<replication>"));
    assert!(xml.contains("<slave>"));
    assert!(xml.contains("<allow-failback>true</allow-failback>"));
    assert!(xml.contains("<broadcast-period>5000</broadcast-period>"));
    assert!(xml.contains("<cluster-connection name=\"artemis-cluster\">"));
    assert!(xml.contains("<message-load-balancing>ON_DEMAND</message-load-balancing>"));
    assert!(xml.contains("<discovery-group-ref discovery-group-name=\"dg\"/>"));
}

#[test]
fn addresses_and_settings_are_rendered() {
    let spec = InstanceSpec::named("primary");
    let xml = render(&spec, ArtifactKind::Broker);

    assert!(xml.contains("<address-setting match=\"#\">"));
    assert!(xml.contains("<dead-letter-address>DLQ</dead-letter-address>"));
    assert!(xml.contains("<address name=\"DLQ\">"));
    assert!(xml.contains("<queue name=\"ExpiryQueue\"/>"));
}

#[test]
fn bootstrap_points_at_broker_config_and_web_port() {
    let mut spec = InstanceSpec::named("primary");
    spec.web_bind = "0.0.0.0".into();
    spec.web_port = 8443;

    let xml = render(&spec, ArtifactKind::Bootstrap);

    assert!(xml.contains("<server configuration=\"file:/var/lib/artemis/primary/etc/broker.xml\"/>"));
    assert!(xml.contains("<web bind=\"http://0.0.0.0:8443\" path=\"web\">"));
}

#[test]
fn logging_lists_configured_loggers() {
    let spec = InstanceSpec::named("primary");
    let text = render(&spec, ArtifactKind::Logging);

    assert!(text.contains("logger.level=INFO\n"));
    assert!(text.contains("logger.org.eclipse.jetty.level=WARN\n"));
    assert!(text.contains("logger.handlers=FILE,CONSOLE\n"));
}

#[test]
fn rendering_is_deterministic() {
    let spec = InstanceSpec::named("primary");
    for kind in ArtifactKind::ALL {
        assert_eq!(render(&spec, kind), render(&spec, kind));
    }
}
