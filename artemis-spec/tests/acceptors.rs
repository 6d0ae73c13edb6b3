use artemis_spec::{normalize_acceptors, ConfigError, RawMap};
use serde_json::json;

fn raw(value: serde_json::Value) -> RawMap {
    value.as_object().cloned().expect("test input must be an object")
}

#[test]
fn protocols_are_upper_cased_and_joined() {
    let acceptors = normalize_acceptors(&raw(json!({
        "artemis": { "port": 61616, "protocols": ["openwire", "amqp"] }
    })))
    .expect("valid acceptor");

    let entry = acceptors.get("artemis").unwrap();
    assert_eq!(entry.protocols, vec!["OPENWIRE", "AMQP"]);
    assert_eq!(entry.protocols_list, "OPENWIRE,AMQP");
    assert_eq!(entry.port, 61616);
}

#[test]
fn settings_merge_appends_specific_after_generic() {
    let acceptors = normalize_acceptors(&raw(json!({
        "amqp": {
            "port": 5672,
            "protocols": ["amqp"],
            "settings": ["a=1"],
            "acceptor_settings": ["b=2"]
        }
    })))
    .unwrap();

    let entry = acceptors.get("amqp").unwrap();
    assert_eq!(entry.settings, vec!["a=1", "b=2"]);
    assert_eq!(entry.settings_list, "a=1;b=2");
}

#[test]
fn acceptor_settings_override_generic_key() {
    let acceptors = normalize_acceptors(&raw(json!({
        "amqp": {
            "port": 5672,
            "protocols": ["amqp"],
            "settings": ["tcpSendBufferSize=1048576", "useEpoll=true"],
            "acceptor_settings": ["tcpSendBufferSize=65536"]
        }
    })))
    .unwrap();

    assert_eq!(
        acceptors.get("amqp").unwrap().settings_list,
        "tcpSendBufferSize=65536;useEpoll=true"
    );
}

#[test]
fn settings_default_to_empty() {
    let acceptors = normalize_acceptors(&raw(json!({
        "mqtt": { "port": 1883, "protocols": ["mqtt"] }
    })))
    .unwrap();

    let entry = acceptors.get("mqtt").unwrap();
    assert!(entry.settings.is_empty());
    assert_eq!(entry.settings_list, "");
}

#[test]
fn missing_port_names_acceptor_and_field() {
    let err = normalize_acceptors(&raw(json!({
        "ok": { "port": 61616, "protocols": ["core"] },
        "broken": { "protocols": ["core"] }
    })))
    .unwrap_err();

    assert_eq!(
        err,
        ConfigError::MissingRequiredField {
            acceptor: "broken".into(),
            field: "port"
        }
    );
    assert!(err.to_string().contains("broken"));
    assert!(err.to_string().contains("port"));
}

#[test]
fn missing_protocols_is_rejected() {
    let err = normalize_acceptors(&raw(json!({
        "artemis": { "port": 61616 }
    })))
    .unwrap_err();

    assert!(matches!(
        err,
        ConfigError::MissingRequiredField { field: "protocols", .. }
    ));
}

#[test]
fn empty_protocols_is_rejected() {
    let err = normalize_acceptors(&raw(json!({
        "artemis": { "port": 61616, "protocols": [] }
    })))
    .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidAcceptorConfig { .. }));
}

#[test]
fn non_mapping_value_is_rejected() {
    let err = normalize_acceptors(&raw(json!({ "artemis": 61616 }))).unwrap_err();
    assert_eq!(err.entry(), "artemis");
    assert!(matches!(err, ConfigError::InvalidAcceptorConfig { .. }));
}

#[test]
fn unrecognized_sub_key_is_rejected() {
    let err = normalize_acceptors(&raw(json!({
        "artemis": { "port": 61616, "protocols": ["core"], "portt": 1 }
    })))
    .unwrap_err();

    assert!(err.to_string().contains("portt"));
}

#[test]
fn out_of_range_port_is_rejected() {
    for port in [json!(0), json!(70000), json!("abc"), json!(true)] {
        let err = normalize_acceptors(&raw(json!({
            "artemis": { "port": port, "protocols": ["core"] }
        })))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAcceptorConfig { .. }));
    }
}

#[test]
fn numeric_string_port_is_accepted() {
    let acceptors = normalize_acceptors(&raw(json!({
        "artemis": { "port": "61617", "protocols": ["core"] }
    })))
    .unwrap();
    assert_eq!(acceptors.get("artemis").unwrap().port, 61617);
}

#[test]
fn output_keeps_original_keys_and_declaration_order() {
    let input = raw(json!({
        "zeta": { "port": 1, "protocols": ["core"], "bind": "10.0.0.1" },
        "alpha": { "port": 2, "protocols": ["amqp"] }
    }));
    let acceptors = normalize_acceptors(&input).unwrap();
    assert_eq!(acceptors.names(), vec!["zeta", "alpha"]);

    let value = acceptors.to_value();
    let zeta = &value["zeta"];
    assert_eq!(zeta["bind"], "10.0.0.1");
    assert_eq!(zeta["protocols_list"], "CORE");
    assert_eq!(zeta["settings"], json!([]));
    assert_eq!(zeta["settings_list"], "");
}

#[test]
fn normalization_is_repeatable() {
    let input = raw(json!({
        "artemis": {
            "port": 61616,
            "protocols": ["core", "amqp"],
            "settings": ["a=1"],
            "acceptor_settings": ["a=2"]
        }
    }));
    assert_eq!(
        normalize_acceptors(&input).unwrap(),
        normalize_acceptors(&input).unwrap()
    );
}
