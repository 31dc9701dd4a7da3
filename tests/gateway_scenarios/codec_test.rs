//! Entity codec scenarios through the gateway facade.

use std::io::Write;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use ils_gateway::fieldmapper::{decode_bool, decode_int, decode_string, FieldmapperConfig};
use ils_gateway::permissions::PermissionConfig;
use ils_gateway::rpc::MockTransport;
use ils_gateway::{FieldRegistry, GatewayError, IlsGateway, Mutation};

use crate::common::{fields, mock_gateway};

#[test]
fn test_new_copy_status_round_trip() {
    let (gateway, _) = mock_gateway();

    let wire = gateway
        .encode(
            "ccs",
            &fields(json!({"name": "Lost", "holdable": false})),
            Mutation::New,
        )
        .unwrap();

    assert_eq!(wire["__c"], json!("ccs"));
    assert_eq!(wire["__p"][1], json!("Lost"));
    assert_eq!(wire["__p"][2], json!("f"));

    let record = gateway.decode("ccs", &wire).unwrap();
    assert!(record.is_new());
    assert!(!record.is_changed());
    assert_eq!(record.bool("holdable"), Some(false));
    assert_eq!(record.string("name"), Some("Lost".to_string()));
    assert!(record.get("opac_visible").is_null());
}

#[test]
fn test_update_sets_changed_only() {
    let (gateway, _) = mock_gateway();
    let wire = gateway
        .encode("ccs", &fields(json!({"id": 3, "opac_visible": true})), Mutation::Changed)
        .unwrap();

    let record = gateway.decode("ccs", &wire).unwrap();
    assert!(!record.is_new());
    assert!(record.is_changed());
    assert_eq!(record.id(), Some(3));
    assert_eq!(record.bool("opac_visible"), Some(true));
}

/// Cycles text, number, boolean and explicit null across a class's fields.
fn mixed_value(tag: &str, index: usize) -> Value {
    match index % 4 {
        0 => json!(format!("{tag}-{index}")),
        1 => json!(index as i64 * 7),
        2 => json!(index % 8 == 2),
        _ => Value::Null,
    }
}

#[test]
fn test_every_builtin_class_round_trips_in_both_forms() {
    let (gateway, _) = mock_gateway();
    let registry = gateway.codec().registry();

    for tag in registry.tags() {
        let def = registry.require(tag).unwrap();
        let input: Map<String, Value> = def
            .data_fields()
            .map(|(index, name)| (name.to_string(), mixed_value(tag, index)))
            .collect();

        let positional = gateway.encode(tag, &input, Mutation::New).unwrap();
        let named = gateway
            .codec()
            .encode_named(tag, &input, Mutation::New)
            .unwrap();

        for (form, wire) in [("positional", &positional), ("named", &named)] {
            let record = gateway.decode(tag, wire).unwrap();
            assert!(record.is_new(), "{form} {tag} lost isnew");

            for (name, value) in &input {
                match value {
                    Value::String(s) => assert_eq!(
                        record.string(name).as_ref(),
                        Some(s),
                        "{form} {tag}.{name}"
                    ),
                    Value::Number(n) => {
                        assert_eq!(record.int(name), n.as_i64(), "{form} {tag}.{name}")
                    }
                    Value::Bool(b) => {
                        assert_eq!(record.bool(name), Some(*b), "{form} {tag}.{name}")
                    }
                    _ => assert!(record.get(name).is_null(), "{form} {tag}.{name}"),
                }
            }
        }

        assert_eq!(
            gateway.decode(tag, &positional).unwrap(),
            gateway.decode(tag, &named).unwrap(),
            "wire forms disagree for {tag}"
        );
    }
}

#[test]
fn test_unknown_field_is_rejected_not_dropped() {
    let (gateway, _) = mock_gateway();
    let err = gateway
        .encode("ccs", &fields(json!({"name": "Lost", "colour": "red"})), Mutation::New)
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::UnknownField { ref class, ref field } if class == "ccs" && field == "colour"
    ));
    assert!(err.is_codec_misuse());
}

#[test]
fn test_truncated_positional_array() {
    let (gateway, _) = mock_gateway();
    let record = gateway
        .decode("ccs", &json!({"__c": "ccs", "__p": [5, "Missing"]}))
        .unwrap();

    assert_eq!(record.id(), Some(5));
    assert_eq!(record.string("name"), Some("Missing".to_string()));
    assert!(record.get("holdable").is_unknown());
    assert!(record.get("hopeless_prone").is_unknown());
    assert!(!record.is_new());
}

#[test]
fn test_named_form_ignores_extra_keys() {
    let (gateway, _) = mock_gateway();
    let record = gateway
        .decode(
            "ccs",
            &json!({"__c": "ccs", "id": 1, "name": "Checked out", "added_in_next_release": "x"}),
        )
        .unwrap();

    assert_eq!(record.string("name"), Some("Checked out".to_string()));
    assert!(record.get("added_in_next_release").is_unknown());
    assert!(record.get("holdable").is_unknown());
}

#[test]
fn test_typed_accessors_accept_either_form() {
    let named = json!({"__c": "ccs", "id": "12", "name": "Damaged", "holdable": "t"});
    let positional = json!({"__c": "ccs", "__p": [12, "Damaged", true]});

    for wire in [&named, &positional] {
        assert_eq!(decode_int(wire, "id", 0), Some(12));
        assert_eq!(decode_string(wire, "name", 1).as_deref(), Some("Damaged"));
        assert_eq!(decode_bool(wire, "holdable", 2), Some(true));
        assert_eq!(decode_bool(wire, "opac_visible", 3), None);
    }
}

#[test]
fn test_fleshed_and_bare_links() {
    let (gateway, _) = mock_gateway();
    let registry = gateway.codec().registry();
    let acp = registry.require("acp").unwrap();
    let circ_lib = acp.position("circ_lib").unwrap();
    let status = acp.position("status").unwrap();

    let mut slots = vec![Value::Null; acp.fields().len()];
    slots[circ_lib] = json!({"__c": "aou", "id": 4, "shortname": "BR1"});
    slots[status] = json!(0);
    let fleshed = json!({"__c": "acp", "__p": slots});

    let record = gateway.decode("acp", &fleshed).unwrap();
    assert_eq!(record.link_id("circ_lib"), Some(4));
    assert_eq!(
        record.entity("circ_lib").and_then(|lib| lib.string("shortname")),
        Some("BR1".to_string())
    );
    assert_eq!(record.link_id("status"), Some(0));
    assert!(record.entity("status").is_none());
}

#[test]
fn test_decoding_an_event_is_an_error() {
    let (gateway, _) = mock_gateway();
    let err = gateway
        .decode("ccs", &json!({"ilsevent": "1502", "textcode": "ASSET_COPY_NOT_FOUND"}))
        .unwrap_err();
    assert_eq!(err.event().map(|e| e.code), Some(1502));
}

#[test]
fn test_event_classification() {
    let (gateway, _) = mock_gateway();

    let event = json!({"ilsevent": 1234, "textcode": "PERM_FAILURE"});
    assert!(gateway.is_event(&event));
    assert_eq!(gateway.error_message(&event, "fallback"), "PERM_FAILURE");

    let described = json!({"ilsevent": 1, "textcode": "X", "desc": "Something broke"});
    assert_eq!(gateway.error_message(&described, "fallback"), "Something broke");

    let look_alike = json!({"textcode": "PERM_FAILURE", "desc": "not an event"});
    assert!(!gateway.is_event(&look_alike));
    assert_eq!(gateway.error_message(&look_alike, "fallback"), "fallback");
}

#[test]
fn test_table_file_overrides_builtin() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(
        b"version: \"3.14\"\nclasses:\n  ccs:\n    fields: [id, name, holdable, opac_visible, copy_active, restrict_copy_delete, is_available, hopeless_prone, is_lost]\n",
    )
    .unwrap();

    let config = FieldmapperConfig {
        table_path: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let registry = FieldRegistry::from_config(&config).unwrap();
    assert!(registry.contains("acp"));

    let gateway = IlsGateway::new(
        Arc::new(MockTransport::new()),
        Arc::new(registry),
        PermissionConfig::default(),
    );
    let wire = gateway
        .encode("ccs", &fields(json!({"is_lost": true})), Mutation::Changed)
        .unwrap();
    assert_eq!(wire["__p"][8], json!("t"));
    assert_eq!(wire["__p"][10], json!(1));
}
