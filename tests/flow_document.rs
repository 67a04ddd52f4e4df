use chatflow::{
    gateway::WireFlow,
    graph::validate_flow,
    EditorLimits, NodeRegistry, NodeType,
};

const SUPPORT_MENU: &str = include_str!("../demos/flows/support_menu.yaml");

#[test]
fn sample_flow_loads_and_validates() {
    let document: WireFlow = serde_yaml::from_str(SUPPORT_MENU).expect("failed to parse sample flow");
    assert_eq!(document.id, None);

    let flow = document.into_draft().expect("sample flow should convert");
    assert!(flow.id.is_temporary());
    assert_eq!(flow.name, "Support Menu");
    assert_eq!(flow.nodes().len(), 5);
    assert_eq!(flow.edges().len(), 4);
    assert!(flow.invariant_violations().is_empty());
    assert!(validate_flow(&flow, &NodeRegistry::default()).is_empty());

    let menu = flow
        .nodes_of_type(NodeType::TextMessageWithButton)
        .next()
        .map(|node| node.id.clone())
        .unwrap();
    assert_eq!(flow.outgoing_from_port(&menu, Some(&"btn_1".into())).len(), 1);
    assert_eq!(flow.outgoing_from_port(&menu, Some(&"btn_2".into())).len(), 1);
}

#[test]
fn sample_flow_survives_yaml_round_trip() {
    let flow = serde_yaml::from_str::<WireFlow>(SUPPORT_MENU)
        .unwrap()
        .into_draft()
        .unwrap();

    let yaml = serde_yaml::to_string(&WireFlow::from_flow(&flow).unwrap()).unwrap();
    let again = serde_yaml::from_str::<WireFlow>(&yaml)
        .unwrap()
        .into_draft()
        .unwrap();

    assert!(again.content_eq(&flow));
}

#[test]
fn tighter_limits_flag_the_sample() {
    let limits = EditorLimits::from_yaml_str("button_label_max_chars: 5\n").unwrap();
    let flow = serde_yaml::from_str::<WireFlow>(SUPPORT_MENU)
        .unwrap()
        .into_draft()
        .unwrap();

    let report = validate_flow(&flow, &NodeRegistry::new(limits));
    let menu = flow
        .nodes_of_type(NodeType::TextMessageWithButton)
        .next()
        .unwrap();
    let errors = report.node_errors(&menu.id).unwrap();
    assert!(errors.has_field("buttons[0].label"));
    assert!(errors.has_field("buttons[1].label"));
}

#[test]
fn schema_describes_the_wire_document() {
    let schema = schemars::schema_for!(WireFlow);
    let value = serde_json::to_value(&schema).unwrap();
    let properties = &value["properties"];
    assert!(properties.get("nodes").is_some());
    assert!(properties.get("edges").is_some());
    assert!(properties.get("name").is_some());
}

#[test]
fn demo_limits_file_overrides_only_listed_fields() {
    let limits = EditorLimits::from_file("demos/limits.yaml").unwrap();
    assert_eq!(limits.text_message_max_chars, 1024);
    assert_eq!(limits.delay_max_minutes, 60);
    assert_eq!(limits.video_max_bytes, 8 * 1024 * 1024);
    assert_eq!(limits.button_label_max_chars, EditorLimits::default().button_label_max_chars);
}
