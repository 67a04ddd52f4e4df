use std::sync::Arc;

use chatflow::{
    editors::{ButtonMessageEditor, DelayEditor, EditorError},
    nodes::{ButtonMessageData, DelayData},
    DataPatch, FlowEditingSession, FlowStore, MemoryFlowStore, NodeEditor, NodeRegistry, NodeType,
    SessionError,
};
use serde_json::json;

fn session() -> (FlowEditingSession, Arc<MemoryFlowStore>) {
    let store = Arc::new(MemoryFlowStore::new());
    (FlowEditingSession::new(store.clone(), NodeRegistry::default()), store)
}

#[tokio::test]
async fn welcome_bot_saves_and_reloads() {
    let (mut session, store) = session();

    let flow = session.new_flow("Welcome Bot");
    assert_eq!(flow.nodes().len(), 1);
    assert_eq!(flow.nodes()[0].node_type(), NodeType::Trigger);
    assert!(flow.edges().is_empty());
    let trigger = flow.nodes()[0].id.clone();

    let greeting = session.add_node(NodeType::TextMessage, None).unwrap();
    session.connect(&trigger, None, &greeting, None).unwrap();

    let id = session.save().await.unwrap();
    assert!(!id.is_temporary());
    assert_eq!(store.request_count(), 1);

    let mut reader = FlowEditingSession::new(store.clone(), NodeRegistry::default());
    let loaded = reader.load(id.as_str()).await.unwrap();
    assert_eq!(loaded.name, "Welcome Bot");
    assert_eq!(loaded.nodes().len(), 2);
    assert_eq!(loaded.edges().len(), 1);
    assert!(loaded.content_eq(session.flow().unwrap()));
}

#[tokio::test]
async fn overlong_button_body_blocks_save_without_a_request() {
    let (mut session, store) = session();
    session.new_flow("Menu");
    let buttons = session
        .add_node(NodeType::TextMessageWithButton, None)
        .unwrap();

    let mut patch = DataPatch::new();
    patch.insert("message".into(), json!("a".repeat(1025)));
    session.update_node_data(&buttons, &patch).unwrap();

    let before = store.request_count();
    let report = match session.save().await {
        Err(SessionError::Invalid(report)) => report,
        other => panic!("expected a validation failure, got {other:?}"),
    };
    let errors = report.node_errors(&buttons).unwrap();
    assert!(errors.field("message").unwrap().message.contains("1024"));
    assert_eq!(store.request_count(), before);
    assert!(store.list().await.unwrap().is_empty());
}

#[test]
fn delay_editor_clamps_out_of_range_minutes() {
    let registry = NodeRegistry::default();
    let limits = registry.limits().clone();

    for (input, expected) in [(500, 120), (-5, 1), (45, 45)] {
        let mut editor = DelayEditor::open("node_9".into(), &DelayData::default(), limits.clone());
        editor.set_minutes(input);
        let patch = editor.save().unwrap();
        assert_eq!(patch.patch["delayMinutes"], json!(expected));
    }
}

#[test]
fn fourth_reply_button_is_refused() {
    let (mut session, _) = session();
    session.new_flow("Choices");
    let id = session.add_node(NodeType::TextMessageWithButton, None).unwrap();

    let NodeEditor::Buttons(mut editor) = session.open_editor(&id).unwrap() else {
        panic!("expected the button editor");
    };
    editor.set_message("Pick one");
    for label in ["One", "Two", "Three"] {
        editor.add_reply_button(label).unwrap();
    }
    assert_eq!(editor.add_reply_button("Four"), Err(EditorError::ReplyButtonLimit(3)));
    assert_eq!(editor.buttons().len(), 3);

    session.apply_editor_patch(editor.save().unwrap()).unwrap();
    let node = session.flow().unwrap().get_node(&id).unwrap();
    assert_eq!(node.data.buttons().len(), 3);

    let reopened = ButtonMessageEditor::open(
        id.clone(),
        &ButtonMessageData {
            message: "Pick one".into(),
            buttons: node.data.buttons().to_vec(),
        },
        session.registry().limits().clone(),
    );
    assert_eq!(reopened.buttons().len(), 3);
}
