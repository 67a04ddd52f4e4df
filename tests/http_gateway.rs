use std::sync::Arc;

use chatflow::{
    backend, default_registry,
    editors::UploadState,
    gateway::{FlowStore, HttpFlowStore, MemoryFlowStore},
    graph::{add_node, connect, create_flow, rename_flow},
    FlowEditingSession, MediaType, MediaUpload, NodeEditor, NodeRegistry, NodeType,
};
use serde_json::json;

async fn spawn_backend() -> (String, Arc<MemoryFlowStore>) {
    let state = Arc::new(MemoryFlowStore::new());
    let app = backend::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn session_round_trip_over_http() {
    let (base_url, _) = spawn_backend().await;
    let store = Arc::new(HttpFlowStore::new(&base_url).unwrap());
    let mut session = FlowEditingSession::new(store.clone(), NodeRegistry::default());

    let trigger = session.new_flow("Welcome Bot").nodes()[0].id.clone();
    let text = session.add_node(NodeType::TextMessage, None).unwrap();
    session.connect(&trigger, None, &text, None).unwrap();
    let id = session.save().await.unwrap();

    let metas = store.list().await.unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0].id, id.as_str());
    assert_eq!(metas[0].name, "Welcome Bot");

    let loaded = store.load(id.as_str()).await.unwrap();
    assert_eq!(loaded.id, id);
    assert!(loaded.content_eq(session.flow().unwrap()));
}

#[tokio::test]
async fn later_saves_update_in_place() {
    let (base_url, state) = spawn_backend().await;
    let store = HttpFlowStore::new(&base_url).unwrap();

    let saved = store.save(&create_flow("Draft")).await.unwrap();
    let (edited, delay) = add_node(
        &rename_flow(&saved, "Final"),
        default_registry(),
        NodeType::Delay,
        None,
    );
    let trigger = edited.nodes()[0].id.clone();
    let (edited, _) = connect(&edited, &trigger, None, &delay, None).unwrap();

    let resaved = store.save(&edited).await.unwrap();
    assert_eq!(resaved.id, saved.id);
    assert_eq!(state.metas().await.len(), 1);

    let loaded = store.load(saved.id.as_str()).await.unwrap();
    assert_eq!(loaded.name, "Final");
    assert_eq!(loaded.nodes().len(), 2);
    assert_eq!(loaded.edges().len(), 1);
}

#[tokio::test]
async fn retried_create_is_not_duplicated() {
    let (base_url, state) = spawn_backend().await;
    let flow = create_flow("Retry");

    let first = HttpFlowStore::new(&base_url).unwrap();
    let a = first.save(&flow).await.unwrap();
    let b = first.save(&flow).await.unwrap();
    assert_eq!(a.id, b.id);

    // A second client has no memory of the first create; the key still matches.
    let second = HttpFlowStore::new(&base_url).unwrap();
    let c = second.save(&flow).await.unwrap();
    assert_eq!(a.id, c.id);
    assert_eq!(state.metas().await.len(), 1);
}

#[tokio::test]
async fn missing_flow_maps_to_not_found() {
    let (base_url, _) = spawn_backend().await;
    let store = Arc::new(HttpFlowStore::new(&base_url).unwrap());

    let err = store.load("404").await.unwrap_err();
    assert!(err.is_not_found());

    let mut session = FlowEditingSession::new(store, NodeRegistry::default());
    assert!(session.load("404").await.is_err());
    assert_eq!(session.not_found(), Some("404"));
}

#[tokio::test]
async fn delete_removes_the_flow() {
    let (base_url, _) = spawn_backend().await;
    let store = HttpFlowStore::new(&base_url).unwrap();
    let saved = store.save(&create_flow("Gone")).await.unwrap();

    store.remove(saved.id.as_str()).await.unwrap();
    assert!(store.load(saved.id.as_str()).await.unwrap_err().is_not_found());
    assert!(store.remove(saved.id.as_str()).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn unsaved_flow_saved_again_after_delete_is_created_anew() {
    let (base_url, state) = spawn_backend().await;
    let store = HttpFlowStore::new(&base_url).unwrap();
    let draft = create_flow("Again");

    let first = store.save(&draft).await.unwrap();
    store.remove(first.id.as_str()).await.unwrap();

    let second = store.save(&draft).await.unwrap();
    assert_ne!(second.id, first.id);
    assert!(!second.id.is_temporary());
    assert_eq!(state.metas().await.len(), 1);
}

#[tokio::test]
async fn malformed_documents_are_rejected() {
    let (base_url, state) = spawn_backend().await;
    let response = reqwest::Client::new()
        .post(format!("{base_url}/flows"))
        .json(&json!({
            "name": "Broken",
            "nodes": [],
            "edges": [{ "id": "edge_1", "source": "node_1", "target": "node_2" }]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("node_1"));
    assert!(state.metas().await.is_empty());
}

#[tokio::test]
async fn media_upload_reaches_the_backend() {
    let (base_url, state) = spawn_backend().await;
    let store = Arc::new(HttpFlowStore::new(&base_url).unwrap());
    let mut session = FlowEditingSession::new(store, NodeRegistry::default());

    session.new_flow("Media");
    let id = session.add_node(NodeType::MediaMessage, None).unwrap();
    let NodeEditor::Media(mut editor) = session.open_editor(&id).unwrap() else {
        panic!("expected the media editor");
    };
    editor.set_media_type(MediaType::Document);

    let upload = MediaUpload {
        file_name: "menu.pdf".into(),
        mime_type: "application/pdf".into(),
        bytes: vec![7; 2048],
    };
    session.upload_media(&mut editor, upload).await.unwrap();
    assert_eq!(editor.upload_state(), &UploadState::Uploaded);

    let media_id = editor.media_id().unwrap().to_string();
    let stored = state.media(&media_id).await.unwrap();
    assert_eq!(stored.file_name, "menu.pdf");
    assert_eq!(stored.mime_type, "application/pdf");
    assert_eq!(stored.size, 2048);

    session.apply_editor_patch(editor.save().unwrap()).unwrap();
    session.save().await.unwrap();
}

#[tokio::test]
async fn documents_with_port_conflicts_are_rejected() {
    let (base_url, state) = spawn_backend().await;
    let client = reqwest::Client::new();
    let document = json!({
        "name": "Crossed",
        "nodes": [
            { "id": "t", "type": "trigger", "position": { "x": 0, "y": 0 } },
            { "id": "a", "type": "textMessage", "position": { "x": 0, "y": 100 } },
            { "id": "b", "type": "textMessage", "position": { "x": 0, "y": 200 } }
        ],
        "edges": [
            { "id": "e1", "source": "t", "target": "a" },
            { "id": "e2", "source": "t", "target": "b" },
            { "id": "e3", "source": "a", "target": "b", "sourceHandle": "ghost" }
        ]
    });

    let response = client
        .post(format!("{base_url}/flows"))
        .json(&document)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);
    assert!(state.metas().await.is_empty());

    let store = HttpFlowStore::new(&base_url).unwrap();
    let saved = store.save(&create_flow("Clean")).await.unwrap();
    let response = client
        .put(format!("{base_url}/flows/{}", saved.id))
        .json(&json!({ "nodes": document["nodes"], "edges": document["edges"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 422);

    let reloaded = store.load(saved.id.as_str()).await.unwrap();
    assert_eq!(reloaded.nodes().len(), 1);
    assert!(reloaded.invariant_violations().is_empty());
}
