//! Round-trip persistence of the auto-context memory through a session store.

mod init_logging;

use std::sync::Arc;

use agentscope::{
    AutoContextConfig, AutoContextMemory, ContentBlock, InMemorySession, MockLlm, Msg, MsgRole,
};

fn config() -> AutoContextConfig {
    AutoContextConfig {
        msg_threshold: 12,
        large_payload_threshold: 1_000_000,
        min_consecutive_tool_messages: 1000,
        ..Default::default()
    }
}

fn memory() -> AutoContextMemory {
    AutoContextMemory::builder()
        .llm(Arc::new(MockLlm::with_reply("digest")))
        .config(config())
        .build()
        .unwrap()
}

async fn populate_and_compress(memory: &AutoContextMemory) {
    for i in 0..8 {
        memory.add_message(Msg::user("user", format!("filler {i}"))).await;
    }
    memory.add_message(Msg::user("user", "run the tools")).await;
    for n in 1..=2u32 {
        memory
            .add_message(Msg::new(
                MsgRole::Assistant,
                "worker",
                vec![ContentBlock::tool_use(
                    format!("call-{n}"),
                    "search",
                    serde_json::json!({ "q": n }),
                )],
            ))
            .await;
        memory
            .add_message(Msg::tool_result("worker", format!("call-{n}"), "search", format!("r{n}")))
            .await;
    }
    // Crosses the threshold and compresses the current round.
    memory.get_messages().await;
}

#[tokio::test]
async fn save_then_load_restores_all_three_stores() {
    let session = InMemorySession::new();
    let saved = memory();
    populate_and_compress(&saved).await;
    assert!(!saved.offload_context().is_empty());
    saved.save_to(&session, "conv-1").await.unwrap();

    let loaded = memory();
    loaded.load_from(&session, "conv-1").await.unwrap();

    assert_eq!(loaded.get_messages().await, saved.get_messages().await);
    assert_eq!(loaded.original_messages().await, saved.original_messages().await);
    assert_eq!(loaded.offload_context(), saved.offload_context());
}

#[tokio::test]
async fn loaded_working_store_preserves_block_variants_and_metadata() {
    let session = InMemorySession::new();
    let saved = memory();
    populate_and_compress(&saved).await;
    saved.save_to(&session, "conv-2").await.unwrap();

    let loaded = memory();
    loaded.load_from(&session, "conv-2").await.unwrap();
    let working = loaded.get_messages().await;

    let synthetic = working
        .iter()
        .find(|m| m.is_compressed_current_round())
        .expect("compression artifact survives the round trip");
    let uuid = synthetic.offload_uuid().unwrap();
    let originals = loaded.reload(&uuid);
    assert_eq!(originals.len(), 4);
    assert!(originals[0].has_tool_use(), "tool_use tag must round-trip");
    assert!(originals[1].has_tool_result(), "tool_result tag must round-trip");
}

#[tokio::test]
async fn loading_missing_keys_yields_empty_stores() {
    let session = InMemorySession::new();
    let loaded = memory();
    loaded.load_from(&session, "never-saved").await.unwrap();
    assert!(loaded.get_messages().await.is_empty());
    assert!(loaded.original_messages().await.is_empty());
    assert!(loaded.offload_context().is_empty());
}

#[tokio::test]
async fn save_overwrites_previous_snapshot() {
    let session = InMemorySession::new();
    let saved = memory();
    saved.add_message(Msg::user("user", "v1")).await;
    saved.save_to(&session, "conv-3").await.unwrap();
    saved.add_message(Msg::user("user", "v2")).await;
    saved.save_to(&session, "conv-3").await.unwrap();

    let loaded = memory();
    loaded.load_from(&session, "conv-3").await.unwrap();
    assert_eq!(loaded.original_messages().await.len(), 2);
}
