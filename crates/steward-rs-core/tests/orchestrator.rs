//! Orchestrator integration tests with scripted chat models.

use autoagents_llm::LLMProvider;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use steward_rs_config::StewardConfig;
use steward_rs_core::{Orchestrator, Role, StewardCoreError};
use steward_rs_protocol::EventPayload;
use steward_rs_test_utils::{
    CollectingSink, DummyTool, FixedChatResponse, FixedLLM, ScriptedLLM, SlowTool, tool_call,
};
use steward_rs_tools::{Tool, ToolRegistry, TurnServices};

fn registry_with(tools: Vec<Arc<dyn Tool>>) -> ToolRegistry {
    let registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

fn orchestrator(
    config: StewardConfig,
    llm: Arc<dyn LLMProvider>,
    tools: ToolRegistry,
    sink: Option<Arc<CollectingSink>>,
) -> Orchestrator {
    Orchestrator::new(
        config,
        llm,
        tools,
        TurnServices::default(),
        None,
        sink.map(|sink| sink as Arc<dyn steward_rs_core::EventSink>),
    )
    .expect("build orchestrator")
}

#[tokio::test]
async fn plain_answer_takes_one_invocation() {
    let orchestrator = orchestrator(
        StewardConfig::default(),
        Arc::new(FixedLLM::new("Hello there")),
        ToolRegistry::new(),
        None,
    );
    let session_id = orchestrator.create_session().expect("session");

    let result = orchestrator.run(session_id, "hi").await.expect("run");
    assert_eq!(result.response, "Hello there");
    assert_eq!(result.agent_invocations, 1);

    let history = orchestrator.history(session_id).expect("history");
    let roles: Vec<Role> = history.iter().map(|message| message.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn every_tool_call_gets_exactly_one_result() {
    let llm = ScriptedLLM::new(vec![
        FixedChatResponse::with_tool_calls(
            "Checking.",
            vec![
                tool_call("call_a", "alpha", "{}"),
                tool_call("call_b", "beta", r#"{"x":1}"#),
            ],
        ),
        FixedChatResponse::new("All done."),
    ]);
    let alpha = Arc::new(DummyTool::new("alpha").with_result(json!("A")));
    let beta = Arc::new(DummyTool::new("beta").with_result(json!("B")));
    let sink = Arc::new(CollectingSink::new());
    let orchestrator = orchestrator(
        StewardConfig::default(),
        Arc::new(llm.clone()),
        registry_with(vec![alpha.clone() as Arc<dyn Tool>, beta.clone()]),
        Some(sink.clone()),
    );
    let session_id = orchestrator.create_session().expect("session");

    let result = orchestrator.run(session_id, "do both").await.expect("run");
    assert_eq!(result.response, "All done.");
    assert_eq!(result.agent_invocations, 2);
    assert_eq!(llm.call_count(), 2);
    assert_eq!(alpha.calls.lock().len(), 1);
    assert_eq!(beta.calls.lock().clone(), vec![json!({ "x": 1 })]);

    let history = orchestrator.history(session_id).expect("history");
    let results: Vec<_> = history
        .iter()
        .filter(|message| message.role == Role::Tool)
        .map(|message| (message.tool_call_id.clone(), message.content.clone()))
        .collect();
    assert_eq!(
        results,
        vec![
            (Some("call_a".to_string()), "A".to_string()),
            (Some("call_b".to_string()), "B".to_string()),
        ]
    );

    let payloads = sink.payloads();
    assert!(matches!(payloads.first(), Some(EventPayload::TurnStarted { .. })));
    assert!(matches!(
        payloads.last(),
        Some(EventPayload::TurnCompleted { message, .. }) if message == "All done."
    ));
    let started = payloads
        .iter()
        .filter(|payload| matches!(payload, EventPayload::ToolCallStarted { .. }))
        .count();
    assert_eq!(started, 2);
}

#[tokio::test]
async fn iteration_cap_ends_turn_with_notice() {
    let mut config = StewardConfig::default();
    config.orchestrator.max_iterations = 3;
    let llm = ScriptedLLM::repeating(
        FixedChatResponse::tool_calls_only(vec![tool_call("loop", "ping", "{}")]),
        10,
    );
    let sink = Arc::new(CollectingSink::new());
    let orchestrator = orchestrator(
        config,
        Arc::new(llm.clone()),
        registry_with(vec![Arc::new(DummyTool::new("ping"))]),
        Some(sink.clone()),
    );
    let session_id = orchestrator.create_session().expect("session");

    let result = orchestrator.run(session_id, "loop forever").await.expect("run");
    assert_eq!(result.agent_invocations, 3);
    assert_eq!(llm.call_count(), 3);
    assert_eq!(
        result.response,
        "I stopped working on this request after 3 steps without reaching an answer. \
         Let me know how you would like to continue."
    );

    let history = orchestrator.history(session_id).expect("history");
    assert_eq!(history.len(), 8);
    let last = history.last().expect("last message");
    assert_eq!(last.role, Role::Assistant);
    assert!(!last.is_tool_request());
    assert!(
        sink.payloads()
            .iter()
            .any(|payload| matches!(payload, EventPayload::IterationLimitReached { limit: 3, .. }))
    );
}

#[tokio::test]
async fn model_failure_rolls_back_the_turn() {
    let llm = ScriptedLLM::new(vec![FixedChatResponse::new("first answer")]);
    let sink = Arc::new(CollectingSink::new());
    let orchestrator = orchestrator(
        StewardConfig::default(),
        Arc::new(llm),
        ToolRegistry::new(),
        Some(sink.clone()),
    );
    let session_id = orchestrator.create_session().expect("session");
    orchestrator.run(session_id, "one").await.expect("first run");

    let err = orchestrator
        .run(session_id, "two")
        .await
        .expect_err("script exhausted");
    assert!(matches!(err, StewardCoreError::Model(message) if message.contains("script exhausted")));

    let history = orchestrator.history(session_id).expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, "first answer");
    assert!(matches!(sink.payloads().last(), Some(EventPayload::Error { .. })));
}

#[tokio::test]
async fn run_stream_delivers_events_in_order() {
    let llm = ScriptedLLM::new(vec![
        FixedChatResponse::tool_calls_only(vec![tool_call("c1", "ping", "{}")]),
        FixedChatResponse::new("pong"),
    ]);
    let orchestrator = orchestrator(
        StewardConfig::default(),
        Arc::new(llm),
        registry_with(vec![Arc::new(DummyTool::new("ping"))]),
        None,
    );
    let session_id = orchestrator.create_session().expect("session");

    let mut stream = orchestrator.run_stream(session_id, "ping?").expect("stream");
    let turn_id = stream.turn_id;
    let mut kinds = Vec::new();
    while let Some(Ok(event)) = stream.events.next().await {
        assert_eq!(event.payload.turn_id(), Some(turn_id));
        let terminal = event.payload.is_terminal();
        kinds.push(match event.payload {
            EventPayload::TurnStarted { .. } => "started",
            EventPayload::ToolCallStarted { .. } => "tool_started",
            EventPayload::ToolCallFinished { .. } => "tool_finished",
            EventPayload::AgentMessage { .. } => "message",
            EventPayload::TurnCompleted { .. } => "completed",
            _ => "other",
        });
        if terminal {
            break;
        }
    }
    let result = stream.finish().await.expect("finish");
    assert_eq!(result.response, "pong");
    assert_eq!(
        kinds,
        vec!["started", "tool_started", "tool_finished", "message", "completed"]
    );
}

#[tokio::test]
async fn cancelled_turn_keeps_checkpoints_and_resumes() {
    let llm = ScriptedLLM::new(vec![FixedChatResponse::tool_calls_only(vec![tool_call(
        "c1",
        "slow",
        r#"{"tag":"x"}"#,
    )])]);
    let orchestrator = orchestrator(
        StewardConfig::default(),
        Arc::new(llm.clone()),
        registry_with(vec![Arc::new(SlowTool::new(
            "slow",
            Duration::from_millis(200),
        ))]),
        None,
    );
    let session_id = orchestrator.create_session().expect("session");

    let mut stream = orchestrator.run_stream(session_id, "take your time").expect("stream");
    let canceller = stream.canceller();
    while let Some(Ok(event)) = stream.events.next().await {
        if matches!(event.payload, EventPayload::ToolCallStarted { .. }) {
            canceller.cancel();
        }
        if event.payload.is_terminal() {
            assert!(matches!(event.payload, EventPayload::TurnCancelled { .. }));
            break;
        }
    }
    let err = stream.finish().await.expect_err("cancelled");
    assert!(matches!(err, StewardCoreError::Cancelled(_)));

    let history = orchestrator.history(session_id).expect("history");
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].content, "done x");

    llm.push(FixedChatResponse::new("finished after all"));
    let resumed = orchestrator
        .resume_turn(session_id)
        .await
        .expect("resume")
        .expect("pending turn");
    assert_eq!(resumed.response, "finished after all");
    assert_eq!(resumed.agent_invocations, 1);

    assert_eq!(orchestrator.resume_turn(session_id).await.expect("resume"), None);
}

#[tokio::test]
async fn turns_are_serialised_per_session() {
    let llm = ScriptedLLM::new(vec![
        FixedChatResponse::tool_calls_only(vec![tool_call("c1", "slow", r#"{"tag":"a"}"#)]),
        FixedChatResponse::new("first"),
        FixedChatResponse::new("second"),
    ]);
    let orchestrator = Arc::new(orchestrator(
        StewardConfig::default(),
        Arc::new(llm),
        registry_with(vec![Arc::new(SlowTool::new(
            "slow",
            Duration::from_millis(100),
        ))]),
        None,
    ));
    let session_id = orchestrator.create_session().expect("session");

    let first = orchestrator.run_stream(session_id, "one").expect("first");
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = orchestrator.run_stream(session_id, "two").expect("second");

    assert_eq!(first.finish().await.expect("first").response, "first");
    assert_eq!(second.finish().await.expect("second").response, "second");

    let contents: Vec<String> = orchestrator
        .history(session_id)
        .expect("history")
        .into_iter()
        .map(|message| message.content)
        .collect();
    assert_eq!(contents, vec!["one", "", "done a", "first", "two", "second"]);
}

#[tokio::test]
async fn unknown_sessions_are_rejected_but_can_be_opened() {
    let orchestrator = orchestrator(
        StewardConfig::default(),
        Arc::new(FixedLLM::new("ok")),
        ToolRegistry::new(),
        None,
    );
    let session_id = uuid::Uuid::new_v4();
    let err = orchestrator.run(session_id, "hi").await.expect_err("unknown");
    assert!(matches!(err, StewardCoreError::UnknownSession(id) if id == session_id));

    orchestrator.open_session(session_id).expect("open");
    let result = orchestrator.run(session_id, "hi").await.expect("run");
    assert_eq!(result.response, "ok");
    assert_eq!(orchestrator.list_sessions().expect("list").len(), 1);
}
