//! Handoff construction, resolution, and invocation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;

use roci_agents::agent::Agent;
use roci_agents::context::RunContext;
use roci_agents::error::RociError;
use roci_agents::handoff::{
    default_handoff_tool_description, default_handoff_tool_name, get_handoffs, Handoff,
    HandoffInputData,
};
use roci_agents::types::{InputItem, RunItem};

#[test]
fn explicit_handoffs_come_before_implicit_targets() {
    let agent = Agent::new("triage")
        .with_agent_handoff(Arc::new(Agent::new("sales")))
        .with_handoff(
            Handoff::new(Arc::new(Agent::new("refunds")))
                .with_tool_name("escalate_refund")
                .with_tool_description("Send refund requests onward."),
        )
        .with_agent_handoff(Arc::new(Agent::new("Tech Support")));

    let handoffs = get_handoffs(&agent).unwrap();

    let names: Vec<&str> = handoffs.iter().map(|h| h.tool_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["escalate_refund", "transfer_to_sales", "transfer_to_tech_support"]
    );
    assert_eq!(handoffs[0].tool_description, "Send refund requests onward.");
    assert_eq!(handoffs[0].agent_name, "refunds");
    assert_eq!(handoffs[2].target().name(), "Tech Support");
}

#[test]
fn same_target_twice_is_a_configuration_error() {
    let sales = Arc::new(Agent::new("sales"));
    let agent = Agent::new("triage")
        .with_agent_handoff(Arc::clone(&sales))
        .with_agent_handoff(sales);

    let err = get_handoffs(&agent).unwrap_err();
    assert!(matches!(err, RociError::Configuration(ref m) if m.contains("transfer_to_sales")));
}

#[tokio::test]
async fn invoking_returns_the_shared_target() {
    let target = Arc::new(Agent::new("billing"));
    let handoff = Handoff::new(Arc::clone(&target));

    let resolved = handoff
        .on_invoke_handoff(&RunContext::default(), "")
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&resolved, &target));
}

#[tokio::test]
async fn callback_without_input_ignores_arguments() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handoff = Handoff::new(Arc::new(Agent::new("billing"))).with_on_handoff(move |_ctx| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    handoff
        .on_invoke_handoff(&RunContext::default(), "not even json")
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(handoff.input_json_schema.is_none());
}

#[derive(Debug, Deserialize)]
struct Priority {
    level: u8,
}

fn with_priority_input() -> Handoff {
    Handoff::new(Arc::new(Agent::new("oncall"))).with_input(
        json!({
            "type": "object",
            "properties": { "level": { "type": "integer" } },
            "required": ["level"],
            "additionalProperties": false,
        }),
        |_ctx, input: Priority| async move {
            if input.level > 3 {
                return Err(RociError::UserError("priority out of range".into()));
            }
            Ok(())
        },
    )
}

#[tokio::test]
async fn typed_input_is_checked_before_the_callback_runs() {
    let handoff = with_priority_input();
    let ctx = RunContext::default();

    assert!(handoff.on_invoke_handoff(&ctx, r#"{"level":2}"#).await.is_ok());

    for bad in ["", "   ", "{oops", r#"{"level":"high"}"#, r#"{}"#] {
        let err = handoff.on_invoke_handoff(&ctx, bad).await.unwrap_err();
        assert!(matches!(err, RociError::UserError(_)), "input {bad:?} gave {err:?}");
    }
}

#[tokio::test]
async fn callback_errors_are_returned_unchanged() {
    let err = with_priority_input()
        .on_invoke_handoff(&RunContext::default(), r#"{"level":9}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, RociError::UserError(ref m) if m == "priority out of range"));
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("pager service refused escalation (code {code})")]
struct PagerError {
    code: u16,
}

#[tokio::test]
async fn typed_callback_error_can_be_downcast() {
    let handoff = Handoff::new(Arc::new(Agent::new("oncall"))).with_input(
        json!({ "type": "object", "properties": { "level": { "type": "integer" } } }),
        |_ctx, _input: Priority| async { Err(RociError::callback(PagerError { code: 503 })) },
    );

    let err = handoff
        .on_invoke_handoff(&RunContext::default(), r#"{"level":2}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, RociError::Callback(_)));
    assert_eq!(
        err.downcast_callback::<PagerError>(),
        Some(&PagerError { code: 503 })
    );
}

#[tokio::test]
async fn callback_without_input_returns_its_error() {
    let handoff = Handoff::new(Arc::new(Agent::new("oncall")))
        .with_on_handoff(|_ctx| async { Err(RociError::callback(PagerError { code: 409 })) });

    for arguments in ["", r#"{"ignored":true}"#] {
        let err = handoff
            .on_invoke_handoff(&RunContext::default(), arguments)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_callback::<PagerError>(),
            Some(&PagerError { code: 409 })
        );
        assert_eq!(
            err.to_string(),
            "Callback error: pager service refused escalation (code 409)"
        );
    }
}

#[test]
fn input_filter_sees_each_history_segment() {
    let handoff = Handoff::new(Arc::new(Agent::new("next"))).with_input_filter(|data| {
        HandoffInputData {
            input_history: data.input_history,
            pre_handoff_items: Vec::new(),
            new_items: data
                .new_items
                .into_iter()
                .filter(|item| !matches!(item, RunItem::HandoffCall { .. }))
                .collect(),
        }
    });
    assert!(handoff.has_input_filter());

    let earlier = RunItem::MessageOutput {
        agent: "first".into(),
        raw: InputItem::assistant("working on it"),
    };
    let call = RunItem::HandoffCall {
        agent: "first".into(),
        raw: InputItem::FunctionCall {
            call_id: "h1".into(),
            name: "transfer_to_next".into(),
            arguments: "{}".into(),
        },
    };
    let ack = RunItem::HandoffOutput {
        source_agent: "first".into(),
        target_agent: "next".into(),
        raw: InputItem::function_output("h1", r#"{"assistant":"next"}"#),
    };

    let filtered = handoff.filter_input(HandoffInputData {
        input_history: vec![InputItem::user("hi")],
        pre_handoff_items: vec![earlier],
        new_items: vec![call, ack.clone()],
    });

    assert_eq!(
        filtered,
        HandoffInputData {
            input_history: vec![InputItem::user("hi")],
            pre_handoff_items: Vec::new(),
            new_items: vec![ack],
        }
    );
}

#[test]
fn agent_without_handoffs_has_none() {
    assert!(get_handoffs(&Agent::new("solo")).unwrap().is_empty());
}

#[test]
fn implicit_handoffs_use_default_name_and_description() {
    let targets: Vec<Arc<Agent>> = ["alpha", "Beta Team", "gamma"]
        .into_iter()
        .map(|name| Arc::new(Agent::new(name).with_handoff_description("Ask me.")))
        .collect();
    let agent = Agent::new("router").with_agent_handoffs(targets.clone());

    let handoffs = get_handoffs(&agent).unwrap();

    assert_eq!(handoffs.len(), 3);
    for (handoff, target) in handoffs.iter().zip(&targets) {
        assert_eq!(handoff.tool_name, default_handoff_tool_name(target));
        assert_eq!(handoff.tool_description, default_handoff_tool_description(target));
        assert_eq!(handoff.agent_name, target.name());
        assert!(Arc::ptr_eq(handoff.target(), target));
    }
}

#[tokio::test]
async fn typed_callback_runs_exactly_once_per_invocation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let target = Arc::new(Agent::new("oncall"));
    let handoff = Handoff::new(Arc::clone(&target)).with_input(
        json!({ "type": "object", "properties": { "level": { "type": "integer" } } }),
        move |_ctx, _input: Priority| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        },
    );

    let resolved = handoff
        .on_invoke_handoff(&RunContext::default(), r#"{"level":1}"#)
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&resolved, &target));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(handoff
        .on_invoke_handoff(&RunContext::default(), "not json")
        .await
        .is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
