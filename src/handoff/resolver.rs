//! Computes the handoffs an agent exposes and checks name collisions.

use std::collections::HashSet;
use std::sync::Arc;

use super::Handoff;
use crate::agent::Agent;
use crate::error::RociError;
use crate::tools::Tool;

/// All handoffs of `agent`: explicit ones first, then one default handoff per
/// implicit target, each in declaration order.
pub fn get_handoffs(agent: &Agent) -> Result<Vec<Handoff>, RociError> {
    let mut handoffs: Vec<Handoff> = agent.handoffs().to_vec();
    handoffs.extend(
        agent
            .agent_handoffs()
            .iter()
            .map(|target| Handoff::new(Arc::clone(target))),
    );

    let mut seen = HashSet::new();
    for handoff in &handoffs {
        if !seen.insert(handoff.tool_name.as_str()) {
            return Err(RociError::Configuration(format!(
                "agent '{}' has more than one handoff named '{}'",
                agent.name(),
                handoff.tool_name
            )));
        }
    }
    Ok(handoffs)
}

/// Check that tool and handoff names are unique across the combined set
/// presented to the model.
pub fn validate_tool_names(
    agent_name: &str,
    tools: &[Tool],
    handoffs: &[Handoff],
) -> Result<(), RociError> {
    let mut seen = HashSet::new();
    let names = tools
        .iter()
        .map(Tool::name)
        .chain(handoffs.iter().map(|h| h.tool_name.as_str()));
    for name in names {
        if !seen.insert(name) {
            return Err(RociError::Configuration(format!(
                "agent '{agent_name}' exposes the tool name '{name}' more than once"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{AgentToolParameters, FunctionTool};

    #[test]
    fn duplicate_explicit_and_implicit_names_are_rejected() {
        let target = Arc::new(Agent::new("billing"));
        let agent = Agent::new("triage")
            .with_handoff(Handoff::new(Arc::clone(&target)))
            .with_agent_handoff(target);

        let err = get_handoffs(&agent).unwrap_err();

        assert!(matches!(err, RociError::Configuration(ref m) if m.contains("transfer_to_billing")));
    }

    #[test]
    fn tool_and_handoff_names_share_one_namespace() {
        let tool: Tool = FunctionTool::new(
            "transfer_to_billing",
            "looks like a handoff",
            AgentToolParameters::empty(),
            |_args, _ctx| async { Ok(serde_json::Value::Null) },
        )
        .into();
        let handoff = Handoff::new(Arc::new(Agent::new("billing")));

        let err = validate_tool_names("triage", &[tool], &[handoff]).unwrap_err();

        assert!(err.is_user_error());
    }
}
