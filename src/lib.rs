//! Roci Agents — multi-agent orchestration over OpenAI-style model APIs.
//!
//! Agents own instructions, tools, and handoffs to other agents. The
//! [`Runner`](runner::Runner) drives the turn loop: call the model, run the
//! tools it asked for, follow handoffs, and stop on a final output.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use roci_agents::prelude::*;
//!
//! # async fn example() -> roci_agents::error::Result<()> {
//! let config = AgentsConfig::load()?;
//! let client = Arc::new(OpenAiClient::from_config(&config)?);
//!
//! let billing = Arc::new(Agent::new("billing").with_instructions("You handle invoices."));
//! let triage = Arc::new(
//!     Agent::new("triage")
//!         .with_instructions("Route the user to the right agent.")
//!         .with_agent_handoff(billing),
//! );
//!
//! let result = Runner::new(client).run(triage, "Where is my invoice?").await?;
//! println!("{}: {}", result.last_agent.name(), result.final_output);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod handoff;
pub mod output_schema;
pub mod prelude;
pub mod provider;
pub mod runner;
pub mod stream;
pub mod tools;
pub mod types;
