//! Composite agents: sequential, parallel and loop.
//!
//! Each composite walks its children along a single linear path and logs
//! `step`/`of` as it advances. There are no retries and no cancellation.

use std::sync::Arc;

use adkit_core::AdkError;
use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::agent::Agent;
use crate::context::InvocationContext;

/// Runs sub-agents in order; each sees the state written by those before it.
pub struct SequentialAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
}

impl SequentialAgent {
    pub fn new(name: impl Into<String>, sub_agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sub_agents,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl Agent for SequentialAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &self.sub_agents
    }

    async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AdkError> {
        let total = self.sub_agents.len();
        for (index, agent) in self.sub_agents.iter().enumerate() {
            info!(
                pipeline = %self.name,
                agent = agent.name(),
                step = index + 1,
                of = total,
                "Running sub-agent"
            );
            agent.run(ctx).await?;
            if ctx.escalated() {
                info!(pipeline = %self.name, agent = agent.name(), "Stopping early on escalation");
                break;
            }
        }
        Ok(())
    }
}

/// Runs sub-agents concurrently, each on its own snapshot of the session.
///
/// Branch events are merged into the parent in declaration order once every
/// branch has finished. If any branch fails, the successful branches are
/// still merged and the first failure (in declaration order) is returned.
pub struct ParallelAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
}

impl ParallelAgent {
    pub fn new(name: impl Into<String>, sub_agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sub_agents,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

type BranchOutcome = (Result<(), AdkError>, InvocationContext);

#[async_trait]
impl Agent for ParallelAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &self.sub_agents
    }

    async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AdkError> {
        let total = self.sub_agents.len();
        info!(pipeline = %self.name, branches = total, "Fanning out");

        let mut join_set = JoinSet::new();
        for (index, agent) in self.sub_agents.iter().cloned().enumerate() {
            let mut branch = ctx.branch();
            join_set.spawn(async move {
                let result = agent.run(&mut branch).await;
                (index, result, branch)
            });
        }

        let mut outcomes: Vec<Option<BranchOutcome>> = (0..total).map(|_| None).collect();
        let mut panicked = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result, branch)) => {
                    info!(
                        pipeline = %self.name,
                        agent = self.sub_agents[index].name(),
                        step = index + 1,
                        of = total,
                        ok = result.is_ok(),
                        "Branch finished"
                    );
                    outcomes[index] = Some((result, branch));
                }
                Err(e) => {
                    error!(pipeline = %self.name, error = %e, "Branch task panicked");
                    panicked.get_or_insert_with(|| {
                        AdkError::Other(anyhow::anyhow!("parallel branch panicked: {e}"))
                    });
                }
            }
        }

        let mut first_error = None;
        for (result, branch) in outcomes.into_iter().flatten() {
            match result {
                Ok(()) => ctx.merge_branch(branch).await?,
                Err(e) => {
                    warn!(pipeline = %self.name, error = %e, "Branch failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error.or(panicked) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Repeats its sub-agents until one escalates or `max_iterations` is reached.
pub struct LoopAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
    max_iterations: Option<usize>,
}

impl LoopAgent {
    pub fn new(
        name: impl Into<String>,
        sub_agents: Vec<Arc<dyn Agent>>,
        max_iterations: Option<usize>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sub_agents,
            max_iterations,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }
}

#[async_trait]
impl Agent for LoopAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &self.sub_agents
    }

    async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AdkError> {
        if self.sub_agents.is_empty() {
            return Ok(());
        }

        let mut iteration = 0;
        loop {
            if self.max_iterations.is_some_and(|max| iteration >= max) {
                info!(pipeline = %self.name, iterations = iteration, "Max iterations reached");
                return Ok(());
            }
            iteration += 1;

            for agent in &self.sub_agents {
                info!(
                    pipeline = %self.name,
                    agent = agent.name(),
                    iteration,
                    of = ?self.max_iterations,
                    "Running sub-agent"
                );
                agent.run(ctx).await?;
                if ctx.escalated() {
                    info!(pipeline = %self.name, agent = agent.name(), iteration, "Loop exited");
                    ctx.reset_escalation();
                    return Ok(());
                }
            }
        }
    }
}
