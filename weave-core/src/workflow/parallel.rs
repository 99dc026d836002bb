//! Parallel Workflow Pattern
//!
//! Fans input out to named branches concurrently, joins every branch, then
//! optionally fans back in through a single synthesis step.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::llm::LLMProvider;

use super::chain::Chain;
use super::execution::{ExecutionTrace, WorkflowError, WorkflowResult};
use super::step::{Step, StepOutput};

/// Branch in a parallel workflow
pub enum Branch {
    /// Single step branch
    Step(Step),
    /// Chain branch
    Chain(Chain),
}

impl std::fmt::Debug for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Branch::Step(step) => f.debug_tuple("Step").field(step).finish(),
            Branch::Chain(chain) => f.debug_tuple("Chain").field(chain).finish(),
        }
    }
}

impl Branch {
    /// Execute the branch
    pub async fn execute(
        &self,
        input: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<(String, ExecutionTrace)> {
        match self {
            Branch::Step(step) => {
                let (output, trace) = step.execute(input, &BTreeMap::new(), provider).await?;
                let mut exec_trace = ExecutionTrace::new(&step.name);
                exec_trace.add_step(trace);
                Ok((output.text, exec_trace))
            }
            Branch::Chain(chain) => {
                let (output, trace) = chain.execute(input, provider).await?;
                Ok((output.final_output().unwrap_or_default().to_string(), trace))
            }
        }
    }

    /// Get the branch name, which is also its output key
    pub fn name(&self) -> &str {
        match self {
            Branch::Step(step) => &step.name,
            Branch::Chain(chain) => chain.name(),
        }
    }
}

/// Parallel workflow configuration
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    /// Maximum concurrent branches (`None` = all at once)
    pub max_concurrency: Option<usize>,
    /// Timeout per branch
    pub branch_timeout: Option<Duration>,
    /// Characters of the original input exposed to the synthesis step
    pub synthesis_input_limit: Option<usize>,
}

/// Outputs of a parallel run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParallelOutput {
    /// Output text by branch key
    pub branches: BTreeMap<String, String>,
    /// Synthesis output, when a synthesis step is configured
    pub synthesis: Option<String>,
}

impl ParallelOutput {
    /// The synthesis output, or the branch outputs joined in key order
    pub fn final_output(&self) -> String {
        match &self.synthesis {
            Some(text) => text.clone(),
            None => self
                .branches
                .values()
                .cloned()
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// Parallel workflow for concurrent execution
pub struct Parallel {
    /// Workflow name
    name: String,
    /// Branches to execute
    branches: Vec<Branch>,
    /// Fan-in step over the joined outputs
    synthesis: Option<Step>,
    /// Text substituted for a branch that returned nothing
    defaults: BTreeMap<String, String>,
    /// Configuration
    config: ParallelConfig,
}

impl std::fmt::Debug for Parallel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parallel")
            .field("name", &self.name)
            .field("branch_count", &self.branches.len())
            .field("has_synthesis", &self.synthesis.is_some())
            .field("config", &self.config)
            .finish()
    }
}

struct BranchRun {
    key: String,
    result: WorkflowResult<(String, ExecutionTrace)>,
    duration_ms: u64,
}

impl Parallel {
    /// Create a new parallel builder
    pub fn builder() -> ParallelBuilder {
        ParallelBuilder::new()
    }

    /// Get the workflow name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of branches
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    fn validate(&self) -> WorkflowResult<()> {
        if self.branches.is_empty() {
            return Err(WorkflowError::InvalidConfig(format!(
                "Parallel workflow '{}' has no branches",
                self.name
            )));
        }
        if self.config.max_concurrency == Some(0) {
            return Err(WorkflowError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for branch in &self.branches {
            if !seen.insert(branch.name()) {
                return Err(WorkflowError::InvalidConfig(format!(
                    "Duplicate branch key '{}'",
                    branch.name()
                )));
            }
        }
        Ok(())
    }

    async fn run_branch(
        &self,
        branch: &Branch,
        input: &str,
        semaphore: Option<&Semaphore>,
        provider: &dyn LLMProvider,
    ) -> BranchRun {
        let key = branch.name().to_string();

        let _permit = match semaphore {
            Some(semaphore) => match semaphore.acquire().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    return BranchRun {
                        key: key.clone(),
                        result: Err(WorkflowError::BranchFailed {
                            branch: key,
                            message: "Failed to acquire semaphore".to_string(),
                        }),
                        duration_ms: 0,
                    };
                }
            },
            None => None,
        };

        tracing::debug!(workflow = %self.name, branch = %key, "Running branch");
        let start = std::time::Instant::now();

        let result = match self.config.branch_timeout {
            Some(timeout) => {
                match tokio::time::timeout(timeout, branch.execute(input, provider)).await {
                    Ok(result) => result,
                    Err(_) => Err(WorkflowError::Timeout(timeout)),
                }
            }
            None => branch.execute(input, provider).await,
        };

        BranchRun {
            key,
            result,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Execute all branches concurrently, then the synthesis step
    ///
    /// Every branch is joined before any result is read. If a branch failed,
    /// the first failure in branch order is returned and synthesis is skipped.
    pub async fn execute(
        &self,
        input: &str,
        provider: &dyn LLMProvider,
    ) -> WorkflowResult<(ParallelOutput, ParallelExecutionTrace)> {
        self.validate()?;

        let start = std::time::Instant::now();
        let semaphore = self.config.max_concurrency.map(Semaphore::new);

        tracing::info!(
            workflow = %self.name,
            branches = self.branches.len(),
            "Starting parallel branches"
        );

        let runs = futures::future::join_all(
            self.branches
                .iter()
                .map(|branch| self.run_branch(branch, input, semaphore.as_ref(), provider)),
        )
        .await;

        let mut trace = ParallelExecutionTrace {
            workflow_name: self.name.clone(),
            branches: Vec::with_capacity(runs.len()),
            synthesis_duration_ms: None,
            total_duration_ms: 0,
            success: true,
        };

        let mut outputs = BTreeMap::new();
        let mut first_error = None;

        for run in runs {
            match run.result {
                Ok((text, branch_trace)) => {
                    trace.branches.push(BranchTrace {
                        name: run.key.clone(),
                        duration_ms: run.duration_ms,
                        success: true,
                        error: None,
                        trace: Some(branch_trace),
                    });
                    outputs.insert(run.key, text);
                }
                Err(e) => {
                    tracing::warn!(
                        workflow = %self.name,
                        branch = %run.key,
                        error = %e,
                        "Branch failed"
                    );
                    trace.success = false;
                    trace.branches.push(BranchTrace {
                        name: run.key.clone(),
                        duration_ms: run.duration_ms,
                        success: false,
                        error: Some(e.to_string()),
                        trace: None,
                    });
                    if first_error.is_none() {
                        first_error = Some(WorkflowError::BranchFailed {
                            branch: run.key,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }

        for (key, default) in &self.defaults {
            let missing = outputs.get(key).is_none_or(|text| text.trim().is_empty());
            if missing {
                outputs.insert(key.clone(), default.clone());
            }
        }

        let synthesis = match &self.synthesis {
            Some(step) => {
                let synthesis_start = std::time::Instant::now();
                let excerpt = match self.config.synthesis_input_limit {
                    Some(limit) => input.chars().take(limit).collect::<String>(),
                    None => input.to_string(),
                };
                let (StepOutput { text, .. }, _) =
                    step.execute(&excerpt, &outputs, provider).await?;
                trace.synthesis_duration_ms = Some(synthesis_start.elapsed().as_millis() as u64);
                Some(text)
            }
            None => None,
        };

        trace.total_duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            workflow = %self.name,
            duration_ms = trace.total_duration_ms,
            "Parallel workflow completed"
        );

        Ok((
            ParallelOutput {
                branches: outputs,
                synthesis,
            },
            trace,
        ))
    }
}

/// Trace for a single branch
#[derive(Debug, Clone)]
pub struct BranchTrace {
    /// Branch name
    pub name: String,
    /// Execution duration
    pub duration_ms: u64,
    /// Success status
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Steps run inside the branch
    pub trace: Option<ExecutionTrace>,
}

/// Parallel execution trace
#[derive(Debug, Clone)]
pub struct ParallelExecutionTrace {
    /// Workflow name
    pub workflow_name: String,
    /// Branch traces, in declaration order
    pub branches: Vec<BranchTrace>,
    /// Synthesis duration, if synthesis ran
    pub synthesis_duration_ms: Option<u64>,
    /// Total duration
    pub total_duration_ms: u64,
    /// Overall success
    pub success: bool,
}

impl ParallelExecutionTrace {
    /// Get count of successful branches
    pub fn successful_branches(&self) -> usize {
        self.branches.iter().filter(|b| b.success).count()
    }

    /// Get count of failed branches
    pub fn failed_branches(&self) -> usize {
        self.branches.iter().filter(|b| !b.success).count()
    }
}

/// Builder for Parallel workflows
pub struct ParallelBuilder {
    name: String,
    branches: Vec<Branch>,
    synthesis: Option<Step>,
    defaults: BTreeMap<String, String>,
    config: ParallelConfig,
}

impl ParallelBuilder {
    /// Create a new parallel builder
    pub fn new() -> Self {
        Self {
            name: "parallel".to_string(),
            branches: Vec::new(),
            synthesis: None,
            defaults: BTreeMap::new(),
            config: ParallelConfig::default(),
        }
    }

    /// Set the workflow name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a step branch keyed by the step name
    pub fn step(mut self, step: Step) -> Self {
        self.branches.push(Branch::Step(step));
        self
    }

    /// Add a chain branch keyed by the chain name
    pub fn chain(mut self, chain: Chain) -> Self {
        self.branches.push(Branch::Chain(chain));
        self
    }

    /// Set the synthesis step
    ///
    /// Its template sees `{{<branch key>}}` for every branch and `{{input}}`
    /// for the (optionally truncated) original input.
    pub fn synthesis(mut self, step: Step) -> Self {
        self.synthesis = Some(step);
        self
    }

    /// Text used for `key` when that branch returns empty output
    pub fn default_output(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.defaults.insert(key.into(), text.into());
        self
    }

    /// Set maximum concurrency
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = Some(max);
        self
    }

    /// Set branch timeout
    pub fn branch_timeout(mut self, timeout: Duration) -> Self {
        self.config.branch_timeout = Some(timeout);
        self
    }

    /// Limit how many characters of the input the synthesis step sees
    pub fn synthesis_input_limit(mut self, chars: usize) -> Self {
        self.config.synthesis_input_limit = Some(chars);
        self
    }

    /// Build the parallel workflow
    pub fn build(self) -> Parallel {
        Parallel {
            name: self.name,
            branches: self.branches,
            synthesis: self.synthesis,
            defaults: self.defaults,
            config: self.config,
        }
    }
}

impl Default for ParallelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeaveError;
    use crate::llm::ScriptedProvider;

    fn responder_provider() -> ScriptedProvider {
        ScriptedProvider::with_responder(|request| {
            Ok(match request.system_prompt() {
                Some("a") => "alpha".to_string(),
                Some("b") => "beta".to_string(),
                Some("fail") => return Err(WeaveError::Http("boom".to_string())),
                _ => format!("summary of: {}", request.user_prompt()),
            })
        })
        .with_delay(Duration::from_millis(20))
    }

    #[test]
    fn test_parallel_builder() {
        let parallel = Parallel::builder()
            .name("test-parallel")
            .step(Step::transform("a", |_| Ok("1".to_string())).build())
            .step(Step::transform("b", |_| Ok("2".to_string())).build())
            .max_concurrency(5)
            .build();

        assert_eq!(parallel.name(), "test-parallel");
        assert_eq!(parallel.branch_count(), 2);
        assert_eq!(parallel.config.max_concurrency, Some(5));
    }

    #[tokio::test]
    async fn test_branches_run_concurrently_then_synthesize() {
        let provider = responder_provider();
        let parallel = Parallel::builder()
            .step(Step::llm("a", "{{input}}").system_prompt("a").build())
            .step(Step::llm("b", "{{input}}").system_prompt("b").build())
            .synthesis(Step::llm("summary", "A={{a}} B={{b}} IN={{input}}").build())
            .synthesis_input_limit(3)
            .build();

        let (output, trace) = parallel.execute("contract", &provider).await.unwrap();

        assert_eq!(output.branches["a"], "alpha");
        assert_eq!(output.branches["b"], "beta");
        assert_eq!(
            output.synthesis.as_deref(),
            Some("summary of: A=alpha B=beta IN=con")
        );
        assert_eq!(provider.max_in_flight(), 2);
        assert_eq!(trace.successful_branches(), 2);
        assert!(trace.synthesis_duration_ms.is_some());

        // synthesis request is always last
        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].user_prompt(), "A=alpha B=beta IN=con");
    }

    #[tokio::test]
    async fn test_max_concurrency_is_respected() {
        let provider = responder_provider();
        let parallel = Parallel::builder()
            .step(Step::llm("a", "{{input}}").system_prompt("a").build())
            .step(Step::llm("b", "{{input}}").system_prompt("b").build())
            .max_concurrency(1)
            .build();

        parallel.execute("x", &provider).await.unwrap();
        assert_eq!(provider.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_branch_failure_skips_synthesis() {
        let provider = responder_provider();
        let parallel = Parallel::builder()
            .step(Step::llm("a", "{{input}}").system_prompt("a").build())
            .step(Step::llm("bad", "{{input}}").system_prompt("fail").build())
            .synthesis(Step::llm("summary", "{{a}}").build())
            .build();

        let result = parallel.execute("x", &provider).await;

        match result {
            Err(WorkflowError::BranchFailed { branch, .. }) => assert_eq!(branch, "bad"),
            other => panic!("Expected BranchFailed, got {:?}", other.map(|(o, _)| o)),
        }
        // both branches ran, synthesis did not
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_branch_timeout() {
        let provider = ScriptedProvider::new(vec!["slow"]).with_delay(Duration::from_secs(30));
        let parallel = Parallel::builder()
            .step(Step::llm("slow", "{{input}}").build())
            .branch_timeout(Duration::from_secs(1))
            .build();

        let result = parallel.execute("x", &provider).await;
        assert!(matches!(result, Err(WorkflowError::BranchFailed { .. })));
    }

    #[tokio::test]
    async fn test_default_output_for_empty_branch() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let parallel = Parallel::builder()
            .step(Step::transform("legal", |_| Ok("  ".to_string())).build())
            .default_output("legal", "No legal analysis provided.")
            .build();

        let (output, _) = parallel.execute("x", &provider).await.unwrap();
        assert_eq!(output.branches["legal"], "No legal analysis provided.");
        assert_eq!(output.final_output(), "No legal analysis provided.");
    }

    #[tokio::test]
    async fn test_duplicate_keys_are_invalid() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let parallel = Parallel::builder()
            .step(Step::transform("a", |v| Ok(v.to_string())).build())
            .step(Step::transform("a", |v| Ok(v.to_string())).build())
            .build();

        let result = parallel.execute("x", &provider).await;
        assert!(matches!(result, Err(WorkflowError::InvalidConfig(_))));
    }
}
