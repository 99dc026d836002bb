//! Weave CLI - run the workflow demos and write agent memory entries

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use weave_core::config::WeaveConfig;
use weave_core::error::WeaveError;
use weave_core::llm::{LLMProvider, LLMProviderFactory};
use weave_core::memory::{self, MemoryEntryOptions};
use weave_core::scenarios::{contract, faq, product_plan, recipe, refinery, retail};
use weave_core::workflow::{LabelMatch, RouteOutcome};

const RULE: &str = "==================================================";

#[derive(Parser)]
#[command(name = "weave")]
#[command(about = "Agentic workflow pattern demos", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to weave.toml plus WEAVE_ variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chat model override
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare hardcoded and LLM answers to program-management questions
    Faq {
        /// Questions to ask (defaults to the sample set)
        questions: Vec<String>,
    },
    /// Run the refinery prompt chain
    Chain {
        /// Feedstock to analyze
        #[arg(long, default_value = refinery::DEFAULT_FEEDSTOCK)]
        feedstock: String,
    },
    /// Route retail queries to specialist agents
    Route {
        /// Queries to route (defaults to the sample set)
        queries: Vec<String>,

        /// Match labels ignoring case, whitespace and quotes
        #[arg(long)]
        normalized: bool,
    },
    /// Review a contract with parallel specialists
    Contract {
        /// Contract text file (defaults to the bundled sample)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Optimize a recipe until it passes nutrition review
    Recipe {
        /// Dish to create
        #[arg(long)]
        dish: Option<String>,

        /// Constraint the recipe must meet (repeatable)
        #[arg(long = "constraint")]
        constraints: Vec<String>,

        /// Attempt ceiling
        #[arg(long, default_value_t = weave_core::workflow::DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,
    },
    /// Plan product development tasks from a product spec
    Plan {
        /// Product spec text file
        #[arg(long, default_value = product_plan::DEFAULT_SPEC_PATH)]
        spec: PathBuf,

        /// Workflow prompt
        #[arg(long, default_value = product_plan::WORKFLOW_PROMPT)]
        prompt: String,
    },
    /// Agent memory entries
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Version information
    Version,
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Create a new memory entry
    New(NewEntryArgs),
}

#[derive(Args)]
struct NewEntryArgs {
    /// Context for the filename (kebab-cased)
    #[arg(long)]
    context: String,

    /// Concise topic title
    #[arg(long, default_value = "")]
    topic: String,

    /// Tags
    #[arg(long, num_args = 0..)]
    tags: Vec<String>,

    /// Source description
    #[arg(long, default_value = "")]
    source: String,

    /// Agent name in frontmatter
    #[arg(long, default_value = memory::DEFAULT_AGENT)]
    agent: String,

    /// ISO date (defaults to today)
    #[arg(long)]
    date: Option<String>,

    /// Include YAML frontmatter
    #[arg(long)]
    yaml: bool,

    /// Memory directory override
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Memory errors carry dedicated exit codes; everything else exits 1
fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<WeaveError>() {
        Some(WeaveError::EmptySlug) => 2,
        Some(WeaveError::AlreadyExists(_)) => 3,
        _ => 1,
    }
}

fn load_config(cli: &Cli) -> Result<WeaveConfig> {
    let mut config = match &cli.config {
        Some(path) => WeaveConfig::from_file(path)?,
        None => WeaveConfig::load()?,
    };
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    Ok(config)
}

fn provider(config: &WeaveConfig) -> Result<Arc<dyn LLMProvider>> {
    let provider = LLMProviderFactory::create(&config.llm)?;
    let info = provider.model_info();
    tracing::debug!(provider = %info.provider, model = %info.model_name, "Using LLM provider");
    Ok(provider)
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Version => {
            println!("weave {}", env!("CARGO_PKG_VERSION"));
            println!("weave-core {}", weave_core::VERSION);
        }
        Commands::Faq { questions } => {
            if cli.model.is_none() {
                config.llm.model = faq::FAQ_MODEL.to_string();
            }
            let provider = provider(&config)?;
            let questions: Vec<String> = if questions.is_empty() {
                faq::SAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect()
            } else {
                questions
            };

            println!("PROGRAM MANAGEMENT KNOWLEDGE AGENT DEMO");
            println!("{}", RULE);
            for comparison in faq::run(&questions, provider.as_ref()).await {
                println!("\nQuestion: {}", comparison.question);
                println!("{}", "-".repeat(RULE.len()));
                println!("Hardcoded Answer:\n{}", comparison.hardcoded);
                println!("LLM Answer:\n{}", comparison.llm);
                println!("{}", RULE);
            }
        }
        Commands::Chain { feedstock } => {
            let provider = provider(&config)?;
            let (output, trace) = refinery::run(&feedstock, provider.as_ref()).await?;

            for (stage, text) in &output.steps {
                println!("\n--- {} ---\n{}", stage, text);
            }
            println!(
                "\nCompleted {} stages in {} ms",
                trace.completed_steps(),
                trace.total_duration_ms
            );
        }
        Commands::Route {
            queries,
            normalized,
        } => {
            let provider = provider(&config)?;
            let policy = if normalized {
                LabelMatch::Normalized
            } else {
                LabelMatch::Exact
            };
            let queries: Vec<String> = if queries.is_empty() {
                retail::SAMPLE_QUERIES.iter().map(|q| q.to_string()).collect()
            } else {
                queries
            };

            for query in &queries {
                println!("\nQuery: {}", query);
                let (outcome, _) = retail::run(query, policy, provider.as_ref()).await?;
                match &outcome {
                    RouteOutcome::Routed { label, .. } => println!("Routed to: {}", label),
                    RouteOutcome::Fallback { raw_label, .. } => {
                        println!("Unrecognized category: {:?}", raw_label)
                    }
                }
                println!("{}\n{}", outcome.output(), RULE);
            }
        }
        Commands::Contract { file } => {
            let provider = provider(&config)?;
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading contract {}", path.display()))?,
                None => contract::SAMPLE_CONTRACT.to_string(),
            };

            let (output, trace) = contract::run(&text, provider.as_ref()).await?;
            for (key, analysis) in &output.branches {
                println!("\n--- {} analysis ---\n{}", key, analysis);
            }
            println!("\n=== SUMMARY ===\n{}", output.final_output());
            tracing::info!(duration_ms = trace.total_duration_ms, "Contract review finished");
        }
        Commands::Recipe {
            dish,
            constraints,
            max_iterations,
        } => {
            let provider = provider(&config)?;
            let mut request = recipe::RecipeRequest::default();
            if let Some(dish) = dish {
                request.base_dish = dish;
            }
            if !constraints.is_empty() {
                request.constraints = constraints;
            }

            let (result, _) =
                recipe::run_with_limit(&request, max_iterations, provider.as_ref()).await?;
            println!("\n=== RECIPE ===\n{}", result.output);
            println!("\n=== EVALUATION ===\n{}", result.evaluation);
            if result.passed {
                println!("\nPassed after {} attempt(s)", result.iterations);
            } else {
                println!(
                    "\nWarning: the recipe did not pass within {} attempts; showing the last attempt",
                    result.iterations
                );
            }
        }
        Commands::Plan { spec, prompt } => {
            let provider = provider(&config)?;
            let embeddings = LLMProviderFactory::create_embeddings(&config.llm)?;
            let product_spec = product_plan::load_spec(&spec)
                .with_context(|| format!("reading product spec {}", spec.display()))?;

            println!("Task to complete in this workflow: {}", prompt);
            let plan =
                product_plan::run(&product_spec, &prompt, provider.as_ref(), embeddings.as_ref())
                    .await?;
            for completed in &plan.steps {
                println!("\n>>> Step: {}", completed.step);
                println!(
                    ">>> Routed to {} (similarity {:.3})",
                    completed.routed.agent, completed.routed.similarity
                );
                println!("{}", completed.routed.response);
            }
            println!("\n=== FINAL OUTPUT ===\n{}", plan.final_output());
        }
        Commands::Memory { command } => match command {
            MemoryCommands::New(args) => {
                if let Some(dir) = args.dir {
                    config.memory.dir = dir;
                }

                let mut options = MemoryEntryOptions::new(args.context)
                    .with_topic(args.topic)
                    .with_tags(args.tags)
                    .with_source(args.source)
                    .with_agent(args.agent)
                    .with_frontmatter(args.yaml);
                if let Some(date) = args.date {
                    options = options.with_date(date);
                }

                let path = memory::create_entry(&config.memory, &options)?;
                println!("Created: {}", path.display());
            }
        },
    }

    Ok(())
}
