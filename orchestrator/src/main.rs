//! campaign-flow CLI
//!
//! Runs and inspects declarative marketing workflows.
//!
//! Usage:
//!   campaign-flow run marketing-flow --intent "Launch our reusable cups"
//!   campaign-flow list
//!   campaign-flow show campaign-assets
//!   campaign-flow validate campaign-assets
//!   campaign-flow agents list
//!   campaign-flow agents show SynthesisAgent
//!   campaign-flow tools

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campaign_agent::config::FlowFileConfig;
use campaign_agent::tools::clean_schema;
use campaign_flow::events::{workflow_event_channel, WorkflowEvent, WorkflowEventReceiver};
use campaign_flow::{EngineConfig, ParallelPolicy, Stage, WorkflowEngine, DEFAULT_INTENT};

#[derive(Parser)]
#[command(name = "campaign-flow")]
#[command(about = "Declarative multi-agent marketing workflows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_URL", global = true)]
    ollama_url: Option<String>,

    /// Model for the fast agents
    #[arg(short = 'm', long, env = "OLLAMA_MODEL", global = true)]
    model: Option<String>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow
    Run {
        /// Workflow name
        #[arg(default_value = "marketing-flow")]
        workflow: String,

        /// Business intent handed to every agent
        #[arg(long, short, default_value = DEFAULT_INTENT)]
        intent: String,

        /// Directory for custom workflow files
        #[arg(long)]
        workflows_dir: Option<PathBuf>,

        /// Parallel stage failure policy (fail-fast, wait-for-all)
        #[arg(long)]
        policy: Option<ParallelPolicy>,

        /// Print the final blackboard as JSON instead of streaming output
        #[arg(long)]
        json: bool,
    },
    /// List available workflows
    List {
        /// Directory for custom workflow files
        #[arg(long)]
        workflows_dir: Option<PathBuf>,
    },
    /// Show workflow definition
    Show {
        /// Workflow name
        workflow: String,

        #[arg(long)]
        workflows_dir: Option<PathBuf>,
    },
    /// Check a workflow's agents, schemas, tools and key wiring
    Validate {
        /// Workflow name
        workflow: String,

        #[arg(long)]
        workflows_dir: Option<PathBuf>,
    },
    /// Agent inspection
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// List tools with their parameter schemas
    Tools,
}

#[derive(Subcommand)]
enum AgentCommands {
    /// List available agents
    List,
    /// Show agent configuration
    Show {
        /// Agent name
        agent: String,
    },
}

/// Initialize tracing with the given verbosity level
///
/// - 0: warn (default)
/// - 1: info (-v)
/// - 2: debug (-vv)
/// - 3+: trace (-vvv)
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // Allow RUST_LOG to override if set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI first to get verbosity before initializing tracing
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let file_config = FlowFileConfig::load()?;
    let mut config = EngineConfig::from_file_config(&file_config)?;

    // CLI flags and env override the file
    if let Some(url) = cli.ollama_url {
        config.ollama_url = url;
    }
    if let Some(model) = cli.model {
        if file_config.llm.reasoning_model.is_none() {
            config.reasoning_model = model.clone();
        }
        config.default_model = model;
    }

    match cli.command {
        Commands::Run {
            workflow,
            intent,
            workflows_dir,
            policy,
            json,
        } => {
            config.custom_workflows_dir = workflows_dir;
            if let Some(policy) = policy {
                config.parallel_policy = policy;
            }
            run_workflow(config, &workflow, &intent, json, cli.verbose).await
        }
        Commands::List { workflows_dir } => {
            config.custom_workflows_dir = workflows_dir;
            list_workflows(&WorkflowEngine::from_config(config)?);
            Ok(())
        }
        Commands::Show {
            workflow,
            workflows_dir,
        } => {
            config.custom_workflows_dir = workflows_dir;
            show_workflow(&WorkflowEngine::from_config(config)?, &workflow)
        }
        Commands::Validate {
            workflow,
            workflows_dir,
        } => {
            config.custom_workflows_dir = workflows_dir;
            validate_workflow(&WorkflowEngine::from_config(config)?, &workflow)
        }
        Commands::Agents { command } => {
            run_agents_command(&WorkflowEngine::from_config(config)?, command)
        }
        Commands::Tools => {
            list_tools(&WorkflowEngine::from_config(config)?);
            Ok(())
        }
    }
}

async fn run_workflow(
    config: EngineConfig,
    workflow: &str,
    intent: &str,
    json: bool,
    verbose: u8,
) -> Result<()> {
    let (tx, rx) = workflow_event_channel();
    let engine = WorkflowEngine::from_config(config)?.with_event_sender(tx);

    let printer = (!json).then(|| spawn_printer(rx, verbose));

    if !json {
        println!("--- Running {} with intent: \"{}\" ---\n", workflow, intent);
    }

    let result = engine.run(workflow, intent).await;

    // Closing the channel lets the printer drain and finish
    drop(engine);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "--- {} completed: {} stage(s) in {}ms ---",
            result.workflow_name,
            result.stage_results.len(),
            result.duration_ms()
        );
    }

    Ok(())
}

/// Print agent outputs as they arrive; tool and iteration detail with `-v`
fn spawn_printer(mut rx: WorkflowEventReceiver, verbose: u8) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                WorkflowEvent::AgentCompleted { agent, output, .. } => {
                    println!("--- Output from {} ---", agent);
                    println!("{}\n", output);
                }
                WorkflowEvent::ToolStarted {
                    agent,
                    tool,
                    arguments,
                } if verbose > 0 => {
                    eprintln!("  [{}] -> {} {}", agent, tool, arguments);
                }
                WorkflowEvent::ToolCalled {
                    agent,
                    tool,
                    is_error,
                    duration_ms,
                } => {
                    let status = if is_error { "failed" } else { "ok" };
                    eprintln!("  [{}] {} ({}, {}ms)", agent, tool, status, duration_ms);
                }
                WorkflowEvent::AgentIteration {
                    agent,
                    iteration,
                    tool_calls,
                } if verbose > 0 => {
                    eprintln!("  [{}] iteration {}: {} tool call(s)", agent, iteration, tool_calls);
                }
                WorkflowEvent::AgentResponded {
                    agent,
                    iterations,
                    duration_ms,
                } if verbose > 0 => {
                    eprintln!(
                        "  [{}] responded after {} iteration(s) in {}ms",
                        agent, iterations, duration_ms
                    );
                }
                WorkflowEvent::WorkflowFailed { workflow, error } => {
                    eprintln!("--- {} failed: {} ---", workflow, error);
                }
                _ => {}
            }
        }
    })
}

fn list_workflows(engine: &WorkflowEngine) {
    println!("Available Workflows:\n");

    let mut builtins = Vec::new();
    let mut customs = Vec::new();
    for (name, desc, is_custom) in engine.list_workflows() {
        if is_custom {
            customs.push((name, desc));
        } else {
            builtins.push((name, desc));
        }
    }

    println!("Built-in:");
    for (name, desc) in builtins {
        println!("  {} - {}", name, desc);
    }

    if !customs.is_empty() {
        println!("\nCustom:");
        for (name, desc) in customs {
            println!("  {} - {}", name, desc);
        }
    }

    println!("\nRun a workflow with: campaign-flow run <name> --intent \"description\"");
}

fn show_workflow(engine: &WorkflowEngine, name: &str) -> Result<()> {
    let Some(workflow) = engine.get_workflow(name) else {
        eprintln!("Workflow '{}' not found.", name);
        eprintln!("Use 'campaign-flow list' to see available workflows.");
        std::process::exit(1);
    };

    println!("Workflow: {}\n", workflow.name);
    if !workflow.description.is_empty() {
        println!("Description: {}\n", workflow.description);
    }
    println!("Stages:");
    for (i, stage) in workflow.stages.iter().enumerate() {
        print!("  {}. ", i + 1);
        print_stage(engine, stage, 2);
    }
    Ok(())
}

fn print_stage(engine: &WorkflowEngine, stage: &Stage, depth: usize) {
    let indent = "  ".repeat(depth + 1);
    match stage {
        Stage::Agent { agent } => match engine.registry().get(agent) {
            Some(spec) => {
                let inputs = spec.input_keys();
                println!("[Agent: {}] ({})", agent, spec.model);
                println!("{}reads: {}", indent, inputs.join(", "));
                println!("{}writes: {}", indent, spec.output_key);
            }
            None => println!("[Agent: {}] (not registered)", agent),
        },
        Stage::Parallel { name, stages } | Stage::Sequential { name, stages } => {
            let kind = if matches!(stage, Stage::Parallel { .. }) {
                "Parallel"
            } else {
                "Sequential"
            };
            println!("[{}: {}]", kind, name);
            for member in stages {
                print!("{}- ", indent);
                print_stage(engine, member, depth + 1);
            }
        }
    }
}

fn validate_workflow(engine: &WorkflowEngine, name: &str) -> Result<()> {
    let Some(workflow) = engine.get_workflow(name) else {
        eprintln!("Workflow '{}' not found.", name);
        std::process::exit(1);
    };

    match engine.validate(workflow) {
        Ok(()) => {
            println!(
                "Workflow '{}' is valid ({} agents).",
                workflow.name,
                workflow.agent_names().len()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Workflow '{}' is invalid: {}", workflow.name, e);
            std::process::exit(1);
        }
    }
}

fn run_agents_command(engine: &WorkflowEngine, command: AgentCommands) -> Result<()> {
    let registry = engine.registry();

    match command {
        AgentCommands::List => {
            println!("Available Agents:\n");
            for (name, spec) in registry.iter() {
                println!("  {} ({}) -> {}", name, spec.model, spec.output_key);
                if !spec.description.is_empty() {
                    println!("    {}", spec.description);
                }
                if !spec.tools.is_empty() {
                    println!("    Tools: {}", spec.tools.join(", "));
                }
            }
        }

        AgentCommands::Show { agent } => match registry.get(&agent) {
            Some(spec) => {
                println!("Agent: {}\n", spec.name);
                println!("Display Name: {}", spec.label());
                if !spec.description.is_empty() {
                    println!("Description: {}", spec.description);
                }
                println!("Model: {}", spec.model);
                println!("Temperature: {}", spec.temperature);
                println!("Reads: {}", spec.input_keys().join(", "));
                println!("Writes: {}", spec.output_key);
                if let Some(ref schema) = spec.output_schema {
                    println!("Output Schema: {}", schema);
                }
                if !spec.tools.is_empty() {
                    println!("Tools: {}", spec.tools.join(", "));
                }
                println!("\nInstruction:\n{}", spec.instruction);
            }
            None => {
                eprintln!("Agent '{}' not found.", agent);
                eprintln!("Use 'campaign-flow agents list' to see available agents.");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn list_tools(engine: &WorkflowEngine) {
    println!("Available Tools:\n");
    for name in engine.tools().names() {
        let Some(tool) = engine.tools().get(name) else {
            continue;
        };
        println!("  {} - {}", tool.name(), tool.description());
        let params = clean_schema(&tool.parameters());
        let rendered = serde_json::to_string_pretty(&params).unwrap_or_default();
        for line in rendered.lines() {
            println!("    {}", line);
        }
        println!();
    }
}
