use std::{fs, path::PathBuf};

use chatflow::{
    gateway::{FlowStore, HttpFlowStore, WireFlow},
    graph::validate_flow,
    EditorLimits, Flow, GatewayConfig, NodeRegistry,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "flowctl")]
#[command(about = "Inspect, validate and publish chatbot flows")]
struct Args {
    /// Backend base URL (defaults to CHATFLOW_API_BASE_URL or http://localhost:3002)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token (defaults to CHATFLOW_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// YAML file overriding editor limits
    #[arg(long, global = true)]
    limits: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored flows
    List,
    /// Print one flow
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },
    /// Delete a flow
    Delete { id: String },
    /// Check a flow document without contacting the backend
    Validate { file: PathBuf },
    /// Validate a flow document and save it to the backend
    Push { file: PathBuf },
    /// Print the JSON Schema of the flow document
    Schema,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,chatflow=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let limits = match &args.limits {
        Some(path) => EditorLimits::from_file(path)?,
        None => EditorLimits::default(),
    };
    let registry = NodeRegistry::new(limits);

    match args.command {
        Command::Schema => {
            let schema = schemars::schema_for!(WireFlow);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Command::Validate { ref file } => {
            let flow = read_flow(file)?;
            if !report(&flow, &registry) {
                std::process::exit(1);
            }
        }
        Command::List => {
            let store = connect(&args)?;
            for meta in store.list().await? {
                println!("{}\t{}", meta.id, meta.name);
            }
        }
        Command::Show { ref id, format } => {
            let store = connect(&args)?;
            let flow = store.load(id).await?;
            let document = WireFlow::from_flow(&flow)?;
            match format {
                Format::Yaml => print!("{}", serde_yaml::to_string(&document)?),
                Format::Json => println!("{}", serde_json::to_string_pretty(&document)?),
            }
        }
        Command::Delete { ref id } => {
            let store = connect(&args)?;
            store.remove(id).await?;
            println!("deleted {id}");
        }
        Command::Push { ref file } => {
            let flow = read_flow(file)?;
            if !report(&flow, &registry) {
                std::process::exit(1);
            }
            let store = connect(&args)?;
            let saved = store.save(&flow).await?;
            println!("saved {} as {}", saved.name, saved.id.as_str());
        }
    }

    Ok(())
}

fn connect(args: &Args) -> Result<HttpFlowStore, Box<dyn std::error::Error>> {
    let mut config = GatewayConfig::from_env();
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(token) = &args.token {
        config = config.with_api_token(token);
    }
    Ok(HttpFlowStore::from_config(config)?)
}

/// Reads a JSON or YAML flow document. Documents without an id load as unsaved flows.
fn read_flow(path: &PathBuf) -> Result<Flow, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let document: WireFlow = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    Ok(document.into_draft()?)
}

fn report(flow: &Flow, registry: &NodeRegistry) -> bool {
    let problems = validate_flow(flow, registry);
    let violations = flow.invariant_violations();
    for violation in &violations {
        eprintln!("graph: {violation}");
    }
    if problems.is_empty() && violations.is_empty() {
        println!(
            "{}: {} nodes, {} edges, ok",
            flow.name,
            flow.nodes().len(),
            flow.edges().len()
        );
        return true;
    }
    if !problems.is_empty() {
        eprintln!("{problems}");
    }
    false
}
