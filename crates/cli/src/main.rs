use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use improto_descriptor::{decode_fields, decode_oneofs, DescriptorArgs, DescriptorRegistry, MessageDescriptor};
use improto_runtime::{dump, hash_message, Message};
use improto_store::{JspbLayout, MessageData};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "improtoctl", version, about = "Inspect improto descriptors and message data")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// JSON file mapping type id to descriptor arguments
    #[arg(long = "types", env = "IMPROTO_TYPES", global = true)]
    types: Option<PathBuf>,

    /// Pivot for JSPB arrays without a spillover object
    #[arg(long = "pivot", env = "IMPROTO_PIVOT", global = true)]
    pivot: Option<u32>,

    /// Print collected metrics to stderr on exit
    #[arg(long = "metrics", action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode an encoded field descriptor, or the descriptor of a registered type
    Decode {
        /// Encoded field string
        #[arg(conflicts_with = "type_id")]
        encoded: Option<String>,
        /// Registered type id
        #[arg(long = "type")]
        type_id: Option<String>,
    },
    /// Decode an encoded oneof-groups string
    Oneofs {
        encoded: String,
    },
    /// Hash JSPB message data (literal JSON or @file)
    Hash {
        data: String,
        /// Registered type id; supplies the message id layout
        #[arg(long = "type")]
        type_id: Option<String>,
    },
    /// Compare two JSPB messages of one type
    Equals {
        #[arg(long = "type")]
        type_id: String,
        left: String,
        right: String,
    },
    /// Render a JSPB message by field number
    Dump {
        #[arg(long = "type")]
        type_id: String,
        data: String,
    },
}

fn init_tracing() {
    let env = std::env::var("IMPROTO_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics(enabled: bool) -> Option<metrics_exporter_prometheus::PrometheusHandle> {
    if !enabled {
        return None;
    }
    match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "failed to install metrics recorder");
            None
        }
    }
}

/// Register every type in `path` with the process-wide registry.
fn load_types(path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading types file {}", path.display()))?;
    let types: BTreeMap<String, DescriptorArgs> =
        serde_json::from_str(&text).with_context(|| format!("parsing types file {}", path.display()))?;
    let registry = DescriptorRegistry::global();
    for (type_id, args) in types {
        registry.register(&type_id, args).with_context(|| format!("registering {type_id}"))?;
    }
    debug!(path = %path.display(), types = registry.len(), "loaded types");
    Ok(registry.len())
}

/// Literal JSON, or `@path` to read it from a file.
fn read_json(arg: &str) -> Result<serde_json::Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).context("parsing JSPB JSON")
}

fn descriptor(type_id: &str) -> Result<Arc<MessageDescriptor>> {
    DescriptorRegistry::global().get(type_id).with_context(|| format!("looking up type {type_id}"))
}

fn message(type_id: &str, data: &str, pivot: Option<u32>) -> Result<Message> {
    let json = read_json(data)?;
    Message::from_jspb(descriptor(type_id)?, &json, pivot).with_context(|| format!("reading {type_id} data"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let metrics = init_metrics(cli.metrics);
    if let Some(path) = &cli.types {
        let n = load_types(path)?;
        info!(types = n, "types registered");
    }
    let registry = DescriptorRegistry::global();
    metrics::counter!("improtoctl_commands_total", 1u64);

    match cli.command {
        Commands::Decode { encoded, type_id } => match (encoded, type_id) {
            (Some(encoded), _) => {
                let fields = decode_fields(&encoded).context("decoding field descriptor")?;
                match cli.output {
                    Output::Human => {
                        println!("NUMBER  TYPE      REPEATED  MAP    MODIFIERS");
                        for f in &fields {
                            println!("{:<7} {:<9} {:<9} {:<6} {:#05b}", f.number, f.field_type, f.repeated, f.map, f.modifiers.bits());
                        }
                    }
                    Output::Json => print_json(&fields)?,
                }
            }
            (None, Some(type_id)) => {
                let desc = descriptor(&type_id)?;
                match cli.output {
                    Output::Human => {
                        println!("{} ({} fields)", desc.type_id(), desc.len());
                        desc.for_each_field(|f| {
                            let sub = f.submessage_type().unwrap_or("-");
                            println!("  {:<7} {:<9} repeated={} map={} ext={} -> {}", f.number, f.field_type, f.repeated, f.map, f.extension, sub);
                        });
                        for (i, group) in desc.oneofs().iter().enumerate() {
                            println!("  oneof #{i}: {group:?}");
                        }
                    }
                    Output::Json => print_json(&*desc)?,
                }
            }
            (None, None) => bail!("decode needs an encoded string or --type"),
        },
        Commands::Oneofs { encoded } => {
            let groups = decode_oneofs(&encoded).context("decoding oneof groups")?;
            match cli.output {
                Output::Human => {
                    for (i, group) in groups.iter().enumerate() {
                        println!("#{i}: {group:?}");
                    }
                }
                Output::Json => print_json(&groups)?,
            }
        }
        Commands::Hash { data, type_id } => {
            let hash = match type_id {
                Some(type_id) => message(&type_id, &data, cli.pivot)?.hash_code(),
                None => {
                    let layout = JspbLayout { message_id: false, pivot: cli.pivot };
                    hash_message(&MessageData::from_jspb(&read_json(&data)?, layout).context("reading message data")?)
                }
            };
            match cli.output {
                Output::Human => println!("{hash}"),
                Output::Json => print_json(&serde_json::json!({ "hash": hash }))?,
            }
        }
        Commands::Equals { type_id, left, right } => {
            let (a, b) = (message(&type_id, &left, cli.pivot)?, message(&type_id, &right, cli.pivot)?);
            let equal = a.equals(&b, registry).context("comparing messages")?;
            match cli.output {
                Output::Human => println!("{equal}"),
                Output::Json => print_json(&serde_json::json!({ "equal": equal, "hashes": [a.hash_code(), b.hash_code()] }))?,
            }
        }
        Commands::Dump { type_id, data } => {
            let m = message(&type_id, &data, cli.pivot)?;
            let out = dump(&m, registry).context("dumping message")?;
            match cli.output {
                Output::Human => println!("{out}"),
                Output::Json => print_json(&out)?,
            }
        }
    }

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
