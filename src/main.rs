use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use stepflow_config::FlowVersion;
use stepflow_graph::{
  ClipboardPayload, FlowOperation, LinkSlot, PasteLocation, PasteOutcome, StepLocation,
  apply_operations, bulk_delete, default_paste_location, paste, toggle_skip, validate, walk,
};
use stepflow_migrations::{MigrationPipeline, load_flow_version};

/// Stepflow - inspect, migrate and edit workflow step graphs
#[derive(Parser)]
#[command(name = "stepflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Log filter, e.g. "debug" or "stepflow_graph=debug" (overrides RUST_LOG)
  #[arg(long, global = true, env = "STEPFLOW_LOG")]
  log_level: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Migrate a flow version to the current schema and print it
  Migrate {
    /// Path to the flow version JSON ("-" for stdin)
    flow_file: PathBuf,
  },

  /// Print the step tree of a flow version
  Show {
    /// Path to the flow version JSON ("-" for stdin)
    flow_file: PathBuf,
  },

  /// Check the structural invariants of a flow version
  Validate {
    /// Path to the flow version JSON ("-" for stdin)
    flow_file: PathBuf,
  },

  /// Print a clipboard payload for the selected steps
  Copy {
    /// Path to the flow version JSON ("-" for stdin)
    flow_file: PathBuf,

    /// Steps to copy
    #[arg(long = "step", required = true)]
    steps: Vec<String>,
  },

  /// Paste a clipboard payload into a flow version and print the result
  Paste {
    /// Path to the flow version JSON ("-" for stdin)
    flow_file: PathBuf,

    /// Path to the clipboard payload ("-" for stdin)
    payload_file: PathBuf,

    /// Step to paste after (default: end of the main chain)
    #[arg(long)]
    after: Option<String>,

    /// Paste at the head of this branch of `--after` instead of after it
    #[arg(long, requires = "after")]
    branch: Option<usize>,
  },

  /// Delete steps (with their branch contents) and print the result
  Delete {
    /// Path to the flow version JSON ("-" for stdin)
    flow_file: PathBuf,

    /// Steps to delete
    #[arg(long = "step", required = true)]
    steps: Vec<String>,
  },

  /// Toggle `skip` on the selected steps and print the result
  ToggleSkip {
    /// Path to the flow version JSON ("-" for stdin)
    flow_file: PathBuf,

    /// Steps to toggle
    #[arg(long = "step", required = true)]
    steps: Vec<String>,
  },

  /// Apply a JSON list of operations and print the result
  Apply {
    /// Path to the flow version JSON ("-" for stdin)
    flow_file: PathBuf,

    /// Path to the operations JSON ("-" for stdin)
    operations_file: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.log_level.as_deref());

  let pipeline = MigrationPipeline::standard();

  match cli.command {
    Some(Commands::Migrate { flow_file }) => {
      let flow = load_flow(&flow_file, &pipeline)?;
      print_json(&flow)?;
    }
    Some(Commands::Show { flow_file }) => {
      let flow = load_flow(&flow_file, &pipeline)?;
      print_tree(&flow);
    }
    Some(Commands::Validate { flow_file }) => {
      let flow = load_flow(&flow_file, &pipeline)?;
      validate(&flow).with_context(|| format!("flow version '{}' is invalid", flow.id))?;
      println!("flow version '{}' is valid", flow.id);
    }
    Some(Commands::Copy { flow_file, steps }) => {
      let flow = load_flow(&flow_file, &pipeline)?;
      let payload = ClipboardPayload::copy(&flow, &steps).context("failed to copy steps")?;
      print_json(&payload)?;
    }
    Some(Commands::Paste {
      flow_file,
      payload_file,
      after,
      branch,
    }) => {
      let flow = load_flow(&flow_file, &pipeline)?;
      let raw = read_input(&payload_file)?;
      let location = match after {
        Some(parent_step_name) => PasteLocation {
          parent_step_name,
          location: match branch {
            Some(branch_index) => StepLocation::InsideBranch { branch_index },
            None => StepLocation::After,
          },
        },
        None => default_paste_location(&flow).context("cannot paste into an empty flow")?,
      };

      match paste(&raw, &flow, &location) {
        PasteOutcome::Operations(operations) => {
          debug!(operations = operations.len(), "paste_planned");
          let pasted = apply_operations(&flow, &operations).context("failed to paste steps")?;
          print_json(&pasted)?;
        }
        PasteOutcome::NothingToPaste => bail!("clipboard payload is not a copied step list"),
      }
    }
    Some(Commands::Delete { flow_file, steps }) => {
      let flow = load_flow(&flow_file, &pipeline)?;
      let outcome = bulk_delete(&flow, &steps, None).context("failed to delete steps")?;
      print_json(&outcome.flow)?;
    }
    Some(Commands::ToggleSkip { flow_file, steps }) => {
      let flow = load_flow(&flow_file, &pipeline)?;
      let toggled = toggle_skip(&flow, &steps).context("failed to toggle skip")?;
      print_json(&toggled)?;
    }
    Some(Commands::Apply {
      flow_file,
      operations_file,
    }) => {
      let flow = load_flow(&flow_file, &pipeline)?;
      let operations: Vec<FlowOperation> = serde_json::from_str(&read_input(&operations_file)?)
        .with_context(|| {
          format!(
            "failed to parse operations file: {}",
            operations_file.display()
          )
        })?;
      let next = apply_operations(&flow, &operations).context("failed to apply operations")?;
      print_json(&next)?;
    }
    None => {
      println!("stepflow - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing(log_level: Option<&str>) {
  let filter = match log_level {
    Some(level) => EnvFilter::new(level),
    None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(io::stderr)
    .init();
}

fn read_input(path: &Path) -> Result<String> {
  if path.as_os_str() == "-" {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read from stdin")?;
    return Ok(input);
  }
  std::fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

fn load_flow(path: &Path, pipeline: &MigrationPipeline) -> Result<FlowVersion> {
  let raw: serde_json::Value = serde_json::from_str(&read_input(path)?)
    .with_context(|| format!("failed to parse flow file: {}", path.display()))?;
  load_flow_version(raw, pipeline)
    .with_context(|| format!("failed to load flow file: {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_tree(flow: &FlowVersion) {
  println!(
    "{} (schema {})",
    flow.id,
    flow.schema_version.as_deref().unwrap_or("none")
  );

  let mut depths: HashMap<&str, usize> = HashMap::new();
  for found in walk(flow) {
    let (depth, label) = match found.parent {
      None => (0, String::new()),
      Some(link) => {
        let parent_depth = depths.get(link.step.name.as_str()).copied().unwrap_or(0);
        match link.slot {
          LinkSlot::Next => (parent_depth, String::new()),
          LinkSlot::Branch(index) => {
            let branch = link
              .step
              .branches
              .get(index)
              .map(|b| b.branch_name.as_str())
              .unwrap_or("?");
            (parent_depth + 1, format!("[{branch}] "))
          }
        }
      }
    };
    depths.insert(found.step.name.as_str(), depth);

    let skip = if found.step.skip { " (skipped)" } else { "" };
    println!(
      "{}{label}{} <{}>{skip}",
      "  ".repeat(depth + 1),
      found.step.name,
      found.step.kind
    );
  }
}
