//! Command-line host for the spyglass engine: registers the sample world
//! model and runs inspection chains from argv.
//!
//! Set `SPYGLASS_LOG` (an `EnvFilter` directive, e.g. `debug`) to see engine
//! tracing on stderr.

mod model;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spyglass_core::Engine;

#[derive(Parser)]
#[command(name = "spyglass", about = "Inspect live objects with chained method calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an operation chain, e.g. `run server getWorld overworld getTime`
    Run {
        /// Root object: `server`, `world:<name>`, or `player:<name>`
        root: String,
        /// Operation and argument tokens
        tokens: Vec<String>,
        /// Principal the chain runs as (player arguments resolve `me` to it)
        #[arg(long = "as", default_value = "console")]
        caller: String,
        /// Print every intermediate step before the final value
        #[arg(long)]
        steps: bool,
    },
    /// List the registered types
    Types,
    /// List the operations of one type, e.g. `methods world`
    Methods { ty: String },
}

fn main() -> Result<()> {
    if let Ok(filter) = EnvFilter::try_from_env("SPYGLASS_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let mut engine = Engine::new();
    let server = model::install(&mut engine)?;

    match cli.command {
        Commands::Run { root, tokens, caller, steps } => {
            let Some(receiver) = model::root_value(&server, &root) else {
                bail!("unknown root `{root}` (try `server`, `world:overworld`, `player:Steve`)");
            };
            let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
            let caller = model::CliCaller(caller);
            let outcome = engine.run_chain(&tokens, receiver, Some(&caller))?;
            if steps {
                for (i, frame) in outcome.frames.iter().enumerate() {
                    println!(
                        "#{i} {}({}) -> {}",
                        frame.operation,
                        frame.arg_tokens.join(", "),
                        engine.encode(&frame.result)
                    );
                }
            }
            println!("{}", outcome.rendered);
        }
        Commands::Types => {
            for key in engine.schemas().keys() {
                println!("{key}");
            }
        }
        Commands::Methods { ty } => {
            let Some(key) = engine.schemas().keys().into_iter().find(|k| k.as_str() == ty) else {
                bail!("unknown type `{ty}`");
            };
            let index = engine.index_of(key);
            if index.is_empty() {
                println!("{ty}: no operations");
                return Ok(());
            }
            for name in index.operation_names() {
                for overload in index.get(&name).unwrap_or(&[]) {
                    let params: Vec<&str> = overload.params.iter().map(|p| p.as_str()).collect();
                    println!("{name}({})", params.join(", "));
                }
            }
        }
    }
    Ok(())
}
