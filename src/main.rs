use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use flux_store::config::Config;
use flux_store::demo::{items_view_for, nested_tree, DemoActions, DemoStore};
use flux_store::flux::{Binder, Dispatcher, StoreRegistry};
use flux_store::logging::init_tracing;
use flux_store::render::{MarkupRenderer, MountPoint, RenderQueue, Renderer};

#[derive(Debug, Parser)]
#[command(name = "flux-demo", version, about = "Walk through the flux data flow")]
struct Cli {
    /// Config file (default: ~/.config/flux-store/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Press the "Add" button and print the list after each press
    Add {
        /// How many times to dispatch `add`
        #[arg(long, default_value_t = 1)]
        times: u32,
    },
    /// Print the hand-built nested element tree
    Tree,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.logging);

    match cli.command {
        Command::Add { times } => run_add(config, times),
        Command::Tree => {
            let mut renderer = MarkupRenderer::new();
            let mount = MountPoint::from("root");
            renderer.render(&nested_tree(), &mount)?;
            println!("{}", renderer.surface(&mount).unwrap_or_default());
            Ok(())
        }
    }
}

fn run_add(config: Config, times: u32) -> anyhow::Result<()> {
    let registry = StoreRegistry::new(Dispatcher::new(), config);
    let store = registry.get_instance::<DemoStore>()?;
    let actions = DemoActions::new(registry.dispatcher().clone());

    let binder = Binder::new(RenderQueue::new());
    let mount = MountPoint::from("root");
    let view = items_view_for(&binder, &store, mount.clone());
    let mut renderer = MarkupRenderer::new();

    binder.queue().flush(&mut renderer)?;
    println!("{}", renderer.surface(&mount).unwrap_or_default());

    for press in 1..=times {
        actions
            .add()
            .with_context(|| format!("add #{press} failed"))?;
        binder.queue().flush(&mut renderer)?;
        println!("{}", renderer.surface(&mount).unwrap_or_default());
    }

    view.unbind();
    tracing::info!(presses = times, renders = renderer.renders(), "Done");
    Ok(())
}
