use crate::definition::settings::BuildSettings;
use crate::definition::Recipe;
use crate::engine::build_state::BuildState;
use crate::engine::environment::EnvFlags;
use crate::engine::{Engine, EngineSettings, Stage};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

mod definition;
mod engine;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about = "Runs the lifecycle of a header-only CMake library recipe", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Recipe describing the package
    #[arg(short, long, default_value = "recipe.kdl", global = true)]
    recipe: PathBuf,

    /// Source tree, defaults to the folder holding the recipe
    #[arg(long, global = true)]
    source_folder: Option<PathBuf>,

    #[arg(long, default_value = "build", global = true)]
    build_folder: PathBuf,

    #[arg(long, default_value = "package", global = true)]
    package_folder: PathBuf,

    #[arg(long, default_value = "export", global = true)]
    export_folder: PathBuf,

    /// Build setting as key=value, e.g. `-s compiler.version=15`
    #[arg(short = 's', long = "setting", global = true)]
    settings: Vec<String>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Copy the recipe, its exports and the exported sources, and snapshot vcs metadata
    Export,
    /// Check the build settings against the recipe's compiler requirements
    Configure,
    /// Print the dependencies declared for this invocation
    Requirements,
    /// Configure, build, install and optionally test with CMake
    Build,
    /// Copy headers and licenses into the package folder
    Package,
    /// Print the binary compatibility id of the package
    PackageId,
    /// Run every stage up to the package id
    Create,
}

impl Commands {
    fn stage(self) -> Option<Stage> {
        Some(match self {
            Commands::Export => Stage::Export,
            Commands::Configure => Stage::Configure,
            Commands::Requirements => Stage::Requirements,
            Commands::Build => Stage::Build,
            Commands::Package => Stage::Package,
            Commands::PackageId => Stage::PackageId,
            Commands::Create => return None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let recipe = Recipe::load(&cli.recipe).await?;
    let settings = BuildSettings::from_pairs(&cli.settings)?;
    let flags = EnvFlags::from_env(&recipe.testing);

    info!(
        name = %recipe.metadata.name,
        version = %recipe.metadata.version,
        testing = flags.testing(),
        "loaded recipe"
    );

    let engine = Engine::new(EngineSettings::new(
        cli.recipe,
        cli.source_folder,
        cli.build_folder,
        cli.package_folder,
        cli.export_folder,
    )?);

    let mut state = BuildState::new(&recipe, &settings, flags);

    match cli.command.stage() {
        Some(stage) => engine.run(&mut state, stage).await?,
        None => {
            engine.create(&mut state).await?;
        }
    }

    if state.completed.contains(&Stage::Requirements) {
        for requirement in state.requirements.iter() {
            println!("{}", requirement);
        }
    }

    if let Some(id) = state.package_id {
        println!("{}", id);
    }

    Ok(())
}
