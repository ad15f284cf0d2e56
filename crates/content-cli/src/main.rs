//! content - addon catalog, build chain and mounter

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use content_cli::cmd::{self, Context};
use content_cli::{
    AddonCommands, AssetCommands, BundleCommands, Cli, Commands, CompressionCommands,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        cmd::completions::completions(shell);
        return Ok(());
    }

    let ctx = Context::new(cli.root, cli.quiet)?;

    match cli.command {
        Commands::Addon { command } => match command {
            AddonCommands::Add {
                name,
                description,
                author,
            } => cmd::addon::add(&ctx, &name, description, author).await,
            AddonCommands::Remove { name } => cmd::addon::remove(&ctx, &name).await,
            AddonCommands::List => cmd::addon::list(&ctx).await,
        },
        Commands::Bundle { command } => match command {
            BundleCommands::Add { addon, name } => cmd::bundle::add(&ctx, &addon, &name).await,
            BundleCommands::Remove { addon, name } => {
                cmd::bundle::remove(&ctx, &addon, &name).await
            }
            BundleCommands::Slice {
                addon,
                name,
                parts,
                max,
            } => cmd::bundle::slice(&ctx, &addon, &name, parts, max).await,
            BundleCommands::Split {
                addon,
                sources,
                into,
            } => cmd::bundle::split(&ctx, &addon, &sources, &into).await,
            BundleCommands::Move { name, to } => cmd::bundle::move_to(&ctx, &name, &to).await,
        },
        Commands::Asset { command } => match command {
            AssetCommands::Add {
                addon,
                bundle,
                path,
                name,
                type_name,
                base_type,
                id,
            } => {
                let options = cmd::asset::AddOptions {
                    path,
                    name,
                    type_name,
                    base_type,
                    id,
                };
                cmd::asset::add(&ctx, &addon, &bundle, &options).await
            }
            AssetCommands::Remove { id } => cmd::asset::remove(&ctx, &id).await,
            AssetCommands::Move { id, addon, bundle } => {
                cmd::asset::move_to(&ctx, &id, &addon, &bundle).await
            }
        },
        Commands::Compression { command } => match command {
            CompressionCommands::Set {
                addon,
                bundle,
                mode,
            } => cmd::compression::set(&ctx, &addon, &bundle, mode).await,
            CompressionCommands::Get { addon, bundle } => {
                cmd::compression::get(&ctx, &addon, &bundle).await
            }
        },
        Commands::Build {
            project,
            addon,
            bundle,
        } => cmd::build::build(&ctx, &project, addon, bundle).await,
        Commands::Report => cmd::report::report(&ctx).await,
        Commands::Detect => cmd::detect::detect(&ctx).await,
        Commands::Mount { addons, with_deps } => cmd::mount::mount(&ctx, &addons, with_deps).await,
        Commands::Completions { .. } => Ok(()),
    }
}
