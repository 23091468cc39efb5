//! `studio`: export Studio scenes to PNG and lint them.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use studio_cli::{ExportArgs, LintArgs, run_export, run_lint};

/// Marketing Studio scene tools
#[derive(Parser)]
#[command(name = "studio")]
#[command(about = "Render and check Marketing Studio scenes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rasterize a scene to PNG
    Export(ExportArgs),

    /// Report style data that would render with fallbacks
    Lint(LintArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Export(args) => {
            let out = run_export(&args).await?;
            println!(
                "wrote {} ({}x{}, {} bytes)",
                out.path.display(),
                out.artifact.width,
                out.artifact.height,
                out.artifact.png.len()
            );
        }
        Commands::Lint(args) => {
            let report = run_lint(&args)?;
            print!("{}", report.render());
            if args.deny_warnings && report.warnings() > 0 {
                bail!("{} warning(s) in {}", report.warnings(), args.scene.display());
            }
        }
    }
    Ok(())
}
