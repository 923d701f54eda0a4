//! pk - command-line interface for the Otherside VFX package-repository
//! manager.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pk_core::{
    BuildContext, ConsoleConfirmer, DeleteOutcome, Granularity, PackageManager, PipInstaller,
    PkConfig, RepoKind, RepoSummary, RezBuildRunner, UpgradeTarget,
};

#[derive(Parser)]
#[command(name = "pk")]
#[command(version)]
#[command(about = "Create, upgrade, read and delete studio package versions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new package version in a repository
    Create {
        /// Package name
        #[arg(long)]
        name: String,

        /// Version to create (e.g. 0.0.1, or a vendor version like 13.2v5)
        #[arg(long)]
        version: String,

        /// Target repository
        #[arg(long, default_value = "dev")]
        repo: String,
    },

    /// Version up a package, by granularity or to an explicit version
    Upgrade {
        /// Package name
        #[arg(long)]
        name: String,

        /// Version component to bump: major, minor or patch
        #[arg(long = "upgrade_type", conflicts_with = "version")]
        upgrade_type: Option<String>,

        /// Explicit version to upgrade to (required for vendor packages)
        #[arg(long)]
        version: Option<String>,

        /// Target repository
        #[arg(long, default_value = "dev")]
        repo: String,
    },

    /// Delete one version of a package, or the entire package
    Delete {
        /// Package name
        #[arg(long)]
        name: String,

        /// Version to delete; omit to delete every version
        #[arg(long)]
        version: Option<String>,

        /// Target repository
        #[arg(long, default_value = "dev")]
        repo: String,
    },

    /// Summarize a package across all repositories
    Read {
        /// Package name
        #[arg(long)]
        name: String,
    },

    /// Install a third-party package from the package index into the store
    Install {
        /// Package name on the index
        #[arg(long)]
        name: String,

        /// Exact version to install
        #[arg(long)]
        version: String,
    },

    /// Run the external build for a package version
    Build {
        /// Package name
        #[arg(long)]
        name: String,

        /// Version to build
        #[arg(long)]
        version: String,

        /// Build context: stage or show
        #[arg(long, default_value = "stage")]
        context: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PkConfig::from_env().context("failed to load configuration")?;
    let mut manager = PackageManager::new(
        config,
        Box::new(ConsoleConfirmer),
        Box::new(RezBuildRunner),
        Box::new(PipInstaller),
    );

    match cli.command {
        Commands::Create {
            name,
            version,
            repo,
        } => {
            let repo: RepoKind = repo.parse()?;
            println!("Checking for {name}-{version} in the {repo} repository");
            let path = manager.create(&name, &version, repo)?;
            println!("Created {name}-{version} at {}", path.display());
        }

        Commands::Upgrade {
            name,
            upgrade_type,
            version,
            repo,
        } => {
            let repo: RepoKind = repo.parse()?;
            let target = match (version, upgrade_type) {
                (Some(version), _) => UpgradeTarget::Explicit(version),
                (None, Some(granularity)) => {
                    UpgradeTarget::Bump(granularity.parse::<Granularity>()?)
                }
                (None, None) => bail!("supply --upgrade_type or --version"),
            };
            let path = manager.upgrade(&name, &target, repo)?;
            println!("Versioned up {name} to {}", path.display());
        }

        Commands::Delete {
            name,
            version,
            repo,
        } => {
            let repo: RepoKind = repo.parse()?;
            match manager.delete(&name, repo, version.as_deref())? {
                DeleteOutcome::Deleted(path) => println!("Deleted {}", path.display()),
                DeleteOutcome::Declined => println!("Exiting delete operation."),
            }
        }

        Commands::Read { name } => {
            let summaries = manager.read(&name)?;
            if summaries.is_empty() {
                println!("{name} was not found in any repository");
            }
            for summary in summaries {
                print_summary(&summary);
            }
        }

        Commands::Install { name, version } => {
            println!("Installing {name}-{version} from the package index");
            let target = manager.install(&name, &version)?;
            println!(
                "{name} and its dependencies have been installed at {}",
                target.display()
            );
        }

        Commands::Build {
            name,
            version,
            context,
        } => {
            let context: BuildContext = context.parse()?;
            let report = manager.build(&name, &version, context)?;
            print!("{}", report.output);
            println!("Built {name}-{version} for {context}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}

fn print_summary(summary: &RepoSummary) {
    println!("versions in {}:", summary.repo);
    println!("\t{}", summary.versions.join(", "));

    println!("DESCRIPTION:");
    match &summary.description {
        Some(description) => {
            for line in description.lines() {
                println!("\t{line}");
            }
        }
        None => println!("\tNo description found."),
    }

    println!("REQUIRES:");
    if summary.requires.is_empty() {
        println!("\tNone");
    } else {
        println!("\t{}", summary.requires.join(", "));
    }
}
