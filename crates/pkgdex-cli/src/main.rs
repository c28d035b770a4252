//! pkgdex CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pkgdex_cli::cmd::{self, Context};
use pkgdex_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context::new(cli.index, cli.quiet);

    match cli.command {
        Commands::Validate { paths } => cmd::validate::validate(&ctx, &paths),
        Commands::Build {
            root,
            schema,
            prune,
        } => cmd::build::build(&ctx, root.root.as_deref(), schema, prune),
        Commands::Add { manifest, root } => cmd::add::add(&ctx, &manifest, root.root.as_deref()),
        Commands::Update { manifest, root } => {
            cmd::add::update(&ctx, &manifest, root.root.as_deref())
        }
        Commands::Remove {
            id,
            version,
            channel,
        } => cmd::remove::remove(&ctx, &id, &version, &channel),
        Commands::Search {
            query,
            match_type,
            inclusions,
            filters,
            count,
            json,
        } => cmd::search::search(
            &ctx,
            &cmd::search::SearchArgs {
                query,
                match_type,
                inclusions,
                filters,
                count,
                json,
            },
        ),
        Commands::Show {
            id,
            version,
            channel,
        } => cmd::show::show(&ctx, &id, version.as_deref(), &channel),
        Commands::Select {
            target,
            version,
            root,
            prefs,
        } => cmd::select::select(&ctx, &target, version.as_deref(), root.root.as_deref(), &prefs),
        Commands::Check => cmd::check::check(&ctx),
        Commands::Package { no_vacuum } => cmd::package::package(&ctx, !no_vacuum),
        Commands::Migrate { version } => cmd::migrate::migrate(&ctx, version),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
