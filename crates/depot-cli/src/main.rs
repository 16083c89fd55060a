use clap::Parser;
use cli::{Args, Commands, SymbolsAction};
use depot_config::config::generate_default_config;
use depot_core::DepotResult;
use logging::setup_logging;
use tracing::debug;
use utils::{config_source, load_context};

mod check;
mod cli;
mod logging;
mod package;
mod search;
mod symbols;
mod utils;

async fn handle_cli() -> DepotResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        utils::disable_color();
    }

    if let Commands::DefConfig = args.command {
        let source = config_source(args.config.as_deref())?;
        generate_default_config(source.path())?;
        return Ok(());
    }

    let ctx = load_context(args.config.as_deref(), args.command.runs_startup())?;
    debug!(keys = ctx.configuration().len(), "configuration loaded");

    match args.command {
        Commands::DefConfig => unreachable!(),
        Commands::Check => check::check(&ctx)?,
        Commands::Providers => check::display_providers(&ctx)?,
        Commands::Migrate => check::migrate(&ctx)?,
        Commands::Package { action } => package::handle_package(&ctx, action)?,
        Commands::Search {
            query,
            skip,
            take,
            all,
        } => search::search_packages(&ctx, query, skip, take, all).await?,
        Commands::Symbols { action } => {
            match action {
                SymbolsAction::Push {
                    filename,
                    key,
                    file,
                } => symbols::push_symbols(&ctx, &filename, &key, &file).await?,
                SymbolsAction::Pull {
                    filename,
                    key,
                    output,
                } => symbols::pull_symbols(&ctx, &filename, &key, output.as_deref()).await?,
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
