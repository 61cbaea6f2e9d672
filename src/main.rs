use clap::Parser;
use log::*;
use std::rc::Rc;

use release_train::{
    Orchestrator, Result,
    cli::Args,
    clipboard::{Clipboard, CommandClipboard},
    config::ReleaseConfig,
    git::{GitRepository, VersionControl},
    process::{ProcessRunner, ShellRunner},
};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("release_train")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli_args = Args::parse();

    initialize_logger(cli_args.debug)?;

    if let Some(selector) = &cli_args.selector {
        println!("{selector}");
    }

    let Some(workflow) = cli_args.workflow() else {
        debug!("no workflow selected");
        return Ok(());
    };

    let config = ReleaseConfig::load(cli_args.config.as_deref())?
        .with_overrides(cli_args.overrides())
        .resolve()?;

    let vcs: Rc<dyn VersionControl> = Rc::new(GitRepository::open(
        &config.project_path,
        config.remote.clone(),
        config.git_token.clone(),
    )?);
    let runner: Rc<dyn ProcessRunner> = Rc::new(ShellRunner);
    let clipboard: Rc<dyn Clipboard> =
        Rc::new(CommandClipboard::new(config.clipboard.clone()));

    let orchestrator = Orchestrator::builder()
        .config(Rc::new(config))
        .vcs(vcs)
        .runner(runner)
        .clipboard(clipboard)
        .build()?;

    let outcome = orchestrator.run(workflow).await?;
    info!("{outcome}");

    Ok(())
}
