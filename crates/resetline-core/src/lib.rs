pub mod catalog;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod countdown;
pub mod datastore;
pub mod error;
pub mod key;
pub mod occurrence;
pub mod render;
pub mod rule;
pub mod window;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use catalog::{
  Catalog,
  Event
};
pub use clock::ReferenceClock;
pub use countdown::next_reset;
pub use error::ScheduleError;
pub use key::occurrence_key;
pub use occurrence::{
  Occurrence,
  occurrences
};
pub use rule::RecurrenceRule;
pub use window::Window;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting resetline"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  let overrides = cli.config_overrides();
  debug!(?overrides, "command line overrides");
  cfg.apply_overrides(overrides)?;

  let clock = cfg.reference_clock()?;
  info!(
    offset_minutes =
      clock.offset_minutes(),
    "reference clock configured"
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    datastore::CompletionStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open completion \
         store at {}",
        data_dir.display()
      )
    })?;

  let catalog_path = cfg.catalog_path();
  let catalog =
    catalog::Catalog::load(
      &catalog_path
    )?;

  let renderer =
    render::Renderer::new(&cfg);

  let mut session = commands::Session {
    cfg,
    clock,
    catalog,
    store,
    renderer
  };

  commands::dispatch(
    &mut session,
    cli.command()
  )?;

  info!("done");
  Ok(())
}
