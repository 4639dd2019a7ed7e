pub mod calendar;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod render;
pub mod stats;
pub mod storage;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::info;

pub use crate::error::TaskError;
pub use crate::filter::FilterKey;
pub use crate::task::{
  Priority,
  Task,
  TaskDraft,
  TaskId,
  TaskPatch
};

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
    "starting taskmgr CLI"
  );

  let cfg = config::Config::load(
    cli.config.as_deref()
  )?;

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let backend =
    storage::FileStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open task storage \
           at {}",
          data_dir.display()
        )
      })?;
  let store =
    store::TaskStore::load(backend);

  let renderer =
    render::Renderer::for_stdout();

  match cfg.zone() {
    | config::Zone::Local => {
      commands::dispatch(
        store,
        &cfg,
        &renderer,
        cli.command,
        chrono::Local
      )?
    }
    | config::Zone::Named(tz) => {
      commands::dispatch(
        store,
        &cfg,
        &renderer,
        cli.command,
        tz
      )?
    }
  }

  info!("done");
  Ok(())
}
