pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod countdown;
pub mod datetime;
pub mod filter;
pub mod quotes;
pub mod render;
pub mod task;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting duetrack CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.duerc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  if let Some(url) = cli.api_url {
    cfg.apply_overrides([(
      "api.url".to_string(),
      url
    )]);
  }

  let api =
    api::HttpTodoApi::from_config(&cfg)
      .context(
        "failed to set up todo API \
         client"
      )?;
  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  let stdout = io::stdout();
  let mut out = stdout.lock();
  let mut session = commands::Session {
    api:      &api,
    cfg:      &cfg,
    renderer: &renderer,
    zone:     datetime::due_zone(),
    clock:    &commands::SystemClock,
    out:      &mut out
  };

  commands::dispatch(
    &mut session,
    inv
  )?;

  info!("done");
  Ok(())
}
