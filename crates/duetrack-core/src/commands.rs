mod modifiers;
mod task_ops;
mod views;

use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::api::TodoApi;
use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::DueZone;
use crate::quotes::quote_of_the_day;
use crate::render::Renderer;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Waits between refresh ticks.
    fn sleep(&self, interval: Duration) {
        thread::sleep(interval);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything a command needs to run.
pub struct Session<'a> {
    pub api: &'a dyn TodoApi,
    pub cfg: &'a Config,
    pub renderer: &'a Renderer,
    pub zone: DueZone,
    pub clock: &'a dyn Clock,
    pub out: &'a mut dyn Write,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "list",
        "pending",
        "completed",
        "info",
        "edit",
        "modify",
        "done",
        "undone",
        "delete",
        "due",
        "watch",
        "quote",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(session, inv), fields(command = %inv.command))]
pub fn dispatch(session: &mut Session<'_>, inv: Invocation) -> anyhow::Result<()> {
    let command = inv.command.as_str();

    debug!(
        command,
        filter = ?inv.filter_terms,
        args = ?inv.command_args,
        zone = %session.zone.name(),
        "dispatching command"
    );

    match command {
        "add" => task_ops::cmd_add(session, &inv.command_args),
        "list" | "pending" | "completed" => views::cmd_list(session, command, &inv.filter_terms),
        "info" => views::cmd_info(session, &inv.filter_terms),
        "edit" | "modify" => task_ops::cmd_edit(session, &inv.filter_terms, &inv.command_args),
        "done" => task_ops::cmd_set_completed(session, &inv.filter_terms, true),
        "undone" => task_ops::cmd_set_completed(session, &inv.filter_terms, false),
        "delete" => task_ops::cmd_delete(session, &inv.filter_terms),
        "due" => views::cmd_due(session, &inv.command_args),
        "watch" => views::cmd_watch(session, &inv.filter_terms, &inv.command_args),
        "quote" => cmd_quote(session),
        "_show" => cmd_show(session),
        "help" => cmd_help(session),
        "version" => {
            writeln!(session.out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn cmd_quote(session: &mut Session<'_>) -> anyhow::Result<()> {
    let today = session.zone.today(session.clock.now());
    session
        .renderer
        .print_quote(&mut session.out, quote_of_the_day(today))
}

fn cmd_show(session: &mut Session<'_>) -> anyhow::Result<()> {
    for (k, v) in session.cfg.iter() {
        writeln!(session.out, "{k}={v}")?;
    }
    writeln!(session.out, "timezone={}", session.zone.name())?;
    Ok(())
}

fn cmd_help(session: &mut Session<'_>) -> anyhow::Result<()> {
    writeln!(
        session.out,
        "usage: duetrack [options] [filter] <command> [args]\n\
         \n\
         commands:\n  \
         add <title> desc:<text> date:<date> time:<time> [pri:<High|Medium|Low>]\n  \
         list | pending | completed      show todos with time left\n  \
         info                            show details of matching todos\n  \
         edit <title:|desc:|date:|time:|pri:>...\n  \
         done | undone                   mark matching todos (un)completed\n  \
         delete                          delete matching todos\n  \
         due <date> <time>               print the countdown for a due date/time\n  \
         watch [ticks:N]                 refresh the pending list every refresh.interval seconds\n  \
         quote                           quote of the day\n\
         \n\
         filter terms: <id>[,<id>...] status:<pending|completed|all> pri:<p> +overdue -overdue <text>"
    )?;
    Ok(())
}
