use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::Session;
use crate::filter::{Filter, Pred, StatusSel};
use crate::task::Todo;

#[instrument(skip(session, filter))]
pub(super) fn select_todos(
    session: &Session<'_>,
    filter: &Filter,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<Todo>> {
    let todos = session.api.list()?;
    let fetched = todos.len();

    let mut rows: Vec<Todo> = todos
        .into_iter()
        .filter(|todo| filter.matches(todo, &session.zone, now))
        .collect();
    sort_by_due(session, &mut rows);

    debug!(fetched, selected = rows.len(), "selected todos");
    Ok(rows)
}

fn sort_by_due(session: &Session<'_>, rows: &mut [Todo]) {
    rows.sort_by_key(|todo| {
        let due = todo.due_instant(&session.zone);
        (due.is_none(), due, todo.id)
    });
}

fn view_filter(view: &str, filter_terms: &[String]) -> anyhow::Result<Filter> {
    let filter = Filter::parse(filter_terms)?;
    if filter.has_status_filter() {
        return Ok(filter);
    }

    Ok(match view {
        "pending" => filter.with(Pred::Status(StatusSel::Pending)),
        "completed" => filter.with(Pred::Status(StatusSel::Completed)),
        _ => filter,
    })
}

fn empty_message(view: &str) -> &'static str {
    match view {
        "pending" => "No pending tasks.",
        "completed" => "No completed tasks.",
        _ => "No tasks.",
    }
}

#[instrument(skip(session, filter_terms))]
pub(super) fn cmd_list(
    session: &mut Session<'_>,
    view: &str,
    filter_terms: &[String],
) -> anyhow::Result<()> {
    info!(view, "command list");

    let filter = view_filter(view, filter_terms)?;
    let now = session.clock.now();
    let rows = select_todos(session, &filter, now)?;
    render_rows(session, view, &rows, now)
}

fn render_rows(
    session: &mut Session<'_>,
    view: &str,
    rows: &[Todo],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    if rows.is_empty() {
        writeln!(session.out, "{}", empty_message(view))?;
        return Ok(());
    }

    session
        .renderer
        .print_todo_table(&mut session.out, rows, &session.zone, now)
}

#[instrument(skip(session, filter_terms))]
pub(super) fn cmd_info(session: &mut Session<'_>, filter_terms: &[String]) -> anyhow::Result<()> {
    info!("command info");

    let filter = Filter::parse(filter_terms)?;
    let now = session.clock.now();
    let rows = select_todos(session, &filter, now)?;
    if rows.is_empty() {
        writeln!(session.out, "No matching tasks.")?;
        return Ok(());
    }

    for (idx, todo) in rows.iter().enumerate() {
        if idx > 0 {
            writeln!(session.out)?;
        }
        session
            .renderer
            .print_todo_info(&mut session.out, todo, &session.zone, now)?;
    }
    Ok(())
}

#[instrument(skip(session, args))]
pub(super) fn cmd_due(session: &mut Session<'_>, args: &[String]) -> anyhow::Result<()> {
    if args.len() > 2 {
        return Err(anyhow!("due takes at most two arguments: <date> <time>"));
    }

    let date = args.first().map(String::as_str);
    let time = args.get(1).map(String::as_str);
    let countdown = session.zone.estimate(date, time, session.clock.now());
    debug!(?countdown, "estimated countdown");

    writeln!(session.out, "{countdown}")?;
    Ok(())
}

fn parse_ticks(args: &[String]) -> anyhow::Result<Option<u64>> {
    let mut ticks = None;
    for arg in args {
        let Some(raw) = arg.strip_prefix("ticks:") else {
            return Err(anyhow!("watch: unrecognized argument: {arg}"));
        };
        let value = raw
            .parse::<u64>()
            .with_context(|| format!("watch: invalid tick count: {raw}"))?;
        if value == 0 {
            return Err(anyhow!("watch: tick count must be at least 1"));
        }
        ticks = Some(value);
    }
    Ok(ticks)
}

/// Re-renders the pending view on every refresh tick with a fresh `now`.
///
/// The list is refetched on each tick; if a fetch fails the last good list is
/// shown again so the countdowns keep moving.
#[instrument(skip(session, filter_terms, args))]
pub(super) fn cmd_watch(
    session: &mut Session<'_>,
    filter_terms: &[String],
    args: &[String],
) -> anyhow::Result<()> {
    let max_ticks = parse_ticks(args)?;
    let interval = session.cfg.refresh_interval()?;
    let filter = view_filter("pending", filter_terms)?;
    info!(
        interval_secs = interval.as_secs(),
        ?max_ticks,
        "command watch"
    );

    let mut last_good: Option<Vec<Todo>> = None;
    let mut tick = 0_u64;
    loop {
        tick += 1;
        let now = session.clock.now();

        match select_todos(session, &filter, now) {
            Ok(rows) => last_good = Some(rows),
            Err(err) => {
                warn!(tick, error = %err, "refresh failed; showing last known list");
                writeln!(session.out, "refresh failed: {err:#}")?;
            }
        }

        writeln!(
            session.out,
            "-- {} (every {}s) --",
            now.format("%Y-%m-%d %H:%M:%S UTC"),
            interval.as_secs()
        )?;
        match last_good.as_deref() {
            Some(rows) => render_rows(session, "pending", rows, now)?,
            None => writeln!(session.out, "No data yet.")?,
        }
        session.out.flush()?;

        if max_ticks.is_some_and(|max| tick >= max) {
            debug!(tick, "watch reached tick limit");
            return Ok(());
        }
        session.clock.sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_ticks, view_filter};

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ticks_argument() {
        assert_eq!(parse_ticks(&[]).expect("none"), None);
        assert_eq!(parse_ticks(&args(&["ticks:3"])).expect("three"), Some(3));
        assert!(parse_ticks(&args(&["ticks:0"])).is_err());
        assert!(parse_ticks(&args(&["forever"])).is_err());
    }

    #[test]
    fn explicit_status_beats_view_default() {
        let filter = view_filter("pending", &args(&["status:all"])).expect("filter");
        assert!(filter.has_status_filter());
        let filter = view_filter("pending", &[]).expect("filter");
        assert!(filter.has_status_filter());
        let filter = view_filter("list", &[]).expect("filter");
        assert!(filter.is_empty());
    }
}
