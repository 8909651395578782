use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};

use super::Session;
use super::modifiers::{apply_mods, parse_mods, parse_title_and_mods, require_mods};
use super::views::select_todos;
use crate::filter::Filter;
use crate::task::{Todo, TodoDraft};

#[instrument(skip(session, args))]
pub(super) fn cmd_add(session: &mut Session<'_>, args: &[String]) -> anyhow::Result<()> {
    info!("command add");

    let now = session.clock.now();
    let (title, mods) = parse_title_and_mods(args, session.zone.today(now))?;
    let mut draft = TodoDraft {
        title,
        ..TodoDraft::default()
    };
    apply_mods(&mut draft, &mods);
    draft.validate()?;

    let created = session.api.create(&draft)?;
    debug!(id = created.id, "todo created");

    let left = created.countdown(&session.zone, now).label();
    if left.is_empty() {
        writeln!(session.out, "Created todo {}.", created.id)?;
    } else {
        writeln!(session.out, "Created todo {} ({left}).", created.id)?;
    }
    Ok(())
}

#[instrument(skip(session, filter_terms, args))]
pub(super) fn cmd_edit(
    session: &mut Session<'_>,
    filter_terms: &[String],
    args: &[String],
) -> anyhow::Result<()> {
    info!("command edit");

    let now = session.clock.now();
    let mods = parse_mods(args, session.zone.today(now))?;
    require_mods("edit", &mods)?;

    let targets = targets_for(session, "edit", filter_terms)?;
    let mut changed = 0_u64;
    for todo in &targets {
        let mut draft = TodoDraft::from_todo(todo);
        apply_mods(&mut draft, &mods);
        draft
            .validate()
            .with_context(|| format!("todo {} cannot be saved", todo.id))?;
        session.api.update(todo.id, &draft)?;
        changed += 1;
    }

    writeln!(session.out, "Modified {changed} todo(s).")?;
    Ok(())
}

#[instrument(skip(session, filter_terms))]
pub(super) fn cmd_set_completed(
    session: &mut Session<'_>,
    filter_terms: &[String],
    completed: bool,
) -> anyhow::Result<()> {
    let command = if completed { "done" } else { "undone" };
    info!(command, "command set completed");

    let targets = targets_for(session, command, filter_terms)?;
    let mut changed = 0_u64;
    for todo in targets.iter().filter(|todo| todo.completed != completed) {
        session.api.set_completed(todo.id, completed)?;
        changed += 1;
    }

    if completed {
        writeln!(session.out, "Completed {changed} todo(s).")?;
    } else {
        writeln!(session.out, "Reopened {changed} todo(s).")?;
    }
    Ok(())
}

#[instrument(skip(session, filter_terms))]
pub(super) fn cmd_delete(session: &mut Session<'_>, filter_terms: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let targets = targets_for(session, "delete", filter_terms)?;
    for todo in &targets {
        session.api.delete(todo.id)?;
    }

    writeln!(session.out, "Deleted {} todo(s).", targets.len())?;
    Ok(())
}

fn targets_for(
    session: &Session<'_>,
    command: &str,
    filter_terms: &[String],
) -> anyhow::Result<Vec<Todo>> {
    let filter = Filter::parse(filter_terms)?;
    if filter.is_empty() {
        return Err(anyhow!(
            "{command} requires a filter (for example a todo id)"
        ));
    }

    let targets = select_todos(session, &filter, session.clock.now())?;
    debug!(command, count = targets.len(), "selected targets");
    Ok(targets)
}
