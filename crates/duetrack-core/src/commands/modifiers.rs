use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{
  instrument,
  warn
};

use crate::datetime::{
  format_due_date,
  format_due_time,
  parse_due_date,
  parse_due_time
};
use crate::task::{
  Priority,
  TodoDraft
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Mod {
  Title(String),
  Description(String),
  Date(String),
  Time(String),
  Priority(Priority)
}

#[instrument(skip(args, today))]
pub(super) fn parse_title_and_mods(
  args: &[String],
  today: NaiveDate
) -> anyhow::Result<(String, Vec<Mod>)>
{
  let mut title_parts = Vec::new();
  let mut mods = Vec::new();

  let mut literal = false;
  for arg in args {
    if arg == "--" {
      literal = true;
      continue;
    }

    if !literal
      && let Some(one_mod) =
        parse_one_mod(arg, today)?
    {
      mods.push(one_mod);
      continue;
    }

    title_parts.push(arg.clone());
  }

  Ok((title_parts.join(" "), mods))
}

#[instrument(skip(args, today))]
pub(super) fn parse_mods(
  args: &[String],
  today: NaiveDate
) -> anyhow::Result<Vec<Mod>> {
  let mut mods = Vec::new();
  for arg in args {
    if let Some(one_mod) =
      parse_one_mod(arg, today)?
    {
      mods.push(one_mod);
    } else {
      warn!(arg = %arg, "unrecognized modifier token ignored");
    }
  }
  Ok(mods)
}

fn parse_one_mod(
  tok: &str,
  today: NaiveDate
) -> anyhow::Result<Option<Mod>> {
  let Some((key, value)) =
    tok.split_once(':')
  else {
    return Ok(None);
  };

  let key = key.to_ascii_lowercase();

  match key.as_str() {
    | "title" => {
      Ok(Some(Mod::Title(
        value.trim().to_string()
      )))
    }
    | "desc" | "description" => {
      Ok(Some(Mod::Description(
        value.trim().to_string()
      )))
    }
    | "date" | "due" => {
      let date =
        parse_due_date(value, today)?;
      Ok(Some(Mod::Date(
        format_due_date(date)
      )))
    }
    | "time" | "at" => {
      let time = parse_due_time(value)?;
      Ok(Some(Mod::Time(
        format_due_time(time)
      )))
    }
    | "pri" | "priority" => {
      Ok(Some(Mod::Priority(
        value.parse()?
      )))
    }
    | _ => Ok(None)
  }
}

pub(super) fn apply_mods(
  draft: &mut TodoDraft,
  mods: &[Mod]
) {
  for one_mod in mods {
    match one_mod {
      | Mod::Title(title) => {
        draft.title = title.clone();
      }
      | Mod::Description(text) => {
        draft.description = text.clone();
      }
      | Mod::Date(date) => {
        draft.date = date.clone();
      }
      | Mod::Time(time) => {
        draft.time = time.clone();
      }
      | Mod::Priority(priority) => {
        draft.priority = *priority;
      }
    }
  }
}

pub(super) fn require_mods(
  command: &str,
  mods: &[Mod]
) -> anyhow::Result<()> {
  if mods.is_empty() {
    return Err(anyhow!(
      "{command}: nothing to change \
       (use title:, desc:, date:, \
       time: or pri:)"
    ));
  }
  Ok(())
}
