use anyhow::anyhow;
use chrono::{
  DateTime,
  Utc
};
use tracing::trace;

use crate::datetime::DueZone;
use crate::task::{
  Priority,
  Todo
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum StatusSel {
  Pending,
  Completed,
  All
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pred {
  Ids(Vec<u64>),
  Status(StatusSel),
  PriorityEq(Priority),
  Overdue,
  NotOverdue,
  TextContains(String)
}

/// Conjunction of selection terms given before the command.
#[derive(Debug, Clone, Default)]
pub struct Filter {
  preds: Vec<Pred>
}

impl Filter {
  #[tracing::instrument(skip(terms))]
  pub fn parse(
    terms: &[String]
  ) -> anyhow::Result<Self> {
    let mut preds =
      Vec::with_capacity(terms.len());
    for term in terms {
      preds.push(parse_term(term)?);
    }
    Ok(Self {
      preds
    })
  }

  pub fn with(
    mut self,
    pred: Pred
  ) -> Self {
    self.preds.push(pred);
    self
  }

  pub fn is_empty(&self) -> bool {
    self.preds.is_empty()
  }

  pub fn has_status_filter(
    &self
  ) -> bool {
    self.preds.iter().any(|p| {
      matches!(p, Pred::Status(_))
    })
  }

  #[tracing::instrument(skip(
    self, todo, zone, now
  ), fields(id = todo.id))]
  pub fn matches(
    &self,
    todo: &Todo,
    zone: &DueZone,
    now: DateTime<Utc>
  ) -> bool {
    let ok = self.preds.iter().all(
      |pred| {
        eval_pred(pred, todo, zone, now)
      }
    );
    trace!(matched = ok, "filter evaluated");
    ok
  }
}

fn parse_term(
  term: &str
) -> anyhow::Result<Pred> {
  let token = term.trim();

  if !token.is_empty()
    && token.chars().all(|c| {
      c.is_ascii_digit() || c == ','
    })
  {
    let ids = token
      .split(',')
      .filter(|part| !part.is_empty())
      .map(|part| {
        part.parse::<u64>().map_err(
          |e| {
            anyhow!(
              "invalid id {part}: {e}"
            )
          }
        )
      })
      .collect::<anyhow::Result<Vec<_>>>()?;
    return Ok(Pred::Ids(ids));
  }

  match token.to_ascii_lowercase().as_str()
  {
    | "+overdue" => {
      return Ok(Pred::Overdue);
    }
    | "-overdue" => {
      return Ok(Pred::NotOverdue);
    }
    | _ => {}
  }

  if let Some((key, value)) =
    token.split_once(':')
  {
    match key
      .to_ascii_lowercase()
      .as_str()
    {
      | "status" => {
        let sel = match value
          .to_ascii_lowercase()
          .as_str()
        {
          | "pending" => {
            StatusSel::Pending
          }
          | "completed" | "done" => {
            StatusSel::Completed
          }
          | "all" => StatusSel::All,
          | other => {
            return Err(anyhow!(
              "invalid status filter: \
               {other} (expected \
               pending, completed or \
               all)"
            ));
          }
        };
        return Ok(Pred::Status(sel));
      }
      | "pri" | "priority" => {
        return Ok(Pred::PriorityEq(
          value.parse()?
        ));
      }
      | _ => {}
    }
  }

  Ok(Pred::TextContains(
    token.to_string()
  ))
}

fn eval_pred(
  pred: &Pred,
  todo: &Todo,
  zone: &DueZone,
  now: DateTime<Utc>
) -> bool {
  match pred {
    | Pred::Ids(ids) => {
      ids.contains(&todo.id)
    }
    | Pred::Status(sel) => {
      match sel {
        | StatusSel::Pending => {
          !todo.completed
        }
        | StatusSel::Completed => {
          todo.completed
        }
        | StatusSel::All => true
      }
    }
    | Pred::PriorityEq(priority) => {
      todo.priority == *priority
    }
    | Pred::Overdue => {
      todo
        .countdown(zone, now)
        .is_overdue()
    }
    | Pred::NotOverdue => {
      !todo
        .countdown(zone, now)
        .is_overdue()
    }
    | Pred::TextContains(needle) => {
      todo.matches_text(needle)
    }
  }
}
