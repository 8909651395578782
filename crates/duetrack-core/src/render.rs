use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::countdown::{Countdown, OverdueCause};
use crate::datetime::DueZone;
use crate::quotes::Quote;
use crate::task::{Priority, Todo};

const RED: &str = "31";
const GREEN: &str = "32";
const YELLOW: &str = "33";
const BLUE: &str = "34";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, todos, zone, now), fields(count = todos.len()))]
    pub fn print_todo_table<W: Write>(
        &self,
        out: &mut W,
        todos: &[Todo],
        zone: &DueZone,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Left".to_string(),
            "Pri".to_string(),
            "Done".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(todos.len());

        for todo in todos {
            let id = self.paint(&todo.id.to_string(), YELLOW);
            let due = due_text(todo);

            let countdown = todo.countdown(zone, now);
            let left = if countdown.is_overdue() && !todo.completed {
                self.paint(&countdown.label(), RED)
            } else {
                countdown.label()
            };

            let priority = self.paint_priority(todo.priority);
            let done = if todo.completed { "x" } else { "" }.to_string();

            rows.push(vec![id, due, left, priority, done, todo.title.clone()]);
        }

        write_table(out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, todo, zone, now), fields(id = todo.id))]
    pub fn print_todo_info<W: Write>(
        &self,
        out: &mut W,
        todo: &Todo,
        zone: &DueZone,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        writeln!(out, "id          {}", todo.id)?;
        writeln!(out, "title       {}", todo.title)?;
        writeln!(out, "description {}", todo.description)?;
        writeln!(out, "priority    {}", self.paint_priority(todo.priority))?;
        writeln!(out, "completed   {}", if todo.completed { "yes" } else { "no" })?;
        writeln!(out, "due         {}", due_text(todo))?;
        writeln!(out, "zone        {}", zone.name())?;

        let countdown = todo.countdown(zone, now);
        let left = match countdown {
            Countdown::Unknown => "-".to_string(),
            Countdown::Overdue(OverdueCause::Past) => self.paint("Overdue", RED),
            Countdown::Overdue(OverdueCause::Unparseable) => {
                self.paint("Overdue (unparseable due date/time)", RED)
            }
            Countdown::Remaining { .. } => countdown.label(),
        };
        writeln!(out, "left        {left}")?;

        for (key, value) in &todo.extra {
            writeln!(out, "{key:<11} {value}")?;
        }

        Ok(())
    }

    pub fn print_quote<W: Write>(&self, out: &mut W, quote: &Quote) -> anyhow::Result<()> {
        writeln!(out, "\"{}\"", quote.text)?;
        writeln!(out, "  - {}", quote.author)?;
        Ok(())
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => RED,
            Priority::Medium => BLUE,
            Priority::Low => GREEN,
        };
        self.paint(priority.as_str(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn due_text(todo: &Todo) -> String {
    match (todo.date.as_deref(), todo.time.as_deref()) {
        (Some(date), Some(time)) => format!("{date} {time}"),
        (Some(date), None) => date.to_string(),
        (None, Some(time)) => time.to_string(),
        (None, None) => String::new(),
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let header_line = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| format!("{:width$}", header, width = widths[idx]))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{}", header_line.trim_end())?;

    let rule_line = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule_line}")?;

    for row in rows {
        let line = row
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                let padding = widths[idx].saturating_sub(visible_width);
                format!("{}{}", cell, " ".repeat(padding))
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
