//! Date-range commands: /today, /tomorrow, /week

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use colored::Colorize;

use tusk_core::schedule::{start_of_week, tasks_in_range};
use tusk_core::{format_minutes, total_minutes, Task};

use crate::commands::task::describe_extras;
use crate::context::CommandContext;
use crate::registry::{Command, Param, Registry};

const PROJECT_FILTER: &[Param] = &[Param::optional(
    "project_id",
    "Optional project ID to filter by",
)];

pub fn register(registry: &mut Registry) {
    registry.register(
        Command::new("/today", "List tasks due today (including overdue)", today)
            .with_shorthand("/td")
            .with_params(PROJECT_FILTER),
    );
    registry.register(
        Command::new("/tomorrow", "List tasks due tomorrow", tomorrow)
            .with_shorthand("/tm")
            .with_params(PROJECT_FILTER),
    );
    registry.register(
        Command::new("/week", "List tasks due this week (Monday through Sunday)", week)
            .with_shorthand("/w")
            .with_params(PROJECT_FILTER),
    );
}

fn today(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    let Some(project_id) = resolve_filter(ctx, args, out)? else {
        return Ok(false);
    };
    let today = Local::now().date_naive();
    list_range(
        ctx,
        out,
        "today",
        today,
        today + Days::new(1),
        project_id.as_deref(),
        true,
    )?;
    Ok(false)
}

fn tomorrow(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    let Some(project_id) = resolve_filter(ctx, args, out)? else {
        return Ok(false);
    };
    let today = Local::now().date_naive();
    list_range(
        ctx,
        out,
        "tomorrow",
        today + Days::new(1),
        today + Days::new(2),
        project_id.as_deref(),
        false,
    )?;
    Ok(false)
}

fn week(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    let Some(project_id) = resolve_filter(ctx, args, out)? else {
        return Ok(false);
    };
    let week_start = start_of_week(Local::now().date_naive());
    list_range(
        ctx,
        out,
        "this week",
        week_start,
        week_start + Days::new(7),
        project_id.as_deref(),
        false,
    )?;
    Ok(false)
}

/// `Ok(None)` means the filter token failed to resolve and the error is
/// already written.
fn resolve_filter(
    ctx: &mut CommandContext,
    args: &[String],
    out: &mut dyn Write,
) -> Result<Option<Option<String>>> {
    match args.first() {
        None => Ok(Some(None)),
        Some(token) => match ctx.store.resolve_project_id(token) {
            Ok(id) => Ok(Some(Some(id))),
            Err(err) => {
                writeln!(out, "Error: {err}")?;
                Ok(None)
            }
        },
    }
}

fn list_range(
    ctx: &mut CommandContext,
    out: &mut dyn Write,
    label: &str,
    start: NaiveDate,
    end: NaiveDate,
    project_id: Option<&str>,
    include_overdue: bool,
) -> Result<()> {
    let tasks = match project_id {
        Some(project_id) => {
            let project = match ctx.store.get_project(project_id) {
                Ok(project) => project,
                Err(err) => {
                    writeln!(out, "Error: {err}")?;
                    return Ok(());
                }
            };
            writeln!(out, "Tasks due {label} in {}:", project.name)?;
            match ctx.store.list_tasks(project_id) {
                Ok(tasks) => tasks,
                Err(err) => {
                    writeln!(out, "Error listing tasks: {err}")?;
                    return Ok(());
                }
            }
        }
        None => {
            writeln!(out, "Tasks due {label}:")?;
            match ctx.store.list_all_tasks() {
                Ok(tasks) => tasks,
                Err(err) => {
                    writeln!(out, "Error listing tasks: {err}")?;
                    return Ok(());
                }
            }
        }
    };

    let view = tasks_in_range(&tasks, start, end, include_overdue);
    if view.is_empty() {
        writeln!(out, "  No tasks due")?;
        return Ok(());
    }

    // Project names are only shown in the unfiltered listing
    let mut project_names: HashMap<String, String> = HashMap::new();
    if project_id.is_none() {
        for project in ctx.store.list_projects().unwrap_or_default() {
            project_names.insert(project.id, project.name);
        }
    }

    // Overdue first, highlighted
    for task in &view.overdue {
        let line = task_line(task, &project_names);
        writeln!(out, "{}", line.red())?;
    }
    for task in &view.due {
        writeln!(out, "{}", task_line(task, &project_names))?;
    }

    let selected: Vec<Task> = view.iter().cloned().collect();
    let minutes = total_minutes(&selected);
    if minutes > 0 {
        writeln!(out)?;
        writeln!(out, "Total: {}", format_minutes(minutes))?;
    }
    Ok(())
}

fn task_line(task: &Task, project_names: &HashMap<String, String>) -> String {
    let short_id: String = task.id.chars().take(8).collect();
    let mut extras = describe_extras(task);
    if let Some(name) = project_names.get(&task.project_id) {
        if extras.is_empty() {
            extras = format!(" ({name})");
        } else {
            extras.truncate(extras.len() - 1);
            extras.push_str(&format!(", {name})"));
        }
    }
    format!("  [ ] [{}] {}{}", short_id, task.name, extras)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testutil::{created_id, fixture, run};

    fn day(offset: i64) -> String {
        let date = Local::now().date_naive() + chrono::Duration::days(offset);
        date.format("%Y-%m-%d").to_string()
    }

    #[test]
    fn today_includes_overdue_and_skips_done() {
        let mut fix = fixture();
        let project_id = created_id(&run(&mut fix.ctx, "/project Sched"));

        let overdue = created_id(&run(&mut fix.ctx, &format!("/task {project_id} late one")));
        run(&mut fix.ctx, &format!("/due {overdue} {}", day(-1)));

        let current = created_id(&run(&mut fix.ctx, &format!("/task {project_id} due now")));
        run(&mut fix.ctx, &format!("/due {current} {}", day(0)));

        let finished = created_id(&run(&mut fix.ctx, &format!("/task {project_id} already")));
        run(&mut fix.ctx, &format!("/due {finished} {}", day(0)));
        run(&mut fix.ctx, &format!("/done {finished}"));

        let output = run(&mut fix.ctx, "/today");
        assert!(output.starts_with("Tasks due today:"));
        assert!(output.contains("late one"));
        assert!(output.contains("due now"));
        assert!(!output.contains("already"));
        // Overdue is listed before today's tasks
        assert!(output.find("late one").unwrap() < output.find("due now").unwrap());
    }

    #[test]
    fn tomorrow_excludes_overdue() {
        let mut fix = fixture();
        let project_id = created_id(&run(&mut fix.ctx, "/project Sched"));

        let late = created_id(&run(&mut fix.ctx, &format!("/task {project_id} late")));
        run(&mut fix.ctx, &format!("/due {late} {}", day(-1)));

        let soon = created_id(&run(&mut fix.ctx, &format!("/task {project_id} soon")));
        run(&mut fix.ctx, &format!("/due {soon} {}", day(1)));

        let output = run(&mut fix.ctx, "/tomorrow");
        assert!(output.contains("soon"));
        assert!(!output.contains("late"));
    }

    #[test]
    fn empty_range_prints_placeholder() {
        let mut fix = fixture();
        let output = run(&mut fix.ctx, "/tomorrow");
        assert_eq!(output, "Tasks due tomorrow:\n  No tasks due");
    }

    #[test]
    fn totals_sum_estimated_durations() {
        let mut fix = fixture();
        let project_id = created_id(&run(&mut fix.ctx, "/project Sched"));

        let a = created_id(&run(&mut fix.ctx, &format!("/task {project_id} first")));
        run(&mut fix.ctx, &format!("/due {a} {}", day(0)));
        run(&mut fix.ctx, &format!("/duration {a} 2h"));

        let b = created_id(&run(&mut fix.ctx, &format!("/task {project_id} second")));
        run(&mut fix.ctx, &format!("/due {b} {}", day(0)));
        run(&mut fix.ctx, &format!("/duration {b} 15m"));

        let output = run(&mut fix.ctx, "/today");
        assert!(output.contains("Total: 2h 15m"));
    }

    #[test]
    fn project_filter_uses_resolution() {
        let mut fix = fixture();
        let project_id = created_id(&run(&mut fix.ctx, "/project Filtered"));
        let task = created_id(&run(&mut fix.ctx, &format!("/task {project_id} scoped")));
        run(&mut fix.ctx, &format!("/due {task} {}", day(0)));

        let output = run(&mut fix.ctx, &format!("/today {}", &project_id[..8]));
        assert!(output.starts_with("Tasks due today in Filtered:"));
        assert!(output.contains("scoped"));

        let output = run(&mut fix.ctx, "/today nosuchproject");
        assert!(output.contains("Error: project not found"));
    }

    #[test]
    fn shorthand_aliases_dispatch() {
        let mut fix = fixture();
        let output = run(&mut fix.ctx, "/td");
        assert!(output.starts_with("Tasks due today:"));
        let output = run(&mut fix.ctx, "/w");
        assert!(output.starts_with("Tasks due this week:"));
    }
}
