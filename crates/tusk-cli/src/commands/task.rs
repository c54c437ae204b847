//! Task commands: /task, /tasks, /done, /undone, /deltask, /due, /duration

use std::io::Write;

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, TimeZone};

use tusk_core::{DurationClass, Task};

use crate::context::CommandContext;
use crate::registry::{Command, Param, Registry};

pub fn register(registry: &mut Registry) {
    registry.register(
        Command::new("/task", "Add a task to a project", create).with_params(&[
            Param::required("project_id", "The ID of the project to add the task to"),
            Param::required("task_name", "The name of the task to create"),
        ]),
    );
    registry.register(
        Command::new("/tasks", "List tasks in a project", list).with_params(&[Param::required(
            "project_id",
            "The ID of the project to list tasks for",
        )]),
    );
    registry.register(
        Command::new("/done", "Mark a task as done", done).with_params(&[Param::required(
            "task_id",
            "The ID of the task to mark as done",
        )]),
    );
    registry.register(
        Command::new("/undone", "Mark a task as not done", undone).with_params(&[
            Param::required("task_id", "The ID of the task to mark as not done"),
        ]),
    );
    registry.register(
        Command::new("/deltask", "Delete a task", delete)
            .with_params(&[Param::required("task_id", "The ID of the task to delete")])
            .destructive(),
    );
    registry.register(
        Command::new("/due", "Set a task's due date", due).with_params(&[
            Param::required("task_id", "The ID of the task"),
            Param::required("date", "Due date in YYYY-MM-DD format, or 'none' to clear"),
        ]),
    );
    registry.register(
        Command::new("/duration", "Set a task's duration", duration).with_params(&[
            Param::required("task_id", "The ID of the task"),
            Param::required("duration", "Duration: 15m, 30m, 1h, 2h, or 4h"),
        ]),
    );
}

/// One-line rendering of a task inside a listing
pub(crate) fn describe_extras(task: &Task) -> String {
    let mut extras: Vec<String> = Vec::new();
    if let Some(duration) = task.duration {
        extras.push(duration.to_string());
    }
    if let Some(due) = task.due_date {
        extras.push(format!("due {}", due.format("%Y-%m-%d")));
    }
    if extras.is_empty() {
        String::new()
    } else {
        format!(" ({})", extras.join(", "))
    }
}

fn resolve_task(
    ctx: &mut CommandContext,
    token: &str,
    out: &mut dyn Write,
) -> Result<Option<String>> {
    match ctx.store.resolve_task_id(token) {
        Ok(id) => Ok(Some(id)),
        Err(err) => {
            writeln!(out, "Error: {err}")?;
            Ok(None)
        }
    }
}

fn create(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.len() < 2 {
        writeln!(out, "Usage: /task <project-id> <task name>")?;
        return Ok(false);
    }

    let project_id = match ctx.store.resolve_project_id(&args[0]) {
        Ok(id) => id,
        Err(err) => {
            writeln!(out, "Error: {err}")?;
            return Ok(false);
        }
    };
    let task_name = args[1..].join(" ");

    match ctx.store.create_task(&project_id, &task_name) {
        Ok(task) => writeln!(out, "Created task: {} (ID: {})", task.name, task.id)?,
        Err(err) => writeln!(out, "Error creating task: {err}")?,
    }
    Ok(false)
}

fn list(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.is_empty() {
        writeln!(out, "Usage: /tasks <project-id>")?;
        return Ok(false);
    }

    let project_id = match ctx.store.resolve_project_id(&args[0]) {
        Ok(id) => id,
        Err(err) => {
            writeln!(out, "Error: {err}")?;
            return Ok(false);
        }
    };

    let project = match ctx.store.get_project(&project_id) {
        Ok(project) => project,
        Err(err) => {
            writeln!(out, "Error: {err}")?;
            return Ok(false);
        }
    };

    let tasks = match ctx.store.list_tasks(&project_id) {
        Ok(tasks) => tasks,
        Err(err) => {
            writeln!(out, "Error listing tasks: {err}")?;
            return Ok(false);
        }
    };

    writeln!(out, "Tasks in {}:", project.name)?;
    if tasks.is_empty() {
        writeln!(out, "  No tasks yet. Add one with /task <project-id> <name>")?;
        return Ok(false);
    }

    for task in &tasks {
        let status = if task.done { "[✓]" } else { "[ ]" };
        writeln!(
            out,
            "  {} [{}] {}{}",
            status,
            task.id,
            task.name,
            describe_extras(task)
        )?;
    }
    Ok(false)
}

fn done(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.is_empty() {
        writeln!(out, "Usage: /done <task-id>")?;
        return Ok(false);
    }
    let Some(task_id) = resolve_task(ctx, &args[0], out)? else {
        return Ok(false);
    };
    match ctx.store.update_task(&task_id, true) {
        Ok(()) => writeln!(out, "Marked task {task_id} as done ✓")?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(false)
}

fn undone(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.is_empty() {
        writeln!(out, "Usage: /undone <task-id>")?;
        return Ok(false);
    }
    let Some(task_id) = resolve_task(ctx, &args[0], out)? else {
        return Ok(false);
    };
    match ctx.store.update_task(&task_id, false) {
        Ok(()) => writeln!(out, "Marked task {task_id} as not done")?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(false)
}

fn delete(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.is_empty() {
        writeln!(out, "Usage: /deltask <task-id>")?;
        return Ok(false);
    }
    let Some(task_id) = resolve_task(ctx, &args[0], out)? else {
        return Ok(false);
    };
    match ctx.store.delete_task(&task_id) {
        Ok(()) => writeln!(out, "Deleted task: {task_id}")?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(false)
}

fn due(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.len() < 2 {
        writeln!(out, "Usage: /due <task-id> <YYYY-MM-DD|none>")?;
        return Ok(false);
    }

    let Some(task_id) = resolve_task(ctx, &args[0], out)? else {
        return Ok(false);
    };
    let date_str = &args[1];

    if date_str == "none" {
        match ctx.store.set_task_due_date(&task_id, None) {
            Ok(()) => writeln!(out, "Cleared due date for task {task_id}")?,
            Err(err) => writeln!(out, "Error: {err}")?,
        }
        return Ok(false);
    }

    let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
        writeln!(
            out,
            "Error: Invalid date format. Use YYYY-MM-DD (e.g., 2024-12-31)"
        )?;
        return Ok(false);
    };

    // Anchor the calendar date at local midnight; the offset travels with it
    let Some(stamp) = chrono::Local
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
    else {
        writeln!(
            out,
            "Error: Invalid date format. Use YYYY-MM-DD (e.g., 2024-12-31)"
        )?;
        return Ok(false);
    };

    match ctx
        .store
        .set_task_due_date(&task_id, Some(stamp.fixed_offset()))
    {
        Ok(()) => writeln!(out, "Set due date for task {task_id} to {date_str}")?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(false)
}

fn duration(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.len() < 2 {
        writeln!(out, "Usage: /duration <task-id> <15m|30m|1h|2h|4h>")?;
        return Ok(false);
    }

    let Some(task_id) = resolve_task(ctx, &args[0], out)? else {
        return Ok(false);
    };

    let Ok(duration) = args[1].parse::<DurationClass>() else {
        writeln!(out, "Error: Invalid duration. Use 15m, 30m, 1h, 2h, or 4h")?;
        return Ok(false);
    };

    match ctx.store.set_task_duration(&task_id, duration) {
        Ok(()) => writeln!(out, "Set duration for task {task_id} to {}", args[1])?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(false)
}
