//! /shortcut - project alias management

use std::io::Write;

use anyhow::Result;

use crate::context::CommandContext;
use crate::registry::{Command, Param, Registry};

pub fn register(registry: &mut Registry) {
    registry.register(
        Command::new("/shortcut", "Set a custom shortcut for a project", set).with_params(&[
            Param::required("project_id", "The ID or current shortcut of the project"),
            Param::required(
                "new_shortcut",
                "The new shortcut (alphanumeric + hyphens, max 20 chars)",
            ),
        ]),
    );
}

fn set(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.len() < 2 {
        writeln!(out, "Usage: /shortcut <project-id> <new-shortcut>")?;
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

    match ctx.store.set_project_shortcut(&project_id, &args[1]) {
        Ok(()) => writeln!(out, "Set shortcut for {} to: {}", project.name, args[1])?,
        Err(err) => writeln!(out, "Error: {err}")?,
    }
    Ok(false)
}
