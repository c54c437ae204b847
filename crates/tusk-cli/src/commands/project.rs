//! Project commands: /project, /projects, /delproject

use std::io::Write;

use anyhow::Result;

use crate::context::CommandContext;
use crate::registry::{Command, Param, Registry};

pub fn register(registry: &mut Registry) {
    registry.register(
        Command::new("/project", "Create a new project", create)
            .with_params(&[Param::required("name", "The name of the project to create")]),
    );
    registry.register(Command::new("/projects", "List all projects", list));
    registry.register(
        Command::new("/delproject", "Delete a project and its tasks", delete)
            .with_params(&[Param::required(
                "project_id",
                "The ID or shortcut of the project to delete",
            )])
            .destructive(),
    );
}

fn create(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.is_empty() {
        writeln!(out, "Usage: /project <name>")?;
        return Ok(false);
    }

    let name = args.join(" ");
    match ctx.store.create_project(&name) {
        Ok(project) => writeln!(out, "Created project: {} (ID: {})", project.name, project.id)?,
        Err(err) => writeln!(out, "Error creating project: {err}")?,
    }
    Ok(false)
}

fn list(ctx: &mut CommandContext, _args: &[String], out: &mut dyn Write) -> Result<bool> {
    let projects = match ctx.store.list_projects() {
        Ok(projects) => projects,
        Err(err) => {
            writeln!(out, "Error listing projects: {err}")?;
            return Ok(false);
        }
    };

    if projects.is_empty() {
        writeln!(out, "No projects yet. Create one with /project <name>")?;
        return Ok(false);
    }

    writeln!(out, "Projects:")?;
    for project in &projects {
        let tasks = ctx.store.list_tasks(&project.id).unwrap_or_default();
        let done = tasks.iter().filter(|t| t.done).count();
        writeln!(
            out,
            "  [{}] {} ({}/{} tasks complete)",
            project.id,
            project.name,
            done,
            tasks.len()
        )?;
    }
    Ok(false)
}

fn delete(ctx: &mut CommandContext, args: &[String], out: &mut dyn Write) -> Result<bool> {
    if args.is_empty() {
        writeln!(out, "Usage: /delproject <project-id>")?;
        return Ok(false);
    }

    let project_id = match ctx.store.resolve_project_id(&args[0]) {
        Ok(id) => id,
        Err(err) => {
            writeln!(out, "Error: {err}")?;
            return Ok(false);
        }
    };

    match ctx.store.delete_project(&project_id) {
        Ok(()) => writeln!(out, "Deleted project: {project_id}")?,
        Err(err) => writeln!(out, "Error deleting project: {err}")?,
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use crate::commands::testutil::{created_id, fixture, run};

    #[test]
    fn create_and_list_projects() {
        let mut fix = fixture();

        let output = run(&mut fix.ctx, "/project Office work");
        assert!(output.contains("Created project: Office work"));
        let id = created_id(&output);

        let output = run(&mut fix.ctx, "/projects");
        assert!(output.contains("Projects:"));
        assert!(output.contains(&format!("[{id}] Office work (0/0 tasks complete)")));
    }

    #[test]
    fn create_without_name_prints_usage() {
        let mut fix = fixture();
        assert_eq!(run(&mut fix.ctx, "/project"), "Usage: /project <name>");
    }

    #[test]
    fn list_when_empty_hints_at_creation() {
        let mut fix = fixture();
        let output = run(&mut fix.ctx, "/projects");
        assert!(output.contains("No projects yet"));
    }

    #[test]
    fn delete_accepts_shortcut_and_removes_tasks() {
        let mut fix = fixture();
        let id = created_id(&run(&mut fix.ctx, "/project Doomed"));
        run(&mut fix.ctx, &format!("/task {id} clean desk"));

        let shortcut = &id[..8];
        let output = run(&mut fix.ctx, &format!("/delproject {shortcut}"));
        assert!(output.contains(&format!("Deleted project: {id}")));

        let output = run(&mut fix.ctx, "/projects");
        assert!(output.contains("No projects yet"));
    }

    #[test]
    fn delete_unknown_project_reports_error() {
        let mut fix = fixture();
        let output = run(&mut fix.ctx, "/delproject nothere");
        assert!(output.contains("Error: project not found: nothere"));
    }
}
