//! Durable entity store
//!
//! A single JSON document holds every project and task. All reads take a
//! shared lock; every mutation takes the exclusive lock for the whole
//! mutate + serialize + flush sequence, so the in-memory document and the
//! file never disagree outside a writer's critical section. Durability is
//! whole-document: the store serializes into a sibling temp file and renames
//! it into place.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::ids::{default_shortcut, generate_id, MIN_PREFIX_LEN};
use crate::model::{DurationClass, Project, Task};

lazy_static! {
    static ref SHORTCUT_RE: Regex = Regex::new("^[A-Za-z0-9-]{1,20}$").unwrap();
}

/// Storage contract shared by the command handlers and the chat assistant.
///
/// All operations are synchronous and safe for concurrent callers within one
/// process. Implementations must keep `delete_project` atomic: a project and
/// its tasks disappear in the same durable write.
pub trait Store: Send + Sync {
    fn create_project(&self, name: &str) -> Result<Project>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn get_project(&self, id: &str) -> Result<Project>;
    fn delete_project(&self, id: &str) -> Result<()>;
    /// Validation order: format, then conflict, then existence.
    fn set_project_shortcut(&self, id: &str, shortcut: &str) -> Result<()>;

    /// Resolve a human-supplied token to a project id: exact id, then exact
    /// shortcut, then unique id prefix of at least six characters.
    fn resolve_project_id(&self, token: &str) -> Result<String>;
    /// Same tiers as [`Store::resolve_project_id`] minus the shortcut one.
    fn resolve_task_id(&self, token: &str) -> Result<String>;

    fn create_task(&self, project_id: &str, name: &str) -> Result<Task>;
    fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>>;
    fn list_all_tasks(&self) -> Result<Vec<Task>>;
    fn get_task(&self, id: &str) -> Result<Task>;
    fn update_task(&self, id: &str, done: bool) -> Result<()>;
    fn set_task_due_date(&self, id: &str, due: Option<DateTime<FixedOffset>>) -> Result<()>;
    /// The duration value is validated at the command boundary, not here.
    fn set_task_duration(&self, id: &str, duration: DurationClass) -> Result<()>;
    fn delete_task(&self, id: &str) -> Result<()>;
}

/// The persisted document. Legacy counter fields from the sequential-id era
/// are ignored on read and not written back.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    projects: Vec<Project>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    migrated: bool,
}

/// JSON-file backed [`Store`]
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    doc: RwLock<Document>,
}

impl JsonStore {
    /// Open an existing store file or start an empty one. Runs the one-time
    /// legacy-id migration when the document predates the unique-id scheme.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let doc = if path.exists() {
            let raw = fs::read(&path)?;
            serde_json::from_slice(&raw)?
        } else {
            // Fresh stores never held sequential ids
            Document {
                migrated: true,
                ..Document::default()
            }
        };

        let store = Self {
            path,
            doc: RwLock::new(doc),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Convert legacy `proj-N`/`task-N` ids to UUIDs, remapping task
    /// foreign keys through the project mapping. No-op once `migrated`.
    fn migrate(&self) -> Result<()> {
        let mut doc = self.doc.write();
        if doc.migrated {
            return Ok(());
        }

        let mut project_ids = std::collections::HashMap::new();
        for project in &mut doc.projects {
            if project.id.starts_with("proj-") {
                let new_id = generate_id();
                project_ids.insert(project.id.clone(), new_id.clone());
                project.shortcut = default_shortcut(&new_id);
                project.id = new_id;
            }
        }

        for task in &mut doc.tasks {
            if task.id.starts_with("task-") {
                task.id = generate_id();
            }
            if let Some(new_project_id) = project_ids.get(&task.project_id) {
                task.project_id = new_project_id.clone();
            }
        }

        doc.migrated = true;
        info!(
            projects = doc.projects.len(),
            tasks = doc.tasks.len(),
            "migrated legacy ids"
        );
        self.save(&doc)
    }

    /// Serialize the document and move it into place. Called with the write
    /// lock held so no reader sees a half-written state.
    fn save(&self, doc: &Document) -> Result<()> {
        let raw = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &raw)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), bytes = raw.len(), "store flushed");
        Ok(())
    }
}

impl Store for JsonStore {
    fn create_project(&self, name: &str) -> Result<Project> {
        let mut doc = self.doc.write();
        let id = generate_id();
        let project = Project {
            shortcut: default_shortcut(&id),
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        doc.projects.push(project.clone());
        self.save(&doc)?;
        Ok(project)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.doc.read().projects.clone())
    }

    fn get_project(&self, id: &str) -> Result<Project> {
        self.doc
            .read()
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::ProjectNotFound(id.to_string()))
    }

    fn delete_project(&self, id: &str) -> Result<()> {
        let mut doc = self.doc.write();
        let before = doc.projects.len();
        doc.projects.retain(|p| p.id != id);
        if doc.projects.len() == before {
            return Err(StoreError::ProjectNotFound(id.to_string()));
        }
        // Same durable write removes the project's tasks: no orphans persist
        doc.tasks.retain(|t| t.project_id != id);
        self.save(&doc)
    }

    fn set_project_shortcut(&self, id: &str, shortcut: &str) -> Result<()> {
        let mut doc = self.doc.write();

        if !SHORTCUT_RE.is_match(shortcut) {
            return Err(StoreError::InvalidShortcut);
        }

        if let Some(holder) = doc
            .projects
            .iter()
            .find(|p| p.id != id && p.shortcut == shortcut)
        {
            return Err(StoreError::ShortcutInUse(holder.name.clone()));
        }

        match doc.projects.iter_mut().find(|p| p.id == id) {
            Some(project) => {
                project.shortcut = shortcut.to_string();
            }
            None => return Err(StoreError::ProjectNotFound(id.to_string())),
        }
        self.save(&doc)
    }

    fn resolve_project_id(&self, token: &str) -> Result<String> {
        let doc = self.doc.read();

        if let Some(p) = doc.projects.iter().find(|p| p.id == token) {
            return Ok(p.id.clone());
        }

        if let Some(p) = doc.projects.iter().find(|p| p.shortcut == token) {
            return Ok(p.id.clone());
        }

        if token.len() >= MIN_PREFIX_LEN {
            let matches: Vec<&Project> = doc
                .projects
                .iter()
                .filter(|p| p.id.starts_with(token))
                .collect();
            match matches.len() {
                1 => return Ok(matches[0].id.clone()),
                0 => {}
                count => {
                    return Err(StoreError::AmbiguousProject {
                        prefix: token.to_string(),
                        count,
                    })
                }
            }
        }

        Err(StoreError::ProjectNotFound(token.to_string()))
    }

    fn resolve_task_id(&self, token: &str) -> Result<String> {
        let doc = self.doc.read();

        if let Some(t) = doc.tasks.iter().find(|t| t.id == token) {
            return Ok(t.id.clone());
        }

        if token.len() >= MIN_PREFIX_LEN {
            let matches: Vec<&Task> = doc
                .tasks
                .iter()
                .filter(|t| t.id.starts_with(token))
                .collect();
            match matches.len() {
                1 => return Ok(matches[0].id.clone()),
                0 => {}
                count => {
                    return Err(StoreError::AmbiguousTask {
                        prefix: token.to_string(),
                        count,
                    })
                }
            }
        }

        Err(StoreError::TaskNotFound(token.to_string()))
    }

    fn create_task(&self, project_id: &str, name: &str) -> Result<Task> {
        let mut doc = self.doc.write();

        if !doc.projects.iter().any(|p| p.id == project_id) {
            return Err(StoreError::ProjectNotFound(project_id.to_string()));
        }

        let task = Task {
            id: generate_id(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            done: false,
            created_at: Utc::now(),
            due_date: None,
            duration: None,
        };
        doc.tasks.push(task.clone());
        self.save(&doc)?;
        Ok(task)
    }

    fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        Ok(self
            .doc
            .read()
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    fn list_all_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.doc.read().tasks.clone())
    }

    fn get_task(&self, id: &str) -> Result<Task> {
        self.doc
            .read()
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))
    }

    fn update_task(&self, id: &str, done: bool) -> Result<()> {
        let mut doc = self.doc.write();
        match doc.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => task.done = done,
            None => return Err(StoreError::TaskNotFound(id.to_string())),
        }
        self.save(&doc)
    }

    fn set_task_due_date(&self, id: &str, due: Option<DateTime<FixedOffset>>) -> Result<()> {
        let mut doc = self.doc.write();
        match doc.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => task.due_date = due,
            None => return Err(StoreError::TaskNotFound(id.to_string())),
        }
        self.save(&doc)
    }

    fn set_task_duration(&self, id: &str, duration: DurationClass) -> Result<()> {
        let mut doc = self.doc.write();
        match doc.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => task.duration = Some(duration),
            None => return Err(StoreError::TaskNotFound(id.to_string())),
        }
        self.save(&doc)
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        let mut doc = self.doc.write();
        let before = doc.tasks.len();
        doc.tasks.retain(|t| t.id != id);
        if doc.tasks.len() == before {
            return Err(StoreError::TaskNotFound(id.to_string()));
        }
        self.save(&doc)
    }
}
