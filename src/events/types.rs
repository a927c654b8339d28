//! Document change events consumed by the trigger handlers

use crate::store::models::{Project, Step};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Path of a document that can fire triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DocumentPath {
    /// `projects/{projectId}`
    Project { project_id: Uuid },
    /// `projects/{projectId}/steps/{stepId}`
    Step { project_id: Uuid, step_id: Uuid },
}

impl DocumentPath {
    pub fn project(project_id: Uuid) -> Self {
        DocumentPath::Project { project_id }
    }

    pub fn step(project_id: Uuid, step_id: Uuid) -> Self {
        DocumentPath::Step {
            project_id,
            step_id,
        }
    }

    /// The project this document belongs to
    pub fn project_id(&self) -> Uuid {
        match self {
            DocumentPath::Project { project_id } | DocumentPath::Step { project_id, .. } => {
                *project_id
            }
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentPath::Project { project_id } => write!(f, "projects/{}", project_id),
            DocumentPath::Step {
                project_id,
                step_id,
            } => write!(f, "projects/{}/steps/{}", project_id, step_id),
        }
    }
}

impl FromStr for DocumentPath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["projects", project_id] => Ok(DocumentPath::Project {
                project_id: project_id.parse()?,
            }),
            ["projects", project_id, "steps", step_id] => Ok(DocumentPath::Step {
                project_id: project_id.parse()?,
                step_id: step_id.parse()?,
            }),
            _ => Err(anyhow::anyhow!("Unsupported document path: {}", s)),
        }
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.to_string()
    }
}

/// Snapshot of a document's data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Document {
    Project(Project),
    Step(Step),
}

impl Document {
    pub fn as_project(&self) -> Option<&Project> {
        match self {
            Document::Project(p) => Some(p),
            Document::Step(_) => None,
        }
    }

    pub fn as_step(&self) -> Option<&Step> {
        match self {
            Document::Step(s) => Some(s),
            Document::Project(_) => None,
        }
    }
}

/// A change to a document.
///
/// Snapshots are optional: a trigger receiving an event without data logs
/// an error and does nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DocumentEvent {
    Created {
        path: DocumentPath,
        data: Option<Document>,
    },
    Updated {
        path: DocumentPath,
        before: Option<Document>,
        after: Option<Document>,
    },
    Deleted {
        path: DocumentPath,
    },
}

impl DocumentEvent {
    pub fn path(&self) -> &DocumentPath {
        match self {
            DocumentEvent::Created { path, .. }
            | DocumentEvent::Updated { path, .. }
            | DocumentEvent::Deleted { path } => path,
        }
    }

    /// Short name of the change, for logs
    pub fn action(&self) -> &'static str {
        match self {
            DocumentEvent::Created { .. } => "created",
            DocumentEvent::Updated { .. } => "updated",
            DocumentEvent::Deleted { .. } => "deleted",
        }
    }
}

/// Sink for document events. Emitting never blocks and never fails.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: DocumentEvent);

    fn emit_project_created(&self, project: &Project) {
        self.emit(DocumentEvent::Created {
            path: DocumentPath::project(project.id),
            data: Some(Document::Project(project.clone())),
        });
    }

    fn emit_project_updated(&self, before: Option<Project>, after: &Project) {
        self.emit(DocumentEvent::Updated {
            path: DocumentPath::project(after.id),
            before: before.map(Document::Project),
            after: Some(Document::Project(after.clone())),
        });
    }

    fn emit_step_created(&self, step: &Step) {
        self.emit(DocumentEvent::Created {
            path: DocumentPath::step(step.project_id, step.id),
            data: Some(Document::Step(step.clone())),
        });
    }

    fn emit_step_updated(&self, before: Option<Step>, after: &Step) {
        self.emit(DocumentEvent::Updated {
            path: DocumentPath::step(after.project_id, after.id),
            before: before.map(Document::Step),
            after: Some(Document::Step(after.clone())),
        });
    }

    fn emit_deleted(&self, path: DocumentPath) {
        self.emit(DocumentEvent::Deleted { path });
    }
}
