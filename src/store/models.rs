//! Document models stored by the backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Projects
// ============================================================================

/// A user-owned unit of work composed of ordered steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    /// Owner uid
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ProjectStatus,
    /// Number of completed steps
    pub current_step_index: u32,
    pub total_steps: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new active project with no progress
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        description: Option<String>,
        total_steps: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            description,
            status: ProjectStatus::Active,
            current_step_index: 0,
            total_steps,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Status of a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    Archived,
}

/// Partial update of a project. `updated_at` is always touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub current_step_index: Option<u32>,
    #[serde(default)]
    pub total_steps: Option<u32>,
}

impl ProjectPatch {
    /// Apply the patch to a project in place
    pub fn apply(&self, project: &mut Project, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(index) = self.current_step_index {
            project.current_step_index = index;
        }
        if let Some(total) = self.total_steps {
            project.total_steps = total;
        }
        project.updated_at = now;
    }
}

// ============================================================================
// Steps
// ============================================================================

/// One unit within a project, manual or automatable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: StepStatus,
    /// Position within the project, unique per project
    pub order: u32,
    #[serde(default)]
    pub automatable: bool,
    #[serde(default)]
    pub automation_attempted: bool,
    #[serde(default)]
    pub automation_result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    /// Create a new pending step
    pub fn new(
        project_id: Uuid,
        order: u32,
        title: impl Into<String>,
        description: impl Into<String>,
        automatable: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: title.into(),
            description: description.into(),
            status: StepStatus::Pending,
            order,
            automatable,
            automation_attempted: false,
            automation_result: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Whether automation should still be tried on this step
    pub fn awaits_automation(&self) -> bool {
        self.automatable && !self.automation_attempted
    }
}

/// Status of a step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    /// Stable string form, as stored and serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for StepStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StepStatus::Pending),
            "in_progress" => Ok(StepStatus::InProgress),
            "completed" => Ok(StepStatus::Completed),
            "failed" => Ok(StepStatus::Failed),
            other => Err(anyhow::anyhow!("Unknown step status: {}", other)),
        }
    }
}

impl ProjectStatus {
    /// Stable string form, as stored and serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            other => Err(anyhow::anyhow!("Unknown project status: {}", other)),
        }
    }
}

/// Partial update of a step. `updated_at` is always touched and
/// moving to `Completed` stamps `completed_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<StepStatus>,
    #[serde(default)]
    pub automation_attempted: Option<bool>,
    #[serde(default)]
    pub automation_result: Option<String>,
}

impl StepPatch {
    /// Patch that only changes the status
    pub fn status(status: StepStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Apply the patch to a step in place
    pub fn apply(&self, step: &mut Step, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            step.title = title.clone();
        }
        if let Some(description) = &self.description {
            step.description = description.clone();
        }
        if let Some(status) = self.status {
            step.status = status;
            if status == StepStatus::Completed {
                step.completed_at = Some(now);
            }
        }
        if let Some(attempted) = self.automation_attempted {
            step.automation_attempted = attempted;
        }
        if let Some(result) = &self.automation_result {
            step.automation_result = Some(result.clone());
        }
        step.updated_at = now;
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Kind tag of a notification record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ProjectCreated,
    StepCompleted,
    ManualActionRequired,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ProjectCreated => "project_created",
            NotificationKind::StepCompleted => "step_completed",
            NotificationKind::ManualActionRequired => "manual_action_required",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_created" => Ok(NotificationKind::ProjectCreated),
            "step_completed" => Ok(NotificationKind::StepCompleted),
            "manual_action_required" => Ok(NotificationKind::ManualActionRequired),
            other => Err(anyhow::anyhow!("Unknown notification type: {}", other)),
        }
    }
}

/// A notification addressed to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// Recipient uid
    pub user_id: String,
    pub project_id: Uuid,
    /// None for project-level notices
    #[serde(default)]
    pub step_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Push tokens
// ============================================================================

/// A device registration used for push delivery, keyed by the token itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushToken {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub platform: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_snake_case() {
        assert_eq!(
            serde_json::to_string(&StepStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        let parsed: StepStatus = "in_progress".parse().unwrap();
        assert_eq!(parsed, StepStatus::InProgress);
        assert!("done".parse::<StepStatus>().is_err());
    }

    #[test]
    fn test_notification_kind_serialized_as_type() {
        let n = Notification {
            id: Uuid::new_v4(),
            user_id: "user-1".into(),
            project_id: Uuid::new_v4(),
            step_id: None,
            title: "Project Created!".into(),
            body: "\"Demo\" is ready to go.".into(),
            kind: NotificationKind::ProjectCreated,
            read: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "project_created");
        assert_eq!(json["read"], false);
    }

    #[test]
    fn test_step_patch_completed_stamps_completed_at() {
        let mut step = Step::new(Uuid::new_v4(), 0, "Write", "simple", false);
        let now = Utc::now();
        StepPatch::status(StepStatus::Completed).apply(&mut step, now);
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.completed_at, Some(now));
        assert_eq!(step.updated_at, now);
    }

    #[test]
    fn test_step_patch_in_progress_keeps_completed_at_unset() {
        let mut step = Step::new(Uuid::new_v4(), 0, "Write", "", false);
        StepPatch::status(StepStatus::InProgress).apply(&mut step, Utc::now());
        assert!(step.completed_at.is_none());
    }

    #[test]
    fn test_project_patch_touches_updated_at() {
        let mut project = Project::new("user-1", "Demo", None, 2);
        let later = project.updated_at + chrono::Duration::seconds(5);
        ProjectPatch {
            current_step_index: Some(1),
            ..Default::default()
        }
        .apply(&mut project, later);
        assert_eq!(project.current_step_index, 1);
        assert_eq!(project.updated_at, later);
        assert_eq!(project.status, ProjectStatus::Active);
    }

    #[test]
    fn test_awaits_automation() {
        let mut step = Step::new(Uuid::new_v4(), 0, "Deploy", "simple", true);
        assert!(step.awaits_automation());
        step.automation_attempted = true;
        assert!(!step.awaits_automation());
    }
}
