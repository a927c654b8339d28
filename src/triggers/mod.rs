//! Document triggers
//!
//! Reacts to `DocumentEvent`s the way serverless document triggers would:
//! - `projects/{projectId}` created → `on_project_create`
//! - `projects/{projectId}/steps/{stepId}` created → `on_step_create`
//! - `projects/{projectId}/steps/{stepId}` updated → `on_step_update`
//!
//! plus the scheduled stale push token sweep.

pub mod projects;
pub mod schedule;
pub mod steps;
pub mod tokens;

pub use schedule::Schedule;
pub use tokens::{SweepReport, TokenSweeper};

use crate::automation::AutomationRunner;
use crate::events::{DocumentEvent, DocumentPath, EventBus};
use crate::notifications::NotificationDispatcher;
use crate::progress::ProgressTracker;
use crate::push::PushMessenger;
use crate::store::DocumentStore;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Routes document events to their handlers.
///
/// Handlers write through the same store they were built with. When that
/// store is a `TriggeringStore`, their writes fire further events.
#[derive(Clone)]
pub struct TriggerRouter {
    store: Arc<dyn DocumentStore>,
    notifications: NotificationDispatcher,
    automation: AutomationRunner,
    progress: ProgressTracker,
}

impl TriggerRouter {
    pub fn new(store: Arc<dyn DocumentStore>, messenger: Arc<dyn PushMessenger>) -> Self {
        let notifications = NotificationDispatcher::new(store.clone(), messenger);
        let automation = AutomationRunner::new(store.clone(), notifications.clone());
        let progress =
            ProgressTracker::new(store.clone(), notifications.clone(), automation.clone());
        Self {
            store,
            notifications,
            automation,
            progress,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.notifications
    }

    pub fn automation(&self) -> &AutomationRunner {
        &self.automation
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Run the handler matching `event`, if any
    pub async fn route(&self, event: &DocumentEvent) -> Result<()> {
        match event {
            DocumentEvent::Created {
                path: DocumentPath::Project { project_id },
                data,
            } => projects::on_project_create(self, *project_id, data.as_ref()).await,
            DocumentEvent::Created {
                path:
                    DocumentPath::Step {
                        project_id,
                        step_id,
                    },
                data,
            } => steps::on_step_create(self, *project_id, *step_id, data.as_ref()).await,
            DocumentEvent::Updated {
                path:
                    DocumentPath::Step {
                        project_id,
                        step_id,
                    },
                before,
                after,
            } => {
                steps::on_step_update(
                    self,
                    *project_id,
                    *step_id,
                    before.as_ref(),
                    after.as_ref(),
                )
                .await
            }
            other => {
                debug!(path = %other.path(), action = other.action(), "No trigger for event");
                Ok(())
            }
        }
    }
}

/// Feeds events from the bus to the router, one task per event
pub struct TriggerDispatcher {
    router: TriggerRouter,
}

impl TriggerDispatcher {
    pub fn new(router: TriggerRouter) -> Self {
        Self { router }
    }

    /// Subscribe to `bus` and handle events until the bus is dropped
    pub fn start(self, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        let router = self.router;

        tokio::spawn(async move {
            info!("Trigger dispatcher started");
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let router = router.clone();
                        tokio::spawn(async move {
                            if let Err(e) = router.route(&event).await {
                                error!(
                                    path = %event.path(),
                                    action = event.action(),
                                    "Trigger failed: {:#}",
                                    e
                                );
                            }
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Trigger dispatcher lagged, events dropped");
                    }
                    Err(RecvError::Closed) => {
                        info!("Event bus closed, trigger dispatcher stopping");
                        break;
                    }
                }
            }
        })
    }
}
