//! Stepwise
//!
//! Backend for a step-by-step project tracker:
//! - Projects made of ordered steps, stored in Neo4j (or in memory)
//! - Document triggers that automate steps, track progress and notify owners
//! - Push delivery through Firebase Cloud Messaging
//! - A daily sweep of push tokens that stopped refreshing

pub mod api;
pub mod automation;
pub mod events;
pub mod notifications;
pub mod progress;
pub mod push;
pub mod store;
pub mod triggers;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{Context, Result};
use events::EventBus;
use push::{FcmClient, LogMessenger, PushMessenger};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use store::{DocumentStore, MemoryStore, Neo4jStore, TriggeringStore, MAX_BATCH_SIZE};
use triggers::{Schedule, TokenSweeper, TriggerDispatcher, TriggerRouter};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub neo4j: Neo4jYamlConfig,
    pub fcm: FcmYamlConfig,
    pub cleanup: CleanupYamlConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Neo4j configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jYamlConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for Neo4jYamlConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "stepwise123".into(),
        }
    }
}

/// Firebase Cloud Messaging section. Push stays log-only unless both
/// `project_id` and `access_token` are set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FcmYamlConfig {
    pub project_id: Option<String>,
    pub access_token: Option<String>,
    pub endpoint: String,
}

impl Default for FcmYamlConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            access_token: None,
            endpoint: push::fcm::DEFAULT_FCM_ENDPOINT.into(),
        }
    }
}

/// Stale push token cleanup section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleanupYamlConfig {
    /// Cron expression, evaluated in UTC
    pub schedule: String,
    pub stale_after_days: i64,
    pub batch_size: usize,
}

impl Default for CleanupYamlConfig {
    fn default() -> Self {
        Self {
            schedule: triggers::schedule::DEFAULT_CLEANUP_SCHEDULE.into(),
            stale_after_days: triggers::tokens::DEFAULT_STALE_AFTER_DAYS,
            batch_size: MAX_BATCH_SIZE,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// FCM credentials, present only when push delivery is configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: String,
    pub endpoint: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub server_port: u16,
    pub fcm: Option<FcmConfig>,
    pub cleanup_schedule: String,
    pub stale_after_days: i64,
    /// Always within 1..=500
    pub cleanup_batch_size: usize,
}

impl Config {
    /// Load configuration from `config.yaml` in CWD (if any) and env vars.
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let non_empty = |v: String| if v.trim().is_empty() { None } else { Some(v) };
        let fcm_project = std::env::var("FCM_PROJECT_ID")
            .ok()
            .or(yaml.fcm.project_id)
            .and_then(non_empty);
        let fcm_token = std::env::var("FCM_ACCESS_TOKEN")
            .ok()
            .or(yaml.fcm.access_token)
            .and_then(non_empty);
        let fcm_endpoint = std::env::var("FCM_ENDPOINT").unwrap_or(yaml.fcm.endpoint);

        let fcm = match (fcm_project, fcm_token) {
            (Some(project_id), Some(access_token)) => Some(FcmConfig {
                project_id,
                access_token,
                endpoint: fcm_endpoint,
            }),
            _ => None,
        };

        Ok(Self {
            neo4j_uri: std::env::var("NEO4J_URI").unwrap_or(yaml.neo4j.uri),
            neo4j_user: std::env::var("NEO4J_USER").unwrap_or(yaml.neo4j.user),
            neo4j_password: std::env::var("NEO4J_PASSWORD").unwrap_or(yaml.neo4j.password),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.server.port),
            fcm,
            cleanup_schedule: std::env::var("CLEANUP_SCHEDULE").unwrap_or(yaml.cleanup.schedule),
            stale_after_days: yaml
                .cleanup
                .stale_after_days
                .clamp(1, triggers::tokens::MAX_STALE_AFTER_DAYS),
            cleanup_batch_size: yaml.cleanup.batch_size.clamp(1, MAX_BATCH_SIZE),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    /// Parsed cleanup schedule
    pub fn schedule(&self) -> Result<Schedule> {
        self.cleanup_schedule
            .parse()
            .with_context(|| format!("Invalid cleanup schedule '{}'", self.cleanup_schedule))
    }
}

// ============================================================================
// Application state
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Store whose project and step writes fire triggers
    pub store: Arc<dyn DocumentStore>,
    /// The same data without triggers
    pub raw_store: Arc<dyn DocumentStore>,
    pub event_bus: Arc<EventBus>,
    pub messenger: Arc<dyn PushMessenger>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Connect to Neo4j (or use an in-memory store) and set up push delivery
    pub async fn new(config: Config, in_memory: bool) -> Result<Self> {
        let raw_store: Arc<dyn DocumentStore> = if in_memory {
            tracing::warn!("Using in-memory store, data will not survive a restart");
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(
                Neo4jStore::new(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
                    .await?,
            )
        };

        let messenger: Arc<dyn PushMessenger> = match &config.fcm {
            Some(fcm) => {
                tracing::info!(project_id = %fcm.project_id, "FCM push delivery enabled");
                Arc::new(FcmClient::new(
                    &fcm.endpoint,
                    &fcm.project_id,
                    &fcm.access_token,
                )?)
            }
            None => {
                tracing::warn!("FCM not configured, push notifications will only be logged");
                Arc::new(LogMessenger)
            }
        };

        Ok(Self::with_backends(config, raw_store, messenger))
    }

    /// Assemble state around existing backends
    pub fn with_backends(
        config: Config,
        raw_store: Arc<dyn DocumentStore>,
        messenger: Arc<dyn PushMessenger>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let store: Arc<dyn DocumentStore> =
            Arc::new(TriggeringStore::new(raw_store.clone(), event_bus.clone()));
        Self {
            store,
            raw_store,
            event_bus,
            messenger,
            config: Arc::new(config),
        }
    }

    /// Start the trigger dispatcher on this state's event bus
    pub fn start_triggers(&self) -> tokio::task::JoinHandle<()> {
        let router = TriggerRouter::new(self.store.clone(), self.messenger.clone());
        TriggerDispatcher::new(router).start(&self.event_bus)
    }

    /// HTTP API over the triggering store
    pub fn router(&self) -> axum::Router {
        api::create_router(Arc::new(api::handlers::ServerState {
            store: self.store.clone(),
        }))
    }

    pub fn token_sweeper(&self) -> TokenSweeper {
        TokenSweeper::new(
            self.raw_store.clone(),
            self.config.stale_after_days,
            self.config.cleanup_batch_size,
        )
    }
}

/// Run the HTTP API together with the triggers and the cleanup schedule
pub async fn start_server(config: Config, in_memory: bool) -> Result<()> {
    let schedule = config.schedule()?;
    let port = config.server_port;
    let state = AppState::new(config, in_memory).await?;

    state.start_triggers();
    state.token_sweeper().start(schedule);

    let app = state.router();

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Run one stale token sweep and return
pub async fn run_sweep(config: Config) -> Result<triggers::SweepReport> {
    let state = AppState::new(config, false).await?;
    state.token_sweeper().sweep(chrono::Utc::now()).await
}

// ============================================================================
// Tests
// ============================================================================
