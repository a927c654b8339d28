//! Neo4j-backed document store
//!
//! Projects and steps are nodes linked by `(:Project)-[:HAS_STEP]->(:Step)`.
//! Notifications and push tokens are standalone nodes keyed by id / token.
//! Timestamps are stored as RFC 3339 strings.

use super::models::*;
use super::traits::{check_batch_size, StoreError};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use neo4rs::{query, Graph, Node, Query};
use std::sync::Arc;
use uuid::Uuid;

/// Client for Neo4j operations
pub struct Neo4jStore {
    graph: Arc<Graph>,
}

fn parse_time(node: &Node, key: &str) -> Option<DateTime<Utc>> {
    node.get::<String>(key).ok().and_then(|s| s.parse().ok())
}

fn non_empty(node: &Node, key: &str) -> Option<String> {
    node.get::<String>(key).ok().filter(|s| !s.is_empty())
}

impl Neo4jStore {
    /// Connect to Neo4j and make sure the schema exists
    pub async fn new(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;

        let store = Self {
            graph: Arc::new(graph),
        };

        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize uniqueness constraints and lookup indexes
    async fn init_schema(&self) -> Result<()> {
        let constraints = vec![
            "CREATE CONSTRAINT project_id IF NOT EXISTS FOR (p:Project) REQUIRE p.id IS UNIQUE",
            "CREATE CONSTRAINT step_id IF NOT EXISTS FOR (s:Step) REQUIRE s.id IS UNIQUE",
            "CREATE CONSTRAINT notification_id IF NOT EXISTS FOR (n:Notification) REQUIRE n.id IS UNIQUE",
            "CREATE CONSTRAINT push_token IF NOT EXISTS FOR (t:PushToken) REQUIRE t.token IS UNIQUE",
        ];

        let indexes = vec![
            "CREATE INDEX project_user IF NOT EXISTS FOR (p:Project) ON (p.user_id)",
            "CREATE INDEX step_project IF NOT EXISTS FOR (s:Step) ON (s.project_id)",
            "CREATE INDEX notification_user IF NOT EXISTS FOR (n:Notification) ON (n.user_id)",
            "CREATE INDEX push_token_user IF NOT EXISTS FOR (t:PushToken) ON (t.user_id)",
            "CREATE INDEX push_token_updated IF NOT EXISTS FOR (t:PushToken) ON (t.updated_at)",
        ];

        for constraint in constraints {
            if let Err(e) = self.graph.run(query(constraint)).await {
                tracing::warn!("Constraint may already exist: {}", e);
            }
        }

        for index in indexes {
            if let Err(e) = self.graph.run(query(index)).await {
                tracing::warn!("Index may already exist: {}", e);
            }
        }

        Ok(())
    }

    /// Execute a parameterized Cypher query and collect every row
    async fn execute_with_params(&self, q: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    // ========================================================================
    // Project operations
    // ========================================================================

    pub async fn create_project(&self, project: &Project) -> Result<()> {
        let q = query(
            r#"
            CREATE (p:Project {
                id: $id,
                user_id: $user_id,
                title: $title,
                description: $description,
                status: $status,
                current_step_index: $current_step_index,
                total_steps: $total_steps,
                created_at: $created_at,
                updated_at: $updated_at
            })
            "#,
        )
        .param("id", project.id.to_string())
        .param("user_id", project.user_id.clone())
        .param("title", project.title.clone())
        .param(
            "description",
            project.description.clone().unwrap_or_default(),
        )
        .param("status", project.status.as_str())
        .param("current_step_index", project.current_step_index as i64)
        .param("total_steps", project.total_steps as i64)
        .param("created_at", project.created_at.to_rfc3339())
        .param("updated_at", project.updated_at.to_rfc3339());

        self.graph.run(q).await?;
        Ok(())
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        let q = query(
            r#"
            MATCH (p:Project {id: $id})
            RETURN p
            "#,
        )
        .param("id", id.to_string());

        let rows = self.execute_with_params(q).await?;
        match rows.first() {
            Some(row) => {
                let node: Node = row.get("p")?;
                Ok(Some(self.node_to_project(&node)?))
            }
            None => Ok(None),
        }
    }

    pub async fn list_user_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        let q = query(
            r#"
            MATCH (p:Project {user_id: $user_id})
            RETURN p
            ORDER BY datetime(p.updated_at) DESC
            "#,
        )
        .param("user_id", user_id);

        let rows = self.execute_with_params(q).await?;
        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            let node: Node = row.get("p")?;
            projects.push(self.node_to_project(&node)?);
        }
        Ok(projects)
    }

    pub async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<Project> {
        let mut set_clauses = vec!["p.updated_at = $now"];

        if patch.title.is_some() {
            set_clauses.push("p.title = $title");
        }
        if patch.description.is_some() {
            set_clauses.push("p.description = $description");
        }
        if patch.status.is_some() {
            set_clauses.push("p.status = $status");
        }
        if patch.current_step_index.is_some() {
            set_clauses.push("p.current_step_index = $current_step_index");
        }
        if patch.total_steps.is_some() {
            set_clauses.push("p.total_steps = $total_steps");
        }

        let cypher = format!(
            "MATCH (p:Project {{id: $id}}) SET {} RETURN p",
            set_clauses.join(", ")
        );

        let mut q = query(&cypher)
            .param("id", id.to_string())
            .param("now", Utc::now().to_rfc3339());

        if let Some(title) = &patch.title {
            q = q.param("title", title.clone());
        }
        if let Some(description) = &patch.description {
            q = q.param("description", description.clone());
        }
        if let Some(status) = patch.status {
            q = q.param("status", status.as_str());
        }
        if let Some(index) = patch.current_step_index {
            q = q.param("current_step_index", index as i64);
        }
        if let Some(total) = patch.total_steps {
            q = q.param("total_steps", total as i64);
        }

        let rows = self.execute_with_params(q).await?;
        let row = rows
            .first()
            .ok_or_else(|| StoreError::NotFound(format!("Project {}", id)))?;
        let node: Node = row.get("p")?;
        self.node_to_project(&node)
    }

    pub async fn delete_project(&self, id: Uuid) -> Result<()> {
        let q = query(
            r#"
            MATCH (p:Project {id: $id})
            OPTIONAL MATCH (p)-[:HAS_STEP]->(s:Step)
            DETACH DELETE s, p
            "#,
        )
        .param("id", id.to_string());

        self.graph.run(q).await?;
        Ok(())
    }

    // ========================================================================
    // Step operations
    // ========================================================================

    pub async fn create_step(&self, step: &Step) -> Result<()> {
        // Order uniqueness is checked and the step created in one statement:
        // the CREATE only runs when no sibling holds the same order.
        let q = query(
            r#"
            OPTIONAL MATCH (sibling:Step {project_id: $project_id, order: $order})
            WITH count(sibling) AS taken
            WHERE taken = 0
            CREATE (s:Step {
                id: $id,
                project_id: $project_id,
                title: $title,
                description: $description,
                status: $status,
                order: $order,
                automatable: $automatable,
                automation_attempted: $automation_attempted,
                automation_result: $automation_result,
                created_at: $created_at,
                updated_at: $updated_at,
                completed_at: $completed_at
            })
            WITH s
            OPTIONAL MATCH (p:Project {id: $project_id})
            FOREACH (x IN CASE WHEN p IS NULL THEN [] ELSE [1] END |
                CREATE (p)-[:HAS_STEP]->(s))
            RETURN s.id AS id
            "#,
        )
        .param("id", step.id.to_string())
        .param("project_id", step.project_id.to_string())
        .param("title", step.title.clone())
        .param("description", step.description.clone())
        .param("status", step.status.as_str())
        .param("order", step.order as i64)
        .param("automatable", step.automatable)
        .param("automation_attempted", step.automation_attempted)
        .param(
            "automation_result",
            step.automation_result.clone().unwrap_or_default(),
        )
        .param("created_at", step.created_at.to_rfc3339())
        .param("updated_at", step.updated_at.to_rfc3339())
        .param(
            "completed_at",
            step.completed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        );

        let rows = self.execute_with_params(q).await?;
        if rows.is_empty() {
            return Err(StoreError::Conflict(format!(
                "Project {} already has a step with order {}",
                step.project_id, step.order
            ))
            .into());
        }
        Ok(())
    }

    pub async fn get_step(&self, project_id: Uuid, step_id: Uuid) -> Result<Option<Step>> {
        let q = query(
            r#"
            MATCH (s:Step {id: $id, project_id: $project_id})
            RETURN s
            "#,
        )
        .param("id", step_id.to_string())
        .param("project_id", project_id.to_string());

        let rows = self.execute_with_params(q).await?;
        match rows.first() {
            Some(row) => {
                let node: Node = row.get("s")?;
                Ok(Some(self.node_to_step(&node)?))
            }
            None => Ok(None),
        }
    }

    pub async fn list_steps(&self, project_id: Uuid) -> Result<Vec<Step>> {
        let q = query(
            r#"
            MATCH (s:Step {project_id: $project_id})
            RETURN s
            ORDER BY s.order ASC
            "#,
        )
        .param("project_id", project_id.to_string());

        let rows = self.execute_with_params(q).await?;
        let mut steps = Vec::with_capacity(rows.len());
        for row in rows {
            let node: Node = row.get("s")?;
            steps.push(self.node_to_step(&node)?);
        }
        Ok(steps)
    }

    pub async fn update_step(
        &self,
        project_id: Uuid,
        step_id: Uuid,
        patch: &StepPatch,
    ) -> Result<Step> {
        let mut set_clauses = vec!["s.updated_at = $now"];

        if patch.title.is_some() {
            set_clauses.push("s.title = $title");
        }
        if patch.description.is_some() {
            set_clauses.push("s.description = $description");
        }
        if let Some(status) = patch.status {
            set_clauses.push("s.status = $status");
            if status == StepStatus::Completed {
                set_clauses.push("s.completed_at = $now");
            }
        }
        if patch.automation_attempted.is_some() {
            set_clauses.push("s.automation_attempted = $automation_attempted");
        }
        if patch.automation_result.is_some() {
            set_clauses.push("s.automation_result = $automation_result");
        }

        let cypher = format!(
            "MATCH (s:Step {{id: $id, project_id: $project_id}}) SET {} RETURN s",
            set_clauses.join(", ")
        );

        let mut q = query(&cypher)
            .param("id", step_id.to_string())
            .param("project_id", project_id.to_string())
            .param("now", Utc::now().to_rfc3339());

        if let Some(title) = &patch.title {
            q = q.param("title", title.clone());
        }
        if let Some(description) = &patch.description {
            q = q.param("description", description.clone());
        }
        if let Some(status) = patch.status {
            q = q.param("status", status.as_str());
        }
        if let Some(attempted) = patch.automation_attempted {
            q = q.param("automation_attempted", attempted);
        }
        if let Some(result) = &patch.automation_result {
            q = q.param("automation_result", result.clone());
        }

        let rows = self.execute_with_params(q).await?;
        let row = rows
            .first()
            .ok_or_else(|| StoreError::NotFound(format!("Step {}", step_id)))?;
        let node: Node = row.get("s")?;
        self.node_to_step(&node)
    }

    // ========================================================================
    // Notification operations
    // ========================================================================

    pub async fn create_notification(&self, notification: &Notification) -> Result<()> {
        let q = query(
            r#"
            CREATE (n:Notification {
                id: $id,
                user_id: $user_id,
                project_id: $project_id,
                step_id: $step_id,
                title: $title,
                body: $body,
                type: $type,
                read: $read,
                created_at: $created_at
            })
            "#,
        )
        .param("id", notification.id.to_string())
        .param("user_id", notification.user_id.clone())
        .param("project_id", notification.project_id.to_string())
        .param(
            "step_id",
            notification
                .step_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        )
        .param("title", notification.title.clone())
        .param("body", notification.body.clone())
        .param("type", notification.kind.as_str())
        .param("read", notification.read)
        .param("created_at", notification.created_at.to_rfc3339());

        self.graph.run(q).await?;
        Ok(())
    }

    pub async fn list_user_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let q = query(
            r#"
            MATCH (n:Notification {user_id: $user_id})
            RETURN n
            ORDER BY datetime(n.created_at) DESC
            "#,
        )
        .param("user_id", user_id);

        let rows = self.execute_with_params(q).await?;
        let mut notifications = Vec::with_capacity(rows.len());
        for row in rows {
            let node: Node = row.get("n")?;
            notifications.push(self.node_to_notification(&node)?);
        }
        Ok(notifications)
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let q = query(
            r#"
            MATCH (n:Notification {id: $id})
            SET n.read = true
            RETURN n.id AS id
            "#,
        )
        .param("id", id.to_string());

        let rows = self.execute_with_params(q).await?;
        Ok(!rows.is_empty())
    }

    // ========================================================================
    // Push token operations
    // ========================================================================

    pub async fn upsert_push_token(&self, token: &PushToken) -> Result<()> {
        let q = query(
            r#"
            MERGE (t:PushToken {token: $token})
            SET t.user_id = $user_id,
                t.platform = $platform,
                t.updated_at = $updated_at
            "#,
        )
        .param("token", token.token.clone())
        .param("user_id", token.user_id.clone())
        .param("platform", token.platform.clone().unwrap_or_default())
        .param("updated_at", token.updated_at.to_rfc3339());

        self.graph.run(q).await?;
        Ok(())
    }

    pub async fn list_user_push_tokens(&self, user_id: &str) -> Result<Vec<PushToken>> {
        let q = query(
            r#"
            MATCH (t:PushToken {user_id: $user_id})
            RETURN t
            ORDER BY t.token
            "#,
        )
        .param("user_id", user_id);

        let rows = self.execute_with_params(q).await?;
        let mut tokens = Vec::with_capacity(rows.len());
        for row in rows {
            let node: Node = row.get("t")?;
            tokens.push(self.node_to_push_token(&node)?);
        }
        Ok(tokens)
    }

    pub async fn delete_push_token(&self, token: &str) -> Result<()> {
        let q = query(
            r#"
            MATCH (t:PushToken {token: $token})
            DELETE t
            "#,
        )
        .param("token", token);

        self.graph.run(q).await?;
        Ok(())
    }

    pub async fn list_stale_push_tokens(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let q = query(
            r#"
            MATCH (t:PushToken)
            WHERE datetime(t.updated_at) < datetime($cutoff)
            RETURN t.token AS token
            ORDER BY token
            "#,
        )
        .param("cutoff", cutoff.to_rfc3339());

        let rows = self.execute_with_params(q).await?;
        let mut tokens = Vec::with_capacity(rows.len());
        for row in rows {
            tokens.push(row.get::<String>("token")?);
        }
        Ok(tokens)
    }

    pub async fn count_push_tokens(&self) -> Result<usize> {
        let rows = self
            .execute_with_params(query("MATCH (t:PushToken) RETURN count(t) AS total"))
            .await?;
        let total = match rows.first() {
            Some(row) => row.get::<i64>("total")?,
            None => 0,
        };
        Ok(total as usize)
    }

    pub async fn delete_push_tokens(&self, tokens: &[String]) -> Result<usize> {
        check_batch_size(tokens)?;
        if tokens.is_empty() {
            return Ok(0);
        }

        // One statement per batch: Neo4j commits it as a single transaction
        let q = query(
            r#"
            UNWIND $tokens AS value
            MATCH (t:PushToken {token: value})
            DELETE t
            RETURN count(*) AS deleted
            "#,
        )
        .param("tokens", tokens.to_vec());

        let rows = self.execute_with_params(q).await?;
        let deleted = match rows.first() {
            Some(row) => row.get::<i64>("deleted")?,
            None => 0,
        };
        Ok(deleted as usize)
    }

    pub async fn health_check(&self) -> Result<bool> {
        let rows = self.execute_with_params(query("RETURN 1 AS ok")).await?;
        Ok(!rows.is_empty())
    }

    // ========================================================================
    // Node conversion
    // ========================================================================

    fn node_to_project(&self, node: &Node) -> Result<Project> {
        Ok(Project {
            id: node.get::<String>("id")?.parse()?,
            user_id: node.get("user_id")?,
            title: node.get("title")?,
            description: non_empty(node, "description"),
            status: node
                .get::<String>("status")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(ProjectStatus::Active),
            current_step_index: node.get::<i64>("current_step_index").unwrap_or(0) as u32,
            total_steps: node.get::<i64>("total_steps").unwrap_or(0) as u32,
            created_at: parse_time(node, "created_at").unwrap_or_else(Utc::now),
            updated_at: parse_time(node, "updated_at").unwrap_or_else(Utc::now),
        })
    }

    fn node_to_step(&self, node: &Node) -> Result<Step> {
        Ok(Step {
            id: node.get::<String>("id")?.parse()?,
            project_id: node.get::<String>("project_id")?.parse()?,
            title: node.get("title")?,
            description: node.get::<String>("description").unwrap_or_default(),
            status: node
                .get::<String>("status")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(StepStatus::Pending),
            order: node.get::<i64>("order")? as u32,
            automatable: node.get::<bool>("automatable").unwrap_or(false),
            automation_attempted: node.get::<bool>("automation_attempted").unwrap_or(false),
            automation_result: non_empty(node, "automation_result"),
            created_at: parse_time(node, "created_at").unwrap_or_else(Utc::now),
            updated_at: parse_time(node, "updated_at").unwrap_or_else(Utc::now),
            completed_at: parse_time(node, "completed_at"),
        })
    }

    fn node_to_notification(&self, node: &Node) -> Result<Notification> {
        Ok(Notification {
            id: node.get::<String>("id")?.parse()?,
            user_id: node.get("user_id")?,
            project_id: node.get::<String>("project_id")?.parse()?,
            step_id: non_empty(node, "step_id").and_then(|s| s.parse().ok()),
            title: node.get("title")?,
            body: node.get("body")?,
            kind: node.get::<String>("type")?.parse()?,
            read: node.get::<bool>("read").unwrap_or(false),
            created_at: parse_time(node, "created_at").unwrap_or_else(Utc::now),
        })
    }

    fn node_to_push_token(&self, node: &Node) -> Result<PushToken> {
        Ok(PushToken {
            token: node.get("token")?,
            user_id: node.get("user_id")?,
            platform: non_empty(node, "platform"),
            updated_at: parse_time(node, "updated_at").unwrap_or_else(Utc::now),
        })
    }
}
