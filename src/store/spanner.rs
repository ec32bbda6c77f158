use anyhow::{Context, Result};
use async_trait::async_trait;
use gcloud_gax::grpc::{Code, Status};
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_googleapis::spanner::v1::Mutation;
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert, update};
use gcloud_spanner::statement::Statement;
use gcloud_spanner::transaction_rw::ReadWriteTransaction;
use gcloud_spanner::value::CommitTimestamp;
use std::sync::Arc;

use super::{KeyPage, KvStore, SwapOutcome};
use crate::config::SpannerConfig;

const TABLE: &str = "intake_ledger";

/// Shareable Spanner-backed key-value store
///
/// Rows live in a single `intake_ledger` table keyed by the full ledger key.
/// Values are kept as raw JSON text (not the `JSON` column type) so records
/// come back byte-for-byte as they were written.
#[derive(Clone)]
pub struct SpannerClient {
    inner: Arc<Client>,
}

impl SpannerClient {
    /// Create a new Spanner client from configuration
    ///
    /// The gcloud-spanner library picks up SPANNER_EMULATOR_HOST from the
    /// environment and connects to the emulator when it is set.
    ///
    /// Instance, database and table are created on first use if missing.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = format!(
            "projects/{}/instances/{}/databases/{}",
            config.project, config.instance, config.database
        );

        match config.emulator_host.as_deref() {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }

    /// `insert` stamps both timestamps; `update` leaves `created_at` alone so a
    /// row keeps the time it was first written.
    fn write_mutation(exists: bool, key: &str, value: &str) -> Mutation {
        let key = key.to_string();
        let value = value.to_string();
        if exists {
            update(
                TABLE,
                &["id", "data", "updated_at"],
                &[&key, &value, &CommitTimestamp::new()],
            )
        } else {
            insert(
                TABLE,
                &["id", "data", "created_at", "updated_at"],
                &[&key, &value, &CommitTimestamp::new(), &CommitTimestamp::new()],
            )
        }
    }
}

/// Current `data` of `key` inside a read-write transaction
async fn read_in_tx(
    tx: &mut ReadWriteTransaction,
    key: &str,
) -> std::result::Result<Option<String>, SpannerError> {
    let mut statement = Statement::new("SELECT data FROM intake_ledger WHERE id = @id");
    statement.add_param("id", &key.to_string());

    let mut result_set = tx.query(statement).await?;
    match result_set.next().await? {
        Some(row) => Ok(Some(row.column_by_name("data")?)),
        None => Ok(None),
    }
}

#[async_trait]
impl KvStore for SpannerClient {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut statement = Statement::new("SELECT data FROM intake_ledger WHERE id = @id");
        statement.add_param("id", &key.to_string());

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query key from Spanner")?;

        match result_set.next().await? {
            Some(row) => {
                let data: String = row.column_by_name("data")?;
                tracing::debug!("Read key: {}", key);
                Ok(Some(data))
            }
            None => {
                tracing::debug!("Key not found: {}", key);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();

        self.inner
            .read_write_transaction(|tx| {
                let key = key.clone();
                let value = value.clone();
                Box::pin(async move {
                    let exists = read_in_tx(tx, &key).await?.is_some();
                    tx.buffer_write(vec![Self::write_mutation(exists, &key, &value)]);
                    Ok::<_, SpannerError>(())
                })
            })
            .await
            .context("Failed to write key to Spanner")?;

        tracing::debug!("Stored key: {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner
            .apply(vec![delete(TABLE, Key::new(&key.to_string()))])
            .await
            .context("Failed to delete key from Spanner")?;

        tracing::debug!("Deleted key: {}", key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str, cursor: Option<&str>, limit: usize) -> Result<KeyPage> {
        let limit = limit.max(1);

        let mut statement = Statement::new(
            "SELECT id FROM intake_ledger \
             WHERE STARTS_WITH(id, @prefix) AND id > @cursor \
             ORDER BY id LIMIT @limit",
        );
        statement.add_param("prefix", &prefix.to_string());
        statement.add_param("cursor", &cursor.unwrap_or("").to_string());
        statement.add_param("limit", &(limit as i64));

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction for listing")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to list keys from Spanner")?;

        let mut keys = Vec::new();
        while let Some(row) = result_set.next().await? {
            let key: String = row.column_by_name("id")?;
            keys.push(key);
        }

        tracing::debug!(
            "Listed {} keys (prefix: {:?}, cursor: {:?}, limit: {})",
            keys.len(),
            prefix,
            cursor,
            limit
        );

        Ok(KeyPage::from_keys(keys, limit))
    }

    async fn swap(&self, from: &str, expected: &str, to: &str, value: &str) -> Result<SwapOutcome> {
        let from = from.to_string();
        let expected = expected.to_string();
        let to = to.to_string();
        let value = value.to_string();

        // The read and both mutations commit together or not at all; Spanner
        // aborts and replays the closure if another transaction touched `from`.
        let (_, outcome) = self.inner
            .read_write_transaction(|tx| {
                let from = from.clone();
                let expected = expected.clone();
                let to = to.clone();
                let value = value.clone();
                Box::pin(async move {
                    let current = read_in_tx(tx, &from).await?;
                    let outcome = match current {
                        None => SwapOutcome::Missing,
                        Some(current) if current != expected => SwapOutcome::Changed,
                        Some(_) => {
                            let target_exists = read_in_tx(tx, &to).await?.is_some();
                            tx.buffer_write(vec![
                                Self::write_mutation(target_exists, &to, &value),
                                delete(TABLE, Key::new(&from)),
                            ]);
                            SwapOutcome::Swapped
                        }
                    };
                    Ok::<_, SpannerError>(outcome)
                })
            })
            .await
            .context("Failed to commit stage transition to Spanner")?;

        tracing::debug!("Swap {} -> {}: {:?}", from, to, outcome);
        Ok(outcome)
    }

    /// Run `SELECT 1` to verify the database is reachable
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }
}

const TABLE_DDL: &str = "CREATE TABLE intake_ledger (
    id STRING(MAX) NOT NULL,
    data STRING(MAX) NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)";

/// Create the instance, database and `intake_ledger` table if any is missing
///
/// Lets a fresh emulator come up with no manual setup.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    let admin = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let provisioner = Provisioner::new(&admin, config);
    provisioner.instance().await?;
    provisioner.database().await?;
    provisioner.table().await?;

    tracing::info!("Spanner resources ready at {}", provisioner.database_path);
    Ok(())
}

struct Provisioner<'a> {
    admin: &'a AdminClient,
    config: &'a SpannerConfig,
    project_path: String,
    instance_path: String,
    database_path: String,
}

impl<'a> Provisioner<'a> {
    fn new(admin: &'a AdminClient, config: &'a SpannerConfig) -> Self {
        let project_path = format!("projects/{}", config.project);
        let instance_path = format!("{}/instances/{}", project_path, config.instance);
        let database_path = format!("{}/databases/{}", instance_path, config.database);
        Self {
            admin,
            config,
            project_path,
            instance_path,
            database_path,
        }
    }

    /// `Ok(true)` if the resource exists, `Ok(false)` on NotFound
    fn exists<T>(what: &str, lookup: std::result::Result<T, Status>) -> Result<bool> {
        match lookup {
            Ok(_) => Ok(true),
            Err(status) if status.code() == Code::NotFound => Ok(false),
            Err(status) => Err(anyhow::anyhow!(
                "Failed to check {} existence: {}",
                what,
                status.message()
            )),
        }
    }

    async fn instance(&self) -> Result<()> {
        let lookup = self
            .admin
            .instance()
            .get_instance(
                GetInstanceRequest {
                    name: self.instance_path.clone(),
                    field_mask: None,
                },
                None,
            )
            .await;
        if Self::exists("instance", lookup)? {
            tracing::debug!("Instance present: {}", self.instance_path);
            return Ok(());
        }

        // The emulator only accepts its own instance config
        let instance_config = match self.config.emulator_host {
            Some(_) => format!("{}/instanceConfigs/emulator-config", self.project_path),
            None => format!("{}/instanceConfigs/regional-us-central1", self.project_path),
        };

        tracing::info!("Creating instance {}", self.instance_path);
        self.admin
            .instance()
            .create_instance(
                CreateInstanceRequest {
                    parent: self.project_path.clone(),
                    instance_id: self.config.instance.clone(),
                    instance: Some(Instance {
                        name: self.instance_path.clone(),
                        config: instance_config,
                        display_name: format!("{} instance", self.config.instance),
                        node_count: 1,
                        ..Default::default()
                    }),
                },
                None,
            )
            .await
            .context("Failed to start instance creation")?
            .wait(None)
            .await
            .context("Failed to create instance")?;
        Ok(())
    }

    async fn database(&self) -> Result<()> {
        let lookup = self
            .admin
            .database()
            .get_database(
                GetDatabaseRequest {
                    name: self.database_path.clone(),
                },
                None,
            )
            .await;
        if Self::exists("database", lookup)? {
            tracing::debug!("Database present: {}", self.database_path);
            return Ok(());
        }

        tracing::info!("Creating database {}", self.database_path);
        self.admin
            .database()
            .create_database(
                CreateDatabaseRequest {
                    parent: self.instance_path.clone(),
                    create_statement: format!("CREATE DATABASE `{}`", self.config.database),
                    extra_statements: vec![],
                    encryption_config: None,
                    database_dialect: 1, // GoogleSQL
                    proto_descriptors: vec![],
                },
                None,
            )
            .await
            .context("Failed to start database creation")?
            .wait(None)
            .await
            .context("Failed to create database")?;
        Ok(())
    }

    async fn table(&self) -> Result<()> {
        let statements = self
            .admin
            .database()
            .get_database_ddl(
                GetDatabaseDdlRequest {
                    database: self.database_path.clone(),
                },
                None,
            )
            .await
            .context("Failed to get database DDL")?
            .into_inner()
            .statements;

        let present = statements.iter().any(|stmt| {
            stmt.contains(&format!("CREATE TABLE {} ", TABLE))
                || stmt.contains(&format!("CREATE TABLE `{}`", TABLE))
        });
        if present {
            tracing::debug!("Table present: {}", TABLE);
            return Ok(());
        }

        tracing::info!("Creating table {}", TABLE);
        self.admin
            .database()
            .update_database_ddl(
                UpdateDatabaseDdlRequest {
                    database: self.database_path.clone(),
                    statements: vec![TABLE_DDL.to_string()],
                    operation_id: String::new(),
                    proto_descriptors: vec![],
                    throughput_mode: false,
                },
                None,
            )
            .await
            .context("Failed to start table creation")?
            .wait(None)
            .await
            .context("Failed to create table")?;
        Ok(())
    }
}
