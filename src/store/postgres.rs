use super::{FailedSnapshotRecord, ServerRecord, StatsStore};
use crate::report::Snapshot;
use anyhow::{Context, Result as AnyhowResult};
use log::error;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};

/// PostgreSQL-backed stats store.
///
/// Connects once at startup and drives the connection on a background task.
/// Round writes run inside a single transaction so the round row and its
/// player rows commit together or not at all.
pub struct PostgresStore {
    client: Mutex<Client>,
}

impl PostgresStore {
    /// Connects to PostgreSQL and ensures the schema exists.
    ///
    /// # Arguments
    ///
    /// * `db_params` - PostgreSQL connection string
    ///   (e.g., "host=localhost user=postgres password=example dbname=round_stats").
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresStore)` - Connected store with tables created.
    /// * `Err(anyhow::Error)` - Connection or schema creation failed.
    pub async fn connect(db_params: &str) -> AnyhowResult<Self> {
        let (client, connection) = tokio_postgres::connect(db_params, NoTls)
            .await
            .context("Failed to connect to PostgreSQL")?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Database connection error: {}", e);
            }
        });

        create_tables(&client).await.context("Failed to create tables")?;

        Ok(Self {
            client: Mutex::new(client),
        })
    }
}

/// Creates the stats tables and indexes if they don't already exist.
///
/// - `servers` is keyed by the authId/ip/port identity triple.
/// - `rounds` carries the content-derived idempotency key
///   (`server_id`, `map_name`, `map_end`) as a unique constraint, plus the
///   SHA-256 digest of the inbound file for diagnostics.
/// - `round_players` holds one row per player line.
/// - `failed_snapshots` is the operator-facing failure log.
async fn create_tables(client: &Client) -> AnyhowResult<()> {
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS servers (
                id SERIAL PRIMARY KEY,
                auth_id TEXT NOT NULL,
                ip TEXT NOT NULL,
                port INT NOT NULL,
                authorized BOOLEAN NOT NULL DEFAULT FALSE,
                UNIQUE(auth_id, ip, port)
            )",
            &[],
        )
        .await
        .context("Failed to create servers table")?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS rounds (
                id SERIAL PRIMARY KEY,
                server_id INT NOT NULL REFERENCES servers(id),
                map_name TEXT NOT NULL,
                map_end BIGINT NOT NULL,
                player_count INT NOT NULL,
                digest TEXT NOT NULL,
                UNIQUE(server_id, map_name, map_end)
            )",
            &[],
        )
        .await
        .context("Failed to create rounds table")?;

    client
        .execute(
            "CREATE INDEX IF NOT EXISTS rounds_map_end ON rounds (map_end)",
            &[],
        )
        .await
        .context("Failed to create index on rounds")?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS round_players (
                id SERIAL PRIMARY KEY,
                round_id INT NOT NULL REFERENCES rounds(id),
                name TEXT NOT NULL,
                rank BIGINT NOT NULL,
                score BIGINT NOT NULL,
                kills BIGINT NOT NULL,
                deaths BIGINT NOT NULL
            )",
            &[],
        )
        .await
        .context("Failed to create round_players table")?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS failed_snapshots (
                id SERIAL PRIMARY KEY,
                server_id INT REFERENCES servers(id),
                failed_at BIGINT NOT NULL,
                filename TEXT NOT NULL,
                reason TEXT NOT NULL
            )",
            &[],
        )
        .await
        .context("Failed to create failed_snapshots table")?;

    Ok(())
}

impl StatsStore for PostgresStore {
    async fn find_server(
        &self,
        auth_id: &str,
        ip: &str,
        port: u16,
    ) -> AnyhowResult<Option<ServerRecord>> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "SELECT id, auth_id, ip, port, authorized FROM servers
                 WHERE auth_id = $1 AND ip = $2 AND port = $3",
                &[&auth_id, &ip, &(i32::from(port))],
            )
            .await
            .context("Failed to query servers")?;

        Ok(row.map(|row| ServerRecord {
            id: row.get(0),
            auth_id: row.get(1),
            ip: row.get(2),
            port: row.get::<_, i32>(3) as u16,
            authorized: row.get(4),
        }))
    }

    async fn create_server(
        &self,
        auth_id: &str,
        ip: &str,
        port: u16,
        authorized: bool,
    ) -> AnyhowResult<i32> {
        let client = self.client.lock().await;
        // The no-op DO UPDATE makes RETURNING yield the existing id when the
        // triple is already registered.
        let row = client
            .query_one(
                "INSERT INTO servers (auth_id, ip, port, authorized)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (auth_id, ip, port) DO UPDATE SET auth_id = EXCLUDED.auth_id
                 RETURNING id",
                &[&auth_id, &ip, &(i32::from(port)), &authorized],
            )
            .await
            .context("Failed to insert into servers")?;
        Ok(row.get(0))
    }

    async fn find_existing_round(
        &self,
        server_id: i32,
        map_name: &str,
        map_end: i64,
    ) -> AnyhowResult<bool> {
        let client = self.client.lock().await;
        let row = client
            .query_opt(
                "SELECT id FROM rounds
                 WHERE server_id = $1 AND map_name = $2 AND map_end = $3",
                &[&server_id, &map_name, &map_end],
            )
            .await
            .context("Failed to query rounds")?;
        Ok(row.is_some())
    }

    async fn write_round(&self, snapshot: &Snapshot) -> AnyhowResult<()> {
        let mut client = self.client.lock().await;
        let transaction = client
            .transaction()
            .await
            .context("Failed to start transaction")?;

        let player_count = snapshot.players.len() as i32;
        let row = transaction
            .query_opt(
                "INSERT INTO rounds (server_id, map_name, map_end, player_count, digest)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (server_id, map_name, map_end) DO NOTHING
                 RETURNING id",
                &[
                    &snapshot.server_id,
                    &snapshot.map_name,
                    &snapshot.map_end,
                    &player_count,
                    &snapshot.digest,
                ],
            )
            .await
            .context("Failed to insert into rounds")?;

        // No id means a concurrent accept committed the same round first;
        // the unique key makes this write a no-op.
        if let Some(row) = row {
            let round_id: i32 = row.get(0);
            for player in &snapshot.players {
                transaction
                    .execute(
                        "INSERT INTO round_players (round_id, name, rank, score, kills, deaths)
                         VALUES ($1, $2, $3, $4, $5, $6)",
                        &[
                            &round_id,
                            &player.name,
                            &player.rank,
                            &player.score,
                            &player.kills,
                            &player.deaths,
                        ],
                    )
                    .await
                    .context(format!("Failed to insert player row for {}", player.name))?;
            }
        }

        transaction
            .commit()
            .await
            .context("Failed to commit round transaction")?;
        Ok(())
    }

    async fn insert_failure(
        &self,
        server_id: Option<i32>,
        failed_at: i64,
        filename: &str,
        reason: &str,
    ) -> AnyhowResult<i32> {
        let client = self.client.lock().await;
        let row = client
            .query_one(
                "INSERT INTO failed_snapshots (server_id, failed_at, filename, reason)
                 VALUES ($1, $2, $3, $4) RETURNING id",
                &[&server_id, &failed_at, &filename, &reason],
            )
            .await
            .context("Failed to insert into failed_snapshots")?;
        Ok(row.get(0))
    }

    async fn list_failures(&self) -> AnyhowResult<Vec<FailedSnapshotRecord>> {
        let client = self.client.lock().await;
        let rows = client
            .query(
                "SELECT id, server_id, failed_at, filename, reason
                 FROM failed_snapshots ORDER BY failed_at DESC, id DESC",
                &[],
            )
            .await
            .context("Failed to query failed_snapshots")?;

        Ok(rows
            .into_iter()
            .map(|row| FailedSnapshotRecord {
                id: row.get(0),
                server_id: row.get(1),
                failed_at: row.get(2),
                filename: row.get(3),
                reason: row.get(4),
            })
            .collect())
    }

    async fn delete_failure(&self, id: i32) -> AnyhowResult<bool> {
        let client = self.client.lock().await;
        let deleted = client
            .execute("DELETE FROM failed_snapshots WHERE id = $1", &[&id])
            .await
            .context("Failed to delete from failed_snapshots")?;
        Ok(deleted > 0)
    }
}
