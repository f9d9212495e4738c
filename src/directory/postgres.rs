//! PostgreSQL Slot Directory
//!
//! Production directory over a shared `sqlx` pool. Pooling is owned by
//! the collaborator that supplies the pool; this module issues one
//! statement per operation and nothing else.
//!
//! The listing column set and predicate (`NOT temporary AND
//! slot_type = 'physical'`) are load-bearing: operators expect exactly
//! this slot taxonomy.

use std::future::Future;

use futures_util::future::BoxFuture;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::context::ReconcileContext;
use crate::observability::Logger;
use crate::slots::{
    parse_optional_lsn, ReplicationSlot, ReplicationSlotList, ReplicationSlotsConfiguration,
    SlotError, SlotKind, SlotResult,
};

use super::{annotate_and_filter, SlotDirectory};

/// Listing query; columns and predicate must stay as-is
const LIST_SLOTS: &str = "SELECT slot_name, slot_type, active, \
     coalesce(restart_lsn::text, '') AS restart_lsn, \
     (xmin IS NOT NULL OR catalog_xmin IS NOT NULL) AS holds_xmin \
     FROM pg_catalog.pg_replication_slots \
     WHERE NOT temporary AND slot_type = 'physical'";

const CREATE_SLOT: &str = "SELECT pg_catalog.pg_create_physical_replication_slot($1, $2)";

const ADVANCE_SLOT: &str = "SELECT pg_catalog.pg_replication_slot_advance($1, $2::pg_lsn)";

const DROP_SLOT: &str = "SELECT pg_catalog.pg_drop_replication_slot($1)";

/// SQLSTATE for `duplicate_object`
const DUPLICATE_OBJECT: &str = "42710";
/// SQLSTATE for `undefined_object`
const UNDEFINED_OBJECT: &str = "42704";

/// Slot directory backed by a live PostgreSQL instance
pub struct PostgresSlotDirectory {
    pool: PgPool,
}

impl PostgresSlotDirectory {
    /// Wrap a shared connection pool.
    ///
    /// The pool is supplied by the caller; the directory never pools
    /// connections itself.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run one round trip under the tick's cancellation token.
    async fn round_trip<T, F>(
        &self,
        ctx: &ReconcileContext,
        operation: &'static str,
        slot_name: &str,
        query: F,
    ) -> SlotResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::select! {
            _ = ctx.cancellation().cancelled() => {
                Err(SlotError::cancelled(format!("{operation} {slot_name}")))
            }
            result = query => result.map_err(|e| map_sqlx_error(slot_name, e)),
        }
    }
}

/// Translate a driver error into the engine's error taxonomy.
fn map_sqlx_error(slot_name: &str, error: sqlx::Error) -> SlotError {
    match &error {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(DUPLICATE_OBJECT) => SlotError::AlreadyExists(slot_name.to_string()),
            Some(UNDEFINED_OBJECT) => SlotError::NotFound(slot_name.to_string()),
            _ => SlotError::query(error.to_string()),
        },
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_) => SlotError::row_decode(error.to_string()),
        _ => SlotError::query(error.to_string()),
    }
}

/// Decode one listing row into a slot; the HA flag is annotated later.
fn decode_row(row: &sqlx::postgres::PgRow) -> SlotResult<ReplicationSlot> {
    let name: String = row
        .try_get("slot_name")
        .map_err(|e| SlotError::row_decode(e.to_string()))?;
    let slot_type: String = row
        .try_get("slot_type")
        .map_err(|e| SlotError::row_decode(e.to_string()))?;
    let active: bool = row
        .try_get("active")
        .map_err(|e| SlotError::row_decode(e.to_string()))?;
    let restart_lsn: String = row
        .try_get("restart_lsn")
        .map_err(|e| SlotError::row_decode(e.to_string()))?;
    let holds_xmin: bool = row
        .try_get("holds_xmin")
        .map_err(|e| SlotError::row_decode(e.to_string()))?;

    if slot_type != SlotKind::Physical.as_str() {
        return Err(SlotError::row_decode(format!(
            "slot {name}: unexpected slot_type {slot_type:?}"
        )));
    }
    let restart_lsn = parse_optional_lsn(&restart_lsn)
        .map_err(|e| SlotError::row_decode(format!("slot {name}: {e}")))?;

    Ok(ReplicationSlot {
        name,
        kind: SlotKind::Physical,
        active,
        restart_lsn,
        holds_xmin_horizon: holds_xmin,
        is_high_availability: false,
    })
}

impl SlotDirectory for PostgresSlotDirectory {
    fn list<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        config: &'a ReplicationSlotsConfiguration,
    ) -> BoxFuture<'a, SlotResult<ReplicationSlotList>> {
        Box::pin(async move {
            let rows = self
                .round_trip(ctx, "list", "*", sqlx::query(LIST_SLOTS).fetch_all(&self.pool))
                .await?;

            let mut raw = Vec::with_capacity(rows.len());
            for row in &rows {
                raw.push(decode_row(row)?);
            }
            annotate_and_filter(raw, config)
        })
    }

    fn create<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>> {
        Box::pin(async move {
            let lsn = slot.restart_lsn_text();
            Logger::trace(
                "SLOT_CREATE_INVOKED",
                &[
                    ("cluster", &ctx.cluster.to_string()),
                    ("slot", &slot.name),
                    ("restart_lsn", &lsn),
                ],
            );

            // Reserve WAL immediately only when a position is already known.
            let query = sqlx::query(CREATE_SLOT)
                .bind(&slot.name)
                .bind(slot.restart_lsn.is_some())
                .execute(&self.pool);
            self.round_trip(ctx, "create", &slot.name, query).await?;
            Ok(())
        })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>> {
        Box::pin(async move {
            // Nothing to advance to yet; success without a round trip.
            let Some(target) = slot.restart_lsn else {
                return Ok(());
            };
            let lsn = target.to_string();
            Logger::trace(
                "SLOT_ADVANCE_INVOKED",
                &[
                    ("cluster", &ctx.cluster.to_string()),
                    ("slot", &slot.name),
                    ("restart_lsn", &lsn),
                ],
            );

            let query = sqlx::query(ADVANCE_SLOT)
                .bind(&slot.name)
                .bind(lsn)
                .execute(&self.pool);
            self.round_trip(ctx, "update", &slot.name, query).await?;
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        ctx: &'a ReconcileContext,
        slot: &'a ReplicationSlot,
    ) -> BoxFuture<'a, SlotResult<()>> {
        Box::pin(async move {
            // Dropping an in-use slot would break the replication
            // connection consuming it; retry on a later tick instead.
            if slot.active {
                return Ok(());
            }
            Logger::trace(
                "SLOT_DROP_INVOKED",
                &[
                    ("cluster", &ctx.cluster.to_string()),
                    ("slot", &slot.name),
                ],
            );

            let query = sqlx::query(DROP_SLOT).bind(&slot.name).execute(&self.pool);
            self.round_trip(ctx, "delete", &slot.name, query).await?;
            Ok(())
        })
    }
}
