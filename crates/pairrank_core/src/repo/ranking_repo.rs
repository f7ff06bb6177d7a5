//! Ranking storage contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist lists, items, ratings and comparison pairs.
//! - Offer a unit-of-work primitive with read-modify-write atomicity so the
//!   ledger can check and close a pair in one step.
//!
//! # Invariants
//! - An item and its rating are created in the same write.
//! - `close_pair` only ever transitions an open pair; it reports whether it
//!   did so.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{latest_version, REQUIRED_TABLES};
use crate::db::DbError;
use crate::model::item::{Item, ItemId, ListId, RankList};
use crate::model::pair::{Pair, PairId, PairState, Verdict};
use crate::model::rating::{RatedItem, Rating};
use crate::model::ValidationError;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const RATED_ITEM_SELECT_SQL: &str = "SELECT
    i.id AS id,
    i.list_id AS list_id,
    i.kind AS kind,
    i.payload AS payload,
    i.active AS active,
    r.strength AS strength,
    r.comparisons AS comparisons
FROM items i
JOIN ratings r ON r.item_id = i.id";

const PAIR_SELECT_SQL: &str = "SELECT
    id,
    list_id,
    left_item_id,
    right_item_id,
    resolved,
    winner_item_id
FROM pairs";

pub type RepoResult<T> = Result<T, RepoError>;

/// Identifies the record a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    List(ListId),
    Item(ItemId),
    Pair(PairId),
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(id) => write!(f, "list {id}"),
            Self::Item(id) => write!(f, "item {id}"),
            Self::Pair(id) => write!(f, "pair {id}"),
        }
    }
}

/// Repository error for ranking persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(RecordRef),
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(record) => write!(f, "{record} not found"),
            Self::InvalidData(message) => write!(f, "invalid persisted ranking data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "ranking repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "ranking repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Ordering applied by `list_active_items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrder {
    /// Least-compared first; ties in insertion order. Used for sampling.
    ComparisonsAsc,
    /// Strongest first; ties in insertion order. Used for status.
    StrengthDesc,
}

/// Storage contract consumed by the ranking engine.
pub trait RankingRepository {
    fn create_list(&self, name: &str) -> RepoResult<RankList>;
    fn get_list(&self, id: ListId) -> RepoResult<Option<RankList>>;
    /// Lists all lists, newest first.
    fn list_lists(&self) -> RepoResult<Vec<RankList>>;
    fn list_exists(&self, id: ListId) -> RepoResult<bool>;

    /// Creates an item together with its initial rating.
    fn create_item(&self, item: &Item, rating: Rating) -> RepoResult<ItemId>;
    /// Loads one item with its rating; inactive items are included.
    fn get_item(&self, id: ItemId) -> RepoResult<Option<RatedItem>>;
    fn list_items(&self, list_id: ListId, include_inactive: bool) -> RepoResult<Vec<RatedItem>>;
    fn update_item(&self, item: &Item) -> RepoResult<()>;
    /// Marks an item inactive. Repeating the call is a no-op.
    fn soft_delete_item(&self, list_id: ListId, id: ItemId) -> RepoResult<()>;
    fn item_exists(&self, id: ItemId) -> RepoResult<bool>;

    fn get_rating(&self, item_id: ItemId) -> RepoResult<Rating>;
    fn set_rating(&self, item_id: ItemId, rating: Rating) -> RepoResult<()>;
    /// Active items of one list with ratings, in `order`, at most `limit`.
    fn list_active_items(
        &self,
        list_id: ListId,
        order: ItemOrder,
        limit: Option<usize>,
    ) -> RepoResult<Vec<RatedItem>>;

    fn insert_pair(&self, pair: &Pair) -> RepoResult<()>;
    /// Loads a pair only when it belongs to `list_id`.
    fn get_pair(&self, list_id: ListId, id: PairId) -> RepoResult<Option<Pair>>;
    /// Resolves an open pair. Returns `false` when it was already resolved.
    fn close_pair(&self, id: PairId, verdict: Verdict) -> RepoResult<bool>;

    /// Runs `work` as one atomic unit: committed on `Ok`, rolled back on `Err`.
    ///
    /// Concurrent units touching the same records are serialized. A nested
    /// unit that fails is rolled back on its own, leaving the outer unit open.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed ranking repository.
pub struct SqliteRankingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRankingRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Runs `work` inside an immediate transaction. When a transaction is
    /// already open, `work` runs in a savepoint of it instead, so a failed
    /// inner unit is undone even if the caller recovers and commits.
    fn in_write_unit<T, E>(
        &self,
        work: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        if !self.conn.is_autocommit() {
            return self.in_savepoint(work);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = work(&tx)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }

    fn in_savepoint<T, E>(&self, work: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let name = format!("unit_{}", Uuid::new_v4().simple());
        self.conn
            .execute_batch(&format!("SAVEPOINT {name};"))
            .map_err(RepoError::from)?;

        match work(self.conn) {
            Ok(value) => {
                self.conn
                    .execute_batch(&format!("RELEASE {name};"))
                    .map_err(RepoError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self
                    .conn
                    .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"))
                {
                    warn!(
                        "event=write_unit module=repo status=error savepoint={name} error_code=rollback_failed error={rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }
}

impl RankingRepository for SqliteRankingRepository<'_> {
    fn create_list(&self, name: &str) -> RepoResult<RankList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyListName.into());
        }

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO lists (id, name) VALUES (?1, ?2);",
            params![id.to_string(), name],
        )?;

        self.get_list(id)?
            .ok_or_else(|| RepoError::InvalidData(format!("list {id} missing after insert")))
    }

    fn get_list(&self, id: ListId) -> RepoResult<Option<RankList>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM lists WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>("id")?,
                        row.get::<_, String>("name")?,
                        row.get::<_, i64>("created_at")?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id_text, name, created_at)| -> RepoResult<RankList> {
            Ok(RankList {
                id: parse_uuid(&id_text, "lists.id")?,
                name,
                created_at,
            })
        })
        .transpose()
    }

    fn list_lists(&self) -> RepoResult<Vec<RankList>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_at
             FROM lists
             ORDER BY created_at DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            lists.push(RankList {
                id: parse_uuid(&id_text, "lists.id")?,
                name: row.get("name")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(lists)
    }

    fn list_exists(&self, id: ListId) -> RepoResult<bool> {
        exists(self.conn, "SELECT EXISTS(SELECT 1 FROM lists WHERE id = ?1);", id)
    }

    fn create_item(&self, item: &Item, rating: Rating) -> RepoResult<ItemId> {
        item.validate()?;
        let payload = encode_payload(item)?;

        self.in_write_unit(|conn| -> RepoResult<()> {
            conn.execute(
                "INSERT INTO items (id, list_id, kind, payload, active)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    item.id.to_string(),
                    item.list_id.to_string(),
                    item.kind.as_str(),
                    payload,
                    bool_to_int(item.active),
                ],
            )?;
            conn.execute(
                "INSERT INTO ratings (item_id, strength, comparisons) VALUES (?1, ?2, ?3);",
                params![item.id.to_string(), rating.strength, rating.comparisons],
            )?;
            Ok(())
        })?;

        Ok(item.id)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<RatedItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RATED_ITEM_SELECT_SQL} WHERE i.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_rated_item_row(row)?));
        }
        Ok(None)
    }

    fn list_items(&self, list_id: ListId, include_inactive: bool) -> RepoResult<Vec<RatedItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RATED_ITEM_SELECT_SQL}
             WHERE i.list_id = ?1
               AND (?2 = 1 OR i.active = 1)
             ORDER BY i.rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![list_id.to_string(), bool_to_int(include_inactive)])?;
        collect_rated_items(&mut rows)
    }

    fn update_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;
        let payload = encode_payload(item)?;

        let changed = self.conn.execute(
            "UPDATE items
             SET
                kind = ?1,
                payload = ?2,
                active = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?4
               AND list_id = ?5;",
            params![
                item.kind.as_str(),
                payload,
                bool_to_int(item.active),
                item.id.to_string(),
                item.list_id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(RecordRef::Item(item.id)));
        }
        Ok(())
    }

    fn soft_delete_item(&self, list_id: ListId, id: ItemId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET
                active = 0,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND list_id = ?2;",
            params![id.to_string(), list_id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(RecordRef::Item(id)));
        }
        Ok(())
    }

    fn item_exists(&self, id: ItemId) -> RepoResult<bool> {
        exists(self.conn, "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1);", id)
    }

    fn get_rating(&self, item_id: ItemId) -> RepoResult<Rating> {
        self.conn
            .query_row(
                "SELECT strength, comparisons FROM ratings WHERE item_id = ?1;",
                [item_id.to_string()],
                |row| {
                    Ok(Rating {
                        strength: row.get("strength")?,
                        comparisons: row.get("comparisons")?,
                    })
                },
            )
            .optional()?
            .ok_or(RepoError::NotFound(RecordRef::Item(item_id)))
    }

    fn set_rating(&self, item_id: ItemId, rating: Rating) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE ratings
             SET
                strength = ?1,
                comparisons = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_id = ?3;",
            params![rating.strength, rating.comparisons, item_id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(RecordRef::Item(item_id)));
        }
        Ok(())
    }

    fn list_active_items(
        &self,
        list_id: ListId,
        order: ItemOrder,
        limit: Option<usize>,
    ) -> RepoResult<Vec<RatedItem>> {
        let order_sql = match order {
            ItemOrder::ComparisonsAsc => "r.comparisons ASC, i.rowid ASC",
            ItemOrder::StrengthDesc => "r.strength DESC, i.rowid ASC",
        };
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit
            .map(|value| i64::try_from(value).unwrap_or(i64::MAX))
            .unwrap_or(-1);

        let mut stmt = self.conn.prepare(&format!(
            "{RATED_ITEM_SELECT_SQL}
             WHERE i.list_id = ?1
               AND i.active = 1
             ORDER BY {order_sql}
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![list_id.to_string(), limit])?;
        collect_rated_items(&mut rows)
    }

    fn insert_pair(&self, pair: &Pair) -> RepoResult<()> {
        pair.validate()?;
        let (resolved, winner) = pair_state_to_db(pair.state);

        self.conn.execute(
            "INSERT INTO pairs (id, list_id, left_item_id, right_item_id, resolved, winner_item_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                pair.id.to_string(),
                pair.list_id.to_string(),
                pair.left.to_string(),
                pair.right.to_string(),
                resolved,
                winner,
            ],
        )?;
        Ok(())
    }

    fn get_pair(&self, list_id: ListId, id: PairId) -> RepoResult<Option<Pair>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PAIR_SELECT_SQL}
             WHERE id = ?1
               AND list_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), list_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_pair_row(row)?));
        }
        Ok(None)
    }

    fn close_pair(&self, id: PairId, verdict: Verdict) -> RepoResult<bool> {
        let winner = match verdict {
            Verdict::Winner(item_id) => Some(item_id.to_string()),
            Verdict::Void => None,
        };

        let changed = self.conn.execute(
            "UPDATE pairs
             SET
                resolved = 1,
                winner_item_id = ?2,
                resolved_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND resolved = 0;",
            params![id.to_string(), winner],
        )?;
        Ok(changed == 1)
    }

    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        self.in_write_unit(|_| work(self))
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &table in REQUIRED_TABLES {
        let found: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if found != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn exists(conn: &Connection, sql: &str, id: Uuid) -> RepoResult<bool> {
    let found: i64 = conn.query_row(sql, [id.to_string()], |row| row.get(0))?;
    Ok(found == 1)
}

fn collect_rated_items(rows: &mut rusqlite::Rows<'_>) -> RepoResult<Vec<RatedItem>> {
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_rated_item_row(row)?);
    }
    Ok(items)
}

fn parse_rated_item_row(row: &Row<'_>) -> RepoResult<RatedItem> {
    let id_text: String = row.get("id")?;
    let list_text: String = row.get("list_id")?;
    let payload_text: String = row.get("payload")?;
    let payload = serde_json::from_str(&payload_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid payload json for item {id_text}: {err}"))
    })?;

    let item = Item {
        id: parse_uuid(&id_text, "items.id")?,
        list_id: parse_uuid(&list_text, "items.list_id")?,
        kind: row.get("kind")?,
        payload,
        active: int_to_bool(row.get("active")?, "items.active")?,
    };
    item.validate()?;

    Ok(RatedItem {
        item,
        rating: Rating {
            strength: row.get("strength")?,
            comparisons: row.get("comparisons")?,
        },
    })
}

fn parse_pair_row(row: &Row<'_>) -> RepoResult<Pair> {
    let id_text: String = row.get("id")?;
    let list_text: String = row.get("list_id")?;
    let left_text: String = row.get("left_item_id")?;
    let right_text: String = row.get("right_item_id")?;
    let resolved = int_to_bool(row.get("resolved")?, "pairs.resolved")?;
    let winner = row
        .get::<_, Option<String>>("winner_item_id")?
        .map(|value| parse_uuid(&value, "pairs.winner_item_id"))
        .transpose()?;

    let state = match (resolved, winner) {
        (false, None) => PairState::Open,
        (false, Some(_)) => {
            return Err(RepoError::InvalidData(format!(
                "open pair {id_text} carries a winner"
            )));
        }
        (true, None) => PairState::Resolved(Verdict::Void),
        (true, Some(winner)) => PairState::Resolved(Verdict::Winner(winner)),
    };

    let pair = Pair {
        id: parse_uuid(&id_text, "pairs.id")?,
        list_id: parse_uuid(&list_text, "pairs.list_id")?,
        left: parse_uuid(&left_text, "pairs.left_item_id")?,
        right: parse_uuid(&right_text, "pairs.right_item_id")?,
        state,
    };
    pair.validate()?;
    Ok(pair)
}

fn pair_state_to_db(state: PairState) -> (i64, Option<String>) {
    match state {
        PairState::Open => (0, None),
        PairState::Resolved(Verdict::Void) => (1, None),
        PairState::Resolved(Verdict::Winner(id)) => (1, Some(id.to_string())),
    }
}

fn encode_payload(item: &Item) -> RepoResult<String> {
    serde_json::to_string(&item.payload).map_err(|err| {
        RepoError::InvalidData(format!("payload of item {} is not encodable: {err}", item.id))
    })
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
