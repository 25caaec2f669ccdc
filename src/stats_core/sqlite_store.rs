//! SQLite-backed record store
//!
//! Read-only queries over the relational schema in `sql/`. IN filters are
//! expanded into positional parameters; the windowed progression query runs a
//! `SUM(..) OVER (PARTITION BY entity ORDER BY round)` running total over
//! points coerced by the `normalize_points` scalar function, which applies the
//! same reading as `RawCell::as_points`.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params_from_iter, Connection, Row};

use super::normalizer::{RawCell, RawResultRow};
use super::store::{
    EntityFilter, EntityKind, EntityRecord, Race, RaceFilter, RecordStore, ResultFilter, Season,
    SeasonFilter, Session, SessionFilter, StandingsEntry, StoreError, WindowedProgressionRow,
};

/// WHERE clause builder with positional parameters
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Conditions {
    fn eq(&mut self, column: &str, value: i64) {
        self.clauses.push(format!("{} = ?", column));
        self.params.push(Value::Integer(value));
    }

    fn in_list(&mut self, column: &str, ids: &[i64]) {
        self.clauses.push(format!("{} IN ({})", column, placeholders(ids.len())));
        self.params.extend(ids.iter().map(|id| Value::Integer(*id)));
    }

    fn raw(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// An explicitly empty IN set matches nothing
fn matches_nothing(sets: &[&Option<Vec<i64>>]) -> bool {
    sets.iter().any(|set| matches!(set, Some(ids) if ids.is_empty()))
}

/// Registers `normalize_points(cell)` on the connection
fn register_normalize_points(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "normalize_points",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(RawCell::from(ctx.get::<Value>(0)?).as_points()),
    )
}

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open a store over an existing database file
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path.as_ref()).map_err(|e| StoreError::new("database", e))?;

        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| StoreError::new("database", e))?;
        register_normalize_points(&conn).map_err(|e| StoreError::new("database", e))?;

        log::info!(
            "📥 SQLite record store opened: {} (journal_mode={})",
            db_path.as_ref().display(),
            journal_mode
        );

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run every `.sql` file in `schema_dir`, in file name order
    ///
    /// Files must use `IF NOT EXISTS` so reruns are harmless.
    pub fn run_schema_migrations(&self, schema_dir: impl AsRef<Path>) -> Result<(), StoreError> {
        let schema_path = schema_dir.as_ref();
        if !schema_path.exists() {
            return Err(StoreError::new(
                "schema",
                format!("Schema directory not found: {}", schema_path.display()),
            ));
        }

        let mut sql_files: Vec<_> = fs::read_dir(schema_path)
            .map_err(|e| StoreError::new("schema", e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("sql"))
            .collect();
        sql_files.sort_by_key(|entry| entry.file_name());

        log::info!("🔧 Running schema migrations from: {}", schema_path.display());

        let conn = self.lock("schema")?;
        for entry in sql_files {
            let path = entry.path();
            let filename = entry.file_name().to_string_lossy().into_owned();

            let sql_content = fs::read_to_string(&path).map_err(|e| StoreError::new("schema", e))?;
            conn.execute_batch(&sql_content)
                .map_err(|e| StoreError::new("schema", format!("{}: {}", filename, e)))?;

            log::info!("   └─ ✅ Applied: {}", filename);
        }

        Ok(())
    }

    fn lock(&self, relation: &'static str) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::new(relation, "connection mutex poisoned"))
    }

    fn select<T>(
        &self,
        relation: &'static str,
        sql: &str,
        params: &[Value],
        map_row: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let conn = self.lock(relation)?;
        let mut stmt = conn.prepare(sql).map_err(|e| StoreError::new(relation, e))?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), map_row)
            .map_err(|e| StoreError::new(relation, e))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| StoreError::new(relation, e))?);
        }

        log::debug!("📥 {}: {} rows", relation, out.len());
        Ok(out)
    }

    fn query_results(&self, filter: &ResultFilter) -> Result<Vec<RawResultRow>, StoreError> {
        if matches_nothing(&[&filter.session_id_in, &filter.driver_id_in]) {
            return Ok(Vec::new());
        }

        let mut cond = Conditions::default();
        if let Some(ids) = &filter.session_id_in {
            cond.in_list("session_id", ids);
        }
        if let Some(ids) = &filter.driver_id_in {
            cond.in_list("driver_id", ids);
        }
        if let Some(id) = filter.constructor_id {
            cond.eq("constructor_id", id);
        }

        let sql = format!(
            "SELECT driver_id, constructor_id, session_id, position, points
             FROM race_results{}
             ORDER BY id ASC",
            cond.where_sql()
        );

        self.select("race_results", &sql, &cond.params, |row| {
            Ok(RawResultRow {
                driver_id: row.get(0)?,
                constructor_id: row.get(1)?,
                session_id: row.get(2)?,
                position: row.get::<_, Value>(3)?.into(),
                points: row.get::<_, Value>(4)?.into(),
            })
        })
    }

    fn query_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        if matches_nothing(&[&filter.id_in, &filter.race_id_in]) {
            return Ok(Vec::new());
        }

        let mut cond = Conditions::default();
        if let Some(ids) = &filter.id_in {
            cond.in_list("id", ids);
        }
        if let Some(ids) = &filter.race_id_in {
            cond.in_list("race_id", ids);
        }

        let sql = format!("SELECT id, race_id FROM sessions{} ORDER BY id ASC", cond.where_sql());
        self.select("sessions", &sql, &cond.params, |row| {
            Ok(Session {
                id: row.get(0)?,
                race_id: row.get(1)?,
            })
        })
    }

    fn query_races(&self, filter: &RaceFilter) -> Result<Vec<Race>, StoreError> {
        if matches_nothing(&[&filter.id_in]) {
            return Ok(Vec::new());
        }

        let mut cond = Conditions::default();
        if let Some(ids) = &filter.id_in {
            cond.in_list("id", ids);
        }
        if let Some(season_id) = filter.season_id {
            cond.eq("season_id", season_id);
        }

        let sql = format!(
            "SELECT id, season_id, round, name FROM races{} ORDER BY season_id ASC, round ASC",
            cond.where_sql()
        );
        self.select("races", &sql, &cond.params, |row| {
            Ok(Race {
                id: row.get(0)?,
                season_id: row.get(1)?,
                round: row.get(2)?,
                name: row.get(3)?,
            })
        })
    }

    fn query_seasons(&self, filter: &SeasonFilter) -> Result<Vec<Season>, StoreError> {
        if matches_nothing(&[&filter.id_in]) {
            return Ok(Vec::new());
        }

        let mut cond = Conditions::default();
        if let Some(ids) = &filter.id_in {
            cond.in_list("id", ids);
        }

        let sql = format!("SELECT id, year FROM seasons{} ORDER BY year ASC", cond.where_sql());
        self.select("seasons", &sql, &cond.params, |row| {
            Ok(Season {
                id: row.get(0)?,
                year: row.get(1)?,
            })
        })
    }

    fn query_entities(&self, kind: EntityKind, filter: &EntityFilter) -> Result<Vec<EntityRecord>, StoreError> {
        if matches_nothing(&[&filter.id_in]) {
            return Ok(Vec::new());
        }

        let mut cond = Conditions::default();
        if let Some(ids) = &filter.id_in {
            cond.in_list("id", ids);
        }

        match kind {
            EntityKind::Driver => {
                let sql = format!(
                    "SELECT id, forename, surname FROM drivers{} ORDER BY id ASC",
                    cond.where_sql()
                );
                self.select(kind.relation(), &sql, &cond.params, |row| {
                    Ok(EntityRecord::Driver {
                        id: row.get(0)?,
                        forename: row.get(1)?,
                        surname: row.get(2)?,
                    })
                })
            }
            EntityKind::Constructor => {
                if filter.active_only {
                    cond.raw("is_active = 1");
                }
                let sql = format!(
                    "SELECT id, name, is_active FROM constructors{} ORDER BY name ASC, id ASC",
                    cond.where_sql()
                );
                self.select(kind.relation(), &sql, &cond.params, |row| {
                    Ok(EntityRecord::Constructor {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        is_active: row.get(2)?,
                    })
                })
            }
        }
    }

    fn query_standings(&self, season_year: i32) -> Result<Vec<StandingsEntry>, StoreError> {
        self.select(
            "driver_standings_materialized",
            "SELECT driver_id, season_year, driver_full_name, position
             FROM driver_standings_materialized
             WHERE season_year = ?
             ORDER BY position IS NULL, position ASC, driver_id ASC",
            &[Value::Integer(season_year.into())],
            |row| {
                Ok(StandingsEntry {
                    driver_id: row.get(0)?,
                    season_year: row.get(1)?,
                    driver_full_name: row.get(2)?,
                    position: row.get(3)?,
                })
            },
        )
    }

    fn query_windowed(
        &self,
        kind: EntityKind,
        entity_ids: &[i64],
        season_year: i32,
    ) -> Result<Vec<WindowedProgressionRow>, StoreError> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let (column, name_expr, name_join) = match kind {
            EntityKind::Driver => (
                "driver_id",
                "dsm.driver_full_name",
                "LEFT JOIN driver_standings_materialized dsm
                   ON dsm.driver_id = p.entity_id AND dsm.season_year = ?",
            ),
            EntityKind::Constructor => (
                "constructor_id",
                "c.name",
                "LEFT JOIN constructors c ON c.id = p.entity_id",
            ),
        };

        let sql = format!(
            "WITH per_round AS (
                 SELECT rr.{column} AS entity_id,
                        ra.round AS round,
                        MAX(ra.name) AS race_name,
                        SUM(normalize_points(rr.points)) AS race_points
                 FROM race_results rr
                 JOIN sessions s ON s.id = rr.session_id
                 JOIN races ra ON ra.id = s.race_id
                 JOIN seasons se ON se.id = ra.season_id
                 WHERE rr.{column} IN ({ids}) AND se.year = ?
                 GROUP BY rr.{column}, ra.round
             )
             SELECT p.entity_id, {name_expr}, p.round, p.race_name, p.race_points,
                    SUM(p.race_points) OVER (
                        PARTITION BY p.entity_id ORDER BY p.round
                        ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW
                    ) AS cumulative_points
             FROM per_round p
             {name_join}
             ORDER BY p.entity_id ASC, p.round ASC",
            column = column,
            ids = placeholders(entity_ids.len()),
            name_expr = name_expr,
            name_join = name_join,
        );

        let mut params: Vec<Value> = entity_ids.iter().map(|id| Value::Integer(*id)).collect();
        params.push(Value::Integer(season_year.into()));
        if kind == EntityKind::Driver {
            params.push(Value::Integer(season_year.into()));
        }

        self.select("race_results", &sql, &params, |row| {
            Ok(WindowedProgressionRow {
                entity_id: row.get(0)?,
                entity_name: row.get(1)?,
                round: row.get(2)?,
                race_name: row.get(3)?,
                race_points: row.get(4)?,
                cumulative_points: row.get(5)?,
            })
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_results(&self, filter: &ResultFilter) -> Result<Vec<RawResultRow>, StoreError> {
        self.query_results(filter)
    }

    async fn find_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        self.query_sessions(filter)
    }

    async fn find_races(&self, filter: &RaceFilter) -> Result<Vec<Race>, StoreError> {
        self.query_races(filter)
    }

    async fn find_seasons(&self, filter: &SeasonFilter) -> Result<Vec<Season>, StoreError> {
        self.query_seasons(filter)
    }

    async fn find_entities(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
    ) -> Result<Vec<EntityRecord>, StoreError> {
        self.query_entities(kind, filter)
    }

    async fn find_standings_roster(&self, season_year: i32) -> Result<Vec<StandingsEntry>, StoreError> {
        self.query_standings(season_year)
    }

    async fn windowed_progression_rows(
        &self,
        kind: EntityKind,
        entity_ids: &[i64],
        season_year: i32,
    ) -> Result<Vec<WindowedProgressionRow>, StoreError> {
        self.query_windowed(kind, entity_ids, season_year)
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }
}
