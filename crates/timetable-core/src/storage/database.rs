//! SQLite-backed store for kids, matters and timetables.
//!
//! Every day replacement runs inside a transaction, and [`TimetableStore::commit`]
//! puts all days of a change into the same transaction, so a cross-day move
//! is never visible half-applied. Each written block row gets a revision
//! number; [`Database::reconcile`] uses it to repair a block id found in two
//! days (for instance in a file written by an older build) by keeping the
//! most recently written copy.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{data_dir, migrations, validate_updates, TimetableStore};
use crate::error::{CoreError, DatabaseError, ValidationError};
use crate::interval::MinuteRange;
use crate::scheduler::DayUpdate;
use crate::timetable::{validate_blocks, Kid, Matter, TimeBlock, Timetable, Weekday};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A block id that reconciliation found in more than one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairedBlock {
    pub kid_id: String,
    pub block_id: String,
    pub kept_day: Weekday,
    pub removed_days: Vec<Weekday>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub repaired: Vec<RepairedBlock>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.repaired.is_empty()
    }
}

fn parse_day(day: &str) -> Option<Weekday> {
    day.parse().ok()
}

fn parse_date(text: Option<String>) -> Option<NaiveDate> {
    text.and_then(|t| NaiveDate::parse_from_str(&t, DATE_FORMAT).ok())
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn row_to_matter(row: &rusqlite::Row) -> Result<Matter, rusqlite::Error> {
    Ok(Matter {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        start_date: parse_date(row.get(3)?),
        end_date: parse_date(row.get(4)?),
    })
}

fn require_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::Empty("name"))
    } else {
        Ok(())
    }
}

/// SQLite database for timetable storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/timetable.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("timetable.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// Runs pending migrations and a reconciliation pass.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, CoreError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        let db = Self { conn };
        let report = db.reconcile()?;
        if !report.is_clean() {
            warn!(repaired = report.repaired.len(), "reconciled duplicated blocks on open");
        }
        Ok(db)
    }

    // ── Kids ─────────────────────────────────────────────────────────

    /// Insert a kid together with its empty timetable.
    pub fn create_kid(&self, kid: &Kid) -> Result<(), CoreError> {
        require_name(&kid.name)?;
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO kids (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![kid.id, kid.name.trim(), now],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO timetables (kid_id, created_at) VALUES (?1, ?2)",
            params![kid.id, now],
        )?;
        tx.commit()?;
        info!(kid = %kid.id, "kid created");
        Ok(())
    }

    pub fn list_kids(&self) -> Result<Vec<Kid>, CoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM kids ORDER BY created_at, name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Kid {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_kid(&self, id: &str) -> Result<Option<Kid>, CoreError> {
        let kid = self
            .conn
            .query_row("SELECT id, name FROM kids WHERE id = ?1", params![id], |row| {
                Ok(Kid {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(kid)
    }

    pub fn rename_kid(&self, id: &str, name: &str) -> Result<Kid, CoreError> {
        require_name(name)?;
        let changed = self.conn.execute(
            "UPDATE kids SET name = ?1 WHERE id = ?2",
            params![name.trim(), id],
        )?;
        if changed == 0 {
            return Err(ValidationError::NotFound {
                entity: "Kid",
                id: id.to_string(),
            }
            .into());
        }
        Ok(Kid {
            id: id.to_string(),
            name: name.trim().to_string(),
        })
    }

    /// Delete a kid and its timetable. Returns false if the kid did not exist.
    pub fn delete_kid(&self, id: &str) -> Result<bool, CoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM kids WHERE id = ?1", params![id])?;
        tx.execute("DELETE FROM timetables WHERE kid_id = ?1", params![id])?;
        tx.execute("DELETE FROM blocks WHERE kid_id = ?1", params![id])?;
        tx.commit()?;
        if removed > 0 {
            info!(kid = %id, "kid deleted with its timetable");
        }
        Ok(removed > 0)
    }

    // ── Matters ──────────────────────────────────────────────────────

    pub fn create_matter(&self, matter: &Matter) -> Result<(), CoreError> {
        require_name(&matter.name)?;
        self.conn.execute(
            "INSERT INTO matters (id, name, color, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                matter.id,
                matter.name.trim(),
                matter.color,
                format_date(matter.start_date),
                format_date(matter.end_date),
            ],
        )?;
        Ok(())
    }

    pub fn list_matters(&self) -> Result<Vec<Matter>, CoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, color, start_date, end_date FROM matters ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_matter)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_matter(&self, id: &str) -> Result<Option<Matter>, CoreError> {
        let matter = self
            .conn
            .query_row(
                "SELECT id, name, color, start_date, end_date FROM matters WHERE id = ?1",
                params![id],
                row_to_matter,
            )
            .optional()?;
        Ok(matter)
    }

    pub fn update_matter(&self, matter: &Matter) -> Result<(), CoreError> {
        require_name(&matter.name)?;
        let changed = self.conn.execute(
            "UPDATE matters SET name = ?1, color = ?2, start_date = ?3, end_date = ?4 WHERE id = ?5",
            params![
                matter.name.trim(),
                matter.color,
                format_date(matter.start_date),
                format_date(matter.end_date),
                matter.id,
            ],
        )?;
        if changed == 0 {
            return Err(ValidationError::NotFound {
                entity: "Matter",
                id: matter.id.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Delete a matter and every block referencing it, across all kids.
    /// Returns the number of blocks removed.
    pub fn delete_matter(&self, id: &str) -> Result<usize, CoreError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM matters WHERE id = ?1", params![id])?;
        let blocks = tx.execute("DELETE FROM blocks WHERE matter_id = ?1", params![id])?;
        tx.commit()?;
        info!(matter = %id, blocks, "matter deleted");
        Ok(blocks)
    }

    // ── Blocks ───────────────────────────────────────────────────────

    /// Insert a block; fails with a validation error if it overlaps.
    pub fn add_block(&self, kid_id: &str, day: Weekday, block: TimeBlock) -> Result<TimeBlock, CoreError> {
        let stored = self.insert_block(kid_id, day, block.clone())?;
        debug!(kid = %kid_id, %day, blocks = stored.len(), "block added");
        Ok(block)
    }

    /// Place block `id` at `range` within its day.
    pub fn update_block(
        &self,
        kid_id: &str,
        day: Weekday,
        id: &str,
        range: MinuteRange,
    ) -> Result<TimeBlock, CoreError> {
        let blocks = self.day_schedule(kid_id, day)?;
        let updated = blocks
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.at(range))
            .ok_or_else(|| ValidationError::NotFound {
                entity: "Block",
                id: id.to_string(),
            })?;
        let next = blocks
            .into_iter()
            .map(|b| if b.id == id { updated.clone() } else { b })
            .collect();
        self.set_day_schedule(kid_id, day, next)?;
        Ok(updated)
    }

    /// Remove block `id` from a day. Unknown ids are ignored.
    pub fn delete_block(&self, kid_id: &str, day: Weekday, id: &str) -> Result<(), CoreError> {
        let blocks = self
            .day_schedule(kid_id, day)?
            .into_iter()
            .filter(|b| b.id != id)
            .collect();
        self.set_day_schedule(kid_id, day, blocks)?;
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_timetable(&self, kid_id: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR IGNORE INTO timetables (kid_id, created_at) VALUES (?1, ?2)",
            params![kid_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn next_revision(tx: &Transaction) -> Result<i64, rusqlite::Error> {
        tx.query_row("SELECT COALESCE(MAX(revision), 0) + 1 FROM blocks", [], |row| {
            row.get(0)
        })
    }

    fn write_day(
        tx: &Transaction,
        kid_id: &str,
        day: Weekday,
        blocks: &[TimeBlock],
        revision: i64,
    ) -> Result<(), rusqlite::Error> {
        tx.execute(
            "DELETE FROM blocks WHERE kid_id = ?1 AND day = ?2",
            params![kid_id, day.as_str()],
        )?;
        let mut stmt = tx.prepare(
            "INSERT INTO blocks (kid_id, day, id, matter_id, start_min, end_min, revision)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for block in blocks {
            stmt.execute(params![
                kid_id,
                day.as_str(),
                block.id,
                block.matter_id,
                block.start_min,
                block.end_min,
                revision,
            ])?;
        }
        Ok(())
    }

    /// Remove every copy but the most recently written one of any block id
    /// present in more than one day of the same kid.
    pub fn reconcile(&self) -> Result<ReconcileReport, CoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let duplicates: Vec<(String, String)> = {
            let mut stmt = tx.prepare(
                "SELECT kid_id, id FROM blocks GROUP BY kid_id, id HAVING COUNT(*) > 1",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut report = ReconcileReport::default();
        for (kid_id, block_id) in duplicates {
            let copies: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT day FROM blocks WHERE kid_id = ?1 AND id = ?2
                     ORDER BY revision DESC, day",
                )?;
                let rows = stmt.query_map(params![kid_id, block_id], |row| row.get(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            let Some((kept, removed)) = copies.split_first() else {
                continue;
            };
            for day in removed {
                tx.execute(
                    "DELETE FROM blocks WHERE kid_id = ?1 AND id = ?2 AND day = ?3",
                    params![kid_id, block_id, day],
                )?;
            }
            let Some(kept_day) = parse_day(kept) else {
                warn!(kid = %kid_id, block = %block_id, day = %kept, "kept copy has an unknown day");
                continue;
            };
            let removed_days: Vec<Weekday> = removed.iter().filter_map(|d| parse_day(d)).collect();
            info!(kid = %kid_id, block = %block_id, kept = %kept_day, removed = ?removed_days, "repaired duplicated block");
            report.repaired.push(RepairedBlock {
                kid_id,
                block_id,
                kept_day,
                removed_days,
            });
        }
        tx.commit()?;
        Ok(report)
    }
}

impl TimetableStore for Database {
    fn timetable(&self, kid_id: &str) -> Result<Timetable, CoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT day, id, matter_id, start_min, end_min FROM blocks
             WHERE kid_id = ?1 ORDER BY start_min, id",
        )?;
        let rows = stmt.query_map(params![kid_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                TimeBlock::new(
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ),
            ))
        })?;

        let mut timetable = Timetable::empty(kid_id);
        for row in rows {
            let (day, block) = row?;
            match parse_day(&day) {
                Some(day) => timetable.days.entry(day).or_default().push(block),
                None => warn!(kid = %kid_id, %day, block = %block.id, "skipping block with unknown day"),
            }
        }
        Ok(timetable)
    }

    fn day_schedule(&self, kid_id: &str, day: Weekday) -> Result<Vec<TimeBlock>, CoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, matter_id, start_min, end_min FROM blocks
             WHERE kid_id = ?1 AND day = ?2 ORDER BY start_min, id",
        )?;
        let rows = stmt.query_map(params![kid_id, day.as_str()], |row| {
            Ok(TimeBlock::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get(2)?,
                row.get(3)?,
            ))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn set_day_schedule(
        &self,
        kid_id: &str,
        day: Weekday,
        blocks: Vec<TimeBlock>,
    ) -> Result<Vec<TimeBlock>, CoreError> {
        let verified = validate_blocks(blocks)?;
        self.ensure_timetable(kid_id)?;
        let tx = self.conn.unchecked_transaction()?;
        let revision = Self::next_revision(&tx)?;
        Self::write_day(&tx, kid_id, day, &verified, revision)?;
        tx.commit()?;
        Ok(verified)
    }

    fn commit(&self, kid_id: &str, updates: &[DayUpdate]) -> Result<(), CoreError> {
        let verified = validate_updates(updates)?;
        self.ensure_timetable(kid_id)?;

        let tx = self.conn.unchecked_transaction()?;
        let mut revision = Self::next_revision(&tx)?;
        for update in &verified {
            Self::write_day(&tx, kid_id, update.day, &update.blocks, revision)?;
            revision += 1;
        }
        tx.commit()?;

        let days: Vec<Weekday> = verified.iter().map(|u| u.day).collect();
        info!(kid = %kid_id, ?days, "schedule change committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kid(id: &str) -> Kid {
        Kid {
            id: id.into(),
            name: format!("Kid {id}"),
        }
    }

    fn matter(id: &str) -> Matter {
        Matter {
            id: id.into(),
            name: id.to_uppercase(),
            color: Some("#3b82f6".into()),
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1),
            end_date: None,
        }
    }

    fn timetable_rows(db: &Database) -> i64 {
        db.conn()
            .query_row("SELECT COUNT(*) FROM timetables", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn timetable_is_created_lazily() {
        let db = Database::open_memory().unwrap();
        let tt = db.timetable("nobody-yet").unwrap();
        assert_eq!(tt.kid_id, "nobody-yet");
        assert_eq!(tt.block_count(), 0);
        assert_eq!(tt.days.len(), 7);
        db.day_schedule("nobody-yet", Weekday::Mon).unwrap();
        assert_eq!(timetable_rows(&db), 0, "reads must not create timetables");

        db.commit("nobody-yet", &[DayUpdate { day: Weekday::Mon, blocks: Vec::new() }])
            .unwrap();
        assert_eq!(timetable_rows(&db), 1);
    }

    #[test]
    fn kid_crud() {
        let db = Database::open_memory().unwrap();
        db.create_kid(&kid("k1")).unwrap();
        assert_eq!(db.list_kids().unwrap().len(), 1);
        assert_eq!(db.rename_kid("k1", "Ada").unwrap().name, "Ada");
        assert_eq!(db.get_kid("k1").unwrap().unwrap().name, "Ada");
        assert!(db.rename_kid("missing", "x").is_err());
        assert!(db.create_kid(&Kid { id: "k2".into(), name: " ".into() }).is_err());
    }

    #[test]
    fn deleting_kid_drops_timetable() {
        let db = Database::open_memory().unwrap();
        db.create_kid(&kid("k1")).unwrap();
        db.add_block("k1", Weekday::Mon, TimeBlock::new("b", "m", 480, 540)).unwrap();
        assert!(db.delete_kid("k1").unwrap());
        assert!(!db.delete_kid("k1").unwrap());
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM blocks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn matter_crud_round_trips_dates() {
        let db = Database::open_memory().unwrap();
        db.create_matter(&matter("math")).unwrap();
        let stored = db.get_matter("math").unwrap().unwrap();
        assert_eq!(stored, matter("math"));

        let mut renamed = stored.clone();
        renamed.name = "Maths".into();
        renamed.end_date = NaiveDate::from_ymd_opt(2026, 6, 30);
        db.update_matter(&renamed).unwrap();
        assert_eq!(db.list_matters().unwrap(), vec![renamed]);
    }

    #[test]
    fn deleting_matter_removes_its_blocks() {
        let db = Database::open_memory().unwrap();
        db.create_matter(&matter("math")).unwrap();
        db.add_block("k1", Weekday::Mon, TimeBlock::new("a", "math", 480, 540)).unwrap();
        db.add_block("k2", Weekday::Fri, TimeBlock::new("b", "math", 480, 540)).unwrap();
        db.add_block("k1", Weekday::Mon, TimeBlock::new("c", "art", 540, 600)).unwrap();

        assert_eq!(db.delete_matter("math").unwrap(), 2);
        let mon = db.day_schedule("k1", Weekday::Mon).unwrap();
        assert_eq!(mon.len(), 1);
        assert_eq!(mon[0].id, "c");
    }

    #[test]
    fn add_block_rejects_overlap() {
        let db = Database::open_memory().unwrap();
        db.add_block("k", Weekday::Mon, TimeBlock::new("a", "m", 480, 540)).unwrap();
        let err = db
            .add_block("k", Weekday::Mon, TimeBlock::new("b", "m", 500, 560))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Overlap { .. })));
        assert_eq!(db.day_schedule("k", Weekday::Mon).unwrap().len(), 1);
    }

    #[test]
    fn day_schedule_is_sorted() {
        let db = Database::open_memory().unwrap();
        db.add_block("k", Weekday::Tue, TimeBlock::new("late", "m", 700, 760)).unwrap();
        db.add_block("k", Weekday::Tue, TimeBlock::new("early", "m", 480, 540)).unwrap();
        let ids: Vec<String> = db
            .day_schedule("k", Weekday::Tue)
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, ["early", "late"]);
    }

    #[test]
    fn update_and_delete_block() {
        let db = Database::open_memory().unwrap();
        db.add_block("k", Weekday::Mon, TimeBlock::new("a", "m", 480, 540)).unwrap();
        let updated = db
            .update_block("k", Weekday::Mon, "a", MinuteRange::new(480, 600))
            .unwrap();
        assert_eq!(updated.end_min, 600);
        assert!(db
            .update_block("k", Weekday::Mon, "zzz", MinuteRange::new(480, 600))
            .is_err());

        db.delete_block("k", Weekday::Mon, "a").unwrap();
        db.delete_block("k", Weekday::Mon, "a").unwrap();
        assert!(db.day_schedule("k", Weekday::Mon).unwrap().is_empty());
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let db = Database::open_memory().unwrap();
        db.add_block("k", Weekday::Mon, TimeBlock::new("a", "m", 480, 540)).unwrap();

        let bad = [
            DayUpdate {
                day: Weekday::Mon,
                blocks: vec![],
            },
            DayUpdate {
                day: Weekday::Tue,
                blocks: vec![
                    TimeBlock::new("a", "m", 480, 540),
                    TimeBlock::new("x", "m", 500, 520),
                ],
            },
        ];
        assert!(db.commit("k", &bad).is_err());
        assert_eq!(db.day_schedule("k", Weekday::Mon).unwrap().len(), 1);
        assert!(db.day_schedule("k", Weekday::Tue).unwrap().is_empty());

        let good = [
            DayUpdate {
                day: Weekday::Mon,
                blocks: vec![],
            },
            DayUpdate {
                day: Weekday::Tue,
                blocks: vec![TimeBlock::new("a", "m", 480, 540)],
            },
        ];
        db.commit("k", &good).unwrap();
        let tt = db.timetable("k").unwrap();
        assert!(tt.day(Weekday::Mon).is_empty());
        assert_eq!(tt.find_block("a").map(|(d, _)| d), Some(Weekday::Tue));
    }

    #[test]
    fn commit_rejects_repeated_day() {
        let db = Database::open_memory().unwrap();
        let twice = [
            DayUpdate { day: Weekday::Mon, blocks: vec![] },
            DayUpdate { day: Weekday::Mon, blocks: vec![] },
        ];
        assert!(db.commit("k", &twice).is_err());
    }

    #[test]
    fn reconcile_keeps_latest_copy() {
        let db = Database::open_memory().unwrap();
        db.add_block("k", Weekday::Mon, TimeBlock::new("dup", "m", 480, 540)).unwrap();
        // Simulate a half-applied move: the target written later, the source never cleared.
        db.add_block("k", Weekday::Thu, TimeBlock::new("dup", "m", 600, 660)).unwrap();

        let report = db.reconcile().unwrap();
        assert_eq!(
            report.repaired,
            vec![RepairedBlock {
                kid_id: "k".into(),
                block_id: "dup".into(),
                kept_day: Weekday::Thu,
                removed_days: vec![Weekday::Mon],
            }]
        );
        let tt = db.timetable("k").unwrap();
        assert_eq!(tt.block_count(), 1);
        assert_eq!(tt.day(Weekday::Thu)[0].start_min, 600);
        assert!(db.reconcile().unwrap().is_clean());
    }
}
