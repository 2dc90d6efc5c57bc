use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use crate::decode::{decode_bindings, decode_pattern, decode_profile};
use crate::models::{ProfileSettings, RotationPattern, Template, TemplateBinding, TemplateKind};

const PROFILE_DOC: &str = "profile";
const BINDINGS_DOC: &str = "template_bindings";

pub struct Database {
    conn: Connection,
}

fn write_document(conn: &Connection, name: &str, body: &str) -> Result<()> {
    let now = Local::now().to_rfc3339();
    conn.execute(
        "INSERT INTO documents (name, body, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![name, body, now],
    )?;
    debug!(document = name, "document written");
    Ok(())
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS config (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS documents (
                    name TEXT PRIMARY KEY,
                    body TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS rotation_patterns (
                    id TEXT PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    created_at_ms INTEGER NOT NULL,
                    active INTEGER NOT NULL DEFAULT 0,
                    body TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_rotation_patterns_owner ON rotation_patterns(owner_id);

                CREATE TABLE IF NOT EXISTS templates (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL CHECK (kind IN ('meal', 'workout')),
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            // At most one active rotation per owner.
            self.conn.execute_batch(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_rotation_patterns_one_active
                    ON rotation_patterns(owner_id) WHERE active = 1;
                 PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Config ---

    pub fn get_or_create_device_id(&self) -> Result<String> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = 'device_id'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let device_id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES ('device_id', ?1)",
            params![device_id],
        )?;
        Ok(device_id)
    }

    // --- Documents ---

    fn get_document(&self, name: &str) -> Result<Option<serde_json::Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| {
            serde_json::from_str(&b).with_context(|| format!("Corrupt stored document '{name}'"))
        })
        .transpose()
    }

    fn put_document<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<()> {
        write_document(&self.conn, name, &serde_json::to_string(value)?)
    }

    // --- Profile ---

    pub fn load_profile(&self) -> Result<ProfileSettings> {
        Ok(self
            .get_document(PROFILE_DOC)?
            .map(|doc| decode_profile(&doc))
            .unwrap_or_default())
    }

    pub fn save_profile(&self, profile: &ProfileSettings) -> Result<()> {
        self.put_document(PROFILE_DOC, profile)
    }

    // --- Template bindings ---

    pub fn load_bindings(&self) -> Result<Vec<TemplateBinding>> {
        Ok(self
            .get_document(BINDINGS_DOC)?
            .map(|doc| decode_bindings(&doc))
            .unwrap_or_default())
    }

    /// Replace the whole stored binding list.
    pub fn save_bindings(&self, bindings: &[TemplateBinding]) -> Result<()> {
        self.put_document(BINDINGS_DOC, &bindings)
    }

    // --- Rotation patterns ---

    fn pattern_from_row(row: &rusqlite::Row) -> rusqlite::Result<(String, bool, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }

    fn decode_pattern_row(id: &str, active: bool, body: &str) -> Result<RotationPattern> {
        let doc: serde_json::Value = serde_json::from_str(body)
            .with_context(|| format!("Corrupt rotation pattern '{id}'"))?;
        let mut pattern = decode_pattern(&doc);
        // Columns are authoritative over the stored body.
        pattern.id = id.to_string();
        pattern.active = active;
        Ok(pattern)
    }

    /// Store a new pattern. If it is marked active, every other pattern of the
    /// same owner is deactivated in the same transaction.
    pub fn insert_pattern(&self, pattern: &RotationPattern) -> Result<()> {
        let body = serde_json::to_string(pattern)?;
        let tx = self.conn.unchecked_transaction()?;
        if pattern.active {
            tx.execute(
                "UPDATE rotation_patterns SET active = 0 WHERE owner_id = ?1",
                params![pattern.owner_id],
            )?;
        }
        tx.execute(
            "INSERT INTO rotation_patterns (id, owner_id, created_at_ms, active, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pattern.id,
                pattern.owner_id,
                pattern.created_at_ms,
                pattern.active,
                body
            ],
        )?;
        tx.commit()?;
        debug!(pattern = %pattern.id, days = pattern.days.len(), "rotation pattern stored");
        Ok(())
    }

    pub fn get_pattern(&self, id: &str) -> Result<Option<RotationPattern>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, active, body FROM rotation_patterns WHERE id = ?1",
                params![id],
                Self::pattern_from_row,
            )
            .optional()?;
        row.map(|(id, active, body)| Self::decode_pattern_row(&id, active, &body))
            .transpose()
    }

    pub fn list_patterns(&self, owner_id: &str) -> Result<Vec<RotationPattern>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, active, body FROM rotation_patterns
             WHERE owner_id = ?1 ORDER BY created_at_ms, id",
        )?;
        let rows = stmt
            .query_map(params![owner_id], Self::pattern_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|(id, active, body)| Self::decode_pattern_row(id, *active, body))
            .collect()
    }

    pub fn active_pattern(&self, owner_id: &str) -> Result<Option<RotationPattern>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, active, body FROM rotation_patterns
                 WHERE owner_id = ?1 AND active = 1",
                params![owner_id],
                Self::pattern_from_row,
            )
            .optional()?;
        row.map(|(id, active, body)| Self::decode_pattern_row(&id, active, &body))
            .transpose()
    }

    /// Make `id` the owner's only active pattern. Returns false if no such
    /// pattern belongs to the owner; nothing changes in that case.
    pub fn activate_pattern(&self, owner_id: &str, id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM rotation_patterns WHERE id = ?1 AND owner_id = ?2)",
            params![id, owner_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(false);
        }
        tx.execute(
            "UPDATE rotation_patterns SET active = 0 WHERE owner_id = ?1",
            params![owner_id],
        )?;
        tx.execute(
            "UPDATE rotation_patterns SET active = 1 WHERE id = ?1",
            params![id],
        )?;
        tx.commit()?;
        debug!(pattern = id, "rotation pattern activated");
        Ok(true)
    }

    /// Delete a pattern and, in the same transaction, the bindings list
    /// with its days' bindings removed.
    pub fn delete_pattern(&self, id: &str, remaining_bindings: &[TemplateBinding]) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute("DELETE FROM rotation_patterns WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Ok(false);
        }
        write_document(&tx, BINDINGS_DOC, &serde_json::to_string(remaining_bindings)?)?;
        tx.commit()?;
        Ok(true)
    }

    // --- Templates ---

    fn template_from_row(row: &rusqlite::Row) -> rusqlite::Result<Template> {
        let kind: String = row.get(1)?;
        Ok(Template {
            id: row.get(0)?,
            kind: if kind == "workout" {
                TemplateKind::Workout
            } else {
                TemplateKind::Meal
            },
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn insert_template(&self, kind: TemplateKind, name: &str) -> Result<Template> {
        let template = Template {
            id: Uuid::new_v4().to_string(),
            kind,
            name: name.trim().to_string(),
            created_at: Local::now().to_rfc3339(),
        };
        self.conn.execute(
            "INSERT INTO templates (id, kind, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                template.id,
                template.kind.as_str(),
                template.name,
                template.created_at
            ],
        )?;
        Ok(template)
    }

    pub fn get_template(&self, id: &str) -> Result<Option<Template>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, kind, name, created_at FROM templates WHERE id = ?1",
                params![id],
                Self::template_from_row,
            )
            .optional()?)
    }

    pub fn list_templates(&self, kind: Option<TemplateKind>) -> Result<Vec<Template>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, created_at FROM templates
             WHERE ?1 IS NULL OR kind = ?1 ORDER BY kind, name COLLATE NOCASE",
        )?;
        let templates = stmt
            .query_map(params![kind.map(TemplateKind::as_str)], Self::template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(templates)
    }

    /// Bindings that point at a deleted template are left in place; they
    /// resolve to unassigned on read.
    pub fn delete_template(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MealSlot, RotationDay};

    fn sample_pattern(id: &str, owner: &str, active: bool) -> RotationPattern {
        RotationPattern {
            id: id.to_string(),
            owner_id: owner.to_string(),
            days: vec![
                RotationDay {
                    id: format!("{id}-a"),
                    day_number: 1,
                    split_label: "push".to_string(),
                    is_rest_day: false,
                },
                RotationDay {
                    id: format!("{id}-b"),
                    day_number: 2,
                    split_label: "rest".to_string(),
                    is_rest_day: true,
                },
            ],
            created_at_ms: 1_700_000_000_000,
            active,
        }
    }

    fn binding(day: &str, slot: i64, template: &str) -> TemplateBinding {
        TemplateBinding {
            rotation_day_id: day.to_string(),
            rotation_day_name: day.to_string(),
            slot_number: slot,
            template_id: template.to_string(),
            template_name: template.to_string(),
        }
    }

    #[test]
    fn test_device_id_is_stable() {
        let db = Database::open_in_memory().unwrap();
        let first = db.get_or_create_device_id().unwrap();
        assert_eq!(db.get_or_create_device_id().unwrap(), first);
    }

    #[test]
    fn test_profile_defaults_then_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_profile().unwrap(), ProfileSettings::default());

        let mut profile = ProfileSettings::default();
        profile.anchors.wake_time = "06:00".to_string();
        profile.slot_config.meals_per_day = 3;
        profile.slot_config.slots = (1..=3).map(MealSlot::new).collect();
        profile.slot_config.slots[1].absolute_time = Some("10:15".to_string());
        db.save_profile(&profile).unwrap();
        assert_eq!(db.load_profile().unwrap(), profile);
    }

    #[test]
    fn test_insert_active_pattern_deactivates_others() {
        let db = Database::open_in_memory().unwrap();
        db.insert_pattern(&sample_pattern("p1", "me", true)).unwrap();
        db.insert_pattern(&sample_pattern("p2", "me", true)).unwrap();
        db.insert_pattern(&sample_pattern("p3", "you", true)).unwrap();

        assert_eq!(db.active_pattern("me").unwrap().unwrap().id, "p2");
        assert_eq!(db.active_pattern("you").unwrap().unwrap().id, "p3");
        let mine = db.list_patterns("me").unwrap();
        assert_eq!(mine.iter().filter(|p| p.active).count(), 1);
        assert_eq!(mine[0].days.len(), 2);
    }

    #[test]
    fn test_activate_pattern() {
        let db = Database::open_in_memory().unwrap();
        db.insert_pattern(&sample_pattern("p1", "me", true)).unwrap();
        db.insert_pattern(&sample_pattern("p2", "me", false)).unwrap();

        assert!(db.activate_pattern("me", "p2").unwrap());
        assert_eq!(db.active_pattern("me").unwrap().unwrap().id, "p2");
        assert!(!db.get_pattern("p1").unwrap().unwrap().active);

        // Unknown or foreign pattern leaves state alone.
        assert!(!db.activate_pattern("me", "nope").unwrap());
        assert!(!db.activate_pattern("you", "p1").unwrap());
        assert_eq!(db.active_pattern("me").unwrap().unwrap().id, "p2");
    }

    #[test]
    fn test_one_active_enforced_by_index() {
        let db = Database::open_in_memory().unwrap();
        db.insert_pattern(&sample_pattern("p1", "me", true)).unwrap();
        let result = db.conn.execute(
            "INSERT INTO rotation_patterns (id, owner_id, created_at_ms, active, body)
             VALUES ('p9', 'me', 0, 1, '{}')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_pattern_rewrites_bindings() {
        let db = Database::open_in_memory().unwrap();
        db.insert_pattern(&sample_pattern("p1", "me", true)).unwrap();
        db.save_bindings(&[binding("p1-a", 1, "oats"), binding("x", 1, "eggs")])
            .unwrap();

        assert!(db.delete_pattern("p1", &[binding("x", 1, "eggs")]).unwrap());
        assert!(db.get_pattern("p1").unwrap().is_none());
        assert!(db.active_pattern("me").unwrap().is_none());
        assert_eq!(db.load_bindings().unwrap(), vec![binding("x", 1, "eggs")]);

        // Unknown pattern: bindings untouched.
        assert!(!db.delete_pattern("p1", &[]).unwrap());
        assert_eq!(db.load_bindings().unwrap().len(), 1);
    }

    #[test]
    fn test_templates_crud() {
        let db = Database::open_in_memory().unwrap();
        let oats = db.insert_template(TemplateKind::Meal, " Overnight oats ").unwrap();
        db.insert_template(TemplateKind::Workout, "Leg day").unwrap();
        assert_eq!(oats.name, "Overnight oats");

        assert_eq!(db.list_templates(None).unwrap().len(), 2);
        let workouts = db.list_templates(Some(TemplateKind::Workout)).unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0].kind, TemplateKind::Workout);

        assert!(db.delete_template(&oats.id).unwrap());
        assert!(db.get_template(&oats.id).unwrap().is_none());
        assert!(!db.delete_template(&oats.id).unwrap());
    }

    #[test]
    fn test_file_backed_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.db");
        {
            let db = Database::open(&path).unwrap();
            db.save_bindings(&[binding("d1", 2, "rice")]).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.load_bindings().unwrap(), vec![binding("d1", 2, "rice")]);
    }
}
