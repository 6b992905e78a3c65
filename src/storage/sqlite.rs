//! SQLite registry database
//!
//! The database lives in `.studbook/registry.db` and is the source of truth
//! for animal records. Name uniqueness and referential protection of parents
//! are enforced by SQLite constraints; a parent that still has children
//! cannot be deleted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::store::{AnimalStore, ChildQuery, Page, StoreError};
use crate::domain::{Animal, AnimalId, Classification, Gender};

const COLUMNS: &str = "id, name, gender, classification, sire_id, dam_id, birth_date, color, breeder, created_at, updated_at";

/// SQLite-backed animal store
pub struct SqliteStore {
    /// Path to the database, `None` for in-memory databases
    db_path: Option<PathBuf>,

    conn: Connection,
}

impl SqliteStore {
    /// Schema version - bump when schema changes
    const SCHEMA_VERSION: i32 = 1;

    /// Opens or creates the database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL for concurrent readers
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self { db_path, conn };
        store.ensure_schema()?;

        Ok(store)
    }

    /// Ensures the schema is up to date
    fn ensure_schema(&self) -> Result<(), StoreError> {
        let current_version = self.schema_version()?;

        match current_version {
            0 => self.create_schema(),
            v if v == Self::SCHEMA_VERSION => Ok(()),
            v => Err(StoreError::Corrupt {
                id: "schema".to_string(),
                reason: format!(
                    "unsupported schema version {} (expected {})",
                    v,
                    Self::SCHEMA_VERSION
                ),
            }),
        }
    }

    fn schema_version(&self) -> Result<i32, StoreError> {
        let result: Option<i32> = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .optional()?;

        Ok(result.unwrap_or(0))
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS animals (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                gender TEXT NOT NULL CHECK (gender IN ('male', 'female', 'neutered')),
                classification TEXT NOT NULL CHECK (classification IN ('A', 'B', 'C', 'AB')),
                sire_id TEXT REFERENCES animals(id) ON DELETE RESTRICT,
                dam_id TEXT REFERENCES animals(id) ON DELETE RESTRICT,
                birth_date TEXT,
                color TEXT,
                breeder TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_animals_sire ON animals(sire_id);
            CREATE INDEX IF NOT EXISTS idx_animals_dam ON animals(dam_id);
            CREATE INDEX IF NOT EXISTS idx_animals_breeder ON animals(breeder);
            CREATE INDEX IF NOT EXISTS idx_animals_gender ON animals(gender);
            ",
        )?;

        self.conn.execute_batch(&format!(
            "PRAGMA user_version = {}",
            Self::SCHEMA_VERSION
        ))?;

        Ok(())
    }

    /// Looks up an animal by its exact registered name
    pub fn find_by_name(&self, name: &str) -> Result<Option<Animal>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM animals WHERE name = ?1", COLUMNS),
                params![name],
                read_row,
            )
            .optional()?;

        row.map(Animal::try_from).transpose()
    }

    /// Lists animals, optionally filtered by gender and breeder
    pub fn list(
        &self,
        gender: Option<Gender>,
        breeder: Option<&str>,
    ) -> Result<Vec<Animal>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM animals
             WHERE (?1 IS NULL OR gender = ?1)
             AND (?2 IS NULL OR breeder = ?2)
             ORDER BY name, id",
            COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![gender.map(|g| g.as_str()), breeder], read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(Animal::try_from).collect()
    }

    /// Returns every animal in the registry
    pub fn all(&self) -> Result<Vec<Animal>, StoreError> {
        self.list(None, None)
    }

    /// Deletes an animal
    ///
    /// Fails with [`StoreError::Constraint`] while other animals still
    /// reference it as a parent.
    pub fn delete(&self, id: &AnimalId) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM animals WHERE id = ?1", params![id.to_string()])
            .map_err(constraint_error)?;

        Ok(removed > 0)
    }

    /// Returns the path to the database file
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl AnimalStore for SqliteStore {
    fn get(&self, id: &AnimalId) -> Result<Option<Animal>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM animals WHERE id = ?1", COLUMNS),
                params![id.to_string()],
                read_row,
            )
            .optional()?;

        row.map(Animal::try_from).transpose()
    }

    fn find_children(&self, query: &ChildQuery) -> Result<Page<Animal>, StoreError> {
        const FILTER: &str = "(sire_id = ?1 OR dam_id = ?1)
             AND id != ?1
             AND (?2 IS NULL OR gender = ?2)
             AND (?3 IS NULL OR breeder = ?3)";

        let limit = i64::try_from(query.limit)
            .map_err(|_| StoreError::InvalidQuery(format!("limit {} is too large", query.limit)))?;
        let offset = i64::try_from(query.offset)
            .map_err(|_| StoreError::InvalidQuery(format!("offset {} is too large", query.offset)))?;

        let parent = query.parent.to_string();
        let gender = query.gender.map(|g| g.as_str());
        let breeder = query.breeder.as_deref();

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM animals WHERE {}", FILTER),
            params![parent, gender, breeder],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM animals WHERE {} ORDER BY name, id LIMIT ?4 OFFSET ?5",
            COLUMNS, FILTER
        ))?;

        let rows = stmt
            .query_map(
                params![parent, gender, breeder, limit, offset],
                read_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let items = rows
            .into_iter()
            .map(Animal::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            total_count: total as usize,
            limit: query.limit,
            offset: query.offset,
        })
    }

    fn upsert(&self, animal: &Animal) -> Result<(), StoreError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO animals ({})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        gender = excluded.gender,
                        classification = excluded.classification,
                        sire_id = excluded.sire_id,
                        dam_id = excluded.dam_id,
                        birth_date = excluded.birth_date,
                        color = excluded.color,
                        breeder = excluded.breeder,
                        updated_at = excluded.updated_at",
                    COLUMNS
                ),
                params![
                    animal.id.to_string(),
                    animal.name,
                    animal.gender.as_str(),
                    animal.classification.as_str(),
                    animal.sire.as_ref().map(|id| id.to_string()),
                    animal.dam.as_ref().map(|id| id.to_string()),
                    animal.birth_date.map(|d| d.to_string()),
                    animal.color,
                    animal.breeder,
                    animal.created_at.to_rfc3339(),
                    animal.updated_at.to_rfc3339(),
                ],
            )
            .map_err(constraint_error)?;

        Ok(())
    }
}

/// Maps SQLite constraint failures to [`StoreError::Constraint`]
fn constraint_error(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Constraint(msg.clone().unwrap_or_else(|| err.to_string()))
        }
        _ => StoreError::Sqlite(err),
    }
}

/// Raw column values, converted to [`Animal`] outside the rusqlite closure
struct AnimalRow {
    id: String,
    name: String,
    gender: String,
    classification: String,
    sire: Option<String>,
    dam: Option<String>,
    birth_date: Option<String>,
    color: Option<String>,
    breeder: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<AnimalRow> {
    Ok(AnimalRow {
        id: row.get(0)?,
        name: row.get(1)?,
        gender: row.get(2)?,
        classification: row.get(3)?,
        sire: row.get(4)?,
        dam: row.get(5)?,
        birth_date: row.get(6)?,
        color: row.get(7)?,
        breeder: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl TryFrom<AnimalRow> for Animal {
    type Error = StoreError;

    fn try_from(row: AnimalRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };

        let parse_id = |s: &str| s.parse::<AnimalId>().map_err(|e| corrupt(e.to_string()));
        let parse_time = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| corrupt(format!("bad timestamp '{}': {}", s, e)))
        };

        Ok(Animal {
            id: parse_id(&row.id)?,
            name: row.name.clone(),
            gender: row.gender.parse::<Gender>().map_err(corrupt)?,
            classification: row
                .classification
                .parse::<Classification>()
                .map_err(corrupt)?,
            sire: row.sire.as_deref().map(parse_id).transpose()?,
            dam: row.dam.as_deref().map(parse_id).transpose()?,
            birth_date: row
                .birth_date
                .as_deref()
                .map(|s| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .map_err(|e| corrupt(format!("bad birth date '{}': {}", s, e)))
                })
                .transpose()?,
            color: row.color.clone(),
            breeder: row.breeder.clone(),
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stallion(name: &str) -> Animal {
        Animal::new(name, Gender::Male, Classification::A)
    }

    fn mare(name: &str) -> Animal {
        Animal::new(name, Gender::Female, Classification::B)
    }

    #[test]
    fn test_open_creates_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("registry.db");

        let store = SqliteStore::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(store.schema_version().unwrap(), SqliteStore::SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.db");
        let animal = stallion("Comet").with_birth_date(NaiveDate::from_ymd_opt(2012, 5, 3).unwrap());

        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert(&animal).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let loaded = store.get(&animal.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Comet");
        assert_eq!(loaded.birth_year(), Some(2012));
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_updates_existing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut animal = stallion("Comet");
        store.upsert(&animal).unwrap();

        animal.classification = Classification::AB;
        animal.color = Some("bay".to_string());
        store.upsert(&animal).unwrap();

        let loaded = store.get(&animal.id).unwrap().unwrap();
        assert_eq!(loaded.classification, Classification::AB);
        assert_eq!(loaded.color.as_deref(), Some("bay"));
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_name_is_constraint_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&stallion("Comet")).unwrap();

        let result = store.upsert(&mare("Comet"));
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }

    #[test]
    fn test_delete_referenced_parent_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sire = stallion("Sire");
        let foal = mare("Foal").with_sire(sire.id.clone());
        store.upsert(&sire).unwrap();
        store.upsert(&foal).unwrap();

        let result = store.delete(&sire.id);
        assert!(matches!(result, Err(StoreError::Constraint(_))));

        assert!(store.delete(&foal.id).unwrap());
        assert!(store.delete(&sire.id).unwrap());
        assert!(!store.delete(&sire.id).unwrap());
    }

    #[test]
    fn test_find_children_with_filters() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sire = stallion("Sire");
        let dam = mare("Dam");
        store.upsert(&sire).unwrap();
        store.upsert(&dam).unwrap();

        let colt = stallion("Colt")
            .with_sire(sire.id.clone())
            .with_dam(dam.id.clone())
            .with_breeder("br-1");
        let filly = mare("Filly").with_sire(sire.id.clone()).with_breeder("br-2");
        let unrelated = mare("Stranger");
        for a in [&colt, &filly, &unrelated] {
            store.upsert(a).unwrap();
        }

        let page = store
            .find_children(&ChildQuery::new(sire.id.clone(), 10))
            .unwrap();
        let names: Vec<_> = page.items.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Colt", "Filly"]);
        assert_eq!(page.total_count, 2);

        let mut query = ChildQuery::new(sire.id.clone(), 10);
        query.gender = Some(Gender::Female);
        let page = store.find_children(&query).unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].name, "Filly");

        let mut query = ChildQuery::new(sire.id.clone(), 10);
        query.breeder = Some("br-1".to_string());
        assert_eq!(store.find_children(&query).unwrap().items[0].name, "Colt");

        let mut query = ChildQuery::new(sire.id.clone(), 1);
        query.offset = 1;
        let page = store.find_children(&query).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Filly");
        assert_eq!(page.total_count, 2);
        assert!(!page.has_more());

        let page = store
            .find_children(&ChildQuery::new(unrelated.id.clone(), 10))
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_find_children_rejects_offset_beyond_i64() {
        let store = SqliteStore::open_in_memory().unwrap();
        let sire = stallion("Sire");
        store.upsert(&sire).unwrap();
        store.upsert(&mare("Filly").with_sire(sire.id.clone())).unwrap();

        let mut query = ChildQuery::new(sire.id.clone(), 10);
        query.offset = usize::MAX;
        let result = store.find_children(&query);
        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));

        query.offset = crate::storage::MAX_OFFSET;
        let page = store.find_children(&query).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 1);
        assert!(!page.has_more());
    }

    #[test]
    fn test_find_by_name_and_list() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert(&stallion("Comet")).unwrap();
        store.upsert(&mare("Aurora").with_breeder("br-1")).unwrap();

        assert!(store.find_by_name("Comet").unwrap().is_some());
        assert!(store.find_by_name("Nobody").unwrap().is_none());

        let names: Vec<_> = store
            .all()
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Aurora", "Comet"]);

        assert_eq!(store.list(Some(Gender::Male), None).unwrap().len(), 1);
        assert_eq!(store.list(None, Some("br-1")).unwrap().len(), 1);
    }

    #[test]
    fn test_cyclic_records_can_be_stored() {
        // Corrupted data must be representable so the engine can be tested against it
        let store = SqliteStore::open_in_memory().unwrap();
        let mut x = stallion("X");
        let mut y = stallion("Y");
        store.upsert(&x).unwrap();
        store.upsert(&y).unwrap();

        x.sire = Some(y.id.clone());
        y.sire = Some(x.id.clone());
        store.upsert(&x).unwrap();
        store.upsert(&y).unwrap();

        assert_eq!(store.get(&x.id).unwrap().unwrap().sire, Some(y.id.clone()));
    }
}
