//! A small document store on top of SQLite.
//!
//! Documents are JSON objects grouped into named collections. Filters are
//! JSON objects too: a document matches when every filter field is present
//! and equal, so an empty filter matches the whole collection. Documents
//! read back carry their row id under `_id`.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde_json::{Map, Value};
use thiserror::Error;

pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not a JSON object: {0}")]
    NotAnObject(String),
    #[error("field `{field}` of document {id} is not an array")]
    NotAnArray { field: String, id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                body TEXT NOT NULL,
                inserted_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection
                ON documents (collection);
            ",
        )?;

        Ok(Self { conn })
    }

    /// Round-trips a trivial query to prove the database is usable.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection {
            conn: &self.conn,
            name: name.to_string(),
        }
    }
}

pub struct Collection<'a> {
    conn: &'a Connection,
    name: String,
}

impl Collection<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find(&self, filter: &Document) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .scan()?
            .into_iter()
            .filter(|(_, doc)| matches(doc, filter))
            .map(|(_, doc)| doc)
            .collect())
    }

    pub fn find_one(&self, filter: &Document) -> Result<Option<Document>, StoreError> {
        Ok(self.first_match(filter)?.map(|(_, doc)| doc))
    }

    pub fn count(&self, filter: &Document) -> Result<usize, StoreError> {
        Ok(self.find(filter)?.len())
    }

    /// Stores `doc` and returns its generated id. Any `_id` in `doc` is
    /// ignored.
    pub fn insert_one(&self, doc: Document) -> Result<i64, StoreError> {
        insert(self.conn, &self.name, doc)
    }

    /// Inserts all documents in one transaction.
    pub fn insert_many<I>(&self, docs: I) -> Result<Vec<i64>, StoreError>
    where
        I: IntoIterator<Item = Document>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let ids = docs
            .into_iter()
            .map(|doc| insert(&tx, &self.name, doc))
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit()?;

        Ok(ids)
    }

    /// Overwrites `fields` on the first matching document.
    pub fn update_one_set(
        &self,
        filter: &Document,
        fields: &Document,
    ) -> Result<UpdateResult, StoreError> {
        self.update_first(filter, |_, doc| {
            for (key, value) in fields {
                if key != ID_FIELD {
                    doc.insert(key.clone(), value.clone());
                }
            }
            Ok(())
        })
    }

    /// Appends `value` to the array `field` of the first matching document,
    /// creating the array if the field is missing.
    pub fn update_one_push(
        &self,
        filter: &Document,
        field: &str,
        value: Value,
    ) -> Result<UpdateResult, StoreError> {
        self.update_first(filter, |id, doc| {
            match doc
                .entry(field.to_string())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                Value::Array(items) => {
                    items.push(value);
                    Ok(())
                }
                _ => Err(StoreError::NotAnArray {
                    field: field.to_string(),
                    id,
                }),
            }
        })
    }

    /// Returns the number of documents removed, 0 or 1.
    pub fn delete_one(&self, filter: &Document) -> Result<u64, StoreError> {
        match self.first_match(filter)? {
            Some((id, _)) => {
                let affected = self
                    .conn
                    .execute("DELETE FROM documents WHERE id = ?1", [id])?;
                Ok(affected as u64)
            }
            None => Ok(0),
        }
    }

    pub fn delete_many(&self, filter: &Document) -> Result<u64, StoreError> {
        if filter.is_empty() {
            let affected = self
                .conn
                .execute("DELETE FROM documents WHERE collection = ?1", [&self.name])?;
            return Ok(affected as u64);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut deleted = 0;
        for (id, doc) in self.scan()? {
            if matches(&doc, filter) {
                deleted += tx.execute("DELETE FROM documents WHERE id = ?1", [id])? as u64;
            }
        }
        tx.commit()?;

        Ok(deleted)
    }

    fn update_first<U>(&self, filter: &Document, update: U) -> Result<UpdateResult, StoreError>
    where
        U: FnOnce(i64, &mut Document) -> Result<(), StoreError>,
    {
        let Some((id, original)) = self.first_match(filter)? else {
            return Ok(UpdateResult::default());
        };

        let mut doc = original.clone();
        update(id, &mut doc)?;

        if doc == original {
            return Ok(UpdateResult {
                matched: 1,
                modified: 0,
            });
        }

        doc.remove(ID_FIELD);
        self.conn.execute(
            "UPDATE documents SET body = ?1 WHERE id = ?2",
            params![serde_json::to_string(&doc)?, id],
        )?;

        Ok(UpdateResult {
            matched: 1,
            modified: 1,
        })
    }

    fn first_match(&self, filter: &Document) -> Result<Option<(i64, Document)>, StoreError> {
        Ok(self
            .scan()?
            .into_iter()
            .find(|(_, doc)| matches(doc, filter)))
    }

    /// All documents of the collection in insertion order, `_id` included.
    fn scan(&self) -> Result<Vec<(i64, Document)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")?;

        let rows = stmt.query_map([&self.name], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let mut doc = match serde_json::from_str(&body)? {
                Value::Object(doc) => doc,
                other => return Err(StoreError::NotAnObject(other.to_string())),
            };
            doc.insert(ID_FIELD.to_string(), Value::from(id));
            docs.push((id, doc));
        }

        Ok(docs)
    }
}

fn insert(conn: &Connection, collection: &str, mut doc: Document) -> Result<i64, StoreError> {
    doc.remove(ID_FIELD);

    conn.execute(
        "
        INSERT INTO documents (collection, body, inserted_at)
        VALUES (?1, ?2, ?3)
        ",
        params![collection, serde_json::to_string(&doc)?, Utc::now().to_rfc3339()],
    )?;

    Ok(conn.last_insert_rowid())
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

/// Converts any serializable value into a storable document.
pub fn to_document<T: serde::Serialize + ?Sized>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::NotAnObject(other.to_string())),
    }
}

/// Builds a filter or document from a `json!` object literal.
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(doc) => doc,
        _ => Document::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn seeded() -> DocumentStore {
        let store = DocumentStore::open_in_memory().unwrap();
        store
            .collection("cats")
            .insert_many([
                doc(json!({ "name": "barsik", "age": 3, "features": ["ginger"] })),
                doc(json!({ "name": "lapa", "age": 5, "features": [] })),
                doc(json!({ "name": "lapa", "age": 7 })),
            ])
            .unwrap();
        store
    }

    #[test]
    fn ping_in_memory() {
        DocumentStore::open_in_memory().unwrap().ping().unwrap();
    }

    #[test]
    fn find_by_filter() {
        let store = seeded();
        let cats = store.collection("cats");

        assert_eq!(cats.find(&Document::new()).unwrap().len(), 3);
        assert_eq!(cats.find(&doc(json!({ "name": "lapa" }))).unwrap().len(), 2);

        let barsik = cats.find_one(&doc(json!({ "name": "barsik" }))).unwrap().unwrap();
        assert_eq!(barsik["age"], json!(3));
        assert!(barsik.contains_key(ID_FIELD));

        assert!(cats.find_one(&doc(json!({ "name": "murka" }))).unwrap().is_none());
    }

    #[test]
    fn collections_are_isolated() {
        let store = seeded();
        assert_eq!(store.collection("dogs").count(&Document::new()).unwrap(), 0);
    }

    #[test]
    fn find_by_id() {
        let store = seeded();
        let cats = store.collection("cats");
        let id = cats.insert_one(doc(json!({ "name": "marta" }))).unwrap();

        let found = cats.find_one(&doc(json!({ "_id": id }))).unwrap().unwrap();
        assert_eq!(found["name"], json!("marta"));
    }

    #[test]
    fn set_keeps_other_fields() {
        let store = seeded();
        let cats = store.collection("cats");

        let result = cats
            .update_one_set(&doc(json!({ "name": "barsik" })), &doc(json!({ "age": 4 })))
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 1, modified: 1 });

        let barsik = cats.find_one(&doc(json!({ "name": "barsik" }))).unwrap().unwrap();
        assert_eq!(barsik["age"], json!(4));
        assert_eq!(barsik["features"], json!(["ginger"]));
    }

    #[test]
    fn set_same_value_is_not_a_modification() {
        let store = seeded();
        let result = store
            .collection("cats")
            .update_one_set(&doc(json!({ "name": "barsik" })), &doc(json!({ "age": 3 })))
            .unwrap();
        assert_eq!(result, UpdateResult { matched: 1, modified: 0 });
    }

    #[test]
    fn update_without_match() {
        let store = seeded();
        let result = store
            .collection("cats")
            .update_one_set(&doc(json!({ "name": "murka" })), &doc(json!({ "age": 1 })))
            .unwrap();
        assert_eq!(result, UpdateResult::default());
    }

    #[test]
    fn push_appends_and_creates() {
        let store = seeded();
        let cats = store.collection("cats");

        cats.update_one_push(&doc(json!({ "name": "barsik" })), "features", json!("sleepy"))
            .unwrap();
        cats.update_one_push(&doc(json!({ "age": 7 })), "features", json!("loud"))
            .unwrap();

        let barsik = cats.find_one(&doc(json!({ "name": "barsik" }))).unwrap().unwrap();
        assert_eq!(barsik["features"], json!(["ginger", "sleepy"]));
        let old_lapa = cats.find_one(&doc(json!({ "age": 7 }))).unwrap().unwrap();
        assert_eq!(old_lapa["features"], json!(["loud"]));
    }

    #[test]
    fn push_onto_scalar_fails() {
        let store = seeded();
        let err = store
            .collection("cats")
            .update_one_push(&doc(json!({ "name": "barsik" })), "age", json!(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAnArray { ref field, .. } if field == "age"));
    }

    #[test]
    fn delete_one_removes_first_match_only() {
        let store = seeded();
        let cats = store.collection("cats");

        assert_eq!(cats.delete_one(&doc(json!({ "name": "lapa" }))).unwrap(), 1);
        let left = cats.find(&doc(json!({ "name": "lapa" }))).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["age"], json!(7));

        assert_eq!(cats.delete_one(&doc(json!({ "name": "murka" }))).unwrap(), 0);
    }

    #[test]
    fn delete_many_with_and_without_filter() {
        let store = seeded();
        let cats = store.collection("cats");
        store
            .collection("dogs")
            .insert_one(doc(json!({ "name": "rex" })))
            .unwrap();

        assert_eq!(cats.delete_many(&doc(json!({ "name": "lapa" }))).unwrap(), 2);
        assert_eq!(cats.delete_many(&Document::new()).unwrap(), 1);
        assert_eq!(cats.count(&Document::new()).unwrap(), 0);
        assert_eq!(store.collection("dogs").count(&Document::new()).unwrap(), 1);
    }

    #[test]
    fn to_document_rejects_scalars() {
        assert!(matches!(to_document(&42), Err(StoreError::NotAnObject(_))));
    }
}
