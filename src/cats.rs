//! CRUD helpers over the `cats` collection.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::store::{self, Collection, Document, StoreError, doc};

pub const CATS_COLLECTION: &str = "cats";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cat {
    pub name: String,
    pub age: u32,
    pub features: Vec<String>,
}

impl Cat {
    pub fn new(name: &str, age: u32, features: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            age,
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }
}

fn by_name(name: &str) -> Document {
    doc(json!({ "name": name }))
}

/// Inserts `cat` unless one with the same name exists. Returns the new id.
pub fn create_cat(cats: &Collection<'_>, cat: &Cat) -> Result<Option<i64>, StoreError> {
    if cats.find_one(&by_name(&cat.name))?.is_some() {
        info!(name = %cat.name, "cat already exists");
        return Ok(None);
    }

    let id = cats.insert_one(store::to_document(cat)?)?;
    info!(name = %cat.name, id, "cat added");
    Ok(Some(id))
}

pub fn read_all_cats(cats: &Collection<'_>) -> Result<Vec<Document>, StoreError> {
    let all = cats.find(&Document::new())?;
    if all.is_empty() {
        info!("collection is empty");
    }
    for cat in &all {
        let record = Value::Object(cat.clone());
        info!("{record}");
    }
    Ok(all)
}

pub fn read_cat_by_name(cats: &Collection<'_>, name: &str) -> Result<Option<Document>, StoreError> {
    let found = cats.find_one(&by_name(name))?;
    match &found {
        Some(cat) => {
            let record = Value::Object(cat.clone());
            info!("{record}");
        }
        None => info!(name, "cat not found"),
    }
    Ok(found)
}

/// Returns false when no cat has that name.
pub fn update_cat_age_by_name(
    cats: &Collection<'_>,
    name: &str,
    age: u32,
) -> Result<bool, StoreError> {
    let result = cats.update_one_set(&by_name(name), &doc(json!({ "age": age })))?;
    if result.matched > 0 {
        info!(name, age, "age updated");
    } else {
        info!(name, "cat not found");
    }
    Ok(result.matched > 0)
}

pub fn add_cat_feature_by_name(
    cats: &Collection<'_>,
    name: &str,
    feature: &str,
) -> Result<bool, StoreError> {
    let result = cats.update_one_push(&by_name(name), "features", Value::from(feature))?;
    if result.matched > 0 {
        info!(name, feature, "feature added");
    } else {
        info!(name, "cat not found");
    }
    Ok(result.matched > 0)
}

pub fn delete_cat_by_name(cats: &Collection<'_>, name: &str) -> Result<bool, StoreError> {
    let deleted = cats.delete_one(&by_name(name))?;
    if deleted > 0 {
        info!(name, "cat deleted");
    } else {
        info!(name, "cat not found");
    }
    Ok(deleted > 0)
}

pub fn delete_all_cats(cats: &Collection<'_>) -> Result<u64, StoreError> {
    let deleted = cats.delete_many(&Document::new())?;
    info!(deleted, "all cats deleted");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentStore;

    fn features(doc: &Document) -> Vec<String> {
        serde_json::from_value(doc["features"].clone()).unwrap()
    }

    #[test]
    fn duplicate_names_are_refused() {
        let store = DocumentStore::open_in_memory().unwrap();
        let cats = store.collection(CATS_COLLECTION);

        assert!(create_cat(&cats, &Cat::new("barsik", 3, &["ginger"])).unwrap().is_some());
        assert!(create_cat(&cats, &Cat::new("barsik", 9, &[])).unwrap().is_none());

        let all = read_all_cats(&cats).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["age"], 3);
    }

    #[test]
    fn crud_walkthrough() {
        let store = DocumentStore::open_in_memory().unwrap();
        let cats = store.collection(CATS_COLLECTION);
        create_cat(&cats, &Cat::new("barsik", 3, &["wears slippers"])).unwrap();
        create_cat(&cats, &Cat::new("lapa", 5, &["likes to sleep"])).unwrap();
        create_cat(&cats, &Cat::new("marta", 2, &["playful"])).unwrap();

        assert!(update_cat_age_by_name(&cats, "barsik", 4).unwrap());
        assert!(add_cat_feature_by_name(&cats, "lapa", "hates water").unwrap());
        assert!(delete_cat_by_name(&cats, "marta").unwrap());

        let barsik = read_cat_by_name(&cats, "barsik").unwrap().unwrap();
        assert_eq!(barsik["age"], 4);
        assert_eq!(features(&barsik), vec!["wears slippers"]);

        let lapa = read_cat_by_name(&cats, "lapa").unwrap().unwrap();
        assert_eq!(features(&lapa), vec!["likes to sleep", "hates water"]);

        assert!(read_cat_by_name(&cats, "marta").unwrap().is_none());
        assert_eq!(delete_all_cats(&cats).unwrap(), 2);
        assert!(read_all_cats(&cats).unwrap().is_empty());
    }

    #[test]
    fn missing_cat_is_reported_not_failed() {
        let store = DocumentStore::open_in_memory().unwrap();
        let cats = store.collection(CATS_COLLECTION);

        assert!(!update_cat_age_by_name(&cats, "ghost", 1).unwrap());
        assert!(!add_cat_feature_by_name(&cats, "ghost", "invisible").unwrap());
        assert!(!delete_cat_by_name(&cats, "ghost").unwrap());
        assert!(read_cat_by_name(&cats, "ghost").unwrap().is_none());
    }
}
