use indexmap::IndexMap;

use crate::model::Author;

/// Authors seen during one run, keyed by the name shown on the quote.
///
/// `None` marks an author whose profile could not be fetched or parsed. The
/// name still counts as seen, so it is never fetched again. Entries keep
/// first-seen order.
#[derive(Debug, Default)]
pub struct AuthorCache {
    entries: IndexMap<String, Option<Author>>,
}

impl AuthorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Records `name` unless it is already present; existing entries are never
    /// replaced. Returns true if the entry was added.
    pub fn insert(&mut self, name: String, author: Option<Author>) -> bool {
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, author);
        true
    }

    /// `None` for unseen names, `Some(None)` for absent authors.
    pub fn get(&self, name: &str) -> Option<Option<&Author>> {
        self.entries.get(name).map(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Authors whose profile was scraped.
    pub fn resolved(&self) -> impl Iterator<Item = &Author> {
        self.entries.values().flatten()
    }

    /// Names recorded without a profile.
    pub fn absent(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, author)| author.is_none())
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(name: &str) -> Author {
        Author {
            full_name: name.into(),
            born_date: "March 14, 1879".into(),
            born_location: "in Ulm, Germany".into(),
            description: String::new(),
        }
    }

    #[test]
    fn first_insert_wins() {
        let mut cache = AuthorCache::new();

        assert!(cache.insert("Jane Doe".into(), None));
        assert!(!cache.insert("Jane Doe".into(), Some(author("Jane Doe"))));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Jane Doe"), Some(None));
        assert_eq!(cache.get("John Roe"), None);
    }

    #[test]
    fn resolved_and_absent_keep_insertion_order() {
        let mut cache = AuthorCache::new();
        cache.insert("Mark Twain".into(), Some(author("Mark Twain")));
        cache.insert("Nobody".into(), None);
        cache.insert("Albert Einstein".into(), Some(author("Albert Einstein")));

        let names: Vec<_> = cache.resolved().map(|a| a.full_name.as_str()).collect();
        assert_eq!(names, vec!["Mark Twain", "Albert Einstein"]);
        assert_eq!(cache.absent().collect::<Vec<_>>(), vec!["Nobody"]);
        assert!(cache.contains("Nobody"));
    }
}
