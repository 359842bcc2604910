use serde::{Deserialize, Serialize};

/// One quote as listed on a quotes page.
///
/// Quotes are not deduplicated: the same text seen on two pages yields two
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub tags: Vec<String>,
    #[serde(rename = "author")]
    pub author_name: String,
    #[serde(rename = "quote")]
    pub text: String,
}

/// Biography scraped from an author's profile page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "fullname")]
    pub full_name: String,
    pub born_date: String,
    pub born_location: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quote_uses_export_field_names() {
        let quote = Quote {
            tags: vec!["life".into()],
            author_name: "Jane Doe".into(),
            text: "“Be.”".into(),
        };

        let value = serde_json::to_value(&quote).unwrap();
        assert_eq!(
            value,
            json!({ "tags": ["life"], "author": "Jane Doe", "quote": "“Be.”" })
        );
    }

    #[test]
    fn author_uses_export_field_names() {
        let value = json!({
            "fullname": "Jane Doe",
            "born_date": "January 1, 1900",
            "born_location": "in Kyiv, Ukraine",
            "description": "Writer."
        });

        let author: Author = serde_json::from_value(value).unwrap();
        assert_eq!(author.full_name, "Jane Doe");
        assert_eq!(author.born_location, "in Kyiv, Ukraine");
    }
}
