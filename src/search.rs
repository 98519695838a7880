//! Search index adapters for catalog records.
//!
//! Each indexed model describes the text it contributes through
//! [`SearchAdapter`]. The title is weighted highest by the index, then the
//! description, then the body content.

use readcomics_common::text::strip_tags;
use readcomics_common::SearchObjectType;
use readcomics_db::models::{Character, Person, Publisher, SearchEntry};

/// Text a record contributes to the full-text index.
pub trait SearchAdapter {
    fn object_type(&self) -> SearchObjectType;

    fn object_id(&self) -> String;

    fn title(&self) -> String;

    fn description(&self) -> String;

    fn content(&self) -> String;

    /// Index entry for this record.
    fn entry(&self) -> SearchEntry {
        SearchEntry {
            object_type: self.object_type(),
            object_id: self.object_id(),
            title: self.title(),
            description: self.description(),
            content: self.content(),
        }
    }
}

/// Name followed by the alias lines, when there are any.
fn titled(name: &str, aliases: Option<&str>) -> String {
    match aliases.map(str::trim).filter(|a| !a.is_empty()) {
        Some(aliases) => format!("{}\n{}", name, aliases),
        None => name.to_string(),
    }
}

fn stripped(html: Option<&str>) -> String {
    html.map(strip_tags).unwrap_or_default()
}

impl SearchAdapter for Character {
    fn object_type(&self) -> SearchObjectType {
        SearchObjectType::Character
    }

    fn object_id(&self) -> String {
        self.id.to_string()
    }

    fn title(&self) -> String {
        titled(&self.name, Some(&self.aliases))
    }

    fn description(&self) -> String {
        self.short_description.clone()
    }

    fn content(&self) -> String {
        stripped(Some(&self.html_description))
    }
}

impl SearchAdapter for Person {
    fn object_type(&self) -> SearchObjectType {
        SearchObjectType::Person
    }

    fn object_id(&self) -> String {
        self.id.to_string()
    }

    fn title(&self) -> String {
        titled(self.name.as_deref().unwrap_or_default(), self.aliases.as_deref())
    }

    fn description(&self) -> String {
        self.short_description.clone().unwrap_or_default()
    }

    fn content(&self) -> String {
        stripped(self.html_description.as_deref())
    }
}

impl SearchAdapter for Publisher {
    fn object_type(&self) -> SearchObjectType {
        SearchObjectType::Publisher
    }

    fn object_id(&self) -> String {
        self.id.to_string()
    }

    fn title(&self) -> String {
        titled(&self.name, self.aliases.as_deref())
    }

    fn description(&self) -> String {
        self.short_description.clone().unwrap_or_default()
    }

    fn content(&self) -> String {
        stripped(self.html_description.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use readcomics_common::PublisherId;
    use readcomics_db::models::ComicvineSync;

    fn publisher(aliases: Option<&str>) -> Publisher {
        Publisher {
            id: PublisherId::new(),
            sync: ComicvineSync {
                comicvine_id: 10,
                comicvine_url: String::new(),
                comicvine_matched: true,
                created_dt: Utc::now(),
                modified_dt: Utc::now(),
            },
            name: "Dark Horse Comics".to_string(),
            aliases: aliases.map(str::to_string),
            short_description: Some("Independent publisher".to_string()),
            html_description: Some("<p>Founded in <b>1986</b> &amp; based in Oregon</p>".to_string()),
            thumb_url: None,
            image_url: None,
            slug: "Dark-Horse-Comics".to_string(),
        }
    }

    #[test]
    fn test_publisher_entry() {
        let p = publisher(Some("Dark Horse\nDHC"));
        let entry = p.entry();
        assert_eq!(entry.object_type, SearchObjectType::Publisher);
        assert_eq!(entry.object_id, p.id.to_string());
        assert_eq!(entry.title, "Dark Horse Comics\nDark Horse\nDHC");
        assert_eq!(entry.description, "Independent publisher");
        assert_eq!(entry.content, "Founded in 1986 & based in Oregon");
    }

    #[test]
    fn test_title_without_aliases() {
        assert_eq!(publisher(None).title(), "Dark Horse Comics");
        assert_eq!(publisher(Some("  ")).title(), "Dark Horse Comics");
    }
}
