//! Plain-text search across every page.

use crate::store::DocumentStore;
use tracing::{debug, info};

/// A page whose text contains the search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub folder: String,
    pub page: String,
}

/// Finds pages whose plain text contains `term`, ignoring case.
///
/// Results follow folder order, then page order. A blank term matches nothing.
pub fn search_pages(store: &DocumentStore, term: &str) -> Vec<SearchHit> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    info!("Searching pages for: {}", term.trim());

    let mut hits = Vec::new();
    for folder in store.folder_names() {
        for page in store.page_names(folder) {
            let matches = store
                .page_plain_text(folder, page)
                .is_some_and(|text| text.to_lowercase().contains(&needle));
            if matches {
                hits.push(SearchHit {
                    folder: folder.to_string(),
                    page: page.to_string(),
                });
            }
        }
    }

    debug!("Found {} matching pages", hits.len());
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::constants::DEFAULT_FOLDER_NAME;
    use crate::richtext::{Event, Position, RichContent};
    use tempfile::TempDir;

    fn page_text(text: &str) -> RichContent {
        RichContent::from(vec![
            Event::tag_on("bold", Position::START),
            Event::text(format!("{}\n", text), Position::START),
            Event::tag_off("bold", Position::new(1, 3)),
        ])
    }

    #[test]
    fn test_search_is_case_insensitive_across_folders() {
        let temp_dir = TempDir::new().unwrap();
        let mut store =
            DocumentStore::open(&Config::for_data_file(temp_dir.path().join("folio.json")));
        store.add_folder("Research").unwrap();
        store.add_page(DEFAULT_FOLDER_NAME, "Intro").unwrap();
        store.add_page("Research", "Notes").unwrap();
        store.add_page("Research", "Other").unwrap();
        store
            .update_page_content(DEFAULT_FOLDER_NAME, "Intro", page_text("The Dragon wakes"))
            .unwrap();
        store
            .update_page_content("Research", "Notes", page_text("dragons of the north"))
            .unwrap();
        store
            .update_page_content("Research", "Other", page_text("nothing here"))
            .unwrap();

        let hits = search_pages(&store, "DRAGON");
        assert_eq!(
            hits,
            vec![
                SearchHit {
                    folder: DEFAULT_FOLDER_NAME.to_string(),
                    page: "Intro".to_string(),
                },
                SearchHit {
                    folder: "Research".to_string(),
                    page: "Notes".to_string(),
                },
            ]
        );

        assert!(search_pages(&store, "   ").is_empty());
        assert!(search_pages(&store, "griffin").is_empty());
    }
}
