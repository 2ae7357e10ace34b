//! Wikipedia reference links for an identified event

use crate::models::analysis_record::{DEFAULT_EVENT, ERROR_EVENT};
use crate::models::{WikipediaLinks, UNKNOWN};
use crate::services::geo_lookup::is_unknown_location;

const WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org";

/// Builds search and article links from `event` and `location_name`
pub struct ReferenceLinkBuilder;

impl ReferenceLinkBuilder {
    /// `None` for a blank or placeholder event
    pub fn build(event: &str, location_name: &str) -> Option<WikipediaLinks> {
        let event = event.trim();
        if is_placeholder_event(event) {
            return None;
        }

        let location = location_name.trim();
        let search_terms = if is_unknown_location(location) {
            event.to_string()
        } else {
            format!("{} {}", event, location)
        };

        let search_url = format!(
            "{}/w/index.php?search={}",
            WIKIPEDIA_BASE_URL,
            urlencoding::encode(&search_terms)
        );

        let article = event.split_whitespace().collect::<Vec<_>>().join("_");
        let direct_url = format!(
            "{}/wiki/{}",
            WIKIPEDIA_BASE_URL,
            urlencoding::encode(&article)
        );

        Some(WikipediaLinks {
            search_url,
            direct_url,
            summary: format!("See the Wikipedia article on {} for historical context.", event),
        })
    }
}

fn is_placeholder_event(event: &str) -> bool {
    event.is_empty()
        || event.eq_ignore_ascii_case(DEFAULT_EVENT)
        || event.eq_ignore_ascii_case(ERROR_EVENT)
        || event.eq_ignore_ascii_case(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_for_named_event() {
        let links = ReferenceLinkBuilder::build("Fall of the Berlin Wall", "Berlin, Germany").unwrap();
        assert_eq!(
            links.search_url,
            "https://en.wikipedia.org/w/index.php?search=Fall%20of%20the%20Berlin%20Wall%20Berlin%2C%20Germany"
        );
        assert_eq!(links.direct_url, "https://en.wikipedia.org/wiki/Fall_of_the_Berlin_Wall");
        assert!(links.summary.contains("Fall of the Berlin Wall"));
    }

    #[test]
    fn test_placeholder_location_omitted_from_search() {
        let links = ReferenceLinkBuilder::build("Moon Landing", "Unknown Location").unwrap();
        assert!(links.search_url.ends_with("search=Moon%20Landing"));
    }

    #[test]
    fn test_placeholder_events_produce_nothing() {
        assert!(ReferenceLinkBuilder::build("", "Paris").is_none());
        assert!(ReferenceLinkBuilder::build("Unidentified Historical Event", "Paris").is_none());
        assert!(ReferenceLinkBuilder::build("Error During Analysis", "Paris").is_none());
        assert!(ReferenceLinkBuilder::build("unknown", "Paris").is_none());
    }
}
