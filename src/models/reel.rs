use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::Quiz;

/// Difficulty level of a reel or course
///
/// Stored and transmitted as its lowercase label. Labels outside the known
/// three survive as `Unrecognized` so that legacy rows never fail to load;
/// new content is validated with [`Difficulty::known`] at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Unrecognized(String),
}

impl Difficulty {
    /// Parses a label, keeping unknown labels as `Unrecognized`
    pub fn parse(label: &str) -> Self {
        match label {
            "beginner" => Difficulty::Beginner,
            "intermediate" => Difficulty::Intermediate,
            "advanced" => Difficulty::Advanced,
            other => Difficulty::Unrecognized(other.to_string()),
        }
    }

    /// Parses a label, returning `None` for anything but the three known levels
    pub fn known(label: &str) -> Option<Self> {
        match Self::parse(label) {
            Difficulty::Unrecognized(_) => None,
            level => Some(level),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Unrecognized(label) => label,
        }
    }

    /// Position on the beginner → advanced scale.
    ///
    /// Unrecognized labels rank as beginner.
    pub fn ordinal(&self) -> u8 {
        match self {
            Difficulty::Beginner | Difficulty::Unrecognized(_) => 1,
            Difficulty::Intermediate => 2,
            Difficulty::Advanced => 3,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Beginner
    }
}

impl From<String> for Difficulty {
    fn from(label: String) -> Self {
        Difficulty::parse(&label)
    }
}

impl From<Difficulty> for String {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.as_str().to_string()
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Splits a raw comma-separated tag string into trimmed, non-empty tags
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// The view of a reel the feed ranker works with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    /// Tags in their stored order
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    /// View count
    pub popularity: u64,
}

/// Educational short-form video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reel {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    /// Identifier on the media host, when the video was uploaded through us
    pub media_public_id: Option<String>,
    /// Raw comma-separated tags, as supplied by the creator
    pub tags: String,
    pub difficulty: Difficulty,
    pub duration_seconds: i32,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub views_count: i64,
    pub ai_summary: Option<String>,
    pub ai_key_points: Option<Vec<String>>,
    pub ai_quiz: Option<Quiz>,
    pub transcript: Option<String>,
}

impl Reel {
    pub fn tag_list(&self) -> Vec<String> {
        parse_tags(&self.tags)
    }

    /// Projects the reel onto the attributes used for ranking
    pub fn content_item(&self) -> ContentItem {
        ContentItem {
            id: self.id,
            tags: self.tag_list(),
            difficulty: self.difficulty.clone(),
            popularity: self.views_count.max(0) as u64,
        }
    }
}

/// Fields needed to create a reel
#[derive(Debug, Clone, PartialEq)]
pub struct NewReel {
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub media_public_id: Option<String>,
    pub tags: String,
    pub difficulty: Difficulty,
    pub duration_seconds: i32,
    pub creator_id: i64,
}

/// Generated metadata attached to a reel after upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiMetadata {
    pub summary: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub quiz: Option<Quiz>,
}

/// Pre-filter applied by the content repository before ranking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReelFilter {
    /// Substring that must appear in the raw tag string
    pub tag_contains: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl ReelFilter {
    pub fn matches(&self, reel: &Reel) -> bool {
        let tag_ok = self
            .tag_contains
            .as_deref()
            .map_or(true, |needle| reel.tags.contains(needle));
        let difficulty_ok = self
            .difficulty
            .as_ref()
            .map_or(true, |level| &reel.difficulty == level);
        tag_ok && difficulty_ok
    }
}

/// Reel as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReelResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_public_id: Option<String>,
    pub tags: String,
    pub difficulty_level: Difficulty,
    pub duration_seconds: i32,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub views_count: i64,
    pub creator_name: Option<String>,
    pub ai_summary: Option<String>,
    pub ai_key_points: Option<Vec<String>>,
    pub ai_quiz: Option<Quiz>,
}

impl ReelResponse {
    pub fn new(reel: Reel, creator_name: Option<String>) -> Self {
        Self {
            id: reel.id,
            title: reel.title,
            description: reel.description,
            video_url: reel.video_url,
            media_public_id: reel.media_public_id,
            tags: reel.tags,
            difficulty_level: reel.difficulty,
            duration_seconds: reel.duration_seconds,
            creator_id: reel.creator_id,
            created_at: reel.created_at,
            views_count: reel.views_count,
            creator_name,
            ai_summary: reel.ai_summary,
            ai_key_points: reel.ai_key_points,
            ai_quiz: reel.ai_quiz,
        }
    }
}

impl From<Reel> for ReelResponse {
    fn from(reel: Reel) -> Self {
        Self::new(reel, None)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse_known_levels() {
        assert_eq!(Difficulty::parse("beginner"), Difficulty::Beginner);
        assert_eq!(Difficulty::parse("intermediate"), Difficulty::Intermediate);
        assert_eq!(Difficulty::parse("advanced"), Difficulty::Advanced);
    }

    #[test]
    fn test_difficulty_unknown_label_ranks_as_beginner() {
        let level = Difficulty::parse("expert");
        assert_eq!(level, Difficulty::Unrecognized("expert".to_string()));
        assert_eq!(level.ordinal(), 1);
        assert_eq!(level.as_str(), "expert");
        assert_eq!(Difficulty::known("expert"), None);
    }

    #[test]
    fn test_difficulty_serde_as_label() {
        let json = serde_json::to_string(&Difficulty::Intermediate).unwrap();
        assert_eq!(json, "\"intermediate\"");

        let parsed: Difficulty = serde_json::from_str("\"advanced\"").unwrap();
        assert_eq!(parsed, Difficulty::Advanced);

        let legacy: Difficulty = serde_json::from_str("\"Hard\"").unwrap();
        assert_eq!(legacy.to_string(), "Hard");
    }

    #[test]
    fn test_parse_tags_trims_and_drops_empty() {
        assert_eq!(
            parse_tags(" python, web ,, css ,"),
            vec!["python".to_string(), "web".to_string(), "css".to_string()]
        );
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_content_item_projection() {
        let reel = fixtures::reel(7, "rust,async", "advanced", 250);
        let item = reel.content_item();
        assert_eq!(item.id, 7);
        assert_eq!(item.tags, vec!["rust".to_string(), "async".to_string()]);
        assert_eq!(item.difficulty, Difficulty::Advanced);
        assert_eq!(item.popularity, 250);
    }

    #[test]
    fn test_filter_uses_substring_on_raw_tags() {
        let reel = fixtures::reel(1, "python,webdev", "beginner", 0);

        let by_partial_tag = ReelFilter {
            tag_contains: Some("web".to_string()),
            difficulty: None,
        };
        assert!(by_partial_tag.matches(&reel));

        let by_difficulty = ReelFilter {
            tag_contains: None,
            difficulty: Some(Difficulty::Advanced),
        };
        assert!(!by_difficulty.matches(&reel));
        assert!(ReelFilter::default().matches(&reel));
    }
}
