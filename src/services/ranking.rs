//! Personalized feed ranking.
//!
//! Derives a preference profile from the reels a user has watched and scores
//! every candidate against it. Pure and synchronous: callers resolve history
//! and candidates beforehand, and the output only depends on those inputs.

use std::collections::{HashMap, HashSet};

use crate::models::{ContentItem, Difficulty, WatchRecord};

/// Flat score every candidate starts with
pub const BASE_SCORE: f64 = 10.0;
pub const TAG_MATCH_POINTS: f64 = 10.0;
pub const TAG_AFFINITY_CAP: f64 = 30.0;
pub const DIFFICULTY_MATCH_POINTS: f64 = 20.0;
/// Awarded when the candidate is one level away from the preferred difficulty
pub const DIFFICULTY_ADJACENT_POINTS: f64 = 10.0;
/// Points per 100 views
pub const POPULARITY_POINTS_PER_HUNDRED: f64 = 5.0;
pub const POPULARITY_CAP: f64 = 15.0;
pub const WATCHED_PENALTY: f64 = 50.0;

/// Tag and difficulty exposure of a single user.
///
/// Built per ranking call and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceProfile {
    tag_frequency: HashMap<String, usize>,
    /// Kept in first-seen order so ties on the top count resolve deterministically
    difficulty_frequency: Vec<(Difficulty, usize)>,
}

impl PreferenceProfile {
    /// Tallies tags and difficulties across watched items in one pass
    pub fn from_watched<'a, I>(watched: I) -> Self
    where
        I: IntoIterator<Item = &'a ContentItem>,
    {
        let mut profile = Self::default();

        for item in watched {
            for tag in &item.tags {
                *profile.tag_frequency.entry(tag.clone()).or_insert(0) += 1;
            }

            match profile
                .difficulty_frequency
                .iter_mut()
                .find(|(level, _)| *level == item.difficulty)
            {
                Some((_, count)) => *count += 1,
                None => profile
                    .difficulty_frequency
                    .push((item.difficulty.clone(), 1)),
            }
        }

        profile
    }

    pub fn tag_count(&self, tag: &str) -> usize {
        self.tag_frequency.get(tag).copied().unwrap_or(0)
    }

    pub fn difficulty_count(&self, difficulty: &Difficulty) -> usize {
        self.difficulty_frequency
            .iter()
            .find(|(level, _)| level == difficulty)
            .map_or(0, |(_, count)| *count)
    }

    /// Most watched difficulty.
    ///
    /// On equal counts the level that appeared first in the history wins.
    /// That tie-break is arbitrary; it only guarantees determinism.
    pub fn preferred_difficulty(&self) -> Option<&Difficulty> {
        let mut best: Option<&(Difficulty, usize)> = None;
        for entry in &self.difficulty_frequency {
            if best.map_or(true, |(_, top)| entry.1 > *top) {
                best = Some(entry);
            }
        }
        best.map(|(level, _)| level)
    }

    pub fn is_empty(&self) -> bool {
        self.tag_frequency.is_empty() && self.difficulty_frequency.is_empty()
    }

    /// Number of distinct candidate tags the user has already seen.
    ///
    /// Only presence counts, not how often a tag was watched.
    fn tag_overlap(&self, tags: &[String]) -> usize {
        tags.iter()
            .map(String::as_str)
            .collect::<HashSet<_>>()
            .into_iter()
            .filter(|tag| self.tag_frequency.contains_key(*tag))
            .count()
    }
}

/// Individual terms that add up to a candidate's score
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub tag_affinity: f64,
    pub difficulty_affinity: f64,
    pub popularity: f64,
    /// Zero or `-WATCHED_PENALTY`
    pub watched_penalty: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base + self.tag_affinity + self.difficulty_affinity + self.popularity
            + self.watched_penalty
    }
}

/// Candidate paired with its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub item: ContentItem,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Distinct watched reel ids, in the order they first appear in the history.
/// Course-level records carry no reel and are skipped.
pub fn watched_content_ids(history: &[WatchRecord]) -> Vec<i64> {
    let mut seen = HashSet::new();
    history
        .iter()
        .filter_map(|record| record.content_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Ranks candidates for a user.
///
/// `watched_content` resolves watched ids to their items; ids it cannot
/// resolve still trigger the watched penalty but contribute nothing to the
/// profile. The result is ordered by descending score and equal scores keep
/// their relative order from `candidates`.
pub fn rank(
    history: &[WatchRecord],
    watched_content: &HashMap<i64, ContentItem>,
    candidates: Vec<ContentItem>,
) -> Vec<ScoredItem> {
    let watched_ids = watched_content_ids(history);
    let profile =
        PreferenceProfile::from_watched(watched_ids.iter().filter_map(|id| watched_content.get(id)));
    let watched: HashSet<i64> = watched_ids.into_iter().collect();

    let mut scored: Vec<ScoredItem> = candidates
        .into_iter()
        .map(|item| {
            let breakdown = score(&profile, &watched, &item);
            ScoredItem {
                score: breakdown.total(),
                breakdown,
                item,
            }
        })
        .collect();

    // `sort_by` is stable, which is what keeps ties in input order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Scores one candidate against a profile
pub fn score(
    profile: &PreferenceProfile,
    watched: &HashSet<i64>,
    candidate: &ContentItem,
) -> ScoreBreakdown {
    ScoreBreakdown {
        base: BASE_SCORE,
        tag_affinity: tag_affinity(profile, candidate),
        difficulty_affinity: difficulty_affinity(profile, candidate),
        popularity: popularity(candidate.popularity),
        watched_penalty: if watched.contains(&candidate.id) {
            -WATCHED_PENALTY
        } else {
            0.0
        },
    }
}

fn tag_affinity(profile: &PreferenceProfile, candidate: &ContentItem) -> f64 {
    let overlap = profile.tag_overlap(&candidate.tags) as f64;
    (overlap * TAG_MATCH_POINTS).min(TAG_AFFINITY_CAP)
}

fn difficulty_affinity(profile: &PreferenceProfile, candidate: &ContentItem) -> f64 {
    let Some(preferred) = profile.preferred_difficulty() else {
        return 0.0;
    };

    if candidate.difficulty == *preferred {
        DIFFICULTY_MATCH_POINTS
    } else if candidate.difficulty.ordinal().abs_diff(preferred.ordinal()) == 1 {
        DIFFICULTY_ADJACENT_POINTS
    } else {
        0.0
    }
}

fn popularity(views: u64) -> f64 {
    (views as f64 / 100.0 * POPULARITY_POINTS_PER_HUNDRED).min(POPULARITY_CAP)
}
