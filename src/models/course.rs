use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Difficulty, Reel, ReelResponse};

/// Ordered collection of reels published as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    /// Member reels in course order
    pub reels: Vec<Reel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub creator_id: i64,
    pub reel_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub difficulty_level: Difficulty,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub reels: Vec<ReelResponse>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            difficulty_level: course.difficulty,
            creator_id: course.creator_id,
            created_at: course.created_at,
            reels: course.reels.into_iter().map(ReelResponse::from).collect(),
        }
    }
}

/// A learner's completion state for one course
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseProgress {
    pub course_id: i64,
    pub total_reels: usize,
    pub completed_reels: usize,
    /// Percentage rounded to two decimals
    pub completion_percentage: f64,
}

impl CourseProgress {
    pub fn new(course_id: i64, total_reels: usize, completed_reels: usize) -> Self {
        let completion_percentage = if total_reels == 0 {
            0.0
        } else {
            let raw = completed_reels as f64 / total_reels as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };

        Self {
            course_id,
            total_reels,
            completed_reels,
            completion_percentage,
        }
    }
}
