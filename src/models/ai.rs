use serde::{Deserialize, Serialize};

use super::{Course, Reel};

/// Generated summary of a reel or course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// Multiple-choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Text of the correct option
    pub correct_answer: String,
}

/// Generated quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// Checks the structure of a generated quiz
    pub fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("quiz has no questions".to_string());
        }

        for (index, question) in self.questions.iter().enumerate() {
            if question.question.trim().is_empty() {
                return Err(format!("question {} is blank", index + 1));
            }
            if question.options.is_empty() {
                return Err(format!("question {} has no options", index + 1));
            }
            if !question.options.contains(&question.correct_answer) {
                return Err(format!(
                    "question {} answer is not one of its options",
                    index + 1
                ));
            }
        }

        Ok(())
    }
}

/// Material a summary or quiz is generated from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonContext {
    pub title: String,
    pub description: String,
    /// Spoken content; the description stands in when there is no transcript
    pub transcript: String,
    pub tags: String,
    pub difficulty: String,
}

impl LessonContext {
    pub fn for_reel(reel: &Reel) -> Self {
        let description = reel.description.clone().unwrap_or_default();
        let transcript = reel
            .transcript
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| description.clone());

        Self {
            title: reel.title.clone(),
            description,
            transcript,
            tags: reel.tags.clone(),
            difficulty: reel.difficulty.to_string(),
        }
    }

    /// Courses are described by their own description plus the titles of their reels
    pub fn for_course(course: &Course) -> Self {
        let topics: Vec<&str> = course.reels.iter().map(|r| r.title.as_str()).collect();
        let description = format!(
            "{}\n\nTopics: {}",
            course.description.as_deref().unwrap_or_default(),
            topics.join(", ")
        );

        Self {
            title: course.title.clone(),
            transcript: description.clone(),
            description,
            tags: String::new(),
            difficulty: course.difficulty.to_string(),
        }
    }
}
