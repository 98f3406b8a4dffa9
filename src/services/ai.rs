//! Generated lesson summaries and quizzes.
//!
//! The service is built once at startup from [`AiSettings`]. Without settings
//! it answers with deterministic placeholders; with settings it calls a
//! chat-completions API and falls back to generic content whenever the
//! provider fails or returns something unusable. Callers therefore always
//! get a value.

use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    cached,
    config::AiSettings,
    db::{AiSubject, Cache, CacheKey, AI_CACHE_TTL_SECS},
    error::{AppError, AppResult},
    models::{LessonContext, Quiz, QuizQuestion, Summary},
};

/// Longest transcript excerpt sent to the provider, in characters
pub const MAX_TRANSCRIPT_CHARS: usize = 3000;

pub const REEL_QUIZ_QUESTIONS: usize = 3;
pub const COURSE_QUIZ_QUESTIONS: usize = 5;

/// Which generator answers requests
pub enum AiBackend {
    Disabled,
    OpenAi(OpenAiClient),
}

pub struct AiService {
    backend: AiBackend,
    cache: Option<Cache>,
}

impl AiService {
    /// Enabled when settings are present; results are cached when a cache is given
    pub fn new(settings: Option<AiSettings>, cache: Option<Cache>) -> Self {
        let backend = match settings {
            Some(settings) => {
                tracing::info!(model = %settings.model, "AI generation enabled");
                AiBackend::OpenAi(OpenAiClient::new(settings))
            }
            None => {
                tracing::info!("AI generation disabled, serving placeholder content");
                AiBackend::Disabled
            }
        };

        Self { backend, cache }
    }

    pub fn disabled() -> Self {
        Self {
            backend: AiBackend::Disabled,
            cache: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.backend, AiBackend::OpenAi(_))
    }

    pub async fn generate_summary(&self, subject: AiSubject, lesson: &LessonContext) -> Summary {
        let client = match &self.backend {
            AiBackend::Disabled => return placeholder_summary(lesson),
            AiBackend::OpenAi(client) => client,
        };

        match self.summary_through_cache(client, subject, lesson).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, %subject, "Summary generation failed, using fallback");
                fallback_summary(lesson)
            }
        }
    }

    pub async fn generate_quiz(
        &self,
        subject: AiSubject,
        lesson: &LessonContext,
        questions: usize,
    ) -> Quiz {
        let client = match &self.backend {
            AiBackend::Disabled => return placeholder_quiz(lesson),
            AiBackend::OpenAi(client) => client,
        };

        match self.quiz_through_cache(client, subject, lesson, questions).await {
            Ok(quiz) => quiz,
            Err(e) => {
                tracing::warn!(error = %e, %subject, "Quiz generation failed, using fallback");
                fallback_quiz(lesson)
            }
        }
    }

    async fn summary_through_cache(
        &self,
        client: &OpenAiClient,
        subject: AiSubject,
        lesson: &LessonContext,
    ) -> AppResult<Summary> {
        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::Summary(subject),
                AI_CACHE_TTL_SECS,
                client.summary(lesson)
            ),
            None => client.summary(lesson).await,
        }
    }

    async fn quiz_through_cache(
        &self,
        client: &OpenAiClient,
        subject: AiSubject,
        lesson: &LessonContext,
        questions: usize,
    ) -> AppResult<Quiz> {
        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::Quiz(subject, questions),
                AI_CACHE_TTL_SECS,
                client.quiz(lesson, questions)
            ),
            None => client.quiz(lesson, questions).await,
        }
    }
}

/// Chat-completions client
pub struct OpenAiClient {
    http_client: HttpClient,
    settings: AiSettings,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiClient {
    fn new(settings: AiSettings) -> Self {
        Self {
            http_client: HttpClient::new(),
            settings,
        }
    }

    async fn summary(&self, lesson: &LessonContext) -> AppResult<Summary> {
        let prompt = format!(
            "Summarize this educational video.\n\n\
             Title: {}\nDescription: {}\nTags: {}\nDifficulty: {}\n\n\
             Transcript:\n{}\n\n\
             Reply with JSON only, shaped as \
             {{\"summary\": \"two or three sentences\", \"key_points\": [\"three to five points\"]}}",
            lesson.title,
            lesson.description,
            lesson.tags,
            lesson.difficulty,
            truncate_transcript(&lesson.transcript),
        );

        let content = self
            .complete(
                "You summarize short educational videos accurately, using only what the material covers.",
                prompt,
                0.5,
                400,
            )
            .await?;
        parse_reply(&content)
    }

    async fn quiz(&self, lesson: &LessonContext, questions: usize) -> AppResult<Quiz> {
        let prompt = format!(
            "Write {} multiple-choice questions about this educational video.\n\n\
             Title: {}\nTags: {}\n\n\
             Transcript:\n{}\n\n\
             Every question has four options and exactly one correct answer. \
             correct_answer repeats the text of the correct option. \
             Reply with JSON only, shaped as \
             {{\"questions\": [{{\"question\": \"...\", \"options\": [\"...\"], \"correct_answer\": \"...\"}}]}}",
            questions,
            lesson.title,
            lesson.tags,
            truncate_transcript(&lesson.transcript),
        );

        let content = self
            .complete(
                "You write fair quiz questions that test the concepts a video teaches.",
                prompt,
                0.7,
                600,
            )
            .await?;
        let quiz: Quiz = parse_reply(&content)?;
        quiz.validate()
            .map_err(|reason| AppError::ExternalApi(format!("Unusable quiz: {}", reason)))?;
        Ok(quiz)
    }

    async fn complete(
        &self,
        system: &str,
        prompt: String,
        temperature: f32,
        max_tokens: u32,
    ) -> AppResult<String> {
        let url = format!(
            "{}/chat/completions",
            self.settings.api_url.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Completion API returned status {}: {}",
                status, body
            )));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalApi("Completion API returned no content".to_string()))
    }
}

/// First [`MAX_TRANSCRIPT_CHARS`] characters of a transcript
pub fn truncate_transcript(transcript: &str) -> &str {
    match transcript.char_indices().nth(MAX_TRANSCRIPT_CHARS) {
        Some((cut, _)) => &transcript[..cut],
        None => transcript,
    }
}

/// Removes a surrounding Markdown code fence, with or without a `json` tag
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(fenced) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = fenced.split("```").next().unwrap_or(fenced);
    body.strip_prefix("json").unwrap_or(body).trim()
}

fn parse_reply<T: DeserializeOwned>(content: &str) -> AppResult<T> {
    serde_json::from_str(strip_code_fences(content))
        .map_err(|e| AppError::ExternalApi(format!("Malformed completion payload: {}", e)))
}

fn placeholder_summary(lesson: &LessonContext) -> Summary {
    let detail = if lesson.description.is_empty() {
        "Educational video content.".to_string()
    } else {
        lesson.description.chars().take(100).collect()
    };

    Summary {
        summary: format!("This content covers {}. {}", lesson.title, detail),
        key_points: vec![
            "Educational content".to_string(),
            "Bite-sized learning".to_string(),
            format!("Difficulty: {}", lesson.difficulty),
        ],
    }
}

fn fallback_summary(lesson: &LessonContext) -> Summary {
    Summary {
        summary: format!("Learn about {} in this educational video.", lesson.title),
        key_points: vec![
            "Engaging educational material".to_string(),
            "Bite-sized learning format".to_string(),
            format!("Difficulty level: {}", lesson.difficulty),
        ],
    }
}

fn single_question_quiz(question: String, options: [&str; 4]) -> Quiz {
    Quiz {
        questions: vec![QuizQuestion {
            question,
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: options[0].to_string(),
        }],
    }
}

fn placeholder_quiz(lesson: &LessonContext) -> Quiz {
    single_question_quiz(
        format!("What is the main topic of '{}'?", lesson.title),
        ["Option A", "Option B", "Option C", "Option D"],
    )
}

fn fallback_quiz(lesson: &LessonContext) -> Quiz {
    single_question_quiz(
        format!("What can you learn from '{}'?", lesson.title),
        ["Concept 1", "Concept 2", "Concept 3", "Concept 4"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson() -> LessonContext {
        LessonContext {
            title: "Closures".to_string(),
            description: "Capturing the environment".to_string(),
            transcript: "Capturing the environment".to_string(),
            tags: "rust,functions".to_string(),
            difficulty: "intermediate".to_string(),
        }
    }

    fn unreachable_provider() -> AiService {
        AiService::new(
            Some(AiSettings {
                api_key: "test-key".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                // Discard port; nothing listens there
                api_url: "http://127.0.0.1:9".to_string(),
            }),
            None,
        )
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_truncate_transcript_counts_characters() {
        let long = "é".repeat(MAX_TRANSCRIPT_CHARS + 10);
        assert_eq!(truncate_transcript(&long).chars().count(), MAX_TRANSCRIPT_CHARS);
        assert_eq!(truncate_transcript("short"), "short");
    }

    #[test]
    fn test_parse_fenced_summary() {
        let content = "```json\n{\"summary\": \"Closures capture variables\", \"key_points\": [\"move\"]}\n```";
        let summary: Summary = parse_reply(content).unwrap();
        assert_eq!(summary.summary, "Closures capture variables");
        assert_eq!(summary.key_points, vec!["move".to_string()]);
    }

    #[test]
    fn test_parse_malformed_reply_is_external_error() {
        let err = parse_reply::<Quiz>("Sure! Here is your quiz").unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
    }

    #[test]
    fn test_disabled_summary_placeholder() {
        let ai = AiService::disabled();
        assert!(!ai.is_enabled());

        let summary = tokio_test::block_on(ai.generate_summary(AiSubject::Reel(1), &lesson()));
        assert_eq!(
            summary.summary,
            "This content covers Closures. Capturing the environment"
        );
        assert_eq!(summary.key_points[2], "Difficulty: intermediate");
    }

    #[test]
    fn test_disabled_quiz_placeholder_is_valid() {
        let ai = AiService::disabled();
        let quiz = tokio_test::block_on(ai.generate_quiz(AiSubject::Reel(1), &lesson(), 3));

        assert_eq!(quiz.questions.len(), 1);
        assert_eq!(
            quiz.questions[0].question,
            "What is the main topic of 'Closures'?"
        );
        assert!(quiz.validate().is_ok());
    }

    #[test]
    fn test_placeholder_without_description() {
        let mut lesson = lesson();
        lesson.description.clear();
        assert_eq!(
            placeholder_summary(&lesson).summary,
            "This content covers Closures. Educational video content."
        );
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let ai = unreachable_provider();
        assert!(ai.is_enabled());

        let summary = ai.generate_summary(AiSubject::Course(2), &lesson()).await;
        assert_eq!(summary.summary, "Learn about Closures in this educational video.");

        let quiz = ai
            .generate_quiz(AiSubject::Course(2), &lesson(), COURSE_QUIZ_QUESTIONS)
            .await;
        assert_eq!(quiz.questions[0].correct_answer, "Concept 1");
        assert!(quiz.validate().is_ok());
    }
}
