mod ai;
mod comment;
mod course;
mod playlist;
mod progress;
pub(crate) mod reel;
mod user;

pub use ai::{LessonContext, Quiz, QuizQuestion, Summary};
pub use comment::{Comment, CommentResponse, NewComment};
pub use course::{Course, CourseProgress, CourseResponse, NewCourse};
pub use playlist::{NewPlaylist, Playlist, PlaylistResponse};
pub use progress::{Progress, ProgressUpdate, WatchRecord};
pub use reel::{
    parse_tags, AiMetadata, ContentItem, Difficulty, NewReel, Reel, ReelFilter, ReelResponse,
};
pub use user::{NewUser, Role, User, UserResponse};

/// Offset/limit window over an ordered result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Applies the window to an already ordered sequence
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}
