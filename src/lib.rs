//! EduBit: backend for short educational videos ("reels") grouped into
//! micro-courses, with a personalized feed, playlists, comments, progress
//! tracking and generated summaries and quizzes.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
