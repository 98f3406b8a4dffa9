use std::collections::HashMap;

use crate::{
    db::{ContentRepository, HistoryReader},
    error::{AppError, AppResult},
    models::{ContentItem, Page, Reel, ReelFilter},
    services::ranking,
};

pub const MAX_PAGE_SIZE: usize = 100;

/// Validates a client-supplied window; `limit` must lie in 1..=100
pub fn validate_page(limit: i64, offset: i64) -> AppResult<Page> {
    if !(1..=MAX_PAGE_SIZE as i64).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    if offset < 0 {
        return Err(AppError::InvalidInput(
            "offset must not be negative".to_string(),
        ));
    }

    Ok(Page::new(offset as usize, limit as usize))
}

/// Ranked page of reels for a user.
///
/// Reads the user's history, resolves the watched reels, ranks every
/// candidate passing `filter` and cuts the requested window out of the
/// ranked sequence.
pub async fn personalized_feed<H, C>(
    history: &H,
    content: &C,
    user_id: i64,
    filter: &ReelFilter,
    page: Page,
) -> AppResult<Vec<Reel>>
where
    H: HistoryReader + ?Sized,
    C: ContentRepository + ?Sized,
{
    let records = history.watch_history(user_id).await?;

    let watched_ids = ranking::watched_content_ids(&records);
    let watched: HashMap<i64, ContentItem> = content
        .get_reels(&watched_ids)
        .await?
        .iter()
        .map(|reel| (reel.id, reel.content_item()))
        .collect();

    let candidates = content.feed_candidates(filter).await?;
    let items: Vec<ContentItem> = candidates.iter().map(Reel::content_item).collect();
    let mut reels: HashMap<i64, Reel> = candidates.into_iter().map(|r| (r.id, r)).collect();

    let ranked = ranking::rank(&records, &watched, items);
    tracing::debug!(
        user_id,
        history = records.len(),
        candidates = ranked.len(),
        "Ranked feed"
    );

    Ok(page
        .apply(ranked)
        .into_iter()
        .filter_map(|scored| reels.remove(&scored.item.id))
        .collect())
}
