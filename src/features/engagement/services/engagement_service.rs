use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::engagement::dtos::{to_smallint, RateStoryDto, RewardStoryDto};
use crate::features::engagement::models::{
    ReadScope, Recorded, Story, StoryBookmark, StoryRating, StoryRead, StoryReward,
    StorySettings,
};
use crate::features::engagement::repository::{EngagementRepository, FactFilter};

/// Engagement ledger: bookmarks, ratings, reads and rewards per user and story
pub struct EngagementService {
    repo: Arc<dyn EngagementRepository>,
}

impl EngagementService {
    pub fn new(repo: Arc<dyn EngagementRepository>) -> Self {
        Self { repo }
    }

    pub async fn story(&self, story_id: i64) -> Result<Story> {
        self.repo
            .find_story(story_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Story {} not found", story_id)))
    }

    pub async fn story_settings(&self, story_id: i64) -> Result<StorySettings> {
        self.story(story_id).await?;
        self.repo.get_or_create_settings(story_id).await
    }

    pub async fn record_bookmark(
        &self,
        user_id: i64,
        story_id: i64,
    ) -> Result<Recorded<StoryBookmark>> {
        self.story(story_id).await?;
        self.repo.insert_bookmark(story_id, user_id).await
    }

    /// Number of removed bookmarks, 0 when there was none
    pub async fn remove_bookmark(&self, user_id: i64, story_id: i64) -> Result<u64> {
        self.repo.delete_bookmark(story_id, user_id).await
    }

    /// Create or update the user's score and refresh the story's cached
    /// average in the same write
    pub async fn rate(&self, user_id: i64, dto: RateStoryDto) -> Result<Recorded<StoryRating>> {
        dto.validate()?;
        let score = to_smallint("score", dto.score)?;
        self.story(dto.story).await?;

        let rated = self
            .repo
            .rate_story(dto.story, user_id, score, average_rating)
            .await?;
        tracing::debug!(
            story_id = dto.story,
            average = %rated.settings.rating,
            "Story average rating updated"
        );

        Ok(rated.rating)
    }

    /// Record the first read of a story. A repeated read leaves the stored
    /// timestamp untouched and reports `created = false`.
    pub async fn mark_read(&self, user_id: i64, story: &Story) -> Result<Recorded<StoryRead>> {
        self.repo.insert_read(story.id, user_id).await
    }

    pub async fn grant_reward(
        &self,
        user_id: i64,
        dto: RewardStoryDto,
    ) -> Result<Recorded<StoryReward>> {
        dto.validate()?;
        self.story(dto.story).await?;

        let points = match dto.points {
            Some(points) => to_smallint("points", points)?,
            None => self.repo.get_or_create_settings(dto.story).await?.reward_points,
        };

        self.repo.upsert_reward(dto.story, user_id, points).await
    }

    pub async fn count_reads(&self, user_id: i64, scope: &ReadScope) -> Result<i64> {
        match scope {
            ReadScope::Categories(ids) if ids.is_empty() => Ok(0),
            _ => self.repo.count_reads(user_id, scope).await,
        }
    }

    pub async fn list_bookmarks(
        &self,
        user_id: i64,
        story_id: Option<i64>,
    ) -> Result<Vec<StoryBookmark>> {
        self.repo
            .list_bookmarks(FactFilter::new(user_id, story_id))
            .await
    }

    pub async fn list_ratings(&self, user_id: i64, story_id: Option<i64>) -> Result<Vec<StoryRating>> {
        self.repo.list_ratings(FactFilter::new(user_id, story_id)).await
    }

    pub async fn list_reads(&self, user_id: i64, story_id: Option<i64>) -> Result<Vec<StoryRead>> {
        self.repo.list_reads(FactFilter::new(user_id, story_id)).await
    }

    pub async fn list_rewards(&self, user_id: i64, story_id: Option<i64>) -> Result<Vec<StoryReward>> {
        self.repo.list_rewards(FactFilter::new(user_id, story_id)).await
    }
}

/// Mean score rounded to a whole number, half to even: [4, 5] gives 4, [1, 2] gives 2.
/// Returned with two decimal places to match the stored column.
fn average_rating(scores: &[i16]) -> Decimal {
    let mut average = if scores.is_empty() {
        Decimal::ZERO
    } else {
        let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
        (Decimal::from(sum) / Decimal::from(scores.len()))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
    };
    average.rescale(2);
    average
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::InMemoryStore;

    fn ledger(store: &InMemoryStore) -> EngagementService {
        EngagementService::new(Arc::new(store.clone()))
    }

    fn rate_dto(story: i64, score: i64) -> RateStoryDto {
        RateStoryDto { story, score }
    }

    #[test]
    fn test_average_rating_rounds_half_to_even() {
        assert_eq!(average_rating(&[4, 5]).to_string(), "4.00");
        assert_eq!(average_rating(&[1, 2]).to_string(), "2.00");
        assert_eq!(average_rating(&[2, 3]).to_string(), "2.00");
        assert_eq!(average_rating(&[3, 4]).to_string(), "4.00");
    }

    #[test]
    fn test_average_rating_rounds_to_nearest() {
        assert_eq!(average_rating(&[5, 5, 4]).to_string(), "5.00");
        assert_eq!(average_rating(&[1, 1, 2]).to_string(), "1.00");
        assert_eq!(average_rating(&[]).to_string(), "0.00");
    }

    #[tokio::test]
    async fn test_rate_upserts_and_recomputes_average() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let ledger = ledger(&store);

        let first = ledger.rate(10, rate_dto(story.id, 4)).await.unwrap();
        assert!(first.created);
        ledger.rate(11, rate_dto(story.id, 5)).await.unwrap();

        let settings = ledger.story_settings(story.id).await.unwrap();
        assert_eq!(settings.rating.to_string(), "4.00");

        let updated = ledger.rate(10, rate_dto(story.id, 1)).await.unwrap();
        assert!(!updated.created);
        assert_eq!(updated.value.id, first.value.id);
        assert_eq!(updated.value.detail.score, 1);

        // [1, 5] averages to 3
        let settings = ledger.story_settings(story.id).await.unwrap();
        assert_eq!(settings.rating.to_string(), "3.00");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ratings_leave_average_of_stored_scores() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let ledger = Arc::new(ledger(&store));
        ledger.rate(1, rate_dto(story.id, 1)).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for user_id in 1..=8 {
            let ledger = Arc::clone(&ledger);
            let story_id = story.id;
            tasks.spawn(async move { ledger.rate(user_id, rate_dto(story_id, 5)).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        for user_id in 1..=8 {
            let ratings = ledger.list_ratings(user_id, Some(story.id)).await.unwrap();
            assert_eq!(ratings.len(), 1);
            assert_eq!(ratings[0].detail.score, 5);
        }
        let settings = ledger.story_settings(story.id).await.unwrap();
        assert_eq!(settings.rating.to_string(), "5.00");
    }

    #[tokio::test]
    async fn test_rate_rejects_out_of_range_score_without_writing() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let ledger = ledger(&store);

        let err = ledger.rate(10, rate_dto(story.id, 6)).await.unwrap_err();
        match err {
            AppError::InvalidFields(errors) => {
                assert_eq!(errors, vec!["score: Score must be between 1 and 5".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(matches!(
            ledger.rate(10, rate_dto(story.id, 0)).await,
            Err(AppError::InvalidFields(_))
        ));
        assert!(matches!(
            ledger.rate(10, rate_dto(story.id, 40_000)).await,
            Err(AppError::InvalidFields(_))
        ));
        assert!(ledger.list_ratings(10, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_unknown_story_is_not_found() {
        let store = InMemoryStore::new();
        let result = ledger(&store).rate(10, rate_dto(404, 3)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent_and_keeps_first_timestamp() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let ledger = ledger(&store);

        let first = ledger.mark_read(321, &story).await.unwrap();
        let second = ledger.mark_read(321, &story).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.value, second.value);
        assert_eq!(ledger.list_reads(321, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bookmark_create_if_absent_and_remove() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        let ledger = ledger(&store);

        assert!(ledger.record_bookmark(321, story.id).await.unwrap().created);
        assert!(!ledger.record_bookmark(321, story.id).await.unwrap().created);

        assert_eq!(ledger.remove_bookmark(321, story.id).await.unwrap(), 1);
        assert_eq!(ledger.remove_bookmark(321, story.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_grant_reward_defaults_to_story_points() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);
        store.set_reward_points(story.id, 15);
        let ledger = ledger(&store);

        let reward = ledger
            .grant_reward(321, RewardStoryDto { story: story.id, points: None })
            .await
            .unwrap();
        assert_eq!(reward.value.detail.points, 15);

        let updated = ledger
            .grant_reward(321, RewardStoryDto { story: story.id, points: Some(40) })
            .await
            .unwrap();
        assert!(!updated.created);
        assert_eq!(updated.value.detail.points, 40);
    }

    #[tokio::test]
    async fn test_grant_reward_validates_points() {
        let store = InMemoryStore::new();
        let story = store.add_story(1, None);

        let result = ledger(&store)
            .grant_reward(321, RewardStoryDto { story: story.id, points: Some(101) })
            .await;
        assert!(matches!(result, Err(AppError::InvalidFields(_))));

        let result = ledger(&store)
            .grant_reward(321, RewardStoryDto { story: story.id, points: Some(40_000) })
            .await;
        match result {
            Err(AppError::InvalidFields(errors)) => {
                assert_eq!(errors, vec!["points: Points must be between 0 and 100".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_count_reads_by_scope() {
        let store = InMemoryStore::new();
        let health = store.add_category(1, "Health");
        let sports = store.add_category(1, "Sports");
        let s1 = store.add_story(1, Some(health.id));
        let s2 = store.add_story(1, Some(sports.id));
        let s3 = store.add_story(2, None);
        let ledger = ledger(&store);

        for story in [&s1, &s2, &s3] {
            ledger.mark_read(7, story).await.unwrap();
        }
        ledger.mark_read(8, &s1).await.unwrap();

        assert_eq!(ledger.count_reads(7, &ReadScope::Organization(1)).await.unwrap(), 2);
        assert_eq!(
            ledger.count_reads(7, &ReadScope::Categories(vec![health.id])).await.unwrap(),
            1
        );
        assert_eq!(
            ledger
                .count_reads(7, &ReadScope::Categories(vec![health.id, sports.id]))
                .await
                .unwrap(),
            2
        );
        assert_eq!(ledger.count_reads(7, &ReadScope::Categories(vec![])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters_by_story() {
        let store = InMemoryStore::new();
        let s1 = store.add_story(1, None);
        let s2 = store.add_story(1, None);
        let ledger = ledger(&store);

        ledger.record_bookmark(5, s1.id).await.unwrap();
        ledger.record_bookmark(5, s2.id).await.unwrap();

        assert_eq!(ledger.list_bookmarks(5, None).await.unwrap().len(), 2);
        let filtered = ledger.list_bookmarks(5, Some(s2.id)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].story_id, s2.id);
    }
}
