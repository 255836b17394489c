use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::core::error::Result;
use crate::features::badges::dtos::{
    BadgeProgressDto, BadgeTypeDto, ResetCountsDto, UserBadgeResponseDto,
};
use crate::features::badges::models::{
    AwardedBadge, BadgeProgressContext, BadgeScope, BadgeType,
};
use crate::features::badges::repository::BadgeRepository;
use crate::features::badges::services::{BadgeAwardEngine, BadgeCatalog};
use crate::features::categories::CategoryService;
use crate::features::engagement::dtos::ReadResponseDto;
use crate::features::engagement::models::ReadScope;
use crate::features::engagement::EngagementService;

/// Outcome of marking a story as read
#[derive(Debug, Clone)]
pub struct MarkReadOutcome {
    /// False when the user had already read the story
    pub created: bool,
    pub badges: Vec<AwardedBadge>,
}

/// User-facing badge operations: reads, progress, owned badges and reset
pub struct UserBadgeService {
    ledger: Arc<EngagementService>,
    categories: Arc<CategoryService>,
    catalog: Arc<BadgeCatalog>,
    engine: Arc<BadgeAwardEngine>,
    repo: Arc<dyn BadgeRepository>,
}

impl UserBadgeService {
    pub fn new(
        ledger: Arc<EngagementService>,
        categories: Arc<CategoryService>,
        catalog: Arc<BadgeCatalog>,
        engine: Arc<BadgeAwardEngine>,
        repo: Arc<dyn BadgeRepository>,
    ) -> Self {
        Self {
            ledger,
            categories,
            catalog,
            engine,
            repo,
        }
    }

    /// Record the read and grant whatever badges the user now qualifies for
    pub async fn mark_story_read(&self, user_id: i64, story_id: i64) -> Result<MarkReadOutcome> {
        let story = self.ledger.story(story_id).await?;
        let read = self.ledger.mark_read(user_id, &story).await?;

        let category = match story.category_id {
            Some(category_id) => self.categories.find(category_id).await?,
            None => None,
        };

        let badges = self
            .engine
            .award_after_read(user_id, story.org_id, category.as_ref(), Utc::now())
            .await?;

        Ok(MarkReadOutcome {
            created: read.created,
            badges,
        })
    }

    /// Every active badge type with the user's live progress, in catalog order
    pub async fn get_badge_progress(
        &self,
        user_id: i64,
        org_id: Option<i64>,
    ) -> Result<Vec<BadgeProgressDto>> {
        let context = BadgeProgressContext {
            user_id,
            org_id,
            owned_ids: self
                .repo
                .owned_badge_type_ids(user_id)
                .await?
                .into_iter()
                .collect(),
        };
        let badge_types = self.catalog.active_types(context.org_id).await?;

        let mut counts: HashMap<(i64, BadgeScope), i64> = HashMap::new();
        let mut progress = Vec::with_capacity(badge_types.len());

        for badge_type in &badge_types {
            let key = (badge_type.org_id, badge_type.scope());
            let read_count = match counts.get(&key) {
                Some(count) => *count,
                None => {
                    let count = self.read_count_for(context.user_id, badge_type).await?;
                    counts.insert(key, count);
                    count
                }
            };

            progress.push(BadgeProgressDto {
                badge: BadgeTypeDto::from(badge_type),
                owned: context.owns(badge_type.id),
                read_count,
                description: context.describe(badge_type, read_count),
            });
        }

        Ok(progress)
    }

    /// Reads counting toward a badge type: the whole organization, or the
    /// validation category together with its direct subcategories
    async fn read_count_for(&self, user_id: i64, badge_type: &BadgeType) -> Result<i64> {
        let scope = match badge_type.scope() {
            BadgeScope::OrganizationWide => ReadScope::Organization(badge_type.org_id),
            BadgeScope::Category(category_id) => {
                match self.categories.find(category_id).await? {
                    Some(category) => ReadScope::Categories(
                        self.categories
                            .family_ids(&category)
                            .await?
                            .into_iter()
                            .collect(),
                    ),
                    None => ReadScope::Categories(vec![category_id]),
                }
            }
        };

        self.ledger.count_reads(user_id, &scope).await
    }

    /// Delete the user's reads, rewards and badges together
    pub async fn reset_user_engagement(&self, user_id: i64) -> Result<ResetCountsDto> {
        let counts = self.repo.reset_user_engagement(user_id).await?;

        tracing::info!(
            user_id,
            read_count = counts.reads,
            reward_count = counts.rewards,
            badge_count = counts.badges,
            "User engagement reset"
        );

        Ok(counts.into())
    }

    pub async fn list_user_badges(
        &self,
        user_id: i64,
        org_id: Option<i64>,
    ) -> Result<Vec<UserBadgeResponseDto>> {
        let badges = self.repo.list_user_badges(user_id, org_id).await?;
        Ok(badges.into_iter().map(Into::into).collect())
    }

    pub async fn list_user_reads(
        &self,
        user_id: i64,
        story_id: Option<i64>,
    ) -> Result<Vec<ReadResponseDto>> {
        let reads = self.ledger.list_reads(user_id, story_id).await?;
        Ok(reads.into_iter().map(Into::into).collect())
    }
}
