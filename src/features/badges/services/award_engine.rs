use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::error::Result;
use crate::features::badges::models::{AwardedBadge, BadgeScope, BadgeType};
use crate::features::badges::repository::BadgeRepository;
use crate::features::badges::services::BadgeCatalog;
use crate::features::categories::models::Category;
use crate::features::categories::CategoryService;
use crate::features::engagement::models::ReadScope;
use crate::features::engagement::EngagementService;

/// Grants the badges a user qualifies for after reading a story.
///
/// Every evaluation looks at the full current read counts, so badges whose
/// threshold was reached earlier (or lowered since) are caught up on the next
/// read. Evaluating twice without new reads grants nothing the second time.
pub struct BadgeAwardEngine {
    categories: Arc<CategoryService>,
    ledger: Arc<EngagementService>,
    catalog: Arc<BadgeCatalog>,
    repo: Arc<dyn BadgeRepository>,
}

/// Read counts of the three badge scopes touched by one story
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ScopeCounts {
    organization: i64,
    category: i64,
    inherited: i64,
}

impl BadgeAwardEngine {
    pub fn new(
        categories: Arc<CategoryService>,
        ledger: Arc<EngagementService>,
        catalog: Arc<BadgeCatalog>,
        repo: Arc<dyn BadgeRepository>,
    ) -> Self {
        Self {
            categories,
            ledger,
            catalog,
            repo,
        }
    }

    /// Evaluate organization-wide badges, badges of the story's category and
    /// badges of its parent category, then grant every newly reached one.
    ///
    /// Returns the new grants: organization-wide first, then exact category,
    /// then parent category, each group ordered by threshold.
    pub async fn award_after_read(
        &self,
        user_id: i64,
        org_id: i64,
        category: Option<&Category>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AwardedBadge>> {
        let parent = match category {
            Some(category) => self.categories.get_parent(category).await?,
            None => None,
        };

        let counts = self
            .scope_counts(user_id, org_id, category, parent.as_ref())
            .await?;
        let owned = self.repo.owned_badge_type_ids(user_id).await?;

        let mut batch = self
            .catalog
            .eligible_unowned(org_id, BadgeScope::OrganizationWide, counts.organization, &owned)
            .await?;

        if let Some(category) = category {
            let exact = self
                .catalog
                .eligible_unowned(org_id, BadgeScope::Category(category.id), counts.category, &owned)
                .await?;
            batch.extend(exact);
        }

        if let Some(parent) = &parent {
            let inherited = self
                .catalog
                .eligible_unowned(org_id, BadgeScope::Category(parent.id), counts.inherited, &owned)
                .await?;
            batch.extend(inherited);
        }

        self.grant(user_id, batch, now).await
    }

    async fn scope_counts(
        &self,
        user_id: i64,
        org_id: i64,
        category: Option<&Category>,
        parent: Option<&Category>,
    ) -> Result<ScopeCounts> {
        let organization = self
            .ledger
            .count_reads(user_id, &ReadScope::Organization(org_id))
            .await?;

        let category = match category {
            Some(category) => {
                self.ledger
                    .count_reads(user_id, &ReadScope::Categories(vec![category.id]))
                    .await?
            }
            None => 0,
        };

        let inherited = match parent {
            Some(parent) => {
                let family = self.categories.family_ids(parent).await?;
                self.ledger
                    .count_reads(user_id, &ReadScope::Categories(family.into_iter().collect()))
                    .await?
            }
            None => 0,
        };

        Ok(ScopeCounts {
            organization,
            category,
            inherited,
        })
    }

    async fn grant(
        &self,
        user_id: i64,
        batch: Vec<BadgeType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AwardedBadge>> {
        let mut seen = HashSet::new();
        let batch: Vec<BadgeType> = batch.into_iter().filter(|bt| seen.insert(bt.id)).collect();
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = batch.iter().map(|bt| bt.id).collect();
        let granted = self.repo.insert_user_badges(user_id, &ids, now).await?;

        let mut badge_types: HashMap<i64, BadgeType> =
            batch.into_iter().map(|bt| (bt.id, bt)).collect();

        let awarded: Vec<AwardedBadge> = granted
            .into_iter()
            .filter_map(|badge| {
                let badge_type = badge_types.remove(&badge.badge_type_id)?;
                Some(AwardedBadge { badge, badge_type })
            })
            .collect();

        for award in &awarded {
            tracing::info!(
                user_id,
                badge_type_id = award.badge_type.id,
                title = %award.badge_type.title,
                "Badge granted"
            );
        }

        Ok(awarded)
    }
}
