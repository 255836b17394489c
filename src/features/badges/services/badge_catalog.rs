use std::sync::Arc;

use crate::core::error::Result;
use crate::features::badges::models::{BadgeScope, BadgeType};
use crate::features::badges::repository::{BadgeRepository, BadgeTypeFilter, EligibilityQuery};

/// Read side of the badge types: what users can see and earn
pub struct BadgeCatalog {
    repo: Arc<dyn BadgeRepository>,
}

impl BadgeCatalog {
    pub fn new(repo: Arc<dyn BadgeRepository>) -> Self {
        Self { repo }
    }

    /// Active badge types of `scope` whose threshold `read_count` reaches,
    /// minus the ones in `excluded_ids`. Ordered by threshold, then id.
    pub async fn eligible_unowned(
        &self,
        org_id: i64,
        scope: BadgeScope,
        read_count: i64,
        excluded_ids: &[i64],
    ) -> Result<Vec<BadgeType>> {
        let query = EligibilityQuery {
            org_id,
            scope,
            read_count,
            excluded_ids: excluded_ids.to_vec(),
        };
        self.repo.find_eligible(&query).await
    }

    pub async fn active_types(&self, org_id: Option<i64>) -> Result<Vec<BadgeType>> {
        self.repo
            .list_badge_types(BadgeTypeFilter {
                org_id,
                active_only: true,
            })
            .await
    }
}
