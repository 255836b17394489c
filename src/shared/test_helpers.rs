//! Shared fixtures for unit and handler tests.
//!
//! [`InMemoryStore`] implements every repository trait over plain vectors and
//! enforces the same uniqueness and foreign key rules as the database schema.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use rust_decimal::Decimal;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::badges::models::{AwardedBadge, BadgeType, UserBadge};
use crate::features::badges::repository::{
    BadgeRepository, BadgeTypeFilter, EligibilityQuery, NewBadgeType, ResetCounts,
};
use crate::features::badges::{BadgeAwardEngine, BadgeCatalog, BadgeTypeService, UserBadgeService};
use crate::features::categories::models::Category;
use crate::features::categories::{CategoryRepository, CategoryService};
use crate::features::engagement::models::{
    Bookmark, Rating, Read, ReadScope, Recorded, Reward, Story, StoryBookmark, StoryFact,
    StoryRating, StoryRead, StoryReward, StorySettings,
};
use crate::features::engagement::repository::{FactFilter, RatedStory};
use crate::features::engagement::{EngagementRepository, EngagementService};
use crate::shared::constants::ROLE_STAFF;

// ==================== Users ====================

pub fn reader(user_id: i64) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id,
        sub: format!("reader-{}", user_id),
        roles: Vec::new(),
    }
}

pub fn staff() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: 1,
        sub: "staff-1".to_string(),
        roles: vec![ROLE_STAFF.to_string()],
    }
}

async fn inject_user_middleware(
    State(user): State<AuthenticatedUser>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Serve every request of `router` as `user`, bypassing token validation
pub fn with_user_auth(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn_with_state(
        user,
        inject_user_middleware,
    ))
}

// ==================== Store ====================

#[derive(Default)]
struct StoreState {
    next_id: i64,
    categories: Vec<Category>,
    stories: Vec<Story>,
    settings: Vec<StorySettings>,
    bookmarks: Vec<StoryBookmark>,
    ratings: Vec<StoryRating>,
    reads: Vec<StoryRead>,
    rewards: Vec<StoryReward>,
    badge_types: Vec<BadgeType>,
    user_badges: Vec<UserBadge>,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn story_exists(&self, story_id: i64) -> Result<()> {
        if self.stories.iter().any(|s| s.id == story_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Story {} not found", story_id)))
        }
    }

    fn settings_for(&mut self, story_id: i64) -> Result<&mut StorySettings> {
        self.story_exists(story_id)?;

        let existing = self.settings.iter().position(|s| s.story_id == story_id);
        let index = match existing {
            Some(index) => index,
            None => {
                let id = self.next_id();
                self.settings.push(StorySettings {
                    id,
                    story_id,
                    reward_points: 0,
                    display_rating: true,
                    rating: Decimal::new(0, 2),
                });
                self.settings.len() - 1
            }
        };

        Ok(&mut self.settings[index])
    }

    fn story_matches(&self, story_id: i64, scope: &ReadScope) -> bool {
        let Some(story) = self.stories.iter().find(|s| s.id == story_id) else {
            return false;
        };

        match scope {
            ReadScope::Organization(org_id) => story.org_id == *org_id,
            ReadScope::Categories(ids) => story.category_id.is_some_and(|id| ids.contains(&id)),
        }
    }

    fn title_taken(&self, org_id: i64, title: &str, except_id: Option<i64>) -> bool {
        self.badge_types
            .iter()
            .any(|bt| bt.org_id == org_id && bt.title == title && Some(bt.id) != except_id)
    }
}

fn insert_if_absent<K: Clone>(
    facts: &mut Vec<StoryFact<K>>,
    id: i64,
    story_id: i64,
    user_id: i64,
    detail: K,
) -> Recorded<StoryFact<K>> {
    if let Some(existing) = facts
        .iter()
        .find(|f| f.story_id == story_id && f.user_id == user_id)
    {
        return Recorded {
            value: existing.clone(),
            created: false,
        };
    }

    let fact = StoryFact {
        id,
        story_id,
        user_id,
        created_at: Utc::now(),
        detail,
    };
    facts.push(fact.clone());

    Recorded {
        value: fact,
        created: true,
    }
}

fn upsert<K: Clone>(
    facts: &mut Vec<StoryFact<K>>,
    id: i64,
    story_id: i64,
    user_id: i64,
    detail: K,
) -> Recorded<StoryFact<K>> {
    if let Some(existing) = facts
        .iter_mut()
        .find(|f| f.story_id == story_id && f.user_id == user_id)
    {
        existing.detail = detail;
        return Recorded {
            value: existing.clone(),
            created: false,
        };
    }

    insert_if_absent(facts, id, story_id, user_id, detail)
}

fn fact_matches<K>(fact: &StoryFact<K>, filter: FactFilter) -> bool {
    fact.user_id == filter.user_id && filter.story_id.is_none_or(|id| id == fact.story_id)
}

/// Newest first, like the SQL listings
fn list<K: Clone>(facts: &[StoryFact<K>], filter: FactFilter) -> Vec<StoryFact<K>> {
    let mut found: Vec<StoryFact<K>> = facts
        .iter()
        .filter(|f| fact_matches(f, filter))
        .cloned()
        .collect();
    found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    found
}

fn delete_for_user<K>(facts: &mut Vec<StoryFact<K>>, user_id: i64) -> u64 {
    let before = facts.len();
    facts.retain(|f| f.user_id != user_id);
    (before - facts.len()) as u64
}

/// Mirrors the eligibility SQL, NULL category matching NULL
fn is_eligible(badge_type: &BadgeType, query: &EligibilityQuery) -> bool {
    badge_type.is_active
        && badge_type.org_id == query.org_id
        && badge_type.scope() == query.scope
        && i64::from(badge_type.validation_threshold) <= query.read_count
        && !query.excluded_ids.contains(&badge_type.id)
}

fn sort_badge_types(badge_types: &mut [BadgeType]) {
    badge_types.sort_by_key(|bt| (bt.validation_threshold, bt.id));
}

/// Repository double shared by every feature's tests
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&self, org_id: i64, name: &str) -> Category {
        let mut state = self.state.write().unwrap();
        let category = Category {
            id: state.next_id(),
            org_id,
            name: name.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        state.categories.push(category.clone());
        category
    }

    pub fn add_story(&self, org_id: i64, category_id: Option<i64>) -> Story {
        let mut state = self.state.write().unwrap();
        let story = Story {
            id: state.next_id(),
            org_id,
            category_id,
            title: Sentence(2..5).fake(),
            is_active: true,
            created_at: Utc::now(),
        };
        state.stories.push(story.clone());
        story
    }

    pub fn set_reward_points(&self, story_id: i64, points: i16) {
        let mut state = self.state.write().unwrap();
        state.settings_for(story_id).unwrap().reward_points = points;
    }

    pub fn add_badge(&self, seed: BadgeSeed) -> BadgeType {
        let mut state = self.state.write().unwrap();
        let now = Utc::now();
        let badge_type = BadgeType {
            id: state.next_id(),
            org_id: seed.org_id,
            title: seed.title,
            image: None,
            is_active: seed.is_active,
            validation_category_id: seed.category_id,
            validation_threshold: seed.threshold,
            unfinished_template: seed.unfinished_template,
            finished_description: seed.finished_description,
            created_at: now,
            updated_at: now,
        };
        state.badge_types.push(badge_type.clone());
        badge_type
    }

    pub fn set_badge_active(&self, badge_type_id: i64, is_active: bool) {
        let mut state = self.state.write().unwrap();
        if let Some(bt) = state.badge_types.iter_mut().find(|bt| bt.id == badge_type_id) {
            bt.is_active = is_active;
        }
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
        let state = self.state.read().unwrap();
        Ok(state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_name(&self, org_id: i64, name: &str) -> Result<Option<Category>> {
        let state = self.state.read().unwrap();
        Ok(state
            .categories
            .iter()
            .find(|c| c.org_id == org_id && c.name == name)
            .cloned())
    }

    async fn find_ids_by_name_prefix(&self, org_id: i64, prefix: &str) -> Result<Vec<i64>> {
        let state = self.state.read().unwrap();
        Ok(state
            .categories
            .iter()
            .filter(|c| c.org_id == org_id && c.name.starts_with(prefix))
            .map(|c| c.id)
            .collect())
    }

    async fn list_by_org(&self, org_id: i64) -> Result<Vec<Category>> {
        let state = self.state.read().unwrap();
        let mut categories: Vec<Category> = state
            .categories
            .iter()
            .filter(|c| c.org_id == org_id && c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[async_trait]
impl EngagementRepository for InMemoryStore {
    async fn find_story(&self, story_id: i64) -> Result<Option<Story>> {
        let state = self.state.read().unwrap();
        Ok(state.stories.iter().find(|s| s.id == story_id).cloned())
    }

    async fn get_or_create_settings(&self, story_id: i64) -> Result<StorySettings> {
        let mut state = self.state.write().unwrap();
        state.settings_for(story_id).cloned()
    }

    async fn insert_bookmark(
        &self,
        story_id: i64,
        user_id: i64,
    ) -> Result<Recorded<StoryBookmark>> {
        let mut state = self.state.write().unwrap();
        state.story_exists(story_id)?;
        let id = state.next_id();
        Ok(insert_if_absent(&mut state.bookmarks, id, story_id, user_id, Bookmark))
    }

    async fn delete_bookmark(&self, story_id: i64, user_id: i64) -> Result<u64> {
        let mut state = self.state.write().unwrap();
        let before = state.bookmarks.len();
        state
            .bookmarks
            .retain(|b| !(b.story_id == story_id && b.user_id == user_id));
        Ok((before - state.bookmarks.len()) as u64)
    }

    async fn list_bookmarks(&self, filter: FactFilter) -> Result<Vec<StoryBookmark>> {
        let state = self.state.read().unwrap();
        Ok(list(&state.bookmarks, filter))
    }

    /// The whole write happens under one lock, like the row lock in SQL
    async fn rate_story(
        &self,
        story_id: i64,
        user_id: i64,
        score: i16,
        average: for<'a> fn(&'a [i16]) -> Decimal,
    ) -> Result<RatedStory> {
        let mut state = self.state.write().unwrap();
        state.settings_for(story_id)?;
        let id = state.next_id();
        let rating = upsert(&mut state.ratings, id, story_id, user_id, Rating { score });

        let scores: Vec<i16> = state
            .ratings
            .iter()
            .filter(|r| r.story_id == story_id)
            .map(|r| r.detail.score)
            .collect();
        let settings = state.settings_for(story_id)?;
        settings.rating = average(&scores);

        Ok(RatedStory {
            rating,
            settings: settings.clone(),
        })
    }

    async fn list_ratings(&self, filter: FactFilter) -> Result<Vec<StoryRating>> {
        let state = self.state.read().unwrap();
        Ok(list(&state.ratings, filter))
    }

    async fn insert_read(&self, story_id: i64, user_id: i64) -> Result<Recorded<StoryRead>> {
        let mut state = self.state.write().unwrap();
        state.story_exists(story_id)?;
        let id = state.next_id();
        Ok(insert_if_absent(&mut state.reads, id, story_id, user_id, Read))
    }

    async fn list_reads(&self, filter: FactFilter) -> Result<Vec<StoryRead>> {
        let state = self.state.read().unwrap();
        Ok(list(&state.reads, filter))
    }

    async fn count_reads(&self, user_id: i64, scope: &ReadScope) -> Result<i64> {
        let state = self.state.read().unwrap();
        Ok(state
            .reads
            .iter()
            .filter(|r| r.user_id == user_id && state.story_matches(r.story_id, scope))
            .count() as i64)
    }

    async fn upsert_reward(
        &self,
        story_id: i64,
        user_id: i64,
        points: i16,
    ) -> Result<Recorded<StoryReward>> {
        let mut state = self.state.write().unwrap();
        state.story_exists(story_id)?;
        let id = state.next_id();
        Ok(upsert(&mut state.rewards, id, story_id, user_id, Reward { points }))
    }

    async fn list_rewards(&self, filter: FactFilter) -> Result<Vec<StoryReward>> {
        let state = self.state.read().unwrap();
        Ok(list(&state.rewards, filter))
    }
}

#[async_trait]
impl BadgeRepository for InMemoryStore {
    async fn find_badge_type(&self, id: i64) -> Result<Option<BadgeType>> {
        let state = self.state.read().unwrap();
        Ok(state.badge_types.iter().find(|bt| bt.id == id).cloned())
    }

    async fn list_badge_types(&self, filter: BadgeTypeFilter) -> Result<Vec<BadgeType>> {
        let state = self.state.read().unwrap();
        let mut badge_types: Vec<BadgeType> = state
            .badge_types
            .iter()
            .filter(|bt| filter.org_id.is_none_or(|org_id| bt.org_id == org_id))
            .filter(|bt| !filter.active_only || bt.is_active)
            .cloned()
            .collect();
        sort_badge_types(&mut badge_types);
        Ok(badge_types)
    }

    async fn find_eligible(&self, query: &EligibilityQuery) -> Result<Vec<BadgeType>> {
        let state = self.state.read().unwrap();
        let mut badge_types: Vec<BadgeType> = state
            .badge_types
            .iter()
            .filter(|bt| is_eligible(bt, query))
            .cloned()
            .collect();
        sort_badge_types(&mut badge_types);
        Ok(badge_types)
    }

    async fn create_badge_type(&self, new: NewBadgeType) -> Result<BadgeType> {
        let mut state = self.state.write().unwrap();
        if state.title_taken(new.org_id, &new.title, None) {
            return Err(AppError::Conflict(
                "A badge type with this title already exists in the organization".to_string(),
            ));
        }

        let now = Utc::now();
        let badge_type = BadgeType {
            id: state.next_id(),
            org_id: new.org_id,
            title: new.title,
            image: new.image,
            is_active: new.is_active,
            validation_category_id: new.validation_category_id,
            validation_threshold: new.validation_threshold,
            unfinished_template: new.unfinished_template,
            finished_description: new.finished_description,
            created_at: now,
            updated_at: now,
        };
        state.badge_types.push(badge_type.clone());
        Ok(badge_type)
    }

    async fn save_badge_type(&self, badge_type: &BadgeType) -> Result<BadgeType> {
        let mut state = self.state.write().unwrap();
        if state.title_taken(badge_type.org_id, &badge_type.title, Some(badge_type.id)) {
            return Err(AppError::Conflict(
                "A badge type with this title already exists in the organization".to_string(),
            ));
        }

        let stored = state
            .badge_types
            .iter_mut()
            .find(|bt| bt.id == badge_type.id)
            .ok_or_else(|| AppError::NotFound(format!("Badge type {} not found", badge_type.id)))?;
        *stored = BadgeType {
            updated_at: Utc::now(),
            ..badge_type.clone()
        };
        Ok(stored.clone())
    }

    async fn owned_badge_type_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let state = self.state.read().unwrap();
        Ok(state
            .user_badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.badge_type_id)
            .collect())
    }

    async fn insert_user_badges(
        &self,
        user_id: i64,
        badge_type_ids: &[i64],
        offered_at: DateTime<Utc>,
    ) -> Result<Vec<UserBadge>> {
        let mut state = self.state.write().unwrap();
        let mut granted = Vec::new();

        for &badge_type_id in badge_type_ids {
            let owned = state
                .user_badges
                .iter()
                .any(|b| b.user_id == user_id && b.badge_type_id == badge_type_id);
            if owned {
                continue;
            }

            let badge = UserBadge {
                id: state.next_id(),
                badge_type_id,
                user_id,
                offered_at,
            };
            state.user_badges.push(badge.clone());
            granted.push(badge);
        }

        Ok(granted)
    }

    async fn list_user_badges(
        &self,
        user_id: i64,
        org_id: Option<i64>,
    ) -> Result<Vec<AwardedBadge>> {
        let state = self.state.read().unwrap();
        let mut awarded: Vec<AwardedBadge> = state
            .user_badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter_map(|badge| {
                let badge_type = state
                    .badge_types
                    .iter()
                    .find(|bt| bt.id == badge.badge_type_id)?;
                let visible =
                    badge_type.is_active && org_id.is_none_or(|org_id| badge_type.org_id == org_id);
                visible.then(|| AwardedBadge {
                    badge: badge.clone(),
                    badge_type: badge_type.clone(),
                })
            })
            .collect();
        awarded.sort_by(|a, b| {
            (b.badge.offered_at, b.badge.id).cmp(&(a.badge.offered_at, a.badge.id))
        });
        Ok(awarded)
    }

    async fn reset_user_engagement(&self, user_id: i64) -> Result<ResetCounts> {
        let mut state = self.state.write().unwrap();
        let reads = delete_for_user(&mut state.reads, user_id);
        let rewards = delete_for_user(&mut state.rewards, user_id);
        let before = state.user_badges.len();
        state.user_badges.retain(|b| b.user_id != user_id);

        Ok(ResetCounts {
            reads,
            rewards,
            badges: (before - state.user_badges.len()) as u64,
        })
    }
}

/// Badge storage over an [`InMemoryStore`] with switchable timing and failures
pub struct TunedBadgeRepository {
    pub(crate) store: InMemoryStore,
    /// Yield after reading ownership, so concurrent evaluations share a stale owned set
    pub yield_after_owned: bool,
    pub fail_reset: bool,
}

impl TunedBadgeRepository {
    pub fn new(store: &InMemoryStore) -> Self {
        Self {
            store: store.clone(),
            yield_after_owned: false,
            fail_reset: false,
        }
    }
}

#[async_trait]
impl BadgeRepository for TunedBadgeRepository {
    async fn find_badge_type(&self, id: i64) -> Result<Option<BadgeType>> {
        self.store.find_badge_type(id).await
    }

    async fn list_badge_types(&self, filter: BadgeTypeFilter) -> Result<Vec<BadgeType>> {
        self.store.list_badge_types(filter).await
    }

    async fn find_eligible(&self, query: &EligibilityQuery) -> Result<Vec<BadgeType>> {
        self.store.find_eligible(query).await
    }

    async fn create_badge_type(&self, new: NewBadgeType) -> Result<BadgeType> {
        self.store.create_badge_type(new).await
    }

    async fn save_badge_type(&self, badge_type: &BadgeType) -> Result<BadgeType> {
        self.store.save_badge_type(badge_type).await
    }

    async fn owned_badge_type_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let owned = self.store.owned_badge_type_ids(user_id).await?;
        if self.yield_after_owned {
            tokio::task::yield_now().await;
        }
        Ok(owned)
    }

    async fn insert_user_badges(
        &self,
        user_id: i64,
        badge_type_ids: &[i64],
        offered_at: DateTime<Utc>,
    ) -> Result<Vec<UserBadge>> {
        self.store
            .insert_user_badges(user_id, badge_type_ids, offered_at)
            .await
    }

    async fn list_user_badges(
        &self,
        user_id: i64,
        org_id: Option<i64>,
    ) -> Result<Vec<AwardedBadge>> {
        self.store.list_user_badges(user_id, org_id).await
    }

    async fn reset_user_engagement(&self, user_id: i64) -> Result<ResetCounts> {
        if self.fail_reset {
            return Err(AppError::BadRequest("reset unavailable".to_string()));
        }
        self.store.reset_user_engagement(user_id).await
    }
}

// ==================== Badge fixtures ====================

/// Badge type to seed directly into the store, active by default
pub struct BadgeSeed {
    org_id: i64,
    title: String,
    category_id: Option<i64>,
    threshold: i32,
    is_active: bool,
    unfinished_template: String,
    finished_description: String,
}

impl BadgeSeed {
    pub fn org_wide(org_id: i64, title: &str, threshold: i32) -> Self {
        Self {
            org_id,
            title: title.to_string(),
            category_id: None,
            threshold,
            is_active: true,
            unfinished_template: "${left_count} ${pluralize_stories_left} left".to_string(),
            finished_description: format!("You earned {}", title),
        }
    }

    pub fn in_category(org_id: i64, title: &str, category_id: i64, threshold: i32) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::org_wide(org_id, title, threshold)
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn templates(mut self, unfinished: &str, finished: &str) -> Self {
        self.unfinished_template = unfinished.to_string();
        self.finished_description = finished.to_string();
        self
    }
}

/// Every service wired over one [`InMemoryStore`]
pub struct TestServices {
    pub store: InMemoryStore,
    pub ledger: Arc<EngagementService>,
    pub engine: Arc<BadgeAwardEngine>,
    pub user_badges: Arc<UserBadgeService>,
    pub badge_types: Arc<BadgeTypeService>,
}

impl TestServices {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let repo = Arc::new(store.clone());

        let categories = Arc::new(CategoryService::new(repo.clone(), "/"));
        let ledger = Arc::new(EngagementService::new(repo.clone()));
        let catalog = Arc::new(BadgeCatalog::new(repo.clone()));
        let engine = Arc::new(BadgeAwardEngine::new(
            categories.clone(),
            ledger.clone(),
            catalog.clone(),
            repo.clone(),
        ));
        let user_badges = Arc::new(UserBadgeService::new(
            ledger.clone(),
            categories.clone(),
            catalog,
            engine.clone(),
            repo.clone(),
        ));
        let badge_types = Arc::new(BadgeTypeService::new(repo, categories));

        Self {
            store,
            ledger,
            engine,
            user_badges,
            badge_types,
        }
    }
}
