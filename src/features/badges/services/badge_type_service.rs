use std::sync::Arc;

use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::badges::dtos::{BadgeTypeAdminDto, CreateBadgeTypeDto, UpdateBadgeTypeDto};
use crate::features::badges::models::BadgeType;
use crate::features::badges::repository::{BadgeRepository, BadgeTypeFilter, NewBadgeType};
use crate::features::categories::CategoryService;
use crate::shared::constants::{DEFAULT_BADGE_IS_ACTIVE, DEFAULT_BADGE_THRESHOLD};

/// Badge type administration for staff
pub struct BadgeTypeService {
    repo: Arc<dyn BadgeRepository>,
    categories: Arc<CategoryService>,
}

impl BadgeTypeService {
    pub fn new(repo: Arc<dyn BadgeRepository>, categories: Arc<CategoryService>) -> Self {
        Self { repo, categories }
    }

    /// All badge types, inactive ones included
    pub async fn list(&self, org_id: Option<i64>) -> Result<Vec<BadgeTypeAdminDto>> {
        let badge_types = self
            .repo
            .list_badge_types(BadgeTypeFilter {
                org_id,
                active_only: false,
            })
            .await?;
        Ok(badge_types.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64) -> Result<BadgeTypeAdminDto> {
        self.find(id).await.map(Into::into)
    }

    async fn find(&self, id: i64) -> Result<BadgeType> {
        self.repo
            .find_badge_type(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Badge type {} not found", id)))
    }

    pub async fn create(&self, dto: CreateBadgeTypeDto) -> Result<BadgeTypeAdminDto> {
        dto.validate()?;
        self.check_validation_category(dto.org_id, dto.validation_category_id)
            .await?;

        let badge_type = self
            .repo
            .create_badge_type(NewBadgeType {
                org_id: dto.org_id,
                title: dto.title,
                image: dto.image,
                is_active: dto.is_active.unwrap_or(DEFAULT_BADGE_IS_ACTIVE),
                validation_category_id: dto.validation_category_id,
                validation_threshold: dto.validation_threshold.unwrap_or(DEFAULT_BADGE_THRESHOLD),
                unfinished_template: dto.unfinished_template.unwrap_or_default(),
                finished_description: dto.finished_description.unwrap_or_default(),
            })
            .await?;

        tracing::info!(
            badge_type_id = badge_type.id,
            org_id = badge_type.org_id,
            "Badge type created"
        );
        Ok(badge_type.into())
    }

    pub async fn update(&self, id: i64, dto: UpdateBadgeTypeDto) -> Result<BadgeTypeAdminDto> {
        dto.validate()?;
        let mut badge_type = self.find(id).await?;

        if let Some(title) = dto.title {
            badge_type.title = title;
        }
        if let Some(image) = dto.image {
            badge_type.image = image;
        }
        if let Some(is_active) = dto.is_active {
            badge_type.is_active = is_active;
        }
        if let Some(category_id) = dto.validation_category_id {
            badge_type.validation_category_id = category_id;
        }
        if let Some(threshold) = dto.validation_threshold {
            badge_type.validation_threshold = threshold;
        }
        if let Some(template) = dto.unfinished_template {
            badge_type.unfinished_template = template;
        }
        if let Some(description) = dto.finished_description {
            badge_type.finished_description = description;
        }

        self.check_validation_category(badge_type.org_id, badge_type.validation_category_id)
            .await?;

        let saved = self.repo.save_badge_type(&badge_type).await?;
        Ok(saved.into())
    }

    /// The validation category must exist and belong to the badge type's organization
    async fn check_validation_category(&self, org_id: i64, category_id: Option<i64>) -> Result<()> {
        let Some(category_id) = category_id else {
            return Ok(());
        };

        match self.categories.find(category_id).await? {
            Some(category) if category.org_id == org_id => Ok(()),
            Some(_) => Err(AppError::InvalidFields(vec![
                "validation_category_id: The selected category belongs to a different organization"
                    .to_string(),
            ])),
            None => Err(AppError::InvalidFields(vec![format!(
                "validation_category_id: Category {} does not exist",
                category_id
            )])),
        }
    }
}
