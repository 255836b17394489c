use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{CategoryDetailDto, CategoryResponseDto};
use crate::features::categories::models::Category;
use crate::features::categories::repository::CategoryRepository;

/// Resolves the two-level category hierarchy encoded in category names
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    separator: String,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, separator: impl Into<String>) -> Self {
        Self {
            repo,
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub async fn find(&self, id: i64) -> Result<Option<Category>> {
        self.repo.find_by_id(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Category> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    /// Top-level parent of a subcategory.
    ///
    /// "Category One / Subcategory 123 / Abcdef" resolves to "Category One" of
    /// the same organization. Returns `None` for top-level categories and when
    /// no category carries the parent name.
    pub async fn get_parent(&self, category: &Category) -> Result<Option<Category>> {
        let Some(parent_name) = category.parent_name(&self.separator) else {
            return Ok(None);
        };

        self.repo.find_by_name(category.org_id, parent_name).await
    }

    /// Ids of the direct subcategories of a top-level category.
    ///
    /// A subcategory never has children of its own, so this is empty whenever
    /// `category` itself contains the separator.
    pub async fn get_subcategory_ids(&self, category: &Category) -> Result<BTreeSet<i64>> {
        if category.is_subcategory(&self.separator) {
            return Ok(BTreeSet::new());
        }

        let prefix = category.subcategory_prefix(&self.separator);
        let ids = self
            .repo
            .find_ids_by_name_prefix(category.org_id, &prefix)
            .await?;

        Ok(ids.into_iter().collect())
    }

    /// The category plus its direct subcategories
    pub async fn family_ids(&self, category: &Category) -> Result<BTreeSet<i64>> {
        let mut ids = self.get_subcategory_ids(category).await?;
        ids.insert(category.id);
        Ok(ids)
    }

    pub async fn list_by_org(&self, org_id: i64) -> Result<Vec<CategoryResponseDto>> {
        let categories = self.repo.list_by_org(org_id).await?;
        Ok(categories
            .into_iter()
            .map(|c| CategoryResponseDto::from_category(c, &self.separator))
            .collect())
    }

    pub async fn detail(&self, id: i64) -> Result<CategoryDetailDto> {
        let category = self.get(id).await?;
        let parent = self.get_parent(&category).await?;
        let subcategory_ids = self.get_subcategory_ids(&category).await?;

        Ok(CategoryDetailDto {
            parent: parent.map(|p| CategoryResponseDto::from_category(p, &self.separator)),
            subcategory_ids: subcategory_ids.into_iter().collect(),
            category: CategoryResponseDto::from_category(category, &self.separator),
        })
    }
}
