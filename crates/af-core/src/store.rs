//! # Category Store
//!
//! Loads the category set once per forum visit and answers lookups by id or
//! name. A failed load is kept distinct from an empty one so the sidebar can
//! say which it is.

use crate::models::{Category, CategoryFilter};
use crate::traits::CategoryRepo;

/// Lookup table over a loaded category set, in backend order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStore {
    categories: Vec<Category>,
}

impl CategoryStore {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn find_by_id(&self, id: uuid::Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// First category with this exact name. Names are not enforced unique.
    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Resolves a sidebar label. `"All"` and unknown names both mean no filter.
    pub fn filter_for(&self, name: &str) -> CategoryFilter {
        if name == "All" {
            return CategoryFilter::All;
        }
        self.find_by_name(name)
            .map(|c| CategoryFilter::Category(c.id))
            .unwrap_or_default()
    }

    /// Sidebar label for a filter.
    pub fn label_for(&self, filter: CategoryFilter) -> &str {
        match filter {
            CategoryFilter::All => "All",
            CategoryFilter::Category(id) => self.find_by_id(id).map_or("All", |c| c.name.as_str()),
        }
    }
}

/// Where the category set stands for the current visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryState {
    #[default]
    Loading,
    Loaded(CategoryStore),
    /// The fetch failed; the sidebar shows only "All" plus an inline notice.
    Failed(String),
}

impl CategoryState {
    /// Fetches the category set. Errors are swallowed into `Failed`.
    pub async fn load(repo: &dyn CategoryRepo) -> Self {
        match repo.list_categories().await {
            Ok(categories) => {
                tracing::debug!(count = categories.len(), "categories loaded");
                CategoryState::Loaded(CategoryStore::new(categories))
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load categories");
                CategoryState::Failed(e.to_string())
            }
        }
    }

    /// The loaded store, or an empty one while loading or after a failure.
    pub fn store(&self) -> CategoryStore {
        match self {
            CategoryState::Loaded(store) => store.clone(),
            _ => CategoryStore::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockCategoryRepo;
    use uuid::Uuid;

    fn ethics() -> Category {
        Category {
            id: Uuid::now_v7(),
            name: "Ethics".into(),
            description: None,
        }
    }

    #[test]
    fn filter_for_resolves_names() {
        let cat = ethics();
        let store = CategoryStore::new(vec![cat.clone()]);

        assert_eq!(store.filter_for("All"), CategoryFilter::All);
        assert_eq!(store.filter_for("Ethics"), CategoryFilter::Category(cat.id));
        assert_eq!(store.filter_for("Logic"), CategoryFilter::All);
        assert_eq!(store.label_for(CategoryFilter::Category(cat.id)), "Ethics");
    }

    #[tokio::test]
    async fn load_failure_is_not_empty() {
        let mut repo = MockCategoryRepo::new();
        repo.expect_list_categories()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("connection refused")));

        let state = CategoryState::load(&repo).await;
        assert!(matches!(state, CategoryState::Failed(_)));
        assert!(state.store().is_empty());
    }

    #[tokio::test]
    async fn load_success_keeps_order() {
        let first = ethics();
        let second = Category {
            id: Uuid::now_v7(),
            name: "Metaphysics".into(),
            description: Some("Being and so on".into()),
        };
        let rows = vec![first.clone(), second.clone()];

        let mut repo = MockCategoryRepo::new();
        repo.expect_list_categories().returning(move || Ok(rows.clone()));

        let state = CategoryState::load(&repo).await;
        let names: Vec<_> = state.store().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["Ethics", "Metaphysics"]);
    }
}
