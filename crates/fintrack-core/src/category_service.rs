use std::{collections::HashMap, sync::Arc};

use fintrack_domain::Category;

use crate::{AuthProvider, Backend, EntityStore, InsertPosition, StoreProfile};

/// Category facade. Categories are reference data and keep creation order.
pub struct CategoryService;

impl CategoryService {
    pub fn profile() -> StoreProfile {
        StoreProfile::for_entity::<Category>(InsertPosition::Append)
    }

    pub fn open(
        backend: Arc<dyn Backend<Category>>,
        auth: Arc<dyn AuthProvider>,
    ) -> EntityStore<Category> {
        EntityStore::new(Self::profile(), backend, auth)
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
        let needle = name.trim().to_ascii_lowercase();
        categories
            .iter()
            .find(|category| category.name.trim().to_ascii_lowercase() == needle)
    }

    /// Maps category ids to names for categories that have been persisted.
    pub fn names_by_id(categories: &[Category]) -> HashMap<String, String> {
        categories
            .iter()
            .filter_map(|category| {
                category
                    .id
                    .as_ref()
                    .map(|id| (id.clone(), category.name.clone()))
            })
            .collect()
    }
}
