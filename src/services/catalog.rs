use crate::{
    db::DbPool,
    entities::{
        item::{self, Entity as Item, ItemCategory, ItemStatus},
        recipe::{self, Entity as Recipe},
        recipe_line::{self, Entity as RecipeLine},
    },
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// One ingredient consumption produced by expanding a sold item.
#[derive(Debug, Clone)]
pub struct RecipeComponent {
    pub ingredient: item::Model,
    pub quantity_per_unit: Decimal,
}

/// Read-only lookup over items and recipes.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<item::Model, ServiceError> {
        Item::find_by_id(item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    /// Legacy name-based lookup for rows that stored only a display name.
    ///
    /// Slower secondary path; duplicate names exist in legacy data, so more
    /// than one active match is surfaced as `AmbiguousName` instead of being
    /// silently resolved to the first row.
    #[instrument(skip(self))]
    pub async fn find_item_by_name(&self, name: &str) -> Result<item::Model, ServiceError> {
        let mut matches = Item::find()
            .filter(item::Column::Name.eq(name))
            .filter(item::Column::Status.eq(ItemStatus::Active))
            .all(self.db.as_ref())
            .await?;

        if matches.len() > 1 {
            return Err(ServiceError::AmbiguousName(format!(
                "{} active items share the name '{}'",
                matches.len(),
                name
            )));
        }

        matches
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("No active item named '{}'", name)))
    }

    /// Expands a sold item into the ingredient quantities one unit consumes.
    ///
    /// Ingredients sold directly (and products without a recipe, i.e. resale
    /// goods) consume themselves at quantity 1. Products with a recipe expand
    /// to the recipe's lines in position order. Any line whose ingredient id
    /// cannot be resolved aborts the whole expansion with `IncompleteRecipe`
    /// so a sale never partially deducts.
    #[instrument(skip(self))]
    pub async fn resolve_sale_item(
        &self,
        item_id: Uuid,
    ) -> Result<Vec<RecipeComponent>, ServiceError> {
        let item = self.get_item(item_id).await?;

        if item.category == ItemCategory::Ingredient {
            return Ok(vec![RecipeComponent {
                ingredient: item,
                quantity_per_unit: Decimal::ONE,
            }]);
        }

        let recipe = Recipe::find()
            .filter(recipe::Column::ProductId.eq(item_id))
            .one(self.db.as_ref())
            .await?;

        let Some(recipe) = recipe else {
            return Ok(vec![RecipeComponent {
                ingredient: item,
                quantity_per_unit: Decimal::ONE,
            }]);
        };

        let lines = RecipeLine::find()
            .filter(recipe_line::Column::RecipeId.eq(recipe.id))
            .order_by_asc(recipe_line::Column::Position)
            .all(self.db.as_ref())
            .await?;

        let ingredient_ids: Vec<Uuid> = lines.iter().map(|line| line.ingredient_id).collect();
        let ingredients: HashMap<Uuid, item::Model> = Item::find()
            .filter(item::Column::Id.is_in(ingredient_ids))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|ingredient| (ingredient.id, ingredient))
            .collect();

        let mut components = Vec::with_capacity(lines.len());
        for line in lines {
            let ingredient = ingredients.get(&line.ingredient_id).cloned().ok_or_else(|| {
                ServiceError::IncompleteRecipe(format!(
                    "Recipe {} for product {} references unknown ingredient {}",
                    recipe.id, item_id, line.ingredient_id
                ))
            })?;
            components.push(RecipeComponent {
                ingredient,
                quantity_per_unit: line.quantity_per_unit,
            });
        }

        Ok(components)
    }
}
