//! The consumed recipe-database interface (§6.2) and an in-memory
//! implementation for tests and the demo binary.

use std::collections::{HashMap, HashSet};

use crate::normalize::canonical_match;
use crate::recipe::{Item, Recipe};

/// Read-only recipe database, supplied by the surrounding application
/// (spec §1 treats this as an external collaborator; §6.2 names its
/// lookup surface).
pub trait RecipeDb {
    fn all_recipes(&self) -> HashMap<String, Recipe>;
    fn all_recipes_by_machine(&self) -> HashMap<String, HashMap<String, Recipe>>;
    fn base_parts(&self) -> HashSet<Item>;
    fn default_enablement_set(&self) -> HashSet<String>;
    /// Canonicalize the item names of `values` (case-folded lookup
    /// against known items) without altering their associated rates.
    fn normalize_material_names(&self, values: &HashMap<String, f64>) -> HashMap<String, f64>;
}

/// An in-memory `RecipeDb` built from recipes the host already has. Does
/// not load from disk — recipe persistence is out of scope for this core
/// (spec §1).
#[derive(Debug, Clone, Default)]
pub struct StaticRecipeDb {
    recipes: HashMap<String, Recipe>,
    base_parts: HashSet<Item>,
    default_enablement: HashSet<String>,
}

impl StaticRecipeDb {
    pub fn new(
        recipes: impl IntoIterator<Item = Recipe>,
        base_parts: impl IntoIterator<Item = Item>,
        default_enablement: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            recipes: recipes.into_iter().map(|r| (r.name().to_string(), r)).collect(),
            base_parts: base_parts.into_iter().collect(),
            default_enablement: default_enablement.into_iter().collect(),
        }
    }

    fn known_items(&self) -> impl Iterator<Item = &str> {
        self.recipes.values().flat_map(|r| r.items().map(String::as_str)).chain(
            self.base_parts.iter().map(String::as_str),
        )
    }
}

impl RecipeDb for StaticRecipeDb {
    fn all_recipes(&self) -> HashMap<String, Recipe> {
        self.recipes.clone()
    }

    fn all_recipes_by_machine(&self) -> HashMap<String, HashMap<String, Recipe>> {
        let mut out: HashMap<String, HashMap<String, Recipe>> = HashMap::new();
        for recipe in self.recipes.values() {
            out.entry(recipe.machine().to_string())
                .or_default()
                .insert(recipe.name().to_string(), recipe.clone());
        }
        out
    }

    fn base_parts(&self) -> HashSet<Item> {
        self.base_parts.clone()
    }

    fn default_enablement_set(&self) -> HashSet<String> {
        self.default_enablement.clone()
    }

    fn normalize_material_names(&self, values: &HashMap<String, f64>) -> HashMap<String, f64> {
        let known: Vec<&str> = self.known_items().collect();
        values
            .iter()
            .map(|(name, rate)| {
                let canonical = canonical_match(known.iter().copied(), name)
                    .map(str::to_string)
                    .unwrap_or_else(|| name.clone());
                (canonical, *rate)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> StaticRecipeDb {
        let concrete = Recipe::new(
            "Concrete",
            "Constructor",
            HashMap::from([("Limestone".to_string(), 45.0)]),
            HashMap::from([("Concrete".to_string(), 15.0)]),
        )
        .unwrap();
        StaticRecipeDb::new([concrete], ["Limestone".to_string()], ["Concrete".to_string()])
    }

    #[test]
    fn normalizes_case_against_known_items() {
        let db = db();
        let input = HashMap::from([("concrete".to_string(), 480.0)]);
        let normalized = db.normalize_material_names(&input);
        assert_eq!(normalized.get("Concrete"), Some(&480.0));
    }

    #[test]
    fn unknown_items_pass_through_unchanged() {
        let db = db();
        let input = HashMap::from([("Water".to_string(), 100.0)]);
        let normalized = db.normalize_material_names(&input);
        assert_eq!(normalized.get("Water"), Some(&100.0));
    }

    #[test]
    fn indexes_recipes_by_machine() {
        let db = db();
        let by_machine = db.all_recipes_by_machine();
        assert!(by_machine["Constructor"].contains_key("Concrete"));
    }
}
