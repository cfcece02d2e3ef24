//! Recipe and item data model (§3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named material, identified by its canonical string (§3). The
/// distinguished item `"MWm"` represents megawatt-minutes (electrical
/// power).
pub type Item = String;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecipeError {
    #[error("recipe `{0}` has neither inputs nor outputs")]
    Empty(String),
}

/// A production recipe: a single machine kind, and non-negative
/// per-minute-per-machine `inputs`/`outputs` maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    name: String,
    machine: String,
    inputs: HashMap<Item, f64>,
    outputs: HashMap<Item, f64>,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        machine: impl Into<String>,
        inputs: HashMap<Item, f64>,
        outputs: HashMap<Item, f64>,
    ) -> Result<Self, RecipeError> {
        let name = name.into();
        if inputs.is_empty() && outputs.is_empty() {
            return Err(RecipeError::Empty(name));
        }
        Ok(Self { name, machine: machine.into(), inputs, outputs })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn machine(&self) -> &str {
        &self.machine
    }

    pub fn input_of(&self, item: &str) -> Option<f64> {
        self.inputs.get(item).copied()
    }

    pub fn output_of(&self, item: &str) -> Option<f64> {
        self.outputs.get(item).copied()
    }

    pub fn inputs(&self) -> &HashMap<Item, f64> {
        &self.inputs
    }

    pub fn outputs(&self) -> &HashMap<Item, f64> {
        &self.outputs
    }

    /// All items this recipe references, as inputs or outputs.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.inputs.keys().chain(self.outputs.keys())
    }
}

impl core::hash::Hash for Recipe {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Recipe {}
