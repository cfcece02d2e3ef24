//! The recipe-model assembler (§4.2): turns a request plus the recipe DB
//! and default economy into an LP, solves it, and extracts machine counts.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::db::RecipeDb;
use crate::economy::EconomyProvider;
use crate::error::FactoryError;
use crate::lp::{LPBuilder, LinExpr, VarKind};
use crate::solver::{SolverBridge, SolverStatus};

const POWER_ITEM: &str = "MWm";
const ROUNDING_TOLERANCE: f64 = 1e-6;

/// Typed configuration for one `optimize_recipes` call (§9's "dynamic
/// objects as config"); unset fields fall back to the defaults in §4.2's
/// parameter table.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub inputs: HashMap<String, f64>,
    pub outputs: HashMap<String, f64>,
    pub enablement: Option<HashSet<String>>,
    pub economy: Option<HashMap<String, f64>>,
    pub input_costs_weight: f64,
    pub machine_counts_weight: f64,
    pub power_consumption_weight: f64,
    pub waste_products_weight: f64,
    pub design_power: bool,
}

impl Default for OptimizeRequest {
    fn default() -> Self {
        Self {
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            enablement: None,
            economy: None,
            input_costs_weight: 1.0,
            machine_counts_weight: 0.0,
            power_consumption_weight: 0.0,
            waste_products_weight: 0.0,
            design_power: false,
        }
    }
}

/// Solves for a minimal-cost set of recipe machine counts meeting
/// `request.outputs` from `request.inputs`, using `db` and
/// `economy_provider` for lookups and `solver` to resolve the resulting LP.
/// `progress`, if supplied, is called with a short phase name at each of
/// §5's fixed phase boundaries.
pub fn optimize_recipes(
    request: &OptimizeRequest,
    db: &dyn RecipeDb,
    economy_provider: &dyn EconomyProvider,
    solver: &dyn SolverBridge,
    progress: Option<&dyn Fn(&str)>,
) -> Result<HashMap<String, u64>, FactoryError> {
    let report = |phase: &str| {
        log::debug!("optimizer phase: {phase}");
        if let Some(cb) = progress {
            cb(phase);
        }
    };

    report("validate");
    let inputs = db.normalize_material_names(&request.inputs);
    let outputs = db.normalize_material_names(&request.outputs);

    let all_recipes = db.all_recipes();
    let enablement = request.enablement.clone().unwrap_or_else(|| db.default_enablement_set());

    let mut unknown_recipes: Vec<String> =
        enablement.iter().filter(|name| !all_recipes.contains_key(*name)).cloned().collect();
    if !unknown_recipes.is_empty() {
        unknown_recipes.sort();
        return Err(FactoryError::UnknownRecipe(unknown_recipes));
    }

    let enabled_recipes: BTreeMap<String, crate::recipe::Recipe> = enablement
        .iter()
        .filter_map(|name| all_recipes.get(name).map(|r| (name.clone(), r.clone())))
        .collect();

    let design_power = request.design_power || outputs.contains_key(POWER_ITEM);

    report("build matrix");
    // item -> recipe name -> net per-machine contribution (outputs positive,
    // inputs negative).
    let mut matrix: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for (name, recipe) in &enabled_recipes {
        for (item, rate) in recipe.inputs() {
            *matrix.entry(item.clone()).or_default().entry(name.clone()).or_insert(0.0) -= *rate;
        }
        for (item, rate) in recipe.outputs() {
            *matrix.entry(item.clone()).or_default().entry(name.clone()).or_insert(0.0) += *rate;
        }
    }

    let mut unknown_outputs: Vec<String> =
        outputs.keys().filter(|item| !matrix.contains_key(*item)).cloned().collect();
    if !unknown_outputs.is_empty() {
        unknown_outputs.sort();
        return Err(FactoryError::UnknownOutput(unknown_outputs));
    }

    report("create model");
    let mut builder = LPBuilder::new().with_problem_name("factory_core");
    let recipe_vars: BTreeMap<String, LinExpr> = enabled_recipes
        .iter()
        .map(|(name, recipe)| {
            let var_name = format!("{}_{}", recipe.machine(), name);
            (name.clone(), builder.add_var(var_name, VarKind::Integer, 0.0))
        })
        .collect();

    let part_count = |item: &str, allow_power_generation: bool| -> LinExpr {
        let mut expr = LinExpr::constant(inputs.get(item).copied().unwrap_or(0.0));
        if let Some(contributors) = matrix.get(item) {
            for (recipe_name, &coeff) in contributors {
                if item == POWER_ITEM && !allow_power_generation && coeff > 0.0 {
                    continue;
                }
                expr = expr + recipe_vars[recipe_name].clone().scale(coeff);
            }
        }
        expr
    };

    let base_parts = db.base_parts();
    let economy = request.economy.clone().unwrap_or_else(|| economy_provider.default_economy());

    report("add constraints");
    let mut cost_vars: Vec<LinExpr> = Vec::new();
    let mut waste_vars: Vec<LinExpr> = Vec::new();

    for item in matrix.keys() {
        let count = part_count(item, design_power);

        if let Some(&required) = outputs.get(item) {
            builder.add_constraint(count, required, format!("{item}_output"));
            continue;
        }

        let is_power = item.as_str() == POWER_ITEM;
        let is_free_input =
            base_parts.contains(item) || inputs.get(item).copied() == Some(0.0);

        let cost_weight = if is_power { request.power_consumption_weight } else { request.input_costs_weight };

        if !is_power && !is_free_input {
            builder.add_constraint(count.clone(), 0.0, format!("{item}_balance"));
        }

        if cost_weight != 0.0 {
            let economy_value = match economy.get(item) {
                Some(value) => *value,
                None => {
                    if request.economy.is_some() {
                        log::warn!("item `{item}` missing from supplied economy, defaulting to 1.0");
                    }
                    1.0
                }
            };
            let weighted_cost = count.clone().scale(-economy_value);
            let cost_var = builder.add_var(format!("{item}_cost"), VarKind::Integer, 0.0);
            builder.add_constraint(cost_var.clone() - weighted_cost, 0.0, format!("{item}_cost"));
            cost_vars.push(cost_var);
        }

        let waste_var = builder.add_var(format!("{item}_waste"), VarKind::Integer, 0.0);
        builder.add_constraint(waste_var.clone() - count, 0.0, format!("{item}_waste"));
        waste_vars.push(waste_var);
    }

    if design_power {
        // Recomputed fresh rather than reusing the per-item loop's MWm
        // contribution (spec's documented fragility when MWm appears twice).
        let power_sum = part_count(POWER_ITEM, true);
        builder.add_constraint(power_sum, 0.0, "power_balance");
    }

    report("set objective");
    let cost_sum: LinExpr = cost_vars.into_iter().sum();
    let machine_sum: LinExpr = recipe_vars.values().cloned().sum();
    let waste_sum: LinExpr = waste_vars.into_iter().sum();
    let objective = cost_sum.scale(request.input_costs_weight)
        + machine_sum.scale(request.machine_counts_weight)
        + waste_sum.scale(request.waste_products_weight);
    builder.set_objective(objective);

    report("generate LP");
    let lp_text = builder.to_lp_text();

    report("solve");
    let result = solver.solve(&lp_text)?;
    if result.status() != SolverStatus::Optimal {
        return Err(FactoryError::FactoryInfeasible { design_power });
    }

    report("extract");
    let mut counts = HashMap::new();
    for (name, expr) in &recipe_vars {
        let (var_name, coeff) = expr
            .as_single_var()
            .ok_or_else(|| FactoryError::InternalShape(format!("recipe `{name}` lost its single-variable shape")))?;
        if (coeff - 1.0).abs() > ROUNDING_TOLERANCE {
            return Err(FactoryError::InternalShape(format!(
                "recipe `{name}` variable has coefficient {coeff}, expected 1"
            )));
        }
        let raw = result.variable_values.get(&var_name).copied().unwrap_or(0.0);
        let rounded = raw.round();
        if rounded > 0.0 {
            counts.insert(name.clone(), rounded as u64);
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StaticRecipeDb;
    use crate::economy::StaticEconomy;
    use crate::recipe::Recipe;
    use crate::reference_solver::ReferenceSolver;

    fn recipe(name: &str, machine: &str, inputs: &[(&str, f64)], outputs: &[(&str, f64)]) -> Recipe {
        Recipe::new(
            name,
            machine,
            inputs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            outputs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn concrete_only_scenario() {
        let concrete = recipe("Concrete", "Constructor", &[("Limestone", 45.0)], &[("Concrete", 15.0)]);
        let db = StaticRecipeDb::new([concrete], ["Limestone".to_string()], []);
        let economy = StaticEconomy::default();
        let solver = ReferenceSolver::default();

        let request = OptimizeRequest {
            outputs: HashMap::from([("Concrete".to_string(), 480.0)]),
            enablement: Some(HashSet::from(["Concrete".to_string()])),
            ..Default::default()
        };

        let result = optimize_recipes(&request, &db, &economy, &solver, None).unwrap();
        assert_eq!(result.get("Concrete"), Some(&32));
    }

    #[test]
    fn rejects_unknown_recipe_in_enablement() {
        let db = StaticRecipeDb::new([], [], []);
        let economy = StaticEconomy::default();
        let solver = ReferenceSolver::default();
        let request = OptimizeRequest {
            enablement: Some(HashSet::from(["Nonexistent".to_string()])),
            ..Default::default()
        };
        let err = optimize_recipes(&request, &db, &economy, &solver, None).unwrap_err();
        assert!(matches!(err, FactoryError::UnknownRecipe(_)));
    }

    #[test]
    fn unreachable_intermediate_makes_the_plan_infeasible() {
        // Iron Plate needs Iron Ingot, but no enabled recipe produces it, so
        // the Iron Ingot balance constraint (>= 0 on a -30x term) conflicts
        // with the Iron Plate output constraint (20x >= 100).
        let iron_plate =
            recipe("Iron Plate", "Constructor", &[("Iron Ingot", 30.0)], &[("Iron Plate", 20.0)]);
        let db = StaticRecipeDb::new([iron_plate], [], []);
        let economy = StaticEconomy::default();
        let solver = ReferenceSolver::default();
        let request = OptimizeRequest {
            outputs: HashMap::from([("Iron Plate".to_string(), 100.0)]),
            enablement: Some(HashSet::from(["Iron Plate".to_string()])),
            ..Default::default()
        };
        let err = optimize_recipes(&request, &db, &economy, &solver, None).unwrap_err();
        assert!(matches!(err, FactoryError::FactoryInfeasible { design_power: false }));
    }
}
