//! A small bounded brute-force [`SolverBridge`] used by this crate's own
//! tests and demo binary. It is not a general MILP solver: it parses back
//! the specific LP dialect [`crate::lp::LPBuilder`] emits and exploits the
//! shape [`crate::optimizer`] always produces (every `_cost`/`_waste`
//! variable is lower-bounded by exactly one constraint against otherwise
//! already-known terms), so it only needs to search over the genuine
//! recipe-count variables. Real deployments are expected to use
//! [`crate::solver::ExternalCliSolver`] or an equivalent bridge to a real
//! MILP solver.

use std::collections::HashMap;

use itertools::Itertools;

use crate::solver::{SolverBridge, SolverBridgeError, SolverResult, SolverStatus};

const DEFAULT_BOUND: i64 = 100;

pub struct ReferenceSolver {
    bound: i64,
}

impl Default for ReferenceSolver {
    fn default() -> Self {
        Self { bound: DEFAULT_BOUND }
    }
}

impl ReferenceSolver {
    pub fn with_bound(bound: i64) -> Self {
        Self { bound }
    }
}

impl SolverBridge for ReferenceSolver {
    fn solve(&self, lp_text: &str) -> Result<SolverResult, SolverBridgeError> {
        let parsed = parse(lp_text)?;
        Ok(solve_parsed(&parsed, self.bound))
    }
}

#[derive(Debug, Default)]
struct ParsedLp {
    objective: Vec<(String, f64)>,
    constraints: Vec<(Vec<(String, f64)>, f64)>,
}

fn is_derived(name: &str) -> bool {
    name.ends_with("_cost") || name.ends_with("_waste")
}

fn parse(lp_text: &str) -> Result<ParsedLp, SolverBridgeError> {
    let mut logical_lines: Vec<String> = Vec::new();
    for raw in lp_text.lines() {
        if raw.starts_with(' ') {
            if let Some(last) = logical_lines.last_mut() {
                last.push(' ');
                last.push_str(raw.trim_start());
                continue;
            }
        }
        logical_lines.push(raw.to_string());
    }

    let mut parsed = ParsedLp::default();
    #[derive(PartialEq)]
    enum Section {
        None,
        Objective,
        Constraints,
    }
    let mut section = Section::None;

    for line in &logical_lines {
        let trimmed = line.trim();
        match trimmed {
            "" | "Minimize" => {
                section = Section::Objective;
                continue;
            }
            "Subject To" => {
                section = Section::Constraints;
                continue;
            }
            "Bounds" | "Integers" | "End" => {
                section = Section::None;
                continue;
            }
            _ => {}
        }
        if trimmed.starts_with("\\Problem name") {
            continue;
        }
        match section {
            Section::Objective => {
                let body = strip_label(trimmed);
                let (terms, constant) = parse_terms(body, false);
                parsed.objective = terms;
                let _ = constant;
            }
            Section::Constraints => {
                let body = strip_label(trimmed);
                let (terms, rhs) = parse_terms(body, true);
                parsed.constraints.push((terms, rhs));
            }
            Section::None => {}
        }
    }

    Ok(parsed)
}

fn strip_label(line: &str) -> &str {
    match line.split_once(": ") {
        Some((_, rest)) => rest,
        None => line,
    }
}

/// Parses a whitespace-tokenized sequence of signed terms. When
/// `has_rhs` is true, stops at a `>=` marker and returns its value as the
/// second element; otherwise a trailing bare number is treated as the
/// expression's constant.
fn parse_terms(body: &str, has_rhs: bool) -> (Vec<(String, f64)>, f64) {
    let mut terms = Vec::new();
    let mut rhs_or_constant = 0.0;
    let mut tokens = body.split_whitespace().peekable();
    while let Some(tok) = tokens.next() {
        if has_rhs && tok == ">=" {
            if let Some(v) = tokens.next().and_then(|v| v.parse().ok()) {
                rhs_or_constant = v;
            }
            break;
        }
        let sign = if tok == "-" { -1.0 } else { 1.0 };
        let Some(next) = tokens.next() else { break };
        if let Ok(num) = next.parse::<f64>() {
            match tokens.peek() {
                Some(&following) if !(has_rhs && following == ">=") && following.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_') =>
                {
                    let name = tokens.next().unwrap();
                    terms.push((name.to_string(), sign * num));
                }
                _ => {
                    rhs_or_constant += sign * num;
                }
            }
        } else {
            terms.push((next.to_string(), sign));
        }
    }
    (terms, rhs_or_constant)
}

fn eval_terms(terms: &[(String, f64)], assignment: &HashMap<&str, f64>) -> f64 {
    terms.iter().map(|(name, coeff)| coeff * assignment.get(name.as_str()).copied().unwrap_or(0.0)).sum()
}

fn solve_parsed(parsed: &ParsedLp, bound: i64) -> SolverResult {
    let recipe_vars: Vec<String> = parsed
        .objective
        .iter()
        .map(|(n, _)| n.clone())
        .chain(parsed.constraints.iter().flat_map(|(terms, _)| terms.iter().map(|(n, _)| n.clone())))
        .filter(|n| !is_derived(n))
        .unique()
        .collect();

    let structural: Vec<&(Vec<(String, f64)>, f64)> =
        parsed.constraints.iter().filter(|(terms, _)| terms.iter().all(|(n, _)| !is_derived(n))).collect();
    let derived: Vec<&(Vec<(String, f64)>, f64)> =
        parsed.constraints.iter().filter(|(terms, _)| terms.iter().any(|(n, _)| is_derived(n))).collect();

    let ranges: Vec<std::ops::RangeInclusive<i64>> = recipe_vars.iter().map(|_| 0..=bound).collect();
    if ranges.is_empty() {
        return SolverResult::optimal(HashMap::new());
    }

    let mut best: Option<(f64, HashMap<String, f64>)> = None;
    for combo in ranges.into_iter().multi_cartesian_product() {
        let assignment: HashMap<&str, f64> =
            recipe_vars.iter().map(String::as_str).zip(combo.iter().map(|&v| v as f64)).collect();

        if !structural.iter().all(|(terms, rhs)| eval_terms(terms, &assignment) >= *rhs - 1e-6) {
            continue;
        }

        let mut full: HashMap<String, f64> = assignment.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        for (terms, rhs) in &derived {
            let self_term = terms.iter().find(|(n, _)| is_derived(n));
            let Some((self_name, _)) = self_term else { continue };
            let others: Vec<(String, f64)> = terms.iter().filter(|(n, _)| n != self_name).cloned().collect();
            let needed = rhs - eval_terms(&others, &assignment);
            full.insert(self_name.clone(), needed.max(0.0).ceil());
        }

        let full_ref: HashMap<&str, f64> = full.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let objective = eval_terms(&parsed.objective, &full_ref);

        if best.as_ref().map_or(true, |(b, _)| objective < *b - 1e-9) {
            best = Some((objective, full));
        }
    }

    match best {
        Some((_, values)) => SolverResult::optimal(values),
        None => SolverResult { status: Some(SolverStatus::Infeasible), variable_values: HashMap::new() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::{LPBuilder, VarKind};

    #[test]
    fn solves_a_single_output_constraint() {
        let mut b = LPBuilder::new();
        let x = b.add_var("Concrete_recipe", VarKind::Integer, 0.0);
        b.set_objective(x.clone());
        b.add_constraint(x.clone().scale(15.0), 480.0, "Concrete_output");
        let text = b.to_lp_text();

        let result = ReferenceSolver::default().solve(&text).unwrap();
        assert_eq!(result.status(), SolverStatus::Optimal);
        assert_eq!(result.variable_values.get("Concrete_recipe"), Some(&32.0));
    }

    #[test]
    fn reports_infeasible_when_bound_is_too_tight() {
        let mut b = LPBuilder::new();
        let x = b.add_var("Concrete_recipe", VarKind::Integer, 0.0);
        b.set_objective(x.clone());
        b.add_constraint(x.clone().scale(15.0), 480.0, "Concrete_output");
        let text = b.to_lp_text();

        let result = ReferenceSolver::with_bound(5).solve(&text).unwrap();
        assert_eq!(result.status(), SolverStatus::Infeasible);
    }
}
