//! In-memory symbolic linear expressions and CPLEX LP text serialization
//! (§4.1, §6.1).
//!
//! Mirrors the coefficient-formatting and line-wrapping mechanics of a
//! standard LP writer (sign-then-number-then-name tokens, continuation
//! lines prefixed with a single space, trailing-zero-trimmed numbers), but
//! targets spec §6.1's fixed 500-char width and always-signed coefficients
//! rather than eliding the leading `+` on a line's first term.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::normalize::sanitize_identifier;

/// Coefficients below this magnitude are dropped during consolidation.
pub const EPSILON: f64 = 1e-10;
/// Maximum characters per emitted LP-text line (excluding the newline).
pub const MAX_LINE_WIDTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Integer,
    Continuous,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Rc<str>,
    pub kind: VarKind,
    pub lb: f64,
}

/// A formal linear combination: an ordered sequence of (variable, coefficient)
/// terms plus a scalar constant. Duplicate variables are permitted; they are
/// summed at serialization/consolidation time. All operations are pure and
/// return new expressions — expressions are freely shared and recombined
/// via cheap `Rc<str>` variable handles (spec §9).
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    terms: Vec<(Rc<str>, f64)>,
    constant: f64,
}

impl LinExpr {
    pub fn constant(value: f64) -> Self {
        Self { terms: Vec::new(), constant: value }
    }

    fn single(name: Rc<str>) -> Self {
        Self { terms: vec![(name, 1.0)], constant: 0.0 }
    }

    pub fn scale(mut self, factor: f64) -> Self {
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }

    /// Sum coefficients per variable, preserving first-seen order, and
    /// drop any consolidated term whose absolute coefficient is below
    /// [`EPSILON`].
    pub fn consolidated(&self) -> (Vec<(Rc<str>, f64)>, f64) {
        let mut order: Vec<Rc<str>> = Vec::new();
        let mut sums: HashMap<Rc<str>, f64> = HashMap::new();
        for (name, coeff) in &self.terms {
            let entry = sums.entry(name.clone()).or_insert_with(|| {
                order.push(name.clone());
                0.0
            });
            *entry += coeff;
        }
        let terms = order
            .into_iter()
            .map(|name| {
                let coeff = sums[&name];
                (name, coeff)
            })
            .filter(|(_, coeff)| coeff.abs() >= EPSILON)
            .collect();
        (terms, self.constant)
    }

    /// If this expression consolidates to exactly one term with a bare
    /// (non-constant) coefficient, return `(variable name, coefficient)`.
    /// Used to validate the "one recipe, one variable" invariant at
    /// extraction time (§7's `InternalShape`).
    pub fn as_single_var(&self) -> Option<(String, f64)> {
        let (terms, constant) = self.consolidated();
        if terms.len() == 1 && constant.abs() < EPSILON {
            let (name, coeff) = &terms[0];
            Some((name.to_string(), *coeff))
        } else {
            None
        }
    }
}

impl std::ops::Add for LinExpr {
    type Output = LinExpr;
    fn add(mut self, rhs: LinExpr) -> LinExpr {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl std::ops::Sub for LinExpr {
    type Output = LinExpr;
    fn sub(self, rhs: LinExpr) -> LinExpr {
        self + rhs.scale(-1.0)
    }
}

impl std::iter::Sum for LinExpr {
    fn sum<I: Iterator<Item = LinExpr>>(iter: I) -> Self {
        iter.fold(LinExpr::default(), |acc, x| acc + x)
    }
}

/// `expr >= rhs`. Equalities and `<=` are expressed by negation at the
/// call site (spec §3).
#[derive(Debug, Clone)]
pub struct Constraint {
    pub expr: LinExpr,
    pub rhs: f64,
}

/// Owns all variables and constraints issued for one optimization call.
/// Variable and constraint names are sanitized and must be globally
/// unique within the builder.
#[derive(Debug, Default)]
pub struct LPBuilder {
    problem_name: String,
    variables: Vec<Variable>,
    var_names: std::collections::HashSet<Rc<str>>,
    constraints: Vec<(Constraint, Rc<str>)>,
    objective: Option<LinExpr>,
}

impl LPBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_problem_name(mut self, name: impl Into<String>) -> Self {
        self.problem_name = name.into();
        self
    }

    /// Registers a fresh variable; the returned expression has exactly one
    /// term with coefficient 1.
    pub fn add_var(&mut self, name: impl AsRef<str>, kind: VarKind, lb: f64) -> LinExpr {
        let sanitized: Rc<str> = Rc::from(sanitize_identifier(name.as_ref()));
        debug_assert!(
            !self.var_names.contains(&sanitized),
            "duplicate variable name: {sanitized}"
        );
        self.var_names.insert(sanitized.clone());
        self.variables.push(Variable { name: sanitized.clone(), kind, lb });
        LinExpr::single(sanitized)
    }

    pub fn add_constraint(&mut self, expr: LinExpr, rhs: f64, name: impl AsRef<str>) {
        let sanitized: Rc<str> = Rc::from(sanitize_identifier(name.as_ref()));
        self.constraints.push((Constraint { expr, rhs }, sanitized));
    }

    pub fn set_objective(&mut self, expr: LinExpr) {
        self.objective = Some(expr);
    }

    pub fn to_lp_text(&self) -> String {
        let mut out = String::new();

        writeln!(out, "\\Problem name: {}", self.problem_name).ok();
        out.push('\n');

        out.push_str("Minimize\n");
        let (obj_terms, obj_constant) = self.objective.clone().unwrap_or_default().consolidated();
        let mut obj_units: Vec<String> =
            obj_terms.iter().map(|(name, coeff)| format_term(*coeff, name)).collect();
        if obj_constant.abs() >= EPSILON {
            obj_units.push(format_signed_number(obj_constant));
        }
        out.push_str(&wrap_line("OBJROW:", &obj_units));

        out.push_str("Subject To\n");
        for (constraint, cname) in &self.constraints {
            let (terms, constant) = constraint.expr.consolidated();
            let mut units: Vec<String> =
                terms.iter().map(|(name, coeff)| format_term(*coeff, name)).collect();
            units.push(format!(">= {}", format_number(constraint.rhs - constant)));
            let label = format!("{cname}:");
            out.push_str(&wrap_line(&label, &units));
        }

        let bounded: Vec<&Variable> =
            self.variables.iter().filter(|v| v.lb != 0.0).collect();
        if !bounded.is_empty() {
            out.push_str("Bounds\n");
            for var in bounded {
                writeln!(out, "{} <= {}", format_number(var.lb), var.name).ok();
            }
        }

        let integers: Vec<String> = self
            .variables
            .iter()
            .filter(|v| v.kind == VarKind::Integer)
            .map(|v| v.name.to_string())
            .collect();
        if !integers.is_empty() {
            out.push_str("Integers\n");
            out.push_str(&wrap_line("", &integers));
        }

        out.push_str("End\n");
        out
    }
}

fn format_number(value: f64) -> String {
    let mut s = String::new();
    write_number(&mut s, value);
    s
}

fn format_signed_number(value: f64) -> String {
    if value < 0.0 {
        format!("- {}", format_number(value.abs()))
    } else {
        format!("+ {}", format_number(value))
    }
}

/// Positive coefficients print with a leading `+`; negative coefficients
/// keep their sign (§4.1). A coefficient of exactly +/-1 omits the number.
fn format_term(coeff: f64, name: &str) -> String {
    let sign = if coeff < 0.0 { "-" } else { "+" };
    let abs = coeff.abs();
    if (abs - 1.0).abs() < EPSILON {
        format!("{sign} {name}")
    } else {
        format!("{sign} {} {name}", format_number(abs))
    }
}

fn write_number(out: &mut String, value: f64) {
    let is_whole = value.fract().abs() < 1e-9;
    if is_whole && value.abs() < 1e15 {
        write!(out, "{}", value as i64).ok();
    } else {
        write!(out, "{value:.10}").ok();
        if out.contains('.') {
            while out.ends_with('0') {
                out.pop();
            }
            if out.ends_with('.') {
                out.pop();
            }
        }
    }
}

/// Wrap `label` followed by whitespace-separated `units` at
/// [`MAX_LINE_WIDTH`] characters per line. The label always shares its
/// line with at least one unit before any wrapping decision is made;
/// continuation lines begin with a single space.
fn wrap_line(label: &str, units: &[String]) -> String {
    let mut out = String::new();
    let mut current = label.to_string();
    let mut has_unit = false;
    for unit in units {
        let sep = if current.is_empty() { "" } else { " " };
        let candidate_len = current.len() + sep.len() + unit.len();
        if has_unit && candidate_len > MAX_LINE_WIDTH {
            out.push_str(&current);
            out.push('\n');
            current = format!(" {unit}");
        } else {
            current.push_str(sep);
            current.push_str(unit);
        }
        has_unit = true;
    }
    out.push_str(&current);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_var_expr_has_one_term_coefficient_one() {
        let mut b = LPBuilder::new();
        let x = b.add_var("x", VarKind::Integer, 0.0);
        assert_eq!(x.as_single_var(), Some(("x".to_string(), 1.0)));
    }

    #[test]
    fn consolidation_sums_duplicate_terms_and_drops_tiny_coefficients() {
        let mut b = LPBuilder::new();
        let x = b.add_var("x", VarKind::Integer, 0.0);
        let expr = x.clone().scale(2.0) + x.clone().scale(-2.0 + 1e-12) + x.clone().scale(3.0);
        let (terms, _) = expr.consolidated();
        assert_eq!(terms.len(), 1);
        assert!((terms[0].1 - 3.0).abs() < 1e-6);
    }

    #[test]
    fn lp_text_has_expected_sections() {
        let mut b = LPBuilder::new();
        let x = b.add_var("Concrete_recipe", VarKind::Integer, 0.0);
        b.set_objective(x.clone());
        b.add_constraint(x, 32.0, "Concrete_output");
        let text = b.to_lp_text();
        assert!(text.contains("Minimize"));
        assert!(text.contains("Subject To"));
        assert!(text.contains("Concrete_output: + Concrete_recipe >= 32"));
        assert!(text.contains("Integers"));
        assert!(text.ends_with("End\n"));
    }

    #[test]
    fn lp_text_is_deterministic() {
        let build = || {
            let mut b = LPBuilder::new();
            let x = b.add_var("a", VarKind::Integer, 0.0);
            let y = b.add_var("b", VarKind::Integer, 0.0);
            b.set_objective(x.clone() + y.clone());
            b.add_constraint(x - y, 0.0, "balance");
            b.to_lp_text()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn wraps_long_lines_at_max_width() {
        let mut b = LPBuilder::new();
        let mut sum = LinExpr::constant(0.0);
        for i in 0..200 {
            let v = b.add_var(format!("variable_number_{i}"), VarKind::Integer, 0.0);
            sum = sum + v;
        }
        b.set_objective(sum.clone());
        b.add_constraint(sum, 0.0, "wide");
        let text = b.to_lp_text();
        for line in text.lines() {
            assert!(line.len() <= MAX_LINE_WIDTH, "line exceeded max width: {}", line.len());
        }
    }

    #[test]
    fn sanitizes_variable_and_constraint_names() {
        let mut b = LPBuilder::new();
        let v = b.add_var("Alternate: Wet Concrete", VarKind::Integer, 0.0);
        b.add_constraint(v, 0.0, "Iron Ore_balance");
        let text = b.to_lp_text();
        assert!(text.contains("Alternate_Wet_Concrete"));
        assert!(text.contains("Iron_Ore_balance"));
    }

    #[test]
    fn bounds_section_only_lists_non_default_lower_bounds() {
        let mut b = LPBuilder::new();
        let _x = b.add_var("x", VarKind::Integer, 0.0);
        let _y = b.add_var("y", VarKind::Continuous, 5.0);
        let text = b.to_lp_text();
        assert!(text.contains("Bounds"));
        assert!(text.contains("5 <= y"));
        assert!(!text.contains("0 <= x"));
    }
}
