use thiserror::Error;

/// Fatal errors surfaced by the optimizer and balancer core. None are
/// retried internally; the host presents them to the user.
///
/// `MissingEconomyEntry` from the error table is not a variant here — the
/// spec classifies it as non-fatal, so it surfaces as a `log::warn!`
/// diagnostic instead of a propagated error.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("unknown recipe(s) in enablement set: {}", .0.join(", "))]
    UnknownRecipe(Vec<String>),

    #[error("output item(s) produced or consumed by no enabled recipe: {}", .0.join(", "))]
    UnknownOutput(Vec<String>),

    #[error(
        "no feasible plan meets the requested outputs{}",
        if *design_power { " and power balance" } else { "" }
    )]
    FactoryInfeasible { design_power: bool },

    #[error("internal shape invariant violated: {0}")]
    InternalShape(String),

    #[error(
        "belt balance is infeasible: inputs sum to {inputs_sum} but outputs sum to {outputs_sum}"
    )]
    InfeasibleBalance { inputs_sum: u64, outputs_sum: u64 },

    /// Not one of §7's rows: the solver bridge itself failed (I/O, an
    /// unparseable result) rather than reporting a non-optimal status.
    #[error("solver bridge failed: {0}")]
    Solver(#[from] crate::solver::SolverBridgeError),
}
