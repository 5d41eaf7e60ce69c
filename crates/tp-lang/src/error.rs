/// Errors produced while turning a period argument string into a validated
/// [`PeriodDefinition`](crate::ast::PeriodDefinition).
///
/// Both variants are fatal to the command that supplied the expression;
/// match-time lookup failures are not errors and never surface here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    /// The parser could not consume the whole input. Carries the original
    /// argument text; no partial tree is ever returned.
    #[error("malformed period expression: `{0}`")]
    MalformedExpression(String),
    /// The validator rejected a structurally well-formed expression.
    #[error("illegal expression ({reason}): `{node}`")]
    IllegalExpression { reason: String, node: String },
}
