use crate::ast::Expr;
use crate::error::ExprError;

/// Which side of a period definition an expression sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Begin,
    End,
}

/// Structural validation of a parsed expression.
///
/// A begin-side expression must not reference the begin context: at the time
/// a begin predicate is evaluated, no begin event exists yet. Operand kinds
/// are not checked here; mismatches degrade to a non-match at evaluation
/// time.
pub fn validate(expr: &Expr, side: Side) -> Result<(), ExprError> {
    match expr {
        Expr::And(lhs, rhs) => {
            validate(lhs, side)?;
            validate(rhs, side)
        }
        Expr::Not(inner) => validate(inner, side),
        Expr::Eq(lhs, rhs)
        | Expr::Lt(lhs, rhs)
        | Expr::LtEq(lhs, rhs)
        | Expr::Gt(lhs, rhs)
        | Expr::GtEq(lhs, rhs) => {
            check_operand(lhs, side)?;
            check_operand(rhs, side)
        }
        // Bare leaves only occur under relational nodes.
        _ => Ok(()),
    }
}

fn check_operand(expr: &Expr, side: Side) -> Result<(), ExprError> {
    if side != Side::Begin {
        return Ok(());
    }
    match expr {
        Expr::EventField { is_begin: true, .. } | Expr::EventName { is_begin: true } => {
            Err(ExprError::IllegalExpression {
                reason: "begin context referenced in begin expression".to_string(),
                node: expr.to_string(),
            })
        }
        _ => Ok(()),
    }
}
