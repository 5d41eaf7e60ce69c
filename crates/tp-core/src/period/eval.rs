use tp_lang::{CmpOp, Expr};

use crate::event::{FieldValue, MatchContext};

// ---------------------------------------------------------------------------
// Expression matcher
// ---------------------------------------------------------------------------

/// Evaluate a validated period expression against the current event and,
/// for end predicates, the period's begin snapshot.
///
/// Evaluation never fails: a missing field or an operand kind mismatch makes
/// the enclosing comparison false. Note the interaction with `!=` (modeled
/// as `Not(Eq)`): negating a missing-field comparison yields true. That
/// behavior is deliberate and tests rely on it.
pub fn expr_matches(expr: &Expr, cur: &MatchContext<'_>, begin: Option<&MatchContext<'_>>) -> bool {
    match expr {
        Expr::And(lhs, rhs) => expr_matches(lhs, cur, begin) && expr_matches(rhs, cur, begin),
        Expr::Not(inner) => !expr_matches(inner, cur, begin),
        Expr::Eq(lhs, rhs) => comp_matches(CmpOp::Eq, lhs, rhs, cur, begin),
        Expr::Lt(lhs, rhs) => comp_matches(CmpOp::Lt, lhs, rhs, cur, begin),
        Expr::LtEq(lhs, rhs) => comp_matches(CmpOp::LtEq, lhs, rhs, cur, begin),
        Expr::Gt(lhs, rhs) => comp_matches(CmpOp::Gt, lhs, rhs, cur, begin),
        Expr::GtEq(lhs, rhs) => comp_matches(CmpOp::GtEq, lhs, rhs, cur, begin),
        // bare leaves are not predicates
        _ => false,
    }
}

fn comp_matches(
    op: CmpOp,
    lhs: &Expr,
    rhs: &Expr,
    cur: &MatchContext<'_>,
    begin: Option<&MatchContext<'_>>,
) -> bool {
    match lhs {
        Expr::EventName { is_begin } => {
            // the grammar only pairs an event name with a string literal
            // under an equality operator
            let Some(ctx) = pick_context(*is_begin, cur, begin) else {
                return false;
            };
            let Expr::String(value) = rhs else {
                return false;
            };
            ctx.event.name == *value
        }
        Expr::EventField { .. } => {
            let Some(lv) = resolve_field(lhs, cur, begin) else {
                return false;
            };
            match rhs {
                Expr::Number(n) => compare_number_literal(op, lv, *n),
                Expr::String(s) => match lv {
                    FieldValue::String(fs) => compare_strings(op, fs, s),
                    _ => false,
                },
                Expr::EventField { .. } => match resolve_field(rhs, cur, begin) {
                    Some(rv) => compare_fields(op, lv, rv),
                    None => false,
                },
                _ => false,
            }
        }
        _ => false,
    }
}

/// `is_begin` selects the begin snapshot; refresh-opened instances carry
/// none, so such references simply never match.
fn pick_context<'a>(
    is_begin: bool,
    cur: &'a MatchContext<'a>,
    begin: Option<&'a MatchContext<'a>>,
) -> Option<&'a MatchContext<'a>> {
    if is_begin { begin } else { Some(cur) }
}

fn resolve_field<'a>(
    expr: &Expr,
    cur: &'a MatchContext<'a>,
    begin: Option<&'a MatchContext<'a>>,
) -> Option<&'a FieldValue> {
    let Expr::EventField {
        is_begin,
        scope,
        name,
    } = expr
    else {
        return None;
    };
    let ctx = pick_context(*is_begin, cur, begin)?;
    ctx.event.field_in_scope(*scope, name)
}

/// Compare a field value against a number literal. An integer field
/// truncates the literal to an integer first; any other kind pairing than
/// float/float is a mismatch.
fn compare_number_literal(op: CmpOp, field: &FieldValue, literal: f64) -> bool {
    match field {
        FieldValue::Integer(v) => cmp_ord(op, *v, literal.trunc() as i64),
        FieldValue::Float(v) => cmp_ord(op, *v, literal),
        FieldValue::String(_) => false,
    }
}

/// Ordering is undefined on strings: only equality can hold.
fn compare_strings(op: CmpOp, lhs: &str, rhs: &str) -> bool {
    match op {
        CmpOp::Eq => lhs == rhs,
        _ => false,
    }
}

/// Field-to-field comparison requires identical value kinds.
fn compare_fields(op: CmpOp, lhs: &FieldValue, rhs: &FieldValue) -> bool {
    match (lhs, rhs) {
        (FieldValue::Integer(a), FieldValue::Integer(b)) => cmp_ord(op, *a, *b),
        (FieldValue::Float(a), FieldValue::Float(b)) => cmp_ord(op, *a, *b),
        (FieldValue::String(a), FieldValue::String(b)) => compare_strings(op, a, b),
        _ => false,
    }
}

fn cmp_ord<T: PartialOrd>(op: CmpOp, lhs: T, rhs: T) -> bool {
    match op {
        CmpOp::Eq => lhs == rhs,
        CmpOp::Ne => lhs != rhs,
        CmpOp::Lt => lhs < rhs,
        CmpOp::LtEq => lhs <= rhs,
        CmpOp::Gt => lhs > rhs,
        CmpOp::GtEq => lhs >= rhs,
    }
}
