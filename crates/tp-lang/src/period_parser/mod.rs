use winnow::combinator::{alt, cut_err, opt};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

use crate::ast::{CmpOp, Expr, PeriodDefinition, Scope};
use crate::error::ExprError;
use crate::parse_utils::{ident, number_literal, quoted_string, ws_skip};
use crate::validate::{Side, validate};


// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse one period argument of the shape `[<name>]:<begin>[:<end>]` and
/// validate both sides.
///
/// The whole input must be consumed; any leftover or grammar failure maps to
/// [`ExprError::MalformedExpression`] carrying the original argument.
pub fn parse_period(input: &str) -> Result<PeriodDefinition, ExprError> {
    let def = period
        .parse(input)
        .map_err(|_| ExprError::MalformedExpression(input.to_string()))?;
    validate(&def.begin_expr, Side::Begin)?;
    validate(&def.end_expr, Side::End)?;
    Ok(def)
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

fn period(input: &mut &str) -> ModalResult<PeriodDefinition> {
    ws_skip.parse_next(input)?;
    let name = opt(period_name).parse_next(input)?;
    ws_skip.parse_next(input)?;
    literal(":").parse_next(input)?;
    let begin_expr = conj_expr.parse_next(input)?;
    let end_expr = if opt(literal(":")).parse_next(input)?.is_some() {
        cut_err(conj_expr).parse_next(input)?
    } else {
        begin_expr.clone()
    };
    ws_skip.parse_next(input)?;
    Ok(PeriodDefinition {
        name: name.map(str::to_string),
        begin_expr,
        end_expr,
    })
}

fn period_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    })
    .parse_next(input)
}

/// `conj = atom { "&&" atom }`, folded into a left-leaning `And` chain.
fn conj_expr(input: &mut &str) -> ModalResult<Expr> {
    ws_skip.parse_next(input)?;
    let mut expr = atom.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        if opt(literal("&&")).parse_next(input)?.is_some() {
            ws_skip.parse_next(input)?;
            let rhs = cut_err(atom).parse_next(input)?;
            expr = Expr::and(expr, rhs);
        } else {
            break;
        }
    }
    Ok(expr)
}

/// One comparison: `<name-ref> eqop qstring`, `<field> relop number`,
/// `<field> eqop qstring` or `<field> relop <field>`.
fn atom(input: &mut &str) -> ModalResult<Expr> {
    let lhs = field_or_name.parse_next(input)?;
    ws_skip.parse_next(input)?;
    let op = relop.parse_next(input)?;
    ws_skip.parse_next(input)?;
    match lhs {
        Expr::EventName { .. } => {
            // event name only compares equal/unequal to a string literal
            if !op.is_eq_op() {
                return Err(ErrMode::Backtrack(ContextError::new()));
            }
            let value = quoted_string.parse_next(input)?;
            Ok(Expr::cmp(op, lhs, Expr::String(value)))
        }
        _ => {
            let rhs = rhs_term.parse_next(input)?;
            if matches!(rhs, Expr::String(_)) && !op.is_eq_op() {
                return Err(ErrMode::Backtrack(ContextError::new()));
            }
            Ok(Expr::cmp(op, lhs, rhs))
        }
    }
}

fn rhs_term(input: &mut &str) -> ModalResult<Expr> {
    alt((
        number_literal.map(Expr::Number),
        quoted_string.map(Expr::String),
        field_or_name,
    ))
    .parse_next(input)
}

/// `[$begin.] $evt. ( $name | [scope] ident )`
fn field_or_name(input: &mut &str) -> ModalResult<Expr> {
    let is_begin = opt(literal("$begin.")).parse_next(input)?.is_some();
    literal("$evt.").parse_next(input)?;
    if opt(literal("$name")).parse_next(input)?.is_some() {
        return Ok(Expr::EventName { is_begin });
    }
    let scope = dyn_scope.parse_next(input)?;
    let name = ident.parse_next(input)?;
    Ok(Expr::EventField {
        is_begin,
        scope,
        name: name.to_string(),
    })
}

fn dyn_scope(input: &mut &str) -> ModalResult<Scope> {
    let scope = opt(alt((
        literal("$pkt_header.").value(Scope::PacketHeader),
        literal("$pkt_ctx.").value(Scope::PacketContext),
        literal("$header.").value(Scope::EventHeader),
        literal("$stream_ctx.").value(Scope::StreamContext),
        literal("$ctx.").value(Scope::EventContext),
        literal("$payload.").value(Scope::Payload),
    )))
    .parse_next(input)?;
    Ok(scope.unwrap_or(Scope::Auto))
}

fn relop(input: &mut &str) -> ModalResult<CmpOp> {
    alt((
        literal("==").value(CmpOp::Eq),
        literal("!=").value(CmpOp::Ne),
        literal("<=").value(CmpOp::LtEq),
        literal(">=").value(CmpOp::GtEq),
        literal("<").value(CmpOp::Lt),
        literal(">").value(CmpOp::Gt),
    ))
    .parse_next(input)
}
