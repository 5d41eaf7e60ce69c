use std::fmt;

// ---------------------------------------------------------------------------
// Field scopes
// ---------------------------------------------------------------------------

/// Dynamic field scope of an event field reference.
///
/// The six named scopes map one-to-one onto the trace stream format scopes;
/// `Auto` searches them in payload-first order at match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Auto,
    PacketHeader,
    PacketContext,
    EventHeader,
    StreamContext,
    EventContext,
    Payload,
}

impl Scope {
    /// The grammar prefix for this scope (empty for `Auto`).
    pub fn prefix(&self) -> &'static str {
        match self {
            Scope::Auto => "",
            Scope::PacketHeader => "$pkt_header.",
            Scope::PacketContext => "$pkt_ctx.",
            Scope::EventHeader => "$header.",
            Scope::StreamContext => "$stream_ctx.",
            Scope::EventContext => "$ctx.",
            Scope::Payload => "$payload.",
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    pub fn is_eq_op(&self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Period predicate expression.
///
/// Logical nodes compose relational nodes; only relational nodes carry leaf
/// operands. `!=` has no dedicated variant: it is built as `Not(Eq(..))`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    LtEq(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    GtEq(Box<Expr>, Box<Expr>),
    /// Number literal (always parsed as float; truncated to integer at match
    /// time when compared against an integer field).
    Number(f64),
    /// String literal.
    String(String),
    /// Event field reference, e.g. `$begin.$evt.$payload.next_tid`.
    EventField {
        is_begin: bool,
        scope: Scope,
        name: String,
    },
    /// Event name reference: `[$begin.]$evt.$name`.
    EventName { is_begin: bool },
}

impl Expr {
    /// Build the relational node for `op`, mapping `!=` to `Not(Eq(..))`.
    pub fn cmp(op: CmpOp, lhs: Expr, rhs: Expr) -> Expr {
        let lhs = Box::new(lhs);
        let rhs = Box::new(rhs);
        match op {
            CmpOp::Eq => Expr::Eq(lhs, rhs),
            CmpOp::Ne => Expr::Not(Box::new(Expr::Eq(lhs, rhs))),
            CmpOp::Lt => Expr::Lt(lhs, rhs),
            CmpOp::LtEq => Expr::LtEq(lhs, rhs),
            CmpOp::Gt => Expr::Gt(lhs, rhs),
            CmpOp::GtEq => Expr::GtEq(lhs, rhs),
        }
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }
}

/// Canonical printer. Emits the grammar form, so that parsing the printed
/// text yields the same tree for every parser-produced expression.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(lhs, rhs) => write!(f, "{lhs} && {rhs}"),
            Expr::Not(inner) => match inner.as_ref() {
                Expr::Eq(lhs, rhs) => write!(f, "{lhs} != {rhs}"),
                other => write!(f, "!({other})"),
            },
            Expr::Eq(lhs, rhs) => write!(f, "{lhs} == {rhs}"),
            Expr::Lt(lhs, rhs) => write!(f, "{lhs} < {rhs}"),
            Expr::LtEq(lhs, rhs) => write!(f, "{lhs} <= {rhs}"),
            Expr::Gt(lhs, rhs) => write!(f, "{lhs} > {rhs}"),
            Expr::GtEq(lhs, rhs) => write!(f, "{lhs} >= {rhs}"),
            Expr::Number(n) => write!(f, "{n}"),
            Expr::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
            Expr::EventField {
                is_begin,
                scope,
                name,
            } => {
                if *is_begin {
                    f.write_str("$begin.")?;
                }
                write!(f, "$evt.{}{name}", scope.prefix())
            }
            Expr::EventName { is_begin } => {
                if *is_begin {
                    f.write_str("$begin.")?;
                }
                f.write_str("$evt.$name")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Period definition
// ---------------------------------------------------------------------------

/// A named (or anonymous) period definition: begin and end predicates.
///
/// When the source text carried no end clause, `end_expr` is a copy of
/// `begin_expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodDefinition {
    pub name: Option<String>,
    pub begin_expr: Expr,
    pub end_expr: Expr,
}

impl fmt::Display for PeriodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            f.write_str(name)?;
        }
        write!(f, ":{}", self.begin_expr)?;
        if self.end_expr != self.begin_expr {
            write!(f, ":{}", self.end_expr)?;
        }
        Ok(())
    }
}
