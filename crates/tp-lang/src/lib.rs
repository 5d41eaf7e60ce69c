pub mod ast;
mod error;
mod parse_utils;
pub mod period_parser;
mod validate;

pub use ast::{CmpOp, Expr, PeriodDefinition, Scope};
pub use error::ExprError;
pub use period_parser::parse_period;
pub use validate::{Side, validate};
