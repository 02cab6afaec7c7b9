//! The SQL value model and the abstract syntax tree.

pub(crate) mod escape;
pub(crate) mod fmt;
pub(crate) mod ident;

pub mod array;
pub mod datetime;
pub mod expression;
pub mod field;
pub mod function;
pub mod geometry;
pub mod join;
pub mod kind;
pub mod number;
pub mod object;
pub mod operator;
pub mod order;
pub mod statement;
pub mod strand;
pub mod table;
pub mod value;
pub mod with;

pub use self::array::Array;
pub use self::datetime::{Datetime, IntervalUnit};
pub use self::expression::Expr;
pub use self::field::Field;
pub use self::function::{FunctionArg, FunctionCall};
pub use self::geometry::{Geometry, Shape};
pub use self::join::{Join, JoinKind};
pub use self::kind::CastKind;
pub use self::number::Number;
pub use self::object::Object;
pub use self::operator::{BinaryOperator, UnaryOperator};
pub use self::order::{NullsOrder, OrderItem};
pub use self::statement::SelectStatement;
pub use self::strand::Strand;
pub use self::table::TableRef;
pub use self::value::Value;
pub use self::with::Cte;
