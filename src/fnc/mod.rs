//! Executes scalar functions referenced from SQL. Every builtin lives in a
//! submodule of this module; user functions override builtins of the same
//! name.

use crate::ctx::Context;
use crate::dbs::env::QueryEnv;
use crate::err::Error;
use crate::sql::ident;
use crate::sql::value::Value;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

pub mod args;
pub mod geo;
pub mod json;
pub mod math;
pub mod operate;
pub mod rand;
pub mod string;
pub mod time;
pub(crate) mod util;

/// The number of arguments a function accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
	Exact(usize),
	Range(usize, usize),
	AtLeast(usize),
}

impl Arity {
	pub fn accepts(&self, n: usize) -> bool {
		match self {
			Arity::Exact(e) => n == *e,
			Arity::Range(lo, hi) => (*lo..=*hi).contains(&n),
			Arity::AtLeast(lo) => n >= *lo,
		}
	}
}

impl fmt::Display for Arity {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Arity::Exact(e) => write!(f, "{e}"),
			Arity::Range(lo, hi) => write!(f, "{lo} to {hi}"),
			Arity::AtLeast(lo) => write!(f, "at least {lo}"),
		}
	}
}

/// What the parser needs to know about a function before execution.
#[derive(Clone, Copy, Debug)]
pub struct Descriptor {
	pub arity: Arity,
	/// Whether a bare `*` is accepted as the only argument
	pub star: bool,
	/// Whether this is an aggregate function
	pub aggregate: bool,
}

const fn scalar(arity: Arity) -> Descriptor {
	Descriptor {
		arity,
		star: false,
		aggregate: false,
	}
}

const fn aggregate(arity: Arity) -> Descriptor {
	Descriptor {
		arity,
		star: false,
		aggregate: true,
	}
}

/// Look up the descriptor of a builtin function, case-insensitively.
pub fn descriptor(name: &str) -> Option<Descriptor> {
	let desc = match ident::normal(name).as_str() {
		// String
		"upper" | "lower" | "length" | "trim" => scalar(Arity::Exact(1)),
		"concat" => scalar(Arity::AtLeast(1)),
		"substring" | "substr" => scalar(Arity::Range(2, 3)),
		"replace" => scalar(Arity::Exact(3)),
		"left" | "right" | "instr" => scalar(Arity::Exact(2)),
		"regexp_substr" => scalar(Arity::Range(2, 4)),
		"regexp_replace" => scalar(Arity::Range(3, 5)),
		// Math
		"floor" | "ceil" | "ceiling" | "abs" | "sign" | "exp" | "ln" | "log10" | "sqrt" => {
			scalar(Arity::Exact(1))
		}
		"round" => scalar(Arity::Range(1, 2)),
		"mod" | "power" => scalar(Arity::Exact(2)),
		// Trigonometry
		"sin" | "cos" | "tan" | "cot" | "asin" | "acos" | "degrees" | "radians" => {
			scalar(Arity::Exact(1))
		}
		"atan" => scalar(Arity::Range(1, 2)),
		"atan2" => scalar(Arity::Exact(2)),
		"pi" => scalar(Arity::Exact(0)),
		// Date and time
		"current_date" | "current_timestamp" => scalar(Arity::Exact(0)),
		"random" | "rand" => scalar(Arity::Exact(0)),
		// JSON
		"json_value" | "json_query" => scalar(Arity::Exact(2)),
		"json_object" => scalar(Arity::AtLeast(0)),
		// Spatial
		"st_geomfromtext" | "st_astext" => scalar(Arity::Exact(1)),
		"st_makeenvelope" => scalar(Arity::Exact(4)),
		"st_intersects" | "st_contains" | "st_containsproperly" | "st_within"
		| "st_overlaps" | "st_touches" | "st_equals" | "st_crosses" | "st_covers"
		| "st_coveredby" => scalar(Arity::Exact(2)),
		"st_dwithin" => scalar(Arity::Exact(3)),
		// Aggregates
		"count" => Descriptor {
			arity: Arity::Exact(1),
			star: true,
			aggregate: true,
		},
		"sum" | "avg" | "min" | "max" | "stddev_pop" | "stddev_samp" | "json_arrayagg" => {
			aggregate(Arity::Exact(1))
		}
		_ => return None,
	};
	Some(desc)
}

/// Whether a function name refers to an aggregate.
pub fn is_aggregate(name: &str) -> bool {
	descriptor(name).map(|d| d.aggregate).unwrap_or(false)
}

/// A user-defined scalar function.
pub type Udf =
	dyn Fn(Vec<Value>, Context) -> BoxFuture<'static, Result<Value, Error>> + Send + Sync;

/// A case-insensitive registry of user functions. A user function with
/// the name of a builtin overrides the builtin.
#[derive(Clone, Default)]
pub struct Functions {
	map: HashMap<String, Arc<Udf>>,
}

impl Debug for Functions {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.debug_struct("Functions").field("names", &self.map.keys().collect::<Vec<_>>()).finish()
	}
}

impl Functions {
	pub fn new() -> Functions {
		Functions::default()
	}

	/// Register a user function under a case-insensitive name.
	pub fn register<F, Fut>(&mut self, name: impl Into<String>, f: F)
	where
		F: Fn(Vec<Value>, Context) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Value, Error>> + Send + 'static,
	{
		let f = Arc::new(move |args: Vec<Value>, ctx: Context| {
			let fut = f(args, ctx);
			Box::pin(fut) as BoxFuture<'static, Result<Value, Error>>
		});
		self.map.insert(ident::normal(&name.into()), f);
	}

	pub fn get(&self, name: &str) -> Option<Arc<Udf>> {
		self.map.get(&ident::normal(name)).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.map.contains_key(&ident::normal(name))
	}

	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}
}

/// Run a scalar function: user functions first, then builtins.
pub(crate) async fn run(env: &QueryEnv, name: &str, args: Vec<Value>) -> Result<Value, Error> {
	if let Some(udf) = env.functions.get(name) {
		return udf(args, env.ctx.clone()).await;
	}
	synchronous(name, args)
}

/// Each function is specified by its lowercased name followed by the path
/// of the implementing function, which receives its arguments through
/// [`args::FromArgs`].
macro_rules! dispatch {
	($name: ident, $args: ident, $($function_name: literal => $($function_path: ident)::+,)+) => {
		{
			match crate::sql::ident::normal($name).as_str() {
				$($function_name => {
					let args = args::FromArgs::from_args($name, $args)?;
					$($function_path)::+(args)
				},)+
				_ => {
					Err(Error::UnknownFunction(String::from($name)))
				}
			}
		}
	};
}

/// Attempts to run any builtin function.
pub(crate) fn synchronous(name: &str, args: Vec<Value>) -> Result<Value, Error> {
	dispatch!(
		name,
		args,
		"upper" => string::upper,
		"lower" => string::lower,
		"concat" => string::concat,
		"length" => string::length,
		"substring" => string::substring,
		"substr" => string::substring,
		"trim" => string::trim,
		"replace" => string::replace,
		"left" => string::left,
		"right" => string::right,
		"instr" => string::instr,
		"regexp_substr" => string::regexp_substr,
		"regexp_replace" => string::regexp_replace,
		//
		"floor" => math::floor,
		"ceil" => math::ceil,
		"ceiling" => math::ceil,
		"round" => math::round,
		"abs" => math::abs,
		"sign" => math::sign,
		"mod" => math::modulo,
		"exp" => math::exp,
		"ln" => math::ln,
		"log10" => math::log10,
		"power" => math::power,
		"sqrt" => math::sqrt,
		"sin" => math::sin,
		"cos" => math::cos,
		"tan" => math::tan,
		"cot" => math::cot,
		"asin" => math::asin,
		"acos" => math::acos,
		"atan" => math::atan,
		"atan2" => math::atan2,
		"degrees" => math::degrees,
		"radians" => math::radians,
		"pi" => math::pi,
		//
		"current_date" => time::current_date,
		"current_timestamp" => time::current_timestamp,
		"random" => rand::random,
		"rand" => rand::random,
		//
		"json_value" => json::json_value,
		"json_query" => json::json_query,
		"json_object" => json::json_object,
		//
		"st_geomfromtext" => geo::geom_from_text,
		"st_astext" => geo::as_text,
		"st_makeenvelope" => geo::make_envelope,
		"st_intersects" => geo::intersects,
		"st_contains" => geo::contains,
		"st_containsproperly" => geo::contains_properly,
		"st_within" => geo::within,
		"st_overlaps" => geo::overlaps,
		"st_touches" => geo::touches,
		"st_equals" => geo::equals,
		"st_crosses" => geo::crosses,
		"st_covers" => geo::covers,
		"st_coveredby" => geo::covered_by,
		"st_dwithin" => geo::dwithin,
	)
}
