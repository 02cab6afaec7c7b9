use crate::ctx::Context;
use crate::fnc::Functions;
use crate::sql::ident;
use crate::sql::statement::SelectStatement;
use crate::sql::with::Cte;
use crate::tbl::catalog::Catalog;
use std::sync::Arc;

/// Everything an operator needs besides its inputs: the cancellation
/// context, the table catalog, the user functions, and the CTE scope in
/// force at this point of the query.
#[derive(Clone)]
pub(crate) struct QueryEnv {
	pub ctx: Context,
	pub catalog: Catalog,
	pub functions: Arc<Functions>,
	pub ctes: CteScope,
}

impl QueryEnv {
	pub(crate) fn new(ctx: Context, catalog: Catalog, functions: Arc<Functions>) -> QueryEnv {
		QueryEnv {
			ctx,
			catalog,
			functions,
			ctes: CteScope::default(),
		}
	}

	/// The environment of a nested statement: the current CTE scope
	/// extended with the statement's own WITH clause.
	pub(crate) fn for_statement(&self, statement: &SelectStatement) -> QueryEnv {
		QueryEnv {
			ctx: self.ctx.clone(),
			catalog: self.catalog.clone(),
			functions: self.functions.clone(),
			ctes: self.ctes.extended(&statement.with),
		}
	}

	/// The environment in force inside one CTE's definition: only CTEs
	/// defined before it are visible.
	pub(crate) fn with_ctes(&self, ctes: CteScope) -> QueryEnv {
		QueryEnv {
			ctx: self.ctx.clone(),
			catalog: self.catalog.clone(),
			functions: self.functions.clone(),
			ctes,
		}
	}
}

/// The ordered list of CTE definitions visible at some point of the
/// query. Later entries shadow earlier ones and table names; a CTE's
/// own definition sees only the prefix before it, which rules out
/// self-reference and mutual recursion.
#[derive(Clone, Default)]
pub(crate) struct CteScope {
	entries: Arc<Vec<(String, Arc<SelectStatement>)>>,
}

impl CteScope {
	/// Extend this scope with a statement's WITH clause, in order.
	pub(crate) fn extended(&self, ctes: &[Cte]) -> CteScope {
		if ctes.is_empty() {
			return self.clone();
		}
		let mut entries = (*self.entries).clone();
		for cte in ctes {
			entries.push((ident::normal(&cte.name), Arc::new(cte.select.clone())));
		}
		CteScope {
			entries: Arc::new(entries),
		}
	}

	/// Whether a name resolves to a CTE in this scope.
	pub(crate) fn contains(&self, name: &str) -> bool {
		let name = ident::normal(name);
		self.entries.iter().any(|(n, _)| *n == name)
	}

	/// Resolve a CTE: its definition plus the scope its definition may
	/// itself reference.
	pub(crate) fn lookup(&self, name: &str) -> Option<(Arc<SelectStatement>, CteScope)> {
		let name = ident::normal(name);
		// The last definition of a name wins
		let index = self.entries.iter().rposition(|(n, _)| *n == name)?;
		let statement = self.entries[index].1.clone();
		let visible = CteScope {
			entries: Arc::new(self.entries[..index].to_vec()),
		};
		Some((statement, visible))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cte(name: &str) -> Cte {
		Cte {
			name: name.to_owned(),
			select: SelectStatement::default(),
		}
	}

	#[test]
	fn scope_is_ordered_and_prefix_visible() {
		let scope = CteScope::default().extended(&[cte("a"), cte("B")]);
		assert!(scope.contains("A"));
		assert!(scope.contains("b"));
		let (_, visible) = scope.lookup("b").unwrap();
		assert!(visible.contains("a"));
		// A CTE does not see itself, so recursion cannot resolve
		assert!(!visible.contains("b"));
		let (_, first) = scope.lookup("a").unwrap();
		assert!(!first.contains("a"));
	}
}
