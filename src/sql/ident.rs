/// Normalize an identifier for case-insensitive resolution.
///
/// Every lookup in the engine goes through this one function: CTE names,
/// table names, function names and column names. Storage keeps the original
/// casing; only comparisons normalize.
pub(crate) fn normal(ident: &str) -> String {
	ident.to_lowercase()
}

/// Compare two identifiers case-insensitively without allocating.
pub(crate) fn same(a: &str, b: &str) -> bool {
	a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn case_insensitive_matching() {
		assert!(same("Users", "users"));
		assert!(same("CITY", "city"));
		assert!(!same("city", "cite"));
		assert_eq!(normal("MyTable"), "mytable");
	}
}
