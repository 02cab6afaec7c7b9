use crate::sql::ident;
use crate::tbl::source::DataSource;
use std::collections::HashMap;
use std::sync::Arc;

/// The set of named tables a query may reference.
///
/// Table names resolve case-insensitively. A catalog is cheap to clone;
/// sources are shared behind [`Arc`]s.
#[derive(Clone, Default)]
pub struct Catalog {
	tables: HashMap<String, Arc<dyn DataSource>>,
}

impl Catalog {
	pub fn new() -> Catalog {
		Catalog::default()
	}

	/// Register a table, replacing any previous source of the same name.
	pub fn insert(&mut self, name: impl Into<String>, source: Arc<dyn DataSource>) {
		self.tables.insert(ident::normal(&name.into()), source);
	}

	/// Builder-style registration.
	pub fn with(mut self, name: impl Into<String>, source: Arc<dyn DataSource>) -> Catalog {
		self.insert(name, source);
		self
	}

	pub fn get(&self, name: &str) -> Option<Arc<dyn DataSource>> {
		self.tables.get(&ident::normal(name)).cloned()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.tables.contains_key(&ident::normal(name))
	}
}

impl<S: Into<String>> FromIterator<(S, Arc<dyn DataSource>)> for Catalog {
	fn from_iter<T: IntoIterator<Item = (S, Arc<dyn DataSource>)>>(iter: T) -> Self {
		let mut catalog = Catalog::new();
		for (name, source) in iter {
			catalog.insert(name, source);
		}
		catalog
	}
}
