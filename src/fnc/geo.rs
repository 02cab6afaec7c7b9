use crate::err::Error;
use crate::fnc::util::spatial;
use crate::sql::geometry::Geometry;
use crate::sql::value::Value;
use geo_types::{polygon, Polygon};

fn geometry_arg(name: &str, v: Value) -> Result<Option<Geometry>, Error> {
	match v {
		Value::Null => Ok(None),
		Value::Geometry(g) => Ok(Some(g)),
		Value::Strand(s) => Geometry::from_wkt(&s).map(Some),
		v => Err(Error::ArgumentValue {
			name: name.to_owned(),
			message: format!("expected a geometry, got {}", v.type_name()),
		}),
	}
}

/// ST_GeomFromText: parse a WKT literal into a geometry.
pub fn geom_from_text((v,): (Value,)) -> Result<Value, Error> {
	match v {
		Value::Null => Ok(Value::Null),
		Value::Geometry(g) => Ok(Value::Geometry(g)),
		Value::Strand(s) => Ok(Value::Geometry(Geometry::from_wkt(&s)?)),
		v => Err(Error::ArgumentValue {
			name: "ST_GeomFromText".to_owned(),
			message: format!("expected a WKT string, got {}", v.type_name()),
		}),
	}
}

/// ST_AsText: render a geometry as WKT.
pub fn as_text((v,): (Value,)) -> Result<Value, Error> {
	match geometry_arg("ST_AsText", v)? {
		None => Ok(Value::Null),
		Some(g) => Ok(Value::from(g.to_wkt())),
	}
}

/// ST_MakeEnvelope(xmin, ymin, xmax, ymax): an axis-aligned rectangle.
pub fn make_envelope((xmin, ymin, xmax, ymax): (Value, Value, Value, Value)) -> Result<Value, Error> {
	let mut corners = [0.0f64; 4];
	for (slot, v) in corners.iter_mut().zip([xmin, ymin, xmax, ymax]) {
		match v {
			Value::Null => return Ok(Value::Null),
			Value::Number(n) => *slot = n.as_f64(),
			v => {
				return Err(Error::ArgumentValue {
					name: "ST_MakeEnvelope".to_owned(),
					message: format!("expected a number, got {}", v.type_name()),
				})
			}
		}
	}
	let [x1, y1, x2, y2] = corners;
	let envelope: Polygon<f64> = polygon![
		(x: x1, y: y1),
		(x: x2, y: y1),
		(x: x2, y: y2),
		(x: x1, y: y2),
		(x: x1, y: y1),
	];
	Ok(Value::Geometry(envelope.into()))
}

macro_rules! predicate {
	($fn_name:ident, $name:literal, $op:path) => {
		pub fn $fn_name((a, b): (Value, Value)) -> Result<Value, Error> {
			let Some(a) = geometry_arg($name, a)? else {
				return Ok(Value::Null);
			};
			let Some(b) = geometry_arg($name, b)? else {
				return Ok(Value::Null);
			};
			Ok(Value::Bool($op(&a, &b)))
		}
	};
}

predicate!(intersects, "ST_Intersects", spatial::intersects);
predicate!(contains, "ST_Contains", spatial::contains);
predicate!(contains_properly, "ST_ContainsProperly", spatial::contains_properly);
predicate!(overlaps, "ST_Overlaps", spatial::overlaps);
predicate!(touches, "ST_Touches", spatial::touches);
predicate!(equals, "ST_Equals", spatial::equals);
predicate!(crosses, "ST_Crosses", spatial::crosses);
predicate!(covers, "ST_Covers", spatial::covers);

/// ST_Within(a, b): every point of a lies in b.
pub fn within((a, b): (Value, Value)) -> Result<Value, Error> {
	contains((b, a))
}

/// ST_CoveredBy(a, b): b covers a.
pub fn covered_by((a, b): (Value, Value)) -> Result<Value, Error> {
	covers((b, a))
}

/// ST_DWithin(a, b, distance): the geometries lie within a distance.
pub fn dwithin((a, b, d): (Value, Value, Value)) -> Result<Value, Error> {
	let Some(a) = geometry_arg("ST_DWithin", a)? else {
		return Ok(Value::Null);
	};
	let Some(b) = geometry_arg("ST_DWithin", b)? else {
		return Ok(Value::Null);
	};
	let d = match d {
		Value::Null => return Ok(Value::Null),
		Value::Number(n) => n.as_f64(),
		v => {
			return Err(Error::ArgumentValue {
				name: "ST_DWithin".to_owned(),
				message: format!("expected a distance, got {}", v.type_name()),
			})
		}
	};
	Ok(Value::Bool(spatial::dwithin(&a, &b, d)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn wkt(text: &str) -> Value {
		Value::from(text)
	}

	#[test]
	fn containment_includes_the_boundary() {
		let square = wkt("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))");
		assert_eq!(
			contains((square.clone(), wkt("POINT (5 5)"))).unwrap(),
			Value::Bool(true)
		);
		assert_eq!(
			contains((square.clone(), wkt("POINT (50 50)"))).unwrap(),
			Value::Bool(false)
		);
		assert_eq!(
			contains((square.clone(), wkt("POINT (0 5)"))).unwrap(),
			Value::Bool(true)
		);
		assert_eq!(
			contains_properly((square, wkt("POINT (0 5)"))).unwrap(),
			Value::Bool(false)
		);
	}

	#[test]
	fn envelope_behaves_like_its_polygon() {
		let envelope = make_envelope((
			Value::from(0),
			Value::from(0),
			Value::from(10),
			Value::from(10),
		))
		.unwrap();
		assert_eq!(
			intersects((envelope.clone(), wkt("POINT (3 3)"))).unwrap(),
			Value::Bool(true)
		);
		assert_eq!(within((wkt("POINT (3 3)"), envelope)).unwrap(), Value::Bool(true));
	}

	#[test]
	fn nulls_propagate() {
		assert_eq!(intersects((Value::Null, wkt("POINT (0 0)"))).unwrap(), Value::Null);
		assert_eq!(as_text((Value::Null,)).unwrap(), Value::Null);
	}

	#[test]
	fn round_trip_text() {
		let g = geom_from_text((wkt("POINT (1 2)"),)).unwrap();
		let Value::Strand(text) = as_text((g,)).unwrap() else {
			panic!("expected text");
		};
		assert!(text.contains("POINT"));
	}
}
