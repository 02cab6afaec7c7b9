#![allow(clippy::derived_hash_with_manual_eq)]

use crate::err::Error;
use geo::algorithm::bounding_rect::BoundingRect;
use geo_types::{LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon, Rect};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::hash;
use std::sync::Arc;
use wkt::{ToWkt, TryFromWkt};

/// An opaque geometry value.
///
/// The shape is shared behind an [`Arc`] so clones keep one identity: the
/// bounding box is computed once per geometry instance and every copy made
/// while a value flows through the pipeline reuses it.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Geometry(Arc<Inner>);

#[derive(Debug)]
struct Inner {
	shape: Shape,
	bbox: OnceCell<Option<Rect<f64>>>,
}

/// The geometry kinds understood by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Shape {
	Point(Point<f64>),
	Line(LineString<f64>),
	Polygon(Polygon<f64>),
	MultiPoint(MultiPoint<f64>),
	MultiLine(MultiLineString<f64>),
	MultiPolygon(MultiPolygon<f64>),
}

impl From<Shape> for Geometry {
	fn from(shape: Shape) -> Self {
		Geometry(Arc::new(Inner {
			shape,
			bbox: OnceCell::new(),
		}))
	}
}

impl From<Point<f64>> for Geometry {
	fn from(v: Point<f64>) -> Self {
		Shape::Point(v).into()
	}
}

impl From<LineString<f64>> for Geometry {
	fn from(v: LineString<f64>) -> Self {
		Shape::Line(v).into()
	}
}

impl From<Polygon<f64>> for Geometry {
	fn from(v: Polygon<f64>) -> Self {
		Shape::Polygon(v).into()
	}
}

impl From<MultiPoint<f64>> for Geometry {
	fn from(v: MultiPoint<f64>) -> Self {
		Shape::MultiPoint(v).into()
	}
}

impl From<MultiLineString<f64>> for Geometry {
	fn from(v: MultiLineString<f64>) -> Self {
		Shape::MultiLine(v).into()
	}
}

impl From<MultiPolygon<f64>> for Geometry {
	fn from(v: MultiPolygon<f64>) -> Self {
		Shape::MultiPolygon(v).into()
	}
}

impl Geometry {
	/// Access the underlying shape.
	pub fn shape(&self) -> &Shape {
		&self.0.shape
	}

	/// Parse a geometry from its WKT representation.
	pub fn from_wkt(text: &str) -> Result<Geometry, Error> {
		let geom: geo_types::Geometry<f64> =
			geo_types::Geometry::try_from_wkt_str(text).map_err(|e| Error::ArgumentValue {
				name: "ST_GeomFromText".to_owned(),
				message: format!("invalid WKT: {e}"),
			})?;
		Self::try_from(geom)
	}

	/// Render this geometry as WKT.
	pub fn to_wkt(&self) -> String {
		self.as_geo().wkt_string()
	}

	/// The axis-aligned bounding box, computed once per geometry instance.
	/// Empty geometries have no box.
	pub fn bbox(&self) -> Option<Rect<f64>> {
		*self.0.bbox.get_or_init(|| self.as_geo().bounding_rect())
	}

	fn as_geo(&self) -> geo_types::Geometry<f64> {
		match self.shape() {
			Shape::Point(v) => geo_types::Geometry::Point(*v),
			Shape::Line(v) => geo_types::Geometry::LineString(v.clone()),
			Shape::Polygon(v) => geo_types::Geometry::Polygon(v.clone()),
			Shape::MultiPoint(v) => geo_types::Geometry::MultiPoint(v.clone()),
			Shape::MultiLine(v) => geo_types::Geometry::MultiLineString(v.clone()),
			Shape::MultiPolygon(v) => geo_types::Geometry::MultiPolygon(v.clone()),
		}
	}

	/// The highest dimension of this shape: 0 for points, 1 for lines, 2
	/// for polygons.
	pub(crate) fn dimension(&self) -> u8 {
		match self.shape() {
			Shape::Point(_) | Shape::MultiPoint(_) => 0,
			Shape::Line(_) | Shape::MultiLine(_) => 1,
			Shape::Polygon(_) | Shape::MultiPolygon(_) => 2,
		}
	}
}

impl TryFrom<geo_types::Geometry<f64>> for Geometry {
	type Error = Error;
	fn try_from(geom: geo_types::Geometry<f64>) -> Result<Self, Self::Error> {
		let shape = match geom {
			geo_types::Geometry::Point(v) => Shape::Point(v),
			geo_types::Geometry::LineString(v) => Shape::Line(v),
			geo_types::Geometry::Polygon(v) => Shape::Polygon(v),
			geo_types::Geometry::MultiPoint(v) => Shape::MultiPoint(v),
			geo_types::Geometry::MultiLineString(v) => Shape::MultiLine(v),
			geo_types::Geometry::MultiPolygon(v) => Shape::MultiPolygon(v),
			other => {
				return Err(Error::Unsupported(format!(
					"geometry kind {} is not supported",
					kind_name(&other)
				)))
			}
		};
		Ok(shape.into())
	}
}

fn kind_name(geom: &geo_types::Geometry<f64>) -> &'static str {
	match geom {
		geo_types::Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
		geo_types::Geometry::Rect(_) => "RECT",
		geo_types::Geometry::Triangle(_) => "TRIANGLE",
		geo_types::Geometry::Line(_) => "LINE",
		_ => "GEOMETRY",
	}
}

impl PartialEq for Geometry {
	fn eq(&self, other: &Self) -> bool {
		self.shape() == other.shape()
	}
}

impl Eq for Geometry {}

impl hash::Hash for Geometry {
	fn hash<H: hash::Hasher>(&self, state: &mut H) {
		self.to_wkt().hash(state)
	}
}

impl Serialize for Geometry {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.shape().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Geometry {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Shape::deserialize(deserializer).map(Into::into)
	}
}

impl Display for Geometry {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.write_str(&self.to_wkt())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wkt_round_trip() {
		let g = Geometry::from_wkt("POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))").unwrap();
		assert!(matches!(g.shape(), Shape::Polygon(_)));
		let text = g.to_wkt();
		let h = Geometry::from_wkt(&text).unwrap();
		assert_eq!(g, h);
	}

	#[test]
	fn bbox_is_shared_between_clones() {
		let g = Geometry::from_wkt("LINESTRING (0 0, 4 2, 2 8)").unwrap();
		let clone = g.clone();
		let rect = g.bbox().unwrap();
		assert_eq!(rect.min().x, 0.0);
		assert_eq!(rect.max().x, 4.0);
		assert_eq!(rect.max().y, 8.0);
		// The clone shares the memoized box through the same allocation
		assert_eq!(clone.bbox(), g.bbox());
	}

	#[test]
	fn collections_are_rejected() {
		assert!(Geometry::from_wkt("GEOMETRYCOLLECTION (POINT (1 1))").is_err());
	}
}
