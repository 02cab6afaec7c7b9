//! Geometric predicates over interior/boundary/exterior classification.
//!
//! Everything reduces to three primitives: axis-aligned bounding-box
//! early rejection (boxes are memoized per geometry instance), ray-cast
//! point-in-polygon location with a boundary-distance check, and segment
//! intersection through cross-product signs with a collinear on-segment
//! fallback. Multi-part geometries decompose into their components.

use crate::sql::geometry::{Geometry, Shape};
use geo_types::{Coord, LineString, Polygon};

/// The tolerance inside which a point counts as lying on a boundary.
pub(crate) const EPSILON: f64 = 1e-10;

/// Where a point sits relative to an areal geometry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Location {
	Inside,
	Boundary,
	Outside,
}

/// One primitive component of a geometry.
enum Part<'a> {
	Point(Coord<f64>),
	Line(&'a LineString<f64>),
	Poly(&'a Polygon<f64>),
}

fn parts(g: &Geometry) -> Vec<Part<'_>> {
	match g.shape() {
		Shape::Point(p) => vec![Part::Point(p.0)],
		Shape::Line(l) => vec![Part::Line(l)],
		Shape::Polygon(p) => vec![Part::Poly(p)],
		Shape::MultiPoint(ps) => ps.iter().map(|p| Part::Point(p.0)).collect(),
		Shape::MultiLine(ls) => ls.iter().map(Part::Line).collect(),
		Shape::MultiPolygon(ps) => ps.iter().map(Part::Poly).collect(),
	}
}

fn bboxes_disjoint(a: &Geometry, b: &Geometry) -> bool {
	match (a.bbox(), b.bbox()) {
		(Some(a), Some(b)) => {
			a.min().x - EPSILON > b.max().x
				|| b.min().x - EPSILON > a.max().x
				|| a.min().y - EPSILON > b.max().y
				|| b.min().y - EPSILON > a.max().y
		}
		_ => true,
	}
}

fn dist2(a: Coord<f64>, b: Coord<f64>) -> f64 {
	let dx = a.x - b.x;
	let dy = a.y - b.y;
	dx * dx + dy * dy
}

/// The distance from a point to a segment.
fn point_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
	let len2 = dist2(a, b);
	if len2 == 0.0 {
		return dist2(p, a).sqrt();
	}
	let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / len2).clamp(0.0, 1.0);
	let proj = Coord {
		x: a.x + t * (b.x - a.x),
		y: a.y + t * (b.y - a.y),
	};
	dist2(p, proj).sqrt()
}

fn point_on_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
	point_segment_distance(p, a, b) <= EPSILON
}

fn points_coincide(a: Coord<f64>, b: Coord<f64>) -> bool {
	dist2(a, b).sqrt() <= EPSILON
}

/// The cross product of `b - a` and `c - a`: the sign names the side of
/// the line through a and b that c falls on.
fn cross(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
	(b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether two closed segments share any point: opposite cross-product
/// signs on both sides, or a collinear endpoint lying on the other
/// segment.
fn segments_intersect(a1: Coord<f64>, a2: Coord<f64>, b1: Coord<f64>, b2: Coord<f64>) -> bool {
	let d1 = cross(b1, b2, a1);
	let d2 = cross(b1, b2, a2);
	let d3 = cross(a1, a2, b1);
	let d4 = cross(a1, a2, b2);
	if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
		&& ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
	{
		return true;
	}
	point_on_segment(a1, b1, b2)
		|| point_on_segment(a2, b1, b2)
		|| point_on_segment(b1, a1, a2)
		|| point_on_segment(b2, a1, a2)
}

/// Whether two segments cross at a point interior to both.
fn segments_cross_properly(
	a1: Coord<f64>,
	a2: Coord<f64>,
	b1: Coord<f64>,
	b2: Coord<f64>,
) -> bool {
	let d1 = cross(b1, b2, a1);
	let d2 = cross(b1, b2, a2);
	let d3 = cross(a1, a2, b1);
	let d4 = cross(a1, a2, b2);
	((d1 > EPSILON && d2 < -EPSILON) || (d1 < -EPSILON && d2 > EPSILON))
		&& ((d3 > EPSILON && d4 < -EPSILON) || (d3 < -EPSILON && d4 > EPSILON))
}

/// Whether two collinear segments overlap along a run longer than the
/// tolerance.
fn collinear_overlap(a1: Coord<f64>, a2: Coord<f64>, b1: Coord<f64>, b2: Coord<f64>) -> bool {
	if cross(a1, a2, b1).abs() > EPSILON || cross(a1, a2, b2).abs() > EPSILON {
		return false;
	}
	// Project onto the dominant axis of a
	let horizontal = (a2.x - a1.x).abs() >= (a2.y - a1.y).abs();
	let project = |c: Coord<f64>| if horizontal { c.x } else { c.y };
	let (alo, ahi) = {
		let (p, q) = (project(a1), project(a2));
		(p.min(q), p.max(q))
	};
	let (blo, bhi) = {
		let (p, q) = (project(b1), project(b2));
		(p.min(q), p.max(q))
	};
	alo.max(blo) + EPSILON < ahi.min(bhi)
}

fn ring_segments(ring: &LineString<f64>) -> impl Iterator<Item = (Coord<f64>, Coord<f64>)> + '_ {
	ring.0.windows(2).map(|w| (w[0], w[1]))
}

/// Ray casting against a single ring, with the boundary handled through
/// the distance check rather than the crossing parity.
fn locate_in_ring(p: Coord<f64>, ring: &LineString<f64>) -> Location {
	for (a, b) in ring_segments(ring) {
		if point_on_segment(p, a, b) {
			return Location::Boundary;
		}
	}
	let mut inside = false;
	for (a, b) in ring_segments(ring) {
		if (a.y > p.y) != (b.y > p.y) {
			let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
			if x > p.x {
				inside = !inside;
			}
		}
	}
	if inside {
		Location::Inside
	} else {
		Location::Outside
	}
}

/// Point-in-polygon with holes: a hole boundary is still the polygon's
/// boundary, and the interior of a hole is outside.
fn locate_in_polygon(p: Coord<f64>, poly: &Polygon<f64>) -> Location {
	match locate_in_ring(p, poly.exterior()) {
		Location::Boundary => Location::Boundary,
		Location::Outside => Location::Outside,
		Location::Inside => {
			for hole in poly.interiors() {
				match locate_in_ring(p, hole) {
					Location::Boundary => return Location::Boundary,
					Location::Inside => return Location::Outside,
					Location::Outside => {}
				}
			}
			Location::Inside
		}
	}
}

fn polygon_rings(poly: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
	std::iter::once(poly.exterior()).chain(poly.interiors().iter())
}

fn line_points(line: &LineString<f64>) -> impl Iterator<Item = Coord<f64>> + '_ {
	line.0.iter().copied()
}

/// Vertices plus segment midpoints: the sample set standing in for "every
/// point" of a polyline in containment checks.
fn line_samples(line: &LineString<f64>) -> Vec<Coord<f64>> {
	let mut out: Vec<Coord<f64>> = line.0.clone();
	for (a, b) in line.0.windows(2).map(|w| (w[0], w[1])) {
		out.push(Coord {
			x: (a.x + b.x) / 2.0,
			y: (a.y + b.y) / 2.0,
		});
	}
	out
}

fn segment_intersects_line(a: Coord<f64>, b: Coord<f64>, line: &LineString<f64>) -> bool {
	ring_segments(line).any(|(c, d)| segments_intersect(a, b, c, d))
}

fn segment_properly_crosses_ring(a: Coord<f64>, b: Coord<f64>, ring: &LineString<f64>) -> bool {
	ring_segments(ring).any(|(c, d)| segments_cross_properly(a, b, c, d))
}

fn part_intersects(a: &Part, b: &Part) -> bool {
	match (a, b) {
		(Part::Point(p), Part::Point(q)) => points_coincide(*p, *q),
		(Part::Point(p), Part::Line(l)) | (Part::Line(l), Part::Point(p)) => {
			ring_segments(l).any(|(c, d)| point_on_segment(*p, c, d))
		}
		(Part::Point(p), Part::Poly(poly)) | (Part::Poly(poly), Part::Point(p)) => {
			locate_in_polygon(*p, poly) != Location::Outside
		}
		(Part::Line(l), Part::Line(m)) => ring_segments(l)
			.any(|(a1, a2)| ring_segments(m).any(|(b1, b2)| segments_intersect(a1, a2, b1, b2))),
		(Part::Line(l), Part::Poly(poly)) | (Part::Poly(poly), Part::Line(l)) => {
			line_points(l).any(|p| locate_in_polygon(p, poly) != Location::Outside)
				|| ring_segments(l).any(|(a1, a2)| {
					polygon_rings(poly).any(|ring| segment_intersects_line(a1, a2, ring))
				})
		}
		(Part::Poly(p), Part::Poly(q)) => {
			line_points(p.exterior()).any(|c| locate_in_polygon(c, q) != Location::Outside)
				|| line_points(q.exterior()).any(|c| locate_in_polygon(c, p) != Location::Outside)
				|| polygon_rings(p).any(|rp| {
					polygon_rings(q).any(|rq| {
						ring_segments(rp).any(|(a1, a2)| segment_intersects_line(a1, a2, rq))
					})
				})
		}
	}
}

/// Whether every point of `b` lies on or inside `a`.
fn part_covers(a: &Part, b: &Part) -> bool {
	match (a, b) {
		(Part::Point(p), Part::Point(q)) => points_coincide(*p, *q),
		(Part::Point(_), Part::Line(_)) | (Part::Point(_), Part::Poly(_)) => false,
		(Part::Line(l), Part::Point(p)) => {
			ring_segments(l).any(|(c, d)| point_on_segment(*p, c, d))
		}
		(Part::Line(l), Part::Line(m)) => line_samples(m)
			.into_iter()
			.all(|p| ring_segments(l).any(|(c, d)| point_on_segment(p, c, d))),
		(Part::Line(_), Part::Poly(_)) => false,
		(Part::Poly(poly), Part::Point(p)) => locate_in_polygon(*p, poly) != Location::Outside,
		(Part::Poly(poly), Part::Line(l)) => {
			line_samples(l).into_iter().all(|p| locate_in_polygon(p, poly) != Location::Outside)
				&& !ring_segments(l).any(|(a1, a2)| {
					polygon_rings(poly).any(|ring| segment_properly_crosses_ring(a1, a2, ring))
				})
		}
		(Part::Poly(p), Part::Poly(q)) => {
			line_points(q.exterior())
				.all(|c| locate_in_polygon(c, p) != Location::Outside)
				&& !polygon_rings(q).any(|rq| {
					ring_segments(rq).any(|(a1, a2)| {
						polygon_rings(p).any(|rp| segment_properly_crosses_ring(a1, a2, rp))
					})
				})
		}
	}
}

/// Whether every point of `b` lies strictly inside `a`.
fn part_covers_properly(a: &Part, b: &Part) -> bool {
	match (a, b) {
		(Part::Poly(poly), Part::Point(p)) => locate_in_polygon(*p, poly) == Location::Inside,
		(Part::Poly(poly), Part::Line(l)) => {
			line_samples(l).into_iter().all(|p| locate_in_polygon(p, poly) == Location::Inside)
				&& !ring_segments(l).any(|(a1, a2)| {
					polygon_rings(poly).any(|ring| segment_intersects_line(a1, a2, ring))
				})
		}
		(Part::Poly(p), Part::Poly(q)) => {
			line_points(q.exterior()).all(|c| locate_in_polygon(c, p) == Location::Inside)
				&& !polygon_rings(q).any(|rq| {
					ring_segments(rq).any(|(a1, a2)| {
						polygon_rings(p).any(|rp| segment_intersects_line(a1, a2, rp))
					})
				})
		}
		// Lower-dimensional carriers have no interior to properly contain
		_ => false,
	}
}

/// Whether the interiors of two parts share a point.
fn part_interiors_intersect(a: &Part, b: &Part) -> bool {
	match (a, b) {
		(Part::Point(p), Part::Point(q)) => points_coincide(*p, *q),
		(Part::Point(p), Part::Line(l)) | (Part::Line(l), Part::Point(p)) => {
			// The interior of a line excludes its two endpoints
			let interior_hit = ring_segments(l).any(|(c, d)| point_on_segment(*p, c, d));
			let first = l.0.first().copied();
			let last = l.0.last().copied();
			interior_hit
				&& !first.is_some_and(|f| points_coincide(*p, f))
				&& !last.is_some_and(|f| points_coincide(*p, f))
		}
		(Part::Point(p), Part::Poly(poly)) | (Part::Poly(poly), Part::Point(p)) => {
			locate_in_polygon(*p, poly) == Location::Inside
		}
		(Part::Line(l), Part::Line(m)) => {
			ring_segments(l).any(|(a1, a2)| {
				ring_segments(m).any(|(b1, b2)| {
					segments_cross_properly(a1, a2, b1, b2)
						|| collinear_overlap(a1, a2, b1, b2)
				})
			})
		}
		(Part::Line(l), Part::Poly(poly)) | (Part::Poly(poly), Part::Line(l)) => {
			line_samples(l).into_iter().any(|p| locate_in_polygon(p, poly) == Location::Inside)
				|| ring_segments(l).any(|(a1, a2)| {
					polygon_rings(poly).any(|ring| segment_properly_crosses_ring(a1, a2, ring))
				})
		}
		(pa @ Part::Poly(p), pb @ Part::Poly(q)) => {
			line_points(p.exterior()).any(|c| locate_in_polygon(c, q) == Location::Inside)
				|| line_points(q.exterior()).any(|c| locate_in_polygon(c, p) == Location::Inside)
				|| polygon_rings(p).any(|rp| {
					ring_segments(rp).any(|(a1, a2)| {
						polygon_rings(q)
							.any(|rq| segment_properly_crosses_ring(a1, a2, rq))
					})
				}) || part_covers(pa, pb)
				|| part_covers(pb, pa)
		}
	}
}

fn part_distance(a: &Part, b: &Part) -> f64 {
	if part_intersects(a, b) {
		return 0.0;
	}
	let point_line = |p: Coord<f64>, l: &LineString<f64>| {
		ring_segments(l)
			.map(|(c, d)| point_segment_distance(p, c, d))
			.fold(f64::INFINITY, f64::min)
	};
	let line_line = |l: &LineString<f64>, m: &LineString<f64>| {
		let a = line_points(l).map(|p| point_line(p, m)).fold(f64::INFINITY, f64::min);
		let b = line_points(m).map(|p| point_line(p, l)).fold(f64::INFINITY, f64::min);
		a.min(b)
	};
	match (a, b) {
		(Part::Point(p), Part::Point(q)) => dist2(*p, *q).sqrt(),
		(Part::Point(p), Part::Line(l)) | (Part::Line(l), Part::Point(p)) => point_line(*p, l),
		(Part::Point(p), Part::Poly(poly)) | (Part::Poly(poly), Part::Point(p)) => {
			polygon_rings(poly).map(|r| point_line(*p, r)).fold(f64::INFINITY, f64::min)
		}
		(Part::Line(l), Part::Line(m)) => line_line(l, m),
		(Part::Line(l), Part::Poly(poly)) | (Part::Poly(poly), Part::Line(l)) => {
			polygon_rings(poly).map(|r| line_line(l, r)).fold(f64::INFINITY, f64::min)
		}
		(Part::Poly(p), Part::Poly(q)) => polygon_rings(p)
			.flat_map(|rp| polygon_rings(q).map(move |rq| line_line(rp, rq)))
			.fold(f64::INFINITY, f64::min),
	}
}

/// Whether two geometries share any point.
pub(crate) fn intersects(a: &Geometry, b: &Geometry) -> bool {
	if bboxes_disjoint(a, b) {
		return false;
	}
	let pa = parts(a);
	let pb = parts(b);
	pa.iter().any(|x| pb.iter().any(|y| part_intersects(x, y)))
}

/// Whether every point of `b` lies on or inside `a`. Boundary points
/// count, so a polygon contains the points of its own edge.
pub(crate) fn contains(a: &Geometry, b: &Geometry) -> bool {
	if bboxes_disjoint(a, b) {
		return false;
	}
	let pa = parts(a);
	let pb = parts(b);
	!pb.is_empty() && pb.iter().all(|y| pa.iter().any(|x| part_covers(x, y)))
}

/// Whether every point of `b` lies strictly in the interior of `a`.
pub(crate) fn contains_properly(a: &Geometry, b: &Geometry) -> bool {
	if bboxes_disjoint(a, b) {
		return false;
	}
	let pa = parts(a);
	let pb = parts(b);
	!pb.is_empty() && pb.iter().all(|y| pa.iter().any(|x| part_covers_properly(x, y)))
}

fn interiors_intersect(a: &Geometry, b: &Geometry) -> bool {
	let pa = parts(a);
	let pb = parts(b);
	pa.iter().any(|x| pb.iter().any(|y| part_interiors_intersect(x, y)))
}

/// Same point set: mutual containment of geometries of equal dimension.
pub(crate) fn equals(a: &Geometry, b: &Geometry) -> bool {
	a.dimension() == b.dimension() && contains(a, b) && contains(b, a)
}

/// Interiors intersect, neither contains the other, and the dimensions
/// match.
pub(crate) fn overlaps(a: &Geometry, b: &Geometry) -> bool {
	a.dimension() == b.dimension()
		&& !bboxes_disjoint(a, b)
		&& interiors_intersect(a, b)
		&& !contains(a, b)
		&& !contains(b, a)
}

/// Boundaries meet while the interiors stay apart.
pub(crate) fn touches(a: &Geometry, b: &Geometry) -> bool {
	intersects(a, b) && !interiors_intersect(a, b)
}

/// The geometries meet through their interiors without either containing
/// the other, crossing dimensions or passing through.
pub(crate) fn crosses(a: &Geometry, b: &Geometry) -> bool {
	if bboxes_disjoint(a, b) {
		return false;
	}
	if a.dimension() == 0 || b.dimension() == 0 {
		return false;
	}
	if a.dimension() == b.dimension() && a.dimension() == 2 {
		return false;
	}
	if a.dimension() == 1 && b.dimension() == 1 {
		// Two lines cross at a point, not along a shared run
		let crossing = parts(a).iter().any(|x| {
			parts(b).iter().any(|y| match (x, y) {
				(Part::Line(l), Part::Line(m)) => ring_segments(l).any(|(a1, a2)| {
					ring_segments(m).any(|(b1, b2)| segments_cross_properly(a1, a2, b1, b2))
				}),
				_ => false,
			})
		});
		return crossing && !contains(a, b) && !contains(b, a);
	}
	interiors_intersect(a, b) && !contains(a, b) && !contains(b, a)
}

pub(crate) fn covers(a: &Geometry, b: &Geometry) -> bool {
	contains(a, b)
}

/// Whether the minimum distance between two geometries stays within `d`.
pub(crate) fn dwithin(a: &Geometry, b: &Geometry, d: f64) -> bool {
	if intersects(a, b) {
		return true;
	}
	let pa = parts(a);
	let pb = parts(b);
	let min = pa
		.iter()
		.flat_map(|x| pb.iter().map(move |y| part_distance(x, y)))
		.fold(f64::INFINITY, f64::min);
	min <= d
}
