use crate::models::{Geometry, PolygonRings, Ring};

/// Smallest valid closed ring: a triangle plus its closing point.
const MIN_RING_POINTS: usize = 4;

/// Simplify every ring of `geometry` with Douglas-Peucker.
///
/// Rings that would collapse below a triangle are left untouched, so the
/// output has the same polygons and rings as the input.
pub fn simplify_geometry(geometry: &Geometry, tolerance: f64) -> Geometry {
    let polygon = |p: &PolygonRings| -> PolygonRings {
        p.iter().map(|r| simplify_ring(r, tolerance)).collect()
    };
    match geometry {
        Geometry::Polygon(p) => Geometry::Polygon(polygon(p)),
        Geometry::MultiPolygon(ps) => Geometry::MultiPolygon(ps.iter().map(polygon).collect()),
    }
}

pub fn simplify_ring(ring: &Ring, tolerance: f64) -> Ring {
    if tolerance <= 0.0 || ring.len() <= MIN_RING_POINTS {
        return ring.clone();
    }

    // Split the closed ring at its farthest point from the start so both
    // halves have distinct endpoints.
    let start = ring[0];
    let split = (1..ring.len() - 1)
        .max_by(|&a, &b| {
            dist2(ring[a], start)
                .partial_cmp(&dist2(ring[b], start))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(ring.len() / 2);

    let mut keep = vec![false; ring.len()];
    keep[0] = true;
    keep[split] = true;
    keep[ring.len() - 1] = true;
    mark(ring, 0, split, tolerance, &mut keep);
    mark(ring, split, ring.len() - 1, tolerance, &mut keep);

    let simplified: Ring = ring
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(p, _)| *p)
        .collect();

    if simplified.len() < MIN_RING_POINTS {
        ring.clone()
    } else {
        simplified
    }
}

/// Douglas-Peucker over `ring[first..=last]`, flagging points to keep.
fn mark(ring: &Ring, first: usize, last: usize, tolerance: f64, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }
    let (index, distance) = ((first + 1)..last)
        .map(|i| (i, segment_distance(ring[i], ring[first], ring[last])))
        .fold((first, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if distance > tolerance {
        keep[index] = true;
        mark(ring, first, index, tolerance, keep);
        mark(ring, index, last, tolerance, keep);
    }
}

fn dist2(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let len2 = dist2(a, b);
    if len2 == 0.0 {
        return dist2(p, a).sqrt();
    }
    let t = (((p.0 - a.0) * (b.0 - a.0) + (p.1 - a.1) * (b.1 - a.1)) / len2).clamp(0.0, 1.0);
    let proj = (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1));
    dist2(p, proj).sqrt()
}
