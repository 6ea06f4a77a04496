//! Multi-stop route planning.
//!
//! Greedy nearest-neighbor ordering: O(n²), fine for per-route stop counts.
//! The allocator never calls this; it assigns one delivery per drone.

use fleet_domain::{BASE, Delivery, Point};

/// Order `stops` by repeatedly visiting the nearest remaining one.
///
/// Ties go to the stop that came first in `stops`. A stop whose distance is
/// `NaN` is treated as infinitely far away.
pub fn optimal_route(stops: &[Delivery], start_x: f64, start_y: f64) -> Vec<Delivery> {
    let mut remaining: Vec<&Delivery> = stops.iter().collect();
    let mut route = Vec::with_capacity(stops.len());
    let mut current = Point::new(start_x, start_y);

    while !remaining.is_empty() {
        let nearest = nearest_index(&remaining, &current);
        let stop = remaining.remove(nearest);
        current = stop.position;
        route.push(stop.clone());
    }

    route
}

/// Total length of `route` from the start, through every stop, back to base.
pub fn route_distance(route: &[Delivery], start_x: f64, start_y: f64) -> f64 {
    if route.is_empty() {
        return 0.0;
    }

    let mut current = Point::new(start_x, start_y);
    let mut total = 0.0;
    for stop in route {
        total += current.distance_to(&stop.position);
        current = stop.position;
    }
    total + current.distance_to(&BASE)
}

fn nearest_index(candidates: &[&Delivery], from: &Point) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, stop) in candidates.iter().enumerate() {
        let d = from.distance_to(&stop.position);
        let d = if d.is_nan() { f64::INFINITY } else { d };
        if d < best_distance {
            best = i;
            best_distance = d;
        }
    }
    best
}
