//! Distance to similarity conversion

/// Map an L2 distance onto a bounded similarity: `1 / (1 + exp(d / scale))`
///
/// Decreases monotonically from 0.5 at `d = 0` towards 0. Non-finite or
/// negative distances are treated as 0.
pub fn similarity_from_distance(distance: f32, scale: f32) -> f32 {
    let distance = if distance.is_finite() && distance > 0.0 {
        distance
    } else {
        0.0
    };
    1.0 / (1.0 + (distance / scale).exp())
}
