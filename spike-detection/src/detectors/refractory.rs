use super::Candidate;
use crate::Real;

/// Keeps a candidate only if it lies strictly after, and at least `min_gap`
/// samples after, the previously kept one. `candidates` must be in time order.
pub(crate) fn collapse_refractory(candidates: Vec<Candidate>, min_gap: Real) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match kept.last() {
            Some(last)
                if candidate.point <= last.point
                    || ((candidate.point - last.point) as Real) < min_gap => {}
            _ => kept.push(candidate),
        }
    }
    kept
}
