use super::{Real, Window};
use std::collections::VecDeque;

/// Smoothing coefficients of a Savitzky-Golay filter of odd length `points`
/// and polynomial order `order`, or `None` if the least-squares system is
/// singular.
///
/// The coefficients are the row of the pseudo-inverse of the Vandermonde
/// matrix `J[i][k] = i^k` which evaluates the fitted polynomial at the centre
/// of the window. `(JᵀJ) x = e₀` is solved by Gauss-Jordan elimination and the
/// coefficient at offset `i` is then `Σₖ xₖ iᵏ`.
pub(crate) fn savitzky_golay_coefficients(points: usize, order: usize) -> Option<Vec<Real>> {
    if points % 2 == 0 || order >= points {
        return None;
    }
    let half = (points / 2) as Real;
    let terms = order + 1;
    let offsets: Vec<Real> = (0..points).map(|i| i as Real - half).collect();

    // Augmented normal equations [JᵀJ | e₀]
    let mut system: Vec<Vec<Real>> = (0..terms)
        .map(|row| {
            (0..terms)
                .map(|col| offsets.iter().map(|x| x.powi((row + col) as i32)).sum())
                .chain(std::iter::once(if row == 0 { 1.0 } else { 0.0 }))
                .collect()
        })
        .collect();

    for col in 0..terms {
        let pivot_row = (col..terms).max_by(|&a, &b| {
            system[a][col].abs().total_cmp(&system[b][col].abs())
        })?;
        system.swap(col, pivot_row);

        let pivot = system[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }
        for value in system[col].iter_mut() {
            *value /= pivot;
        }
        let pivot_values = system[col].clone();
        for (row, values) in system.iter_mut().enumerate() {
            if row != col {
                let factor = values[col];
                for (value, pivot_value) in values.iter_mut().zip(&pivot_values) {
                    *value -= factor * pivot_value;
                }
            }
        }
    }

    let solution: Vec<Real> = system.iter().map(|row| row[terms]).collect();
    Some(
        offsets
            .iter()
            .map(|x| {
                solution
                    .iter()
                    .enumerate()
                    .map(|(k, s)| s * x.powi(k as i32))
                    .sum()
            })
            .collect(),
    )
}

#[derive(Clone)]
pub(crate) struct SavitzkyGolayWindow<'a> {
    coefficients: &'a [Real],
    values: VecDeque<Real>,
}

impl<'a> SavitzkyGolayWindow<'a> {
    pub(crate) fn new(coefficients: &'a [Real]) -> Self {
        SavitzkyGolayWindow {
            coefficients,
            values: VecDeque::with_capacity(coefficients.len() + 1),
        }
    }
}

impl Window for SavitzkyGolayWindow<'_> {
    fn push(&mut self, value: Real) -> bool {
        self.values.push_back(value);
        if self.values.len() > self.coefficients.len() {
            self.values.pop_front();
        }
        self.values.len() == self.coefficients.len()
    }

    fn output(&self) -> Option<Real> {
        (self.values.len() == self.coefficients.len()).then(|| {
            self.values
                .iter()
                .zip(self.coefficients)
                .map(|(value, coefficient)| value * coefficient)
                .sum()
        })
    }

    fn apply_time_shift(&self, time: Real) -> Real {
        time - (self.coefficients.len() / 2) as Real
    }
}
