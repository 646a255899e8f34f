// src/utils.rs
use ndarray::{Array1, Array2};

/// Pivots smaller than this are treated as singular.
const PIVOT_EPSILON: f64 = 1e-12;

/// Solves the square system `a * x = b` by Gaussian elimination with partial
/// pivoting. Returns `None` if `a` is not square, `b` does not match, or the
/// system is (numerically) singular.
pub fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return None;
    }
    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        // Pick the row with the largest magnitude in this column.
        let mut pivot_row = col;
        for row in (col + 1)..n {
            if m[[row, col]].abs() > m[[pivot_row, col]].abs() {
                pivot_row = row;
            }
        }
        if m[[pivot_row, col]].abs() <= PIVOT_EPSILON * scale {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                m.swap([col, k], [pivot_row, k]);
            }
            rhs.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = m[[row, col]] / m[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut acc = rhs[row];
        for k in (row + 1)..n {
            acc -= m[[row, k]] * x[k];
        }
        x[row] = acc / m[[row, row]];
    }
    if x.iter().all(|v: &f64| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Weighted least squares `argmin_b sum_i w_i (y_i - x_i . b)^2` via the
/// normal equations. No intercept column is added.
pub fn weighted_least_squares(
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: &Array1<f64>,
) -> Option<Array1<f64>> {
    let n_rows = x.nrows();
    let n_cols = x.ncols();
    if y.len() != n_rows || weights.len() != n_rows {
        return None;
    }
    let mut xtwx = Array2::<f64>::zeros((n_cols, n_cols));
    let mut xtwy = Array1::<f64>::zeros(n_cols);
    for i in 0..n_rows {
        let w = weights[i];
        if w <= 0.0 {
            continue;
        }
        let row = x.row(i);
        for a in 0..n_cols {
            let wa = w * row[a];
            if wa == 0.0 {
                continue;
            }
            xtwy[a] += wa * y[i];
            for b in 0..n_cols {
                xtwx[[a, b]] += wa * row[b];
            }
        }
    }
    solve_linear_system(&xtwx, &xtwy)
}
