//! ARIMA backend.
//!
//! The history is differenced `d` times, then the differenced series is fitted
//! by conditional least squares:
//!
//! - **AR only** (`q == 0`): each value is regressed on its `p` predecessors.
//! - **ARMA** (`q > 0`): Hannan-Rissanen. A long autoregression supplies
//!   residual estimates, which enter a second regression as the MA regressors.
//!
//! An intercept is only estimated for undifferenced models (`d == 0`).
//!
//! The normal equations carry a ridge proportional to their mean diagonal, so
//! collinear lags (a perfectly linear trend, for example) still solve. A
//! differenced series with no variation at all gets zero coefficients, which
//! forecasts a constant history at its own level.
//!
//! Histories too short for a full set of lags are fitted with the missing lags
//! taken as zero, the same presample convention the forecast recursion uses.
//! Only `d + 1` observations are required, enough for one differenced value.

use tracing::trace;

use crate::backend::{ArimaOrder, FittedModel, ForecastBackend};
use crate::error::ForecastError;

const RIDGE: f64 = 1e-8;
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Default numerical backend: [`FittedArima`].
#[derive(Debug, Default, Copy, Clone)]
pub struct ArimaBackend;

impl ForecastBackend for ArimaBackend {
    fn name(&self) -> &'static str {
        "arima"
    }

    fn fit(&self, history: &[f64], order: ArimaOrder) -> Result<Box<dyn FittedModel>, ForecastError> {
        Ok(Box::new(FittedArima::fit(history, order)?))
    }
}

/// ARIMA model fitted to one history.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedArima {
    order: ArimaOrder,
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    /// Last value of each differencing level (level 0 is the raw history).
    level_tails: Vec<f64>,
}

impl FittedArima {
    pub fn fit(history: &[f64], order: ArimaOrder) -> Result<Self, ForecastError> {
        order.validate()?;

        if let Some(bad) = history.iter().find(|x| !x.is_finite()) {
            return Err(ForecastError::invalid_input(format!(
                "history contains non-finite value {bad}"
            )));
        }

        let required = min_observations(order);
        if history.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: history.len(),
            });
        }

        let (differenced, level_tails) = difference(history, order.d);
        let with_intercept = order.d == 0;

        let coefficients = if order.q == 0 {
            fit_regression(&differenced, None, order.p, 0, with_intercept, order.p)?
        } else {
            let long_order = long_ar_order(order);
            let long = fit_regression(&differenced, None, long_order, 0, with_intercept, long_order)?;
            let ((long_ar, _), long_intercept) = split_coefficients(&long, long_order, 0, with_intercept);
            let innovations = in_sample_residuals(&differenced, long_intercept, &long_ar, &[]);
            // Innovations are only meaningful once the long autoregression has
            // a full set of lags.
            let first_row = (long_order + order.q).max(order.p);
            fit_regression(&differenced, Some(&innovations), order.p, order.q, with_intercept, first_row)?
        };

        let ((ar, ma), intercept) = split_coefficients(&coefficients, order.p, order.q, with_intercept);

        if ar.iter().chain(ma.iter()).any(|c| !c.is_finite()) || !intercept.is_finite() {
            return Err(ForecastError::model_fit("estimated coefficients are not finite"));
        }

        let residuals = in_sample_residuals(&differenced, intercept, &ar, &ma);

        trace!(order = %order, ?ar, ?ma, intercept, "fitted arima");

        Ok(Self {
            order,
            intercept,
            ar,
            ma,
            differenced,
            residuals,
            level_tails,
        })
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Undo differencing: cumulative sums seeded by each level's last value.
    fn integrate(&self, mut values: Vec<f64>) -> Vec<f64> {
        for &tail in self.level_tails.iter().rev() {
            let mut acc = tail;
            for v in values.iter_mut() {
                acc += *v;
                *v = acc;
            }
        }
        values
    }
}

impl FittedModel for FittedArima {
    fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
        let mut values = self.differenced.clone();
        let mut shocks = self.residuals.clone();
        let mut out = Vec::with_capacity(steps);

        for _ in 0..steps {
            let next = one_step(&values, &shocks, self.intercept, &self.ar, &self.ma);
            values.push(next);
            // Future shocks have zero expectation.
            shocks.push(0.0);
            out.push(next);
        }

        Ok(self.integrate(out))
    }
}

/// Shortest history that still leaves one value after differencing.
fn min_observations(order: ArimaOrder) -> usize {
    order.d + 1
}

fn long_ar_order(order: ArimaOrder) -> usize {
    2 * (order.p + order.q)
}

fn difference(history: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut current = history.to_vec();
    let mut tails = Vec::with_capacity(d);
    for _ in 0..d {
        tails.push(current.last().copied().unwrap_or(0.0));
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    (current, tails)
}

/// `values[t - 1 - j]`, or zero before the start of the series.
fn lag(values: &[f64], j: usize) -> f64 {
    values
        .len()
        .checked_sub(j + 1)
        .map(|i| values[i])
        .unwrap_or(0.0)
}

fn one_step(values: &[f64], shocks: &[f64], intercept: f64, ar: &[f64], ma: &[f64]) -> f64 {
    let ar_part: f64 = ar.iter().enumerate().map(|(j, c)| c * lag(values, j)).sum();
    let ma_part: f64 = ma.iter().enumerate().map(|(j, c)| c * lag(shocks, j)).sum();
    intercept + ar_part + ma_part
}

/// In-sample one-step-ahead errors.
fn in_sample_residuals(values: &[f64], intercept: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for t in 0..values.len() {
        let predicted = one_step(&values[..t], &out, intercept, ar, ma);
        out.push(values[t] - predicted);
    }
    out
}

type Coefficients = ((Vec<f64>, Vec<f64>), f64);

fn split_coefficients(coefficients: &[f64], p: usize, q: usize, with_intercept: bool) -> Coefficients {
    let ar = coefficients[..p].to_vec();
    let ma = coefficients[p..p + q].to_vec();
    let intercept = if with_intercept { coefficients[p + q] } else { 0.0 };
    ((ar, ma), intercept)
}

/// Regress `values[t]` on `p` lags of `values` and `q` lags of `innovations`,
/// for every `t >= first_row`.
///
/// When fewer than `k` complete rows exist, every row is used and missing lags
/// are zero. A design with no variation yields all-zero coefficients.
///
/// Coefficient layout: `[ar_1..ar_p, ma_1..ma_q, intercept?]`.
fn fit_regression(
    values: &[f64],
    innovations: Option<&[f64]>,
    p: usize,
    q: usize,
    with_intercept: bool,
    first_row: usize,
) -> Result<Vec<f64>, ForecastError> {
    let k = p + q + usize::from(with_intercept);
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    let mut row = vec![0.0; k];

    let start = if values.len() >= first_row + k { first_row } else { 0 };

    for t in start..values.len() {
        for j in 0..p {
            row[j] = lag(&values[..t], j);
        }
        if let Some(e) = innovations {
            for j in 0..q {
                row[p + j] = lag(&e[..t.min(e.len())], j);
            }
        }
        if with_intercept {
            row[k - 1] = 1.0;
        }

        let y = values[t];
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let mean_diagonal = (0..k).map(|i| xtx[i][i]).sum::<f64>() / k as f64;
    if !(mean_diagonal > 0.0) {
        trace!(rows = values.len() - start, k, "no variation; zero coefficients");
        return Ok(vec![0.0; k]);
    }

    for (i, r) in xtx.iter_mut().enumerate() {
        r[i] += RIDGE * mean_diagonal;
    }

    solve(xtx, xty, PIVOT_TOLERANCE * mean_diagonal)
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>, tolerance: f64) -> Result<Vec<f64>, ForecastError> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() <= tolerance {
            return Err(ForecastError::model_fit("normal equations are singular"));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        for r in (col + 1)..n {
            let factor = a[r][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[r][c] -= factor * pivot_row[c];
            }
            b[r] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for r in (0..n).rev() {
        let tail: f64 = ((r + 1)..n).map(|c| a[r][c] * x[c]).sum();
        x[r] = (b[r] - tail) / a[r][r];
    }
    Ok(x)
}
