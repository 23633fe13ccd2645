//! Ordinary least squares and sequential (type I) analysis of variance.
//!
//! Terms are entered in the order given; each term's sum of squares is the
//! drop in residual sum of squares when its columns are added to the model
//! containing the intercept and all earlier terms. Columns that are linearly
//! dependent on the columns already entered (empty cells in an interaction,
//! for example) are aliased: they are skipped and do not count as degrees of
//! freedom.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, concatenate};

use crate::{
    distribution,
    linalg::{Cholesky, LinalgError},
};

/// Residual variance below this fraction of a column's own sum of squares marks it as aliased.
const ALIAS_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum AnovaError {
    #[display("response has {response} values but design has {design} rows")]
    LengthMismatch { response: usize, design: usize },
    #[display("no residual degrees of freedom left ({observations} observations)")]
    NoResidualDf { observations: usize },
    #[display("least squares failed: {_0}")]
    Linalg(LinalgError),
}

impl From<LinalgError> for AnovaError {
    fn from(err: LinalgError) -> Self {
        Self::Linalg(err)
    }
}

/// A named block of design columns entered together.
#[derive(Debug, Clone)]
pub struct AnovaTerm {
    pub name: String,
    pub columns: Array2<f64>,
}

/// Least-squares fit `y ≈ X β`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Array1<f64>,
    pub rss: f64,
    pub df_resid: usize,
}

/// One row of an ANOVA table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnovaRow {
    pub term: String,
    pub df: usize,
    pub sum_sq: f64,
    pub mean_sq: f64,
    pub f_value: Option<f64>,
    pub p_value: Option<f64>,
}

/// Sequential ANOVA table; the last row is the residual row.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnovaTable {
    pub response: String,
    pub rows: Vec<AnovaRow>,
}

/// Fits `y ≈ X β` by solving the normal equations.
pub fn ols(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<OlsFit, AnovaError> {
    let (n, p) = x.dim();
    if y.len() != n {
        return Err(AnovaError::LengthMismatch {
            response: y.len(),
            design: n,
        });
    }
    let xtx = x.t().dot(&x);
    let xty = x.t().dot(&y);
    let coefficients = Cholesky::new(xtx.view())?.solve(xty.view())?;
    let fitted = x.dot(&coefficients);
    let rss = y
        .iter()
        .zip(&fitted)
        .map(|(yi, fi)| (yi - fi).powi(2))
        .sum::<f64>();
    Ok(OlsFit {
        coefficients,
        rss,
        df_resid: n.saturating_sub(p),
    })
}

impl AnovaTable {
    /// Builds a sequential ANOVA table for `response ~ 1 + terms...`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mothsurv_stats::anova::{AnovaTable, AnovaTerm};
    /// use ndarray::{array, Array2};
    ///
    /// let y = array![1.0, 1.2, 0.9, 3.1, 2.9, 3.0];
    /// let group = AnovaTerm {
    ///     name: "group".into(),
    ///     columns: Array2::from_shape_vec((6, 1), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap(),
    /// };
    /// let table = AnovaTable::sequential("y", y.view(), &[group]).unwrap();
    /// assert_eq!(table.rows[0].df, 1);
    /// assert!(table.rows[0].p_value.unwrap() < 0.001);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn sequential(
        response: &str,
        y: ArrayView1<'_, f64>,
        terms: &[AnovaTerm],
    ) -> Result<Self, AnovaError> {
        let n = y.len();
        for term in terms {
            if term.columns.nrows() != n {
                return Err(AnovaError::LengthMismatch {
                    response: n,
                    design: term.columns.nrows(),
                });
            }
        }

        let mut design = Array2::<f64>::ones((n, 1));
        let mut rss = ols(design.view(), y)?.rss;
        let mut partial = Vec::with_capacity(terms.len());

        for term in terms {
            let mut df = 0;
            for column in term.columns.columns() {
                if is_aliased(design.view(), column)? {
                    continue;
                }
                let column = column.insert_axis(Axis(1));
                let widened = concatenate(Axis(1), &[design.view(), column.view()]).map_err(|_| {
                    AnovaError::LengthMismatch {
                        response: n,
                        design: column.nrows(),
                    }
                })?;
                design = widened;
                df += 1;
            }
            let new_rss = if df > 0 {
                ols(design.view(), y)?.rss
            } else {
                rss
            };
            partial.push((term.name.clone(), df, (rss - new_rss).max(0.0)));
            rss = new_rss;
        }

        let df_resid = n.saturating_sub(design.ncols());
        if df_resid == 0 {
            return Err(AnovaError::NoResidualDf { observations: n });
        }
        let residual_ms = rss / df_resid as f64;

        let mut rows = partial
            .into_iter()
            .map(|(term, df, sum_sq)| {
                let mean_sq = if df > 0 { sum_sq / df as f64 } else { 0.0 };
                let (f_value, p_value) = if df > 0 && residual_ms > 0.0 {
                    let f = mean_sq / residual_ms;
                    (Some(f), Some(distribution::f_sf(f, df as f64, df_resid as f64)))
                } else {
                    (None, None)
                };
                AnovaRow {
                    term,
                    df,
                    sum_sq,
                    mean_sq,
                    f_value,
                    p_value,
                }
            })
            .collect::<Vec<_>>();
        rows.push(AnovaRow {
            term: "Residuals".to_owned(),
            df: df_resid,
            sum_sq: rss,
            mean_sq: residual_ms,
            f_value: None,
            p_value: None,
        });

        Ok(Self {
            response: response.to_owned(),
            rows,
        })
    }
}

fn is_aliased(design: ArrayView2<'_, f64>, column: ArrayView1<'_, f64>) -> Result<bool, AnovaError> {
    let own_ss = column.dot(&column);
    if own_ss <= 0.0 {
        return Ok(true);
    }
    let fit = ols(design, column)?;
    Ok(fit.rss <= ALIAS_TOLERANCE * own_ss)
}
