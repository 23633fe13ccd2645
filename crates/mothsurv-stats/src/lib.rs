//! Statistical building blocks for the mothsurv project.
//!
//! This crate is domain-free: it knows nothing about moths, temperatures or
//! half-day observations. It provides:
//!
//! - **Descriptive statistics**: mean, median, sample variance, standard error, correlation
//! - **Percentiles**: nearest-rank percentiles and quartile cut points
//! - **Survival analysis**: Kaplan-Meier estimator with Greenwood standard errors
//! - **Linear algebra**: Cholesky factorization for small symmetric positive-definite systems
//! - **Analysis of variance**: least squares and sequential (type I) ANOVA tables
//! - **Information criteria**: AIC, AICc, BIC and Akaike weights
//! - **Distributions**: normal, chi-squared and F tail probabilities
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Nearest-rank percentiles
//! - [`survival`]: Kaplan-Meier survival curves for analyzing time-to-event data
//! - [`linalg`]: Cholesky solve and inverse on `ndarray` matrices, factorized by `faer`
//! - [`anova`]: OLS fits and sequential ANOVA
//! - [`information`]: Model comparison criteria
//! - [`distribution`]: Reference distribution helpers
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use mothsurv_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Analyzing survival data
//!
//! ```
//! use mothsurv_stats::survival::KaplanMeierCurve;
//!
//! // Data: (time, is_censored)
//! let data = vec![
//!     (1.0, false), // Event occurred at time 1.0
//!     (2.5, true),  // Censored at time 2.5
//!     (3.0, false), // Event occurred at time 3.0
//! ];
//! let curve = KaplanMeierCurve::from_data(data);
//! assert_eq!(curve.median_survival(), Some(3.0));
//! ```
//!
//! ## Ranking models
//!
//! ```
//! use mothsurv_stats::information::{aicc, akaike_weights};
//!
//! let scores = [aicc(-100.0, 2, 80).unwrap(), aicc(-98.5, 4, 80).unwrap()];
//! let weights = akaike_weights(&scores);
//! assert!(weights[0] > weights[1]);
//! ```

pub mod anova;
pub mod descriptive;
pub mod distribution;
pub mod information;
pub mod linalg;
pub mod percentiles;
pub mod survival;
