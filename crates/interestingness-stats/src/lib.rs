//! Statistical utilities for interestingness analyses.
//!
//! This crate provides the numeric building blocks used when deriving
//! interestingness elements from an agent's interaction history:
//!
//! - **Descriptive statistics**: mean, median, variance and standard deviation
//! - **Percentiles**: nearest-rank percentiles over a sample
//! - **Divergence**: Shannon entropy and the generalized Jensen-Shannon
//!   divergence between several probability distributions
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing a series
//! - [`percentiles`]: Percentile computation and storage
//! - [`divergence`]: Information-theoretic measures over discrete distributions
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use interestingness_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Computing percentiles
//!
//! ```
//! use interestingness_stats::percentiles::Percentiles;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let percentiles = Percentiles::new(&values, &[25.0, 50.0, 75.0]);
//! assert_eq!(percentiles.get(50.0), Some(3.0));
//! ```
//!
//! ## Measuring disagreement between distributions
//!
//! ```
//! use interestingness_stats::divergence::jensen_shannon;
//!
//! let same = [vec![0.5, 0.5], vec![0.5, 0.5]];
//! assert!(jensen_shannon(&same).unwrap().abs() < 1e-12);
//! ```

pub mod descriptive;
pub mod divergence;
pub mod percentiles;
