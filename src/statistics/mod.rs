//! Annual aggregation and climatological reduction
//!
//! # Organization
//!
//! - [`operations`]: annual statistics, [`AnnualAggregate`] and the
//!   [`AnnualReduction`] trait
//! - [`parallel`]: the rayon-backed kernels they run on

pub mod operations;
pub mod parallel;

pub use operations::{group_by_year, AnnualAggregate, AnnualReduction, AnnualStatistic, YearGroup};
pub use parallel::{
    counts_to_fractions, mask_zeros, parallel_count_by_year, parallel_nanmean_years,
};
