//! Parallel kernels behind the annual statistics
//!
//! Work is split across years (counting) or across grid cells (the mean over
//! years) and runs on the global rayon pool.

use super::operations::YearGroup;
use crate::errors::Result;
use ndarray::{stack, Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};
use rayon::prelude::*;
use tracing::debug;

/// Count true values per year.
///
/// Returns a `(year, lat, lon)` array with one slice per group, in group order.
///
/// # Errors
///
/// Returns an error if the per-year slices cannot be stacked.
#[allow(clippy::cast_precision_loss)]
pub fn parallel_count_by_year(
    mask: ArrayView3<'_, bool>,
    groups: &[YearGroup],
) -> Result<Array3<f32>> {
    let (_, nlat, nlon) = mask.dim();

    debug!(
        years = groups.len(),
        cells = nlat * nlon,
        threads = rayon::current_num_threads(),
        "counting condition days per year"
    );

    let slices: Vec<Array2<f32>> = groups
        .par_iter()
        .map(|group| {
            let mut acc = Array2::<u32>::zeros((nlat, nlon));
            for &t in &group.indices {
                Zip::from(&mut acc)
                    .and(mask.index_axis(Axis(0), t))
                    .for_each(|count, &hit| {
                        if hit {
                            *count += 1;
                        }
                    });
            }
            acc.mapv(|c| c as f32)
        })
        .collect();

    let views: Vec<ArrayView2<'_, f32>> = slices.iter().map(|s| s.view()).collect();
    Ok(stack(Axis(0), &views)?)
}

/// Divide each year's counts by the number of timesteps in that year.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn counts_to_fractions(mut counts: Array3<f32>, groups: &[YearGroup]) -> Array3<f32> {
    for (mut slice, group) in counts.outer_iter_mut().zip(groups) {
        let n = group.indices.len() as f64;
        slice.par_mapv_inplace(|c| (f64::from(c) / n) as f32);
    }
    counts
}

/// Replace exact zeros with NaN
#[must_use]
pub fn mask_zeros(mut data: Array3<f32>) -> Array3<f32> {
    data.par_mapv_inplace(|x| if x == 0.0 { f32::NAN } else { x });
    data
}

/// Mean over axis 0 ignoring NaN and infinite values.
///
/// Sums are accumulated in f64 to avoid precision loss; a cell with no finite
/// value along the axis yields NaN.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn parallel_nanmean_years(data: &Array3<f32>) -> Array2<f32> {
    Zip::from(data.lanes(Axis(0))).par_map_collect(|lane| {
        let (sum, count) = lane
            .iter()
            .filter(|x| x.is_finite())
            .fold((0.0_f64, 0_u32), |(s, n), &x| (s + f64::from(x), n + 1));

        if count > 0 {
            (sum / f64::from(count)) as f32
        } else {
            f32::NAN
        }
    })
}
