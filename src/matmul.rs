//! Row-vector by matrix products used by the dense layers.
//!
//! Both directions of a layer read the same row-major `(in_dim, out_dim)` weight
//! buffer:
//! - forward: `z += x · W`, one scaled row of `W` per input coordinate
//! - backward: `dx = dz · Wᵀ`, one dot product per row of `W` (no transpose copy)
//!
//! The `matrixmultiply` feature routes both through `sgemm` with the matching
//! strides.

/// `out += x · W` with `W` row-major `(in_dim, out_dim)`.
///
/// Shape contract: `x.len() == in_dim`, `out.len() == out_dim`,
/// `w.len() == in_dim * out_dim`.
#[inline]
pub(crate) fn vec_mat_acc(
    x: &[f32],
    w: &[f32],
    in_dim: usize,
    out_dim: usize,
    out: &mut [f32],
) {
    debug_assert_eq!(x.len(), in_dim);
    debug_assert_eq!(out.len(), out_dim);
    debug_assert_eq!(w.len(), in_dim * out_dim);

    #[cfg(feature = "matrixmultiply")]
    {
        // SAFETY: the shape contract keeps every strided index in bounds.
        unsafe {
            matrixmultiply::sgemm(
                1,
                in_dim,
                out_dim,
                1.0,
                x.as_ptr(),
                in_dim as isize,
                1,
                w.as_ptr(),
                out_dim as isize,
                1,
                1.0,
                out.as_mut_ptr(),
                out_dim as isize,
                1,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for (&xi, row) in x.iter().zip(w.chunks_exact(out_dim)) {
        for (o, &wij) in out.iter_mut().zip(row) {
            *o = xi.mul_add(wij, *o);
        }
    }
}

/// `out = d · Wᵀ` with `W` row-major `(in_dim, out_dim)`.
///
/// Shape contract: `d.len() == out_dim`, `out.len() == in_dim`,
/// `w.len() == in_dim * out_dim`. Previous contents of `out` are ignored.
#[inline]
pub(crate) fn vec_mat_t(
    d: &[f32],
    w: &[f32],
    in_dim: usize,
    out_dim: usize,
    out: &mut [f32],
) {
    debug_assert_eq!(d.len(), out_dim);
    debug_assert_eq!(out.len(), in_dim);
    debug_assert_eq!(w.len(), in_dim * out_dim);

    #[cfg(feature = "matrixmultiply")]
    {
        // Wᵀ[p][i] == W[i][p]: row stride 1, column stride out_dim.
        out.fill(0.0);
        // SAFETY: the shape contract keeps every strided index in bounds.
        unsafe {
            matrixmultiply::sgemm(
                1,
                out_dim,
                in_dim,
                1.0,
                d.as_ptr(),
                out_dim as isize,
                1,
                w.as_ptr(),
                1,
                out_dim as isize,
                0.0,
                out.as_mut_ptr(),
                in_dim as isize,
                1,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for (o, row) in out.iter_mut().zip(w.chunks_exact(out_dim)) {
        *o = row
            .iter()
            .zip(d)
            .fold(0.0_f32, |acc, (&wij, &dj)| wij.mul_add(dj, acc));
    }
}
