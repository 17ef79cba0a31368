//! The `ndarray-projgrad` crate minimizes differentiable functions of an
//! `ndarray` subject to simple bound constraints, such as $`x \geq 0`$.
//!
//! It provides:
//! - an adaptive Projected Gradient method ([`ProjectedGradient`])
//! - projections onto the non-negative orthant and onto boxes
//! - stopping rules on the projected gradient and on iteration counts
//! - Non-negative Matrix Factorization by alternating non-negative least
//!   squares ([`nmf::factorize`])
//!
//! Objectives write their gradient into a buffer owned by the optimizer, and
//! the optimizer allocates its working arrays once per call, so iterations
//! do not allocate.
//!
//! ```
//! use ndarray::prelude::*;
//! use ndarray_projgrad::{AnyOf, GradientNorm, MaxIterations, NonNegative, ProjectedGradient};
//!
//! // minimize (x - 3)^2 over x >= 0
//! let f = |x: ArrayView1<f64>, mut g: ArrayViewMut1<f64>| {
//!     g[0] = 2. * (x[0] - 3.);
//!     (x[0] - 3.).powi(2)
//! };
//! let pg = ProjectedGradient::new(NonNegative, 0.5, 0.1, 1.0)?;
//! let mut x = array![0.];
//! let mut stop = AnyOf(GradientNorm::new(1e-8), MaxIterations::new(100));
//! let sol = pg.minimize(&f, &mut stop, x.view_mut())?;
//! assert_eq!(x[0], 3.);
//! assert_eq!(sol.value, 0.);
//! # Ok::<(), ndarray_projgrad::Error>(())
//! ```
//!
//! This crate is in the early development stage and is actively changing.

#![cfg_attr(all(rustc_nightly, test), feature(test))]
#[cfg(all(rustc_nightly, test))]
extern crate test;

use num_traits::ToPrimitive;

pub mod constrained;
mod error;
pub mod nmf;
mod objective;
mod projection;
mod stop;

pub use constrained::{ProjectedGradient, Solution, StepSize};
pub use error::{Error, Result};
pub use objective::Objective;
pub use projection::{Bounds, NonNegative, Projection, Unconstrained};
pub use stop::{
    norm_l2, AnyOf, GradientNorm, MaxIterations, RelativeGradientNorm, StopCriterion,
};

/// Widen a scalar to `f64` for accumulation and reporting.
#[inline]
pub(crate) fn to_f64<S: ToPrimitive>(s: S) -> f64 {
    s.to_f64().unwrap_or(std::f64::NAN)
}
