//! Projections onto feasible regions
//!
//! A [`Projection`] does two things. `clip_point` maps a point to the
//! nearest feasible point, and `clip_gradient` removes the gradient
//! components that would immediately leave the region at coordinates
//! sitting on its boundary. What remains is the projected gradient
//! ```math
//! \nabla^P f(x)_i = \begin{cases}
//!     \nabla f(x)_i & l < x_i < u \\
//!     \min(0, \nabla f(x)_i) & x_i = l \\
//!     \max(0, \nabla f(x)_i) & x_i = u
//! \end{cases}
//! ```
//! which is zero exactly at stationary points of the constrained problem.

use ndarray::prelude::*;
use ndarray::{NdFloat, Zip};

use crate::error::{Error, Result};

/// Clipping into a feasible region for arrays of shape `D`.
pub trait Projection<S, D>
where
    S: NdFloat,
    D: Dimension,
{
    /// Move `x` in place to the nearest feasible point.
    fn clip_point(&self, x: ArrayViewMut<S, D>);

    /// Zero the components of `grad` at boundary coordinates of `x`
    /// along which a descent step would leave the region.
    fn clip_gradient(&self, x: ArrayView<S, D>, grad: ArrayViewMut<S, D>);
}

/// The whole space, both operations are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconstrained;

impl<S: NdFloat, D: Dimension> Projection<S, D> for Unconstrained {
    #[inline]
    fn clip_point(&self, _x: ArrayViewMut<S, D>) {}

    #[inline]
    fn clip_gradient(&self, _x: ArrayView<S, D>, _grad: ArrayViewMut<S, D>) {}
}

/// The non-negative orthant $`\{x : x_i \geq 0\}`$.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonNegative;

impl<S: NdFloat, D: Dimension> Projection<S, D> for NonNegative {
    fn clip_point(&self, mut x: ArrayViewMut<S, D>) {
        x.mapv_inplace(|xi| if xi < S::zero() { S::zero() } else { xi });
    }

    fn clip_gradient(&self, x: ArrayView<S, D>, mut grad: ArrayViewMut<S, D>) {
        Zip::from(&mut grad).and(&x).apply(|g, &xi| {
            if xi <= S::zero() && *g > S::zero() {
                *g = S::zero();
            }
        });
    }
}

/// A box $`\{x : l \leq x_i \leq u\}`$ with the same scalar bounds on
/// every coordinate. Either bound may be infinite.
#[derive(Debug, Clone, Copy)]
pub struct Bounds<S> {
    lower: S,
    upper: S,
}

impl<S: NdFloat> Bounds<S> {
    pub fn new(lower: S, upper: S) -> Result<Self> {
        if lower.is_nan() {
            return Err(Error::InvalidParameter {
                name: "lower",
                value: f64::NAN,
                reason: "bound must not be NaN",
            });
        }
        if upper.is_nan() {
            return Err(Error::InvalidParameter {
                name: "upper",
                value: f64::NAN,
                reason: "bound must not be NaN",
            });
        }
        if lower > upper {
            return Err(Error::InvalidParameter {
                name: "lower",
                value: crate::to_f64(lower),
                reason: "lower bound exceeds upper bound",
            });
        }
        Ok(Bounds { lower, upper })
    }

    pub fn lower(&self) -> S {
        self.lower
    }

    pub fn upper(&self) -> S {
        self.upper
    }
}

impl<S: NdFloat, D: Dimension> Projection<S, D> for Bounds<S> {
    fn clip_point(&self, mut x: ArrayViewMut<S, D>) {
        let (l, u) = (self.lower, self.upper);
        x.mapv_inplace(|xi| {
            if xi < l {
                l
            } else if xi > u {
                u
            } else {
                xi
            }
        });
    }

    fn clip_gradient(&self, x: ArrayView<S, D>, mut grad: ArrayViewMut<S, D>) {
        let (l, u) = (self.lower, self.upper);
        Zip::from(&mut grad).and(&x).apply(|g, &xi| {
            // stepping along -g leaves the box
            if (xi <= l && *g > S::zero()) || (xi >= u && *g < S::zero()) {
                *g = S::zero();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonnegative_clips_points() {
        let mut x = array![-1., 0., 2.5, -0.0, -1e-300];
        NonNegative.clip_point(x.view_mut());
        assert_eq!(x, array![0., 0., 2.5, 0., 0.]);
    }

    #[test]
    fn nonnegative_projected_gradient() {
        let x = array![[0., 0.], [1., 3.]];
        let mut g = array![[2., -2.], [2., -2.]];
        NonNegative.clip_gradient(x.view(), g.view_mut());
        // only the positive component at the boundary is dropped
        assert_eq!(g, array![[0., -2.], [2., -2.]]);
    }

    #[test]
    fn unconstrained_is_identity() {
        let mut x = array![-4.0f32, 5.];
        let mut g = array![1.0f32, -1.];
        Unconstrained.clip_point(x.view_mut());
        Unconstrained.clip_gradient(x.view(), g.view_mut());
        assert_eq!(x, array![-4., 5.]);
        assert_eq!(g, array![1., -1.]);
    }

    #[test]
    fn bounds_clip_both_sides() {
        let b = Bounds::new(-1., 2.).unwrap();
        let mut x = array![-3., -1., 0.5, 2., 7.];
        b.clip_point(x.view_mut());
        assert_eq!(x, array![-1., -1., 0.5, 2., 2.]);

        let mut g = array![1., -1., 1., -1., 1.];
        let x = array![-1., -1., 0.5, 2., 2.];
        b.clip_gradient(x.view(), g.view_mut());
        assert_eq!(g, array![0., -1., 1., 0., 1.]);
    }

    #[test]
    fn half_infinite_bounds() {
        let b = Bounds::new(f64::NEG_INFINITY, 0.).unwrap();
        let mut x = array![-1e12, 3.];
        b.clip_point(x.view_mut());
        assert_eq!(x, array![-1e12, 0.]);
    }

    #[test]
    fn bounds_reject_inverted_interval() {
        match Bounds::new(1.0f64, 0.0) {
            Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, "lower"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Bounds::new(f64::NAN, 0.).is_err());
    }
}
