//! Non-negative Matrix Factorization by Alternating Non-negative Least Squares
//!
//! Approximate a non-negative $`V \in \mathbb{R}^{m \times n}`$ by $`WH`$ with
//! $`W \in \mathbb{R}^{m \times k}_+`$ and $`H \in \mathbb{R}^{k \times n}_+`$,
//! minimizing $`\frac12 \|V - WH\|_F^2`$. Each half step is a bound-constrained
//! least squares problem solved with [`ProjectedGradient`].

use log::{debug, info};
use ndarray::prelude::*;
use ndarray::{NdFloat, Zip};

use crate::constrained::ProjectedGradient;
use crate::error::{Error, Result};
use crate::objective::Objective;
use crate::projection::{NonNegative, Projection};
use crate::stop::{norm_l2, AnyOf, GradientNorm, MaxIterations};

/// The sub-problem $`\min_{H \geq 0} \frac12 \|V - WH\|_F^2`$ for fixed $`W`$.
///
/// $`W^TW`$ and $`W^TV`$ are formed once, so an evaluation costs
/// $`O(k^2 n)`$ instead of $`O(mkn)`$:
/// ```math
/// \begin{aligned}
/// f(H) &= \tfrac12 \langle H, W^TWH \rangle - \langle H, W^TV \rangle + \tfrac12 \|V\|_F^2 \\
/// \nabla f(H) &= W^TWH - W^TV
/// \end{aligned}
/// ```
/// The update of $`W`$ is the same problem transposed,
/// $`\min_{W^T \geq 0} \frac12 \|V^T - H^T W^T\|_F^2`$.
///
/// Panics
/// ------
/// [`Objective::evaluate`] panics if the point or the gradient buffer is
/// not of shape [`dim`](NmfSubproblem::dim). [`ProjectedGradient::minimize`]
/// sizes its buffers from the starting point, so pass one of that shape.
#[derive(Debug, Clone)]
pub struct NmfSubproblem<S> {
    wtw: Array2<S>,
    wtv: Array2<S>,
    half_v_sq: S,
}

impl<S: NdFloat> NmfSubproblem<S> {
    pub fn new(w: ArrayView2<S>, v: ArrayView2<S>) -> Result<Self> {
        if w.nrows() != v.nrows() {
            return Err(Error::ShapeMismatch {
                expected: vec![v.nrows(), w.ncols()],
                found: w.shape().to_vec(),
            });
        }
        let two = S::one() + S::one();
        Ok(NmfSubproblem {
            wtw: w.t().dot(&w),
            wtv: w.t().dot(&v),
            half_v_sq: v.iter().fold(S::zero(), |acc, &vi| acc + vi * vi) / two,
        })
    }

    /// Shape `(k, n)` of the unknown.
    pub fn dim(&self) -> (usize, usize) {
        self.wtv.dim()
    }
}

impl<S: NdFloat> Objective<S, Ix2> for NmfSubproblem<S> {
    fn evaluate(&self, h: ArrayView2<S>, mut grad: ArrayViewMut2<S>) -> S {
        let dim = self.dim();
        assert_eq!(h.dim(), dim, "NMF sub-problem evaluated at a wrong-shaped point");
        assert_eq!(grad.dim(), dim, "NMF sub-problem gradient buffer has the wrong shape");
        let two = S::one() + S::one();
        let wtwh = self.wtw.dot(&h);
        Zip::from(&mut grad)
            .and(&wtwh)
            .and(&self.wtv)
            .apply(|g, &a, &b| *g = a - b);
        h.iter()
            .zip(wtwh.iter())
            .zip(self.wtv.iter())
            .fold(self.half_v_sq, |acc, ((&hi, &a), &b)| acc + hi * (a / two - b))
    }
}

/// Stopping and effort limits for [`factorize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NmfOptions {
    /// Relative tolerance on the projected gradient of the full problem.
    pub tol: f64,
    /// Alternations of the `W` and `H` updates.
    pub max_outer_iterations: usize,
    /// Projected gradient iterations per sub-problem.
    pub max_inner_iterations: usize,
}

impl Default for NmfOptions {
    fn default() -> Self {
        NmfOptions {
            tol: 1e-4,
            max_outer_iterations: 200,
            max_inner_iterations: 1000,
        }
    }
}

impl NmfOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.tol > 0. && self.tol.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "tol",
                value: self.tol,
                reason: "must be positive and finite",
            });
        }
        if self.max_inner_iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "max_inner_iterations",
                value: 0.,
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NmfReport<S> {
    /// $`\frac12 \|V - WH\|_F^2`$ at the returned factors.
    pub objective: S,
    pub outer_iterations: usize,
    /// Projected gradient norm of the full problem at the start and end.
    pub initial_gradient_norm: f64,
    pub final_gradient_norm: f64,
    /// True if the relative gradient tolerance was met.
    pub converged: bool,
}

/// Step size to start the next solve of a factor from: the one the last
/// solve ended with, unless growth overflowed or reductions underflowed.
fn warm_alpha<S: NdFloat>(carried: S, fallback: S) -> S {
    if carried.is_finite() && carried > S::zero() {
        carried
    } else {
        fallback
    }
}

/// Objective value and projected gradient norm of the full problem.
fn full_problem<S: NdFloat>(
    v: ArrayView2<S>,
    w: ArrayView2<S>,
    h: ArrayView2<S>,
) -> Result<(S, f64)> {
    let h_problem = NmfSubproblem::new(w, v)?;
    let w_problem = NmfSubproblem::new(h.t(), v.t())?;

    let mut grad_h = Array2::zeros(h.raw_dim());
    let value = h_problem.evaluate(h, grad_h.view_mut());
    NonNegative.clip_gradient(h, grad_h.view_mut());

    let mut grad_wt = Array2::zeros(w.t().raw_dim());
    w_problem.evaluate(w.t(), grad_wt.view_mut());
    NonNegative.clip_gradient(w.t(), grad_wt.view_mut());

    let norm = norm_l2(grad_h.view()).hypot(norm_l2(grad_wt.view()));
    Ok((value, norm))
}

/// Factorize `v ≈ w h` in place, starting from the given `w` and `h`.
///
/// Follows the alternating scheme of [\[Lin07\]](crate::constrained::ProjectedGradient):
/// sub-problem tolerances start at $`\max(10^{-3}, \mathrm{tol})\,\|\nabla^P f(W_0, H_0)\|`$
/// and are divided by ten whenever a sub-problem needs no step. The loop
/// stops once $`\|\nabla^P f(W, H)\| \leq \mathrm{tol}\,\|\nabla^P f(W_0, H_0)\|`$.
/// Unlike Lin's scheme, which restarts every sub-problem from a unit step,
/// the step size each solve ends with is the starting step of the next solve
/// of the same factor; a step that left the positive finite range falls back
/// to the default.
///
/// Parameters
/// ----------
/// - __v:__        data, `m × n`, non-negative
/// - __w:__        left factor, `m × k`, projected onto $`W \geq 0`$ on first use
/// - __h:__        right factor, `k × n`, projected onto $`H \geq 0`$ on first use
/// - __options:__  tolerances and iteration limits
pub fn factorize<S: NdFloat>(
    v: ArrayView2<S>,
    mut w: ArrayViewMut2<S>,
    mut h: ArrayViewMut2<S>,
    options: &NmfOptions,
) -> Result<NmfReport<S>> {
    options.validate()?;
    let (m, n) = v.dim();
    let k = w.ncols();
    if w.nrows() != m {
        return Err(Error::ShapeMismatch {
            expected: vec![m, k],
            found: w.shape().to_vec(),
        });
    }
    if h.dim() != (k, n) {
        return Err(Error::ShapeMismatch {
            expected: vec![k, n],
            found: h.shape().to_vec(),
        });
    }

    let (mut objective, initial) = full_problem(v, w.view(), h.view())?;
    let mut projnorm = initial;
    let mut tol_w = options.tol.max(1e-3) * initial;
    let mut tol_h = tol_w;
    let base = ProjectedGradient::<S, _>::with_defaults(NonNegative);
    let (mut alpha_w, mut alpha_h) = (base.alpha0(), base.alpha0());
    debug!(
        "nmf {}x{} rank {}: initial projected gradient {:e}",
        m, n, k, initial
    );

    let mut outer_iterations = 0;
    let mut converged = false;
    loop {
        debug!(
            "nmf iteration {}: f = {:e}, projected gradient {:e}",
            outer_iterations, objective, projnorm
        );
        if projnorm <= options.tol * initial {
            converged = true;
            break;
        }
        if outer_iterations == options.max_outer_iterations {
            break;
        }

        let problem = NmfSubproblem::new(h.t(), v.t())?;
        let mut stop = AnyOf(
            GradientNorm::new(tol_w),
            MaxIterations::new(options.max_inner_iterations),
        );
        let sol = base
            .clone()
            .with_alpha0(alpha_w)?
            .minimize(&problem, &mut stop, w.view_mut().reversed_axes())?;
        alpha_w = warm_alpha(sol.alpha, base.alpha0());
        if sol.iterations == 0 {
            tol_w *= 0.1;
        }

        let problem = NmfSubproblem::new(w.view(), v)?;
        let mut stop = AnyOf(
            GradientNorm::new(tol_h),
            MaxIterations::new(options.max_inner_iterations),
        );
        let sol = base
            .clone()
            .with_alpha0(alpha_h)?
            .minimize(&problem, &mut stop, h.view_mut())?;
        alpha_h = warm_alpha(sol.alpha, base.alpha0());
        if sol.iterations == 0 {
            tol_h *= 0.1;
        }

        outer_iterations += 1;
        let (value, norm) = full_problem(v, w.view(), h.view())?;
        objective = value;
        projnorm = norm;
    }

    info!(
        "nmf finished after {} iterations: f = {:e}, projected gradient {:e} ({})",
        outer_iterations,
        objective,
        projnorm,
        if converged { "converged" } else { "iteration limit" }
    );
    Ok(NmfReport {
        objective,
        outer_iterations,
        initial_gradient_norm: initial,
        final_gradient_norm: projnorm,
        converged,
    })
}

/// $`\frac12 \|V - WH\|_F^2`$ evaluated directly.
pub fn reconstruction_error<S: NdFloat>(v: ArrayView2<S>, w: ArrayView2<S>, h: ArrayView2<S>) -> f64 {
    let r = &v - &w.dot(&h);
    0.5 * norm_l2(r.view()).powi(2)
}

/// $`\|V - WH\|_F \,/\, \|V\|_F`$.
pub fn relative_error<S: NdFloat>(v: ArrayView2<S>, w: ArrayView2<S>, h: ArrayView2<S>) -> f64 {
    (2. * reconstruction_error(v, w, h)).sqrt() / norm_l2(v)
}
