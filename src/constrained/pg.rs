use std::mem;

use log::{debug, trace, warn};
use ndarray::prelude::*;
use ndarray::{NdFloat, Zip};

use super::step::StepSize;
use crate::error::{Error, Result};
use crate::objective::Objective;
use crate::projection::Projection;
use crate::stop::StopCriterion;
use crate::to_f64;

/// Step shrink factor used by [`ProjectedGradient::with_defaults`].
pub const DEFAULT_BETA: f64 = 0.1;
/// Sufficient decrease constant used by [`ProjectedGradient::with_defaults`].
pub const DEFAULT_SIGMA: f64 = 0.01;
/// Initial step size used by [`ProjectedGradient::with_defaults`].
pub const DEFAULT_ALPHA0: f64 = 1.0;
/// Step reductions allowed within one iteration unless configured otherwise.
pub const DEFAULT_MAX_BACKTRACKS: usize = 100;

/// Result of [`ProjectedGradient::minimize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution<S> {
    /// Objective value at the returned point.
    pub value: S,
    /// Accepted steps taken.
    pub iterations: usize,
    /// Calls made to the objective, including the one at the start point.
    pub evaluations: usize,
    /// Step size the next iteration would have started from. Passing it
    /// as `alpha0` warm starts a follow-up solve of a similar problem.
    pub alpha: S,
}

/// Adaptive Projected Gradient Method for bound-constrained minimization
///
/// minimize a differentiable $`f`$ over the feasible set $`\Omega`$ of a
/// [`Projection`] $`P`$, following the improved projected gradient method
/// of [\[Lin07\]](#references).
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// x_k(\alpha) &= P\left[x_k - \alpha \nabla^P f(x_k)\right] \\
/// \text{accept if}\quad f(x_k(\alpha)) - f(x_k) &\leq
///     \sigma \nabla^P f(x_k)^T \left(x_k(\alpha) - x_k\right) \\
/// x_{k+1} &= x_k(\alpha_k)
/// \end{aligned}
/// ```
/// $`\alpha_k`$ starts from $`\alpha_{k-1}`$. A rejected trial is retried
/// with $`\beta\alpha`$. When two of the last five iterations were accepted
/// without reduction the step grows to $`\alpha/\beta`$ (see [`StepSize`]).
/// The inner product of the decrease test is accumulated in `f64` whatever
/// the element type.
///
/// Two point buffers and two gradient buffers are allocated once per call
/// and swap roles after every accepted step. The caller's array is written
/// only once, when the loop ends.
///
/// Parameters
/// ----------
/// - __projection:__ feasible region, applied to every trial point
/// - __beta:__       step reduction factor, in (0, 1)
/// - __sigma:__      sufficient decrease constant, in (0, 1)
/// - __alpha0:__     initial step size, positive
///
/// References
/// ----------
/// \[Lin07\]: [ Lin C-J
///             "Projected Gradient Methods for Non-negative Matrix
///             Factorization", Neural Computation 19 (2007) ](https://www.csie.ntu.edu.tw/~cjlin/papers/pgradnmf.pdf)
#[derive(Debug, Clone)]
pub struct ProjectedGradient<S, P> {
    projection: P,
    beta: S,
    sigma: S,
    alpha0: S,
    max_backtracks: Option<usize>,
    max_alpha: Option<S>,
}

/// A point with its objective value and gradient.
struct Iterate<S, D> {
    point: Array<S, D>,
    value: S,
    gradient: Array<S, D>,
}

impl<S: NdFloat, D: Dimension> Iterate<S, D> {
    fn zeros(dim: D) -> Self {
        Iterate {
            point: Array::zeros(dim.clone()),
            value: S::zero(),
            gradient: Array::zeros(dim),
        }
    }

    fn evaluate<O: Objective<S, D>>(&mut self, objective: &O) {
        self.gradient.fill(S::zero());
        self.value = objective.evaluate(self.point.view(), self.gradient.view_mut());
    }

    fn check_finite(&self) -> Result<()> {
        if !self.value.is_finite() {
            return Err(Error::NonFiniteValue {
                value: to_f64(self.value),
            });
        }
        match self.gradient.iter().position(|g| !g.is_finite()) {
            Some(index) => Err(Error::NonFiniteGradient { index }),
            None => Ok(()),
        }
    }
}

impl<S: NdFloat, P> ProjectedGradient<S, P> {
    pub fn new(projection: P, beta: S, sigma: S, alpha0: S) -> Result<Self> {
        let unit = |name: &'static str, v: S| {
            if v > S::zero() && v < S::one() {
                Ok(())
            } else {
                Err(Error::InvalidParameter {
                    name,
                    value: to_f64(v),
                    reason: "must lie in (0, 1)",
                })
            }
        };
        unit("beta", beta)?;
        unit("sigma", sigma)?;
        positive("alpha0", alpha0)?;
        Ok(ProjectedGradient {
            projection,
            beta,
            sigma,
            alpha0,
            max_backtracks: Some(DEFAULT_MAX_BACKTRACKS),
            max_alpha: None,
        })
    }

    /// `beta = 0.1`, `sigma = 0.01`, `alpha0 = 1`.
    pub fn with_defaults(projection: P) -> Self {
        ProjectedGradient {
            projection,
            beta: S::from(DEFAULT_BETA).unwrap(),
            sigma: S::from(DEFAULT_SIGMA).unwrap(),
            alpha0: S::from(DEFAULT_ALPHA0).unwrap(),
            max_backtracks: Some(DEFAULT_MAX_BACKTRACKS),
            max_alpha: None,
        }
    }

    /// Step reductions allowed per iteration before giving up with
    /// [`Error::BacktrackLimit`]. `None` retries without bound.
    #[must_use]
    pub fn with_max_backtracks(mut self, max_backtracks: Option<usize>) -> Self {
        self.max_backtracks = max_backtracks;
        self
    }

    /// Ceiling for step growth.
    pub fn with_max_alpha(mut self, max_alpha: S) -> Result<Self> {
        positive("max_alpha", max_alpha)?;
        self.max_alpha = Some(max_alpha);
        Ok(self)
    }

    /// Replace the initial step size, e.g. with [`Solution::alpha`] of a
    /// previous run.
    pub fn with_alpha0(mut self, alpha0: S) -> Result<Self> {
        positive("alpha0", alpha0)?;
        self.alpha0 = alpha0;
        Ok(self)
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    pub fn beta(&self) -> S {
        self.beta
    }

    pub fn sigma(&self) -> S {
        self.sigma
    }

    pub fn alpha0(&self) -> S {
        self.alpha0
    }

    /// Minimize `objective` starting from `x`, writing the final point back
    /// into `x`.
    ///
    /// `stop` is checked before every iteration against the current point,
    /// value and projected gradient; if it holds at the start, no step is
    /// taken and only the projection of `x` is written back.
    ///
    /// Errors
    /// ------
    /// - [`Error::NonFiniteValue`] / [`Error::NonFiniteGradient`] if the
    ///   objective is not finite at the start point or an accepted point
    /// - [`Error::BacktrackLimit`] if an iteration exceeds the configured
    ///   number of step reductions
    ///
    /// On error `x` is left untouched.
    pub fn minimize<D, O, C>(
        &self,
        objective: &O,
        stop: &mut C,
        mut x: ArrayViewMut<'_, S, D>,
    ) -> Result<Solution<S>>
    where
        D: Dimension,
        P: Projection<S, D>,
        O: Objective<S, D>,
        C: StopCriterion<S, D>,
    {
        let mut current: Iterate<S, D> = Iterate::zeros(x.raw_dim());
        let mut candidate: Iterate<S, D> = Iterate::zeros(x.raw_dim());

        current.point.assign(&x);
        self.projection.clip_point(current.point.view_mut());
        current.evaluate(objective);
        current.check_finite()?;
        self.projection
            .clip_gradient(current.point.view(), current.gradient.view_mut());
        let mut evaluations = 1;

        let mut step = StepSize::new(self.alpha0, self.beta, self.max_alpha);
        let mut iterations = 0;
        while !stop.done(
            current.point.view(),
            current.value,
            current.gradient.view(),
        ) {
            let mut alpha = step.begin(iterations);
            self.trial(objective, &current, &mut candidate, alpha);
            evaluations += 1;

            let mut backtracks = 0;
            let mut grew = false;
            if self.sufficient_decrease(&current, &candidate) {
                grew = step.accept();
            } else {
                loop {
                    if self.max_backtracks == Some(backtracks) {
                        warn!(
                            "iteration {}: no sufficient decrease after {} reductions (alpha = {:e}, f = {:e})",
                            iterations, backtracks, alpha, current.value
                        );
                        return Err(Error::BacktrackLimit {
                            max_backtracks: backtracks,
                            alpha: to_f64(alpha),
                        });
                    }
                    alpha = step.shrink();
                    backtracks += 1;
                    self.trial(objective, &current, &mut candidate, alpha);
                    evaluations += 1;
                    if self.sufficient_decrease(&current, &candidate) {
                        break;
                    }
                }
            }
            step.commit();
            if grew {
                debug!("iteration {}: step grows to {:e}", iterations, step.alpha());
            }

            if let Err(e) = candidate.check_finite() {
                warn!("iteration {}: accepted point is not finite: {}", iterations, e);
                return Err(e);
            }
            mem::swap(&mut current, &mut candidate);
            self.projection
                .clip_gradient(current.point.view(), current.gradient.view_mut());
            iterations += 1;
            trace!(
                "iteration {}: f = {:e}, alpha = {:e}, reductions = {}",
                iterations,
                current.value,
                alpha,
                backtracks
            );
        }

        debug!(
            "stopped after {} iterations, {} evaluations, f = {:e}",
            iterations, evaluations, current.value
        );
        x.assign(&current.point);
        Ok(Solution {
            value: current.value,
            iterations,
            evaluations,
            alpha: step.alpha(),
        })
    }

    /// `to = P[from - alpha * grad(from)]`, then evaluate it.
    fn trial<D, O>(&self, objective: &O, from: &Iterate<S, D>, to: &mut Iterate<S, D>, alpha: S)
    where
        D: Dimension,
        P: Projection<S, D>,
        O: Objective<S, D>,
    {
        Zip::from(&mut to.point)
            .and(&from.point)
            .and(&from.gradient)
            .apply(|t, &x, &g| *t = x - alpha * g);
        self.projection.clip_point(to.point.view_mut());
        to.evaluate(objective);
    }

    /// Armijo condition along the projection arc.
    fn sufficient_decrease<D: Dimension>(&self, from: &Iterate<S, D>, to: &Iterate<S, D>) -> bool {
        let predicted = directional_decrease(
            from.gradient.view(),
            from.point.view(),
            to.point.view(),
        );
        to_f64(to.value - from.value) <= to_f64(self.sigma) * predicted
    }
}

/// $`\sum_i g_i (x^+_i - x_i)`$ accumulated in `f64`.
pub fn directional_decrease<S, D>(
    gradient: ArrayView<S, D>,
    from: ArrayView<S, D>,
    to: ArrayView<S, D>,
) -> f64
where
    S: NdFloat,
    D: Dimension,
{
    gradient
        .iter()
        .zip(from.iter())
        .zip(to.iter())
        .fold(0., |acc, ((&g, &x), &y)| {
            acc + to_f64(g) * (to_f64(y) - to_f64(x))
        })
}

fn positive<S: NdFloat>(name: &'static str, v: S) -> Result<()> {
    if v > S::zero() && v.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            value: to_f64(v),
            reason: "must be positive and finite",
        })
    }
}
