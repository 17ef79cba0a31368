//! Stopping rules
//!
//! A [`StopCriterion`] is consulted before every iteration with the current
//! point, its objective value and its projected gradient. It may keep
//! private state (iteration counters, a reference norm) but never touches
//! its arguments. Wall-clock or iteration budgets are expressed here, the
//! optimizer has no other way to be cancelled.
//!
//! The provided criteria chain with an inherent `or`:
//! `GradientNorm::new(1e-6).or(MaxIterations::new(500))`.

use ndarray::prelude::*;
use ndarray::NdFloat;

use crate::to_f64;

pub trait StopCriterion<S, D>
where
    S: NdFloat,
    D: Dimension,
{
    fn done(&mut self, x: ArrayView<S, D>, value: S, gradient: ArrayView<S, D>) -> bool;
}

impl<S, D, F> StopCriterion<S, D> for F
where
    S: NdFloat,
    D: Dimension,
    F: FnMut(ArrayView<S, D>, S, ArrayView<S, D>) -> bool,
{
    #[inline]
    fn done(&mut self, x: ArrayView<S, D>, value: S, gradient: ArrayView<S, D>) -> bool {
        self(x, value, gradient)
    }
}

/// Euclidean norm accumulated in double precision.
pub fn norm_l2<S, D>(a: ArrayView<S, D>) -> f64
where
    S: NdFloat,
    D: Dimension,
{
    a.iter()
        .map(|&ai| {
            let ai = to_f64(ai);
            ai * ai
        })
        .sum::<f64>()
        .sqrt()
}

/// Done when $`\|\nabla^P f(x)\|_2 \leq \mathrm{tol}`$.
#[derive(Debug, Clone, Copy)]
pub struct GradientNorm {
    pub tol: f64,
}

impl GradientNorm {
    pub fn new(tol: f64) -> Self {
        GradientNorm { tol }
    }

    /// Stop as soon as either criterion is met.
    pub fn or<C>(self, other: C) -> AnyOf<Self, C> {
        AnyOf(self, other)
    }
}

impl<S: NdFloat, D: Dimension> StopCriterion<S, D> for GradientNorm {
    fn done(&mut self, _x: ArrayView<S, D>, _value: S, gradient: ArrayView<S, D>) -> bool {
        norm_l2(gradient) <= self.tol
    }
}

/// Done when $`\|\nabla^P f(x_k)\|_2 \leq \mathrm{tol}\, \|\nabla^P f(x_0)\|_2`$,
/// with $`x_0`$ the point of the first call.
#[derive(Debug, Clone, Copy)]
pub struct RelativeGradientNorm {
    pub tol: f64,
    initial: Option<f64>,
}

impl RelativeGradientNorm {
    pub fn new(tol: f64) -> Self {
        RelativeGradientNorm { tol, initial: None }
    }

    /// The norm seen on the first call, if any.
    pub fn initial(&self) -> Option<f64> {
        self.initial
    }

    /// Stop as soon as either criterion is met.
    pub fn or<C>(self, other: C) -> AnyOf<Self, C> {
        AnyOf(self, other)
    }
}

impl<S: NdFloat, D: Dimension> StopCriterion<S, D> for RelativeGradientNorm {
    fn done(&mut self, _x: ArrayView<S, D>, _value: S, gradient: ArrayView<S, D>) -> bool {
        let norm = norm_l2(gradient);
        let initial = *self.initial.get_or_insert(norm);
        norm <= self.tol * initial
    }
}

/// Done after `max` iterations, i.e. on the `max + 1`-th call.
#[derive(Debug, Clone, Copy)]
pub struct MaxIterations {
    pub max: usize,
    calls: usize,
}

impl MaxIterations {
    pub fn new(max: usize) -> Self {
        MaxIterations { max, calls: 0 }
    }

    /// Iterations seen so far.
    pub fn iterations(&self) -> usize {
        self.calls.saturating_sub(1)
    }

    /// Stop as soon as either criterion is met.
    pub fn or<C>(self, other: C) -> AnyOf<Self, C> {
        AnyOf(self, other)
    }
}

impl<S: NdFloat, D: Dimension> StopCriterion<S, D> for MaxIterations {
    fn done(&mut self, _x: ArrayView<S, D>, _value: S, _gradient: ArrayView<S, D>) -> bool {
        self.calls += 1;
        self.calls > self.max
    }
}

/// Either of two criteria. Both are always consulted so that stateful
/// criteria see every iteration.
#[derive(Debug, Clone, Copy)]
pub struct AnyOf<A, B>(pub A, pub B);

impl<A, B> AnyOf<A, B> {
    pub fn new(a: A, b: B) -> Self {
        AnyOf(a, b)
    }

    /// Stop as soon as either criterion is met.
    pub fn or<C>(self, other: C) -> AnyOf<Self, C> {
        AnyOf(self, other)
    }
}

impl<S, D, A, B> StopCriterion<S, D> for AnyOf<A, B>
where
    S: NdFloat,
    D: Dimension,
    A: StopCriterion<S, D>,
    B: StopCriterion<S, D>,
{
    fn done(&mut self, x: ArrayView<S, D>, value: S, gradient: ArrayView<S, D>) -> bool {
        let a = self.0.done(x.view(), value, gradient.view());
        let b = self.1.done(x, value, gradient);
        a || b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call<C: StopCriterion<f64, Ix1>>(c: &mut C, g: &Array1<f64>) -> bool {
        let x = Array1::zeros(g.len());
        c.done(x.view(), 0., g.view())
    }

    #[test]
    fn gradient_norm_threshold() {
        let mut c = GradientNorm::new(5.);
        assert!(call(&mut c, &array![3., 4.]));
        assert!(!call(&mut c, &array![3., 4.1]));
    }

    #[test]
    fn relative_norm_uses_first_call() {
        let mut c = RelativeGradientNorm::new(0.1);
        assert!(!call(&mut c, &array![10., 0.]));
        assert_eq!(c.initial(), Some(10.));
        assert!(!call(&mut c, &array![2., 0.]));
        assert!(call(&mut c, &array![0., 1.]));
    }

    #[test]
    fn relative_norm_done_at_stationary_start() {
        let mut c = RelativeGradientNorm::new(1e-3);
        assert!(call(&mut c, &array![0., 0.]));
    }

    #[test]
    fn max_iterations_counts_calls() {
        let mut c = MaxIterations::new(2);
        let g = array![1.];
        assert!(!call(&mut c, &g));
        assert!(!call(&mut c, &g));
        assert!(call(&mut c, &g));
        assert_eq!(c.iterations(), 2);

        let mut zero = MaxIterations::new(0);
        assert!(call(&mut zero, &g));
    }

    #[test]
    fn any_of_advances_both() {
        let mut c = AnyOf(GradientNorm::new(0.5), MaxIterations::new(3));
        let g = array![0.1];
        assert!(call(&mut c, &g));
        assert_eq!(c.1.iterations(), 0);
        let g = array![1.];
        assert!(!call(&mut c, &g));
        assert!(!call(&mut c, &g));
        assert!(call(&mut c, &g));
        assert_eq!(c.1.iterations(), 3);
    }

    #[test]
    fn or_chains_by_method() {
        let mut c = GradientNorm::new(0.5)
            .or(MaxIterations::new(2))
            .or(RelativeGradientNorm::new(1e-3));
        let g = array![1.];
        assert!(!call(&mut c, &g));
        assert!(!call(&mut c, &g));
        assert!(call(&mut c, &g));
        assert_eq!((c.0).1.iterations(), 2);
        assert_eq!(c.1.initial(), Some(1.));

        let mut c = AnyOf::new(MaxIterations::new(0), GradientNorm::new(0.));
        assert!(call(&mut c, &g));
    }

    #[test]
    fn closures_are_criteria() {
        let mut seen = Vec::new();
        {
            let mut c = |_x: ArrayView1<f64>, v: f64, _g: ArrayView1<f64>| {
                seen.push(v);
                seen.len() > 1
            };
            let x = array![0.];
            assert!(!c.done(x.view(), 1., x.view()));
            assert!(c.done(x.view(), 2., x.view()));
        }
        assert_eq!(seen, vec![1., 2.]);
    }
}
