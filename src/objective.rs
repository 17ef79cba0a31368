//! Differentiable objectives with caller-provided gradient buffers

use ndarray::prelude::*;
use ndarray::NdFloat;

/// A differentiable objective $`f`$ over arrays of shape `D`.
///
/// `evaluate` writes $`\nabla f(x)`$ into `grad` (same shape as `x`,
/// overwriting it) and returns $`f(x)`$. The buffer is owned by the
/// caller so that repeated evaluations do not allocate.
/// Implementations must be deterministic for a fixed `x`.
///
/// Any closure `Fn(ArrayView<S, D>, ArrayViewMut<S, D>) -> S` is an objective:
/// ```
/// use ndarray::prelude::*;
/// use ndarray_projgrad::Objective;
///
/// let f = |x: ArrayView1<f64>, mut g: ArrayViewMut1<f64>| {
///     g[0] = 2. * (x[0] - 3.);
///     (x[0] - 3.).powi(2)
/// };
/// let mut g = Array1::zeros(1);
/// assert_eq!(f.evaluate(array![1.].view(), g.view_mut()), 4.);
/// assert_eq!(g[0], -4.);
/// ```
pub trait Objective<S, D>
where
    S: NdFloat,
    D: Dimension,
{
    fn evaluate(&self, x: ArrayView<S, D>, grad: ArrayViewMut<S, D>) -> S;
}

impl<S, D, F> Objective<S, D> for F
where
    S: NdFloat,
    D: Dimension,
    F: Fn(ArrayView<S, D>, ArrayViewMut<S, D>) -> S,
{
    #[inline]
    fn evaluate(&self, x: ArrayView<S, D>, grad: ArrayViewMut<S, D>) -> S {
        self(x, grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shifted {
        c: Array1<f64>,
    }

    impl Objective<f64, Ix1> for Shifted {
        fn evaluate(&self, x: ArrayView1<f64>, mut grad: ArrayViewMut1<f64>) -> f64 {
            let r = &x - &self.c;
            grad.assign(&r);
            0.5 * r.dot(&r)
        }
    }

    #[test]
    fn struct_and_closure_agree() {
        let c = array![1., -2., 0.5];
        let shifted = Shifted { c: c.clone() };
        let closure = |x: ArrayView1<f64>, mut g: ArrayViewMut1<f64>| {
            let r = &x - &c;
            g.assign(&r);
            0.5 * r.dot(&r)
        };

        let x = array![0., 0., 0.];
        let mut g1 = Array1::zeros(3);
        let mut g2 = Array1::zeros(3);
        let f1 = shifted.evaluate(x.view(), g1.view_mut());
        let f2 = closure.evaluate(x.view(), g2.view_mut());
        assert_eq!(f1, f2);
        assert_eq!(f1, 0.5 * (1. + 4. + 0.25));
        assert_eq!(g1, g2);
        assert_eq!(g1, array![-1., 2., -0.5]);
    }
}
