//! First Order Methods for Bound-Constrained Minimization
//!
//! For minimizing a differentiable objective function, $`f`$, over a
//! feasible set $`\Omega`$ that has a cheap projection
//! ```math
//! P(x) = \mathrm{arg}\!\min_{z \in \Omega} \| z - x \|_2
//! ```
//! such as the non-negative orthant or a box. The canonical use is the pair
//! of non-negative least squares sub-problems that make up non-negative
//! matrix factorization, see [`crate::nmf`].
//!
//! Every iterate handed to the objective lies in $`\Omega`$.

mod pg;
pub use pg::*;
mod step;
pub use step::*;
