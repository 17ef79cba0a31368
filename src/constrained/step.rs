//! Adaptive step size driven by recent backtracking history

use ndarray::NdFloat;

/// Number of recent iterations remembered by [`StepSize`].
pub const HISTORY_LEN: usize = 5;

/// Step size controller for the projected gradient method.
///
/// Holds the committed step size $`\alpha`$ across iterations together with
/// a circular record of the last [`HISTORY_LEN`] iterations. Slot `k % 5`
/// holds `+1` if iteration `k` was accepted at its initial step size, `-n`
/// if it needed `n` reductions, and `0` if it has not run in this cycle.
///
/// Two first-try acceptances in the window grow the step by $`1/\beta`$ and
/// clear the window; a rejection shrinks the trial step by $`\beta`$.
///
/// Usage per outer iteration is `begin`, then `accept` or one or more
/// `shrink`, then `commit`.
#[derive(Debug, Clone)]
pub struct StepSize<S> {
    alpha: S,
    trial: S,
    beta: S,
    max_alpha: Option<S>,
    history: [i32; HISTORY_LEN],
    slot: usize,
}

impl<S: NdFloat> StepSize<S> {
    pub fn new(alpha0: S, beta: S, max_alpha: Option<S>) -> Self {
        StepSize {
            alpha: alpha0,
            trial: alpha0,
            beta,
            max_alpha,
            history: [0; HISTORY_LEN],
            slot: 0,
        }
    }

    /// Start iteration `k`; returns the trial step size.
    pub fn begin(&mut self, k: usize) -> S {
        self.slot = k % HISTORY_LEN;
        self.history[self.slot] = 0;
        self.trial = self.alpha;
        self.trial
    }

    /// Record a first-try acceptance, growing the step if the window has
    /// seen one before. Returns true when the step grew.
    pub fn accept(&mut self) -> bool {
        self.history[self.slot] = 1;
        if self.history.iter().sum::<i32>() <= 1 {
            return false;
        }
        let grown = self.trial / self.beta;
        self.trial = match self.max_alpha {
            Some(max) if grown > max => max,
            _ => grown,
        };
        self.history = [0; HISTORY_LEN];
        true
    }

    /// Reduce the trial step after a rejection; returns the new trial.
    pub fn shrink(&mut self) -> S {
        self.trial = self.trial * self.beta;
        self.history[self.slot] -= 1;
        self.trial
    }

    /// Keep the trial step for the next iteration.
    pub fn commit(&mut self) {
        self.alpha = self.trial;
    }

    /// The committed step size.
    pub fn alpha(&self) -> S {
        self.alpha
    }

    pub fn history(&self) -> &[i32; HISTORY_LEN] {
        &self.history
    }
}
