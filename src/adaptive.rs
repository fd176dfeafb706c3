use std::cmp::Ordering;
use std::collections::binary_heap::{BinaryHeap, Iter};
use std::fmt;

/// One piece of an adaptively refined interval
///
/// Carries the local expansion coefficients and the error metric that keys
/// the refinement heap. The affine map to the reference interval mirrors the
/// one on [`Element`](crate::domain::element::Element), including clamping.
#[derive(Clone, Debug)]
pub struct Segment {
    left: f64,
    right: f64,
    error: f64,
    coefs: Vec<f64>,
    c1: f64,
    c2: f64,
}

impl Segment {
    pub fn new(left: f64, right: f64, error: f64, coefs: Vec<f64>) -> Self {
        assert!(right > left, "degenerate segment [{}, {}]", left, right);

        Self {
            left,
            right,
            error,
            coefs,
            c1: 0.5 * (right + left),
            c2: 0.5 * (right - left),
        }
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    /// The local error metric this segment is ordered by
    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn coef(&self, i: usize) -> f64 {
        self.coefs[i]
    }

    pub fn coef_count(&self) -> usize {
        self.coefs.len()
    }

    /// Whether `x` lies in this segment (bounds inclusive)
    pub fn contains(&self, x: f64) -> bool {
        self.left <= x && x <= self.right
    }

    /// Reference coordinate of `x`, clamped to [-1, 1] against rounding
    pub fn x_inv(&self, x: f64) -> f64 {
        ((x - self.c1) / self.c2).clamp(-1.0, 1.0)
    }
}

// ordered by error metric alone, so the heap pops the worst segment first;
// equality goes through the same total order as cmp
impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.error.total_cmp(&other.error).is_eq()
    }
}

impl Eq for Segment {}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.error.total_cmp(&other.error)
    }
}

/// A max-heap of discretization pieces keyed by their error metric
///
/// The worst (largest-error) entry is always at the top. Read-only iteration
/// is exposed for node extraction; there is no random access.
#[derive(Clone, Debug)]
pub struct ErrorHeap<T: Ord> {
    heap: BinaryHeap<T>,
}

impl<T: Ord> ErrorHeap<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, entry: T) {
        self.heap.push(entry);
    }

    /// Remove and return the worst entry
    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop()
    }

    /// The worst entry, left in place
    pub fn peek(&self) -> Option<&T> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Iterate over all entries in unspecified order
    pub fn iter(&self) -> Iter<'_, T> {
        self.heap.iter()
    }
}

impl<T: Ord> Default for ErrorHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A problem that can be driven by the shared adaptive-refinement loop
///
/// The same pop-worst / bisect / re-solve skeleton appears in the function
/// approximator, the boundary-value solver, and the eigenproblem solver;
/// only the error metric and the refinement granularity differ. Implementors
/// provide those two pieces and [`refine_to_tolerance`] supplies the loop.
pub trait Refinable {
    type Error;

    /// Solve (or re-solve) as needed and return the current worst local
    /// error indicator
    fn error_indicator(&mut self) -> Result<f64, Self::Error>;

    /// Refine the discretization where the indicator is worst
    fn refine(&mut self) -> Result<(), Self::Error>;
}

/// Error type of the adaptive-refinement driver
#[derive(Debug, Clone, PartialEq)]
pub enum AdaptiveError<E> {
    /// The indicator stayed above tolerance for the whole iteration budget
    DidNotConverge { iterations: usize, error: f64 },
    /// An underlying solve failed; refinement cannot continue
    Solve(E),
}

impl<E: fmt::Display> fmt::Display for AdaptiveError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DidNotConverge { iterations, error } => write!(
                f,
                "Refinement did not converge within {} iterations (worst error {:e})!",
                iterations, error
            ),
            Self::Solve(err) => write!(f, "{}", err),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AdaptiveError<E> {}

/// Drive a [`Refinable`] problem until its error indicator drops below
/// `tolerance`, returning the number of refinement iterations performed
///
/// At least `forced_iterations` refinements are performed regardless of the
/// indicator, to avoid premature termination on a misleadingly low early
/// error. The loop never runs more than `max_iterations` refinements;
/// exhausting the budget yields [`AdaptiveError::DidNotConverge`] rather
/// than looping forever on a pathological input.
pub fn refine_to_tolerance<P: Refinable>(
    problem: &mut P,
    tolerance: f64,
    forced_iterations: usize,
    max_iterations: usize,
) -> Result<usize, AdaptiveError<P::Error>> {
    let mut error = f64::MAX;

    for iter in 0..max_iterations {
        error = problem.error_indicator().map_err(AdaptiveError::Solve)?;

        if iter >= forced_iterations && error < tolerance {
            log::debug!(
                "refinement converged after {} iterations (worst error {:e})",
                iter,
                error
            );
            return Ok(iter);
        }

        log::trace!("refinement iteration {}: worst error {:e}", iter, error);
        problem.refine().map_err(AdaptiveError::Solve)?;
    }

    Err(AdaptiveError::DidNotConverge {
        iterations: max_iterations,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_pops_largest_error_first() {
        let mut heap = ErrorHeap::new();
        heap.push(Segment::new(0.0, 1.0, 0.5, vec![]));
        heap.push(Segment::new(1.0, 2.0, 2.0, vec![]));
        heap.push(Segment::new(2.0, 3.0, 1.0, vec![]));

        assert_eq!(heap.peek().unwrap().error(), 2.0);
        assert_eq!(heap.pop().unwrap().error(), 2.0);
        assert_eq!(heap.pop().unwrap().error(), 1.0);
        assert_eq!(heap.pop().unwrap().error(), 0.5);
        assert!(heap.is_empty());
    }

    #[test]
    fn segment_equality_agrees_with_ordering() {
        let plus = Segment::new(0.0, 1.0, 0.0, vec![]);
        let minus = Segment::new(1.0, 2.0, -0.0, vec![]);

        // the total order separates -0.0 from 0.0, and eq must follow it
        assert_eq!(
            plus.cmp(&minus) == std::cmp::Ordering::Equal,
            plus == minus
        );
        assert!(plus != minus);
        assert!(minus < plus);

        let same = Segment::new(3.0, 4.0, 0.0, vec![]);
        assert!(plus == same);
        assert_eq!(plus.cmp(&same), std::cmp::Ordering::Equal);
    }

    #[test]
    fn segment_reference_map_clamps() {
        let seg = Segment::new(1.0, 2.0, 0.0, vec![]);

        assert_eq!(seg.x_inv(1.0), -1.0);
        assert_eq!(seg.x_inv(2.0), 1.0);
        assert_eq!(seg.x_inv(2.0 + 1e-12), 1.0);
        assert!((seg.x_inv(1.5)).abs() < 1e-12);
        assert!(seg.contains(1.5));
        assert!(!seg.contains(2.5));
    }

    // an indicator that halves on every refinement
    struct Halving {
        error: f64,
    }

    impl Refinable for Halving {
        type Error = std::convert::Infallible;

        fn error_indicator(&mut self) -> Result<f64, Self::Error> {
            Ok(self.error)
        }

        fn refine(&mut self) -> Result<(), Self::Error> {
            self.error *= 0.5;
            Ok(())
        }
    }

    #[test]
    fn driver_converges_and_counts_iterations() {
        let mut problem = Halving { error: 1.0 };
        let iters = refine_to_tolerance(&mut problem, 1e-3, 0, 100).unwrap();

        // 1.0 * 0.5^10 < 1e-3
        assert_eq!(iters, 10);
    }

    #[test]
    fn driver_honors_forced_iterations() {
        let mut problem = Halving { error: 0.0 };
        let iters = refine_to_tolerance(&mut problem, 1e-3, 5, 100).unwrap();

        assert_eq!(iters, 5);
    }

    #[test]
    fn driver_rejects_non_convergent_problems() {
        struct Stuck;
        impl Refinable for Stuck {
            type Error = std::convert::Infallible;
            fn error_indicator(&mut self) -> Result<f64, Self::Error> {
                Ok(1.0)
            }
            fn refine(&mut self) -> Result<(), Self::Error> {
                Ok(())
            }
        }

        match refine_to_tolerance(&mut Stuck, 1e-3, 0, 25) {
            Err(AdaptiveError::DidNotConverge { iterations, error }) => {
                assert_eq!(iterations, 25);
                assert_eq!(error, 1.0);
            }
            other => panic!("expected DidNotConverge, got {:?}", other.map(|_| ())),
        }
    }
}
