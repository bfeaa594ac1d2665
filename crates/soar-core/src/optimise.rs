//! Bounded one-dimensional numerics: Brent minimisation and root finding.
//!
//! Both routines are pure: they only call the supplied objective and never
//! touch task state.

/// Convergence tolerance on the isoline parameter used for AAT targets.
pub const TOLERANCE_OPT_TARGET: f64 = 0.002;
/// Lower bound of the AAT isoline parameter search.
pub const MIN_ISOLINE_PARAMETER: f64 = 0.02;
/// Upper bound of the AAT isoline parameter search.
pub const MAX_ISOLINE_PARAMETER: f64 = 0.98;

const MAX_ITERATIONS: usize = 100;
/// (3 - sqrt 5) / 2
const GOLDEN_SECTION: f64 = 0.381_966_011_250_105_1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub x: f64,
    pub value: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Minimise `f` on `[lower, upper]` with Brent's method.
///
/// The bounds themselves are evaluated last, so the returned value is never
/// worse than `f(lower)` or `f(upper)`.
pub fn minimise<F>(mut f: F, lower: f64, upper: f64, tolerance: f64) -> Minimum
where
    F: FnMut(f64) -> f64,
{
    let (lower, upper) = if lower <= upper {
        (lower, upper)
    } else {
        (upper, lower)
    };
    let sqrt_eps = f64::EPSILON.sqrt();

    let (mut a, mut b) = (lower, upper);
    let mut x = a + GOLDEN_SECTION * (b - a);
    let (mut w, mut v) = (x, x);
    let mut fx = f(x);
    let (mut fw, mut fv) = (fx, fx);
    let (mut d, mut e) = (0.0_f64, 0.0_f64);
    let mut converged = false;
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        let midpoint = 0.5 * (a + b);
        let tol1 = sqrt_eps * x.abs() + tolerance / 3.0;
        let tol2 = 2.0 * tol1;
        if (x - midpoint).abs() <= tol2 - 0.5 * (b - a) {
            converged = true;
            break;
        }
        iterations += 1;

        let mut golden = true;
        if e.abs() > tol1 {
            // try a parabolic step through x, w, v
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            } else {
                q = -q;
            }
            let previous_step = e;
            e = d;
            if p.abs() < (0.5 * q * previous_step).abs() && p > q * (a - x) && p < q * (b - x) {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = if x < midpoint { tol1 } else { -tol1 };
                }
                golden = false;
            }
        }
        if golden {
            e = if x >= midpoint { a - x } else { b - x };
            d = GOLDEN_SECTION * e;
        }

        let u = if d.abs() >= tol1 {
            x + d
        } else if d > 0.0 {
            x + tol1
        } else {
            x - tol1
        };
        let fu = f(u);

        if fu <= fx {
            if u < x {
                b = x;
            } else {
                a = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }

    let mut best = Minimum {
        x,
        value: fx,
        converged,
        iterations,
    };
    for bound in [lower, upper] {
        let value = f(bound);
        if value < best.value {
            best.x = bound;
            best.value = value;
        }
    }
    best
}

/// Find a root of `f` in `[lower, upper]` (Illinois false position).
///
/// Returns `None` if `f` does not change sign over the interval.
pub fn find_zero<F>(mut f: F, lower: f64, upper: f64, tolerance: f64) -> Option<f64>
where
    F: FnMut(f64) -> f64,
{
    let (mut a, mut b) = (lower, upper);
    let (mut fa, mut fb) = (f(a), f(b));
    if fa == 0.0 {
        return Some(a);
    }
    if fb == 0.0 {
        return Some(b);
    }
    if fa.signum() == fb.signum() {
        return None;
    }

    let mut side = 0;
    let mut previous = a;
    let mut c = a;
    for _ in 0..MAX_ITERATIONS {
        c = (a * fb - b * fa) / (fb - fa);
        let fc = f(c);
        if fc == 0.0 || (c - previous).abs() < tolerance {
            return Some(c);
        }
        previous = c;
        if fc.signum() == fb.signum() {
            b = c;
            fb = fc;
            if side == -1 {
                fa /= 2.0;
            }
            side = -1;
        } else {
            a = c;
            fa = fc;
            if side == 1 {
                fb /= 2.0;
            }
            side = 1;
        }
    }
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimise_finds_interior_minimum() {
        let result = minimise(|x| (x - 0.3).powi(2) + 1.0, 0.0, 1.0, 1e-4);
        assert!(result.converged);
        assert!((result.x - 0.3).abs() < 1e-3);
        assert!((result.value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn minimise_never_worse_than_bounds() {
        let f = |x: f64| x;
        let result = minimise(f, MIN_ISOLINE_PARAMETER, MAX_ISOLINE_PARAMETER, TOLERANCE_OPT_TARGET);
        assert!(result.x >= MIN_ISOLINE_PARAMETER && result.x <= MAX_ISOLINE_PARAMETER);
        assert!(result.value <= f(MIN_ISOLINE_PARAMETER));
        assert!(result.value <= f(MAX_ISOLINE_PARAMETER));
        assert!((result.x - MIN_ISOLINE_PARAMETER).abs() < 1e-2);
    }

    #[test]
    fn minimise_handles_non_smooth_objective() {
        let result = minimise(|x| (x - 0.7).abs(), 0.0, 1.0, 1e-4);
        assert!((result.x - 0.7).abs() < 1e-3);
    }

    #[test]
    fn find_zero_brackets_root() {
        let root = find_zero(|x| x * x - 0.25, 0.0, 1.0, 1e-6).expect("root");
        assert!((root - 0.5).abs() < 1e-5);
    }

    #[test]
    fn find_zero_without_sign_change_is_none() {
        assert!(find_zero(|x| x * x + 1.0, -1.0, 1.0, 1e-6).is_none());
    }
}
