//! Derivative-free searches along a single angle.

const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Root of `f` between `lo` and `hi`, where `f(lo)` and `f(hi)` differ in sign.
/// `f` may be undefined (`None`) at some points; the search stops there and
/// returns the end of the bracket with the smaller residual.
pub fn bisect<F>(mut f: F, mut lo: f64, mut f_lo: f64, mut hi: f64, mut f_hi: f64, x_tol: f64, max_iter: usize) -> f64
where
    F: FnMut(f64) -> Option<f64>,
{
    for _ in 0..max_iter {
        if (hi - lo).abs() <= x_tol {
            break;
        }
        let mid = 0.5 * (lo + hi);
        let Some(f_mid) = f(mid) else {
            break;
        };
        if f_mid == 0.0 {
            return mid;
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
            f_hi = f_mid;
        }
    }

    if f_lo.abs() <= f_hi.abs() { lo } else { hi }
}

/// Golden-section minimum of `f` on `[lo, hi]`. Returns `(x, f(x))`.
pub fn golden_section<F>(mut f: F, mut lo: f64, mut hi: f64, x_tol: f64, max_iter: usize) -> (f64, f64)
where
    F: FnMut(f64) -> f64,
{
    let mut x1 = hi - INV_PHI * (hi - lo);
    let mut x2 = lo + INV_PHI * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);

    for _ in 0..max_iter {
        if (hi - lo).abs() <= x_tol {
            break;
        }
        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_PHI * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_PHI * (hi - lo);
            f2 = f(x2);
        }
    }

    if f1 <= f2 { (x1, f1) } else { (x2, f2) }
}
