//! Interpolation helpers: lerp, cubic Bezier evaluation, Bezier-to-power
//! basis conversion, and the closed-form cubic solver used to invert weighted
//! Bezier time parametrization.

const NEARLY_ZERO: f64 = 1e-9;

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// De Casteljau evaluation of a cubic Bezier with scalar control points.
#[inline]
pub fn bezier_interp(p0: f32, p1: f32, p2: f32, p3: f32, alpha: f32) -> f32 {
    let p01 = lerp(p0, p1, alpha);
    let p12 = lerp(p1, p2, alpha);
    let p23 = lerp(p2, p3, alpha);
    let p012 = lerp(p01, p12, alpha);
    let p123 = lerp(p12, p23, alpha);
    lerp(p012, p123, alpha)
}

/// Convert cubic Bezier control values to power-basis coefficients
/// (t^3, t^2, t, 1).
pub fn bezier_to_power(a1: f64, b1: f64, c1: f64, d1: f64) -> (f64, f64, f64, f64) {
    let a = b1 - a1;
    let b = c1 - b1;
    let c = d1 - c1;
    let d = b - a;
    (c - b - d, 3.0 * d, 3.0 * a, a1)
}

/// Solve `coeff[3]*x^3 + coeff[2]*x^2 + coeff[1]*x + coeff[0] = 0` with
/// Cardano's formula. Real solutions only; returns the count written into
/// `solutions`.
pub fn solve_cubic(coeff: [f64; 4], solutions: &mut [f64; 3]) -> usize {
    fn cbrt(x: f64) -> f64 {
        if x > 0.0 {
            x.powf(1.0 / 3.0)
        } else if x < 0.0 {
            -(-x).powf(1.0 / 3.0)
        } else {
            0.0
        }
    }

    // Normal form: x^3 + Ax^2 + Bx + C = 0
    let a = coeff[2] / coeff[3];
    let b = coeff[1] / coeff[3];
    let c = coeff[0] / coeff[3];

    // Substitute x = y - A/3 to eliminate the quadric term: x^3 + px + q = 0
    let sq_a = a * a;
    let p = (1.0 / 3.0) * ((-1.0 / 3.0) * sq_a + b);
    let q = 0.5 * ((2.0 / 27.0) * a * sq_a - (1.0 / 3.0) * a * b + c);

    let cube_p = p * p * p;
    let d = q * q + cube_p;

    let count = if d.abs() < NEARLY_ZERO {
        if q.abs() < NEARLY_ZERO {
            // One triple solution
            solutions[0] = 0.0;
            1
        } else {
            // One single and one double solution
            let u = cbrt(-q);
            solutions[0] = 2.0 * u;
            solutions[1] = -u;
            2
        }
    } else if d < 0.0 {
        // Casus irreducibilis: three real solutions
        let phi = (1.0 / 3.0) * (-q / (-cube_p).sqrt()).acos();
        let t = 2.0 * (-p).sqrt();
        solutions[0] = t * phi.cos();
        solutions[1] = -t * (phi + std::f64::consts::PI / 3.0).cos();
        solutions[2] = -t * (phi - std::f64::consts::PI / 3.0).cos();
        3
    } else {
        // One real solution
        let sqrt_d = d.sqrt();
        let u = cbrt(sqrt_d - q);
        let v = -cbrt(sqrt_d + q);
        solutions[0] = u + v;
        1
    };

    // Resubstitute
    let sub = (1.0 / 3.0) * a;
    for s in solutions.iter_mut().take(count) {
        *s -= sub;
    }
    count
}
