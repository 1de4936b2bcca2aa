use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{DetectError, Result};

/// One second-order section, `a[0]` normalized to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 3],
}

impl Biquad {
    fn response(&self, z: Complex64) -> Complex64 {
        let zi = z.inv();
        let num = self.b[0] + zi * (self.b[1] + zi * self.b[2]);
        let den = self.a[0] + zi * (self.a[1] + zi * self.a[2]);
        num / den
    }
}

/// Digital Butterworth band-stop filter stored as cascaded biquads.
///
/// Designed from the analog low-pass prototype, transformed to band-stop
/// around the pre-warped edges and mapped with the bilinear transform.
#[derive(Debug, Clone)]
pub struct BandStop {
    sections: Vec<Biquad>,
}

impl BandStop {
    /// `order` is the prototype order; the resulting filter has `2 * order` poles.
    pub fn butterworth(order: usize, low_hz: f64, high_hz: f64, fs: f64) -> Result<Self> {
        let nyq = 0.5 * fs;
        let (lo, hi) = (low_hz / nyq, high_hz / nyq);
        if order == 0 || !(0.0 < lo && lo < hi && hi < 1.0) {
            return Err(DetectError::Feature(format!(
                "invalid band-stop design: order {order}, {low_hz}-{high_hz} Hz at {fs} Hz"
            )));
        }

        // Analog prototype, unit cutoff.
        let n = order as f64;
        let proto: Vec<Complex64> = (0..order)
            .map(|k| {
                let m = -(n - 1.0) + 2.0 * k as f64;
                -Complex64::from_polar(1.0, PI * m / (2.0 * n))
            })
            .collect();

        // Pre-warp for a bilinear transform at fs = 2.
        let fs_design = 2.0;
        let w_lo = 2.0 * fs_design * (PI * lo / fs_design).tan();
        let w_hi = 2.0 * fs_design * (PI * hi / fs_design).tan();
        let bw = w_hi - w_lo;
        let wo = (w_lo * w_hi).sqrt();

        // Low-pass to band-stop.
        let mut poles = Vec::with_capacity(2 * order);
        for p in &proto {
            let p_hp = (bw / 2.0) / *p;
            let d = (p_hp * p_hp - wo * wo).sqrt();
            poles.push(p_hp + d);
            poles.push(p_hp - d);
        }
        let zeros: Vec<Complex64> = (0..order)
            .map(|_| Complex64::new(0.0, wo))
            .chain((0..order).map(|_| Complex64::new(0.0, -wo)))
            .collect();
        let k_bs = (Complex64::new(1.0, 0.0) / proto.iter().map(|p| -p).product::<Complex64>()).re;

        // Bilinear transform.
        let fs2 = Complex64::new(2.0 * fs_design, 0.0);
        let z_d: Vec<Complex64> = zeros.iter().map(|z| (fs2 + z) / (fs2 - z)).collect();
        let p_d: Vec<Complex64> = poles.iter().map(|p| (fs2 + p) / (fs2 - p)).collect();
        let gain = k_bs
            * (zeros.iter().map(|z| fs2 - z).product::<Complex64>()
                / poles.iter().map(|p| fs2 - p).product::<Complex64>())
            .re;

        let num = quadratic_factors(&z_d);
        let den = quadratic_factors(&p_d);
        if num.len() != den.len() {
            return Err(DetectError::Feature(format!(
                "band-stop design produced {} zero and {} pole sections",
                num.len(),
                den.len()
            )));
        }

        let mut sections: Vec<Biquad> = num
            .into_iter()
            .zip(den)
            .map(|(b, a)| Biquad { b, a })
            .collect();
        for c in sections[0].b.iter_mut() {
            *c *= gain;
        }

        Ok(Self { sections })
    }

    /// Filters `x` causally from a zero initial state.
    pub fn filter(&self, x: &[f64]) -> Vec<f64> {
        let mut y = x.to_vec();
        for s in &self.sections {
            let (mut z1, mut z2) = (0.0f64, 0.0f64);
            for v in y.iter_mut() {
                let input = *v;
                let out = s.b[0] * input + z1;
                z1 = s.b[1] * input - s.a[1] * out + z2;
                z2 = s.b[2] * input - s.a[2] * out;
                *v = out;
            }
        }
        y
    }

    /// Magnitude response at `freq_hz` for sample rate `fs`.
    pub fn gain_at(&self, freq_hz: f64, fs: f64) -> f64 {
        let z = Complex64::from_polar(1.0, 2.0 * PI * freq_hz / fs);
        self.sections
            .iter()
            .map(|s| s.response(z))
            .product::<Complex64>()
            .norm()
    }

    pub fn order(&self) -> usize {
        self.sections.len() * 2
    }
}

/// Groups roots into real quadratics: conjugate pairs first, then real
/// roots two at a time.
fn quadratic_factors(roots: &[Complex64]) -> Vec<[f64; 3]> {
    let mut quads = Vec::new();
    let mut reals = Vec::new();
    for r in roots {
        let tol = 1e-10 * r.norm().max(1.0);
        if r.im > tol {
            quads.push([1.0, -2.0 * r.re, r.norm_sqr()]);
        } else if r.im.abs() <= tol {
            reals.push(r.re);
        }
    }
    for pair in reals.chunks(2) {
        match *pair {
            [a, b] => quads.push([1.0, -(a + b), a * b]),
            [a] => quads.push([1.0, -a, 0.0]),
            _ => {}
        }
    }
    quads
}
