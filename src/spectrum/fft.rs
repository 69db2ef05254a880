// FFT module - radix-2 Cooley-Tukey transform with cached tables
//
// Tables (bit-reversal permutation, cosine and sine twiddles) are built once
// per transform size and shared read-only for the rest of the process. Only a
// handful of sizes ever occur (2048/4096/8192), so the cache never evicts.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, RwLock};

/// Process-wide table cache keyed by transform size.
static CONTEXTS: Lazy<RwLock<HashMap<usize, Arc<FftContext>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Precomputed tables for one transform size
#[derive(Debug)]
pub struct FftContext {
    n: usize,
    bit_reverse: Vec<u32>,
    cos: Vec<f32>,
    sin: Vec<f32>,
}

impl FftContext {
    /// Build the tables for size `n`
    ///
    /// # Panics
    /// Panics if `n` is not a power of two or is smaller than 2.
    pub fn new(n: usize) -> Self {
        assert!(
            n >= 2 && n.is_power_of_two(),
            "FFT size must be a power of two >= 2 (got {})",
            n
        );

        // bit[i + lim] = bit[i] + n / (2 * lim)
        let mut bit_reverse = vec![0u32; n];
        let mut lim = 1;
        let mut b = (n >> 1) as u32;
        while lim < n {
            for i in 0..lim {
                bit_reverse[i + lim] = bit_reverse[i] + b;
            }
            lim <<= 1;
            b >>= 1;
        }

        let k = -2.0 * PI / n as f64;
        let (cos, sin) = (0..n / 2)
            .map(|i| {
                let angle = k * i as f64;
                (angle.cos() as f32, angle.sin() as f32)
            })
            .unzip();

        Self {
            n,
            bit_reverse,
            cos,
            sin,
        }
    }

    /// Transform length
    pub fn n(&self) -> usize {
        self.n
    }

    /// Bit-reversal permutation (length `n`)
    pub fn bit_reverse(&self) -> &[u32] {
        &self.bit_reverse
    }

    /// Cosine twiddles, `cos(-2*pi*i/n)` for `i < n/2`
    pub fn cos_table(&self) -> &[f32] {
        &self.cos
    }

    /// Sine twiddles, `sin(-2*pi*i/n)` for `i < n/2`
    pub fn sin_table(&self) -> &[f32] {
        &self.sin
    }
}

/// Fetch (building on first use) the shared tables for size `n`
pub fn fft_context(n: usize) -> Arc<FftContext> {
    if let Some(ctx) = CONTEXTS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&n)
    {
        return Arc::clone(ctx);
    }

    let mut contexts = CONTEXTS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(contexts.entry(n).or_insert_with(|| {
        tracing::debug!("[FFT] Building tables for n={}", n);
        Arc::new(FftContext::new(n))
    }))
}

/// Number of distinct sizes currently cached
pub fn cached_sizes() -> usize {
    CONTEXTS
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .len()
}

/// Apply the bit-reversal permutation in place
pub fn bit_reverse_permute<T>(ctx: &FftContext, data: &mut [T]) {
    for (i, &j) in ctx.bit_reverse.iter().enumerate() {
        let j = j as usize;
        if j > i {
            data.swap(i, j);
        }
    }
}

/// In-place forward DFT of length `ctx.n()`
///
/// Unnormalized: the output scale is `n` times the orthonormal transform.
/// Both buffers must have exactly `ctx.n()` elements.
pub fn transform(ctx: &FftContext, real: &mut [f32], imag: &mut [f32]) {
    let n = ctx.n;
    debug_assert_eq!(real.len(), n, "real buffer length must equal FFT size");
    debug_assert_eq!(imag.len(), n, "imag buffer length must equal FFT size");

    bit_reverse_permute(ctx, real);
    bit_reverse_permute(ctx, imag);

    let mut size = 2;
    while size <= n {
        let half = size / 2;
        let step = n / size;

        for start in (0..n).step_by(size) {
            for j in 0..half {
                let k = j * step;
                let (c, s) = (ctx.cos[k], ctx.sin[k]);
                let lo = start + j;
                let hi = lo + half;

                let tr = real[hi] * c - imag[hi] * s;
                let ti = real[hi] * s + imag[hi] * c;

                real[hi] = real[lo] - tr;
                imag[hi] = imag[lo] - ti;
                real[lo] += tr;
                imag[lo] += ti;
            }
        }

        size *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use rustfft::{num_complex::Complex, FftPlanner};

    fn power(real: &[f32], imag: &[f32], k: usize) -> f64 {
        (real[k] as f64).powi(2) + (imag[k] as f64).powi(2)
    }

    #[test]
    fn test_bit_reverse_is_involution() {
        for n in [2usize, 8, 64, 2048] {
            let ctx = FftContext::new(n);
            for i in 0..n {
                let j = ctx.bit_reverse()[i] as usize;
                assert_eq!(ctx.bit_reverse()[j] as usize, i);
            }

            let original: Vec<usize> = (0..n).collect();
            let mut data = original.clone();
            bit_reverse_permute(&ctx, &mut data);
            bit_reverse_permute(&ctx, &mut data);
            assert_eq!(data, original);
        }
    }

    #[test]
    fn test_bit_reverse_small_table() {
        let ctx = FftContext::new(8);
        assert_eq!(ctx.bit_reverse(), &[0, 4, 2, 6, 1, 5, 3, 7]);
    }

    #[test]
    fn test_twiddle_tables() {
        let ctx = FftContext::new(4);
        assert_eq!(ctx.cos_table().len(), 2);
        assert!((ctx.cos_table()[1]).abs() < 1e-6);
        assert!((ctx.sin_table()[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_rejects_non_power_of_two() {
        let _ = FftContext::new(1000);
    }

    #[test]
    fn test_context_cache_shares_tables() {
        let a = fft_context(1024);
        let b = fft_context(1024);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cached_sizes() >= 1);
    }

    #[test]
    fn test_pure_tone_concentrates_energy() {
        for n in [2048usize, 4096, 8192] {
            let ctx = fft_context(n);
            let k = 37;
            let mut real: Vec<f32> = (0..n)
                .map(|i| (2.0 * PI * k as f64 * i as f64 / n as f64).sin() as f32)
                .collect();
            let mut imag = vec![0.0f32; n];
            transform(&ctx, &mut real, &mut imag);

            let total: f64 = (0..n).map(|b| power(&real, &imag, b)).sum();
            let peak = power(&real, &imag, k) + power(&real, &imag, n - k);
            assert!(
                peak / total >= 0.99,
                "n={} peak ratio {}",
                n,
                peak / total
            );

            let strongest = (0..n / 2)
                .max_by(|&a, &b| power(&real, &imag, a).total_cmp(&power(&real, &imag, b)))
                .unwrap();
            assert_eq!(strongest, k);
        }
    }

    #[test]
    fn test_parseval() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 4096;
        let ctx = fft_context(n);
        let input: Vec<f32> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let time_energy: f64 = input.iter().map(|&x| (x as f64).powi(2)).sum();

        let mut real = input.clone();
        let mut imag = vec![0.0f32; n];
        transform(&ctx, &mut real, &mut imag);
        let freq_energy: f64 = (0..n).map(|b| power(&real, &imag, b)).sum();

        let expected = n as f64 * time_energy;
        assert!(
            ((freq_energy - expected) / expected).abs() < 1e-3,
            "freq={} expected={}",
            freq_energy,
            expected
        );
    }

    #[test]
    fn test_matches_rustfft() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 2048;
        let input: Vec<f32> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let mut reference: Vec<Complex<f32>> =
            input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut reference);

        let ctx = fft_context(n);
        let mut real = input;
        let mut imag = vec![0.0f32; n];
        transform(&ctx, &mut real, &mut imag);

        for (k, expected) in reference.iter().enumerate() {
            assert!((real[k] - expected.re).abs() < 1e-2, "re mismatch at {}", k);
            assert!((imag[k] - expected.im).abs() < 1e-2, "im mismatch at {}", k);
        }
    }
}
