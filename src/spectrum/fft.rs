use std::f64::consts::PI;

use crate::error::{Result, VisualizerError};

/// Forward DFT of a real window.
///
/// `input`, `re_out` and `im_out` must all have the same power-of-two length.
pub fn forward(input: &[f64], re_out: &mut [f64], im_out: &mut [f64]) -> Result<()> {
    let n = input.len();
    check_size(n, &[re_out.len(), im_out.len()])?;

    re_out.copy_from_slice(input);
    im_out.fill(0.0);
    transform(re_out, im_out, false);
    Ok(())
}

/// Inverse DFT, normalized by `1/N`.
pub fn inverse(re_in: &[f64], im_in: &[f64], re_out: &mut [f64], im_out: &mut [f64]) -> Result<()> {
    let n = re_in.len();
    check_size(n, &[im_in.len(), re_out.len(), im_out.len()])?;

    re_out.copy_from_slice(re_in);
    im_out.copy_from_slice(im_in);
    transform(re_out, im_out, true);

    let scale = 1.0 / n as f64;
    for (re, im) in re_out.iter_mut().zip(im_out.iter_mut()) {
        *re *= scale;
        *im *= scale;
    }
    Ok(())
}

fn check_size(n: usize, others: &[usize]) -> Result<()> {
    if n == 0 || !n.is_power_of_two() || others.iter().any(|&len| len != n) {
        return Err(VisualizerError::InvalidFftSize(n));
    }
    Ok(())
}

/// In-place radix-2 Cooley-Tukey over split real/imaginary buffers.
fn transform(re: &mut [f64], im: &mut [f64], inverse: bool) {
    let n = re.len();
    bit_reverse(re, im);

    let sign = if inverse { 1.0 } else { -1.0 };
    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let theta = sign * 2.0 * PI / len as f64;

        // Twiddle recurrence: w <- w * e^{i*theta}, with cos(theta) - 1 kept
        // as -2 sin^2(theta/2) to limit drift.
        let wpr = -2.0 * (0.5 * theta).sin().powi(2);
        let wpi = theta.sin();
        let mut wr = 1.0;
        let mut wi = 0.0;

        for m in 0..half {
            let mut i = m;
            while i < n {
                let j = i + half;
                let tr = wr * re[j] - wi * im[j];
                let ti = wr * im[j] + wi * re[j];
                re[j] = re[i] - tr;
                im[j] = im[i] - ti;
                re[i] += tr;
                im[i] += ti;
                i += len;
            }
            let wtemp = wr;
            wr += wr * wpr - wi * wpi;
            wi += wi * wpr + wtemp * wpi;
        }

        len <<= 1;
    }
}

fn bit_reverse(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;

        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }
}
