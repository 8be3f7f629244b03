//! Inference-only layers over ndarray.
//!
//! Convolutions are lowered to a single matrix product per output frame
//! (im2col), which keeps the inner loop inside ndarray's GEMM.

use ndarray::{s, Array1, Array2, Array3, Array4, Array5, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::compute::ComputeMode;

/// Fully connected layer, `y = W x + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    /// `[out, in]`
    pub weight: Array2<f32>,
    /// `[out]`
    pub bias: Array1<f32>,
}

impl Linear {
    pub fn forward(&self, x: ArrayView1<f32>) -> Array1<f32> {
        self.weight.dot(&x) + &self.bias
    }
}

/// 1-D convolution over `[channels, length]`.
#[derive(Debug, Clone)]
pub struct Conv1d {
    /// `[out, in, kernel]`
    pub weight: Array3<f32>,
    /// `[out]`
    pub bias: Array1<f32>,
    pub stride: usize,
    pub padding: usize,
}

impl Conv1d {
    pub fn output_len(&self, input_len: usize) -> usize {
        let kernel = self.weight.dim().2;
        (input_len + 2 * self.padding).saturating_sub(kernel) / self.stride + 1
    }

    pub fn forward(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let (out_ch, in_ch, kernel) = self.weight.dim();
        let len = x.ncols();
        let out_len = self.output_len(len);

        // cols[(c, k), o] = x[c, o * stride + k - padding], zero outside
        let mut cols = Array2::<f32>::zeros((in_ch * kernel, out_len));
        for c in 0..in_ch {
            let row = x.row(c);
            for k in 0..kernel {
                let mut dst = cols.row_mut(c * kernel + k);
                for (o, v) in dst.iter_mut().enumerate() {
                    let pos = o * self.stride + k;
                    if pos >= self.padding && pos - self.padding < len {
                        *v = row[pos - self.padding];
                    }
                }
            }
        }

        let w = Array2::from_shape_fn((out_ch, in_ch * kernel), |(o, i)| {
            self.weight[[o, i / kernel, i % kernel]]
        });

        let mut out = w.dot(&cols);
        out += &self.bias.view().insert_axis(Axis(1));
        out
    }
}

/// 3-D convolution over `[channels, frames, height, width]` with a cubic
/// kernel, stride 1 and "same" zero padding.
#[derive(Debug, Clone)]
pub struct Conv3d {
    /// `[out, in, k, k, k]`
    pub weight: Array5<f32>,
    /// `[out]`
    pub bias: Array1<f32>,
}

impl Conv3d {
    fn kernel(&self) -> usize {
        self.weight.dim().2
    }

    /// Weight flattened to `[out, in * k^3]` in `(in, kt, kh, kw)` order.
    fn flat_weight(&self) -> Array2<f32> {
        let (out_ch, in_ch, k, _, _) = self.weight.dim();
        let taps = k * k * k;
        Array2::from_shape_fn((out_ch, in_ch * taps), |(o, i)| {
            let (c, tap) = (i / taps, i % taps);
            self.weight[[o, c, tap / (k * k), (tap / k) % k, tap % k]]
        })
    }

    pub fn forward(&self, x: &Array4<f32>, mode: ComputeMode) -> Array4<f32> {
        let (in_ch, frames, height, width) = x.dim();
        let out_ch = self.weight.dim().0;
        let k = self.kernel();
        let pad = k / 2;

        let mut padded = Array4::<f32>::zeros((in_ch, frames + 2 * pad, height + 2 * pad, width + 2 * pad));
        padded
            .slice_mut(s![.., pad..pad + frames, pad..pad + height, pad..pad + width])
            .assign(x);

        let weight = self.flat_weight();
        let bias = self.bias.view().insert_axis(Axis(1));

        let frame_out = |t: usize| -> Array2<f32> {
            let plane = height * width;
            let mut cols = Array2::<f32>::zeros((in_ch * k * k * k, plane));
            let mut row = 0;
            for c in 0..in_ch {
                for kt in 0..k {
                    for kh in 0..k {
                        for kw in 0..k {
                            let window = padded.slice(s![c, t + kt, kh..kh + height, kw..kw + width]);
                            for (dst, src) in cols.row_mut(row).iter_mut().zip(window.iter()) {
                                *dst = *src;
                            }
                            row += 1;
                        }
                    }
                }
            }
            let mut out = weight.dot(&cols);
            out += &bias;
            out
        };

        let per_frame: Vec<Array2<f32>> = match mode {
            ComputeMode::Parallel => (0..frames).into_par_iter().map(frame_out).collect(),
            ComputeMode::Sequential => (0..frames).map(frame_out).collect(),
        };

        let mut out = Array4::<f32>::zeros((out_ch, frames, height, width));
        for (t, frame) in per_frame.into_iter().enumerate() {
            for (o, plane) in frame.outer_iter().enumerate() {
                let mut dst = out.slice_mut(s![o, t, .., ..]);
                for (d, v) in dst.iter_mut().zip(plane.iter()) {
                    *d = *v;
                }
            }
        }
        out
    }
}

pub fn relu_inplace<D: ndarray::Dimension>(x: &mut ndarray::Array<f32, D>) {
    x.mapv_inplace(|v| v.max(0.0));
}

/// Adaptive average pooling along the last axis of `[channels, length]`.
///
/// Bin `i` covers `[floor(i * L / n), ceil((i + 1) * L / n))`.
pub fn adaptive_avg_pool1d(x: ArrayView2<f32>, bins: usize) -> Array2<f32> {
    let (channels, len) = x.dim();
    let mut out = Array2::<f32>::zeros((channels, bins));
    if len == 0 {
        return out;
    }
    for i in 0..bins {
        let start = i * len / bins;
        let end = ((i + 1) * len).div_ceil(bins).max(start + 1);
        let window = x.slice(s![.., start..end]);
        out.column_mut(i).assign(&window.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(channels)));
    }
    out
}

/// Mean over the spatial axes of `[channels, frames, height, width]`,
/// giving `[channels, frames]`.
pub fn spatial_mean(x: &Array4<f32>) -> Array2<f32> {
    let (channels, frames, h, w) = x.dim();
    let n = (h * w).max(1) as f32;
    Array2::from_shape_fn((channels, frames), |(c, t)| x.slice(s![c, t, .., ..]).sum() / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array};

    #[test]
    fn test_linear() {
        let layer = Linear {
            weight: arr2(&[[1.0, 2.0], [0.0, -1.0]]),
            bias: arr1(&[0.5, 0.0]),
        };
        let y = layer.forward(arr1(&[3.0, 4.0]).view());
        assert_eq!(y, arr1(&[11.5, -4.0]));
    }

    #[test]
    fn test_conv1d_matches_direct() {
        let weight = Array::from_shape_fn((2, 1, 3), |(o, _, k)| (o * 3 + k) as f32 * 0.5 - 1.0);
        let conv = Conv1d {
            weight: weight.clone(),
            bias: arr1(&[0.1, -0.2]),
            stride: 2,
            padding: 1,
        };
        let x = arr2(&[[1.0, 2.0, 3.0, 4.0, 5.0]]);
        let y = conv.forward(x.view());
        assert_eq!(y.dim(), (2, 3));

        for o in 0..2 {
            for t in 0..3 {
                let mut acc = conv.bias[o];
                for k in 0..3 {
                    let pos = (t * 2 + k) as isize - 1;
                    if (0..5).contains(&pos) {
                        acc += weight[[o, 0, k]] * x[[0, pos as usize]];
                    }
                }
                assert!((y[[o, t]] - acc).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_conv1d_output_len() {
        let conv = Conv1d {
            weight: Array3::zeros((16, 1, 5)),
            bias: Array1::zeros(16),
            stride: 2,
            padding: 2,
        };
        assert_eq!(conv.output_len(16000), 8000);
        assert_eq!(conv.output_len(8000), 4000);
    }

    fn direct_conv3d(conv: &Conv3d, x: &Array4<f32>) -> Array4<f32> {
        let (in_ch, t_len, h_len, w_len) = x.dim();
        let out_ch = conv.weight.dim().0;
        Array4::from_shape_fn((out_ch, t_len, h_len, w_len), |(o, t, y, xx)| {
            let mut acc = conv.bias[o];
            for c in 0..in_ch {
                for kt in 0..3 {
                    for kh in 0..3 {
                        for kw in 0..3 {
                            let (ti, yi, xi) = (t + kt, y + kh, xx + kw);
                            if ti >= 1 && yi >= 1 && xi >= 1 && ti - 1 < t_len && yi - 1 < h_len && xi - 1 < w_len {
                                acc += conv.weight[[o, c, kt, kh, kw]] * x[[c, ti - 1, yi - 1, xi - 1]];
                            }
                        }
                    }
                }
            }
            acc
        })
    }

    #[test]
    fn test_conv3d_matches_direct() {
        let conv = Conv3d {
            weight: Array5::from_shape_fn((2, 2, 3, 3, 3), |(o, c, a, b, d)| {
                ((o * 31 + c * 17 + a * 7 + b * 3 + d) % 11) as f32 * 0.1 - 0.5
            }),
            bias: arr1(&[0.25, -0.25]),
        };
        let x = Array4::from_shape_fn((2, 3, 4, 5), |(c, t, y, xx)| ((c + t * 2 + y * 3 + xx) % 7) as f32 / 7.0);

        let expected = direct_conv3d(&conv, &x);
        for mode in [ComputeMode::Sequential, ComputeMode::Parallel] {
            let got = conv.forward(&x, mode);
            assert_eq!(got.dim(), expected.dim());
            for (a, b) in got.iter().zip(expected.iter()) {
                assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_adaptive_pool_even_and_uneven() {
        let x = arr2(&[[1.0, 2.0, 3.0, 4.0]]);
        assert_eq!(adaptive_avg_pool1d(x.view(), 2), arr2(&[[1.5, 3.5]]));

        let x = arr2(&[[1.0, 2.0, 3.0, 4.0, 5.0]]);
        // Bins [0,2) [1,4) [3,5)
        let pooled = adaptive_avg_pool1d(x.view(), 3);
        assert!((pooled[[0, 0]] - 1.5).abs() < 1e-6);
        assert!((pooled[[0, 1]] - 3.0).abs() < 1e-6);
        assert!((pooled[[0, 2]] - 4.5).abs() < 1e-6);
    }

    #[test]
    fn test_spatial_mean() {
        let x = Array4::from_shape_fn((2, 3, 2, 2), |(c, t, _, xx)| (c * 10 + t) as f32 + xx as f32);
        let m = spatial_mean(&x);
        assert_eq!(m.dim(), (2, 3));
        assert!((m[[1, 2]] - 12.5).abs() < 1e-6);
    }

    #[test]
    fn test_relu() {
        let mut x = arr1(&[-1.0, 0.0, 2.0]);
        relu_inplace(&mut x);
        assert_eq!(x, arr1(&[0.0, 0.0, 2.0]));
    }
}
