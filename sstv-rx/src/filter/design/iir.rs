//! Butterworth and Chebyshev low-pass design via the bilinear transform.
//!
//! Sections use the convention `w = x + a1·w[-1] + a2·w[-2]`,
//! `y = b0·w + b1·w[-1] + b0·w[-2]`, i.e. the feedback coefficients are stored
//! with their sign flipped and the feedforward is symmetric.

use std::f64::consts::PI;

use crate::filter::design::FilterError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoefficients {
    pub a1: f64,
    pub a2: f64,
    pub b0: f64,
    pub b1: f64,
}

impl BiquadCoefficients {
    pub fn dc_gain(&self) -> f64 {
        (2.0 * self.b0 + self.b1) / (1.0 - self.a1 - self.a2)
    }
}

/// Trailing section of an odd-order design: `w = x + a1·w[-1]`,
/// `y = b0·w + b1·w[-1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FirstOrderCoefficients {
    pub a1: f64,
    pub b0: f64,
    pub b1: f64,
}

impl FirstOrderCoefficients {
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1) / (1.0 - self.a1)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IirDesign {
    pub sections: Vec<BiquadCoefficients>,
    pub first_order: Option<FirstOrderCoefficients>,
}

impl IirDesign {
    pub fn order(&self) -> usize {
        2 * self.sections.len() + usize::from(self.first_order.is_some())
    }

    /// Gain of the whole cascade at 0 Hz.
    pub fn dc_gain(&self) -> f64 {
        let gain = self
            .sections
            .iter()
            .map(BiquadCoefficients::dc_gain)
            .product::<f64>();
        self.first_order
            .as_ref()
            .map_or(gain, |first_order| gain * first_order.dc_gain())
    }
}

/// Designs a low-pass IIR filter of the given order.
///
/// With `chebyshev_ripple` set to a passband ripple in dB this is a Chebyshev
/// type I design, otherwise Butterworth. An even-order Chebyshev design has a
/// DC gain of `10^(-ripple/20)`, everything else has unit DC gain.
pub fn design_iir(
    cutoff: f64,
    sample_rate: f64,
    order: usize,
    chebyshev_ripple: Option<f64>,
) -> Result<IirDesign, FilterError> {
    if order < 1 {
        return Err(FilterError::InvalidOrder { order });
    }
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(FilterError::InvalidSpec {
            reason: "sample rate must be positive",
        });
    }
    if !(cutoff > 0.0 && cutoff < 0.5 * sample_rate) {
        return Err(FilterError::InvalidSpec {
            reason: "cutoff must be between 0 and half the sample rate",
        });
    }

    // u = asinh(1/ε) / N
    let chebyshev_u = chebyshev_ripple
        .map(|ripple| {
            if !(ripple.is_finite() && ripple > 0.0) {
                return Err(FilterError::InvalidSpec {
                    reason: "chebyshev ripple must be positive",
                });
            }
            let epsilon = (10f64.powf(0.1 * ripple) - 1.0).sqrt();
            Ok((1.0 / epsilon).asinh() / order as f64)
        })
        .transpose()?;

    let warped = (PI * cutoff / sample_rate).tan();
    let n_order = order as f64;

    let mut sections = Vec::with_capacity(order / 2);
    let mut n = (order & 1) + 1;
    for _ in 0..order / 2 {
        let angle = n as f64 * PI / (2.0 * n_order);
        let (w0, zeta) = match chebyshev_u {
            Some(u) => {
                let d1 = u.sinh() * angle.cos();
                let d2 = u.cosh() * angle.sin();
                let w0 = d1.hypot(d2);
                (w0, d1 / w0)
            }
            None => (1.0, angle.cos()),
        };

        let w = warped * w0;
        let w2 = w * w;
        let a0 = 1.0 + 2.0 * zeta * w + w2;
        let b0 = w2 / a0;
        sections.push(BiquadCoefficients {
            a1: -2.0 * (w2 - 1.0) / a0,
            a2: -(1.0 - 2.0 * zeta * w + w2) / a0,
            b0,
            b1: 2.0 * b0,
        });

        n += 2;
    }

    if let (Some(ripple), 0) = (chebyshev_ripple, order & 1) {
        let scale = 10f64.powf(-ripple / 20.0).powf(1.0 / (order / 2) as f64);
        for section in &mut sections {
            section.b0 *= scale;
            section.b1 *= scale;
        }
    }

    let first_order = (order & 1 == 1).then(|| {
        let w = warped * chebyshev_u.map_or(1.0, f64::sinh);
        let b0 = w / (1.0 + w);
        FirstOrderCoefficients {
            a1: -(w - 1.0) / (1.0 + w),
            b0,
            b1: b0,
        }
    });

    Ok(IirDesign {
        sections,
        first_order,
    })
}
