use std::sync::Arc;

use crate::{
    filter::{
        design::{
            FilterError,
            iir::{
                IirDesign,
                design_iir,
            },
        },
        flush_denormal,
    },
    scan::Scanner,
};

/// Runs an [`IirDesign`] as a chain of direct form II sections.
#[derive(Clone, Debug)]
pub struct CascadedBiquadFilter {
    design: Arc<IirDesign>,
    state: Vec<[f64; 2]>,
    first_order_state: f64,
}

impl CascadedBiquadFilter {
    pub fn new(design: impl Into<Arc<IirDesign>>) -> Self {
        let design = design.into();
        let state = vec![[0.0; 2]; design.sections.len()];
        Self {
            design,
            state,
            first_order_state: 0.0,
        }
    }

    #[inline]
    pub fn design(&self) -> &IirDesign {
        &self.design
    }

    pub fn reset(&mut self) {
        self.state.fill([0.0; 2]);
        self.first_order_state = 0.0;
    }

    pub fn process(&mut self, sample: f64) -> f64 {
        let mut value = sample;

        for (section, [z0, z1]) in self.design.sections.iter().zip(&mut self.state) {
            let w = value + section.a1 * *z0 + section.a2 * *z1;
            value = section.b0 * w + section.b1 * *z0 + section.b0 * *z1;
            *z1 = *z0;
            *z0 = flush_denormal(w);
        }

        if let Some(first_order) = &self.design.first_order {
            let z0 = &mut self.first_order_state;
            let w = value + first_order.a1 * *z0;
            value = first_order.b0 * w + first_order.b1 * *z0;
            *z0 = flush_denormal(w);
        }

        value
    }
}

impl Scanner<f64> for CascadedBiquadFilter {
    type Output = f64;

    #[inline]
    fn scan(&mut self, sample: f64) -> Self::Output {
        self.process(sample)
    }
}

/// 2nd-order Butterworth low-pass.
pub fn lowpass(sample_rate: f64, cutoff_frequency: f64) -> Result<CascadedBiquadFilter, FilterError> {
    let design = design_iir(cutoff_frequency, sample_rate, 2, None)?;
    Ok(CascadedBiquadFilter::new(design))
}
