//! Test signal sources.

mod noise;
mod sine;

pub use self::{
    noise::{
        Noise,
        white_noise,
    },
    sine::{
        SineWave,
        sine,
    },
};
