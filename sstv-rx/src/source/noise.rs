use rand::{
    Rng,
    SeedableRng,
    distributions::{
        Distribution,
        Uniform,
    },
    rngs::SmallRng,
};

/// Endless stream of samples drawn from a distribution.
#[derive(Clone, Debug)]
pub struct Noise<R, D> {
    rng: R,
    distribution: D,
}

impl<R, D> Noise<R, D> {
    #[inline]
    pub fn new(rng: R, distribution: D) -> Self {
        Self { rng, distribution }
    }
}

impl<R, D> Iterator for Noise<R, D>
where
    R: Rng,
    D: Distribution<f64>,
{
    type Item = f64;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.rng.sample(&self.distribution))
    }
}

/// Uniform white noise in `[-1, 1]`, reproducible from `seed`.
pub fn white_noise(seed: u64) -> Noise<SmallRng, Uniform<f64>> {
    Noise::new(
        SmallRng::seed_from_u64(seed),
        Uniform::new_inclusive(-1.0, 1.0),
    )
}

#[cfg(test)]
mod tests {
    use crate::source::white_noise;

    #[test]
    fn it_is_bounded_and_reproducible() {
        let a = white_noise(3).take(1000).collect::<Vec<_>>();
        let b = white_noise(3).take(1000).collect::<Vec<_>>();
        assert_eq!(a, b);
        assert!(a.iter().all(|x| (-1.0..=1.0).contains(x)));
        let mean = a.iter().sum::<f64>() / a.len() as f64;
        assert!(mean.abs() < 0.1);
    }
}
