//! Three-band equaliser: low shelf, peaking mid, high shelf in series.

use crate::{
    dsp::filter::{Biquad, BiquadCoefficients},
    module::params::{ParamSet, ParamSpec},
};

use super::EffectProcessor;

pub const LOW_FREQ: usize = 0;
pub const LOW_GAIN_DB: usize = 1;
pub const MID_FREQ: usize = 2;
pub const MID_GAIN_DB: usize = 3;
pub const MID_Q: usize = 4;
pub const HIGH_FREQ: usize = 5;
pub const HIGH_GAIN_DB: usize = 6;

pub static PARAMS: [ParamSpec; 7] = [
    ParamSpec::exponential("low_freq", 20.0, 1_000.0, 200.0),
    ParamSpec::linear("low_gain_db", -24.0, 24.0, 0.0),
    ParamSpec::exponential("mid_freq", 100.0, 10_000.0, 1_000.0),
    ParamSpec::linear("mid_gain_db", -24.0, 24.0, 0.0),
    ParamSpec::exponential("mid_q", 0.1, 10.0, 0.707),
    ParamSpec::exponential("high_freq", 1_000.0, 20_000.0, 5_000.0),
    ParamSpec::linear("high_gain_db", -24.0, 24.0, 0.0),
];

pub struct Equalizer {
    bands: [Biquad; 3],
    designed_for: Option<[f32; 7]>,
}

impl Equalizer {
    pub fn new() -> Self {
        Self {
            bands: Default::default(),
            designed_for: None,
        }
    }

    fn configure(&mut self, params: &ParamSet, sample_rate: f32) {
        let key: [f32; 7] = std::array::from_fn(|i| params.get(i));
        if self.designed_for == Some(key) {
            return;
        }
        self.bands[0].set_coefficients(BiquadCoefficients::low_shelf(
            key[LOW_FREQ],
            key[LOW_GAIN_DB],
            sample_rate,
        ));
        self.bands[1].set_coefficients(BiquadCoefficients::peaking(
            key[MID_FREQ],
            key[MID_GAIN_DB],
            key[MID_Q],
            sample_rate,
        ));
        self.bands[2].set_coefficients(BiquadCoefficients::high_shelf(
            key[HIGH_FREQ],
            key[HIGH_GAIN_DB],
            sample_rate,
        ));
        self.designed_for = Some(key);
    }
}

impl EffectProcessor for Equalizer {
    fn process(&mut self, params: &ParamSet, buffer: &mut [f32], sample_rate: f32) {
        self.configure(params, sample_rate);
        for band in &mut self.bands {
            band.render(buffer);
        }
    }

    fn reset(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }
}
