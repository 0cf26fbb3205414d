//! Decimation by a non-integer factor
//!
//! Each output sample is a Lagrange polynomial through `num_poly_points`
//! neighbouring (optionally low-pass filtered) inputs, evaluated at a
//! fractional read position that advances by `rate` per output.

use crate::domain::{DecimatorConfig, FilterSample, SdrError, SdrResult};
use crate::dsp::filter::{Filter, FirFilter, SampleFilter};
use crate::module::{Bindings, Module};

pub struct FractionalDecimator<T: FilterSample> {
    rate: f32,
    num_poly_points: usize,
    /// Leftmost interpolation node, relative to the sample left of `position`
    first_node: i32,
    denominators: Vec<f32>,
    coeffs: Vec<f32>,
    filter: Option<FirFilter<T, f32>>,
    /// Fractional read position into the current input window
    position: f32,
    bindings: Bindings<T, T>,
}

impl<T: FilterSample> FractionalDecimator<T> {
    /// Decimate by `rate` with `num_poly_points` interpolation points (rounded
    /// down to an even count) and an optional anti-alias filter
    pub fn new(
        rate: f32,
        num_poly_points: usize,
        filter: Option<FirFilter<T, f32>>,
    ) -> SdrResult<Self> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SdrError::Config(format!(
                "decimation rate must be positive, got {rate}"
            )));
        }
        let num_poly_points = num_poly_points & !1;
        if num_poly_points < 4 {
            return Err(SdrError::Config(
                "at least four interpolation points are needed".into(),
            ));
        }

        let half = (num_poly_points / 2) as i32;
        let first_node = -half + 1;
        let nodes: Vec<i32> = (first_node..=half).collect();
        let denominators = nodes
            .iter()
            .map(|&xi| {
                nodes
                    .iter()
                    .filter(|&&xj| xj != xi)
                    .map(|&xj| (xi - xj) as f32)
                    .product()
            })
            .collect();

        Ok(Self {
            rate,
            num_poly_points,
            first_node,
            denominators,
            coeffs: vec![0.0; num_poly_points],
            filter,
            position: -first_node as f32,
            bindings: Bindings::new(),
        })
    }

    /// Build from configuration. With `prefilter` set, a low-pass with cutoff
    /// `0.5 / (rate - transition)` runs ahead of the interpolator.
    pub fn from_config(config: &DecimatorConfig) -> SdrResult<Self> {
        config.validate()?;
        let filter = if config.prefilter {
            let cutoff = 0.5 / (config.rate - config.transition);
            Some(FirFilter::lowpass(cutoff, config.transition, config.window)?)
        } else {
            None
        };
        log::debug!(
            "fractional decimator: rate {}, {} points, prefilter {}",
            config.rate,
            config.num_poly_points,
            config.prefilter
        );
        Self::new(config.rate, config.num_poly_points, filter)
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    fn filter_overhead(&self) -> usize {
        self.filter.as_ref().map_or(0, |f| f.overhead())
    }

    fn has_room(&self, position: f32, size: usize) -> bool {
        position.ceil() as usize + self.num_poly_points + self.filter_overhead() < size
    }
}

/// Lagrange numerators `prod(offset - xj)` for nodes starting at `first_node`
fn lagrange_numerators(coeffs: &mut [f32], first_node: i32, offset: f32) {
    let last_node = first_node + coeffs.len() as i32 - 1;
    for (coeff, xi) in coeffs.iter_mut().zip(first_node..=last_node) {
        *coeff = (first_node..=last_node)
            .filter(|&xj| xj != xi)
            .map(|xj| offset - xj as f32)
            .product();
    }
}

impl<T: FilterSample> Module for FractionalDecimator<T> {
    type Input = T;
    type Output = T;

    fn bindings(&self) -> &Bindings<T, T> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<T, T> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        writable > 0 && self.has_room(self.position, available)
    }

    fn process(&mut self) {
        let Some((available, writable)) = self.bindings.counts() else {
            return;
        };

        let mut outputs = Vec::new();
        let mut last_index = None;
        let mut position = self.position;
        {
            let Some(reader) = self.bindings.reader() else {
                return;
            };
            let input = reader.read_slice();
            while outputs.len() < writable && self.has_room(position, available) {
                let index = position.ceil() as usize - 1;
                lagrange_numerators(&mut self.coeffs, self.first_node, position - index as f32);

                let mut acc = T::zero();
                match &self.filter {
                    Some(filter) => {
                        let sparse = filter.sparse(input);
                        for (i, (&c, &d)) in self.coeffs.iter().zip(&self.denominators).enumerate() {
                            acc += sparse.get(index + i) * (c / d);
                        }
                    }
                    None => {
                        for (i, (&c, &d)) in self.coeffs.iter().zip(&self.denominators).enumerate() {
                            acc += input[index + i] * (c / d);
                        }
                    }
                }
                outputs.push(acc);
                last_index = Some(index);
                position += self.rate;
            }
        }

        let Some(index) = last_index else {
            return;
        };
        let consumed = (index as i32 + self.first_node).max(0) as usize;
        self.position = position - consumed as f32;

        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        writer.write_slice()[..outputs.len()].copy_from_slice(&outputs);
        writer.advance(outputs.len());
        reader.advance(consumed);
    }
}
