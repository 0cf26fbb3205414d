//! Module wrapper running any [`Filter`] over a stream

use crate::domain::{ComplexF32, FilterConfig, FilterSample, SdrResult};
use crate::dsp::fftfilter::FftFilter;
use crate::dsp::filter::{Filter, FirFilter};
use crate::module::{Bindings, Module};

pub struct FilterModule<T: FilterSample> {
    filter: Box<dyn Filter<T>>,
    bindings: Bindings<T, T>,
}

impl<T: FilterSample> FilterModule<T> {
    pub fn new(filter: Box<dyn Filter<T>>) -> Self {
        Self {
            filter,
            bindings: Bindings::new(),
        }
    }

    /// Swap the filter; takes effect at the next unit of work
    pub fn set_filter(&mut self, filter: Box<dyn Filter<T>>) {
        self.filter = filter;
        self.bindings.signal().notify();
    }
}

impl FilterModule<ComplexF32> {
    /// Complex band-pass built from configuration, direct or FFT based
    pub fn from_config(config: &FilterConfig) -> SdrResult<Self> {
        Ok(Self::new(build_filter(config)?))
    }
}

/// Filter described by `config`
pub fn build_filter(config: &FilterConfig) -> SdrResult<Box<dyn Filter<ComplexF32>>> {
    config.validate()?;
    let filter: Box<dyn Filter<ComplexF32>> = if config.use_fft {
        Box::new(FftFilter::bandpass(
            config.low_cut,
            config.high_cut,
            config.transition,
            config.window,
        )?)
    } else {
        Box::new(FirFilter::<ComplexF32, ComplexF32>::bandpass(
            config.low_cut,
            config.high_cut,
            config.transition,
            config.window,
        )?)
    };
    Ok(filter)
}

impl<T: FilterSample> Module for FilterModule<T> {
    type Input = T;
    type Output = T;

    fn bindings(&self) -> &Bindings<T, T> {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings<T, T> {
        &mut self.bindings
    }

    fn can_process_with(&self, available: usize, writable: usize) -> bool {
        let min_size = self.filter.min_processing_size();
        available > min_size + self.filter.overhead() && writable > min_size
    }

    fn process(&mut self) {
        let overhead = self.filter.overhead();
        let Some((reader, writer)) = self.bindings.ports() else {
            return;
        };
        let available = reader.available();
        if available < overhead {
            return;
        }
        let size = (available - overhead).min(writer.writable());
        let produced = self
            .filter
            .apply(reader.read_slice(), writer.write_slice(), size);
        reader.advance(produced);
        writer.advance(produced);
    }
}
