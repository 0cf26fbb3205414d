//! Integration tests: multi-stage chains
//!
//! These tests wire several modules together with ring buffers and drive
//! them either on worker threads or with the synchronous driver, checking
//! that data flows end to end and that end of stream shuts every stage down.

use std::f32::consts::PI;
use std::thread;
use std::time::{Duration, Instant};

use csdr_lib::buffer::{intake, RingBuffer};
use csdr_lib::codec::{AdpcmDecoder, AdpcmEncoder};
use csdr_lib::domain::{AdpcmConfig, AgcConfig, ComplexF32, PipelineConfig};
use csdr_lib::dsp::{Agc, FilterModule, FirFilter, FractionalDecimator, TimingRecovery, Window};
use csdr_lib::module::{connect, shared, AsyncRunner, Module, SyncDriver};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

fn sine(amplitude: f32, freq: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| amplitude * (2.0 * PI * freq * n as f32).sin())
        .collect()
}

#[test]
fn agc_and_lowpass_on_worker_threads() {
    init_logging();
    let mut agc = Agc::<f32>::module(&AgcConfig::default()).unwrap();
    let lowpass = FirFilter::<f32, f32>::lowpass(0.1, 0.05, Window::Hamming).unwrap();
    let mut filter = FilterModule::<f32>::new(Box::new(lowpass));

    let (mut input, reader) = RingBuffer::new::<f32>(65_536);
    let (writer, output) = RingBuffer::new::<f32>(65_536);
    agc.set_reader(reader);
    connect(&mut agc, &mut filter, 4096);
    filter.set_writer(writer);

    let agc_runner = AsyncRunner::start("agc", shared(agc)).unwrap();
    let filter_runner = AsyncRunner::start("lowpass", shared(filter)).unwrap();

    let samples = sine(0.1, 0.01, 40_000);
    assert_eq!(input.push(&samples), samples.len());
    drop(input);

    assert!(
        wait_for(|| !agc_runner.is_running() && !filter_runner.is_running()),
        "both runners should exit after end of stream"
    );
    assert!(output.is_terminated(), "termination should reach the chain output");

    let filtered = output.read_slice();
    assert!(
        filtered.len() > 39_800 && filtered.len() <= 40_000,
        "only the filter's overhead may be held back, got {} samples",
        filtered.len()
    );
    let settled = filtered[30_000..].iter().fold(0.0f32, |m, y| m.max(y.abs()));
    assert!(
        (settled - 0.8).abs() < 0.08,
        "AGC should level the tone near 0.8 through the lowpass, got {settled}"
    );
}

#[test]
fn decimator_feeds_timing_recovery() {
    init_logging();
    // alternating symbols, sixteen samples each, peaks at 8 + 16k
    let samples: Vec<ComplexF32> = (0..1600)
        .map(|n| ComplexF32::new((PI * (n as f32 - 8.0) / 16.0).cos(), 0.0))
        .collect();

    let mut decimator = FractionalDecimator::<ComplexF32>::new(2.0, 4, None).unwrap();
    let mut timing = TimingRecovery::gardner(8, 0.5).unwrap();
    let (mut input, reader) = RingBuffer::new::<ComplexF32>(256);
    let (writer, output) = RingBuffer::new::<ComplexF32>(1024);
    decimator.set_reader(reader);
    connect(&mut decimator, &mut timing, 64);
    timing.set_writer(writer);

    let mut driver = SyncDriver::new();
    driver.add(shared(decimator)).add(shared(timing));

    // small buffers force many partial passes
    for chunk in samples.chunks(100) {
        assert_eq!(input.push(chunk), chunk.len());
        driver.run_until_idle();
    }
    drop(input);
    driver.run_until_idle();
    assert!(driver.is_finished());

    let symbols = output.read_slice();
    assert!(symbols.len() > 80, "expected about 100 symbols, got {}", symbols.len());
    let threshold = (PI / 8.0).cos() - 1e-3;
    for (k, s) in symbols.iter().enumerate().skip(4) {
        assert!(
            s.re.abs() >= threshold,
            "symbol {k} sampled {} away from a peak",
            s.re
        );
    }
}

#[test]
fn adpcm_link_fed_from_intake() {
    init_logging();
    let audio: Vec<i16> = sine(6000.0, 0.01, 20_000)
        .into_iter()
        .map(|x| x as i16)
        .collect();
    let config = AdpcmConfig { sync: true };

    let (mut producer, mut drain) = intake::<i16>(32_768);
    let (mut chain_input, reader) = RingBuffer::new::<i16>(4096);
    let (writer, output) = RingBuffer::new::<i16>(32_768);

    let mut encoder = AdpcmEncoder::from_config(&config);
    let mut decoder = AdpcmDecoder::from_config(&config);
    encoder.set_reader(reader);
    connect(&mut encoder, &mut decoder, 1024);
    decoder.set_writer(writer);

    let mut driver = SyncDriver::new();
    driver.add(shared(encoder)).add(shared(decoder));

    let callback = {
        let audio = audio.clone();
        thread::spawn(move || {
            for block in audio.chunks(480) {
                assert_eq!(producer.push(block), block.len());
            }
        })
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while !driver.is_finished() && Instant::now() < deadline {
        drain.pump(&mut chain_input);
        if !driver.step_all() {
            thread::sleep(Duration::from_millis(1));
        }
    }
    callback.join().unwrap();

    assert!(driver.is_finished(), "chain should finish once the intake closes");
    assert_eq!(drain.dropped(), 0);
    let decoded = output.read_slice();
    assert_eq!(decoded.len(), audio.len());
    for (n, (&x, &y)) in audio.iter().zip(decoded).enumerate().skip(200) {
        assert!((x as i32 - y as i32).abs() < 300, "sample {n}: {x} decoded as {y}");
    }
}

#[test]
fn pipeline_config_builds_its_stages() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain.json");
    let config = PipelineConfig {
        name: "PSK31 narrow".into(),
        buffer_size: 4096,
        ..PipelineConfig::default()
    };
    config.save(&path).unwrap();

    let loaded = PipelineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    let mut agc = Agc::<ComplexF32>::module(&loaded.agc).unwrap();
    let mut filter = FilterModule::from_config(&loaded.filter).unwrap();
    let mut decimator = FractionalDecimator::<ComplexF32>::from_config(&loaded.decimator).unwrap();
    let mut timing = TimingRecovery::new(&loaded.timing).unwrap();

    let (mut input, reader) = RingBuffer::new::<ComplexF32>(loaded.buffer_size);
    let (writer, output) = RingBuffer::new::<ComplexF32>(loaded.buffer_size);
    agc.set_reader(reader);
    connect(&mut agc, &mut filter, loaded.buffer_size);
    connect(&mut filter, &mut decimator, loaded.buffer_size);
    connect(&mut decimator, &mut timing, loaded.buffer_size);
    timing.set_writer(writer);

    let mut driver = SyncDriver::new();
    driver
        .add(shared(agc))
        .add(shared(filter))
        .add(shared(decimator))
        .add(shared(timing));

    let tone: Vec<ComplexF32> = (0..4000)
        .map(|n| ComplexF32::from_polar(0.5, 2.0 * PI * 0.01 * n as f32))
        .collect();
    assert_eq!(input.push(&tone), tone.len());
    drop(input);
    driver.run_until_idle();
    assert!(driver.is_finished(), "chain should finish once its input closes");

    let expected = tone.len() as f32 * loaded.symbol_rate() / loaded.sample_rate as f32;
    let symbols = output.read_slice().len() as f32;
    assert!(
        symbols > expected * 0.8 && symbols < expected * 1.25,
        "expected about {expected} symbols, got {symbols}"
    );
}
