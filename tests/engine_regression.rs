use std::{thread, time::Duration};

use patchbay::{
    dsp::{envelope::EnvelopeCurve, filter::FilterType, oscillator::Waveform},
    effects::EffectType,
    engine,
    synth::EngineEvent,
    Controller, Engine, EngineConfig, ModuleShape, Patch,
};

const SAMPLE_RATE: usize = 48_000;

fn mono() -> EngineConfig {
    EngineConfig::default().with_channels(1)
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn ms(ms: usize) -> usize {
    SAMPLE_RATE * ms / 1000
}

/// sine → low-pass 1 kHz → ADSR(10 ms, 100 ms, 0.6, 200 ms)
fn reference_patch() -> Patch {
    let mut patch = Patch::new();
    patch
        .add_module(ModuleShape::Oscillator(Waveform::Sine))
        .unwrap();
    let filter = patch
        .add_module(ModuleShape::Filter(FilterType::LowPass))
        .unwrap();
    patch.set_parameter(filter, "cutoff", 1_000.0).unwrap();
    let env = patch
        .add_module(ModuleShape::Envelope(EnvelopeCurve::Exponential))
        .unwrap();
    patch.set_parameter(env, "attack", 0.01).unwrap();
    patch.set_parameter(env, "decay", 0.1).unwrap();
    patch.set_parameter(env, "sustain", 0.6).unwrap();
    patch.set_parameter(env, "release", 0.2).unwrap();
    patch
}

fn start(patch: Patch) -> (Engine, Controller) {
    engine::create(mono(), patch).unwrap()
}

#[test]
fn reference_note_rises_sustains_and_releases() {
    let (mut engine, mut controller) = start(reference_patch());
    controller.note_on(69, 100u8, 0).unwrap();
    let held = engine.render(ms(500));

    // Attack: energy rises
    let first = rms(&held[..ms(4)]);
    let second = rms(&held[ms(4)..ms(10)]);
    assert!(first < second, "attack did not rise: {first} vs {second}");

    // Sustain: 0.6 · sine RMS · velocity 100/127 · headroom · filter gain at 440 Hz
    let sustain = rms(&held[ms(300)..ms(500)]);
    assert!(
        (sustain - 0.082).abs() < 0.0082,
        "sustain RMS {sustain} is not within 10% of 0.082"
    );

    controller.note_off(69, 500).unwrap();
    let released = engine.render(ms(260));
    // Release ends within 200 ms plus one block of latency
    let tail = rms(&released[ms(215)..]);
    assert!(tail < 1e-4, "tail RMS {tail} after release");
    assert_eq!(engine.active_voices(), 0);
}

#[test]
fn identical_events_render_identical_output() {
    let play = || {
        let (mut engine, mut controller) = start(patchbay::presets::pad());
        controller.note_on(57, 90u8, 0).unwrap();
        controller.note_on(64, 70u8, 1).unwrap();
        let mut out = engine.render(ms(100));
        controller.pitch_bend(0.5).unwrap();
        controller.note_off(57, 2).unwrap();
        out.extend(engine.render(ms(100)));
        out
    };
    assert_eq!(play(), play());
}

#[test]
fn exported_topology_renders_bit_identical() {
    let mut original = reference_patch();
    let lfo = original
        .add_module(ModuleShape::Lfo(Waveform::Triangle))
        .unwrap();
    original.set_parameter(lfo, "rate", 3.0).unwrap();
    original.connect(lfo, patchbay::ModuleId(2), "cutoff", 0.2).unwrap();
    original.add_effect(EffectType::Chorus).unwrap();

    let imported = Patch::from_topology(&original.to_topology()).unwrap();

    let play = |patch: Patch| {
        let (mut engine, mut controller) = start(patch);
        controller.note_on(60, 110u8, 0).unwrap();
        engine.render(ms(200))
    };
    assert_eq!(play(original), play(imported));
}

#[test]
fn overflow_steals_without_discontinuity() {
    let mut patch = Patch::new();
    patch
        .add_module(ModuleShape::Oscillator(Waveform::Sine))
        .unwrap();
    let env = patch
        .add_module(ModuleShape::Envelope(EnvelopeCurve::Linear))
        .unwrap();
    patch.set_parameter(env, "attack", 0.002).unwrap();
    patch.set_parameter(env, "sustain", 1.0).unwrap();

    let config = mono().with_polyphony(2);
    let (mut engine, mut controller) = engine::create(config, patch).unwrap();
    controller.note_on(60, 127u8, 0).unwrap();
    controller.note_on(64, 127u8, 1).unwrap();
    let mut out = engine.render(ms(50));

    controller.note_on(67, 127u8, 2).unwrap();
    out.extend(engine.render(ms(50)));
    assert_eq!(engine.active_voices(), 2);

    let stolen = controller
        .poll_events()
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::VoiceStolen { .. }))
        .count();
    assert_eq!(stolen, 1);
    assert_eq!(controller.voices_stolen(), 1);

    // A hard cut would jump by up to one voice amplitude (0.25)
    let max_step = out
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0f32, f32::max);
    assert!(max_step < 0.06, "step of {max_step} in output");
}

#[test]
fn parameter_change_reaches_sounding_voice() {
    let mut patch = Patch::new();
    patch
        .add_module(ModuleShape::Oscillator(Waveform::Saw))
        .unwrap();
    let filter = patch
        .add_module(ModuleShape::Filter(FilterType::LowPass))
        .unwrap();
    patch.set_parameter(filter, "cutoff", 20_000.0).unwrap();

    let (mut engine, mut controller) = start(patch);
    controller.note_on(69, 127u8, 0).unwrap();
    let open = rms(&engine.render(ms(100))[ms(20)..]);

    controller.set_parameter(filter, "cutoff", 60.0).unwrap();
    let closed = rms(&engine.render(ms(100))[ms(20)..]);
    assert!(
        closed < open * 0.25,
        "closing the filter did not darken the voice: {open} -> {closed}"
    );
}

#[test]
fn topology_change_leaves_sounding_voices_alone() {
    let play = |edit: bool| {
        let (mut engine, mut controller) = start(reference_patch());
        controller.note_on(62, 100u8, 0).unwrap();
        let mut out = engine.render(ms(20));
        if edit {
            controller
                .add_module(ModuleShape::Oscillator(Waveform::Square))
                .unwrap();
        }
        out.extend(engine.render(ms(50)));
        out
    };
    assert_eq!(play(false), play(true));
}

#[test]
fn new_notes_pick_up_topology_change() {
    let (mut engine, mut controller) = start(Patch::new());
    controller.note_on(60, 100u8, 0).unwrap();
    assert!(engine.render(ms(20)).iter().all(|&s| s == 0.0));

    controller
        .add_module(ModuleShape::Oscillator(Waveform::Sine))
        .unwrap();
    controller.note_on(64, 100u8, 1).unwrap();
    assert!(engine.render(ms(20)).iter().any(|&s| s != 0.0));
}

#[test]
fn global_effect_added_at_runtime_is_heard() {
    let (mut engine, mut controller) = start(reference_patch());
    controller.note_on(69, 100u8, 0).unwrap();
    let dry = engine.render(ms(100));

    let (mut wet_engine, mut wet_controller) = start(reference_patch());
    wet_controller.note_on(69, 100u8, 0).unwrap();
    let distortion = wet_controller.add_effect(EffectType::Distortion).unwrap();
    wet_controller
        .set_parameter(distortion, "drive", 40.0)
        .unwrap();
    let wet = wet_engine.render(ms(100));

    assert_ne!(dry, wet);
    assert!(wet.iter().all(|s| s.is_finite()));
}

#[test]
fn controller_drives_engine_from_another_thread() {
    let (mut engine, mut controller) = start(patchbay::presets::pluck());
    controller.note_on(60, 100u8, 0).unwrap();

    let render = thread::spawn(move || {
        let mut out = vec![0.0f32; 256];
        let mut peak = 0.0f32;
        for _ in 0..400 {
            engine.render_block(&mut out);
            peak = out.iter().fold(peak, |p, s| p.max(s.abs()));
            assert!(out.iter().all(|s| s.is_finite()));
        }
        peak
    });

    for (i, note) in [62u8, 64, 65, 67].into_iter().enumerate() {
        thread::sleep(Duration::from_millis(2));
        controller.note_on(note, 100u8, i as u64 + 1).unwrap();
        controller.note_off(note - 2, i as u64 + 1).unwrap();
    }

    let peak = render.join().unwrap();
    assert!(peak > 0.0);
    // Leftover events are drained on this thread
    controller.poll_events();
}
