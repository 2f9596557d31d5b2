//! Audio device setup and the keyboard loop.

use std::time::{Duration, Instant};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};

use patchbay::{engine, presets, Controller, Engine, EngineConfig};

use super::Cli;

/// Home row plays a chromatic octave from C.
const KEYS: &str = "awsedftgyhujk";

pub fn run(cli: Cli) -> EyreResult<()> {
    let patch = presets::by_name(&cli.preset)
        .ok_or_else(|| eyre!("unknown preset `{}` (try {:?})", cli.preset, presets::NAMES))?;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let supported = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let config = EngineConfig::default()
        .with_sample_rate(supported.sample_rate().0 as f32)
        .with_channels(usize::from(supported.channels()))
        .with_polyphony(cli.polyphony)
        .with_block_size(cli.block_size)
        .with_deadline_guard(cli.deadline_guard);

    let (engine, controller) = engine::create(config.clone(), patch).wrap_err("invalid engine configuration")?;

    println!("=== patchbay ===");
    println!("Preset: {}", cli.preset);
    println!("Sample rate: {} Hz", config.sample_rate);
    println!("Channels: {}", config.channels);
    println!();
    println!("Keys {KEYS} play notes, z/x shift octave, 1-5 switch preset, q quits");

    let stream = build_stream(&device, &supported.config(), supported.sample_format(), engine)?;
    stream.play()?;

    enable_raw_mode()?;
    let result = Keyboard::new(controller, Duration::from_millis(cli.hold_ms)).run();
    disable_raw_mode()?;
    result
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: SampleFormat,
    mut engine: Engine,
) -> EyreResult<cpal::Stream> {
    let on_error = |err: cpal::StreamError| log::error!("audio stream error: {err}");
    let stream = match format {
        SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _| engine.render_block(data),
            on_error,
            None,
        )?,
        SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _| engine.render_i16(data),
            on_error,
            None,
        )?,
        other => return Err(eyre!("unsupported sample format {other:?}")),
    };
    Ok(stream)
}

struct Keyboard {
    controller: Controller,
    hold: Duration,
    octave: i32,
    held: Vec<(u8, Instant)>,
    started: Instant,
}

impl Keyboard {
    fn new(controller: Controller, hold: Duration) -> Self {
        Self {
            controller,
            hold,
            octave: 4,
            held: Vec::new(),
            started: Instant::now(),
        }
    }

    fn run(&mut self) -> EyreResult<()> {
        loop {
            self.release_expired()?;
            for event in self.controller.poll_events() {
                log::debug!("engine event: {event:?}");
            }

            if event::poll(Duration::from_millis(10))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && !self.handle_key(key.code)? {
                        break;
                    }
                }
            }
        }
        self.controller.stop(false)?;
        Ok(())
    }

    /// Returns false to quit.
    fn handle_key(&mut self, code: KeyCode) -> EyreResult<bool> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
            KeyCode::Char('z') => self.octave = (self.octave - 1).max(0),
            KeyCode::Char('x') => self.octave = (self.octave + 1).min(8),
            KeyCode::Char(c @ '1'..='5') => {
                let index = c as usize - '1' as usize;
                if let Some(patch) = presets::by_name(presets::NAMES[index]) {
                    self.controller.all_notes_off()?;
                    self.controller.load(patch)?;
                    self.held.clear();
                }
            }
            KeyCode::Char(c) => {
                if let Some(offset) = KEYS.find(c) {
                    let note = (self.octave + 1) * 12 + offset as i32;
                    if let Ok(note) = u8::try_from(note) {
                        self.controller.note_on(note, 100u8, self.timestamp())?;
                        self.held.push((note, Instant::now()));
                    }
                }
            }
            _ => {}
        }
        Ok(true)
    }

    fn release_expired(&mut self) -> EyreResult<()> {
        let now = Instant::now();
        let mut index = 0;
        while index < self.held.len() {
            let (note, pressed) = self.held[index];
            if now.duration_since(pressed) >= self.hold {
                self.controller.note_off(note, self.timestamp())?;
                self.held.swap_remove(index);
            } else {
                index += 1;
            }
        }
        Ok(())
    }

    fn timestamp(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
