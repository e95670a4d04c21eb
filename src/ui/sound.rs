/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// Sound ids from the asset files are mapped to a small set of generated
/// effects. All buffers are rendered as in-memory WAV at init time.
/// One-shot sounds are fire-and-forget; looped sounds keep their Sink
/// until the simulation stops them.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::domain::sound::Sound;

/// The generated effect behind a sound id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Effect {
    Step,
    Climb,
    Jump,
    Land,
    Die,
    Spawn,
    Fire,
    Clank,
    Blip,
}

impl Effect {
    pub const ALL: [Effect; 9] = [
        Effect::Step,
        Effect::Climb,
        Effect::Jump,
        Effect::Land,
        Effect::Die,
        Effect::Spawn,
        Effect::Fire,
        Effect::Clank,
        Effect::Blip,
    ];

    /// Unknown ids get a plain blip.
    pub fn for_id(id: &str) -> Effect {
        match id {
            "walk" | "run" | "step" => Effect::Step,
            "climb" => Effect::Climb,
            "jump" => Effect::Jump,
            "land" => Effect::Land,
            "die" | "death" => Effect::Die,
            "spawn" => Effect::Spawn,
            "fire" | "burn" => Effect::Fire,
            "clank" | "barrel" | "lift" => Effect::Clank,
            _ => Effect::Blip,
        }
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::f32::consts::PI;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::{debug, warn};

    use super::Effect;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<Effect, Arc<Vec<u8>>>,
        /// Looping sounds by id.
        looping: HashMap<String, Sink>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output");
                    return None;
                }
            };

            let buffers = Effect::ALL
                .iter()
                .map(|&fx| (fx, Arc::new(make_wav(&generate(fx)))))
                .collect();

            Some(SoundEngine { _stream: stream, handle, buffers, looping: HashMap::new() })
        }

        fn source(&self, fx: Effect) -> Option<rodio::Decoder<Cursor<Vec<u8>>>> {
            let buf = self.buffers.get(&fx)?;
            rodio::Decoder::new(Cursor::new(buf.as_ref().clone())).ok()
        }

        pub fn play_id(&mut self, id: &str, looped: bool) {
            let fx = Effect::for_id(id);
            let Some(src) = self.source(fx) else { return };
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            if looped {
                // Restarting a loop that is already running replaces it.
                if let Some(old) = self.looping.remove(id) {
                    old.stop();
                }
                sink.append(src.repeat_infinite());
                self.looping.insert(id.to_string(), sink);
                debug!(id, "loop started");
            } else {
                sink.append(src);
                sink.detach(); // fire-and-forget
            }
        }

        pub fn stop_id(&mut self, id: &str) {
            if let Some(sink) = self.looping.remove(id) {
                sink.stop();
                debug!(id, "loop stopped");
            }
        }

        pub fn stop_all(&mut self) {
            for (_, sink) in self.looping.drain() {
                sink.stop();
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    pub(super) fn generate(fx: Effect) -> Vec<f32> {
        match fx {
            Effect::Step => gen_noise_tick(0.05, 180.0, 0.2),
            Effect::Climb => gen_noise_tick(0.07, 420.0, 0.15),
            Effect::Jump => gen_sweep(300.0, 900.0, 0.14),
            Effect::Land => gen_sweep(220.0, 110.0, 0.06),
            Effect::Die => gen_notes(&[440.0, 370.0, 311.0, 261.0], 0.12),
            Effect::Spawn => gen_notes(&[523.0, 659.0, 784.0], 0.07),
            Effect::Fire => gen_crackle(0.4),
            Effect::Clank => gen_notes(&[196.0, 147.0], 0.05),
            Effect::Blip => gen_blip(880.0, 0.04, 0.25),
        }
    }

    /// Simple sine blip at given frequency and duration
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                (t * freq * 2.0 * PI).sin() * env * volume
            })
            .collect()
    }

    /// Linear pitch sweep from `from` to `to` Hz
    fn gen_sweep(from: f32, to: f32, duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.6);
                (phase * 2.0 * PI).sin() * env * 0.25
            })
            .collect()
    }

    /// Square-ish notes in sequence, fading over the last quarter
    fn gen_notes(notes: &[f32], note_dur: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * 2.0 * PI).sin() * 0.7 + (t * freq * 3.0 * 2.0 * PI).sin() * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        let total = samples.len();
        let fade_len = total / 4;
        for (k, s) in samples[total - fade_len..].iter_mut().enumerate() {
            *s *= 1.0 - k as f32 / fade_len.max(1) as f32;
        }
        samples
    }

    /// Footstep-like tick: tone plus noise, sharp decay
    fn gen_noise_tick(duration: f32, freq: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * freq * 2.0 * PI).sin();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                (tone * 0.4 + noise * 0.6) * (1.0 - t).powi(3) * volume
            })
            .collect()
    }

    /// Fire: filtered noise with a slow flicker, loops cleanly
    fn gen_crackle(duration: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 987654;
        let mut low = 0.0_f32;
        (0..n)
            .map(|i| {
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                low += (noise - low) * 0.15;
                let t = i as f32 / n as f32;
                let flicker = 0.6 + 0.4 * (t * 2.0 * PI * 3.0).sin().abs();
                low * flicker * 0.5
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_id(&mut self, _id: &str, _looped: bool) {}
    pub fn stop_id(&mut self, _id: &str) {}
    pub fn stop_all(&mut self) {}
}

impl Sound for SoundEngine {
    fn play(&mut self, id: &str, looped: bool) {
        self.play_id(id, looped);
    }

    fn stop(&mut self, id: &str) {
        self.stop_id(id);
    }
}
