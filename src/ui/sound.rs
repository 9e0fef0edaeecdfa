/// Sound engine: procedural 8-bit style cues via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// One-shot cues are fire-and-forget; background music loops on its own
/// sink so it can be stopped independently.
///
/// Build without the "sound" feature to disable audio entirely (the stub
/// SoundEngine does nothing).

/// Audio cue ids.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Music = 0,
    /// Tool pickup, menu navigation, puzzle solved.
    Pickup = 1,
    Boost = 2,
    /// Menu confirm, resume, restart.
    Confirm = 3,
    LevelComplete = 4,
}

impl Cue {
    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::{debug, warn};

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        music: Sink,
        bufs: [Arc<Vec<u8>>; 5],
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio device, running silent");
                    return None;
                }
            };
            let music = match Sink::try_new(&handle) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "could not open music sink, running silent");
                    return None;
                }
            };

            let bufs = [
                Arc::new(make_wav(&gen_music())),
                Arc::new(make_wav(&gen_pickup())),
                Arc::new(make_wav(&gen_boost())),
                Arc::new(make_wav(&gen_confirm())),
                Arc::new(make_wav(&gen_fanfare())),
            ];

            Some(SoundEngine { _stream: stream, handle, music, bufs })
        }

        fn decode(&self, cue: Cue) -> Option<rodio::Decoder<Cursor<Vec<u8>>>> {
            let cursor = Cursor::new(self.bufs[cue.id() as usize].as_ref().clone());
            rodio::Decoder::new(cursor).ok()
        }

        /// Play a one-shot cue.
        pub fn play(&self, cue: Cue) {
            if cue == Cue::Music {
                self.loop_music();
                return;
            }
            debug!(cue = cue.id(), "sound cue");
            if let (Ok(sink), Some(src)) = (Sink::try_new(&self.handle), self.decode(cue)) {
                sink.append(src);
                sink.detach();
            }
        }

        /// Start (or resume) the background loop.
        pub fn loop_music(&self) {
            if self.music.empty() {
                if let Some(src) = self.decode(Cue::Music) {
                    self.music.append(src.repeat_infinite());
                }
            }
            self.music.play();
        }

        pub fn stop_music(&self) {
            self.music.pause();
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// A note with a retro square-ish timbre (fundamental + 3rd harmonic).
    fn note(samples: &mut Vec<f32>, freq: f32, dur: f32, volume: f32, decay: f32) {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32).powf(decay);
            let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
            samples.push(wave * env * volume);
        }
    }

    /// Coin: quick ascending arpeggio C6→E6→G6
    fn gen_pickup() -> Vec<f32> {
        let mut s = Vec::new();
        for freq in [1047.0_f32, 1319.0, 1568.0] {
            note(&mut s, freq, 0.045, 0.25, 0.5);
        }
        s
    }

    /// Power-up: rising sweep with a wobble
    fn gen_boost() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.35) as usize;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                let t = i as f32 / SAMPLE_RATE as f32;
                let freq = 300.0 + p * 900.0 + (t * 30.0 * TAU).sin() * 40.0;
                let env = (1.0 - p).powf(0.4);
                (t * freq * TAU).sin() * env * 0.25
            })
            .collect()
    }

    /// Unlock: two-note chime G5, C6
    fn gen_confirm() -> Vec<f32> {
        let mut s = Vec::new();
        note(&mut s, 784.0, 0.07, 0.3, 0.5);
        note(&mut s, 1047.0, 0.14, 0.3, 0.5);
        s
    }

    /// Level complete: C5→E5→G5→C6 with a held top note
    fn gen_fanfare() -> Vec<f32> {
        let mut s = Vec::new();
        for freq in [523.0_f32, 659.0, 784.0, 1047.0] {
            note(&mut s, freq, 0.1, 0.3, 1.0);
        }
        note(&mut s, 1047.0, 0.4, 0.3, 1.0);
        s
    }

    /// Background loop: a quiet bass walk under a sparse lead, 4 bars.
    fn gen_music() -> Vec<f32> {
        let bass = [131.0_f32, 165.0, 196.0, 165.0, 147.0, 175.0, 220.0, 175.0];
        let lead = [523.0_f32, 0.0, 659.0, 0.0, 587.0, 0.0, 494.0, 0.0];
        let mut s = Vec::new();
        for _bar in 0..2 {
            for (&b, &l) in bass.iter().zip(&lead) {
                let n = (SAMPLE_RATE as f32 * 0.25) as usize;
                for i in 0..n {
                    let t = i as f32 / SAMPLE_RATE as f32;
                    let env = 1.0 - (i as f32 / n as f32) * 0.6;
                    let mut v = (t * b * TAU).sin() * 0.12;
                    if l > 0.0 {
                        v += (t * l * TAU).sin() * 0.06;
                    }
                    s.push(v * env);
                }
            }
        }
        s
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_sample_count() {
            let wav = make_wav(&[0.0, 0.5, -0.5, 2.0]);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + 8);
            assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 8);
            // Clamped to full scale.
            assert_eq!(i16::from_le_bytes([wav[50], wav[51]]), 32767);
        }

        #[test]
        fn every_cue_has_audio() {
            for s in [gen_music(), gen_pickup(), gen_boost(), gen_confirm(), gen_fanfare()] {
                assert!(!s.is_empty());
                assert!(s.iter().all(|v| v.abs() <= 1.0));
            }
        }
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
    pub fn play(&self, _cue: Cue) {}
    pub fn loop_music(&self) {}
    pub fn stop_music(&self) {}
}
