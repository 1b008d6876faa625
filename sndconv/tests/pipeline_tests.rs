//! End-to-end conversion tests
//!
//! Generate WAV inputs on disk, run both entry points, and read the output
//! back with hound.

mod helpers;

use helpers::*;
use sndconv::audio::FlushPolicy;
use sndconv::{convert_sound, resample_wave, ConversionOptions, Error, Pipeline};
use tempfile::TempDir;

fn expected_samples(frames: u64, source_rate: u32) -> usize {
    (frames as f64 * 8000.0 / source_rate as f64).round() as usize
}

fn assert_telephony_spec(output: &OutputFile) {
    assert_eq!(output.spec.channels, 1);
    assert_eq!(output.spec.sample_rate, 8000);
    assert_eq!(output.spec.bits_per_sample, 16);
    assert_eq!(output.spec.sample_format, hound::SampleFormat::Int);
}

#[test]
fn test_raw_wav_8k_mono_is_identity() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    let samples: Vec<i16> = (0..8000)
        .map(|i| ((i * 37) % 65536 - 32768) as i16)
        .collect();
    write_canonical_wav(&input, 8000, 1, &samples).unwrap();

    let report = resample_wave(&input, &output).unwrap();
    assert_eq!(report.data_bytes, 16000);

    let out = read_output(&output);
    assert_telephony_spec(&out);
    out.assert_header_consistent();
    assert_eq!(out.samples, samples);
}

#[test]
fn test_symphonia_8k_mono_is_identity() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    generate_sine_wav(&input, 8000, 1, 500, 440.0, 0.5).unwrap();

    let source: Vec<i16> = hound::WavReader::open(&input)
        .unwrap()
        .samples::<i16>()
        .map(Result::unwrap)
        .collect();

    convert_sound(&input, &output).unwrap();

    let out = read_output(&output);
    assert_telephony_spec(&out);
    out.assert_header_consistent();
    assert_eq!(out.samples, source);
}

#[test]
fn test_one_second_of_silence_at_44100() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("silence.wav");
    let output = dir.path().join("out.wav");
    generate_silent_wav(&input, 44100, 1, 1000).unwrap();

    let report = convert_sound(&input, &output).unwrap();
    assert_eq!(report.stream.sample_rate, 44100);
    assert_eq!(report.data_bytes, 16000);

    let out = read_output(&output);
    assert_telephony_spec(&out);
    out.assert_header_consistent();
    assert!(out.samples.iter().all(|&s| s == 0));
}

#[test]
fn test_stereo_output_is_mono_and_same_length() {
    let dir = TempDir::new().unwrap();
    let mono_in = dir.path().join("mono.wav");
    let stereo_in = dir.path().join("stereo.wav");
    let mono_out = dir.path().join("mono_out.wav");
    let stereo_out = dir.path().join("stereo_out.wav");

    generate_sine_wav(&mono_in, 44100, 1, 750, 440.0, 0.5).unwrap();
    generate_sine_wav(&stereo_in, 44100, 2, 750, 440.0, 0.5).unwrap();

    convert_sound(&mono_in, &mono_out).unwrap();
    let report = convert_sound(&stereo_in, &stereo_out).unwrap();
    assert_eq!(report.stream.channels, 2);

    let mono = read_output(&mono_out);
    let stereo = read_output(&stereo_out);
    assert_telephony_spec(&stereo);
    assert_eq!(mono.bytes.len(), stereo.bytes.len());
    // Identical channels average to the same signal
    assert_eq!(mono.samples, stereo.samples);
}

#[test]
fn test_raw_wav_stereo_downmix() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    write_canonical_wav(&input, 8000, 2, &[1000, 3000, -2000, -4000, 100, -100]).unwrap();
    resample_wave(&input, &output).unwrap();

    assert_eq!(read_output(&output).samples, vec![2000, -3000, 0]);
}

#[test]
fn test_flush_policy_parameterized() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sine48k.wav");
    generate_sine_wav(&input, 48000, 1, 500, 1000.0, 0.5).unwrap();
    let expected = expected_samples(24000, 48000);

    for (policy, name) in [(FlushPolicy::Flush, "flush"), (FlushPolicy::Skip, "skip")] {
        let output = dir.path().join(format!("{}.wav", name));
        let pipeline = Pipeline::new(ConversionOptions::default().with_flush(policy));
        pipeline.convert_sound(&input, &output).unwrap();

        let out = read_output(&output);
        out.assert_header_consistent();
        match policy {
            FlushPolicy::Flush => assert_eq!(out.samples.len(), expected),
            FlushPolicy::Skip => {
                assert!(out.samples.len() < expected);
                // At most one resampler chunk (512 input frames) is lost
                let max_lost = expected_samples(512, 48000) + 8;
                assert!(
                    expected - out.samples.len() <= max_lost,
                    "lost {} samples",
                    expected - out.samples.len()
                );
            }
        }
    }
}

#[test]
fn test_24bit_and_float_sources() {
    let dir = TempDir::new().unwrap();

    let s24 = dir.path().join("s24.wav");
    let s24_out = dir.path().join("s24_out.wav");
    generate_s24_wav(&s24, 16000, 500).unwrap();
    convert_sound(&s24, &s24_out).unwrap();
    let out = read_output(&s24_out);
    out.assert_header_consistent();
    assert_eq!(out.samples.len(), expected_samples(8000, 16000));
    assert!(out.samples.iter().any(|&s| s.unsigned_abs() > 8000));

    let float = dir.path().join("float.wav");
    let float_out = dir.path().join("float_out.wav");
    generate_float_wav(&float, 22050, 2, 500).unwrap();
    let report = convert_sound(&float, &float_out).unwrap();
    assert_eq!(report.stream.channels, 2);
    let out = read_output(&float_out);
    out.assert_header_consistent();
    assert_eq!(out.samples.len(), expected_samples(11025, 22050));
}

#[test]
fn test_missing_input_creates_no_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("does_not_exist.mp3");
    let output = dir.path().join("out.wav");

    assert!(matches!(convert_sound(&input, &output), Err(Error::Open(_))));
    assert!(matches!(resample_wave(&input, &output), Err(Error::Open(_))));
    assert!(!output.exists());
}

#[test]
fn test_bad_wav_header_is_open_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bogus.wav");
    let output = dir.path().join("out.wav");
    std::fs::write(&input, b"plain text, not audio at all, padded past forty-four bytes").unwrap();

    assert!(matches!(resample_wave(&input, &output), Err(Error::Open(_))));
    assert!(matches!(convert_sound(&input, &output), Err(Error::Open(_))));
    assert!(!output.exists());
}

#[test]
fn test_unwritable_output_is_output_open_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("missing_dir").join("out.wav");
    generate_silent_wav(&input, 8000, 1, 100).unwrap();

    assert!(matches!(
        convert_sound(&input, &output),
        Err(Error::OutputOpen { .. })
    ));
}

#[test]
fn test_empty_data_chunk_gives_header_only_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.wav");
    let output = dir.path().join("out.wav");
    write_canonical_wav(&input, 44100, 2, &[]).unwrap();

    let report = resample_wave(&input, &output).unwrap();
    assert_eq!(report.packets_read, 0);

    let out = read_output(&output);
    assert_eq!(out.bytes.len(), 44);
    assert_eq!(out.riff_size(), 36);
    assert_eq!(out.data_size(), 0);
}
