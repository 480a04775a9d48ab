//! Audio I/O functionality using Symphonia and Hound
//!
//! Decodes any container and codec symphonia supports into a `SampleBuffer`
//! and writes 32-bit float WAV files. Sources with more than two channels
//! keep their first two.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Cursor, ErrorKind, Seek, Write};
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use crate::buffer::{SampleBuffer, MAX_CHANNELS};
use crate::error::AudioError;
use crate::Result;

/// Append the first `out.len()` planes of a decoded packet
fn append_planes<S>(decoded: &AudioBuffer<S>, out: &mut [Vec<f64>])
where
    S: Sample + IntoSample<f64>,
{
    for (c, channel) in out.iter_mut().enumerate() {
        channel.extend(decoded.chan(c).iter().map(|&s| s.into_sample()));
    }
}

fn is_end_of_stream(err: &SymphoniaError) -> bool {
    matches!(err, SymphoniaError::IoError(e) if e.kind() == ErrorKind::UnexpectedEof)
}

/// Decode a whole media stream into a buffer
fn read_audio_stream(mss: MediaSourceStream, hint: &Hint) -> Result<SampleBuffer> {
    let probed = symphonia::default::get_probe().format(
        hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or(SymphoniaError::Unsupported("no default track found"))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(SymphoniaError::Unsupported("sample rate not specified"))?;

    let source_channels = track
        .codec_params
        .channels
        .ok_or(SymphoniaError::Unsupported("channels not specified"))?
        .count();

    if source_channels > MAX_CHANNELS {
        log::warn!(
            "Source has {} channels, keeping the first {}",
            source_channels,
            MAX_CHANNELS
        );
    }

    let mut planes: Vec<Vec<f64>> = vec![Vec::new(); source_channels.min(MAX_CHANNELS)];

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(err) if is_end_of_stream(&err) => break,
            Err(err) => return Err(err.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(err) if is_end_of_stream(&err) => break,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        match decoded {
            AudioBufferRef::U8(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::U16(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::U24(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::U32(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::S8(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::S16(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::S24(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::S32(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::F32(buf) => append_planes(&*buf, &mut planes),
            AudioBufferRef::F64(buf) => append_planes(&*buf, &mut planes),
        }
    }

    let buffer = SampleBuffer::from_channels(&planes, sample_rate)?;
    log::info!(
        "Decoded audio: {} channels, {} Hz, {:.2}s",
        buffer.channels(),
        buffer.sample_rate(),
        buffer.duration_seconds()
    );
    Ok(buffer)
}

/// Read audio file from filesystem path
pub fn read_audio_file<P: AsRef<Path>>(path: P) -> Result<SampleBuffer> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    read_audio_stream(mss, &hint)
}

/// Read audio data from byte buffer
pub fn read_audio_bytes(data: Vec<u8>) -> Result<SampleBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());
    read_audio_stream(mss, &Hint::new())
}

fn wav_spec(buffer: &SampleBuffer) -> WavSpec {
    WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

fn write_wav<W: Write + Seek>(writer: W, buffer: &SampleBuffer) -> Result<()> {
    let mut writer = WavWriter::new(writer, wav_spec(buffer))?;
    for &sample in buffer.samples() {
        writer.write_sample(sample as f32)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Create `path`, which must not exist yet, and fill it with `write`.
///
/// A failed write removes the partial file so the path stays free.
fn write_new_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> Result<()>,
{
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => AudioError::Encode(hound::Error::IoError(e)),
            _ => AudioError::Io(e),
        })?;

    if let Err(e) = write(BufWriter::new(file)) {
        if let Err(remove_err) = std::fs::remove_file(path) {
            log::warn!(
                "Could not remove partial file {}: {}",
                path.display(),
                remove_err
            );
        }
        return Err(e);
    }
    Ok(())
}

/// Write a buffer to a new WAV file.
///
/// Existing files are never overwritten: if `path` exists the call fails
/// with `Encode` and the file is left untouched.
pub fn write_audio_file<P: AsRef<Path>>(path: P, buffer: &SampleBuffer) -> Result<()> {
    let path = path.as_ref();
    write_new_file(path, |writer| write_wav(writer, buffer))?;

    log::info!(
        "Saved audio: {} channels, {:.2}s to {}",
        buffer.channels(),
        buffer.duration_seconds(),
        path.display()
    );
    Ok(())
}

/// Write a buffer as WAV format in memory and return the bytes
pub fn write_audio_bytes(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, buffer)?;
    Ok(cursor.into_inner())
}

/// First `dir/stem_N.ext` that does not exist yet, counting from 0
pub fn next_output_path<P: AsRef<Path>>(dir: P, stem: &str, ext: &str) -> PathBuf {
    let dir = dir.as_ref();
    (0..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join(format!("{}.{}", stem, ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn stereo_test_buffer(frames: usize) -> SampleBuffer {
        let sample_rate = 44100;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for i in 0..frames {
            let t = i as f64 / sample_rate as f64;
            left.push((2.0 * PI * 440.0 * t).sin() * 0.5);
            right.push((2.0 * PI * 880.0 * t).sin() * 0.5);
        }
        SampleBuffer::from_channels(&[left, right], sample_rate).unwrap()
    }

    fn assert_close(a: &SampleBuffer, b: &SampleBuffer) {
        assert_eq!(a.sample_rate(), b.sample_rate());
        assert_eq!(a.channels(), b.channels());
        assert_eq!(a.frames(), b.frames());
        for (i, (x, y)) in a.samples().iter().zip(b.samples()).enumerate() {
            assert!((x - y).abs() < 1e-6, "sample {}: {} != {}", i, x, y);
        }
    }

    #[test]
    fn test_write_read_audio_bytes() {
        let buffer = stereo_test_buffer(1000);
        let wav_bytes = write_audio_bytes(&buffer).unwrap();
        assert!(!wav_bytes.is_empty());

        let read = read_audio_bytes(wav_bytes).unwrap();
        assert_close(&buffer, &read);
    }

    #[test]
    fn test_mono_bytes() {
        let data = (0..500).map(|i| (i as f64 / 500.0) - 0.5).collect();
        let buffer = SampleBuffer::mono(data, 8000).unwrap();
        let read = read_audio_bytes(write_audio_bytes(&buffer).unwrap()).unwrap();
        assert_close(&buffer, &read);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = read_audio_bytes(vec![0x13; 256]);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let buffer = stereo_test_buffer(2048);

        write_audio_file(&path, &buffer).unwrap();
        let read = read_audio_file(&path).unwrap();
        assert_close(&buffer, &read);
    }

    #[test]
    fn test_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("existing.wav");
        std::fs::write(&path, b"keep me").unwrap();

        let result = write_audio_file(&path, &stereo_test_buffer(100));
        assert!(matches!(result, Err(AudioError::Encode(_))));
        assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.wav");

        let result = write_new_file(&path, |mut writer| {
            writer.write_all(b"RIFF").unwrap();
            writer.flush().unwrap();
            Err(AudioError::Encode(hound::Error::Unsupported))
        });
        assert!(matches!(result, Err(AudioError::Encode(_))));
        assert!(!path.exists());

        write_audio_file(&path, &stereo_test_buffer(100)).unwrap();
        assert_eq!(read_audio_file(&path).unwrap().frames(), 100);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_audio_file(dir.path().join("missing.wav"));
        assert!(matches!(result, Err(AudioError::Io(_))));
    }

    #[test]
    fn test_next_output_path_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            next_output_path(dir.path(), "output", "wav"),
            dir.path().join("output_0.wav")
        );

        std::fs::write(dir.path().join("output_0.wav"), b"").unwrap();
        std::fs::write(dir.path().join("output_1.wav"), b"").unwrap();
        assert_eq!(
            next_output_path(dir.path(), "output", "wav"),
            dir.path().join("output_2.wav")
        );
    }
}
