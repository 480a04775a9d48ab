//! Background capture session
//!
//! A worker thread collects interleaved blocks from a frame source until it
//! is stopped or the source hangs up. The worker blocks on both channels at
//! once, so stopping is immediate and nothing polls.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};

use crate::buffer::SampleBuffer;
use crate::error::AudioError;
use crate::Result;

/// A running capture
pub struct CaptureSession {
    sample_rate: u32,
    channels: usize,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<Result<Vec<f64>>>>,
}

impl CaptureSession {
    /// Start collecting interleaved blocks from `frames`
    pub fn start(sample_rate: u32, channels: usize, frames: Receiver<Vec<f64>>) -> Result<Self> {
        // Reject bad formats before a thread exists
        SampleBuffer::new(Vec::new(), sample_rate, channels)?;

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || record(frames, stop_rx, channels))?;

        log::info!("Capture started: {} channels at {} Hz", channels, sample_rate);

        Ok(Self {
            sample_rate,
            channels,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Whether the worker is still collecting
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and return everything it recorded
    pub fn stop(mut self) -> Result<SampleBuffer> {
        let samples = self.finish()?;
        let buffer = SampleBuffer::new(samples, self.sample_rate, self.channels)?;
        log::info!("Capture stopped after {:.2}s", buffer.duration_seconds());
        Ok(buffer)
    }

    fn finish(&mut self) -> Result<Vec<f64>> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The worker may already be gone if the source hung up
            let _ = stop_tx.send(());
        }

        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| AudioError::Capture("capture thread panicked".to_string()))?,
            None => Ok(Vec::new()),
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.finish() {
                log::warn!("Capture dropped with error: {}", e);
            }
        }
    }
}

fn append_block(recorded: &mut Vec<f64>, block: Vec<f64>, channels: usize) -> Result<()> {
    if block.len() % channels != 0 {
        return Err(AudioError::Capture(format!(
            "block of {} samples is not a whole number of {}-channel frames",
            block.len(),
            channels
        )));
    }
    recorded.extend(block);
    Ok(())
}

fn record(frames: Receiver<Vec<f64>>, stop_rx: Receiver<()>, channels: usize) -> Result<Vec<f64>> {
    let mut recorded = Vec::new();

    loop {
        select! {
            recv(frames) -> block => match block {
                Ok(block) => append_block(&mut recorded, block, channels)?,
                Err(_) => {
                    log::debug!("Capture source disconnected");
                    return Ok(recorded);
                }
            },
            recv(stop_rx) -> _ => break,
        }
    }

    // Keep blocks that were already queued when the stop arrived
    for block in frames.try_iter() {
        append_block(&mut recorded, block, channels)?;
    }
    Ok(recorded)
}
