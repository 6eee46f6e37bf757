//! Demo: runs the concurrent pipeline over a scripted hand that counts from 0 to 5 and back.
//!
//! Usage: `yubi [SECONDS]`. Runs for 10 seconds by default. With the `window` feature, annotated
//! frames are shown in a window and the demo runs until it is closed.

use std::{env, thread, time::Duration};

use anyhow::Context;
use yubi::{
    hand::{landmark::Handedness, source::ScriptedSource, synthetic},
    image::Resolution,
    pipeline::{Pipeline, PipelineOptions, StopFlag},
    video::BlankFrames,
};

/// Number of consecutive frames each pose is held for.
const FRAMES_PER_POSE: usize = 15;

fn main() -> anyhow::Result<()> {
    yubi::init_logger!();

    let seconds = match env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("invalid duration '{arg}'"))?,
        None => 10,
    };
    let options = PipelineOptions::from_env()?;
    log::debug!("{options:?}");

    let script = (0..=5)
        .chain((1..5).rev())
        .flat_map(|n| {
            let hand = synthetic::counting(n, Handedness::Right);
            std::iter::repeat(vec![hand]).take(FRAMES_PER_POSE)
        })
        .collect();
    let landmarks = ScriptedSource::new(script);
    let frames = BlankFrames::new(Resolution::RES_480P);

    let stop = StopFlag::new();
    if cfg!(not(feature = "window")) {
        let stop = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            stop.raise();
        });
    }

    let mut pipeline = Pipeline::new(options)?;
    pipeline.start(frames, landmarks)?;

    #[cfg(feature = "window")]
    let mut sink = yubi::sink::WindowSink::new("yubi");
    #[cfg(not(feature = "window"))]
    let mut sink = yubi::sink::LogSink::new();

    pipeline.run(&mut sink, &stop)?;

    let (frames, counts) = pipeline.dropped();
    log::info!("done ({frames} frames and {counts} counts dropped by the producer)");
    Ok(())
}
