//! The frame pipeline: frame source → landmark source → classifier → sink.
//!
//! Two scheduling models are supported:
//!
//! - [`run_blocking`] runs everything on the calling thread, one frame per loop iteration.
//! - [`Pipeline`] moves acquisition, detection, classification and annotation to a producer thread
//!   and leaves presentation to the caller, which polls two bounded [`queue`]s. The producer never
//!   waits for the consumer: results that do not fit into a queue are dropped, so the consumer
//!   always shows something recent.
//!
//! Results cross threads by value (counts) or behind an [`Arc`] (frames); nothing is shared
//! mutably besides the queues and the [`StopFlag`].

mod queue;

pub use queue::{queue, Push, QueueReceiver, QueueSender};

use std::{
    any::Any,
    env, fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, bail, ensure, Context};

use crate::annotate::annotate_frame;
use crate::hand::{
    fingers::{Classifier, FingerCount, FingerStates, ThumbPolicy},
    landmark::HandObservation,
    source::LandmarkSource,
};
use crate::image::Image;
use crate::sink::Sink;
use crate::timer::{FpsCounter, Timer};
use crate::video::FrameSource;

/// Pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    queue_capacity: usize,
    poll_interval: Duration,
    retry_interval: Duration,
    thumb: ThumbPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
            thumb: ThumbPolicy::default(),
        }
    }
}

impl PipelineOptions {
    pub const DEFAULT_QUEUE_CAPACITY: usize = 2;

    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(20);

    /// Sets the capacity of the frame and count queues in concurrent mode.
    ///
    /// Must be at least 1. The default is 2.
    #[inline]
    pub fn queue_capacity(self, queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            ..self
        }
    }

    /// Sets how long the consumer sleeps between two polls of the result queues.
    #[inline]
    pub fn poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    /// Sets how long a frame loop waits before reading again after the frame source failed.
    #[inline]
    pub fn retry_interval(self, retry_interval: Duration) -> Self {
        Self {
            retry_interval,
            ..self
        }
    }

    /// Selects how the thumb is classified.
    #[inline]
    pub fn thumb_policy(self, thumb: ThumbPolicy) -> Self {
        Self { thumb, ..self }
    }

    /// Returns the default options, overridden by any `YUBI_*` environment variables that are set.
    ///
    /// See the crate documentation for the list of variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::default().override_with(|name| env::var(name).ok())
    }

    fn override_with(mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(policy) = var("YUBI_THUMB_POLICY") {
            self.thumb = match policy.as_str() {
                "handedness" => ThumbPolicy::Handedness,
                "fixed" => ThumbPolicy::Fixed,
                _ => bail!(
                    "invalid value '{policy}' for YUBI_THUMB_POLICY (expected 'handedness' or 'fixed')"
                ),
            };
        }
        if let Some(ms) = var("YUBI_POLL_INTERVAL_MS") {
            let ms = ms
                .parse()
                .with_context(|| format!("invalid value '{ms}' for YUBI_POLL_INTERVAL_MS"))?;
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = var("YUBI_RETRY_INTERVAL_MS") {
            let ms = ms
                .parse()
                .with_context(|| format!("invalid value '{ms}' for YUBI_RETRY_INTERVAL_MS"))?;
            self.retry_interval = Duration::from_millis(ms);
        }
        if let Some(cap) = var("YUBI_QUEUE_CAPACITY") {
            self.queue_capacity = cap
                .parse()
                .with_context(|| format!("invalid value '{cap}' for YUBI_QUEUE_CAPACITY"))?;
        }
        self.validate()
    }

    /// Checks that all values are within their allowed ranges.
    pub fn validate(self) -> anyhow::Result<Self> {
        ensure!(
            self.queue_capacity >= 1,
            "queue capacity must be at least 1"
        );
        Ok(self)
    }
}

/// A shared flag that asks a frame loop to exit.
///
/// The loop checks the flag once per iteration, so it exits after finishing the frame it is
/// working on.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct Processed {
    /// The frame, annotated with the skeletons, the count and the LED row.
    pub frame: Image,
    /// All hands the landmark source reported, in its order.
    pub hands: Vec<HandObservation>,
    /// Finger states of the first hand, or all folded if there was none.
    pub states: FingerStates,
}

impl Processed {
    #[inline]
    pub fn count(&self) -> FingerCount {
        self.states.count()
    }
}

/// Runs detection, classification and annotation on individual frames.
pub struct Processor<L> {
    landmarks: L,
    classifier: Classifier,
    t_detect: Timer,
    t_annotate: Timer,
}

impl<L: LandmarkSource> Processor<L> {
    pub fn new(landmarks: L, classifier: Classifier) -> Self {
        Self {
            landmarks,
            classifier,
            t_detect: Timer::new("detect"),
            t_annotate: Timer::new("annotate"),
        }
    }

    /// Processes one frame.
    ///
    /// If the first hand is malformed, a warning is logged and the frame counts as showing no
    /// hand.
    pub fn process(&mut self, mut frame: Image) -> Processed {
        let hands = self.t_detect.time(|| self.landmarks.detect(&frame));
        let states = match self.classifier.classify_first(&hands) {
            Ok(states) => states,
            Err(e) => {
                log::warn!("ignoring hand: {e}");
                FingerStates::NONE
            }
        };
        self.t_annotate
            .time(|| annotate_frame(&mut frame, &hands, &states));

        Processed {
            frame,
            hands,
            states,
        }
    }

    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_detect, &self.t_annotate].into_iter()
    }
}

/// Runs the single-threaded frame loop until `stop` is raised or the sink is closed.
///
/// Every iteration reads one frame, processes it and hands the annotated frame and the count to
/// `sink`. Frames that fail to read are skipped, and the loop waits for
/// [`PipelineOptions::retry_interval`] before reading again. Errors returned by the sink end the loop and are
/// returned.
///
/// `frames` is dropped (releasing the device) before this function returns.
pub fn run_blocking<F, L, S>(
    mut frames: F,
    landmarks: L,
    options: PipelineOptions,
    sink: &mut S,
    stop: &StopFlag,
) -> anyhow::Result<()>
where
    F: FrameSource,
    L: LandmarkSource,
    S: Sink + ?Sized,
{
    let options = options.validate()?;
    let mut processor = Processor::new(landmarks, Classifier::new(options.thumb));
    let mut fps = FpsCounter::new("frame loop");
    let mut reader = FrameReader::new(options.retry_interval);

    while !stop.is_raised() && sink.is_open() {
        let Some(frame) = reader.read(&mut frames) else {
            continue;
        };

        let processed = processor.process(frame);
        let count = processed.count();
        sink.show_frame(Arc::new(processed.frame))?;
        sink.show_count(count)?;

        fps.tick_with(processor.timers());
    }

    log::debug!("frame loop exiting");
    Ok(())
}

/// Lifecycle state of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No producer thread is running.
    Idle,
    /// The producer thread is running and results can be polled.
    Running,
    /// The stop flag was raised and the producer thread is being joined.
    Stopping,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Stopping => "stopping",
        })
    }
}

struct Producer {
    handle: JoinHandle<()>,
    stop: StopFlag,
    frames: QueueReceiver<Arc<Image>>,
    counts: QueueReceiver<FingerCount>,
}

/// A frame pipeline split into a producer thread and a polling consumer.
///
/// The producer thread owns the [`FrameSource`] and [`LandmarkSource`]. The caller acts as the
/// consumer by calling [`Pipeline::poll`] (or [`Pipeline::run`]), which forwards queued results
/// to a [`Sink`].
///
/// Dropping a running pipeline stops it.
pub struct Pipeline {
    options: PipelineOptions,
    state: PipelineState,
    producer: Option<Producer>,
    dropped: (u64, u64),
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> anyhow::Result<Self> {
        Ok(Self {
            options: options.validate()?,
            state: PipelineState::Idle,
            producer: None,
            dropped: (0, 0),
        })
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[inline]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Returns the stop flag of the running producer.
    ///
    /// Raising it from anywhere makes the producer exit after its current frame. The next
    /// [`Pipeline::poll`] then returns the pipeline to [`PipelineState::Idle`].
    pub fn stop_flag(&self) -> Option<StopFlag> {
        self.producer.as_ref().map(|p| p.stop.clone())
    }

    /// Returns how many frames and counts the producer dropped because the consumer fell behind.
    ///
    /// After the pipeline has stopped, this reports the totals of the last run.
    pub fn dropped(&self) -> (u64, u64) {
        match &self.producer {
            Some(p) => (p.frames.dropped(), p.counts.dropped()),
            None => self.dropped,
        }
    }

    /// Spawns the producer thread.
    ///
    /// Fails if the pipeline is not [`PipelineState::Idle`].
    pub fn start<F, L>(&mut self, frames: F, landmarks: L) -> anyhow::Result<()>
    where
        F: FrameSource + Send + 'static,
        L: LandmarkSource + Send + 'static,
    {
        ensure!(
            self.state == PipelineState::Idle,
            "cannot start pipeline while it is {}",
            self.state
        );

        let (frame_tx, frame_rx) = queue(self.options.queue_capacity);
        let (count_tx, count_rx) = queue(self.options.queue_capacity);
        let stop = StopFlag::new();
        let processor = Processor::new(landmarks, Classifier::new(self.options.thumb));

        let handle = thread::Builder::new().name("producer".into()).spawn({
            let stop = stop.clone();
            let reader = FrameReader::new(self.options.retry_interval);
            move || produce(frames, processor, frame_tx, count_tx, reader, stop)
        })?;

        self.producer = Some(Producer {
            handle,
            stop,
            frames: frame_rx,
            counts: count_rx,
        });
        self.state = PipelineState::Running;
        log::debug!("pipeline started");
        Ok(())
    }

    /// Stops the producer thread and waits for it to exit.
    ///
    /// Does nothing if the pipeline is not running. If the producer panicked, the panic message is
    /// returned as an error.
    pub fn stop(&mut self) -> anyhow::Result<()> {
        let Some(producer) = self.producer.take() else {
            self.state = PipelineState::Idle;
            return Ok(());
        };

        self.state = PipelineState::Stopping;
        producer.stop.raise();
        self.dropped = (producer.frames.dropped(), producer.counts.dropped());
        let result = producer
            .handle
            .join()
            .map_err(|payload| anyhow!("producer panicked: {}", panic_message(&*payload)));
        self.state = PipelineState::Idle;
        log::debug!("pipeline stopped");
        result
    }

    /// Performs one consumer tick.
    ///
    /// Forwards at most one frame and one count to `sink`. Frames and counts are queued
    /// independently, so a tick may deliver either, both or neither.
    ///
    /// If the sink fails or the producer has died, the error is shown through
    /// [`Sink::show_error`], the pipeline is stopped, and the error is returned. If the producer
    /// exited because its stop flag was raised, the pipeline quietly returns to
    /// [`PipelineState::Idle`].
    pub fn poll<S: Sink + ?Sized>(&mut self, sink: &mut S) -> anyhow::Result<()> {
        let Some(producer) = &self.producer else {
            return Ok(());
        };

        let frame = producer.frames.pop();
        let count = producer.counts.pop();
        let producer_done = producer.handle.is_finished();
        let stop_requested = producer.stop.is_raised();

        let mut result = Ok(());
        if let Some(frame) = frame {
            result = sink.show_frame(frame);
        }
        if let (Ok(()), Some(count)) = (&result, count) {
            result = sink.show_count(count);
        }

        let e = match result {
            Err(e) => e.context("failed to present result"),
            Ok(()) if producer_done => match self.stop() {
                Err(e) => e,
                Ok(()) if stop_requested => return Ok(()),
                Ok(()) => anyhow!("producer exited unexpectedly"),
            },
            Ok(()) => return Ok(()),
        };

        sink.show_error(&format!("{e:#}"));
        if let Err(stop_err) = self.stop() {
            log::error!("{stop_err:#}");
        }
        Err(e)
    }

    /// Runs the consumer loop on the calling thread.
    ///
    /// Polls every [`PipelineOptions::poll_interval`] until `stop` is raised, the sink is closed,
    /// or the pipeline stops by itself. The pipeline is stopped before this returns.
    pub fn run<S: Sink + ?Sized>(&mut self, sink: &mut S, stop: &StopFlag) -> anyhow::Result<()> {
        while self.state == PipelineState::Running {
            if stop.is_raised() || !sink.is_open() {
                return self.stop();
            }
            self.poll(sink)?;
            thread::sleep(self.options.poll_interval);
        }
        Ok(())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("{e:#}");
        }
    }
}

fn produce<F, L>(
    mut frames: F,
    mut processor: Processor<L>,
    frame_tx: QueueSender<Arc<Image>>,
    count_tx: QueueSender<FingerCount>,
    mut reader: FrameReader,
    stop: StopFlag,
) where
    F: FrameSource,
    L: LandmarkSource,
{
    log::trace!("producer starting");
    let mut fps = FpsCounter::new("producer");

    while !stop.is_raised() {
        let Some(frame) = reader.read(&mut frames) else {
            continue;
        };

        let processed = processor.process(frame);
        let count = processed.count();
        if frame_tx.push(Arc::new(processed.frame)) == Push::Dropped {
            log::trace!("frame queue full, dropping frame");
        }
        if count_tx.push(count) == Push::Dropped {
            log::trace!("count queue full, dropping count {count}");
        }

        fps.tick_with(processor.timers());
    }

    drop(frames);
    log::trace!("producer exiting, frame source released");
}

/// Reads frames, pacing and deduplicating the log output of a failing source.
///
/// A failed read is followed by a sleep of `retry_interval`. Only the first failure of a run of
/// failures is logged, together with the recovery once the source delivers again.
struct FrameReader {
    retry_interval: Duration,
    failures: u64,
}

impl FrameReader {
    fn new(retry_interval: Duration) -> Self {
        Self {
            retry_interval,
            failures: 0,
        }
    }

    fn read<F: FrameSource + ?Sized>(&mut self, frames: &mut F) -> Option<Image> {
        match frames.read() {
            Ok(frame) => {
                if self.failures != 0 {
                    log::debug!("frame source recovered after {} failed reads", self.failures);
                    self.failures = 0;
                }
                Some(frame)
            }
            Err(e) => {
                if self.failures == 0 {
                    log::debug!("skipping frames until the source recovers: {e:#}");
                }
                self.failures += 1;
                thread::sleep(self.retry_interval);
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicU64, time::Instant};

    use crate::hand::{landmark::Handedness, source::ScriptedSource, synthetic};
    use crate::image::Resolution;
    use crate::sink::Recorder;
    use crate::video::BlankFrames;

    use super::*;

    fn frames() -> BlankFrames {
        BlankFrames::new(Resolution::new(64, 48))
    }

    /// Polls until `cond` holds or a few seconds have passed.
    fn poll_until(pipeline: &mut Pipeline, sink: &mut Recorder, cond: impl Fn(&Recorder) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond(sink) && Instant::now() < deadline {
            let _ = pipeline.poll(sink);
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// A frame source that stops its pipeline after `n` frames.
    struct StopAfter {
        inner: BlankFrames,
        remaining: usize,
        stop: StopFlag,
    }

    impl FrameSource for StopAfter {
        fn read(&mut self) -> anyhow::Result<Image> {
            if self.remaining == 0 {
                self.stop.raise();
            } else {
                self.remaining -= 1;
            }
            self.inner.read()
        }
    }

    struct Failing;

    impl FrameSource for Failing {
        fn read(&mut self) -> anyhow::Result<Image> {
            bail!("camera unplugged")
        }
    }

    struct Panicking;

    impl LandmarkSource for Panicking {
        fn detect(&mut self, _image: &Image) -> Vec<HandObservation> {
            panic!("detector crashed")
        }
    }

    #[test]
    fn options_from_env() {
        let vars = |name: &str| match name {
            "YUBI_THUMB_POLICY" => Some("fixed".to_string()),
            "YUBI_POLL_INTERVAL_MS" => Some("25".to_string()),
            "YUBI_RETRY_INTERVAL_MS" => Some("100".to_string()),
            _ => None,
        };
        let options = PipelineOptions::default().override_with(vars).unwrap();
        assert_eq!(options.thumb, ThumbPolicy::Fixed);
        assert_eq!(options.poll_interval, Duration::from_millis(25));
        assert_eq!(options.retry_interval, Duration::from_millis(100));
        assert_eq!(options.queue_capacity, 2);

        let bad = |name: &str| (name == "YUBI_THUMB_POLICY").then(|| "mirror".to_string());
        assert!(PipelineOptions::default().override_with(bad).is_err());
        let bad = |name: &str| (name == "YUBI_QUEUE_CAPACITY").then(|| "0".to_string());
        assert!(PipelineOptions::default().override_with(bad).is_err());
        let bad = |name: &str| (name == "YUBI_POLL_INTERVAL_MS").then(|| "soon".to_string());
        assert!(PipelineOptions::default().override_with(bad).is_err());
    }

    #[test]
    fn processor_handles_malformed_hand() {
        let hand = HandObservation::new([[0.5f32, 0.2]; 7], Handedness::Right);
        let mut processor = Processor::new(
            ScriptedSource::constant(vec![hand]),
            Classifier::default(),
        );
        let processed = processor.process(Image::new(32, 32));
        assert_eq!(processed.count(), FingerCount::ZERO);
        assert_eq!(processed.hands.len(), 1);
    }

    #[test]
    fn processor_handles_out_of_range_landmarks() {
        let hand = synthetic::counting(2, Handedness::Right);
        let mut landmarks = hand.landmarks().to_vec();
        landmarks[8].x = 1e10;
        landmarks[12].y = -1e10;
        let hand = HandObservation::new(landmarks, Handedness::Right);

        let mut processor = Processor::new(
            ScriptedSource::constant(vec![hand]),
            Classifier::default(),
        );
        let processed = processor.process(Image::new(64, 48));
        assert_eq!(processed.count().get(), 2);
    }

    #[test]
    fn failing_source_is_retried_at_a_fixed_pace() {
        struct Counted(Arc<AtomicU64>);
        impl FrameSource for Counted {
            fn read(&mut self) -> anyhow::Result<Image> {
                self.0.fetch_add(1, Ordering::Relaxed);
                bail!("camera unplugged")
            }
        }

        let reads = Arc::new(AtomicU64::new(0));
        let options = PipelineOptions::default().retry_interval(Duration::from_millis(10));
        let mut pipeline = Pipeline::new(options).unwrap();
        pipeline
            .start(Counted(reads.clone()), ScriptedSource::new(Vec::new()))
            .unwrap();
        thread::sleep(Duration::from_millis(100));
        pipeline.stop().unwrap();

        // About 10 reads are expected; without pacing this would be in the tens of thousands.
        let reads = reads.load(Ordering::Relaxed);
        assert!((1..=20).contains(&reads), "{reads} reads in 100ms");
    }

    #[test]
    fn frame_reader_recovers() {
        struct Alternating(u32);
        impl FrameSource for Alternating {
            fn read(&mut self) -> anyhow::Result<Image> {
                self.0 += 1;
                if self.0 % 3 == 0 {
                    Ok(Image::new(1, 1))
                } else {
                    bail!("no frame")
                }
            }
        }

        let mut reader = FrameReader::new(Duration::ZERO);
        let mut source = Alternating(0);
        assert!(reader.read(&mut source).is_none());
        assert!(reader.read(&mut source).is_none());
        assert_eq!(reader.failures, 2);
        assert!(reader.read(&mut source).is_some());
        assert_eq!(reader.failures, 0);
    }

    #[test]
    fn blocking_loop_counts_fingers() {
        let stop = StopFlag::new();
        let source = StopAfter {
            inner: frames(),
            remaining: 3,
            stop: stop.clone(),
        };
        let script = (0..=5)
            .map(|n| vec![synthetic::counting(n, Handedness::Right)])
            .collect();
        let mut sink = Recorder::new();
        run_blocking(
            source,
            ScriptedSource::new(script),
            PipelineOptions::default(),
            &mut sink,
            &stop,
        )
        .unwrap();

        let counts = sink.counts().iter().map(|c| c.get()).collect::<Vec<_>>();
        assert_eq!(counts, [0, 1, 2, 3]);
        assert_eq!(sink.frames().len(), 4);
    }

    #[test]
    fn blocking_loop_skips_failed_reads() {
        struct Flaky(BlankFrames, u32, StopFlag);
        impl FrameSource for Flaky {
            fn read(&mut self) -> anyhow::Result<Image> {
                self.1 += 1;
                if self.1 >= 6 {
                    self.2.raise();
                }
                if self.1 % 2 == 0 {
                    bail!("dropped frame");
                }
                self.0.read()
            }
        }

        let stop = StopFlag::new();
        let mut sink = Recorder::new();
        run_blocking(
            Flaky(frames(), 0, stop.clone()),
            ScriptedSource::new(Vec::new()),
            PipelineOptions::default(),
            &mut sink,
            &stop,
        )
        .unwrap();
        // Reads 1, 3 and 5 succeed.
        assert_eq!(sink.frames().len(), 3);
        assert!(sink.counts().iter().all(|c| *c == FingerCount::ZERO));
    }

    #[test]
    fn concurrent_pipeline_lifecycle() {
        let mut pipeline = Pipeline::new(PipelineOptions::default()).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Idle);

        let hand = synthetic::counting(4, Handedness::Right);
        pipeline
            .start(frames(), ScriptedSource::constant(vec![hand]))
            .unwrap();
        assert_eq!(pipeline.state(), PipelineState::Running);
        assert!(pipeline
            .start(frames(), ScriptedSource::new(Vec::new()))
            .is_err());

        let mut sink = Recorder::new();
        poll_until(&mut pipeline, &mut sink, |s| !s.counts().is_empty());
        assert_eq!(sink.last_count().get(), 4);
        assert_eq!(sink.indicator().active(), 4);

        pipeline.stop().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.stop_flag().is_none());

        // Can be restarted after stopping.
        pipeline
            .start(frames(), ScriptedSource::new(Vec::new()))
            .unwrap();
        pipeline.stop().unwrap();
    }

    #[test]
    fn slow_consumer_does_not_block_producer() {
        let options = PipelineOptions::default().queue_capacity(2);
        let mut pipeline = Pipeline::new(options).unwrap();
        pipeline
            .start(frames(), ScriptedSource::new(Vec::new()))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while pipeline.dropped().1 == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        let (dropped_frames, dropped_counts) = pipeline.dropped();
        assert!(dropped_frames > 0 && dropped_counts > 0);

        let producer = pipeline.producer.as_ref().unwrap();
        assert!(producer.frames.len() <= 2);
        assert!(producer.counts.len() <= 2);
        pipeline.stop().unwrap();
    }

    #[test]
    fn external_stop_returns_to_idle() {
        let mut pipeline = Pipeline::new(PipelineOptions::default()).unwrap();
        pipeline
            .start(frames(), ScriptedSource::new(Vec::new()))
            .unwrap();
        pipeline.stop_flag().unwrap().raise();

        let mut sink = Recorder::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while pipeline.state() != PipelineState::Idle && Instant::now() < deadline {
            pipeline.poll(&mut sink).unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(sink.errors().is_empty());
    }

    #[test]
    fn producer_panic_is_surfaced() {
        let mut pipeline = Pipeline::new(PipelineOptions::default()).unwrap();
        pipeline.start(frames(), Panicking).unwrap();

        let mut sink = Recorder::new();
        let err = pipeline.run(&mut sink, &StopFlag::new()).unwrap_err();
        assert!(err.to_string().contains("detector crashed"), "{err:#}");
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert_eq!(sink.errors().len(), 1);
        assert!(sink.errors()[0].contains("detector crashed"));
    }

    #[test]
    fn failing_camera_is_not_fatal() {
        let mut pipeline = Pipeline::new(PipelineOptions::default()).unwrap();
        pipeline
            .start(Failing, ScriptedSource::new(Vec::new()))
            .unwrap();
        let mut sink = Recorder::new();
        for _ in 0..10 {
            pipeline.poll(&mut sink).unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(pipeline.state(), PipelineState::Running);
        assert!(sink.frames().is_empty());
        pipeline.stop().unwrap();
    }

    #[test]
    fn sink_error_stops_pipeline() {
        struct Broken;
        impl Sink for Broken {
            fn show_frame(&mut self, _frame: Arc<Image>) -> anyhow::Result<()> {
                bail!("display lost")
            }
            fn show_count(&mut self, _count: FingerCount) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let mut pipeline = Pipeline::new(PipelineOptions::default()).unwrap();
        pipeline
            .start(frames(), ScriptedSource::new(Vec::new()))
            .unwrap();
        let err = pipeline.run(&mut Broken, &StopFlag::new()).unwrap_err();
        assert!(format!("{err:#}").contains("display lost"));
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn app_stop_ends_consumer_loop() {
        let mut pipeline = Pipeline::new(PipelineOptions::default()).unwrap();
        pipeline
            .start(frames(), ScriptedSource::new(Vec::new()))
            .unwrap();
        let stop = StopFlag::new();
        stop.raise();
        pipeline.run(&mut Recorder::new(), &stop).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }
}
