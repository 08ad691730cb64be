//! Ordered task queue and the single worker thread that drains it.
//!
//! Every engine call and every parameter change happens on the worker, one
//! task at a time, in enqueue order.  The only state shared with callers
//! besides the queue itself is the [`CancellationSignal`].

use std::{
    collections::VecDeque,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use log::{debug, error};
use parking_lot::{Condvar, Mutex};

use crate::{
    audio::{AudioCallback, AudioSink},
    engine::SynthesisEngine,
    error::Result,
    events::{Listeners, SynthEvent},
    normalize::NormalizedText,
    params::{EngineConfig, ParamField},
};

// ─────────────────────────────────────────────────────────────────────────────
// CancellationSignal
// ─────────────────────────────────────────────────────────────────────────────

/// Shared "stop speaking" flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal(Arc<AtomicBool>);

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// Side effect on the engine, run on the worker.
pub type EngineAction = Box<dyn FnOnce(&mut dyn SynthesisEngine) -> anyhow::Result<()> + Send>;

pub enum Task {
    /// Synthesize `text`, then report `index` if speech was not cancelled.
    Speak { text: NormalizedText, index: Option<i32> },
    SetParameter { field: ParamField, value: i32 },
    /// Wait for the sink to drain, then report "done speaking".
    NotifyDone,
    ClearCancellation,
    Run(EngineAction),
    /// Stop the worker.
    Shutdown,
}

impl Task {
    pub fn run<F>(action: F) -> Self
    where
        F: FnOnce(&mut dyn SynthesisEngine) -> anyhow::Result<()> + Send + 'static,
    {
        Task::Run(Box::new(action))
    }

    pub fn is_speech(&self) -> bool {
        matches!(self, Task::Speak { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Task::Speak { .. } => "speak",
            Task::SetParameter { .. } => "set-parameter",
            Task::NotifyDone => "notify-done",
            Task::ClearCancellation => "clear-cancellation",
            Task::Run(_) => "run",
            Task::Shutdown => "shutdown",
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Speak { text, index } => f
                .debug_struct("Speak")
                .field("text", &text.as_str())
                .field("index", index)
                .finish(),
            Task::SetParameter { field, value } => f
                .debug_struct("SetParameter")
                .field("field", field)
                .field("value", value)
                .finish(),
            other => f.write_str(other.kind()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TaskQueue
// ─────────────────────────────────────────────────────────────────────────────

/// Unbounded multi-producer FIFO with a blocking pop.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    ready: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: Task) {
        self.tasks.lock().push_back(task);
        self.ready.notify_one();
    }

    /// Take the next task, waiting while the queue is empty.
    pub fn pop(&self) -> Task {
        let mut tasks = self.tasks.lock();
        loop {
            if let Some(task) = tasks.pop_front() {
                return task;
            }
            self.ready.wait(&mut tasks);
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Drop every pending speak task, raise `signal` and queue its reset.
    ///
    /// Everything happens under one lock hold, so no producer can slip a task
    /// in between.  Surviving tasks keep their relative order and run before
    /// the reset; a speak task already taken by the worker sees the signal
    /// raised until it finishes.  Returns the number of dropped tasks.
    pub fn cancel_speech(&self, signal: &CancellationSignal) -> usize {
        let mut tasks = self.tasks.lock();
        let before = tasks.len();
        tasks.retain(|task| !task.is_speech());
        let dropped = before - tasks.len();
        signal.set();
        tasks.push_back(Task::ClearCancellation);
        drop(tasks);
        self.ready.notify_one();
        dropped
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker
// ─────────────────────────────────────────────────────────────────────────────

/// Owner of the engine and its parameters; runs queued tasks.
pub struct Worker {
    queue: Arc<TaskQueue>,
    engine: Box<dyn SynthesisEngine>,
    config: EngineConfig,
    callback: AudioCallback,
    cancel: CancellationSignal,
    sink: Arc<dyn AudioSink>,
    listeners: Arc<Listeners>,
}

impl Worker {
    pub fn new(
        queue: Arc<TaskQueue>,
        engine: Box<dyn SynthesisEngine>,
        config: EngineConfig,
        callback: AudioCallback,
        sink: Arc<dyn AudioSink>,
        listeners: Arc<Listeners>,
    ) -> Self {
        let cancel = callback.signal().clone();
        Self { queue, engine, config, callback, cancel, sink, listeners }
    }

    /// Start the worker thread.  Joining it hands the worker (and with it the
    /// engine) back once a [`Task::Shutdown`] has been processed.
    pub fn spawn(self) -> Result<JoinHandle<Worker>> {
        let handle = thread::Builder::new()
            .name("rutts-worker".into())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_engine(self) -> Box<dyn SynthesisEngine> {
        self.engine
    }

    fn run(mut self) -> Self {
        debug!("worker started");
        loop {
            let task = self.queue.pop();
            if let Task::Shutdown = task {
                break;
            }
            let kind = task.kind();
            match catch_unwind(AssertUnwindSafe(|| self.execute(task))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("error while processing a {kind} task: {e:#}"),
                Err(_) => error!("panic while processing a {kind} task"),
            }
        }
        debug!("worker stopped");
        self
    }

    fn execute(&mut self, task: Task) -> anyhow::Result<()> {
        match task {
            Task::Speak { text, index } => self.speak(&text, index)?,
            Task::SetParameter { field, value } => {
                debug!("set {field:?} = {value}");
                self.config.set(field, value);
            }
            Task::NotifyDone => {
                self.sink.idle();
                self.listeners.notify(SynthEvent::DoneSpeaking);
            }
            Task::ClearCancellation => self.cancel.clear(),
            Task::Run(action) => action(self.engine.as_mut())?,
            Task::Shutdown => {}
        }
        Ok(())
    }

    fn speak(&mut self, text: &NormalizedText, index: Option<i32>) -> Result<()> {
        if self.cancel.is_set() {
            return Ok(());
        }
        if !text.is_empty() {
            self.callback.arm();
            self.engine.speak(&self.config, text)?;
        }
        if let Some(index) = index {
            if !self.cancel.is_set() {
                self.listeners.notify(SynthEvent::IndexReached(index));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::new();
        for value in 0..5 {
            queue.push(Task::SetParameter { field: ParamField::VoicePitch, value });
        }
        for expected in 0..5 {
            match queue.pop() {
                Task::SetParameter { value, .. } => assert_eq!(value, expected),
                other => panic!("unexpected task {other:?}"),
            }
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue = Arc::new(TaskQueue::new());
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(std::time::Duration::from_millis(20));
                queue.push(Task::NotifyDone);
            })
        };
        assert_eq!(queue.pop().kind(), "notify-done");
        producer.join().unwrap();
    }

    #[test]
    fn test_cancel_speech_keeps_other_tasks_in_order() {
        let queue = TaskQueue::new();
        let signal = CancellationSignal::new();
        queue.push(Task::Speak { text: NormalizedText::new("раз"), index: Some(1) });
        queue.push(Task::SetParameter { field: ParamField::VoicePitch, value: 120 });
        queue.push(Task::Speak { text: NormalizedText::new("два"), index: None });
        queue.push(Task::NotifyDone);

        assert_eq!(queue.cancel_speech(&signal), 2);
        assert!(signal.is_set());

        let kinds: Vec<_> = (0..queue.len()).map(|_| queue.pop().kind()).collect();
        assert_eq!(kinds, vec!["set-parameter", "notify-done", "clear-cancellation"]);
    }

    struct NullEngine;

    impl SynthesisEngine for NullEngine {
        fn speak(&mut self, _config: &EngineConfig, _text: &NormalizedText) -> Result<()> {
            Err(DriverError::Engine("no voice".into()))
        }
        fn set_volume(&mut self, _volume: f32) {}
        fn set_speed(&mut self, _speed: f32) {}
    }

    struct NullSink;

    impl AudioSink for NullSink {
        fn feed(&self, _pcm: &[u8]) -> Result<()> {
            Ok(())
        }
        fn stop(&self) {}
        fn pause(&self, _paused: bool) {}
        fn idle(&self) {}
        fn close(&self) {}
    }

    #[test]
    fn test_worker_survives_faults() {
        let queue = Arc::new(TaskQueue::new());
        let sink: Arc<dyn AudioSink> = Arc::new(NullSink);
        let listeners = Arc::new(Listeners::new());
        let events = listeners.channel();
        let callback = AudioCallback::new(CancellationSignal::new(), sink.clone());
        let worker = Worker::new(
            queue.clone(),
            Box::new(NullEngine),
            EngineConfig::default(),
            callback,
            sink,
            listeners,
        );
        let handle = worker.spawn().unwrap();

        queue.push(Task::run(|_| anyhow::bail!("broken action")));
        queue.push(Task::run(|_| panic!("exploding action")));
        queue.push(Task::Speak { text: NormalizedText::new("текст"), index: Some(3) });
        queue.push(Task::SetParameter { field: ParamField::SpeechRate, value: 42 });
        queue.push(Task::NotifyDone);
        queue.push(Task::Shutdown);

        let worker = handle.join().expect("worker thread must not die");
        assert_eq!(worker.config().speech_rate, 42);
        // The failed speak must not report its index.
        assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![SynthEvent::DoneSpeaking]);
    }
}
