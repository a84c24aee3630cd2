// src/engine.rs
use std::collections::HashSet;
use std::sync::mpsc::{channel, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::drivers::source::wallclock;
use crate::drivers::{
    ConnectionStatus, DeviceService, IngestOutput, LogStore, SignalSource, StreamIngest,
    ViewerError,
};
use crate::types::*;

const MAX_MESSAGES_PER_TICK: usize = 256;
const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Runs device and file operations off the UI thread.
pub struct TaskRunner {
    device: Arc<dyn DeviceService>,
    store: Arc<dyn LogStore>,
    tx: Sender<ViewerEvent>,
    in_flight: HashSet<OperationKind>,
}

impl TaskRunner {
    pub fn new(device: Arc<dyn DeviceService>, store: Arc<dyn LogStore>, tx: Sender<ViewerEvent>) -> Self {
        Self {
            device,
            store,
            tx,
            in_flight: HashSet::new(),
        }
    }

    pub fn device(&self) -> Arc<dyn DeviceService> {
        Arc::clone(&self.device)
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.in_flight.contains(&kind)
    }

    /// Starts `task` on its own thread. The result arrives as
    /// [`ViewerEvent::Task`]; the kind stays busy until [`TaskRunner::complete`].
    pub fn submit(&mut self, task: Task) -> Result<(), ViewerError> {
        let kind = task.kind();
        if !self.in_flight.insert(kind) {
            return Err(ViewerError::Busy(kind.label()));
        }
        let device = Arc::clone(&self.device);
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = run_task(device.as_ref(), store.as_ref(), task);
            if let Err(err) = &result {
                log::warn!("{kind} failed: {err}");
            }
            tx.send(ViewerEvent::Task { kind, result }).ok();
        });
        Ok(())
    }

    pub fn complete(&mut self, kind: OperationKind) {
        self.in_flight.remove(&kind);
    }
}

fn run_task(
    device: &dyn DeviceService,
    store: &dyn LogStore,
    task: Task,
) -> Result<TaskOutcome, ViewerError> {
    Ok(match task {
        Task::Scan => TaskOutcome::Scanned(device.scan()?),
        Task::Connect(name) => {
            let ok = device.connect(&name)?;
            TaskOutcome::Connected { name, ok }
        }
        Task::Disconnect => {
            device.disconnect()?;
            TaskOutcome::Disconnected
        }
        Task::GetFilter => TaskOutcome::Filter(device.filter_params()?),
        Task::SetFilter(params) => {
            device.set_filter_params(params)?;
            TaskOutcome::FilterSet
        }
        Task::GetLicence => TaskOutcome::Licence(device.licence_keys()?),
        Task::SetLicence(keys) => {
            device.set_licence_keys(keys)?;
            TaskOutcome::LicenceSet
        }
        Task::Load(path) => {
            let log = store.read_log(&path)?;
            TaskOutcome::Loaded { path, log }
        }
        Task::Save(path, log) => {
            store.write_log(&path, &log)?;
            TaskOutcome::Saved(path)
        }
    })
}

/// Running stream worker.
pub struct StreamHandle {
    cmd_tx: Sender<StreamCommand>,
    handle: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn send_marker(&self, id: String, label: String, remark: String) {
        self.cmd_tx
            .send(StreamCommand::Marker { id, label, remark })
            .ok();
    }

    /// Asks the worker to flush and exit, then waits for it.
    pub fn stop(mut self) {
        self.cmd_tx.send(StreamCommand::Stop).ok();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Spawns the thread that owns `source` and its ingest state, so message
/// intake and flushing never run concurrently.
pub fn spawn_stream(
    mut source: Box<dyn SignalSource>,
    flush_interval: f64,
    tx: Sender<ViewerEvent>,
) -> StreamHandle {
    let (cmd_tx, cmd_rx) = channel();
    let handle = thread::spawn(move || {
        let mut ingest = StreamIngest::new(flush_interval);
        tx.send(ViewerEvent::Log("Stream started".to_owned())).ok();
        'worker: loop {
            // 1. UI commands
            loop {
                match cmd_rx.try_recv() {
                    Ok(StreamCommand::Marker { id, label, remark }) => {
                        match ingest.ui_marker(id, label, remark, wallclock()) {
                            Some(marker) => {
                                tx.send(ViewerEvent::Marker(marker)).ok();
                            }
                            None => log::warn!("marker dropped: stream has no data yet"),
                        }
                    }
                    Ok(StreamCommand::Stop) | Err(TryRecvError::Disconnected) => break 'worker,
                    Err(TryRecvError::Empty) => break,
                }
            }

            // 2. device messages
            let mut received = 0;
            while received < MAX_MESSAGES_PER_TICK {
                let msg = match source.next_message() {
                    Ok(Some(msg)) => msg,
                    Ok(None) => break,
                    Err(err) => {
                        log::warn!("stream source failed: {err}");
                        tx.send(ViewerEvent::Log(format!("Stream error: {err}"))).ok();
                        tx.send(ViewerEvent::Connection(ConnectionStatus::Disconnected))
                            .ok();
                        break 'worker;
                    }
                };
                received += 1;
                let event = match ingest.accept(msg) {
                    Some(IngestOutput::Samples(batch)) => ViewerEvent::Samples(batch),
                    Some(IngestOutput::Marker(marker)) => ViewerEvent::Marker(marker),
                    None => continue,
                };
                if tx.send(event).is_err() {
                    return;
                }
            }

            // 3. idle flush
            if let Some(batch) = ingest.poll(wallclock()) {
                if tx.send(ViewerEvent::Samples(batch)).is_err() {
                    return;
                }
            }
            if source.is_exhausted() {
                break;
            }
            if received == 0 {
                thread::sleep(IDLE_SLEEP);
            }
        }
        if let Some(batch) = ingest.flush() {
            tx.send(ViewerEvent::Samples(batch)).ok();
        }
        tx.send(ViewerEvent::StreamEnded).ok();
    });
    StreamHandle {
        cmd_tx,
        handle: Some(handle),
    }
}
