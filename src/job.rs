//! Background offset meshing jobs
//!
//! A [`MeshingCoordinator`] runs at most one job at a time on a dedicated
//! worker thread. The caller gets a [`JobHandle`] back immediately and
//! receives the result through a completion callback, exactly once.
//!
//! The coordinator stays busy until the result has been handed over: the
//! flag clears after the callback returns, or when the handle is dropped
//! without one.

use crate::cancel::CancelToken;
use crate::errors::OffsetError;
use crate::indexed_mesh::IndexedMesh;
use crate::mesher::{Mesher, Polyline};
use crate::offset::{OffsetParams, Surface, build_offset_mesh};
use std::{
    any::Any,
    fmt::Debug,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

/// Name of the worker threads
pub const WORKER_THREAD_NAME: &str = "offset-mesher";

/// Everything a job needs, shared immutably with the worker
#[derive(Debug, Clone)]
pub struct OffsetRequest<S: Clone + Send + Sync + Debug> {
    pub surface: Arc<Surface<S>>,
    pub features: Arc<Vec<Polyline>>,
    pub params: OffsetParams,
}

impl<S: Clone + Send + Sync + Debug> OffsetRequest<S> {
    pub fn new(surface: impl Into<Surface<S>>, params: OffsetParams) -> Self {
        Self::shared(Arc::new(surface.into()), params)
    }

    /// Request over a surface already shared with other requests
    pub fn shared(surface: Arc<Surface<S>>, params: OffsetParams) -> Self {
        OffsetRequest {
            surface,
            features: Arc::new(Vec::new()),
            params,
        }
    }

    pub fn with_features(mut self, features: Vec<Polyline>) -> Self {
        self.features = Arc::new(features);
        self
    }

    /// Display name of the result, e.g. `"bunny offset 0.2 (25 0.05 0.01)"`
    pub fn result_name(&self, base: &str) -> String {
        format!(
            "{base} offset {} ({} {} {})",
            self.params.offset,
            self.params.facet_angle,
            self.params.facet_size,
            self.params.facet_distance
        )
    }
}

/// What a job delivers to its callback
#[derive(Debug)]
pub enum MeshingOutcome<S: Clone + Send + Sync + Debug> {
    Mesh(IndexedMesh<S>),
    /// The offset surface is empty
    Empty,
    /// The input or the parameters were rejected, or the worker panicked
    Invalid(OffsetError),
    Cancelled,
}

impl<S: Clone + Send + Sync + Debug> MeshingOutcome<S> {
    pub const fn status(&self) -> JobStatus {
        match self {
            MeshingOutcome::Mesh(_) => JobStatus::Completed,
            MeshingOutcome::Empty => JobStatus::Empty,
            MeshingOutcome::Invalid(_) => JobStatus::Failed,
            MeshingOutcome::Cancelled => JobStatus::Cancelled,
        }
    }

    pub fn into_mesh(self) -> Option<IndexedMesh<S>> {
        match self {
            MeshingOutcome::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

impl<S: Clone + Send + Sync + Debug> From<Result<Option<IndexedMesh<S>>, OffsetError>>
    for MeshingOutcome<S>
{
    fn from(result: Result<Option<IndexedMesh<S>>, OffsetError>) -> Self {
        match result {
            Ok(Some(mesh)) => MeshingOutcome::Mesh(mesh),
            Ok(None) => MeshingOutcome::Empty,
            Err(OffsetError::Cancelled) => MeshingOutcome::Cancelled,
            Err(err) => MeshingOutcome::Invalid(err),
        }
    }
}

/// Life cycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Idle,
    Running,
    /// Finished with a mesh
    Completed,
    /// Finished without a mesh
    Empty,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const fn is_finished(self) -> bool {
        !matches!(self, JobStatus::Idle | JobStatus::Running)
    }
}

type BusyFlag = Arc<(Mutex<bool>, Condvar)>;

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the coordinator's busy flag when dropped
#[derive(Debug)]
struct BusyGuard(BusyFlag);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let (busy, idle) = &*self.0;
        *lock(busy) = false;
        idle.notify_all();
    }
}

type Callback<S> = Box<dyn FnOnce(MeshingOutcome<S>) + Send + 'static>;

struct JobState<S: Clone + Send + Sync + Debug> {
    status: JobStatus,
    callback: Option<Callback<S>>,
    /// Outcome waiting for a callback
    parked: Option<MeshingOutcome<S>>,
    delivered: bool,
    /// The handle is gone; nobody will ever register a callback
    detached: bool,
    busy: Option<BusyGuard>,
}

struct JobShared<S: Clone + Send + Sync + Debug> {
    state: Mutex<JobState<S>>,
    finished: Condvar,
}

impl<S: Clone + Send + Sync + Debug> JobShared<S> {
    fn new(busy: BusyGuard) -> Self {
        JobShared {
            state: Mutex::new(JobState {
                status: JobStatus::Idle,
                callback: None,
                parked: None,
                delivered: false,
                detached: false,
                busy: Some(busy),
            }),
            finished: Condvar::new(),
        }
    }

    fn set_running(&self) {
        lock(&self.state).status = JobStatus::Running;
    }

    /// Hand `outcome` to the registered callback, or park it for a later one
    fn complete(&self, outcome: MeshingOutcome<S>) {
        let mut state = lock(&self.state);
        state.status = outcome.status();

        if let Some(callback) = state.callback.take() {
            state.delivered = true;
            let busy = state.busy.take();
            drop(state);
            self.finished.notify_all();
            callback(outcome);
            drop(busy);
        } else if state.detached {
            let busy = state.busy.take();
            drop(state);
            self.finished.notify_all();
            log::debug!("offset job finished after its handle was dropped");
            drop(outcome);
            drop(busy);
        } else {
            state.parked = Some(outcome);
            drop(state);
            self.finished.notify_all();
        }
    }
}

/// Caller side of a running job.
///
/// Dropping the handle detaches the job: it keeps running, but its outcome
/// is discarded.
pub struct JobHandle<S: Clone + Send + Sync + Debug> {
    shared: Arc<JobShared<S>>,
    cancel: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl<S: Clone + Send + Sync + Debug + 'static> JobHandle<S> {
    /// Register the completion callback.
    ///
    /// If the job already finished the callback runs right away on this
    /// thread; otherwise it runs on the worker. Only one callback may ever be
    /// registered.
    pub fn on_complete<F>(&self, callback: F) -> Result<(), OffsetError>
    where
        F: FnOnce(MeshingOutcome<S>) + Send + 'static,
    {
        let mut state = lock(&self.shared.state);
        if state.delivered || state.callback.is_some() {
            return Err(OffsetError::CallbackAlreadyRegistered);
        }

        match state.parked.take() {
            Some(outcome) => {
                state.delivered = true;
                let busy = state.busy.take();
                drop(state);
                callback(outcome);
                drop(busy);
            },
            None => state.callback = Some(Box::new(callback)),
        }
        Ok(())
    }

    /// Ask the worker to stop at its next safe point
    pub fn cancel(&self) {
        log::debug!("offset job cancellation requested");
        self.cancel.cancel();
    }

    pub fn status(&self) -> JobStatus {
        lock(&self.shared.state).status
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_finished()
    }

    /// Block until the worker has produced its outcome
    pub fn wait(&self) -> JobStatus {
        let mut state = lock(&self.shared.state);
        while !state.status.is_finished() {
            state = self
                .shared
                .finished
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.status
    }

    /// Wait for the worker thread to exit
    pub fn join(mut self) -> Result<(), OffsetError> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|payload| OffsetError::WorkerPanicked(panic_message(payload.as_ref()))),
            None => Ok(()),
        }
    }
}

impl<S: Clone + Send + Sync + Debug> Drop for JobHandle<S> {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        state.detached = true;
        // An undelivered outcome goes with the handle
        if let Some(outcome) = state.parked.take() {
            let busy = state.busy.take();
            drop(state);
            drop(outcome);
            drop(busy);
        }
    }
}

impl<S: Clone + Send + Sync + Debug> Debug for JobHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("status", &lock(&self.shared.state).status)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs offset meshing jobs one at a time.
///
/// The busy flag belongs to the coordinator instance; separate coordinators
/// do not block each other.
#[derive(Debug, Clone, Default)]
pub struct MeshingCoordinator {
    busy: BusyFlag,
}

impl MeshingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a job is running or its outcome has not been handed over yet
    pub fn is_busy(&self) -> bool {
        *lock(&self.busy.0)
    }

    /// Block until no job is in progress
    pub fn wait_idle(&self) {
        let (busy, idle) = &*self.busy;
        let mut guard = lock(busy);
        while *guard {
            guard = idle.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until no job is in progress or `timeout` elapsed; true if idle
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let (busy, idle) = &*self.busy;
        let guard = lock(busy);
        let (guard, _) = idle
            .wait_timeout_while(guard, timeout, |busy| *busy)
            .unwrap_or_else(PoisonError::into_inner);
        !*guard
    }

    /// Start meshing `request` with `mesher` on a new worker thread.
    ///
    /// Fails with [`OffsetError::Busy`] while another job is in progress.
    /// Errors of the job itself are delivered through the callback as
    /// [`MeshingOutcome::Invalid`].
    pub fn submit<S, M>(
        &self,
        request: OffsetRequest<S>,
        mesher: M,
    ) -> Result<JobHandle<S>, OffsetError>
    where
        S: Clone + Send + Sync + Debug + 'static,
        M: Mesher + Send + 'static,
    {
        {
            let mut busy = lock(&self.busy.0);
            if *busy {
                return Err(OffsetError::Busy);
            }
            *busy = true;
        }

        let shared = Arc::new(JobShared::new(BusyGuard(Arc::clone(&self.busy))));
        let cancel = CancelToken::new();

        let worker_shared = Arc::clone(&shared);
        let worker_cancel = cancel.clone();
        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_job(request, mesher, &worker_shared, &worker_cancel))?;

        Ok(JobHandle {
            shared,
            cancel,
            thread: Some(thread),
        })
    }
}

fn run_job<S, M>(
    request: OffsetRequest<S>,
    mesher: M,
    shared: &JobShared<S>,
    cancel: &CancelToken,
) where
    S: Clone + Send + Sync + Debug,
    M: Mesher,
{
    shared.set_running();
    log::info!(
        "offset meshing started: offset {}, {} polygons, {} feature polylines",
        request.params.offset,
        request.surface.polygon_count(),
        request.features.len()
    );

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        build_offset_mesh(
            &request.surface,
            &request.params,
            &request.features,
            &mesher,
            cancel,
        )
    }));

    let outcome = match result {
        Ok(result) => MeshingOutcome::from(result),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("offset meshing worker panicked: {message}");
            MeshingOutcome::Invalid(OffsetError::WorkerPanicked(message))
        },
    };
    match &outcome {
        MeshingOutcome::Cancelled => log::warn!("offset meshing cancelled"),
        MeshingOutcome::Invalid(err) => log::warn!("offset meshing failed: {err}"),
        _ => {},
    }
    shared.complete(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_name_lists_the_parameters() {
        let params = OffsetParams::default()
            .with_offset(0.2)
            .with_facet_angle(25.0)
            .with_facet_size(0.05)
            .with_facet_distance(0.01);
        let request = OffsetRequest::<()>::new(IndexedMesh::<()>::cube(1.0, None), params);
        assert_eq!(request.result_name("cube"), "cube offset 0.2 (25 0.05 0.01)");
    }

    #[test]
    fn outcome_from_result() {
        let cancelled: MeshingOutcome<()> = Err(OffsetError::Cancelled).into();
        assert_eq!(cancelled.status(), JobStatus::Cancelled);
        let empty: MeshingOutcome<()> = Ok(None).into();
        assert_eq!(empty.status(), JobStatus::Empty);
        let failed: MeshingOutcome<()> = Err(OffsetError::EmptySurface).into();
        assert_eq!(failed.status(), JobStatus::Failed);
        assert!(failed.into_mesh().is_none());
        assert!(!JobStatus::Running.is_finished());
    }

    #[test]
    fn busy_guard_clears_the_flag() {
        let coordinator = MeshingCoordinator::new();
        *lock(&coordinator.busy.0) = true;
        assert!(coordinator.is_busy());
        assert!(!coordinator.wait_idle_timeout(Duration::from_millis(10)));
        drop(BusyGuard(Arc::clone(&coordinator.busy)));
        assert!(!coordinator.is_busy());
        coordinator.wait_idle();
    }
}
