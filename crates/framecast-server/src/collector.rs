//! Frame capture scheduling and fan-out.
//!
//! One camera, many clients, each with its own cadence. The
//! [`FrameCollector`] owns the only capture path and multiplexes all
//! client schedules onto it:
//!
//! ```text
//!  register(id, fps, queue, count)
//!        │
//!        ▼
//!  ┌─────────────────────────────┐     ┌──────────────┐
//!  │ schedule: BTreeMap<Instant, │────▶│  scheduler   │──capture──▶ camera
//!  │           Vec<ClientId>>    │     │    task      │
//!  └─────────────────────────────┘     └──────┬───────┘
//!                                             │ one copy per due client
//!                             ┌───────────────┼───────────────┐
//!                             ▼               ▼               ▼
//!                        queue (A)       queue (B)       queue (C)
//! ```
//!
//! The scheduler sleeps until the earliest due time, wakes, snapshots
//! every client due at that moment, performs a single just-in-time
//! capture with the lock released, and pushes a fresh pixel copy into
//! each due client's queue. Clients due in the same wakeup share one
//! capture. Finite clients count down and are deregistered when their
//! remaining frame count hits zero; their queue is marked finished so
//! the listener task can complete the stream.
//!
//! Capture failures advance nobody: the due clients stay scheduled at
//! their old deadline and the round is retried.

use crate::queue::FrameQueue;
use chrono::{DateTime, Utc};
use framecast_camera::Camera;
use framecast_core::ClientId;
use framecast_core::constants::FRAME_QUEUE_CAPACITY;
use framecast_protocol::ImageBinaryData;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Acquisition metadata attached to every delivered frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameMetadata {
    /// Capture completion time.
    pub timestamp: DateTime<Utc>,
    /// Rolling camera frame counter; not unique across restarts.
    pub frame_id: u64,
}

/// One frame as delivered to a client queue: metadata plus an owned
/// image payload the consumer is free to mutate.
#[derive(Debug)]
pub struct Frame {
    pub metadata: FrameMetadata,
    pub image: ImageBinaryData,
}

/// Shared handle to a client's frame queue.
pub type ClientQueue = Arc<FrameQueue<Frame>>;

/// Per-client scheduling state.
#[derive(Debug)]
struct ClientRegistration {
    fps: f64,
    interval: Duration,
    next_due: Instant,
    queue: ClientQueue,
    /// Frames still owed; -1 streams forever.
    remaining_frames: i64,
    immediate: bool,
}

#[derive(Debug, Default)]
struct ScheduleState {
    clients: HashMap<ClientId, ClientRegistration>,
    /// Due-time index over `clients`; every registered client appears
    /// exactly once, keyed by its current `next_due`.
    schedule: BTreeMap<Instant, Vec<ClientId>>,
}

impl ScheduleState {
    fn insert_into_schedule(&mut self, due: Instant, client_id: ClientId) {
        self.schedule.entry(due).or_default().push(client_id);
    }

    fn remove_from_schedule(&mut self, due: Instant, client_id: ClientId) {
        if let Some(bucket) = self.schedule.get_mut(&due) {
            bucket.retain(|id| *id != client_id);
            if bucket.is_empty() {
                self.schedule.remove(&due);
            }
        }
    }
}

#[derive(Debug)]
struct CollectorShared {
    camera: Camera,
    state: StdMutex<ScheduleState>,
    /// Woken on registration, deregistration, and stop, so the
    /// scheduler re-evaluates its earliest deadline.
    wakeup: Notify,
    stopped: AtomicBool,
}

/// Schedules captures on the single camera and fans frames out to
/// registered client queues.
///
/// Cloning the collector clones a handle to the same scheduler.
#[derive(Debug, Clone)]
pub struct FrameCollector {
    shared: Arc<CollectorShared>,
    task: Arc<StdMutex<Option<JoinHandle<()>>>>,
}

impl FrameCollector {
    /// Create a collector over `camera`. No scheduler runs until
    /// [`start`](Self::start) is called.
    pub fn new(camera: Camera) -> Self {
        FrameCollector {
            shared: Arc::new(CollectorShared {
                camera,
                state: StdMutex::new(ScheduleState::default()),
                wakeup: Notify::new(),
                stopped: AtomicBool::new(false),
            }),
            task: Arc::new(StdMutex::new(None)),
        }
    }

    /// Spawn the scheduler task.
    pub fn start(&self) {
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            scheduler_loop(shared).await;
        });
        *self.task.lock().unwrap() = Some(handle);
    }

    /// Allocate a frame queue with the standard per-client capacity.
    pub fn make_queue(&self) -> ClientQueue {
        Arc::new(FrameQueue::bounded(FRAME_QUEUE_CAPACITY))
    }

    /// Returns `true` while any client is registered.
    pub fn is_busy(&self) -> bool {
        !self.shared.state.lock().unwrap().clients.is_empty()
    }

    /// Register a client for `frame_count` frames at `fps`.
    ///
    /// A request for exactly one frame with a non-positive `fps` is an
    /// immediate capture: the client is scheduled as due right away
    /// instead of one interval in the future. `frame_count == -1`
    /// streams until deregistration.
    pub fn register_client(
        &self,
        client_id: ClientId,
        fps: f64,
        queue: ClientQueue,
        frame_count: i64,
    ) {
        let now = Instant::now();
        let (interval, next_due, immediate) = if frame_count == 1 && fps <= 0.0 {
            (Duration::from_micros(1), now, true)
        } else {
            let interval_us = (1_000_000.0 / fps).round();
            let interval = Duration::from_micros(interval_us as u64);
            if (interval_us - 1_000_000.0 / fps).abs() > f64::EPSILON {
                debug!(fps, "frame interval rounded to whole microseconds");
            }
            (interval, now + interval, false)
        };

        info!(
            client = %client_id.short(),
            fps,
            interval_us = interval.as_micros() as u64,
            frame_count,
            immediate,
            "registering client for frames"
        );

        let mut state = self.shared.state.lock().unwrap();
        state.clients.insert(
            client_id,
            ClientRegistration {
                fps,
                interval,
                next_due,
                queue,
                remaining_frames: frame_count,
                immediate,
            },
        );
        state.insert_into_schedule(next_due, client_id);
        drop(state);
        self.shared.wakeup.notify_one();
    }

    /// Remove a client from the table and the schedule. Its queue is
    /// closed so a listener parked in `pop` wakes and exits. No-op for
    /// unknown ids.
    pub fn deregister_client(&self, client_id: ClientId) {
        let mut state = self.shared.state.lock().unwrap();
        if let Some(registration) = state.clients.remove(&client_id) {
            state.remove_from_schedule(registration.next_due, client_id);
            drop(state);
            registration.queue.close();
            self.shared.wakeup.notify_one();
            info!(client = %client_id.short(), "client deregistered from collector");
        }
    }

    /// Stop the scheduler, wait for it to exit, and mark every
    /// remaining client queue done.
    pub async fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);

        // Close queues before joining: a scheduler parked in a full
        // push must unblock before it can observe the stop flag.
        let queues: Vec<ClientQueue> = {
            let state = self.shared.state.lock().unwrap();
            state
                .clients
                .values()
                .map(|registration| Arc::clone(&registration.queue))
                .collect()
        };
        for queue in queues {
            queue.close();
        }

        self.shared.wakeup.notify_waiters();
        self.shared.wakeup.notify_one();
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }

        let mut state = self.shared.state.lock().unwrap();
        let clients = std::mem::take(&mut state.clients);
        state.schedule.clear();
        drop(state);
        for (client_id, registration) in clients {
            trace!(client = %client_id.short(), "closing queue at collector shutdown");
            registration.queue.close();
        }
    }
}

/// One frame delivery prepared under the lock and pushed outside it.
struct Delivery {
    queue: ClientQueue,
    frame: Frame,
    /// The client consumed its last owed frame with this delivery.
    finished: bool,
    client_id: ClientId,
}

async fn scheduler_loop(shared: Arc<CollectorShared>) {
    debug!("frame scheduler started");
    loop {
        if shared.stopped.load(Ordering::SeqCst) {
            break;
        }

        // Register wakeup interest before inspecting the schedule so a
        // concurrent registration cannot slip between the two.
        let notified = shared.wakeup.notified();
        let earliest = {
            let state = shared.state.lock().unwrap();
            state.schedule.keys().next().copied()
        };

        match earliest {
            None => {
                // Nothing scheduled; park until something changes.
                notified.await;
                continue;
            }
            Some(due) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(due) => {}
                    // A new earliest deadline or a stop request; loop
                    // around and re-evaluate.
                    _ = notified => continue,
                }
            }
        }

        if shared.stopped.load(Ordering::SeqCst) {
            break;
        }

        // Snapshot everyone due by now and pull their buckets.
        let now = Instant::now();
        let due_ids: Vec<ClientId> = {
            let mut state = shared.state.lock().unwrap();
            let mut due_ids = Vec::new();
            while let Some((&due, _)) = state.schedule.first_key_value() {
                if due > now {
                    break;
                }
                let (_, bucket) = state.schedule.pop_first().expect("non-empty schedule");
                due_ids.extend(bucket);
            }
            due_ids
        };

        if due_ids.is_empty() {
            continue;
        }

        // Single just-in-time capture for the whole snapshot, with the
        // lock released so registrations stay responsive.
        trace!(clients = due_ids.len(), "capturing frame for due clients");
        let captured = match shared.camera.capture(None).await {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "capture failed, retrying due clients");
                // Nobody advances: put the snapshot back at its old
                // deadlines and let the next iteration retry.
                let mut state = shared.state.lock().unwrap();
                for client_id in due_ids {
                    let due = state.clients.get(&client_id).map(|r| r.next_due);
                    if let Some(due) = due {
                        state.insert_into_schedule(due, client_id);
                    }
                }
                continue;
            }
        };

        let metadata = FrameMetadata {
            timestamp: Utc::now(),
            frame_id: captured.frame_id,
        };
        let shape = [captured.height as u64, captured.width as u64];

        // Bookkeeping under the lock: count down, reschedule, and
        // stage one delivery per client still registered.
        let deliveries: Vec<Delivery> = {
            let mut guard = shared.state.lock().unwrap();
            // Reborrow so `clients` and `schedule` can be borrowed
            // disjointly through the guard.
            let state = &mut *guard;
            let mut deliveries = Vec::with_capacity(due_ids.len());
            for client_id in due_ids {
                let Some(registration) = state.clients.get_mut(&client_id) else {
                    debug!(client = %client_id.short(), "due client vanished before delivery");
                    continue;
                };
                trace!(
                    client = %client_id.short(),
                    fps = registration.fps,
                    immediate = registration.immediate,
                    remaining = registration.remaining_frames,
                    "staging frame delivery"
                );

                // Each consumer gets its own pixel copy so it may
                // mutate the frame without affecting its peers.
                let image = match ImageBinaryData::new(captured.pixels.clone(), shape, Vec::new()) {
                    Ok(image) => image,
                    Err(error) => {
                        warn!(%error, "captured frame has inconsistent shape, dropping round");
                        let due = registration.next_due;
                        state.schedule.entry(due).or_default().push(client_id);
                        continue;
                    }
                };

                if registration.remaining_frames > 0 {
                    registration.remaining_frames -= 1;
                }
                let finished = registration.remaining_frames == 0;
                if !finished {
                    // Keep the phase, but never schedule into the
                    // past: a slow capture must not cause a burst of
                    // catch-up frames.
                    let next_due = (registration.next_due + registration.interval).max(now);
                    registration.next_due = next_due;
                    state.schedule.entry(next_due).or_default().push(client_id);
                }

                deliveries.push(Delivery {
                    queue: Arc::clone(&registration.queue),
                    frame: Frame { metadata, image },
                    finished,
                    client_id,
                });
            }
            deliveries
        };

        // Push with the lock released; a slow consumer stalls only the
        // deliveries behind it, never registration or deregistration.
        for delivery in deliveries {
            delivery.queue.push(delivery.frame).await;
            if delivery.finished {
                debug!(
                    client = %delivery.client_id.short(),
                    "client received all requested frames"
                );
                {
                    // Finished clients were not rescheduled; only the
                    // table entry remains. Remove it before signalling
                    // the queue, so a consumer that observes the end
                    // of stream also observes the deregistration.
                    let mut state = shared.state.lock().unwrap();
                    state.clients.remove(&delivery.client_id);
                }
                if !delivery.queue.done() {
                    delivery.queue.producer_finished();
                }
            }
        }
    }

    debug!("frame scheduler stopped");
}
