use wm_domain::QueueStatus;

/// Broadcast to any in-process subscriber watching queue progress (the
/// CLI's `doctor`/`status` command today, a future dashboard later),
/// mirroring the teacher's `TaskStore`/`TaskEvent` channel shape. Lagging
/// subscribers silently miss events — this is a monitoring aid, not a
/// delivery guarantee.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    Enqueued { queue_id: String, website_id: String },
    StatusChanged { queue_id: String, status: QueueStatus, message: String },
}
