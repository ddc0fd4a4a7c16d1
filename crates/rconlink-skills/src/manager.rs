use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rconlink_client::CommandSender;
use rconlink_registry::{resolve_positional, SKILLS};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::{RoutineTiming, SkillContext};
use crate::error::{Result, SkillError};
use crate::routines::RoutinePlan;

/// Commands sent by [`SkillManager::stop`], each suffixed with the
/// companion id.
pub const CLEAR_SEQUENCE: [&str; 3] = [
    "/fac_move_stop",
    "/fac_resource_mine_stop",
    "/fac_action_attack_stop",
];

/// How long `stop` waits for a cancelled routine to unwind.
const STOP_GRACE: Duration = Duration::from_secs(2);

struct RunningSkill {
    run_id: u64,
    skill: &'static str,
    started_at: SystemTime,
    started: Instant,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RunningSkill {
    fn info(&self, entity_id: i64) -> SkillInfo {
        SkillInfo {
            entity_id,
            pid: self.run_id,
            skill_name: self.skill,
            start_time: unix_millis(self.started_at),
            elapsed_seconds: self.started.elapsed().as_secs(),
        }
    }
}

/// A tracked skill as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillInfo {
    pub entity_id: i64,
    /// Run id, unique per manager.
    pub pid: u64,
    pub skill_name: &'static str,
    /// Unix epoch milliseconds.
    pub start_time: u64,
    pub elapsed_seconds: u64,
}

/// Locally tracked state of one companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStatus {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<u64>,
}

/// Server-sourced state merged with local tracking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillStatus {
    pub companion_id: i64,
    /// `null` when the position query failed.
    pub position: Option<Value>,
    /// `null` when the health query failed.
    pub health: Option<Value>,
    #[serde(flatten)]
    pub local: LocalStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearedCommand {
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of [`SkillManager::stop`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReport {
    pub companion_id: i64,
    pub stopped: Option<SkillInfo>,
    pub cleared: Vec<ClearedCommand>,
    pub summary: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

type RunningMap = Arc<Mutex<HashMap<i64, RunningSkill>>>;

/// Tracks at most one running skill per companion.
///
/// The map lock is only ever held for synchronous bookkeeping, never across
/// an await.
pub struct SkillManager<C> {
    sender: Arc<C>,
    timing: RoutineTiming,
    running: RunningMap,
    next_run_id: AtomicU64,
}

impl<C> SkillManager<C>
where
    C: CommandSender + 'static,
{
    pub fn new(sender: Arc<C>) -> Self {
        Self::with_timing(sender, RoutineTiming::default())
    }

    pub fn with_timing(sender: Arc<C>, timing: RoutineTiming) -> Self {
        Self {
            sender,
            timing,
            running: Arc::new(Mutex::new(HashMap::new())),
            next_run_id: AtomicU64::new(1),
        }
    }

    pub fn sender(&self) -> &Arc<C> {
        &self.sender
    }

    /// Launch `skill_name` for `entity_id` in the background.
    ///
    /// Fails with [`SkillError::AlreadyRunning`] when the companion already
    /// has a tracked skill. Must be called within a tokio runtime.
    pub fn start(&self, entity_id: i64, skill_name: &str, arguments: &Value) -> Result<SkillInfo> {
        let spec = SKILLS
            .iter()
            .find(|spec| spec.name == skill_name)
            .ok_or_else(|| SkillError::UnknownSkill(skill_name.to_string()))?;
        let values = resolve_positional(spec.name, spec.params, arguments)?;
        let plan = RoutinePlan::parse(spec.routine, &values)?;

        let mut running = lock(&self.running);
        if let Some(existing) = running.get(&entity_id) {
            return Err(SkillError::AlreadyRunning {
                entity_id,
                skill: existing.skill,
                pid: existing.run_id,
            });
        }

        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let ctx = SkillContext::new(
            Arc::clone(&self.sender),
            entity_id,
            cancel.clone(),
            self.timing,
        );
        let handle = tokio::spawn(supervise(
            plan,
            ctx,
            cancel.clone(),
            Arc::clone(&self.running),
            entity_id,
            run_id,
            spec.name,
        ));
        let entry = RunningSkill {
            run_id,
            skill: spec.name,
            started_at: SystemTime::now(),
            started: Instant::now(),
            cancel,
            handle,
        };
        let info = entry.info(entity_id);
        running.insert(entity_id, entry);
        drop(running);

        info!(entity_id, skill = spec.name, pid = run_id, "skill started");
        Ok(info)
    }

    /// Cancel any tracked skill and send the clear sequence.
    ///
    /// Never fails because nothing was running; failed clear commands are
    /// logged and reported.
    pub async fn stop(&self, entity_id: i64) -> StopReport {
        let removed = lock(&self.running).remove(&entity_id);
        let stopped = match removed {
            Some(entry) => {
                let info = entry.info(entity_id);
                entry.cancel.cancel();
                self.reap(entity_id, entry.handle).await;
                info!(entity_id, skill = info.skill_name, pid = info.pid, "skill stopped");
                Some(info)
            }
            None => None,
        };

        let mut cleared = Vec::with_capacity(CLEAR_SEQUENCE.len());
        for prefix in CLEAR_SEQUENCE {
            let command = format!("{prefix} {entity_id}");
            let result = self
                .sender
                .send_command(&command, self.timing.command_timeout)
                .await;
            if !result.success {
                warn!(
                    entity_id,
                    command = %command,
                    error = result.error.as_deref().unwrap_or("unknown error"),
                    "clear command failed"
                );
            }
            cleared.push(ClearedCommand {
                command,
                success: result.success,
                error: result.error,
            });
        }

        let ok = cleared.iter().filter(|c| c.success).count();
        let summary = match &stopped {
            Some(info) => format!(
                "Companion {entity_id}: stopped {} (pid {}); {ok}/{} stop commands succeeded",
                info.skill_name,
                info.pid,
                cleared.len()
            ),
            None => format!(
                "Companion {entity_id}: no skill running; {ok}/{} stop commands succeeded",
                cleared.len()
            ),
        };

        StopReport {
            companion_id: entity_id,
            stopped,
            cleared,
            summary,
        }
    }

    /// Wait briefly for a cancelled routine; a task that already ended, even
    /// abnormally, counts as stopped.
    async fn reap(&self, entity_id: i64, handle: JoinHandle<()>) {
        let abort = handle.abort_handle();
        match tokio::time::timeout(STOP_GRACE, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let err = SkillError::ProcessTermination(err.to_string());
                debug!(entity_id, error = %err, "ignoring termination error");
            }
            Err(_) => {
                warn!(entity_id, "skill did not unwind in time, aborting");
                abort.abort();
            }
        }
    }

    /// Local tracking for one companion.
    pub fn local_status(&self, entity_id: i64) -> LocalStatus {
        match lock(&self.running).get(&entity_id) {
            Some(entry) => LocalStatus {
                running: true,
                skill_name: Some(entry.skill),
                pid: Some(entry.run_id),
                elapsed_seconds: Some(entry.started.elapsed().as_secs()),
            },
            None => LocalStatus {
                running: false,
                skill_name: None,
                pid: None,
                elapsed_seconds: None,
            },
        }
    }

    pub fn is_running(&self, entity_id: i64) -> bool {
        lock(&self.running).contains_key(&entity_id)
    }

    /// Query position and health, then merge with local tracking.
    pub async fn status(&self, entity_id: i64) -> SkillStatus {
        let position = self
            .query(&format!("/fac_companion_position {entity_id}"))
            .await
            .map(|data| data.get("position").cloned().unwrap_or(data));
        let health = self
            .query(&format!("/fac_companion_health {entity_id}"))
            .await;

        SkillStatus {
            companion_id: entity_id,
            position,
            health,
            local: self.local_status(entity_id),
        }
    }

    async fn query(&self, command: &str) -> Option<Value> {
        let result = self
            .sender
            .send_command(command, self.timing.command_timeout)
            .await;
        let value = result.json_value();
        if value.is_none() {
            debug!(command, error = ?result.error, "status query yielded nothing");
        }
        value
    }

    /// Every tracked skill, ordered by companion id.
    pub fn running(&self) -> Vec<SkillInfo> {
        let mut list: Vec<SkillInfo> = lock(&self.running)
            .iter()
            .map(|(entity_id, entry)| entry.info(*entity_id))
            .collect();
        list.sort_by_key(|info| info.entity_id);
        list
    }

    /// Cancel every routine and wait for them to unwind.
    pub async fn shutdown(&self) {
        let drained: Vec<(i64, RunningSkill)> = lock(&self.running).drain().collect();
        if drained.is_empty() {
            return;
        }
        info!(count = drained.len(), "cancelling running skills");
        for (_, entry) in &drained {
            entry.cancel.cancel();
        }
        for (entity_id, entry) in drained {
            self.reap(entity_id, entry.handle).await;
        }
    }
}

impl<C> Drop for SkillManager<C> {
    fn drop(&mut self) {
        for entry in lock(&self.running).values() {
            entry.cancel.cancel();
        }
    }
}

/// Drops the tracking entry when the supervising task ends, whether the
/// routine returned, panicked or was aborted.
struct EntryGuard {
    running: RunningMap,
    entity_id: i64,
    run_id: u64,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        let mut map = lock(&self.running);
        if map
            .get(&self.entity_id)
            .is_some_and(|entry| entry.run_id == self.run_id)
        {
            map.remove(&self.entity_id);
        }
    }
}

async fn supervise<C: CommandSender + 'static>(
    plan: RoutinePlan,
    ctx: SkillContext<C>,
    cancel: CancellationToken,
    running: RunningMap,
    entity_id: i64,
    run_id: u64,
    skill: &'static str,
) {
    let _entry = EntryGuard {
        running,
        entity_id,
        run_id,
    };
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SkillError::Cancelled),
        result = plan.run(&ctx) => result,
    };
    match outcome {
        Ok(summary) => info!(entity_id, skill, pid = run_id, summary = %summary, "skill finished"),
        Err(SkillError::Cancelled) => debug!(entity_id, skill, pid = run_id, "skill cancelled"),
        Err(err) => warn!(entity_id, skill, pid = run_id, error = %err, "skill failed"),
    }
}
