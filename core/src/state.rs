// Shared dashboard state
//
// One mutex guards the whole snapshot so that a push tick's write-then-read
// and the toggle endpoints never interleave.

use crate::snapshot::{CronJob, Skill, Snapshot};
use crate::{HubError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Handle to the process-wide snapshot. Cloning shares the same state.
#[derive(Clone, Debug)]
pub struct SharedSnapshot {
    inner: Arc<Mutex<Snapshot>>,
}

impl SharedSnapshot {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(snapshot)),
        }
    }

    /// Copy of the current snapshot
    pub async fn current(&self) -> Snapshot {
        self.inner.lock().await.clone()
    }

    /// Read part of the snapshot without cloning the rest
    pub async fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let guard = self.inner.lock().await;
        f(&guard)
    }

    /// Run a read-modify-write under the lock
    pub async fn update<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard)
    }

    /// Flip `enabled` on a skill and return the updated record
    pub async fn toggle_skill(&self, id: &str) -> Result<Skill> {
        let mut guard = self.inner.lock().await;
        let skill = guard
            .skills
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| HubError::SkillNotFound(id.to_string()))?;

        skill.enabled = !skill.enabled;
        info!(skill_id = %skill.id, enabled = skill.enabled, "Skill toggled");
        Ok(skill.clone())
    }

    /// Flip a cron job between active and paused and return the updated record
    pub async fn toggle_cron_job(&self, id: u32) -> Result<CronJob> {
        let mut guard = self.inner.lock().await;
        let job = guard
            .cron_jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| HubError::CronJobNotFound(id.to_string()))?;

        job.status = job.status.toggled();
        info!(job_id = job.id, status = ?job.status, "Cron job toggled");
        Ok(job.clone())
    }
}

impl Default for SharedSnapshot {
    fn default() -> Self {
        Self::new(Snapshot::initial(chrono::Utc::now()))
    }
}
