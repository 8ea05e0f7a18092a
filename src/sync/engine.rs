//! The sync service: owns the task tree and runs one fetch cycle at a time.
//!
//! A cycle is `fetch_sync` → [`SyncEngine::apply_sync`] → (optionally)
//! `fetch_completed` → [`SyncEngine::apply_completed`]. The tree is only
//! read for display between cycles, through [`SyncEngine::view`].

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::io::payload_io::FetchError;
use crate::model::config::Settings;
use crate::model::payload::{CompletedPayload, SyncPayload, WireTask};
use crate::model::task::{Task, TaskId};
use crate::model::tree::TaskTree;
use crate::model::view::{Projection, ViewState};
use crate::ops::age::filter_completed_by_age;
use crate::ops::dates::{day_in, normalize_task_in};
use crate::ops::filter::{derive_blacklist, filter_items, retain_within_due_window};
use crate::ops::reconcile::{Incoming, ReconcileReport, merge_delta, reconcile};
use crate::ops::rows::render_rows;
use crate::ops::sort::sort_tree;
use crate::ops::view::project_view;

/// Cursor value that asks for a full sync
pub const FULL_SYNC_TOKEN: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("fetch failed: {0}")]
    Transport(#[from] FetchError),
    #[error("payload was fetched with a different access token")]
    AccessMismatch,
    #[error("plan {plan_name:?} does not allow completed task lookups")]
    UnsupportedPlan { plan_name: String },
    #[error("completed payload for sync {got} arrived after sync {current}")]
    StaleCompleted { got: u64, current: u64 },
}

/// Parameters of a primary fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub access_token: String,
    pub sync_token: String,
}

/// Parameters of a completed-tasks fetch, tied to the sync that asked for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRequest {
    pub generation: u64,
    /// Lower bound, `YYYY-MM-DDT00:00:00.000000Z`
    pub since: String,
}

/// The fetch side of a cycle. Implementations handle transport, retries
/// and stamping the credential they used onto each payload.
pub trait Fetcher {
    fn fetch_sync(&mut self, request: &SyncRequest) -> Result<SyncPayload, FetchError>;
    fn fetch_completed(&mut self, request: &CompletedRequest) -> Result<CompletedPayload, FetchError>;
}

/// Whether a primary sync should be followed by a completed-tasks fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedFollowUp {
    NotNeeded,
    Requested(CompletedRequest),
    Unsupported { plan_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub generation: u64,
    pub report: ReconcileReport,
    pub aged_out: Vec<TaskId>,
    pub follow_up: CompletedFollowUp,
}

/// Everything that happened in one `poll_once`
#[derive(Debug, Default)]
pub struct CycleReport {
    pub sync: Option<SyncOutcome>,
    pub completed: Option<ReconcileReport>,
    pub errors: Vec<SyncError>,
}

pub struct SyncEngine<Tz: TimeZone = Local> {
    settings: Settings,
    tree: TaskTree,
    tz: Tz,
    generation: u64,
    sync_token: Option<String>,
    loaded: bool,
}

impl SyncEngine<Local> {
    pub fn new(settings: Settings) -> Self {
        SyncEngine::with_timezone(settings, Local)
    }
}

impl<Tz: TimeZone> SyncEngine<Tz> {
    /// Engine that reads floating dates and computes day differences in `tz`
    pub fn with_timezone(settings: Settings, tz: Tz) -> Self {
        SyncEngine {
            settings,
            tree: TaskTree::new(),
            tz,
            generation: 0,
            sync_token: None,
            loaded: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tree(&self) -> &TaskTree {
        &self.tree
    }

    /// Number of primary payloads applied so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Latest cursor returned by the service
    pub fn sync_token(&self) -> Option<&str> {
        self.sync_token.as_deref()
    }

    /// True once the first cycle has finished
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Request for the next primary fetch. An empty configured token turns
    /// incremental sync off.
    pub fn sync_request(&self) -> SyncRequest {
        let configured = &self.settings.sync.sync_token;
        let sync_token = if configured.is_empty() {
            FULL_SYNC_TOKEN.to_string()
        } else {
            self.sync_token.clone().unwrap_or_else(|| configured.clone())
        };
        SyncRequest {
            access_token: self.settings.sync.access_token.clone(),
            sync_token,
        }
    }

    /// Filter, normalize and reconcile a primary payload, then prune aged
    /// completed tasks. Payloads fetched with another credential are
    /// rejected without touching any state.
    pub fn apply_sync(&mut self, payload: SyncPayload, now: DateTime<Utc>) -> Result<SyncOutcome, SyncError> {
        self.check_credential(payload.access_token.as_deref())?;
        self.generation += 1;
        let generation = self.generation;

        if !self.settings.sync.sync_token.is_empty()
            && let Some(token) = &payload.sync_token
        {
            self.sync_token = Some(token.clone());
        }
        if payload.full_sync {
            derive_blacklist(&mut self.settings.filter, &payload.projects);
        }

        let SyncPayload {
            full_sync,
            items,
            projects,
            collaborators,
            user_plan_limits,
            ..
        } = payload;
        let had_items = !items.is_empty();
        let tasks = self.admit(items);
        let report = reconcile(
            &mut self.tree,
            Incoming {
                tasks,
                projects,
                collaborators,
                full_sync,
            },
            self.settings.display.strict,
        );
        let aged_out = self.prune(now);

        let follow_up = if full_sync && self.settings.display.display_completed && had_items {
            match user_plan_limits.current {
                Some(plan) if plan.completed_tasks => CompletedFollowUp::Requested(CompletedRequest {
                    generation,
                    since: self.completed_since(now),
                }),
                Some(plan) => {
                    warn!(plan = %plan.plan_name, "plan does not allow completed task lookups");
                    CompletedFollowUp::Unsupported {
                        plan_name: plan.plan_name,
                    }
                }
                None => {
                    debug!("payload carries no plan limits, skipping completed tasks");
                    CompletedFollowUp::NotNeeded
                }
            }
        } else {
            CompletedFollowUp::NotNeeded
        };
        if !matches!(follow_up, CompletedFollowUp::Requested(_)) {
            self.loaded = true;
        }

        info!(
            generation,
            full_sync,
            inserted = report.inserted,
            updated = report.updated,
            removed = report.removed,
            orphans = report.orphans.len(),
            aged_out = aged_out.len(),
            "applied sync payload"
        );
        Ok(SyncOutcome {
            generation,
            report,
            aged_out,
            follow_up,
        })
    }

    /// Merge completed tasks fetched for sync `generation`. Results for a
    /// sync that has since been superseded are discarded.
    pub fn apply_completed(
        &mut self,
        payload: CompletedPayload,
        generation: u64,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, SyncError> {
        self.check_credential(payload.access_token.as_deref())?;
        if generation != self.generation {
            debug!(got = generation, current = self.generation, "discarding stale completed payload");
            return Err(SyncError::StaleCompleted {
                got: generation,
                current: self.generation,
            });
        }

        let items: Vec<WireTask> = payload.items.into_iter().filter_map(|e| e.item_object).collect();
        let tasks = self.admit(items);
        let report = merge_delta(&mut self.tree, tasks, self.settings.display.strict);
        self.prune(now);
        self.loaded = true;

        debug!(
            generation,
            inserted = report.inserted,
            updated = report.updated,
            "applied completed payload"
        );
        Ok(report)
    }

    /// Run one full cycle against `fetcher`. Errors are collected, never
    /// raised; the tree keeps its last consistent state.
    pub fn poll_once<F: Fetcher>(&mut self, fetcher: &mut F, now: DateTime<Utc>) -> CycleReport {
        let mut cycle = CycleReport::default();

        let request = self.sync_request();
        let payload = match fetcher.fetch_sync(&request) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "sync fetch failed");
                cycle.errors.push(e.into());
                return cycle;
            }
        };

        let outcome = match self.apply_sync(payload, now) {
            Ok(o) => o,
            Err(e) => {
                debug!(error = %e, "sync payload rejected");
                cycle.errors.push(e);
                return cycle;
            }
        };

        match &outcome.follow_up {
            CompletedFollowUp::NotNeeded => {}
            CompletedFollowUp::Unsupported { plan_name } => {
                cycle.errors.push(SyncError::UnsupportedPlan {
                    plan_name: plan_name.clone(),
                });
            }
            CompletedFollowUp::Requested(request) => {
                match fetcher
                    .fetch_completed(request)
                    .map_err(SyncError::from)
                    .and_then(|c| self.apply_completed(c, request.generation, now))
                {
                    Ok(report) => cycle.completed = Some(report),
                    Err(e) => {
                        warn!(error = %e, "completed task augmentation skipped");
                        cycle.errors.push(e);
                    }
                }
                // Primary data is shown even when augmentation fails
                self.finish_cycle();
            }
        }
        cycle.sync = Some(outcome);
        cycle
    }

    /// Mark the current cycle finished without waiting for a completed
    /// payload, so the view shows primary data
    pub fn finish_cycle(&mut self) {
        self.loaded = true;
    }

    /// Display copy of the tree: due window applied, then sorted
    pub fn snapshot(&self, now: DateTime<Utc>) -> TaskTree {
        let mut snapshot = self.tree.clone();
        let today = day_in(now, &self.tz);
        retain_within_due_window(&mut snapshot, &self.settings.display, today, &self.tz);
        sort_tree(&mut snapshot, self.settings.display.sort);
        snapshot
    }

    pub fn projection(&self, now: DateTime<Utc>) -> Projection {
        project_view(&self.snapshot(now), &self.settings.display, now, &self.tz)
    }

    /// Rows for the render surface, or `Loading` before the first cycle
    pub fn view(&self, now: DateTime<Utc>) -> ViewState {
        if !self.loaded {
            return ViewState::Loading;
        }
        let snapshot = self.snapshot(now);
        let projection = project_view(&snapshot, &self.settings.display, now, &self.tz);
        ViewState::Ready(render_rows(
            &projection,
            &snapshot,
            &self.settings.display,
            now,
            &self.tz,
        ))
    }

    fn check_credential(&self, token: Option<&str>) -> Result<(), SyncError> {
        if token == Some(self.settings.sync.access_token.as_str()) {
            Ok(())
        } else {
            debug!("ignoring payload fetched with another access token");
            Err(SyncError::AccessMismatch)
        }
    }

    /// Entry policy plus date normalization. Tasks with unreadable dates
    /// are skipped.
    fn admit(&self, items: Vec<WireTask>) -> Vec<Task> {
        filter_items(items, &self.settings.filter, self.settings.display.display_subtasks)
            .into_iter()
            .filter_map(|wire| {
                let id = wire.id;
                match normalize_task_in(wire, &self.tz) {
                    Ok(task) => Some(task),
                    Err(e) => {
                        warn!(task = %id, error = %e, "skipping task with unreadable date");
                        None
                    }
                }
            })
            .collect()
    }

    fn prune(&mut self, now: DateTime<Utc>) -> Vec<TaskId> {
        let today = day_in(now, &self.tz);
        filter_completed_by_age(
            &mut self.tree,
            self.settings.display.max_completed_age_days,
            today,
            &self.tz,
        )
    }

    /// Lower bound of a completed-tasks fetch. Retention windows reaching
    /// past the epoch are clamped to it.
    fn completed_since(&self, now: DateTime<Utc>) -> String {
        let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
        let day = Duration::try_days(self.settings.display.max_completed_age_days)
            .and_then(|span| day_in(now, &self.tz).checked_sub_signed(span))
            .map_or(epoch, |day| day.max(epoch));
        day.format("%Y-%m-%dT00:00:00.000000Z").to_string()
    }
}
