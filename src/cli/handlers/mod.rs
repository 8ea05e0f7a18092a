mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, DEFAULT_CONFIG_FILE};
use crate::io::payload_io::{self, FileFetcher};
use crate::io::watcher::PayloadWatcher;
use crate::model::config::{Role, Settings};
use crate::model::view::ViewState;
use crate::sync::broadcast::{BroadcastHub, PublishingFetcher};
use crate::sync::engine::{CycleReport, SyncEngine, SyncError};
use crate::sync::scheduler::{Scheduler, SchedulerState};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let config = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    match cli.command {
        Commands::Init(args) => cmd_init(args, &config),
        Commands::Render(args) => cmd_render(args, &config, json),
        Commands::Watch(args) => cmd_watch(args, &config, json),
        Commands::Fanout(args) => cmd_fanout(args, &config, json),
        Commands::Projects(args) => cmd_projects(args, json),
        Commands::Check => cmd_check(&config, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load settings for a config that fetches for itself
fn load_fetching_settings(config: &Path) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = config_io::load_settings(config)?;
    if settings.role == Role::Receive {
        return Err(format!(
            "{} has role \"receive\" and never fetches; render it through `tdv fanout --view`",
            config.display()
        )
        .into());
    }
    Ok(settings)
}

/// A cycle whose primary payload never applied is a failure for one-shot
/// commands; anything else (plan limits, completed fetch) is a warning.
fn primary_failure(cycle: &mut CycleReport) -> Option<SyncError> {
    if cycle.sync.is_some() || cycle.errors.is_empty() {
        return None;
    }
    Some(cycle.errors.remove(0))
}

fn print_view(state: &ViewState, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&view_to_json(state))?);
    } else {
        print!("{}", format_view(state));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_render(args: RenderArgs, config: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_fetching_settings(config)?;
    let now = args.at.unwrap_or_else(Utc::now);
    let mut fetcher = FileFetcher::new(args.payload, args.completed, &settings.sync.access_token);
    let mut engine = SyncEngine::new(settings);

    let mut cycle = engine.poll_once(&mut fetcher, now);
    if let Some(err) = primary_failure(&mut cycle) {
        return Err(err.into());
    }

    if args.save_token
        && let Some(token) = engine.sync_token()
    {
        config_io::save_sync_token(config, token)?;
        info!(config = %config.display(), "saved sync token");
    }

    print_view(&engine.view(now), json)
}

fn cmd_watch(args: WatchArgs, config: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_fetching_settings(config)?;
    let token = settings.sync.access_token.clone();
    let interval = settings.sync.update_interval;
    let mut engine = SyncEngine::new(settings);

    let watcher = PayloadWatcher::start(&args.dir)?;
    let mut scheduler = Scheduler::new(interval, SchedulerState::default(), Instant::now());
    info!(dir = %args.dir.display(), interval_secs = interval.as_secs(), "watching payload directory");

    let mut cycles = 0;
    let mut changed = false;
    loop {
        if scheduler.poll(Instant::now()) || changed {
            // completed.json may appear after startup
            let mut fetcher = FileFetcher::in_dir(&args.dir, &token);
            let now = Utc::now();
            let cycle = engine.poll_once(&mut fetcher, now);
            if cycle.sync.is_none() {
                for err in &cycle.errors {
                    warn!(error = %err, "cycle failed, keeping last board");
                }
            }
            print_view(&engine.view(now), json)?;
            if !json {
                println!();
            }

            cycles += 1;
            if args.cycles.is_some_and(|max| cycles >= max) {
                return Ok(());
            }
        }
        let wait = scheduler
            .time_until_next(Instant::now())
            .unwrap_or(interval);
        changed = !watcher.wait(wait).is_empty();
    }
}

fn cmd_fanout(args: FanoutArgs, config: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config_io::load_settings(config)?;
    if settings.role != Role::Broadcast {
        return Err(format!(
            "{} must have [broadcast] role = \"broadcast\" to fan out",
            config.display()
        )
        .into());
    }
    let now = args.at.unwrap_or_else(Utc::now);

    let mut hub = BroadcastHub::new();
    let mut receivers = Vec::new();
    for view in &args.views {
        let view_settings = config_io::load_settings(view)?;
        if view_settings.role != Role::Receive {
            return Err(format!(
                "{} must have [broadcast] role = \"receive\"",
                view.display()
            )
            .into());
        }
        receivers.push((view, SyncEngine::new(view_settings), hub.subscribe()));
    }

    let mut fetcher = FileFetcher::new(args.payload, args.completed, &settings.sync.access_token);
    let mut engine = SyncEngine::new(settings);
    let mut cycle = engine.poll_once(&mut PublishingFetcher::new(&mut fetcher, &mut hub), now);
    if let Some(err) = primary_failure(&mut cycle) {
        return Err(err.into());
    }

    let mut outputs = Vec::new();
    for (path, mut view_engine, mut receiver) in receivers {
        let report = receiver.apply_pending(&mut view_engine, now);
        for err in &report.errors {
            warn!(config = %path.display(), error = %err, "receiver skipped a payload");
        }
        outputs.push((path.display().to_string(), view_engine.view(now)));
    }

    if json {
        let named: Vec<NamedViewJson> = outputs
            .iter()
            .map(|(config, state)| NamedViewJson {
                config: config.clone(),
                view: view_to_json(state),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&named)?);
    } else {
        for (i, (config, state)) in outputs.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("== {} ==", config);
            print!("{}", format_view(state));
        }
    }
    Ok(())
}

fn cmd_projects(args: ProjectsArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let payload = payload_io::read_sync_payload(&args.payload)?;
    if json {
        let projects: Vec<ProjectJson> = payload.projects.iter().map(project_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&projects)?);
    } else {
        for project in &payload.projects {
            println!("{} -- {}", project.name, project.id);
        }
    }
    Ok(())
}

fn cmd_check(config: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config_io::load_settings(config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&check_to_json(&settings))?);
    } else {
        print!("{}", format_check(&settings));
        println!("ok: {}", config.display());
    }
    Ok(())
}
