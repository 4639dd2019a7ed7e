use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, TimeZone};
use tracing::{debug, info, instrument};

use crate::calendar::MonthCursor;
use crate::cli::{AddArgs, CalendarArgs, Command, EditArgs};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::controller::Controller;
use crate::countdown::CountdownScheduler;
use crate::datetime::parse_date_key;
use crate::filter::FilterKey;
use crate::render::Renderer;
use crate::storage::KeyValueStore;
use crate::store::TaskStore;
use crate::task::{Priority, TaskDraft, TaskId, TaskPatch};

#[instrument(skip(store, cfg, renderer, command, zone))]
pub fn dispatch<K, Z>(
    store: TaskStore<K>,
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
    zone: Z,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone + Send + Sync + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut controller = Controller::new(store, zone.clone(), Arc::clone(&clock))
        .with_filter(cfg.default_filter_key())
        .with_indicator_limit(cfg.indicator_limit);

    let mut out = io::stdout().lock();
    match command {
        Command::Add(args) => cmd_add(&mut controller, &mut out, args),
        Command::Edit(args) => cmd_edit(&mut controller, &mut out, args),
        Command::Toggle { id } => cmd_toggle(&mut controller, &mut out, &id),
        Command::Delete { id, yes } => cmd_delete(&mut controller, &mut out, &id, yes),
        Command::List { filter } => cmd_list(&mut controller, renderer, &mut out, filter),
        Command::Calendar(args) => cmd_calendar(&mut controller, renderer, &mut out, args),
        Command::Stats => renderer.write_stats(&mut out, &controller.views().stats),
        Command::Watch { filter, seconds } => {
            drop(out);
            cmd_watch(&mut controller, cfg, renderer, zone, clock, filter, seconds)
        }
        Command::Clear { yes } => cmd_clear(&mut controller, &mut out, yes),
    }
}

fn parse_priority(raw: Option<&str>) -> anyhow::Result<Option<Priority>> {
    raw.map(str::parse::<Priority>)
        .transpose()
        .map_err(anyhow::Error::from)
}

fn parse_due(raw: Option<&str>) -> anyhow::Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Ok(Some(parse_date_key(value)?)),
    }
}

#[instrument(skip(controller, out, args))]
fn cmd_add<K, Z, W>(
    controller: &mut Controller<K, Z>,
    out: &mut W,
    args: AddArgs,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone,
    W: Write,
{
    info!("command add");

    let mut draft = TaskDraft::new(args.title);
    if let Some(description) = args.description {
        draft = draft.with_description(description);
    }
    if let Some(priority) = parse_priority(args.priority.as_deref())? {
        draft = draft.with_priority(priority);
    }
    if let Some(due) = parse_due(args.due.as_deref())? {
        draft = draft.with_due_date(due);
    }

    let task = controller.add(draft)?;
    writeln!(out, "Created task {}.", task.id)?;
    Ok(())
}

#[instrument(skip(controller, out, args))]
fn cmd_edit<K, Z, W>(
    controller: &mut Controller<K, Z>,
    out: &mut W,
    args: EditArgs,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone,
    W: Write,
{
    info!("command edit");

    let description = if args.no_description {
        Some(None)
    } else {
        args.description.map(Some)
    };
    let due_date = if args.no_due {
        Some(None)
    } else {
        args.due.as_deref().map(|raw| parse_due(Some(raw))).transpose()?
    };
    let patch = TaskPatch {
        title: args.title,
        description,
        priority: parse_priority(args.priority.as_deref())?,
        due_date,
    };

    if patch.is_empty() {
        return Err(anyhow!(
            "nothing to change; pass --title, --description, --priority or --due"
        ));
    }

    let id = TaskId::new(args.id);
    controller.edit(&id, patch)?;
    writeln!(out, "Modified task {id}.")?;
    Ok(())
}

#[instrument(skip(controller, out))]
fn cmd_toggle<K, Z, W>(controller: &mut Controller<K, Z>, out: &mut W, id: &str) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone,
    W: Write,
{
    let id = TaskId::new(id);
    let completed = controller.toggle(&id)?;
    let state = if completed { "completed" } else { "active" };
    writeln!(out, "Task {id} is now {state}.")?;
    Ok(())
}

#[instrument(skip(controller, out))]
fn cmd_delete<K, Z, W>(
    controller: &mut Controller<K, Z>,
    out: &mut W,
    id: &str,
    yes: bool,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone,
    W: Write,
{
    let id = TaskId::new(id);
    let Some(task) = controller.store().get(&id) else {
        return Err(anyhow!("task not found: {id}"));
    };
    if !yes {
        writeln!(out, "Delete \"{}\"? Re-run with --yes to confirm.", task.title)?;
        return Ok(());
    }

    let removed = controller.remove(&id)?;
    writeln!(out, "Deleted task {} \"{}\".", removed.id, removed.title)?;
    Ok(())
}

#[instrument(skip(controller, renderer, out))]
fn cmd_list<K, Z, W>(
    controller: &mut Controller<K, Z>,
    renderer: &Renderer,
    out: &mut W,
    filter: Option<String>,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone,
    W: Write,
{
    if let Some(raw) = filter.as_deref() {
        controller.set_filter(FilterKey::parse_lenient(raw));
    }
    let now = controller.now();
    renderer.write_task_list(out, &controller.views().visible, controller.filter_key(), &now)
}

#[instrument(skip(controller, renderer, out, args))]
fn cmd_calendar<K, Z, W>(
    controller: &mut Controller<K, Z>,
    renderer: &Renderer,
    out: &mut W,
    args: CalendarArgs,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone,
    W: Write,
{
    if let Some(raw) = args.month.as_deref() {
        let month = raw.parse::<MonthCursor>()?;
        controller.show_month(month);
    }
    if let Some(raw) = args.select.as_deref() {
        let date = parse_date_key(raw.trim())?;
        controller.select_date(date);
    }
    if let Some(delta) = args.shift {
        let month = controller.calendar().month.shift(delta);
        controller.show_month(month);
    }
    debug!(month = %controller.calendar().month, "calendar view");

    let views = controller.views();
    renderer.write_calendar(
        out,
        controller.calendar().month,
        &views.grid,
        controller.indicator_limit(),
    )?;
    if let Some(date) = controller.calendar().selected {
        writeln!(out)?;
        renderer.write_day_detail(out, date, &views.selected_tasks)?;
    }
    Ok(())
}

#[instrument(skip(controller, cfg, renderer, zone, clock))]
fn cmd_watch<K, Z>(
    controller: &mut Controller<K, Z>,
    cfg: &Config,
    renderer: &Renderer,
    zone: Z,
    clock: Arc<dyn Clock>,
    filter: Option<String>,
    seconds: u64,
) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone + Send + Sync + 'static,
{
    if let Some(raw) = filter.as_deref() {
        controller.set_filter(FilterKey::parse_lenient(raw));
    }
    let tasks = controller.views().visible.clone();
    if tasks.is_empty() {
        println!("{}", controller.filter_key().empty_message());
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start countdown runtime")?;

    let scheduler =
        CountdownScheduler::new(runtime.handle().clone(), zone, clock).with_tick(cfg.tick());
    for task in &tasks {
        let renderer = renderer.clone();
        let shown = task.clone();
        scheduler.watch_task(task, move |countdown| {
            println!("{}", renderer.countdown_line(&shown, countdown.as_ref()));
        });
    }
    info!(watching = scheduler.active_count(), seconds, "watching countdowns");

    runtime.block_on(tokio::time::sleep(Duration::from_secs(seconds)));
    scheduler.cancel_all();
    Ok(())
}

#[instrument(skip(controller, out))]
fn cmd_clear<K, Z, W>(controller: &mut Controller<K, Z>, out: &mut W, yes: bool) -> anyhow::Result<()>
where
    K: KeyValueStore,
    Z: TimeZone,
    W: Write,
{
    let count = controller.tasks().len();
    if !yes {
        writeln!(out, "This deletes all {count} tasks. Re-run with --yes to confirm.")?;
        return Ok(());
    }
    controller.clear();
    writeln!(out, "Deleted {count} tasks.")?;
    Ok(())
}
