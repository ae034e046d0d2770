use std::io::{self, Write};
use std::thread;
use std::time::Duration as StdDuration;

use anyhow::anyhow;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, instrument};

use crate::catalog::Catalog;
use crate::cli::Command;
use crate::clock::{ReferenceClock, parse_instant};
use crate::config::Config;
use crate::countdown::countdowns;
use crate::datastore::CompletionStore;
use crate::occurrence::active_occurrence;
use crate::render::Renderer;
use crate::window::Window;

const TIMELINE_TICK: StdDuration = StdDuration::from_secs(60);
const COUNTDOWN_TICK: StdDuration = StdDuration::from_secs(1);

/// Everything a command needs, loaded once per invocation.
#[derive(Debug)]
pub struct Session {
    pub cfg: Config,
    pub clock: ReferenceClock,
    pub catalog: Catalog,
    pub store: CompletionStore,
    pub renderer: Renderer,
}

impl Session {
    /// The timeline window around `now`, from the configured day counts.
    pub fn window(&self, now: DateTime<FixedOffset>) -> anyhow::Result<Window> {
        Window::around(
            &self.clock,
            now,
            self.cfg.timeline.days_back,
            self.cfg.timeline.days_ahead,
        )
        .map_err(Into::into)
    }
}

#[instrument(skip(session))]
pub fn dispatch(session: &mut Session, command: Command) -> anyhow::Result<()> {
    debug!(?command, events = session.catalog.events.len(), "dispatching command");

    match command {
        Command::Timeline { watch } => {
            report_issues(session)?;
            if watch {
                watch_loop(TIMELINE_TICK, || cmd_timeline(session))
            } else {
                cmd_timeline(session)
            }
        }
        Command::Next { watch } => {
            report_issues(session)?;
            if watch {
                watch_loop(COUNTDOWN_TICK, || cmd_next(session))
            } else {
                cmd_next(session)
            }
        }
        Command::Segments { event_id } => cmd_segments(session, &event_id),
        Command::Done { event_id, at } => cmd_done(session, &event_id, &at),
        Command::Check => cmd_check(session),
    }
}

fn cmd_timeline(session: &Session) -> anyhow::Result<()> {
    let now = session.clock.now();
    let window = session.window(now)?;
    session
        .renderer
        .print_timeline(&session.catalog, &session.store, &window, now)
}

fn cmd_next(session: &Session) -> anyhow::Result<()> {
    let now = session.clock.now();
    let rows = countdowns(&session.catalog.events, now);
    session.renderer.print_countdowns(&rows, &session.store, now)
}

fn cmd_segments(session: &Session, event_id: &str) -> anyhow::Result<()> {
    let event = session
        .catalog
        .find(event_id)
        .ok_or_else(|| anyhow!("unknown event: {event_id}"))?;
    let now = session.clock.now();
    let window = session.window(now)?;
    let segments = event.occurrences(&window);

    let mut out = io::stdout().lock();
    writeln!(out, "{} ({}) {}", event.name, event.id, event.rule)?;
    session
        .renderer
        .write_segments(&mut out, event, &segments, &session.store)
}

#[instrument(skip(session))]
fn cmd_done(session: &mut Session, event_id: &str, at: &str) -> anyhow::Result<()> {
    let event = session
        .catalog
        .find(event_id)
        .ok_or_else(|| anyhow!("unknown event: {event_id}"))?;
    let instant = parse_instant(at, &session.clock, session.clock.now())?;

    let occ = active_occurrence(&event.rule, instant).ok_or_else(|| {
        anyhow!(
            "{} has no occurrence running at {}",
            event.id,
            instant.format("%Y-%m-%d %H:%M %:z")
        )
    })?;
    let key = occ.key(&event.id);
    let name = event.name.clone();

    let done = session.store.toggle(&key)?;
    info!(key = %key, done, "toggled completion flag");
    println!(
        "{} {} ({} - {})",
        if done { "done:" } else { "cleared:" },
        name,
        occ.unclipped_start.format("%m/%d %a %H:%M"),
        occ.unclipped_end.format("%m/%d %a %H:%M")
    );
    Ok(())
}

fn cmd_check(session: &Session) -> anyhow::Result<()> {
    for event in &session.catalog.events {
        println!("ok      {:<16} {}", event.id, event.rule);
    }
    session.renderer.write_issues(io::stdout().lock(), &session.catalog)?;

    let rejected = session.catalog.issues.len();
    if rejected > 0 {
        return Err(anyhow!("{rejected} catalog entries rejected"));
    }
    Ok(())
}

fn report_issues(session: &Session) -> anyhow::Result<()> {
    if session.catalog.issues.is_empty() {
        return Ok(());
    }
    session.renderer.write_issues(io::stderr().lock(), &session.catalog)
}

/// Re-runs `draw` on a fixed tick until the process is interrupted. Each
/// draw is synchronous and finishes before the next tick is scheduled.
fn watch_loop<F>(tick: StdDuration, mut draw: F) -> anyhow::Result<()>
where
    F: FnMut() -> anyhow::Result<()>,
{
    loop {
        print!("\x1b[2J\x1b[H");
        draw()?;
        io::stdout().flush()?;
        thread::sleep(tick);
    }
}
