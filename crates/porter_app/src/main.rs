//! Headless dashboard shell: submits URLs given on the command line,
//! watches the board until every job settles, then prints the result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use porter_app::config::{self, AppConfig};
use porter_app::logging::{self, LogDestination};
use porter_app::{RonStateStore, Session};
use porter_client::JobServiceHandle;
use porter_core::{strategy, EventBus, PresetConfirm};
use porter_logging::{porter_error, porter_info, porter_warn};

const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

fn main() {
    logging::initialize(LogDestination::Both, config::log_level_from_env());
    let config = AppConfig::from_env();

    let service = match JobServiceHandle::connect(config.api.clone(), config.poll.clone()) {
        Ok(service) => service,
        Err(err) => {
            porter_error!("cannot reach the job API: {err}");
            std::process::exit(2);
        }
    };

    let bus = Arc::new(EventBus::new());
    let store = Arc::new(RonStateStore::open(&config.state_dir));
    let mut session = Session::new(
        bus,
        store,
        service,
        Arc::new(PresetConfirm(true)),
        SEARCH_DEBOUNCE,
    );
    session.restore(config.query.as_deref());

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.len() == 1 {
        session.submit(&urls[0]);
    } else if !urls.is_empty() {
        porter_info!("submitting {} urls", urls.len());
        session.submit_batch(urls);
    }

    watch(&mut session, config.poll.ceiling + config.poll.interval);
    print_board(&session);
    session.shutdown();
}

/// Pumps the session until every job settles or the deadline passes.
fn watch(session: &mut Session, deadline: Duration) {
    let started = Instant::now();
    loop {
        session.pump();
        let counts = session.view().counts;
        let settled = counts.completed + counts.error;
        if counts.all > 0 && settled == counts.all {
            porter_info!("board settled: {} job(s)", counts.all);
            return;
        }
        // An empty board has nothing to wait for once the first refresh
        // had time to land.
        if counts.all == 0 && started.elapsed() > Duration::from_secs(2) {
            return;
        }
        if started.elapsed() > deadline {
            porter_warn!("{} job(s) still active at exit", counts.all - settled);
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn print_board(session: &Session) {
    let view = session.view();
    println!(
        "{} job(s): {} pending, {} processing, {} completed, {} failed",
        view.counts.all,
        view.counts.pending,
        view.counts.processing,
        view.counts.completed,
        view.counts.error
    );
    for job in &view.rows {
        println!(
            "  {:<12} {:>3}%  {}  {}",
            strategy(job.status).label,
            job.progress,
            job.id,
            job.url
        );
    }
    let query = session.query_string();
    if !query.is_empty() {
        println!("view: ?{query}");
    }
}
