use std::collections::BTreeMap;

use crate::coordinator::DashboardState;
use crate::job::{Job, JobId};
use crate::sort::SortKey;
use crate::status::StatusCategory;
use crate::strategy::strategy;

/// Per-tab job totals, always computed over the full set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TabCounts {
    pub all: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

/// Render-ready projection of the consolidated state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardViewModel {
    /// Jobs surviving the filter and search, in current sort order.
    pub rows: Vec<Job>,
    pub counts: TabCounts,
    pub selected_count: usize,
    pub state: DashboardState,
}

/// Projects state and jobs into the view model. Pure and repeatable.
pub fn view(state: &DashboardState, jobs: &BTreeMap<JobId, Job>) -> DashboardViewModel {
    let mut counts = TabCounts {
        all: jobs.len(),
        ..TabCounts::default()
    };
    for job in jobs.values() {
        match strategy(job.status).category {
            StatusCategory::Pending => counts.pending += 1,
            StatusCategory::Processing => counts.processing += 1,
            StatusCategory::Completed => counts.completed += 1,
            StatusCategory::Error => counts.error += 1,
        }
    }

    let needle = state.search.to_lowercase();
    let mut rows: Vec<Job> = jobs
        .values()
        .filter(|job| match state.filter.category() {
            None => true,
            Some(category) => strategy(job.status).category == category,
        })
        .filter(|job| {
            needle.is_empty()
                || job.url.to_lowercase().contains(&needle)
                || job.id.as_str().to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();
    sort_rows(&mut rows, state.sort);

    DashboardViewModel {
        rows,
        counts,
        selected_count: state.selected.len(),
        state: state.clone(),
    }
}

fn sort_rows(rows: &mut [Job], sort: SortKey) {
    match sort {
        SortKey::NewestFirst => rows.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortKey::OldestFirst => rows.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortKey::Status => rows.sort_by(|a, b| {
            strategy(a.status)
                .behavior
                .priority
                .cmp(&strategy(b.status).behavior.priority)
                .then_with(|| b.created_at_ms.cmp(&a.created_at_ms))
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortKey::Url => rows.sort_by(|a, b| a.url.cmp(&b.url).then_with(|| a.id.cmp(&b.id))),
    }
}
