use porter_core::{
    can_transition, default_progress, is_terminal, should_show_progress, strategy, JobStatus,
    StatusCategory,
};

#[test]
fn every_status_resolves_to_its_own_strategy() {
    for status in JobStatus::ALL {
        let entry = strategy(status);
        assert_eq!(entry.status, status);
        assert!(!entry.label.is_empty());
        assert!(!entry.color.is_empty());
        assert!(!entry.icon.is_empty());
    }
}

#[test]
fn wire_names_round_trip() {
    for status in JobStatus::ALL {
        let parsed: JobStatus = status.as_str().parse().unwrap();
        assert_eq!(parsed, status);
    }
}

#[test]
fn unknown_status_is_rejected_at_parse_time() {
    let err = "paused".parse::<JobStatus>().unwrap_err();
    assert_eq!(err.0, "paused");
    assert!("Pending".parse::<JobStatus>().is_err()); // wire names are lowercase
}

#[test]
fn categories_partition_the_pipeline() {
    assert_eq!(strategy(JobStatus::Pending).category, StatusCategory::Pending);
    for status in [JobStatus::Validating, JobStatus::Scraping, JobStatus::Converting] {
        assert_eq!(strategy(status).category, StatusCategory::Processing);
    }
    assert_eq!(
        strategy(JobStatus::Completed).category,
        StatusCategory::Completed
    );
    // Cancelled rides the error tab rather than getting its own.
    assert_eq!(strategy(JobStatus::Error).category, StatusCategory::Error);
    assert_eq!(strategy(JobStatus::Cancelled).category, StatusCategory::Error);
}

#[test]
fn terminal_statuses_take_no_further_updates() {
    for status in [JobStatus::Completed, JobStatus::Error, JobStatus::Cancelled] {
        assert!(is_terminal(status), "{status} should be terminal");
        assert!(!strategy(status).behavior.is_active);
        assert!(!strategy(status).behavior.can_cancel);
    }
    for status in [
        JobStatus::Pending,
        JobStatus::Validating,
        JobStatus::Scraping,
        JobStatus::Converting,
    ] {
        assert!(!is_terminal(status), "{status} should be active");
        assert!(strategy(status).behavior.is_active);
        assert!(strategy(status).behavior.can_cancel);
    }
}

#[test]
fn completed_is_a_dead_end_with_download() {
    let entry = strategy(JobStatus::Completed);
    assert!(entry.transitions.is_empty());
    assert!(entry.behavior.can_download);
    assert!(entry.behavior.can_delete);
    assert!(!entry.behavior.can_retry);
}

#[test]
fn failed_and_cancelled_re_enter_via_retry() {
    for status in [JobStatus::Error, JobStatus::Cancelled] {
        let entry = strategy(status);
        assert!(entry.behavior.can_retry, "{status} should allow retry");
        assert!(can_transition(status, JobStatus::Pending));
        assert!(can_transition(status, JobStatus::Validating));
        assert!(!can_transition(status, JobStatus::Completed));
    }
}

#[test]
fn transition_table_gates_forward_moves() {
    assert!(can_transition(JobStatus::Pending, JobStatus::Scraping));
    assert!(can_transition(JobStatus::Scraping, JobStatus::Converting));
    assert!(can_transition(JobStatus::Converting, JobStatus::Completed));

    // No going backwards mid-pipeline and no self loops.
    assert!(!can_transition(JobStatus::Scraping, JobStatus::Pending));
    assert!(!can_transition(JobStatus::Converting, JobStatus::Scraping));
    for status in JobStatus::ALL {
        assert!(!can_transition(status, status));
    }
}

#[test]
fn progress_defaults_follow_the_pipeline() {
    assert_eq!(default_progress(JobStatus::Pending), 0);
    assert_eq!(default_progress(JobStatus::Validating), 15);
    assert_eq!(default_progress(JobStatus::Scraping), 75);
    assert_eq!(default_progress(JobStatus::Converting), 90);
    assert_eq!(default_progress(JobStatus::Completed), 100);

    assert!(!should_show_progress(JobStatus::Pending));
    assert!(should_show_progress(JobStatus::Validating));
    assert!(should_show_progress(JobStatus::Scraping));
    assert!(should_show_progress(JobStatus::Converting));
    assert!(!should_show_progress(JobStatus::Completed));
}

#[test]
fn status_sort_priorities_are_distinct() {
    let mut priorities: Vec<u8> = JobStatus::ALL
        .iter()
        .map(|status| strategy(*status).behavior.priority)
        .collect();
    priorities.sort_unstable();
    priorities.dedup();
    assert_eq!(priorities.len(), JobStatus::ALL.len());
}

#[test]
fn error_label_reads_failed() {
    assert_eq!(strategy(JobStatus::Error).label, "Failed");
    assert_eq!(strategy(JobStatus::Error).color, "rose");
}
