//! Full loop over file-backed stores, laid out the way a real
//! deployment directory looks.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use adapt_core::stubs::RecordingTrainer;
use adapt_core::CommandInbox;
use adapt_core::{
    AdaptationManager, Analyzer, AuditEventKind, AuditStatus, Executor, Histogram, ModelId,
    Monitor, MonitorConfig, NullEnergyMeter, Planner, PredictionRecord, RSquared,
    TargetValueSignal, Thresholds, VersionId, VersionSelector,
};
use adapt_store::{
    DirVersionRepository, FileActiveModel, FileInbox, JsonKnowledgeStore, JsonlAuditLog,
    JsonlPredictionLog,
};

fn thresholds() -> Thresholds {
    Thresholds {
        min_score: 0.7,
        max_energy: 0.6,
        e_min: 0.0,
        e_max: 1000.0,
        alpha: 0.0,
        beta: 0.5,
        gamma: 0.8,
        drift_ceiling: 0.75,
        energy_discount: 0.4,
        recovery_cooldown: 3,
    }
}

fn append_row(path: &Path, true_value: f64, predicted_value: f64, energy_uj: f64) {
    let row = PredictionRecord {
        true_value,
        predicted_value,
        model_used: ModelId::new("lstm"),
        inference_time_ms: 1.0,
        energy_uj,
        histogram: None,
    };
    let mut raw = fs::read_to_string(path).unwrap_or_default();
    raw.push_str(&serde_json::to_string(&row).unwrap());
    raw.push('\n');
    fs::write(path, raw).unwrap();
}

fn manager_over(dir: &Path) -> AdaptationManager {
    let t = thresholds();
    let config = MonitorConfig {
        drift_window: 4,
        fallback_window: 3,
        histogram_bins: 4,
        target_range: (0.0, 1.0),
    };
    let log = Arc::new(JsonlPredictionLog::new(dir.join("predictions.jsonl")));
    let active = Arc::new(FileActiveModel::new(dir.join("active_model")));
    let repo = Arc::new(DirVersionRepository::new(
        dir.join("versions"),
        dir.join("active"),
    ));
    let monitor = Monitor::new(
        log.clone(),
        active.clone(),
        Box::new(RSquared),
        Box::new(TargetValueSignal::from_config(&config)),
        t.clone(),
        config,
    )
    .expect("monitor construction failed");
    let executor = Executor::new(
        active.clone(),
        repo.clone(),
        Arc::new(RecordingTrainer::new()),
        Arc::new(JsonlAuditLog::new(dir.join("events.jsonl"))),
        Arc::new(NullEnergyMeter),
        log,
    );
    AdaptationManager::new(
        t.clone(),
        vec![ModelId::new("lstm"), ModelId::new("svm")],
        monitor,
        Analyzer::new(t.clone()),
        Planner::with_rng(t.clone(), StdRng::seed_from_u64(21)),
        executor,
        VersionSelector::new(repo, t.drift_ceiling),
        Arc::new(JsonKnowledgeStore::new(dir.join("knowledge.json"))),
        active,
        Some(Arc::new(FileInbox::new(dir.join("command")))),
    )
    .expect("manager construction failed")
}

#[test]
fn test_score_violation_over_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("active_model"), "lstm").unwrap();
    let predictions = dir.path().join("predictions.jsonl");
    for i in 0..4 {
        let v = i as f64 / 10.0;
        append_row(&predictions, v, 1.0 - v, 200.0);
    }

    let mut manager = manager_over(dir.path());
    let event = manager
        .run_adaptation_cycle()
        .unwrap()
        .expect("switch expected");
    assert_eq!(event.kind, AuditEventKind::Switch);
    assert_eq!(event.status, AuditStatus::Confirmed);

    // The pointer file, knowledge file and audit log all reflect it.
    assert_eq!(
        fs::read_to_string(dir.path().join("active_model")).unwrap(),
        "svm"
    );
    let knowledge = fs::read_to_string(dir.path().join("knowledge.json")).unwrap();
    assert!(knowledge.contains("\"model_switches\": 1"));
    let events = fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
    assert_eq!(events.lines().count(), 1);
    println!("[PASS] test_score_violation_over_files");
}

#[test]
fn test_drift_command_rolls_back_to_version_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("active_model"), "lstm").unwrap();
    let predictions = dir.path().join("predictions.jsonl");
    // Live data sits near 0.9.
    for _ in 0..4 {
        append_row(&predictions, 0.9, 0.9, 100.0);
    }

    // Two stored svm versions; v2's training distribution matches the
    // live data.
    let versions = dir.path().join("versions");
    fs::create_dir_all(&versions).unwrap();
    let stale = Histogram::from_values(&[0.1, 0.1, 0.12], 4, (0.0, 1.0)).unwrap();
    let matching = Histogram::from_values(&[0.9, 0.88, 0.92], 4, (0.0, 1.0)).unwrap();
    for (id, fp) in [
        (VersionId::new("svm", 1), &stale),
        (VersionId::new("svm", 2), &matching),
    ] {
        fs::write(versions.join(format!("{id}.model")), b"weights").unwrap();
        fs::write(
            versions.join(format!("{id}_fingerprint.json")),
            serde_json::to_string(fp).unwrap(),
        )
        .unwrap();
    }

    fs::write(dir.path().join("command"), "handle_data_drift").unwrap();
    let mut manager = manager_over(dir.path());
    let inbox = FileInbox::new(dir.path().join("command"));
    let raw = inbox.consume().unwrap().expect("command pending");
    let event = manager
        .handle_command(&raw)
        .unwrap()
        .expect("rollback expected");

    assert_eq!(event.kind, AuditEventKind::Vmr);
    assert_eq!(event.status, AuditStatus::Confirmed);
    assert_eq!(event.version, Some(VersionId::new("svm", 2)));
    // The artifact landed in the active slot and the pointer moved.
    assert!(dir.path().join("active/svm.model").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("active_model")).unwrap(),
        "svm"
    );
    println!("[PASS] test_drift_command_rolls_back_to_version_on_disk");
}
