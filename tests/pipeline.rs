use hrcorr::config::AppConfig;
use hrcorr::data::{discover_subjects, preprocess_subject};
use hrcorr::services::CorrelationRunner;
use hrcorr::types::Axis;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

fn workspace(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hrcorr_{}_{}", name, std::process::id()));
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Subject with `seconds` of data; the HR recording starts `hr_delay` seconds after ACC.
fn write_subject(root: &Path, id: usize, seconds: usize, hr_delay: usize) {
    let number = format!("{:03}", id);
    let dir = root.join(&number);
    fs::create_dir_all(&dir).unwrap();

    let mut acc = String::from("datetime,acc_x,acc_y,acc_z\n");
    for i in 0..seconds * 32 {
        let phase = (i / 32) as f32 * 0.4;
        let x = (phase.sin() * 60.0) as i32;
        let y = (phase.cos() * 40.0) as i32;
        let z = ((i % 7) as i32) - 3;
        writeln!(acc, "2023-05-01 10:00:{:02},{},{},{}", (i / 32) % 60, x, y, z).unwrap();
    }
    fs::write(dir.join(format!("ACC_{}.csv", number)), acc).unwrap();

    let mut hr = String::from("datetime,hr\n");
    for i in 0..seconds - hr_delay {
        let phase = (i + hr_delay) as f32 * 0.4;
        let bpm = 90.0 + phase.sin() * 25.0;
        writeln!(hr, "2023-05-01 10:00:{:02},{}", (i + hr_delay) % 60, bpm as i32).unwrap();
    }
    fs::write(dir.join(format!("HR_{}.csv", number)), hr).unwrap();
}

fn small_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.preprocessing.resource_dir = root.join("resources");
    config.preprocessing.subject_count = 3;
    config.output.out_dir = root.join("out");
    config.search.population_size = 10;
    config.search.generations = 4;
    config.search.seed = Some(17);
    config
}

#[test]
fn test_preprocess_synchronizes_streams() {
    let root = workspace("preprocess");
    let resources = root.join("resources");
    write_subject(&resources, 1, 40, 3);

    let config = small_config(&root);
    let subjects = discover_subjects(&resources, 3).unwrap();
    assert_eq!(subjects.len(), 1);

    let signals = preprocess_subject(&subjects[0], &config.preprocessing).unwrap();
    fs::remove_dir_all(&root).ok();

    // 37 overlapping seconds, padded to the next power of two
    assert_eq!(signals.hr.len(), 64);
    assert!(signals.acc.iter().all(|axis| axis.len() == 64));
    assert!(signals.hr.iter().all(|v| *v > 0.0 && *v < 1.0));
}

#[test]
fn test_runner_processes_every_axis() {
    let root = workspace("runner");
    let resources = root.join("resources");
    write_subject(&resources, 1, 40, 0);
    write_subject(&resources, 3, 30, 2);

    let runner = CorrelationRunner::new(small_config(&root)).unwrap();
    let report = runner.run_all().unwrap();

    assert_eq!(report.subjects_found, 2);
    assert!(report.subjects_failed.is_empty());
    assert_eq!(report.results.len(), 6);
    assert_eq!(report.results[0].axis, Axis::X);
    assert_eq!(report.results[5].subject_id, 3);

    for result in report.found() {
        assert_eq!(result.tree.len(), 30);
        let plot = result.plot_path.as_ref().unwrap();
        assert!(fs::read_to_string(plot).unwrap().contains("Correlation formula"));
    }
    assert!(root.join("out").join("report.json").is_file());
    assert_eq!(runner.context().live_buffers().unwrap(), 0);

    fs::remove_dir_all(&root).ok();
}
