use std::{fs, num::NonZeroUsize, path::Path};

use interestingness_analysis::{
    analyses::{self, ActionFactorDivergenceAnalysis, AnalysisKind, ValueAnalysis},
    archive::ArchiveError,
    batch,
    config::{AnalysisConfiguration, AnalysisParams, ThresholdRule},
    engine::{Analysis as _, PersistentAnalysis as _},
    error::AnalysisError,
    pool::WorkerPool,
    record::{ActionFactor, InteractionRecord, Records},
};
use rand::{Rng as _, SeedableRng as _};
use rand_distr::{Distribution as _, Normal};
use rand_pcg::Pcg64Mcg;

const FACTORS: [&str; 3] = ["move", "camera", "attack"];

/// Random rollout with `episodes` episodes of 5..40 steps each.
fn rollout(seed: u64, episodes: usize) -> Records {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut records = vec![];
    for _ in 0..episodes {
        let len = rng.random_range(5..40);
        for t in 0..len {
            let value = noise.sample(&mut rng);
            let action_factors = FACTORS
                .iter()
                .map(|&name| ActionFactor {
                    name: name.to_owned(),
                    action: 0,
                    distributions: (0..4)
                        .map(|_| {
                            let p = rng.random_range(0.05..0.95);
                            vec![p, 1.0 - p]
                        })
                        .collect(),
                })
                .collect();
            records.push(InteractionRecord {
                observation: Some(format!("frames/{:06}.png", records.len())),
                action: vec![0.0],
                action_factors,
                values: vec![value, value + 0.1],
                new_episode: t == 0,
            });
        }
    }
    records.into()
}

fn config() -> AnalysisConfiguration {
    let params = AnalysisParams {
        num_workers: 4,
        value_thresholds: ThresholdRule::StdDev {
            high: Some(1.5),
            low: Some(1.5),
        },
        divergence_thresholds: ThresholdRule::Percentile {
            high: Some(90.0),
            low: None,
        },
        render_plots: false,
        ..Default::default()
    };
    AnalysisConfiguration::new(params).unwrap()
}

fn csv_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().collect::<Result<_, _>>().unwrap()
}

#[test]
fn test_value_analysis_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let records = rollout(1, 12);
    let mut analysis = ValueAnalysis::new(records.clone(), config(), "png");
    analysis.analyze(dir.path()).unwrap();

    let rows = csv_rows(&dir.path().join("value-time.csv"));
    assert_eq!(rows.len(), records.len());
    assert_eq!(&rows[0][0], "0");
    assert_eq!(&rows[rows.len() - 1][0], "11");

    let result = analysis.series().unwrap().clone();
    assert_eq!(result.episodes.count(), 12);
    for &t in &result.detection.outliers.above {
        assert_eq!(analysis.get_element_time(t).unwrap().name, "high-value");
    }
    for &t in &result.detection.outliers.below {
        assert_eq!(analysis.get_element_time(t).unwrap().name, "low-value");
    }

    let path = dir.path().join("value.ixa");
    analysis.save(&path).unwrap();
    assert!(analysis.base().has_records());

    let loaded = ValueAnalysis::load(&path).unwrap();
    assert!(!loaded.base().has_records());
    assert_eq!(loaded.series(), Some(&result));
    assert_eq!(loaded.base().config(), analysis.base().config());
    for t in [0, records.len() / 2, records.len() - 1] {
        assert_eq!(
            loaded.get_element_time(t).unwrap(),
            analysis.get_element_time(t).unwrap()
        );
    }
    assert!(matches!(
        loaded.get_element_time(records.len()),
        Err(AnalysisError::OutOfRange { .. })
    ));
}

#[test]
fn test_reanalysis_overwrites_reports() {
    let dir = tempfile::tempdir().unwrap();
    let mut analysis = ActionFactorDivergenceAnalysis::new(rollout(2, 6), config(), "png");
    analysis.analyze(dir.path()).unwrap();
    let first = fs::read_to_string(dir.path().join("action-factor-divergence-time.csv")).unwrap();
    analysis.analyze(dir.path()).unwrap();
    let second = fs::read_to_string(dir.path().join("action-factor-divergence-time.csv")).unwrap();
    assert_eq!(first, second);

    let header = second.lines().next().unwrap();
    assert_eq!(header, "Episode,Timestep,move,camera,attack,Mean");
}

#[test]
fn test_divergence_is_independent_of_worker_count() {
    let dir = tempfile::tempdir().unwrap();
    let records = rollout(3, 20);
    let run = |workers: usize| {
        let config = config().with_workers(NonZeroUsize::new(workers).unwrap());
        let mut analysis = ActionFactorDivergenceAnalysis::new(records.clone(), config, "png");
        analysis
            .analyze(&dir.path().join(workers.to_string()))
            .unwrap();
        analysis.divergences().unwrap().clone()
    };
    assert_eq!(run(1), run(8));
}

#[test]
fn test_archive_kind_is_checked() {
    let dir = tempfile::tempdir().unwrap();
    let mut analysis = ValueAnalysis::new(rollout(4, 2), config(), "png");
    analysis.analyze(dir.path()).unwrap();
    let path = dir.path().join("value.ixa");
    analysis.save(&path).unwrap();

    let err = ActionFactorDivergenceAnalysis::load(&path).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Archive(ArchiveError::KindMismatch { .. })
    ));
    assert_eq!(analyses::load_archive(&path).unwrap().name(), "value");

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();
    let err = ValueAnalysis::load(&path).unwrap_err();
    assert!(matches!(err, AnalysisError::Archive(ref e) if e.is_corrupt()));
}

#[test]
fn test_batch_run() {
    let dir = tempfile::tempdir().unwrap();
    let records = rollout(5, 8);
    let mut analyses = AnalysisKind::ALL
        .into_iter()
        .map(|kind| kind.build(records.clone(), config(), "png"))
        .collect::<Vec<_>>();
    let pool = WorkerPool::new(NonZeroUsize::new(2).unwrap());
    let outcomes = batch::run_batch(&mut analyses, dir.path(), &pool);

    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert!(dir.path().join("value/value-time.csv").exists());
    assert!(
        dir.path()
            .join("action-factor-divergence/action-factor-divergence-time.csv")
            .exists()
    );
    for analysis in &analyses {
        assert_eq!(analysis.series().unwrap().series.len(), records.len());
    }
}

#[test]
fn test_svg_reports_for_reference_episodes() {
    let dir = tempfile::tempdir().unwrap();
    let markers = [
        false, true, false, false, true, false, false, false, true, false, false, false,
    ];
    let template = rollout(11, 1);
    let records = markers
        .iter()
        .enumerate()
        .map(|(t, &new_episode)| InteractionRecord {
            new_episode,
            ..template[t % template.len()].clone()
        })
        .collect::<Vec<_>>();
    let params = AnalysisParams {
        num_workers: 2,
        episodes_per_figure: 3,
        figure_width: 600,
        figure_height: 300,
        episode_panel_width: 120,
        render_plots: true,
        ..config().params().clone()
    };
    let svg_config = AnalysisConfiguration::new(params).unwrap();
    let records = Records::from(records);
    let mut analyses = AnalysisKind::ALL
        .into_iter()
        .map(|kind| kind.build(records.clone(), svg_config.clone(), "svg"))
        .collect::<Vec<_>>();
    let pool = WorkerPool::from_config(&svg_config);
    let outcomes = batch::run_batch(&mut analyses, dir.path(), &pool);
    assert!(outcomes.iter().all(|o| o.is_ok()));

    let listing = |name: &str| {
        let mut files = fs::read_dir(dir.path().join(name))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        files.sort();
        files
    };
    assert_eq!(
        listing("value"),
        vec![
            "value-episodes-0-2.svg",
            "value-episodes-3-3.svg",
            "value-time.csv",
            "value-time.svg",
        ]
    );
    assert_eq!(
        listing("action-factor-divergence"),
        vec![
            "action-factor-divergence-episodes-0-2.svg",
            "action-factor-divergence-episodes-3-3.svg",
            "action-factor-divergence-factors.svg",
            "action-factor-divergence-time.csv",
            "action-factor-divergence-time.svg",
        ]
    );
}
