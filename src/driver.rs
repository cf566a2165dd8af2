use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::annotation::{annotate, image_file_name, AnnotateError, AnnotateOptions, Annotation};
use crate::config::{ConfigError, RenderingConfig};
use crate::dataset::{Dataset, DatasetError, METADATA_FILENAME};
use crate::debug;
use crate::render::{RayCaster, RenderError, Renderer};
use crate::scenes::configured::ConfiguredScene;
use crate::scenes::Scene;
use crate::sweep::{Snapshot, Sweep};

/// What the sweep does when a snapshot fails to render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run on the first failure.
    #[default]
    Abort,
    /// Log the failure, leave the snapshot out of the dataset and continue.
    Skip,
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to prepare '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to render snapshot {snapshot_id}: {source}")]
    Render {
        snapshot_id: Uuid,
        source: RenderError,
    },
    #[error("failed to annotate snapshot {snapshot_id}: {source}")]
    Annotate {
        snapshot_id: Uuid,
        source: AnnotateError,
    },
    #[error("malformed annotation settings '{path}': {source}")]
    Settings {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot resume: existing annotations used {stored:?}, this run uses {current:?}")]
    SettingsMismatch {
        stored: AnnotateOptions,
        current: AnnotateOptions,
    },
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Written next to the metadata so a resumed run can tell whether the stored
/// annotations are still valid.
pub const SETTINGS_FILENAME: &str = "annotation_settings.json";

#[derive(Clone, Debug)]
pub struct SweepOptions {
    /// Directory receiving the images and the metadata file.
    pub split_path: PathBuf,
    pub annotate: AnnotateOptions,
    pub on_render_failure: FailurePolicy,
    /// Reuse snapshots whose image and annotation already exist.
    pub resume: bool,
    pub debug: bool,
    pub progress: bool,
}

impl SweepOptions {
    pub fn new(split_path: impl Into<PathBuf>) -> Self {
        Self {
            split_path: split_path.into(),
            annotate: AnnotateOptions::default(),
            on_render_failure: FailurePolicy::default(),
            resume: false,
            debug: false,
            progress: false,
        }
    }
}

#[derive(Debug)]
pub struct SweepReport {
    pub dataset: Dataset,
    /// Snapshots left out under [`FailurePolicy::Skip`].
    pub failed: Vec<Uuid>,
    pub resumed: usize,
}

fn stored_settings(options: &SweepOptions) -> Result<Option<AnnotateOptions>, SweepError> {
    let path = options.split_path.join(SETTINGS_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).map_err(|source| SweepError::Io {
        path: path.clone(),
        source,
    })?;
    let settings =
        serde_json::from_str(&text).map_err(|source| SweepError::Settings { path, source })?;
    Ok(Some(settings))
}

fn write_settings(options: &SweepOptions) -> Result<(), SweepError> {
    let path = options.split_path.join(SETTINGS_FILENAME);
    let text = serde_json::to_string_pretty(&options.annotate).map_err(|source| {
        SweepError::Settings {
            path: path.clone(),
            source,
        }
    })?;
    std::fs::write(&path, text).map_err(|source| SweepError::Io { path, source })
}

fn previous_annotations(
    options: &SweepOptions,
) -> Result<HashMap<String, Annotation>, SweepError> {
    let metadata = options.split_path.join(METADATA_FILENAME);
    if !options.resume || !metadata.exists() {
        return Ok(HashMap::new());
    }

    match stored_settings(options)? {
        Some(stored) if stored != options.annotate => {
            return Err(SweepError::SettingsMismatch {
                stored,
                current: options.annotate,
            });
        }
        Some(_) => {}
        None => log::warn!(
            "No {} in {}; assuming the stored annotations match this run",
            SETTINGS_FILENAME,
            options.split_path.display()
        ),
    }

    let previous = Dataset::load(&options.split_path)?;
    log::info!(
        "Resuming from {} existing annotation(s)",
        previous.annotations().len()
    );
    Ok(previous
        .annotations()
        .iter()
        .map(|a| (a.file_name.clone(), a.clone()))
        .collect())
}

/// Saves what is done so far, completed snapshots first, so a resumed run can
/// pick up after an aborted one.
fn checkpoint(dataset: &Dataset, previous: &HashMap<String, Annotation>) {
    let done: HashSet<&str> = dataset
        .annotations()
        .iter()
        .map(|a| a.file_name.as_str())
        .collect();
    let mut rest: Vec<&Annotation> = previous
        .values()
        .filter(|a| !done.contains(a.file_name.as_str()))
        .collect();
    rest.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let mut partial = dataset.clone();
    for annotation in rest {
        partial.push(annotation.clone());
    }
    match partial.write() {
        Ok(path) => log::info!(
            "Saved {} completed annotation(s) to {} for resuming",
            partial.len(),
            path.display()
        ),
        Err(e) => log::warn!("Failed to save completed annotations: {}", e),
    }
}

fn progress_bar(options: &SweepOptions, len: usize) -> ProgressBar {
    if !options.progress {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    ) {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message("Rendering snapshots");
    bar
}

/// Drives every snapshot through apply, render and annotate, in order.
///
/// The annotation of a snapshot is computed from the very scene state that was
/// handed to the renderer. The returned dataset is not written to disk; when
/// the run stops on an error, the annotations completed so far are.
pub fn run_sweep<S, R, I>(
    scene: &mut S,
    renderer: &R,
    snapshots: I,
    options: &SweepOptions,
) -> Result<SweepReport, SweepError>
where
    S: Scene,
    R: Renderer,
    I: IntoIterator<Item = Snapshot>,
{
    let split_path = &options.split_path;
    std::fs::create_dir_all(split_path).map_err(|source| SweepError::Io {
        path: split_path.clone(),
        source,
    })?;

    let previous = previous_annotations(options)?;
    write_settings(options)?;
    let snapshots = snapshots.into_iter();
    let bar = progress_bar(options, snapshots.size_hint().0);

    let mut dataset = Dataset::new(split_path);
    let mut failed = vec![];
    let mut resumed = 0;

    for snapshot in snapshots {
        let file_name = image_file_name(&snapshot.id);
        let image_path = split_path.join(&file_name);

        scene.apply(&snapshot);

        if let Some(annotation) = previous.get(&file_name) {
            if image_path.exists() {
                log::debug!("Snapshot {} already done, skipping", snapshot.id);
                dataset.push(annotation.clone());
                resumed += 1;
                bar.inc(1);
                continue;
            }
        }

        let state = scene.state();
        if let Err(source) = renderer.render_to_file(&state, &image_path) {
            match options.on_render_failure {
                FailurePolicy::Abort => {
                    bar.abandon();
                    checkpoint(&dataset, &previous);
                    return Err(SweepError::Render {
                        snapshot_id: snapshot.id,
                        source,
                    });
                }
                FailurePolicy::Skip => {
                    log::warn!("Skipping snapshot {}: {}", snapshot.id, source);
                    failed.push(snapshot.id);
                    bar.inc(1);
                    continue;
                }
            }
        }

        let annotation = match annotate(
            state.cameras,
            state.elements,
            &snapshot.id,
            &options.annotate,
        ) {
            Ok(annotation) => annotation,
            Err(source) => {
                bar.abandon();
                checkpoint(&dataset, &previous);
                return Err(SweepError::Annotate {
                    snapshot_id: snapshot.id,
                    source,
                });
            }
        };

        if options.debug {
            if let Err(e) = debug::draw_annotation(
                &image_path,
                &annotation,
                options.annotate.mode,
                &split_path.join(debug::DEBUG_DIR),
            ) {
                log::warn!("Failed to draw debug frame for {}: {}", snapshot.id, e);
            }
        }

        dataset.push(annotation);
        bar.inc(1);
    }
    bar.finish();

    Ok(SweepReport {
        dataset,
        failed,
        resumed,
    })
}

/// Builds scene, sweep and renderer from `config`, runs the sweep and writes
/// `{target_path}/{split}/metadata.jsonl`.
pub fn generate_dataset(config: &RenderingConfig) -> Result<SweepReport, SweepError> {
    let mut scene = ConfiguredScene::from_config(&config.scene)?;
    let sweep = Sweep::from_config(&config.sweep);
    let renderer = RayCaster::new(config.resolution, config.samples);
    log::info!("Sweep '{}' has {} snapshot(s)", config.sweep.name, sweep.len());

    let options = SweepOptions {
        split_path: config.split_path(),
        annotate: AnnotateOptions {
            resolution: config.resolution,
            mode: config.coordinate_mode(),
            categories: config.category_mode,
        },
        on_render_failure: config.on_render_failure,
        resume: config.resume,
        debug: config.debug,
        progress: true,
    };

    let report = run_sweep(&mut scene, &renderer, sweep, &options)?;
    report.dataset.write()?;

    if config.debug {
        let debug_dir = options.split_path.join(debug::DEBUG_DIR);
        if let Err(e) = debug::render_animation(&debug_dir, report.dataset.annotations()) {
            log::warn!("Failed to assemble annotation animation: {}", e);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, Intrinsics};
    use crate::objects::cuboid::Cuboid;
    use crate::objects::{SceneElement, Shape};
    use crate::projector::CoordinateMode;
    use crate::scenes::SceneState;
    use crate::sweep::{snapshot_id, CameraPose, SnapshotParams};
    use na::{Point3, Vector3};
    use std::cell::RefCell;
    use std::path::Path;

    /// Writes a placeholder file and remembers the camera it was given.
    #[derive(Default)]
    struct RecordingRenderer {
        fail_on: Option<usize>,
        seen: RefCell<Vec<Camera>>,
    }

    impl Renderer for RecordingRenderer {
        fn render_to_file(&self, state: &SceneState, path: &Path) -> Result<(), RenderError> {
            let call = self.seen.borrow().len();
            self.seen.borrow_mut().push(state.cameras[0].clone());
            if self.fail_on == Some(call) {
                return Err(RenderError::NoCamera);
            }
            std::fs::write(path, b"png").map_err(|e| RenderError::Write {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(e),
            })
        }
    }

    fn scene() -> ConfiguredScene {
        let camera = Camera::new(
            Point3::new(0.0, 0.0, 10.0),
            Point3::origin(),
            Intrinsics::Fov(50.0),
        );
        let elements = vec![
            SceneElement::new(
                "near",
                4,
                Shape::Cuboid(Cuboid::new(Vector3::new(1.0, 1.0, 1.0))),
            ),
            SceneElement::new(
                "far",
                5,
                Shape::Cuboid(Cuboid::new(Vector3::new(1.0, 2.0, 1.0))),
            )
            .with_pose(na::Isometry3::translation(0.0, 0.0, -6.0)),
        ];
        ConfiguredScene::new(vec![camera], elements, None)
    }

    fn snapshots() -> Vec<Snapshot> {
        [10.0, 7.0, -10.0]
            .iter()
            .enumerate()
            .map(|(i, z)| {
                let params = SnapshotParams {
                    camera: Some(CameraPose {
                        look_from: Point3::new(1.0, 2.0, *z),
                        look_at: Point3::origin(),
                    }),
                    ..Default::default()
                };
                Snapshot::new(snapshot_id("test", i), params)
            })
            .collect()
    }

    #[test]
    fn three_snapshot_sweep_writes_three_lines() {
        let dir = tempfile::tempdir().unwrap();
        let options = SweepOptions::new(dir.path().join("train"));
        let renderer = RecordingRenderer::default();

        let report = run_sweep(&mut scene(), &renderer, snapshots(), &options).unwrap();
        let path = report.dataset.write().unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for (line, snapshot) in lines.iter().zip(snapshots()) {
            let annotation: Annotation = serde_json::from_str(line).unwrap();
            assert_eq!(annotation.file_name, format!("{}.png", snapshot.id));
            assert!(options.split_path.join(&annotation.file_name).exists());
        }
    }

    #[test]
    fn annotation_sees_the_rendered_state() {
        let dir = tempfile::tempdir().unwrap();
        let options = SweepOptions {
            annotate: AnnotateOptions {
                mode: CoordinateMode::Absolute,
                ..Default::default()
            },
            ..SweepOptions::new(dir.path())
        };
        let renderer = RecordingRenderer::default();

        let report = run_sweep(&mut scene(), &renderer, snapshots(), &options).unwrap();

        let seen = renderer.seen.borrow();
        for ((snapshot, camera), annotation) in snapshots()
            .iter()
            .zip(seen.iter())
            .zip(report.dataset.annotations())
        {
            let mut expected_scene = scene();
            expected_scene.apply(snapshot);
            assert_eq!(camera, &expected_scene.cameras()[0]);

            let expected = annotate(
                expected_scene.cameras(),
                expected_scene.elements(),
                &snapshot.id,
                &options.annotate,
            )
            .unwrap();
            assert_eq!(annotation, &expected);
        }
    }

    #[test]
    fn render_failure_aborts_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let options = SweepOptions::new(dir.path());
        let renderer = RecordingRenderer {
            fail_on: Some(1),
            ..Default::default()
        };

        let err = run_sweep(&mut scene(), &renderer, snapshots(), &options).unwrap_err();
        match err {
            SweepError::Render { snapshot_id, .. } => assert_eq!(snapshot_id, snapshots()[1].id),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(renderer.seen.borrow().len(), 2);
    }

    #[test]
    fn skip_policy_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let options = SweepOptions {
            on_render_failure: FailurePolicy::Skip,
            ..SweepOptions::new(dir.path())
        };
        let renderer = RecordingRenderer {
            fail_on: Some(1),
            ..Default::default()
        };

        let report = run_sweep(&mut scene(), &renderer, snapshots(), &options).unwrap();
        assert_eq!(report.failed, vec![snapshots()[1].id]);
        let names: Vec<String> = report
            .dataset
            .annotations()
            .iter()
            .map(|a| a.file_name.clone())
            .collect();
        assert_eq!(
            names,
            vec![
                image_file_name(&snapshots()[0].id),
                image_file_name(&snapshots()[2].id)
            ]
        );
    }

    #[test]
    fn rerunning_produces_identical_metadata() {
        let run = || {
            let dir = tempfile::tempdir().unwrap();
            let options = SweepOptions::new(dir.path());
            let report =
                run_sweep(&mut scene(), &RecordingRenderer::default(), snapshots(), &options)
                    .unwrap();
            std::fs::read(report.dataset.write().unwrap()).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn resume_reuses_completed_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let options = SweepOptions::new(dir.path());
        let first = run_sweep(&mut scene(), &RecordingRenderer::default(), snapshots(), &options)
            .unwrap();
        first.dataset.write().unwrap();

        // Drop one image so only that snapshot is redone
        let redo = image_file_name(&snapshots()[2].id);
        std::fs::remove_file(dir.path().join(&redo)).unwrap();

        let renderer = RecordingRenderer::default();
        let options = SweepOptions {
            resume: true,
            ..options
        };
        let second = run_sweep(&mut scene(), &renderer, snapshots(), &options).unwrap();

        assert_eq!(second.resumed, 2);
        assert_eq!(renderer.seen.borrow().len(), 1);
        assert_eq!(second.dataset.annotations(), first.dataset.annotations());
    }

    #[test]
    fn resume_picks_up_after_an_aborted_run() {
        let dir = tempfile::tempdir().unwrap();
        let options = SweepOptions::new(dir.path());
        let failing = RecordingRenderer {
            fail_on: Some(2),
            ..Default::default()
        };
        assert!(run_sweep(&mut scene(), &failing, snapshots(), &options).is_err());
        assert_eq!(Dataset::load(dir.path()).unwrap().len(), 2);

        let renderer = RecordingRenderer::default();
        let options = SweepOptions {
            resume: true,
            ..options
        };
        let report = run_sweep(&mut scene(), &renderer, snapshots(), &options).unwrap();

        assert_eq!(report.resumed, 2);
        assert_eq!(renderer.seen.borrow().len(), 1);
        let names: Vec<String> = report
            .dataset
            .annotations()
            .iter()
            .map(|a| a.file_name.clone())
            .collect();
        let expected: Vec<String> = snapshots().iter().map(|s| image_file_name(&s.id)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn resume_refuses_changed_annotation_settings() {
        let dir = tempfile::tempdir().unwrap();
        let options = SweepOptions::new(dir.path());
        let first = run_sweep(&mut scene(), &RecordingRenderer::default(), snapshots(), &options)
            .unwrap();
        first.dataset.write().unwrap();

        let options = SweepOptions {
            resume: true,
            annotate: AnnotateOptions {
                mode: CoordinateMode::Absolute,
                ..Default::default()
            },
            ..options
        };
        let renderer = RecordingRenderer::default();
        let err = run_sweep(&mut scene(), &renderer, snapshots(), &options).unwrap_err();

        assert!(matches!(err, SweepError::SettingsMismatch { .. }));
        assert!(renderer.seen.borrow().is_empty());
    }

    #[test]
    fn orbit_straight_above_the_target_annotates_every_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderingConfig::from_toml(
            r#"
            target_path = "unused"

            [[scene.cameras]]
            look_from = [0.0, 0.0, 10.0]

            [[scene.elements]]
            name = "crate"
            shape = { type = "cuboid", size = [1.0, 1.0, 1.0] }

            [sweep]
            camera_orbit = { radius = 0.0, height = 6.0, steps = 2 }
            "#,
        )
        .unwrap();
        let mut scene = ConfiguredScene::from_config(&config.scene).unwrap();

        let report = run_sweep(
            &mut scene,
            &RecordingRenderer::default(),
            Sweep::from_config(&config.sweep),
            &SweepOptions::new(dir.path()),
        )
        .unwrap();

        assert_eq!(report.dataset.len(), 2);
        for annotation in report.dataset.annotations() {
            assert_eq!(annotation.objects.categories, vec![0]);
        }
    }

    #[test]
    fn scene_without_camera_fails_with_the_snapshot_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = ConfiguredScene::new(vec![], vec![], None);

        struct Blank;
        impl Renderer for Blank {
            fn render_to_file(&self, _: &SceneState, path: &Path) -> Result<(), RenderError> {
                std::fs::write(path, b"").map_err(|e| RenderError::Write {
                    path: path.to_path_buf(),
                    source: image::ImageError::IoError(e),
                })
            }
        }

        let err = run_sweep(&mut scene, &Blank, snapshots(), &SweepOptions::new(dir.path()))
            .unwrap_err();
        assert!(matches!(
            err,
            SweepError::Annotate {
                source: AnnotateError::NoCamera,
                ..
            }
        ));
    }

    #[test]
    fn generate_dataset_runs_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderingConfig::from_toml(&format!(
            r#"
            target_path = "{}"
            split = "val"
            resolution = [24, 16]
            samples = 1
            debug = true

            [[scene.cameras]]
            look_from = [0.0, 1.0, 6.0]

            [[scene.elements]]
            name = "crate"
            shape = {{ type = "cuboid", size = [1.0, 1.0, 1.0] }}

            [sweep]
            camera_orbit = {{ radius = 6.0, height = 1.0, steps = 3 }}
            "#,
            dir.path().display()
        ))
        .unwrap();

        let report = generate_dataset(&config).unwrap();
        assert_eq!(report.dataset.len(), 3);

        let split = dir.path().join("val");
        let reloaded = Dataset::load(&split).unwrap();
        assert_eq!(reloaded.annotations(), report.dataset.annotations());
        for annotation in reloaded.annotations() {
            assert!(split.join(&annotation.file_name).exists());
            assert_eq!(annotation.objects.categories, vec![0]);
        }
        assert!(split.join(debug::DEBUG_DIR).join(debug::ANIMATION_FILENAME).exists());
    }
}
