//! Bundle assembly: merge stage output with the shared static resources
//! into `output/`, then patch the menu data file.

use crate::config::BundleConfig;
use crate::error::BundleError;
use crate::job::{Job, STATIC_ASSET_DIRS};
use crate::pipeline::fsops::{copy_dir, copy_file};
use crate::pipeline::patch::replace_line;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Line of `menu_data.js` overwritten with the marker (1-based).
pub const MENU_MARKER_LINE: usize = 2;

/// Assemble the bundle for `job`. Returns the number of files copied.
pub fn assemble_bundle(job: &Job, config: &BundleConfig) -> Result<usize, BundleError> {
    let ws = job.workspace();
    let output = ws.output_dir();
    let mut copied = 0;

    debug!(
        "{}: copy edition/transcription/{} to output/json",
        job.id(),
        job.doc_base_name()
    );
    copied += copy_dir(&ws.transcription_dir(job.doc_base_name()), &ws.output_json_dir())?;

    debug!("{}: copy in the js/css/packages trees", job.id());
    for dir in STATIC_ASSET_DIRS {
        copied += copy_dir(&config.static_dir.join(dir), &ws.output_static_dir().join(dir))?;
    }

    for resource in &config.resource_files {
        copy_file(
            &config.resources_dir.join(&resource.source),
            &output.join(&resource.dest),
        )?;
        copied += 1;
    }

    debug!("{}: copy menu_data.js and patch line {}", job.id(), MENU_MARKER_LINE);
    copy_file(&ws.menu_data_source(), &ws.menu_data_target())?;
    copied += 1;
    replace_line(&ws.menu_data_target(), MENU_MARKER_LINE, &config.menu_marker)?;

    verify_bundle(job, config)?;
    Ok(copied)
}

/// Paths that must be present and non-empty in `output/` before it is
/// archived.
pub fn required_paths(job: &Job, config: &BundleConfig) -> Vec<PathBuf> {
    let ws = job.workspace();
    let mut paths = vec![ws.output_json_dir()];
    paths.extend(STATIC_ASSET_DIRS.iter().map(|d| ws.output_static_dir().join(d)));
    paths.extend(
        config
            .resource_files
            .iter()
            .map(|r| ws.output_dir().join(&r.dest)),
    );
    paths.push(ws.menu_data_target());
    paths
}

/// Check every required bundle path is present and non-empty.
///
/// A directory needs at least one entry and a file at least one byte. A
/// stage that exits 0 without writing anything fails here instead of
/// publishing a hollow bundle.
pub fn verify_bundle(job: &Job, config: &BundleConfig) -> Result<(), BundleError> {
    match required_paths(job, config)
        .into_iter()
        .find(|p| !has_content(p))
    {
        Some(missing) => Err(BundleError::Assembly { missing }),
        None => Ok(()),
    }
}

fn has_content(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false),
        Ok(meta) => meta.len() > 0,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MENU_DATA_MARKER;
    use crate::error::ErrorKind;
    use crate::job::Workspace;

    struct Fixture {
        _tmp: tempfile::TempDir,
        job: Job,
        config: BundleConfig,
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// A workspace that looks like both stages have run.
    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let shared = tmp.path().join("shared");
        for dir in STATIC_ASSET_DIRS {
            write(&shared.join("static").join(dir).join("asset.txt"), dir);
        }
        for name in ["index.html", "estoria.js", "estoria.css"] {
            write(&shared.join("resources").join(name), name);
        }

        let ws = Workspace::from_path(tmp.path().join("tmpASM")).unwrap();
        write(&ws.transcription_dir("doc").join("1r.json"), "{}");
        write(
            &ws.menu_data_source(),
            "var menu_data = {\n    \"doc\": [\n    ]\n};\n",
        );
        std::fs::create_dir_all(ws.output_static_dir()).unwrap();

        let config = BundleConfig::builder()
            .static_dir(shared.join("static"))
            .resources_dir(shared.join("resources"))
            .build()
            .unwrap();
        Fixture {
            _tmp: tmp,
            job: Job::new("doc.xml", ws),
            config,
        }
    }

    #[test]
    fn assembles_complete_bundle() {
        let f = fixture();
        let copied = assemble_bundle(&f.job, &f.config).unwrap();
        // 1 json + 3 assets + 3 resources + menu data
        assert_eq!(copied, 8);

        let out = f.job.workspace().output_dir();
        assert!(out.join("json/1r.json").is_file());
        assert!(out.join("static/packages/asset.txt").is_file());
        assert!(out.join("static/js/estoria.js").is_file());
        assert!(out.join("index.html").is_file());
        let menu = std::fs::read_to_string(out.join("static/js/menu_data.js")).unwrap();
        assert_eq!(menu.lines().nth(1), Some(MENU_DATA_MARKER));
        assert_eq!(menu.lines().count(), 4);
    }

    #[test]
    fn missing_stage_output_is_reported() {
        let f = fixture();
        let missing = f.job.workspace().transcription_dir("doc");
        std::fs::remove_dir_all(&missing).unwrap();

        match assemble_bundle(&f.job, &f.config).unwrap_err() {
            BundleError::Assembly { missing: m } => assert_eq!(m, missing),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!f.job.workspace().output_json_dir().exists());
    }

    #[test]
    fn short_menu_file_is_patch_error() {
        let f = fixture();
        std::fs::write(f.job.workspace().menu_data_source(), "var m = {};").unwrap();
        let err = assemble_bundle(&f.job, &f.config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Patch);
    }

    #[test]
    fn missing_resource_file_is_assembly_error() {
        let f = fixture();
        std::fs::remove_file(f.config.resources_dir.join("estoria.css")).unwrap();
        let err = assemble_bundle(&f.job, &f.config).unwrap_err();
        assert!(err.to_string().contains("estoria.css"), "got: {err}");
    }

    #[test]
    fn empty_stage_output_is_rejected() {
        let f = fixture();
        let json = f.job.workspace().transcription_dir("doc");
        std::fs::remove_file(json.join("1r.json")).unwrap();

        match assemble_bundle(&f.job, &f.config).unwrap_err() {
            BundleError::Assembly { missing } => {
                assert_eq!(missing, f.job.workspace().output_json_dir())
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_asset_tree_is_rejected() {
        let f = fixture();
        std::fs::remove_file(f.config.static_dir.join("css/asset.txt")).unwrap();

        match assemble_bundle(&f.job, &f.config).unwrap_err() {
            BundleError::Assembly { missing } => {
                assert_eq!(missing, f.job.workspace().output_static_dir().join("css"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_byte_entry_page_is_rejected() {
        let f = fixture();
        std::fs::write(f.config.resources_dir.join("index.html"), "").unwrap();

        match assemble_bundle(&f.job, &f.config).unwrap_err() {
            BundleError::Assembly { missing } => {
                assert_eq!(missing, f.job.workspace().output_dir().join("index.html"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn verify_flags_first_missing_path() {
        let f = fixture();
        match verify_bundle(&f.job, &f.config).unwrap_err() {
            BundleError::Assembly { missing } => {
                assert_eq!(missing, f.job.workspace().output_json_dir())
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
