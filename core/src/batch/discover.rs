use crate::types::RetagConfig;
use log::{debug, error, info};
use std::path::{Path, PathBuf};

/// Files of one patient, processed under a single study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// PatientID/PatientName written to every file
    pub patient: String,

    /// Sub-folder name, `None` for files directly under the input root
    pub folder: Option<String>,

    /// Destination folder mirroring the input location
    pub output_dir: PathBuf,

    /// Input files, sorted by name
    pub files: Vec<PathBuf>,
}

/// Collects the subjects of a run
///
/// Files directly under the input root form the first subject, named after
/// the configured patient. With subject folders enabled, every immediate
/// sub-folder holding matching files becomes a further subject named after
/// the folder. Deeper folders are not visited.
///
/// Only a failure to list the input root itself is returned as an error.
pub fn discover_subjects(config: &RetagConfig) -> std::io::Result<Vec<Subject>> {
    let mut subjects = Vec::new();

    let root_files = collect_dicom_files(&config.input_root, &config.extension)?;
    if !root_files.is_empty() {
        subjects.push(Subject {
            patient: config.patient(),
            folder: None,
            output_dir: config.output_root.clone(),
            files: root_files,
        });
    }

    if config.subject_folders {
        subjects.extend(
            collect_subdirectories(&config.input_root)?
                .iter()
                .filter_map(|dir| subject_folder(dir, config)),
        );
    }

    Ok(subjects)
}

/// Builds the subject of one sub-folder
///
/// A folder that cannot be listed is logged and left out so the other
/// subjects still run. Folders without matching files are left out too.
fn subject_folder(dir: &Path, config: &RetagConfig) -> Option<Subject> {
    let name = dir.file_name()?.to_string_lossy().into_owned();
    let files = match collect_dicom_files(dir, &config.extension) {
        Ok(files) => files,
        Err(e) => {
            error!("Cannot list subject folder {}: {}", dir.display(), e);
            return None;
        }
    };
    if files.is_empty() {
        debug!("No matching files in subject folder {}", dir.display());
        return None;
    }

    info!("Subject {}: {} files", name, files.len());
    Some(Subject {
        patient: name.clone(),
        output_dir: config.output_root.join(&name),
        folder: Some(name),
        files,
    })
}

/// Lists regular files in `directory` whose extension matches, ignoring case
pub fn collect_dicom_files(directory: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext.eq_ignore_ascii_case(extension) {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

fn collect_subdirectories(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
