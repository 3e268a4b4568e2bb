use directories::ProjectDirs;
use std::path::PathBuf;

/// Platform specific directories for this application
pub fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "avl", "avl-server")
}

/// Default directory for exported shapefiles: `<data_dir>/shapefiles`,
/// or `./shapefiles` when no home directory can be determined.
pub fn default_export_dir() -> PathBuf {
    get_project_dirs()
        .map(|dirs| dirs.data_dir().join("shapefiles"))
        .unwrap_or_else(|| PathBuf::from("./shapefiles"))
}
