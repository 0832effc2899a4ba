//! Artifact pruning
//!
//! Before packaging, the build directories in the workspace are stripped of
//! build-system leftovers. Decisions are made on paths relative to the
//! binaries directory so they can be tested without touching the disk.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::config::defaults;
use crate::config::release::PruneSettings;
use crate::error::FilesystemError;
use crate::infra::filesystem;

/// Whether a file name is a final image (`.mfi`, `.itb`, `.ubifs`, `.ext4.gz`)
pub fn is_image_file(name: &str) -> bool {
    defaults::IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// What a prune pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Removed directories
    pub dirs: usize,
    /// Removed files
    pub files: usize,
}

/// Pruning rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneRules {
    image_dirs: Vec<String>,
    extra_dirs: Vec<String>,
    name_patterns: Vec<String>,
}

impl From<&PruneSettings> for PruneRules {
    fn from(settings: &PruneSettings) -> Self {
        Self {
            image_dirs: settings.image_dirs.clone(),
            extra_dirs: settings.dirs.clone(),
            name_patterns: settings.name_patterns.clone(),
        }
    }
}

fn slashed(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_name(rel: &Path) -> &str {
    rel.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

impl PruneRules {
    /// Whether `rel` lies below one of the image directories, compared
    /// component by component
    fn inside_image_dir(&self, rel: &Path) -> bool {
        let parents: Vec<Component<'_>> = rel.parent().map_or_else(Vec::new, |p| p.components().collect());
        self.image_dirs.iter().any(|dir| {
            let dir: Vec<Component<'_>> = Path::new(dir).components().collect();
            !dir.is_empty() && parents.windows(dir.len()).any(|w| w == dir.as_slice())
        })
    }

    /// Whether a directory below the binaries directory is removed
    pub fn prune_dir(&self, rel: &Path) -> bool {
        let name = file_name(rel);
        defaults::PRUNED_DIRS.contains(&name)
            || self.extra_dirs.iter().any(|d| d == name)
            || self.inside_image_dir(rel)
    }

    /// Whether a file below the binaries directory is removed
    pub fn prune_file(&self, rel: &Path) -> bool {
        let name = file_name(rel);
        let path = slashed(rel);

        if path.contains(defaults::KERNEL_MODULES_DIR)
            && rel.extension().and_then(|e| e.to_str()) != Some(defaults::KERNEL_MODULE_EXTENSION)
        {
            return true;
        }
        if rel
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| defaults::PRUNED_EXTENSIONS.contains(&ext))
        {
            return true;
        }
        if defaults::PRUNED_FILES.contains(&name) {
            return true;
        }
        if self.name_patterns.iter().any(|p| name.contains(p.as_str())) {
            return true;
        }
        self.inside_image_dir(rel) && !is_image_file(name)
    }

    /// Whether a file anywhere in the workspace is removed
    pub fn prune_workspace_file(rel: &Path) -> bool {
        rel.extension().and_then(|e| e.to_str()) == Some("log") || file_name(rel) == "Jenkinsfile"
    }

    /// Prune the workspace at `workspace` (binaries live in `workspace/bin`)
    pub fn apply(&self, workspace: &Path) -> Result<PruneReport, FilesystemError> {
        let mut report = PruneReport::default();
        let bin = workspace.join("bin");

        if bin.is_dir() {
            let mut dirs = entries(&bin, true);
            dirs.reverse();
            for (path, rel) in dirs {
                if path.exists() && self.prune_dir(&rel) {
                    tracing::debug!("Pruning directory {}", path.display());
                    filesystem::remove_all(&path)?;
                    report.dirs += 1;
                }
            }
            for (path, rel) in entries(&bin, false) {
                if self.prune_file(&rel) {
                    filesystem::remove_all(&path)?;
                    report.files += 1;
                }
            }
        }

        for (path, rel) in entries(workspace, false) {
            if Self::prune_workspace_file(&rel) {
                filesystem::remove_all(&path)?;
                report.files += 1;
            }
        }

        tracing::info!(
            "Pruned {} directories and {} files from {}",
            report.dirs,
            report.files,
            workspace.display()
        );
        Ok(report)
    }
}

/// Directories (`dirs == true`) or non-directories below `root`, with paths
/// relative to `root`
fn entries(root: &Path, dirs: bool) -> Vec<(PathBuf, PathBuf)> {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_dir() == dirs)
        .filter_map(|e| {
            let rel = e.path().strip_prefix(root).ok()?.to_path_buf();
            Some((e.into_path(), rel))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rules() -> PruneRules {
        PruneRules::from(&PruneSettings {
            image_dirs: vec!["mepa_demo".to_string()],
            dirs: vec!["mesa-ag".to_string()],
            name_patterns: vec!["libmeba_only".to_string()],
        })
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file("mepa_demo.itb"));
        assert!(is_image_file("rootfs.ext4.gz"));
        assert!(is_image_file("app.mfi"));
        assert!(!is_image_file("app.gz"));
        assert!(!is_image_file("mepa_demo"));
    }

    #[test]
    fn test_prune_dir_decisions() {
        let rules = rules();
        assert!(rules.prune_dir(Path::new("arm64/CMakeFiles")));
        assert!(rules.prune_dir(Path::new("arm64/mesa-ag")));
        assert!(rules.prune_dir(Path::new("arm64/mepa_demo/objs")));
        assert!(!rules.prune_dir(Path::new("arm64/mepa_demo")));
        assert!(!rules.prune_dir(Path::new("arm64/mepa")));
    }

    #[test]
    fn test_prune_file_decisions() {
        let rules = rules();
        assert!(rules.prune_file(Path::new("arm64/CMakeCache.txt")));
        assert!(rules.prune_file(Path::new("arm64/Makefile")));
        assert!(rules.prune_file(Path::new("arm64/cmake_install.cmake")));
        assert!(rules.prune_file(Path::new("arm64/build.log")));
        assert!(rules.prune_file(Path::new("arm64/libfoo.ar")));
        assert!(rules.prune_file(Path::new("arm64/config.h.in")));
        assert!(rules.prune_file(Path::new("arm64/libmeba_only.so")));
        assert!(rules.prune_file(Path::new("arm64/linux_kernel_modules/Module.symvers")));
        assert!(!rules.prune_file(Path::new("arm64/linux_kernel_modules/mepa.ko")));
        assert!(rules.prune_file(Path::new("arm64/mepa_demo/mepa_demo")));
        assert!(!rules.prune_file(Path::new("arm64/mepa_demo/mepa_demo.itb")));
        assert!(!rules.prune_file(Path::new("arm64/mepa/libmepa.so")));
    }

    #[test]
    fn test_image_dir_matches_whole_components() {
        let rules = rules();
        assert!(!rules.prune_file(Path::new("arm64/foo_mepa_demo/tool")));
        assert!(!rules.prune_dir(Path::new("arm64/foo_mepa_demo/objs")));
        assert!(!rules.prune_file(Path::new("arm64/mepa_demo_extra/tool")));
        assert!(rules.prune_file(Path::new("arm64/mepa_demo/sub/tool")));
    }

    #[test]
    fn test_prune_workspace_file() {
        assert!(PruneRules::prune_workspace_file(Path::new("mepa/Jenkinsfile")));
        assert!(PruneRules::prune_workspace_file(Path::new("notes.log")));
        assert!(!PruneRules::prune_workspace_file(Path::new("mepa/README.md")));
    }

    #[test]
    fn test_apply_prunes_workspace() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path();
        let touch = |rel: &str| {
            let path = ws.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        };
        touch("bin/arm64/CMakeFiles/a/b.o");
        touch("bin/arm64/CMakeCache.txt");
        touch("bin/arm64/mepa/libmepa.so");
        touch("bin/arm64/mepa_demo/mepa_demo.itb");
        touch("bin/arm64/mepa_demo/mepa_demo");
        touch("bin/arm64/mepa_demo/objs/x.o");
        touch("mepa/Jenkinsfile");
        touch("mepa/src/phy.c");

        let report = rules().apply(ws).unwrap();

        assert!(!ws.join("bin/arm64/CMakeFiles").exists());
        assert!(!ws.join("bin/arm64/CMakeCache.txt").exists());
        assert!(!ws.join("bin/arm64/mepa_demo/objs").exists());
        assert!(!ws.join("bin/arm64/mepa_demo/mepa_demo").exists());
        assert!(!ws.join("mepa/Jenkinsfile").exists());
        assert!(ws.join("bin/arm64/mepa/libmepa.so").exists());
        assert!(ws.join("bin/arm64/mepa_demo/mepa_demo.itb").exists());
        assert!(ws.join("mepa/src/phy.c").exists());
        assert_eq!(report.dirs, 2);
        assert_eq!(report.files, 3);
    }
}
