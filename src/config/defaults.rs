//! Default configuration values

/// Release configuration file, relative to the checkout root
pub const RELEASE_CONFIG: &str = ".cmake/release.yaml";

/// Preset configuration file, relative to the checkout root
pub const PRESETS_CONFIG: &str = ".cmake/cmake-presets.yaml";

/// Release workspace directory name
pub const WORKSPACE: &str = "release_ws";

/// Directory receiving final images, logs and reports
pub const OUTPUT_DIR: &str = "images";

/// Name of the root result node
pub const REPORT_NAME: &str = "API";

/// Structured result tree file name
pub const STATUS_JSON: &str = "status.json";

/// Rendered result tree file name
pub const STATUS_HTML: &str = "status.html";

/// Main command log (without component)
pub const BUILD_LOG: &str = "build.log";

/// Version stamp written into the workspace and read from installed SDKs
pub const VERSION_FILE: &str = ".mscc-version";

/// Root directory of installed SDK and toolchain packages
pub const SDK_ROOT: &str = "/opt/mscc";

/// Package installer invocation
pub const INSTALLER: &str = "sudo /usr/local/bin/mscc-install-pkg";

/// Name prefix of BSP SDK packages
pub const BRSDK_PREFIX: &str = "mscc-brsdk";

/// Name prefix of toolchain packages
pub const TOOLCHAIN_PREFIX: &str = "mscc-toolchain-bin";

/// Branch values meaning "default branch" (no suffix in package names)
pub const DEFAULT_BRSDK_BRANCH: &str = "brsdk";
pub const DEFAULT_TOOLCHAIN_BRANCH: &str = "toolchain";

/// CMake flag always appended to preset flags
pub const BUILD_ALL_FLAG: &str = "-DBUILD_ALL=on";

/// Directory names excluded from release archives (suffix match)
pub const EXCLUDED_DIR_SUFFIX: &str = "_workspace";

/// Suffix of the backward-compatibility archive
pub const CHECK_ARCHIVE_SUFFIX: &str = "-checkBC";

/// Final image file endings kept in image directories
pub const IMAGE_EXTENSIONS: &[&str] = &[".mfi", ".itb", ".ubifs", ".ext4.gz"];

/// Kernel module directory marker and the only file type kept there
pub const KERNEL_MODULES_DIR: &str = "linux_kernel_modules";
pub const KERNEL_MODULE_EXTENSION: &str = "ko";

/// Build-system directories removed from binaries
pub const PRUNED_DIRS: &[&str] = &["CMakeFiles"];

/// Build-system files removed from binaries
pub const PRUNED_FILES: &[&str] = &[
    "Jenkinsfile",
    "CMakeCache.txt",
    "CMakeFiles",
    "cmake_install.cmake",
    "Makefile",
];

/// Intermediate file extensions removed from binaries
pub const PRUNED_EXTENSIONS: &[&str] = &["log", "ar", "in"];

/// Interpreter wrappers tried before the plain interpreter (relative to HOME
/// when not absolute)
pub const INTERPRETER_CANDIDATES: &[&str] = &[
    ".rvm/wrappers/ruby-2.6.2/ruby",
    "/usr/local/rvm/wrappers/ruby-2.6.2/ruby",
];

/// Interpreter used when no wrapper exists
pub const INTERPRETER: &str = "ruby";

/// Distributed build grid defaults
pub const GRID_CLIENT: &str = "SimpleGridClient";
pub const GRID_POOL: &str = "webstax";
pub const GRID_IMAGE: &str = "ghcr.io/microchip-ung/bsp-buildenv";
pub const GRID_IMAGE_TAG: &str = "1.9";

/// Binary archive consumed by the aggregator
pub const AGGREGATE_BINARIES: &str = "arm64.tar";

/// Staging directory consumed by the aggregator
pub const AGGREGATE_WORKSPACE: &str = "ws";
