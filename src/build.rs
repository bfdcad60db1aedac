use std::fmt;
use std::str::FromStr;

/// Host status code for a successful build.
pub const STATUS_PASSED: i32 = 2;
/// Host status code for a failed build.
pub const STATUS_FAILED: i32 = 3;

/// Outcome of a finished build as reported by the CI host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Passed,
    Failed,
    /// Any other host status (pending, running, ...), kept as its raw code.
    Other(i32),
}

impl BuildStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            STATUS_PASSED => Self::Passed,
            STATUS_FAILED => Self::Failed,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Passed => STATUS_PASSED,
            Self::Failed => STATUS_FAILED,
            Self::Other(code) => code,
        }
    }
}

impl FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "passed" | "success" => Ok(Self::Passed),
            "failed" | "failure" => Ok(Self::Failed),
            _ => s
                .parse::<i32>()
                .map(Self::from_code)
                .map_err(|_| format!("unknown build status '{s}' (expected passed, failed or a status code)")),
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed => f.write_str("failed"),
            Self::Other(code) => write!(f, "status {code}"),
        }
    }
}

/// Read-only view of a completed build, supplied by the host.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub commit_message: String,
    pub status: BuildStatus,
    pub log: String,
    pub project_id: String,
    pub branch: String,
    pub build_id: u64,
}
