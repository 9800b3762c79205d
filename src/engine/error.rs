use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Configuration errors: raised before any command is queued.
    #[error("geometry input file does not exist or is in the wrong location ({})", .0.display())]
    GeometryMissing(PathBuf),

    #[error("geometry input file is empty (no data), download or create a new file ({})", .0.display())]
    GeometryEmpty(PathBuf),

    #[error("invalid NACA designation '{0}' (expected 4 or 5 digits)")]
    InvalidNaca(String),

    #[error("iteration cap must be positive")]
    InvalidIterations,

    #[error("polar needs at least one angle of attack")]
    NoAngles,

    #[error("XFOIL executable not found: {0}")]
    ExecutableNotFound(String),

    // Sequencing errors: the transcript would not match XFOIL's menu state.
    #[error("'{command}' must be issued from the {expected} menu")]
    WrongMenu {
        command: &'static str,
        expected: &'static str,
    },

    #[error("session already terminated, build a new one to run more cases")]
    SessionClosed,

    #[error("failed to start XFOIL at {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that make every later run in the batch fail the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ExecutableNotFound(_) | Error::Spawn { .. })
    }
}
