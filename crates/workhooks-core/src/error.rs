use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("Git command not found - please install git")]
    GitNotFound,

    #[error("git {command} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("git {command} failed (exit {code}): {stderr}")]
    GitFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to spawn git: {0}")]
    Spawn(String),

    #[error("Non-interactive environment - manual squash required")]
    NoTerminal,

    #[error("unexpected git output: {0}")]
    UnexpectedOutput(String),

    #[error("Scenario '{0}' not found")]
    ScenarioNotFound(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("plan file not found: {0}")]
    PlanNotFound(String),

    #[error("transcript is empty: {0}")]
    EmptyTranscript(String),

    #[error("Image format not supported: {0}. Supported: PNG, JPEG, GIF. To convert: open the image in your default viewer, then Save As PNG or JPEG.")]
    UnsupportedImage(String),

    #[error("Unable to process image: file appears corrupted. Try: save the screenshot again, or paste from a different source.")]
    CorruptImage,

    #[error("Image dimensions ({width}x{height}) require too much memory to resize. Please resize manually to under {}px before pasting.", crate::images::MAX_DECODE_DIMENSION)]
    ImageTooLarge { width: u32, height: u32 },

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl HookError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HookError::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, HookError>;
