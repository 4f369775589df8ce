use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SealError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("Walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error(
        "Build directory {} already exists. Please check and remove it first.",
        .0.display()
    )]
    BuildDirExists(PathBuf),

    #[error(
        "Cannot compile {}: module file names must be valid UTF-8",
        .0.display()
    )]
    NonUtf8Module(PathBuf),

    #[error("Compiler toolchain not available: {0}")]
    MissingToolchain(String),

    #[error("Compilation failed ({status}): {stderr}")]
    CompileFailed { status: String, stderr: String },
}

pub type Result<T> = std::result::Result<T, SealError>;
