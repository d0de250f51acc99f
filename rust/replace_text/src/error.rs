use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("unsupported pattern flag '{0}'")]
    UnsupportedFlag(char),
    #[error("pattern flag '{0}' given more than once")]
    DuplicateFlag(char),
    #[error("failed to read rules file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rules file: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
