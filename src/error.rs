use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no matching device")]
    NoDevice,

    #[error("capability probe failed: {0}")]
    Probe(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("unknown subsystem: {0}")]
    UnknownSubsystem(String),

    #[error("unknown event source: {0}")]
    UnknownSource(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("monitor is already receiving")]
    AlreadyReceiving,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OS error: {0}")]
    Os(#[from] nix::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
