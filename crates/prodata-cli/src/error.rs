use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Infra(#[from] prodata_infra::Error),

    #[error(transparent)]
    Api(#[from] prodata_api::Error),

    #[error("state file {}: {source}", .path.display())]
    StateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {} is not valid: {source}", .path.display())]
    StateFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("state file {} holds a {found}, expected a {expected}", .path.display())]
    WrongKind {
        path: PathBuf,
        expected: &'static str,
        found: &'static str,
    },

    #[error("no state at {}; nothing is managed there yet", .path.display())]
    NoState { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, CliError>;
