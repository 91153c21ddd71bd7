use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BrowseError {
    #[error("authentication failed: {0}")]
    #[diagnostic(help("check the username and password"))]
    BadCredentials(String),

    #[error("no access to server: {0}")]
    #[diagnostic(help("the account exists but is not allowed to log in to this server"))]
    NoAccess(String),

    #[error("invalid server address: {0}")]
    #[diagnostic(help("use a URI such as https://omero.example.org or host:port"))]
    BadUrl(String),

    #[error("server unreachable: {0}")]
    #[diagnostic(help("check the network connection and that the server is running"))]
    Unreachable(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("access denied to {0}")]
    AccessDenied(String),

    #[error("OMERO request failed: {0}")]
    Http(String),

    #[error("OMERO returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed OMERO response: {0}")]
    MalformedResponse(String),

    #[error("keys present more than once on the server: {}", .0.join(", "))]
    #[diagnostic(help(
        "resolve the duplicates on the server or push with the delete policy"
    ))]
    AmbiguousKeys(Vec<String>),

    #[error("invalid object URI: {0}")]
    InvalidUri(String),

    #[error("unknown object type: {0}")]
    UnknownObjectType(String),

    #[error("invalid merge policy: {0}")]
    InvalidPolicy(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl BrowseError {
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            BrowseError::BadCredentials(_)
                | BrowseError::NoAccess(_)
                | BrowseError::BadUrl(_)
                | BrowseError::Unreachable(_)
        )
    }
}
