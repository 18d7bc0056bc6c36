use thiserror::Error;

/// Failures that end a run: the browser engine, the checkpoint store, or the output file.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser engine failed to start: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("navigation to {url} failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("could not read page markup: {0}")]
    Markup(String),

    #[error("invalid scrape configuration: {0}")]
    Selectors(#[from] ExtractionError),

    #[error("run cancelled after {recorded} recorded products")]
    Cancelled { recorded: usize },

    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] rusqlite::Error),

    #[error("checkpoint entry for {url} is corrupt: {source}")]
    CorruptCheckpoint {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures inside a single extraction rule or listing item. Never fatal to a run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("no element matches `{0}`")]
    Missing(String),

    #[error("expected at least {expected} `{selector}` elements, found {found}")]
    TooFew {
        selector: String,
        expected: usize,
        found: usize,
    },

    #[error("could not parse {what} from {text:?}")]
    Unparsable { what: &'static str, text: String },

    #[error("unexpected number of detail blocks: {0}")]
    UnexpectedBlockCount(usize),

    #[error("rule `{rule}` returned {got} values for {expected} fields")]
    Arity {
        rule: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("rule panicked: {0}")]
    Panicked(String),

    #[error("listing item has no link")]
    NoHref,

    #[error("invalid product url {href:?}: {reason}")]
    InvalidUrl { href: String, reason: String },
}

pub type ExtractResult<T> = Result<T, ExtractionError>;
