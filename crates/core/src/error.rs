//! Error taxonomy shared by the query builder and the shell.

/// Failures a market lookup can surface to a caller
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// Resource locator does not look like `boamp://market/<idweb>`
    #[error("Invalid resource URI: {0}")]
    InvalidLocator(String),

    /// The backend returned no row for the requested identifier
    #[error("Market with identifier {0} not found")]
    NotFound(String),

    /// Transport or HTTP failure talking to the backend
    #[error("BOAMP API error: {0}")]
    Backend(String),

    /// The caller named a tool this server does not implement
    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
