use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Failed to parse catalog '{name}': {source}")]
    CatalogParse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
