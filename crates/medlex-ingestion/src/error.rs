use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document ended inside a citation subtree")]
    TruncatedDocument,

    /// The one fatal per-citation condition: no root-level PMID.
    #[error("citation is missing its PMID")]
    MissingPmid,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Db(#[from] medlex_db::DbError),

    #[error("worker task failed: {0}")]
    Task(String),
}
