pub mod command;
pub mod dedup;
pub mod executor;
pub mod holes;
pub mod host;
pub mod planner;
pub mod query;
pub mod session;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("no active document")]
        NoActiveDocument,
        #[error("document #{0} is not open")]
        DocumentNotOpen(usize),
        #[error("no open document title contains {pattern:?}")]
        MissingSourceDocument { pattern: String },
        #[error("family {name:?} not found in document {document:?}")]
        MissingFamilyTemplate { name: String, document: String },
        #[error("no non-template 3D view in document {document:?}")]
        Missing3DView { document: String },
        #[error("view {0} is not a usable 3D view")]
        InvalidView(u64),
        #[error("element with id {0} not found")]
        ElementNotFound(u64),
        #[error("instance {instance} has no parameter {label:?}")]
        ParameterNotFound { instance: u64, label: String },
        #[error("invalid placement: {0}")]
        InvalidPlacement(String),
        #[error("transaction {name:?} rolled back: {source}")]
        TransactionRolledBack {
            name: String,
            #[source]
            source: Box<EngineError>,
        },
    }

    impl EngineError {
        /// 前置条件失败：发生在任何事务打开之前。
        pub fn is_precondition(&self) -> bool {
            matches!(
                self,
                EngineError::NoActiveDocument
                    | EngineError::MissingSourceDocument { .. }
                    | EngineError::MissingFamilyTemplate { .. }
                    | EngineError::Missing3DView { .. }
            )
        }
    }
}
