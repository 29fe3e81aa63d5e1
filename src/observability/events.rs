//! Observable events
//!
//! Every lifecycle point the engine logs has a variant here; log lines use
//! the `as_str` form as their `event` key.

use std::fmt;

/// Observable events in kek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Space
    /// Kekspace record written
    SpaceInitialized,
    /// Configuration file loaded
    ConfigLoaded,

    // Document lifecycle
    DocumentCreateBegin,
    DocumentCreateCommit,
    DocumentCreateFailed,
    DocumentUpdateBegin,
    DocumentUpdateCommit,
    DocumentUpdateFailed,
    DocumentDeleteBegin,
    DocumentDeleteCommit,
    DocumentDeleteFailed,
    /// Markers and chain left behind by an interrupted delete were removed
    DocumentRemnantsPurged,

    // Revision chain
    /// Chain started with its genesis block
    ChainCreated,
    /// Block appended to a chain
    ChainAppend,
    /// Chain failed verification
    ChainVerifyFailed,

    // Attribute index
    /// Markers written for a document
    IndexWrite,
    /// Markers removed for a document
    IndexRemove,

    // Query
    QueryBegin,
    QueryComplete,
    QueryFailed,
    /// Predicate with an operator other than `=`; contributes no matches
    QueryOperatorIgnored,

    // Repair
    RepairBegin,
    RepairComplete,

    /// A fan-out task failed after another task's error was already chosen
    TaskErrorSuppressed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SpaceInitialized => "SPACE_INITIALIZED",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::DocumentCreateBegin => "DOCUMENT_CREATE_BEGIN",
            Event::DocumentCreateCommit => "DOCUMENT_CREATE_COMMIT",
            Event::DocumentCreateFailed => "DOCUMENT_CREATE_FAILED",
            Event::DocumentUpdateBegin => "DOCUMENT_UPDATE_BEGIN",
            Event::DocumentUpdateCommit => "DOCUMENT_UPDATE_COMMIT",
            Event::DocumentUpdateFailed => "DOCUMENT_UPDATE_FAILED",
            Event::DocumentDeleteBegin => "DOCUMENT_DELETE_BEGIN",
            Event::DocumentDeleteCommit => "DOCUMENT_DELETE_COMMIT",
            Event::DocumentDeleteFailed => "DOCUMENT_DELETE_FAILED",
            Event::DocumentRemnantsPurged => "DOCUMENT_REMNANTS_PURGED",

            Event::ChainCreated => "CHAIN_CREATED",
            Event::ChainAppend => "CHAIN_APPEND",
            Event::ChainVerifyFailed => "CHAIN_VERIFY_FAILED",

            Event::IndexWrite => "INDEX_WRITE",
            Event::IndexRemove => "INDEX_REMOVE",

            Event::QueryBegin => "QUERY_BEGIN",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryFailed => "QUERY_FAILED",
            Event::QueryOperatorIgnored => "QUERY_OPERATOR_IGNORED",

            Event::RepairBegin => "REPAIR_BEGIN",
            Event::RepairComplete => "REPAIR_COMPLETE",

            Event::TaskErrorSuppressed => "TASK_ERROR_SUPPRESSED",
        }
    }

    /// Returns true if this event reports a failed operation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::DocumentCreateFailed
                | Event::DocumentUpdateFailed
                | Event::DocumentDeleteFailed
                | Event::ChainVerifyFailed
                | Event::QueryFailed
                | Event::TaskErrorSuppressed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
