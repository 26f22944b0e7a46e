//! Network error types.

use thiserror::Error;

use crate::MemberId;

/// Failures on the sharing-network surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    /// The named member is not registered in this network.
    #[error("member {0} is not registered in this network")]
    UnknownMember(MemberId),

    /// The two members have no edge between them.
    #[error("member {member} has no neighbour {neighbour}")]
    NotNeighbours {
        member: MemberId,
        neighbour: MemberId,
    },

    /// A topology description that cannot be loaded. The network keeps its
    /// prior state.
    #[error("malformed topology at line {line}: {reason}")]
    MalformedTopology { line: usize, reason: String },
}
