use thiserror::Error;

use duobundle_core::{DomainError, GlobalId};

use crate::client::{ClientError, UserError};
use crate::mapper::ProductRole;

/// Why a mapping sync did not complete. No metafield is written in any case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// A product involved in the bundle has no variants at all.
    #[error("{0} has no variants")]
    NoVariants(ProductRole),

    /// A product involved in the bundle no longer exists on the platform.
    #[error("{role} {id} was not found")]
    ProductNotFound { role: ProductRole, id: GlobalId },

    /// Some bundle variants matched no variant of one of the components.
    #[error("no component variants match: {}", .unmapped.join(", "))]
    Unmapped { unmapped: Vec<String> },

    /// A computed mapping broke a domain invariant.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The platform could not be reached or answered unexpectedly.
    #[error("platform request failed: {0}")]
    Client(#[from] ClientError),

    /// The platform refused the metafield write; errors are passed on verbatim.
    #[error("platform rejected metafield write: {}", join_user_errors(.0))]
    WriteRejected(Vec<UserError>),
}

fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_lists_every_identifier() {
        let err = MappingError::Unmapped {
            unmapped: vec!["obsidian blue".into(), "sand".into()],
        };
        assert_eq!(err.to_string(), "no component variants match: obsidian blue, sand");
    }

    #[test]
    fn write_rejected_joins_user_errors() {
        let err = MappingError::WriteRejected(vec![
            UserError {
                field: vec!["metafields".into(), "0".into()],
                message: "owner not found".into(),
                code: Some("INVALID".into()),
            },
            UserError {
                field: vec![],
                message: "quota".into(),
                code: None,
            },
        ]);
        assert_eq!(
            err.to_string(),
            "platform rejected metafield write: metafields.0: owner not found; quota"
        );
    }
}
