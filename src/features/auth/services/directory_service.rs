use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::config::DirectoryEntry;
use crate::core::error::{AppError, Result};
use crate::features::auth::models::AuthenticatedCaller;
use crate::shared::types::RegionScope;

/// Credential check boundary. The engine only needs a caller id and its
/// region scope back; where the directory lives is the caller's concern.
#[async_trait]
pub trait ScopeDirectory: Send + Sync {
    async fn authenticate(&self, emp_no: &str, password: &str) -> Result<AuthenticatedCaller>;
}

/// Directory backed by the entries loaded from configuration.
pub struct StaticScopeDirectory {
    entries: Vec<DirectoryEntry>,
}

impl StaticScopeDirectory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl ScopeDirectory for StaticScopeDirectory {
    async fn authenticate(&self, emp_no: &str, password: &str) -> Result<AuthenticatedCaller> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.emp_no == emp_no && e.password == password);

        match entry {
            Some(entry) => {
                let scope = RegionScope::parse(&entry.region);
                info!(caller = %entry.emp_no, scope = %scope, "caller authenticated");
                Ok(AuthenticatedCaller {
                    caller_id: entry.emp_no.clone(),
                    scope,
                })
            }
            None => {
                warn!(caller = %emp_no, "authentication rejected");
                Err(AppError::Auth("invalid employee number or password".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticScopeDirectory {
        StaticScopeDirectory::new(vec![
            DirectoryEntry {
                emp_no: "E100".to_string(),
                password: "najran-pass".to_string(),
                region: "Najran".to_string(),
            },
            DirectoryEntry {
                emp_no: "E000".to_string(),
                password: "hq-pass".to_string(),
                region: "ALL".to_string(),
            },
        ])
    }

    #[tokio::test]
    async fn test_authenticate_resolves_region_scope() {
        let caller = directory().authenticate("E100", "najran-pass").await.unwrap();
        assert_eq!(caller.caller_id, "E100");
        assert_eq!(caller.scope, RegionScope::Region("Najran".to_string()));
    }

    #[tokio::test]
    async fn test_authenticate_resolves_elevated_scope() {
        let caller = directory().authenticate("E000", "hq-pass").await.unwrap();
        assert!(caller.scope.is_all());
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let err = directory().authenticate("E100", "guess").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn test_unknown_caller_is_rejected() {
        let err = directory().authenticate("E999", "najran-pass").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }
}
