use serde::Serialize;

use crate::shared::types::RegionScope;

/// A caller whose credentials resolved against the directory. The scope is
/// fixed at login and passed explicitly into every service call.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedCaller {
    pub caller_id: String,
    #[serde(serialize_with = "serialize_scope")]
    pub scope: RegionScope,
}

fn serialize_scope<S>(scope: &RegionScope, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&scope.to_string())
}
