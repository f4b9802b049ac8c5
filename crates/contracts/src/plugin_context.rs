//! Plugin execution context
//!
//! Identity and datasource settings a plugin needs to serve a
//! datasource-bound channel.

use serde::{Deserialize, Serialize};

use crate::{ContractError, OrgId};

/// Organization role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    #[default]
    Viewer,
    Editor,
    Admin,
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInUser {
    pub user_id: i64,
    pub org_id: OrgId,
    pub login: String,
    #[serde(default)]
    pub org_role: OrgRole,
}

/// Datasource instance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceSettings {
    pub uid: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub json_data: serde_json::Value,
}

/// Context handed to a plugin call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginContext {
    pub org_id: OrgId,
    pub plugin_id: String,
    pub user: SignedInUser,

    /// None for plugin-level (not datasource-bound) calls
    pub datasource: Option<DataSourceSettings>,
}

/// Resolves plugin contexts
///
/// `Ok(None)` means the datasource is unknown for the user's org.
#[trait_variant::make(ContextProvider: Send)]
pub trait LocalContextProvider {
    async fn get(
        &self,
        plugin_id: &str,
        datasource_uid: &str,
        user: &SignedInUser,
        skip_cache: bool,
    ) -> Result<Option<PluginContext>, ContractError>;
}
