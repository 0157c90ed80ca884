//! Heat network registration model.

use serde::{Deserialize, Serialize};

/// A registered heat network. `hn_id` is the externally visible sequenced id;
/// `id` is the store-assigned document id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatNetwork {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hn_id: Option<String>,
    pub location: String,
    pub name: String,
}

/// Request body for registering a new heat network. A blank `hn_id` asks the
/// service to mint one from the heat network sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHeatNetworkRequest {
    #[serde(default)]
    pub hn_id: Option<String>,
    pub location: String,
    pub name: String,
}
