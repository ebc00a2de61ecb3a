/*
 * Responsibility
 * - 署名付きセッショントークンの claims 型 (SessionToken)
 * - ログイン時だけ渡される identity provider 側の型 (ProviderUser / ProviderAccount)
 * - handler/page に見せる読み取り専用の SessionView
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried by the signed session token.
///
/// The four identity fields are copied from the provider once, at first login, and then
/// travel unchanged through every refresh. `iat`/`exp`/`jti` are stamped when sealing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "name", default)]
    pub display_name: Option<String>,
    #[serde(rename = "picture", default)]
    pub avatar_ref: Option<String>,

    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Profile returned by the identity provider on the login exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Provider account linked on the login exchange.
///
/// Only its presence matters to the issuer; the fields are kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAccount {
    pub provider: String,
    pub provider_account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Request-scoped projection of a session token. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub user: SessionUser,
    pub expires: DateTime<Utc>,
}
