use serde::{Deserialize, Serialize};

/// Login token settings for registered users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAuthConfig {
    /// Environment variable holding the HS256 signing secret.  When unset, a
    /// random per-process secret is generated and tokens do not survive a
    /// restart.
    #[serde(default = "d_jwt_secret_env")]
    pub jwt_secret_env: String,
    #[serde(default = "d_168")]
    pub token_ttl_hours: u32,
    /// Minimum accepted password length at registration.
    #[serde(default = "d_8")]
    pub min_password_len: usize,
}

impl Default for UserAuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret_env: d_jwt_secret_env(),
            token_ttl_hours: 168,
            min_password_len: 8,
        }
    }
}

fn d_jwt_secret_env() -> String {
    "SEOX_JWT_SECRET".into()
}
fn d_168() -> u32 {
    168
}
fn d_8() -> usize {
    8
}
