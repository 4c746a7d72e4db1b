use serde::{Deserialize, Serialize};

/// Form body for `POST /1/messages.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Message<'a> {
    pub token: &'a str,
    pub user: &'a str,
    pub priority: i8,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
}

/// Response body. `status` is 1 on success; on failure `errors` lists the reasons.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub status: i32,
    #[serde(default)]
    pub request: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl MessageResponse {
    pub fn is_accepted(&self) -> bool {
        self.status == 1
    }
}
