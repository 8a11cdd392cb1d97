use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

/// A single message in a conversation, as stored by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
}

#[derive(Deserialize)]
struct ConversationResponse {
    conversation: Option<Vec<ChatMessage>>,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    name: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
}

// Login returns the plural field name; that is the backend's actual shape.
#[derive(Deserialize)]
struct LoginResponse {
    conversations: Option<Vec<ChatMessage>>,
}

/// HTTP client for the chat backend. All four operations share one base URL.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the stored conversation for an identifier. `None` means the
    /// backend has no history field for this user yet.
    pub async fn fetch_history(&self, user_id: &str) -> Result<Option<Vec<ChatMessage>>> {
        let url = format!("{}/chat/{}", self.base_url, user_id);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("history request failed with status: {}", response.status()));
        }

        let body: ConversationResponse = response.json().await?;
        Ok(body.conversation)
    }

    /// Send one message and get back the authoritative conversation.
    pub async fn send_message(&self, user_id: &str, message: &str) -> Result<Option<Vec<ChatMessage>>> {
        let url = format!("{}/chat", self.base_url);

        let request = SendRequest { message, user_id };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("send failed with status: {}", response.status()));
        }

        let body: ConversationResponse = response.json().await?;
        Ok(body.conversation)
    }

    /// Register a new user by display name. Returns the server-issued id.
    pub async fn register(&self, name: &str) -> Result<String> {
        let url = format!("{}/chat/register", self.base_url);

        let request = RegisterRequest { name };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("registration failed with status: {}", response.status()));
        }

        let body: RegisterResponse = response.json().await?;
        Ok(body.user_id)
    }

    /// Log in with a name and an existing id. Returns the stored conversation,
    /// which may be empty for a user who registered but never chatted.
    pub async fn login(&self, name: &str, user_id: &str) -> Result<Vec<ChatMessage>> {
        let url = format!("{}/chat/login", self.base_url);

        let request = LoginRequest { name, user_id };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("login failed with status: {}", response.status()));
        }

        let body: LoginResponse = response.json().await?;
        Ok(body.conversations.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage {
            role: ChatRole::Assistant,
            content: "hola".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hola"}"#);
    }

    #[test]
    fn roles_deserialize_from_wire_names() {
        let json = r#"[
            {"role":"user","content":"hi"},
            {"role":"assistant","content":"hello"},
            {"role":"system","content":"notice"}
        ]"#;
        let msgs: Vec<ChatMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(msgs[0].role, ChatRole::User);
        assert_eq!(msgs[1].role, ChatRole::Assistant);
        assert_eq!(msgs[2].role, ChatRole::System);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://localhost:5000/api/");
        assert_eq!(client.base_url, "http://localhost:5000/api");
    }
}
