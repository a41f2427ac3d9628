use serde::{Deserialize, Serialize};

/// Body for `POST /api/auth/signup`. Absent fields read as empty
/// strings; the handler decides the status, never the deserializer.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Body for `POST /api/auth/login`. Same field defaults as signup.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Returned by signup and login; the token is the only session state there is.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_deserialize_as_empty() {
        let signup: SignupRequest = serde_json::from_str(r#"{"username":"ghost"}"#).unwrap();
        assert_eq!(signup.username, "ghost");
        assert_eq!(signup.password, "");

        let login: LoginRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(login.username, "");
        assert_eq!(login.password, "");
    }
}
