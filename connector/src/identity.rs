//! Connection identity: who the connector speaks as.

use serde_json::Value;

use crate::envelope::RequestObject;

const USERNAME_UNAUTHORIZED: &str = "unauthorized";
const USERNAME_UNKNOWN: &str = "unknown";

/// Session token or API key, plus an optional access policy tag.
///
/// When both a session and an API key are set the session wins; at most one
/// of them is ever attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Session token, typically `login:token`.
    pub session: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Access policy tag sent as `lbac.policy`.
    pub policy: Option<String>,
}

impl Identity {
    /// Returns a copy of `request` with the identity fields added.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use sendsay_connector::Identity;
    /// use serde_json::json;
    ///
    /// let identity = Identity {
    ///     session: Some("alice:abc".into()),
    ///     api_key: Some("key".into()),
    ///     policy: None,
    /// };
    /// let request = json!({ "action": "ping" }).as_object().cloned().unwrap();
    /// let augmented = identity.apply(&request);
    ///
    /// assert_eq!(augmented["session"], "alice:abc");
    /// assert!(!augmented.contains_key("apikey"));
    /// ```
    pub fn apply(&self, request: &RequestObject) -> RequestObject {
        let mut augmented = request.clone();

        if let Some(session) = non_empty(&self.session) {
            augmented.insert("session".to_string(), Value::from(session));
        } else if let Some(api_key) = non_empty(&self.api_key) {
            augmented.insert("apikey".to_string(), Value::from(api_key));
        }

        if let Some(policy) = non_empty(&self.policy) {
            augmented.insert("lbac.policy".to_string(), Value::from(policy));
        }

        augmented
    }

    /// Returns the account name embedded in the session token.
    ///
    /// Session tokens look like `login:secret`; the login is the shortest
    /// non-empty prefix followed by a `:`. The login never spans a line
    /// break. Without a session this is `unauthorized`, and a token with no
    /// login part yields `unknown`.
    pub fn username(&self) -> &str {
        let Some(session) = non_empty(&self.session) else {
            return USERNAME_UNAUTHORIZED;
        };

        let mut chars = session.char_indices();
        match chars.next() {
            Some((_, first)) if !is_line_terminator(first) => {}
            _ => return USERNAME_UNKNOWN,
        }

        for (index, c) in chars {
            if c == ':' {
                return &session[..index];
            }
            if is_line_terminator(c) {
                break;
            }
        }

        USERNAME_UNKNOWN
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
