//! Session action kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a session does with the holder's attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Issue new credentials to the holder.
    Issuing,
    /// Ask the holder to disclose attributes.
    Disclosing,
    /// Ask the holder to sign a message with attributes.
    Signing,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Issuing => "issuing",
            Action::Disclosing => "disclosing",
            Action::Signing => "signing",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Action::Issuing).unwrap(), "\"issuing\"");
        let action: Action = serde_json::from_str("\"signing\"").unwrap();
        assert_eq!(action, Action::Signing);
        assert_eq!(Action::Disclosing.to_string(), "disclosing");
    }
}
