// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session state persisted between runs.

use serde::{Deserialize, Serialize};

use super::roles::Role;

/// How the `Authorization` header carried the token on the last request the
/// backend accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderFormat {
    /// `Authorization: Bearer <token>`
    WithBearer,
    /// `Authorization: <token>`
    WithoutBearer,
}

impl HeaderFormat {
    /// Value written to persistent storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderFormat::WithBearer => "withBearer",
            HeaderFormat::WithoutBearer => "withoutBearer",
        }
    }

    pub fn parse(s: &str) -> Option<HeaderFormat> {
        match s {
            "withBearer" => Some(HeaderFormat::WithBearer),
            "withoutBearer" => Some(HeaderFormat::WithoutBearer),
            _ => None,
        }
    }

    /// Render the header value for a raw token.
    pub fn header_value(&self, raw_token: &str) -> String {
        match self {
            HeaderFormat::WithBearer => format!("Bearer {raw_token}"),
            HeaderFormat::WithoutBearer => raw_token.to_string(),
        }
    }
}

impl std::fmt::Display for HeaderFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user's session.
///
/// Every field is optional. A field that was never written is `None`; a field
/// the backend sent as an empty string is `Some("")`. Callers that care about
/// the difference can tell them apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub bearer_token: Option<String>,
    pub user_id: Option<String>,
    pub user_role: Option<Role>,
    pub email: Option<String>,
    pub chosen_header_format: Option<HeaderFormat>,
}

impl Session {
    /// The stored token, if it is present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.bearer_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_value_formats() {
        assert_eq!(HeaderFormat::WithBearer.header_value("abc"), "Bearer abc");
        assert_eq!(HeaderFormat::WithoutBearer.header_value("abc"), "abc");
    }

    #[test]
    fn header_format_storage_round_trip() {
        for format in [HeaderFormat::WithBearer, HeaderFormat::WithoutBearer] {
            assert_eq!(HeaderFormat::parse(format.as_str()), Some(format));
        }
        assert_eq!(HeaderFormat::parse("bearer"), None);
    }

    #[test]
    fn empty_token_is_not_signed_in() {
        let session = Session {
            bearer_token: Some(String::new()),
            ..Default::default()
        };
        assert!(!session.is_signed_in());
        assert_eq!(session.token(), None);
    }
}
