use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};

/// An authenticated operator. Only [`Authenticator::login`] produces one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operator {
    username: String,
}

impl Operator {
    pub fn username(&self) -> &str {
        &self.username
    }

    #[cfg(test)]
    pub(crate) fn for_tests(username: &str) -> Self {
        Self {
            username: username.to_string(),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.username)
    }
}

/// Checks operator credentials against a fixed table.
pub struct Authenticator {
    users: HashMap<String, String>,
}

impl Authenticator {
    pub fn new(users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Operator> {
        let username = username.trim();
        match self.users.get(username) {
            Some(expected) if constant_time_eq(expected.as_bytes(), password.as_bytes()) => {
                log::info!("Operator {username} logged in");
                Ok(Operator {
                    username: username.to_string(),
                })
            }
            _ => {
                log::warn!("Rejected login for {username:?}");
                Err(Error::Unauthorized(username.to_string()))
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
