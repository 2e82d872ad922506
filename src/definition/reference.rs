use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
#[error("invalid package reference `{reference}`: {reason}")]
pub struct ReferenceError {
    pub reference: String,
    pub reason: &'static str,
}

/// `name/version[@user/channel]`
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Reference {
    pub name: String,
    pub version: String,
    pub user: Option<String>,
    pub channel: Option<String>,
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = |reason| ReferenceError {
            reference: input.to_string(),
            reason,
        };

        let (package, namespace) = match input.split_once('@') {
            Some((package, namespace)) => (package, Some(namespace)),
            None => (input, None),
        };

        let (name, version) = package
            .split_once('/')
            .ok_or_else(|| err("expected name/version"))?;

        if name.is_empty() || version.is_empty() || version.contains('/') {
            return Err(err("expected name/version"));
        }

        let (user, channel) = match namespace {
            None => (None, None),
            Some(namespace) => {
                let (user, channel) = namespace
                    .split_once('/')
                    .ok_or_else(|| err("expected user/channel after @"))?;

                if user.is_empty() || channel.is_empty() || channel.contains('/') {
                    return Err(err("expected user/channel after @"));
                }

                (Some(user.to_string()), Some(channel.to_string()))
            }
        };

        Ok(Reference {
            name: name.to_string(),
            version: version.to_string(),
            user,
            channel,
        })
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;

        if let (Some(user), Some(channel)) = (&self.user, &self.channel) {
            write!(f, "@{}/{}", user, channel)?;
        }

        Ok(())
    }
}
