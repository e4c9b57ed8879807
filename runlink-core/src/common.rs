//! Items shared by the coordinator and the participants.

use std::{convert::TryFrom, fmt, str::FromStr};

use thiserror::Error;

/// Default port of the fan-in endpoint (participants → coordinator).
pub const FAN_IN_PORT: u16 = 43227;

/// Default port of the fan-out endpoint (coordinator → participants).
pub const FAN_OUT_PORT: u16 = 43228;

/// The name under which a device registers with the coordinator.
///
/// Names are opaque to the protocol but must survive the wire format:
/// a non-empty run of printable ASCII characters with no whitespace,
/// since messages are space-delimited lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceName(String);

/// Error returned when a device name does not fit the wire format.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidDeviceName {
    #[error("device names must not be empty")]
    Empty,
    #[error("device names must be printable ASCII without whitespace")]
    ForbiddenCharacter,
}

impl DeviceName {
    /// Validate `name` as a device name.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidDeviceName> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidDeviceName::Empty);
        }
        if !name.bytes().all(|byte| byte.is_ascii_graphic()) {
            return Err(InvalidDeviceName::ForbiddenCharacter);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceName {
    type Err = InvalidDeviceName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for DeviceName {
    type Error = InvalidDeviceName;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl AsRef<str> for DeviceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_printable_ascii() {
        assert!(DeviceName::new("pulse-gen_01").is_ok());
        assert!(DeviceName::new("d1").is_ok());
    }

    #[test]
    fn rejects_empty_names() {
        assert_eq!(DeviceName::new(""), Err(InvalidDeviceName::Empty));
    }

    #[test]
    fn rejects_whitespace_and_non_ascii() {
        assert_eq!(
            DeviceName::new("two words"),
            Err(InvalidDeviceName::ForbiddenCharacter)
        );
        assert_eq!(
            DeviceName::new("line\nfeed"),
            Err(InvalidDeviceName::ForbiddenCharacter)
        );
        assert_eq!(
            DeviceName::new("käfig"),
            Err(InvalidDeviceName::ForbiddenCharacter)
        );
    }
}
