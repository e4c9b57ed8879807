//! Fan-in messages (participant → coordinator).

use std::{fmt, str::FromStr};

use anyhow::{anyhow, ensure};

use crate::{
    message::{
        traits::{device_name_token, parse_line},
        DecodeError,
        FromBytes,
        ToBytes,
    },
    DeviceName,
};

/// A message pushed by a participant onto the fan-in channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Request registration under the given name. Legal only while the
    /// coordinator is in its manual phase; repeating it is idempotent.
    Hello { name: DeviceName },
    /// The device reached its finished phase.
    Finished { name: DeviceName },
    /// The device loaded the announced section and is ready again.
    Ready { name: DeviceName },
    /// Request a global abort of the run.
    Abort,
    /// The embedding controller declared its own work done, arming the
    /// coordinator's finish timeout.
    MasterFinished,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Report::Hello { name } => write!(f, "hello {}", name),
            Report::Finished { name } => write!(f, "fin {}", name),
            Report::Ready { name } => write!(f, "rdy {}", name),
            Report::Abort => write!(f, "abort"),
            Report::MasterFinished => write!(f, "master_finished"),
        }
    }
}

impl FromStr for Report {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let kind = tokens.next().ok_or_else(|| anyhow!("empty report"))?;
        let report = match kind {
            "hello" => Report::Hello {
                name: device_name_token(&mut tokens)?,
            },
            "fin" => Report::Finished {
                name: device_name_token(&mut tokens)?,
            },
            "rdy" => Report::Ready {
                name: device_name_token(&mut tokens)?,
            },
            "abort" => Report::Abort,
            "master_finished" => Report::MasterFinished,
            _ => return Err(anyhow!("unknown report kind `{}`", kind)),
        };
        ensure!(
            tokens.next().is_none(),
            "trailing tokens after `{}` report",
            kind
        );
        Ok(report)
    }
}

impl ToBytes for Report {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl FromBytes for Report {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        parse_line(buffer.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> DeviceName {
        s.parse().unwrap()
    }

    #[test]
    fn parse_registration() {
        let report = Report::from_bytes(&b"hello shutter-3").unwrap();
        assert_eq!(
            report,
            Report::Hello {
                name: name("shutter-3")
            }
        );
    }

    #[test]
    fn parse_bare_kinds() {
        assert_eq!(Report::from_bytes(&b"abort").unwrap(), Report::Abort);
        assert_eq!(
            Report::from_bytes(&b"master_finished\n").unwrap(),
            Report::MasterFinished
        );
    }

    #[test]
    fn serialize_phase_reports() {
        let fin = Report::Finished { name: name("d1") };
        assert_eq!(fin.to_bytes(), b"fin d1".to_vec());
        let rdy = Report::Ready { name: name("d1") };
        assert_eq!(rdy.to_bytes(), b"rdy d1".to_vec());
    }

    #[test]
    fn reject_malformed_reports() {
        assert!(Report::from_bytes(&b"").is_err());
        assert!(Report::from_bytes(&b"hello").is_err());
        assert!(Report::from_bytes(&b"fin d1 d2").is_err());
        assert!(Report::from_bytes(&b"resume d1").is_err());
        assert!(Report::from_bytes(&[0xff, 0xfe]).is_err());
    }
}
