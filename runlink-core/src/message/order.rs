//! Fan-out messages (coordinator → participants).

use std::{fmt, str::FromStr};

use anyhow::{anyhow, ensure, Context};

use crate::{
    message::{
        traits::{device_name_token, parse_line},
        DecodeError,
        FromBytes,
        ToBytes,
    },
    DeviceName,
};

/// A message broadcast by the coordinator to every participant.
///
/// Orders are not addressed: each participant interprets every order
/// relative to its own local phase. The one exception is the
/// registration echo [`Hello`], which carries the registered name and
/// is only acted on by the participant owning that name.
///
/// [`Hello`]: Order::Hello
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    /// Invitation to (re-)register, broadcast when the coordinator
    /// comes up.
    Greet,
    /// Registration echo confirming that the named device is known.
    Hello { name: DeviceName },
    /// Begin or resume the current section. Requires the local ready
    /// phase.
    Start,
    /// Prepare the given section. Requires the local finished phase;
    /// participants answer with a `rdy` report.
    Load { section: u32 },
    /// The run is complete, return to the manual phase.
    Exit,
    /// Abandon the run immediately, return to the manual phase.
    Abort,
    /// Tear the participant down.
    Shutdown,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Order::Greet => write!(f, "greet"),
            Order::Hello { name } => write!(f, "hello {}", name),
            Order::Start => write!(f, "start"),
            Order::Load { section } => write!(f, "load {}", section),
            Order::Exit => write!(f, "exit"),
            Order::Abort => write!(f, "abort"),
            Order::Shutdown => write!(f, "shutdown"),
        }
    }
}

impl FromStr for Order {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let kind = tokens.next().ok_or_else(|| anyhow!("empty order"))?;
        let order = match kind {
            "greet" => Order::Greet,
            "hello" => Order::Hello {
                name: device_name_token(&mut tokens)?,
            },
            "start" => Order::Start,
            "load" => Order::Load {
                section: tokens
                    .next()
                    .context("missing section id")?
                    .parse()
                    .context("invalid section id")?,
            },
            "exit" => Order::Exit,
            "abort" => Order::Abort,
            "shutdown" => Order::Shutdown,
            _ => return Err(anyhow!("unknown order kind `{}`", kind)),
        };
        ensure!(
            tokens.next().is_none(),
            "trailing tokens after `{}` order",
            kind
        );
        Ok(order)
    }
}

impl ToBytes for Order {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl FromBytes for Order {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        parse_line(buffer.as_ref())
    }
}
