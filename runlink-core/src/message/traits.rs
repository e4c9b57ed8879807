//! Message codec traits.

use std::str::FromStr;

use anyhow::Context;

use crate::message::DecodeError;

/// An interface for serializable message types.
///
/// See also [`FromBytes`] for deserialization.
pub trait ToBytes {
    /// Serialize the message into one wire line, without the trailing
    /// newline.
    fn to_bytes(&self) -> Vec<u8>;
}

/// An interface for deserializable message types.
///
/// See also [`ToBytes`] for serialization.
pub trait FromBytes: Sized {
    /// Deserialize the message from one wire line.
    ///
    /// # Errors
    /// Fails if the buffer is not ASCII or does not match the message
    /// grammar.
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError>;
}

/// Decode one wire line: check the encoding, strip the line ending,
/// then hand the token string to the message's `FromStr`.
pub(crate) fn parse_line<M>(buffer: &[u8]) -> Result<M, DecodeError>
where
    M: FromStr,
    M::Err: Into<DecodeError>,
{
    let line = std::str::from_utf8(buffer).context("message is not valid UTF-8")?;
    line.trim_end_matches(|c: char| c == '\r' || c == '\n')
        .parse()
        .map_err(Into::into)
}

/// Pull the `<name>` token that follows `hello`, `fin` and `rdy`.
pub(crate) fn device_name_token<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<crate::DeviceName, DecodeError> {
    tokens
        .next()
        .context("missing device name")?
        .parse()
        .context("invalid device name")
}
