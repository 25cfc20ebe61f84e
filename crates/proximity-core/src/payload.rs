//! Binary attribute payloads exchanged with the world model.
//!
//! Identifier payloads are 17 bytes: a one-byte physical-layer tag followed
//! by a 16-byte big-endian identifier. Link median values are a single
//! big-endian IEEE-754 double.

use crate::error::{Error, Result};
use crate::types::{ReceiverId, Rss, TransmitterId};

/// Size of an identifier payload (tag + u128).
pub const ID_PAYLOAD_LEN: usize = 17;

/// Size of a link median RSS payload.
pub const RSS_PAYLOAD_LEN: usize = 8;

/// Physical-layer tag written into emitted proximity payloads.
pub const DEFAULT_PHY: u8 = 0;

/// Decode the identifier carried in a `sensor.*` attribute.
pub fn decode_id(data: &[u8]) -> Result<u128> {
    if data.len() != ID_PAYLOAD_LEN {
        return Err(Error::PayloadLength {
            expected: ID_PAYLOAD_LEN,
            actual: data.len(),
        });
    }
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&data[1..]);
    Ok(u128::from_be_bytes(raw))
}

/// Encode an identifier with the given physical-layer tag.
pub fn encode_id(phy: u8, id: u128) -> [u8; ID_PAYLOAD_LEN] {
    let mut out = [0u8; ID_PAYLOAD_LEN];
    out[0] = phy;
    out[1..].copy_from_slice(&id.to_be_bytes());
    out
}

/// Decode a transmitter id from a sensor attribute payload.
pub fn decode_transmitter(data: &[u8]) -> Result<TransmitterId> {
    decode_id(data).map(TransmitterId)
}

/// Encode a proximity attribute payload. `None` is written as receiver 0.
pub fn encode_proximity(closest: Option<ReceiverId>) -> [u8; ID_PAYLOAD_LEN] {
    encode_id(DEFAULT_PHY, closest.map_or(0, ReceiverId::get))
}

/// Decode a proximity attribute payload. Receiver 0 decodes to `None`.
pub fn decode_proximity(data: &[u8]) -> Result<Option<ReceiverId>> {
    let id = decode_id(data)?;
    Ok(ReceiverId::new(id).ok())
}

/// Decode a link median RSS value. NaN and infinities are rejected.
pub fn decode_rss(data: &[u8]) -> Result<Rss> {
    let raw: [u8; RSS_PAYLOAD_LEN] = data.try_into().map_err(|_| Error::PayloadLength {
        expected: RSS_PAYLOAD_LEN,
        actual: data.len(),
    })?;
    let rss = f64::from_be_bytes(raw);
    if !rss.is_finite() {
        return Err(Error::NonFiniteRss(rss));
    }
    Ok(rss)
}

/// Encode a link median RSS value.
pub fn encode_rss(rss: Rss) -> [u8; RSS_PAYLOAD_LEN] {
    rss.to_be_bytes()
}

/// Split a `<root>.<txid>.<rxid>` link key into its identifiers.
///
/// The root may itself contain dots; the last two components are the ids.
pub fn parse_link_key(key: &str) -> Result<(TransmitterId, ReceiverId)> {
    let malformed = || Error::MalformedLinkKey(key.to_string());

    let mut parts = key.rsplitn(3, '.');
    let rx = parts.next().ok_or_else(malformed)?;
    let tx = parts.next().ok_or_else(malformed)?;
    match parts.next() {
        Some(root) if !root.is_empty() => {}
        _ => return Err(malformed()),
    }

    let txid = tx.parse::<u128>().map_err(|_| malformed())?;
    let rxid = rx.parse::<u128>().map_err(|_| malformed())?;
    let rxid = ReceiverId::new(rxid).map_err(|_| malformed())?;
    Ok((TransmitterId(txid), rxid))
}

/// Build a link key for the given root and pair.
pub fn link_key(root: &str, txid: TransmitterId, rxid: ReceiverId) -> String {
    format!("{}.{}.{}", root, txid, rxid)
}
