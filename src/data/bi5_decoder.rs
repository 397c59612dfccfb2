/// Decoder for the vendor's LZMA-compressed bi5 tick archives.
///
/// After decompression an archive is a run of 20-byte big-endian records:
///
/// | bytes  | field          | type |
/// |--------|----------------|------|
/// | 0..4   | ms offset      | u32  |
/// | 4..8   | ask (fixed pt) | u32  |
/// | 8..12  | bid (fixed pt) | u32  |
/// | 12..16 | ask volume     | f32  |
/// | 16..20 | bid volume     | f32  |
///
/// Offsets are relative to the archive's base time (midnight for daily
/// archives, the hour start for hourly ones). A short trailing fragment is
/// ignored.
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::io::Cursor;
use tracing::error;

use crate::error::{CatchupError, Result};
use crate::types::{TickRecord, TICK_SOURCE};

pub const RECORD_SIZE: usize = 20;

const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

/// Fixed-point scale the vendor applies to prices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceScale {
    /// Yen-quoted pairs, 3 decimal places
    Jpy,
    /// Everything else, 5 decimal places
    Standard,
}

impl PriceScale {
    pub fn for_symbol(symbol: &str) -> Self {
        if symbol.to_uppercase().contains("JPY") {
            PriceScale::Jpy
        } else {
            PriceScale::Standard
        }
    }

    pub fn decimal_places(&self) -> u32 {
        match self {
            PriceScale::Jpy => 3,
            PriceScale::Standard => 5,
        }
    }

    pub fn apply(&self, raw: u32) -> Decimal {
        Decimal::new(i64::from(raw), self.decimal_places())
    }
}

/// Decode an archive into ticks. Never fails: malformed input is logged and
/// yields an empty sequence.
pub fn decode(bytes: &[u8], symbol: &str, base_time: DateTime<Utc>) -> Vec<TickRecord> {
    if bytes.is_empty() {
        return Vec::new();
    }

    match try_decode(bytes, symbol, base_time) {
        Ok(ticks) => ticks,
        Err(e) => {
            error!("Error parsing bi5 data for {} at {}: {}", symbol, base_time, e);
            Vec::new()
        }
    }
}

pub fn try_decode(bytes: &[u8], symbol: &str, base_time: DateTime<Utc>) -> Result<Vec<TickRecord>> {
    let payload = decompress(bytes)?;
    Ok(parse_records(&payload, symbol, base_time))
}

/// Inflate either a legacy `.lzma` stream or an `.xz` container
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Cursor::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() * 4);

    let result = if bytes.starts_with(&XZ_MAGIC) {
        lzma_rs::xz_decompress(&mut reader, &mut out)
    } else {
        lzma_rs::lzma_decompress(&mut reader, &mut out)
    };

    result.map_err(|e| CatchupError::Decompression(format!("{:?}", e)))?;
    Ok(out)
}

/// Interpret decompressed bytes as fixed-size tick records
pub fn parse_records(payload: &[u8], symbol: &str, base_time: DateTime<Utc>) -> Vec<TickRecord> {
    let scale = PriceScale::for_symbol(symbol);

    payload
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| {
            let offset_ms = read_u32(chunk, 0);
            let ask_raw = read_u32(chunk, 4);
            let bid_raw = read_u32(chunk, 8);
            let ask_volume = f32::from_bits(read_u32(chunk, 12));
            let bid_volume = f32::from_bits(read_u32(chunk, 16));

            TickRecord {
                time: base_time + Duration::milliseconds(i64::from(offset_ms)),
                symbol: symbol.to_string(),
                bid: scale.apply(bid_raw),
                ask: scale.apply(ask_raw),
                bid_size: volume_units(bid_volume),
                ask_size: volume_units(ask_volume),
                source: TICK_SOURCE,
            }
        })
        .collect()
}

fn read_u32(chunk: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]])
}

/// Vendor volumes are in millions
fn volume_units(volume: f32) -> i64 {
    (f64::from(volume) * 1_000_000.0).round() as i64
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::RECORD_SIZE;
    use std::io::Cursor;

    /// (ms offset, ask raw, bid raw, ask volume, bid volume)
    pub type RawTick = (u32, u32, u32, f32, f32);

    pub fn encode_records(ticks: &[RawTick]) -> Vec<u8> {
        let mut raw = Vec::with_capacity(ticks.len() * RECORD_SIZE);
        for &(ms, ask, bid, ask_vol, bid_vol) in ticks {
            raw.extend_from_slice(&ms.to_be_bytes());
            raw.extend_from_slice(&ask.to_be_bytes());
            raw.extend_from_slice(&bid.to_be_bytes());
            raw.extend_from_slice(&ask_vol.to_bits().to_be_bytes());
            raw.extend_from_slice(&bid_vol.to_bits().to_be_bytes());
        }
        raw
    }

    pub fn compress(raw: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        lzma_rs::lzma_compress(&mut Cursor::new(raw), &mut out).unwrap();
        out
    }

    /// A compressed archive as the vendor would serve it
    pub fn archive(ticks: &[RawTick]) -> Vec<u8> {
        compress(&encode_records(ticks))
    }
}
