//! Polyline codec with an optional altitude channel
//!
//! The format is the public encoded-polyline algorithm: every value is delta-encoded against
//! the previous point, scaled to an integer, zig-zag folded and emitted as 5-bit chunks with a
//! continuation bit, offset by 63 so each chunk is printable ASCII. When altitude is enabled a
//! third value is interleaved after each (lat, lng) pair.
//!
//! Latitude and longitude use a fixed 1e5 scale; the altitude scale is chosen by the caller
//! (1000 by default, i.e. millimeters). Decoding is lossless with respect to the encoded
//! integers, so `decode(encode(p))` reproduces `p` within `1 / scale`.

use crate::PathPoint;

/// Scale applied to latitude and longitude before rounding
pub const COORDINATE_SCALE: f64 = 1e5;

/// Default altitude scale (millimeter resolution)
pub const DEFAULT_ALTITUDE_SCALE: u32 = 1000;

/// Altitude written for samples whose altitude is still unknown
pub const ALTITUDE_SENTINEL: f64 = -1000.0;

const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION_BIT: i64 = 0x20;
const CHAR_OFFSET: i64 = 63;

/// Scaled values must stay below this magnitude so deltas survive the zig-zag fold
const MAX_SCALED: f64 = (1u64 << 62) as f64;

/// Errors raised while decoding or encoding a polyline
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolylineError {
    #[error("Invalid character {byte:#04x} at offset {offset}")]
    InvalidCharacter { offset: usize, byte: u8 },

    #[error("String ends inside a value starting at offset {offset}")]
    UnterminatedChunk { offset: usize },

    #[error("String ends inside a point starting at offset {offset}")]
    TruncatedTuple { offset: usize },

    #[error("Value starting at offset {offset} overflows 64 bits")]
    Overflow { offset: usize },

    #[error("Point {index} has no altitude; supply a sentinel before encoding")]
    MissingAltitude { index: usize },

    #[error("Point {index} is not finite or too large to encode")]
    ValueOutOfRange { index: usize },
}

/// Encoder/decoder configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolylineCodec {
    include_altitude: bool,
    altitude_scale: u32,
}

impl Default for PolylineCodec {
    fn default() -> Self {
        Self::with_altitude(DEFAULT_ALTITUDE_SCALE)
    }
}

impl PolylineCodec {
    /// Codec for (lat, lng, alt) triples with the given altitude scale
    ///
    /// A scale of zero is treated as one.
    pub fn with_altitude(altitude_scale: u32) -> Self {
        Self {
            include_altitude: true,
            altitude_scale: altitude_scale.max(1),
        }
    }

    /// Codec for plain (lat, lng) pairs, as returned by routing services
    pub fn without_altitude() -> Self {
        Self {
            include_altitude: false,
            altitude_scale: DEFAULT_ALTITUDE_SCALE,
        }
    }

    #[inline]
    pub fn includes_altitude(&self) -> bool {
        self.include_altitude
    }

    #[inline]
    pub fn altitude_scale(&self) -> u32 {
        self.altitude_scale
    }

    /// Encode points into a polyline string
    ///
    /// With altitude enabled every point must carry one; use [`ALTITUDE_SENTINEL`] for unknown
    /// altitudes.
    pub fn encode(&self, points: &[PathPoint]) -> Result<String, PolylineError> {
        let channels = if self.include_altitude { 3 } else { 2 };
        let mut output = String::with_capacity(points.len() * channels * 4);
        let mut previous = [0i64; 3];

        for (index, point) in points.iter().enumerate() {
            let out_of_range = PolylineError::ValueOutOfRange { index };
            let mut current = [
                scale_round(point.lat, COORDINATE_SCALE).ok_or(out_of_range)?,
                scale_round(point.lng, COORDINATE_SCALE).ok_or(out_of_range)?,
                0,
            ];
            if self.include_altitude {
                let alt = point
                    .alt
                    .ok_or(PolylineError::MissingAltitude { index })?;
                current[2] =
                    scale_round(alt, self.altitude_scale as f64).ok_or(out_of_range)?;
            }

            for channel in 0..channels {
                let folded = current[channel]
                    .checked_sub(previous[channel])
                    .and_then(fold)
                    .ok_or(out_of_range)?;
                write_value(folded, &mut output);
            }
            previous = current;
        }

        Ok(output)
    }

    /// Decode a polyline string into points
    ///
    /// Never truncates silently: a string that ends mid-value or mid-point is an error.
    pub fn decode(&self, encoded: &str) -> Result<Vec<PathPoint>, PolylineError> {
        let bytes = encoded.as_bytes();
        let mut reader = ValueReader { bytes, offset: 0 };
        let mut points = Vec::new();
        let mut lat = 0i64;
        let mut lng = 0i64;
        let mut alt = 0i64;

        while !reader.is_done() {
            let point_offset = reader.offset;
            let overflow = PolylineError::Overflow {
                offset: point_offset,
            };
            lat = lat
                .checked_add(reader.read_value()?)
                .ok_or(overflow)?;
            lng = lng
                .checked_add(reader.read_value_in_tuple(point_offset)?)
                .ok_or(overflow)?;
            let altitude = if self.include_altitude {
                alt = alt
                    .checked_add(reader.read_value_in_tuple(point_offset)?)
                    .ok_or(overflow)?;
                Some(alt as f64 / self.altitude_scale as f64)
            } else {
                None
            };

            points.push(PathPoint {
                lat: lat as f64 / COORDINATE_SCALE,
                lng: lng as f64 / COORDINATE_SCALE,
                alt: altitude,
            });
        }

        Ok(points)
    }
}

/// Encode with the default codec (altitude at millimeter scale)
pub fn encode(points: &[PathPoint]) -> Result<String, PolylineError> {
    PolylineCodec::default().encode(points)
}

/// Decode with an explicit altitude setting
pub fn decode(
    encoded: &str,
    include_altitude: bool,
    altitude_scale: u32,
) -> Result<Vec<PathPoint>, PolylineError> {
    let codec = if include_altitude {
        PolylineCodec::with_altitude(altitude_scale)
    } else {
        PolylineCodec::without_altitude()
    };
    codec.decode(encoded)
}

/// Scale and round half away from zero (`f64::round` semantics)
///
/// `None` for non-finite values and magnitudes the format cannot carry.
#[inline]
fn scale_round(value: f64, scale: f64) -> Option<i64> {
    let scaled = (value * scale).round();
    (scaled.abs() < MAX_SCALED).then_some(scaled as i64)
}

/// Zig-zag fold a delta so the sign ends up in the lowest bit
#[inline]
fn fold(delta: i64) -> Option<i64> {
    let doubled = delta.checked_mul(2)?;
    Some(if delta < 0 { !doubled } else { doubled })
}

fn write_value(mut folded: i64, output: &mut String) {
    while folded >= CONTINUATION_BIT {
        let chunk = (CONTINUATION_BIT | (folded & CHUNK_MASK)) + CHAR_OFFSET;
        output.push(chunk as u8 as char);
        folded >>= CHUNK_BITS;
    }
    output.push((folded + CHAR_OFFSET) as u8 as char);
}

struct ValueReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl ValueReader<'_> {
    #[inline]
    fn is_done(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    /// Read a value that continues a point started at `point_offset`
    fn read_value_in_tuple(&mut self, point_offset: usize) -> Result<i64, PolylineError> {
        if self.is_done() {
            return Err(PolylineError::TruncatedTuple {
                offset: point_offset,
            });
        }
        self.read_value()
    }

    fn read_value(&mut self) -> Result<i64, PolylineError> {
        let start = self.offset;
        let mut result = 0i64;
        let mut shift = 0u32;

        loop {
            let Some(&byte) = self.bytes.get(self.offset) else {
                return Err(PolylineError::UnterminatedChunk { offset: start });
            };
            let chunk = byte as i64 - CHAR_OFFSET;
            if !(0..64).contains(&chunk) {
                return Err(PolylineError::InvalidCharacter {
                    offset: self.offset,
                    byte,
                });
            }
            if shift > 63 - CHUNK_BITS {
                return Err(PolylineError::Overflow { offset: start });
            }
            self.offset += 1;
            result |= (chunk & CHUNK_MASK) << shift;
            if chunk & CONTINUATION_BIT == 0 {
                break;
            }
            shift += CHUNK_BITS;
        }

        Ok(if result & 1 == 1 {
            !(result >> 1)
        } else {
            result >> 1
        })
    }
}
