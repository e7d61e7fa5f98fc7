use std::fmt;
use std::io::{self, Cursor, Read};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Bytes read ahead when sniffing; one tar header block.
const SNIFF_LEN: usize = 512;

/// Compression wrapped around the tar stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
    /// Sniff the magic bytes at the start of the stream.
    #[default]
    Detect,
}

impl Compression {
    /// Create a decoder for this compression codec.
    ///
    /// `Detect` must be resolved with [`sniff`] first.
    pub fn decoder<R: Read>(self, reader: R) -> Result<Decoder<R>> {
        match self {
            Self::None => Ok(Decoder::Passthrough(reader)),
            #[cfg(feature = "gzip")]
            Self::Gzip => Ok(Decoder::Gzip(flate2::read::GzDecoder::new(reader).into())),
            #[cfg(feature = "bzip2")]
            Self::Bzip2 => Ok(Decoder::Bzip2(bzip2::read::BzDecoder::new(reader).into())),
            #[cfg(feature = "xz")]
            Self::Xz => Ok(Decoder::Xz(xz2::read::XzDecoder::new(reader).into())),
            #[cfg(feature = "zstd")]
            Self::Zstd => {
                let decoder = zstd::stream::read::Decoder::new(reader).map_err(Error::Archive)?;
                Ok(Decoder::Zstd(Box::new(decoder)))
            }
            other => Err(Error::UnsupportedCompression(other.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
            Self::Detect => "detect",
        };
        f.write_str(name)
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            "bzip2" | "bz2" => Ok(Self::Bzip2),
            "xz" => Ok(Self::Xz),
            "zstd" | "zst" => Ok(Self::Zstd),
            "detect" | "auto" => Ok(Self::Detect),
            _ => Err(Error::UnsupportedCompression(s.to_string())),
        }
    }
}

/// Decoder wrapper for tar decompression.
pub enum Decoder<R: Read> {
    Passthrough(R),
    #[cfg(feature = "gzip")]
    Gzip(Box<flate2::read::GzDecoder<R>>),
    #[cfg(feature = "bzip2")]
    Bzip2(Box<bzip2::read::BzDecoder<R>>),
    #[cfg(feature = "xz")]
    Xz(Box<xz2::read::XzDecoder<R>>),
    #[cfg(feature = "zstd")]
    Zstd(Box<zstd::stream::read::Decoder<'static, io::BufReader<R>>>),
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Passthrough(r) => r.read(buf),
            #[cfg(feature = "gzip")]
            Self::Gzip(d) => d.read(buf),
            #[cfg(feature = "bzip2")]
            Self::Bzip2(d) => d.read(buf),
            #[cfg(feature = "xz")]
            Self::Xz(d) => d.read(buf),
            #[cfg(feature = "zstd")]
            Self::Zstd(d) => d.read(buf),
        }
    }
}

/// Identify the compression from the first bytes of a stream.
pub fn detect_compression(data: &[u8]) -> Option<Compression> {
    match data {
        [0x1F, 0x8B, ..] => Some(Compression::Gzip),
        [b'B', b'Z', b'h', ..] => Some(Compression::Bzip2),
        [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, ..] => Some(Compression::Xz),
        [0x28, 0xB5, 0x2F, 0xFD, ..] => Some(Compression::Zstd),
        _ if is_tar_header(data) => Some(Compression::None),
        _ => None,
    }
}

fn is_tar_header(data: &[u8]) -> bool {
    if data.len() < SNIFF_LEN {
        return false;
    }
    &data[257..262] == b"ustar" || checksum_matches(&data[..SNIFF_LEN])
}

/// Old v7 headers carry no magic, only the checksum over the block.
fn checksum_matches(block: &[u8]) -> bool {
    let field = &block[148..156];
    let digits: String = field
        .iter()
        .map(|&b| b as char)
        .filter(|c| c.is_digit(8))
        .collect();
    let Ok(expected) = u32::from_str_radix(&digits, 8) else {
        return false;
    };

    let actual: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if (148..156).contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(b)
            }
        })
        .sum();
    // An all-zero block sums to the blank checksum field alone.
    actual == expected && block.iter().any(|&b| b != 0)
}

/// Read ahead far enough to detect the compression, then hand back a reader
/// that replays the consumed bytes.
pub fn sniff<R: Read>(mut reader: R) -> Result<(Compression, io::Chain<Cursor<Vec<u8>>, R>)> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    (&mut reader)
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .map_err(Error::Archive)?;

    let compression = detect_compression(&head)
        .ok_or_else(|| Error::UnsupportedCompression("unable to detect compression".to_string()))?;
    Ok((compression, Cursor::new(head).chain(reader)))
}
