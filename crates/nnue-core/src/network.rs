//! Network files: a header identifying the topology followed by the
//! parameters of the stage chain.
//!
//! ```text
//! u32 version | u32 hash | u32 description length | description
//! u32 hash    | parameters of the chain, innermost stage first
//! ```
//!
//! All integers are little-endian. Files may be zstd compressed.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::buffer::ScratchBuffer;
use crate::constants::{FILE_VERSION, MAX_DESCRIPTION_LEN};
use crate::layers::Layer;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Errors raised while reading a network file.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Version { expected: u32, found: u32 },
    Hash { expected: u32, found: u32 },
    Description(usize),
    DescriptionEncoding(std::string::FromUtf8Error),
    Padding,
    TrailingData,
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Version { expected, found } => {
                write!(f, "unsupported file version {found:#010x}, expected {expected:#010x}")
            }
            Error::Hash { expected, found } => write!(
                f,
                "network structure hash {found:#010x} does not match {expected:#010x}"
            ),
            Error::Description(len) => write!(f, "description of {len} bytes is too long"),
            Error::DescriptionEncoding(e) => write!(f, "description is not valid UTF-8: {e}"),
            Error::Padding => write!(f, "weight padding columns are not zero"),
            Error::TrailingData => write!(f, "unexpected data after the parameters"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::DescriptionEncoding(e) => Some(e),
            _ => None,
        }
    }
}

/// Header at the start of a network file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    /// Structural hash of the topology the file was written for.
    pub hash: u32,
    pub description: String,
}

/// Reads a header, rejecting unknown versions before anything else is read.
///
/// The hash is returned as found; checking it is up to the caller.
pub fn read_header<R: Read>(reader: &mut R) -> Result<Header, Error> {
    let version = reader.read_u32::<LittleEndian>()?;
    if version != FILE_VERSION {
        log::warn!("rejected network file version {version:#010x}");
        return Err(Error::Version {
            expected: FILE_VERSION,
            found: version,
        });
    }

    let hash = reader.read_u32::<LittleEndian>()?;
    let len = reader.read_u32::<LittleEndian>()? as usize;
    if len > MAX_DESCRIPTION_LEN {
        return Err(Error::Description(len));
    }

    let mut description = vec![0u8; len];
    reader.read_exact(&mut description)?;

    Ok(Header {
        version,
        hash,
        description: String::from_utf8(description).map_err(Error::DescriptionEncoding)?,
    })
}

/// A stage chain together with the description stored in its file.
#[derive(Debug, Clone)]
pub struct Network<L> {
    description: String,
    layers: L,
}

impl<L: Layer> Network<L> {
    /// Wraps an in-memory chain.
    pub fn new(layers: L, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            layers,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn architecture(&self) -> &L {
        &self.layers
    }

    /// Mutable access for training; evaluation needs `&self`, so the borrow
    /// checker keeps the two apart.
    pub fn architecture_mut(&mut self) -> &mut L {
        &mut self.layers
    }

    /// Evaluates the chain on the transformed feature vector.
    ///
    /// # Arguments
    ///
    /// * `features` - Output of the feature transformer, zero padded.
    /// * `scratch` - Buffer owned by the calling thread.
    #[inline]
    pub fn evaluate<'a>(
        &self,
        features: &'a [u8],
        scratch: &'a mut ScratchBuffer<L>,
    ) -> &'a [L::Output] {
        self.layers.propagate(features, scratch.as_mut_slice())
    }

    /// Writes the network file, uncompressed.
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                Error::Description(self.description.len()),
            ));
        }

        writer.write_u32::<LittleEndian>(FILE_VERSION)?;
        writer.write_u32::<LittleEndian>(L::HASH_VALUE)?;
        writer.write_u32::<LittleEndian>(self.description.len() as u32)?;
        writer.write_all(self.description.as_bytes())?;

        writer.write_u32::<LittleEndian>(L::HASH_VALUE)?;
        self.layers.write_parameters(writer)
    }

    /// Saves the network to `path`, zstd compressed when a level is given.
    pub fn save(&self, path: &Path, compression_level: Option<i32>) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        match compression_level {
            Some(level) => {
                let mut encoder = zstd::stream::write::Encoder::new(writer, level)?;
                self.write(&mut encoder)?;
                encoder.finish()?.flush()
            }
            None => {
                self.write(&mut writer)?;
                writer.flush()
            }
        }
    }
}

impl<L: Layer + Default> Network<L> {
    /// Reads an uncompressed network file and checks it against `L`.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let header = read_header(reader)?;
        Self::check_hash(header.hash)?;
        Self::check_hash(reader.read_u32::<LittleEndian>()?)?;

        let mut layers = L::default();
        layers.read_parameters(reader)?;
        if !layers.has_zero_padding() {
            return Err(Error::Padding);
        }

        let mut probe = [0u8; 1];
        if reader.read(&mut probe)? != 0 {
            return Err(Error::TrailingData);
        }

        log::debug!(
            "loaded network \"{}\" {}",
            header.description,
            L::structure_string()
        );
        Ok(Self {
            description: header.description,
            layers,
        })
    }

    /// Reads a network from memory, decompressing zstd data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.starts_with(&ZSTD_MAGIC) {
            let mut decoder = zstd::stream::read::Decoder::new(bytes)?;
            Self::read(&mut decoder)
        } else {
            Self::read(&mut io::Cursor::new(bytes))
        }
    }

    /// Loads a network file, decompressing zstd data.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let mut reader = BufReader::new(File::open(path)?);
        if reader.fill_buf()?.starts_with(&ZSTD_MAGIC) {
            let mut decoder = zstd::stream::read::Decoder::with_buffer(reader)?;
            Self::read(&mut decoder)
        } else {
            Self::read(&mut reader)
        }
    }

    fn check_hash(found: u32) -> Result<(), Error> {
        if found != L::HASH_VALUE {
            log::warn!(
                "rejected network hash {found:#010x}, expected {:#010x}",
                L::HASH_VALUE
            );
            return Err(Error::Hash {
                expected: L::HASH_VALUE,
                found,
            });
        }
        Ok(())
    }
}
