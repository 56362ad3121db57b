//! Compressed, tagged module container
//!
//! Layout:
//!
//! ```text
//! [A5 74 EF 19][u32 LE uncompressed length][compressed payload]
//! ```
//!
//! The container does not interpret the payload. [`ContainerCodec::load_verified`]
//! and [`ContainerCodec::load_module`] always hand it to a [`Verifier`] before
//! returning it; [`ContainerCodec::load`] returns the raw, untrusted bytes.

use std::io::{self, Read, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CodecConfig;
use crate::error::BytecodeError;
use crate::module::Module;
use crate::verify::{ModuleVerifier, Verifier};

/// Magic marker at the start of every container
pub const CONTAINER_MAGIC: [u8; 4] = [0xA5, 0x74, 0xEF, 0x19];

/// Size of the fixed header (magic plus length)
pub const HEADER_LEN: usize = CONTAINER_MAGIC.len() + 4;

/// Errors from saving or loading a container
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The buffer does not start with [`CONTAINER_MAGIC`]
    #[error("bytecode container corrupt: bad magic")]
    BadMagic,

    /// Magic matched but the length field is cut off
    #[error("bytecode container corrupt: truncated header ({0} bytes)")]
    Truncated(usize),

    /// The entropy codec rejected the payload
    #[error("bytecode container corrupt: {0}")]
    Decompress(#[source] io::Error),

    /// Compression failed
    #[error("compression failed: {0}")]
    Compress(#[source] io::Error),

    /// Payload does not fit the 32-bit length field
    #[error("payload of {0} bytes is too large for a container")]
    TooLarge(usize),

    /// Payload failed verification or deserialization
    #[error("bytecode payload rejected: {0}")]
    Verify(#[from] BytecodeError),
}

/// Result type for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Lossless compressor for container payloads
pub trait EntropyCodec {
    /// Compress `data`
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Decompress `data`, which must produce exactly `expected_len` bytes
    fn decompress(&self, data: &[u8], expected_len: usize) -> io::Result<Vec<u8>>;
}

/// zlib-framed deflate codec
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    level: flate2::Compression,
}

impl DeflateCodec {
    /// Codec compressing at `level` (0-9)
    pub fn new(level: u32) -> Self {
        Self {
            level: flate2::Compression::new(level.min(9)),
        }
    }
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self {
            level: flate2::Compression::default(),
        }
    }
}

impl EntropyCodec for DeflateCodec {
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8], expected_len: usize) -> io::Result<Vec<u8>> {
        let decoder = flate2::read::ZlibDecoder::new(data);
        // the declared length is untrusted; grow only as bytes arrive
        let mut out = Vec::new();
        // one extra byte detects overlong payloads
        decoder.take((expected_len as u64).saturating_add(1)).read_to_end(&mut out)?;
        if out.len() != expected_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected {expected_len} bytes, decompressed {}", out.len()),
            ));
        }
        Ok(out)
    }
}

/// Saves and loads containers with a given entropy codec
#[derive(Debug, Clone)]
pub struct ContainerCodec<C = DeflateCodec> {
    codec: C,
    config: CodecConfig,
}

impl ContainerCodec<DeflateCodec> {
    /// Deflate codec configured from `config`
    pub fn new(config: CodecConfig) -> Self {
        Self {
            codec: DeflateCodec::new(config.compression_level),
            config,
        }
    }
}

impl Default for ContainerCodec<DeflateCodec> {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl<C: EntropyCodec> ContainerCodec<C> {
    /// Use a custom entropy codec
    pub fn with_codec(codec: C, config: CodecConfig) -> Self {
        Self { codec, config }
    }

    /// Active configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Wrap a raw payload into a container
    pub fn save(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let len = u32::try_from(raw.len()).map_err(|_| ContainerError::TooLarge(raw.len()))?;
        let compressed = self.codec.compress(raw).map_err(ContainerError::Compress)?;

        let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
        out.extend_from_slice(&CONTAINER_MAGIC);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&compressed);

        debug!(raw = raw.len(), container = out.len(), "saved bytecode container");
        Ok(out)
    }

    /// Unwrap a container into its raw payload, without verification
    pub fn load(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if bytes.len() < CONTAINER_MAGIC.len() || bytes[..CONTAINER_MAGIC.len()] != CONTAINER_MAGIC {
            warn!(len = bytes.len(), "bytecode container has bad magic");
            return Err(ContainerError::BadMagic);
        }
        let Some(len_bytes) = bytes.get(CONTAINER_MAGIC.len()..HEADER_LEN) else {
            return Err(ContainerError::Truncated(bytes.len()));
        };
        let mut len = [0u8; 4];
        len.copy_from_slice(len_bytes);
        let expected = u32::from_le_bytes(len) as usize;

        let raw = self
            .codec
            .decompress(&bytes[HEADER_LEN..], expected)
            .map_err(ContainerError::Decompress)?;

        debug!(container = bytes.len(), raw = raw.len(), "loaded bytecode container");
        Ok(raw)
    }

    /// Unwrap a container and run `verifier` over the payload
    pub fn load_verified(&self, bytes: &[u8], verifier: &dyn Verifier) -> Result<Vec<u8>> {
        let raw = self.load(bytes)?;
        verifier.verify(&raw)?;
        Ok(raw)
    }

    /// Serialize and wrap a module
    pub fn save_module(&self, module: &Module) -> Result<Vec<u8>> {
        self.save(&module.to_bytes()?)
    }

    /// Unwrap, deserialize and verify a module
    pub fn load_module(&self, bytes: &[u8]) -> Result<Module> {
        let raw = self.load(bytes)?;
        let module = Module::from_bytes(&raw)?;
        ModuleVerifier::new().verify_module(&module)?;
        Ok(module)
    }
}
