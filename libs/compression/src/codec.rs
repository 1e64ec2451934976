use std::io::{Read, Write};

use endpoint_api::EndpointError;

/// A named byte-to-byte codec — spec.md §4.1. Compression always operates on
/// byte sequences; Rust's type system already rules out the dynamic
/// "non-bytes value fed to compress" case the source language has to check
/// at runtime, so `TypeMismatch` surfaces only from the serialization
/// registry (`serialization-registry`), not here.
pub trait CompressionCodec: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError>;
}

/// No-op codec. `name = None`, `mime_type = None` — spec.md §3.
pub struct IdentityCodec;

impl CompressionCodec for IdentityCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        Ok(data.to_vec())
    }
}

/// Deflate-family codec (zlib, raw deflate, or gzip framing), matching the
/// teacher's `middleware-compress` gzip path but generalized to all three
/// framings `flate2` supports.
pub enum DeflateFraming {
    Zlib,
    Raw,
    Gzip,
}

pub struct DeflateFamilyCodec {
    pub framing: DeflateFraming,
    pub level: flate2::Compression,
}

impl CompressionCodec for DeflateFamilyCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        let mut out = Vec::new();
        match self.framing {
            DeflateFraming::Zlib => {
                let mut enc = flate2::write::ZlibEncoder::new(&mut out, self.level);
                enc.write_all(data)?;
                enc.finish()?;
            }
            DeflateFraming::Raw => {
                let mut enc = flate2::write::DeflateEncoder::new(&mut out, self.level);
                enc.write_all(data)?;
                enc.finish()?;
            }
            DeflateFraming::Gzip => {
                let mut enc = flate2::write::GzEncoder::new(&mut out, self.level);
                enc.write_all(data)?;
                enc.finish()?;
            }
        }
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        let mut out = Vec::new();
        match self.framing {
            DeflateFraming::Zlib => {
                flate2::read::ZlibDecoder::new(data).read_to_end(&mut out)?;
            }
            DeflateFraming::Raw => {
                flate2::read::DeflateDecoder::new(data).read_to_end(&mut out)?;
            }
            DeflateFraming::Gzip => {
                flate2::read::GzDecoder::new(data).read_to_end(&mut out)?;
            }
        }
        Ok(out)
    }
}

pub struct Bzip2Codec {
    pub level: bzip2::Compression,
}

impl CompressionCodec for Bzip2Codec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        let mut out = Vec::new();
        bzip2::write::BzEncoder::new(&mut out, self.level).write_all(data)?;
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        let mut out = Vec::new();
        bzip2::read::BzDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }
}

pub struct LzmaCodec {
    pub preset: u32,
}

impl CompressionCodec for LzmaCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        let mut out = Vec::new();
        xz2::write::XzEncoder::new(&mut out, self.preset).write_all(data)?;
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        let mut out = Vec::new();
        xz2::read::XzDecoder::new(data).read_to_end(&mut out)?;
        Ok(out)
    }
}

pub struct BrotliCodec {
    pub quality: u32,
}

impl CompressionCodec for BrotliCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        let mut out = Vec::new();
        let params = brotli::enc::BrotliEncoderParams {
            quality: self.quality as i32,
            ..Default::default()
        };
        brotli::BrotliCompress(&mut std::io::Cursor::new(data), &mut out, &params)
            .map_err(|e| EndpointError::EncodeError(e.to_string()))?;
        Ok(out)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        let mut out = Vec::new();
        brotli::BrotliDecompress(&mut std::io::Cursor::new(data), &mut out)
            .map_err(|e| EndpointError::DecodeError(e.to_string()))?;
        Ok(out)
    }
}

pub struct SnappyCodec;

impl CompressionCodec for SnappyCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        Ok(snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| EndpointError::EncodeError(e.to_string()))?)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, EndpointError> {
        Ok(snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| EndpointError::DecodeError(e.to_string()))?)
    }
}
