//! IRDocument wire format.
//!
//! Length-prefixed msgpack: each document is serialized with rmp-serde and
//! framed by a u32 little-endian byte length, so streams of documents can
//! be read without scanning. Field order follows the struct definitions and
//! is stable across runs, which keeps encoded output deterministic for
//! identical documents.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::shared::models::{CodeweaveError, IRDocument, Result};

/// Serialize a single document to msgpack bytes (unframed).
///
/// Field names are encoded (map format, not tuple) so optional fields can
/// be elided without shifting positions.
pub fn encode_document(doc: &IRDocument) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(doc)?)
}

/// Deserialize a single document from msgpack bytes (unframed).
pub fn decode_document(bytes: &[u8]) -> Result<IRDocument> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Write one length-prefixed document frame.
pub fn write_frame<W: Write>(writer: &mut W, doc: &IRDocument) -> Result<()> {
    let payload = encode_document(doc)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| CodeweaveError::wire("document exceeds u32 frame size"))?;
    writer.write_u32::<LittleEndian>(len)?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Read one length-prefixed document frame. Returns None at clean EOF.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<IRDocument>> {
    let len = match reader.read_u32::<LittleEndian>() {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(decode_document(&payload)?))
}

/// Encode a batch of documents into one framed stream.
pub fn encode_stream(docs: &[IRDocument]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for doc in docs {
        write_frame(&mut out, doc)?;
    }
    Ok(out)
}

/// Decode a framed stream back into documents.
pub fn decode_stream(bytes: &[u8]) -> Result<Vec<IRDocument>> {
    let mut cursor = std::io::Cursor::new(bytes);
    let mut docs = Vec::new();
    while let Some(doc) = read_frame(&mut cursor)? {
        docs.push(doc);
    }
    Ok(docs)
}
