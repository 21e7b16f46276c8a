//! Blocking length-prefixed `serde_json` framing, mirroring the
//! coordinator's own codec but over a plain `std::net::TcpStream` rather
//! than a tokio socket: client handles are ordinary owned values with no
//! async runtime requirement of their own.

use crate::error::ClientError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{Read, Write};
use std::net::TcpStream;

const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

pub fn write_frame<T: Serialize>(stream: &mut TcpStream, value: &T) -> Result<(), ClientError> {
    let bytes = serde_json::to_vec(value)?;
    let len = bytes.len() as u32;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(&bytes)?;
    stream.flush()?;
    Ok(())
}

pub fn read_frame<T: DeserializeOwned>(stream: &mut TcpStream) -> Result<T, ClientError> {
    let mut len_bytes = [0u8; 4];
    match stream.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ClientError::Closed),
        Err(e) => return Err(ClientError::Io(e)),
    }
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(ClientError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "frame exceeds maximum size",
        )));
    }
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf)?;
    Ok(serde_json::from_slice(&buf)?)
}
