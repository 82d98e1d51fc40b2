/*
[INPUT]:  Raw WebSocket frames (text, plain binary, gzip binary)
[OUTPUT]: UTF-8 JSON text ready for parsing
[POS]:    WebSocket layer - frame decoding
[UPDATE]: When the server changes frame encoding
*/

use std::io::Read;

use flate2::read::GzDecoder;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::http::{CoinexError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() > 1 && bytes[..2] == GZIP_MAGIC
}

/// Decode a binary payload: gunzip when it carries the gzip magic, otherwise UTF-8
pub fn decode_binary(bytes: &[u8]) -> Result<String> {
    if is_gzip(bytes) {
        let mut text = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut text)
            .map_err(|err| CoinexError::Decode(format!("gzip: {err}")))?;
        return Ok(text);
    }

    String::from_utf8(bytes.to_vec()).map_err(|err| CoinexError::Decode(format!("utf-8: {err}")))
}

/// Text of a data frame, `None` for control frames
pub fn frame_text(message: WsMessage) -> Result<Option<String>> {
    match message {
        WsMessage::Text(text) => Ok(Some(text.to_string())),
        WsMessage::Binary(bytes) => decode_binary(&bytes).map(Some),
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_) => {
            Ok(None)
        }
    }
}
