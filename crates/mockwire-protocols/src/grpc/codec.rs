//! Descriptor-driven tonic codec
//!
//! Frames are decoded into a [`DynamicMessage`] of the method's input type
//! and any [`DynamicMessage`] is encoded as-is.

use mockwire_schema::prost_reflect::{DynamicMessage, MessageDescriptor};
use prost::Message as _;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::Status;

/// Codec for one method, keyed by its input descriptor
#[derive(Debug, Clone)]
pub struct DynamicCodec {
    input: MessageDescriptor,
}

impl DynamicCodec {
    /// Create a codec decoding messages of type `input`
    pub fn new(input: MessageDescriptor) -> Self {
        Self { input }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;
    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder {
            input: self.input.clone(),
        }
    }
}

/// Encoder half of [`DynamicCodec`]
#[derive(Debug, Clone, Copy)]
pub struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode(dst)
            .map_err(|e| Status::internal(format!("failed to encode response: {e}")))
    }
}

/// Decoder half of [`DynamicCodec`]
#[derive(Debug, Clone)]
pub struct DynamicDecoder {
    input: MessageDescriptor,
}

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        DynamicMessage::decode(self.input.clone(), src)
            .map(Some)
            .map_err(|e| {
                Status::invalid_argument(format!(
                    "Request decode error: invalid {} payload: {e}",
                    self.input.full_name()
                ))
            })
    }
}
