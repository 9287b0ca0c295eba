//! # Wire Codec
//!
//! Big-endian, length-prefixed framing for stored data and messages.
//!
//! ## Framing
//!
//! | Structure | Layout |
//! |-----------|--------|
//! | `StoredData` | `len:u32 { storage_time:u64 lifetime:u32 value signature<u16> }` |
//! | `StoreKindData` | `kind:u32 generation:u64 values<u32>` |
//! | `StoredDataSpecifier` | `kind:u32 generation:u64 selector<u16>` |
//! | `FetchKindResponse` | `kind:u32 generation:u64 values<u32>` |
//! | `Message` | `magic:u32 ttl:u8 transaction_id:u64 via<u16> dest<u16> options originator<u8> code:u16 body<u32> signature<u16>` |
//!
//! `<uN>` denotes an N-bit length prefix. Value layouts depend on the kind's
//! data model, so decoding stored data needs a `KindRegistry`.

use crate::data_model::{
    ArrayRange, DataModel, DataSelector, DataValue, FetchKindResponse, KindId, StoreKindData,
    StoredData, StoredDataSpecifier, StoredValue,
};
use crate::errors::CodecError;
use crate::identifiers::{NodeId, ResourceId};
use crate::kinds::KindRegistry;
use crate::message::{
    AppAttachRequest, AttachRequest, Destination, ErrorAnswer, ErrorCode, FetchAnswer,
    FetchRequest, ForwardingHeader, JoinRequest, LeaveRequest, Message, MessageBody, MessageCode,
    OverlayForwardingOptions, PingAnswer, StoreAnswer, StoreKindResponse, StoreRequest,
};

/// Leading token of every encoded message.
pub const MESSAGE_MAGIC: u32 = 0xd245_4c4f;

const DESTINATION_NODE: u8 = 1;
const DESTINATION_RESOURCE: u8 = 2;

// =============================================================================
// WRITER / READER
// =============================================================================

/// Append-only big-endian writer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finished bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Bytes with an 8-bit length prefix.
    pub fn bytes8(&mut self, field: &'static str, v: &[u8]) -> Result<(), CodecError> {
        let len = u8::try_from(v.len()).map_err(|_| CodecError::LengthOverflow {
            field,
            len: v.len(),
        })?;
        self.u8(len);
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Bytes with a 16-bit length prefix.
    pub fn bytes16(&mut self, field: &'static str, v: &[u8]) -> Result<(), CodecError> {
        let len = u16::try_from(v.len()).map_err(|_| CodecError::LengthOverflow {
            field,
            len: v.len(),
        })?;
        self.u16(len);
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Bytes with a 32-bit length prefix.
    pub fn bytes32(&mut self, field: &'static str, v: &[u8]) -> Result<(), CodecError> {
        let len = u32::try_from(v.len()).map_err(|_| CodecError::LengthOverflow {
            field,
            len: v.len(),
        })?;
        self.u32(len);
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Write whatever `f` produces behind a 16-bit length prefix.
    pub fn nested16(
        &mut self,
        field: &'static str,
        f: impl FnOnce(&mut Writer) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        let mut inner = Writer::new();
        f(&mut inner)?;
        self.bytes16(field, &inner.buf)
    }

    /// Write whatever `f` produces behind a 32-bit length prefix.
    pub fn nested32(
        &mut self,
        field: &'static str,
        f: impl FnOnce(&mut Writer) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        let mut inner = Writer::new();
        f(&mut inner)?;
        self.bytes32(field, &inner.buf)
    }
}

/// Cursor over borrowed big-endian input.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Read from the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether all input was consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        self.array().map(u16::from_be_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        self.array().map(u32::from_be_bytes)
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        self.array().map(u64::from_be_bytes)
    }

    pub fn bytes8(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.u8()? as usize;
        self.take(len)
    }

    pub fn bytes16(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.u16()? as usize;
        self.take(len)
    }

    pub fn bytes32(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    /// A sub-reader over a 16-bit length-prefixed block.
    pub fn nested16(&mut self) -> Result<Reader<'a>, CodecError> {
        self.bytes16().map(Reader::new)
    }

    /// A sub-reader over a 32-bit length-prefixed block.
    pub fn nested32(&mut self) -> Result<Reader<'a>, CodecError> {
        self.bytes32().map(Reader::new)
    }

    /// UTF-8 string with an 8-bit length prefix.
    pub fn string8(&mut self, field: &'static str) -> Result<String, CodecError> {
        utf8(field, self.bytes8()?)
    }

    /// UTF-8 string with a 16-bit length prefix.
    pub fn string16(&mut self, field: &'static str) -> Result<String, CodecError> {
        utf8(field, self.bytes16()?)
    }

    /// Fail if input remains.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

fn utf8(field: &'static str, bytes: &[u8]) -> Result<String, CodecError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::invalid(field, e.to_string()))
}

fn model_of(registry: &dyn KindRegistry, kind: KindId) -> Result<DataModel, CodecError> {
    registry
        .data_model_of(kind)
        .ok_or(CodecError::UnknownKind(kind))
}

// =============================================================================
// STORED DATA
// =============================================================================

fn encode_data_value(w: &mut Writer, v: &DataValue) -> Result<(), CodecError> {
    w.u8(u8::from(v.exists));
    w.bytes32("value", &v.value)
}

fn decode_data_value(r: &mut Reader<'_>) -> Result<DataValue, CodecError> {
    let exists = match r.u8()? {
        0 => false,
        1 => true,
        other => return Err(CodecError::invalid("exists", other.to_string())),
    };
    let value = r.bytes32()?.to_vec();
    Ok(DataValue { exists, value })
}

/// Encode the model-specific value.
pub fn encode_stored_value(w: &mut Writer, value: &StoredValue) -> Result<(), CodecError> {
    match value {
        StoredValue::Single(v) => encode_data_value(w, v),
        StoredValue::Array { index, value } => {
            w.u32(*index);
            encode_data_value(w, value)
        }
        StoredValue::Dictionary { key, value } => {
            w.bytes16("dictionary key", key.as_bytes())?;
            encode_data_value(w, value)
        }
    }
}

fn decode_stored_value(r: &mut Reader<'_>, model: DataModel) -> Result<StoredValue, CodecError> {
    Ok(match model {
        DataModel::SingleValue => StoredValue::Single(decode_data_value(r)?),
        DataModel::Array => {
            let index = r.u32()?;
            StoredValue::Array {
                index,
                value: decode_data_value(r)?,
            }
        }
        DataModel::Dictionary => {
            let key = r.string16("dictionary key")?;
            StoredValue::Dictionary {
                key,
                value: decode_data_value(r)?,
            }
        }
    })
}

/// Encode one `StoredData`.
pub fn encode_stored_data(w: &mut Writer, data: &StoredData) -> Result<(), CodecError> {
    w.nested32("stored data", |w| {
        w.u64(data.storage_time);
        w.u32(data.lifetime);
        encode_stored_value(w, &data.value)?;
        w.bytes16("signature", &data.signature)
    })
}

/// Decode one `StoredData` of the given model.
pub fn decode_stored_data(r: &mut Reader<'_>, model: DataModel) -> Result<StoredData, CodecError> {
    let mut inner = r.nested32()?;
    let storage_time = inner.u64()?;
    let lifetime = inner.u32()?;
    let value = decode_stored_value(&mut inner, model)?;
    let signature = inner.bytes16()?.to_vec();
    inner.finish()?;
    Ok(StoredData {
        storage_time,
        lifetime,
        value,
        signature,
    })
}

fn encode_values(w: &mut Writer, values: &[StoredData]) -> Result<(), CodecError> {
    w.nested32("values", |w| {
        values.iter().try_for_each(|d| encode_stored_data(w, d))
    })
}

fn decode_values(r: &mut Reader<'_>, model: DataModel) -> Result<Vec<StoredData>, CodecError> {
    let mut inner = r.nested32()?;
    let mut values = Vec::new();
    while !inner.is_empty() {
        values.push(decode_stored_data(&mut inner, model)?);
    }
    Ok(values)
}

/// Encode a `StoreKindData`.
pub fn encode_store_kind_data(w: &mut Writer, data: &StoreKindData) -> Result<(), CodecError> {
    w.u32(data.kind);
    w.u64(data.generation);
    encode_values(w, &data.values)
}

/// Decode a `StoreKindData`.
pub fn decode_store_kind_data(
    r: &mut Reader<'_>,
    registry: &dyn KindRegistry,
) -> Result<StoreKindData, CodecError> {
    let kind = r.u32()?;
    let generation = r.u64()?;
    let values = decode_values(r, model_of(registry, kind)?)?;
    Ok(StoreKindData {
        kind,
        generation,
        values,
    })
}

/// Encode a `StoredDataSpecifier`.
pub fn encode_specifier(w: &mut Writer, spec: &StoredDataSpecifier) -> Result<(), CodecError> {
    w.u32(spec.kind);
    w.u64(spec.generation_floor);
    w.nested16("specifier", |w| match &spec.selector {
        DataSelector::Single => Ok(()),
        DataSelector::Array(ranges) => w.nested16("ranges", |w| {
            for range in ranges {
                w.u32(range.first);
                w.u32(range.last);
            }
            Ok(())
        }),
        DataSelector::Dictionary(keys) => w.nested16("keys", |w| {
            keys.iter()
                .try_for_each(|k| w.bytes16("dictionary key", k.as_bytes()))
        }),
    })
}

/// Decode a `StoredDataSpecifier`.
///
/// Array ranges are re-validated, so an overlapping specifier received
/// from the wire is rejected here.
pub fn decode_specifier(
    r: &mut Reader<'_>,
    registry: &dyn KindRegistry,
) -> Result<StoredDataSpecifier, CodecError> {
    let kind = r.u32()?;
    let generation_floor = r.u64()?;
    let mut body = r.nested16()?;
    let spec = match model_of(registry, kind)? {
        DataModel::SingleValue => StoredDataSpecifier::single(kind),
        DataModel::Array => {
            let mut list = body.nested16()?;
            let mut ranges = Vec::new();
            while !list.is_empty() {
                ranges.push(ArrayRange::new(list.u32()?, list.u32()?));
            }
            StoredDataSpecifier::array(kind, ranges)
                .map_err(|e| CodecError::invalid("array ranges", e.to_string()))?
        }
        DataModel::Dictionary => {
            let mut list = body.nested16()?;
            let mut keys = Vec::new();
            while !list.is_empty() {
                keys.push(list.string16("dictionary key")?);
            }
            StoredDataSpecifier::dictionary(kind, keys)
        }
    };
    body.finish()?;
    Ok(spec.with_generation_floor(generation_floor))
}

/// Encode a `FetchKindResponse`.
pub fn encode_fetch_kind_response(
    w: &mut Writer,
    resp: &FetchKindResponse,
) -> Result<(), CodecError> {
    w.u32(resp.kind);
    w.u64(resp.generation);
    encode_values(w, &resp.values)
}

/// Decode a `FetchKindResponse`.
pub fn decode_fetch_kind_response(
    r: &mut Reader<'_>,
    registry: &dyn KindRegistry,
) -> Result<FetchKindResponse, CodecError> {
    let kind = r.u32()?;
    let generation = r.u64()?;
    let values = decode_values(r, model_of(registry, kind)?)?;
    Ok(FetchKindResponse {
        kind,
        generation,
        values,
    })
}

// =============================================================================
// MESSAGES
// =============================================================================

fn encode_destination(w: &mut Writer, d: &Destination) -> Result<(), CodecError> {
    match d {
        Destination::Node(id) => {
            w.u8(DESTINATION_NODE);
            w.bytes8("node id", id.as_bytes())
        }
        Destination::Resource(id) => {
            w.u8(DESTINATION_RESOURCE);
            w.bytes8("resource id", id.as_bytes())
        }
    }
}

fn decode_destination(r: &mut Reader<'_>) -> Result<Destination, CodecError> {
    let tag = r.u8()?;
    let bytes = r.bytes8()?;
    match tag {
        DESTINATION_NODE => NodeId::from_slice(bytes)
            .map(Destination::Node)
            .map_err(|e| CodecError::invalid("node id", e.to_string())),
        DESTINATION_RESOURCE => ResourceId::from_slice(bytes)
            .map(Destination::Resource)
            .map_err(|e| CodecError::invalid("resource id", e.to_string())),
        other => Err(CodecError::invalid("destination type", other.to_string())),
    }
}

fn encode_destinations(
    w: &mut Writer,
    field: &'static str,
    list: &[Destination],
) -> Result<(), CodecError> {
    w.nested16(field, |w| list.iter().try_for_each(|d| encode_destination(w, d)))
}

fn decode_destinations(r: &mut Reader<'_>) -> Result<Vec<Destination>, CodecError> {
    let mut inner = r.nested16()?;
    let mut list = Vec::new();
    while !inner.is_empty() {
        list.push(decode_destination(&mut inner)?);
    }
    Ok(list)
}

fn encode_strings(w: &mut Writer, field: &'static str, items: &[String]) -> Result<(), CodecError> {
    w.nested16(field, |w| {
        items.iter().try_for_each(|s| w.bytes16(field, s.as_bytes()))
    })
}

fn decode_strings(r: &mut Reader<'_>, field: &'static str) -> Result<Vec<String>, CodecError> {
    let mut inner = r.nested16()?;
    let mut items = Vec::new();
    while !inner.is_empty() {
        items.push(inner.string16(field)?);
    }
    Ok(items)
}

fn encode_body(w: &mut Writer, body: &MessageBody) -> Result<(), CodecError> {
    match body {
        MessageBody::PingReq | MessageBody::LeaveAns | MessageBody::UpdateAns => Ok(()),
        MessageBody::PingAns(ans) => {
            w.u64(ans.response_id);
            w.u64(ans.time);
            Ok(())
        }
        MessageBody::AttachReq(a) | MessageBody::AttachAns(a) => {
            w.bytes8("ufrag", a.ufrag.as_bytes())?;
            w.bytes8("password", a.password.as_bytes())?;
            encode_strings(w, "candidates", &a.candidates)?;
            w.u8(u8::from(a.send_update));
            Ok(())
        }
        MessageBody::AppAttachReq(a) | MessageBody::AppAttachAns(a) => {
            w.bytes8("ufrag", a.ufrag.as_bytes())?;
            w.bytes8("password", a.password.as_bytes())?;
            w.u16(a.application);
            encode_strings(w, "candidates", &a.candidates)
        }
        MessageBody::StoreReq(req) => {
            w.bytes8("resource", req.resource.as_bytes())?;
            w.u8(req.replica_number);
            w.nested32("kind data", |w| {
                req.kind_data
                    .iter()
                    .try_for_each(|k| encode_store_kind_data(w, k))
            })
        }
        MessageBody::StoreAns(ans) => w.nested16("store kinds", |w| {
            for k in &ans.kinds {
                w.u32(k.kind);
                w.u64(k.generation);
            }
            Ok(())
        }),
        MessageBody::FetchReq(req) => {
            w.bytes8("resource", req.resource.as_bytes())?;
            w.nested16("specifiers", |w| {
                req.specifiers.iter().try_for_each(|s| encode_specifier(w, s))
            })
        }
        MessageBody::FetchAns(ans) => w.nested32("kind responses", |w| {
            ans.kind_responses
                .iter()
                .try_for_each(|k| encode_fetch_kind_response(w, k))
        }),
        MessageBody::JoinReq(req) => {
            w.bytes8("joining peer", req.joining_peer.as_bytes())?;
            w.bytes16("overlay data", &req.overlay_data)
        }
        MessageBody::LeaveReq(req) => {
            w.bytes8("leaving peer", req.leaving_peer.as_bytes())?;
            w.bytes16("overlay data", &req.overlay_data)
        }
        MessageBody::JoinAns(data) | MessageBody::UpdateReq(data) => {
            w.bytes16("overlay data", data)
        }
        MessageBody::Error(err) => {
            w.u16(err.code.as_u16());
            w.bytes16("reason", err.reason.as_bytes())
        }
        MessageBody::Unknown { payload, .. } => {
            w.buf.extend_from_slice(payload);
            Ok(())
        }
    }
}

fn decode_node_id(r: &mut Reader<'_>, field: &'static str) -> Result<NodeId, CodecError> {
    NodeId::from_slice(r.bytes8()?).map_err(|e| CodecError::invalid(field, e.to_string()))
}

fn decode_body(
    code: u16,
    r: &mut Reader<'_>,
    registry: &dyn KindRegistry,
) -> Result<MessageBody, CodecError> {
    let Some(known) = MessageCode::from_u16(code) else {
        let payload = r.take(r.remaining())?.to_vec();
        return Ok(MessageBody::Unknown { code, payload });
    };
    Ok(match known {
        MessageCode::PingReq => MessageBody::PingReq,
        MessageCode::LeaveAns => MessageBody::LeaveAns,
        MessageCode::UpdateAns => MessageBody::UpdateAns,
        MessageCode::PingAns => MessageBody::PingAns(PingAnswer {
            response_id: r.u64()?,
            time: r.u64()?,
        }),
        MessageCode::AttachReq | MessageCode::AttachAns => {
            let attach = AttachRequest {
                ufrag: r.string8("ufrag")?,
                password: r.string8("password")?,
                candidates: decode_strings(r, "candidates")?,
                send_update: r.u8()? != 0,
            };
            if known == MessageCode::AttachReq {
                MessageBody::AttachReq(attach)
            } else {
                MessageBody::AttachAns(attach)
            }
        }
        MessageCode::AppAttachReq | MessageCode::AppAttachAns => {
            let attach = AppAttachRequest {
                ufrag: r.string8("ufrag")?,
                password: r.string8("password")?,
                application: r.u16()?,
                candidates: decode_strings(r, "candidates")?,
            };
            if known == MessageCode::AppAttachReq {
                MessageBody::AppAttachReq(attach)
            } else {
                MessageBody::AppAttachAns(attach)
            }
        }
        MessageCode::StoreReq => {
            let resource = ResourceId::from_slice(r.bytes8()?)
                .map_err(|e| CodecError::invalid("resource", e.to_string()))?;
            let replica_number = r.u8()?;
            let mut list = r.nested32()?;
            let mut kind_data = Vec::new();
            while !list.is_empty() {
                kind_data.push(decode_store_kind_data(&mut list, registry)?);
            }
            MessageBody::StoreReq(StoreRequest {
                resource,
                replica_number,
                kind_data,
            })
        }
        MessageCode::StoreAns => {
            let mut list = r.nested16()?;
            let mut kinds = Vec::new();
            while !list.is_empty() {
                kinds.push(StoreKindResponse {
                    kind: list.u32()?,
                    generation: list.u64()?,
                });
            }
            MessageBody::StoreAns(StoreAnswer { kinds })
        }
        MessageCode::FetchReq => {
            let resource = ResourceId::from_slice(r.bytes8()?)
                .map_err(|e| CodecError::invalid("resource", e.to_string()))?;
            let mut list = r.nested16()?;
            let mut specifiers = Vec::new();
            while !list.is_empty() {
                specifiers.push(decode_specifier(&mut list, registry)?);
            }
            MessageBody::FetchReq(FetchRequest {
                resource,
                specifiers,
            })
        }
        MessageCode::FetchAns => {
            let mut list = r.nested32()?;
            let mut kind_responses = Vec::new();
            while !list.is_empty() {
                kind_responses.push(decode_fetch_kind_response(&mut list, registry)?);
            }
            MessageBody::FetchAns(FetchAnswer { kind_responses })
        }
        MessageCode::JoinReq => MessageBody::JoinReq(JoinRequest {
            joining_peer: decode_node_id(r, "joining peer")?,
            overlay_data: r.bytes16()?.to_vec(),
        }),
        MessageCode::LeaveReq => MessageBody::LeaveReq(LeaveRequest {
            leaving_peer: decode_node_id(r, "leaving peer")?,
            overlay_data: r.bytes16()?.to_vec(),
        }),
        MessageCode::JoinAns => MessageBody::JoinAns(r.bytes16()?.to_vec()),
        MessageCode::UpdateReq => MessageBody::UpdateReq(r.bytes16()?.to_vec()),
        MessageCode::Error => MessageBody::Error(ErrorAnswer {
            code: ErrorCode::from_u16(r.u16()?),
            reason: r.string16("reason")?,
        }),
    })
}

/// Bytes covered by a message signature: transaction id, originator, code
/// and body. The forwarding header is excluded because relays rewrite it.
pub fn signable_bytes(message: &Message) -> Result<Vec<u8>, CodecError> {
    let mut w = Writer::new();
    w.u64(message.header.transaction_id);
    w.bytes8("originator", message.originator.as_bytes())?;
    w.u16(message.body.code());
    w.nested32("body", |w| encode_body(w, &message.body))?;
    Ok(w.into_bytes())
}

/// Encode a complete message.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, CodecError> {
    let header = &message.header;
    let mut w = Writer::new();
    w.u32(MESSAGE_MAGIC);
    w.u8(header.ttl);
    w.u64(header.transaction_id);
    encode_destinations(&mut w, "via list", &header.via_list)?;
    encode_destinations(&mut w, "destination list", &header.destination_list)?;
    match &header.overlay_options {
        None => w.u8(0),
        Some(opts) => {
            w.u8(1);
            w.bytes8("source overlay", opts.source_overlay.as_bytes())?;
            w.bytes8("destination overlay", opts.destination_overlay.as_bytes())?;
        }
    }
    w.bytes8("originator", message.originator.as_bytes())?;
    w.u16(message.body.code());
    w.nested32("body", |w| encode_body(w, &message.body))?;
    w.bytes16("signature", &message.signature)?;
    Ok(w.into_bytes())
}

/// Decode a complete message.
pub fn decode_message(
    bytes: &[u8],
    registry: &dyn KindRegistry,
) -> Result<Message, CodecError> {
    let mut r = Reader::new(bytes);
    let magic = r.u32()?;
    if magic != MESSAGE_MAGIC {
        return Err(CodecError::invalid("magic", format!("{magic:#010x}")));
    }
    let ttl = r.u8()?;
    let transaction_id = r.u64()?;
    let via_list = decode_destinations(&mut r)?;
    let destination_list = decode_destinations(&mut r)?;
    let overlay_options = match r.u8()? {
        0 => None,
        1 => Some(OverlayForwardingOptions {
            source_overlay: r.string8("source overlay")?,
            destination_overlay: r.string8("destination overlay")?,
        }),
        other => return Err(CodecError::invalid("options flag", other.to_string())),
    };
    let originator = decode_node_id(&mut r, "originator")?;
    let code = r.u16()?;
    let mut body_reader = r.nested32()?;
    let body = decode_body(code, &mut body_reader, registry)?;
    body_reader.finish()?;
    let signature = r.bytes16()?.to_vec();
    r.finish()?;

    Ok(Message {
        header: ForwardingHeader {
            ttl,
            transaction_id,
            via_list,
            destination_list,
            overlay_options,
        },
        originator,
        body,
        signature,
    })
}
