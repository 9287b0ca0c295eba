//! # Overlay Messages
//!
//! A message is a forwarding header, an originator, a typed body and an
//! opaque signature. Requests are routed along the destination list; every
//! relaying peer records itself in the via list so the answer can retrace the
//! path in reverse.
//!
//! ## Cross-Overlay Options
//!
//! Messages that leave their overlay carry `OverlayForwardingOptions` naming
//! the source and destination overlay. Answers swap the two.

use crate::data_model::{FetchKindResponse, KindId, StoreKindData, StoredDataSpecifier};
use crate::identifiers::{NodeId, ResourceId};
use std::fmt;

/// Initial hop budget of a fresh message.
pub const DEFAULT_TTL: u8 = 100;

/// One entry of a via or destination list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A specific peer.
    Node(NodeId),
    /// Whichever peer is responsible for a resource.
    Resource(ResourceId),
}

impl Destination {
    /// The peer id, if this names a peer.
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            Self::Resource(_) => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node:{id}"),
            Self::Resource(id) => write!(f, "resource:{id}"),
        }
    }
}

/// Source and destination overlay of a cross-overlay message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayForwardingOptions {
    pub source_overlay: String,
    pub destination_overlay: String,
}

impl OverlayForwardingOptions {
    /// Options for a message leaving `source` toward `destination`.
    #[must_use]
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source_overlay: source.into(),
            destination_overlay: destination.into(),
        }
    }

    /// Options for the answer travelling back.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            source_overlay: self.destination_overlay.clone(),
            destination_overlay: self.source_overlay.clone(),
        }
    }
}

/// Routing state carried with every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingHeader {
    /// Remaining hops.
    pub ttl: u8,
    /// Correlates an answer with its request.
    pub transaction_id: u64,
    /// Peers that relayed the message, in order.
    pub via_list: Vec<Destination>,
    /// Remaining destinations, head first.
    pub destination_list: Vec<Destination>,
    /// Present on cross-overlay traffic.
    pub overlay_options: Option<OverlayForwardingOptions>,
}

// =============================================================================
// MESSAGE CODES
// =============================================================================

/// Numeric message codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageCode {
    AttachReq = 3,
    AttachAns = 4,
    StoreReq = 7,
    StoreAns = 8,
    FetchReq = 9,
    FetchAns = 10,
    JoinReq = 15,
    JoinAns = 16,
    LeaveReq = 17,
    LeaveAns = 18,
    UpdateReq = 19,
    UpdateAns = 20,
    PingReq = 23,
    PingAns = 24,
    AppAttachReq = 29,
    AppAttachAns = 30,
    Error = 0xffff,
}

impl MessageCode {
    /// Decode a code this peer understands.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        Some(match code {
            3 => Self::AttachReq,
            4 => Self::AttachAns,
            7 => Self::StoreReq,
            8 => Self::StoreAns,
            9 => Self::FetchReq,
            10 => Self::FetchAns,
            15 => Self::JoinReq,
            16 => Self::JoinAns,
            17 => Self::LeaveReq,
            18 => Self::LeaveAns,
            19 => Self::UpdateReq,
            20 => Self::UpdateAns,
            23 => Self::PingReq,
            24 => Self::PingAns,
            29 => Self::AppAttachReq,
            30 => Self::AppAttachAns,
            0xffff => Self::Error,
            _ => return None,
        })
    }
}

/// Whether a raw code denotes a request. Requests have odd codes.
#[must_use]
pub fn is_request_code(code: u16) -> bool {
    code != MessageCode::Error as u16 && code % 2 == 1
}

/// Error codes carried in `Error` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Forbidden,
    NotFound,
    RequestTimeout,
    GenerationCounterTooLow,
    IncompatibleWithOverlay,
    UnsupportedForwardingOption,
    DataTooLarge,
    DataTooOld,
    TtlExceeded,
    MessageTooLarge,
    UnknownKind,
    UnknownExtension,
    ResponseTooLarge,
    InProgress,
    InvalidMessage,
    /// Any code this peer does not name.
    Other(u16),
}

impl ErrorCode {
    /// Wire value.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Forbidden => 2,
            Self::NotFound => 3,
            Self::RequestTimeout => 4,
            Self::GenerationCounterTooLow => 5,
            Self::IncompatibleWithOverlay => 6,
            Self::UnsupportedForwardingOption => 7,
            Self::DataTooLarge => 8,
            Self::DataTooOld => 9,
            Self::TtlExceeded => 10,
            Self::MessageTooLarge => 11,
            Self::UnknownKind => 12,
            Self::UnknownExtension => 13,
            Self::ResponseTooLarge => 14,
            Self::InProgress => 17,
            Self::InvalidMessage => 20,
            Self::Other(code) => code,
        }
    }

    /// Decode a wire value.
    #[must_use]
    pub fn from_u16(code: u16) -> Self {
        match code {
            2 => Self::Forbidden,
            3 => Self::NotFound,
            4 => Self::RequestTimeout,
            5 => Self::GenerationCounterTooLow,
            6 => Self::IncompatibleWithOverlay,
            7 => Self::UnsupportedForwardingOption,
            8 => Self::DataTooLarge,
            9 => Self::DataTooOld,
            10 => Self::TtlExceeded,
            11 => Self::MessageTooLarge,
            12 => Self::UnknownKind,
            13 => Self::UnknownExtension,
            14 => Self::ResponseTooLarge,
            17 => Self::InProgress,
            20 => Self::InvalidMessage,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "Error({code})"),
            named => write!(f, "{named:?}"),
        }
    }
}

// =============================================================================
// BODIES
// =============================================================================

/// Ping answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingAnswer {
    pub response_id: u64,
    /// Responder clock, milliseconds since the epoch.
    pub time: u64,
}

/// Attach request and answer share one shape. Candidates are opaque strings;
/// connectivity checks happen outside the peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttachRequest {
    pub ufrag: String,
    pub password: String,
    pub candidates: Vec<String>,
    pub send_update: bool,
}

/// AppAttach request and answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppAttachRequest {
    pub ufrag: String,
    pub password: String,
    /// Application port number.
    pub application: u16,
    pub candidates: Vec<String>,
}

/// Store request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    pub resource: ResourceId,
    /// 0 for the primary copy, positive for replicas.
    pub replica_number: u8,
    pub kind_data: Vec<StoreKindData>,
}

/// Generation reached by one kind after a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreKindResponse {
    pub kind: KindId,
    pub generation: u64,
}

/// Store answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreAnswer {
    pub kinds: Vec<StoreKindResponse>,
}

/// Fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub resource: ResourceId,
    pub specifiers: Vec<StoredDataSpecifier>,
}

/// Fetch answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchAnswer {
    pub kind_responses: Vec<FetchKindResponse>,
}

/// Join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub joining_peer: NodeId,
    pub overlay_data: Vec<u8>,
}

/// Leave request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    pub leaving_peer: NodeId,
    pub overlay_data: Vec<u8>,
}

/// Error answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorAnswer {
    pub code: ErrorCode,
    pub reason: String,
}

impl ErrorAnswer {
    /// Build an error answer.
    #[must_use]
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Typed message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    PingReq,
    PingAns(PingAnswer),
    AttachReq(AttachRequest),
    AttachAns(AttachRequest),
    StoreReq(StoreRequest),
    StoreAns(StoreAnswer),
    FetchReq(FetchRequest),
    FetchAns(FetchAnswer),
    JoinReq(JoinRequest),
    /// Topology-specific answer payload.
    JoinAns(Vec<u8>),
    LeaveReq(LeaveRequest),
    LeaveAns,
    /// Topology-specific update payload.
    UpdateReq(Vec<u8>),
    UpdateAns,
    AppAttachReq(AppAttachRequest),
    AppAttachAns(AppAttachRequest),
    Error(ErrorAnswer),
    /// A code this peer does not understand, carried verbatim.
    Unknown { code: u16, payload: Vec<u8> },
}

impl MessageBody {
    /// Wire code of this body.
    #[must_use]
    pub fn code(&self) -> u16 {
        let code = match self {
            Self::PingReq => MessageCode::PingReq,
            Self::PingAns(_) => MessageCode::PingAns,
            Self::AttachReq(_) => MessageCode::AttachReq,
            Self::AttachAns(_) => MessageCode::AttachAns,
            Self::StoreReq(_) => MessageCode::StoreReq,
            Self::StoreAns(_) => MessageCode::StoreAns,
            Self::FetchReq(_) => MessageCode::FetchReq,
            Self::FetchAns(_) => MessageCode::FetchAns,
            Self::JoinReq(_) => MessageCode::JoinReq,
            Self::JoinAns(_) => MessageCode::JoinAns,
            Self::LeaveReq(_) => MessageCode::LeaveReq,
            Self::LeaveAns => MessageCode::LeaveAns,
            Self::UpdateReq(_) => MessageCode::UpdateReq,
            Self::UpdateAns => MessageCode::UpdateAns,
            Self::AppAttachReq(_) => MessageCode::AppAttachReq,
            Self::AppAttachAns(_) => MessageCode::AppAttachAns,
            Self::Error(_) => MessageCode::Error,
            Self::Unknown { code, .. } => return *code,
        };
        code as u16
    }

    /// Whether this body is a request.
    #[must_use]
    pub fn is_request(&self) -> bool {
        is_request_code(self.code())
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// A complete overlay message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: ForwardingHeader,
    /// Peer that created the message.
    pub originator: NodeId,
    pub body: MessageBody,
    /// Opaque signature over the originator, transaction id and body.
    pub signature: Vec<u8>,
}

impl Message {
    /// A fresh, unsigned request.
    #[must_use]
    pub fn request(
        originator: NodeId,
        transaction_id: u64,
        destination_list: Vec<Destination>,
        body: MessageBody,
    ) -> Self {
        Self {
            header: ForwardingHeader {
                ttl: DEFAULT_TTL,
                transaction_id,
                via_list: Vec::new(),
                destination_list,
                overlay_options: None,
            },
            originator,
            body,
            signature: Vec::new(),
        }
    }

    /// The answer to `request`, created by `responder`.
    ///
    /// The answer retraces the via list in reverse, ends at the request's
    /// originator and keeps the transaction id. Cross-overlay options are
    /// swapped.
    #[must_use]
    pub fn answer_to(request: &Message, responder: NodeId, body: MessageBody) -> Self {
        let mut destination_list: Vec<Destination> =
            request.header.via_list.iter().rev().copied().collect();
        destination_list.push(Destination::Node(request.originator));
        Self {
            header: ForwardingHeader {
                ttl: DEFAULT_TTL,
                transaction_id: request.header.transaction_id,
                via_list: Vec::new(),
                destination_list,
                overlay_options: request
                    .header
                    .overlay_options
                    .as_ref()
                    .map(OverlayForwardingOptions::swapped),
            },
            originator: responder,
            body,
            signature: Vec::new(),
        }
    }

    /// Attach cross-overlay options.
    #[must_use]
    pub fn with_overlay_options(mut self, options: OverlayForwardingOptions) -> Self {
        self.header.overlay_options = Some(options);
        self
    }

    /// Override the hop budget.
    #[must_use]
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.header.ttl = ttl;
        self
    }

    /// Transaction id.
    #[must_use]
    pub fn transaction_id(&self) -> u64 {
        self.header.transaction_id
    }

    /// Whether this is a request.
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.body.is_request()
    }

    /// Head of the destination list.
    #[must_use]
    pub fn next_destination(&self) -> Option<&Destination> {
        self.header.destination_list.first()
    }
}
