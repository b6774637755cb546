//! Operations behind the `sample` and `verify` subcommands.

use crate::ValidatedConfig;
use commonware_codec::{DecodeExt, Encode, EncodeSize};
use commonware_utils::{from_hex_formatted, hex};
use sqlchain_types::{
    Ack, AckHeader, AggregatedNoAckReport, NoAckReport, NodeId, Query, QueryType, Request,
    RequestHeader, RequestPayload, Response, ResponseHeader, ResponsePayload, ResponseRow, Value,
};
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::{debug, info};

/// Message kinds accepted by `verify`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Request,
    Response,
    Ack,
    NoAck,
    Aggregated,
}

impl Kind {
    pub const NAMES: [&'static str; 5] = ["request", "response", "ack", "no-ack", "aggregated"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Request => "request",
            Kind::Response => "response",
            Kind::Ack => "ack",
            Kind::NoAck => "no-ack",
            Kind::Aggregated => "aggregated",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CommandError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "request" => Ok(Kind::Request),
            "response" => Ok(Kind::Response),
            "ack" => Ok(Kind::Ack),
            "no-ack" => Ok(Kind::NoAck),
            "aggregated" => Ok(Kind::Aggregated),
            other => Err(CommandError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown message kind: {0}")]
    UnknownKind(String),
    #[error("message must be hex")]
    InvalidHex,
    #[error("decode failed: {0}")]
    Decode(#[from] commonware_codec::Error),
    #[error("{kind} {source}")]
    Verify {
        kind: Kind,
        #[source]
        source: sqlchain_types::Error,
    },
}

/// A signed Request, its Response and an Ack of that response.
#[derive(Clone, Debug)]
pub struct SampleChain {
    pub request: Request,
    pub response: Response,
    pub ack: Ack,
}

impl SampleChain {
    /// Hex encodings in chain order.
    pub fn to_hex(&self) -> [(Kind, String); 3] {
        [
            (Kind::Request, hex(&self.request.encode())),
            (Kind::Response, hex(&self.response.encode())),
            (Kind::Ack, hex(&self.ack.encode())),
        ]
    }
}

/// Build and sign a chain with the configured key acting as every party.
pub fn sample_chain(
    config: &ValidatedConfig,
    rows: usize,
    timestamp: u64,
) -> Result<SampleChain, sqlchain_types::Error> {
    let mut request = Request::new(
        RequestHeader {
            query_type: QueryType::Read,
            node_id: config.node_id.clone(),
            database_id: config.database_id.clone(),
            connection_id: 1,
            seq_no: 1,
            timestamp,
            ..Default::default()
        },
        RequestPayload {
            queries: vec![Query::new("SELECT id, name FROM sample WHERE id < :limit")
                .with_arg("limit", Value::Integer(rows as i64))],
        },
    );
    request.header.signee = Some(config.public_key.clone());
    request.sign_with(&config.signer, &config.policy)?;
    debug!(kind = "request", "signed");

    let mut response = Response::new(
        ResponseHeader::new(request.header.clone(), config.node_id.clone(), timestamp + 1),
        ResponsePayload {
            columns: vec!["id".into(), "name".into()],
            decl_types: vec!["INTEGER".into(), "TEXT".into()],
            rows: (0..rows)
                .map(|i| ResponseRow {
                    values: vec![Value::Integer(i as i64), Value::Text(format!("row-{i}"))],
                })
                .collect(),
        },
    );
    response.header.signee = Some(config.public_key.clone());
    response.sign_with(&config.signer, &config.policy)?;
    debug!(kind = "response", rows, "signed");

    let mut ack = Ack::new(AckHeader {
        response: response.header.clone(),
        node_id: config.node_id.clone(),
        timestamp: timestamp + 2,
    });
    ack.header.signee = Some(config.public_key.clone());
    ack.sign_with(&config.signer, &config.policy)?;
    debug!(kind = "ack", "signed");

    Ok(SampleChain {
        request,
        response,
        ack,
    })
}

/// What a successfully verified message looked like.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub kind: Kind,
    pub node_id: NodeId,
    pub size: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} ({} bytes) verified", self.kind, self.node_id, self.size)
    }
}

/// Decode a hex message of the given kind and verify its whole chain.
pub fn verify_hex(
    kind: Kind,
    value: &str,
    config: &ValidatedConfig,
) -> Result<Summary, CommandError> {
    let bytes = from_hex_formatted(value.trim()).ok_or(CommandError::InvalidHex)?;
    let policy = &config.policy;
    let verified = |result: Result<(), sqlchain_types::Error>| {
        result.map_err(|source| CommandError::Verify { kind, source })
    };
    let (node_id, size) = match kind {
        Kind::Request => {
            let msg = Request::decode(bytes.as_slice())?;
            verified(msg.verify_with(policy))?;
            (msg.header.node_id.clone(), msg.encode_size())
        }
        Kind::Response => {
            let msg = Response::decode(bytes.as_slice())?;
            verified(msg.verify_with(policy))?;
            (msg.header.node_id.clone(), msg.encode_size())
        }
        Kind::Ack => {
            let msg = Ack::decode(bytes.as_slice())?;
            verified(msg.verify_with(policy))?;
            (msg.header.node_id.clone(), msg.encode_size())
        }
        Kind::NoAck => {
            let msg = NoAckReport::decode(bytes.as_slice())?;
            verified(msg.verify_with(policy))?;
            (msg.header.node_id.clone(), msg.encode_size())
        }
        Kind::Aggregated => {
            let msg = AggregatedNoAckReport::decode(bytes.as_slice())?;
            verified(msg.verify_with(policy))?;
            (msg.header.node_id.clone(), msg.encode_size())
        }
    };
    let summary = Summary {
        kind,
        node_id,
        size,
    };
    info!(kind = %kind, node = %summary.node_id, size, "message verified");
    Ok(summary)
}
