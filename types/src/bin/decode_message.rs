use commonware_codec::{DecodeExt, EncodeSize};
use commonware_utils::from_hex_formatted;
use sqlchain_types::{Ack, AggregatedNoAckReport, NoAckReport, Request, Response};
use std::env;

fn usage() -> ! {
    eprintln!("usage: decode_message <request|response|ack|no-ack|aggregated> <hex>");
    std::process::exit(1);
}

fn main() {
    let mut args = env::args().skip(1);
    let (Some(kind), Some(hex)) = (args.next(), args.next()) else {
        usage();
    };

    let bytes = match from_hex_formatted(hex.trim()) {
        Some(bytes) => bytes,
        None => {
            eprintln!("invalid hex string");
            std::process::exit(1);
        }
    };

    let (size, verified) = match kind.as_str() {
        "request" => match Request::decode(bytes.as_slice()) {
            Ok(request) => {
                println!("kind: Request");
                println!("node: {}", request.header.node_id);
                println!("database: {}", request.header.database_id);
                println!("connection: {}, seq: {}", request.header.connection_id, request.header.seq_no);
                println!("batch count: {}", request.header.batch_count);
                println!("queries: {}", request.payload.queries.len());
                (request.encode_size(), request.verify())
            }
            Err(err) => decode_failed(err),
        },
        "response" => match Response::decode(bytes.as_slice()) {
            Ok(response) => {
                println!("kind: Response");
                println!("node: {}", response.header.node_id);
                println!("request node: {}", response.header.request.node_id);
                println!("row count: {}", response.header.row_count);
                println!("columns: {}", response.payload.columns.join(","));
                (response.encode_size(), response.verify())
            }
            Err(err) => decode_failed(err),
        },
        "ack" => match Ack::decode(bytes.as_slice()) {
            Ok(ack) => {
                println!("kind: Ack");
                println!("node: {}", ack.header.node_id);
                println!("response node: {}", ack.header.response.node_id);
                (ack.encode_size(), ack.verify())
            }
            Err(err) => decode_failed(err),
        },
        "no-ack" => match NoAckReport::decode(bytes.as_slice()) {
            Ok(report) => {
                println!("kind: NoAckReport");
                println!("node: {}", report.header.node_id);
                println!("response node: {}", report.header.response.node_id);
                (report.encode_size(), report.verify())
            }
            Err(err) => decode_failed(err),
        },
        "aggregated" => match AggregatedNoAckReport::decode(bytes.as_slice()) {
            Ok(aggr) => {
                println!("kind: AggregatedNoAckReport");
                println!("node: {}", aggr.header.node_id);
                println!("reports: {}", aggr.header.reports.len());
                println!(
                    "peers: term={}, leader={}, servers={}",
                    aggr.header.peers.term,
                    aggr.header.peers.leader,
                    aggr.header.peers.servers.len()
                );
                (aggr.encode_size(), aggr.verify())
            }
            Err(err) => decode_failed(err),
        },
        _ => usage(),
    };

    println!("decoded: {size} bytes");
    match verified {
        Ok(()) => println!("verify: ok"),
        Err(err) => println!("verify: {err}"),
    }
}

fn decode_failed(err: commonware_codec::Error) -> ! {
    eprintln!("decode error: {err}");
    std::process::exit(1);
}
