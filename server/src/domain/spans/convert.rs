//! Schema conversion between v1 and v2 spans
//!
//! `from_v1` is one-to-many: a v1 span that carries both client and server
//! core annotations describes two hosts and decomposes into a CLIENT span and
//! a shared SERVER span. `to_v1` is one-to-one.

use super::v1::{
    self, BinaryAnnotation, CLIENT_ADDR, CLIENT_RECV, CLIENT_SEND, LOCAL_COMPONENT, MESSAGE_ADDR,
    MESSAGE_RECV, MESSAGE_SEND, SERVER_ADDR, SERVER_RECV, SERVER_SEND, WIRE_RECV, WIRE_SEND,
};
use super::v2::{self, Endpoint, Kind};

/// Convert a v1 span into the v2 spans it describes.
///
/// The result is never empty. Identifiers, name and debug flag are copied to
/// every output span.
pub fn from_v1(source: &v1::Span) -> Vec<v2::Span> {
    let cs = source.annotation(CLIENT_SEND);
    let cr = source.annotation(CLIENT_RECV);
    let sr = source.annotation(SERVER_RECV);
    let ss = source.annotation(SERVER_SEND);

    let has_client = cs.is_some() || cr.is_some();
    let has_server = sr.is_some() || ss.is_some();

    let mut spans: Vec<v2::Span> = Vec::with_capacity(2);
    let mut consumed: Vec<&str> = Vec::new();

    if has_client {
        let mut span = base_span(source);
        span.kind = Some(Kind::Client);
        span.local_endpoint = cs.or(cr).and_then(|a| a.endpoint.clone());
        span.timestamp = source.timestamp.or(cs.map(|a| a.timestamp));
        span.duration = source.duration.or_else(|| elapsed(cs, cr));
        spans.push(span);
        consumed.extend([CLIENT_SEND, CLIENT_RECV]);
    }

    if has_server {
        let mut span = base_span(source);
        span.kind = Some(Kind::Server);
        span.local_endpoint = sr.or(ss).and_then(|a| a.endpoint.clone());
        if has_client {
            // The client owns the v1 timing; the server half shares its ids.
            span.shared = Some(true);
            span.timestamp = sr.map(|a| a.timestamp);
            span.duration = elapsed(sr, ss);
        } else {
            span.timestamp = source.timestamp.or(sr.map(|a| a.timestamp));
            span.duration = source.duration.or_else(|| elapsed(sr, ss));
        }
        spans.push(span);
        consumed.extend([SERVER_RECV, SERVER_SEND]);
    }

    if !has_client && !has_server {
        let ms = source.annotation(MESSAGE_SEND);
        let ws = source.annotation(WIRE_SEND);
        let wr = source.annotation(WIRE_RECV);
        let mr = source.annotation(MESSAGE_RECV);

        let mut span = base_span(source);
        span.timestamp = source.timestamp;
        span.duration = source.duration;

        if ms.is_some() || ws.is_some() {
            span.kind = Some(Kind::Producer);
            span.local_endpoint = ms.or(ws).and_then(|a| a.endpoint.clone());
            span.timestamp = span.timestamp.or(ms.or(ws).map(|a| a.timestamp));
            span.duration = span.duration.or_else(|| elapsed(ms, ws));
            consumed.extend([MESSAGE_SEND, WIRE_SEND]);
        } else if wr.is_some() || mr.is_some() {
            span.kind = Some(Kind::Consumer);
            span.local_endpoint = wr.or(mr).and_then(|a| a.endpoint.clone());
            span.timestamp = span.timestamp.or(wr.or(mr).map(|a| a.timestamp));
            span.duration = span.duration.or_else(|| elapsed(wr, mr));
            consumed.extend([WIRE_RECV, MESSAGE_RECV]);
        } else {
            span.local_endpoint = source
                .binary_annotation(LOCAL_COMPONENT)
                .and_then(|b| b.endpoint.clone())
                .or_else(|| source.annotations.iter().find_map(|a| a.endpoint.clone()))
                .or_else(|| {
                    source
                        .binary_annotations
                        .iter()
                        .filter(|b| !b.is_address())
                        .find_map(|b| b.endpoint.clone())
                });
        }
        spans.push(span);
    }

    for annotation in &source.annotations {
        if consumed.contains(&annotation.value.as_str()) {
            continue;
        }
        let target = target_index(&spans, annotation.endpoint.as_ref());
        spans[target].annotations.push(v2::Annotation {
            timestamp: annotation.timestamp,
            value: annotation.value.clone(),
        });
    }

    for binary in &source.binary_annotations {
        apply_binary_annotation(&mut spans, binary);
    }

    for span in &mut spans {
        span.annotations.sort_by_key(|a| a.timestamp);
    }

    spans
}

/// Convert a v2 span back into its v1 form.
pub fn to_v1(source: &v2::Span) -> v1::Span {
    let local = source.local_endpoint.clone();

    let mut span = v1::Span {
        trace_id: source.trace_id.clone(),
        name: source.name.clone().unwrap_or_default(),
        id: source.id.clone(),
        parent_id: source.parent_id.clone(),
        debug: source.debug,
        ..Default::default()
    };

    if !source.is_shared() {
        span.timestamp = source.timestamp;
        span.duration = source.duration;
    }

    if let Some(kind) = source.kind {
        let (begin, end, address) = match kind {
            Kind::Client => (CLIENT_SEND, CLIENT_RECV, SERVER_ADDR),
            Kind::Server => (SERVER_RECV, SERVER_SEND, CLIENT_ADDR),
            Kind::Producer => (MESSAGE_SEND, WIRE_SEND, MESSAGE_ADDR),
            Kind::Consumer => (WIRE_RECV, MESSAGE_RECV, MESSAGE_ADDR),
        };

        if let Some(ts) = source.timestamp {
            match source.duration {
                Some(duration) => {
                    span.annotations
                        .push(v1::Annotation::new(ts, begin, local.clone()));
                    // An end past u64::MAX is unrepresentable, keep only the start.
                    if let Some(finish) = ts.checked_add(duration) {
                        span.annotations
                            .push(v1::Annotation::new(finish, end, local.clone()));
                    }
                }
                // A consumer without duration only records the message receipt.
                None if kind == Kind::Consumer => {
                    span.annotations
                        .push(v1::Annotation::new(ts, MESSAGE_RECV, local.clone()));
                }
                None => {
                    span.annotations
                        .push(v1::Annotation::new(ts, begin, local.clone()));
                }
            }
        }

        if let Some(remote) = &source.remote_endpoint {
            span.binary_annotations
                .push(BinaryAnnotation::address(address, remote.clone()));
        }
    } else if local.is_some() && !source.tags.contains_key(LOCAL_COMPONENT) {
        span.binary_annotations
            .push(BinaryAnnotation::tag(LOCAL_COMPONENT, "", local.clone()));
    }

    for annotation in &source.annotations {
        span.annotations.push(v1::Annotation::new(
            annotation.timestamp,
            annotation.value.clone(),
            local.clone(),
        ));
    }

    for (key, value) in &source.tags {
        span.binary_annotations
            .push(BinaryAnnotation::tag(key.clone(), value.clone(), local.clone()));
    }

    span.annotations.sort_by_key(|a| a.timestamp);
    span
}

fn base_span(source: &v1::Span) -> v2::Span {
    v2::Span {
        trace_id: source.trace_id.clone(),
        parent_id: source.parent_id.clone(),
        id: source.id.clone(),
        name: (!source.name.is_empty()).then(|| source.name.clone()),
        debug: source.debug,
        ..Default::default()
    }
}

fn elapsed(begin: Option<&v1::Annotation>, end: Option<&v1::Annotation>) -> Option<u64> {
    match (begin, end) {
        (Some(b), Some(e)) if e.timestamp >= b.timestamp => Some(e.timestamp - b.timestamp),
        _ => None,
    }
}

/// Index of the span hosted on `endpoint`, falling back to the first span.
fn target_index(spans: &[v2::Span], endpoint: Option<&Endpoint>) -> usize {
    endpoint
        .and_then(|ep| {
            spans
                .iter()
                .position(|s| s.local_endpoint.as_ref() == Some(ep))
        })
        .unwrap_or(0)
}

fn position_of_kind(spans: &[v2::Span], kinds: &[Kind]) -> Option<usize> {
    spans
        .iter()
        .position(|s| s.kind.is_some_and(|k| kinds.contains(&k)))
}

fn apply_binary_annotation(spans: &mut [v2::Span], binary: &BinaryAnnotation) {
    match binary.key.as_str() {
        CLIENT_ADDR | SERVER_ADDR | MESSAGE_ADDR => {
            let Some(endpoint) = binary.endpoint.clone() else {
                return;
            };
            let remote_of = match binary.key.as_str() {
                CLIENT_ADDR => position_of_kind(spans, &[Kind::Server]),
                SERVER_ADDR => position_of_kind(spans, &[Kind::Client]),
                _ => position_of_kind(spans, &[Kind::Producer, Kind::Consumer]),
            };
            match remote_of {
                Some(index) => spans[index].remote_endpoint = Some(endpoint),
                // Without a peer span the address names the local host.
                None => {
                    if spans[0].local_endpoint.is_none() {
                        spans[0].local_endpoint = Some(endpoint);
                    }
                }
            }
        }
        LOCAL_COMPONENT => {
            let value = binary.value.to_tag_value();
            if !value.is_empty() {
                let target = target_index(spans, binary.endpoint.as_ref());
                spans[target]
                    .tags
                    .insert(LOCAL_COMPONENT.to_string(), value);
            }
        }
        _ => {
            let target = target_index(spans, binary.endpoint.as_ref());
            spans[target]
                .tags
                .insert(binary.key.clone(), binary.value.to_tag_value());
        }
    }
}
