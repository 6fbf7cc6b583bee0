//! Canonical CBOR encoding for deterministic serialization.
//!
//! RFC 8949 Core Deterministic Encoding: map keys sorted by encoded byte
//! comparison, smallest integer encodings, definite lengths only, no
//! floats.
//!
//! The canonical encoding is what makes two-phase mark binding possible:
//! an operation's identifier is a pure function of its content, so the
//! orchestrator can compute the id of a confirm operation before it is
//! ever submitted.

use ciborium::value::Value;

use crate::crypto::Digest;
use crate::operation::{Call, GroupId, OpId, Operation};

/// Operation field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const KIND: u64 = 0;
    pub const SENDER: u64 = 1;
    pub const GROUP: u64 = 2;
    pub const NOTE: u64 = 3;
    pub const APP_ID: u64 = 4;
    pub const CALL: u64 = 5;
    pub const RECEIVER: u64 = 6;
    pub const AMOUNT: u64 = 7;
}

/// Operation kind discriminants.
mod kind {
    pub const APP_CALL: u64 = 0;
    pub const PAYMENT: u64 = 1;
}

/// Call tag discriminants (first element of the call array).
mod call_tag {
    pub const REGISTER: u64 = 0;
    pub const SETUP: u64 = 1;
    pub const PREPARE: u64 = 2;
    pub const CONFIRM: u64 = 3;
    pub const CANCEL: u64 = 4;
    pub const UPDATE: u64 = 5;
    pub const DELETE: u64 = 6;
    pub const CLEAR: u64 = 7;
}

/// Encode an operation to canonical CBOR bytes.
///
/// This is also the message signed by a principal's root key.
pub fn canonical_bytes(op: &Operation) -> Vec<u8> {
    canonical_value_bytes(&operation_to_cbor_value(op))
}

/// Compute an operation's content-addressed identifier.
pub fn op_id(op: &Operation) -> OpId {
    OpId(*blake3::hash(&canonical_bytes(op)).as_bytes())
}

/// Compute the group identifier for an atomic batch.
///
/// Hash over the member ids computed with the group field cleared, so the
/// group id can be computed before it is assigned. Order matters: the
/// batch position is part of what `confirmLink` authorizes.
pub fn group_id(ops: &[Operation]) -> GroupId {
    let mut buf = Vec::with_capacity(12 + ops.len() * 32);
    buf.extend_from_slice(b"passlock/grp");
    for op in ops {
        let mut ungrouped = op.clone();
        ungrouped.set_group(None);
        buf.extend_from_slice(op_id(&ungrouped).as_bytes());
    }
    GroupId(*blake3::hash(&buf).as_bytes())
}

/// Assign the computed group id to every member of a batch.
pub fn assign_group(ops: &mut [Operation]) -> GroupId {
    let gid = group_id(ops);
    for op in ops.iter_mut() {
        op.set_group(Some(gid));
    }
    gid
}

/// Convert an operation to a CBOR Value (map with integer keys).
fn operation_to_cbor_value(op: &Operation) -> Value {
    let mut entries = Vec::with_capacity(6);

    let push_common =
        |entries: &mut Vec<(Value, Value)>, kind: u64, sender: &[u8], group: Option<&GroupId>, note: &[u8]| {
            entries.push((Value::Integer(keys::KIND.into()), Value::Integer(kind.into())));
            entries.push((
                Value::Integer(keys::SENDER.into()),
                Value::Bytes(sender.to_vec()),
            ));
            let group_value = match group {
                Some(gid) => Value::Bytes(gid.as_bytes().to_vec()),
                None => Value::Null,
            };
            entries.push((Value::Integer(keys::GROUP.into()), group_value));
            entries.push((Value::Integer(keys::NOTE.into()), Value::Bytes(note.to_vec())));
        };

    match op {
        Operation::AppCall {
            sender,
            app_id,
            call,
            note,
            group,
        } => {
            push_common(&mut entries, kind::APP_CALL, sender.as_bytes(), group.as_ref(), note);
            entries.push((
                Value::Integer(keys::APP_ID.into()),
                Value::Integer((*app_id).into()),
            ));
            entries.push((Value::Integer(keys::CALL.into()), call_to_cbor_value(call)));
        }
        Operation::Payment {
            sender,
            receiver,
            amount,
            note,
            group,
        } => {
            push_common(&mut entries, kind::PAYMENT, sender.as_bytes(), group.as_ref(), note);
            entries.push((
                Value::Integer(keys::RECEIVER.into()),
                Value::Bytes(receiver.as_bytes().to_vec()),
            ));
            entries.push((
                Value::Integer(keys::AMOUNT.into()),
                Value::Integer((*amount).into()),
            ));
        }
    }

    Value::Map(entries)
}

/// Convert a call to a CBOR array `[tag, args...]`.
fn call_to_cbor_value(call: &Call) -> Value {
    let digest = |d: &Digest| Value::Bytes(d.as_bytes().to_vec());

    let items = match call {
        Call::Register => vec![Value::Integer(call_tag::REGISTER.into())],
        Call::Setup { top, length } => vec![
            Value::Integer(call_tag::SETUP.into()),
            digest(top),
            Value::Integer((*length).into()),
        ],
        Call::Prepare { reveal, mark } => vec![
            Value::Integer(call_tag::PREPARE.into()),
            digest(reveal),
            Value::Bytes(mark.as_bytes().to_vec()),
        ],
        Call::Confirm { reveal } => {
            vec![Value::Integer(call_tag::CONFIRM.into()), digest(reveal)]
        }
        Call::Cancel { reveal } => {
            vec![Value::Integer(call_tag::CANCEL.into()), digest(reveal)]
        }
        Call::Update => vec![Value::Integer(call_tag::UPDATE.into())],
        Call::Delete => vec![Value::Integer(call_tag::DELETE.into())],
        Call::Clear => vec![Value::Integer(call_tag::CLEAR.into())],
    };

    Value::Array(items)
}

/// Encode a CBOR Value to canonical bytes.
///
/// This function ensures:
/// - Map keys are sorted by encoded byte comparison
/// - Integers use smallest encoding
/// - Definite lengths only
pub fn canonical_value_bytes(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => {
            encode_integer(buf, *i);
        }
        Value::Bytes(b) => {
            encode_bytes(buf, b);
        }
        Value::Text(s) => {
            encode_text(buf, s);
        }
        Value::Array(arr) => {
            encode_array(buf, arr);
        }
        Value::Map(entries) => {
            encode_map_canonical(buf, entries);
        }
        Value::Bool(b) => {
            buf.push(if *b { 0xf5 } else { 0xf4 });
        }
        Value::Null => {
            buf.push(0xf6);
        }
        Value::Float(_) => {
            panic!("floats not supported in canonical encoding");
        }
        _ => {
            panic!("unsupported CBOR value type");
        }
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        // Major type 0: unsigned integer
        encode_uint(buf, 0, n as u64);
    } else {
        // Major type 1: negative integer
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    // Encode all keys first to sort by encoded bytes
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    // Sort by encoded key bytes (lexicographic)
    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    // Write map header
    encode_uint(buf, 5, key_value_pairs.len() as u64);

    // Write sorted key-value pairs
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Address;
    use crate::operation::Mark;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 32])
    }

    #[test]
    fn test_canonical_bytes_deterministic() {
        let op = Operation::app_call(addr(1), 7, Call::Register);
        assert_eq!(canonical_bytes(&op), canonical_bytes(&op));
    }

    #[test]
    fn test_op_id_changes_with_content() {
        let a = Operation::payment(addr(1), addr(2), 100);
        let b = Operation::payment(addr(1), addr(2), 101);
        assert_ne!(op_id(&a), op_id(&b));
    }

    #[test]
    fn test_op_id_changes_with_group() {
        let mut grouped = Operation::payment(addr(1), addr(2), 100);
        let bare = grouped.clone();
        grouped.set_group(Some(GroupId::from_bytes([3; 32])));
        assert_ne!(op_id(&grouped), op_id(&bare));
    }

    #[test]
    fn test_group_id_ignores_assigned_group() {
        // The group id is computed over ungrouped ids, so assigning it
        // must not change it.
        let mut ops = vec![
            Operation::payment(addr(1), addr(2), 100),
            Operation::app_call(addr(1), 7, Call::Confirm { reveal: Digest::ZERO }),
        ];
        let before = group_id(&ops);
        let assigned = assign_group(&mut ops);
        assert_eq!(before, assigned);
        assert_eq!(group_id(&ops), before);
        assert_eq!(ops[0].group(), Some(&assigned));
    }

    #[test]
    fn test_group_id_position_sensitive() {
        let a = Operation::payment(addr(1), addr(2), 100);
        let b = Operation::app_call(addr(1), 7, Call::Confirm { reveal: Digest::ZERO });
        assert_ne!(
            group_id(&[a.clone(), b.clone()]),
            group_id(&[b, a])
        );
    }

    #[test]
    fn test_prepare_encoding_includes_mark() {
        let mk = |mark: Vec<u8>| {
            Operation::app_call(
                addr(1),
                7,
                Call::Prepare {
                    reveal: Digest::ZERO,
                    mark: Mark::from_bytes(mark),
                },
            )
        };
        assert_ne!(op_id(&mk(vec![1, 2])), op_id(&mk(vec![1, 3])));
    }
}
