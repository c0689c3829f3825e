//! Identifier generation for projects, nodes, edges and processes.
//!
//! Identifiers look like `prefix_1700000000000_k3j9x0a1b`: the prefix, the
//! current epoch milliseconds and nine random base-36 characters. Two calls
//! in the same millisecond are told apart by the random suffix only, so the
//! ids are unique in practice, not by guarantee.

use chrono::Utc;
use uuid::Uuid;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates an identifier with the given prefix.
pub fn generate_id(prefix: &str) -> String {
    format!(
        "{}_{}_{}",
        prefix,
        Utc::now().timestamp_millis(),
        random_base36(SUFFIX_LEN)
    )
}

/// Generates a project identifier (`project_…`).
pub fn generate_project_id() -> String {
    generate_id("project")
}

/// Generates a node identifier (`node_…`).
pub fn generate_node_id() -> String {
    generate_id("node")
}

/// Generates a process identifier (`process_…`).
pub fn generate_process_id() -> String {
    generate_id("process")
}

/// Generates an edge identifier (`edge_…`).
pub fn generate_edge_id() -> String {
    generate_id("edge")
}

fn random_base36(len: usize) -> String {
    // A v4 uuid carries 122 random bits, far more than nine base-36 digits need.
    let mut bits = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        out.push(BASE36[(bits % 36) as usize] as char);
        bits /= 36;
    }
    out
}
