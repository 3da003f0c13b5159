#![warn(clippy::pedantic)]
// Sometimes a redundant else is clearer
#![allow(clippy::redundant_else)]
// Don't care enough to fix
#![allow(clippy::match_same_arms)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::wildcard_imports)]

//! The authoritative answering engine: given loaded zones and a
//! parsed query, produce the response defined by the RFC 1034
//! nameserver algorithm with CNAME chaining, DNAME substitution,
//! wildcards, delegations, and EDNS(0) size negotiation.

pub mod answer;
pub mod net_util;
pub mod response;
