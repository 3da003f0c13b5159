use bytes::BytesMut;
use tracing;

use dns_types::protocol::serialise;
use dns_types::protocol::types::*;
use dns_types::zones::types::Zones;

use crate::answer::find_answer;

/// Largest response we will put on a TCP stream: the length prefix is
/// 16 bits, minus the two octets of the prefix itself.
pub const TCP_MAX_PAYLOAD: usize = 65533;

/// UDP size budget when EDNS is not in play (RFC 1035).
pub const UDP_FALLBACK_PAYLOAD: usize = 512;

/// Default largest EDNS UDP payload we are willing to send.
pub const DEFAULT_EDNS_UDP_MAX: u16 = 1432;

/// Default EDNS UDP payload we advertise in responses.
pub const DEFAULT_EDNS_UDP_ADVERTISED: u16 = 1232;

/// Which transport a query arrived over.  This decides the response
/// size budget.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

/// EDNS policy knobs, from configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ResponsePolicy {
    /// Largest EDNS UDP payload we send.  Zero disables EDNS
    /// entirely.
    pub edns_udp_max: u16,

    /// The payload size we advertise in our OPT.
    pub edns_udp_advertised: u16,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            edns_udp_max: DEFAULT_EDNS_UDP_MAX,
            edns_udp_advertised: DEFAULT_EDNS_UDP_ADVERTISED,
        }
    }
}

impl ResponsePolicy {
    pub fn edns_disabled(self) -> bool {
        self.edns_udp_max == 0
    }

    fn response_edns(self) -> Edns {
        Edns {
            payload_size: self.edns_udp_advertised,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
        }
    }
}

/// The dispatch surface: parsed query in, wire response out.  Pure
/// over the zone store; the caller does all I/O.
///
/// Returns `None` for messages this server will not answer at all: a
/// message that is itself a response, or one without exactly one
/// question.
pub fn handle_query(
    zones: &Zones,
    policy: ResponsePolicy,
    query: &Message,
    transport: Transport,
) -> Option<BytesMut> {
    if query.header.is_response {
        tracing::debug!(id = %query.header.id, "dropping response-flagged query");
        return None;
    }
    if query.questions.len() != 1 {
        tracing::debug!(
            id = %query.header.id,
            questions = %query.questions.len(),
            "dropping query without exactly one question"
        );
        return None;
    }

    let mut response = build_response(zones, policy, query);
    match encode_response(&mut response, query, policy, transport) {
        Ok(octets) => Some(octets),
        Err(error) => {
            tracing::warn!(id = %query.header.id, ?error, "could not serialise response");
            None
        }
    }
}

/// Build the response message: EDNS negotiation, class and meta-type
/// policy, then the resolver, then the AA decision.
pub fn build_response(zones: &Zones, policy: ResponsePolicy, query: &Message) -> Message {
    let question = &query.questions[0];
    let mut response = query.make_response();

    if !policy.edns_disabled() {
        if let Some(edns) = &query.edns {
            // we only speak version 0
            if edns.version > 0 {
                response.edns = Some(policy.response_edns());
                response.header.rcode = Rcode::BadVers;
                return response;
            }
            response.edns = Some(policy.response_edns());
        }
    }

    if question.qclass != QueryClass::Record(RecordClass::IN) {
        response.header.rcode = Rcode::Refused;
        return response;
    }

    // meta types (ANY, AXFR, ...) are not implemented, but the name
    // walk still runs: the reply is NOTIMP with an empty answer
    if question.qtype.is_meta() {
        response.header.rcode = Rcode::NotImplemented;
    }

    let answer = find_answer(
        zones,
        &question.name,
        question.qtype,
        response.header.rcode,
    );
    response.header.rcode = answer.rcode;
    response.answers = answer.answers;
    response.authority = answer.authority;
    response.additional = answer.additional;

    // authoritative unless this is a pure referral
    response.header.is_authoritative = !answer.is_referral || !response.answers.is_empty();

    response
}

/// Encode with the transport's size budget, truncating on overflow:
/// TC is set, the three record sections are dropped, and the OPT (if
/// any) survives.
///
/// # Errors
///
/// If the message cannot be serialised at all.
pub fn encode_response(
    response: &mut Message,
    query: &Message,
    policy: ResponsePolicy,
    transport: Transport,
) -> Result<BytesMut, serialise::Error> {
    let budget = max_response_size(query, policy, transport);

    let mut octets = response.to_octets()?;
    if octets.len() > budget {
        tracing::debug!(
            id = %response.header.id,
            size = %octets.len(),
            %budget,
            "truncating response"
        );
        response.header.is_truncated = true;
        response.answers.clear();
        response.authority.clear();
        response.additional.clear();
        octets = response.to_octets()?;
    }

    Ok(octets)
}

/// The response size budget: 65533 for TCP; for UDP, 512 without
/// EDNS, otherwise the smaller of what the client advertised and what
/// we are willing to send.
pub fn max_response_size(query: &Message, policy: ResponsePolicy, transport: Transport) -> usize {
    match transport {
        Transport::Tcp => TCP_MAX_PAYLOAD,
        Transport::Udp => match &query.edns {
            Some(edns) if !policy.edns_disabled() => {
                std::cmp::min(edns.payload_size, policy.edns_udp_max) as usize
            }
            _ => UDP_FALLBACK_PAYLOAD,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use dns_types::protocol::types::test_util::*;
    use dns_types::zones::types::Zone;

    fn example_zones() -> Zones {
        let mut zones = Zones::new();
        zones.insert(
            Zone::deserialise(
                "$ORIGIN example.com.\n\
                 @      300 IN SOA   ns1.example.com. admin.example.com. 1 7200 3600 1209600 300\n\
                 @      300 IN NS    ns1.example.com.\n\
                 ns1    300 IN A     10.0.0.53\n\
                 a      300 IN A     10.0.0.1\n\
                 cname  300 IN CNAME a.example.com.\n\
                 sub    300 IN NS    ns.sub.example.com.\n\
                 ns.sub 300 IN A     10.0.0.2",
            )
            .unwrap(),
        );
        zones
    }

    /// A zone whose `big.` name answers with far more than 512 octets
    /// of TXT data.
    fn big_zones() -> Zones {
        let mut zone_data = "$ORIGIN example.com.\n\
                             @ 300 IN SOA ns1.example.com. admin.example.com. 1 30 30 30 300\n\
                             @ 300 IN NS  ns1.example.com.\n"
            .to_string();
        for i in 0..20 {
            zone_data.push_str(&format!("big 300 IN TXT \"{i:02} {}\"\n", "x".repeat(40)));
        }

        let mut zones = Zones::new();
        zones.insert(Zone::deserialise(&zone_data).unwrap());
        zones
    }

    fn a_query(id: u16, name: &str) -> Message {
        Message::from_question(
            id,
            Question {
                name: domain(name),
                qtype: QueryType::Record(RecordType::A),
                qclass: QueryClass::Record(RecordClass::IN),
            },
        )
    }

    fn txt_query(id: u16, name: &str) -> Message {
        Message::from_question(
            id,
            Question {
                name: domain(name),
                qtype: QueryType::Record(RecordType::TXT),
                qclass: QueryClass::Record(RecordClass::IN),
            },
        )
    }

    #[test]
    fn response_echoes_query() {
        let mut query = a_query(0x1234, "a.example.com.");
        query.header.recursion_desired = true;

        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(0x1234, response.header.id);
        assert!(response.header.is_response);
        assert_eq!(query.header.opcode, response.header.opcode);
        assert!(response.header.recursion_desired);
        assert!(!response.header.recursion_available);
        assert_eq!(query.questions, response.questions);
    }

    #[test]
    fn positive_answer_is_authoritative() {
        let query = a_query(1, "a.example.com.");
        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(Rcode::NoError, response.header.rcode);
        assert!(response.header.is_authoritative);
        assert_eq!(
            vec![a_record("a.example.com.", Ipv4Addr::new(10, 0, 0, 1))],
            response.answers
        );
        assert!(response.authority.is_empty());
    }

    #[test]
    fn nxdomain_is_authoritative_with_soa() {
        let query = a_query(1, "missing.example.com.");
        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(Rcode::NameError, response.header.rcode);
        assert!(response.header.is_authoritative);
        assert!(response.answers.is_empty());
        assert_eq!(1, response.authority.len());
    }

    #[test]
    fn referral_is_not_authoritative() {
        let query = a_query(1, "host.sub.example.com.");
        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(Rcode::NoError, response.header.rcode);
        assert!(!response.header.is_authoritative);
        assert!(response.answers.is_empty());
        assert!(!response.authority.is_empty());
    }

    #[test]
    fn refused_outside_zones_is_still_flagged_authoritative() {
        // not a referral and no answers: the AA rule of the original
        // marks this authoritative
        let query = a_query(1, "example.net.");
        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(Rcode::Refused, response.header.rcode);
        assert!(response.header.is_authoritative);
    }

    #[test]
    fn chaos_class_is_refused() {
        let mut query = a_query(1, "a.example.com.");
        query.questions[0].qclass = QueryClass::Record(RecordClass::from(3));

        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(Rcode::Refused, response.header.rcode);
        assert!(response.answers.is_empty());
        assert!(!response.header.is_authoritative);
    }

    #[test]
    fn meta_qtype_is_notimp_with_empty_answer() {
        let mut query = a_query(1, "a.example.com.");
        query.questions[0].qtype = QueryType::Wildcard;

        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(Rcode::NotImplemented, response.header.rcode);
        assert!(response.answers.is_empty());
        // the walk still ran: NODATA placed the SOA
        assert_eq!(1, response.authority.len());
    }

    #[test]
    fn edns_query_gets_edns_response() {
        let mut query = a_query(1, "a.example.com.");
        query.edns = Some(Edns {
            payload_size: 4096,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
        });

        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(Rcode::NoError, response.header.rcode);
        assert_eq!(
            Some(Edns {
                payload_size: DEFAULT_EDNS_UDP_ADVERTISED,
                extended_rcode: 0,
                version: 0,
                dnssec_ok: false,
            }),
            response.edns
        );
    }

    #[test]
    fn plain_query_gets_no_edns() {
        let query = a_query(1, "a.example.com.");
        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(None, response.edns);
    }

    #[test]
    fn edns_disabled_strips_opt() {
        let mut query = a_query(1, "a.example.com.");
        query.edns = Some(Edns {
            payload_size: 4096,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
        });

        let policy = ResponsePolicy {
            edns_udp_max: 0,
            ..ResponsePolicy::default()
        };
        let response = build_response(&example_zones(), policy, &query);

        assert_eq!(None, response.edns);
        assert_eq!(Rcode::NoError, response.header.rcode);
    }

    #[test]
    fn edns_version_1_is_badvers() {
        let mut query = a_query(1, "a.example.com.");
        query.edns = Some(Edns {
            payload_size: 4096,
            extended_rcode: 0,
            version: 1,
            dnssec_ok: false,
        });

        let response = build_response(&example_zones(), ResponsePolicy::default(), &query);

        assert_eq!(Rcode::BadVers, response.header.rcode);
        assert!(response.answers.is_empty());
        assert!(response.authority.is_empty());
        assert!(response.edns.is_some());
        assert!(!response.header.is_authoritative);
    }

    #[test]
    fn udp_budget_without_edns_is_512() {
        let query = a_query(1, "a.example.com.");
        assert_eq!(
            512,
            max_response_size(&query, ResponsePolicy::default(), Transport::Udp)
        );
    }

    #[test]
    fn udp_budget_is_min_of_client_and_policy() {
        let mut query = a_query(1, "a.example.com.");
        query.edns = Some(Edns {
            payload_size: 4096,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
        });

        assert_eq!(
            1432,
            max_response_size(&query, ResponsePolicy::default(), Transport::Udp)
        );

        query.edns = Some(Edns {
            payload_size: 600,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
        });
        assert_eq!(
            600,
            max_response_size(&query, ResponsePolicy::default(), Transport::Udp)
        );
    }

    #[test]
    fn tcp_budget_is_fixed() {
        let query = a_query(1, "a.example.com.");
        assert_eq!(
            TCP_MAX_PAYLOAD,
            max_response_size(&query, ResponsePolicy::default(), Transport::Tcp)
        );
    }

    #[test]
    fn oversized_udp_response_is_truncated_to_empty() {
        let query = txt_query(1, "big.example.com.");
        let octets =
            handle_query(&big_zones(), ResponsePolicy::default(), &query, Transport::Udp).unwrap();

        assert!(octets.len() <= 512);
        // TC bit
        assert_ne!(0, octets[2] & 0b0000_0010);
        // ANCOUNT, NSCOUNT, ARCOUNT all zero
        assert_eq!(&[0u8, 0, 0, 0, 0, 0][..], &octets[6..12]);
    }

    #[test]
    fn edns_budget_avoids_truncation() {
        let mut query = txt_query(1, "big.example.com.");
        query.edns = Some(Edns {
            payload_size: 4096,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
        });

        let octets =
            handle_query(&big_zones(), ResponsePolicy::default(), &query, Transport::Udp).unwrap();

        assert!(octets.len() > 512);
        assert!(octets.len() <= 1432);
        assert_eq!(0, octets[2] & 0b0000_0010);
    }

    #[test]
    fn truncated_response_keeps_opt() {
        let mut query = txt_query(1, "big.example.com.");
        // client advertises less than the answer needs
        query.edns = Some(Edns {
            payload_size: 512,
            extended_rcode: 0,
            version: 0,
            dnssec_ok: false,
        });

        let octets =
            handle_query(&big_zones(), ResponsePolicy::default(), &query, Transport::Udp).unwrap();

        assert!(octets.len() <= 512);
        assert_ne!(0, octets[2] & 0b0000_0010);
        // ARCOUNT is 1: the OPT survived truncation
        assert_eq!(&[0u8, 1][..], &octets[10..12]);
    }

    #[test]
    fn tcp_carries_large_responses() {
        let query = txt_query(1, "big.example.com.");
        let octets =
            handle_query(&big_zones(), ResponsePolicy::default(), &query, Transport::Tcp).unwrap();

        assert!(octets.len() > 512);
        assert_eq!(0, octets[2] & 0b0000_0010);
    }

    #[test]
    fn response_messages_are_dropped() {
        let mut query = a_query(1, "a.example.com.");
        query.header.is_response = true;

        assert_eq!(
            None,
            handle_query(
                &example_zones(),
                ResponsePolicy::default(),
                &query,
                Transport::Udp
            )
        );
    }

    #[test]
    fn multi_question_messages_are_dropped() {
        let mut query = a_query(1, "a.example.com.");
        query.questions.push(query.questions[0].clone());

        assert_eq!(
            None,
            handle_query(
                &example_zones(),
                ResponsePolicy::default(),
                &query,
                Transport::Udp
            )
        );
    }
}
