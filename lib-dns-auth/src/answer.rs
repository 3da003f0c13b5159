use tracing;

use dns_types::protocol::types::*;
use dns_types::zones::types::*;

/// The sections and flags the resolver produced for one query.  The
/// response builder merges this into the reply message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub rcode: Rcode,
    pub is_referral: bool,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

/// Answer a question from the zones.
///
/// This is the standard nameserver algorithm of RFC 1034 section
/// 4.3.2: find the closest enclosing zone, walk the name from the
/// apex downwards classifying each visited name, and emit records.
/// CNAME and DNAME redirections restart the walk at the new name,
/// possibly in a different zone; the visited-owner lists bound those
/// chains (a repeated owner is answered SERVFAIL).
///
/// `rcode` is the rcode of the response being built so far: the walk
/// only overwrites it when it has something to say, so an earlier
/// NOTIMP survives a NODATA result.
pub fn find_answer(zones: &Zones, qname: &DomainName, qtype: QueryType, rcode: Rcode) -> Answer {
    let mut walk = NameWalk {
        zones,
        rcode,
        is_referral: false,
        answers: Vec::new(),
        authority: Vec::new(),
        additional: Vec::new(),
        cname_owners: Vec::new(),
        dname_owners: Vec::new(),
    };

    // aliases are chased iteratively rather than recursively: each
    // redirection pushes a not-yet-seen owner onto a visited list, so
    // this terminates
    let mut target = qname.clone();
    loop {
        match walk.find_answer(&target, qtype) {
            Step::Done => break,
            Step::Chase(next) => target = next,
        }
    }

    Answer {
        rcode: walk.rcode,
        is_referral: walk.is_referral,
        answers: walk.answers,
        authority: walk.authority,
        additional: walk.additional,
    }
}

/// What to do after a name has been fully processed.
enum Step {
    /// The response is complete.
    Done,
    /// An alias redirected the question: restart at this name.
    Chase(DomainName),
}

/// The per-name classification outcome during the zone walk.
enum Walk {
    Finished(Step),
    Continue,
}

/// State for one query's walk: the sections built up so far and the
/// alias owners already visited.
struct NameWalk<'a> {
    zones: &'a Zones,
    rcode: Rcode,
    is_referral: bool,
    answers: Vec<ResourceRecord>,
    authority: Vec<ResourceRecord>,
    additional: Vec<ResourceRecord>,
    cname_owners: Vec<DomainName>,
    dname_owners: Vec<DomainName>,
}

impl NameWalk<'_> {
    fn find_answer(&mut self, qname: &DomainName, qtype: QueryType) -> Step {
        let Some(zone) = self.zones.get(qname) else {
            // an alias may have led outside the loaded zones: keep
            // the partial chain and the rcode it earned
            if self.answers.is_empty() {
                self.rcode = Rcode::Refused;
            }
            return Step::Done;
        };

        self.find_answer_in_zone(zone, qname, qtype)
    }

    /// Visit every name from the zone apex down to `qname`, so that
    /// the shallowest delegation, DNAME, or point of nonexistence is
    /// seen first.
    fn find_answer_in_zone(&mut self, zone: &Zone, qname: &DomainName, qtype: QueryType) -> Step {
        for count in zone.apex().labels.len()..=qname.labels.len() {
            let sname = qname.suffix(count);
            match self.process_name(zone, qname, &sname, qtype) {
                Walk::Finished(step) => return step,
                Walk::Continue => {}
            }
        }

        Step::Done
    }

    fn process_name(
        &mut self,
        zone: &Zone,
        qname: &DomainName,
        sname: &DomainName,
        qtype: QueryType,
    ) -> Walk {
        if zone.get_node(sname).is_none() {
            let wildcard = sname.to_wildcard();
            if zone.get_node(&wildcard).is_some() {
                tracing::trace!(name = %sname, "wildcard match");
                return Walk::Finished(self.find_rrtype(zone, &wildcard, qtype, Some(sname)));
            }

            tracing::trace!(name = %sname, "name error");
            self.rcode = Rcode::NameError;
            self.add_soa(zone);
            return Walk::Finished(Step::Done);
        }

        // DNAME wins over delegation at the same name, and is legal
        // at the apex
        if let Some(dname_zrs) = zone.lookup(sname, RecordType::DNAME) {
            return Walk::Finished(self.process_dname(qname, sname, dname_zrs));
        }

        if sname != zone.apex() {
            if let Some(ns_zrs) = zone.lookup(sname, RecordType::NS) {
                tracing::trace!(name = %sname, "delegation");
                self.do_referral(zone, sname, ns_zrs);
                return Walk::Finished(Step::Done);
            }
        }

        if sname != qname {
            return Walk::Continue;
        }

        Walk::Finished(self.find_rrtype(zone, sname, qtype, None))
    }

    /// Terminal record selection at a matched node.  For a wildcard
    /// match, `wildcard_match` is the queried-side name the answer is
    /// published under, while `sname` is the `*` owner the records
    /// live at.
    fn find_rrtype(
        &mut self,
        zone: &Zone,
        sname: &DomainName,
        qtype: QueryType,
        wildcard_match: Option<&DomainName>,
    ) -> Step {
        let rrname = wildcard_match.unwrap_or(sname);

        // a CNAME redirects every query type, even CNAME itself
        if let Some(cname_zrs) = zone.lookup(sname, RecordType::CNAME) {
            let target = cname_zrs.iter().find_map(|zr| match &zr.rtype_with_data {
                RecordTypeWithData::CNAME { cname } => Some(cname.clone()),
                _ => None,
            });
            if let Some(target) = target {
                let rrset = cname_zrs.iter().map(|zr| zr.to_rr(rrname)).collect();
                return self.process_cname(sname, target, rrset);
            }
        }

        if let QueryType::Record(rtype) = qtype {
            if let Some(zrs) = zone.lookup(sname, rtype) {
                self.answers.extend(zrs.iter().map(|zr| zr.to_rr(rrname)));
                return Step::Done;
            }
        }

        // NODATA: the name exists, the type does not.  The rcode is
        // left alone.
        self.add_soa(zone);
        Step::Done
    }

    /// Append a CNAME RRset (already carrying its published owner)
    /// and chase the target.  `owner` is the name the loop check
    /// tracks, which for wildcard matches is the `*` owner.
    fn process_cname(
        &mut self,
        owner: &DomainName,
        target: DomainName,
        rrset: Vec<ResourceRecord>,
    ) -> Step {
        if self.cname_owners.contains(owner) {
            tracing::debug!(%owner, "CNAME loop");
            self.rcode = Rcode::ServerFailure;
            return Step::Done;
        }
        self.cname_owners.push(owner.clone());
        self.answers.extend(rrset);
        Step::Chase(target)
    }

    /// Append the DNAME RRset and the CNAME synthesised from it, then
    /// chase the synthesised target.
    fn process_dname(
        &mut self,
        qname: &DomainName,
        sname: &DomainName,
        dname_zrs: &[ZoneRecord],
    ) -> Step {
        if self.dname_owners.contains(sname) {
            tracing::debug!(owner = %sname, "DNAME loop");
            self.rcode = Rcode::ServerFailure;
            return Step::Done;
        }
        self.dname_owners.push(sname.clone());

        let target_and_ttl = dname_zrs.iter().find_map(|zr| match &zr.rtype_with_data {
            RecordTypeWithData::DNAME { target } => Some((target.clone(), zr.ttl)),
            _ => None,
        });
        let Some((dname_target, ttl)) = target_and_ttl else {
            return Step::Done;
        };

        self.answers
            .extend(dname_zrs.iter().map(|zr| zr.to_rr(sname)));

        // substitute the owner suffix of qname with the target
        let mut labels = qname.labels[..qname.labels.len() - sname.labels.len()].to_vec();
        labels.extend(dname_target.labels.iter().cloned());
        let Some(cname_target) = DomainName::from_labels(labels) else {
            tracing::debug!(owner = %sname, "DNAME substitution too long");
            self.rcode = Rcode::YXDomain;
            return Step::Done;
        };

        let synthesised = ResourceRecord {
            name: qname.clone(),
            rtype_with_data: RecordTypeWithData::CNAME {
                cname: cname_target.clone(),
            },
            rclass: RecordClass::IN,
            ttl,
        };
        self.process_cname(qname, cname_target, vec![synthesised])
    }

    /// A referral: NS in authority, in-bailiwick address glue in
    /// additional, no AA.
    fn do_referral(&mut self, zone: &Zone, sname: &DomainName, ns_zrs: &[ZoneRecord]) {
        self.is_referral = true;
        self.authority.extend(ns_zrs.iter().map(|zr| zr.to_rr(sname)));

        for zr in ns_zrs {
            let RecordTypeWithData::NS { nsdname } = &zr.rtype_with_data else {
                continue;
            };
            if !nsdname.is_subdomain_of(sname) {
                continue;
            }
            for rtype in [RecordType::A, RecordType::AAAA] {
                if let Some(glue) = zone.lookup(nsdname, rtype) {
                    self.additional.extend(glue.iter().map(|g| g.to_rr(nsdname)));
                }
            }
        }
    }

    /// The negative-answer SOA.  Replaces the authority section: a
    /// negative answer carries exactly one SOA.
    fn add_soa(&mut self, zone: &Zone) {
        self.authority = vec![zone.soa_rr()];
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use dns_types::protocol::types::test_util::*;

    /// The zone used throughout: apex records, a plain A record, a
    /// wildcard, a CNAME, a delegation with glue, a DNAME, and a
    /// CNAME loop.
    fn example_zone() -> Zone {
        Zone::deserialise(
            "$ORIGIN example.com.\n\
             @       300 IN SOA   ns1.example.com. admin.example.com. 1 7200 3600 1209600 300\n\
             @       300 IN NS    ns1.example.com.\n\
             ns1     300 IN A     10.0.0.53\n\
             a       300 IN A     10.0.0.1\n\
             a       300 IN TXT   \"unrelated\"\n\
             *.wild  300 IN A     10.0.0.9\n\
             cname   300 IN CNAME a.example.com.\n\
             away    300 IN CNAME elsewhere.example.net.\n\
             loop1   300 IN CNAME loop2.example.com.\n\
             loop2   300 IN CNAME loop1.example.com.\n\
             sub     300 IN NS    ns.sub.example.com.\n\
             ns.sub  300 IN A     10.0.0.2\n\
             alias   300 IN DNAME target.example.com.\n\
             target  300 IN A     10.0.0.3",
        )
        .unwrap()
    }

    fn example_zones() -> Zones {
        let mut zones = Zones::new();
        zones.insert(example_zone());
        zones
    }

    fn ask(zones: &Zones, name: &str, qtype: QueryType) -> Answer {
        find_answer(zones, &domain(name), qtype, Rcode::NoError)
    }

    fn a_query(zones: &Zones, name: &str) -> Answer {
        ask(zones, name, QueryType::Record(RecordType::A))
    }

    #[test]
    fn positive_answer() {
        let answer = a_query(&example_zones(), "a.example.com.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert!(!answer.is_referral);
        assert_eq!(
            vec![a_record("a.example.com.", Ipv4Addr::new(10, 0, 0, 1))],
            answer.answers
        );
        assert!(answer.authority.is_empty());
        assert!(answer.additional.is_empty());
    }

    #[test]
    fn nxdomain_has_soa() {
        let answer = a_query(&example_zones(), "missing.example.com.");

        assert_eq!(Rcode::NameError, answer.rcode);
        assert!(answer.answers.is_empty());
        assert_eq!(1, answer.authority.len());
        assert_eq!(
            RecordType::SOA,
            answer.authority[0].rtype_with_data.rtype()
        );
        // negative TTL is the SOA minimum
        assert_eq!(300, answer.authority[0].ttl);
    }

    #[test]
    fn nodata_has_soa_and_noerror() {
        let answer = ask(
            &example_zones(),
            "a.example.com.",
            QueryType::Record(RecordType::MX),
        );

        assert_eq!(Rcode::NoError, answer.rcode);
        assert!(answer.answers.is_empty());
        assert_eq!(1, answer.authority.len());
        assert_eq!(
            RecordType::SOA,
            answer.authority[0].rtype_with_data.rtype()
        );
    }

    #[test]
    fn nodata_leaves_rcode_alone() {
        // the response builder pre-sets NOTIMP for meta types; a
        // NODATA outcome must not downgrade it to NOERROR
        let answer = find_answer(
            &example_zones(),
            &domain("a.example.com."),
            QueryType::Wildcard,
            Rcode::NotImplemented,
        );

        assert_eq!(Rcode::NotImplemented, answer.rcode);
        assert!(answer.answers.is_empty());
        assert_eq!(1, answer.authority.len());
    }

    #[test]
    fn ent_is_nodata_not_nxdomain() {
        // ns.sub.example.com. exists, so sub.example.com. is a
        // delegation point, but wild.example.com. is an ENT
        let answer = a_query(&example_zones(), "wild.example.com.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert!(answer.answers.is_empty());
        assert_eq!(1, answer.authority.len());
    }

    #[test]
    fn wildcard_answer_owner_is_query_name() {
        let answer = a_query(&example_zones(), "foo.wild.example.com.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert_eq!(
            vec![a_record("foo.wild.example.com.", Ipv4Addr::new(10, 0, 0, 9))],
            answer.answers
        );
        assert!(answer.authority.is_empty());
    }

    #[test]
    fn wildcard_matches_at_the_shallowest_missing_name() {
        // the walk meets b.wild.example.com. first, so that is the
        // synthesised owner
        let answer = a_query(&example_zones(), "a.b.wild.example.com.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert_eq!(
            vec![a_record("b.wild.example.com.", Ipv4Addr::new(10, 0, 0, 9))],
            answer.answers
        );
    }

    #[test]
    fn wildcard_nodata() {
        let answer = ask(
            &example_zones(),
            "foo.wild.example.com.",
            QueryType::Record(RecordType::TXT),
        );

        assert_eq!(Rcode::NoError, answer.rcode);
        assert!(answer.answers.is_empty());
        assert_eq!(1, answer.authority.len());
    }

    #[test]
    fn cname_chain_is_followed() {
        let answer = a_query(&example_zones(), "cname.example.com.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert_eq!(
            vec![
                cname_record("cname.example.com.", "a.example.com."),
                a_record("a.example.com.", Ipv4Addr::new(10, 0, 0, 1)),
            ],
            answer.answers
        );
        assert!(answer.authority.is_empty());
    }

    #[test]
    fn cname_query_type_still_chases() {
        let answer = ask(
            &example_zones(),
            "cname.example.com.",
            QueryType::Record(RecordType::CNAME),
        );

        // the target has no CNAME, so the chase ends in NODATA
        assert_eq!(Rcode::NoError, answer.rcode);
        assert_eq!(
            vec![cname_record("cname.example.com.", "a.example.com.")],
            answer.answers
        );
        assert_eq!(1, answer.authority.len());
    }

    #[test]
    fn cname_loop_is_servfail() {
        let answer = a_query(&example_zones(), "loop1.example.com.");

        assert_eq!(Rcode::ServerFailure, answer.rcode);
        // the chain up to the repeat is still in the answer section
        assert_eq!(
            vec![
                cname_record("loop1.example.com.", "loop2.example.com."),
                cname_record("loop2.example.com.", "loop1.example.com."),
            ],
            answer.answers
        );
    }

    #[test]
    fn cname_out_of_zone_keeps_partial_chain() {
        let answer = a_query(&example_zones(), "away.example.com.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert!(!answer.is_referral);
        assert_eq!(
            vec![cname_record("away.example.com.", "elsewhere.example.net.")],
            answer.answers
        );
        assert!(answer.authority.is_empty());
    }

    #[test]
    fn name_outside_all_zones_is_refused() {
        let answer = a_query(&example_zones(), "www.example.net.");

        assert_eq!(Rcode::Refused, answer.rcode);
        assert!(answer.answers.is_empty());
        assert!(answer.authority.is_empty());
    }

    #[test]
    fn referral_with_glue() {
        let answer = a_query(&example_zones(), "host.sub.example.com.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert!(answer.is_referral);
        assert!(answer.answers.is_empty());
        assert_eq!(
            vec![ns_record("sub.example.com.", "ns.sub.example.com.")],
            answer.authority
        );
        assert_eq!(
            vec![a_record("ns.sub.example.com.", Ipv4Addr::new(10, 0, 0, 2))],
            answer.additional
        );
    }

    #[test]
    fn query_at_delegation_point_is_a_referral() {
        let answer = a_query(&example_zones(), "sub.example.com.");

        assert!(answer.is_referral);
        assert!(answer.answers.is_empty());
        assert_eq!(
            vec![ns_record("sub.example.com.", "ns.sub.example.com.")],
            answer.authority
        );
    }

    #[test]
    fn out_of_bailiwick_ns_gets_no_glue() {
        let mut zones = Zones::new();
        zones.insert(
            Zone::deserialise(
                "$ORIGIN example.org.\n\
                 @   300 IN SOA ns1.example.org. admin.example.org. 1 30 30 30 300\n\
                 @   300 IN NS  ns1.example.org.\n\
                 ns1 300 IN A   10.0.1.1\n\
                 sub 300 IN NS  ns1.example.org.",
            )
            .unwrap(),
        );

        let answer = a_query(&zones, "host.sub.example.org.");

        assert!(answer.is_referral);
        assert_eq!(
            vec![ns_record("sub.example.org.", "ns1.example.org.")],
            answer.authority
        );
        // ns1.example.org. is not below sub.example.org., so no glue
        assert!(answer.additional.is_empty());
    }

    #[test]
    fn apex_ns_is_an_answer_not_a_referral() {
        let answer = ask(
            &example_zones(),
            "example.com.",
            QueryType::Record(RecordType::NS),
        );

        assert!(!answer.is_referral);
        assert_eq!(
            vec![ns_record("example.com.", "ns1.example.com.")],
            answer.answers
        );
    }

    #[test]
    fn dname_synthesises_cname() {
        let answer = a_query(&example_zones(), "x.alias.example.com.");

        // DNAME, synthesised CNAME, then resolution of the target:
        // x.target.example.com. does not exist, so NXDOMAIN with SOA
        assert_eq!(Rcode::NameError, answer.rcode);
        assert_eq!(
            vec![
                dname_record("alias.example.com.", "target.example.com."),
                cname_record("x.alias.example.com.", "x.target.example.com."),
            ],
            answer.answers
        );
        assert_eq!(1, answer.authority.len());
        assert_eq!(
            RecordType::SOA,
            answer.authority[0].rtype_with_data.rtype()
        );
    }

    #[test]
    fn dname_synthesis_resolving_target() {
        let mut zones = Zones::new();
        zones.insert(
            Zone::deserialise(
                "$ORIGIN example.org.\n\
                 @        300 IN SOA   ns1.example.org. admin.example.org. 1 30 30 30 300\n\
                 @        300 IN NS    ns1.example.org.\n\
                 ns1      300 IN A     10.0.1.1\n\
                 alias    300 IN DNAME target.example.org.\n\
                 x.target 300 IN A     10.0.1.2",
            )
            .unwrap(),
        );

        let answer = a_query(&zones, "x.alias.example.org.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert_eq!(
            vec![
                dname_record("alias.example.org.", "target.example.org."),
                cname_record("x.alias.example.org.", "x.target.example.org."),
                a_record("x.target.example.org.", Ipv4Addr::new(10, 0, 1, 2)),
            ],
            answer.answers
        );
    }

    #[test]
    fn dname_too_long_is_yxdomain() {
        let long_target = format!(
            "{}.{}.{}.{}.example.org.",
            "a".repeat(60),
            "b".repeat(60),
            "c".repeat(60),
            "d".repeat(50),
        );
        let mut zones = Zones::new();
        zones.insert(
            Zone::deserialise(&format!(
                "$ORIGIN example.org.\n\
                 @     300 IN SOA   ns1.example.org. admin.example.org. 1 30 30 30 300\n\
                 @     300 IN NS    ns1.example.org.\n\
                 alias 300 IN DNAME {long_target}",
            ))
            .unwrap(),
        );

        let qname = format!("{}.alias.example.org.", "x".repeat(60));
        let answer = a_query(&zones, &qname);

        assert_eq!(Rcode::YXDomain, answer.rcode);
        // the DNAME itself was already appended
        assert_eq!(1, answer.answers.len());
    }

    #[test]
    fn dname_loop_is_servfail() {
        let mut zones = Zones::new();
        zones.insert(
            Zone::deserialise(
                "$ORIGIN example.org.\n\
                 @  300 IN SOA   ns1.example.org. admin.example.org. 1 30 30 30 300\n\
                 @  300 IN NS    ns1.example.org.\n\
                 a  300 IN DNAME b.example.org.\n\
                 b  300 IN DNAME a.example.org.",
            )
            .unwrap(),
        );

        let answer = a_query(&zones, "x.a.example.org.");

        assert_eq!(Rcode::ServerFailure, answer.rcode);
    }

    #[test]
    fn cname_crosses_into_sibling_zone() {
        let mut zones = Zones::new();
        zones.insert(example_zone());
        zones.insert(
            Zone::deserialise(
                "$ORIGIN example.org.\n\
                 @   300 IN SOA   ns1.example.org. admin.example.org. 1 30 30 30 300\n\
                 @   300 IN NS    ns1.example.org.\n\
                 www 300 IN CNAME a.example.com.",
            )
            .unwrap(),
        );

        let answer = a_query(&zones, "www.example.org.");

        assert_eq!(Rcode::NoError, answer.rcode);
        assert_eq!(
            vec![
                cname_record("www.example.org.", "a.example.com."),
                a_record("a.example.com.", Ipv4Addr::new(10, 0, 0, 1)),
            ],
            answer.answers
        );
    }
}
