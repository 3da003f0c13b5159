use std::collections::HashMap;

use crate::protocol::types::*;

/// A collection of zones, indexed by apex.
#[derive(Debug, Clone, Default)]
pub struct Zones {
    zones: HashMap<DomainName, Zone>,
}

impl Zones {
    pub fn new() -> Self {
        Self {
            zones: HashMap::new(),
        }
    }

    /// Find the closest enclosing zone for a domain, if there is one:
    /// the zone whose apex is the longest suffix of the name
    /// (equality counts).  Suffixes are tried longest-first.
    pub fn get(&self, name: &DomainName) -> Option<&Zone> {
        for count in (1..=name.labels.len()).rev() {
            if let Some(zone) = self.zones.get(&name.suffix(count)) {
                return Some(zone);
            }
        }

        None
    }

    /// Create or replace a zone.
    pub fn insert(&mut self, zone: Zone) {
        self.zones.insert(zone.apex().clone(), zone);
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// A zone: an apex, its SOA, and a tree of records.  All zones this
/// server works with are authoritative, so the SOA is mandatory.
///
/// Records are held in a label trie rooted at the apex.  A name
/// exists if there is a trie node for it, whether or not that node
/// carries any RRsets - which is exactly the distinction between an
/// empty non-terminal (NODATA) and a nonexistent name (NXDOMAIN).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    apex: DomainName,

    soa: SOA,

    /// TTL of the SOA RRset as given in the zone file.
    soa_ttl: u32,

    /// Node at the apex.
    root: ZoneNode,
}

impl Zone {
    /// Construct a new zone.  The SOA is inserted as an RR at the
    /// apex node.
    pub fn new(apex: DomainName, soa: SOA, soa_ttl: u32) -> Self {
        let mut root = ZoneNode::default();
        root.insert(&[], soa.to_rdata(), soa_ttl);

        Self {
            apex,
            soa,
            soa_ttl,
            root,
        }
    }

    pub fn apex(&self) -> &DomainName {
        &self.apex
    }

    pub fn soa(&self) -> &SOA {
        &self.soa
    }

    /// The SOA RR for the authority section of negative answers.
    /// Its TTL is capped by the SOA minimum field (RFC 2308 negative
    /// TTL).
    pub fn soa_rr(&self) -> ResourceRecord {
        self.soa
            .to_rr(&self.apex, std::cmp::min(self.soa_ttl, self.soa.minimum))
    }

    /// Take a domain and chop off the suffix corresponding to the
    /// apex of this zone.
    ///
    /// Returns `None` if the given domain does not match the apex.
    pub fn relative_domain<'a>(&self, name: &'a DomainName) -> Option<&'a [Label]> {
        if name.is_subdomain_of(&self.apex) {
            Some(&name.labels[0..name.labels.len() - self.apex.labels.len()])
        } else {
            None
        }
    }

    /// Strict existence test.  An empty non-terminal returns a node;
    /// a name below a leaf, or on an untouched branch, does not.
    pub fn get_node(&self, name: &DomainName) -> Option<&ZoneNode> {
        let relative = self.relative_domain(name)?;
        self.root.get_node(relative)
    }

    /// The RRset of the given type at the given name, if both exist.
    pub fn lookup(&self, name: &DomainName, rtype: RecordType) -> Option<&[ZoneRecord]> {
        self.get_node(name).and_then(|node| node.rrset(rtype))
    }

    /// Insert a record for a domain.  This domain MUST be a subdomain
    /// of the apex: records for other names are ignored.  Ancestor
    /// nodes are created as needed, which is all the empty
    /// non-terminal handling there is.
    pub fn insert(&mut self, name: &DomainName, rtype_with_data: RecordTypeWithData, ttl: u32) {
        if let Some(relative_domain) = self.relative_domain(name) {
            self.root.insert(relative_domain, rtype_with_data, ttl);
        }
    }
}

/// A node in the label trie of a zone: the RRsets at one owner name,
/// and the children one label below.  Wildcard owners are ordinary
/// nodes under a literal `*` label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZoneNode {
    rrsets: HashMap<RecordType, Vec<ZoneRecord>>,
    children: HashMap<Label, ZoneNode>,
}

impl ZoneNode {
    /// Walk down the trie, consuming relative labels from the
    /// apex-most end.
    fn get_node(&self, relative: &[Label]) -> Option<&ZoneNode> {
        if relative.is_empty() {
            Some(self)
        } else {
            let pos = relative.len() - 1;
            self.children
                .get(&relative[pos])
                .and_then(|child| child.get_node(&relative[0..pos]))
        }
    }

    /// Add a record.  This will create children as needed.  Exact
    /// duplicates are discarded.
    fn insert(&mut self, relative: &[Label], rtype_with_data: RecordTypeWithData, ttl: u32) {
        if relative.is_empty() {
            let rtype = rtype_with_data.rtype();
            let new = ZoneRecord {
                rtype_with_data,
                ttl,
            };
            let entries = self.rrsets.entry(rtype).or_default();
            if !entries.iter().any(|e| e == &new) {
                entries.push(new);
            }
        } else {
            let pos = relative.len() - 1;
            self.children
                .entry(relative[pos].clone())
                .or_default()
                .insert(&relative[0..pos], rtype_with_data, ttl);
        }
    }

    pub fn rrset(&self, rtype: RecordType) -> Option<&[ZoneRecord]> {
        match self.rrsets.get(&rtype) {
            Some(zrs) if !zrs.is_empty() => Some(zrs),
            _ => None,
        }
    }

    /// True for empty non-terminals.
    pub fn is_empty(&self) -> bool {
        self.rrsets.is_empty()
    }
}

/// A SOA record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SOA {
    pub mname: DomainName,
    pub rname: DomainName,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl SOA {
    /// Convert it into a SOA RR
    pub fn to_rr(&self, name: &DomainName, ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: name.clone(),
            rtype_with_data: self.to_rdata(),
            rclass: RecordClass::IN,
            ttl,
        }
    }

    /// Convert it into a SOA RDATA
    pub fn to_rdata(&self) -> RecordTypeWithData {
        RecordTypeWithData::SOA {
            mname: self.mname.clone(),
            rname: self.rname.clone(),
            serial: self.serial,
            refresh: self.refresh,
            retry: self.retry,
            expire: self.expire,
            minimum: self.minimum,
        }
    }
}

/// A single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    pub rtype_with_data: RecordTypeWithData,
    pub ttl: u32,
}

impl ZoneRecord {
    /// Convert it into an RR
    pub fn to_rr(&self, name: &DomainName) -> ResourceRecord {
        ResourceRecord {
            name: name.clone(),
            rtype_with_data: self.rtype_with_data.clone(),
            rclass: RecordClass::IN,
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::protocol::types::test_util::*;

    fn example_soa() -> SOA {
        SOA {
            mname: domain("ns1.example.com."),
            rname: domain("admin.example.com."),
            serial: 2024010100,
            refresh: 7200,
            retry: 3600,
            expire: 1209600,
            minimum: 300,
        }
    }

    fn example_zone() -> Zone {
        let mut zone = Zone::new(domain("example.com."), example_soa(), 3600);
        let a_rr = a_record("a.example.com.", Ipv4Addr::new(10, 0, 0, 1));
        let deep_rr = a_record("deep.down.below.example.com.", Ipv4Addr::new(10, 0, 0, 2));
        let wild_rr = a_record("*.wild.example.com.", Ipv4Addr::new(10, 0, 0, 9));
        zone.insert(&a_rr.name, a_rr.rtype_with_data, a_rr.ttl);
        zone.insert(&deep_rr.name, deep_rr.rtype_with_data, deep_rr.ttl);
        zone.insert(&wild_rr.name, wild_rr.rtype_with_data, wild_rr.ttl);
        zone
    }

    #[test]
    fn zones_get_longest_suffix() {
        let mut zones = Zones::new();
        zones.insert(Zone::new(domain("example.com."), example_soa(), 300));
        zones.insert(Zone::new(domain("sub.example.com."), example_soa(), 300));

        assert_eq!(
            &domain("example.com."),
            zones.get(&domain("www.example.com.")).unwrap().apex()
        );
        assert_eq!(
            &domain("sub.example.com."),
            zones.get(&domain("www.sub.example.com.")).unwrap().apex()
        );
        assert_eq!(
            &domain("sub.example.com."),
            zones.get(&domain("sub.example.com.")).unwrap().apex()
        );
        assert_eq!(None, zones.get(&domain("example.net.")).map(Zone::apex));
        assert_eq!(None, zones.get(&domain("com.")).map(Zone::apex));
    }

    #[test]
    fn apex_node_has_soa() {
        let zone = example_zone();
        let soa = zone.lookup(&domain("example.com."), RecordType::SOA).unwrap();
        assert_eq!(1, soa.len());
        assert_eq!(RecordType::SOA, soa[0].rtype_with_data.rtype());
    }

    #[test]
    fn soa_rr_ttl_capped_by_minimum() {
        let zone = example_zone();
        // zone file TTL is 3600, minimum is 300
        assert_eq!(300, zone.soa_rr().ttl);
    }

    #[test]
    fn get_node_distinguishes_ent_from_nxdomain() {
        let zone = example_zone();

        // leaf
        assert!(zone
            .get_node(&domain("deep.down.below.example.com."))
            .is_some());
        // empty non-terminals on the path to the leaf
        let ent = zone.get_node(&domain("down.below.example.com.")).unwrap();
        assert!(ent.is_empty());
        assert!(zone.get_node(&domain("below.example.com.")).unwrap().is_empty());
        // nonexistent names
        assert_eq!(None, zone.get_node(&domain("missing.example.com.")));
        assert_eq!(None, zone.get_node(&domain("x.deep.down.below.example.com.")));
        // a name outside the zone entirely
        assert_eq!(None, zone.get_node(&domain("example.net.")));
    }

    #[test]
    fn every_node_has_a_parent_node() {
        let zone = example_zone();
        for name in [
            "deep.down.below.example.com.",
            "down.below.example.com.",
            "a.example.com.",
            "*.wild.example.com.",
        ] {
            let mut current = domain(name);
            while &current != zone.apex() {
                let parent = current.parent().unwrap();
                assert!(
                    zone.get_node(&parent).is_some(),
                    "parent of {current} missing"
                );
                current = parent;
            }
        }
    }

    #[test]
    fn wildcard_is_a_literal_node() {
        let zone = example_zone();

        assert!(zone.get_node(&domain("*.wild.example.com.")).is_some());
        // the wildcard does not make other names spring into existence
        assert_eq!(None, zone.get_node(&domain("foo.wild.example.com.")));
        // but its owner's parent is a node
        assert!(zone.get_node(&domain("wild.example.com.")).is_some());
    }

    #[test]
    fn lookup_type_mismatch_is_none() {
        let zone = example_zone();
        assert!(zone.lookup(&domain("a.example.com."), RecordType::A).is_some());
        assert_eq!(
            None,
            zone.lookup(&domain("a.example.com."), RecordType::TXT)
        );
    }

    #[test]
    fn insert_deduplicates() {
        let mut zone = Zone::new(domain("example.com."), example_soa(), 300);
        let rr = a_record("a.example.com.", Ipv4Addr::new(10, 0, 0, 1));
        zone.insert(&rr.name, rr.rtype_with_data.clone(), rr.ttl);
        zone.insert(&rr.name, rr.rtype_with_data.clone(), rr.ttl);

        assert_eq!(
            1,
            zone.lookup(&rr.name, RecordType::A).unwrap().len()
        );
    }

    #[test]
    fn insert_outside_apex_is_ignored() {
        let mut zone = Zone::new(domain("example.com."), example_soa(), 300);
        let rr = a_record("a.example.net.", Ipv4Addr::new(10, 0, 0, 1));
        zone.insert(&rr.name, rr.rtype_with_data, rr.ttl);

        assert_eq!(None, zone.get_node(&domain("a.example.net.")));
    }

    #[test]
    fn zone_record_to_rr_takes_owner() {
        let zone = example_zone();
        let zrs = zone
            .lookup(&domain("*.wild.example.com."), RecordType::A)
            .unwrap();
        let rr = zrs[0].to_rr(&domain("foo.wild.example.com."));
        assert_eq!(domain("foo.wild.example.com."), rr.name);
        assert_eq!(RecordType::A, rr.rtype_with_data.rtype());
    }
}
