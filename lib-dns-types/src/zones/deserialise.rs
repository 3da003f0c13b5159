use std::iter::Peekable;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::protocol::types::*;
use crate::zones::types::*;

impl Zone {
    /// Parse a string of zone data in the master file format of RFC
    /// 1035 section 5.
    ///
    /// The zone must be authoritative: exactly one SOA record, whose
    /// owner becomes the apex, and an NS RRset at the apex.  All
    /// other RRs must be subdomains of the apex.  Wildcard owner
    /// names (`*.…`) are stored verbatim, with the `*` as a literal
    /// label.
    ///
    /// This implementation does not support `$INCLUDE` entries or
    /// non-`IN` record classes.  These will raise an error.
    ///
    /// # Errors
    ///
    /// If the string cannot be parsed.
    pub fn deserialise(data: &str) -> Result<Self, Error> {
        let mut rrs = Vec::new();
        let mut apex_and_soa = None;
        let mut origin = None;
        let mut previous_domain = None;
        let mut previous_ttl = None;
        let mut stream = data.chars().peekable();
        while let Some(entry) = parse_entry(&origin, &previous_domain, previous_ttl, &mut stream)? {
            match entry {
                Entry::Origin { name } => origin = Some(name),
                Entry::Include { path, origin } => {
                    return Err(Error::IncludeNotSupported { path, origin })
                }
                Entry::RR { rr } => {
                    previous_domain = Some(rr.name.clone());
                    previous_ttl = Some(rr.ttl);

                    if let RecordTypeWithData::SOA {
                        mname,
                        rname,
                        serial,
                        refresh,
                        retry,
                        expire,
                        minimum,
                    } = rr.rtype_with_data
                    {
                        if apex_and_soa.is_some() {
                            return Err(Error::MultipleSOA);
                        }
                        apex_and_soa = Some((
                            rr.name,
                            SOA {
                                mname,
                                rname,
                                serial,
                                refresh,
                                retry,
                                expire,
                                minimum,
                            },
                            rr.ttl,
                        ));
                    } else {
                        rrs.push(rr);
                    }
                }
            }
        }

        let Some((apex, soa, soa_ttl)) = apex_and_soa else {
            return Err(Error::MissingSOA);
        };

        let mut zone = Zone::new(apex, soa, soa_ttl);

        let mut has_apex_ns = false;
        for rr in rrs {
            if !rr.name.is_subdomain_of(zone.apex()) {
                return Err(Error::NotSubdomainOfApex {
                    apex: zone.apex().clone(),
                    name: rr.name,
                });
            }
            has_apex_ns |=
                &rr.name == zone.apex() && rr.rtype_with_data.rtype() == RecordType::NS;
            zone.insert(&rr.name, rr.rtype_with_data, rr.ttl);
        }

        if !has_apex_ns {
            return Err(Error::MissingApexNS {
                apex: zone.apex().clone(),
            });
        }

        Ok(zone)
    }
}

/// Parse a single entry, skipping comments and whitespace.  Entries
/// are of the form:
///
/// ```text
/// $ORIGIN <domain-name>
/// $INCLUDE <file-name> [<domain-name>]
/// <rr>
/// ```
///
/// Where `<rr>` is one of these forms:
///
/// ```text
/// <domain-name> <ttl>   <class> <type> <rdata>
/// <domain-name> <class> <ttl>   <type> <rdata>
/// <domain-name> <ttl>           <type> <rdata>
/// <domain-name>         <class> <type> <rdata>
/// <domain-name>                 <type> <rdata>
///               <ttl>   <class> <type> <rdata>
///               <class> <ttl>   <type> <rdata>
///               <ttl>           <type> <rdata>
///                       <class> <type> <rdata>
///                               <type> <rdata>
/// ```
///
/// This is annoyingly flexible:
///
/// - If the `<domain-name>`, `<ttl>`, or `<class>` are missing, the
///   previous is used (so it is an error to omit it in the first RR).
///
/// - But since this implementation only supports `IN`-class records,
///   if the class is missing in the first RR, `IN` is used.
///
/// - The `<domain-name>` can be an absolute domain, given as a dotted
///   string ending in a `.`; or a relative domain, given as a dotted
///   string not ending in a `.`, in which case the origin is
///   prepended; or `@`, in which case it is the origin.
///
/// The `<rdata>` format depends on the record type.
///
/// Some special characters are:
///
/// - `@` - the current origin
/// - `;` - the rest of the line is a comment
/// - `" ... "` - a string (used for rdata)
/// - `( ... )` - a group of data which crosses a newline
/// - `\X` - quotes a character, where `X` is a non-digit
/// - `\DDD` - an octet, given as a decimal number
///
/// Returns `None` if the stream is empty.
///
/// # Errors
///
/// If the string cannot be parsed.
fn parse_entry<I: Iterator<Item = char>>(
    origin: &Option<DomainName>,
    previous_domain: &Option<DomainName>,
    previous_ttl: Option<u32>,
    stream: &mut Peekable<I>,
) -> Result<Option<Entry>, Error> {
    loop {
        let tokens = tokenise_entry(stream)?;
        if tokens.is_empty() {
            if stream.peek().is_none() {
                return Ok(None);
            }
        } else if tokens[0].0 == "$ORIGIN" {
            return Ok(Some(parse_origin(origin, tokens)?));
        } else if tokens[0].0 == "$INCLUDE" {
            return Ok(Some(parse_include(origin, tokens)?));
        } else {
            return Ok(Some(parse_rr(
                origin,
                previous_domain,
                previous_ttl,
                tokens,
            )?));
        }
    }
}

/// ```text
/// $ORIGIN <domain-name>
/// ```
///
/// # Errors
///
/// If the string cannot be parsed.
fn parse_origin(
    origin: &Option<DomainName>,
    tokens: Vec<(String, Vec<u8>)>,
) -> Result<Entry, Error> {
    if tokens.len() != 2 {
        return Err(Error::WrongLen { tokens });
    }

    if tokens[0].0 != "$ORIGIN" {
        return Err(Error::Unexpected {
            expected: "$ORIGIN".to_string(),
            tokens,
        });
    }

    let name = parse_domain(origin, &tokens[1].0)?;
    Ok(Entry::Origin { name })
}

/// ```text
/// $INCLUDE <file-name> [<domain-name>]
/// ```
///
/// # Errors
///
/// If the string cannot be parsed.
fn parse_include(
    origin: &Option<DomainName>,
    tokens: Vec<(String, Vec<u8>)>,
) -> Result<Entry, Error> {
    if tokens.len() != 2 && tokens.len() != 3 {
        return Err(Error::WrongLen { tokens });
    }

    if tokens[0].0 != "$INCLUDE" {
        return Err(Error::Unexpected {
            expected: "$INCLUDE".to_string(),
            tokens,
        });
    }

    let path = tokens[1].0.clone();
    let name = if tokens.len() == 3 {
        Some(parse_domain(origin, &tokens[2].0)?)
    } else {
        None
    };
    Ok(Entry::Include { path, origin: name })
}

/// See `parse_entry` for the accepted forms.
///
/// # Errors
///
/// If the string cannot be parsed.
fn parse_rr(
    origin: &Option<DomainName>,
    previous_domain: &Option<DomainName>,
    previous_ttl: Option<u32>,
    tokens: Vec<(String, Vec<u8>)>,
) -> Result<Entry, Error> {
    if tokens.is_empty() {
        return Err(Error::WrongLen { tokens });
    }

    if tokens.len() >= 4 {
        if let Some(rtype_with_data) = try_parse_rtype_with_data(origin, &tokens[3..]) {
            // <domain-name> <ttl>   <class> <type> <rdata>
            // <domain-name> <class> <ttl>   <type> <rdata>
            let name = parse_domain(origin, &tokens[0].0)?;
            let ttl = if tokens[2].0 == "IN" {
                parse_u32(&tokens[1].0)?
            } else if tokens[1].0 == "IN" {
                parse_u32(&tokens[2].0)?
            } else {
                return Err(Error::Unexpected {
                    expected: "IN".to_string(),
                    tokens,
                });
            };

            return Ok(to_rr(name, rtype_with_data, ttl));
        }
    }

    if tokens.len() >= 3 {
        if let Some(rtype_with_data) = try_parse_rtype_with_data(origin, &tokens[2..]) {
            // <domain-name> <ttl>           <type> <rdata>
            // <domain-name>         <class> <type> <rdata>
            //               <ttl>   <class> <type> <rdata>
            //               <class> <ttl>   <type> <rdata>
            return if tokens[1].0 == "IN" {
                if tokens[0].0.chars().all(|c| c.is_ascii_digit()) {
                    let ttl = parse_u32(&tokens[0].0)?;
                    if let Some(name) = previous_domain {
                        Ok(to_rr(name.clone(), rtype_with_data, ttl))
                    } else {
                        Err(Error::MissingDomainName { tokens })
                    }
                } else {
                    let name = parse_domain(origin, &tokens[0].0)?;
                    if let Some(ttl) = previous_ttl.or_else(|| soa_fallback_ttl(&rtype_with_data)) {
                        Ok(to_rr(name, rtype_with_data, ttl))
                    } else {
                        Err(Error::MissingTTL { tokens })
                    }
                }
            } else if tokens[0].0 == "IN" {
                let ttl = parse_u32(&tokens[1].0)?;
                if let Some(name) = previous_domain {
                    Ok(to_rr(name.clone(), rtype_with_data, ttl))
                } else {
                    Err(Error::MissingDomainName { tokens })
                }
            } else {
                let name = parse_domain(origin, &tokens[0].0)?;
                let ttl = parse_u32(&tokens[1].0)?;
                Ok(to_rr(name, rtype_with_data, ttl))
            };
        }
    }

    if tokens.len() >= 2 {
        if let Some(rtype_with_data) = try_parse_rtype_with_data(origin, &tokens[1..]) {
            // <domain-name>                 <type> <rdata>
            //               <ttl>           <type> <rdata>
            //                       <class> <type> <rdata>
            return if tokens[0].0 == "IN" {
                if let Some(name) = previous_domain {
                    if let Some(ttl) = previous_ttl.or_else(|| soa_fallback_ttl(&rtype_with_data)) {
                        Ok(to_rr(name.clone(), rtype_with_data, ttl))
                    } else {
                        Err(Error::MissingTTL { tokens })
                    }
                } else {
                    Err(Error::MissingDomainName { tokens })
                }
            } else if tokens[0].0.chars().all(|c| c.is_ascii_digit()) {
                let ttl = parse_u32(&tokens[0].0)?;
                if let Some(name) = previous_domain {
                    Ok(to_rr(name.clone(), rtype_with_data, ttl))
                } else {
                    Err(Error::MissingDomainName { tokens })
                }
            } else {
                let name = parse_domain(origin, &tokens[0].0)?;
                if let Some(ttl) = previous_ttl.or_else(|| soa_fallback_ttl(&rtype_with_data)) {
                    Ok(to_rr(name, rtype_with_data, ttl))
                } else {
                    Err(Error::MissingTTL { tokens })
                }
            };
        }
    }

    if !tokens.is_empty() {
        if let Some(rtype_with_data) = try_parse_rtype_with_data(origin, &tokens[0..]) {
            //                               <type> <rdata>
            return if let Some(name) = previous_domain {
                if let Some(ttl) = previous_ttl.or_else(|| soa_fallback_ttl(&rtype_with_data)) {
                    Ok(to_rr(name.clone(), rtype_with_data, ttl))
                } else {
                    Err(Error::MissingTTL { tokens })
                }
            } else {
                Err(Error::MissingDomainName { tokens })
            };
        }
    }

    Err(Error::MissingType { tokens })
}

/// Try to parse a record type with data.  Returns `None` if there is
/// no parse, since this does not necessarily indicate a fatal error.
fn try_parse_rtype_with_data(
    origin: &Option<DomainName>,
    tokens: &[(String, Vec<u8>)],
) -> Option<RecordTypeWithData> {
    if tokens.is_empty() {
        return None;
    }

    match RecordType::from_str(tokens[0].0.as_str()) {
        Ok(RecordType::A) if tokens.len() == 2 => match Ipv4Addr::from_str(&tokens[1].0) {
            Ok(address) => Some(RecordTypeWithData::A { address }),
            _ => None,
        },
        Ok(RecordType::NS) if tokens.len() == 2 => match parse_domain(origin, &tokens[1].0) {
            Ok(nsdname) => Some(RecordTypeWithData::NS { nsdname }),
            _ => None,
        },
        Ok(RecordType::CNAME) if tokens.len() == 2 => match parse_domain(origin, &tokens[1].0) {
            Ok(cname) => Some(RecordTypeWithData::CNAME { cname }),
            _ => None,
        },
        Ok(RecordType::SOA) if tokens.len() == 8 => match (
            parse_domain(origin, &tokens[1].0),
            parse_domain(origin, &tokens[2].0),
            u32::from_str(&tokens[3].0),
            u32::from_str(&tokens[4].0),
            u32::from_str(&tokens[5].0),
            u32::from_str(&tokens[6].0),
            u32::from_str(&tokens[7].0),
        ) {
            (Ok(mname), Ok(rname), Ok(serial), Ok(refresh), Ok(retry), Ok(expire), Ok(minimum)) => {
                Some(RecordTypeWithData::SOA {
                    mname,
                    rname,
                    serial,
                    refresh,
                    retry,
                    expire,
                    minimum,
                })
            }
            _ => None,
        },
        Ok(RecordType::PTR) if tokens.len() == 2 => match parse_domain(origin, &tokens[1].0) {
            Ok(ptrdname) => Some(RecordTypeWithData::PTR { ptrdname }),
            _ => None,
        },
        Ok(RecordType::MX) if tokens.len() == 3 => {
            match (
                u16::from_str(&tokens[1].0),
                parse_domain(origin, &tokens[2].0),
            ) {
                (Ok(preference), Ok(exchange)) => Some(RecordTypeWithData::MX {
                    preference,
                    exchange,
                }),
                _ => None,
            }
        }
        Ok(RecordType::TXT) if tokens.len() == 2 => Some(RecordTypeWithData::TXT {
            octets: bytes::Bytes::copy_from_slice(&tokens[1].1),
        }),
        Ok(RecordType::AAAA) if tokens.len() == 2 => match Ipv6Addr::from_str(&tokens[1].0) {
            Ok(address) => Some(RecordTypeWithData::AAAA { address }),
            _ => None,
        },
        Ok(RecordType::SRV) if tokens.len() == 5 => match (
            u16::from_str(&tokens[1].0),
            u16::from_str(&tokens[2].0),
            u16::from_str(&tokens[3].0),
            parse_domain(origin, &tokens[4].0),
        ) {
            (Ok(priority), Ok(weight), Ok(port), Ok(target)) => Some(RecordTypeWithData::SRV {
                priority,
                weight,
                port,
                target,
            }),
            _ => None,
        },
        Ok(RecordType::DNAME) if tokens.len() == 2 => match parse_domain(origin, &tokens[1].0) {
            Ok(target) => Some(RecordTypeWithData::DNAME { target }),
            _ => None,
        },
        _ => None,
    }
}

/// Parse a domain name, appending the origin if it's not absolute.
/// A leading `*` label is not special here: wildcard owner names are
/// stored with the `*` as a literal label.
///
/// # Errors
///
/// If the string cannot be parsed.
fn parse_domain(origin: &Option<DomainName>, dotted_string: &str) -> Result<DomainName, Error> {
    if dotted_string.is_empty() {
        return Err(Error::ExpectedDomainName {
            dotted_string: dotted_string.to_string(),
        });
    }

    if !dotted_string.chars().all(|c| c.is_ascii()) {
        return Err(Error::ExpectedDomainName {
            dotted_string: dotted_string.to_string(),
        });
    }

    if dotted_string == "@" {
        if let Some(name) = origin {
            Ok(name.clone())
        } else {
            Err(Error::ExpectedOrigin)
        }
    } else if dotted_string.ends_with('.') {
        if let Some(domain) = DomainName::from_dotted_string(dotted_string) {
            Ok(domain)
        } else {
            Err(Error::ExpectedDomainName {
                dotted_string: dotted_string.to_string(),
            })
        }
    } else if let Some(name) = origin {
        if let Some(domain) = DomainName::from_relative_dotted_string(name, dotted_string) {
            Ok(domain)
        } else {
            Err(Error::ExpectedDomainName {
                dotted_string: dotted_string.to_string(),
            })
        }
    } else {
        Err(Error::ExpectedOrigin)
    }
}

/// Parse a decimal number into a u32.
///
/// # Errors
///
/// If the string cannot be parsed.
fn parse_u32(digits: &str) -> Result<u32, Error> {
    if let Ok(val) = u32::from_str(digits) {
        Ok(val)
    } else {
        Err(Error::ExpectedU32 {
            digits: digits.to_string(),
        })
    }
}

/// An SOA record with no TTL of its own (and no previous TTL to
/// inherit) falls back to its own minimum field.
fn soa_fallback_ttl(rtype_with_data: &RecordTypeWithData) -> Option<u32> {
    if let RecordTypeWithData::SOA { minimum, .. } = rtype_with_data {
        Some(*minimum)
    } else {
        None
    }
}

/// Helper for `parse_rr`
fn to_rr(name: DomainName, rtype_with_data: RecordTypeWithData, ttl: u32) -> Entry {
    Entry::RR {
        rr: ResourceRecord {
            name,
            rtype_with_data,
            rclass: RecordClass::IN,
            ttl,
        },
    }
}

/// Split an entry into tokens: split on whitespace, taking quoting
/// into account, and if there are parentheses or quotes continue to
/// the matched delimiter.
///
/// # Errors
///
/// If the string cannot be parsed.
fn tokenise_entry<I: Iterator<Item = char>>(
    stream: &mut Peekable<I>,
) -> Result<Vec<(String, Vec<u8>)>, Error> {
    let mut tokens = Vec::new();
    let mut token_string = String::new();
    let mut token_octets = Vec::new();
    let mut state = State::Initial;
    let mut line_continuation = false;

    while let Some(c) = stream.next() {
        state = match (state, c) {
            (State::Initial, '\n') => {
                if line_continuation {
                    State::Initial
                } else {
                    break;
                }
            }
            (State::Initial, ';') => State::SkipToEndOfComment,
            (State::Initial, '(') => {
                if line_continuation {
                    return Err(Error::TokeniserUnexpected { unexpected: '(' });
                }
                line_continuation = true;
                State::Initial
            }
            (State::Initial, ')') => {
                if line_continuation {
                    line_continuation = false;
                    State::Initial
                } else {
                    return Err(Error::TokeniserUnexpected { unexpected: ')' });
                }
            }
            (State::Initial, '"') => State::QuotedString,
            (State::Initial, '\\') => {
                let octet = tokenise_escape(stream)?;
                token_string.push(octet as char);
                token_octets.push(octet);
                State::UnquotedString
            }
            (State::Initial, c) => {
                if c.is_whitespace() {
                    State::Initial
                } else if c.is_ascii() {
                    token_string.push(c);
                    token_octets.push(c as u8);
                    State::UnquotedString
                } else {
                    return Err(Error::TokeniserUnexpected { unexpected: c });
                }
            }

            (State::UnquotedString, '\n') => {
                if !token_string.is_empty() {
                    tokens.push((token_string, token_octets));
                    token_string = String::new();
                    token_octets = Vec::new();
                }
                if line_continuation {
                    State::Initial
                } else {
                    break;
                }
            }
            (State::UnquotedString, ';') => {
                if !token_string.is_empty() {
                    tokens.push((token_string, token_octets));
                    token_string = String::new();
                    token_octets = Vec::new();
                }
                State::SkipToEndOfComment
            }
            (State::UnquotedString, '\\') => {
                let octet = tokenise_escape(stream)?;
                token_string.push(octet as char);
                token_octets.push(octet);
                State::UnquotedString
            }
            (State::UnquotedString, c) => {
                if c.is_whitespace() {
                    if !token_string.is_empty() {
                        tokens.push((token_string, token_octets));
                        token_string = String::new();
                        token_octets = Vec::new();
                    }
                    State::Initial
                } else if c.is_ascii() {
                    token_string.push(c);
                    token_octets.push(c as u8);
                    State::UnquotedString
                } else {
                    return Err(Error::TokeniserUnexpected { unexpected: c });
                }
            }

            (State::SkipToEndOfComment, '\n') => {
                if line_continuation {
                    State::Initial
                } else {
                    break;
                }
            }
            (State::SkipToEndOfComment, _) => State::SkipToEndOfComment,

            (State::QuotedString, '"') => {
                tokens.push((token_string, token_octets));
                token_string = String::new();
                token_octets = Vec::new();
                State::Initial
            }
            (State::QuotedString, '\\') => {
                let octet = tokenise_escape(stream)?;
                token_string.push(octet as char);
                token_octets.push(octet);
                State::QuotedString
            }
            (State::QuotedString, c) => {
                if c.is_ascii() {
                    token_string.push(c);
                    token_octets.push(c as u8);
                } else {
                    return Err(Error::TokeniserUnexpected { unexpected: c });
                }
                State::QuotedString
            }
        }
    }

    if !token_string.is_empty() {
        tokens.push((token_string, token_octets));
    }

    Ok(tokens)
}

/// Tokenise an escape sequence
///
/// # Errors
///
/// If the string cannot be parsed.
fn tokenise_escape<I: Iterator<Item = char>>(stream: &mut I) -> Result<u8, Error> {
    if let Some(c1) = stream.next() {
        match c1.to_digit(10) {
            Some(d1) => {
                if let Some(c2) = stream.next() {
                    match c2.to_digit(10) {
                        Some(d2) => {
                            if let Some(c3) = stream.next() {
                                match c3.to_digit(10) {
                                    Some(d3) => match u8::try_from(d1 * 100 + d2 * 10 + d3) {
                                        Ok(num) => Ok(num),
                                        _ => Err(Error::TokeniserUnexpectedEscape {
                                            unexpected: vec![c1, c2, c3],
                                        }),
                                    },
                                    _ => Err(Error::TokeniserUnexpectedEscape {
                                        unexpected: vec![c1, c2, c3],
                                    }),
                                }
                            } else {
                                Err(Error::TokeniserUnexpectedEscape {
                                    unexpected: vec![c1, c2],
                                })
                            }
                        }
                        _ => Err(Error::TokeniserUnexpectedEscape {
                            unexpected: vec![c1, c2],
                        }),
                    }
                } else {
                    Err(Error::TokeniserUnexpectedEscape {
                        unexpected: vec![c1],
                    })
                }
            }
            _ => {
                if c1.is_ascii() {
                    Ok(c1 as u8)
                } else {
                    Err(Error::TokeniserUnexpected { unexpected: c1 })
                }
            }
        }
    } else {
        Err(Error::TokeniserUnexpectedEscape {
            unexpected: Vec::new(),
        })
    }
}

/// States the tokeniser can be in
enum State {
    Initial,
    SkipToEndOfComment,
    UnquotedString,
    QuotedString,
}

/// An entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Origin {
        name: DomainName,
    },
    Include {
        path: String,
        origin: Option<DomainName>,
    },
    RR {
        rr: ResourceRecord,
    },
}

/// An error that can occur reading a zone file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    TokeniserUnexpected {
        unexpected: char,
    },
    TokeniserUnexpectedEscape {
        unexpected: Vec<char>,
    },
    IncludeNotSupported {
        path: String,
        origin: Option<DomainName>,
    },
    MissingSOA,
    MultipleSOA,
    MissingApexNS {
        apex: DomainName,
    },
    NotSubdomainOfApex {
        apex: DomainName,
        name: DomainName,
    },
    Unexpected {
        expected: String,
        tokens: Vec<(String, Vec<u8>)>,
    },
    ExpectedU32 {
        digits: String,
    },
    ExpectedOrigin,
    ExpectedDomainName {
        dotted_string: String,
    },
    WrongLen {
        tokens: Vec<(String, Vec<u8>)>,
    },
    MissingType {
        tokens: Vec<(String, Vec<u8>)>,
    },
    MissingTTL {
        tokens: Vec<(String, Vec<u8>)>,
    },
    MissingDomainName {
        tokens: Vec<(String, Vec<u8>)>,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::TokeniserUnexpected { unexpected } => write!(f, "unexpected '{unexpected:?}'"),
            Error::TokeniserUnexpectedEscape { unexpected } => {
                write!(f, "unexpected escape '{unexpected:?}'")
            }
            Error::IncludeNotSupported { .. } => write!(f, "'$INCLUDE' directive not supported"),
            Error::MissingSOA => write!(f, "zone has no SOA record"),
            Error::MultipleSOA => write!(f, "multiple SOA records, expected one"),
            Error::MissingApexNS { apex } => {
                write!(f, "zone has no NS RRset at the apex '{apex}'")
            }
            Error::NotSubdomainOfApex { apex, name } => {
                write!(
                    f,
                    "domain name '{name}' not a subdomain of the apex '{apex}'"
                )
            }
            Error::Unexpected { expected, .. } => write!(f, "expected '{expected:?}'"),
            Error::ExpectedU32 { digits } => write!(f, "expected u32, got '{digits:?}'"),
            Error::ExpectedOrigin => write!(f, "relative domain name used without origin"),
            Error::ExpectedDomainName { dotted_string } => {
                write!(f, "could not parse domain name '{dotted_string}'")
            }
            Error::WrongLen { .. } => write!(f, "zone file incomplete"),
            Error::MissingType { .. } => write!(f, "missing type in record definition"),
            Error::MissingTTL { .. } => write!(f, "missing TTL in record definition"),
            Error::MissingDomainName { .. } => {
                write!(f, "missing domain name in record definition")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
