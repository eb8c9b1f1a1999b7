//! IPv4 CIDR arithmetic.
//!
//! Addresses are packed big-endian into a `u32`. Every function is pure;
//! unparseable input never overlaps or contains anything.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CIDR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})$").unwrap());

/// A parsed CIDR block. `ip` is the address as written, not necessarily
/// the network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedCidr {
    pub ip: u32,
    pub prefix: u8,
}

impl ParsedCidr {
    pub fn mask(&self) -> u32 {
        prefix_to_mask(self.prefix)
    }

    pub fn network(&self) -> u32 {
        self.ip & self.mask()
    }

    pub fn broadcast(&self) -> u32 {
        self.network() | !self.mask()
    }
}

impl fmt::Display for ParsedCidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", ip_to_string(self.ip), self.prefix)
    }
}

/// Parse `a.b.c.d/p`. Octets above 255 or prefixes above 32 are rejected.
pub fn parse_cidr(cidr: &str) -> Option<ParsedCidr> {
    let caps = CIDR_PATTERN.captures(cidr)?;

    let mut ip: u32 = 0;
    for i in 1..=4 {
        let octet: u32 = caps[i].parse().ok()?;
        if octet > 255 {
            return None;
        }
        ip = (ip << 8) | octet;
    }

    let prefix: u8 = caps[5].parse().ok()?;
    if prefix > 32 {
        return None;
    }

    Some(ParsedCidr { ip, prefix })
}

pub fn ip_to_string(ip: u32) -> String {
    format!(
        "{}.{}.{}.{}",
        (ip >> 24) & 0xff,
        (ip >> 16) & 0xff,
        (ip >> 8) & 0xff,
        ip & 0xff
    )
}

/// Network mask for a prefix length; `/0` is the empty mask.
pub fn prefix_to_mask(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        p if p >= 32 => u32::MAX,
        p => u32::MAX << (32 - u32::from(p)),
    }
}

pub fn is_valid_cidr(cidr: &str) -> bool {
    parse_cidr(cidr).is_some()
}

/// Whether two blocks share any address. Both networks are compared under
/// the shorter prefix.
pub fn cidrs_overlap(a: &str, b: &str) -> bool {
    let (Some(pa), Some(pb)) = (parse_cidr(a), parse_cidr(b)) else {
        return false;
    };
    let mask = prefix_to_mask(pa.prefix.min(pb.prefix));
    (pa.ip & mask) == (pb.ip & mask)
}

/// Whether `child` lies entirely within `parent`.
pub fn cidr_contains(parent: &str, child: &str) -> bool {
    let (Some(pp), Some(pc)) = (parse_cidr(parent), parse_cidr(child)) else {
        return false;
    };
    if pc.prefix < pp.prefix {
        return false;
    }
    let mask = pp.mask();
    (pc.ip & mask) == (pp.ip & mask)
}

/// First aligned `/subnet_prefix` block inside `parent_cidr` that overlaps
/// none of `used_cidrs`.
///
/// Returns `None` when the parent is unparseable or exhausted, or when
/// `subnet_prefix` is not strictly longer than the parent's prefix.
pub fn next_available_cidr<S: AsRef<str>>(parent_cidr: &str, used_cidrs: &[S], subnet_prefix: u8) -> Option<String> {
    let parent = parse_cidr(parent_cidr)?;
    if subnet_prefix <= parent.prefix || subnet_prefix > 32 {
        return None;
    }

    let used: Vec<ParsedCidr> = used_cidrs.iter().filter_map(|c| parse_cidr(c.as_ref())).collect();

    let step = 1u64 << (32 - u32::from(subnet_prefix));
    let last_start = u64::from(parent.broadcast()) + 1 - step;
    let mut candidate = u64::from(parent.network());

    while candidate <= last_start {
        // `candidate` never exceeds the parent's broadcast address.
        let block = ParsedCidr {
            ip: candidate as u32,
            prefix: subnet_prefix,
        };
        let taken = used.iter().any(|u| {
            let mask = prefix_to_mask(u.prefix.min(block.prefix));
            (u.ip & mask) == (block.ip & mask)
        });
        if !taken {
            return Some(block.to_string());
        }
        candidate += step;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_cidr() {
        assert_eq!(
            parse_cidr("10.0.0.0/16"),
            Some(ParsedCidr {
                ip: 167_772_160,
                prefix: 16
            })
        );
        assert_eq!(parse_cidr("0.0.0.0/0").map(|c| c.prefix), Some(0));
        assert_eq!(parse_cidr("255.255.255.255/32").map(|c| c.ip), Some(u32::MAX));
    }

    #[test]
    fn test_parse_cidr_rejects_malformed() {
        for bad in ["10.0.0.0", "/16", "10.0.0.256/16", "10.0.0.0/33", "10.0.0/16", " 10.0.0.0/16", "a.b.c.d/8", "10.0.0.0/"] {
            assert!(parse_cidr(bad).is_none(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_display_roundtrip() {
        let parsed = parse_cidr("192.168.10.0/24").unwrap();
        assert_eq!(parsed.to_string(), "192.168.10.0/24");
    }

    #[test]
    fn test_prefix_to_mask() {
        assert_eq!(prefix_to_mask(0), 0);
        assert_eq!(prefix_to_mask(8), 0xff00_0000);
        assert_eq!(prefix_to_mask(24), 0xffff_ff00);
        assert_eq!(prefix_to_mask(32), u32::MAX);
    }

    #[test]
    fn test_overlap() {
        assert!(cidrs_overlap("10.0.0.0/16", "10.0.5.0/24"));
        assert!(cidrs_overlap("10.0.5.0/24", "10.0.0.0/16"));
        assert!(!cidrs_overlap("10.0.0.0/25", "10.0.0.128/25"));
        assert!(!cidrs_overlap("10.0.0.0/16", "10.1.0.0/16"));
        assert!(!cidrs_overlap("bogus", "10.0.0.0/16"));
    }

    #[test]
    fn test_contains() {
        assert!(cidr_contains("10.0.0.0/16", "10.0.5.0/24"));
        assert!(cidr_contains("10.0.0.0/16", "10.0.0.0/16"));
        assert!(!cidr_contains("10.0.0.0/24", "10.0.0.0/16"));
        assert!(!cidr_contains("10.1.0.0/16", "10.0.5.0/24"));
        assert!(cidr_contains("0.0.0.0/0", "192.168.1.0/24"));
    }

    #[test]
    fn test_next_available_skips_larger_used_block() {
        assert_eq!(
            next_available_cidr("10.0.0.0/16", &["10.0.0.0/23"], 24).as_deref(),
            Some("10.0.2.0/24")
        );
    }

    #[test]
    fn test_next_available_fills_gaps() {
        let used = ["10.0.0.0/24", "10.0.2.0/24"];
        assert_eq!(next_available_cidr("10.0.0.0/16", &used, 24).as_deref(), Some("10.0.1.0/24"));
    }

    #[test]
    fn test_next_available_exhausted() {
        let used = ["10.0.0.0/25", "10.0.0.128/25"];
        assert_eq!(next_available_cidr("10.0.0.0/24", &used, 25), None);
    }

    #[test]
    fn test_next_available_rejects_non_longer_prefix() {
        let none: [&str; 0] = [];
        assert_eq!(next_available_cidr("10.0.0.0/24", &none, 24), None);
        assert_eq!(next_available_cidr("10.0.0.0/24", &none, 16), None);
        assert_eq!(next_available_cidr("10.0.0.0/24", &none, 33), None);
        assert_eq!(next_available_cidr("nope", &none, 24), None);
    }

    #[test]
    fn test_next_available_at_top_of_address_space() {
        let none: [&str; 0] = [];
        assert_eq!(
            next_available_cidr("255.255.255.0/24", &none, 25).as_deref(),
            Some("255.255.255.0/25")
        );
        assert_eq!(
            next_available_cidr("255.255.255.0/24", &["255.255.255.0/25"], 25).as_deref(),
            Some("255.255.255.128/25")
        );
    }

    fn cidr_strategy() -> impl Strategy<Value = String> {
        (any::<u32>(), 0u8..=32).prop_map(|(ip, prefix)| ParsedCidr { ip, prefix }.to_string())
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(a in cidr_strategy(), b in cidr_strategy()) {
            prop_assert_eq!(cidrs_overlap(&a, &b), cidrs_overlap(&b, &a));
        }

        #[test]
        fn prop_contains_is_reflexive(a in cidr_strategy()) {
            prop_assert!(cidr_contains(&a, &a));
        }

        #[test]
        fn prop_contains_implies_overlap(a in cidr_strategy(), b in cidr_strategy()) {
            if cidr_contains(&a, &b) {
                prop_assert!(cidrs_overlap(&a, &b));
            }
        }

        #[test]
        fn prop_allocated_block_is_free_and_inside(used in proptest::collection::vec(cidr_strategy(), 0..4)) {
            if let Some(next) = next_available_cidr("10.0.0.0/16", &used, 24) {
                prop_assert!(cidr_contains("10.0.0.0/16", &next));
                for u in &used {
                    prop_assert!(!cidrs_overlap(&next, u));
                }
            }
        }
    }
}
