//! Security-group and network ACL rule sets
//!
//! Pure functions; the topology builder submits whatever these return.

use crate::provider::{AclEntry, IngressRule, Protocol};
use ipnet::Ipv4Net;

pub const SSH_PORT: i32 = 22;
pub const HTTP_PORT: i32 = 80;
pub const HTTPS_PORT: i32 = 443;

/// Ephemeral port range admitted for return traffic (stateless ACLs)
pub const EPHEMERAL_PORTS: (i32, i32) = (1024, 65535);

/// 0.0.0.0/0
pub fn anywhere() -> Ipv4Net {
    Ipv4Net::default()
}

fn tcp(port: i32, cidr: Ipv4Net) -> IngressRule {
    IngressRule {
        protocol: Protocol::Tcp,
        from_port: port,
        to_port: port,
        cidr,
    }
}

/// Ingress rules of the per-region security group
///
/// SSH, HTTP, HTTPS and ICMP from anywhere, plus all traffic from each peer
/// VPC block. Duplicate peer blocks collapse into one rule.
pub fn ingress_rules(peer_cidrs: &[Ipv4Net]) -> Vec<IngressRule> {
    let mut rules = vec![
        tcp(SSH_PORT, anywhere()),
        tcp(HTTP_PORT, anywhere()),
        tcp(HTTPS_PORT, anywhere()),
        IngressRule {
            protocol: Protocol::Icmp,
            from_port: -1,
            to_port: -1,
            cidr: anywhere(),
        },
    ];

    for cidr in peer_cidrs {
        let rule = IngressRule {
            protocol: Protocol::All,
            from_port: -1,
            to_port: -1,
            cidr: *cidr,
        };
        if !rules.contains(&rule) {
            rules.push(rule);
        }
    }

    rules
}

fn allow_all_egress() -> AclEntry {
    AclEntry {
        rule_number: 100,
        protocol: Protocol::All,
        egress: true,
        cidr: anywhere(),
        ports: None,
    }
}

fn inbound_tcp(rule_number: i32, from: i32, to: i32) -> AclEntry {
    AclEntry {
        rule_number,
        protocol: Protocol::Tcp,
        egress: false,
        cidr: anywhere(),
        ports: Some((from, to)),
    }
}

/// Entries of the public subnet's network ACL
pub fn public_acl_entries() -> Vec<AclEntry> {
    vec![
        inbound_tcp(100, HTTP_PORT, HTTP_PORT),
        inbound_tcp(110, HTTPS_PORT, HTTPS_PORT),
        inbound_tcp(120, SSH_PORT, SSH_PORT),
        inbound_tcp(130, EPHEMERAL_PORTS.0, EPHEMERAL_PORTS.1),
        AclEntry {
            rule_number: 140,
            protocol: Protocol::Icmp,
            egress: false,
            cidr: anywhere(),
            ports: None,
        },
        allow_all_egress(),
    ]
}

/// Entries of the private subnet's network ACL
///
/// All traffic from the local public subnet, return traffic on the
/// ephemeral range from anywhere.
pub fn private_acl_entries(public_subnet: Ipv4Net) -> Vec<AclEntry> {
    vec![
        AclEntry {
            rule_number: 100,
            protocol: Protocol::All,
            egress: false,
            cidr: public_subnet,
            ports: None,
        },
        inbound_tcp(110, EPHEMERAL_PORTS.0, EPHEMERAL_PORTS.1),
        allow_all_egress(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn net(s: &str) -> Ipv4Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_ingress_rules_exact_set() {
        let rules = ingress_rules(&[net("10.1.0.0/16")]);
        assert_eq!(rules.len(), 5);

        let ports: Vec<_> = rules
            .iter()
            .filter(|r| r.protocol == Protocol::Tcp)
            .map(|r| r.from_port)
            .collect();
        assert_eq!(ports, vec![22, 80, 443]);

        assert!(rules.iter().any(|r| r.protocol == Protocol::Icmp && r.cidr == anywhere()));
        assert!(
            rules
                .iter()
                .any(|r| r.protocol == Protocol::All && r.cidr == net("10.1.0.0/16"))
        );

        let unique: HashSet<_> = rules.iter().collect();
        assert_eq!(unique.len(), rules.len());
    }

    #[test]
    fn test_ingress_rules_dedup_peers() {
        let rules = ingress_rules(&[net("10.1.0.0/16"), net("10.1.0.0/16"), net("10.2.0.0/16")]);
        assert_eq!(rules.len(), 6);
    }

    #[test]
    fn test_single_region_has_no_peer_rule() {
        let rules = ingress_rules(&[]);
        assert_eq!(rules.len(), 4);
        assert!(rules.iter().all(|r| r.protocol != Protocol::All));
    }

    #[test]
    fn test_public_acl_rule_numbers() {
        let entries = public_acl_entries();
        let inbound: Vec<_> = entries.iter().filter(|e| !e.egress).map(|e| e.rule_number).collect();
        assert_eq!(inbound, vec![100, 110, 120, 130, 140]);

        let ephemeral = entries.iter().find(|e| e.rule_number == 130).unwrap();
        assert_eq!(ephemeral.ports, Some((1024, 65535)));

        let egress: Vec<_> = entries.iter().filter(|e| e.egress).collect();
        assert_eq!(egress.len(), 1);
        assert_eq!(egress[0].protocol, Protocol::All);
    }

    #[test]
    fn test_private_acl_admits_public_subnet() {
        let entries = private_acl_entries(net("10.0.1.0/24"));
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].cidr, net("10.0.1.0/24"));
        assert_eq!(entries[0].protocol, Protocol::All);
        assert!(!entries[0].egress);
    }

    #[test]
    fn test_anywhere() {
        assert_eq!(anywhere().to_string(), "0.0.0.0/0");
    }
}
