//! Literal helpers: escaping, shape classification and Infoblox value encodings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::net::Ipv6Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Ipv4,
    Ipv4Cidr,
    Ipv6,
    Ipv6Cidr,
    Mac,
    DomainName,
}

static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)(\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)){3}$")
        .expect("ipv4 pattern compiles")
});

static IPV4_CIDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])/(3[0-2]|[1-2][0-9]|[0-9])$")
        .expect("ipv4 cidr pattern compiles")
});

static MAC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9a-fA-F]{2}[:-]){5}[0-9a-fA-F]{2}$").expect("mac pattern compiles")
});

static DOMAIN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}\.?$")
        .expect("domain pattern compiles")
});

type Matcher = fn(&str) -> bool;

/// Checked in order; the first hit decides the type.
const MATCHERS: [(ValueType, Matcher); 6] = [
    (ValueType::Ipv4, is_ipv4),
    (ValueType::Ipv4Cidr, is_ipv4_cidr),
    (ValueType::Ipv6, is_ipv6),
    (ValueType::Ipv6Cidr, is_ipv6_cidr),
    (ValueType::Mac, is_mac),
    (ValueType::DomainName, is_domain_name),
];

fn is_ipv4(value: &str) -> bool {
    IPV4.is_match(value)
}

fn is_ipv4_cidr(value: &str) -> bool {
    IPV4_CIDR.is_match(value)
}

fn is_mac(value: &str) -> bool {
    MAC.is_match(value)
}

fn is_domain_name(value: &str) -> bool {
    DOMAIN_NAME.is_match(value)
}

fn is_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

fn is_ipv6_cidr(value: &str) -> bool {
    let Some((addr, prefix)) = value.split_once('/') else {
        return false;
    };
    let prefix_ok = !prefix.is_empty()
        && prefix.len() <= 3
        && prefix.bytes().all(|b| b.is_ascii_digit())
        && prefix.parse::<u8>().is_ok_and(|bits| bits <= 128);
    prefix_ok && is_ipv6(addr)
}

pub fn classify(value: &str) -> Option<ValueType> {
    MATCHERS
        .iter()
        .find(|(_, matches)| matches(value))
        .map(|(kind, _)| *kind)
}

/// Backslash-escapes `\ " ( ) :` for embedding in a non-equality comparison.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '"' | '(' | ')' | ':') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Infoblox stores fully qualified names with the trailing root dot.
pub fn domain_to_infoblox(value: &str) -> String {
    if value.ends_with('.') {
        value.to_string()
    } else {
        format!("{value}.")
    }
}

pub fn severity_level(value: &str) -> Option<u8> {
    match value.trim().to_ascii_uppercase().as_str() {
        "HIGH" => Some(3),
        "MEDIUM" => Some(2),
        "LOW" => Some(1),
        _ => None,
    }
}
