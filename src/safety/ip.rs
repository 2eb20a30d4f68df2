//! Address classification for SSRF checks

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Which range an IP address falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressClass {
    /// Globally routable as far as we are concerned
    Public,
    /// 0.0.0.0/8 and ::
    Unspecified,
    /// 127.0.0.0/8 and ::1
    Loopback,
    /// RFC 1918 ranges
    Private,
    /// 169.254.0.0/16 and fe80::/10 (includes cloud metadata endpoints)
    LinkLocal,
    /// 100.64.0.0/10 carrier-grade NAT
    SharedAddressSpace,
    /// 198.18.0.0/15
    Benchmarking,
    /// fc00::/7
    UniqueLocal,
}

impl AddressClass {
    /// Returns true if a fetch may connect to an address of this class
    pub fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unspecified => "unspecified",
            Self::Loopback => "loopback",
            Self::Private => "private",
            Self::LinkLocal => "link-local",
            Self::SharedAddressSpace => "shared address space",
            Self::Benchmarking => "benchmarking",
            Self::UniqueLocal => "unique-local",
        }
    }
}

impl std::fmt::Display for AddressClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies an IP address
///
/// IPv6 addresses that embed an IPv4 address (IPv4-mapped `::ffff:0:0/96`
/// and the NAT64 well-known prefix `64:ff9b::/96`) are classified by the
/// embedded IPv4 address.
pub fn classify_ip(ip: IpAddr) -> AddressClass {
    match ip {
        IpAddr::V4(v4) => classify_ipv4(v4),
        IpAddr::V6(v6) => classify_ipv6(v6),
    }
}

/// Returns true if the address is anything other than public
pub fn is_private_or_local(ip: IpAddr) -> bool {
    !classify_ip(ip).is_public()
}

fn classify_ipv4(ip: Ipv4Addr) -> AddressClass {
    let [a, b, _, _] = ip.octets();
    match (a, b) {
        (0, _) => AddressClass::Unspecified,
        (10, _) => AddressClass::Private,
        (127, _) => AddressClass::Loopback,
        (169, 254) => AddressClass::LinkLocal,
        (172, 16..=31) => AddressClass::Private,
        (192, 168) => AddressClass::Private,
        (100, 64..=127) => AddressClass::SharedAddressSpace,
        (198, 18..=19) => AddressClass::Benchmarking,
        _ => AddressClass::Public,
    }
}

fn classify_ipv6(ip: Ipv6Addr) -> AddressClass {
    if ip.is_loopback() {
        return AddressClass::Loopback;
    }
    if ip.is_unspecified() {
        return AddressClass::Unspecified;
    }

    let segments = ip.segments();
    if segments[0] & 0xffc0 == 0xfe80 {
        return AddressClass::LinkLocal;
    }
    if segments[0] & 0xfe00 == 0xfc00 {
        return AddressClass::UniqueLocal;
    }

    if let Some(mapped) = ip.to_ipv4_mapped() {
        return classify_ipv4(mapped);
    }

    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        let [_, _, _, _, _, _, hi, lo] = segments;
        let embedded = Ipv4Addr::new((hi >> 8) as u8, hi as u8, (lo >> 8) as u8, lo as u8);
        return classify_ipv4(embedded);
    }

    AddressClass::Public
}
