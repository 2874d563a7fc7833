//! Fixed zone records and answer construction.

use hickory_proto::rr::rdata::{A, NS, SOA};
use hickory_proto::rr::{DNSClass, LowerName, Name, RData, Record};
use hickory_proto::ProtoError;
use std::net::Ipv4Addr;

const SOA_TTL: u32 = 1;
const NS_TTL: u32 = 60;
const SOA_SERIAL: u32 = 1;
const SOA_REFRESH: i32 = 3600;
const SOA_RETRY: i32 = 600;
const SOA_EXPIRE: i32 = 1_209_600;
const SOA_MINIMUM: u32 = 1;

/// Parse a hostname as fully qualified.
pub fn fqdn(name: &str) -> Result<Name, ProtoError> {
    let mut name = Name::from_ascii(name)?;
    name.set_fqdn(true);
    Ok(name)
}

/// Zone apex, SOA and NS records, built once at startup.
#[derive(Debug, Clone)]
pub struct ZoneRecords {
    apex: Name,
    apex_lower: LowerName,
    soa: Record,
    ns: Vec<Record>,
}

impl ZoneRecords {
    /// `nameservers[0]` is the SOA primary, `nameservers[1]` the mailbox.
    /// Every entry gets an NS record.
    pub fn new(zone: &str, nameservers: &[String]) -> Result<Self, ProtoError> {
        let apex = fqdn(zone)?;
        let ns_names = nameservers
            .iter()
            .map(|ns| fqdn(ns))
            .collect::<Result<Vec<_>, _>>()?;

        let mname = ns_names.first().cloned().unwrap_or_else(|| apex.clone());
        let rname = ns_names.get(1).cloned().unwrap_or_else(|| mname.clone());
        let soa = SOA::new(
            mname,
            rname,
            SOA_SERIAL,
            SOA_REFRESH,
            SOA_RETRY,
            SOA_EXPIRE,
            SOA_MINIMUM,
        );
        let mut soa = Record::from_rdata(apex.clone(), SOA_TTL, RData::SOA(soa));
        soa.set_dns_class(DNSClass::IN);

        let ns = ns_names
            .into_iter()
            .map(|name| {
                let mut record = Record::from_rdata(apex.clone(), NS_TTL, RData::NS(NS(name)));
                record.set_dns_class(DNSClass::IN);
                record
            })
            .collect();

        Ok(Self {
            apex_lower: LowerName::from(apex.clone()),
            apex,
            soa,
            ns,
        })
    }

    pub fn apex(&self) -> &Name {
        &self.apex
    }

    /// Whether `name` is the apex or below it.
    pub fn contains(&self, name: &LowerName) -> bool {
        self.apex_lower.zone_of(name)
    }

    pub fn soa(&self) -> &Record {
        &self.soa
    }

    pub fn ns(&self) -> &[Record] {
        &self.ns
    }
}

/// An A record for `name`.
pub fn a_record(name: Name, ttl: u32, ip: Ipv4Addr) -> Record {
    let mut record = Record::from_rdata(name, ttl, RData::A(A(ip)));
    record.set_dns_class(DNSClass::IN);
    record
}
