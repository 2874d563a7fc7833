//! Candidate backend feeds.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use thiserror::Error;

/// A backend that might be worth registering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub ip: Ipv4Addr,
}

impl Candidate {
    pub fn new(name: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self { name: name.into(), ip }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("invalid static server entry '{0}', expected name=ip")]
    InvalidEntry(String),

    #[error("candidate source unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can list candidate backends.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidates(&self) -> Result<Vec<Candidate>, SourceError>;
}

/// Fixed candidate list from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    candidates: Vec<Candidate>,
}

impl StaticSource {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Parse `name=ip,name=ip`. Blank entries are skipped.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let mut candidates = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, ip) = entry
                .split_once('=')
                .ok_or_else(|| SourceError::InvalidEntry(entry.to_string()))?;
            let name = name.trim();
            let ip = ip
                .trim()
                .parse::<Ipv4Addr>()
                .map_err(|_| SourceError::InvalidEntry(entry.to_string()))?;
            if name.is_empty() {
                return Err(SourceError::InvalidEntry(entry.to_string()));
            }
            candidates.push(Candidate::new(name, ip));
        }
        Ok(Self { candidates })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    async fn candidates(&self) -> Result<Vec<Candidate>, SourceError> {
        Ok(self.candidates.clone())
    }
}
