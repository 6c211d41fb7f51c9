//! Session-scoped dedup registry of selected assets.

use std::collections::HashSet;

use crate::types::ObservedRequest;

/// Assets already selected in this session.
///
/// Images are identified by signature, videos by asset id (falling back to
/// signature when the delivery metadata carried none). One registry lives
/// for exactly one harvest session.
#[derive(Debug, Default, Clone)]
pub struct DedupRegistry {
    signatures: HashSet<String>,
    asset_ids: HashSet<String>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a signature or asset id has been recorded.
    pub fn has(&self, key: &str) -> bool {
        self.signatures.contains(key) || self.asset_ids.contains(key)
    }

    pub fn has_signature(&self, signature: &str) -> bool {
        self.signatures.contains(signature)
    }

    pub fn has_asset(&self, asset_id: &str) -> bool {
        self.asset_ids.contains(asset_id)
    }

    /// Whether the asset behind this request was already claimed.
    pub fn is_claimed(&self, req: &ObservedRequest) -> bool {
        match (&req.asset_id, req.content_hint.is_video()) {
            (Some(asset_id), true) => self.has_asset(asset_id),
            _ => self.has_signature(&req.signature),
        }
    }

    /// Record a selected asset.
    pub fn record(&mut self, signature: &str, asset_id: Option<&str>) {
        self.signatures.insert(signature.to_string());
        if let Some(id) = asset_id {
            self.asset_ids.insert(id.to_string());
        }
    }

    /// Record the asset behind a selected request.
    pub fn claim(&mut self, req: &ObservedRequest) {
        self.record(&req.signature, req.asset_id.as_deref());
    }

    /// Number of selected assets.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn clear(&mut self) {
        self.signatures.clear();
        self.asset_ids.clear();
    }
}
