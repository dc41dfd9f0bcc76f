use alloc::{sync::Arc, vec::Vec};

use crate::chain::TrustAnchors;

/// Produces attested keys, usually backed by a device keystore.
pub trait KeyProvider {
    type Error;

    /// Generates a fresh key whose attestation record carries `challenge` and returns the
    /// DER certificate chain, leaf first.
    ///
    /// **Authentication requirements of the key (such as a user authentication timeout) are up
    /// to the provider and are not checked by the verifier.**
    fn generate_attested_key(&self, challenge: &[u8]) -> Result<Vec<Vec<u8>>, Self::Error>;
}

/// Source of the trust anchors a verification runs against.
pub trait TrustAnchorStore {
    /// A snapshot used for one whole verification.
    fn trust_anchors(&self) -> Arc<TrustAnchors>;
}

impl TrustAnchorStore for Arc<TrustAnchors> {
    fn trust_anchors(&self) -> Arc<TrustAnchors> {
        self.clone()
    }
}

impl<T: TrustAnchorStore> TrustAnchorStore for &T {
    fn trust_anchors(&self) -> Arc<TrustAnchors> {
        (**self).trust_anchors()
    }
}
