use pagewire_core::TargetId;
use pagewire_engine::{ResponseDecoder, Target, TargetProfile};
use std::sync::Arc;
use url::Url;

/// Builds the page URL for a term.
pub type UrlBuilder = fn(&str) -> Result<Url, url::ParseError>;

/// A [`Target`] assembled from a profile, a decoder, and a URL builder.
pub struct SiteTarget<D> {
    id: TargetId,
    profile: TargetProfile,
    decoder: Arc<D>,
    page_url: UrlBuilder,
}

impl<D: ResponseDecoder> SiteTarget<D> {
    pub fn new(
        id: &str,
        profile: TargetProfile,
        decoder: D,
        page_url: UrlBuilder,
    ) -> pagewire_core::Result<Self> {
        Ok(Self {
            id: TargetId::new(id)?,
            profile,
            decoder: Arc::new(decoder),
            page_url,
        })
    }

    /// Adjust selectors or scripts, e.g. after a site redesign.
    #[must_use]
    pub fn with_profile(mut self, customize: impl FnOnce(TargetProfile) -> TargetProfile) -> Self {
        self.profile = customize(self.profile);
        self
    }
}

impl<D: ResponseDecoder> Target for SiteTarget<D> {
    type Decoder = D;

    fn id(&self) -> &TargetId {
        &self.id
    }

    fn profile(&self) -> &TargetProfile {
        &self.profile
    }

    fn decoder(&self) -> Arc<D> {
        Arc::clone(&self.decoder)
    }

    fn page_url(&self, term: &str) -> Result<Url, url::ParseError> {
        (self.page_url)(term)
    }
}
