//! Live stylesheet and script references, and the stylesheet hot swap.
//!
//! Nothing here is cached: a [`Snapshot`] is taken per change event
//! because the page may have been mutated since the last one.

use devreload_shared::ResourceError;
use url::Url;

use crate::token::TokenSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Stylesheet,
    Script,
}

/// The page surface the matcher reads and mutates.
///
/// Element handles are owned by the document; implementations hand out
/// cheap clones (JS object references, indices).
pub trait Document {
    type Element: Clone;

    /// Current page URL, used as the resolution base and host filter
    fn location(&self) -> Result<Url, ResourceError>;

    /// `<link rel="stylesheet">` elements in document order, with their raw `href`
    fn stylesheets(&self) -> Vec<(Self::Element, String)>;

    /// `<script>` elements with a non-empty `src`, in document order
    fn scripts(&self) -> Vec<(Self::Element, String)>;

    /// Discard the page and load it again
    fn reload(&self);

    /// Shallow clone keeping every attribute
    fn clone_element(&self, element: &Self::Element) -> Result<Self::Element, ResourceError>;

    fn set_href(&self, element: &Self::Element, href: &str) -> Result<(), ResourceError>;

    /// Insert `element` as the next sibling of `anchor`
    fn insert_after(
        &self,
        anchor: &Self::Element,
        element: &Self::Element,
    ) -> Result<(), ResourceError>;

    /// Remove `stale` once `loading` fires its load event. If it never
    /// loads, `stale` stays in place.
    fn remove_when_loaded(&self, loading: &Self::Element, stale: Self::Element);
}

/// A same-origin resource resolved to an absolute URL.
#[derive(Debug, Clone)]
pub struct LiveResource<E> {
    pub element: E,
    pub url: Url,
    pub kind: ResourceKind,
}

impl<E> LiveResource<E> {
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn is_stylesheet(&self) -> bool {
        self.kind == ResourceKind::Stylesheet
    }

    pub fn is_script(&self) -> bool {
        self.kind == ResourceKind::Script
    }
}

/// Eligible resources at one instant: stylesheets first, then scripts,
/// each group in document order.
#[derive(Debug, Clone)]
pub struct Snapshot<E> {
    resources: Vec<LiveResource<E>>,
}

impl<E> Snapshot<E> {
    pub fn from_resources(resources: Vec<LiveResource<E>>) -> Self {
        Self { resources }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveResource<E>> {
        self.resources.iter()
    }
}

impl<E: Clone> Snapshot<E> {
    /// Collect same-origin resources from `document`. Malformed URLs are
    /// logged and skipped.
    pub fn capture<D>(document: &D) -> Self
    where
        D: Document<Element = E>,
    {
        let location = match document.location() {
            Ok(location) => location,
            Err(e) => {
                crate::log_error!("{}", e);
                return Self::from_resources(Vec::new());
            }
        };
        let stylesheets = document
            .stylesheets()
            .into_iter()
            .map(|(el, href)| (el, href, ResourceKind::Stylesheet));
        let scripts = document
            .scripts()
            .into_iter()
            .map(|(el, href)| (el, href, ResourceKind::Script));

        let resources = stylesheets
            .chain(scripts)
            .filter_map(|(element, href, kind)| match resolve(&location, &href) {
                Ok(url) if same_host(&location, &url) => Some(LiveResource { element, url, kind }),
                Ok(_) => None,
                Err(e) => {
                    crate::log_warn!("{}", e);
                    None
                }
            })
            .collect();
        Self { resources }
    }
}

/// Resolve a raw `href`/`src` against the page URL.
pub fn resolve(base: &Url, href: &str) -> Result<Url, ResourceError> {
    base.join(href).map_err(|source| ResourceError::InvalidUrl {
        href: href.to_string(),
        source,
    })
}

/// Host names must match; ports may differ (asset servers usually listen
/// on their own port).
pub fn same_host(page: &Url, resource: &Url) -> bool {
    match (page.host_str(), resource.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Set `param=token` on `url`, replacing a previous value and keeping the
/// other query pairs in order.
pub fn cache_busted(url: &Url, param: &str, token: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut next = url.clone();
    next.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(param, token);
    next
}

/// Replace a stylesheet without an unstyled flash.
///
/// The clone goes in right after the original so both apply while the new
/// sheet loads; the original is only removed on the clone's load event.
/// Returns the URL the clone fetches.
pub fn hot_swap<D, T>(
    document: &D,
    target: &LiveResource<D::Element>,
    param: &str,
    tokens: &T,
) -> Result<Url, ResourceError>
where
    D: Document,
    T: TokenSource + ?Sized,
{
    let next_url = cache_busted(&target.url, param, &tokens.next_token());
    let next = document.clone_element(&target.element)?;
    document.set_href(&next, next_url.as_str())?;
    document.insert_after(&target.element, &next)?;
    document.remove_when_loaded(&next, target.element.clone());
    Ok(next_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page() -> Url {
        Url::parse("http://localhost:3000/posts/1").unwrap()
    }

    #[test]
    fn resolves_relative_and_absolute() {
        assert_eq!(
            resolve(&page(), "/build/app.css").unwrap().as_str(),
            "http://localhost:3000/build/app.css"
        );
        assert_eq!(
            resolve(&page(), "style.css").unwrap().path(),
            "/posts/style.css"
        );
        assert_eq!(
            resolve(&page(), "http://localhost:8000/build/app.css")
                .unwrap()
                .path(),
            "/build/app.css"
        );
    }

    #[test]
    fn unparsable_href_is_an_invalid_url() {
        let err = resolve(&page(), "http://[::1").unwrap_err();
        assert!(matches!(err, ResourceError::InvalidUrl { ref href, .. } if href == "http://[::1"));
    }

    #[test]
    fn host_match_ignores_port() {
        let asset = Url::parse("http://localhost:8000/app.css").unwrap();
        let cdn = Url::parse("https://cdn.example.com/app.css").unwrap();
        assert!(same_host(&page(), &asset));
        assert!(!same_host(&page(), &cdn));
    }

    #[test]
    fn cache_bust_sets_param() {
        let url = Url::parse("http://localhost:3000/style.css").unwrap();
        assert_eq!(
            cache_busted(&url, "v", "abc").as_str(),
            "http://localhost:3000/style.css?v=abc"
        );
    }

    #[test]
    fn cache_bust_replaces_previous_token() {
        let url = Url::parse("http://localhost:3000/style.css?theme=dark&v=old").unwrap();
        assert_eq!(
            cache_busted(&url, "v", "new").as_str(),
            "http://localhost:3000/style.css?theme=dark&v=new"
        );
    }
}
