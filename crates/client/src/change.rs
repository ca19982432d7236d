//! Change event interpretation.
//!
//! [`plan`] maps a resource snapshot and a change event to exactly one
//! [`Action`] in two ordered passes:
//!
//! 1. reload pass: `added`/`removed` against every eligible resource
//! 2. hot-swap pass: `updated` against scripts (reload), then against
//!    stylesheets (swap)
//!
//! The first match wins and ends the scan.

use devreload_shared::{ChangeEvent, DecodeError};

use crate::resource::{LiveResource, Snapshot};

/// What to do with the page for one change event.
#[derive(Debug)]
pub enum Action<'a, E> {
    Reload { path: &'a str },
    Swap { path: &'a str, target: &'a LiveResource<E> },
    Noop,
}

pub fn decode(raw: &str) -> Result<ChangeEvent, DecodeError> {
    ChangeEvent::decode(raw)
}

pub fn plan<'a, E>(snapshot: &'a Snapshot<E>, event: &'a ChangeEvent) -> Action<'a, E> {
    if let Some((_, path)) = first_match(snapshot.iter(), event.structural()) {
        return Action::Reload { path };
    }

    let updated = event.updated.iter().map(String::as_str);

    if let Some((_, path)) = first_match(
        snapshot.iter().filter(|r| r.is_script()),
        updated.clone(),
    ) {
        return Action::Reload { path };
    }

    if let Some((target, path)) = first_match(snapshot.iter().filter(|r| r.is_stylesheet()), updated)
    {
        return Action::Swap { path, target };
    }

    Action::Noop
}

/// First resource, in iteration order, whose path is one of `paths`.
fn first_match<'a, E, R, P>(
    mut resources: R,
    paths: P,
) -> Option<(&'a LiveResource<E>, &'a str)>
where
    R: Iterator<Item = &'a LiveResource<E>>,
    P: Iterator<Item = &'a str> + Clone,
{
    resources.find_map(|resource| {
        paths
            .clone()
            .find(|path| *path == resource.path())
            .map(|path| (resource, path))
    })
}
