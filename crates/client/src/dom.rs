//! `web_sys` implementation of [`Document`].

use devreload_shared::{ResourceError, StartupError};
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlLinkElement, HtmlScriptElement};

use crate::resource::Document;

/// The live page the agent runs in.
#[derive(Clone)]
pub struct BrowserDocument {
    window: web_sys::Window,
    document: web_sys::Document,
}

impl BrowserDocument {
    pub fn current() -> Result<Self, StartupError> {
        let window = web_sys::window().ok_or(StartupError::NoWindow)?;
        let document = window.document().ok_or(StartupError::NoDocument)?;
        Ok(Self { window, document })
    }

    pub fn inner(&self) -> &web_sys::Document {
        &self.document
    }

    fn elements<T: JsCast>(&self, tag: &str) -> Vec<T> {
        let collection = self.document.get_elements_by_tag_name(tag);
        // Copy out first: swaps insert into the same live collection.
        (0..collection.length())
            .filter_map(|i| collection.item(i))
            .filter_map(|el| el.dyn_into::<T>().ok())
            .collect()
    }
}

fn dom_error(value: JsValue) -> ResourceError {
    ResourceError::Dom {
        message: format!("{:?}", value),
    }
}

impl Document for BrowserDocument {
    type Element = Element;

    fn location(&self) -> Result<Url, ResourceError> {
        let href = self.window.location().href().map_err(dom_error)?;
        Url::parse(&href).map_err(|source| ResourceError::InvalidUrl { href, source })
    }

    fn stylesheets(&self) -> Vec<(Element, String)> {
        self.elements::<HtmlLinkElement>("link")
            .into_iter()
            .filter(|link| link.rel().eq_ignore_ascii_case("stylesheet"))
            .map(|link| {
                let href = link.href();
                (link.unchecked_into::<Element>(), href)
            })
            .collect()
    }

    fn scripts(&self) -> Vec<(Element, String)> {
        self.elements::<HtmlScriptElement>("script")
            .into_iter()
            .filter(|script| !script.src().is_empty())
            .map(|script| {
                let src = script.src();
                (script.unchecked_into::<Element>(), src)
            })
            .collect()
    }

    fn reload(&self) {
        if let Err(e) = self.window.location().reload() {
            crate::log_error!("reload failed: {:?}", e);
        }
    }

    fn clone_element(&self, element: &Element) -> Result<Element, ResourceError> {
        element
            .clone_node()
            .map_err(dom_error)?
            .dyn_into::<Element>()
            .map_err(|node| dom_error(node.into()))
    }

    fn set_href(&self, element: &Element, href: &str) -> Result<(), ResourceError> {
        element.set_attribute("href", href).map_err(dom_error)
    }

    fn insert_after(&self, anchor: &Element, element: &Element) -> Result<(), ResourceError> {
        let parent = anchor
            .parent_node()
            .ok_or_else(|| ResourceError::MissingParent {
                href: anchor.get_attribute("href").unwrap_or_default(),
            })?;
        parent
            .insert_before(element, anchor.next_sibling().as_ref())
            .map_err(dom_error)?;
        Ok(())
    }

    fn remove_when_loaded(&self, loading: &Element, stale: Element) {
        let Some(link) = loading.dyn_ref::<HtmlLinkElement>() else {
            crate::log_warn!("hot swap target is not a link element");
            return;
        };
        let onload = Closure::once(move |_: web_sys::Event| {
            stale.remove();
        });
        link.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();
    }
}
