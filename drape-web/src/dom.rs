use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlCanvasElement, Window};

use crate::error::HostError;
use crate::input::Viewport;
use crate::shader::ShaderRegistry;

pub fn window() -> Result<Window, HostError> {
    web_sys::window().ok_or_else(|| HostError::Dom("No window".to_string()))
}

pub fn document(window: &Window) -> Result<Document, HostError> {
    window.document().ok_or_else(|| HostError::Dom("No document".to_string()))
}

pub fn canvas(document: &Document, id: &str) -> Result<HtmlCanvasElement, HostError> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| HostError::Dom(format!("Canvas `{id}` not found")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| HostError::Dom(format!("Element `{id}` is not a canvas")))
}

/// Optional element, e.g. the frame-rate readout.
pub fn element(document: &Document, id: &str) -> Option<Element> {
    let element = document.get_element_by_id(id);
    if element.is_none() {
        log::debug!("no element with id `{id}`");
    }
    element
}

/// Add every `<script class="{class}" type="<name>/<stage>">` source to
/// `registry`. Elements with a malformed type are logged and skipped.
pub fn collect_shader_sources(document: &Document, class: &str, registry: &mut ShaderRegistry) -> usize {
    let elements = document.get_elements_by_class_name(class);
    let mut collected = 0;
    for i in 0..elements.length() {
        let Some(element) = elements.item(i) else { continue };
        let tag = element.get_attribute("type").unwrap_or_default();
        let source = element.text_content().unwrap_or_default();
        match registry.insert_tagged(&tag, source) {
            Ok(()) => collected += 1,
            Err(err) => log::error!("{err}"),
        }
    }
    log::info!("collected {collected} shader sources from the page");
    collected
}

/// Window inner size as a viewport.
pub fn window_viewport(window: &Window) -> Result<Viewport, HostError> {
    let dimension = |value: Result<wasm_bindgen::JsValue, wasm_bindgen::JsValue>| {
        value.map_err(HostError::from_js).map(|v| v.as_f64().unwrap_or(0.0))
    };
    Ok(Viewport::from_window(
        dimension(window.inner_width())?,
        dimension(window.inner_height())?,
    ))
}

/// Match the canvas backing size to `viewport`.
pub fn size_canvas(canvas: &HtmlCanvasElement, viewport: Viewport) {
    canvas.set_width(viewport.width);
    canvas.set_height(viewport.height);
}
